//! Static catalog of playable heroes.

use shared::{ConnectionId, PlayerRecord, STARTING_GOLD, STARTING_TROOPS};

/// Immutable template a player record is instantiated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeroTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub avatar: &'static str,
    pub color: &'static str,
    pub bg: &'static str,
    pub gold: i64,
    pub troops: i64,
}

impl HeroTemplate {
    const fn standard(
        id: &'static str,
        name: &'static str,
        avatar: &'static str,
        color: &'static str,
        bg: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            avatar,
            color,
            bg,
            gold: STARTING_GOLD,
            troops: STARTING_TROOPS,
        }
    }

    /// Creates a fresh player record for the given connection
    pub fn instantiate(&self, connection_id: ConnectionId) -> PlayerRecord {
        PlayerRecord {
            id: self.id.to_string(),
            name: self.name.to_string(),
            avatar: self.avatar.to_string(),
            color: self.color.to_string(),
            bg: self.bg.to_string(),
            gold: self.gold,
            troops: self.troops,
            socket_id: connection_id,
            buildings: Vec::new(),
        }
    }
}

/// Heroes every deployment ships with
pub const HERO_CATALOG: [HeroTemplate; 10] = [
    HeroTemplate::standard(
        "h_napoleon",
        "Napoleón Bonaparte",
        "NB",
        "border-blue-600",
        "bg-blue-900",
    ),
    HeroTemplate::standard(
        "h_cleopatra",
        "Cleopatra VII",
        "CV",
        "border-yellow-500",
        "bg-yellow-900",
    ),
    HeroTemplate::standard(
        "h_genghis",
        "Genghis Khan",
        "GK",
        "border-red-600",
        "bg-red-900",
    ),
    HeroTemplate::standard(
        "h_lubu",
        "Lu Bu",
        "LB",
        "border-purple-600",
        "bg-purple-900",
    ),
    HeroTemplate::standard(
        "h_alexander",
        "Alejandro Magno",
        "AM",
        "border-orange-500",
        "bg-orange-800",
    ),
    HeroTemplate::standard(
        "h_suntzu",
        "Sun Tzu",
        "ST",
        "border-green-600",
        "bg-green-900",
    ),
    HeroTemplate::standard(
        "h_joan",
        "Juana de Arco",
        "JA",
        "border-indigo-400",
        "bg-indigo-900",
    ),
    HeroTemplate::standard(
        "h_mansa",
        "Mansa Musa",
        "MM",
        "border-yellow-300",
        "bg-yellow-800",
    ),
    HeroTemplate::standard(
        "h_leonardo",
        "Leonardo da Vinci",
        "LD",
        "border-amber-700",
        "bg-amber-950",
    ),
    HeroTemplate::standard(
        "h_elizabeth",
        "Isabel I",
        "EI",
        "border-rose-400",
        "bg-rose-900",
    ),
];

/// Read-only table of hero templates, fixed at creation
#[derive(Debug, Clone)]
pub struct Catalog {
    heroes: Vec<HeroTemplate>,
}

impl Catalog {
    /// Creates a catalog over the given templates
    ///
    /// Hero ids are expected to be unique; the order is kept as given.
    pub fn new(heroes: Vec<HeroTemplate>) -> Self {
        Self { heroes }
    }

    /// The ten heroes every deployment ships with
    pub fn standard() -> Self {
        Self::new(HERO_CATALOG.to_vec())
    }

    /// Every template, in catalog order
    pub fn all(&self) -> &[HeroTemplate] {
        &self.heroes
    }

    /// Looks up a template by hero id
    pub fn get(&self, id: &str) -> Option<&HeroTemplate> {
        self.heroes.iter().find(|hero| hero.id == id)
    }

    pub fn len(&self) -> usize {
        self.heroes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
