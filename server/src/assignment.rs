//! Hero assignment under the exclusivity constraint.
//!
//! A hero can be held by at most one connected player. The resolver only
//! reads the catalog and the set of identities already in use; the caller
//! owns the random source so tests can make the selection deterministic.

use crate::catalog::{Catalog, HeroTemplate};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Picks a hero nobody holds yet, uniformly at random
///
/// Returns None when every hero in the catalog is already taken, in which
/// case the connection has to be turned away.
pub fn pick_available<'a, R>(
    catalog: &'a Catalog,
    in_use: &HashSet<&str>,
    rng: &mut R,
) -> Option<&'a HeroTemplate>
where
    R: Rng + ?Sized,
{
    let available: Vec<&HeroTemplate> = catalog
        .all()
        .iter()
        .filter(|hero| !in_use.contains(hero.id))
        .collect();

    available.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::HERO_CATALOG;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_from_empty_set_in_use() {
        let catalog = Catalog::standard();
        let mut rng = StdRng::seed_from_u64(1);

        let hero = pick_available(&catalog, &HashSet::new(), &mut rng).unwrap();

        assert!(catalog.get(hero.id).is_some());
    }

    #[test]
    fn test_constant_rng_picks_first_free_hero() {
        let catalog = Catalog::standard();
        let mut rng = StepRng::new(0, 0);
        let in_use: HashSet<&str> = ["h_napoleon", "h_cleopatra"].into_iter().collect();

        let hero = pick_available(&catalog, &in_use, &mut rng).unwrap();

        assert_eq!(hero.id, "h_genghis");
    }

    #[test]
    fn test_never_picks_hero_in_use() {
        let catalog = Catalog::standard();
        let mut rng = StdRng::seed_from_u64(7);
        let in_use: HashSet<&str> = HERO_CATALOG[..9].iter().map(|hero| hero.id).collect();

        for _ in 0..50 {
            let hero = pick_available(&catalog, &in_use, &mut rng).unwrap();
            assert_eq!(hero.id, "h_elizabeth");
        }
    }

    #[test]
    fn test_exhausted_catalog_returns_none() {
        let catalog = Catalog::new(vec![HERO_CATALOG[0], HERO_CATALOG[1]]);
        let mut rng = StdRng::seed_from_u64(3);
        let in_use: HashSet<&str> = ["h_napoleon", "h_cleopatra"].into_iter().collect();

        assert!(pick_available(&catalog, &in_use, &mut rng).is_none());
    }

    #[test]
    fn test_empty_catalog_returns_none() {
        let catalog = Catalog::new(Vec::new());
        let mut rng = StepRng::new(0, 0);

        assert!(pick_available(&catalog, &HashSet::new(), &mut rng).is_none());
    }

    #[test]
    fn test_selection_covers_every_free_hero() {
        let catalog = Catalog::standard();
        let mut rng = StdRng::seed_from_u64(2024);
        let in_use: HashSet<&str> = ["h_lubu", "h_joan"].into_iter().collect();

        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let hero = pick_available(&catalog, &in_use, &mut rng).unwrap();
            seen.insert(hero.id);
        }

        assert_eq!(seen.len(), 8);
        assert!(!seen.contains("h_lubu"));
        assert!(!seen.contains("h_joan"));
    }
}
