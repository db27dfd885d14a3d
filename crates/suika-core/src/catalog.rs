//! Static table of fruit kinds.
//!
//! The position of a kind in the table doubles as its score value and its
//! collision-type tag, so the table order is gameplay-significant: kinds are
//! sorted smallest to largest and merging two fruits of kind `k` produces a
//! fruit of kind `k + 1`.

use serde::{Deserialize, Serialize};

use crate::core::rng::Rng;

/// Immutable definition of one fruit kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindDef {
    pub mass: f32,
    pub radius: f32,
    /// Display name, also used for asset lookup (`{name}.png`).
    pub name: String,
}

/// The full kind table plus the restricted subset allowed to spawn directly.
/// Kinds are indexed 1..=N; index 0 is reserved and never valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Kind `k` lives at `kinds[k - 1]`.
    kinds: Vec<KindDef>,
    /// Kinds eligible for random spawning/dropping. Larger kinds are only
    /// reachable by merging.
    #[serde(default = "default_droppable")]
    droppable: Vec<u8>,
}

fn default_droppable() -> Vec<u8> {
    vec![1, 2, 3, 4]
}

fn kind_def(mass: f32, radius: f32, name: &str) -> KindDef {
    KindDef {
        mass,
        radius,
        name: name.to_string(),
    }
}

impl Catalog {
    /// The standard 11-kind table.
    pub fn standard() -> Self {
        Self {
            kinds: vec![
                kind_def(5.0, 30.0, "cherry"),
                kind_def(7.0, 40.0, "strawberry"),
                kind_def(10.0, 55.0, "plum"),
                kind_def(12.0, 70.0, "apricot"),
                kind_def(15.0, 90.0, "orange"),
                kind_def(20.0, 120.0, "tomato"),
                kind_def(25.0, 130.0, "grapefruit"),
                kind_def(30.0, 150.0, "apple"),
                kind_def(37.0, 190.0, "pineapple"),
                kind_def(40.0, 230.0, "melon"),
                kind_def(50.0, 200.0, "watermelon"),
            ],
            droppable: default_droppable(),
        }
    }

    /// The standard table with quarter-size radii, for small windows.
    pub fn mini() -> Self {
        let mut catalog = Self::standard();
        for def in &mut catalog.kinds {
            def.radius /= 4.0;
        }
        catalog
    }

    /// Parse a catalog from a JSON string, for data-driven kind tables.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of playable kinds (N).
    pub fn kind_count(&self) -> u8 {
        self.kinds.len() as u8
    }

    pub fn is_valid(&self, kind: u8) -> bool {
        kind >= 1 && kind <= self.kind_count()
    }

    /// Definition for a kind. Panics on an out-of-range kind: passing one is
    /// a programmer error, not a runtime condition.
    pub fn def(&self, kind: u8) -> &KindDef {
        assert!(self.is_valid(kind), "unknown fruit kind {}", kind);
        &self.kinds[kind as usize - 1]
    }

    pub fn name_of(&self, kind: u8) -> &str {
        &self.def(kind).name
    }

    /// Kinds eligible for random spawning.
    pub fn droppable(&self) -> &[u8] {
        &self.droppable
    }

    /// Uniformly sample one of the droppable kinds.
    pub fn random_kind(&self, rng: &mut Rng) -> u8 {
        *rng.pick(&self.droppable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_shape() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.kind_count(), 11);
        assert_eq!(catalog.name_of(1), "cherry");
        assert_eq!(catalog.name_of(11), "watermelon");
        assert!(!catalog.is_valid(0));
        assert!(!catalog.is_valid(12));
    }

    #[test]
    fn radii_mostly_increase_with_kind() {
        // The watermelon is the one deliberate exception (denser, not wider).
        let catalog = Catalog::standard();
        for kind in 1..catalog.kind_count() - 1 {
            assert!(
                catalog.def(kind).radius < catalog.def(kind + 1).radius,
                "kind {} not smaller than its merge result",
                kind
            );
        }
    }

    #[test]
    fn mini_divides_radii_by_four() {
        let standard = Catalog::standard();
        let mini = Catalog::mini();
        for kind in 1..=standard.kind_count() {
            assert!((mini.def(kind).radius - standard.def(kind).radius / 4.0).abs() < 1e-6);
            assert_eq!(mini.def(kind).mass, standard.def(kind).mass);
        }
    }

    #[test]
    fn random_kind_stays_in_droppable_subset() {
        let catalog = Catalog::standard();
        let mut rng = Rng::new(42);
        for _ in 0..200 {
            let kind = catalog.random_kind(&mut rng);
            assert!((1..=4).contains(&kind), "kind {} not droppable", kind);
        }
    }

    #[test]
    #[should_panic(expected = "unknown fruit kind")]
    fn zero_kind_is_reserved() {
        Catalog::standard().def(0);
    }

    #[test]
    fn parse_catalog_from_json() {
        let json = r#"{
            "kinds": [
                { "mass": 1.0, "radius": 10.0, "name": "pebble" },
                { "mass": 2.0, "radius": 15.0, "name": "rock" }
            ],
            "droppable": [1]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.kind_count(), 2);
        assert_eq!(catalog.name_of(2), "rock");
        let mut rng = Rng::new(1);
        assert_eq!(catalog.random_kind(&mut rng), 1);
    }

    #[test]
    fn droppable_defaults_when_omitted() {
        let json = r#"{
            "kinds": [
                { "mass": 1.0, "radius": 10.0, "name": "a" },
                { "mass": 2.0, "radius": 12.0, "name": "b" },
                { "mass": 3.0, "radius": 14.0, "name": "c" },
                { "mass": 4.0, "radius": 16.0, "name": "d" }
            ]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        let mut rng = Rng::new(9);
        for _ in 0..50 {
            assert!((1..=4).contains(&catalog.random_kind(&mut rng)));
        }
    }
}
