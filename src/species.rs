//! Species table.

use crate::particle::SpeciesId;
use serde::{Deserialize, Serialize};

/// A species's id, name, mass, and diameter. `diameter` is the static
/// hard-core diameter used by `Liouvillean::effective_diameter` for
/// species not currently under compression growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDescriptor {
    pub id: SpeciesId,
    pub name: String,
    pub mass: f64,
    pub diameter: f64,
}

impl SpeciesDescriptor {
    pub fn new(id: SpeciesId, name: impl Into<String>, mass: f64, diameter: f64) -> Self {
        SpeciesDescriptor {
            id,
            name: name.into(),
            mass,
            diameter,
        }
    }
}

/// Looks up a species descriptor by id, preserving registry-order
/// semantics (linear scan over a small table rather than a hash map,
/// matching the size of real species tables — usually single digits).
pub fn find(species: &[SpeciesDescriptor], id: SpeciesId) -> Option<&SpeciesDescriptor> {
    species.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_existing_species() {
        let table = vec![
            SpeciesDescriptor::new(0, "A", 1.0, 1.0),
            SpeciesDescriptor::new(1, "B", 2.0, 1.5),
        ];
        assert_eq!(find(&table, 1).unwrap().name, "B");
    }

    #[test]
    fn missing_species_is_none() {
        let table = vec![SpeciesDescriptor::new(0, "A", 1.0, 1.0)];
        assert!(find(&table, 7).is_none());
    }
}
