use serde::{Deserialize, Serialize};

use crate::ccs::types::Slot;
use crate::storage::stack::Stack;

/// Flat yard snapshot written on shutdown and read on startup.
///
/// The crane is written as a unit object, or `""` when it holds nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub stacks: Vec<Stack>,
    #[serde(default, with = "crane_slot")]
    pub crane: Slot,
}

mod crane_slot {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::ccs::types::{Slot, Unit};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Unit(Unit),
        Marker(String),
    }

    pub fn serialize<S: Serializer>(slot: &Slot, serializer: S) -> Result<S::Ok, S::Error> {
        match slot {
            Slot::Empty => serializer.serialize_str(""),
            Slot::Occupied(unit) => unit.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Slot, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(Slot::Empty),
            Some(Repr::Unit(unit)) => Ok(Slot::from(unit)),
            Some(Repr::Marker(marker)) if marker.is_empty() => Ok(Slot::Empty),
            Some(Repr::Marker(marker)) => Err(D::Error::custom(format!(
                "expected a unit object or \"\" for the crane, got {marker:?}"
            ))),
        }
    }
}
