use serde::{Deserialize, Serialize};

use crate::ccs::types::{Coordinates, Slot, Unit};

fn default_height() -> usize {
    3
}

/// Fixed-capacity vertical sequence of slots at one ground position.
/// Index 0 is the bottom layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    #[serde(default)]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub container: Vec<Slot>,
    #[serde(default = "default_height")]
    pub height: usize,
}

impl Stack {
    pub fn new(name: impl Into<String>, coordinates: Coordinates, height: usize) -> Self {
        Self {
            name: name.into(),
            coordinates,
            container: vec![Slot::Empty; height],
            height,
        }
    }

    /// Place a unit in the lowest free slot. Returns false if the stack is full.
    pub fn push(&mut self, unit: Unit) -> bool {
        match self.first_empty() {
            Some(index) => {
                self.container[index] = Slot::Occupied(unit);
                true
            }
            None => false,
        }
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.container.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn is_full(&self) -> bool {
        self.first_empty().is_none()
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.container.iter().position(Slot::is_empty)
    }

    pub fn position_of(&self, number: &str) -> Option<usize> {
        self.container.iter().position(|s| s.holds(number))
    }

    pub fn contains(&self, number: &str) -> bool {
        self.position_of(number).is_some()
    }

    /// Highest occupied slot.
    pub fn top(&self) -> Option<&Unit> {
        self.container.iter().rev().find_map(Slot::unit)
    }

    /// Pad the slot list up to `height`. A longer list raises `height`.
    pub(crate) fn normalize(&mut self) {
        if self.container.len() > self.height {
            tracing::warn!(
                stack = %self.name,
                slots = self.container.len(),
                height = self.height,
                "Stack holds more slots than its height, raising height"
            );
            self.height = self.container.len();
        }
        self.container.resize(self.height, Slot::Empty);
    }

    /// Let units settle onto the bottom and clear repeated unit numbers.
    ///
    /// Runs in a single bottom-up pass: slots `[write, read)` are always empty,
    /// so every kept unit is swapped down to `write`. Order of the kept units
    /// is preserved, which makes the pass idempotent. Returns true if any slot
    /// changed.
    pub fn compact(&mut self) -> bool {
        let mut changed = false;
        let mut write = 0;

        for read in 0..self.container.len() {
            let Some(number) = self.container[read].number().map(str::to_owned) else {
                continue;
            };

            if self.container[..write].iter().any(|s| s.holds(&number)) {
                tracing::warn!(stack = %self.name, unit = %number, layer = read, "Duplicate unit cleared");
                self.container[read] = Slot::Empty;
                changed = true;
                continue;
            }

            if read != write {
                tracing::debug!(stack = %self.name, unit = %number, from = read, to = write, "Floating unit lowered");
                self.container.swap(read, write);
                changed = true;
            }
            write += 1;
        }

        changed
    }
}
