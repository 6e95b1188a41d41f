//! Yard topology: named stacks plus the crane's single payload slot.
//!
//! [`Storage`] is the only owner of slot contents. Every tracked unit lives in
//! exactly one place, either one stack slot or the crane. Units only change
//! between the two through a reconciled PICK (stack to crane) or DROP (crane
//! to stack), see [`Storage::process_job_done`]. Operators can additionally
//! correct the layout by hand with [`Storage::place_in_stack`].
//!
//! After every structural change the stacks are compacted so that no unit
//! floats above an empty slot.

mod snapshot;
mod stack;

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::ccs::types::{Coordinates, Job, JobType, Slot, Unit};
use crate::error::{ReconcileError, Result, YardError};

pub use snapshot::Snapshot;
pub use stack::Stack;

/// Pseudo stack name addressing the crane slot.
pub const CRANE: &str = "crane";

/// Where a unit currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Stack { stack: usize, layer: usize },
    Crane,
}

/// Result of an operator relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The unit was moved into a free slot (or onto the crane).
    Moved,
    /// The target slot was occupied and both units traded places.
    Swapped,
    /// The unit already was where it was asked to go.
    Unchanged,
}

/// A unit together with the name of the stack holding it (or `"crane"`).
#[derive(Debug, Clone, Serialize)]
pub struct LocatedUnit {
    #[serde(flatten)]
    pub unit: Unit,
    pub stack: String,
}

#[derive(Debug, Default)]
pub struct Storage {
    stacks: Vec<Stack>,
    crane: Slot,
    ui_refresh: bool,
}

impl Storage {
    pub fn new(stacks: Vec<Stack>) -> Self {
        let mut storage = Self {
            stacks,
            ..Default::default()
        };
        for stack in &mut storage.stacks {
            stack.normalize();
        }
        storage
    }

    pub fn with_crane(mut self, unit: Unit) -> Self {
        self.crane = Slot::from(unit);
        self
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn crane(&self) -> &Slot {
        &self.crane
    }

    pub fn find_stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    /// Stack standing at the same ground position (x/y) as `coordinates`.
    pub fn find_stack_at(&self, coordinates: &Coordinates) -> Option<&Stack> {
        self.stacks
            .iter()
            .find(|s| s.coordinates.same_ground(coordinates))
    }

    /// Look a unit up in the stacks first, then on the crane.
    pub fn find_unit(&self, number: &str) -> Option<&Unit> {
        match self.locate(number)? {
            Location::Stack { stack, layer } => self.stacks[stack].container[layer].unit(),
            Location::Crane => self.crane.unit(),
        }
    }

    pub fn locate(&self, number: &str) -> Option<Location> {
        if number.is_empty() {
            return None;
        }
        for (stack_idx, stack) in self.stacks.iter().enumerate() {
            if let Some(layer) = stack.position_of(number) {
                return Some(Location::Stack {
                    stack: stack_idx,
                    layer,
                });
            }
        }
        if self.crane.holds(number) {
            return Some(Location::Crane);
        }
        None
    }

    /// All tracked units, stacks first, crane last.
    pub fn units(&self) -> Vec<&Unit> {
        self.stacks
            .iter()
            .flat_map(|s| s.container.iter().filter_map(Slot::unit))
            .chain(self.crane.unit())
            .collect()
    }

    pub fn unit_locations(&self) -> Vec<LocatedUnit> {
        let mut located: Vec<LocatedUnit> = self
            .stacks
            .iter()
            .flat_map(|stack| {
                stack.container.iter().filter_map(|slot| {
                    slot.unit().map(|unit| LocatedUnit {
                        unit: unit.clone(),
                        stack: stack.name.clone(),
                    })
                })
            })
            .collect();
        if let Some(unit) = self.crane.unit() {
            located.push(LocatedUnit {
                unit: unit.clone(),
                stack: CRANE.to_string(),
            });
        }
        located
    }

    /// Returns and clears the flag telling the UI to redraw the yard.
    pub fn take_ui_refresh(&mut self) -> bool {
        std::mem::take(&mut self.ui_refresh)
    }

    fn slot_mut(&mut self, location: Location) -> &mut Slot {
        match location {
            Location::Stack { stack, layer } => &mut self.stacks[stack].container[layer],
            Location::Crane => &mut self.crane,
        }
    }

    /// Move a unit into the 1-indexed `layer` of `stack_name`.
    ///
    /// `stack_name == "crane"` puts the unit on the crane and sends whatever
    /// the crane held to the unit's old slot. For real stacks: a unit already
    /// in the stack is left alone, an occupied target slot is swapped, and
    /// otherwise the unit leaves its old slot (or the crane) for the target.
    pub fn place_in_stack(
        &mut self,
        layer: usize,
        stack_name: &str,
        number: &str,
    ) -> std::result::Result<Placement, YardError> {
        if stack_name == CRANE {
            return self.place_on_crane(number);
        }

        let target = self
            .stacks
            .iter()
            .position(|s| s.name == stack_name)
            .ok_or_else(|| YardError::StackNotFound(stack_name.to_string()))?;
        let height = self.stacks[target].container.len();
        if layer == 0 || layer > height {
            return Err(YardError::LayerOutOfRange {
                stack: stack_name.to_string(),
                layer,
                height,
            });
        }
        let index = layer - 1;

        let source = self
            .locate(number)
            .ok_or_else(|| YardError::UnitNotFound(number.to_string()))?;

        if self.stacks[target].contains(number) {
            tracing::debug!(stack = stack_name, unit = number, "Unit already in stack");
            self.ui_refresh = true;
            return Ok(Placement::Unchanged);
        }

        let destination = Location::Stack {
            stack: target,
            layer: index,
        };
        let placement = if self.stacks[target].container[index].is_empty() {
            let unit = self.slot_mut(source).take();
            *self.slot_mut(destination) = unit;
            Placement::Moved
        } else {
            self.swap_slots(source, destination);
            Placement::Swapped
        };

        tracing::info!(stack = stack_name, layer, unit = number, placement = ?placement, "Unit placed");
        self.compact_layers();
        self.ui_refresh = true;
        Ok(placement)
    }

    fn place_on_crane(&mut self, number: &str) -> std::result::Result<Placement, YardError> {
        match self.locate(number) {
            None => Err(YardError::UnitNotFound(number.to_string())),
            Some(Location::Crane) => {
                self.ui_refresh = true;
                Ok(Placement::Unchanged)
            }
            Some(Location::Stack { stack, layer }) => {
                let unit = self.stacks[stack].container[layer].take();
                let displaced = std::mem::replace(&mut self.crane, unit);
                self.stacks[stack].container[layer] = displaced;
                tracing::info!(unit = number, "Unit placed on crane");
                self.compact_layers();
                self.ui_refresh = true;
                Ok(Placement::Moved)
            }
        }
    }

    /// Exchange the positions of two units, each in a stack or on the crane.
    ///
    /// Only logs and returns false if either unit cannot be found.
    pub fn switch(&mut self, a: &str, b: &str) -> bool {
        let (Some(loc_a), Some(loc_b)) = (self.locate(a), self.locate(b)) else {
            tracing::warn!(unit_a = a, unit_b = b, "Switch failed, unit not found");
            return false;
        };
        if loc_a == loc_b {
            return true;
        }

        self.swap_slots(loc_a, loc_b);
        tracing::debug!(unit_a = a, unit_b = b, "Units switched");
        true
    }

    fn swap_slots(&mut self, a: Location, b: Location) {
        let unit_a = self.slot_mut(a).take();
        let unit_b = std::mem::replace(self.slot_mut(b), unit_a);
        *self.slot_mut(a) = unit_b;
    }

    /// Repair every stack, see [`Stack::compact`]. Returns true if anything moved.
    pub fn compact_layers(&mut self) -> bool {
        let mut changed = false;
        for stack in &mut self.stacks {
            changed |= stack.compact();
        }
        if changed {
            self.ui_refresh = true;
        }
        changed
    }

    /// Re-teach a stack's physical position. Overlap is not checked.
    pub fn set_stack_position(
        &mut self,
        name: &str,
        coordinates: Coordinates,
    ) -> std::result::Result<(), YardError> {
        let stack = self
            .stacks
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| YardError::StackNotFound(name.to_string()))?;
        stack.coordinates = coordinates;
        tracing::info!(stack = name, x = coordinates.x, y = coordinates.y, z = coordinates.z, "Stack position set");
        self.ui_refresh = true;
        Ok(())
    }

    /// Apply a job the crane reported as done.
    ///
    /// All preconditions are checked before anything is touched, so a failed
    /// reconciliation leaves the yard exactly as it was.
    pub fn process_job_done(&mut self, job: &Job) -> std::result::Result<(), ReconcileError> {
        match job.job_type {
            JobType::Drop => self.reconcile_drop(job),
            JobType::Pick => self.reconcile_pick(job),
            JobType::Move
            | JobType::Park
            | JobType::Remote
            | JobType::StormPin
            | JobType::Cancel => Ok(()),
            JobType::Unknown => Err(ReconcileError::UnsupportedJobType(job.job_type)),
        }
    }

    fn reconcile_drop(&mut self, job: &Job) -> std::result::Result<(), ReconcileError> {
        let Some(held) = self.crane.number().map(str::to_owned) else {
            tracing::error!(unit = %job.unit.number, "Drop done but crane holds no unit");
            return Err(ReconcileError::CraneEmpty);
        };
        if !job.unit.is_empty() && job.unit.number != held {
            tracing::warn!(job_unit = %job.unit.number, crane_unit = %held, "Dropped unit differs from job unit");
        }

        let index = self
            .stacks
            .iter()
            .position(|s| s.coordinates.same_ground(&job.target))
            .ok_or(ReconcileError::NoStackAt {
                x: job.target.x,
                y: job.target.y,
            })?;
        let stack = &mut self.stacks[index];
        let layer = stack
            .first_empty()
            .ok_or_else(|| ReconcileError::StackFull(stack.name.clone()))?;

        stack.container[layer] = self.crane.take();
        tracing::info!(stack = %stack.name, layer, unit = %held, "Unit dropped");
        self.ui_refresh = true;
        Ok(())
    }

    fn reconcile_pick(&mut self, job: &Job) -> std::result::Result<(), ReconcileError> {
        if let Some(held) = self.crane.number() {
            tracing::error!(unit = %job.unit.number, crane_unit = held, "Pick done but crane already holds a unit");
            return Err(ReconcileError::CraneOccupied(held.to_string()));
        }

        let Some(Location::Stack { stack, layer }) = self.locate(&job.unit.number) else {
            return Err(ReconcileError::UnitNotFound(job.unit.number.clone()));
        };

        self.crane = self.stacks[stack].container[layer].take();
        tracing::info!(stack = %self.stacks[stack].name, layer, unit = %job.unit.number, "Unit picked");
        self.compact_layers();
        self.ui_refresh = true;
        Ok(())
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            stacks: self.stacks.clone(),
            crane: self.crane.clone(),
        }
    }

    /// Rebuild a yard from a snapshot, repairing what an unclean shutdown
    /// may have left behind.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut storage = Self::new(snapshot.stacks);
        storage.crane = snapshot.crane;
        storage.drop_cross_duplicates();
        storage.compact_layers();
        storage
    }

    /// Keep only the first location (stack order, crane last) of each unit.
    /// Repeats inside one stack are left to [`Stack::compact`].
    fn drop_cross_duplicates(&mut self) {
        let mut seen: HashSet<String> = HashSet::new();
        for stack in &mut self.stacks {
            let mut here = Vec::new();
            for slot in &mut stack.container {
                let Some(number) = slot.number().map(str::to_owned) else {
                    continue;
                };
                if seen.contains(&number) {
                    tracing::warn!(stack = %stack.name, unit = %number, "Unit stored in two stacks, later copy cleared");
                    *slot = Slot::Empty;
                } else {
                    here.push(number);
                }
            }
            seen.extend(here);
        }
        if let Some(number) = self.crane.number() {
            if seen.contains(number) {
                tracing::warn!(unit = number, "Crane unit also stored in a stack, crane cleared");
                self.crane = Slot::Empty;
            }
        }
    }

    pub fn export_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.to_snapshot())?;
        std::fs::write(path, text)?;
        tracing::info!(path = %path.display(), "Yard snapshot exported");
        Ok(())
    }

    pub fn import_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        let storage = Self::from_snapshot(snapshot);
        tracing::info!(
            path = %path.display(),
            stacks = storage.stacks.len(),
            units = storage.units().len(),
            "Yard snapshot imported"
        );
        Ok(storage)
    }
}
