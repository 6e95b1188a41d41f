use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard container height in mm, used to derive target z per layer.
pub const UNIT_HEIGHT_MM: i64 = 2591;

fn guid() -> String {
    Uuid::new_v4().to_string()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Site written into outgoing events. The crane may send other sites.
pub const DEFAULT_SITE: &str = "terminal";

/// Feature type assumed when the crane leaves it out.
pub const DEFAULT_FEATURE_TYPE: &str = "finallanding";

/// Kind of movement order sent to the crane.
///
/// Job types the crane may add later parse to `Unknown` so a status report
/// never fails on them; `Unknown` jobs are refused on enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobType {
    #[default]
    Move,
    Pick,
    Drop,
    Park,
    Remote,
    StormPin,
    Cancel,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Move => write!(f, "move"),
            JobType::Pick => write!(f, "pick"),
            JobType::Drop => write!(f, "drop"),
            JobType::Park => write!(f, "park"),
            JobType::Remote => write!(f, "remote"),
            JobType::StormPin => write!(f, "stormPin"),
            JobType::Cancel => write!(f, "cancel"),
            JobType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Job status as reported by the crane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CraneJobStatus {
    InProgress,
    Weighted,
    Continued,
    Stopped,
    Rejected,
    Paused,
    Done,
}

impl std::fmt::Display for CraneJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CraneJobStatus::InProgress => write!(f, "inProgress"),
            CraneJobStatus::Weighted => write!(f, "weighted"),
            CraneJobStatus::Continued => write!(f, "continued"),
            CraneJobStatus::Stopped => write!(f, "stopped"),
            CraneJobStatus::Rejected => write!(f, "rejected"),
            CraneJobStatus::Paused => write!(f, "paused"),
            CraneJobStatus::Done => write!(f, "done"),
        }
    }
}

/// Event envelope carried by every message exchanged with the crane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub site: String,
    pub timestamp: String,
    pub version: String,
    pub producer: String,
    pub location: String,
    #[serde(rename = "eventId")]
    pub event_id: String,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            event_type: "net.contargo.logistics.tams.TBD".to_string(),
            site: DEFAULT_SITE.to_string(),
            timestamp: timestamp(),
            version: "v1".to_string(),
            producer: "ccs.automodal.contargo.net".to_string(),
            location: "DEKOB".to_string(),
            event_id: guid(),
        }
    }
}

/// A container. Dimensions are in mm, weight in kg.
///
/// A unit with an empty `number` is the wire form of a vacant slot, see [`Slot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Unit {
    #[serde(rename = "unitId")]
    pub unit_id: String,
    pub height: u32,
    pub width: u32,
    pub length: u32,
    pub weight: u32,
    #[serde(rename = "type")]
    pub unit_type: String,
    pub number: String,
    #[serde(rename = "piggyBack")]
    pub piggy_back: bool,
    pub will_be_moved: bool,
    pub will_be_dropped: bool,
}

impl Default for Unit {
    fn default() -> Self {
        Self {
            unit_id: guid(),
            height: 2591,
            width: 2438,
            length: 6058,
            weight: 2000,
            unit_type: String::new(),
            number: String::new(),
            piggy_back: false,
            will_be_moved: false,
            will_be_dropped: false,
        }
    }
}

impl Unit {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            ..Default::default()
        }
    }

    /// The placeholder written for vacant slots.
    pub fn empty() -> Self {
        Self {
            unit_id: String::new(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.number.is_empty()
    }
}

/// Contents of one stack layer or of the crane.
///
/// Serialized as a unit object; `Empty` round-trips through [`Unit::empty`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Unit", into = "Unit")]
pub enum Slot {
    #[default]
    Empty,
    Occupied(Unit),
}

impl From<Unit> for Slot {
    fn from(unit: Unit) -> Self {
        if unit.is_empty() {
            Slot::Empty
        } else {
            Slot::Occupied(unit)
        }
    }
}

impl From<Slot> for Unit {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Empty => Unit::empty(),
            Slot::Occupied(unit) => unit,
        }
    }
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub fn unit(&self) -> Option<&Unit> {
        match self {
            Slot::Empty => None,
            Slot::Occupied(unit) => Some(unit),
        }
    }

    pub fn number(&self) -> Option<&str> {
        self.unit().map(|u| u.number.as_str())
    }

    /// True if this slot holds the unit with the given number.
    pub fn holds(&self, number: &str) -> bool {
        self.number() == Some(number)
    }

    /// Empty the slot, returning what it held.
    pub fn take(&mut self) -> Slot {
        std::mem::take(self)
    }
}

/// Physical position in mm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Default for Coordinates {
    fn default() -> Self {
        Self { x: 1, y: 2, z: 3 }
    }
}

impl Coordinates {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Same ground position. Height is ignored since it varies per layer.
    pub fn same_ground(&self, other: &Coordinates) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// Yard address of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicalCoordinates {
    pub bay: i64,
    pub row: i64,
    pub tier: i64,
}

impl Default for LogicalCoordinates {
    fn default() -> Self {
        Self {
            bay: 1,
            row: 2,
            tier: 3,
        }
    }
}

/// A single unit movement order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub metadata: Event,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub target: Coordinates,
    pub target_logical: LogicalCoordinates,
    pub unit: Unit,
}

impl Job {
    pub fn new(job_type: JobType, target: Coordinates, unit: Unit) -> Self {
        Self {
            job_type,
            target,
            unit,
            ..Default::default()
        }
    }

    pub fn with_logical(mut self, target_logical: LogicalCoordinates) -> Self {
        self.target_logical = target_logical;
        self
    }
}

/// Last status reported by the crane.
///
/// Missing fields fall back to a finished MOVE, so a bare report completes
/// the running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CraneStatus {
    pub job_type: JobType,
    pub job_status: CraneJobStatus,
    pub unit: Unit,
    pub created: String,
    pub metadata: Event,
}

impl Default for CraneStatus {
    fn default() -> Self {
        Self::new(JobType::Move, CraneJobStatus::Done)
    }
}

impl CraneStatus {
    pub fn new(job_type: JobType, job_status: CraneJobStatus) -> Self {
        Self {
            job_type,
            job_status,
            unit: Unit::default(),
            created: timestamp(),
            metadata: Event::default(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.job_status == CraneJobStatus::Done
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feature {
    #[serde(rename = "featureId")]
    pub feature_id: String,
    /// `cis`, `finallanding` or anything newer the crane advertises.
    #[serde(rename = "type")]
    pub feature_type: String,
    pub vendor: String,
    pub version: String,
}

impl Default for Feature {
    fn default() -> Self {
        Self {
            feature_id: guid(),
            feature_type: DEFAULT_FEATURE_TYPE.to_string(),
            vendor: String::new(),
            version: "v1".to_string(),
        }
    }
}

/// Capabilities advertised by the crane.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CraneDetails {
    pub event: Event,
    pub features: Vec<Feature>,
}
