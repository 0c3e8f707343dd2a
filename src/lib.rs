#[path = "core/partition.rs"]
pub mod partition;

#[path = "core/pointer.rs"]
pub mod pointer;

#[path = "core/wheel.rs"]
pub mod wheel;

#[path = "core/snapshot.rs"]
pub mod snapshot;

pub use partition::{PartitionError, Segment, TaskPartition};
pub use pointer::{AttentionPointer, PointerConfig, PointerMode};
pub use snapshot::{TaskShare, WheelReport, WheelSnapshot};
pub use wheel::{WheelConfig, WheelState};
