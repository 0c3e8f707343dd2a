#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point-in-time view of the wheel, as pushed to the relay.
///
/// The outer `attention_wheel` key is part of the wire format.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WheelSnapshot {
    pub attention_wheel: WheelReport,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WheelReport {
    /// Stream duration in seconds.
    pub total_duration: f64,
    pub attention_score: f64,
    pub is_fatigued: bool,
    /// Empty when no segment is under the pointer.
    pub current_task: String,
    /// Unwrapped pointer angle in degrees.
    pub rotation_angle: f64,
    pub pointer_length: f64,
    pub stream_progress: f64,
    pub tasks: Vec<TaskShare>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TaskShare {
    pub name: String,
    pub percentage: f64,
}

#[cfg(feature = "serde")]
impl WheelSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
