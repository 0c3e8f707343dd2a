use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartitionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("segment index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// One named, weighted arc of the wheel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    pub name: String,
    pub weight: f64,
}

impl Segment {
    pub fn new(name: impl Into<String>, weight: f64) -> Result<Self, PartitionError> {
        let name = name.into();
        validate(&name, weight)?;
        Ok(Self { name, weight })
    }
}

fn validate(name: &str, weight: f64) -> Result<(), PartitionError> {
    if name.trim().is_empty() {
        return Err(PartitionError::InvalidArgument(
            "segment name must not be empty".to_string(),
        ));
    }
    if !weight.is_finite() || weight <= 0.0 {
        return Err(PartitionError::InvalidArgument(format!(
            "segment weight must be a positive number, got {weight}"
        )));
    }
    Ok(())
}

/// Wraps an unbounded angle into `[0, 2π)`.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Ordered segments covering a full turn.
///
/// Insertion order is angular order starting at angle 0. Weights are
/// proportional shares: they do not need to sum to 100 for lookups to work,
/// `normalize` only rescales them for display.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<Segment>", into = "Vec<Segment>"))]
pub struct TaskPartition {
    segments: Vec<Segment>,
}

impl TryFrom<Vec<Segment>> for TaskPartition {
    type Error = PartitionError;

    fn try_from(segments: Vec<Segment>) -> Result<Self, Self::Error> {
        for s in &segments {
            validate(&s.name, s.weight)?;
        }
        Ok(Self { segments })
    }
}

impl From<TaskPartition> for Vec<Segment> {
    fn from(partition: TaskPartition) -> Self {
        partition.segments
    }
}

impl TaskPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a partition from `(name, weight)` pairs, validating each one.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, PartitionError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut partition = Self::new();
        for (name, weight) in pairs {
            partition.add_segment(name, weight)?;
        }
        Ok(partition)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn add_segment(&mut self, name: impl Into<String>, weight: f64) -> Result<usize, PartitionError> {
        let segment = Segment::new(name, weight)?;
        self.segments.push(segment);
        Ok(self.segments.len() - 1)
    }

    pub fn update_segment(
        &mut self,
        index: usize,
        name: impl Into<String>,
        weight: f64,
    ) -> Result<(), PartitionError> {
        self.check_index(index)?;
        let segment = Segment::new(name, weight)?;
        self.segments[index] = segment;
        Ok(())
    }

    pub fn remove_segment(&mut self, index: usize) -> Result<Segment, PartitionError> {
        self.check_index(index)?;
        Ok(self.segments.remove(index))
    }

    pub fn total_weight(&self) -> f64 {
        self.segments.iter().map(|s| s.weight).sum()
    }

    /// Rescales all weights so they sum to 100. No-op on a zero total.
    pub fn normalize(&mut self) {
        let total = self.total_weight();
        if total <= 0.0 {
            return;
        }
        for s in &mut self.segments {
            s.weight = s.weight / total * 100.0;
        }
    }

    /// Each segment's share of the whole, in percent.
    pub fn percentages(&self) -> Vec<f64> {
        let total = self.total_weight();
        self.segments
            .iter()
            .map(|s| if total > 0.0 { s.weight / total * 100.0 } else { 0.0 })
            .collect()
    }

    /// Angular span `[start, end)` of segment `index`, in radians.
    pub fn segment_span(&self, index: usize) -> Option<(f64, f64)> {
        let total = self.total_weight();
        if index >= self.segments.len() || total <= 0.0 {
            return None;
        }
        let mut start = 0.0;
        for (i, s) in self.segments.iter().enumerate() {
            let end = start + s.weight / total * TAU;
            if i == index {
                return Some((start, end));
            }
            start = end;
        }
        None
    }

    /// Resolves an (unbounded) angle to the segment whose half-open span
    /// contains it. `None` for an empty or zero-weight partition.
    pub fn segment_index_at_angle(&self, angle: f64) -> Option<usize> {
        let total = self.total_weight();
        if self.segments.is_empty() || total <= 0.0 || !angle.is_finite() {
            return None;
        }

        let a = wrap_angle(angle);
        let mut start = 0.0;
        for (i, s) in self.segments.iter().enumerate() {
            let end = start + s.weight / total * TAU;
            if a >= start && a < end {
                return Some(i);
            }
            start = end;
        }

        // Accumulated spans can fall a hair short of TAU.
        Some(self.segments.len() - 1)
    }

    fn check_index(&self, index: usize) -> Result<(), PartitionError> {
        if index >= self.segments.len() {
            return Err(PartitionError::IndexOutOfRange {
                index,
                len: self.segments.len(),
            });
        }
        Ok(())
    }
}
