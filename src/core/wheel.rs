use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::partition::{PartitionError, Segment, TaskPartition};
use crate::pointer::{AttentionPointer, PointerConfig};
use crate::snapshot::{TaskShare, WheelReport, WheelSnapshot};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WheelConfig {
    pub center_x: f64,
    pub center_y: f64,
    // Outer radius of the pie, used for point hit-testing.
    pub radius: f64,

    pub stream_duration: Duration,

    pub pointer: PointerConfig,

    // Initial rundown, in angular order.
    pub segments: Vec<Segment>,
}

impl Default for WheelConfig {
    fn default() -> Self {
        let segments = [
            ("Stream Opening", 10.0),
            ("Story 1", 30.0),
            ("Story 2", 10.0),
            ("Story 3", 30.0),
            ("Streaming Ending", 20.0),
        ]
        .into_iter()
        .map(|(name, weight)| Segment {
            name: name.to_string(),
            weight,
        })
        .collect();

        Self {
            center_x: 400.0,
            center_y: 250.0,
            radius: 150.0,
            stream_duration: Duration::from_secs(20 * 60),
            pointer: PointerConfig::default(),
            segments,
        }
    }
}

impl WheelConfig {
    pub fn with_stream_duration(mut self, duration: Duration) -> Self {
        self.stream_duration = duration;
        self
    }

    pub fn with_pointer(mut self, pointer: PointerConfig) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments;
        self
    }
}

/// Partition + pointer + stream timer.
///
/// All mutation happens through `tick` and the explicit edit/input methods;
/// `build_snapshot` only reads.
#[derive(Debug, Clone)]
pub struct WheelState {
    partition: TaskPartition,
    pointer: AttentionPointer,
    radius: f64,
    stream_start: Instant,
    stream_duration: Duration,
    selected: Option<usize>,
    paused: bool,
}

impl WheelState {
    pub fn new(cfg: WheelConfig, now: Instant) -> Result<Self, PartitionError> {
        let mut partition = TaskPartition::new();
        for s in cfg.segments {
            partition.add_segment(s.name, s.weight)?;
        }

        Ok(Self {
            partition,
            pointer: AttentionPointer::new(cfg.center_x, cfg.center_y, cfg.pointer),
            radius: cfg.radius,
            stream_start: now,
            stream_duration: cfg.stream_duration,
            selected: None,
            paused: false,
        })
    }

    pub fn partition(&self) -> &TaskPartition {
        &self.partition
    }

    pub fn pointer(&self) -> &AttentionPointer {
        &self.pointer
    }

    pub fn stream_duration(&self) -> Duration {
        self.stream_duration
    }

    pub fn selected_segment(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The stream is active while it is not paused and has time left.
    pub fn is_active(&self, now: Instant) -> bool {
        !self.paused && self.elapsed(now) < self.stream_duration
    }

    fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stream_start)
    }

    /// Advances the pointer one step if the stream is active. Returns `true`
    /// when the pointer entered a new segment on this tick.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_active(now) {
            return false;
        }
        self.pointer.tick(&self.partition)
    }

    /// Elapsed stream time as a percentage of the duration, clamped to `[0, 100]`.
    pub fn stream_progress(&self, now: Instant) -> f64 {
        let elapsed = self.elapsed(now);
        if elapsed >= self.stream_duration {
            return 100.0;
        }
        if elapsed.is_zero() {
            return 0.0;
        }
        (elapsed.as_secs_f64() / self.stream_duration.as_secs_f64() * 100.0).clamp(0.0, 100.0)
    }

    pub fn reset_stream(&mut self, now: Instant) {
        self.stream_start = now;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn current_segment(&self) -> Option<usize> {
        self.partition.segment_index_at_angle(self.pointer.angle())
    }

    pub fn current_segment_name(&self) -> Option<&str> {
        self.current_segment()
            .and_then(|i| self.partition.segment(i))
            .map(|s| s.name.as_str())
    }

    // ─── segment edits ────────────────────────────────────────────────────

    pub fn add_segment(&mut self, name: impl Into<String>, weight: f64) -> Result<usize, PartitionError> {
        self.partition.add_segment(name, weight)
    }

    pub fn update_segment(
        &mut self,
        index: usize,
        name: impl Into<String>,
        weight: f64,
    ) -> Result<(), PartitionError> {
        self.partition.update_segment(index, name, weight)
    }

    /// Removes a segment and keeps the selection pointing at the same
    /// segment (or clears it if that segment was the one removed).
    pub fn remove_segment(&mut self, index: usize) -> Result<Segment, PartitionError> {
        let removed = self.partition.remove_segment(index)?;
        self.selected = match self.selected {
            Some(sel) if sel == index => None,
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
        Ok(removed)
    }

    /// Removes the selected segment, if any.
    pub fn remove_selected(&mut self) -> Result<Option<Segment>, PartitionError> {
        match self.selected {
            Some(index) => self.remove_segment(index).map(Some),
            None => Ok(None),
        }
    }

    pub fn normalize(&mut self) {
        self.partition.normalize();
    }

    pub fn select_segment(&mut self, index: usize) -> Result<(), PartitionError> {
        if index >= self.partition.len() {
            return Err(PartitionError::IndexOutOfRange {
                index,
                len: self.partition.len(),
            });
        }
        self.selected = Some(index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Segment under a point, if the point lies inside the wheel.
    pub fn segment_at_point(&self, x: f64, y: f64) -> Option<usize> {
        let (cx, cy) = self.pointer.center();
        let (dx, dy) = (x - cx, y - cy);
        if dx.hypot(dy) > self.radius {
            return None;
        }
        self.partition.segment_index_at_angle(dy.atan2(dx))
    }

    // ─── pointer input ────────────────────────────────────────────────────

    /// Pointer-down. Grabs the pointer tip if hit, otherwise selects the
    /// segment under the point (or clears the selection).
    pub fn press(&mut self, x: f64, y: f64) -> bool {
        if self.pointer.press(x, y) {
            return true;
        }
        self.selected = self.segment_at_point(x, y);
        false
    }

    pub fn drag_to(&mut self, x: f64, y: f64) {
        self.pointer.drag_to(x, y);
    }

    pub fn release(&mut self) {
        self.pointer.release(&self.partition);
    }

    // ─── snapshot ─────────────────────────────────────────────────────────

    pub fn build_snapshot(&self, now: Instant) -> WheelSnapshot {
        let score = self.pointer.attention_score();
        let tasks = self
            .partition
            .segments()
            .iter()
            .map(|s| TaskShare {
                name: s.name.clone(),
                percentage: s.weight,
            })
            .collect();

        WheelSnapshot {
            attention_wheel: WheelReport {
                total_duration: self.stream_duration.as_secs_f64(),
                attention_score: score,
                is_fatigued: score < 50.0,
                current_task: self.current_segment_name().unwrap_or_default().to_string(),
                rotation_angle: self.pointer.angle().to_degrees(),
                pointer_length: self.pointer.length(),
                stream_progress: self.stream_progress(now),
                tasks,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel(now: Instant) -> WheelState {
        WheelState::new(WheelConfig::default(), now).unwrap()
    }

    #[test]
    fn progress_is_clamped() {
        let t0 = Instant::now();
        let w = wheel(t0);
        let d = w.stream_duration();

        assert_eq!(w.stream_progress(t0), 0.0);
        assert!((w.stream_progress(t0 + d / 4) - 25.0).abs() < 1e-9);
        assert_eq!(w.stream_progress(t0 + d), 100.0);
        assert_eq!(w.stream_progress(t0 + d * 3), 100.0);

        // A clock reading before the start clamps to zero.
        let mut later = wheel(t0);
        later.reset_stream(t0 + Duration::from_secs(10));
        assert_eq!(later.stream_progress(t0), 0.0);
    }

    #[test]
    fn reset_stream_leaves_pointer_and_segments() {
        let t0 = Instant::now();
        let mut w = wheel(t0);
        for i in 0..10 {
            w.tick(t0 + Duration::from_millis(i));
        }
        let angle = w.pointer().angle();
        let len = w.pointer().length();

        let t1 = t0 + Duration::from_secs(60);
        w.reset_stream(t1);
        assert_eq!(w.stream_progress(t1), 0.0);
        assert_eq!(w.pointer().angle(), angle);
        assert_eq!(w.pointer().length(), len);
        assert_eq!(w.partition().len(), 5);
    }

    #[test]
    fn tick_only_advances_while_active() {
        let t0 = Instant::now();
        let mut w = wheel(t0);

        w.pause();
        w.tick(t0);
        assert_eq!(w.pointer().angle(), 0.0);

        w.resume();
        w.tick(t0);
        assert!(w.pointer().angle() > 0.0);

        let ended = t0 + w.stream_duration();
        let angle = w.pointer().angle();
        assert!(!w.is_active(ended));
        w.tick(ended);
        assert_eq!(w.pointer().angle(), angle);
    }

    #[test]
    fn removing_selected_segment_clears_selection() {
        let t0 = Instant::now();
        let mut w = wheel(t0);

        w.select_segment(2).unwrap();
        w.remove_segment(0).unwrap();
        assert_eq!(w.selected_segment(), Some(1));

        let removed = w.remove_selected().unwrap().unwrap();
        assert_eq!(removed.name, "Story 2");
        assert_eq!(w.selected_segment(), None);
        assert_eq!(w.remove_selected().unwrap(), None);

        assert!(w.select_segment(10).is_err());
    }

    #[test]
    fn press_selects_segment_or_grabs_tip() {
        let t0 = Instant::now();
        let mut w = wheel(t0);

        // 90° lies in "Story 1" (36°..144°).
        assert!(!w.press(400.0, 350.0));
        assert_eq!(w.selected_segment(), Some(1));

        // Outside the wheel clears the selection.
        assert!(!w.press(10.0, 10.0));
        assert_eq!(w.selected_segment(), None);

        // Tip sits at (550, 250).
        assert!(w.press(550.0, 250.0));
        assert!(w.pointer().is_dragging());
        w.drag_to(400.0, 330.0);
        assert!((w.pointer().length() - 80.0).abs() < 1e-9);
        w.release();
        assert!(!w.pointer().is_dragging());
    }

    #[test]
    fn snapshot_reflects_state() {
        let t0 = Instant::now();
        let w = wheel(t0);
        let snap = w.build_snapshot(t0 + Duration::from_secs(120));
        let r = &snap.attention_wheel;

        assert_eq!(r.total_duration, 1200.0);
        assert_eq!(r.attention_score, 100.0);
        assert!(!r.is_fatigued);
        assert_eq!(r.current_task, "Stream Opening");
        assert_eq!(r.rotation_angle, 0.0);
        assert_eq!(r.pointer_length, 150.0);
        assert!((r.stream_progress - 10.0).abs() < 1e-9);
        assert_eq!(r.tasks.len(), 5);
        assert_eq!(r.tasks[1].name, "Story 1");
        assert_eq!(r.tasks[1].percentage, 30.0);
    }

    #[test]
    fn snapshot_on_empty_partition_is_defined() {
        let t0 = Instant::now();
        let cfg = WheelConfig::default().with_segments(Vec::new());
        let mut w = WheelState::new(cfg, t0).unwrap();
        w.tick(t0);

        let snap = w.build_snapshot(t0);
        assert_eq!(snap.attention_wheel.current_task, "");
        assert!(snap.attention_wheel.tasks.is_empty());
        assert_eq!(snap.attention_wheel.attention_score, 100.0);
    }

    #[test]
    fn invalid_config_segment_is_rejected() {
        let cfg = WheelConfig::default().with_segments(vec![Segment {
            name: "bad".into(),
            weight: 0.0,
        }]);
        assert!(WheelState::new(cfg, Instant::now()).is_err());
    }

    #[test]
    fn dropping_pointer_in_another_segment_does_not_snap_back() {
        let t0 = Instant::now();
        let mut w = wheel(t0);

        assert!(w.press(550.0, 250.0));
        // Straight down from the center: 90°, inside "Story 1".
        w.drag_to(400.0, 350.0);
        w.release();
        assert_eq!(w.pointer().last_segment(), Some(1));

        assert!(!w.tick(t0));
        assert!((w.pointer().length() - 99.9).abs() < 1e-9);
        assert_eq!(w.current_segment_name(), Some("Story 1"));
    }

    #[test]
    fn normalize_rescales_reported_percentages() {
        let t0 = Instant::now();
        let cfg = WheelConfig::default().with_segments(vec![
            Segment::new("intro", 1.0).unwrap(),
            Segment::new("main", 3.0).unwrap(),
        ]);
        let mut w = WheelState::new(cfg, t0).unwrap();

        let before = w.build_snapshot(t0);
        assert_eq!(before.attention_wheel.tasks[1].percentage, 3.0);

        w.normalize();
        let after = w.build_snapshot(t0);
        assert!((after.attention_wheel.tasks[0].percentage - 25.0).abs() < 1e-9);
        assert!((after.attention_wheel.tasks[1].percentage - 75.0).abs() < 1e-9);
        assert_eq!(after.attention_wheel.current_task, "intro");
    }

    #[test]
    fn clear_selection_and_pause_flags() {
        let t0 = Instant::now();
        let mut w = wheel(t0);

        w.select_segment(3).unwrap();
        w.clear_selection();
        assert_eq!(w.selected_segment(), None);
        assert_eq!(w.partition().len(), 5);

        assert!(!w.is_paused());
        w.pause();
        assert!(w.is_paused());
        assert!(!w.is_active(t0));
        w.resume();
        assert!(!w.is_paused());
        assert!(w.is_active(t0));
    }
}
