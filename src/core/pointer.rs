#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::partition::TaskPartition;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointerConfig {
    pub min_length: f64,
    pub max_length: f64,

    // Radians added per autonomous tick.
    pub rotation_speed: f64,
    // Length lost per autonomous tick.
    pub shrink_speed: f64,

    // Pointer-down within this distance of the tip starts a drag.
    pub hit_radius: f64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            min_length: 0.0,
            max_length: 150.0,
            rotation_speed: 0.001,
            shrink_speed: 0.1,
            hit_radius: 15.0,
        }
    }
}

impl PointerConfig {
    pub fn with_lengths(mut self, min_length: f64, max_length: f64) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    pub fn with_speeds(mut self, rotation_speed: f64, shrink_speed: f64) -> Self {
        self.rotation_speed = rotation_speed;
        self.shrink_speed = shrink_speed;
        self
    }
}

/// Who is currently driving the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointerMode {
    #[default]
    Autonomous,
    Dragging,
}

/// A rotating vector whose length stands in for attention.
///
/// Two modes, switched only by [`press`](Self::press) and
/// [`release`](Self::release):
/// - `Autonomous`: every [`tick`](Self::tick) rotates by `rotation_speed` and
///   shrinks by `shrink_speed` down to `min_length`. Entering a new segment
///   restores `max_length`.
/// - `Dragging`: ticks are ignored; [`drag_to`](Self::drag_to) sets angle and
///   length directly from the input position.
#[derive(Debug, Clone)]
pub struct AttentionPointer {
    cfg: PointerConfig,
    center_x: f64,
    center_y: f64,
    angle: f64,
    length: f64,
    mode: PointerMode,
    last_segment: Option<usize>,
}

impl AttentionPointer {
    pub fn new(center_x: f64, center_y: f64, cfg: PointerConfig) -> Self {
        Self {
            cfg,
            center_x,
            center_y,
            angle: 0.0,
            length: cfg.max_length,
            mode: PointerMode::Autonomous,
            last_segment: Some(0),
        }
    }

    pub fn config(&self) -> &PointerConfig {
        &self.cfg
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    /// Unwrapped angle in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn mode(&self) -> PointerMode {
        self.mode
    }

    pub fn is_dragging(&self) -> bool {
        self.mode == PointerMode::Dragging
    }

    pub fn last_segment(&self) -> Option<usize> {
        self.last_segment
    }

    pub fn tip_position(&self) -> (f64, f64) {
        (
            self.center_x + self.angle.cos() * self.length,
            self.center_y + self.angle.sin() * self.length,
        )
    }

    /// Length mapped linearly from `[min_length, max_length]` onto `[0, 100]`.
    pub fn attention_score(&self) -> f64 {
        let span = self.cfg.max_length - self.cfg.min_length;
        if span <= 0.0 {
            return 100.0;
        }
        ((self.length - self.cfg.min_length) / span * 100.0).clamp(0.0, 100.0)
    }

    pub fn is_fatigued(&self) -> bool {
        self.attention_score() < 50.0
    }

    /// One autonomous step. Returns `true` when a segment boundary was
    /// crossed (and the length restored). No-op while dragging.
    pub fn tick(&mut self, partition: &TaskPartition) -> bool {
        if self.mode != PointerMode::Autonomous {
            return false;
        }

        self.angle += self.cfg.rotation_speed;
        self.length = (self.length - self.cfg.shrink_speed).max(self.cfg.min_length);

        let current = partition.segment_index_at_angle(self.angle);
        if current != self.last_segment {
            self.length = self.cfg.max_length;
            self.last_segment = current;
            return true;
        }
        false
    }

    /// Pointer-down at `(x, y)`. Enters `Dragging` if the position is within
    /// `hit_radius` of the tip.
    pub fn press(&mut self, x: f64, y: f64) -> bool {
        let (tx, ty) = self.tip_position();
        if (x - tx).hypot(y - ty) < self.cfg.hit_radius {
            self.mode = PointerMode::Dragging;
            return true;
        }
        false
    }

    /// Pointer-move while dragging. Ignored in autonomous mode.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        if self.mode != PointerMode::Dragging {
            return;
        }
        let dx = x - self.center_x;
        let dy = y - self.center_y;
        self.angle = dy.atan2(dx);
        self.length = dx.hypot(dy).clamp(self.cfg.min_length, self.cfg.max_length);
    }

    /// Pointer-up. Autonomous motion resumes from the current angle/length;
    /// the segment the pointer was dropped on counts as already entered.
    pub fn release(&mut self, partition: &TaskPartition) {
        if self.mode != PointerMode::Dragging {
            return;
        }
        self.mode = PointerMode::Autonomous;
        self.last_segment = partition.segment_index_at_angle(self.angle);
    }
}
