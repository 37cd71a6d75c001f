use std::sync::Arc;

use parking_lot::Mutex;

use crate::state::{ColorKind, ShapeKind};

/// A request queued for the next frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlChange {
    Shape(ShapeKind),
    Color(ColorKind),
    Zoom(f32),
    Resize { width: u32, height: u32 },
}

/// Cloneable handle for queueing changes from outside the frame loop.
///
/// Requests are kept in arrival order and the renderer drains them at the
/// start of each frame, so nothing changes in the middle of a frame.
#[derive(Debug, Default)]
pub struct Controls {
    pending: Arc<Mutex<Vec<ControlChange>>>,
}

impl Clone for Controls {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, change: ControlChange) {
        self.pending.lock().push(change);
    }

    pub fn set_shape(&self, shape: ShapeKind) {
        self.push(ControlChange::Shape(shape));
    }

    pub fn set_color(&self, color: ColorKind) {
        self.push(ControlChange::Color(color));
    }

    /// Unknown names queue red.
    pub fn set_color_name(&self, name: &str) {
        self.set_color(ColorKind::from_name(name));
    }

    pub fn adjust_zoom(&self, delta: f32) {
        self.push(ControlChange::Zoom(delta));
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.push(ControlChange::Resize { width, height });
    }

    pub fn drain(&self) -> Vec<ControlChange> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}
