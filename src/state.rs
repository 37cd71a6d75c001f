use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Primitive drawn by the scene pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Cube,
    Sphere,
    Cylinder,
    Pyramid,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [Self::Cube, Self::Sphere, Self::Cylinder, Self::Pyramid];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Sphere => "sphere",
            Self::Cylinder => "cylinder",
            Self::Pyramid => "pyramid",
        }
    }
}

impl FromStr for ShapeKind {
    type Err = RenderError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|shape| shape.name() == normalized)
            .ok_or_else(|| RenderError::UnknownShape(name.to_string()))
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named neon palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorKind {
    #[default]
    Red,
    Green,
    Blue,
    Cyan,
    Magenta,
    Yellow,
}

impl ColorKind {
    pub const ALL: [ColorKind; 6] = [
        Self::Red,
        Self::Green,
        Self::Blue,
        Self::Cyan,
        Self::Magenta,
        Self::Yellow,
    ];

    /// Resolves a palette name. Anything unrecognized becomes [`ColorKind::Red`].
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase();
        match Self::ALL.into_iter().find(|color| color.name() == normalized) {
            Some(color) => color,
            None => {
                log::debug!("unknown color {name:?}, using red");
                Self::Red
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Cyan => "cyan",
            Self::Magenta => "magenta",
            Self::Yellow => "yellow",
        }
    }

    pub fn rgb(self) -> Vec3 {
        match self {
            Self::Red => Vec3::new(1.0, 0.1, 0.1),
            Self::Green => Vec3::new(0.1, 1.0, 0.1),
            Self::Blue => Vec3::new(0.1, 0.1, 1.0),
            Self::Cyan => Vec3::new(0.1, 1.0, 1.0),
            Self::Magenta => Vec3::new(1.0, 0.1, 1.0),
            Self::Yellow => Vec3::new(1.0, 1.0, 0.1),
        }
    }
}

impl fmt::Display for ColorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Camera sitting on the +Z axis looking at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: Vec3,
    base_distance: f32,
    min_distance: f32,
    max_distance: f32,
}

impl CameraState {
    /// `distance` is clamped into `[min_distance, max_distance]`.
    pub fn new(distance: f32, min_distance: f32, max_distance: f32) -> Self {
        let (min_distance, max_distance) = if min_distance <= max_distance {
            (min_distance, max_distance)
        } else {
            (max_distance, min_distance)
        };
        let base_distance = distance.max(min_distance).min(max_distance);
        Self {
            position: Vec3::new(0.0, 0.0, base_distance),
            base_distance,
            min_distance,
            max_distance,
        }
    }

    pub fn adjust_zoom(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        self.base_distance = (self.base_distance + delta)
            .max(self.min_distance)
            .min(self.max_distance);
        self.position.z = self.base_distance;
    }

    pub fn base_distance(&self) -> f32 {
        self.base_distance
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(5.0, 1.5, 20.0)
    }
}

/// Per-axis object rotation in radians, kept in `[0, 2π)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotationState {
    pub angles: Vec3,
}

impl RotationState {
    pub fn advance(&mut self, step: Vec3) {
        let next = self.angles + step;
        self.angles = Vec3::new(
            next.x.rem_euclid(TAU),
            next.y.rem_euclid(TAU),
            next.z.rem_euclid(TAU),
        );
    }
}

/// Uniforms shared by the scene and bloom passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: Vec3,
    pub glow_intensity: f32,
    pub bloom_threshold: f32,
    pub bloom_strength: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: ColorKind::Red.rgb(),
            glow_intensity: 1.5,
            bloom_threshold: 0.5,
            bloom_strength: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_names_round_trip_and_reject_unknown() {
        assert_eq!("Sphere".parse::<ShapeKind>().unwrap(), ShapeKind::Sphere);
        assert_eq!(" pyramid ".parse::<ShapeKind>().unwrap(), ShapeKind::Pyramid);
        let err = "torus".parse::<ShapeKind>().unwrap_err();
        assert!(matches!(err, RenderError::UnknownShape(ref name) if name == "torus"));
    }

    #[test]
    fn unknown_color_falls_back_to_red() {
        assert_eq!(ColorKind::from_name("unknown"), ColorKind::Red);
        assert_eq!(ColorKind::from_name("unknown").rgb(), ColorKind::from_name("red").rgb());
        assert_eq!(ColorKind::from_name("red").rgb(), Vec3::new(1.0, 0.1, 0.1));
        assert_eq!(ColorKind::from_name("CYAN"), ColorKind::Cyan);
    }

    #[test]
    fn zoom_clamps_to_minimum() {
        let mut camera = CameraState::new(5.0, 1.5, 20.0);
        camera.adjust_zoom(-100.0);
        assert_eq!(camera.base_distance(), 1.5);
        assert_eq!(camera.position.z, 1.5);
        camera.adjust_zoom(-100.0);
        assert_eq!(camera.base_distance(), 1.5);
    }

    #[test]
    fn zoom_stays_in_range_for_any_delta() {
        let mut camera = CameraState::default();
        for delta in [0.3, -7.0, 42.0, f32::MAX, -0.01, f32::NAN, -f32::INFINITY, 3.5] {
            camera.adjust_zoom(delta);
            assert!(camera.min_distance() <= camera.base_distance());
            assert!(camera.base_distance() <= camera.max_distance());
            assert_eq!(camera.position.z, camera.base_distance());
        }
    }

    #[test]
    fn camera_construction_clamps_distance() {
        let camera = CameraState::new(50.0, 1.5, 20.0);
        assert_eq!(camera.base_distance(), 20.0);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 20.0));
    }

    #[test]
    fn rotation_accumulates_fixed_steps() {
        let mut rotation = RotationState::default();
        for _ in 0..100 {
            rotation.advance(Vec3::new(0.0, 0.01, 0.0));
        }
        assert!((rotation.angles.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn rotation_wraps_at_full_turn() {
        let mut rotation = RotationState::default();
        for _ in 0..1000 {
            rotation.advance(Vec3::splat(0.01));
        }
        let expected = 10.0f32.rem_euclid(TAU);
        assert!((rotation.angles.x - expected).abs() < 1e-3);
        assert!(rotation.angles.max_element() < TAU);
    }
}
