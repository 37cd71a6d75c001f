use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::state::{CameraState, ColorKind, Material, ShapeKind};

/// Tunable constants consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub shape: ShapeKind,
    pub color: ColorKind,
    pub glow_intensity: f32,
    pub bloom_threshold: f32,
    pub bloom_strength: f32,
    /// Radians added to each rotation axis every frame.
    pub rotation_step: Vec3,
    pub camera_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub light_position: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub sphere_segments: (u32, u32),
    pub cylinder_segments: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Cube,
            color: ColorKind::Red,
            glow_intensity: 1.5,
            bloom_threshold: 0.5,
            bloom_strength: 1.0,
            rotation_step: Vec3::new(0.007, 0.01, 0.003),
            camera_distance: 5.0,
            min_distance: 1.5,
            max_distance: 20.0,
            light_position: Vec3::new(2.0, 2.0, 2.0),
            fov: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 100.0,
            sphere_segments: (32, 16),
            cylinder_segments: 32,
        }
    }
}

impl RenderSettings {
    /// Parses a `<settings>` document. Missing tags keep their defaults.
    ///
    /// ```xml
    /// <settings>
    ///     <shape>sphere</shape>
    ///     <color>cyan</color>
    ///     <bloom-threshold>0.4</bloom-threshold>
    ///     <rotation-step>0 0.02 0</rotation-step>
    ///     <fov>60</fov>
    /// </settings>
    /// ```
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid settings XML")?;
        let root = document.root_element();
        if !root.has_tag_name("settings") {
            bail!("expected <settings> root element, found <{}>", root.tag_name().name());
        }

        let defaults = Self::default();
        let settings = Self {
            shape: match optional_text(&root, "shape") {
                Some(name) => name.parse()?,
                None => defaults.shape,
            },
            color: optional_text(&root, "color")
                .map(|name| ColorKind::from_name(&name))
                .unwrap_or(defaults.color),
            glow_intensity: parse_f32(&root, "glow-intensity", defaults.glow_intensity)?,
            bloom_threshold: parse_f32(&root, "bloom-threshold", defaults.bloom_threshold)?,
            bloom_strength: parse_f32(&root, "bloom-strength", defaults.bloom_strength)?,
            rotation_step: parse_vec3(&root, "rotation-step", defaults.rotation_step)?,
            camera_distance: parse_f32(&root, "camera-distance", defaults.camera_distance)?,
            min_distance: parse_f32(&root, "min-distance", defaults.min_distance)?,
            max_distance: parse_f32(&root, "max-distance", defaults.max_distance)?,
            light_position: parse_vec3(&root, "light-position", defaults.light_position)?,
            fov: parse_f32(&root, "fov", defaults.fov.to_degrees())?.to_radians(),
            near: parse_f32(&root, "near", defaults.near)?,
            far: parse_f32(&root, "far", defaults.far)?,
            sphere_segments: parse_segments(&root, "sphere-segments", defaults.sphere_segments)?,
            cylinder_segments: parse_u32(&root, "cylinder-segments", defaults.cylinder_segments)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_distance > 0.0 && self.min_distance <= self.max_distance) {
            bail!(
                "camera range is empty: min {} max {}",
                self.min_distance,
                self.max_distance
            );
        }
        if !(self.min_distance..=self.max_distance).contains(&self.camera_distance) {
            bail!(
                "camera distance {} is outside [{}, {}]",
                self.camera_distance,
                self.min_distance,
                self.max_distance
            );
        }
        if !(self.near > 0.0 && self.far > self.near) {
            bail!("clip planes must satisfy 0 < near < far");
        }
        if !(self.fov > 0.0 && self.fov < std::f32::consts::PI) {
            bail!("field of view must be between 0 and 180 degrees");
        }
        Ok(())
    }

    pub fn material(&self) -> Material {
        Material {
            color: self.color.rgb(),
            glow_intensity: self.glow_intensity,
            bloom_threshold: self.bloom_threshold,
            bloom_strength: self.bloom_strength,
        }
    }

    pub fn camera(&self) -> CameraState {
        CameraState::new(self.camera_distance, self.min_distance, self.max_distance)
    }
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_f32(node: &Node<'_, '_>, tag: &str, default: f32) -> Result<f32> {
    match optional_text(node, tag) {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse <{tag}>: {err}")),
        None => Ok(default),
    }
}

fn parse_u32(node: &Node<'_, '_>, tag: &str, default: u32) -> Result<u32> {
    match optional_text(node, tag) {
        Some(value) => value
            .parse::<u32>()
            .map_err(|err| anyhow!("failed to parse <{tag}>: {err}")),
        None => Ok(default),
    }
}

fn parse_vec3(node: &Node<'_, '_>, tag: &str, default: Vec3) -> Result<Vec3> {
    let Some(value) = optional_text(node, tag) else {
        return Ok(default);
    };
    let components = value
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse <{tag}>"))?;
    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("<{tag}> needs exactly 3 components")),
    }
}

fn parse_segments(node: &Node<'_, '_>, tag: &str, default: (u32, u32)) -> Result<(u32, u32)> {
    let Some(value) = optional_text(node, tag) else {
        return Ok(default);
    };
    let mut parts = value.split_whitespace().map(str::parse::<u32>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(width)), Some(Ok(height)), None) => Ok((width, height)),
        _ => Err(anyhow!("<{tag}> needs two whole numbers")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <settings>
        <shape>Sphere</shape>
        <color>magenta</color>
        <bloom-threshold>0.35</bloom-threshold>
        <rotation-step>0 0.02 0</rotation-step>
        <camera-distance>8</camera-distance>
        <fov>60</fov>
        <sphere-segments>16 8</sphere-segments>
    </settings>
    "#;

    #[test]
    fn parse_overrides_and_keeps_defaults() {
        let settings = RenderSettings::from_xml(SAMPLE).unwrap();
        assert_eq!(settings.shape, ShapeKind::Sphere);
        assert_eq!(settings.color, ColorKind::Magenta);
        assert!((settings.bloom_threshold - 0.35).abs() < f32::EPSILON);
        assert_eq!(settings.rotation_step, Vec3::new(0.0, 0.02, 0.0));
        assert_eq!(settings.camera().base_distance(), 8.0);
        assert!((settings.fov - 60f32.to_radians()).abs() < 1e-6);
        assert_eq!(settings.sphere_segments, (16, 8));
        assert_eq!(settings.glow_intensity, 1.5);
        assert_eq!(settings.cylinder_segments, 32);
    }

    #[test]
    fn unknown_color_in_settings_is_red() {
        let settings =
            RenderSettings::from_xml("<settings><color>chartreuse</color></settings>").unwrap();
        assert_eq!(settings.material().color, Vec3::new(1.0, 0.1, 0.1));
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(RenderSettings::from_xml("<config/>").is_err());
        assert!(RenderSettings::from_xml("<settings><shape>torus</shape></settings>").is_err());
        for document in [
            "<settings><bloom-strength>lots</bloom-strength></settings>",
            "<settings><rotation-step>1 2</rotation-step></settings>",
            "<settings><camera-distance>40</camera-distance></settings>",
        ] {
            assert!(RenderSettings::from_xml(document).is_err(), "{document}");
        }
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = RenderSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.material(), Material::default());
    }
}
