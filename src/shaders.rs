use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::RenderError;

/// Source names and the file each one is loaded from.
pub const SHADER_FILES: [(&str, &str); 6] = [
    ("vertex", "vertex.glsl"),
    ("fragment", "fragment.glsl"),
    ("bloomVertex", "bloom-vertex.glsl"),
    ("bloomFragment", "bloom-fragment.glsl"),
    ("blur", "blur.glsl"),
    ("composite", "composite.glsl"),
];

/// The six GLSL sources the renderer is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSourceBundle {
    pub vertex: String,
    pub fragment: String,
    /// Shared by the bright-pass, blur and composite programs.
    pub bloom_vertex: String,
    pub bloom_fragment: String,
    pub blur: String,
    pub composite: String,
}

impl ShaderSourceBundle {
    /// Sources compiled into the crate.
    pub fn builtin() -> Self {
        Self {
            vertex: include_str!("../shaders/vertex.glsl").to_string(),
            fragment: include_str!("../shaders/fragment.glsl").to_string(),
            bloom_vertex: include_str!("../shaders/bloom-vertex.glsl").to_string(),
            bloom_fragment: include_str!("../shaders/bloom-fragment.glsl").to_string(),
            blur: include_str!("../shaders/blur.glsl").to_string(),
            composite: include_str!("../shaders/composite.glsl").to_string(),
        }
    }

    /// Builds a bundle from `(name, source)` pairs. Later duplicates win.
    pub fn from_named<I, K, V>(sources: I) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut slots: [Option<String>; 6] = Default::default();
        for (name, source) in sources {
            if let Some(index) = SHADER_FILES
                .iter()
                .position(|(known, _)| *known == name.as_ref())
            {
                slots[index] = Some(source.into());
            } else {
                log::debug!("ignoring unknown shader source `{}`", name.as_ref());
            }
        }

        let [vertex, fragment, bloom_vertex, bloom_fragment, blur, composite] = slots;
        let take = |slot: Option<String>, index: usize| {
            slot.ok_or_else(|| RenderError::MissingShaderSource(SHADER_FILES[index].0.to_string()))
        };
        Ok(Self {
            vertex: take(vertex, 0)?,
            fragment: take(fragment, 1)?,
            bloom_vertex: take(bloom_vertex, 2)?,
            bloom_fragment: take(bloom_fragment, 3)?,
            blur: take(blur, 4)?,
            composite: take(composite, 5)?,
        })
    }

    /// Loads every file in [`SHADER_FILES`] from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut sources = Vec::with_capacity(SHADER_FILES.len());
        for (name, file) in SHADER_FILES {
            let path = dir.join(file);
            let source = fs::read_to_string(&path)
                .with_context(|| format!("failed to read shader {}", path.display()))?;
            sources.push((name, source));
        }
        Ok(Self::from_named(sources)?)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "vertex" => Some(&self.vertex),
            "fragment" => Some(&self.fragment),
            "bloomVertex" => Some(&self.bloom_vertex),
            "bloomFragment" => Some(&self.bloom_fragment),
            "blur" => Some(&self.blur),
            "composite" => Some(&self.composite),
            _ => None,
        }
    }
}
