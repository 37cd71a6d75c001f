//! Renderer for a single rotating neon primitive with a bloom post-process.
//!
//! The pipeline is written against [`GraphicsContext`], so the same frame
//! driver runs on a WebGL canvas in the browser and on the recording
//! [`HeadlessGpu`] used by the command-line tool and the tests.

pub mod controls;
pub mod error;
pub mod mesh;
pub mod render;
pub mod settings;
pub mod shaders;
pub mod state;
pub mod transform;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use controls::{ControlChange, Controls};
pub use error::{GpuError, RenderError};
pub use mesh::{Mesh, MeshError};
pub use render::{FrameOutcome, FrameStats, GraphicsContext, HeadlessGpu, Renderer};
pub use settings::RenderSettings;
pub use shaders::ShaderSourceBundle;
pub use state::{CameraState, ColorKind, Material, RotationState, ShapeKind};
