//! GPU side of the renderer: the context abstraction, its backends and the
//! passes built on top of it.

mod bloom;
mod gpu;
pub mod headless;
mod renderer;
mod resources;
mod scene;
#[cfg(target_arch = "wasm32")]
mod webgl;

pub use bloom::BloomPipeline;
pub use gpu::{Capability, GraphicsContext, ShaderStage, Uniform, VertexAttribute, VertexLayout};
pub use headless::HeadlessGpu;
pub use renderer::{FrameOutcome, FrameStats, Renderer};
pub use resources::{build_program, link_with, GpuMesh, RenderTarget, RenderTargets};
pub use scene::{SceneRenderer, SceneUniforms};
#[cfg(target_arch = "wasm32")]
pub use webgl::WebGlContext;
