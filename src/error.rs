use thiserror::Error;

use crate::mesh::MeshError;
use crate::render::ShaderStage;

/// Failures reported by a [`GraphicsContext`](crate::render::GraphicsContext).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GpuError {
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    ProgramLink { log: String },
    #[error("framebuffer is incomplete (status 0x{status:04x})")]
    FramebufferIncomplete { status: u32 },
    #[error("GPU error 0x{code:04x} during {operation}")]
    Driver { code: u32, operation: &'static str },
    #[error("failed to allocate {0}")]
    Allocation(&'static str),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown shape {0:?}")]
    UnknownShape(String),
    #[error("missing shader source `{0}`")]
    MissingShaderSource(String),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}
