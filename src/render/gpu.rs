use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GpuError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// Pipeline state toggled between the scene pass and the full-screen passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
    /// Standard `src_alpha, 1 - src_alpha` blending.
    Blend,
}

/// Value for a named uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    /// Column-major.
    Mat4([f32; 16]),
}

/// A float attribute inside an interleaved vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub components: i32,
    /// Byte offset from the start of the vertex.
    pub offset: i32,
}

/// Interleaved float layout shared by every vertex in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: i32,
    pub attributes: &'static [VertexAttribute],
}

impl VertexLayout {
    /// `a_position` + `a_normal`, 24 bytes per vertex.
    pub const LIT: Self = Self {
        stride: 24,
        attributes: &[
            VertexAttribute {
                name: "a_position",
                components: 3,
                offset: 0,
            },
            VertexAttribute {
                name: "a_normal",
                components: 3,
                offset: 12,
            },
        ],
    };

    /// `a_position` + `a_texCoord`, 16 bytes per vertex.
    pub const QUAD: Self = Self {
        stride: 16,
        attributes: &[
            VertexAttribute {
                name: "a_position",
                components: 2,
                offset: 0,
            },
            VertexAttribute {
                name: "a_texCoord",
                components: 2,
                offset: 8,
            },
        ],
    };
}

/// The GPU commands the renderer issues, in WebGL terms.
///
/// Handles are owned by the caller and released through the matching
/// `delete_*` method. Implementations report failures instead of leaving the
/// pipeline in an unknown state: a failed compile, link, framebuffer bind or
/// draw always comes back as a [`GpuError`].
pub trait GraphicsContext {
    type Shader;
    type Program;
    type Buffer;
    type Texture;
    type Framebuffer;

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<Self::Shader, GpuError>;
    fn link_program(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, GpuError>;
    fn delete_shader(&mut self, shader: Self::Shader);
    fn delete_program(&mut self, program: Self::Program);

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<Self::Buffer, GpuError>;
    fn create_index_buffer(&mut self, data: &[u16]) -> Result<Self::Buffer, GpuError>;
    fn delete_buffer(&mut self, buffer: Self::Buffer);

    /// RGBA8 colour texture with linear filtering and clamp-to-edge wrapping.
    fn create_texture(&mut self, width: u32, height: u32) -> Result<Self::Texture, GpuError>;
    fn delete_texture(&mut self, texture: Self::Texture);
    /// Framebuffer with `texture` as its only (colour) attachment.
    fn create_framebuffer(
        &mut self,
        texture: &Self::Texture,
    ) -> Result<Self::Framebuffer, GpuError>;
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);

    /// Binds an off-screen target, or the visible surface for `None`, and
    /// checks that it is complete.
    fn bind_framebuffer(&mut self, target: Option<&Self::Framebuffer>) -> Result<(), GpuError>;
    /// Resizes the visible drawing surface.
    fn resize_surface(&mut self, width: u32, height: u32);
    fn set_viewport(&mut self, width: u32, height: u32);
    fn set_clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, color: bool, depth: bool);
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    fn use_program(&mut self, program: &Self::Program) -> Result<(), GpuError>;
    /// Sets a uniform on the program currently in use. Unknown names are ignored.
    fn set_uniform(&mut self, program: &Self::Program, name: &str, value: Uniform);
    fn bind_texture(&mut self, unit: u32, texture: &Self::Texture);
    fn draw_indexed(
        &mut self,
        program: &Self::Program,
        vertices: &Self::Buffer,
        indices: &Self::Buffer,
        layout: &VertexLayout,
        index_count: u32,
    ) -> Result<(), GpuError>;

    /// Called once at the start of every frame.
    fn begin_frame(&mut self) {}
}
