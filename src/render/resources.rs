use log::debug;

use crate::error::GpuError;
use crate::mesh::Mesh;

use super::gpu::{GraphicsContext, ShaderStage};

/// Vertex and index buffers for one uploaded mesh.
pub struct GpuMesh<G: GraphicsContext> {
    pub vertices: G::Buffer,
    pub indices: G::Buffer,
    pub index_count: u32,
}

impl<G: GraphicsContext> GpuMesh<G> {
    pub fn upload(gpu: &mut G, mesh: &Mesh) -> Result<Self, GpuError> {
        let vertices = gpu.create_vertex_buffer(&mesh.vertices)?;
        let indices = match gpu.create_index_buffer(&mesh.indices) {
            Ok(indices) => indices,
            Err(err) => {
                gpu.delete_buffer(vertices);
                return Err(err);
            }
        };
        Ok(Self {
            vertices,
            indices,
            index_count: mesh.index_count(),
        })
    }

    pub fn release(self, gpu: &mut G) {
        gpu.delete_buffer(self.vertices);
        gpu.delete_buffer(self.indices);
    }
}

/// Compiles both stages and links them. The shader objects are released
/// whether or not linking succeeds.
pub fn build_program<G: GraphicsContext>(
    gpu: &mut G,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<G::Program, GpuError> {
    let vertex = gpu.compile_shader(ShaderStage::Vertex, vertex_source)?;
    let program = link_with(gpu, &vertex, fragment_source);
    gpu.delete_shader(vertex);
    program
}

/// Links an already compiled vertex shader against a fragment source.
pub fn link_with<G: GraphicsContext>(
    gpu: &mut G,
    vertex: &G::Shader,
    fragment_source: &str,
) -> Result<G::Program, GpuError> {
    let fragment = gpu.compile_shader(ShaderStage::Fragment, fragment_source)?;
    let program = gpu.link_program(vertex, &fragment);
    gpu.delete_shader(fragment);
    program
}

/// A colour texture and the framebuffer rendering into it.
pub struct RenderTarget<G: GraphicsContext> {
    pub texture: G::Texture,
    pub framebuffer: G::Framebuffer,
    width: u32,
    height: u32,
}

impl<G: GraphicsContext> RenderTarget<G> {
    pub fn new(gpu: &mut G, width: u32, height: u32) -> Result<Self, GpuError> {
        let texture = gpu.create_texture(width, height)?;
        match gpu.create_framebuffer(&texture) {
            Ok(framebuffer) => Ok(Self {
                texture,
                framebuffer,
                width,
                height,
            }),
            Err(err) => {
                gpu.delete_texture(texture);
                Err(err)
            }
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn release(self, gpu: &mut G) {
        gpu.delete_framebuffer(self.framebuffer);
        gpu.delete_texture(self.texture);
    }
}

/// The four off-screen targets of the bloom chain, all sized to the surface.
pub struct RenderTargets<G: GraphicsContext> {
    /// Lit scene.
    pub scene: RenderTarget<G>,
    /// Pixels above the bloom threshold.
    pub bright: RenderTarget<G>,
    pub blur_horizontal: RenderTarget<G>,
    pub blur_vertical: RenderTarget<G>,
}

impl<G: GraphicsContext> RenderTargets<G> {
    /// Allocates all four targets or none of them.
    pub fn allocate(gpu: &mut G, width: u32, height: u32) -> Result<Self, GpuError> {
        let scene = RenderTarget::new(gpu, width, height)?;
        let bright = match RenderTarget::new(gpu, width, height) {
            Ok(target) => target,
            Err(err) => {
                scene.release(gpu);
                return Err(err);
            }
        };
        let blur_horizontal = match RenderTarget::new(gpu, width, height) {
            Ok(target) => target,
            Err(err) => {
                scene.release(gpu);
                bright.release(gpu);
                return Err(err);
            }
        };
        let blur_vertical = match RenderTarget::new(gpu, width, height) {
            Ok(target) => target,
            Err(err) => {
                scene.release(gpu);
                bright.release(gpu);
                blur_horizontal.release(gpu);
                return Err(err);
            }
        };

        debug!("allocated render targets at {width}x{height}");
        Ok(Self {
            scene,
            bright,
            blur_horizontal,
            blur_vertical,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        self.scene.size()
    }

    pub fn all(&self) -> [&RenderTarget<G>; 4] {
        [
            &self.scene,
            &self.bright,
            &self.blur_horizontal,
            &self.blur_vertical,
        ]
    }

    pub fn release(self, gpu: &mut G) {
        self.scene.release(gpu);
        self.bright.release(gpu);
        self.blur_horizontal.release(gpu);
        self.blur_vertical.release(gpu);
    }
}
