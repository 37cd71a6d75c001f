use crate::error::GpuError;
use crate::mesh::create_quad;
use crate::shaders::ShaderSourceBundle;
use crate::state::Material;

use super::gpu::{Capability, GraphicsContext, ShaderStage, Uniform, VertexLayout};
use super::resources::{link_with, GpuMesh, RenderTarget, RenderTargets};

/// Bright-pass extraction, two-pass separable blur and additive composite.
///
/// The three programs share one compiled `bloomVertex` shader and draw the
/// same full-screen quad.
pub struct BloomPipeline<G: GraphicsContext> {
    bright: G::Program,
    blur: G::Program,
    composite: G::Program,
    quad: GpuMesh<G>,
}

impl<G: GraphicsContext> BloomPipeline<G> {
    pub fn new(gpu: &mut G, sources: &ShaderSourceBundle) -> Result<Self, GpuError> {
        let vertex = gpu.compile_shader(ShaderStage::Vertex, &sources.bloom_vertex)?;
        let programs = link_all(gpu, &vertex, sources);
        gpu.delete_shader(vertex);
        let (bright, blur, composite) = programs?;

        match GpuMesh::upload(gpu, &create_quad()) {
            Ok(quad) => Ok(Self {
                bright,
                blur,
                composite,
                quad,
            }),
            Err(err) => {
                gpu.delete_program(bright);
                gpu.delete_program(blur);
                gpu.delete_program(composite);
                Err(err)
            }
        }
    }

    pub fn programs(&self) -> [&G::Program; 3] {
        [&self.bright, &self.blur, &self.composite]
    }

    /// Runs every post-process pass. `targets.scene` must already hold the
    /// rendered scene; the result lands on the visible surface.
    pub fn apply(
        &self,
        gpu: &mut G,
        targets: &RenderTargets<G>,
        material: &Material,
    ) -> Result<(), GpuError> {
        self.extract(gpu, targets, material)?;
        self.blur(gpu, targets)?;
        self.composite(gpu, targets, material)
    }

    /// Keeps the pixels of the scene brighter than the bloom threshold.
    pub fn extract(
        &self,
        gpu: &mut G,
        targets: &RenderTargets<G>,
        material: &Material,
    ) -> Result<(), GpuError> {
        let program = &self.bright;
        begin_pass(gpu, Some(&targets.bright))?;
        gpu.use_program(program)?;
        gpu.set_uniform(program, "u_texture", Uniform::Int(0));
        gpu.set_uniform(program, "u_resolution", resolution(targets));
        gpu.set_uniform(program, "u_bloomThreshold", Uniform::Float(material.bloom_threshold));
        gpu.bind_texture(0, &targets.scene.texture);
        self.draw_quad(gpu, program)
    }

    /// Horizontal then vertical Gaussian blur of the bright target.
    pub fn blur(&self, gpu: &mut G, targets: &RenderTargets<G>) -> Result<(), GpuError> {
        let passes = [
            (&targets.bright, &targets.blur_horizontal, [1.0, 0.0]),
            (&targets.blur_horizontal, &targets.blur_vertical, [0.0, 1.0]),
        ];
        let program = &self.blur;
        for (source, destination, direction) in passes {
            begin_pass(gpu, Some(destination))?;
            gpu.use_program(program)?;
            gpu.set_uniform(program, "u_texture", Uniform::Int(0));
            gpu.set_uniform(program, "u_resolution", resolution(targets));
            gpu.set_uniform(program, "u_direction", Uniform::Vec2(direction));
            gpu.bind_texture(0, &source.texture);
            self.draw_quad(gpu, program)?;
        }
        Ok(())
    }

    /// Adds the blurred highlights on top of the scene, onto the surface.
    pub fn composite(
        &self,
        gpu: &mut G,
        targets: &RenderTargets<G>,
        material: &Material,
    ) -> Result<(), GpuError> {
        let program = &self.composite;
        begin_pass(gpu, None)?;
        gpu.use_program(program)?;
        gpu.set_uniform(program, "u_scene", Uniform::Int(0));
        gpu.set_uniform(program, "u_bloom", Uniform::Int(1));
        gpu.set_uniform(program, "u_bloomStrength", Uniform::Float(material.bloom_strength));
        gpu.bind_texture(0, &targets.scene.texture);
        gpu.bind_texture(1, &targets.blur_vertical.texture);
        self.draw_quad(gpu, program)
    }

    fn draw_quad(&self, gpu: &mut G, program: &G::Program) -> Result<(), GpuError> {
        gpu.draw_indexed(
            program,
            &self.quad.vertices,
            &self.quad.indices,
            &VertexLayout::QUAD,
            self.quad.index_count,
        )
    }

    pub fn release(self, gpu: &mut G) {
        self.quad.release(gpu);
        gpu.delete_program(self.bright);
        gpu.delete_program(self.blur);
        gpu.delete_program(self.composite);
    }
}

fn link_all<G: GraphicsContext>(
    gpu: &mut G,
    vertex: &G::Shader,
    sources: &ShaderSourceBundle,
) -> Result<(G::Program, G::Program, G::Program), GpuError> {
    let bright = link_with(gpu, vertex, &sources.bloom_fragment)?;
    let blur = match link_with(gpu, vertex, &sources.blur) {
        Ok(program) => program,
        Err(err) => {
            gpu.delete_program(bright);
            return Err(err);
        }
    };
    match link_with(gpu, vertex, &sources.composite) {
        Ok(composite) => Ok((bright, blur, composite)),
        Err(err) => {
            gpu.delete_program(bright);
            gpu.delete_program(blur);
            Err(err)
        }
    }
}

/// Full-screen passes replace every pixel, so depth and culling are off and
/// only colour is cleared.
fn begin_pass<G: GraphicsContext>(
    gpu: &mut G,
    target: Option<&RenderTarget<G>>,
) -> Result<(), GpuError> {
    gpu.bind_framebuffer(target.map(|target| &target.framebuffer))?;
    gpu.set_capability(Capability::DepthTest, false);
    gpu.set_capability(Capability::CullFace, false);
    gpu.clear(true, false);
    Ok(())
}

fn resolution<G: GraphicsContext>(targets: &RenderTargets<G>) -> Uniform {
    let (width, height) = targets.size();
    Uniform::Vec2([width as f32, height as f32])
}
