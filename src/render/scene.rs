use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::error::{GpuError, RenderError};
use crate::mesh::{self, Mesh};
use crate::settings::RenderSettings;
use crate::shaders::ShaderSourceBundle;
use crate::state::{Material, ShapeKind};

use super::gpu::{Capability, GraphicsContext, Uniform, VertexLayout};
use super::resources::{build_program, GpuMesh};

/// Matrices and positions for one scene draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneUniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub normal: Mat4,
    pub camera_position: Vec3,
    pub light_position: Vec3,
}

/// Draws the lit primitive with the main program.
pub struct SceneRenderer<G: GraphicsContext> {
    program: G::Program,
    meshes: HashMap<ShapeKind, GpuMesh<G>>,
}

impl<G: GraphicsContext> SceneRenderer<G> {
    /// Compiles the main program and uploads one mesh per shape.
    pub fn new(
        gpu: &mut G,
        sources: &ShaderSourceBundle,
        settings: &RenderSettings,
    ) -> Result<Self, RenderError> {
        let program = build_program(gpu, &sources.vertex, &sources.fragment)?;
        let mut renderer = Self {
            program,
            meshes: HashMap::new(),
        };

        for shape in ShapeKind::ALL {
            let uploaded = build_mesh(shape, settings)
                .map_err(RenderError::from)
                .and_then(|mesh| GpuMesh::upload(gpu, &mesh).map_err(RenderError::from));
            match uploaded {
                Ok(mesh) => {
                    renderer.meshes.insert(shape, mesh);
                }
                Err(err) => {
                    renderer.release(gpu);
                    return Err(err);
                }
            }
        }
        Ok(renderer)
    }

    pub fn program(&self) -> &G::Program {
        &self.program
    }

    pub fn has_mesh(&self, shape: ShapeKind) -> bool {
        self.meshes.contains_key(&shape)
    }

    /// Renders `shape` into `target`, or the visible surface for `None`.
    ///
    /// A shape without an uploaded mesh draws nothing and binds nothing.
    pub fn draw(
        &self,
        gpu: &mut G,
        target: Option<&G::Framebuffer>,
        shape: ShapeKind,
        uniforms: &SceneUniforms,
        material: &Material,
    ) -> Result<(), RenderError> {
        let mesh = self
            .meshes
            .get(&shape)
            .ok_or_else(|| RenderError::UnknownShape(shape.name().to_string()))?;
        self.draw_mesh(gpu, target, mesh, uniforms, material)?;
        Ok(())
    }

    fn draw_mesh(
        &self,
        gpu: &mut G,
        target: Option<&G::Framebuffer>,
        mesh: &GpuMesh<G>,
        uniforms: &SceneUniforms,
        material: &Material,
    ) -> Result<(), GpuError> {
        gpu.bind_framebuffer(target)?;
        gpu.set_capability(Capability::DepthTest, true);
        // Primitives are convex with outward winding; culling stands in for
        // the depth buffer the off-screen targets do not have.
        gpu.set_capability(Capability::CullFace, true);
        gpu.clear(true, true);

        let program = &self.program;
        gpu.use_program(program)?;
        gpu.set_uniform(program, "u_modelMatrix", Uniform::Mat4(uniforms.model.to_cols_array()));
        gpu.set_uniform(program, "u_viewMatrix", Uniform::Mat4(uniforms.view.to_cols_array()));
        gpu.set_uniform(
            program,
            "u_projectionMatrix",
            Uniform::Mat4(uniforms.projection.to_cols_array()),
        );
        gpu.set_uniform(program, "u_normalMatrix", Uniform::Mat4(uniforms.normal.to_cols_array()));
        gpu.set_uniform(program, "u_color", Uniform::Vec3(material.color.to_array()));
        gpu.set_uniform(
            program,
            "u_lightPosition",
            Uniform::Vec3(uniforms.light_position.to_array()),
        );
        gpu.set_uniform(
            program,
            "u_cameraPosition",
            Uniform::Vec3(uniforms.camera_position.to_array()),
        );
        gpu.set_uniform(program, "u_glowIntensity", Uniform::Float(material.glow_intensity));

        gpu.draw_indexed(
            program,
            &mesh.vertices,
            &mesh.indices,
            &VertexLayout::LIT,
            mesh.index_count,
        )
    }

    pub fn release(self, gpu: &mut G) {
        for (_, mesh) in self.meshes {
            mesh.release(gpu);
        }
        gpu.delete_program(self.program);
    }

    #[cfg(test)]
    pub(crate) fn evict(&mut self, gpu: &mut G, shape: ShapeKind) {
        if let Some(mesh) = self.meshes.remove(&shape) {
            mesh.release(gpu);
        }
    }
}

fn build_mesh(shape: ShapeKind, settings: &RenderSettings) -> Result<Mesh, mesh::MeshError> {
    match shape {
        ShapeKind::Cube => Ok(mesh::create_cube()),
        ShapeKind::Sphere => {
            let (width, height) = settings.sphere_segments;
            mesh::create_sphere(1.0, width, height)
        }
        ShapeKind::Cylinder => mesh::create_cylinder(0.8, 2.0, settings.cylinder_segments),
        ShapeKind::Pyramid => Ok(mesh::create_pyramid(1.5)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{Command, HeadlessGpu};

    fn uniforms() -> SceneUniforms {
        SceneUniforms {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            normal: Mat4::IDENTITY,
            camera_position: Vec3::new(0.0, 0.0, 5.0),
            light_position: Vec3::splat(2.0),
        }
    }

    fn build(gpu: &mut HeadlessGpu) -> Result<SceneRenderer<HeadlessGpu>, RenderError> {
        SceneRenderer::new(gpu, &ShaderSourceBundle::builtin(), &RenderSettings::default())
    }

    #[test]
    fn uploads_every_shape() {
        let mut gpu = HeadlessGpu::new(64, 64);
        let scene = build(&mut gpu).unwrap();
        for shape in ShapeKind::ALL {
            assert!(scene.has_mesh(shape));
        }
    }

    #[test]
    fn draw_sets_material_uniforms() {
        let mut gpu = HeadlessGpu::new(64, 64);
        let scene = build(&mut gpu).unwrap();
        let material = Material::default();
        scene
            .draw(&mut gpu, None, ShapeKind::Cube, &uniforms(), &material)
            .unwrap();

        let program = *scene.program();
        assert_eq!(gpu.uniform(program, "u_color"), Some(Uniform::Vec3([1.0, 0.1, 0.1])));
        assert_eq!(gpu.uniform(program, "u_glowIntensity"), Some(Uniform::Float(1.5)));
        assert!(gpu.is_enabled(Capability::DepthTest));
        let draw = gpu.last_surface_draw().unwrap();
        assert_eq!(draw.index_count, 36);
    }

    #[test]
    fn missing_mesh_draws_nothing() {
        let mut gpu = HeadlessGpu::new(64, 64);
        let mut scene = build(&mut gpu).unwrap();
        scene.evict(&mut gpu, ShapeKind::Pyramid);
        gpu.take_commands();

        let err = scene
            .draw(&mut gpu, None, ShapeKind::Pyramid, &uniforms(), &Material::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownShape(ref name) if name == "pyramid"));
        assert!(!gpu.commands().iter().any(|command| matches!(command, Command::Draw(_))));
    }

    #[test]
    fn rejected_fragment_source_fails_construction() {
        let mut gpu = HeadlessGpu::new(64, 64);
        gpu.reject_shader_source("u_glowIntensity");
        let result = build(&mut gpu);
        assert!(matches!(
            result,
            Err(RenderError::Gpu(GpuError::ShaderCompile { .. }))
        ));
    }
}
