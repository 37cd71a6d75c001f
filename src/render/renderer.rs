use log::{debug, error, info, warn};
use serde::Serialize;

use crate::controls::{ControlChange, Controls};
use crate::error::{GpuError, RenderError};
use crate::settings::RenderSettings;
use crate::shaders::ShaderSourceBundle;
use crate::state::{CameraState, ColorKind, Material, RotationState, ShapeKind};
use crate::transform;

use super::bloom::BloomPipeline;
use super::gpu::{Capability, GraphicsContext};
use super::resources::RenderTargets;
use super::scene::{SceneRenderer, SceneUniforms};

/// How a frame reached the visible surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameOutcome {
    /// Full bloom chain.
    Bloom,
    /// Scene drawn straight to the surface after the bloom chain failed or
    /// the off-screen targets were unavailable.
    Direct,
    /// Nothing drawn.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub frames: u64,
    pub bloom: u64,
    pub direct: u64,
    pub skipped: u64,
}

impl FrameStats {
    fn record(&mut self, outcome: FrameOutcome) {
        self.frames += 1;
        match outcome {
            FrameOutcome::Bloom => self.bloom += 1,
            FrameOutcome::Direct => self.direct += 1,
            FrameOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Drives one frame at a time: applies queued changes, keeps the off-screen
/// targets sized to the surface, runs the bloom chain and falls back to a
/// direct draw when any part of it fails.
pub struct Renderer<G: GraphicsContext> {
    gpu: G,
    scene: SceneRenderer<G>,
    bloom: BloomPipeline<G>,
    targets: Option<RenderTargets<G>>,
    controls: Controls,
    settings: RenderSettings,
    shape: ShapeKind,
    color: ColorKind,
    material: Material,
    camera: CameraState,
    rotation: RotationState,
    surface: (u32, u32),
    stats: FrameStats,
}

impl<G: GraphicsContext> Renderer<G> {
    /// Compiles every program and uploads every mesh. Compile and link
    /// failures are returned; there is no partially initialized renderer.
    pub fn new(
        mut gpu: G,
        sources: &ShaderSourceBundle,
        settings: RenderSettings,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let surface = (width.max(1), height.max(1));
        gpu.set_clear_color([0.0, 0.0, 0.0, 1.0]);
        gpu.set_capability(Capability::Blend, true);
        gpu.resize_surface(surface.0, surface.1);

        let scene = SceneRenderer::new(&mut gpu, sources, &settings)?;
        let bloom = match BloomPipeline::new(&mut gpu, sources) {
            Ok(bloom) => bloom,
            Err(err) => {
                scene.release(&mut gpu);
                return Err(err.into());
            }
        };

        info!(
            "renderer ready at {}x{} (shape {}, color {})",
            surface.0, surface.1, settings.shape, settings.color
        );
        Ok(Self {
            gpu,
            scene,
            bloom,
            targets: None,
            controls: Controls::new(),
            shape: settings.shape,
            color: settings.color,
            material: settings.material(),
            camera: settings.camera(),
            rotation: RotationState::default(),
            settings,
            surface,
            stats: FrameStats::default(),
        })
    }

    /// Handle for queueing changes from other parts of the application.
    pub fn controls(&self) -> Controls {
        self.controls.clone()
    }

    pub fn set_shape(&self, shape: ShapeKind) {
        self.controls.set_shape(shape);
    }

    pub fn set_color(&self, color: ColorKind) {
        self.controls.set_color(color);
    }

    pub fn set_color_name(&self, name: &str) {
        self.controls.set_color_name(name);
    }

    pub fn adjust_zoom(&self, delta: f32) {
        self.controls.adjust_zoom(delta);
    }

    pub fn on_viewport_resized(&self, width: u32, height: u32) {
        self.controls.resize(width, height);
    }

    /// Renders one frame and advances the rotation.
    ///
    /// Failures inside the bloom chain are recovered within the same frame by
    /// drawing the scene directly. A shape without a mesh skips the frame.
    /// Only a failing direct draw is returned as an error.
    pub fn render(&mut self) -> Result<FrameOutcome, RenderError> {
        self.gpu.begin_frame();
        self.apply_pending();
        let bloom_ready = self.ensure_targets();
        self.gpu.set_viewport(self.surface.0, self.surface.1);

        let outcome = if bloom_ready {
            match self.render_with_bloom() {
                Ok(()) => FrameOutcome::Bloom,
                Err(RenderError::Gpu(err)) => {
                    warn!("bloom pass failed, drawing scene directly: {err}");
                    self.render_direct()?
                }
                Err(err @ RenderError::UnknownShape(_)) => {
                    error!("skipping frame: {err}");
                    FrameOutcome::Skipped
                }
                Err(err) => return Err(err),
            }
        } else {
            self.render_direct()?
        };

        self.rotation.advance(self.settings.rotation_step);
        self.stats.record(outcome);
        Ok(outcome)
    }

    fn apply_pending(&mut self) {
        for change in self.controls.drain() {
            debug!("applying {change:?}");
            match change {
                ControlChange::Shape(shape) => self.shape = shape,
                ControlChange::Color(color) => {
                    self.color = color;
                    self.material.color = color.rgb();
                }
                ControlChange::Zoom(delta) => self.camera.adjust_zoom(delta),
                ControlChange::Resize { width, height } => {
                    if width == 0 || height == 0 {
                        debug!("ignoring empty viewport {width}x{height}");
                    } else if (width, height) != self.surface {
                        self.surface = (width, height);
                        self.gpu.resize_surface(width, height);
                    }
                }
            }
        }
    }

    /// Reallocates the targets when the surface size changed. Returns whether
    /// a complete set matching the surface is available.
    fn ensure_targets(&mut self) -> bool {
        let (width, height) = self.surface;
        if let Some(targets) = &self.targets {
            if targets.size() == (width, height) {
                return true;
            }
        }
        if let Some(stale) = self.targets.take() {
            stale.release(&mut self.gpu);
        }
        match RenderTargets::allocate(&mut self.gpu, width, height) {
            Ok(targets) => {
                info!("render targets sized to {width}x{height}");
                self.targets = Some(targets);
                true
            }
            Err(err) => {
                warn!("render targets unavailable at {width}x{height}: {err}");
                false
            }
        }
    }

    fn render_with_bloom(&mut self) -> Result<(), RenderError> {
        let uniforms = self.scene_uniforms();
        let Some(targets) = self.targets.as_ref() else {
            return Err(GpuError::Allocation("render targets").into());
        };
        self.scene.draw(
            &mut self.gpu,
            Some(&targets.scene.framebuffer),
            self.shape,
            &uniforms,
            &self.material,
        )?;
        self.bloom.apply(&mut self.gpu, targets, &self.material)?;
        Ok(())
    }

    fn render_direct(&mut self) -> Result<FrameOutcome, RenderError> {
        let uniforms = self.scene_uniforms();
        match self
            .scene
            .draw(&mut self.gpu, None, self.shape, &uniforms, &self.material)
        {
            Ok(()) => Ok(FrameOutcome::Direct),
            Err(err @ RenderError::UnknownShape(_)) => {
                error!("skipping frame: {err}");
                Ok(FrameOutcome::Skipped)
            }
            Err(err) => Err(err),
        }
    }

    fn scene_uniforms(&self) -> SceneUniforms {
        let (width, height) = self.surface;
        let model = transform::model_matrix(self.rotation.angles);
        SceneUniforms {
            model,
            view: transform::view_matrix(self.camera.position),
            projection: transform::perspective(
                self.settings.fov,
                width as f32 / height as f32,
                self.settings.near,
                self.settings.far,
            ),
            normal: transform::normal_matrix(model),
            camera_position: self.camera.position,
            light_position: self.settings.light_position,
        }
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    pub fn color(&self) -> ColorKind {
        self.color
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn rotation(&self) -> &RotationState {
        &self.rotation
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    pub fn targets(&self) -> Option<&RenderTargets<G>> {
        self.targets.as_ref()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn scene(&self) -> &SceneRenderer<G> {
        &self.scene
    }

    pub fn bloom(&self) -> &BloomPipeline<G> {
        &self.bloom
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    #[cfg(test)]
    pub(crate) fn scene_mut_with_gpu(&mut self) -> (&mut SceneRenderer<G>, &mut G) {
        (&mut self.scene, &mut self.gpu)
    }

    /// Releases every GPU object and hands the context back.
    pub fn shutdown(self) -> G {
        let Self {
            mut gpu,
            scene,
            bloom,
            targets,
            ..
        } = self;
        if let Some(targets) = targets {
            targets.release(&mut gpu);
        }
        bloom.release(&mut gpu);
        scene.release(&mut gpu);
        info!("renderer shut down");
        gpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessGpu;
    use glam::Vec3;

    fn renderer(width: u32, height: u32) -> Renderer<HeadlessGpu> {
        Renderer::new(
            HeadlessGpu::new(width, height),
            &ShaderSourceBundle::builtin(),
            RenderSettings::default(),
            width,
            height,
        )
        .unwrap()
    }

    #[test]
    fn first_frame_runs_full_bloom_chain() {
        let mut renderer = renderer(800, 600);
        assert_eq!(renderer.render().unwrap(), FrameOutcome::Bloom);

        let gpu = renderer.gpu();
        assert_eq!(gpu.draws().count(), 5);
        let final_draw = gpu.last_surface_draw().unwrap();
        assert_eq!(&final_draw.program, renderer.bloom().programs()[2]);
        assert_eq!(final_draw.viewport, (800, 600));
    }

    #[test]
    fn resize_reallocates_every_target_before_composite() {
        let mut renderer = renderer(800, 600);
        renderer.render().unwrap();
        renderer.gpu_mut().take_commands();

        renderer.on_viewport_resized(1024, 768);
        assert_eq!(renderer.render().unwrap(), FrameOutcome::Bloom);

        let targets = renderer.targets().unwrap();
        assert_eq!(targets.size(), (1024, 768));
        for target in targets.all() {
            assert_eq!(renderer.gpu().texture_size(target.texture), Some((1024, 768)));
        }
        assert_eq!(renderer.gpu().live_textures(), 4);
        assert_eq!(renderer.gpu().surface_size(), (1024, 768));
        assert!(renderer.gpu().draws().all(|draw| draw.viewport == (1024, 768)));
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut renderer = renderer(800, 600);
        renderer.on_viewport_resized(0, 600);
        renderer.render().unwrap();
        assert_eq!(renderer.surface_size(), (800, 600));
    }

    #[test]
    fn incomplete_bright_target_falls_back_to_direct_draw() {
        let mut renderer = renderer(800, 600);
        renderer.render().unwrap();
        let bright = renderer.targets().unwrap().bright.framebuffer;
        renderer.gpu_mut().fail_framebuffer(bright);
        renderer.gpu_mut().take_commands();

        assert_eq!(renderer.render().unwrap(), FrameOutcome::Direct);
        let scene_program = *renderer.scene().program();
        let last = renderer.gpu().draws().last().unwrap();
        assert_eq!(last.framebuffer, None);
        assert_eq!(last.program, scene_program);

        renderer.gpu_mut().restore_framebuffer(bright);
        assert_eq!(renderer.render().unwrap(), FrameOutcome::Bloom);
        assert_eq!(
            renderer.stats(),
            FrameStats {
                frames: 3,
                bloom: 2,
                direct: 1,
                skipped: 0
            }
        );
    }

    #[test]
    fn failed_vertical_blur_leaves_direct_scene_on_surface() {
        let mut renderer = renderer(800, 600);
        renderer.render().unwrap();
        let blur_vertical = renderer.targets().unwrap().blur_vertical.framebuffer;
        renderer.gpu_mut().fail_framebuffer(blur_vertical);

        assert_eq!(renderer.render().unwrap(), FrameOutcome::Direct);
        let scene_program = *renderer.scene().program();
        let gpu = renderer.gpu();
        // scene, bright pass and horizontal blur ran before the failing bind
        assert_eq!(gpu.draws().count(), 4);
        let last = gpu.last_surface_draw().unwrap();
        assert_eq!(last.program, scene_program);
        assert!(gpu.draws().all(|draw| &draw.program != renderer.bloom().programs()[2]));
    }

    #[test]
    fn command_log_only_holds_the_current_frame() {
        let mut renderer = renderer(320, 240);
        for _ in 0..10 {
            renderer.render().unwrap();
        }
        let per_frame = renderer.gpu().commands().len();
        for _ in 0..1000 {
            renderer.render().unwrap();
        }
        assert_eq!(renderer.gpu().commands().len(), per_frame);
        assert_eq!(renderer.gpu().draws().count(), 5);
    }

    #[test]
    fn missing_targets_draw_directly() {
        let mut gpu = HeadlessGpu::new(640, 480);
        gpu.fail_texture_allocation(true);
        let mut renderer = Renderer::new(
            gpu,
            &ShaderSourceBundle::builtin(),
            RenderSettings::default(),
            640,
            480,
        )
        .unwrap();
        assert_eq!(renderer.render().unwrap(), FrameOutcome::Direct);
        assert!(renderer.targets().is_none());

        renderer.gpu_mut().fail_texture_allocation(false);
        assert_eq!(renderer.render().unwrap(), FrameOutcome::Bloom);
    }

    #[test]
    fn shape_without_mesh_skips_frame_but_keeps_rotating() {
        let mut renderer = renderer(320, 240);
        {
            let (scene, gpu) = renderer.scene_mut_with_gpu();
            scene.evict(gpu, ShapeKind::Sphere);
        }
        renderer.set_shape(ShapeKind::Sphere);
        renderer.gpu_mut().take_commands();

        assert_eq!(renderer.render().unwrap(), FrameOutcome::Skipped);
        assert_eq!(renderer.gpu().draws().count(), 0);
        assert!(renderer.rotation().angles.y > 0.0);

        renderer.set_shape(ShapeKind::Cube);
        assert_eq!(renderer.render().unwrap(), FrameOutcome::Bloom);
    }

    #[test]
    fn rotation_follows_frame_count() {
        let settings = RenderSettings {
            rotation_step: Vec3::new(0.0, 0.01, 0.0),
            ..RenderSettings::default()
        };
        let mut renderer = Renderer::new(
            HeadlessGpu::new(64, 64),
            &ShaderSourceBundle::builtin(),
            settings,
            64,
            64,
        )
        .unwrap();
        for _ in 0..100 {
            renderer.render().unwrap();
        }
        assert!((renderer.rotation().angles.y - 1.0).abs() < 1e-4);
        assert_eq!(renderer.rotation().angles.x, 0.0);
    }

    #[test]
    fn queued_changes_apply_at_next_frame() {
        let mut renderer = renderer(64, 64);
        let controls = renderer.controls();
        controls.set_color_name("unknown");
        controls.set_color(ColorKind::Cyan);
        controls.adjust_zoom(-100.0);
        controls.set_shape(ShapeKind::Pyramid);
        assert_eq!(renderer.shape(), ShapeKind::Cube);

        renderer.render().unwrap();
        assert_eq!(renderer.shape(), ShapeKind::Pyramid);
        assert_eq!(renderer.color(), ColorKind::Cyan);
        assert_eq!(renderer.camera().base_distance(), 1.5);

        renderer.set_color_name("unknown");
        renderer.render().unwrap();
        assert_eq!(renderer.material().color, Vec3::new(1.0, 0.1, 0.1));
    }

    #[test]
    fn compile_failure_propagates_from_new() {
        let mut gpu = HeadlessGpu::new(64, 64);
        gpu.reject_shader_source("u_direction");
        let result = Renderer::new(
            gpu,
            &ShaderSourceBundle::builtin(),
            RenderSettings::default(),
            64,
            64,
        );
        assert!(matches!(
            result,
            Err(RenderError::Gpu(GpuError::ShaderCompile { .. }))
        ));
    }

    #[test]
    fn link_failure_propagates_from_new() {
        let mut gpu = HeadlessGpu::new(64, 64);
        gpu.fail_links(true);
        let result = Renderer::new(
            gpu,
            &ShaderSourceBundle::builtin(),
            RenderSettings::default(),
            64,
            64,
        );
        assert!(matches!(
            result,
            Err(RenderError::Gpu(GpuError::ProgramLink { .. }))
        ));
    }

    #[test]
    fn shutdown_releases_everything() {
        let mut renderer = renderer(64, 64);
        renderer.render().unwrap();
        let gpu = renderer.shutdown();
        assert_eq!(gpu.live_textures(), 0);
        assert_eq!(gpu.live_framebuffers(), 0);
        assert_eq!(gpu.live_programs(), 0);
    }
}
