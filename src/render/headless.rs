use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::GpuError;

use super::gpu::{Capability, GraphicsContext, ShaderStage, Uniform, VertexLayout};

const INVALID_OPERATION: u32 = 0x0502;
const FRAMEBUFFER_INCOMPLETE_ATTACHMENT: u32 = 0x8CD6;
const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: u32 = 0x8CD7;

/// Opaque object name handed out by [`HeadlessGpu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

/// One recorded GPU command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ResizeSurface { width: u32, height: u32 },
    BindFramebuffer(Option<Handle>),
    Viewport { width: u32, height: u32 },
    Clear { color: bool, depth: bool },
    Capability { capability: Capability, enabled: bool },
    UseProgram(Handle),
    Uniform { program: Handle, name: String, value: Uniform },
    BindTexture { unit: u32, texture: Handle },
    Draw(DrawCall),
}

/// State captured at the moment of an indexed draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: Handle,
    /// `None` is the visible surface.
    pub framebuffer: Option<Handle>,
    pub viewport: (u32, u32),
    pub index_count: u32,
    pub textures: Vec<(u32, Handle)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    Vertex,
    Index,
}

/// A [`GraphicsContext`] that validates and records commands instead of
/// rasterizing them. The log holds the commands issued since the last
/// [`GraphicsContext::begin_frame`].
///
/// Used by the command-line renderer and by tests, which can also inject
/// failures: rejected shader sources, failing links, incomplete framebuffers
/// and failing texture allocations.
#[derive(Debug, Default)]
pub struct HeadlessGpu {
    next_handle: u32,
    surface: (u32, u32),
    viewport: (u32, u32),
    shaders: HashMap<Handle, ShaderStage>,
    programs: HashSet<Handle>,
    buffers: HashMap<Handle, (BufferKind, usize)>,
    textures: HashMap<Handle, (u32, u32)>,
    framebuffers: HashMap<Handle, Handle>,
    bound_framebuffer: Option<Handle>,
    current_program: Option<Handle>,
    bound_textures: BTreeMap<u32, Handle>,
    capabilities: HashSet<Capability>,
    uniforms: HashMap<(Handle, String), Uniform>,
    commands: Vec<Command>,
    failing_framebuffers: HashSet<Handle>,
    rejected_sources: Vec<String>,
    fail_offscreen: bool,
    fail_links: bool,
    fail_textures: bool,
    texture_limit: Option<usize>,
}

impl HeadlessGpu {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: (width, height),
            viewport: (width, height),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|command| match command {
            Command::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    /// The last draw that landed on the visible surface.
    pub fn last_surface_draw(&self) -> Option<&DrawCall> {
        self.draws().filter(|draw| draw.framebuffer.is_none()).last()
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    pub fn texture_size(&self, texture: Handle) -> Option<(u32, u32)> {
        self.textures.get(&texture).copied()
    }

    pub fn framebuffer_texture(&self, framebuffer: Handle) -> Option<Handle> {
        self.framebuffers.get(&framebuffer).copied()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Last value written to `name` on `program`.
    pub fn uniform(&self, program: Handle, name: &str) -> Option<Uniform> {
        self.uniforms.get(&(program, name.to_string())).copied()
    }

    /// Makes every later bind of `framebuffer` report an incomplete attachment.
    pub fn fail_framebuffer(&mut self, framebuffer: Handle) {
        self.failing_framebuffers.insert(framebuffer);
    }

    pub fn restore_framebuffer(&mut self, framebuffer: Handle) {
        self.failing_framebuffers.remove(&framebuffer);
    }

    /// Makes every off-screen bind report an incomplete attachment.
    pub fn fail_offscreen(&mut self, fail: bool) {
        self.fail_offscreen = fail;
    }

    /// Shaders whose source contains `pattern` fail to compile.
    pub fn reject_shader_source(&mut self, pattern: impl Into<String>) {
        self.rejected_sources.push(pattern.into());
    }

    pub fn fail_links(&mut self, fail: bool) {
        self.fail_links = fail;
    }

    pub fn fail_texture_allocation(&mut self, fail: bool) {
        self.fail_textures = fail;
    }

    /// Caps the number of live textures; creation beyond it fails.
    pub fn limit_textures(&mut self, limit: Option<usize>) {
        self.texture_limit = limit;
    }

    fn allocate(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle)
    }

    fn invalid(operation: &'static str) -> GpuError {
        GpuError::Driver {
            code: INVALID_OPERATION,
            operation,
        }
    }
}

impl GraphicsContext for HeadlessGpu {
    type Shader = Handle;
    type Program = Handle;
    type Buffer = Handle;
    type Texture = Handle;
    type Framebuffer = Handle;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Handle, GpuError> {
        if source.trim().is_empty() {
            return Err(GpuError::ShaderCompile {
                stage,
                log: "ERROR: 0:1: empty shader source".to_string(),
            });
        }
        if let Some(pattern) = self
            .rejected_sources
            .iter()
            .find(|pattern| source.contains(pattern.as_str()))
        {
            return Err(GpuError::ShaderCompile {
                stage,
                log: format!("ERROR: 0:1: '{pattern}' : syntax error"),
            });
        }
        let handle = self.allocate();
        self.shaders.insert(handle, stage);
        Ok(handle)
    }

    fn link_program(&mut self, vertex: &Handle, fragment: &Handle) -> Result<Handle, GpuError> {
        let stages = (self.shaders.get(vertex), self.shaders.get(fragment));
        if stages != (Some(&ShaderStage::Vertex), Some(&ShaderStage::Fragment)) {
            return Err(GpuError::ProgramLink {
                log: "program needs one vertex and one fragment shader".to_string(),
            });
        }
        if self.fail_links {
            return Err(GpuError::ProgramLink {
                log: "ERROR: varyings do not match between stages".to_string(),
            });
        }
        let handle = self.allocate();
        self.programs.insert(handle);
        Ok(handle)
    }

    fn delete_shader(&mut self, shader: Handle) {
        self.shaders.remove(&shader);
    }

    fn delete_program(&mut self, program: Handle) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<Handle, GpuError> {
        let handle = self.allocate();
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.buffers.insert(handle, (BufferKind::Vertex, bytes.len()));
        Ok(handle)
    }

    fn create_index_buffer(&mut self, data: &[u16]) -> Result<Handle, GpuError> {
        let handle = self.allocate();
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.buffers.insert(handle, (BufferKind::Index, bytes.len()));
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: Handle) {
        self.buffers.remove(&buffer);
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Result<Handle, GpuError> {
        let exhausted = self
            .texture_limit
            .is_some_and(|limit| self.textures.len() >= limit);
        if self.fail_textures || exhausted || width == 0 || height == 0 {
            return Err(GpuError::Allocation("texture"));
        }
        let handle = self.allocate();
        self.textures.insert(handle, (width, height));
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: Handle) {
        self.textures.remove(&texture);
        self.bound_textures.retain(|_, bound| *bound != texture);
    }

    fn create_framebuffer(&mut self, texture: &Handle) -> Result<Handle, GpuError> {
        if !self.textures.contains_key(texture) {
            return Err(Self::invalid("create framebuffer"));
        }
        let handle = self.allocate();
        self.framebuffers.insert(handle, *texture);
        Ok(handle)
    }

    fn delete_framebuffer(&mut self, framebuffer: Handle) {
        self.framebuffers.remove(&framebuffer);
        self.failing_framebuffers.remove(&framebuffer);
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
    }

    fn bind_framebuffer(&mut self, target: Option<&Handle>) -> Result<(), GpuError> {
        if let Some(framebuffer) = target {
            let Some(texture) = self.framebuffers.get(framebuffer) else {
                return Err(Self::invalid("bind framebuffer"));
            };
            if !self.textures.contains_key(texture) {
                return Err(GpuError::FramebufferIncomplete {
                    status: FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
                });
            }
            if self.fail_offscreen || self.failing_framebuffers.contains(framebuffer) {
                return Err(GpuError::FramebufferIncomplete {
                    status: FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
                });
            }
        }
        self.bound_framebuffer = target.copied();
        self.commands.push(Command::BindFramebuffer(target.copied()));
        Ok(())
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface = (width, height);
        self.commands.push(Command::ResizeSurface { width, height });
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.commands.push(Command::Viewport { width, height });
    }

    fn set_clear_color(&mut self, _rgba: [f32; 4]) {}

    fn clear(&mut self, color: bool, depth: bool) {
        self.commands.push(Command::Clear { color, depth });
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.capabilities.insert(capability);
        } else {
            self.capabilities.remove(&capability);
        }
        self.commands.push(Command::Capability {
            capability,
            enabled,
        });
    }

    fn use_program(&mut self, program: &Handle) -> Result<(), GpuError> {
        if !self.programs.contains(program) {
            return Err(Self::invalid("use program"));
        }
        self.current_program = Some(*program);
        self.commands.push(Command::UseProgram(*program));
        Ok(())
    }

    fn set_uniform(&mut self, program: &Handle, name: &str, value: Uniform) {
        if self.current_program != Some(*program) {
            return;
        }
        self.uniforms.insert((*program, name.to_string()), value);
        self.commands.push(Command::Uniform {
            program: *program,
            name: name.to_string(),
            value,
        });
    }

    fn bind_texture(&mut self, unit: u32, texture: &Handle) {
        self.bound_textures.insert(unit, *texture);
        self.commands.push(Command::BindTexture {
            unit,
            texture: *texture,
        });
    }

    fn draw_indexed(
        &mut self,
        program: &Handle,
        vertices: &Handle,
        indices: &Handle,
        layout: &VertexLayout,
        index_count: u32,
    ) -> Result<(), GpuError> {
        if self.current_program != Some(*program) {
            return Err(Self::invalid("draw"));
        }
        let vertex_bytes = match self.buffers.get(vertices) {
            Some((BufferKind::Vertex, bytes)) => *bytes,
            _ => return Err(Self::invalid("draw")),
        };
        let index_bytes = index_count as usize * std::mem::size_of::<u16>();
        match self.buffers.get(indices) {
            Some((BufferKind::Index, bytes)) if *bytes >= index_bytes => {}
            _ => return Err(Self::invalid("draw")),
        }
        let stride = usize::try_from(layout.stride).unwrap_or(0);
        if stride == 0 || vertex_bytes % stride != 0 {
            return Err(Self::invalid("draw"));
        }

        // Integer uniforms are sampler units; only those are read by the draw.
        let mut sampled: Vec<(u32, Handle)> = Vec::new();
        for ((owner, _), value) in &self.uniforms {
            let Uniform::Int(unit) = value else { continue };
            if owner != program {
                continue;
            }
            let unit = u32::try_from(*unit).map_err(|_| Self::invalid("draw"))?;
            if let Some(texture) = self.bound_textures.get(&unit) {
                sampled.push((unit, *texture));
            }
        }
        sampled.sort();
        sampled.dedup();

        // Sampling the texture that is also the render destination is a feedback loop.
        let destination = self
            .bound_framebuffer
            .and_then(|framebuffer| self.framebuffers.get(&framebuffer).copied());
        for (_, texture) in &sampled {
            if !self.textures.contains_key(texture) || Some(*texture) == destination {
                return Err(Self::invalid("draw"));
            }
        }

        self.commands.push(Command::Draw(DrawCall {
            program: *program,
            framebuffer: self.bound_framebuffer,
            viewport: self.viewport,
            index_count,
            textures: sampled,
        }));
        Ok(())
    }

    /// Drops the previous frame's command log.
    fn begin_frame(&mut self) {
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_flagged_sources() {
        let mut gpu = HeadlessGpu::new(4, 4);
        let err = gpu.compile_shader(ShaderStage::Vertex, "  ").unwrap_err();
        assert!(matches!(err, GpuError::ShaderCompile { stage: ShaderStage::Vertex, .. }));

        gpu.reject_shader_source("gl_FragColor");
        let err = gpu
            .compile_shader(ShaderStage::Fragment, "void main() { gl_FragColor = vec4(1.0); }")
            .unwrap_err();
        assert!(err.to_string().contains("fragment shader failed to compile"));
    }

    #[test]
    fn link_requires_matching_stages() {
        let mut gpu = HeadlessGpu::new(4, 4);
        let vs = gpu.compile_shader(ShaderStage::Vertex, "void main() {}").unwrap();
        let fs = gpu.compile_shader(ShaderStage::Fragment, "void main() {}").unwrap();
        assert!(matches!(gpu.link_program(&fs, &vs), Err(GpuError::ProgramLink { .. })));
        assert!(gpu.link_program(&vs, &fs).is_ok());
        gpu.fail_links(true);
        assert!(matches!(gpu.link_program(&vs, &fs), Err(GpuError::ProgramLink { .. })));
    }

    #[test]
    fn framebuffer_bind_reports_injected_failure() {
        let mut gpu = HeadlessGpu::new(4, 4);
        let texture = gpu.create_texture(4, 4).unwrap();
        let framebuffer = gpu.create_framebuffer(&texture).unwrap();
        assert!(gpu.bind_framebuffer(Some(&framebuffer)).is_ok());

        gpu.fail_framebuffer(framebuffer);
        assert_eq!(
            gpu.bind_framebuffer(Some(&framebuffer)),
            Err(GpuError::FramebufferIncomplete {
                status: FRAMEBUFFER_INCOMPLETE_ATTACHMENT
            })
        );
        gpu.restore_framebuffer(framebuffer);
        gpu.delete_texture(texture);
        assert!(matches!(
            gpu.bind_framebuffer(Some(&framebuffer)),
            Err(GpuError::FramebufferIncomplete { .. })
        ));
    }

    #[test]
    fn draw_detects_feedback_loop() {
        let mut gpu = HeadlessGpu::new(4, 4);
        let vs = gpu.compile_shader(ShaderStage::Vertex, "v").unwrap();
        let fs = gpu.compile_shader(ShaderStage::Fragment, "f").unwrap();
        let program = gpu.link_program(&vs, &fs).unwrap();
        let vertices = gpu.create_vertex_buffer(&[0.0; 16]).unwrap();
        let indices = gpu.create_index_buffer(&[0, 1, 2, 0, 2, 3]).unwrap();
        let texture = gpu.create_texture(4, 4).unwrap();
        let framebuffer = gpu.create_framebuffer(&texture).unwrap();

        gpu.use_program(&program).unwrap();
        gpu.set_uniform(&program, "u_texture", Uniform::Int(0));
        gpu.bind_framebuffer(Some(&framebuffer)).unwrap();
        gpu.bind_texture(0, &texture);
        gpu.bind_texture(3, &texture);
        assert!(gpu
            .draw_indexed(&program, &vertices, &indices, &VertexLayout::QUAD, 6)
            .is_err());

        gpu.bind_framebuffer(None).unwrap();
        gpu.draw_indexed(&program, &vertices, &indices, &VertexLayout::QUAD, 6)
            .unwrap();
        let draw = gpu.last_surface_draw().unwrap();
        assert_eq!(draw.textures, vec![(0, texture)]);
        assert_eq!(draw.viewport, (4, 4));
    }
}
