use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGlBuffer, WebGlFramebuffer, WebGlProgram, WebGlRenderingContext as Gl,
    WebGlShader, WebGlTexture,
};

use crate::error::GpuError;

use super::gpu::{Capability, GraphicsContext, ShaderStage, Uniform, VertexLayout};

/// [`GraphicsContext`] over a WebGL 1 canvas context.
pub struct WebGlContext {
    gl: Gl,
    canvas: HtmlCanvasElement,
}

impl WebGlContext {
    pub fn from_canvas(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let gl = canvas
            .get_context("webgl")?
            .ok_or_else(|| JsValue::from_str("WebGL is not supported by this browser"))?
            .dyn_into::<Gl>()?;
        gl.blend_func(Gl::SRC_ALPHA, Gl::ONE_MINUS_SRC_ALPHA);
        Ok(Self { gl, canvas })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn check(&self, operation: &'static str) -> Result<(), GpuError> {
        match self.gl.get_error() {
            Gl::NO_ERROR => Ok(()),
            code => Err(GpuError::Driver { code, operation }),
        }
    }

    fn capability(capability: Capability) -> u32 {
        match capability {
            Capability::DepthTest => Gl::DEPTH_TEST,
            Capability::CullFace => Gl::CULL_FACE,
            Capability::Blend => Gl::BLEND,
        }
    }
}

impl GraphicsContext for WebGlContext {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type Texture = WebGlTexture;
    type Framebuffer = WebGlFramebuffer;

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<WebGlShader, GpuError> {
        let kind = match stage {
            ShaderStage::Vertex => Gl::VERTEX_SHADER,
            ShaderStage::Fragment => Gl::FRAGMENT_SHADER,
        };
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or(GpuError::Allocation("shader"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        let compiled = self
            .gl
            .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if compiled {
            return Ok(shader);
        }
        let log = self
            .gl
            .get_shader_info_log(&shader)
            .unwrap_or_else(|| "unknown error".to_string());
        self.gl.delete_shader(Some(&shader));
        Err(GpuError::ShaderCompile { stage, log })
    }

    fn link_program(
        &mut self,
        vertex: &WebGlShader,
        fragment: &WebGlShader,
    ) -> Result<WebGlProgram, GpuError> {
        let program = self
            .gl
            .create_program()
            .ok_or(GpuError::Allocation("program"))?;
        self.gl.attach_shader(&program, vertex);
        self.gl.attach_shader(&program, fragment);
        self.gl.link_program(&program);

        let linked = self
            .gl
            .get_program_parameter(&program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if linked {
            return Ok(program);
        }
        let log = self
            .gl
            .get_program_info_log(&program)
            .unwrap_or_else(|| "unknown error".to_string());
        self.gl.delete_program(Some(&program));
        Err(GpuError::ProgramLink { log })
    }

    fn delete_shader(&mut self, shader: WebGlShader) {
        self.gl.delete_shader(Some(&shader));
    }

    fn delete_program(&mut self, program: WebGlProgram) {
        self.gl.delete_program(Some(&program));
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<WebGlBuffer, GpuError> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or(GpuError::Allocation("vertex buffer"))?;
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
        self.gl.buffer_data_with_u8_array(
            Gl::ARRAY_BUFFER,
            bytemuck::cast_slice(data),
            Gl::STATIC_DRAW,
        );
        self.check("upload vertex buffer")?;
        Ok(buffer)
    }

    fn create_index_buffer(&mut self, data: &[u16]) -> Result<WebGlBuffer, GpuError> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or(GpuError::Allocation("index buffer"))?;
        self.gl.bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(&buffer));
        self.gl.buffer_data_with_u8_array(
            Gl::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(data),
            Gl::STATIC_DRAW,
        );
        self.check("upload index buffer")?;
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: WebGlBuffer) {
        self.gl.delete_buffer(Some(&buffer));
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Result<WebGlTexture, GpuError> {
        let texture = self
            .gl
            .create_texture()
            .ok_or(GpuError::Allocation("texture"))?;
        self.gl.bind_texture(Gl::TEXTURE_2D, Some(&texture));
        let allocated = self
            .gl
            .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                Gl::TEXTURE_2D,
                0,
                Gl::RGBA as i32,
                width as i32,
                height as i32,
                0,
                Gl::RGBA,
                Gl::UNSIGNED_BYTE,
                None,
            );
        if allocated.is_err() {
            self.gl.delete_texture(Some(&texture));
            return Err(GpuError::Allocation("texture storage"));
        }
        self.gl
            .tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
        self.gl
            .tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MAG_FILTER, Gl::LINEAR as i32);
        self.gl
            .tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_S, Gl::CLAMP_TO_EDGE as i32);
        self.gl
            .tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_T, Gl::CLAMP_TO_EDGE as i32);
        if let Err(err) = self.check("allocate texture") {
            self.gl.delete_texture(Some(&texture));
            return Err(err);
        }
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: WebGlTexture) {
        self.gl.delete_texture(Some(&texture));
    }

    fn create_framebuffer(
        &mut self,
        texture: &WebGlTexture,
    ) -> Result<WebGlFramebuffer, GpuError> {
        let framebuffer = self
            .gl
            .create_framebuffer()
            .ok_or(GpuError::Allocation("framebuffer"))?;
        self.gl.bind_framebuffer(Gl::FRAMEBUFFER, Some(&framebuffer));
        self.gl.framebuffer_texture_2d(
            Gl::FRAMEBUFFER,
            Gl::COLOR_ATTACHMENT0,
            Gl::TEXTURE_2D,
            Some(texture),
            0,
        );
        self.gl.bind_framebuffer(Gl::FRAMEBUFFER, None);
        Ok(framebuffer)
    }

    fn delete_framebuffer(&mut self, framebuffer: WebGlFramebuffer) {
        self.gl.delete_framebuffer(Some(&framebuffer));
    }

    fn bind_framebuffer(&mut self, target: Option<&WebGlFramebuffer>) -> Result<(), GpuError> {
        self.gl.bind_framebuffer(Gl::FRAMEBUFFER, target);
        if target.is_none() {
            return Ok(());
        }
        match self.gl.check_framebuffer_status(Gl::FRAMEBUFFER) {
            Gl::FRAMEBUFFER_COMPLETE => Ok(()),
            status => Err(GpuError::FramebufferIncomplete { status }),
        }
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    fn set_clear_color(&mut self, [r, g, b, a]: [f32; 4]) {
        self.gl.clear_color(r, g, b, a);
    }

    fn clear(&mut self, color: bool, depth: bool) {
        let mut mask = 0;
        if color {
            mask |= Gl::COLOR_BUFFER_BIT;
        }
        if depth {
            mask |= Gl::DEPTH_BUFFER_BIT;
        }
        self.gl.clear(mask);
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        let capability = Self::capability(capability);
        if enabled {
            self.gl.enable(capability);
        } else {
            self.gl.disable(capability);
        }
    }

    fn use_program(&mut self, program: &WebGlProgram) -> Result<(), GpuError> {
        self.gl.use_program(Some(program));
        self.check("use program")
    }

    fn set_uniform(&mut self, program: &WebGlProgram, name: &str, value: Uniform) {
        let Some(location) = self.gl.get_uniform_location(program, name) else {
            return;
        };
        let location = Some(&location);
        match value {
            Uniform::Int(v) => self.gl.uniform1i(location, v),
            Uniform::Float(v) => self.gl.uniform1f(location, v),
            Uniform::Vec2([x, y]) => self.gl.uniform2f(location, x, y),
            Uniform::Vec3([x, y, z]) => self.gl.uniform3f(location, x, y, z),
            Uniform::Mat4(m) => self.gl.uniform_matrix4fv_with_f32_array(location, false, &m),
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: &WebGlTexture) {
        self.gl.active_texture(Gl::TEXTURE0 + unit);
        self.gl.bind_texture(Gl::TEXTURE_2D, Some(texture));
    }

    fn draw_indexed(
        &mut self,
        program: &WebGlProgram,
        vertices: &WebGlBuffer,
        indices: &WebGlBuffer,
        layout: &VertexLayout,
        index_count: u32,
    ) -> Result<(), GpuError> {
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(vertices));
        for attribute in layout.attributes {
            let location = self.gl.get_attrib_location(program, attribute.name);
            // Attributes optimized out of the shader report -1.
            let Ok(location) = u32::try_from(location) else {
                continue;
            };
            self.gl.enable_vertex_attrib_array(location);
            self.gl.vertex_attrib_pointer_with_i32(
                location,
                attribute.components,
                Gl::FLOAT,
                false,
                layout.stride,
                attribute.offset,
            );
        }
        self.gl.bind_buffer(Gl::ELEMENT_ARRAY_BUFFER, Some(indices));
        self.gl
            .draw_elements_with_i32(Gl::TRIANGLES, index_count as i32, Gl::UNSIGNED_SHORT, 0);
        self.check("draw")
    }
}
