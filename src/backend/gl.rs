//! [`GraphicsBackend`] on top of a real OpenGL (ES) context through `glow`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;

use glow::HasContext;

use super::{
    DrawMode, GraphicsBackend, ProgramId, ShaderId, ShaderKind, TextureFilter, TextureId,
    UniformLocation,
};

/// Drives a `glow::Context`.
///
/// The context has to be current on the calling thread for the whole life
/// of the backend; that is the contract `glow` asks for when the context is
/// created, and every call here relies on it. Needs an OpenGL ES 2.0+ or a
/// compatibility-profile desktop context (attribute arrays are used without
/// a vertex array object).
///
/// GLES2 lets attribute pointers read straight from client memory. `glow`
/// only exposes buffer-backed pointers, so each attribute location gets its
/// own streaming array buffer that is refilled on every
/// [`vertex_attrib_pointer`](GraphicsBackend::vertex_attrib_pointer).
pub struct GlowBackend {
    gl: glow::Context,
    attrib_buffers: RefCell<HashMap<u32, glow::NativeBuffer>>,
}

impl GlowBackend {
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            attrib_buffers: RefCell::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    /// Deletes the streaming buffers and hands the context back.
    pub fn into_inner(self) -> glow::Context {
        for (_, buffer) in self.attrib_buffers.borrow_mut().drain() {
            unsafe { self.gl.delete_buffer(buffer) };
        }
        self.gl
    }

    fn attrib_buffer(&self, location: u32) -> Option<glow::NativeBuffer> {
        let mut buffers = self.attrib_buffers.borrow_mut();
        if let Some(buffer) = buffers.get(&location) {
            return Some(*buffer);
        }
        match unsafe { self.gl.create_buffer() } {
            Ok(buffer) => {
                buffers.insert(location, buffer);
                Some(buffer)
            }
            Err(e) => {
                log::warn!("Could not create a vertex buffer for attribute {location}: {e}");
                None
            }
        }
    }
}

impl fmt::Debug for GlowBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlowBackend")
            .field("version", self.gl.version())
            .field("attrib_buffers", &self.attrib_buffers.borrow().len())
            .finish()
    }
}

fn shader(id: ShaderId) -> Option<glow::NativeShader> {
    NonZeroU32::new(id.0).map(glow::NativeShader)
}

fn program(id: ProgramId) -> Option<glow::NativeProgram> {
    NonZeroU32::new(id.0).map(glow::NativeProgram)
}

fn texture(id: TextureId) -> Option<glow::NativeTexture> {
    NonZeroU32::new(id.0).map(glow::NativeTexture)
}

fn uniform(location: Option<UniformLocation>) -> Option<glow::NativeUniformLocation> {
    location.map(|l| glow::NativeUniformLocation(l.0))
}

fn filter(filter: TextureFilter) -> i32 {
    match filter {
        TextureFilter::Nearest => glow::NEAREST as i32,
        TextureFilter::Linear => glow::LINEAR as i32,
    }
}

impl GraphicsBackend for GlowBackend {
    fn create_shader(&self, kind: ShaderKind) -> ShaderId {
        let kind = match kind {
            ShaderKind::Vertex => glow::VERTEX_SHADER,
            ShaderKind::Fragment => glow::FRAGMENT_SHADER,
        };
        match unsafe { self.gl.create_shader(kind) } {
            Ok(shader) => ShaderId(shader.0.get()),
            Err(e) => {
                log::debug!("glCreateShader: {e}");
                ShaderId::INVALID
            }
        }
    }

    fn shader_source(&self, id: ShaderId, source: &str) {
        if let Some(shader) = shader(id) {
            unsafe { self.gl.shader_source(shader, source) };
        }
    }

    fn compile_shader(&self, id: ShaderId) {
        if let Some(shader) = shader(id) {
            unsafe { self.gl.compile_shader(shader) };
        }
    }

    fn shader_compile_status(&self, id: ShaderId) -> bool {
        shader(id).is_some_and(|shader| unsafe { self.gl.get_shader_compile_status(shader) })
    }

    fn shader_info_log(&self, id: ShaderId) -> String {
        shader(id)
            .map(|shader| unsafe { self.gl.get_shader_info_log(shader) })
            .unwrap_or_default()
    }

    fn delete_shader(&self, id: ShaderId) {
        if let Some(shader) = shader(id) {
            unsafe { self.gl.delete_shader(shader) };
        }
    }

    fn create_program(&self) -> ProgramId {
        match unsafe { self.gl.create_program() } {
            Ok(program) => ProgramId(program.0.get()),
            Err(e) => {
                log::debug!("glCreateProgram: {e}");
                ProgramId::INVALID
            }
        }
    }

    fn attach_shader(&self, program_id: ProgramId, shader_id: ShaderId) {
        if let (Some(program), Some(shader)) = (program(program_id), shader(shader_id)) {
            unsafe { self.gl.attach_shader(program, shader) };
        }
    }

    fn link_program(&self, id: ProgramId) {
        if let Some(program) = program(id) {
            unsafe { self.gl.link_program(program) };
        }
    }

    fn program_link_status(&self, id: ProgramId) -> bool {
        program(id).is_some_and(|program| unsafe { self.gl.get_program_link_status(program) })
    }

    fn validate_program(&self, id: ProgramId) {
        if let Some(program) = program(id) {
            unsafe { self.gl.validate_program(program) };
        }
    }

    fn program_validate_status(&self, id: ProgramId) -> bool {
        program(id).is_some_and(|program| unsafe {
            self.gl
                .get_program_parameter_i32(program, glow::VALIDATE_STATUS)
                != 0
        })
    }

    fn program_info_log(&self, id: ProgramId) -> String {
        program(id)
            .map(|program| unsafe { self.gl.get_program_info_log(program) })
            .unwrap_or_default()
    }

    fn delete_program(&self, id: ProgramId) {
        if let Some(program) = program(id) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn use_program(&self, id: ProgramId) {
        unsafe { self.gl.use_program(program(id)) };
    }

    fn attrib_location(&self, id: ProgramId, name: &str) -> Option<u32> {
        program(id).and_then(|program| unsafe { self.gl.get_attrib_location(program, name) })
    }

    fn uniform_location(&self, id: ProgramId, name: &str) -> Option<UniformLocation> {
        program(id)
            .and_then(|program| unsafe { self.gl.get_uniform_location(program, name) })
            .map(|location| UniformLocation(location.0))
    }

    fn uniform_matrix4(&self, location: Option<UniformLocation>, matrix: &[f32; 16]) {
        let location = uniform(location);
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(location.as_ref(), false, matrix)
        };
    }

    fn uniform_1i(&self, location: Option<UniformLocation>, value: i32) {
        let location = uniform(location);
        unsafe { self.gl.uniform_1_i32(location.as_ref(), value) };
    }

    fn gen_texture(&self) -> TextureId {
        match unsafe { self.gl.create_texture() } {
            Ok(texture) => TextureId(texture.0.get()),
            Err(e) => {
                log::debug!("glGenTextures: {e}");
                TextureId::INVALID
            }
        }
    }

    fn bind_texture(&self, id: TextureId) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture(id)) };
    }

    fn texture_filters(&self, min: TextureFilter, mag: TextureFilter) {
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter(min));
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter(mag));
        }
    }

    fn tex_image_2d(&self, width: u32, height: u32, rgba: &[u8]) {
        unsafe {
            // Rows of odd-width bitmaps are not 4-byte aligned.
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(rgba)),
            );
        }
    }

    fn generate_mipmap(&self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) };
    }

    fn delete_texture(&self, id: TextureId) {
        if let Some(texture) = texture(id) {
            unsafe { self.gl.delete_texture(texture) };
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) };
    }

    fn vertex_attrib_pointer(&self, location: u32, components: i32, stride: i32, data: &[f32]) {
        let Some(buffer) = self.attrib_buffer(location) else {
            return;
        };
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STREAM_DRAW,
            );
            self.gl
                .vertex_attrib_pointer_f32(location, components, glow::FLOAT, false, stride, 0);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) };
    }

    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32) {
        let mode = match mode {
            DrawMode::Triangles => glow::TRIANGLES,
            DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
        };
        unsafe { self.gl.draw_arrays(mode, first, count) };
    }

    fn clear_color(&self, [r, g, b, a]: [f32; 4]) {
        unsafe { self.gl.clear_color(r, g, b, a) };
    }

    fn clear(&self) {
        unsafe { self.gl.clear(glow::COLOR_BUFFER_BIT) };
    }

    fn enable_alpha_blending(&self) {
        unsafe {
            self.gl.enable(glow::BLEND);
            self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        }
    }

    fn viewport(&self, width: i32, height: i32) {
        unsafe { self.gl.viewport(0, 0, width, height) };
    }
}
