//! The seam between tile rendering and the graphics API.
//!
//! [`GraphicsBackend`] exposes the handful of OpenGL ES 2.0 entry points the
//! crate needs: shader and program objects, texture objects, vertex
//! attribute streaming and draw calls. GPU objects are named by plain
//! integer handles wrapped in newtypes, and `0` is the invalid name for all
//! of them, exactly as in GL.
//!
//! - [`gl::GlowBackend`] talks to a real GL context
//! - [`recording::RecordingBackend`] records calls on the CPU, for tests
//!
//! Every method mutates or reads the global state of one GL context, so
//! calls must be made from the thread that owns that context and in the
//! order the frame needs them.

pub mod gl;
pub mod recording;

pub use self::gl::GlowBackend;
pub use self::recording::{GlCall, RecordingBackend};

macro_rules! gl_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// The name GL reserves for "no object".
            pub const INVALID: Self = Self(0);

            pub fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

gl_handle!(
    /// Name of a compiled shader object.
    ShaderId
);
gl_handle!(
    /// Name of a linked program object.
    ProgramId
);
gl_handle!(
    /// Name of a 2D texture object.
    TextureId
);

/// Location of a uniform inside a linked program.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Which pipeline stage a shader object belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

/// Sampling filter for texture minification and magnification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Primitive topology of a draw call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Triangles,
    TriangleStrip,
}

/// The OpenGL ES 2.0 subset used by shaders, textures and tiles.
///
/// Creation calls never fail loudly: they hand back the `INVALID` handle
/// and leave logging and recovery to the caller. Texture calls act on the
/// `TEXTURE_2D` target of the currently active texture unit.
pub trait GraphicsBackend {
    // Shaders
    fn create_shader(&self, kind: ShaderKind) -> ShaderId;
    fn shader_source(&self, shader: ShaderId, source: &str);
    fn compile_shader(&self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&self, shader: ShaderId);

    // Programs
    fn create_program(&self) -> ProgramId;
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);
    fn link_program(&self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn validate_program(&self, program: ProgramId);
    fn program_validate_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: ProgramId);
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    // Uniforms of the current program
    fn uniform_matrix4(&self, location: Option<UniformLocation>, matrix: &[f32; 16]);
    fn uniform_1i(&self, location: Option<UniformLocation>, value: i32);

    // Textures
    fn gen_texture(&self) -> TextureId;
    /// Binds `texture` to the active unit; `TextureId::INVALID` unbinds.
    fn bind_texture(&self, texture: TextureId);
    fn texture_filters(&self, min: TextureFilter, mag: TextureFilter);
    /// Uploads tightly packed RGBA8 rows to level 0 of the bound texture.
    fn tex_image_2d(&self, width: u32, height: u32, rgba: &[u8]);
    fn generate_mipmap(&self);
    fn delete_texture(&self, texture: TextureId);
    /// Selects texture unit `unit` (0 is `GL_TEXTURE0`).
    fn active_texture(&self, unit: u32);

    // Vertex input and drawing
    /// Points attribute `location` at client-side float data.
    ///
    /// `data` starts at the first component of the first vertex, `stride`
    /// is the distance in bytes between consecutive vertices.
    fn vertex_attrib_pointer(&self, location: u32, components: i32, stride: i32, data: &[f32]);
    fn enable_vertex_attrib_array(&self, location: u32);
    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32);

    // Frame state
    fn clear_color(&self, rgba: [f32; 4]);
    fn clear(&self);
    /// Enables blending with `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`.
    fn enable_alpha_blending(&self);
    fn viewport(&self, width: i32, height: i32);
}
