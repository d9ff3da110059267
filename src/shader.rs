//! The textured-quad shader program.
//!
//! One fixed vertex shader transforms positions by `u_MVPMatrix` and passes
//! texture coordinates through. The fragment shader samples
//! `u_TextureUnit` and replaces the sampled alpha by a constant that is
//! baked into the source when the program is built, so each alpha level
//! is its own program.
//!
//! Failures never panic: a shader that does not compile or a program that
//! does not link leaves an invalid handle behind and a warning in the log.

use crate::backend::{GraphicsBackend, ProgramId, ShaderId, ShaderKind, UniformLocation};

pub const U_MVP_MATRIX: &str = "u_MVPMatrix";
pub const A_POSITION: &str = "a_Position";
pub const A_TEXTURE_COORDINATES: &str = "a_TextureCoordinates";
pub const V_TEXTURE_COORDINATES: &str = "v_TextureCoordinates";
pub const U_TEXTURE_UNIT: &str = "u_TextureUnit";

pub const VERTEX_SHADER: &str = "\
uniform mat4 u_MVPMatrix;
attribute vec4 a_Position;
attribute vec2 a_TextureCoordinates;
varying vec2 v_TextureCoordinates;
void main() {
    gl_Position = u_MVPMatrix * a_Position;
    v_TextureCoordinates = a_TextureCoordinates;
}
";

/// Fragment shader source with `alpha` as the output alpha channel.
///
/// The literal always carries six decimals (`0.5` becomes `0.500000`) so
/// it parses as a GLSL ES float for every finite input. Anything finer is
/// rounded away: `1e-7` is written as `0.000000`. A non-finite alpha is
/// written as `NaN` or `inf`, which no GLSL compiler accepts, so the
/// program built from it ends up invalid.
pub fn fragment_shader_source(alpha: f32) -> String {
    format!(
        "\
precision mediump float;
uniform sampler2D {U_TEXTURE_UNIT};
varying vec2 {V_TEXTURE_COORDINATES};
void main() {{
    vec4 tex = texture2D({U_TEXTURE_UNIT}, {V_TEXTURE_COORDINATES});
    gl_FragColor = vec4(tex.r, tex.g, tex.b, {alpha:.6});
}}
"
    )
}

/// Handles a tile needs from a linked [`ShaderProgram`].
///
/// Attributes the driver did not report (for example because linking
/// failed) are `None`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderLocations {
    pub mvp_matrix: Option<UniformLocation>,
    pub position: Option<u32>,
    pub texture_coordinates: Option<u32>,
    pub texture_unit: Option<UniformLocation>,
}

/// A linked program drawing textured quads at a fixed alpha.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    alpha: f32,
    locations: ShaderLocations,
}

impl ShaderProgram {
    /// Compiles both stages, links them and resolves the handle locations.
    ///
    /// Check [`is_valid`](Self::is_valid) before drawing with the result.
    pub fn new(gl: &impl GraphicsBackend, alpha: f32) -> Self {
        if !alpha.is_finite() {
            log::warn!("Alpha {alpha} has no GLSL literal, the fragment shader will not compile.");
        }
        let vertex_shader = compile_shader(gl, ShaderKind::Vertex, VERTEX_SHADER);
        let fragment_shader =
            compile_shader(gl, ShaderKind::Fragment, &fragment_shader_source(alpha));

        let id = link_program(gl, vertex_shader, fragment_shader);
        // Attached shaders live on with the program.
        for shader in [vertex_shader, fragment_shader] {
            if shader.is_valid() {
                gl.delete_shader(shader);
            }
        }

        if id.is_valid() {
            validate_program(gl, id);
        }

        let locations = ShaderLocations {
            mvp_matrix: gl.uniform_location(id, U_MVP_MATRIX),
            position: gl.attrib_location(id, A_POSITION),
            texture_coordinates: gl.attrib_location(id, A_TEXTURE_COORDINATES),
            texture_unit: gl.uniform_location(id, U_TEXTURE_UNIT),
        };
        log::debug!("{id} (alpha {alpha}) resolved {locations:?}");

        Self {
            id,
            alpha,
            locations,
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn locations(&self) -> ShaderLocations {
        self.locations
    }

    /// Makes this the current program of the context.
    pub fn use_program(&self, gl: &impl GraphicsBackend) {
        gl.use_program(self.id);
    }

    /// Uploads a column-major model-view-projection matrix.
    ///
    /// Only affects the current program, so call
    /// [`use_program`](Self::use_program) first.
    pub fn set_mvp_matrix(&self, gl: &impl GraphicsBackend, mvp_matrix: &[f32; 16]) {
        gl.uniform_matrix4(self.locations.mvp_matrix, mvp_matrix);
    }

    pub fn delete(self, gl: &impl GraphicsBackend) {
        gl.delete_program(self.id);
    }
}

/// Compiles `source` into a new shader object.
///
/// Returns `ShaderId::INVALID` when the object cannot be created or the
/// source does not compile; the failed object is deleted.
pub fn compile_shader(gl: &impl GraphicsBackend, kind: ShaderKind, source: &str) -> ShaderId {
    let shader = gl.create_shader(kind);
    if !shader.is_valid() {
        log::warn!("Could not create new {kind:?} shader.");
        return ShaderId::INVALID;
    }

    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    let compiled = gl.shader_compile_status(shader);

    log::trace!("Source of {shader}:\n{source}");
    log::debug!(
        "Result of compiling {kind:?} {shader}: {compiled}, log: {}",
        gl.shader_info_log(shader)
    );

    if !compiled {
        gl.delete_shader(shader);
        log::warn!("Compilation of {kind:?} shader failed.");
        return ShaderId::INVALID;
    }
    shader
}

/// Links a vertex and a fragment shader into a new program.
///
/// Returns `ProgramId::INVALID` when the object cannot be created or
/// linking fails; the failed program is deleted.
pub fn link_program(
    gl: &impl GraphicsBackend,
    vertex_shader: ShaderId,
    fragment_shader: ShaderId,
) -> ProgramId {
    let program = gl.create_program();
    if !program.is_valid() {
        log::warn!("Could not create new program.");
        return ProgramId::INVALID;
    }

    gl.attach_shader(program, vertex_shader);
    gl.attach_shader(program, fragment_shader);
    gl.link_program(program);
    let linked = gl.program_link_status(program);

    log::debug!(
        "Result of linking {program}: {linked}, log: {}",
        gl.program_info_log(program)
    );

    if !linked {
        gl.delete_program(program);
        log::warn!("Linking of program failed.");
        return ProgramId::INVALID;
    }
    program
}

/// Runs the driver's validation of `program` against the current state.
///
/// Purely diagnostic: the outcome is logged and returned but nothing
/// prevents using a program that did not validate.
pub fn validate_program(gl: &impl GraphicsBackend, program: ProgramId) -> bool {
    gl.validate_program(program);
    let valid = gl.program_validate_status(program);
    let info = gl.program_info_log(program);
    if valid {
        log::debug!("Validation of {program} passed. {info}");
    } else {
        log::debug!("Validation of {program} failed: {info}");
    }
    valid
}
