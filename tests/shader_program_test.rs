mod common;

use common::test_utils::{capture_logs, errors, warnings};
use gles_tiles::{
    ShaderProgram,
    backend::{
        GlCall, ProgramId, RecordingBackend, ShaderId, ShaderKind, UniformLocation,
        recording::Failure,
    },
    shader::{
        A_POSITION, A_TEXTURE_COORDINATES, U_MVP_MATRIX, U_TEXTURE_UNIT, VERTEX_SHADER,
        compile_shader, fragment_shader_source, link_program, validate_program,
    },
};

#[test]
fn should_bake_alpha_into_fragment_colour() {
    for alpha in [0.0, 0.25, 0.5, 0.6, 1.0] {
        let source = fragment_shader_source(alpha);
        let expected = format!("gl_FragColor = vec4(tex.r, tex.g, tex.b, {alpha:.6});");
        assert!(
            source.contains(&expected),
            "alpha {alpha} not found in:\n{source}"
        );
    }
    assert!(fragment_shader_source(0.5).contains("0.500000"));
    assert!(fragment_shader_source(1.0).contains("1.000000"));
}

#[test]
fn should_round_alpha_to_six_decimals() {
    assert!(fragment_shader_source(1e-7).contains(", 0.000000);"));
    assert!(fragment_shader_source(0.1234567).contains(", 0.123457);"));
}

#[test]
fn should_warn_about_non_finite_alpha() {
    capture_logs();
    let gl = RecordingBackend::new();

    assert!(fragment_shader_source(f32::NAN).contains(", NaN);"));
    ShaderProgram::new(&gl, f32::NAN);
    ShaderProgram::new(&gl, f32::INFINITY);

    let warnings = warnings();
    assert_eq!(
        warnings.iter().filter(|w| w.contains("has no GLSL literal")).count(),
        2,
        "unexpected warnings {warnings:?}"
    );
}

#[test]
fn should_declare_all_shader_inputs() {
    assert!(VERTEX_SHADER.contains(&format!("uniform mat4 {U_MVP_MATRIX};")));
    assert!(VERTEX_SHADER.contains(&format!("attribute vec4 {A_POSITION};")));
    assert!(VERTEX_SHADER.contains(&format!("attribute vec2 {A_TEXTURE_COORDINATES};")));
    let fragment = fragment_shader_source(1.0);
    assert!(fragment.starts_with("precision mediump float;"));
    assert!(fragment.contains(&format!("uniform sampler2D {U_TEXTURE_UNIT};")));
}

#[test]
fn should_build_program_and_resolve_locations() {
    capture_logs();
    let gl = RecordingBackend::new();
    let program = ShaderProgram::new(&gl, 0.6);

    assert!(program.is_valid());
    assert_eq!(program.alpha(), 0.6);
    let locations = program.locations();
    assert_eq!(locations.mvp_matrix, Some(UniformLocation(0)));
    assert_eq!(locations.texture_unit, Some(UniformLocation(1)));
    assert_eq!(locations.position, Some(0));
    assert_eq!(locations.texture_coordinates, Some(1));

    // Shaders are flagged for deletion once linked, the program stays.
    assert_eq!(gl.live_shaders(), 0);
    assert_eq!(gl.live_programs(), 1);
    assert_eq!(gl.count(|c| matches!(c, GlCall::ValidateProgram(_))), 1);
    assert!(warnings().is_empty(), "unexpected warnings: {:?}", warnings());
    assert!(errors().is_empty());
}

#[test]
fn should_attach_both_stages_before_linking() {
    let gl = RecordingBackend::new();
    let program = ShaderProgram::new(&gl, 1.0);
    let id = program.id();

    let calls = gl.calls();
    let attached: Vec<ShaderId> = calls
        .iter()
        .filter_map(|c| match c {
            GlCall::AttachShader(p, s) if *p == id => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(attached.len(), 2);
    let link = calls
        .iter()
        .position(|c| *c == GlCall::LinkProgram(id))
        .expect("program was linked");
    let last_attach = calls
        .iter()
        .rposition(|c| matches!(c, GlCall::AttachShader(..)))
        .expect("shaders were attached");
    assert!(last_attach < link, "attached after linking");
}

#[test]
fn should_return_invalid_shader_for_broken_glsl() {
    capture_logs();
    let gl = RecordingBackend::new();

    let shader = compile_shader(
        &gl,
        ShaderKind::Fragment,
        "void main() { gl_FragColor = vec4(1.0; }",
    );

    assert_eq!(shader, ShaderId::INVALID);
    assert_eq!(gl.live_shaders(), 0, "failed shader must be deleted");
    assert_eq!(gl.count(|c| matches!(c, GlCall::DeleteShader(_))), 1);
    assert!(
        warnings().iter().any(|w| w.contains("Compilation")),
        "missing warning in {:?}",
        warnings()
    );
}

#[test]
fn should_leave_invalid_program_when_fragment_shader_fails() {
    capture_logs();
    let gl = RecordingBackend::new().rejecting("gl_FragColor");

    let program = ShaderProgram::new(&gl, 0.5);

    assert!(!program.is_valid());
    assert_eq!(program.id(), ProgramId::INVALID);
    assert_eq!(program.locations().position, None);
    assert_eq!(program.locations().mvp_matrix, None);
    assert_eq!(gl.live_programs(), 0, "failed program must be deleted");
    assert_eq!(gl.live_shaders(), 0);
    assert_eq!(
        gl.count(|c| matches!(c, GlCall::ValidateProgram(_))),
        0,
        "an unlinked program is not validated"
    );
    let warnings = warnings();
    assert!(warnings.iter().any(|w| w.contains("Compilation")));
    assert!(warnings.iter().any(|w| w.contains("Linking of program failed")));
}

#[test]
fn should_survive_shader_creation_failure() {
    capture_logs();
    let gl = RecordingBackend::new().failing(Failure::ShaderCreation);

    let shader = compile_shader(&gl, ShaderKind::Vertex, VERTEX_SHADER);
    assert_eq!(shader, ShaderId::INVALID);
    assert_eq!(gl.count(|c| matches!(c, GlCall::ShaderSource(_))), 0);
    assert!(warnings().iter().any(|w| w.contains("Could not create new")));

    let program = ShaderProgram::new(&gl, 1.0);
    assert!(!program.is_valid());
}

#[test]
fn should_survive_program_creation_failure() {
    capture_logs();
    let gl = RecordingBackend::new().failing(Failure::ProgramCreation);
    let vertex = compile_shader(&gl, ShaderKind::Vertex, VERTEX_SHADER);
    let fragment = compile_shader(&gl, ShaderKind::Fragment, &fragment_shader_source(1.0));

    let program = link_program(&gl, vertex, fragment);

    assert_eq!(program, ProgramId::INVALID);
    assert_eq!(gl.count(|c| matches!(c, GlCall::AttachShader(..))), 0);
    assert!(warnings().iter().any(|w| w.contains("Could not create new program")));
}

#[test]
fn should_treat_validation_as_advisory() {
    capture_logs();
    let gl = RecordingBackend::new().failing(Failure::Validation);

    let program = ShaderProgram::new(&gl, 1.0);

    assert!(program.is_valid());
    assert!(!validate_program(&gl, program.id()));
    assert!(warnings().is_empty(), "validation only logs diagnostics");
}

#[test]
fn should_upload_mvp_matrix_to_current_program() {
    let gl = RecordingBackend::new();
    let program = ShaderProgram::new(&gl, 1.0);
    gl.take_calls();
    let matrix: [f32; 16] = std::array::from_fn(|i| i as f32);

    program.use_program(&gl);
    program.set_mvp_matrix(&gl, &matrix);

    assert_eq!(gl.current_program(), program.id());
    assert_eq!(
        gl.take_calls(),
        vec![
            GlCall::UseProgram(program.id()),
            GlCall::UniformMatrix4(program.locations().mvp_matrix, matrix),
        ]
    );
}

#[test]
fn should_delete_program() {
    let gl = RecordingBackend::new();
    let program = ShaderProgram::new(&gl, 1.0);
    let id = program.id();

    program.delete(&gl);

    assert_eq!(gl.live_programs(), 0);
    assert_eq!(gl.calls().last(), Some(&GlCall::DeleteProgram(id)));
}
