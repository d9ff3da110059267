//! A CPU-only [`GraphicsBackend`] that records what would have been sent to
//! the GPU.
//!
//! Handles are allocated from one counter starting at 1, so `0` keeps its
//! meaning. Shader "compilation" is a coarse syntax check (balanced
//! delimiters and a `void main` entry point), linking succeeds when one
//! compiled vertex and one compiled fragment shader are attached, and
//! attribute/uniform locations are assigned in declaration order. Only
//! calls that change state are recorded; queries are answered silently.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use super::{
    DrawMode, GraphicsBackend, ProgramId, ShaderId, ShaderKind, TextureFilter, TextureId,
    UniformLocation,
};

/// One recorded, state-changing backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum GlCall {
    CreateShader(ShaderKind, ShaderId),
    ShaderSource(ShaderId),
    CompileShader(ShaderId),
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader(ProgramId, ShaderId),
    LinkProgram(ProgramId),
    ValidateProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(ProgramId),
    UniformMatrix4(Option<UniformLocation>, [f32; 16]),
    Uniform1i(Option<UniformLocation>, i32),
    GenTexture(TextureId),
    BindTexture(TextureId),
    TextureFilters(TextureFilter, TextureFilter),
    TexImage2d { width: u32, height: u32 },
    GenerateMipmap,
    DeleteTexture(TextureId),
    ActiveTexture(u32),
    VertexAttribPointer {
        location: u32,
        components: i32,
        stride: i32,
        data: Vec<f32>,
    },
    EnableVertexAttribArray(u32),
    DrawArrays(DrawMode, i32, i32),
    ClearColor([f32; 4]),
    Clear,
    EnableAlphaBlending,
    Viewport(i32, i32),
}

/// Operations a [`RecordingBackend`] can be told to fail.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Failure {
    ShaderCreation,
    ProgramCreation,
    TextureGeneration,
    Validation,
}

#[derive(Debug)]
struct Shader {
    kind: ShaderKind,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct Program {
    shaders: Vec<u32>,
    linked: bool,
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

#[derive(Copy, Clone, Debug, Default)]
struct TextureState {
    size: Option<(u32, u32)>,
    mipmapped: bool,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: RefCell<Vec<GlCall>>,
    next_name: Cell<u32>,
    failures: HashSet<Failure>,
    rejected: Vec<String>,
    shaders: RefCell<BTreeMap<u32, Shader>>,
    programs: RefCell<BTreeMap<u32, Program>>,
    textures: RefCell<BTreeMap<u32, TextureState>>,
    current_program: Cell<ProgramId>,
    bound_texture: Cell<TextureId>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call of the given kind fail from now on.
    pub fn failing(mut self, failure: Failure) -> Self {
        self.failures.insert(failure);
        self
    }

    /// Fails compilation of any shader whose source contains `marker`.
    pub fn rejecting(mut self, marker: impl Into<String>) -> Self {
        self.rejected.push(marker.into());
        self
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    /// Returns the calls recorded so far and starts a fresh log.
    pub fn take_calls(&self) -> Vec<GlCall> {
        self.calls.take()
    }

    pub fn count(&self, predicate: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    pub fn current_program(&self) -> ProgramId {
        self.current_program.get()
    }

    pub fn bound_texture(&self) -> TextureId {
        self.bound_texture.get()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.borrow().len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.borrow().len()
    }

    pub fn live_textures(&self) -> Vec<TextureId> {
        self.textures.borrow().keys().map(|&name| TextureId(name)).collect()
    }

    /// Size of the level-0 image uploaded to `texture`, if any.
    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.borrow().get(&texture.0).and_then(|t| t.size)
    }

    pub fn has_mipmaps(&self, texture: TextureId) -> bool {
        self.textures
            .borrow()
            .get(&texture.0)
            .is_some_and(|t| t.mipmapped)
    }

    fn record(&self, call: GlCall) {
        self.calls.borrow_mut().push(call);
    }

    fn fails(&self, failure: Failure) -> bool {
        self.failures.contains(&failure)
    }

    fn allocate(&self) -> u32 {
        let name = self.next_name.get() + 1;
        self.next_name.set(name);
        name
    }

    fn compiles(&self, source: &str) -> bool {
        if self.rejected.iter().any(|marker| source.contains(marker.as_str())) {
            return false;
        }
        balanced(source) && source.contains("void main")
    }
}

fn balanced(source: &str) -> bool {
    let mut open = Vec::new();
    for c in source.chars() {
        match c {
            '(' | '{' | '[' => open.push(c),
            ')' => {
                if open.pop() != Some('(') {
                    return false;
                }
            }
            '}' => {
                if open.pop() != Some('{') {
                    return false;
                }
            }
            ']' => {
                if open.pop() != Some('[') {
                    return false;
                }
            }
            _ => {}
        }
    }
    open.is_empty()
}

/// Names declared with `qualifier` (`attribute`, `uniform`), in order.
fn declarations(source: &str, qualifier: &str) -> Vec<String> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| line.split_whitespace().next() == Some(qualifier))
        .filter_map(|line| line.split_whitespace().last())
        .map(|name| name.trim_end_matches(';').to_string())
        .collect()
}

impl GraphicsBackend for RecordingBackend {
    fn create_shader(&self, kind: ShaderKind) -> ShaderId {
        if self.fails(Failure::ShaderCreation) {
            self.record(GlCall::CreateShader(kind, ShaderId::INVALID));
            return ShaderId::INVALID;
        }
        let name = self.allocate();
        self.shaders.borrow_mut().insert(
            name,
            Shader {
                kind,
                source: String::new(),
                compiled: false,
            },
        );
        self.record(GlCall::CreateShader(kind, ShaderId(name)));
        ShaderId(name)
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        if let Some(s) = self.shaders.borrow_mut().get_mut(&shader.0) {
            s.source = source.to_string();
        }
        self.record(GlCall::ShaderSource(shader));
    }

    fn compile_shader(&self, shader: ShaderId) {
        if let Some(s) = self.shaders.borrow_mut().get_mut(&shader.0) {
            s.compiled = self.compiles(&s.source);
        }
        self.record(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.shaders
            .borrow()
            .get(&shader.0)
            .is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        match self.shaders.borrow().get(&shader.0) {
            Some(s) if !s.compiled => "ERROR: 0:1: '' : syntax error".to_string(),
            _ => String::new(),
        }
    }

    fn delete_shader(&self, shader: ShaderId) {
        self.shaders.borrow_mut().remove(&shader.0);
        self.record(GlCall::DeleteShader(shader));
    }

    fn create_program(&self) -> ProgramId {
        if self.fails(Failure::ProgramCreation) {
            self.record(GlCall::CreateProgram(ProgramId::INVALID));
            return ProgramId::INVALID;
        }
        let name = self.allocate();
        self.programs.borrow_mut().insert(name, Program::default());
        self.record(GlCall::CreateProgram(ProgramId(name)));
        ProgramId(name)
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let Some(p) = self.programs.borrow_mut().get_mut(&program.0) {
            p.shaders.push(shader.0);
        }
        self.record(GlCall::AttachShader(program, shader));
    }

    fn link_program(&self, program: ProgramId) {
        let shaders = self.shaders.borrow();
        if let Some(p) = self.programs.borrow_mut().get_mut(&program.0) {
            let attached: Vec<&Shader> = p.shaders.iter().filter_map(|s| shaders.get(s)).collect();
            let stage = |kind: ShaderKind| {
                attached
                    .iter()
                    .filter(|s| s.kind == kind && s.compiled)
                    .count()
                    == 1
            };
            p.linked = attached.len() == p.shaders.len()
                && stage(ShaderKind::Vertex)
                && stage(ShaderKind::Fragment);
            p.attributes.clear();
            p.uniforms.clear();
            if p.linked {
                for shader in &attached {
                    p.attributes.extend(declarations(&shader.source, "attribute"));
                    for uniform in declarations(&shader.source, "uniform") {
                        if !p.uniforms.contains(&uniform) {
                            p.uniforms.push(uniform);
                        }
                    }
                }
            }
        }
        self.record(GlCall::LinkProgram(program));
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.programs
            .borrow()
            .get(&program.0)
            .is_some_and(|p| p.linked)
    }

    fn validate_program(&self, program: ProgramId) {
        self.record(GlCall::ValidateProgram(program));
    }

    fn program_validate_status(&self, program: ProgramId) -> bool {
        !self.fails(Failure::Validation) && self.program_link_status(program)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        match self.programs.borrow().get(&program.0) {
            Some(p) if !p.linked => "error: program is not linked".to_string(),
            Some(_) if self.fails(Failure::Validation) => {
                "validation failed: sampler unit mismatch".to_string()
            }
            _ => String::new(),
        }
    }

    fn delete_program(&self, program: ProgramId) {
        self.programs.borrow_mut().remove(&program.0);
        if self.current_program.get() == program {
            self.current_program.set(ProgramId::INVALID);
        }
        self.record(GlCall::DeleteProgram(program));
    }

    fn use_program(&self, program: ProgramId) {
        self.current_program.set(program);
        self.record(GlCall::UseProgram(program));
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let programs = self.programs.borrow();
        let p = programs.get(&program.0)?;
        p.attributes
            .iter()
            .position(|a| a == name)
            .map(|index| index as u32)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let programs = self.programs.borrow();
        let p = programs.get(&program.0)?;
        p.uniforms
            .iter()
            .position(|u| u == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn uniform_matrix4(&self, location: Option<UniformLocation>, matrix: &[f32; 16]) {
        self.record(GlCall::UniformMatrix4(location, *matrix));
    }

    fn uniform_1i(&self, location: Option<UniformLocation>, value: i32) {
        self.record(GlCall::Uniform1i(location, value));
    }

    fn gen_texture(&self) -> TextureId {
        if self.fails(Failure::TextureGeneration) {
            self.record(GlCall::GenTexture(TextureId::INVALID));
            return TextureId::INVALID;
        }
        let name = self.allocate();
        self.textures
            .borrow_mut()
            .insert(name, TextureState::default());
        self.record(GlCall::GenTexture(TextureId(name)));
        TextureId(name)
    }

    fn bind_texture(&self, texture: TextureId) {
        self.bound_texture.set(texture);
        self.record(GlCall::BindTexture(texture));
    }

    fn texture_filters(&self, min: TextureFilter, mag: TextureFilter) {
        self.record(GlCall::TextureFilters(min, mag));
    }

    fn tex_image_2d(&self, width: u32, height: u32, rgba: &[u8]) {
        debug_assert_eq!(
            rgba.len(),
            width as usize * height as usize * 4,
            "pixel data does not match {width}x{height} RGBA"
        );
        if let Some(t) = self.textures.borrow_mut().get_mut(&self.bound_texture.get().0) {
            t.size = Some((width, height));
        }
        self.record(GlCall::TexImage2d { width, height });
    }

    fn generate_mipmap(&self) {
        if let Some(t) = self.textures.borrow_mut().get_mut(&self.bound_texture.get().0) {
            t.mipmapped = t.size.is_some();
        }
        self.record(GlCall::GenerateMipmap);
    }

    fn delete_texture(&self, texture: TextureId) {
        self.textures.borrow_mut().remove(&texture.0);
        if self.bound_texture.get() == texture {
            self.bound_texture.set(TextureId::INVALID);
        }
        self.record(GlCall::DeleteTexture(texture));
    }

    fn active_texture(&self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn vertex_attrib_pointer(&self, location: u32, components: i32, stride: i32, data: &[f32]) {
        self.record(GlCall::VertexAttribPointer {
            location,
            components,
            stride,
            data: data.to_vec(),
        });
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        self.record(GlCall::EnableVertexAttribArray(location));
    }

    fn draw_arrays(&self, mode: DrawMode, first: i32, count: i32) {
        self.record(GlCall::DrawArrays(mode, first, count));
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.record(GlCall::ClearColor(rgba));
    }

    fn clear(&self) {
        self.record(GlCall::Clear);
    }

    fn enable_alpha_blending(&self) {
        self.record(GlCall::EnableAlphaBlending);
    }

    fn viewport(&self, width: i32, height: i32) {
        self.record(GlCall::Viewport(width, height));
    }
}
