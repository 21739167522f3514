//! In-memory [`GraphicsContext`] that records every call, for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use glam::{Mat4, Vec3};

use crate::context::{ContextError, GraphicsContext, ShaderStage, TextureFilter, TextureWrap};

/// One recorded context call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateShader(ShaderStage),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram,
    AttachShader(u32, u32),
    LinkProgram(u32),
    DeleteProgram(u32),
    UseProgram(Option<u32>),
    Uniform1i(String, i32),
    Uniform1f(String, f32),
    Uniform3f(String, Vec3),
    UniformMatrix4(String, Mat4),
    CreateTexture(u32),
    ActiveTexture(u32),
    BindTexture(Option<u32>),
    TexImage { width: u32, height: u32 },
    TexFilter(TextureFilter, TextureFilter),
    TexWrap(TextureWrap, TextureWrap),
    GenerateMipmap,
    DeleteTexture(u32),
    CreateBuffer(u32),
    BindArrayBuffer(Option<u32>),
    ArrayBufferData(Vec<f32>),
    DeleteBuffer(u32),
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    DeleteVertexArray(u32),
    EnableVertexAttrib(u32),
    DisableVertexAttrib(u32),
    VertexAttribPointer(u32, i32),
    DrawTriangleFan(i32, i32),
}

/// Records calls and simulates driver failures on demand.
#[derive(Default)]
pub(crate) struct RecordingContext {
    calls: RefCell<Vec<Call>>,
    next_handle: Cell<u32>,
    shader_stages: RefCell<Vec<(u32, ShaderStage)>>,
    live: RefCell<HashSet<u32>>,
    enabled_attributes: RefCell<HashSet<u32>>,
    /// Stage whose compilation reports failure.
    pub(crate) fail_compile: Cell<Option<ShaderStage>>,
    /// Make `link_program` report failure.
    pub(crate) fail_link: Cell<bool>,
    /// Make every `create_texture` fail.
    pub(crate) fail_texture_create: Cell<bool>,
    /// GLSL identifiers for which location queries return `None`.
    pub(crate) missing_locations: RefCell<Vec<String>>,
    /// Value returned once by the next `take_error`.
    pub(crate) pending_error: Cell<Option<u32>>,
    /// Value returned by `is_context_lost`.
    pub(crate) context_lost: Cell<bool>,
    /// Error flag raised by every draw call.
    pub(crate) draw_error: Cell<Option<u32>>,
    /// Error flag raised by every texture image upload.
    pub(crate) upload_error: Cell<Option<u32>>,
}

impl RecordingContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub(crate) fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    /// Number of created objects not yet deleted.
    pub(crate) fn live_objects(&self) -> usize {
        self.live.borrow().len()
    }

    pub(crate) fn enabled_attributes(&self) -> usize {
        self.enabled_attributes.borrow().len()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate(&self) -> u32 {
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        let _ = self.live.borrow_mut().insert(handle);
        handle
    }

    fn release(&self, handle: u32) {
        let _ = self.live.borrow_mut().remove(&handle);
    }

    fn is_missing(&self, name: &str) -> bool {
        self.missing_locations.borrow().iter().any(|missing| missing == name)
    }
}

impl GraphicsContext for RecordingContext {
    type Shader = u32;
    type Program = u32;
    type Texture = u32;
    type Buffer = u32;
    type VertexArray = u32;
    type UniformLocation = String;

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, ContextError> {
        self.record(Call::CreateShader(stage));
        let handle = self.allocate();
        self.shader_stages.borrow_mut().push((handle, stage));
        Ok(handle)
    }

    fn shader_source(&self, _shader: u32, _source: &str) {}

    fn compile_shader(&self, shader: u32) {
        self.record(Call::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        let stage = self
            .shader_stages
            .borrow()
            .iter()
            .find(|(handle, _)| *handle == shader)
            .map(|(_, stage)| *stage);
        match (stage, self.fail_compile.get()) {
            (Some(stage), Some(failing)) => stage != failing,
            _ => true,
        }
    }

    fn shader_info_log(&self, _shader: u32) -> String {
        "0:1(1): error: syntax error, unexpected IDENTIFIER".to_owned()
    }

    fn delete_shader(&self, shader: u32) {
        self.record(Call::DeleteShader(shader));
        self.release(shader);
    }

    fn create_program(&self) -> Result<u32, ContextError> {
        self.record(Call::CreateProgram);
        Ok(self.allocate())
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.record(Call::AttachShader(program, shader));
    }

    fn link_program(&self, program: u32) {
        self.record(Call::LinkProgram(program));
    }

    fn program_link_status(&self, _program: u32) -> bool {
        !self.fail_link.get()
    }

    fn program_info_log(&self, _program: u32) -> String {
        "error: varying `direction' not written by vertex shader".to_owned()
    }

    fn delete_program(&self, program: u32) {
        self.record(Call::DeleteProgram(program));
        self.release(program);
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(Call::UseProgram(program));
    }

    fn attrib_location(&self, _program: u32, name: &str) -> Option<u32> {
        (!self.is_missing(name)).then_some(0)
    }

    fn uniform_location(&self, _program: u32, name: &str) -> Option<String> {
        (!self.is_missing(name)).then(|| name.to_owned())
    }

    fn uniform_1i(&self, location: &String, value: i32) {
        self.record(Call::Uniform1i(location.clone(), value));
    }

    fn uniform_1f(&self, location: &String, value: f32) {
        self.record(Call::Uniform1f(location.clone(), value));
    }

    fn uniform_3f(&self, location: &String, value: Vec3) {
        self.record(Call::Uniform3f(location.clone(), value));
    }

    fn uniform_matrix_4f(&self, location: &String, value: &Mat4) {
        self.record(Call::UniformMatrix4(location.clone(), *value));
    }

    fn create_texture(&self) -> Result<u32, ContextError> {
        if self.fail_texture_create.get() {
            return Err(ContextError::CreateFailed {
                object: "texture",
                message: "out of memory".to_owned(),
            });
        }
        let handle = self.allocate();
        self.record(Call::CreateTexture(handle));
        Ok(handle)
    }

    fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, texture: Option<u32>) {
        self.record(Call::BindTexture(texture));
    }

    fn tex_image_rgba8(&self, width: u32, height: u32, _pixels: &[u8]) {
        self.record(Call::TexImage { width, height });
        if let Some(code) = self.upload_error.get() {
            self.pending_error.set(Some(code));
        }
    }

    fn tex_filter(&self, min: TextureFilter, mag: TextureFilter) {
        self.record(Call::TexFilter(min, mag));
    }

    fn tex_wrap(&self, s: TextureWrap, t: TextureWrap) {
        self.record(Call::TexWrap(s, t));
    }

    fn generate_mipmap(&self) {
        self.record(Call::GenerateMipmap);
    }

    fn delete_texture(&self, texture: u32) {
        self.record(Call::DeleteTexture(texture));
        self.release(texture);
    }

    fn create_buffer(&self) -> Result<u32, ContextError> {
        let handle = self.allocate();
        self.record(Call::CreateBuffer(handle));
        Ok(handle)
    }

    fn bind_array_buffer(&self, buffer: Option<u32>) {
        self.record(Call::BindArrayBuffer(buffer));
    }

    fn array_buffer_data(&self, data: &[f32]) {
        self.record(Call::ArrayBufferData(data.to_vec()));
    }

    fn delete_buffer(&self, buffer: u32) {
        self.record(Call::DeleteBuffer(buffer));
        self.release(buffer);
    }

    fn create_vertex_array(&self) -> Result<u32, ContextError> {
        let handle = self.allocate();
        self.record(Call::CreateVertexArray(handle));
        Ok(handle)
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.record(Call::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.record(Call::DeleteVertexArray(vertex_array));
        self.release(vertex_array);
    }

    fn enable_vertex_attrib(&self, index: u32) {
        self.record(Call::EnableVertexAttrib(index));
        let _ = self.enabled_attributes.borrow_mut().insert(index);
    }

    fn disable_vertex_attrib(&self, index: u32) {
        self.record(Call::DisableVertexAttrib(index));
        let _ = self.enabled_attributes.borrow_mut().remove(&index);
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32) {
        self.record(Call::VertexAttribPointer(index, components));
    }

    fn draw_triangle_fan(&self, first: i32, count: i32) {
        self.record(Call::DrawTriangleFan(first, count));
        if let Some(code) = self.draw_error.get() {
            self.pending_error.set(Some(code));
        }
    }

    fn take_error(&self) -> Option<u32> {
        self.pending_error.take()
    }

    fn is_context_lost(&self) -> bool {
        self.context_lost.get()
    }
}
