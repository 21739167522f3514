//! [`GraphicsContext`] backed by a `glow` OpenGL / WebGL2 context.

use glam::{Mat4, Vec3};
use glow::HasContext as _;

use crate::context::{
    ContextError, GraphicsContext, ShaderStage, TextureFilter, TextureWrap,
};

fn gl_filter(filter: TextureFilter) -> i32 {
    match filter {
        TextureFilter::Nearest => glow::NEAREST as i32,
        TextureFilter::Linear => glow::LINEAR as i32,
        TextureFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST as i32,
    }
}

fn gl_wrap(wrap: TextureWrap) -> i32 {
    match wrap {
        TextureWrap::Repeat => glow::REPEAT as i32,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE as i32,
    }
}

fn create_failed(object: &'static str) -> impl FnOnce(String) -> ContextError {
    move |message| ContextError::CreateFailed { object, message }
}

// SAFETY (all blocks below): the caller guarantees the context is current on
// this thread; arguments are handles created by this same context.
impl GraphicsContext for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Texture = glow::Texture;
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type UniformLocation = glow::UniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, ContextError> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe { glow::HasContext::create_shader(self, kind) }.map_err(create_failed("shader"))
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { glow::HasContext::shader_source(self, shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { glow::HasContext::compile_shader(self, shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { self.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { self.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { glow::HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<Self::Program, ContextError> {
        unsafe { glow::HasContext::create_program(self) }.map_err(create_failed("program"))
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { glow::HasContext::attach_shader(self, program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { glow::HasContext::link_program(self, program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { self.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { self.get_program_info_log(program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { glow::HasContext::delete_program(self, program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { glow::HasContext::use_program(self, program) }
    }

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32> {
        unsafe { self.get_attrib_location(program, name) }
    }

    fn uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { self.get_uniform_location(program, name) }
    }

    fn uniform_1i(&self, location: &Self::UniformLocation, value: i32) {
        unsafe { self.uniform_1_i32(Some(location), value) }
    }

    fn uniform_1f(&self, location: &Self::UniformLocation, value: f32) {
        unsafe { self.uniform_1_f32(Some(location), value) }
    }

    fn uniform_3f(&self, location: &Self::UniformLocation, value: Vec3) {
        unsafe { self.uniform_3_f32(Some(location), value.x, value.y, value.z) }
    }

    fn uniform_matrix_4f(&self, location: &Self::UniformLocation, value: &Mat4) {
        unsafe { self.uniform_matrix_4_f32_slice(Some(location), false, &value.to_cols_array()) }
    }

    fn create_texture(&self) -> Result<Self::Texture, ContextError> {
        unsafe { glow::HasContext::create_texture(self) }.map_err(create_failed("texture"))
    }

    fn active_texture(&self, unit: u32) {
        unsafe { glow::HasContext::active_texture(self, glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, texture: Option<Self::Texture>) {
        unsafe { glow::HasContext::bind_texture(self, glow::TEXTURE_2D, texture) }
    }

    fn tex_image_rgba8(&self, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            self.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn tex_filter(&self, min: TextureFilter, mag: TextureFilter) {
        unsafe {
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, gl_filter(min));
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, gl_filter(mag));
        }
    }

    fn tex_wrap(&self, s: TextureWrap, t: TextureWrap) {
        unsafe {
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, gl_wrap(s));
            self.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, gl_wrap(t));
        }
    }

    fn generate_mipmap(&self) {
        unsafe { glow::HasContext::generate_mipmap(self, glow::TEXTURE_2D) }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { glow::HasContext::delete_texture(self, texture) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, ContextError> {
        unsafe { glow::HasContext::create_buffer(self) }.map_err(create_failed("buffer"))
    }

    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>) {
        unsafe { self.bind_buffer(glow::ARRAY_BUFFER, buffer) }
    }

    fn array_buffer_data(&self, data: &[f32]) {
        unsafe {
            self.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            );
        }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { glow::HasContext::delete_buffer(self, buffer) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, ContextError> {
        unsafe { glow::HasContext::create_vertex_array(self) }
            .map_err(create_failed("vertex array"))
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { glow::HasContext::bind_vertex_array(self, vertex_array) }
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { glow::HasContext::delete_vertex_array(self, vertex_array) }
    }

    fn enable_vertex_attrib(&self, index: u32) {
        unsafe { self.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib(&self, index: u32) {
        unsafe { self.disable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32) {
        unsafe {
            glow::HasContext::vertex_attrib_pointer_f32(
                self,
                index,
                components,
                glow::FLOAT,
                false,
                0,
                0,
            );
        }
    }

    fn draw_triangle_fan(&self, first: i32, count: i32) {
        unsafe { self.draw_arrays(glow::TRIANGLE_FAN, first, count) }
    }

    fn take_error(&self) -> Option<u32> {
        match unsafe { self.get_error() } {
            glow::NO_ERROR => None,
            code => Some(code),
        }
    }

    fn is_context_lost(&self) -> bool {
        // Native drivers surface loss through GL_CONTEXT_LOST on the error flag.
        false
    }
}
