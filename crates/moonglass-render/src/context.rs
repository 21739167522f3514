//! The graphics-context seam.
//!
//! Everything the sphere renderer needs from OpenGL / WebGL is expressed by
//! [`GraphicsContext`]. The context is owned by the host (a window, a test
//! harness) and handed to the renderer behind an `Arc`; the renderer never
//! creates one.

use std::fmt::Debug;

use glam::{Mat4, Vec3};

/// Error-flag value reported after the context has been lost (`GL_CONTEXT_LOST`).
pub const CONTEXT_LOST: u32 = 0x0507;

/// Error raised when the context fails to allocate an object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// `glCreate*` returned no object.
    #[error("failed to create {object}: {message}")]
    CreateFailed {
        /// Kind of object that was requested ("shader", "texture", ...).
        object: &'static str,
        /// Driver message, if any.
        message: String,
    },
}

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Texture minification / magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    /// Linear within a level, nearest between mip levels.
    LinearMipmapNearest,
}

/// Texture coordinate wrap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
}

/// Operations the sphere renderer consumes from a GL-like context.
///
/// All methods take `&self`: like the underlying API, the context holds
/// global bind state and must only be driven from the thread that owns it.
pub trait GraphicsContext {
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type Texture: Copy + Debug;
    type Buffer: Copy + Debug;
    type VertexArray: Copy + Debug;
    type UniformLocation: Clone + Debug;

    // --- shaders and programs ---

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, ContextError>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, ContextError>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);

    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: Self::Program, name: &str)
    -> Option<Self::UniformLocation>;

    // --- uniforms (apply to the program in use) ---

    fn uniform_1i(&self, location: &Self::UniformLocation, value: i32);
    fn uniform_1f(&self, location: &Self::UniformLocation, value: f32);
    fn uniform_3f(&self, location: &Self::UniformLocation, value: Vec3);
    fn uniform_matrix_4f(&self, location: &Self::UniformLocation, value: &Mat4);

    // --- textures ---

    fn create_texture(&self) -> Result<Self::Texture, ContextError>;
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, texture: Option<Self::Texture>);
    /// Upload tightly packed RGBA8 pixels to level 0 of the bound texture.
    fn tex_image_rgba8(&self, width: u32, height: u32, pixels: &[u8]);
    fn tex_filter(&self, min: TextureFilter, mag: TextureFilter);
    fn tex_wrap(&self, s: TextureWrap, t: TextureWrap);
    fn generate_mipmap(&self);
    fn delete_texture(&self, texture: Self::Texture);

    // --- vertex data ---

    fn create_buffer(&self) -> Result<Self::Buffer, ContextError>;
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    /// Upload static vertex data to the bound array buffer.
    fn array_buffer_data(&self, data: &[f32]);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, ContextError>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);

    fn enable_vertex_attrib(&self, index: u32);
    fn disable_vertex_attrib(&self, index: u32);
    /// Point `index` at tightly packed `f32` components of the bound buffer.
    fn vertex_attrib_pointer_f32(&self, index: u32, components: i32);

    // --- drawing and status ---

    fn draw_triangle_fan(&self, first: i32, count: i32);
    /// Pop the context error flag, `None` when no error is pending.
    fn take_error(&self) -> Option<u32>;
    fn is_context_lost(&self) -> bool;
}

/// Most queued error flags drained before a fresh sequence of calls.
pub const MAX_STALE_ERRORS: usize = 8;

/// Clear error flags left behind by earlier, unrelated calls so the next
/// [`GraphicsContext::take_error`] only reports what follows.
///
/// Stops at a lost context and returns `Err(CONTEXT_LOST)`.
pub fn clear_stale_errors<G: GraphicsContext>(gl: &G) -> Result<(), u32> {
    for _ in 0..MAX_STALE_ERRORS {
        match gl.take_error() {
            None => return Ok(()),
            Some(CONTEXT_LOST) => return Err(CONTEXT_LOST),
            Some(code) => log::debug!("Cleared stale context error 0x{code:04x}"),
        }
    }
    Ok(())
}
