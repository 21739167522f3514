//! Shader compilation, program linkage and location lookup.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::context::{ContextError, GraphicsContext, ShaderStage};

/// `#version` line prepended to every GLSL source for the current target.
#[cfg(target_arch = "wasm32")]
pub const GLSL_VERSION: &str = "#version 300 es";
/// `#version` line prepended to every GLSL source for the current target.
#[cfg(not(target_arch = "wasm32"))]
pub const GLSL_VERSION: &str = "#version 330 core";

/// Error types for shader construction.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("shader program failed to link: {log}")]
    Link { log: String },

    #[error(transparent)]
    Create(#[from] ContextError),
}

/// Whether a binding names a vertex attribute or a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Attribute,
    Uniform,
}

/// Maps a symbolic name used by Rust code to a GLSL identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub symbol: &'static str,
    pub glsl_name: &'static str,
    pub kind: BindingKind,
}

impl Binding {
    pub const fn attribute(symbol: &'static str, glsl_name: &'static str) -> Self {
        Self {
            symbol,
            glsl_name,
            kind: BindingKind::Attribute,
        }
    }

    pub const fn uniform(symbol: &'static str, glsl_name: &'static str) -> Self {
        Self {
            symbol,
            glsl_name,
            kind: BindingKind::Uniform,
        }
    }
}

/// A resolved attribute index or uniform location.
#[derive(Debug, Clone)]
pub enum Location<U> {
    Attribute(u32),
    Uniform(U),
}

/// Compile one shader stage. The stage object is deleted again on failure.
pub fn compile<G: GraphicsContext>(
    gl: &G,
    source: &str,
    stage: ShaderStage,
) -> Result<G::Shader, ShaderError> {
    let shader = gl.create_shader(stage)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.shader_compile_status(shader) {
        let log = gl.shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(ShaderError::Compile { stage, log });
    }
    Ok(shader)
}

/// Link two compiled stages into a program. The program object is deleted
/// again on failure; the stages are left to the caller.
pub fn link<G: GraphicsContext>(
    gl: &G,
    vertex: G::Shader,
    fragment: G::Shader,
) -> Result<G::Program, ShaderError> {
    let program = gl.create_program()?;
    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);

    if !gl.program_link_status(program) {
        let log = gl.program_info_log(program);
        gl.delete_program(program);
        return Err(ShaderError::Link { log });
    }
    Ok(program)
}

/// A linked program plus the locations of its named inputs.
///
/// Construction is all-or-nothing: when any step fails every object created
/// so far is deleted before the error is returned.
pub struct ShaderProgram<G: GraphicsContext> {
    gl: Arc<G>,
    vertex: G::Shader,
    fragment: G::Shader,
    program: G::Program,
    locations: HashMap<&'static str, Location<G::UniformLocation>>,
}

impl<G: GraphicsContext> ShaderProgram<G> {
    /// Compile both stages, link them and resolve `bindings`.
    ///
    /// Bindings the driver reports as absent (for instance a uniform the
    /// compiler optimised away) are logged and left unresolved.
    pub fn new(
        gl: Arc<G>,
        vertex_source: &str,
        fragment_source: &str,
        bindings: &[Binding],
    ) -> Result<Self, ShaderError> {
        let vertex = compile(&*gl, vertex_source, ShaderStage::Vertex)?;
        let fragment = match compile(&*gl, fragment_source, ShaderStage::Fragment) {
            Ok(fragment) => fragment,
            Err(err) => {
                gl.delete_shader(vertex);
                return Err(err);
            }
        };
        let program = match link(&*gl, vertex, fragment) {
            Ok(program) => program,
            Err(err) => {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
                return Err(err);
            }
        };

        let mut locations = HashMap::with_capacity(bindings.len());
        for binding in bindings {
            let location = match binding.kind {
                BindingKind::Attribute => gl
                    .attrib_location(program, binding.glsl_name)
                    .map(Location::Attribute),
                BindingKind::Uniform => gl
                    .uniform_location(program, binding.glsl_name)
                    .map(Location::Uniform),
            };
            match location {
                Some(location) => {
                    let _ = locations.insert(binding.symbol, location);
                }
                None => debug!(
                    "'{}' ({}) is not active in the linked program",
                    binding.symbol, binding.glsl_name
                ),
            }
        }

        info!(
            "Linked shader program with {}/{} active bindings",
            locations.len(),
            bindings.len()
        );

        Ok(Self {
            gl,
            vertex,
            fragment,
            program,
            locations,
        })
    }

    /// The raw program handle.
    pub fn handle(&self) -> G::Program {
        self.program
    }

    /// Attribute index for `symbol`, `None` if unknown or inactive.
    pub fn attribute(&self, symbol: &str) -> Option<u32> {
        match self.locations.get(symbol)? {
            Location::Attribute(index) => Some(*index),
            Location::Uniform(_) => None,
        }
    }

    /// Uniform location for `symbol`, `None` if unknown or inactive.
    pub fn uniform(&self, symbol: &str) -> Option<&G::UniformLocation> {
        match self.locations.get(symbol)? {
            Location::Uniform(location) => Some(location),
            Location::Attribute(_) => None,
        }
    }

    /// Number of resolved bindings.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl<G: GraphicsContext> Drop for ShaderProgram<G> {
    fn drop(&mut self) {
        self.gl.delete_program(self.program);
        self.gl.delete_shader(self.vertex);
        self.gl.delete_shader(self.fragment);
    }
}
