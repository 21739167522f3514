//! The analytic sphere renderer.
//!
//! A [`Sphere`] owns one linked program, one texture and a static
//! full-screen quad. Each [`Sphere::render`] call uploads the frame's
//! uniforms and draws the quad as a 4-vertex triangle fan; the fragment stage
//! intersects every pixel's view ray with the sphere.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use glam::{Mat4, Vec3};
use log::{info, warn};
use thiserror::Error;

use crate::camera::{FrameTransforms, SceneMatrices, TransformError};
use crate::context::{CONTEXT_LOST, ContextError, GraphicsContext, clear_stale_errors};
use crate::shader::{Binding, GLSL_VERSION, ShaderError, ShaderProgram};
use crate::texture::{ResolutionError, TextureHandle, TextureMode, TextureResolver, TextureSource};

/// Corners of the `[-1, 1] x [-1, 1]` quad in triangle-fan order.
pub const QUAD_CORNERS: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0];

/// Symbolic names used by the renderer and the GLSL identifiers they map to.
pub const SPHERE_BINDINGS: [Binding; 7] = [
    Binding::attribute("corner", "corner"),
    Binding::uniform("inv", "inv"),
    Binding::uniform("camera", "camera"),
    Binding::uniform("texture", "sphere_texture"),
    Binding::uniform("sun", "sun"),
    Binding::uniform("radius2", "radius2"),
    Binding::uniform("position", "position"),
];

const VERTEX_BODY: &str = include_str!("shaders/sphere.vert");
const FRAGMENT_BODY: &str = include_str!("shaders/sphere.frag");

/// Vertex stage source with the target's `#version` line.
pub fn vertex_source() -> String {
    format!("{GLSL_VERSION}\n{VERTEX_BODY}")
}

/// Fragment stage source with the target's `#version` line.
pub fn fragment_source() -> String {
    format!("{GLSL_VERSION}\n{FRAGMENT_BODY}")
}

/// Errors that abort sphere construction.
#[derive(Debug, Error)]
pub enum SphereError {
    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("vertex attribute '{0}' is not active in the sphere program")]
    MissingAttribute(&'static str),
}

/// The context refused a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DrawError {
    /// The context is gone; nothing draws until the host restores it.
    #[error("graphics context lost")]
    ContextLost,

    #[error("draw rejected by the context (error 0x{code:04x})")]
    Rejected { code: u32 },
}

impl DrawError {
    fn from_code(code: u32) -> Self {
        if code == CONTEXT_LOST {
            Self::ContextLost
        } else {
            Self::Rejected { code }
        }
    }
}

/// Per-frame failure. The sphere stays usable for the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("sphere is still initializing")]
    NotReady,

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Draw(#[from] DrawError),
}

/// Caller-owned inputs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParameters {
    /// World-space direction towards the sun.
    pub sun_direction: Vec3,
    pub sphere_radius: f32,
    /// Sphere centre relative to the model origin.
    pub sphere_position: Vec3,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            sun_direction: Vec3::new(-1.0, 0.25, 1.0).normalize(),
            sphere_radius: 1.0,
            sphere_position: Vec3::ZERO,
        }
    }
}

/// Uniform values for one frame, all in sphere-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub inv: Mat4,
    /// Ray origin: the camera in sphere-local space.
    pub camera: Vec3,
    pub sun: Vec3,
    pub radius2: f32,
    pub position: Vec3,
}

impl FrameUniforms {
    pub fn new(transforms: &FrameTransforms, params: &RenderParameters) -> Self {
        Self {
            inv: transforms.inverse_view_projection,
            camera: transforms.ray_origin_local,
            sun: transforms.sun_to_local(params.sun_direction),
            radius2: params.sphere_radius * params.sphere_radius,
            position: params.sphere_position,
        }
    }
}

/// A ready-to-draw textured sphere.
pub struct Sphere<G: GraphicsContext> {
    gl: Arc<G>,
    program: ShaderProgram<G>,
    texture: TextureHandle<G>,
    corners: G::Buffer,
    vertex_array: G::VertexArray,
    corner: u32,
}

impl<G: GraphicsContext + 'static> Sphere<G> {
    /// Start building a sphere whose texture comes from `source`.
    ///
    /// The program is compiled on the first poll; the returned loader then
    /// waits for the texture. Any failure rejects the loader and releases
    /// everything created so far.
    pub fn create(gl: Arc<G>, source: TextureSource, mode: TextureMode) -> SphereLoader<G> {
        SphereLoader::new(async move {
            let program = ShaderProgram::new(
                Arc::clone(&gl),
                &vertex_source(),
                &fragment_source(),
                &SPHERE_BINDINGS,
            )?;
            let texture = TextureResolver::new(Arc::clone(&gl), mode)
                .resolve(source)
                .await?;
            Self::assemble(gl, program, texture)
        })
    }
}

impl<G: GraphicsContext> Sphere<G> {
    /// Build a sphere around an already uploaded texture.
    pub fn new(gl: Arc<G>, texture: TextureHandle<G>) -> Result<Self, SphereError> {
        let program = ShaderProgram::new(
            Arc::clone(&gl),
            &vertex_source(),
            &fragment_source(),
            &SPHERE_BINDINGS,
        )?;
        Self::assemble(gl, program, texture)
    }

    fn assemble(
        gl: Arc<G>,
        program: ShaderProgram<G>,
        texture: TextureHandle<G>,
    ) -> Result<Self, SphereError> {
        let corner = program
            .attribute("corner")
            .ok_or(SphereError::MissingAttribute("corner"))?;

        let corners = gl.create_buffer()?;
        let vertex_array = match gl.create_vertex_array() {
            Ok(vertex_array) => vertex_array,
            Err(err) => {
                gl.delete_buffer(corners);
                return Err(err.into());
            }
        };

        gl.bind_vertex_array(Some(vertex_array));
        gl.bind_array_buffer(Some(corners));
        gl.array_buffer_data(&QUAD_CORNERS);
        gl.bind_array_buffer(None);
        gl.bind_vertex_array(None);

        let (width, height) = texture.dimensions();
        info!("Sphere ready ({width}x{height} texture, {:?})", texture.mode());

        Ok(Self {
            gl,
            program,
            texture,
            corners,
            vertex_array,
            corner,
        })
    }

    /// Draw one frame.
    ///
    /// A singular transform skips the frame without touching the context.
    /// Bind state is restored before returning, on success and on failure.
    pub fn render(
        &self,
        params: &RenderParameters,
        matrices: &SceneMatrices,
    ) -> Result<(), RenderError> {
        let transforms = FrameTransforms::compute(matrices).inspect_err(|err| {
            warn!("Skipping sphere frame: {err}");
        })?;

        if self.gl.is_context_lost() {
            return Err(DrawError::ContextLost.into());
        }
        clear_stale_errors(&*self.gl).map_err(DrawError::from_code)?;

        let uniforms = FrameUniforms::new(&transforms, params);
        let status = {
            let _scope = BindScope::enter(self);

            self.upload(&uniforms);
            self.gl.active_texture(0);
            self.gl.bind_texture(Some(self.texture.raw()));
            if let Some(location) = self.program.uniform("texture") {
                self.gl.uniform_1i(location, 0);
            }

            self.gl.bind_array_buffer(Some(self.corners));
            self.gl.vertex_attrib_pointer_f32(self.corner, 2);
            self.gl.draw_triangle_fan(0, 4);

            self.gl.take_error()
        };

        match status {
            None => Ok(()),
            Some(code) => Err(DrawError::from_code(code).into()),
        }
    }

    fn upload(&self, uniforms: &FrameUniforms) {
        let program = &self.program;
        if let Some(location) = program.uniform("inv") {
            self.gl.uniform_matrix_4f(location, &uniforms.inv);
        }
        if let Some(location) = program.uniform("camera") {
            self.gl.uniform_3f(location, uniforms.camera);
        }
        if let Some(location) = program.uniform("sun") {
            self.gl.uniform_3f(location, uniforms.sun);
        }
        if let Some(location) = program.uniform("radius2") {
            self.gl.uniform_1f(location, uniforms.radius2);
        }
        if let Some(location) = program.uniform("position") {
            self.gl.uniform_3f(location, uniforms.position);
        }
    }

    /// Pop error flags left behind by unrelated work so they are not
    /// attributed to this frame's draw.
    pub fn texture(&self) -> &TextureHandle<G> {
        &self.texture
    }

    /// Swap the bound texture, returning the previous one.
    pub fn replace_texture(&mut self, texture: TextureHandle<G>) -> TextureHandle<G> {
        info!("Replacing sphere texture with {texture:?}");
        std::mem::replace(&mut self.texture, texture)
    }

    pub fn program(&self) -> &ShaderProgram<G> {
        &self.program
    }
}

impl<G: GraphicsContext> Drop for Sphere<G> {
    fn drop(&mut self) {
        self.gl.delete_vertex_array(self.vertex_array);
        self.gl.delete_buffer(self.corners);
    }
}

/// Bind state held for the duration of one draw.
struct BindScope<'a, G: GraphicsContext> {
    gl: &'a G,
    corner: u32,
}

impl<'a, G: GraphicsContext> BindScope<'a, G> {
    fn enter(sphere: &'a Sphere<G>) -> Self {
        let gl = &*sphere.gl;
        gl.use_program(Some(sphere.program.handle()));
        gl.bind_vertex_array(Some(sphere.vertex_array));
        gl.enable_vertex_attrib(sphere.corner);
        Self {
            gl,
            corner: sphere.corner,
        }
    }
}

impl<G: GraphicsContext> Drop for BindScope<'_, G> {
    fn drop(&mut self) {
        self.gl.disable_vertex_attrib(self.corner);
        self.gl.bind_array_buffer(None);
        self.gl.bind_texture(None);
        self.gl.bind_vertex_array(None);
        self.gl.use_program(None);
    }
}

type SphereFuture<G> = Pin<Box<dyn Future<Output = Result<Sphere<G>, SphereError>>>>;

/// Pending sphere construction.
///
/// Must be polled on the thread that owns the graphics context.
pub struct SphereLoader<G: GraphicsContext> {
    future: SphereFuture<G>,
}

impl<G: GraphicsContext> SphereLoader<G> {
    fn new(future: impl Future<Output = Result<Sphere<G>, SphereError>> + 'static) -> Self {
        Self {
            future: Box::pin(future),
        }
    }

    /// Make progress without blocking. Not to be called again once it has
    /// returned `Ready`.
    pub fn poll_ready(&mut self) -> Poll<Result<Sphere<G>, SphereError>> {
        let mut cx = Context::from_waker(Waker::noop());
        self.future.as_mut().poll(&mut cx)
    }

    /// Block the current thread until construction finishes.
    pub fn wait(self) -> Result<Sphere<G>, SphereError> {
        pollster::block_on(self.future)
    }
}

impl<G: GraphicsContext> Future for SphereLoader<G> {
    type Output = Result<Sphere<G>, SphereError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

/// Lifecycle of a sphere owned by a render loop.
///
/// `Initializing -> Ready` is the only transition. A failed construction
/// surfaces from [`SphereState::advance`] and leaves no state behind, so a
/// broken sphere can never be rendered.
pub enum SphereState<G: GraphicsContext> {
    Initializing(SphereLoader<G>),
    Ready(Sphere<G>),
}

impl<G: GraphicsContext> SphereState<G> {
    /// Poll construction once.
    pub fn advance(self) -> Result<Self, SphereError> {
        match self {
            Self::Initializing(mut loader) => match loader.poll_ready() {
                Poll::Ready(Ok(sphere)) => Ok(Self::Ready(sphere)),
                Poll::Ready(Err(err)) => Err(err),
                Poll::Pending => Ok(Self::Initializing(loader)),
            },
            ready => Ok(ready),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn ready(&self) -> Option<&Sphere<G>> {
        match self {
            Self::Ready(sphere) => Some(sphere),
            Self::Initializing(_) => None,
        }
    }

    pub fn into_ready(self) -> Option<Sphere<G>> {
        match self {
            Self::Ready(sphere) => Some(sphere),
            Self::Initializing(_) => None,
        }
    }

    /// Draw if ready.
    pub fn render(
        &self,
        params: &RenderParameters,
        matrices: &SceneMatrices,
    ) -> Result<(), RenderError> {
        match self {
            Self::Initializing(_) => Err(RenderError::NotReady),
            Self::Ready(sphere) => sphere.render(params, matrices),
        }
    }
}

impl<G: GraphicsContext> From<SphereLoader<G>> for SphereState<G> {
    fn from(loader: SphereLoader<G>) -> Self {
        Self::Initializing(loader)
    }
}
