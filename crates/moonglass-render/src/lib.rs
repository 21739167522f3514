//! Analytic textured-sphere rendering: graphics-context seam, shader program, texture resolution, frame transforms, intersection kernel and the sphere renderer.

pub mod camera;
pub mod context;
pub mod fetch;
#[cfg(feature = "glow")]
pub mod gl;
pub mod intersect;
#[cfg(test)]
mod recording;
pub mod shader;
pub mod software;
pub mod sphere;
pub mod texture;

pub use camera::{Camera, FrameTransforms, MatrixRole, SceneMatrices, TransformError};
pub use context::{CONTEXT_LOST, ContextError, GraphicsContext, ShaderStage};
pub use fetch::{FetchTask, load_image};
pub use intersect::{Intersection, Ray, TexelSampler, intersect_sphere, shade_pixel};
pub use shader::{Binding, ShaderError, ShaderProgram};
pub use software::{ImageSampler, render_frame};
pub use sphere::{
    DrawError, FrameUniforms, RenderError, RenderParameters, Sphere, SphereError, SphereLoader,
    SphereState,
};
pub use texture::{
    OffscreenCanvas, ResolutionError, TextureHandle, TextureMode, TextureResolver, TextureSource,
};
