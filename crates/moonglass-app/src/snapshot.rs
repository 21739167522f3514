//! Headless rendering of a single frame to an image file.

use std::path::Path;

use image::RgbaImage;
use moonglass_config::{Config, SphereConfig};
use moonglass_render::{FrameTransforms, ImageSampler, ResolutionError, TransformError, render_frame};
use tracing::info;

use crate::scene::{self, Scene};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Texture(#[from] ResolutionError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("failed to write snapshot: {0}")]
    Save(#[from] image::ImageError),
}

/// Render the configured scene at the window size, unrotated.
pub fn render(config: &Config) -> Result<RgbaImage, SnapshotError> {
    let texture = scene::texture_source(&config.sphere).load_blocking()?;

    let (width, height) = (config.window.width, config.window.height);
    let mut scene = Scene::from_config(config);
    scene.resize(width as f32, height as f32);

    let transforms = FrameTransforms::compute(&scene.matrices(0.0))?;
    Ok(render_frame(
        width,
        height,
        &sampler(&config.sphere, &texture),
        &scene.params,
        &transforms,
    ))
}

/// Sample with the same addressing the window would upload the texture with.
fn sampler<'a>(sphere: &SphereConfig, texture: &'a RgbaImage) -> ImageSampler<'a> {
    ImageSampler::for_mode(texture, scene::texture_mode(sphere))
}

/// Render and write a PNG (or any format `image` infers from the extension).
pub fn write(config: &Config, path: &Path) -> Result<(), SnapshotError> {
    let frame = render(config)?;
    frame.save(path)?;
    info!(
        "Wrote {}x{} snapshot to {}",
        frame.width(),
        frame.height(),
        path.display()
    );
    Ok(())
}
