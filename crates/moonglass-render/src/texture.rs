//! Texture sources, GPU upload and asynchronous resolution.
//!
//! A [`TextureSource`] names where pixels come from. [`TextureResolver`]
//! turns sources into uploaded [`TextureHandle`]s; network and file sources
//! are fetched off-thread (see [`crate::fetch`]) while in-memory sources
//! complete on first poll. Every path goes through the same future
//! interface and the GPU upload always happens on the polling thread.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::try_join_all;
use image::RgbaImage;

use crate::context::{ContextError, GraphicsContext, TextureFilter, TextureWrap, clear_stale_errors};
use crate::fetch::FetchTask;

/// Errors that can occur while resolving a texture source.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// The HTTP request failed or its body could not be read.
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// A file-backed source could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a supported image.
    #[error("failed to decode {location}: {source}")]
    Decode {
        location: String,
        #[source]
        source: image::ImageError,
    },

    /// The body is larger than the fetch size limit.
    #[error("{location} exceeds the {limit}-byte image limit")]
    TooLarge { location: String, limit: u64 },

    /// The fetch worker went away without producing a result.
    #[error("fetch of {location} was abandoned")]
    Abandoned { location: String },

    /// Width or height is zero.
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    /// Pixel data length doesn't match the expected RGBA8 size.
    #[error("texture data size ({actual}) does not match expected ({expected}) for {width}x{height}")]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    /// The context refused to allocate the texture.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The context raised an error flag during upload.
    #[error("texture upload rejected by the context (error 0x{code:04x})")]
    Upload { code: u32 },
}

/// How a texture is sampled. Fixed when the texture is uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureMode {
    /// Mipmapped, linear filtering, repeat addressing.
    PowerOfTwo,
    /// Clamp-to-edge on both axes, single level, linear filtering.
    #[default]
    NonPowerOfTwo,
}

/// Concrete sampler state derived from a [`TextureMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub mipmaps: bool,
}

impl TextureMode {
    /// `NonPowerOfTwo` when `non_power_of_two` is set, `PowerOfTwo` otherwise.
    pub fn from_non_power_of_two(non_power_of_two: bool) -> Self {
        if non_power_of_two {
            Self::NonPowerOfTwo
        } else {
            Self::PowerOfTwo
        }
    }

    pub fn policy(self) -> SamplingPolicy {
        match self {
            Self::PowerOfTwo => SamplingPolicy {
                min_filter: TextureFilter::LinearMipmapNearest,
                mag_filter: TextureFilter::Linear,
                wrap_s: TextureWrap::Repeat,
                wrap_t: TextureWrap::Repeat,
                mipmaps: true,
            },
            Self::NonPowerOfTwo => SamplingPolicy {
                min_filter: TextureFilter::Linear,
                mag_filter: TextureFilter::Linear,
                wrap_s: TextureWrap::ClampToEdge,
                wrap_t: TextureWrap::ClampToEdge,
                mipmaps: false,
            },
        }
    }
}

/// Calculates the number of mip levels for the given dimensions.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    (width.max(height) as f32).log2().floor() as u32 + 1
}

/// Both dimensions are powers of two.
pub fn is_power_of_two(width: u32, height: u32) -> bool {
    width.is_power_of_two() && height.is_power_of_two()
}

/// A shareable off-screen RGBA surface that callers draw into.
///
/// Resolving a canvas uploads a snapshot; later painting does not affect
/// textures already created from it.
#[derive(Debug, Clone)]
pub struct OffscreenCanvas {
    surface: Arc<RwLock<RgbaImage>>,
}

impl OffscreenCanvas {
    /// A transparent canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: Arc::new(RwLock::new(RgbaImage::new(width, height))),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.surface
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dimensions()
    }

    /// Draw into the canvas.
    pub fn paint<R>(&self, f: impl FnOnce(&mut RgbaImage) -> R) -> R {
        let mut surface = self.surface.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut surface)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> RgbaImage {
        self.surface
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Where a texture's pixels come from.
#[derive(Debug, Clone)]
pub enum TextureSource {
    /// `http(s)://` URL, `file://` URL or filesystem path of an encoded image.
    Url(String),
    /// Already decoded pixels.
    Bitmap(RgbaImage),
    /// An off-screen canvas, snapshotted at resolution time.
    Canvas(OffscreenCanvas),
}

impl TextureSource {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Bitmap(image) => format!("bitmap {}x{}", image.width(), image.height()),
            Self::Canvas(canvas) => {
                let (width, height) = canvas.dimensions();
                format!("canvas {width}x{height}")
            }
        }
    }

    /// Produce the pixels on the calling thread, blocking on file and
    /// network reads.
    pub fn load_blocking(self) -> Result<RgbaImage, ResolutionError> {
        match self {
            Self::Url(location) => crate::fetch::load_image(&location),
            Self::Bitmap(image) => Ok(image),
            Self::Canvas(canvas) => Ok(canvas.snapshot()),
        }
    }
}

impl From<&str> for TextureSource {
    fn from(url: &str) -> Self {
        Self::Url(url.to_owned())
    }
}

impl From<String> for TextureSource {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<RgbaImage> for TextureSource {
    fn from(image: RgbaImage) -> Self {
        Self::Bitmap(image)
    }
}

impl From<OffscreenCanvas> for TextureSource {
    fn from(canvas: OffscreenCanvas) -> Self {
        Self::Canvas(canvas)
    }
}

/// An uploaded 2D texture. Deleted from the context when dropped.
pub struct TextureHandle<G: GraphicsContext> {
    gl: Arc<G>,
    texture: G::Texture,
    mode: TextureMode,
    dimensions: (u32, u32),
    mip_level_count: u32,
}

impl<G: GraphicsContext> TextureHandle<G> {
    pub fn raw(&self) -> G::Texture {
        self.texture
    }

    pub fn mode(&self) -> TextureMode {
        self.mode
    }

    /// Width and height in texels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Number of mip levels (1 if mipmaps were not generated).
    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }
}

impl<G: GraphicsContext> std::fmt::Debug for TextureHandle<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureHandle")
            .field("texture", &self.texture)
            .field("mode", &self.mode)
            .field("dimensions", &self.dimensions)
            .field("mip_level_count", &self.mip_level_count)
            .finish()
    }
}

impl<G: GraphicsContext> Drop for TextureHandle<G> {
    fn drop(&mut self) {
        self.gl.delete_texture(self.texture);
    }
}

/// Upload tightly packed RGBA8 pixels as a new texture.
pub fn upload_pixels<G: GraphicsContext>(
    gl: &Arc<G>,
    width: u32,
    height: u32,
    pixels: &[u8],
    mode: TextureMode,
) -> Result<TextureHandle<G>, ResolutionError> {
    validate_dimensions(width, height)?;
    validate_data_size(pixels, width, height)?;

    if mode == TextureMode::PowerOfTwo && !is_power_of_two(width, height) {
        log::warn!("Mipmapping a {width}x{height} texture; dimensions are not powers of two");
    }

    clear_stale_errors(&**gl).map_err(|code| ResolutionError::Upload { code })?;

    let policy = mode.policy();
    let texture = gl.create_texture()?;
    // Owns the texture from here on so every early return releases it.
    let handle = TextureHandle {
        gl: Arc::clone(gl),
        texture,
        mode,
        dimensions: (width, height),
        mip_level_count: if policy.mipmaps {
            mip_level_count(width, height)
        } else {
            1
        },
    };

    gl.bind_texture(Some(texture));
    gl.tex_image_rgba8(width, height, pixels);
    gl.tex_filter(policy.min_filter, policy.mag_filter);
    gl.tex_wrap(policy.wrap_s, policy.wrap_t);
    if policy.mipmaps {
        gl.generate_mipmap();
    }
    gl.bind_texture(None);

    if let Some(code) = gl.take_error() {
        return Err(ResolutionError::Upload { code });
    }

    log::info!(
        "Created texture ({width}x{height}, {} mips, {mode:?})",
        handle.mip_level_count
    );
    Ok(handle)
}

/// Upload a decoded image as a new texture.
pub fn upload_image<G: GraphicsContext>(
    gl: &Arc<G>,
    image: &RgbaImage,
    mode: TextureMode,
) -> Result<TextureHandle<G>, ResolutionError> {
    upload_pixels(gl, image.width(), image.height(), image.as_raw(), mode)
}

/// Resolves [`TextureSource`]s into uploaded textures with a fixed mode.
pub struct TextureResolver<G: GraphicsContext> {
    gl: Arc<G>,
    mode: TextureMode,
}

impl<G: GraphicsContext> TextureResolver<G> {
    pub fn new(gl: Arc<G>, mode: TextureMode) -> Self {
        Self { gl, mode }
    }

    pub fn mode(&self) -> TextureMode {
        self.mode
    }

    /// Resolve one source.
    ///
    /// URL sources suspend until the background fetch completes; dropping
    /// the returned future abandons the fetch.
    pub async fn resolve(&self, source: TextureSource) -> Result<TextureHandle<G>, ResolutionError> {
        log::debug!("Resolving texture from {}", source.describe());
        let image = match source {
            TextureSource::Url(url) => FetchTask::spawn(url).await?,
            in_memory => in_memory.load_blocking()?,
        };
        upload_image(&self.gl, &image, self.mode)
    }

    /// Resolve every source, preserving order.
    ///
    /// Fails with the first error; textures that had already been uploaded
    /// are dropped (and deleted) rather than returned.
    pub async fn resolve_all(
        &self,
        sources: impl IntoIterator<Item = TextureSource>,
    ) -> Result<Vec<TextureHandle<G>>, ResolutionError> {
        try_join_all(sources.into_iter().map(|source| self.resolve(source))).await
    }
}

/// Validate that dimensions are non-zero.
fn validate_dimensions(width: u32, height: u32) -> Result<(), ResolutionError> {
    if width == 0 || height == 0 {
        return Err(ResolutionError::ZeroDimensions { width, height });
    }
    Ok(())
}

/// Validate that data size matches expected size.
fn validate_data_size(data: &[u8], width: u32, height: u32) -> Result<(), ResolutionError> {
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(ResolutionError::DataSizeMismatch {
            actual: data.len(),
            expected,
            width,
            height,
        });
    }
    Ok(())
}
