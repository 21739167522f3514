//! CPU reference renderer.
//!
//! Runs the intersection kernel for every pixel centre. Produces the same
//! image as the GPU path (up to filtering differences) and needs no context,
//! which makes it suitable for headless snapshots and for testing the
//! transform and kernel pipeline end to end.

use glam::{Vec2, Vec4};
use image::{Rgba, RgbaImage};

use crate::camera::FrameTransforms;
use crate::context::TextureWrap;
use crate::intersect::{TexelSampler, shade_pixel};
use crate::sphere::{FrameUniforms, RenderParameters};
use crate::texture::TextureMode;

/// Bilinear sampling of an RGBA image with GL-style addressing.
#[derive(Debug, Clone, Copy)]
pub struct ImageSampler<'a> {
    image: &'a RgbaImage,
    wrap_s: TextureWrap,
    wrap_t: TextureWrap,
}

impl<'a> ImageSampler<'a> {
    /// Clamp-to-edge on both axes.
    pub fn new(image: &'a RgbaImage) -> Self {
        Self::with_wrap(image, TextureWrap::ClampToEdge, TextureWrap::ClampToEdge)
    }

    pub fn with_wrap(image: &'a RgbaImage, wrap_s: TextureWrap, wrap_t: TextureWrap) -> Self {
        Self {
            image,
            wrap_s,
            wrap_t,
        }
    }

    /// Addressing matching what the GPU path uploads for `mode`.
    pub fn for_mode(image: &'a RgbaImage, mode: TextureMode) -> Self {
        let policy = mode.policy();
        Self::with_wrap(image, policy.wrap_s, policy.wrap_t)
    }

    fn texel(&self, x: i64, y: i64) -> Vec4 {
        let (width, height) = self.image.dimensions();
        let x = address(x, width, self.wrap_s);
        let y = address(y, height, self.wrap_t);
        let [r, g, b, a] = self.image.get_pixel(x, y).0;
        Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
    }
}

fn address(index: i64, size: u32, wrap: TextureWrap) -> u32 {
    let size = i64::from(size);
    match wrap {
        TextureWrap::Repeat => index.rem_euclid(size) as u32,
        TextureWrap::ClampToEdge => index.clamp(0, size - 1) as u32,
    }
}

fn unit_coordinate(coord: f32, wrap: TextureWrap) -> f32 {
    match wrap {
        TextureWrap::Repeat => coord.rem_euclid(1.0),
        TextureWrap::ClampToEdge => coord.clamp(0.0, 1.0),
    }
}

impl TexelSampler for ImageSampler<'_> {
    fn sample(&self, uv: Vec2) -> Vec4 {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return Vec4::ZERO;
        }

        // Texel centres sit at half-integer coordinates.
        let x = unit_coordinate(uv.x, self.wrap_s) * width as f32 - 0.5;
        let y = unit_coordinate(uv.y, self.wrap_t) * height as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), fx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }
}

/// Render one frame of the sphere into a new image.
///
/// Row 0 is the top of the frame.
pub fn render_frame(
    width: u32,
    height: u32,
    sampler: &impl TexelSampler,
    params: &RenderParameters,
    transforms: &FrameTransforms,
) -> RgbaImage {
    let uniforms = FrameUniforms::new(transforms, params);
    let (w, h) = (width as f32, height as f32);

    RgbaImage::from_fn(width, height, |x, y| {
        let ndc = Vec2::new(
            (x as f32 + 0.5) / w * 2.0 - 1.0,
            1.0 - (y as f32 + 0.5) / h * 2.0,
        );
        let ray = transforms.ray_through(ndc);
        let color = shade_pixel(
            &ray,
            uniforms.position,
            uniforms.radius2,
            uniforms.sun,
            sampler,
        );
        to_rgba8(color)
    })
}

fn to_rgba8(color: Vec4) -> Rgba<u8> {
    let scaled = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    Rgba([
        scaled.x as u8,
        scaled.y as u8,
        scaled.z as u8,
        scaled.w as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, SceneMatrices};
    use glam::{Mat4, Vec3};

    fn frame(camera: &Camera) -> FrameTransforms {
        FrameTransforms::compute(&camera.scene_matrices(Mat4::IDENTITY)).unwrap()
    }

    #[test]
    fn test_sampler_interpolates_between_texels() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        let sampler = ImageSampler::new(&image);

        let middle = sampler.sample(Vec2::new(0.5, 0.5));
        assert!((middle.x - 0.5).abs() < 1e-5);
        assert_eq!(middle.w, 1.0);
    }

    #[test]
    fn test_sampler_clamps_to_edge() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([10, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([250, 0, 0, 255]));
        let sampler = ImageSampler::new(&image);

        assert!((sampler.sample(Vec2::new(-3.0, 0.5)).x - 10.0 / 255.0).abs() < 1e-5);
        assert!((sampler.sample(Vec2::new(0.0, 0.5)).x - 10.0 / 255.0).abs() < 1e-5);
        assert!((sampler.sample(Vec2::new(1.0, 0.5)).x - 250.0 / 255.0).abs() < 1e-5);
    }

    #[test]
    fn test_repeat_wraps_across_the_seam() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([10, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([250, 0, 0, 255]));
        let repeat = ImageSampler::for_mode(&image, TextureMode::PowerOfTwo);
        let clamp = ImageSampler::for_mode(&image, TextureMode::NonPowerOfTwo);

        // At u = 0 repeat blends the first texel with the last.
        assert!((repeat.sample(Vec2::new(0.0, 0.5)).x - 130.0 / 255.0).abs() < 1e-5);
        assert!((clamp.sample(Vec2::new(0.0, 0.5)).x - 10.0 / 255.0).abs() < 1e-5);

        // Whole turns land on the same texel.
        let inside = repeat.sample(Vec2::new(0.25, 0.5));
        let shifted = repeat.sample(Vec2::new(1.25, 0.5));
        assert!((inside.x - shifted.x).abs() < 1e-5);
        assert!((inside.x - 10.0 / 255.0).abs() < 1e-5);
    }

    #[test]
    fn test_frame_has_lit_centre_and_black_corners() {
        let texture = RgbaImage::from_pixel(16, 8, Rgba([200, 200, 200, 255]));
        let sampler = ImageSampler::new(&texture);
        let mut camera = Camera::orbiting(4.0);
        camera.set_aspect_ratio(64.0, 64.0);
        let params = RenderParameters {
            sun_direction: Vec3::Z,
            ..RenderParameters::default()
        };

        let image = render_frame(64, 64, &sampler, &params, &frame(&camera));

        assert_eq!(image.dimensions(), (64, 64));
        let centre = image.get_pixel(32, 32).0;
        assert!(centre[0] > 150, "centre pixel {centre:?} is not lit");
        assert_eq!(centre[3], 255);
        for (x, y) in [(0, 0), (63, 0), (0, 63), (63, 63)] {
            assert_eq!(image.get_pixel(x, y).0, [0, 0, 0, 255]);
        }
    }

    #[test]
    fn test_night_side_is_ambient_only() {
        let texture = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let sampler = ImageSampler::new(&texture);
        let mut camera = Camera::orbiting(4.0);
        camera.set_aspect_ratio(1.0, 1.0);
        let params = RenderParameters {
            sun_direction: Vec3::NEG_Z,
            ..RenderParameters::default()
        };

        let image = render_frame(32, 32, &sampler, &params, &frame(&camera));
        let centre = image.get_pixel(16, 16).0;
        // 0.05 * 255 rounds to 13.
        assert!(centre[0] <= 13);
    }

    #[test]
    fn test_identity_frame_from_inside_sphere() {
        // From the centre every ray only exits the sphere, so both hits
        // coincide and the edge fade blanks the colour.
        let texture = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let sampler = ImageSampler::new(&texture);
        let transforms = FrameTransforms::compute(&SceneMatrices::default()).unwrap();

        let image = render_frame(8, 8, &sampler, &RenderParameters::default(), &transforms);
        assert!(image.pixels().all(|pixel| pixel.0 == [0, 0, 0, 255]));
    }
}
