//! Turns the loaded configuration into camera, sphere parameters and texture.

use glam::{Mat4, Vec3};
use image::{Rgba, RgbaImage};
use moonglass_config::{Config, SphereConfig};
use moonglass_render::{
    Camera, OffscreenCanvas, RenderParameters, SceneMatrices, TextureMode, TextureSource,
};

/// Size of the procedural fallback texture. Neither side is a power of two.
pub const GRID_WIDTH: u32 = 1000;
pub const GRID_HEIGHT: u32 = 500;

/// Degrees between grid lines.
const GRID_SPACING_DEG: f32 = 15.0;

/// Everything needed to place the sphere in front of the camera.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub params: RenderParameters,
    /// World placement of the sphere, applied through the model matrix.
    pub position: Vec3,
}

impl Scene {
    pub fn from_config(config: &Config) -> Self {
        let position = Vec3::from_array(config.sphere.position);
        let camera = Camera {
            position: position + Vec3::new(0.0, 0.0, config.camera.distance),
            target: position,
            up: Vec3::Y,
            fov_y: config.camera.fov_y_deg.to_radians(),
            aspect_ratio: config.window.width as f32 / config.window.height.max(1) as f32,
            near: config.camera.near,
            far: config.camera.far,
        };
        let params = RenderParameters {
            sun_direction: Vec3::from_array(config.sphere.sun_direction).normalize_or_zero(),
            sphere_radius: config.sphere.radius,
            sphere_position: Vec3::ZERO,
        };
        Self {
            camera,
            params,
            position,
        }
    }

    /// Follow the size of the drawing area.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.camera.set_aspect_ratio(width, height);
    }

    /// Model matrix for the sphere spun `angle` radians about its vertical axis.
    pub fn model(&self, angle: f32) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_rotation_y(angle)
    }

    pub fn matrices(&self, angle: f32) -> SceneMatrices {
        self.camera.scene_matrices(self.model(angle))
    }
}

/// Texture source named by the configuration, or the painted grid.
pub fn texture_source(sphere: &SphereConfig) -> TextureSource {
    match &sphere.texture {
        Some(location) => TextureSource::Url(location.clone()),
        None => TextureSource::Canvas(grid_canvas(GRID_WIDTH, GRID_HEIGHT)),
    }
}

pub fn texture_mode(sphere: &SphereConfig) -> TextureMode {
    TextureMode::from_non_power_of_two(sphere.non_power_of_two)
}

/// An equirectangular latitude/longitude grid with lines every 15 degrees.
/// The prime meridian is red and the equator yellow.
pub fn grid_canvas(width: u32, height: u32) -> OffscreenCanvas {
    let canvas = OffscreenCanvas::new(width, height);
    canvas.paint(paint_grid);
    canvas
}

fn paint_grid(surface: &mut RgbaImage) {
    let (width, height) = surface.dimensions();
    let deg_per_px_x = 360.0 / width.max(1) as f32;
    let deg_per_px_y = 180.0 / height.max(1) as f32;

    for (x, y, pixel) in surface.enumerate_pixels_mut() {
        // Texel centres, longitude in [-180, 180), latitude in (90, -90).
        let lon = (x as f32 + 0.5) * deg_per_px_x - 180.0;
        let lat = 90.0 - (y as f32 + 0.5) * deg_per_px_y;

        let near_line = |deg: f32, half_width: f32| {
            let offset = deg.rem_euclid(GRID_SPACING_DEG);
            offset < half_width || GRID_SPACING_DEG - offset < half_width
        };

        *pixel = if lon.abs() < deg_per_px_x {
            Rgba([220, 40, 40, 255])
        } else if lat.abs() < deg_per_px_y {
            Rgba([230, 200, 60, 255])
        } else if near_line(lon, deg_per_px_x) || near_line(lat, deg_per_px_y) {
            Rgba([200, 210, 220, 255])
        } else {
            let shade = 0.55 + 0.45 * lat.to_radians().cos();
            let band = if ((lon + 180.0) / GRID_SPACING_DEG) as u32 % 2 == 0 {
                1.0
            } else {
                0.85
            };
            let level = |base: f32| (base * shade * band).round().clamp(0.0, 255.0) as u8;
            Rgba([level(30.0), level(70.0), level(140.0), 255])
        };
    }
}

/// Angle of the sun above the horizon of the sphere point facing the camera,
/// in degrees. Logged once at start-up.
pub fn sun_elevation_deg(scene: &Scene) -> f32 {
    let facing = (scene.camera.position - scene.position).normalize_or_zero();
    90.0 - facing.dot(scene.params.sun_direction).clamp(-1.0, 1.0).acos().to_degrees()
}
