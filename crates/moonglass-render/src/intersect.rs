//! Analytic ray/sphere intersection and the per-pixel shading model.
//!
//! This is the CPU twin of the fragment stage in `shaders/sphere.frag`; both
//! must agree on every constant and branch.

use std::f32::consts::{FRAC_1_PI, PI};

use glam::{Vec2, Vec3, Vec4};

/// Light added to every lit texel regardless of the sun.
pub const AMBIENT: f32 = 0.05;

/// Colour of pixels whose ray misses the sphere.
pub const BACKGROUND: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// Exponent of the silhouette fade.
pub const EDGE_SHARPNESS: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Not necessarily normalized.
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

/// Near and far hit of a ray with a sphere, `t0 <= t1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub t0: f32,
    pub t1: f32,
    pub point0: Vec3,
    pub normal0: Vec3,
    pub point1: Vec3,
    pub normal1: Vec3,
}

/// Real roots of `a t^2 + b t + c = 0`, ordered ascending.
///
/// Uses the cancellation-free form `q = -(b + sign(b) sqrt(disc)) / 2`,
/// `t0 = q / a`, `t1 = c / q`.
pub fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    if a == 0.0 {
        return None;
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    if discriminant == 0.0 {
        let t = -0.5 * b / a;
        return Some((t, t));
    }

    let root = discriminant.sqrt();
    let q = if b > 0.0 {
        -0.5 * (b + root)
    } else {
        -0.5 * (b - root)
    };
    let (t0, t1) = (q / a, c / q);
    Some(if t0 > t1 { (t1, t0) } else { (t0, t1) })
}

/// Intersect `ray` with the sphere at `center` of squared radius `radius_squared`.
///
/// Returns `None` on a miss, when the sphere lies entirely behind the ray
/// origin, or for a degenerate ray or sphere. When the origin is inside the
/// sphere both hits are the exit point.
pub fn intersect_sphere(ray: &Ray, center: Vec3, radius_squared: f32) -> Option<Intersection> {
    if radius_squared <= 0.0 {
        return None;
    }

    let offset = ray.origin - center;
    let a = ray.direction.dot(ray.direction);
    let b = 2.0 * ray.direction.dot(offset);
    let c = offset.dot(offset) - radius_squared;

    let (mut t0, t1) = solve_quadratic(a, b, c)?;
    if t0 < 0.0 {
        t0 = t1;
    }
    if t0 < 0.0 {
        return None;
    }

    let point0 = ray.at(t0);
    let point1 = ray.at(t1);
    Some(Intersection {
        t0,
        t1,
        point0,
        normal0: (point0 - center).normalize(),
        point1,
        normal1: (point1 - center).normalize(),
    })
}

/// Equirectangular texture coordinates of a unit normal.
pub fn equirectangular_uv(normal: Vec3) -> Vec2 {
    let longitude = normal.x.atan2(normal.z);
    let latitude = -normal.y.clamp(-1.0, 1.0).asin();
    Vec2::new(longitude / (2.0 * PI) + 0.5, latitude * FRAC_1_PI + 0.5)
}

/// Lambert term plus ambient.
pub fn sun_shade(sun: Vec3, normal: Vec3) -> f32 {
    sun.dot(normal).max(0.0) + AMBIENT
}

/// Silhouette fade in `[0, 1]`.
///
/// Tends to 0 where the near and far normals coincide (grazing rays at the
/// silhouette) and to 1 where they are opposite (rays through the centre).
pub fn edge_fade(normal0: Vec3, normal1: Vec3, radius_squared: f32) -> f32 {
    let ratio = ((normal0 - normal1).length_squared() / (4.0 * radius_squared)).clamp(0.0, 1.0);
    1.0 - (1.0 - ratio).powi(EDGE_SHARPNESS)
}

/// Source of texels for [`shade_pixel`].
pub trait TexelSampler {
    /// RGBA in `[0, 1]` at texture coordinates `uv`.
    fn sample(&self, uv: Vec2) -> Vec4;
}

impl<F: Fn(Vec2) -> Vec4> TexelSampler for F {
    fn sample(&self, uv: Vec2) -> Vec4 {
        self(uv)
    }
}

/// Final colour of one pixel.
pub fn shade_pixel(
    ray: &Ray,
    center: Vec3,
    radius_squared: f32,
    sun: Vec3,
    sampler: &impl TexelSampler,
) -> Vec4 {
    let Some(hit) = intersect_sphere(ray, center, radius_squared) else {
        return BACKGROUND;
    };

    let texel = sampler.sample(equirectangular_uv(hit.normal0));
    let shade = sun_shade(sun, hit.normal0);
    let edge = edge_fade(hit.normal0, hit.normal1, radius_squared);
    (texel.truncate() * (edge * shade)).extend(texel.w)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn ray(origin: Vec3, direction: Vec3) -> Ray {
        Ray { origin, direction }
    }

    fn white(_uv: Vec2) -> Vec4 {
        Vec4::ONE
    }

    #[test]
    fn test_head_on_hit() {
        let hit = intersect_sphere(&ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z), Vec3::ZERO, 1.0)
            .unwrap();

        assert!((hit.t0 - 4.0).abs() < EPSILON);
        assert!((hit.t1 - 6.0).abs() < EPSILON);
        assert!((hit.point0 - Vec3::Z).length() < EPSILON);
        assert!((hit.normal0 - Vec3::Z).length() < EPSILON);
        assert!((hit.normal1 - Vec3::NEG_Z).length() < EPSILON);
    }

    #[test]
    fn test_parallel_ray_misses() {
        let result = intersect_sphere(&ray(Vec3::new(0.0, 0.0, 5.0), Vec3::X), Vec3::ZERO, 1.0);
        assert!(result.is_none());
    }

    #[test]
    fn test_sphere_behind_origin_misses() {
        let result = intersect_sphere(&ray(Vec3::new(0.0, 0.0, 5.0), Vec3::Z), Vec3::ZERO, 1.0);
        assert!(result.is_none());
    }

    #[test]
    fn test_origin_inside_uses_exit_point() {
        let hit = intersect_sphere(&ray(Vec3::ZERO, Vec3::X), Vec3::ZERO, 4.0).unwrap();
        assert!((hit.t0 - 2.0).abs() < EPSILON);
        assert_eq!(hit.t0, hit.t1);
        assert!((hit.point0 - Vec3::new(2.0, 0.0, 0.0)).length() < EPSILON);
    }

    #[test]
    fn test_tangent_ray_has_single_root() {
        assert_eq!(solve_quadratic(1.0, -2.0, 1.0), Some((1.0, 1.0)));
    }

    #[test]
    fn test_quadratic_roots_are_ordered() {
        assert_eq!(solve_quadratic(1.0, -3.0, 2.0), Some((1.0, 2.0)));
        assert_eq!(solve_quadratic(-1.0, 3.0, -2.0), Some((1.0, 2.0)));
        assert_eq!(solve_quadratic(1.0, 0.0, 1.0), None);
        assert_eq!(solve_quadratic(0.0, 1.0, 1.0), None);
    }

    #[test]
    fn test_stable_roots_for_large_b() {
        // Naive formula loses the small root to cancellation.
        let (t0, t1) = solve_quadratic(1.0, 1.0e4, 1.0).unwrap();
        assert!((t0 + 1.0e4).abs() / 1.0e4 < 1e-6);
        assert!((t1 + 1.0e-4).abs() / 1.0e-4 < 1e-3);
    }

    #[test]
    fn test_hits_lie_on_sphere_surface() {
        let center = Vec3::new(0.5, -1.0, 2.0);
        let radius = 1.5;
        let origin = Vec3::new(0.0, 0.0, 8.0);

        for ix in -4..=4 {
            for iy in -4..=4 {
                let target = center + Vec3::new(ix as f32 * 0.4, iy as f32 * 0.4, 0.0);
                let Some(hit) =
                    intersect_sphere(&ray(origin, target - origin), center, radius * radius)
                else {
                    continue;
                };
                assert!(hit.t0 <= hit.t1);
                assert!(((hit.point0 - center).length() - radius).abs() < 1e-3);
                assert!(((hit.point1 - center).length() - radius).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_edge_fade_range() {
        let head_on = edge_fade(Vec3::Z, Vec3::NEG_Z, 1.0);
        assert!((head_on - 1.0).abs() < EPSILON);

        let grazing = edge_fade(Vec3::X, Vec3::new(0.999, 0.0, 0.0447).normalize(), 1.0);
        assert!(grazing < 0.1);

        assert_eq!(edge_fade(Vec3::Y, Vec3::Y, 1.0), 0.0);
        for radius_squared in [0.25, 1.0, 9.0] {
            let edge = edge_fade(Vec3::X, Vec3::NEG_X, radius_squared);
            assert!((0.0..=1.0).contains(&edge));
        }
    }

    #[test]
    fn test_equirectangular_mapping() {
        assert!((equirectangular_uv(Vec3::Z) - Vec2::new(0.5, 0.5)).length() < EPSILON);
        assert!((equirectangular_uv(Vec3::X) - Vec2::new(0.75, 0.5)).length() < EPSILON);
        assert!((equirectangular_uv(Vec3::Y).y - 0.0).abs() < EPSILON);
        assert!((equirectangular_uv(Vec3::NEG_Y).y - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_sun_shade_has_ambient_floor() {
        assert!((sun_shade(Vec3::Z, Vec3::NEG_Z) - AMBIENT).abs() < EPSILON);
        assert!((sun_shade(Vec3::Z, Vec3::Z) - (1.0 + AMBIENT)).abs() < EPSILON);
    }

    #[test]
    fn test_miss_is_opaque_background() {
        let color = shade_pixel(
            &ray(Vec3::new(0.0, 0.0, 5.0), Vec3::X),
            Vec3::ZERO,
            1.0,
            Vec3::Z,
            &white,
        );
        assert_eq!(color, BACKGROUND);
    }

    #[test]
    fn test_lit_centre_pixel() {
        let color = shade_pixel(
            &ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z),
            Vec3::ZERO,
            1.0,
            Vec3::Z,
            &white,
        );
        assert!((color.x - (1.0 + AMBIENT)).abs() < 1e-4);
        assert_eq!(color.w, 1.0);
    }

    #[test]
    fn test_texture_alpha_passes_through() {
        let translucent = |_uv: Vec2| Vec4::new(0.5, 0.5, 0.5, 0.25);
        let color = shade_pixel(
            &ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z),
            Vec3::ZERO,
            1.0,
            Vec3::NEG_Z,
            &translucent,
        );
        assert_eq!(color.w, 0.25);
        assert!((color.x - 0.5 * AMBIENT).abs() < 1e-4);
    }
}
