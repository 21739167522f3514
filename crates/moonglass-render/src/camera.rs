//! Per-frame camera transforms and the orbit camera that produces them.

use glam::{Mat4, Vec2, Vec3, Vec4};
use thiserror::Error;

use crate::intersect::Ray;

/// Which matrix failed to invert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixRole {
    Model,
    View,
    /// `projection * view * model`.
    ViewProjection,
}

impl std::fmt::Display for MatrixRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => f.write_str("model"),
            Self::View => f.write_str("view"),
            Self::ViewProjection => f.write_str("view-projection"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("{role} matrix is singular")]
    Singular { role: MatrixRole },
}

/// Caller-supplied matrices for one frame. Unset matrices are the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneMatrices {
    pub model: Option<Mat4>,
    pub view: Option<Mat4>,
    pub projection: Option<Mat4>,
}

impl SceneMatrices {
    pub fn model(&self) -> Mat4 {
        self.model.unwrap_or(Mat4::IDENTITY)
    }

    pub fn view(&self) -> Mat4 {
        self.view.unwrap_or(Mat4::IDENTITY)
    }

    pub fn projection(&self) -> Mat4 {
        self.projection.unwrap_or(Mat4::IDENTITY)
    }
}

/// Everything the sphere needs from the camera for one frame.
///
/// The intersection kernel works in sphere-local (model) space:
/// `inverse_view_projection` maps clip space straight into it and
/// `ray_origin_local` is the camera seen from there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    /// `invert(projection * view * model)`.
    pub inverse_view_projection: Mat4,
    /// `invert(view) * origin`.
    pub camera_world: Vec3,
    /// `invert(model) * origin`.
    pub camera_sphere_local: Vec3,
    /// `invert(view * model) * origin`, the origin of every view ray.
    pub ray_origin_local: Vec3,
    pub inverse_model: Mat4,
}

impl FrameTransforms {
    /// Derive the frame's transforms. Nothing is cached between frames.
    pub fn compute(matrices: &SceneMatrices) -> Result<Self, TransformError> {
        let model = matrices.model();
        let view = matrices.view();
        let projection = matrices.projection();

        let inverse_model = invert(model, MatrixRole::Model)?;
        let inverse_view = invert(view, MatrixRole::View)?;
        let inverse_view_projection =
            invert(projection * view * model, MatrixRole::ViewProjection)?;

        let camera_world = apply(inverse_view, Vec4::W);
        let camera_sphere_local = apply(inverse_model, Vec4::W);
        let ray_origin_local = apply(inverse_model, camera_world.extend(1.0));

        Ok(Self {
            inverse_view_projection,
            camera_world,
            camera_sphere_local,
            ray_origin_local,
            inverse_model,
        })
    }

    /// Sphere-local view ray through a point in normalized device coordinates.
    ///
    /// The direction points from the camera to the far plane and is not
    /// normalized, matching what the vertex stage interpolates.
    pub fn ray_through(&self, ndc: Vec2) -> Ray {
        let far = apply(self.inverse_view_projection, Vec4::new(ndc.x, ndc.y, 1.0, 1.0));
        Ray {
            origin: self.ray_origin_local,
            direction: far - self.ray_origin_local,
        }
    }

    /// Bring a world-space sun direction into sphere-local space.
    pub fn sun_to_local(&self, sun: Vec3) -> Vec3 {
        self.inverse_model.transform_vector3(sun)
    }
}

fn invert(matrix: Mat4, role: MatrixRole) -> Result<Mat4, TransformError> {
    let determinant = matrix.determinant();
    if determinant == 0.0 || !determinant.is_finite() {
        return Err(TransformError::Singular { role });
    }
    let inverse = matrix.inverse();
    if !inverse.is_finite() {
        return Err(TransformError::Singular { role });
    }
    Ok(inverse)
}

/// Transform a homogeneous point and divide by `w` (skipped when `w` is 0).
fn apply(matrix: Mat4, point: Vec4) -> Vec3 {
    let transformed = matrix * point;
    if transformed.w == 0.0 {
        transformed.truncate()
    } else {
        transformed.truncate() / transformed.w
    }
}

/// A perspective camera looking at a target point.
///
/// Projection follows the GL clip-space convention (`z` in `[-1, 1]`).
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
}

impl Camera {
    /// A camera on the +Z axis at `distance`, looking at the origin.
    pub fn orbiting(distance: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, distance),
            ..Self::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update the aspect ratio. Zero-height viewports are ignored.
    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect_ratio = width / height;
        }
    }

    /// Matrices for drawing an object placed by `model` through this camera.
    pub fn scene_matrices(&self, model: Mat4) -> SceneMatrices {
        SceneMatrices {
            model: Some(model),
            view: Some(self.view_matrix()),
            projection: Some(self.projection_matrix()),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}
