//! Math utilities and types
//!
//! Provides the fundamental math types used by the store and the renderer.
//! Matrices follow the OpenGL conventions: column-major storage, right-handed
//! view space looking down -Z, clip-space depth in `[-w, w]`.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Matrix helpers used across the engine
pub trait Mat4Ext {
    /// OpenGL perspective projection, `fov_y` in radians
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self;

    /// OpenGL orthographic projection
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self;

    /// Right-handed view matrix looking from `eye` towards `target`
    ///
    /// When `up` is parallel to the view direction a perpendicular axis is
    /// substituted so the result never contains NaNs.
    fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Self;

    /// Translation column of an affine matrix
    fn translation_part(&self) -> Vec3;

    /// Copy of the matrix with its translation column cleared
    fn with_translation_zeroed(&self) -> Self;

    /// Inverse-transpose used to transform normals, identity if singular
    fn normal_matrix(&self) -> Self;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::new_perspective(aspect, fov_y, near, far)
    }

    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::new_orthographic(left, right, bottom, top, near, far)
    }

    fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Self {
        let forward = target - eye;
        let up = utils::stable_up(&forward, up);
        Self::look_at_rh(&Point3::from(*eye), &Point3::from(*target), &up)
    }

    fn translation_part(&self) -> Vec3 {
        Vec3::new(self[(0, 3)], self[(1, 3)], self[(2, 3)])
    }

    fn with_translation_zeroed(&self) -> Self {
        let mut m = *self;
        m[(0, 3)] = 0.0;
        m[(1, 3)] = 0.0;
        m[(2, 3)] = 0.0;
        m
    }

    fn normal_matrix(&self) -> Self {
        self.try_inverse().map_or_else(Self::identity, |inv| inv.transpose())
    }
}

/// Builds `translation * rotation * scale` with the rotation given as XYZ
/// Euler angles in degrees.
pub fn compose_trs(translation: &Vec3, rotation_degrees: &Vec3, scale: &Vec3) -> Mat4 {
    let rotation = nalgebra::Rotation3::from_euler_angles(
        utils::deg_to_rad(rotation_degrees.x),
        utils::deg_to_rad(rotation_degrees.y),
        utils::deg_to_rad(rotation_degrees.z),
    );
    Mat4::new_translation(translation)
        * rotation.to_homogeneous()
        * Mat4::new_nonuniform_scaling(scale)
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;

    /// Threshold below which vectors are treated as degenerate
    pub const EPSILON: f32 = 1e-6;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Clamp a value between min and max
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        if value < min { min } else if value > max { max } else { value }
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Component-wise linear interpolation
    pub fn lerp_vec3(a: &Vec3, b: &Vec3, t: f32) -> Vec3 {
        a + (b - a) * t
    }

    /// Any unit vector perpendicular to `v`
    pub fn any_perpendicular(v: &Vec3) -> Vec3 {
        let helper = if v.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
        v.cross(&helper).try_normalize(constants::EPSILON).unwrap_or_else(Vec3::z)
    }

    /// `up` unless it is parallel to `forward`, in which case a perpendicular axis
    pub fn stable_up(forward: &Vec3, up: &Vec3) -> Vec3 {
        if forward.cross(up).norm_squared() < constants::EPSILON {
            any_perpendicular(forward)
        } else {
            *up
        }
    }
}
