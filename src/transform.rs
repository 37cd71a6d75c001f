//! Column-major 4x4 builders used by the scene pass.
//!
//! Everything here is a thin, explicit layer over [`glam::Mat4`] so the
//! composition order the renderer depends on is spelled out in one place.

use glam::{Mat4, Vec3};

pub fn identity() -> Mat4 {
    Mat4::IDENTITY
}

/// Right-handed perspective projection with clip-space Z in `[-1, 1]`.
///
/// No validation: an `aspect` of zero yields non-finite entries and the
/// caller is expected to keep `0 < near < far`.
pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fovy / 2.0).tan();
    let range = near - far;
    Mat4::from_cols_array(&[
        f / aspect,
        0.0,
        0.0,
        0.0,
        0.0,
        f,
        0.0,
        0.0,
        0.0,
        0.0,
        (far + near) / range,
        -1.0,
        0.0,
        0.0,
        (2.0 * far * near) / range,
        0.0,
    ])
}

pub fn rotate_x(radians: f32) -> Mat4 {
    Mat4::from_rotation_x(radians)
}

pub fn rotate_y(radians: f32) -> Mat4 {
    Mat4::from_rotation_y(radians)
}

pub fn rotate_z(radians: f32) -> Mat4 {
    Mat4::from_rotation_z(radians)
}

/// Returns `a · b`; a vertex transformed by the result sees `b` first.
pub fn multiply(a: Mat4, b: Mat4) -> Mat4 {
    a * b
}

/// Overwrites the translation column of `m`, leaving the rotation block as is.
pub fn translate(mut m: Mat4, x: f32, y: f32, z: f32) -> Mat4 {
    m.w_axis.x = x;
    m.w_axis.y = y;
    m.w_axis.z = z;
    m
}

/// Object rotation with Z outermost: `rotate_z · (rotate_y · rotate_x)`.
pub fn model_matrix(rotation: Vec3) -> Mat4 {
    multiply(
        rotate_z(rotation.z),
        multiply(rotate_y(rotation.y), rotate_x(rotation.x)),
    )
}

/// View matrix for a camera that only translates.
pub fn view_matrix(camera_position: Vec3) -> Mat4 {
    translate(
        identity(),
        -camera_position.x,
        -camera_position.y,
        -camera_position.z,
    )
}

/// Models are rotation-only, so the model matrix doubles as the normal matrix.
/// Adding non-uniform scale would require the inverse transpose here.
pub fn normal_matrix(model: Mat4) -> Mat4 {
    model
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    use glam::Vec4;

    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn perspective_matches_gl_convention() {
        let ours = perspective(FRAC_PI_4, 4.0 / 3.0, 0.1, 100.0);
        let reference = Mat4::perspective_rh_gl(FRAC_PI_4, 4.0 / 3.0, 0.1, 100.0);
        assert!(ours.abs_diff_eq(reference, 1e-5));

        let near = ours * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = ours * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn perspective_with_zero_aspect_is_not_finite() {
        let m = perspective(FRAC_PI_4, 0.0, 0.1, 100.0);
        assert!(!m.x_axis.x.is_finite());
    }

    #[test]
    fn rotations_are_right_handed() {
        assert!(approx(rotate_x(FRAC_PI_2).transform_vector3(Vec3::Y), Vec3::Z));
        assert!(approx(rotate_y(FRAC_PI_2).transform_vector3(Vec3::Z), Vec3::X));
        assert!(approx(rotate_z(FRAC_PI_2).transform_vector3(Vec3::X), Vec3::Y));
    }

    #[test]
    fn multiply_applies_right_operand_first() {
        let a = rotate_z(FRAC_PI_2);
        let b = translate(identity(), 1.0, 0.0, 0.0);
        let p = multiply(a, b).transform_point3(Vec3::ZERO);
        assert!(approx(p, Vec3::Y));
    }

    #[test]
    fn model_rotation_applies_x_then_y_then_z() {
        let rotation = Vec3::new(0.3, 0.7, 1.1);
        let v = Vec3::new(0.2, -0.5, 0.9);
        let after_x = rotate_x(rotation.x).transform_vector3(v);
        let after_y = rotate_y(rotation.y).transform_vector3(after_x);
        let stepwise = rotate_z(rotation.z).transform_vector3(after_y);
        assert!(approx(model_matrix(rotation).transform_vector3(v), stepwise));
        assert_eq!(model_matrix(rotation).w_axis, Vec4::W);
    }

    #[test]
    fn translate_keeps_rotation_columns() {
        let rotated = rotate_y(0.5);
        let moved = translate(rotated, 1.0, 2.0, 3.0);
        assert_eq!(moved.x_axis, rotated.x_axis);
        assert_eq!(moved.z_axis, rotated.z_axis);
        assert_eq!(moved.w_axis, Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(moved.to_cols_array()[12..15], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn view_moves_world_away_from_camera() {
        let view = view_matrix(Vec3::new(0.0, 0.0, 5.0));
        assert!(approx(view.transform_point3(Vec3::ZERO), Vec3::new(0.0, 0.0, -5.0)));
    }
}
