// Transform utilities for Mat4
//
// glam::Mat4 already provides transform_point3(), transform_vector3() and
// inverse(); these helpers cover normals and bounding boxes.

use glam::{Mat3, Mat4, Vec3};
use crate::Aabb;

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// The 3x3 inverse-transpose used to carry normals through this transform.
    fn normal_matrix(&self) -> Mat3;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(*self).inverse().transpose()
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        let corners = aabb.corners();
        let first = self.transform_point3(corners[0]);

        let (result_min, result_max) = corners[1..]
            .iter()
            .map(|&corner| self.transform_point3(corner))
            .fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));

        Aabb::from_points(result_min, result_max)
    }
}

/// Map an object-space normal to world space given the cached normal matrix.
#[inline]
pub fn transform_normal(normal_matrix: &Mat3, normal: Vec3) -> Vec3 {
    (*normal_matrix * normal).normalize()
}
