//! Camera for ray generation.
//!
//! Rays are built in camera space, where the eye sits at the origin looking
//! down -Z with the image plane at `z = -1`, and then carried into the world by
//! the inverse view matrix.

use lentil_core::CameraDesc;
use lentil_math::{Mat4, Ray, Vec3};
use rand::RngCore;

use crate::lens::LensSystem;
use crate::sampling::random_in_unit_disk;

/// Camera for generating primary rays.
#[derive(Debug, Clone)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    position: Vec3,
    view: Mat4,
    inverse_view: Mat4,

    aspect: f32,
    height_angle: f32,
    plane_width: f32,
    plane_height: f32,

    aperture: f32,
    focal_length: f32,
}

impl Camera {
    /// Create a camera for an image of the given size.
    pub fn new(desc: &CameraDesc, image_width: u32, image_height: u32) -> Self {
        let look = desc.look.try_normalize().unwrap_or(Vec3::NEG_Z);
        let up = desc.up.try_normalize().unwrap_or(Vec3::Y);
        let view = Mat4::look_to_rh(desc.position, look, up);

        let aspect = image_width.max(1) as f32 / image_height.max(1) as f32;
        let plane_height = 2.0 * (desc.height_angle / 2.0).tan();

        Self {
            image_width,
            image_height,
            position: desc.position,
            view,
            inverse_view: view.inverse(),
            aspect,
            height_angle: desc.height_angle,
            plane_width: aspect * plane_height,
            plane_height,
            aperture: desc.aperture,
            focal_length: desc.focal_length,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// World-to-camera transform.
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    pub fn inverse_view_matrix(&self) -> &Mat4 {
        &self.inverse_view
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    /// Vertical field of view in radians.
    pub fn height_angle(&self) -> f32 {
        self.height_angle
    }

    /// Horizontal field of view in radians.
    pub fn width_angle(&self) -> f32 {
        2.0 * (self.plane_width / 2.0).atan()
    }

    /// Camera-space direction through image coordinates `(x, y)`.
    ///
    /// Coordinates are continuous pixel positions: `(col + 0.5, row + 0.5)`
    /// is the center of a pixel, row 0 is the top of the image.
    pub fn camera_direction(&self, x: f32, y: f32) -> Vec3 {
        let u = x / self.image_width as f32 - 0.5;
        let v = 0.5 - y / self.image_height as f32;
        Vec3::new(u * self.plane_width, v * self.plane_height, -1.0)
    }

    /// Pinhole ray through image coordinates `(x, y)`.
    pub fn pinhole_ray(&self, x: f32, y: f32, time: f32) -> Ray {
        let direction = self.camera_direction(x, y);
        Ray::new(self.position, self.inverse_view.transform_vector3(direction), time)
    }

    /// Thin-lens ray: origin jittered over the aperture disk, aimed at the
    /// point `focal_length` away from the eye along the pinhole ray.
    pub fn depth_of_field_ray(&self, x: f32, y: f32, time: f32, rng: &mut dyn RngCore) -> Ray {
        let focus = self.camera_direction(x, y).normalize() * self.focal_length;
        let disk = random_in_unit_disk(rng) * (self.aperture / 2.0);
        let origin = Vec3::new(disk.x, disk.y, 0.0);

        Ray::new(
            self.inverse_view.transform_point3(origin),
            self.inverse_view.transform_vector3(focus - origin),
            time,
        )
    }

    /// Ray leaving a physical lens, or `None` if the lens rejects it.
    pub fn lens_ray(&self, x: f32, y: f32, lens: &LensSystem) -> Option<Ray> {
        let film_ray = Ray::new(Vec3::ZERO, self.camera_direction(x, y), 0.0);
        let out = lens.trace(&film_ray)?;

        Some(Ray::new(
            self.inverse_view.transform_point3(out.origin),
            self.inverse_view.transform_vector3(out.direction),
            out.time,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lentil_core::LensInterface;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn camera(desc: CameraDesc) -> Camera {
        Camera::new(&desc, 200, 100)
    }

    #[test]
    fn test_view_matrix_maps_eye_to_origin() {
        let desc = CameraDesc::looking_at(Vec3::new(3.0, 2.0, 1.0), Vec3::ZERO, Vec3::Y);
        let cam = camera(desc);

        let eye = cam.view_matrix().transform_point3(desc.position);
        assert!(eye.length() < 1e-5);

        // The look direction maps to -Z
        let forward = cam.view_matrix().transform_vector3(desc.look.normalize());
        assert!((forward - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_center_ray_follows_look() {
        let desc = CameraDesc::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let cam = camera(desc);

        let ray = cam.pinhole_ray(100.0, 50.0, 0.0);
        assert_eq!(ray.origin, desc.position);
        assert!((ray.direction.normalize() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_image_orientation() {
        let cam = camera(CameraDesc::default());

        // Top-left pixel looks up and to the left
        let d = cam.pinhole_ray(0.5, 0.5, 0.0).direction;
        assert!(d.x < 0.0 && d.y > 0.0);

        // Bottom-right looks down and to the right
        let d = cam.pinhole_ray(199.5, 99.5, 0.0).direction;
        assert!(d.x > 0.0 && d.y < 0.0);
    }

    #[test]
    fn test_field_of_view() {
        let desc = CameraDesc {
            height_angle: 90.0_f32.to_radians(),
            ..Default::default()
        };
        let cam = camera(desc);

        // Top edge of the image plane is 45 degrees up
        let d = cam.camera_direction(100.0, 0.0);
        assert!((d.y - 1.0).abs() < 1e-5);
        assert!((cam.aspect_ratio() - 2.0).abs() < 1e-6);
        assert!(cam.width_angle() > cam.height_angle());
    }

    #[test]
    fn test_zero_aperture_matches_pinhole() {
        let desc = CameraDesc {
            aperture: 0.0,
            focal_length: 3.0,
            ..Default::default()
        };
        let cam = camera(desc);
        let mut rng = StdRng::seed_from_u64(5);

        let pin = cam.pinhole_ray(30.5, 70.5, 0.0);
        let dof = cam.depth_of_field_ray(30.5, 70.5, 0.0, &mut rng);

        assert!((pin.origin - dof.origin).length() < 1e-6);
        assert!((pin.direction.normalize() - dof.direction.normalize()).length() < 1e-5);
    }

    #[test]
    fn test_depth_of_field_rays_converge_on_focus_point() {
        let desc = CameraDesc {
            aperture: 0.5,
            focal_length: 4.0,
            ..Default::default()
        };
        let cam = camera(desc);
        let mut rng = StdRng::seed_from_u64(9);

        let pin = cam.pinhole_ray(120.5, 40.5, 0.0);
        let focus = pin.origin + pin.direction.normalize() * 4.0;

        for _ in 0..16 {
            let ray = cam.depth_of_field_ray(120.5, 40.5, 0.0, &mut rng);
            assert!((ray.origin - desc.position).length() <= 0.25 + 1e-5);
            // Every sample passes through the pinhole ray's focus point
            assert!((ray.at(1.0) - focus).length() < 1e-4);
        }
    }

    #[test]
    fn test_corner_focus_is_focal_length_from_eye() {
        let desc = CameraDesc {
            height_angle: 1.2,
            aperture: 0.5,
            focal_length: 4.0,
            ..Default::default()
        };
        let cam = Camera::new(&desc, 100, 100);
        let mut rng = StdRng::seed_from_u64(3);

        let pin = cam.pinhole_ray(0.5, 0.5, 0.0);
        let ray = cam.depth_of_field_ray(0.5, 0.5, 0.0, &mut rng);

        // Each sample ray reaches the focus point at t = 1
        let focus = ray.at(1.0);
        let offset = focus - desc.position;

        assert!((offset.length() - 4.0).abs() < 1e-4);
        assert!(offset.normalize().cross(pin.direction.normalize()).length() < 1e-5);
    }

    #[test]
    fn test_lens_ray_with_open_stop() {
        let cam = camera(CameraDesc::default());
        let lens = LensSystem::from_prescription(&[LensInterface {
            radius: 0.0,
            thickness: 0.01,
            ior: 0.0,
            aperture: 10.0,
        }]);

        let ray = cam.lens_ray(100.0, 50.0, &lens).unwrap();
        // Leaves the stop 1cm in front of the eye, straight ahead
        assert!((ray.origin - Vec3::new(0.0, 0.0, 4.99)).length() < 1e-5);
        assert!((ray.direction.normalize() - Vec3::NEG_Z).length() < 1e-5);
    }
}
