//! Camera framing and damped orbit controls.

use bevy_math::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::config::CameraConfig;
use crate::core::{Extents, Layout};

const POLAR_EPSILON: f32 = 1e-6;
const SETTLED: f32 = 1e-6;

/// Perspective camera in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraState {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Normalized device coordinates of `world`, or `None` behind the camera.
    pub fn project(&self, world: Vec3) -> Option<Vec3> {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        Some(clip.xyz() / clip.w)
    }

    /// Map NDC to pixel coordinates with the origin at the viewport centre
    /// and +Y up.
    pub fn ndc_to_viewport(ndc: Vec3, viewport: Vec2) -> Vec2 {
        Vec2::new(ndc.x, ndc.y) * viewport * 0.5
    }

    /// Returns `true` when the aspect ratio actually changed.
    pub fn set_aspect(&mut self, aspect: f32) -> bool {
        if !aspect.is_finite() || aspect <= 0.0 || (self.aspect - aspect).abs() < f32::EPSILON {
            return false;
        }
        self.aspect = aspect;
        true
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }
}

/// Orbit around a target with exponential damping of pending rotation and zoom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    /// Remaining azimuth and polar rotation, radians.
    pending_theta: f32,
    pending_phi: f32,
    /// Remaining zoom as a log-scale factor; zero means no zoom.
    pending_zoom: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3, config: &CameraConfig) -> Self {
        Self {
            target,
            enable_damping: true,
            damping_factor: config.damping_factor,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            min_polar: 0.0,
            max_polar: config.linear_max_polar,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_zoom: 0.0,
        }
    }

    /// Queue a rotation; positive `d_theta` orbits left, positive `d_phi` tilts up.
    pub fn rotate(&mut self, d_theta: f32, d_phi: f32) {
        self.pending_theta -= d_theta;
        self.pending_phi -= d_phi;
    }

    /// Queue a zoom; `factor > 1` moves away, `factor < 1` moves closer.
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.pending_zoom += factor.ln();
        }
    }

    pub fn is_settled(&self) -> bool {
        self.pending_theta.abs() < SETTLED
            && self.pending_phi.abs() < SETTLED
            && self.pending_zoom.abs() < SETTLED
    }

    /// Advance one frame. Applies a damped share of the pending motion,
    /// keeps the camera within the distance and polar limits and aims it at
    /// `target`. Returns `true` when the camera moved.
    pub fn update(&mut self, camera: &mut CameraState) -> bool {
        let share = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        let offset = camera.position - self.target;
        let radius = offset.length().max(POLAR_EPSILON);
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let idle = self.pending_theta == 0.0 && self.pending_phi == 0.0 && self.pending_zoom == 0.0;
        if idle
            && camera.target == self.target
            && (self.min_distance..=self.max_distance).contains(&radius)
            && (self.min_polar..=self.max_polar).contains(&phi)
        {
            return false;
        }

        theta += self.pending_theta * share;
        phi += self.pending_phi * share;
        let scaled = radius * (self.pending_zoom * share).exp();

        let phi = phi
            .clamp(self.min_polar, self.max_polar)
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
        let radius = scaled.clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.pending_theta *= keep;
            self.pending_phi *= keep;
            self.pending_zoom *= keep;
        } else {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
            self.pending_zoom = 0.0;
        }
        if self.is_settled() {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
            self.pending_zoom = 0.0;
        }

        let sin_phi = phi.sin();
        let position = self.target
            + Vec3::new(sin_phi * theta.sin(), phi.cos(), sin_phi * theta.cos()) * radius;
        let moved = position.distance(camera.position) > SETTLED || camera.target != self.target;
        if moved {
            camera.position = position;
            camera.target = self.target;
        }
        moved
    }
}

/// Initial camera and controls for a freshly built chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Framing {
    pub camera: CameraState,
    pub controls: OrbitControls,
}

/// Place the camera so the whole chart is in view.
///
/// Linear layouts are seen from the front, above and behind the midpoint of
/// the category axis. Radial layouts are seen from above and outside the
/// radius. The orbit's outer limit always leaves room to back away to twice
/// the framing distance.
pub fn frame_camera(extents: &Extents, config: &CameraConfig, aspect: f32) -> Framing {
    let focus = extents.focus();
    let (position, max_polar) = match extents.layout {
        Layout::Linear => {
            let span = extents.footprint().max(extents.height).max(1.0);
            let position = Vec3::new(
                focus.x,
                extents.base + extents.height.max(1.0) * config.height_factor,
                span * config.distance_factor,
            );
            (position, config.linear_max_polar)
        }
        Layout::Radial => {
            let radius = (extents.width * 0.5).max(1.0);
            let position = Vec3::new(
                0.0,
                extents.base + extents.height + radius * config.radial_elevation,
                radius * config.radial_distance,
            );
            (position, config.radial_max_polar)
        }
    };

    let camera = CameraState {
        position,
        target: focus,
        up: Vec3::Y,
        fov_y: config.fov_degrees.to_radians(),
        aspect: if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        },
        near: config.near,
        far: config.far,
    };

    let mut controls = OrbitControls::new(focus, config);
    controls.max_polar = max_polar;
    controls.max_distance = controls.max_distance.max(camera.distance() * 2.0);

    tracing::debug!(
        layout = ?extents.layout,
        position = ?camera.position,
        target = ?camera.target,
        "framed camera"
    );
    Framing { camera, controls }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bar_extents() -> Extents {
        Extents {
            layout: Layout::Linear,
            width: 2.4,
            depth: 0.8,
            peak_value: 10.0,
            height: 10.0,
            base: 0.0,
        }
    }

    fn pie_extents() -> Extents {
        Extents {
            layout: Layout::Radial,
            width: 11.0,
            depth: 11.0,
            peak_value: 60.0,
            height: 2.0,
            base: 0.2,
        }
    }

    #[test]
    fn linear_framing_looks_at_the_middle_from_the_front() {
        let framing = frame_camera(&bar_extents(), &CameraConfig::default(), 1.5);
        let cam = framing.camera;
        assert_relative_eq!(cam.target.x, 1.2);
        assert_relative_eq!(cam.target.y, 5.0);
        assert_relative_eq!(cam.position.x, 1.2);
        assert_relative_eq!(cam.position.y, 13.0, epsilon = 1e-4);
        assert_relative_eq!(cam.position.z, 13.0, epsilon = 1e-4);
        assert_eq!(cam.aspect, 1.5);
        assert_eq!(framing.controls.target, cam.target);
    }

    #[test]
    fn radial_framing_sits_above_and_outside() {
        let framing = frame_camera(&pie_extents(), &CameraConfig::default(), 1.0);
        let cam = framing.camera;
        assert_eq!(cam.target.x, 0.0);
        assert!(cam.position.y > 0.2 + 2.0);
        assert!(cam.position.z > 5.5);
        assert_relative_eq!(
            framing.controls.max_polar,
            std::f32::consts::PI / 2.2
        );
    }

    #[test]
    fn orbit_limit_allows_backing_away() {
        let mut config = CameraConfig::default();
        config.max_distance = 5.0;
        let framing = frame_camera(&bar_extents(), &config, 1.0);
        assert!(framing.controls.max_distance >= framing.camera.distance() * 2.0 - 1e-4);
    }

    #[test]
    fn framed_scene_projects_inside_the_viewport() {
        let framing = frame_camera(&bar_extents(), &CameraConfig::default(), 1.0);
        for corner in [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.4, 10.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
        ] {
            let ndc = framing.camera.project(corner).unwrap();
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{corner:?} -> {ndc:?}");
        }
    }

    #[test]
    fn idle_controls_leave_the_camera_alone() {
        let framing = frame_camera(&bar_extents(), &CameraConfig::default(), 1.0);
        let mut cam = framing.camera;
        let mut controls = framing.controls;
        assert!(!controls.update(&mut cam));
        assert_eq!(cam, framing.camera);
    }

    #[test]
    fn damping_spreads_rotation_over_frames() {
        let framing = frame_camera(&bar_extents(), &CameraConfig::default(), 1.0);
        let mut cam = framing.camera;
        let mut controls = framing.controls;
        controls.rotate(0.5, 0.0);

        assert!(controls.update(&mut cam));
        let after_one = cam.position;
        assert!(!controls.is_settled());
        for _ in 0..400 {
            controls.update(&mut cam);
        }
        assert!(controls.is_settled());
        // Distance to the target is preserved by pure rotation.
        assert_relative_eq!(cam.distance(), framing.camera.distance(), epsilon = 1e-3);
        assert!(after_one.distance(framing.camera.position) < cam.position.distance(framing.camera.position));
    }

    #[test]
    fn polar_clamp_keeps_camera_above_ground() {
        let framing = frame_camera(&pie_extents(), &CameraConfig::default(), 1.0);
        let mut cam = framing.camera;
        let mut controls = framing.controls;
        controls.enable_damping = false;
        controls.rotate(0.0, -3.0);
        controls.update(&mut cam);
        assert!(cam.position.y > cam.target.y);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let framing = frame_camera(&bar_extents(), &CameraConfig::default(), 1.0);
        let mut cam = framing.camera;
        let mut controls = framing.controls;
        controls.enable_damping = false;
        controls.zoom(1e-6);
        controls.update(&mut cam);
        assert_relative_eq!(cam.distance(), controls.min_distance, epsilon = 1e-3);
    }
}
