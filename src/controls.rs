//! Orbit camera controls: drag to rotate around a target, wheel to dolly.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::config::ControlsConfig;
use crate::input::OrbitInput;
use crate::scene::PerspectiveCamera;

const POLAR_EPSILON: f32 = 1e-6;
const DOLLY_STEP: f32 = 0.95;

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    config: ControlsConfig,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
}

impl OrbitControls {
    pub fn new(config: ControlsConfig) -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            config,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    /// Queues rotation and dolly from pointer input. `viewport_height` is in the
    /// same pixel units as the drag distance.
    pub fn handle_input(&mut self, input: OrbitInput, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.delta_theta -= TAU * input.drag.x / height * self.config.rotate_speed;
        self.delta_phi -= TAU * input.drag.y / height * self.config.rotate_speed;

        if input.wheel != 0.0 {
            let step = DOLLY_STEP.powf(self.config.zoom_speed * input.wheel.abs());
            if input.wheel > 0.0 {
                self.scale /= step;
            } else {
                self.scale *= step;
            }
        }
    }

    /// Applies queued motion to `camera`. Returns `true` if the camera moved.
    ///
    /// With damping enabled only a fraction of the queued rotation is applied per
    /// call and the remainder decays, so this must run once per frame.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return false;
        }
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let factor = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * factor;
        phi += self.delta_phi * factor;
        phi = phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let position = self.target
            + Vec3::new(
                radius * sin_phi * theta.sin(),
                radius * phi.cos(),
                radius * sin_phi * theta.cos(),
            );

        if self.config.enable_damping {
            self.delta_theta *= 1.0 - factor;
            self.delta_phi *= 1.0 - factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;

        let moved = position.distance_squared(camera.position) > 1e-8;
        camera.position = position;
        camera.target = self.target;
        moved
    }
}
