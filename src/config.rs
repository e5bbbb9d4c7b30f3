use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::text::TextGeometryParams;
use crate::tween::Ease;

/// Runtime settings. Every field has a default so partial JSON files work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowcaseConfig {
    pub environment_path: String,
    pub font_path: String,
    /// Fixed seed for the scatter; `None` draws a fresh one every run.
    pub seed: Option<u64>,
    pub layout: SceneLayout,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub max_pixel_ratio: f32,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            environment_path: "/environment/kloppenheim_06_puresky_2k.hdr".to_string(),
            font_path: "/fonts/helvetiker_regular.typeface.json".to_string(),
            seed: None,
            layout: SceneLayout::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            max_pixel_ratio: 2.0,
        }
    }
}

impl ShowcaseConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid showcase configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

/// What the assembled scene contains and how it animates in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLayout {
    pub headline: String,
    pub tagline: String,
    pub headline_offset_y: f32,
    pub text: TextGeometryParams,
    pub instance_pairs: usize,
    /// Edge length of the cube the instances are scattered in.
    pub spread: f32,
    pub fade_from: f32,
    pub fade_to: f32,
    pub fade_duration: f32,
    pub fade_ease: Ease,
    pub camera_destination: Vec3,
    pub camera_duration: f32,
    pub camera_ease: Ease,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            headline: "Say whaaaat!?".to_string(),
            tagline: "This is awesome!".to_string(),
            headline_offset_y: 1.2,
            text: TextGeometryParams::default(),
            instance_pairs: 100,
            spread: 20.0,
            fade_from: 0.2,
            fade_to: 1.0,
            fade_duration: 5.0,
            fade_ease: Ease::Power1Out,
            camera_destination: Vec3::new(2.0, 2.0, 10.0),
            camera_duration: 2.0,
            camera_ease: Ease::Power1Out,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(0.0, 0.0, 120.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}
