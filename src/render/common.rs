use glam::{Mat3, Mat4, Vec3};

use crate::scene::{GeometryId, PerspectiveCamera, Scene};

/// Backdrop used until an environment map is installed.
pub const DEFAULT_CLEAR: Vec3 = Vec3::new(0.02, 0.02, 0.03);

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub view: Mat4,
    pub position: Vec3,
    /// `1 / tan(fov / 2)`: screen half-heights covered by one unit at unit depth.
    pub projection_scale: f32,
}

impl CameraParams {
    pub fn from_camera(camera: &PerspectiveCamera) -> Self {
        Self {
            view_proj: camera.view_proj(),
            view: camera.view(),
            position: camera.position,
            projection_scale: 1.0 / (camera.fov.to_radians() * 0.5).tan(),
        }
    }
}

/// One mesh ready to be drawn this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    pub name: String,
    pub geometry: GeometryId,
    pub model: Mat4,
    pub normal: Mat3,
    pub opacity: f32,
}

/// Flattens the scene into draw items, skipping meshes whose material is fully transparent.
pub fn draw_list(scene: &Scene) -> Vec<DrawItem> {
    scene
        .meshes()
        .iter()
        .filter_map(|mesh| {
            let material = scene.material(mesh.material)?;
            let opacity = if material.transparent {
                material.opacity.clamp(0.0, 1.0)
            } else {
                1.0
            };
            if opacity <= 0.0 {
                return None;
            }
            let model = mesh.transform.matrix();
            Some(DrawItem {
                name: mesh.name.clone(),
                geometry: mesh.geometry,
                model,
                normal: Mat3::from_mat4(model).inverse().transpose(),
                opacity,
            })
        })
        .collect()
}

pub fn clear_color(scene: &Scene) -> Vec3 {
    scene
        .background
        .as_ref()
        .map(|map| map.backdrop_color())
        .unwrap_or(DEFAULT_CLEAR)
}

/// Normal-material shading: maps a view-space normal from [-1, 1] to an RGB color.
pub fn normal_color(view_normal: Vec3) -> Vec3 {
    view_normal.normalize_or_zero() * 0.5 + Vec3::splat(0.5)
}
