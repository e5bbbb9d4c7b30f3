use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::assets::{EnvironmentMap, TextureMapping};
use crate::config::CameraConfig;
use crate::geometry::{self, MeshData, TorusKnotParams, TorusParams};
use crate::text::TextShape;
use crate::tween::{TweenTarget, TweenValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MaterialId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GeometryId(usize);

impl GeometryId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Shading model of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    /// Colors surfaces by their view-space normal.
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub kind: MaterialKind,
    pub transparent: bool,
    pub opacity: f32,
}

impl Material {
    pub fn normal() -> Self {
        Self {
            kind: MaterialKind::Normal,
            transparent: false,
            opacity: 1.0,
        }
    }
}

/// Shape data shared by any number of meshes.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Text(TextShape),
    Torus(TorusParams),
    TorusKnot(TorusKnotParams),
}

impl Geometry {
    pub fn label(&self) -> &'static str {
        match self {
            Geometry::Text(_) => "text",
            Geometry::Torus(_) => "torus",
            Geometry::TorusKnot(_) => "torus knot",
        }
    }

    pub fn build_mesh(&self) -> MeshData {
        match self {
            Geometry::Text(shape) => geometry::text_walls(shape),
            Geometry::Torus(params) => geometry::torus(params),
            Geometry::TorusKnot(params) => geometry::torus_knot(params),
        }
    }
}

/// Position, XYZ Euler rotation in radians, and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub transform: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl PerspectiveCamera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov: config.fov,
            aspect,
            near: config.near,
            far: config.far,
            position: config.position,
            target: Vec3::ZERO,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect.max(0.01), self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Runtime representation of the showcase scene.
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Option<Arc<EnvironmentMap>>,
    pub environment: Option<Arc<EnvironmentMap>>,
    pub camera: PerspectiveCamera,
    geometries: Vec<Geometry>,
    materials: Vec<Material>,
    meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new(camera: PerspectiveCamera) -> Self {
        Self {
            background: None,
            environment: None,
            camera,
            geometries: Vec::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
        }
    }

    /// Uses `map` both as the visible backdrop and as the lighting environment.
    pub fn set_environment(&mut self, map: Arc<EnvironmentMap>) {
        self.background = Some(Arc::clone(&map));
        self.environment = Some(map);
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id.0)
    }

    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|mesh| mesh.name == name)
    }

    pub fn apply_tween(&mut self, target: TweenTarget, value: TweenValue) {
        match (target, value) {
            (TweenTarget::MaterialOpacity(id), TweenValue::Scalar(opacity)) => {
                if let Some(material) = self.material_mut(id) {
                    material.opacity = opacity;
                }
            }
            (TweenTarget::CameraPosition, TweenValue::Vector(position)) => {
                self.camera.position = position;
            }
            (target, value) => {
                log::warn!("ignoring tween value {value:?} for {target:?}");
            }
        }
    }

    pub fn summary(&self) -> SceneSummary {
        let count = |label: &str| {
            self.meshes
                .iter()
                .filter(|mesh| {
                    self.geometry(mesh.geometry)
                        .is_some_and(|geometry| geometry.label() == label)
                })
                .count()
        };
        SceneSummary {
            environment: self
                .environment
                .as_ref()
                .map(|map| (map.width, map.height, map.mapping)),
            meshes: self.meshes.len(),
            text: count("text"),
            torus: count("torus"),
            torus_knots: count("torus knot"),
            materials: self.materials.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub environment: Option<(u32, u32, TextureMapping)>,
    pub meshes: usize,
    pub text: usize,
    pub torus: usize,
    pub torus_knots: usize,
    pub materials: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    fn scene() -> Scene {
        Scene::new(PerspectiveCamera::from_config(&CameraConfig::default(), 16.0 / 9.0))
    }

    #[test]
    fn environment_is_background_and_lighting() {
        let mut scene = scene();
        let map = Arc::new(EnvironmentMap {
            source: "sky.hdr".into(),
            width: 1,
            height: 1,
            mapping: TextureMapping::EquirectangularReflection,
            texels: vec![Vec3::ONE],
        });
        scene.set_environment(Arc::clone(&map));
        assert!(Arc::ptr_eq(scene.background.as_ref().unwrap(), &map));
        assert!(Arc::ptr_eq(scene.environment.as_ref().unwrap(), &map));
        assert_eq!(
            scene.summary().environment,
            Some((1, 1, TextureMapping::EquirectangularReflection))
        );
    }

    #[test]
    fn shared_geometry_counts_per_mesh() {
        let mut scene = scene();
        let material = scene.add_material(Material::normal());
        let torus = scene.add_geometry(Geometry::Torus(TorusParams::default()));
        for index in 0..3 {
            scene.add(Mesh {
                name: format!("torus-{index}"),
                geometry: torus,
                material,
                transform: Transform::default(),
            });
        }
        let summary = scene.summary();
        assert_eq!(summary.meshes, 3);
        assert_eq!(summary.torus, 3);
        assert_eq!(summary.torus_knots, 0);
        assert_eq!(scene.geometries().len(), 1);
    }

    #[test]
    fn tweens_write_into_scene() {
        let mut scene = scene();
        let material = scene.add_material(Material::normal());
        scene.apply_tween(TweenTarget::MaterialOpacity(material), TweenValue::Scalar(0.4));
        scene.apply_tween(TweenTarget::CameraPosition, TweenValue::Vector(Vec3::ONE));
        scene.apply_tween(TweenTarget::CameraPosition, TweenValue::Scalar(3.0));
        assert_eq!(scene.material(material).unwrap().opacity, 0.4);
        assert_eq!(scene.camera.position, Vec3::ONE);
    }

    #[test]
    fn transform_applies_scale_then_rotation_then_translation() {
        let transform = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
            scale: Vec3::splat(2.0),
        };
        let moved = transform.matrix().transform_point3(Vec3::X);
        assert!((moved - Vec3::new(1.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn camera_projects_target_to_screen_center() {
        let mut camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        camera.position = Vec3::new(2.0, 2.0, 10.0);
        let clip = camera.view_proj() * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
