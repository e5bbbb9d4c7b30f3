//! Two-stage scene load pipeline: environment map, then font, then assembly.
//!
//! Each stage runs only after the previous one succeeded. A failure is logged
//! through the loading manager and short-circuits every later stage, leaving
//! the scene exactly as the last successful stage left it.

use std::sync::Arc;

use glam::Vec3;
use rand::Rng;

use crate::assets::{AssetSource, EnvironmentMap, Font, TextureMapping};
use crate::config::{SceneLayout, ShowcaseConfig};
use crate::data_model::SceneHandle;
use crate::error::{LoadError, SequenceError, Stage};
use crate::geometry::{TorusKnotParams, TorusParams};
use crate::loading::LoadingManager;
use crate::placement::{scatter_pairs, InstanceKind, PlacedInstance};
use crate::scene::{Geometry, Material, MaterialId, Mesh, Scene, Transform};
use crate::text::TextShape;
use crate::tween::{Timeline, TweenId, TweenTarget};

/// Assets resolved by the load stages, handed to assembly.
#[derive(Debug, Clone)]
pub struct SceneAssets {
    pub environment_map: Arc<EnvironmentMap>,
    pub font: Arc<Font>,
}

/// What a successful assembly added to the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub material: MaterialId,
    pub instances: Vec<PlacedInstance>,
    pub fade: TweenId,
    pub camera_flight: TweenId,
}

pub struct SceneSequencer<S: AssetSource> {
    source: S,
    manager: LoadingManager,
    config: ShowcaseConfig,
}

impl<S: AssetSource> SceneSequencer<S> {
    pub fn new(source: S, manager: LoadingManager, config: ShowcaseConfig) -> Self {
        Self {
            source,
            manager,
            config,
        }
    }

    pub fn manager(&self) -> &LoadingManager {
        &self.manager
    }

    pub fn config(&self) -> &ShowcaseConfig {
        &self.config
    }

    /// Loads the HDR map and installs it as the scene background and lighting environment.
    pub async fn load_environment(
        &mut self,
        path: &str,
        handle: &SceneHandle,
    ) -> Result<Arc<EnvironmentMap>, LoadError> {
        let mut map = self
            .load_item(path, |url, bytes| EnvironmentMap::from_hdr_bytes(url, bytes))
            .await?;
        map.mapping = TextureMapping::EquirectangularReflection;
        let map = Arc::new(map);
        handle.update(|scene| scene.set_environment(Arc::clone(&map)));
        log::info!(
            "environment map {path} applied ({}x{})",
            map.width,
            map.height
        );
        Ok(map)
    }

    pub async fn load_font(&mut self, path: &str) -> Result<Arc<Font>, LoadError> {
        let font = self
            .load_item(path, |url, bytes| {
                Font::from_json(bytes).map_err(|source| LoadError::Font {
                    url: url.to_string(),
                    source,
                })
            })
            .await?;
        log::info!("font {path} loaded with {} glyphs", font.glyph_count());
        Ok(Arc::new(font))
    }

    /// Runs both load stages in order and assembles the scene once they succeeded.
    pub async fn run<R: Rng>(
        &mut self,
        handle: &SceneHandle,
        rng: &mut R,
    ) -> Result<AssemblyReport, SequenceError> {
        let environment_path = self.config.environment_path.clone();
        let font_path = self.config.font_path.clone();

        let environment_map = self
            .load_environment(&environment_path, handle)
            .await
            .map_err(|err| self.short_circuit(Stage::Environment, err))?;
        let font = self
            .load_font(&font_path)
            .await
            .map_err(|err| self.short_circuit(Stage::Font, err))?;

        let assets = SceneAssets {
            environment_map,
            font,
        };
        let layout = &self.config.layout;
        let report = handle.update_with_timeline(|scene, timeline| {
            assemble_scene(scene, timeline, &assets.font, layout, rng)
        });
        log::info!(
            "scene assembled with {} instances",
            report.instances.len()
        );
        Ok(report)
    }

    fn short_circuit(&self, stage: Stage, source: LoadError) -> SequenceError {
        let err = SequenceError::new(stage, source);
        let skipped = err.skipped();
        if skipped.is_empty() {
            log::warn!("{err}: {}; scene assembly skipped", err.source);
        } else {
            let names: Vec<String> = skipped.iter().map(ToString::to_string).collect();
            log::warn!(
                "{err}: {}; skipped {} stage and scene assembly",
                err.source,
                names.join(", ")
            );
        }
        err
    }

    async fn load_item<T, D>(&mut self, path: &str, decode: D) -> Result<T, LoadError>
    where
        D: FnOnce(&str, &[u8]) -> Result<T, LoadError>,
    {
        self.manager.item_start(path);
        let Self {
            source, manager, ..
        } = self;
        let result = source
            .fetch(path, &mut |loaded, total| {
                manager.item_progress(path, loaded, total)
            })
            .await
            .and_then(|bytes| decode(path, &bytes));
        if result.is_err() {
            self.manager.item_error(path);
        }
        self.manager.item_end(path);
        result
    }
}

/// Builds the static scene content from a loaded font.
///
/// Every mesh shares one normal material. It starts transparent at the fade's
/// start opacity, so the fade tween brings in the whole scene at once.
pub fn assemble_scene<R: Rng>(
    scene: &mut Scene,
    timeline: &mut Timeline,
    font: &Font,
    layout: &SceneLayout,
    rng: &mut R,
) -> AssemblyReport {
    let material = scene.add_material(Material {
        transparent: true,
        opacity: layout.fade_from,
        ..Material::normal()
    });

    let headline = scene.add_geometry(Geometry::Text(TextShape::new(
        font,
        &layout.headline,
        layout.text,
    )));
    let tagline = scene.add_geometry(Geometry::Text(TextShape::new(
        font,
        &layout.tagline,
        layout.text,
    )));
    scene.add(Mesh {
        name: "headline".to_string(),
        geometry: headline,
        material,
        transform: Transform {
            position: Vec3::new(0.0, layout.headline_offset_y, 0.0),
            ..Transform::default()
        },
    });
    scene.add(Mesh {
        name: "tagline".to_string(),
        geometry: tagline,
        material,
        transform: Transform::default(),
    });

    let fade = timeline.to(
        TweenTarget::MaterialOpacity(material),
        layout.fade_from,
        layout.fade_to,
        layout.fade_duration,
        layout.fade_ease,
    );
    let camera_flight = timeline.to(
        TweenTarget::CameraPosition,
        scene.camera.position,
        layout.camera_destination,
        layout.camera_duration,
        layout.camera_ease,
    );

    let torus = scene.add_geometry(Geometry::Torus(TorusParams::default()));
    let torus_knot = scene.add_geometry(Geometry::TorusKnot(TorusKnotParams::default()));
    let instances = scatter_pairs(rng, layout.instance_pairs, layout.spread);
    for (index, instance) in instances.iter().enumerate() {
        let (name, geometry) = match instance.kind {
            InstanceKind::TorusKnot => (format!("torus-knot-{}", index / 2), torus_knot),
            InstanceKind::Torus => (format!("torus-{}", index / 2), torus),
        };
        scene.add(Mesh {
            name,
            geometry,
            material,
            transform: Transform {
                position: instance.position,
                rotation: instance.rotation.extend(0.0),
                scale: Vec3::splat(instance.scale),
            },
        });
    }

    AssemblyReport {
        material,
        instances,
        fade,
        camera_flight,
    }
}

#[cfg(test)]
mod tests {
    use pollster::block_on;

    use super::*;
    use crate::assets::environment::sample_hdr;
    use crate::assets::font::SAMPLE_FONT;
    use crate::assets::MemoryAssetSource;
    use crate::config::CameraConfig;
    use crate::placement::scene_rng;
    use crate::progress::{ProgressTracker, RecordingSink};
    use crate::scene::PerspectiveCamera;

    const ENVIRONMENT: &str = "/environment/kloppenheim_06_puresky_2k.hdr";
    const FONT: &str = "/fonts/helvetiker_regular.typeface.json";

    fn handle() -> SceneHandle {
        SceneHandle::new(Scene::new(PerspectiveCamera::from_config(
            &CameraConfig::default(),
            1.5,
        )))
    }

    fn sequencer(source: MemoryAssetSource) -> (SceneSequencer<MemoryAssetSource>, RecordingSink) {
        let sink = RecordingSink::new();
        let manager = LoadingManager::new(ProgressTracker::new(sink.clone()));
        (
            SceneSequencer::new(source, manager, ShowcaseConfig::default()),
            sink,
        )
    }

    fn full_source() -> MemoryAssetSource {
        MemoryAssetSource::new()
            .with_file(ENVIRONMENT, sample_hdr(4, 2, [128, 128, 160, 129]))
            .with_file(FONT, SAMPLE_FONT)
    }

    #[test]
    fn successful_run_assembles_full_scene() {
        let handle = handle();
        let (mut sequencer, sink) = sequencer(full_source());
        let report = block_on(sequencer.run(&handle, &mut scene_rng(Some(3)))).unwrap();

        assert_eq!(report.instances.len(), 200);
        let summary = handle.summary();
        assert_eq!(summary.meshes, 202);
        assert_eq!(summary.text, 2);
        assert_eq!(summary.torus, 100);
        assert_eq!(summary.torus_knots, 100);
        assert_eq!(summary.materials, 1);
        assert_eq!(
            summary.environment,
            Some((4, 2, TextureMapping::EquirectangularReflection))
        );
        assert_eq!(sink.percent(), Some(100.0));
        assert!(!sink.is_visible());
        assert_eq!(sequencer.manager().items_loaded(), 2);
    }

    #[test]
    fn headline_is_raised_and_tweens_are_scheduled() {
        let handle = handle();
        let (mut sequencer, _) = sequencer(full_source());
        let report = block_on(sequencer.run(&handle, &mut scene_rng(Some(1)))).unwrap();

        handle.read(|scene| {
            let headline = scene.mesh("headline").unwrap();
            assert_eq!(headline.transform.position, Vec3::new(0.0, 1.2, 0.0));
            assert_eq!(scene.mesh("tagline").unwrap().transform.position, Vec3::ZERO);
            let material = scene.material(report.material).unwrap();
            assert!(material.transparent);
            assert_eq!(material.opacity, 0.2);
            assert!(scene.meshes().iter().all(|mesh| mesh.material == report.material));
        });

        let fade = handle.timeline(|timeline| timeline.get(report.fade).cloned()).unwrap();
        assert_eq!(fade.duration, 5.0);
        let flight = handle
            .timeline(|timeline| timeline.get(report.camera_flight).cloned())
            .unwrap();
        assert_eq!(flight.duration, 2.0);

        handle.advance(5.0);
        handle.read(|scene| {
            assert_eq!(scene.camera.position, Vec3::new(2.0, 2.0, 10.0));
            assert_eq!(scene.material(report.material).unwrap().opacity, 1.0);
        });
    }

    #[test]
    fn font_failure_keeps_environment_and_adds_no_meshes() {
        let handle = handle();
        let source = MemoryAssetSource::new()
            .with_file(ENVIRONMENT, sample_hdr(2, 2, [2, 1, 1, 128]));
        let (mut sequencer, sink) = sequencer(source);
        let err = block_on(sequencer.run(&handle, &mut scene_rng(Some(5)))).unwrap_err();

        assert_eq!(err.stage, Stage::Font);
        assert!(err.skipped().is_empty());
        let summary = handle.summary();
        assert!(summary.environment.is_some());
        assert_eq!(summary.meshes, 0);
        assert!(handle.timeline(Timeline::is_empty));
        assert!(!sink.is_visible());
    }

    #[test]
    fn environment_failure_never_requests_font() {
        let handle = handle();
        let source = MemoryAssetSource::new().with_file(FONT, SAMPLE_FONT);
        let (mut sequencer, _) = sequencer(source.clone());
        let err = block_on(sequencer.run(&handle, &mut scene_rng(Some(5)))).unwrap_err();

        assert_eq!(err.stage, Stage::Environment);
        assert_eq!(err.skipped(), vec![Stage::Font]);
        assert_eq!(source.requests(), vec![ENVIRONMENT.to_string()]);
        assert!(handle.summary().environment.is_none());
    }

    #[test]
    fn corrupt_font_is_a_font_stage_failure() {
        let handle = handle();
        let source = MemoryAssetSource::new()
            .with_file(ENVIRONMENT, sample_hdr(2, 2, [2, 1, 1, 128]))
            .with_file(FONT, "{ not json");
        let (mut sequencer, _) = sequencer(source);
        let err = block_on(sequencer.run(&handle, &mut scene_rng(None))).unwrap_err();
        assert!(matches!(err.source, LoadError::Font { .. }));
        assert_eq!(err.source.url(), FONT);
    }

    #[test]
    fn same_seed_assembles_same_layout() {
        let run = |seed| {
            let handle = handle();
            let (mut sequencer, _) = sequencer(full_source());
            block_on(sequencer.run(&handle, &mut scene_rng(Some(seed))))
                .unwrap()
                .instances
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn pair_meshes_use_pair_scale() {
        let font = Font::from_json(SAMPLE_FONT.as_bytes()).unwrap();
        let mut scene = Scene::new(PerspectiveCamera::from_config(&CameraConfig::default(), 1.0));
        let mut timeline = Timeline::new();
        let layout = SceneLayout {
            instance_pairs: 4,
            ..SceneLayout::default()
        };
        assemble_scene(&mut scene, &mut timeline, &font, &layout, &mut scene_rng(Some(2)));

        for index in 0..4 {
            let knot = scene.mesh(&format!("torus-knot-{index}")).unwrap();
            let torus = scene.mesh(&format!("torus-{index}")).unwrap();
            assert!((knot.transform.scale.x - torus.transform.scale.x / 5.0).abs() < 1e-6);
            assert_eq!(knot.transform.rotation.z, 0.0);
        }
        assert_eq!(scene.geometries().len(), 4);
        assert_eq!(timeline.len(), 2);
    }
}
