use std::sync::Arc;

use parking_lot::RwLock;

use crate::scene::{Scene, SceneSummary};
use crate::tween::Timeline;

/// Thread-safe handle shared by the loader, the frame loop and the renderer.
///
/// Locks are only taken inside the closures passed to [`SceneHandle::read`]
/// and [`SceneHandle::update`], so a guard never outlives a single call.
#[derive(Debug)]
pub struct SceneHandle {
    scene: Arc<RwLock<Scene>>,
    timeline: Arc<RwLock<Timeline>>,
}

impl Clone for SceneHandle {
    fn clone(&self) -> Self {
        Self {
            scene: Arc::clone(&self.scene),
            timeline: Arc::clone(&self.timeline),
        }
    }
}

impl SceneHandle {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene: Arc::new(RwLock::new(scene)),
            timeline: Arc::new(RwLock::new(Timeline::new())),
        }
    }

    pub fn read<F, R>(&self, reader: F) -> R
    where
        F: FnOnce(&Scene) -> R,
    {
        reader(&self.scene.read())
    }

    pub fn update<F, R>(&self, updater: F) -> R
    where
        F: FnOnce(&mut Scene) -> R,
    {
        updater(&mut self.scene.write())
    }

    /// Mutates scene and timeline together, e.g. to add meshes and schedule their tweens.
    pub fn update_with_timeline<F, R>(&self, updater: F) -> R
    where
        F: FnOnce(&mut Scene, &mut Timeline) -> R,
    {
        let mut scene = self.scene.write();
        let mut timeline = self.timeline.write();
        updater(&mut scene, &mut timeline)
    }

    pub fn timeline<F, R>(&self, reader: F) -> R
    where
        F: FnOnce(&Timeline) -> R,
    {
        reader(&self.timeline.read())
    }

    /// Steps every tween by `dt` seconds and writes the results into the scene.
    pub fn advance(&self, dt: f32) {
        let updates = self.timeline.write().advance(dt);
        if updates.is_empty() {
            return;
        }
        let mut scene = self.scene.write();
        for (target, value) in updates {
            scene.apply_tween(target, value);
        }
    }

    pub fn summary(&self) -> SceneSummary {
        self.read(Scene::summary)
    }
}
