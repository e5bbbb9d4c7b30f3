//! Time based property animations with queryable completion.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::scene::MaterialId;

/// Easing curve applied to normalized tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ease {
    Linear,
    /// Quadratic deceleration, `1 - (1 - t)^2`.
    #[default]
    Power1Out,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power1Out => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Animated property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TweenTarget {
    MaterialOpacity(MaterialId),
    CameraPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TweenValue {
    Scalar(f32),
    Vector(Vec3),
}

impl TweenValue {
    fn lerp(self, to: TweenValue, t: f32) -> TweenValue {
        match (self, to) {
            (TweenValue::Scalar(a), TweenValue::Scalar(b)) => TweenValue::Scalar(a + (b - a) * t),
            (TweenValue::Vector(a), TweenValue::Vector(b)) => TweenValue::Vector(a.lerp(b, t)),
            (_, to) => to,
        }
    }
}

impl From<f32> for TweenValue {
    fn from(value: f32) -> Self {
        TweenValue::Scalar(value)
    }
}

impl From<Vec3> for TweenValue {
    fn from(value: Vec3) -> Self {
        TweenValue::Vector(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TweenId(u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub id: TweenId,
    pub target: TweenTarget,
    pub from: TweenValue,
    pub to: TweenValue,
    pub duration: f32,
    pub ease: Ease,
    elapsed: f32,
    settled: bool,
}

impl Tween {
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    pub fn value(&self) -> TweenValue {
        self.from.lerp(self.to, self.ease.apply(self.progress()))
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

/// Owns every running tween and advances them with the frame clock.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    tweens: Vec<Tween>,
    next_id: u32,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an animation of `target` from `from` to `to` over `duration` seconds.
    pub fn to(
        &mut self,
        target: TweenTarget,
        from: impl Into<TweenValue>,
        to: impl Into<TweenValue>,
        duration: f32,
        ease: Ease,
    ) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.tweens.push(Tween {
            id,
            target,
            from: from.into(),
            to: to.into(),
            duration: duration.max(0.0),
            ease,
            elapsed: 0.0,
            settled: false,
        });
        id
    }

    /// Moves every unfinished tween forward and returns the values to apply this frame.
    pub fn advance(&mut self, dt: f32) -> Vec<(TweenTarget, TweenValue)> {
        let dt = dt.max(0.0);
        let mut updates = Vec::new();
        for tween in self.tweens.iter_mut() {
            if tween.settled {
                continue;
            }
            tween.elapsed += dt;
            updates.push((tween.target, tween.value()));
            tween.settled = tween.is_finished();
        }
        updates
    }

    pub fn get(&self, id: TweenId) -> Option<&Tween> {
        self.tweens.iter().find(|tween| tween.id == id)
    }

    pub fn is_finished(&self, id: TweenId) -> bool {
        self.get(id).map_or(true, |tween| tween.is_finished())
    }

    pub fn is_idle(&self) -> bool {
        self.tweens.iter().all(Tween::is_finished)
    }

    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }
}
