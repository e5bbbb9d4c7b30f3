//! Random scatter of the decorative torus / torus-knot pairs.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceKind {
    Torus,
    TorusKnot,
}

/// One scattered mesh. Rotation holds the x and y Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedInstance {
    pub kind: InstanceKind,
    pub position: Vec3,
    pub rotation: Vec2,
    pub scale: f32,
}

/// A knot is drawn this many times smaller than the torus it is paired with.
pub const KNOT_SCALE_DIVISOR: f32 = 5.0;

/// Generates `pairs` knot/torus pairs, knot first.
///
/// Positions are uniform in `[-spread/2, spread/2]` per axis and rotations in
/// `[0, π]`. Both meshes of a pair share one scale draw; the knot gets a fifth of it.
pub fn scatter_pairs<R: Rng>(rng: &mut R, pairs: usize, spread: f32) -> Vec<PlacedInstance> {
    let mut instances = Vec::with_capacity(pairs * 2);
    for _ in 0..pairs {
        let knot_position = random_position(rng, spread);
        let knot_rotation = random_rotation(rng);
        let scale: f32 = rng.random();
        instances.push(PlacedInstance {
            kind: InstanceKind::TorusKnot,
            position: knot_position,
            rotation: knot_rotation,
            scale: scale / KNOT_SCALE_DIVISOR,
        });
        instances.push(PlacedInstance {
            kind: InstanceKind::Torus,
            position: random_position(rng, spread),
            rotation: random_rotation(rng),
            scale,
        });
    }
    instances
}

fn random_position<R: Rng>(rng: &mut R, spread: f32) -> Vec3 {
    let mut axis = || (rng.random::<f32>() - 0.5) * spread;
    let x = axis();
    let y = axis();
    let z = axis();
    Vec3::new(x, y, z)
}

fn random_rotation<R: Rng>(rng: &mut R) -> Vec2 {
    let x = rng.random::<f32>() * PI;
    let y = rng.random::<f32>() * PI;
    Vec2::new(x, y)
}

/// Deterministic generator when `seed` is set, otherwise seeded from platform entropy.
pub fn scene_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => unseeded_rng(),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn unseeded_rng() -> ChaCha8Rng {
    ChaCha8Rng::from_rng(&mut rand::rng())
}

#[cfg(target_arch = "wasm32")]
fn unseeded_rng() -> ChaCha8Rng {
    let high = (js_sys::Math::random() * u32::MAX as f64) as u64;
    let low = (js_sys::Math::random() * u32::MAX as f64) as u64;
    ChaCha8Rng::seed_from_u64(high << 32 | low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_one_hundred_pairs() {
        let mut rng = scene_rng(Some(7));
        let instances = scatter_pairs(&mut rng, 100, 20.0);
        assert_eq!(instances.len(), 200);
        let knots = instances
            .iter()
            .filter(|instance| instance.kind == InstanceKind::TorusKnot)
            .count();
        assert_eq!(knots, 100);
    }

    #[test]
    fn knot_scale_is_a_fifth_of_its_torus() {
        let mut rng = scene_rng(Some(11));
        for pair in scatter_pairs(&mut rng, 100, 20.0).chunks_exact(2) {
            let (knot, torus) = (&pair[0], &pair[1]);
            assert_eq!(knot.kind, InstanceKind::TorusKnot);
            assert_eq!(torus.kind, InstanceKind::Torus);
            assert!((knot.scale - torus.scale / 5.0).abs() < 1e-6);
            assert!((0.0..1.0).contains(&torus.scale));
        }
    }

    #[test]
    fn samples_stay_in_bounds() {
        for seed in 0..50 {
            let mut rng = scene_rng(Some(seed));
            for instance in scatter_pairs(&mut rng, 100, 20.0) {
                assert!(instance.position.abs().max_element() <= 10.0);
                assert!((0.0..=PI).contains(&instance.rotation.x));
                assert!((0.0..=PI).contains(&instance.rotation.y));
            }
        }
    }

    #[test]
    fn same_seed_same_scene() {
        let a = scatter_pairs(&mut scene_rng(Some(42)), 10, 20.0);
        let b = scatter_pairs(&mut scene_rng(Some(42)), 10, 20.0);
        let c = scatter_pairs(&mut scene_rng(Some(43)), 10, 20.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn unseeded_generator_still_scatters() {
        let instances = scatter_pairs(&mut scene_rng(None), 3, 20.0);
        assert_eq!(instances.len(), 6);
    }
}
