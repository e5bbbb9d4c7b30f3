use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::text::TextShape;

/// GPU ready mesh buffers.
///
/// Vertices are laid out as `position.xyz` followed by `normal.xyz`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub const STRIDE: usize = 6;

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / Self::STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&[position.x, position.y, position.z]);
        self.vertices.extend_from_slice(&[normal.x, normal.y, normal.z]);
        index
    }

    fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorusParams {
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
}

impl Default for TorusParams {
    fn default() -> Self {
        Self {
            radius: 0.3,
            tube: 0.2,
            radial_segments: 32,
            tubular_segments: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorusKnotParams {
    pub radius: f32,
    pub tube: f32,
    pub tubular_segments: u32,
    pub radial_segments: u32,
    pub p: u32,
    pub q: u32,
}

impl Default for TorusKnotParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            tube: 0.1,
            tubular_segments: 50,
            radial_segments: 20,
            p: 2,
            q: 3,
        }
    }
}

/// Ring in the XY plane with a circular tube cross-section.
pub fn torus(params: &TorusParams) -> MeshData {
    let radial = params.radial_segments.max(2);
    let tubular = params.tubular_segments.max(3);
    let mut mesh = MeshData::default();

    for j in 0..=radial {
        let v = j as f32 / radial as f32 * TAU;
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * TAU;
            let ring = params.radius + params.tube * v.cos();
            let position = Vec3::new(ring * u.cos(), ring * u.sin(), params.tube * v.sin());
            let center = Vec3::new(params.radius * u.cos(), params.radius * u.sin(), 0.0);
            mesh.push_vertex(position, (position - center).normalize_or_zero());
        }
    }

    let row = tubular + 1;
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = row * j + i - 1;
            let b = row * (j - 1) + i - 1;
            let c = row * (j - 1) + i;
            let d = row * j + i;
            mesh.push_quad(a, b, c, d);
        }
    }
    mesh
}

/// Tube swept along a (p, q) torus knot curve.
pub fn torus_knot(params: &TorusKnotParams) -> MeshData {
    let tubular = params.tubular_segments.max(3);
    let radial = params.radial_segments.max(3);
    let (p, q) = (params.p.max(1) as f32, params.q as f32);
    let mut mesh = MeshData::default();

    let curve = |u: f32| {
        let q_over_p = q / p * u;
        let cs = q_over_p.cos();
        Vec3::new(
            params.radius * (2.0 + cs) * 0.5 * u.cos(),
            params.radius * (2.0 + cs) * 0.5 * u.sin(),
            params.radius * q_over_p.sin() * 0.5,
        )
    };

    for i in 0..=tubular {
        let u = i as f32 / tubular as f32 * p * TAU;
        let p1 = curve(u);
        let p2 = curve(u + 0.01);
        let tangent = p2 - p1;
        let mut normal = p2 + p1;
        let binormal = tangent.cross(normal).normalize_or_zero();
        normal = binormal.cross(tangent).normalize_or_zero();

        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            let cx = -params.tube * v.cos();
            let cy = params.tube * v.sin();
            let position = p1 + normal * cx + binormal * cy;
            mesh.push_vertex(position, (position - p1).normalize_or_zero());
        }
    }

    let row = radial + 1;
    for j in 1..=tubular {
        for i in 1..=radial {
            let a = row * (j - 1) + (i - 1);
            let b = row * j + (i - 1);
            let c = row * j + i;
            let d = row * (j - 1) + i;
            mesh.push_quad(a, b, c, d);
        }
    }
    mesh
}

/// Extruded side walls of every text contour between the shape's depth bounds.
///
/// Caps are not triangulated; the outline walls carry the letter forms.
pub fn text_walls(shape: &TextShape) -> MeshData {
    let (min, max) = shape.bounds();
    let mut mesh = MeshData::default();

    for contour in shape.contours() {
        for (index, start) in contour.iter().enumerate() {
            let end = contour[(index + 1) % contour.len()];
            let edge = end - *start;
            if edge.length_squared() <= f32::EPSILON {
                continue;
            }
            let normal = Vec3::new(edge.y, -edge.x, 0.0).normalize();
            let a = mesh.push_vertex(start.extend(min.z), normal);
            let b = mesh.push_vertex(end.extend(min.z), normal);
            let c = mesh.push_vertex(end.extend(max.z), normal);
            let d = mesh.push_vertex(start.extend(max.z), normal);
            mesh.push_quad(a, b, c, d);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::font::SAMPLE_FONT;
    use crate::assets::Font;
    use crate::text::TextGeometryParams;

    fn assert_unit_normals(mesh: &MeshData) {
        for chunk in mesh.vertices.chunks_exact(MeshData::STRIDE) {
            let normal = Vec3::new(chunk[3], chunk[4], chunk[5]);
            assert!((normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn torus_has_grid_topology() {
        let params = TorusParams::default();
        let mesh = torus(&params);
        assert_eq!(mesh.vertex_count(), 33 * 65);
        assert_eq!(mesh.triangle_count(), 32 * 64 * 2);
        assert_unit_normals(&mesh);
        let max_reach = mesh
            .vertices
            .chunks_exact(MeshData::STRIDE)
            .map(|chunk| Vec3::new(chunk[0], chunk[1], 0.0).length())
            .fold(0.0f32, f32::max);
        assert!((max_reach - (params.radius + params.tube)).abs() < 1e-4);
    }

    #[test]
    fn torus_knot_has_grid_topology() {
        let mesh = torus_knot(&TorusKnotParams::default());
        assert_eq!(mesh.vertex_count(), 51 * 21);
        assert_eq!(mesh.triangle_count(), 50 * 20 * 2);
        assert_unit_normals(&mesh);
        let vertex_count = mesh.vertex_count() as u32;
        assert!(mesh.indices.iter().all(|index| *index < vertex_count));
    }

    #[test]
    fn text_walls_span_the_extrusion() {
        let font = Font::from_json(SAMPLE_FONT.as_bytes()).unwrap();
        let shape = TextShape::new(&font, "?", TextGeometryParams::default());
        let mesh = text_walls(&shape);
        assert_eq!(mesh.triangle_count(), 4 * 2);
        assert_unit_normals(&mesh);
        let (min, max) = shape.bounds();
        for chunk in mesh.vertices.chunks_exact(MeshData::STRIDE) {
            assert!(chunk[2] == min.z || chunk[2] == max.z);
        }
    }
}
