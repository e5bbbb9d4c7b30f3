use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::assets::Font;

/// Extrusion settings for 3D text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextGeometryParams {
    pub size: f32,
    pub depth: f32,
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for TextGeometryParams {
    fn default() -> Self {
        Self {
            size: 0.7,
            depth: 0.7,
            curve_segments: 5,
            bevel_enabled: true,
            bevel_thickness: 0.05,
            bevel_size: 0.04,
            bevel_offset: 0.0,
            bevel_segments: 10,
        }
    }
}

/// Laid out, extruded text centered on its local origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    text: String,
    params: TextGeometryParams,
    contours: Vec<Vec<Vec2>>,
    min: Vec3,
    max: Vec3,
    translation: Vec3,
}

impl TextShape {
    pub fn new(font: &Font, text: &str, params: TextGeometryParams) -> Self {
        let contours = font.layout(text, params.size, params.curve_segments);
        let mut shape = Self {
            text: text.to_string(),
            params,
            contours,
            min: Vec3::ZERO,
            max: Vec3::ZERO,
            translation: Vec3::ZERO,
        };
        shape.center();
        shape
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &TextGeometryParams {
        &self.params
    }

    /// Outline contours in local space after centering.
    pub fn contours(&self) -> &[Vec<Vec2>] {
        &self.contours
    }

    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.min, self.max)
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Offset that was applied to move the bounding box center onto the origin.
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    fn raw_bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.contours.iter().flatten();
        let first = *points.next()?;
        let (mut lo, mut hi) = (first, first);
        for point in points {
            lo = lo.min(*point);
            hi = hi.max(*point);
        }

        let params = &self.params;
        let (grow, z_lo, z_hi) = if params.bevel_enabled {
            (
                params.bevel_size + params.bevel_offset,
                -params.bevel_thickness,
                params.depth + params.bevel_thickness,
            )
        } else {
            (0.0, 0.0, params.depth)
        };
        Some((
            (lo - Vec2::splat(grow)).extend(z_lo),
            (hi + Vec2::splat(grow)).extend(z_hi),
        ))
    }

    fn center(&mut self) {
        let Some((lo, hi)) = self.raw_bounds() else {
            return;
        };
        let translation = -(lo + hi) * 0.5;
        let shift = translation.truncate();
        for contour in &mut self.contours {
            for point in contour.iter_mut() {
                *point += shift;
            }
        }
        self.min = lo + translation;
        self.max = hi + translation;
        self.translation = translation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::font::SAMPLE_FONT;

    fn font() -> Font {
        Font::from_json(SAMPLE_FONT.as_bytes()).unwrap()
    }

    #[test]
    fn shape_is_centered_on_origin() {
        let shape = TextShape::new(&font(), "??", TextGeometryParams::default());
        let (min, max) = shape.bounds();
        assert!(((min + max) * 0.5).length() < 1e-5);
        assert!(shape.translation().length() > 0.0);
        for point in shape.contours().iter().flatten() {
            assert!(point.x >= min.x && point.x <= max.x);
            assert!(point.y >= min.y && point.y <= max.y);
        }
    }

    #[test]
    fn bevel_grows_the_bounds() {
        let params = TextGeometryParams::default();
        let shape = TextShape::new(&font(), "?", params);
        let flat = TextShape::new(
            &font(),
            "?",
            TextGeometryParams {
                bevel_enabled: false,
                ..params
            },
        );
        let extent = shape.extent();
        assert!((extent.z - (params.depth + 2.0 * params.bevel_thickness)).abs() < 1e-5);
        assert!((flat.extent().z - params.depth).abs() < 1e-5);
        assert!((extent.x - flat.extent().x - 2.0 * params.bevel_size).abs() < 1e-5);
    }

    #[test]
    fn whitespace_has_no_geometry() {
        let shape = TextShape::new(&font(), "   ", TextGeometryParams::default());
        assert!(shape.contours().is_empty());
        assert_eq!(shape.extent(), Vec3::ZERO);
    }
}
