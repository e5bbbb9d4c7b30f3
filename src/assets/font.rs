use std::collections::HashMap;

use glam::Vec2;
use log::warn;
use serde::Deserialize;
use thiserror::Error;

/// Problems with a typeface JSON document.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("invalid typeface JSON")]
    Json(#[from] serde_json::Error),
    #[error("font resolution must be positive, got {0}")]
    Resolution(f32),
    #[error("glyph '{glyph}' has a malformed outline: {reason}")]
    Outline { glyph: String, reason: String },
}

/// One drawing command of a glyph outline, in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    QuadTo { control: Vec2, to: Vec2 },
    CubicTo { control1: Vec2, control2: Vec2, to: Vec2 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub advance: f32,
    pub commands: Vec<OutlineCommand>,
}

/// Typeface converted from a font file into a JSON glyph table.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub family: String,
    pub resolution: f32,
    line_height: f32,
    glyphs: HashMap<char, Glyph>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypefaceDocument {
    glyphs: HashMap<String, GlyphDocument>,
    #[serde(default)]
    family_name: String,
    resolution: f32,
    bounding_box: BoundingBoxDocument,
    #[serde(default)]
    underline_thickness: f32,
}

#[derive(Deserialize)]
struct GlyphDocument {
    ha: f32,
    #[serde(default)]
    o: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundingBoxDocument {
    y_min: f32,
    y_max: f32,
}

impl Font {
    pub fn from_json(bytes: &[u8]) -> Result<Self, FontError> {
        let document: TypefaceDocument = serde_json::from_slice(bytes)?;
        if document.resolution <= 0.0 || !document.resolution.is_finite() {
            return Err(FontError::Resolution(document.resolution));
        }

        let mut glyphs = HashMap::with_capacity(document.glyphs.len());
        for (key, glyph) in document.glyphs {
            let mut chars = key.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                warn!("skipping glyph entry {key:?}: not a single character");
                continue;
            };
            let commands = parse_outline(&glyph.o).map_err(|reason| FontError::Outline {
                glyph: key.clone(),
                reason,
            })?;
            glyphs.insert(
                ch,
                Glyph {
                    advance: glyph.ha,
                    commands,
                },
            );
        }

        let bbox = document.bounding_box;
        Ok(Self {
            family: document.family_name,
            resolution: document.resolution,
            line_height: bbox.y_max - bbox.y_min + document.underline_thickness,
            glyphs,
        })
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Lays out `text` at `size` world units per em and flattens every glyph
    /// outline into closed contours. Curves are sampled `curve_segments` times.
    ///
    /// Missing glyphs fall back to `?`; if that is missing too the character is skipped.
    pub fn layout(&self, text: &str, size: f32, curve_segments: u32) -> Vec<Vec<Vec2>> {
        let scale = size / self.resolution;
        let line_height = self.line_height * scale;
        let segments = curve_segments.max(1);
        let mut offset = Vec2::ZERO;
        let mut contours: Vec<Vec<Vec2>> = Vec::new();

        for ch in text.chars() {
            if ch == '\n' {
                offset.x = 0.0;
                offset.y -= line_height;
                continue;
            }
            let glyph = match self.glyphs.get(&ch) {
                Some(glyph) => glyph,
                None => {
                    warn!(
                        "character {ch:?} does not exist in font family {}",
                        self.family
                    );
                    match self.glyphs.get(&'?') {
                        Some(glyph) => glyph,
                        None => continue,
                    }
                }
            };

            let place = |point: Vec2| point * scale + offset;
            let mut cursor = Vec2::ZERO;
            for command in &glyph.commands {
                match *command {
                    OutlineCommand::MoveTo(to) => {
                        contours.push(vec![place(to)]);
                        cursor = to;
                    }
                    OutlineCommand::LineTo(to) => {
                        push_point(&mut contours, place(to));
                        cursor = to;
                    }
                    OutlineCommand::QuadTo { control, to } => {
                        for step in 1..=segments {
                            let t = step as f32 / segments as f32;
                            push_point(&mut contours, place(quadratic(cursor, control, to, t)));
                        }
                        cursor = to;
                    }
                    OutlineCommand::CubicTo {
                        control1,
                        control2,
                        to,
                    } => {
                        for step in 1..=segments {
                            let t = step as f32 / segments as f32;
                            push_point(
                                &mut contours,
                                place(cubic(cursor, control1, control2, to, t)),
                            );
                        }
                        cursor = to;
                    }
                }
            }
            offset.x += glyph.advance * scale;
        }

        contours.retain(|contour| contour.len() > 1);
        contours
    }
}

fn push_point(contours: &mut Vec<Vec<Vec2>>, point: Vec2) {
    match contours.last_mut() {
        Some(contour) => contour.push(point),
        None => contours.push(vec![point]),
    }
}

fn quadratic(from: Vec2, control: Vec2, to: Vec2, t: f32) -> Vec2 {
    let k = 1.0 - t;
    from * (k * k) + control * (2.0 * k * t) + to * (t * t)
}

fn cubic(from: Vec2, control1: Vec2, control2: Vec2, to: Vec2, t: f32) -> Vec2 {
    let k = 1.0 - t;
    from * (k * k * k) + control1 * (3.0 * k * k * t) + control2 * (3.0 * k * t * t) + to * (t * t * t)
}

/// Parses the space separated outline string (`m x y`, `l x y`, `q x y cx cy`,
/// `b x y c1x c1y c2x c2y`). Curve commands list the end point first.
fn parse_outline(outline: &str) -> Result<Vec<OutlineCommand>, String> {
    let mut tokens = outline.split_whitespace();
    let mut commands = Vec::new();

    let point = |tokens: &mut std::str::SplitWhitespace<'_>| -> Result<Vec2, String> {
        let mut next = || -> Result<f32, String> {
            let token = tokens
                .next()
                .ok_or_else(|| "outline ends in the middle of a command".to_string())?;
            token
                .parse::<f32>()
                .map_err(|err| format!("invalid coordinate {token:?}: {err}"))
        };
        let x = next()?;
        let y = next()?;
        Ok(Vec2::new(x, y))
    };

    while let Some(action) = tokens.next() {
        let command = match action {
            "m" => OutlineCommand::MoveTo(point(&mut tokens)?),
            "l" => OutlineCommand::LineTo(point(&mut tokens)?),
            "q" => {
                let to = point(&mut tokens)?;
                let control = point(&mut tokens)?;
                OutlineCommand::QuadTo { control, to }
            }
            "b" => {
                let to = point(&mut tokens)?;
                let control1 = point(&mut tokens)?;
                let control2 = point(&mut tokens)?;
                OutlineCommand::CubicTo {
                    control1,
                    control2,
                    to,
                }
            }
            "z" => continue,
            other => return Err(format!("unknown outline command {other:?}")),
        };
        commands.push(command);
    }
    Ok(commands)
}

#[cfg(test)]
pub(crate) const SAMPLE_FONT: &str = r#"{
    "glyphs": {
        "?": { "ha": 600, "x_min": 50, "x_max": 550, "o": "m 50 0 l 550 0 l 550 700 l 50 700 z" },
        "o": { "ha": 500, "x_min": 0, "x_max": 500, "o": "m 250 0 q 500 250 500 0 q 250 500 500 500 q 0 250 0 500 q 250 0 0 0" },
        "b": { "ha": 400, "x_min": 0, "x_max": 400, "o": "m 0 0 b 400 0 0 400 400 400 l 0 0" },
        " ": { "ha": 300, "x_min": 0, "x_max": 0, "o": "" }
    },
    "familyName": "Fixture",
    "ascender": 1000,
    "descender": -200,
    "underlinePosition": -100,
    "underlineThickness": 50,
    "boundingBox": { "yMin": -200, "xMin": 0, "yMax": 1000, "xMax": 600 },
    "resolution": 1000
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> Font {
        Font::from_json(SAMPLE_FONT.as_bytes()).unwrap()
    }

    #[test]
    fn parses_glyph_table() {
        let font = font();
        assert_eq!(font.family, "Fixture");
        assert_eq!(font.glyph_count(), 4);
        let question = font.glyph('?').unwrap();
        assert_eq!(question.advance, 600.0);
        assert_eq!(question.commands.len(), 4);
        assert!(font.glyph(' ').unwrap().commands.is_empty());
    }

    #[test]
    fn quadratic_lists_end_point_first() {
        let commands = parse_outline("m 0 0 q 10 0 5 5").unwrap();
        assert_eq!(
            commands[1],
            OutlineCommand::QuadTo {
                control: Vec2::new(5.0, 5.0),
                to: Vec2::new(10.0, 0.0),
            }
        );
    }

    #[test]
    fn truncated_outline_is_rejected() {
        let json = SAMPLE_FONT.replace("l 0 0\"", "l 0\"");
        let err = Font::from_json(json.as_bytes()).unwrap_err();
        assert!(matches!(err, FontError::Outline { ref glyph, .. } if glyph == "b"));
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let json = SAMPLE_FONT.replace("\"resolution\": 1000", "\"resolution\": 0");
        assert!(matches!(
            Font::from_json(json.as_bytes()),
            Err(FontError::Resolution(_))
        ));
    }

    #[test]
    fn layout_advances_and_scales() {
        let font = font();
        let contours = font.layout("??", 1.0, 4);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0][0], Vec2::new(0.05, 0.0));
        assert!((contours[1][0].x - 0.65).abs() < 1e-6);
    }

    #[test]
    fn missing_glyph_falls_back_to_question_mark() {
        let font = font();
        let fallback = font.layout("X", 1.0, 4);
        let direct = font.layout("?", 1.0, 4);
        assert_eq!(fallback, direct);
    }

    #[test]
    fn curves_are_sampled_per_segment() {
        let font = font();
        let contours = font.layout("o", 1.0, 5);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 1 + 4 * 5);
        let last = *contours[0].last().unwrap();
        assert!((last - Vec2::new(0.25, 0.0)).length() < 1e-6);
    }

    #[test]
    fn newline_moves_to_next_line() {
        let font = font();
        let contours = font.layout("?\n?", 1.0, 1);
        assert_eq!(contours.len(), 2);
        let line_height = (1000.0 + 200.0 + 50.0) / 1000.0;
        assert!((contours[1][0].y + line_height).abs() < 1e-6);
        assert_eq!(contours[1][0].x, contours[0][0].x);
    }
}
