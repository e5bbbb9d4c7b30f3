use glam::Vec3;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// How a texture is projected when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextureMapping {
    #[default]
    Uv,
    EquirectangularReflection,
}

impl TextureMapping {
    pub fn label(self) -> &'static str {
        match self {
            TextureMapping::Uv => "uv",
            TextureMapping::EquirectangularReflection => "equirectangular-reflection",
        }
    }
}

/// Decoded high dynamic range panorama used as backdrop and light source.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentMap {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub mapping: TextureMapping,
    /// Linear RGB radiance, row-major.
    pub texels: Vec<Vec3>,
}

impl EnvironmentMap {
    /// Decodes a Radiance RGBE (`.hdr`) image.
    pub fn from_hdr_bytes(source: &str, bytes: &[u8]) -> Result<Self, LoadError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)
            .map_err(|err| LoadError::Image {
                url: source.to_string(),
                source: err,
            })?
            .to_rgb32f();
        let (width, height) = image.dimensions();
        let texels = image
            .pixels()
            .map(|pixel| Vec3::new(pixel[0], pixel[1], pixel[2]))
            .collect();
        Ok(Self {
            source: source.to_string(),
            width,
            height,
            mapping: TextureMapping::Uv,
            texels,
        })
    }

    pub fn average_radiance(&self) -> Vec3 {
        if self.texels.is_empty() {
            return Vec3::ZERO;
        }
        self.texels.iter().copied().sum::<Vec3>() / self.texels.len() as f32
    }

    /// Average radiance squashed into display range with a Reinhard curve.
    pub fn backdrop_color(&self) -> Vec3 {
        let radiance = self.average_radiance();
        radiance / (Vec3::ONE + radiance)
    }
}

/// Flat uncompressed Radiance file. `[1, 1, 1, _]` is the old-style run marker and is refused.
#[cfg(test)]
pub(crate) fn sample_hdr(width: u32, height: u32, rgbe: [u8; 4]) -> Vec<u8> {
    assert!(
        rgbe[..3] != [1, 1, 1],
        "rgbe {rgbe:?} would be read as a run-length marker"
    );
    let mut bytes = format!(
        "#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y {height} +X {width}\n"
    )
    .into_bytes();
    for _ in 0..(width * height) {
        bytes.extend_from_slice(&rgbe);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_flat_radiance_file() {
        let bytes = sample_hdr(2, 2, [128, 128, 128, 129]);
        let map = EnvironmentMap::from_hdr_bytes("sky.hdr", &bytes).unwrap();
        assert_eq!((map.width, map.height), (2, 2));
        assert_eq!(map.texels.len(), 4);
        assert_eq!(map.mapping, TextureMapping::Uv);
        let average = map.average_radiance();
        assert!(average.x > 0.0 && (average.x - average.z).abs() < 1e-6);
    }

    #[test]
    fn backdrop_stays_in_display_range() {
        let bytes = sample_hdr(2, 1, [255, 255, 255, 140]);
        let map = EnvironmentMap::from_hdr_bytes("bright.hdr", &bytes).unwrap();
        let color = map.backdrop_color();
        assert!(color.max_element() < 1.0 && color.min_element() > 0.0);
    }

    #[test]
    fn dark_pixels_decode() {
        let bytes = sample_hdr(2, 2, [2, 1, 1, 128]);
        let map = EnvironmentMap::from_hdr_bytes("dark.hdr", &bytes).unwrap();
        assert_eq!(map.texels.len(), 4);
        assert!(map.backdrop_color().max_element() < 0.05);
    }

    #[test]
    #[should_panic(expected = "run-length marker")]
    fn fixture_refuses_run_marker_pixels() {
        sample_hdr(1, 1, [1, 1, 1, 128]);
    }

    #[test]
    fn garbage_is_an_image_error() {
        let err = EnvironmentMap::from_hdr_bytes("bad.hdr", b"not an image").unwrap_err();
        assert!(matches!(err, LoadError::Image { .. }));
        assert_eq!(err.url(), "bad.hdr");
    }
}
