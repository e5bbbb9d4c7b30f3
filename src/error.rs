use std::fmt;

use thiserror::Error;

use crate::assets::FontError;

/// Failure while fetching or decoding an asset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("asset not found: {url}")]
    NotFound { url: String },
    #[error("unable to read {url}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request for {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("unable to decode environment map {url}")]
    Image {
        url: String,
        #[source]
        source: image::ImageError,
    },
    #[error("unable to parse font {url}")]
    Font {
        url: String,
        #[source]
        source: FontError,
    },
}

impl LoadError {
    pub fn url(&self) -> &str {
        match self {
            Self::NotFound { url }
            | Self::Io { url, .. }
            | Self::Fetch { url, .. }
            | Self::Image { url, .. }
            | Self::Font { url, .. } => url,
        }
    }
}

/// Steps of the scene load pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Environment,
    Font,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Environment, Stage::Font];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Environment => f.write_str("environment"),
            Stage::Font => f.write_str("font"),
        }
    }
}

/// A pipeline stage failed; every later stage and scene assembly were skipped.
#[derive(Debug, Error)]
#[error("{stage} stage failed")]
pub struct SequenceError {
    pub stage: Stage,
    #[source]
    pub source: LoadError,
}

impl SequenceError {
    pub fn new(stage: Stage, source: LoadError) -> Self {
        Self { stage, source }
    }

    pub fn skipped(&self) -> Vec<Stage> {
        Stage::ALL
            .iter()
            .copied()
            .skip_while(|stage| *stage != self.stage)
            .skip(1)
            .collect()
    }
}
