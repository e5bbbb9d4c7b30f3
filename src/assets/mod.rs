//! Asset sources and the decoded assets the scene is built from.

pub mod environment;
pub mod font;
pub mod source;

pub use environment::{EnvironmentMap, TextureMapping};
pub use font::{Font, FontError, Glyph, OutlineCommand};
#[cfg(not(target_arch = "wasm32"))]
pub use source::FsAssetSource;
pub use source::{AssetSource, MemoryAssetSource};
