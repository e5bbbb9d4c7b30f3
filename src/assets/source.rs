use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::fs::File;
#[cfg(not(target_arch = "wasm32"))]
use std::io::{ErrorKind, Read};
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::LoadError;

/// Where raw asset bytes come from.
///
/// `progress` receives `(bytes_loaded, bytes_total)`; a total of zero means the
/// size is not known yet.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    async fn fetch(
        &self,
        path: &str,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<Vec<u8>, LoadError>;
}

/// Reads assets from a directory on disk, resolving web-style absolute paths against it.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FsAssetSource {
    const CHUNK: usize = 64 * 1024;

    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetSource for FsAssetSource {
    async fn fetch(
        &self,
        path: &str,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<Vec<u8>, LoadError> {
        let resolved = self.resolve(path);
        let io_error = |source: std::io::Error| {
            if source.kind() == ErrorKind::NotFound {
                LoadError::NotFound {
                    url: path.to_string(),
                }
            } else {
                LoadError::Io {
                    url: path.to_string(),
                    source,
                }
            }
        };

        let mut file = File::open(&resolved).map_err(io_error)?;
        let total = file.metadata().map_err(io_error)?.len();
        let mut data = Vec::with_capacity(total as usize);
        let mut chunk = vec![0u8; Self::CHUNK];
        progress(0, total);
        loop {
            let read = file.read(&mut chunk).map_err(io_error)?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
            progress(data.len() as u64, total.max(data.len() as u64));
        }
        Ok(data)
    }
}

/// Assets already resident in memory. Records every requested path.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    files: HashMap<String, Arc<[u8]>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let data: Vec<u8> = data.into();
        self.files.insert(path.into(), Arc::from(data.into_boxed_slice()));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.read().clone()
    }
}

impl AssetSource for MemoryAssetSource {
    async fn fetch(
        &self,
        path: &str,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<Vec<u8>, LoadError> {
        self.requests.write().push(path.to_string());
        let data = self.files.get(path).ok_or_else(|| LoadError::NotFound {
            url: path.to_string(),
        })?;
        let len = data.len() as u64;
        progress(len, len);
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use std::io::Write;

    #[test]
    fn memory_source_reports_full_progress() {
        let source = MemoryAssetSource::new().with_file("a.bin", vec![1u8, 2, 3]);
        let mut seen = Vec::new();
        let data = block_on(source.fetch("a.bin", &mut |loaded, total| {
            seen.push((loaded, total))
        }))
        .unwrap();
        assert_eq!(data, vec![1, 2, 3]);
        assert_eq!(seen, vec![(3, 3)]);
        assert_eq!(source.requests(), vec!["a.bin".to_string()]);
    }

    #[test]
    fn memory_source_missing_file() {
        let source = MemoryAssetSource::new();
        let err = block_on(source.fetch("nope", &mut |_, _| {})).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn fs_source_strips_leading_slash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("fonts")).unwrap();
        let mut file = File::create(dir.path().join("fonts/a.json")).unwrap();
        file.write_all(b"{}").unwrap();

        let source = FsAssetSource::new(dir.path());
        let mut last = (0, 0);
        let data = block_on(source.fetch("/fonts/a.json", &mut |loaded, total| {
            last = (loaded, total)
        }))
        .unwrap();
        assert_eq!(data, b"{}");
        assert_eq!(last, (2, 2));
    }

    #[test]
    fn fs_source_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsAssetSource::new(dir.path());
        let err = block_on(source.fetch("missing.hdr", &mut |_, _| {})).unwrap_err();
        assert_eq!(err.url(), "missing.hdr");
        assert!(matches!(err, LoadError::NotFound { .. }));
    }
}
