// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Local disk-root registry (slave side).
//!
//! The disk-allocation variant of the selection engine: candidates are the
//! slave's physical storage locations instead of network slaves. Roots are
//! addressed in configuration by 1-based index (`1.assign=1+200, 2+200`);
//! an index beyond the configured root count is fatal at load time.
//!
//! Status is probed live with a local syscall: the root path must exist and
//! be a directory, and free space comes from `statvfs`. A failed probe
//! makes the root "unavailable now" for the current request only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::filters::CandidateDirectory;
use crate::domain::candidate::{CandidateStatus, SelectionCandidate, StatusError};

/// One physical storage location owned by a slave.
#[derive(Debug)]
pub struct DiskRoot {
    /// 1-based position in the configured root list.
    index: usize,
    name: String,
    path: PathBuf,
}

impl DiskRoot {
    fn new(index: usize, path: PathBuf) -> Self {
        Self {
            index,
            name: format!("root{index}"),
            path,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SelectionCandidate for DiskRoot {
    fn name(&self) -> &str {
        &self.name
    }

    async fn live_status(&self) -> Result<CandidateStatus, StatusError> {
        let meta = std::fs::metadata(&self.path)
            .map_err(|e| StatusError::Probe(format!("{}: {e}", self.path.display())))?;
        if !meta.is_dir() {
            return Err(StatusError::Probe(format!(
                "{}: not a directory",
                self.path.display()
            )));
        }
        let free_space = free_bytes(&self.path)?;
        Ok(CandidateStatus {
            available: true,
            // Roots track free space, not transfer counts.
            active_transfers: 0,
            free_space,
        })
    }
}

#[cfg(unix)]
fn free_bytes(path: &Path) -> Result<u64, StatusError> {
    use std::os::unix::ffi::OsStrExt;

    let cpath = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|_| StatusError::Probe(format!("{}: path contains NUL", path.display())))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: cpath is a valid NUL-terminated string and stat is a zeroed
    // out-parameter of the correct type.
    let rc = unsafe { libc::statvfs(cpath.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(StatusError::Probe(format!(
            "{}: {}",
            path.display(),
            std::io::Error::last_os_error()
        )));
    }
    // Space available to unprivileged writers, not total free space.
    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(not(unix))]
fn free_bytes(path: &Path) -> Result<u64, StatusError> {
    Err(StatusError::Probe(format!(
        "{}: free-space probe unsupported on this platform",
        path.display()
    )))
}

/// Ordered collection of a slave's configured disk roots.
pub struct RootCollection {
    roots: Vec<Arc<DiskRoot>>,
}

impl RootCollection {
    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self {
            roots: paths
                .into_iter()
                .enumerate()
                .map(|(i, path)| Arc::new(DiskRoot::new(i + 1, path)))
                .collect(),
        }
    }

    /// Look up a root by its 1-based index.
    pub fn get(&self, index: usize) -> Option<Arc<DiskRoot>> {
        if index == 0 {
            return None;
        }
        self.roots.get(index - 1).map(Arc::clone)
    }

    /// All roots, in configured order.
    pub fn all_roots(&self) -> Vec<Arc<DiskRoot>> {
        self.roots.clone()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Load-time token resolver: numeric 1-based indices, bounds-checked.
    pub fn directory(&self) -> RootDirectory<'_> {
        RootDirectory { roots: self }
    }
}

/// Resolves numeric configuration tokens against the configured roots.
pub struct RootDirectory<'a> {
    roots: &'a RootCollection,
}

impl CandidateDirectory for RootDirectory<'_> {
    fn resolve(&self, token: &str) -> Option<String> {
        let index: usize = token.parse().ok()?;
        self.roots.get(index).map(|root| root.name().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::fetch_status;

    fn collection(n: usize) -> RootCollection {
        RootCollection::from_paths((0..n).map(|i| PathBuf::from(format!("/data/disk{i}"))))
    }

    #[test]
    fn roots_are_named_by_index() {
        let roots = collection(3);
        assert_eq!(roots.get(1).unwrap().name(), "root1");
        assert_eq!(roots.get(3).unwrap().name(), "root3");
        assert!(roots.get(0).is_none());
        assert!(roots.get(4).is_none());
    }

    #[test]
    fn directory_rejects_out_of_range_and_non_numeric_tokens() {
        let roots = collection(2);
        let dir = roots.directory();
        assert_eq!(dir.resolve("1").as_deref(), Some("root1"));
        assert_eq!(dir.resolve("2").as_deref(), Some("root2"));
        assert!(dir.resolve("3").is_none());
        assert!(dir.resolve("0").is_none());
        assert!(dir.resolve("first").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probes_a_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        let roots = RootCollection::from_paths([dir.path().to_path_buf()]);
        let status = fetch_status(roots.get(1).unwrap().as_ref()).await.unwrap();
        assert!(status.available);
        assert!(status.free_space > 0);
    }

    #[tokio::test]
    async fn missing_path_is_a_probe_failure() {
        let roots = RootCollection::from_paths([PathBuf::from("/nonexistent/stord/root")]);
        let err = fetch_status(roots.get(1).unwrap().as_ref()).await.unwrap_err();
        assert!(matches!(err, StatusError::Probe(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_path_is_a_probe_failure() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let roots = RootCollection::from_paths([file.path().to_path_buf()]);
        let err = fetch_status(roots.get(1).unwrap().as_ref()).await.unwrap_err();
        assert!(matches!(err, StatusError::Probe(_)));
    }
}
