#![allow(unused)]

use std::path::{Path, PathBuf};

/// A disk image path under the host temp directory, unique per test and
/// removed again when the test finishes.
pub struct TempImage {
    path: PathBuf,
}

impl TempImage {
    pub fn new(name: &str) -> Self {
        let mut path = std::env::temp_dir();
        path.push(format!("platter-test-{}-{name}.img", std::process::id()));
        let _ = std::fs::remove_file(&path);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
