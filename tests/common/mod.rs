// Common test utilities shared across integration tests
//
// Each test builds its inputs inside its own TempDir, so tests can run in
// parallel without sharing any files or output directories.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated directory holding a test's inputs and outputs
pub struct TestWorkspace {
    temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Workspace below the current directory, for tests passing relative
    /// paths
    pub fn new_in_current_dir() -> Self {
        let cwd = std::env::current_dir().expect("Failed to get current dir");
        Self {
            temp_dir: tempfile::Builder::new()
                .prefix(".transform-test")
                .tempdir_in(cwd)
                .expect("Failed to create temp dir"),
        }
    }

    /// Path of `relative` inside the workspace, relative to the current
    /// directory
    pub fn relative(&self, relative: &str) -> PathBuf {
        let cwd = std::env::current_dir().expect("Failed to get current dir");
        self.join(relative)
            .strip_prefix(&cwd)
            .expect("Workspace is not below the current dir")
            .to_path_buf()
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    pub fn create_file(&self, relative: &str, content: &str) -> PathBuf {
        let file_path = self.join(relative);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }

        fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    /// Write a `.tar.zst` archive containing `files` (path, content)
    pub fn create_archive(&self, relative: &str, files: &[(&str, &str)]) -> PathBuf {
        let mut tar_data = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_data);
            for (path, content) in files {
                let mut header = tar::Header::new_gnu();
                header.set_size(content.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder
                    .append_data(&mut header, path, content.as_bytes())
                    .expect("Failed to append to archive");
            }
            builder.finish().expect("Failed to finish archive");
        }

        let compressed = zstd::encode_all(tar_data.as_slice(), 3).expect("Failed to compress");
        let archive = self.join(relative);
        fs::write(&archive, compressed).expect("Failed to write archive");
        archive
    }
}
