//! Test utilities and helpers for unit tests

#[cfg(test)]
pub mod test_helpers {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::config::{ClientConfig, StorageConfig};

    /// Create a temporary directory for testing
    pub fn create_temp_dir() -> TempDir {
        tempfile::tempdir().expect("Failed to create temp dir")
    }

    /// Create a temporary file with content
    pub fn create_temp_file_with_content(dir: &TempDir, filename: &str, content: &[u8]) -> PathBuf {
        let file_path = dir.path().join(filename);
        std::fs::write(&file_path, content).expect("Failed to write temp file");
        file_path
    }

    /// Client configuration rooted in a temporary storage directory
    pub fn test_client_config(dir: &TempDir) -> ClientConfig {
        ClientConfig {
            storage: StorageConfig {
                dir: dir.path().to_path_buf(),
            },
            ..ClientConfig::default()
        }
    }

    /// Write raw content into the session storage file
    pub fn write_session_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = test_client_config(dir).storage.session_path();
        std::fs::write(&path, content).expect("Failed to write session file");
        path
    }
}
