pub mod blend_table;
pub mod info;
pub mod init;
pub mod run;
pub mod weights;

use std::path::{Path, PathBuf};

/// Session file name inside a session directory.
pub const SESSION_FILE: &str = "session.json";

/// Accept either a session file or the directory holding it.
pub fn session_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(SESSION_FILE)
    } else {
        path.to_path_buf()
    }
}
