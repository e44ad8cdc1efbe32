use std::path::{Path, PathBuf};

use crate::error::CoreError;

pub const ZMSYNC_DIR: &str = ".zmsync";
pub const STATE_DIR: &str = "state";

pub fn zmsync_root(home: &Path) -> PathBuf {
    home.join(ZMSYNC_DIR)
}

pub fn state_dir(home: &Path) -> PathBuf {
    zmsync_root(home).join(STATE_DIR)
}

/// `<home>/.zmsync/state/<workspace>.json`
pub fn state_path(home: &Path, workspace: &str) -> PathBuf {
    state_dir(home).join(format!("{workspace}.json"))
}

pub fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}
