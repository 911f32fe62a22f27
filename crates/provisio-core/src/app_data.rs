//! Where provisio stores its own data (config, persisted index).
//!
//! Corpus documents stay wherever the user keeps them. We only store app state here.

use std::path::PathBuf;

/// Subdirectory of the data dir holding the persisted index.
pub const INDEX_DIRNAME: &str = "index";

/// Returns the directory where provisio stores config, index, and other app data.
/// On Linux: `~/.local/share/provisio/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Provisio", "provisio")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Default location of the persisted index.
pub fn default_index_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join(INDEX_DIRNAME))
}
