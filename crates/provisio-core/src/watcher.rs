//! File watcher for a document source. Lets a long-running caller re-run
//! `get_or_build` when the corpus changes on disk.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify_debouncer_mini::notify;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use tracing::{debug, warn};

use crate::source::DocumentSource;

const DEBOUNCE: Duration = Duration::from_millis(400);

/// Watches the files behind `source` and calls `on_change` whenever they change (debounced).
/// Blocks until the process is stopped (e.g. Ctrl+C). Returns Err on setup failure.
pub fn watch_source(
    source: &DocumentSource,
    on_change: impl Fn() + Send + 'static,
) -> Result<(), WatchError> {
    let (target, mode) = watch_target(source)?;

    let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| match res {
        Ok(events) => {
            debug!(events = events.len(), "source changed");
            on_change();
        }
        Err(e) => warn!(error = %e, "watcher error"),
    })
    .map_err(|e| WatchError::Notify(e.to_string()))?;

    debouncer
        .watcher()
        .watch(&target, mode)
        .map_err(|e| WatchError::Watch(e.to_string()))?;

    let (_tx, rx) = mpsc::channel::<()>();
    rx.recv().ok();
    Ok(())
}

/// What to hand to notify for `source`: a corpus directory recursively, a PDF's
/// parent directory on its own.
fn watch_target(source: &DocumentSource) -> Result<(PathBuf, notify::RecursiveMode), WatchError> {
    match source {
        DocumentSource::Mock => Err(WatchError::NotWatchable),
        DocumentSource::TextCorpus { dir } => {
            if !dir.is_dir() {
                return Err(WatchError::NotADirectory(dir.clone()));
            }
            Ok((canonical(dir)?, notify::RecursiveMode::Recursive))
        }
        DocumentSource::Pdf { path } => {
            if !path.is_file() {
                return Err(WatchError::NotAFile(path.clone()));
            }
            let path = canonical(path)?;
            let parent = path
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| WatchError::NotAFile(path.clone()))?;
            Ok((parent, notify::RecursiveMode::NonRecursive))
        }
    }
}

fn canonical(path: &Path) -> Result<PathBuf, WatchError> {
    path.canonicalize().map_err(WatchError::Canonicalize)
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("the built-in corpus has no files to watch")]
    NotWatchable,
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("watcher init: {0}")]
    Notify(String),
    #[error("watch failed: {0}")]
    Watch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_source_cannot_be_watched() {
        assert!(matches!(
            watch_target(&DocumentSource::Mock),
            Err(WatchError::NotWatchable)
        ));
    }

    #[test]
    fn targets_match_source_kind() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("code.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();

        let (_, mode) = watch_target(&DocumentSource::TextCorpus {
            dir: dir.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(mode, notify::RecursiveMode::Recursive);

        let (target, mode) = watch_target(&DocumentSource::Pdf { path: pdf.clone() }).unwrap();
        assert_eq!(mode, notify::RecursiveMode::NonRecursive);
        assert_eq!(target, dir.path().canonicalize().unwrap());

        assert!(matches!(
            watch_target(&DocumentSource::Pdf {
                path: dir.path().to_path_buf()
            }),
            Err(WatchError::NotAFile(_))
        ));
    }
}
