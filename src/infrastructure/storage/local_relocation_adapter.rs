//! Infrastructure adapter that moves run artifacts to the secondary
//! destination on a local (or mounted) filesystem.

use crate::domain::entities::RelocationOutcome;
use crate::logging::RunLogger;
use crate::ports::relocation_port::Relocator;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Concrete implementation of `Relocator` for filesystem destinations.
pub struct LocalRelocationAdapter;

impl Relocator for LocalRelocationAdapter {
    fn relocate(
        &self,
        logger: &RunLogger,
        artifacts: &[PathBuf],
        destination: &Path,
    ) -> RelocationOutcome {
        // Idempotent: an already-existing destination directory is fine.
        if let Err(e) = fs::create_dir_all(destination) {
            return RelocationOutcome {
                moved: Vec::new(),
                failed: Some((destination.to_path_buf(), e.to_string())),
            };
        }

        let mut moved = Vec::new();
        for source in artifacts {
            let name = match source.file_name() {
                Some(name) => name,
                None => {
                    return RelocationOutcome {
                        moved,
                        failed: Some((source.clone(), "artifact has no file name".to_string())),
                    }
                }
            };
            let target = destination.join(name);
            match move_file(source, &target) {
                Ok(()) => {
                    logger.record(&format!("Moved {} -> {}", source.display(), target.display()));
                    moved.push(target);
                }
                Err(e) => {
                    return RelocationOutcome {
                        moved,
                        failed: Some((source.clone(), e.to_string())),
                    }
                }
            }
        }
        RelocationOutcome {
            moved,
            failed: None,
        }
    }
}

/// Moves a file, overwriting any file already at `target`.
///
/// `rename` fails across filesystems (the secondary destination is usually
/// a different mount), so it falls back to copy-then-remove.
fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(source, target)?;
            fs::remove_file(source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_logger(dir: &Path) -> RunLogger {
        RunLogger::new(dir.join("run.log"))
    }

    fn touch(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn moves_all_artifacts_creating_nested_destination() {
        let dir = tempfile::tempdir().unwrap();
        let bak = dir.path().join("SalesDB_202401011200.bak");
        let zip = dir.path().join("SalesDB_202401011200.zip");
        touch(&bak, "bak");
        touch(&zip, "zip");

        let dest = dir.path().join("secondary").join("sql");
        let outcome = LocalRelocationAdapter.relocate(
            &test_logger(dir.path()),
            &[bak.clone(), zip.clone()],
            &dest,
        );

        assert!(outcome.succeeded());
        assert_eq!(
            outcome.moved,
            vec![
                dest.join("SalesDB_202401011200.bak"),
                dest.join("SalesDB_202401011200.zip")
            ]
        );
        assert!(!bak.exists());
        assert!(!zip.exists());
        assert!(dest.join("SalesDB_202401011200.bak").exists());
    }

    #[test]
    fn existing_destination_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("secondary");
        fs::create_dir_all(&dest).unwrap();

        let a = dir.path().join("a.bak");
        touch(&a, "a");
        let outcome =
            LocalRelocationAdapter.relocate(&test_logger(dir.path()), &[a], &dest);
        assert!(outcome.succeeded());
    }

    #[test]
    fn collisions_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("secondary");
        fs::create_dir_all(&dest).unwrap();
        touch(&dest.join("a.bak"), "old");

        let a = dir.path().join("a.bak");
        touch(&a, "new");
        let outcome =
            LocalRelocationAdapter.relocate(&test_logger(dir.path()), &[a], &dest);

        assert!(outcome.succeeded());
        assert_eq!(fs::read_to_string(dest.join("a.bak")).unwrap(), "new");
    }

    #[test]
    fn failure_reports_what_moved_before_it() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("secondary");

        let a = dir.path().join("a.bak");
        touch(&a, "a");
        let missing = dir.path().join("missing.zip");

        let outcome = LocalRelocationAdapter.relocate(
            &test_logger(dir.path()),
            &[a, missing.clone()],
            &dest,
        );

        assert!(!outcome.succeeded());
        assert_eq!(outcome.moved, vec![dest.join("a.bak")]);
        let (failed_path, _reason) = outcome.failed.unwrap();
        assert_eq!(failed_path, missing);
    }
}
