//! Infrastructure adapter that wraps a snapshot into a single-entry ZIP.

use crate::domain::entities::StageResult;
use crate::domain::errors::Result;
use crate::logging::RunLogger;
use crate::ports::archive_port::Archiver;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use zip::result::ZipResult;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Concrete implementation of `Archiver` producing `.zip` containers.
///
/// The container holds exactly one entry, named after the source file, and
/// is written at the source's sibling path with the extension swapped. The
/// source file is never deleted here.
pub struct ZipArchiveAdapter;

impl Archiver for ZipArchiveAdapter {
    fn compress(&self, logger: &RunLogger, source: &Path) -> Result<StageResult> {
        let zip_path = source.with_extension("zip");
        logger.record(&format!("Creating ZIP: {}", zip_path.display()));

        match write_archive(source, &zip_path) {
            Ok(()) => Ok(StageResult::success(zip_path, String::new())),
            Err(e) => Ok(StageResult::failure(format!(
                "could not archive {}: {}",
                source.display(),
                e
            ))),
        }
    }
}

fn write_archive(source: &Path, zip_path: &Path) -> ZipResult<()> {
    let entry_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            zip::result::ZipError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source has no file name",
            ))
        })?;

    let mut reader = BufReader::new(File::open(source)?);
    let mut writer = ZipWriter::new(BufWriter::new(File::create(zip_path)?));

    writer.start_file(
        entry_name,
        FileOptions::default().compression_method(CompressionMethod::Deflated),
    )?;
    io::copy(&mut reader, &mut writer)?;
    let mut inner = writer.finish()?;
    io::Write::flush(&mut inner)?;
    Ok(())
}
