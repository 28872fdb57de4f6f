//! Plain-text output and the atomic file writing shared with the EPUB writer.

use crate::model::ChapterRecord;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Width of the `=` rule closing each chapter block.
pub const SEPARATOR_WIDTH: usize = 80;

/// Errors from the text writer.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Failed to write output: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Sibling path the output is staged in before the final rename.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.part", name))
}

/// Create missing parent directories, write into a staging file next to `path`, then rename
/// it over `path`. On error the staging file is removed and `path` is left untouched.
pub(crate) fn write_atomically<E>(
    path: &Path,
    write: impl FnOnce(&mut File) -> Result<(), E>,
) -> Result<(), E>
where
    E: From<io::Error>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let staging = staging_path(path);
    let result = File::create(&staging)
        .map_err(E::from)
        .and_then(|mut file| {
            write(&mut file)?;
            file.sync_all()?;
            Ok(())
        })
        .and_then(|()| fs::rename(&staging, path).map_err(E::from));
    if result.is_err() {
        fs::remove_file(&staging).ok();
    }
    result
}

fn write_record(w: &mut impl Write, record: &ChapterRecord) -> io::Result<()> {
    writeln!(w, "{}", record.number())?;
    writeln!(w, "{}", record.title())?;
    writeln!(w)?;
    for paragraph in record.paragraphs() {
        writeln!(w, "{}", paragraph)?;
        writeln!(w)?;
    }
    writeln!(w, "{}", "=".repeat(SEPARATOR_WIDTH))?;
    writeln!(w)?;
    Ok(())
}

/// Write all records to one UTF-8 text file, replacing any existing file.
///
/// Each record becomes: number line, title line, a blank line, every paragraph followed by a
/// blank line, then an 80-character `=` rule and a blank line.
pub fn write_text(records: &[ChapterRecord], path: &Path) -> Result<(), FormatError> {
    write_atomically(path, |file: &mut File| -> io::Result<()> {
        let mut w = BufWriter::new(file);
        for record in records {
            write_record(&mut w, record)?;
        }
        w.flush()
    })
    .map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })
}
