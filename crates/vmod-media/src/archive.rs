//! Frame image archives.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{MediaError, MediaResult};

/// Zip the regular files directly inside `dir` into `archive_path`.
///
/// Entries are stored under their file names, sorted by name.
pub fn archive_directory(dir: &Path, archive_path: &Path) -> MediaResult<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = ZipWriter::new(BufWriter::new(File::create(archive_path)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| MediaError::internal(format!("unnamed file {}", path.display())))?;
        writer.start_file(name, options)?;
        io::copy(&mut File::open(path)?, &mut writer)?;
    }

    writer.finish()?;
    debug!(
        "Archived {} files from {} into {}",
        files.len(),
        dir.display(),
        archive_path.display()
    );
    Ok(archive_path.to_path_buf())
}
