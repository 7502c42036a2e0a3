use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::runtime::Builder;

pub mod zip;

pub use zip::Compressor;

/// Represents a file to include in the ZIP archive.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name_in_archive: String,
}

/// Builds the archive, managing its own async runtime.
///
/// This is the main entrypoint for the synchronous CLI flow: it blocks until
/// every entry has been read and written, or until the first fatal error.
pub fn package_sync(archive: &Path, compressor: Compressor, entries: Vec<FileEntry>) -> Result<()> {
    let rt = Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(zip::write_archive(archive, compressor, entries))
}
