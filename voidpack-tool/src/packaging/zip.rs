use anyhow::{Context, Result};
use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipDateTime, ZipEntryBuilder};
use chrono::{DateTime, Utc};
use futures::io::copy;
use log::debug;
use std::path::Path;
use tokio::fs::File;
use tokio_util::compat::TokioAsyncReadCompatExt;

use super::FileEntry;

/// Compression algorithm to use when creating the ZIP.
#[derive(Debug, Clone, Copy)]
pub enum Compressor {
    Deflate,
    Stored,
}

// Zip timestamps cannot represent anything before the DOS epoch. Pinning
// every entry to it keeps successive runs over unchanged inputs comparable.
const DOS_EPOCH_SECS: i64 = 315_532_800;

/// Writes all entries into a fresh archive at `archive`, creating parent
/// directories when the configured name points into one.
///
/// Prints one `Added <name>` line per entry as it is written. A source file
/// that cannot be opened or read is fatal and aborts the archive.
pub async fn write_archive(
    archive: &Path,
    compressor: Compressor,
    entries: Vec<FileEntry>,
) -> Result<()> {
    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }

    let file = File::create(archive)
        .await
        .with_context(|| format!("creating archive {}", archive.display()))?;
    let mut writer = ZipFileWriter::with_tokio(file);

    let compression = match compressor {
        Compressor::Deflate => Compression::Deflate,
        Compressor::Stored => Compression::Stored,
    };
    let mtime = DateTime::<Utc>::from_timestamp(DOS_EPOCH_SECS, 0)
        .context("constructing fixed entry timestamp")?;

    debug!("writing {} entries to {}", entries.len(), archive.display());
    for entry in entries {
        let builder = ZipEntryBuilder::new(entry.name_in_archive.clone().into(), compression)
            .last_modification_date(ZipDateTime::from_chrono(&mtime));

        let mut entry_writer = writer
            .write_entry_stream(builder)
            .await
            .with_context(|| format!("starting archive entry {}", entry.name_in_archive))?;

        let source = File::open(&entry.path)
            .await
            .with_context(|| format!("opening {}", entry.path.display()))?;
        copy(source.compat(), &mut entry_writer)
            .await
            .with_context(|| format!("archiving {}", entry.path.display()))?;

        entry_writer
            .close()
            .await
            .with_context(|| format!("finishing archive entry {}", entry.name_in_archive))?;
        println!("Added {}", entry.name_in_archive);
    }

    writer
        .close()
        .await
        .with_context(|| format!("finishing archive {}", archive.display()))?;
    Ok(())
}
