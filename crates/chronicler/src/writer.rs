//! The Chronicler V2 file writer (`spec.md` §4.4).

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::format::{Block, Entry, FooterLocation, Header, IndexFooter, Operation, Trailer};

/// Owns the open file handle, the pending block buffer, and the in-memory
/// index-delta built up since the file was last (re)opened.
pub struct Writer {
    path: PathBuf,
    swamp_name: String,
    created_at_ms: i64,
    max_block_size: usize,
    file: Option<File>,
    write_pos: u64,
    pending: Vec<Entry>,
    pending_bytes: usize,
    index_delta: FxHashMap<String, FooterLocation>,
}

impl Writer {
    /// Opens `path` for writing, creating it (and its header) if absent.
    /// If the file was previously closed gracefully, the trailer and
    /// footer are truncated away so appending can resume from the last
    /// sealed block.
    pub fn open(
        path: impl AsRef<Path>,
        swamp_name: impl Into<String>,
        created_at_ms: i64,
        max_block_size: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let swamp_name = swamp_name.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::from_io)?;
        }

        let (mut file, write_pos, index_delta) = if path.exists() {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .map_err(Error::from_io)?;
            let (truncate_at, index_delta) = Self::find_resume_state(&mut file);
            file.set_len(truncate_at).map_err(Error::from_io)?;
            file.seek(SeekFrom::Start(truncate_at))
                .map_err(Error::from_io)?;
            (file, truncate_at, index_delta)
        } else {
            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .map_err(Error::from_io)?;
            let header = Header::new(swamp_name.clone(), created_at_ms);
            header.write_to(&mut file)?;
            let pos = header.encoded_len();
            (file, pos, FxHashMap::default())
        };
        file.seek(SeekFrom::Start(write_pos)).map_err(Error::from_io)?;

        Ok(Writer {
            path,
            swamp_name,
            created_at_ms,
            max_block_size,
            file: Some(file),
            write_pos,
            pending: Vec::new(),
            pending_bytes: 0,
            index_delta,
        })
    }

    /// If `file` ends with a valid trailer, returns the footer's start
    /// offset (where appending should resume, overwriting footer+trailer
    /// on the next close) together with the footer's entries, preserved so
    /// the next close writes a complete index rather than just the delta
    /// accumulated since reopening. Otherwise returns the current file
    /// length and an empty index, treating the whole file as pre-footer
    /// block data.
    fn find_resume_state(file: &mut File) -> (u64, FxHashMap<String, FooterLocation>) {
        let len = match file.seek(SeekFrom::End(0)) {
            Ok(l) => l,
            Err(_) => return (0, FxHashMap::default()),
        };
        if len < Trailer::ENCODED_LEN {
            return (len, FxHashMap::default());
        }
        if file
            .seek(SeekFrom::Start(len - Trailer::ENCODED_LEN))
            .is_err()
        {
            return (len, FxHashMap::default());
        }
        let trailer = match Trailer::read_from(file) {
            Ok(t) if t.footer_offset <= len => t,
            _ => return (len, FxHashMap::default()),
        };
        if file.seek(SeekFrom::Start(trailer.footer_offset)).is_err() {
            return (len, FxHashMap::default());
        }
        let mut footer_buf = vec![0u8; trailer.footer_length as usize];
        if std::io::Read::read_exact(file, &mut footer_buf).is_err() {
            return (trailer.footer_offset, FxHashMap::default());
        }
        if crc32c::crc32c(&footer_buf) != trailer.footer_crc32c {
            return (trailer.footer_offset, FxHashMap::default());
        }
        let mut cur = std::io::Cursor::new(&footer_buf[..]);
        match IndexFooter::read_from(&mut cur) {
            Ok(footer) => (trailer.footer_offset, footer.entries),
            Err(_) => (trailer.footer_offset, FxHashMap::default()),
        }
    }

    fn reopen_if_closed(&mut self) -> Result<()> {
        if self.file.is_none() {
            tracing::debug!(path = %self.path.display(), "lazily reopening chronicler writer");
            let reopened = Writer::open(
                &self.path,
                self.swamp_name.clone(),
                self.created_at_ms,
                self.max_block_size,
            )?;
            self.file = reopened.file;
            self.write_pos = reopened.write_pos;
            self.index_delta = reopened.index_delta;
        }
        Ok(())
    }

    /// Appends `entry` to the pending block buffer, sealing the block (and
    /// flushing it to disk) once the buffer reaches `max_block_size`.
    pub fn write_entry(&mut self, entry: Entry) -> Result<()> {
        self.reopen_if_closed()?;
        self.pending_bytes += entry.encoded_len();
        self.pending.push(entry);
        if self.pending_bytes >= self.max_block_size {
            self.seal_block()?;
        }
        Ok(())
    }

    fn seal_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let file = self.file.as_mut().ok_or(Error::WriterClosed)?;
        let block_offset = self.write_pos;
        let (written, offsets) = Block::write(file, &self.pending)?;
        self.write_pos += written;

        for (entry, entry_offset) in self.pending.iter().zip(offsets) {
            let loc = match entry.operation {
                Operation::Delete => FooterLocation::Tombstone,
                Operation::Insert | Operation::Update => FooterLocation::Live {
                    block_offset,
                    entry_offset,
                },
            };
            self.index_delta.insert(entry.key.clone(), loc);
        }
        self.pending.clear();
        self.pending_bytes = 0;
        Ok(())
    }

    /// Flushes OS buffers. Does not seal the current pending block unless
    /// it is already full — callers that need durability for in-flight
    /// entries should rely on `close`.
    pub fn sync(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.sync_all().map_err(Error::from_io)?;
        }
        Ok(())
    }

    /// Seals any pending block, writes the index footer and trailer,
    /// fsyncs, and closes the handle. Idempotent: calling `close` on an
    /// already-closed writer is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        self.seal_block()?;
        let mut file = self.file.take().unwrap();

        let footer = IndexFooter {
            entries: self.index_delta.clone(),
        };
        let footer_offset = self.write_pos;
        let mut footer_buf = Vec::new();
        footer.write_to(&mut footer_buf)?;
        file.write_all(&footer_buf).map_err(Error::from_io)?;

        let trailer = Trailer {
            footer_offset,
            footer_length: footer_buf.len() as u64,
            footer_crc32c: crc32c::crc32c(&footer_buf),
        };
        trailer.write_to(&mut file)?;
        file.sync_all().map_err(Error::from_io)?;

        self.write_pos = footer_offset;
        tracing::debug!(path = %self.path.display(), entries = self.index_delta.len(), "sealed chronicler footer and trailer");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index_delta(&self) -> &FxHashMap<String, FooterLocation> {
        &self.index_delta
    }
}
