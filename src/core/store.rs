// Backing store file handle: read-only or read/update mode, plus append locking.
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use libc::{EAGAIN, EWOULDBLOCK};
use serde::Serialize;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug)]
pub struct BackingStore {
    path: PathBuf,
    file: File,
    mode: StoreMode,
}

impl BackingStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file = open_file(&path, StoreMode::ReadOnly)
            .map_err(|err| Error::new(ErrorKind::OpenFailure).with_path(&path).with_source(err))?;
        Ok(Self {
            path,
            file,
            mode: StoreMode::ReadOnly,
        })
    }

    /// Creates an empty store at `path` unless one already exists.
    pub fn create_if_missing(path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(Error::new(ErrorKind::OpenFailure).with_path(path).with_source(err)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn len(&self) -> Result<u64, Error> {
        self.file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|err| {
                Error::new(ErrorKind::IndexBuildFailure)
                    .with_path(&self.path)
                    .with_source(err)
            })
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        self.len().map(|len| len == 0)
    }

    /// Replaces the read-only handle with a read/update one; the old handle is closed.
    pub fn reopen_for_update(&mut self) -> Result<(), Error> {
        if self.mode == StoreMode::ReadWrite {
            return Ok(());
        }
        let file = open_file(&self.path, StoreMode::ReadWrite).map_err(|err| {
            Error::new(ErrorKind::ReopenFailure)
                .with_path(&self.path)
                .with_source(err)
        })?;
        self.file = file;
        self.mode = StoreMode::ReadWrite;
        Ok(())
    }

    pub fn append_lock(&self) -> Result<AppendLock<'_>, Error> {
        if self.mode != StoreMode::ReadWrite {
            return Err(Error::new(ErrorKind::WriteFailure)
                .with_message("store is not open for update")
                .with_path(&self.path));
        }
        FileExt::try_lock_exclusive(&self.file).map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_path(&self.path)
                .with_source(err)
        })?;
        Ok(AppendLock {
            file: &self.file,
            path: &self.path,
        })
    }
}

impl Read for BackingStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for BackingStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

/// Write side of an append: everything needed to add bytes at the end and undo them.
pub trait AppendTarget {
    fn end(&self) -> Result<u64, Error>;
    /// Writes `bytes` at the current end; returns the offset they landed at.
    fn write_at_end(&self, bytes: &[u8]) -> Result<u64, Error>;
    fn sync(&self) -> Result<(), Error>;
    fn truncate(&self, len: u64) -> Result<(), Error>;
}

/// Exclusive hold on the store for the duration of one append.
pub struct AppendLock<'a> {
    file: &'a File,
    path: &'a Path,
}

impl AppendLock<'_> {
    fn write_error(&self, err: io::Error) -> Error {
        Error::new(ErrorKind::WriteFailure)
            .with_path(self.path)
            .with_source(err)
    }
}

impl AppendTarget for AppendLock<'_> {
    fn end(&self) -> Result<u64, Error> {
        let mut file = self.file;
        file.seek(SeekFrom::End(0))
            .map_err(|err| self.write_error(err))
    }

    fn write_at_end(&self, bytes: &[u8]) -> Result<u64, Error> {
        let offset = self.end()?;
        let mut file = self.file;
        file.write_all(bytes)
            .and_then(|()| file.flush())
            .map_err(|err| self.write_error(err).with_offset(offset))?;
        Ok(offset)
    }

    fn sync(&self) -> Result<(), Error> {
        self.file
            .sync_all()
            .map_err(|err| self.write_error(err).with_message("flush failed"))
    }

    fn truncate(&self, len: u64) -> Result<(), Error> {
        self.file
            .set_len(len)
            .map_err(|err| self.write_error(err).with_offset(len))
    }
}

impl Drop for AppendLock<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.file);
    }
}

fn open_file(path: &Path, mode: StoreMode) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(mode == StoreMode::ReadWrite)
        .open(path)
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EAGAIN || errno == EWOULDBLOCK {
        return ErrorKind::Busy;
    }
    match err.kind() {
        io::ErrorKind::WouldBlock => ErrorKind::Busy,
        _ => ErrorKind::WriteFailure,
    }
}
