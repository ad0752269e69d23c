// Engine: owns the backing store, line index, column width, and single-line cache.
// Reads go through the cache; appends extend the index in place without a rescan.
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::index::{DEFAULT_CHUNK_SIZE, LineIndex};
use crate::core::reader;
use crate::core::store::{AppendTarget, BackingStore, StoreMode};
use crate::core::tokenizer::{ColumnWidth, DEFAULT_DELIMITER, QUOTE, tokenize};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EngineOptions {
    pub delimiter: char,
    /// Allows `append`; a missing store is created empty at open.
    pub appendable: bool,
    /// Read buffer size for the index scan.
    pub chunk_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            appendable: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_appendable(mut self, appendable: bool) -> Self {
        self.appendable = appendable;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        let delimiter = self.delimiter;
        if !delimiter.is_ascii() || matches!(delimiter, QUOTE | '\r' | '\n') {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("invalid delimiter {delimiter:?}")));
        }
        Ok(())
    }
}

/// The one resident tokenized line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedLine {
    pub line: usize,
    pub fields: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EngineStats {
    /// Lines fetched from the store and tokenized.
    pub line_reads: u64,
    pub cache_hits: u64,
    pub appends: u64,
}

#[derive(Debug)]
pub struct Engine {
    path: PathBuf,
    options: EngineOptions,
    store: Option<BackingStore>,
    index: LineIndex,
    width: ColumnWidth,
    cache: Option<ParsedLine>,
    stats: EngineStats,
}

impl Engine {
    /// Opens the store at `path`, falling back to an empty engine on failure.
    ///
    /// A failed open is only visible as `row_count() == 0`; use [`Engine::try_open`]
    /// to learn why.
    pub fn open(path: impl AsRef<Path>, options: EngineOptions) -> Self {
        let path = path.as_ref();
        match Self::try_open(path, options) {
            Ok(engine) => engine,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "open failed; serving an empty store");
                Self::empty(path.to_path_buf(), options)
            }
        }
    }

    pub fn try_open(path: impl AsRef<Path>, options: EngineOptions) -> Result<Self, Error> {
        let path = path.as_ref();
        options.validate()?;
        if options.appendable {
            BackingStore::create_if_missing(path)?;
        }
        let mut store = BackingStore::open(path)?;
        let index = build_index(&mut store, options.chunk_size)?;
        debug!(
            path = %path.display(),
            lines = index.line_count(),
            bytes = index.total_length(),
            "indexed store"
        );

        let mut engine = Self {
            store: Some(store),
            index,
            ..Self::empty(path.to_path_buf(), options)
        };
        if engine.row_count() > 0 {
            engine.load(0).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "first line unreadable");
            });
        }
        Ok(engine)
    }

    fn empty(path: PathBuf, options: EngineOptions) -> Self {
        Self {
            path,
            options,
            store: None,
            index: LineIndex::new(),
            width: ColumnWidth::new(),
            cache: None,
            stats: EngineStats::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    pub fn mode(&self) -> Option<StoreMode> {
        self.store.as_ref().map(BackingStore::mode)
    }

    pub fn row_count(&self) -> usize {
        self.index.line_count()
    }

    pub fn column_count(&self) -> usize {
        self.width.get()
    }

    pub fn total_length(&self) -> u64 {
        self.index.total_length()
    }

    pub fn line_offset(&self, line: usize) -> Option<u64> {
        self.index.offset(line)
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn cached_line(&self) -> Option<&ParsedLine> {
        self.cache.as_ref()
    }

    /// Raw text of `line`, trimmed; bypasses the cache and the tokenizer.
    pub fn read_line(&mut self, line: usize) -> Result<String, Error> {
        if line >= self.index.line_count() {
            return Err(Error::new(ErrorKind::OutOfRange)
                .with_message(format!("line out of range (0..{})", self.index.line_count()))
                .with_path(&self.path)
                .with_line(line as u64));
        }
        let Some(store) = self.store.as_mut() else {
            return Err(Error::new(ErrorKind::NotOpen).with_path(&self.path));
        };
        reader::read_line(store, &self.index, line).map_err(|err| err.with_path(&self.path))
    }

    /// Cell text at `(row, col)`; empty for anything out of range or unreadable.
    pub fn get_item(&mut self, row: i64, col: i64) -> &str {
        let (Ok(row), Ok(col)) = (usize::try_from(row), usize::try_from(col)) else {
            return "";
        };
        if row >= self.row_count() {
            return "";
        }
        if let Err(err) = self.ensure_cached(row) {
            warn!(path = %self.path.display(), row, error = %err, "cell read failed");
            return "";
        }
        self.cache
            .as_ref()
            .and_then(|cached| cached.fields.get(col))
            .map_or("", String::as_str)
    }

    /// All fields of `line`, padded to the current column count at the time it was read.
    pub fn row(&mut self, line: usize) -> Result<Vec<String>, Error> {
        self.ensure_cached(line)?;
        Ok(self
            .cache
            .as_ref()
            .map(|cached| cached.fields.clone())
            .unwrap_or_default())
    }

    fn ensure_cached(&mut self, line: usize) -> Result<(), Error> {
        if self.cache.as_ref().is_some_and(|cached| cached.line == line) {
            self.stats.cache_hits += 1;
            return Ok(());
        }
        self.load(line)
    }

    fn load(&mut self, line: usize) -> Result<(), Error> {
        let text = self.read_line(line)?;
        self.stats.line_reads += 1;
        debug!(line, "cache miss");
        self.cache = Some(ParsedLine {
            line,
            fields: self.tokenize(&text),
        });
        Ok(())
    }

    fn tokenize(&mut self, text: &str) -> Vec<String> {
        let mut fields = tokenize(text, self.options.delimiter);
        self.width.normalize(&mut fields);
        fields
    }

    /// Appends `line` as the new last row and makes it the cached line.
    ///
    /// One trailing terminator on `line` is accepted and replaced by `\n`.
    pub fn append(&mut self, line: &str) -> Result<(), Error> {
        if !self.options.appendable {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("engine was not opened for appending")
                .with_path(&self.path));
        }
        let text = appendable_text(line).map_err(|err| err.with_path(&self.path))?;
        let Some(store) = self.store.as_mut() else {
            return Err(Error::new(ErrorKind::NotOpen).with_path(&self.path));
        };
        store.reopen_for_update()?;

        let new_line = self.index.line_count();
        let written = {
            let lock = store.append_lock()?;
            write_line(&lock, &mut self.index, text, &self.path)
        };
        if self.index.line_count() > new_line {
            self.stats.appends += 1;
            let fields = self.tokenize(text.trim());
            self.cache = Some(ParsedLine {
                line: new_line,
                fields,
            });
            debug!(line = new_line, bytes = self.index.total_length(), "appended line");
        }
        written.map_err(|err| err.with_line(new_line as u64))
    }

    /// Removes the store from disk and resets to the empty state.
    pub fn delete(&mut self) -> Result<(), Error> {
        self.store = None;
        let removed = match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::new(ErrorKind::WriteFailure)
                .with_message("failed to remove store")
                .with_path(&self.path)
                .with_source(err)),
        };
        self.index = LineIndex::new();
        self.width = ColumnWidth::new();
        self.cache = None;
        self.stats = EngineStats::default();
        debug!(path = %self.path.display(), "deleted store");
        removed
    }
}

// Writes `text` plus a terminator at the end of `target` and records it in `index`.
// A failed write is rolled back; a failed sync still records the line, since its bytes are in place.
fn write_line<T: AppendTarget>(
    target: &T,
    index: &mut LineIndex,
    text: &str,
    path: &Path,
) -> Result<(), Error> {
    let prior_len = target.end()?;
    if prior_len != index.total_length() {
        return Err(Error::new(ErrorKind::WriteFailure)
            .with_message(format!(
                "store is {prior_len} bytes but {} were indexed",
                index.total_length()
            ))
            .with_path(path));
    }

    let separator = !index.ends_with_terminator();
    let mut payload = Vec::with_capacity(text.len() + 2);
    if separator {
        payload.push(b'\n');
    }
    payload.extend_from_slice(text.as_bytes());
    payload.push(b'\n');

    let landed = match target.write_at_end(&payload) {
        Ok(landed) => landed,
        Err(err) => {
            if let Err(undo) = target.truncate(prior_len) {
                warn!(path = %path.display(), error = %undo, "failed to roll back partial append");
            }
            return Err(err);
        }
    };
    let offset = landed + u64::from(separator);
    let flushed = target.sync();
    let total_length = target
        .end()
        .unwrap_or(landed + payload.len() as u64);
    index.push_line(offset, total_length);
    flushed
}

fn build_index(store: &mut BackingStore, chunk_size: usize) -> Result<LineIndex, Error> {
    if store.is_empty()? {
        return Ok(LineIndex::new());
    }
    store
        .seek(SeekFrom::Start(0))
        .and_then(|_| LineIndex::build(store, chunk_size))
        .map_err(|err| {
            Error::new(ErrorKind::IndexBuildFailure)
                .with_path(store.path())
                .with_source(err)
        })
}

// Strips one trailing terminator and rejects text that would not read back as one line.
fn appendable_text(line: &str) -> Result<&str, Error> {
    let text = line
        .strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .or_else(|| line.strip_suffix('\r'))
        .unwrap_or(line);
    if text.contains(['\r', '\n']) {
        return Err(Error::new(ErrorKind::Usage).with_message("line contains a line terminator"));
    }
    if text.trim().is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("line is empty"));
    }
    if !text.is_ascii() {
        return Err(Error::new(ErrorKind::Usage).with_message("line is not ascii text"));
    }
    Ok(text)
}
