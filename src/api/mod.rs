//! Purpose: Define the stable public Rust API boundary for csvstore.
//! Exports: The engine, its options and error types, and the `DataSource` capability.
//! Role: Public, additive-only surface; consumers never touch storage modules directly.
//! Invariants: Grid consumers go through `DataSource` (row/column counts, cell values).

mod source;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::engine::{Engine, EngineOptions, EngineStats, ParsedLine};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::store::StoreMode;
pub use crate::core::tokenizer::{ColumnWidth, DEFAULT_DELIMITER, tokenize};
pub use source::DataSource;
