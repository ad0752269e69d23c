//! Purpose: Library crate backing the `csvstore` CLI and its tests.
//! Exports: `api` (stable engine surface) and `core` (storage primitives).
//! Role: Random-access row/column lookup over delimited text files.
//! Invariants: Only one parsed line is resident in memory at a time.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
