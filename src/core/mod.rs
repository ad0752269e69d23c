// Core modules implementing storage, indexing, tokenizing, and error modeling.
pub mod engine;
pub mod error;
pub mod index;
pub mod reader;
pub mod store;
pub mod tokenizer;
