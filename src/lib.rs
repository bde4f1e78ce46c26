//! Crane: context-aware completion for PHP sources.
//!
//! A lazy bidirectional tokenizer finds the token under the cursor, a
//! reflection workspace supplies the surrounding scope, and finders turn
//! both into `lsp-types` completion items.

pub mod config;
pub mod lexer;
pub mod lsp;
pub mod reflection;
