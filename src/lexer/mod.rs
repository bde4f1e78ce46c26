//! Cursor-anchored tokenizer for PHP source.
//!
//! Not a full lexer: it classifies just enough (identifiers, keywords,
//! variables, strings, comments, member/static access) for completion to
//! reason about the code around the cursor, and it works on broken,
//! half-typed text.

pub mod scan;
pub mod token;

pub use scan::{find_start, parse_from};
pub use token::{Token, TokenChain, TokenId, TokenKind, TokenRef};
