//! A CSS Syntax Level 3 tokenizer.
//!
//! Source text goes through preprocessing ([`CodePointStream`]), gets a position per code point
//! ([`PositionTable`]) and is then split into [`Token`]s by the [`Tokenizer`] state machine.
//! Recoverable problems such as unterminated strings are reported as [`ErrorToken`]s next to the
//! token stream instead of inside it.
//!
//! ```
//! use csstok::{tokenize, TokenKind};
//!
//! let (tokens, errors) = tokenize("a { color: red }", 1, 0);
//! assert!(errors.is_empty());
//! assert_eq!(tokens[0].kind, TokenKind::Ident("a".into()));
//! assert_eq!(csstok::to_source_all(&tokens), "a { color: red }");
//! ```
mod code_point;
mod error;
mod position;
mod token;
mod tokenizer;

pub use code_point::{CodePointStream, TokenizeCharHelper, REPLACEMENT_CHARACTER};
pub use error::TokenizationError;
pub use position::{Position, PositionTable};
pub use token::{
    escape_hash, escape_ident, escape_string, escape_url, to_source_all, ErrorToken, ErrorType,
    HashType, Number, NumberKind, Token, TokenKind, TokenType,
};
pub use tokenizer::{tokenize, tokenize_bytes, tokenize_utf16, Tokenizer, TokenizerOptions};
