//! Declaration-level Go parser (Logos lexer + recursive descent).
//!
//! - The lexer uses Logos and implements Go semicolon insertion.
//! - The parser builds an arena AST of package-scope declarations: imports,
//!   constants, variables, type declarations and function signatures.
//!   Function bodies and initializer expressions are skipped by bracket
//!   balance and kept as spans.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
mod parser_support;
pub mod walk;

// Re-exports for convenience
pub use error::{Diag, ParseFailure, Span};
pub use lexer::{tokenize, Lexer, Tok};
pub use parser::{build_constraint, parse_file, parse_int_lit, ParsedFile};
