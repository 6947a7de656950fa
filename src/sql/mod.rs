//! # SQL Front End
//!
//! Tokenizer, AST and parser for the SELECT dialect that the verifier reads.
//! The implementation follows a zero-copy design where possible, with tokens
//! and AST nodes borrowing from the original input string.
//!
//! ## Module Structure
//!
//! - `token`: Token, keyword and span definitions
//! - `lexer`: Zero-copy SQL tokenizer with a phf keyword table
//! - `ast`: Arena-allocated statement tree
//! - `parser`: Recursive descent / Pratt parser
//!
//! ## Design Philosophy
//!
//! 1. **Zero-copy parsing**: Tokens borrow from input, no string allocation
//! 2. **Arena allocation**: AST nodes allocated in a bump allocator
//! 3. **Superset language**: Parses far more than the verifier accepts, so
//!    rejections name the offending construct
//!
//! ## Example
//!
//! ```ignore
//! use sqlfence::sql::{Lexer, Token};
//!
//! let mut lexer = Lexer::new("SELECT count() FROM trips");
//! loop {
//!     let token = lexer.next_token();
//!     if token.is_eof() { break; }
//!     println!("{:?} at {:?}", token, lexer.span());
//! }
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use lexer::{is_keyword, lookup_keyword, unescape, Lexer};
pub use parser::{ParseError, Parser};
pub use token::{Keyword, Span, Token};
