//! Source text to expression tree.
//!
//! The [`logos`] lexer produces the whole token stream up front; the parser
//! is a precedence climber over it. The first error ends parsing.

mod lexer;
pub mod parser;

pub use parser::{MAX_DEPTH, parse, parse_with_max_depth};
