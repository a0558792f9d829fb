//! Command line parsing for the interactive host
//!
//! Typed lines -> `parse_line` -> `Command`, dispatched by the binary.

pub mod parser;

pub use parser::{parse_line, tokenize, Command, ParseError, HELP};
