//! rogscript - the debug console language
//!
//! A line of source goes through lexer, parser, resolver and a tree-walking
//! interpreter. Hosts expose their own functionality by binding native
//! functions by name and arity.

pub mod token;
pub mod lexer;
pub mod parser;
pub mod ast;
pub mod resolver;
pub mod value;
pub mod builtins;
pub mod environment;
pub mod interpreter;
pub mod config;
pub mod console;
pub mod error;
mod stack;

pub use config::Config;
pub use console::Console;
pub use error::{
    ParseError, ParseErrorKind, ResolveError, ResolveErrorKind, RunError, RuntimeError,
    RuntimeErrorKind, ScanError, ScanErrorKind,
};
pub use interpreter::{Interpreter, RunResult};
pub use lexer::Lexer;
pub use parser::Parser;
pub use resolver::Resolver;
pub use value::Value;

/// Convenience function to run one line in a fresh interpreter
pub fn run(source: &str) -> RunResult {
    Interpreter::new().run(source)
}

/// Version of the rogscript crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
