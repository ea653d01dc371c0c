pub mod ast;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod pattern;

pub use error::{MatchError, ParseError};
pub use pattern::{CompiledPattern, FindIter, Match, PatternBuilder};

pub fn compile(pattern: &str) -> Result<CompiledPattern, ParseError> {
    CompiledPattern::new(pattern)
}

pub fn is_match(input: &str, pattern: &str) -> Result<bool, ParseError> {
    Ok(compile(pattern)?.matches(input))
}
