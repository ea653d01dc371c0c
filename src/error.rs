use thiserror::Error;

/// Structural problems found while compiling a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated character class")]
    UnterminatedCharacterClass,
    #[error("empty character class")]
    EmptyCharacterClass,
    #[error("invalid character class range {0}-{1}")]
    InvalidClassRange(char, char),
    #[error("unterminated group")]
    UnterminatedGroup,
    #[error("unmatched ')'")]
    UnmatchedCloseParen,
    #[error("invalid escape sequence: \\{0}")]
    InvalidEscape(char),
    #[error("pattern ends with a lone backslash")]
    DanglingEscape,
    #[error("quantifier has nothing to repeat")]
    DanglingQuantifier,
    #[error("backreference \\{0} refers to an undefined group")]
    UnresolvedBackreference(usize),
}

/// Raised only when a backtrack budget was configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("backtrack limit of {0} steps exceeded")]
    BacktrackLimitExceeded(usize),
}
