use thiserror::Error;

/// Errors raised while building or mutating rule trees, rule names, and
/// policies. Evaluation itself is infallible — see [`crate::Verdict`].
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("rule name invalid: {0}")]
    RuleName(#[from] RuleNameError),

    #[error("rule tree structure invalid: {0}")]
    InvalidRuleStructure(String),
}

/// Reasons a dotted rule name string failed to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleNameError {
    #[error("rule name is empty")]
    Empty,

    #[error("rule name has too many segments (max 3): {0:?}")]
    TooManySegments(Vec<String>),

    #[error("rule name segment is empty (leading, trailing, or doubled dot)")]
    EmptySegment,

    #[error("rule name segment '{0}' exceeds 31 bytes")]
    SegmentTooLong(String),

    #[error("rule name segment '{0}' contains an invalid character")]
    InvalidCharacter(String),
}
