//! Dotted rule names (component C): `scope`, `scope.action`, or
//! `scope.action.subaction`.

use crate::error::RuleNameError;

const MAX_SEGMENTS: usize = 3;
const MAX_SEGMENT_LEN: usize = 31;

/// A parsed, validated rule name, at most three dot-separated segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleName {
    segments: Vec<String>,
}

impl RuleName {
    /// Parses and validates a dotted rule name string.
    ///
    /// Each segment must be non-empty, at most 31 bytes, and made up of
    /// ASCII lowercase letters, digits, and underscores.
    pub fn parse(text: &str) -> Result<Self, RuleNameError> {
        if text.is_empty() {
            return Err(RuleNameError::Empty);
        }
        let segments: Vec<&str> = text.split('.').collect();
        if segments.len() > MAX_SEGMENTS {
            return Err(RuleNameError::TooManySegments(
                segments.into_iter().map(str::to_owned).collect(),
            ));
        }
        for seg in &segments {
            if seg.is_empty() {
                return Err(RuleNameError::EmptySegment);
            }
            if seg.len() > MAX_SEGMENT_LEN {
                return Err(RuleNameError::SegmentTooLong((*seg).to_owned()));
            }
            if !seg
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
            {
                return Err(RuleNameError::InvalidCharacter((*seg).to_owned()));
            }
        }
        Ok(Self {
            segments: segments.into_iter().map(str::to_owned).collect(),
        })
    }

    /// Builds a rule name from already-validated segments (used by the
    /// evaluator, which constructs names from fixed internal string tables
    /// rather than parsing untrusted script input).
    #[must_use]
    pub fn from_segments(segments: &[&str]) -> Self {
        debug_assert!(!segments.is_empty() && segments.len() <= MAX_SEGMENTS);
        Self {
            segments: segments.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of dot-separated segments (1-3).
    #[must_use]
    pub fn size(&self) -> usize {
        self.segments.len()
    }

    /// `true` if this name's first segment is the `vnode` scope, which is
    /// evaluated through the bitset path rather than a plain lookup.
    #[must_use]
    pub fn is_vnode_scoped(&self) -> bool {
        self.segments.first().map(String::as_str) == Some("vnode")
    }

    #[must_use]
    pub fn as_dotted(&self) -> String {
        self.segments.join(".")
    }
}

impl std::fmt::Display for RuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_dotted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_two_and_three_segment_names() {
        assert_eq!(RuleName::parse("system").unwrap().size(), 1);
        assert_eq!(RuleName::parse("process.exec").unwrap().size(), 2);
        assert_eq!(RuleName::parse("network.bind.inet").unwrap().size(), 3);
    }

    #[test]
    fn rejects_empty_name() {
        assert_eq!(RuleName::parse(""), Err(RuleNameError::Empty));
    }

    #[test]
    fn rejects_too_many_segments() {
        assert!(matches!(
            RuleName::parse("a.b.c.d"),
            Err(RuleNameError::TooManySegments(_))
        ));
    }

    #[test]
    fn rejects_empty_segment_from_leading_or_doubled_dot() {
        assert_eq!(RuleName::parse(".system"), Err(RuleNameError::EmptySegment));
        assert_eq!(RuleName::parse("system."), Err(RuleNameError::EmptySegment));
        assert_eq!(
            RuleName::parse("system..exec"),
            Err(RuleNameError::EmptySegment)
        );
    }

    #[test]
    fn rejects_segment_over_31_bytes() {
        let long = "a".repeat(32);
        assert!(matches!(
            RuleName::parse(&long),
            Err(RuleNameError::SegmentTooLong(_))
        ));
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(matches!(
            RuleName::parse("Network"),
            Err(RuleNameError::InvalidCharacter(_))
        ));
    }

    #[test]
    fn vnode_scope_is_detected() {
        assert!(RuleName::parse("vnode").unwrap().is_vnode_scoped());
        assert!(!RuleName::parse("process.exec").unwrap().is_vnode_scoped());
    }
}
