/// Segment parsing for file-based routes
///
/// Pure parsing of one path segment (`users`, `[id]`) into a typed value.
/// All functions are **pure**: same input → same output, no side effects.

use thiserror::Error;

/// Characters that carry meaning in rewritten route patterns and therefore
/// cannot appear literally in a static segment.
const RESERVED_CHARACTERS: [char; 2] = [':', '*'];

/// A classified route segment, borrowed from the route path it came from
///
/// # Examples
///
/// ```
/// use launch_router::segment::{parse_segment, Segment};
///
/// assert_eq!(parse_segment("users"), Ok(Segment::Static("users")));
/// assert_eq!(parse_segment("[id]"), Ok(Segment::Dynamic("id")));
/// assert!(parse_segment("user-[id]").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text matched as-is
    Static(&'a str),
    /// Named parameter written as `[name]`
    Dynamic(&'a str),
}

impl<'a> Segment<'a> {
    /// Parameter name for dynamic segments
    pub fn param_name(&self) -> Option<&'a str> {
        match self {
            Segment::Dynamic(name) => Some(*name),
            Segment::Static(_) => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Segment::Dynamic(_))
    }
}

/// Why a segment's bracket syntax was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingIssue {
    #[error("has unbalanced brackets")]
    UnbalancedBrackets,

    #[error("nests brackets inside a parameter")]
    NestedBrackets,

    #[error("has an empty parameter name")]
    EmptyParameterName,

    #[error("uses `{0}` as a parameter name (only ASCII letters, digits and `_` are allowed)")]
    InvalidParameterName(String),

    #[error("mixes static text and parameters in a single segment")]
    MixedSegment,

    #[error("contains the reserved character `{0}`")]
    ReservedCharacter(char),
}

/// Classifies a single segment (pure function)
///
/// # Parsing Rules (evaluated in order)
///
/// 1. **Static**: no brackets at all, and none of the reserved characters `:` `*`
/// 2. **Balanced**: the number of `[` must equal the number of `]`
/// 3. **Single parameter**: exactly one `[...]` pair spanning the whole segment
/// 4. **Name**: non-empty, made of `[A-Za-z0-9_]`
///
/// # Examples
///
/// ```
/// use launch_router::segment::{parse_segment, NamingIssue, Segment};
///
/// assert_eq!(parse_segment("[slug]"), Ok(Segment::Dynamic("slug")));
/// assert_eq!(parse_segment("[]"), Err(NamingIssue::EmptyParameterName));
/// assert_eq!(parse_segment("[id"), Err(NamingIssue::UnbalancedBrackets));
/// assert_eq!(parse_segment("[[id]]"), Err(NamingIssue::NestedBrackets));
/// ```
pub fn parse_segment(segment: &str) -> Result<Segment<'_>, NamingIssue> {
    let opening = segment.matches('[').count();
    let closing = segment.matches(']').count();

    if opening == 0 && closing == 0 {
        return match segment.chars().find(|c| RESERVED_CHARACTERS.contains(c)) {
            Some(reserved) => Err(NamingIssue::ReservedCharacter(reserved)),
            None => Ok(Segment::Static(segment)),
        };
    }

    if opening != closing {
        return Err(NamingIssue::UnbalancedBrackets);
    }

    if opening > 1 {
        return Err(if segment.contains("[[") {
            NamingIssue::NestedBrackets
        } else {
            NamingIssue::MixedSegment
        });
    }

    match segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(name) => parse_param_name(name).map(Segment::Dynamic),
        None => {
            // `]id[` closes before it opens; `a[id]` and `[id]a` carry extra text
            let open_at = segment.find('[').unwrap_or(0);
            let close_at = segment.find(']').unwrap_or(0);
            if close_at < open_at {
                Err(NamingIssue::UnbalancedBrackets)
            } else {
                Err(NamingIssue::MixedSegment)
            }
        }
    }
}

fn parse_param_name(name: &str) -> Result<&str, NamingIssue> {
    if name.is_empty() {
        return Err(NamingIssue::EmptyParameterName);
    }

    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(NamingIssue::InvalidParameterName(name.to_string()))
    }
}
