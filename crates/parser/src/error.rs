use std::fmt;

use thiserror::Error;

/// Compact byte-span used across the parser.
///
/// Positions are stored as `u32`; inputs larger than 4GiB are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32, // exclusive
}

impl Span {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self {
            start: clamp_u32(start),
            end: clamp_u32(end),
        }
    }

    #[inline]
    pub const fn empty_at(pos: usize) -> Self {
        let p = clamp_u32(pos);
        Self { start: p, end: p }
    }

    #[inline]
    pub const fn from_range(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }

    /// Smallest span covering both `self` and `other`.
    #[inline]
    pub const fn to(self, other: Span) -> Span {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Span { start, end }
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slices `src` by this span, returning `""` when out of bounds.
    #[inline]
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        src.get(self.start as usize..self.end as usize).unwrap_or("")
    }
}

#[inline]
const fn clamp_u32(v: usize) -> u32 {
    if v > u32::MAX as usize {
        u32::MAX
    } else {
        v as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lex,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub kind: DiagKind,
    pub span: Span,
    pub message: String,
}

impl Diag {
    /// 1-based line and column of the diagnostic start within `src`.
    pub fn line_col(&self, src: &str) -> (usize, usize) {
        let upto = (self.span.start as usize).min(src.len());
        let before = src.get(..upto).unwrap_or("");
        let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
        let col = match before.rfind('\n') {
            Some(nl) => upto - nl,
            None => upto + 1,
        };
        (line, col)
    }
}

impl fmt::Display for Diag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagKind::Lex => "lex",
            DiagKind::Parse => "syntax",
        };
        write!(
            f,
            "{kind} error at {}..{}: {}",
            self.span.start, self.span.end, self.message
        )
    }
}

/// A file that produced at least one diagnostic.
#[derive(Debug, Error)]
#[error("{} error(s); first: {}", .diags.len(), .diags.first().map(ToString::to_string).unwrap_or_default())]
pub struct ParseFailure {
    pub diags: Vec<Diag>,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid numeric literal")]
    InvalidNumber,
    #[error("invalid escape")]
    InvalidEscape,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated rune literal")]
    UnterminatedRune,
    #[error("unterminated comment")]
    UnterminatedComment,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {span:?}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    #[inline]
    pub fn diag(&self) -> Diag {
        Diag {
            kind: DiagKind::Lex,
            span: self.span,
            message: self.kind.to_string(),
        }
    }
}

/// Errors raised by the recursive-descent parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected {found}; expected {expected}")]
    Unexpected {
        found: String,
        expected: &'static str,
        span: Span,
    },
    #[error("unexpected end of file; expected {expected}")]
    UnexpectedEof { expected: &'static str, span: Span },
    #[error("unbalanced {open}")]
    Unbalanced { open: &'static str, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Unexpected { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::Unbalanced { span, .. } => *span,
        }
    }

    #[inline]
    pub fn diag(&self) -> Diag {
        Diag {
            kind: DiagKind::Parse,
            span: self.span(),
            message: self.to_string(),
        }
    }
}
