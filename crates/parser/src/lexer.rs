use crate::error::{Diag, LexError, LexErrorKind, Span};
use logos::{Lexer as LogosLexer, Logos};
use memchr::{memchr, memchr2};
use std::ops::Range;

// =============================================================================
// 1. Trivia and literal scanners (logos callbacks)
// =============================================================================

#[inline]
fn lex_line_comment(lex: &mut LogosLexer<'_, RawTok>) {
    let rem = lex.remainder().as_bytes();
    let len = memchr2(b'\n', b'\r', rem).unwrap_or(rem.len());
    lex.bump(len);
}

#[inline]
fn lex_block_comment(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    let mut from = 0;

    while let Some(off) = memchr(b'*', &rem[from..]) {
        let star = from + off;
        if rem.get(star + 1) == Some(&b'/') {
            lex.bump(star + 2);
            return Ok(());
        }
        from = star + 1;
    }

    lex.bump(rem.len());
    Err(LexErrorKind::UnterminatedComment)
}

#[inline]
fn lex_raw_string(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    match memchr(b'`', rem) {
        Some(close) => {
            lex.bump(close + 1);
            Ok(())
        }
        None => {
            lex.bump(rem.len());
            Err(LexErrorKind::UnterminatedString)
        }
    }
}

#[inline]
fn lex_string(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    scan_quoted(lex, b'"', LexErrorKind::UnterminatedString).map(|_| ())
}

#[inline]
fn lex_rune(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let chars = scan_quoted(lex, b'\'', LexErrorKind::UnterminatedRune)?;
    if chars == 1 {
        Ok(())
    } else {
        Err(LexErrorKind::InvalidToken)
    }
}

/// Scans the body of a quoted literal up to and including the closing quote.
///
/// Returns the number of characters (escapes count as one). Bad escapes are
/// reported only after the closing quote is consumed so the lexer resumes on
/// the next real token.
fn scan_quoted(
    lex: &mut LogosLexer<'_, RawTok>,
    quote: u8,
    unterminated: LexErrorKind,
) -> Result<usize, LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    let mut i = 0;
    let mut chars = 0;
    let mut bad_escape = false;

    while i < rem.len() {
        let b = rem[i];
        if b == quote {
            lex.bump(i + 1);
            return if bad_escape {
                Err(LexErrorKind::InvalidEscape)
            } else {
                Ok(chars)
            };
        }
        match b {
            b'\n' => break,
            b'\\' => match escape_len(&rem[i + 1..], quote) {
                Ok(n) => i += 1 + n,
                Err(_) => {
                    bad_escape = true;
                    // Step over the escaped byte so `\"` never closes the literal.
                    i += if rem.get(i + 1).is_some_and(|&c| c != b'\n') { 2 } else { 1 };
                }
            },
            _ => i += utf8_width(b),
        }
        chars += 1;
    }

    lex.bump(i.min(rem.len()));
    Err(unterminated)
}

#[inline]
const fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

#[inline]
fn hex_digits(bytes: &[u8], n: usize) -> Option<u32> {
    let digits = bytes.get(..n)?;
    digits.iter().try_fold(0u32, |acc, &b| {
        (b as char).to_digit(16).map(|d| (acc << 4) | d)
    })
}

/// Length of an escape sequence following a backslash (excluding the backslash).
fn escape_len(rest: &[u8], quote: u8) -> Result<usize, LexErrorKind> {
    let first = *rest.first().ok_or(LexErrorKind::InvalidEscape)?;
    match first {
        b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v' | b'\\' => Ok(1),
        q if q == quote => Ok(1),
        b'x' => hex_digits(&rest[1..], 2)
            .map(|_| 3)
            .ok_or(LexErrorKind::InvalidEscape),
        b'u' | b'U' => {
            let n = if first == b'u' { 4 } else { 8 };
            match hex_digits(&rest[1..], n) {
                Some(v) if char::from_u32(v).is_some() => Ok(1 + n),
                _ => Err(LexErrorKind::InvalidEscape),
            }
        }
        b'0'..=b'7' => {
            let digits = rest.get(..3).ok_or(LexErrorKind::InvalidEscape)?;
            let value = digits.iter().try_fold(0u32, |acc, &b| match b {
                b'0'..=b'7' => Some(acc * 8 + u32::from(b - b'0')),
                _ => None,
            });
            match value {
                Some(v) if v <= 255 => Ok(3),
                _ => Err(LexErrorKind::InvalidEscape),
            }
        }
        _ => Err(LexErrorKind::InvalidEscape),
    }
}

/// Extends a number token to its maximal munch; validation happens later in
/// [`classify_number`] so malformed literals like `0b2` stay a single token.
fn lex_number(lex: &mut LogosLexer<'_, RawTok>) {
    let head = lex.slice().as_bytes();
    let rem = lex.remainder().as_bytes();
    let hex = head == b"0" && matches!(rem.first(), Some(b'x' | b'X'));
    let mut seen_dot = head[0] == b'.';
    let mut i = 0;

    while i < rem.len() {
        let b = rem[i];
        let prev = if i == 0 { head[head.len() - 1] } else { rem[i - 1] };
        let take = match b {
            b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' => true,
            b'.' => !seen_dot && rem.get(i + 1) != Some(&b'.'),
            b'+' | b'-' => {
                if hex {
                    matches!(prev, b'p' | b'P')
                } else {
                    matches!(prev, b'e' | b'E')
                }
            }
            _ => false,
        };
        if !take {
            break;
        }
        seen_dot |= b == b'.';
        i += 1;
    }

    lex.bump(i);
}

// =============================================================================
// 2. Number classification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumKind {
    Int,
    Float,
    Imag,
}

fn digits_ok(body: &str, radix: u32, allow_leading_underscore: bool) -> bool {
    if body.is_empty() || body.ends_with('_') || body.contains("__") {
        return false;
    }
    if body.starts_with('_') && !allow_leading_underscore {
        return false;
    }
    body.chars().all(|c| c == '_' || c.is_digit(radix))
}

/// Validates a Go numeric literal and reports its kind.
pub fn classify_number(lit: &str) -> Result<NumKind, LexErrorKind> {
    if let Some(body) = lit.strip_suffix('i') {
        return match classify_number(body) {
            Ok(_) => Ok(NumKind::Imag),
            // `0123i` is a valid decimal imaginary even though `0123` is not decimal.
            Err(_) if digits_ok(body, 10, false) => Ok(NumKind::Imag),
            Err(e) => Err(e),
        };
    }

    let lower = lit.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("0x") {
        let (mantissa, exp) = match rest.split_once('p') {
            Some((m, e)) => (m, Some(e)),
            None => (rest, None),
        };
        let (int, frac) = match mantissa.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (mantissa, None),
        };
        let int_ok = int.is_empty() || digits_ok(int, 16, true);
        let frac_ok = frac.map_or(true, |f| f.is_empty() || digits_ok(f, 16, false));
        let has_digits = int.trim_matches('_').len() + frac.map_or(0, str::len) > 0;
        if !(int_ok && frac_ok && has_digits) {
            return Err(LexErrorKind::InvalidNumber);
        }
        return match exp {
            Some(e) => {
                let e = e.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(e);
                if digits_ok(e, 10, false) {
                    Ok(NumKind::Float)
                } else {
                    Err(LexErrorKind::InvalidNumber)
                }
            }
            None if frac.is_some() => Err(LexErrorKind::InvalidNumber),
            None => Ok(NumKind::Int),
        };
    }
    if let Some(rest) = lower.strip_prefix("0b") {
        return if digits_ok(rest, 2, true) {
            Ok(NumKind::Int)
        } else {
            Err(LexErrorKind::InvalidNumber)
        };
    }
    if let Some(rest) = lower.strip_prefix("0o") {
        return if digits_ok(rest, 8, true) {
            Ok(NumKind::Int)
        } else {
            Err(LexErrorKind::InvalidNumber)
        };
    }

    let (mantissa, exp) = match lower.split_once('e') {
        Some((m, e)) => (m, Some(e)),
        None => (lower.as_str(), None),
    };
    let (int, frac) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };

    if frac.is_none() && exp.is_none() {
        let radix = if int.len() > 1 && int.starts_with('0') { 8 } else { 10 };
        return if digits_ok(int, radix, false) {
            Ok(NumKind::Int)
        } else {
            Err(LexErrorKind::InvalidNumber)
        };
    }

    let int_ok = int.is_empty() || digits_ok(int, 10, false);
    let frac_ok = frac.map_or(true, |f| f.is_empty() || digits_ok(f, 10, false));
    let exp_ok = exp.map_or(true, |e| {
        let e = e.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(e);
        digits_ok(e, 10, false)
    });
    let has_digits = !int.is_empty() || frac.is_some_and(|f| !f.is_empty());
    if int_ok && frac_ok && exp_ok && has_digits {
        Ok(NumKind::Float)
    } else {
        Err(LexErrorKind::InvalidNumber)
    }
}

// =============================================================================
// 3. Raw token definition
// =============================================================================

#[repr(u8)]
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\r]+")]
#[rustfmt::skip]
enum RawTok {
    #[token("\u{FEFF}")] Bom,

    #[token("\n")] Newline,
    #[token("//", lex_line_comment)] LineComment,
    #[token("/*", lex_block_comment)] BlockComment,

    #[token("package")] KwPackage,
    #[token("import")] KwImport,
    #[token("type")] KwType,
    #[token("const")] KwConst,
    #[token("var")] KwVar,
    #[token("func")] KwFunc,
    #[token("interface")] KwInterface,
    #[token("struct")] KwStruct,
    #[token("map")] KwMap,
    #[token("chan")] KwChan,

    // Keywords after which a newline terminates the statement.
    #[token("break")]
    #[token("continue")]
    #[token("fallthrough")]
    #[token("return")]
    KwFlow,

    #[token("case")]
    #[token("default")]
    #[token("defer")]
    #[token("else")]
    #[token("for")]
    #[token("go")]
    #[token("goto")]
    #[token("if")]
    #[token("range")]
    #[token("select")]
    #[token("switch")]
    KwOther,

    #[regex(r"[_\p{L}][_\p{L}\p{Nd}]*")] Ident,
    #[regex(r"[0-9]|\.[0-9]", lex_number)] Number,
    #[token("\"", lex_string)] String,
    #[token("`", lex_raw_string)] RawString,
    #[token("'", lex_rune)] Rune,

    #[token("...")] Ellipsis,
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("[")] LBrack,
    #[token("]")] RBrack,
    #[token("{")] LBrace,
    #[token("}")] RBrace,
    #[token(",")] Comma,
    #[token(";")] Semi,
    #[token(":")] Colon,
    #[token(".")] Dot,
    #[token("*")] Star,
    #[token("<-")] Arrow,
    #[token("=")] Assign,
    #[token("~")] Tilde,
    #[token("|")] Pipe,

    #[token("++")]
    #[token("--")]
    IncDec,

    #[token("+")] #[token("-")] #[token("/")] #[token("%")]
    #[token("&")] #[token("^")] #[token("<<")] #[token(">>")] #[token("&^")]
    #[token("+=")] #[token("-=")] #[token("*=")] #[token("/=")] #[token("%=")]
    #[token("&=")] #[token("|=")] #[token("^=")] #[token("<<=")] #[token(">>=")] #[token("&^=")]
    #[token("&&")] #[token("||")] #[token("==")] #[token("!=")]
    #[token("<")] #[token("<=")] #[token(">")] #[token(">=")]
    #[token(":=")] #[token("!")]
    Op,

    #[regex(r".", priority = 0)] Error,
}

impl RawTok {
    /// Whether a following newline turns into a `;` (Go spec, "Semicolons").
    #[inline]
    const fn ends_statement(self) -> bool {
        matches!(
            self,
            RawTok::Ident
                | RawTok::Number
                | RawTok::String
                | RawTok::RawString
                | RawTok::Rune
                | RawTok::KwFlow
                | RawTok::IncDec
                | RawTok::RParen
                | RawTok::RBrack
                | RawTok::RBrace
        )
    }

    fn to_token(self, slice: &str) -> Tok<'_> {
        match self {
            RawTok::KwPackage => Tok::Package,
            RawTok::KwImport => Tok::Import,
            RawTok::KwType => Tok::Type,
            RawTok::KwConst => Tok::Const,
            RawTok::KwVar => Tok::Var,
            RawTok::KwFunc => Tok::Func,
            RawTok::KwInterface => Tok::Interface,
            RawTok::KwStruct => Tok::Struct,
            RawTok::KwMap => Tok::Map,
            RawTok::KwChan => Tok::Chan,
            RawTok::KwFlow | RawTok::KwOther => Tok::Keyword(slice),
            RawTok::Ident => Tok::Ident(slice),
            RawTok::String => Tok::Str(slice),
            RawTok::RawString => Tok::RawStr(slice),
            RawTok::Rune => Tok::Rune(slice),
            RawTok::Ellipsis => Tok::Ellipsis,
            RawTok::LParen => Tok::LParen,
            RawTok::RParen => Tok::RParen,
            RawTok::LBrack => Tok::LBrack,
            RawTok::RBrack => Tok::RBrack,
            RawTok::LBrace => Tok::LBrace,
            RawTok::RBrace => Tok::RBrace,
            RawTok::Comma => Tok::Comma,
            RawTok::Semi => Tok::Semi,
            RawTok::Colon => Tok::Colon,
            RawTok::Dot => Tok::Dot,
            RawTok::Star => Tok::Star,
            RawTok::Arrow => Tok::Arrow,
            RawTok::Assign => Tok::Assign,
            RawTok::Tilde => Tok::Tilde,
            RawTok::Pipe => Tok::Pipe,
            RawTok::IncDec | RawTok::Op => Tok::Op(slice),
            // Numbers, trivia and BOM are resolved by the wrapper.
            RawTok::Number
            | RawTok::Newline
            | RawTok::LineComment
            | RawTok::BlockComment
            | RawTok::Bom
            | RawTok::Error => Tok::Error,
        }
    }
}

// =============================================================================
// 4. Public token (zero-copy)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok<'src> {
    Ident(&'src str),
    Int(&'src str),
    Float(&'src str),
    Imag(&'src str),
    Rune(&'src str),
    /// Interpreted string literal, quotes included.
    Str(&'src str),
    RawStr(&'src str),

    Package,
    Import,
    Type,
    Const,
    Var,
    Func,
    Interface,
    Struct,
    Map,
    Chan,
    /// Statement keywords; the declaration parser never needs to tell them apart.
    Keyword(&'src str),

    Ellipsis,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,
    Star,
    Arrow,
    Assign,
    Tilde,
    Pipe,
    /// Any other operator.
    Op(&'src str),

    Error,
}

impl Tok<'_> {
    /// Human-readable token description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Tok::Ident(s) => format!("identifier `{s}`"),
            Tok::Int(s) | Tok::Float(s) | Tok::Imag(s) => format!("number `{s}`"),
            Tok::Rune(s) | Tok::Str(s) | Tok::RawStr(s) => format!("literal {s}"),
            Tok::Keyword(s) | Tok::Op(s) => format!("`{s}`"),
            Tok::Error => "invalid token".to_string(),
            other => format!("`{}`", other.punct()),
        }
    }

    fn punct(&self) -> &'static str {
        match self {
            Tok::Package => "package",
            Tok::Import => "import",
            Tok::Type => "type",
            Tok::Const => "const",
            Tok::Var => "var",
            Tok::Func => "func",
            Tok::Interface => "interface",
            Tok::Struct => "struct",
            Tok::Map => "map",
            Tok::Chan => "chan",
            Tok::Ellipsis => "...",
            Tok::LParen => "(",
            Tok::RParen => ")",
            Tok::LBrack => "[",
            Tok::RBrack => "]",
            Tok::LBrace => "{",
            Tok::RBrace => "}",
            Tok::Comma => ",",
            Tok::Semi => ";",
            Tok::Colon => ":",
            Tok::Dot => ".",
            Tok::Star => "*",
            Tok::Arrow => "<-",
            Tok::Assign => "=",
            Tok::Tilde => "~",
            Tok::Pipe => "|",
            _ => "?",
        }
    }
}

impl std::fmt::Display for Tok<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

// =============================================================================
// 5. Lexer wrapper: semicolon insertion + number classification + diags
// =============================================================================

pub struct Lexer<'src> {
    logos: LogosLexer<'src, RawTok>,
    pending: Option<(usize, Tok<'src>, usize)>,
    diags: Vec<Diag>,
    semi_on_newline: bool,
    src_len: usize,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src str) -> Self {
        Self {
            logos: RawTok::lexer(input),
            pending: None,
            diags: Vec::new(),
            semi_on_newline: false,
            src_len: input.len(),
            finished: false,
        }
    }

    pub fn take_diags(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.diags)
    }

    fn diag(&mut self, kind: LexErrorKind, span: Range<usize>) {
        let span = Span::from_range(span);
        self.diags.push(LexError { kind, span }.diag());
    }

    /// Queues an automatic `;` (zero-width) if the previous token allows it.
    fn insert_semi(&mut self, pos: usize) {
        if self.semi_on_newline {
            self.semi_on_newline = false;
            self.pending = Some((pos, Tok::Semi, pos));
        }
    }

    fn error_token(&mut self, kind: LexErrorKind, span: Range<usize>) -> (usize, Tok<'src>, usize) {
        self.diag(kind, span.clone());
        self.semi_on_newline = false;
        (span.start, Tok::Error, span.end)
    }

    fn number(&mut self, span: Range<usize>, slice: &'src str) -> (usize, Tok<'src>, usize) {
        match classify_number(slice) {
            Ok(kind) => {
                self.semi_on_newline = true;
                let tok = match kind {
                    NumKind::Int => Tok::Int(slice),
                    NumKind::Float => Tok::Float(slice),
                    NumKind::Imag => Tok::Imag(slice),
                };
                (span.start, tok, span.end)
            }
            Err(kind) => self.error_token(kind, span),
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = (usize, Tok<'src>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tok) = self.pending.take() {
                return Some(tok);
            }
            if self.finished {
                return None;
            }

            let raw = match self.logos.next() {
                None => {
                    self.finished = true;
                    self.insert_semi(self.src_len);
                    continue;
                }
                Some(Err(kind)) => {
                    let span = self.logos.span();
                    // A statement-ending literal still ends the line even when malformed.
                    let ends = matches!(
                        kind,
                        LexErrorKind::InvalidEscape | LexErrorKind::InvalidToken
                    ) && matches!(self.logos.slice().as_bytes().first(), Some(b'"' | b'\''));
                    let tok = self.error_token(kind, span);
                    self.semi_on_newline = ends;
                    return Some(tok);
                }
                Some(Ok(raw)) => raw,
            };

            let span = self.logos.span();
            let slice = self.logos.slice();

            match raw {
                RawTok::Newline => self.insert_semi(span.start),
                RawTok::LineComment => {}
                RawTok::BlockComment => {
                    if let Some(off) = memchr(b'\n', slice.as_bytes()) {
                        self.insert_semi(span.start + off);
                    }
                }
                RawTok::Bom if span.start == 0 => {}
                RawTok::Bom | RawTok::Error => {
                    return Some(self.error_token(LexErrorKind::InvalidToken, span));
                }
                RawTok::Number => return Some(self.number(span, slice)),
                _ => {
                    self.semi_on_newline = raw.ends_statement();
                    return Some((span.start, raw.to_token(slice), span.end));
                }
            }
        }
    }
}

/// Lexes `src` completely, returning tokens and lexical diagnostics.
pub fn tokenize(src: &str) -> (Vec<(usize, Tok<'_>, usize)>, Vec<Diag>) {
    let mut lexer = Lexer::new(src);
    let toks: Vec<_> = lexer.by_ref().collect();
    (toks, lexer.take_diags())
}
