use core::fmt;
use core::num::IntErrorKind;

use ecow::EcoString;
use logos::Logos;

use crate::diagnostics::{FileError, Span};

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
enum Raw {
    #[regex(r"[_$\p{L}][_\p{L}\p{N}]*")]
    Word,

    #[regex(r"[0-9][0-9A-Za-z_]*(\.[0-9][0-9A-Za-z_]*)?([eE][+-][0-9_]+)?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?")]
    Number,

    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r#"'([^'\\]|\\.)*'"#)]
    Quoted,

    #[regex(r"`[^`]*`")]
    Backquoted,

    // An opening quote with no matching close.
    #[regex(r#""([^"\\]|\\.)*\\?"#)]
    #[regex(r#"'([^'\\]|\\.)*\\?"#)]
    #[regex(r"`[^`]*")]
    Unterminated,

    #[token("!")]
    #[token("!=")]
    #[token("?")]
    #[token("??")]
    #[token("?.")]
    #[token(".")]
    #[token("..")]
    #[token(":")]
    #[token(",")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("**")]
    #[token("/")]
    #[token("%")]
    #[token("^")]
    #[token("<")]
    #[token("<=")]
    #[token(">")]
    #[token(">=")]
    #[token("==")]
    #[token("&&")]
    #[token("||")]
    #[token("#")]
    Operator,

    #[token("(")]
    #[token(")")]
    #[token("[")]
    #[token("]")]
    #[token("{")]
    #[token("}")]
    Bracket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Identifier,
    Number,
    String,
    Operator,
    Bracket,
    Eof,
}

/// A lexed token. String tokens hold the unescaped contents.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: Kind,
    pub value: EcoString,
    pub span: Span,
}

impl Token {
    pub fn is(&self, kind: Kind, value: &str) -> bool {
        self.kind == kind && self.value.as_str() == value
    }

    pub fn is_operator(&self, value: &str) -> bool {
        self.is(Kind::Operator, value)
    }

    pub fn is_bracket(&self, value: &str) -> bool {
        self.is(Kind::Bracket, value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Eof => f.write_str("EOF"),
            kind => write!(f, "{:?}({:?})", kind, self.value.as_str()),
        }
    }
}

/// Word operators; every other word is an identifier.
const WORD_OPERATORS: &[&str] = &[
    "not",
    "in",
    "and",
    "or",
    "matches",
    "contains",
    "startsWith",
    "endsWith",
];

/// Splits `source` into tokens, ending with an [`Kind::Eof`] token placed on
/// the last character.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, FileError> {
    let mut tokens = Vec::new();
    let mut lexer = Raw::lexer(source);
    while let Some(raw) = lexer.next() {
        let span = Span::from(lexer.span());
        let text = lexer.slice();
        let (kind, value) = match raw {
            Ok(Raw::Word) if WORD_OPERATORS.contains(&text) => (Kind::Operator, text.into()),
            Ok(Raw::Word) => (Kind::Identifier, text.into()),
            Ok(Raw::Number) => {
                parse_number(text).map_err(|msg| FileError::new(msg, span))?;
                (Kind::Number, text.into())
            }
            Ok(Raw::Quoted) => {
                let inner = &text[1..text.len() - 1];
                let value = unescape(inner).map_err(|msg| FileError::new(msg, span))?;
                (Kind::String, value)
            }
            Ok(Raw::Backquoted) => (Kind::String, text[1..text.len() - 1].into()),
            Ok(Raw::Unterminated) => {
                return Err(FileError::new("literal not terminated", span));
            }
            Ok(Raw::Operator) => (Kind::Operator, text.into()),
            Ok(Raw::Bracket) => (Kind::Bracket, text.into()),
            Err(()) => {
                let c = text.chars().next().unwrap_or('\u{fffd}');
                return Err(FileError::new(
                    format!("unrecognized character: U+{:04X} {:?}", c as u32, c),
                    span,
                ));
            }
        };
        tokens.push(Token { kind, value, span });
    }
    let last = source.char_indices().last().map_or(0, |(i, _)| i);
    tokens.push(Token {
        kind: Kind::Eof,
        value: EcoString::new(),
        span: Span::new(last, source.len()),
    });
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

/// Parses a number token: decimal, `0x`/`0o`/`0b` integers, `_` separators,
/// fractions and exponents.
pub(crate) fn parse_number(text: &str) -> Result<Number, String> {
    let digits: String = text.chars().filter(|&c| c != '_').collect();
    let prefixed = |p: &str| {
        digits
            .strip_prefix(p)
            .or_else(|| digits.strip_prefix(&p.to_uppercase()))
    };
    if let Some(hex) = prefixed("0x") {
        return parse_int(hex, 16, text);
    }
    if let Some(oct) = prefixed("0o") {
        return parse_int(oct, 8, text);
    }
    if let Some(bin) = prefixed("0b") {
        return parse_int(bin, 2, text);
    }
    if digits.contains(['.', 'e', 'E']) {
        return digits
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| bad_number(text));
    }
    parse_int(&digits, 10, text)
}

fn parse_int(digits: &str, radix: u32, text: &str) -> Result<Number, String> {
    i64::from_str_radix(digits, radix)
        .map(Number::Int)
        .map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                format!("invalid integer literal: {}", text)
            }
            _ => bad_number(text),
        })
}

fn bad_number(text: &str) -> String {
    format!("bad number syntax: {:?}", text)
}

fn unescape(s: &str) -> Result<EcoString, String> {
    if !s.contains('\\') {
        return Ok(s.into());
    }
    let mut out = EcoString::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('a') => '\u{7}',
            Some('b') => '\u{8}',
            Some('f') => '\u{c}',
            Some('v') => '\u{b}',
            Some('0') => '\0',
            Some(c @ ('\\' | '\'' | '"' | '`')) => c,
            Some('x') => code_point(&mut chars, 2)?,
            Some('u') => code_point(&mut chars, 4)?,
            Some('U') => code_point(&mut chars, 8)?,
            _ => return Err("invalid char escape".to_string()),
        };
        out.push(escaped);
    }
    Ok(out)
}

fn code_point(chars: &mut core::str::Chars<'_>, len: usize) -> Result<char, String> {
    let hex: String = chars.by_ref().take(len).collect();
    if hex.len() != len {
        return Err("invalid char escape".to_string());
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| "invalid char escape".to_string())
}
