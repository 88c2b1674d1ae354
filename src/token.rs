use std::{
    fmt::{Display, Write},
    sync::Arc,
};

use crate::{
    code_point::TokenizeCharHelper,
    error::TokenizationError,
    position::Position,
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::EnumIs)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NumberKind {
    #[default]
    Integer,
    Number,
}

impl Display for NumberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Integer => "integer",
            Self::Number => "number",
        })
    }
}

/// A numeric literal. `repr` is the text exactly as written and is what gets serialized back;
/// `value` is its parsed value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Number {
    pub repr: Arc<str>,
    pub value: f64,
    pub kind: NumberKind,
}

impl Number {
    pub fn new(repr: impl Into<Arc<str>>, kind: NumberKind) -> Self {
        let repr = repr.into();
        Self {
            value: repr.parse().unwrap_or(0.0),
            repr,
            kind,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::EnumIs)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HashType {
    Id,
    #[default]
    Unrestricted,
}

impl Display for HashType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Id => "id",
            Self::Unrestricted => "unrestricted",
        })
    }
}

/// Stable discriminant of a token, named the way the validator's JSON output names them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::AsRefStr,
    strum_macros::IntoStaticStr,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TokenType {
    AtKeyword,
    Cdc,
    Cdo,
    CloseCurly,
    CloseParen,
    CloseSquare,
    Colon,
    Column,
    Comma,
    DashMatch,
    Delim,
    Dimension,
    EofToken,
    Error,
    FunctionToken,
    Hash,
    Ident,
    IncludeMatch,
    Number,
    OpenCurly,
    OpenParen,
    OpenSquare,
    Percentage,
    PrefixMatch,
    Semicolon,
    String,
    SubstringMatch,
    SuffixMatch,
    Whitespace,
    Url,
}

/// Category of an [`ErrorToken`]. The tokenizer only produces [`ErrorType::Tokenization`]; the
/// other categories belong to the parsers layered on top.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::AsRefStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ErrorType {
    #[default]
    Tokenization,
    Parsing,
    Selectors,
}

/// Kind and payload of a CSS token.
#[derive(Debug, Clone, PartialEq, strum_macros::EnumIs)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    Ident(Arc<str>),
    Function(Arc<str>),
    AtKeyword(Arc<str>),

    Hash(Arc<str>, HashType),
    String(Arc<str>),
    Url(Arc<str>),

    Whitespace,

    Number(Number),
    Percentage(Number),
    Dimension {
        value: Number,
        unit: Arc<str>,
    },

    #[allow(clippy::upper_case_acronyms)]
    CDO,
    #[allow(clippy::upper_case_acronyms)]
    CDC,
    Delim(char),

    Colon,
    Semicolon,
    Comma,
    IncludeMatch,
    DashMatch,
    PrefixMatch,
    SuffixMatch,
    SubstringMatch,
    Column,

    OpenParen,
    CloseParen,
    OpenSquare,
    CloseSquare,
    OpenCurly,
    CloseCurly,

    /// Never part of a token list; only produced internally and routed to the error channel.
    Error(TokenizationError),

    #[allow(clippy::upper_case_acronyms)]
    EOF,
}

impl TokenKind {
    pub fn token_type(&self) -> TokenType {
        match self {
            Self::Ident(_) => TokenType::Ident,
            Self::Function(_) => TokenType::FunctionToken,
            Self::AtKeyword(_) => TokenType::AtKeyword,
            Self::Hash(..) => TokenType::Hash,
            Self::String(_) => TokenType::String,
            Self::Url(_) => TokenType::Url,
            Self::Whitespace => TokenType::Whitespace,
            Self::Number(_) => TokenType::Number,
            Self::Percentage(_) => TokenType::Percentage,
            Self::Dimension { .. } => TokenType::Dimension,
            Self::CDO => TokenType::Cdo,
            Self::CDC => TokenType::Cdc,
            Self::Delim(_) => TokenType::Delim,
            Self::Colon => TokenType::Colon,
            Self::Semicolon => TokenType::Semicolon,
            Self::Comma => TokenType::Comma,
            Self::IncludeMatch => TokenType::IncludeMatch,
            Self::DashMatch => TokenType::DashMatch,
            Self::PrefixMatch => TokenType::PrefixMatch,
            Self::SuffixMatch => TokenType::SuffixMatch,
            Self::SubstringMatch => TokenType::SubstringMatch,
            Self::Column => TokenType::Column,
            Self::OpenParen => TokenType::OpenParen,
            Self::CloseParen => TokenType::CloseParen,
            Self::OpenSquare => TokenType::OpenSquare,
            Self::CloseSquare => TokenType::CloseSquare,
            Self::OpenCurly => TokenType::OpenCurly,
            Self::CloseCurly => TokenType::CloseCurly,
            Self::Error(_) => TokenType::Error,
            Self::EOF => TokenType::EofToken,
        }
    }

    /// The text payload of string-valued kinds (ident, function, at-keyword, hash, string, url).
    pub fn string_value(&self) -> Option<&str> {
        match self {
            Self::Ident(value)
            | Self::Function(value)
            | Self::AtKeyword(value)
            | Self::Hash(value, _)
            | Self::String(value)
            | Self::Url(value) => Some(&**value),
            _ => None,
        }
    }

    /// ASCII case-insensitive comparison of the text payload with `other`.
    pub fn ascii_match(&self, other: &str) -> bool {
        self.string_value()
            .map(|value| value.eq_ignore_ascii_case(other))
            .unwrap_or_default()
    }

    pub fn number(&self) -> Option<&Number> {
        match self {
            Self::Number(number) | Self::Percentage(number) | Self::Dimension { value: number, .. } => {
                Some(number)
            }
            _ => None,
        }
    }

    /// The token closing a block opened by this one, or opening a block this one closes.
    pub fn mirror(&self) -> Option<TokenKind> {
        Some(match self {
            Self::OpenParen | Self::Function(_) => Self::CloseParen,
            Self::CloseParen => Self::OpenParen,
            Self::OpenSquare => Self::CloseSquare,
            Self::CloseSquare => Self::OpenSquare,
            Self::OpenCurly => Self::CloseCurly,
            Self::CloseCurly => Self::OpenCurly,
            _ => return None,
        })
    }

    /// CSS text that tokenizes back to this token. Whitespace always becomes one space and
    /// errors have no source form.
    pub fn to_source(&self) -> String {
        match self {
            Self::Ident(value) => escape_ident(value),
            Self::Function(name) => format!("{}(", escape_ident(name)),
            Self::AtKeyword(keyword) => format!("@{}", escape_ident(keyword)),
            Self::Hash(hash, HashType::Id) => format!("#{}", escape_ident(hash)),
            Self::Hash(hash, HashType::Unrestricted) => format!("#{}", escape_hash(hash)),
            Self::String(value) => format!("\"{}\"", escape_string(value)),
            Self::Url(url) => format!("url({})", escape_url(url)),
            Self::Whitespace => " ".to_string(),
            Self::Number(Number { repr, .. }) => repr.to_string(),
            Self::Percentage(Number { repr, .. }) => format!("{repr}%"),
            Self::Dimension {
                value: Number { repr, .. },
                unit,
            } => format!("{repr}{}", escape_unit(unit)),
            Self::Delim('\\') => "\\\n".to_string(),
            Self::Delim(char) => char.to_string(),
            Self::CDO => "<!--".to_string(),
            Self::CDC => "-->".to_string(),
            Self::Colon => ":".to_string(),
            Self::Semicolon => ";".to_string(),
            Self::Comma => ",".to_string(),
            Self::IncludeMatch => "~=".to_string(),
            Self::DashMatch => "|=".to_string(),
            Self::PrefixMatch => "^=".to_string(),
            Self::SuffixMatch => "$=".to_string(),
            Self::SubstringMatch => "*=".to_string(),
            Self::Column => "||".to_string(),
            Self::OpenParen => "(".to_string(),
            Self::CloseParen => ")".to_string(),
            Self::OpenSquare => "[".to_string(),
            Self::CloseSquare => "]".to_string(),
            Self::OpenCurly => "{".to_string(),
            Self::CloseCurly => "}".to_string(),
            Self::Error(_) | Self::EOF => String::new(),
        }
    }
}

/// Debug form, e.g. `IDENT(foo)`, `DIM(12.5,em)`, `WS`.
impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ident(value) => write!(f, "IDENT({value})"),
            Self::Function(name) => write!(f, "FUNCTION_TOKEN({name})"),
            Self::AtKeyword(keyword) => write!(f, "AT({keyword})"),
            Self::Hash(hash, _) => write!(f, "HASH({hash})"),
            Self::String(value) => write!(f, "\"{}\"", escape_string(value)),
            Self::Url(url) => write!(f, "URL({url})"),
            Self::Whitespace => f.write_str("WS"),
            Self::Number(Number {
                value,
                kind: NumberKind::Integer,
                ..
            }) => write!(f, "INT({value})"),
            Self::Number(Number { value, .. }) => write!(f, "NUMBER({value})"),
            Self::Percentage(Number { value, .. }) => write!(f, "PERCENTAGE({value})"),
            Self::Dimension {
                value: Number { value, .. },
                unit,
            } => write!(f, "DIM({value},{unit})"),
            Self::Delim(char) => write!(f, "DELIM({char})"),
            Self::CDO => f.write_str("CDO"),
            Self::CDC => f.write_str("CDC"),
            Self::Error(error) => write!(f, "ERROR({error})"),
            Self::EOF => f.write_str("EOF_TOKEN"),
            other => f.write_str(&other.to_source()),
        }
    }
}

/// A token and the position of its first code point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Self { kind, position }
    }

    #[inline]
    pub fn token_type(&self) -> TokenType {
        self.kind.token_type()
    }

    #[inline]
    pub fn line(&self) -> usize {
        self.position.line
    }

    #[inline]
    pub fn col(&self) -> usize {
        self.position.col
    }

    #[inline]
    pub fn to_source(&self) -> String {
        self.kind.to_source()
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.kind, f)
    }
}

impl FromIterator<Token> for String {
    fn from_iter<T: IntoIterator<Item = Token>>(iter: T) -> Self {
        String::from_iter(iter.into_iter().map(|v| v.to_source()))
    }
}

impl<'a> FromIterator<&'a Token> for String {
    fn from_iter<T: IntoIterator<Item = &'a Token>>(iter: T) -> Self {
        String::from_iter(iter.into_iter().map(|v| v.to_source()))
    }
}

/// Concatenate the source form of every token.
pub fn to_source_all(tokens: &[Token]) -> String {
    tokens.iter().collect()
}

/// A recoverable tokenization error and where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorToken {
    pub error_type: ErrorType,
    pub error: TokenizationError,
    pub position: Position,
}

impl ErrorToken {
    pub fn new(error: TokenizationError, position: Position) -> Self {
        Self {
            error_type: ErrorType::Tokenization,
            error,
            position,
        }
    }

    #[inline]
    pub fn token_type(&self) -> TokenType {
        TokenType::Error
    }

    #[inline]
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn msg(&self) -> String {
        self.error.to_string()
    }

    #[inline]
    pub fn line(&self) -> usize {
        self.position.line
    }

    #[inline]
    pub fn col(&self) -> usize {
        self.position.col
    }
}

/// `:LINE:COL TYPE - message`
impl Display for ErrorToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} - {}", self.position, self.error_type, self.error)
    }
}

impl std::error::Error for ErrorToken {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[inline]
fn push_hex_escape(result: &mut String, c: char) {
    let _ = write!(result, "\\{:x} ", c as u32);
}

#[inline]
fn is_control(c: char) -> bool {
    matches!(c as u32, 0x01..=0x1F | 0x7F)
}

/// Escape `value` so it reads back as a single identifier.
pub fn escape_ident(value: &str) -> String {
    if value == "-" {
        return "\\-".to_string();
    }
    let mut result = String::with_capacity(value.len());
    let first = value.chars().next();
    for (i, c) in value.chars().enumerate() {
        if is_control(c)
            || (i == 0 && c.is_css_digit())
            || (i == 1 && c.is_css_digit() && first == Some('-'))
        {
            push_hex_escape(&mut result, c);
        } else if c.is_non_ascii() || c == '-' || c == '_' || c.is_css_digit() || c.is_letter() {
            result.push(c);
        } else {
            result.push('\\');
            result.push(c);
        }
    }
    result
}

/// Escape the contents of an unrestricted hash. Does not preserve id-ness; use
/// [`escape_ident`] for id hashes.
pub fn escape_hash(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_non_ascii() || c == '-' || c == '_' || c.is_css_digit() || c.is_letter() {
            result.push(c);
        } else {
            push_hex_escape(&mut result, c);
        }
    }
    result
}

/// Escape the contents of a double quoted string.
pub fn escape_string(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        if is_control(c) {
            push_hex_escape(&mut result, c);
        } else if c == '"' || c == '\\' {
            result.push('\\');
            result.push(c);
        } else {
            result.push(c);
        }
    }
    result
}

/// Escape the contents of an unquoted `url(...)`.
pub fn escape_url(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        if is_control(c) || c.is_css_whitespace() {
            push_hex_escape(&mut result, c);
        } else if matches!(c, '"' | '\'' | '(' | ')' | '\\') {
            result.push('\\');
            result.push(c);
        } else {
            result.push(c);
        }
    }
    result
}

/// Escape a dimension unit. A unit that starts like an exponent (`e1`, `e-x`) gets its first
/// letter hex escaped so the number does not swallow it.
fn escape_unit(unit: &str) -> String {
    let escaped = escape_ident(unit);
    let mut chars = escaped.chars();
    match (chars.next(), chars.next()) {
        (Some(first @ ('e' | 'E')), Some(second)) if second == '-' || second.is_css_digit() => {
            let mut result = String::with_capacity(escaped.len() + 4);
            push_hex_escape(&mut result, first);
            result.push_str(&escaped[first.len_utf8()..]);
            result
        }
        _ => escaped,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn token_type_names() {
        assert_eq!(TokenType::AtKeyword.to_string(), "AT_KEYWORD");
        assert_eq!(TokenType::EofToken.to_string(), "EOF_TOKEN");
        assert_eq!(TokenType::FunctionToken.as_ref(), "FUNCTION_TOKEN");
        assert_eq!(TokenType::Cdo.to_string(), "CDO");
        assert_eq!(TokenType::SubstringMatch.to_string(), "SUBSTRING_MATCH");
        assert_eq!(ErrorType::Tokenization.to_string(), "TOKENIZATION");

        let names = TokenType::iter().map(<&'static str>::from).collect::<HashSet<_>>();
        assert_eq!(names.len(), TokenType::iter().count());
        assert!(names.iter().all(|name| name.chars().all(|c| c.is_ascii_uppercase() || c == '_')));
    }

    #[test]
    fn debug_form() {
        let tokens = [
            TokenKind::Ident("foo".into()),
            TokenKind::Whitespace,
            TokenKind::OpenCurly,
            TokenKind::Number(Number::new("12", NumberKind::Integer)),
            TokenKind::Number(Number::new("12.5", NumberKind::Number)),
            TokenKind::Dimension {
                value: Number::new("12.5", NumberKind::Number),
                unit: "em".into(),
            },
            TokenKind::Delim('*'),
            TokenKind::IncludeMatch,
            TokenKind::EOF,
        ];
        let rendered = tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" ");
        assert_eq!(rendered, "IDENT(foo) WS { INT(12) NUMBER(12.5) DIM(12.5,em) DELIM(*) ~= EOF_TOKEN");
    }

    #[test]
    fn number_value_comes_from_repr() {
        let number = Number::new("+1e3", NumberKind::Number);
        assert_eq!(number.value, 1000.0);
        assert_eq!(&*number.repr, "+1e3");
        assert_eq!(Number::new("-.5", NumberKind::Number).value, -0.5);
    }

    #[test]
    fn ident_escaping() {
        assert_eq!(escape_ident("foo-bar_9"), "foo-bar_9");
        assert_eq!(escape_ident("1a"), "\\31 a");
        assert_eq!(escape_ident("-1a"), "-\\31 a");
        assert_eq!(escape_ident("a.b"), "a\\.b");
        assert_eq!(escape_ident("a\tb"), "a\\9 b");
        assert_eq!(escape_ident("é"), "é");
        assert_eq!(escape_ident("-"), "\\-");
    }

    #[test]
    fn hash_string_and_url_escaping() {
        assert_eq!(escape_hash("1FB"), "1FB");
        assert_eq!(escape_hash("a.b"), "a\\2e b");
        assert_eq!(escape_string("say \"hi\" \\"), "say \\\"hi\\\" \\\\");
        assert_eq!(escape_string("a\nb"), "a\\a b");
        assert_eq!(escape_url("a b(c)"), "a\\20 b\\(c\\)");
    }

    #[test]
    fn exponent_like_units_are_escaped() {
        let dimension = TokenKind::Dimension {
            value: Number::new("1", NumberKind::Integer),
            unit: "e3x".into(),
        };
        assert_eq!(dimension.to_source(), "1\\65 3x");

        let dimension = TokenKind::Dimension {
            value: Number::new("1", NumberKind::Integer),
            unit: "em".into(),
        };
        assert_eq!(dimension.to_source(), "1em");
    }

    #[test]
    fn fixed_sources() {
        assert_eq!(TokenKind::Whitespace.to_source(), " ");
        assert_eq!(TokenKind::Delim('\\').to_source(), "\\\n");
        assert_eq!(TokenKind::Column.to_source(), "||");
        assert_eq!(TokenKind::CDO.to_source(), "<!--");
        assert_eq!(TokenKind::EOF.to_source(), "");
        assert_eq!(TokenKind::Error(TokenizationError::BadUrl).to_source(), "");
        assert_eq!(TokenKind::Url("a b".into()).to_source(), "url(a\\20 b)");
        assert_eq!(TokenKind::Hash("x".into(), HashType::Id).to_source(), "#x");
        assert_eq!(TokenKind::Function("rgb".into()).to_source(), "rgb(");
        assert_eq!(TokenKind::AtKeyword("media".into()).to_source(), "@media");
    }

    #[test]
    fn ascii_match_and_mirror() {
        assert!(TokenKind::Ident("Important".into()).ascii_match("important"));
        assert!(!TokenKind::Whitespace.ascii_match(""));
        assert_eq!(TokenKind::OpenCurly.mirror(), Some(TokenKind::CloseCurly));
        assert_eq!(TokenKind::Function("calc".into()).mirror(), Some(TokenKind::CloseParen));
        assert_eq!(TokenKind::Comma.mirror(), None);
    }

    #[test]
    fn error_token_display() {
        let error = ErrorToken::new(TokenizationError::UnterminatedString, Position::new(1, 1));
        assert_eq!(error.to_string(), ":1:1 TOKENIZATION - unterminated string");
        assert_eq!(error.msg(), "unterminated string");
        assert_eq!(error.error_type(), ErrorType::Tokenization);
        assert_eq!(error.token_type(), TokenType::Error);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_tokens() {
        let token = Token::new(TokenKind::Hash("foo".into(), HashType::Id), Position::new(1, 0));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["position"]["line"], 1);
        assert_eq!(json["kind"]["Hash"][0], "foo");
        assert_eq!(json["kind"]["Hash"][1], "id");
        let back: Token = serde_json::from_value(json).unwrap();
        assert_eq!(back, token);
    }
}
