use std::sync::Arc;

use encoding_rs::Encoding;
use hashbrown::HashSet;

use crate::{
    code_point::{CodePointStream, TokenizeCharHelper, REPLACEMENT_CHARACTER},
    error::TokenizationError,
    position::{Position, PositionTable},
    token::{ErrorToken, HashType, Number, NumberKind, Token, TokenKind},
};

const MAX_ALLOWED_CODE_POINT: u32 = 0x10FFFF;

/// Configuration for a single tokenizer run.
#[derive(Debug, Clone)]
pub struct TokenizerOptions {
    encoding: Option<&'static Encoding>,
    start: Position,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            start: Position::new(1, 0),
        }
    }
}

impl TokenizerOptions {
    /// Position of the first code point. Useful when the CSS is embedded in a larger document.
    pub fn start(mut self, line: usize, col: usize) -> Self {
        self.start = Position::new(line, col);
        self
    }

    /// Encoding used to decode byte input. Defaults to UTF-8.
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn start_position(&self) -> Position {
        self.start
    }

    pub fn get_encoding(&self) -> Option<&'static Encoding> {
        self.encoding
    }
}

/// A CSS tokenizer.
///
/// The tokenizer walks a preprocessed code point stream with a single cursor and yields tokens
/// until, and including, one final EOF token. Recoverable errors never show up as tokens; they
/// are collected on the side and available through [`Tokenizer::errors`]. Identifiers, strings,
/// units and other text payloads are interned for the duration of the run.
pub struct Tokenizer {
    input: CodePointStream,
    positions: PositionTable,

    /// Number of code points consumed. The current code point sits at `cursor - 1`.
    cursor: usize,
    iterations: usize,
    finished: bool,

    cache: HashSet<Arc<str>>,
    errors: Vec<ErrorToken>,
}

impl Tokenizer {
    /// Create a new tokenizer over an already preprocessed stream.
    pub fn new(input: CodePointStream, options: &TokenizerOptions) -> Self {
        Self {
            positions: PositionTable::new(&input, options.start),
            input,
            cursor: 0,
            iterations: 0,
            finished: false,
            cache: HashSet::new(),
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[ErrorToken] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Drive the tokenizer to completion.
    pub fn run(mut self) -> (Vec<Token>, Vec<ErrorToken>) {
        let tokens = self.by_ref().collect::<Vec<_>>();
        tracing::debug!(
            code_points = self.input.len(),
            tokens = tokens.len(),
            errors = self.errors.len(),
            "tokenized css"
        );
        (tokens, self.errors)
    }

    /// The code point `n` positions ahead of the current one, without moving.
    #[inline]
    fn peek(&self, n: usize) -> Option<char> {
        debug_assert!((1..=3).contains(&n), "no more than three code points of lookahead");
        self.input.get(self.cursor + n - 1)
    }

    #[inline]
    fn peekn<const N: usize>(&self) -> [Option<char>; N] {
        let mut result: [Option<char>; N] = [None; N];
        for (i, slot) in result.iter_mut().enumerate() {
            *slot = self.peek(i + 1);
        }
        result
    }

    #[inline]
    fn current(&self) -> Option<char> {
        match self.cursor {
            0 => None,
            n => self.input.get(n - 1),
        }
    }

    #[inline]
    fn consume(&mut self) {
        self.cursor += 1;
    }

    #[inline]
    fn consume_n(&mut self, n: usize) {
        self.cursor += n;
    }

    /// Step back exactly one code point.
    #[inline]
    fn reconsume(&mut self) {
        debug_assert!(self.cursor > 0);
        self.cursor -= 1;
    }

    /// Position of the current code point, or of the start when nothing was consumed yet.
    #[inline]
    fn mark(&self) -> Position {
        self.positions.get(self.cursor.saturating_sub(1))
    }

    fn record(&mut self, error: TokenizationError, position: Position) {
        tracing::trace!(line = position.line, col = position.col, %error, "recoverable tokenization error");
        self.errors.push(ErrorToken::new(error, position));
    }

    fn intern(&mut self, value: &str) -> Arc<str> {
        self.cache.get_or_insert_with(value, |v| Arc::from(v)).clone()
    }

    /// Check if the provided two code points are a valid escape sequence.
    #[inline]
    pub fn is_valid_escape(code_points: [Option<char>; 2]) -> bool {
        let [first, second] = code_points;
        first == Some('\\') && !second.is_newline()
    }

    /// Check if the provided three code points are a valid start of an identifier.
    #[inline]
    pub fn is_start_ident(code_points: [Option<char>; 3]) -> bool {
        let [first, second, third] = code_points;
        match first {
            Some('-') => {
                second.is_ident_start()
                    || second == Some('-')
                    || Self::is_valid_escape([second, third])
            }
            Some('\\') => Self::is_valid_escape([first, second]),
            _ => first.is_ident_start(),
        }
    }

    /// Check if the provided three code points are a valid start of a number.
    #[inline]
    pub fn is_start_number(code_points: [Option<char>; 3]) -> bool {
        let [first, second, third] = code_points;
        match first {
            Some('+' | '-') => {
                second.is_css_digit() || (second == Some('.') && third.is_css_digit())
            }
            Some('.') => second.is_css_digit(),
            _ => first.is_css_digit(),
        }
    }

    /// Check if the current and next code points are a valid escape sequence.
    #[inline]
    fn has_valid_escape(&self) -> bool {
        Self::is_valid_escape([self.current(), self.peek(1)])
    }

    /// Check if the current and next two code points start an identifier.
    #[inline]
    fn has_start_ident(&self) -> bool {
        Self::is_start_ident([self.current(), self.peek(1), self.peek(2)])
    }

    /// Check if the current and next two code points start a number.
    #[inline]
    fn has_start_number(&self) -> bool {
        Self::is_start_number([self.current(), self.peek(1), self.peek(2)])
    }

    /// Skip every comment at the cursor. Comments never produce tokens.
    fn consume_comments(&mut self) {
        let mark = self.mark();
        while let [Some('/'), Some('*')] = self.peekn::<2>() {
            self.consume_n(2);
            loop {
                self.consume();
                match self.current() {
                    Some('*') if self.peek(1) == Some('/') => {
                        self.consume();
                        break;
                    }
                    None => {
                        self.record(TokenizationError::UnterminatedComment, mark);
                        return;
                    }
                    Some(_) => {}
                }
            }
        }
    }

    /// Assume the current code point is `\` and the next one is not a newline.
    ///
    /// Consumes up to six hex digits and one trailing whitespace, or a single code point.
    fn consume_escape(&mut self) -> char {
        self.consume();
        match self.current() {
            Some(c) if c.is_css_hex_digit() => {
                let mut value = c.to_digit(16).unwrap_or_default();
                for _ in 0..5 {
                    match self.peek(1).and_then(|c| c.to_digit(16)) {
                        Some(digit) => {
                            self.consume();
                            value = value * 16 + digit;
                        }
                        None => break,
                    }
                }
                if self.peek(1).is_css_whitespace() {
                    self.consume();
                }
                if value == 0 || value > MAX_ALLOWED_CODE_POINT {
                    return REPLACEMENT_CHARACTER;
                }
                char::from_u32(value).unwrap_or(REPLACEMENT_CHARACTER)
            }
            None => REPLACEMENT_CHARACTER,
            Some(c) => c,
        }
    }

    /// Assume the current code point is the opening quote, passed in as `ending`.
    fn consume_string(&mut self, ending: char, mark: Position) -> TokenKind {
        let mut string = String::new();
        loop {
            self.consume();
            match self.current() {
                Some(c) if c == ending => break,
                None => {
                    self.record(TokenizationError::UnterminatedString, mark);
                    break;
                }
                Some('\n') => {
                    // Leave the newline for the next token.
                    self.reconsume();
                    return TokenKind::Error(TokenizationError::UnterminatedString);
                }
                Some('\\') => match self.peek(1) {
                    None => continue,
                    Some('\n') => self.consume(),
                    Some(_) => string.push(self.consume_escape()),
                },
                Some(c) => string.push(c),
            }
        }
        TokenKind::String(self.intern(&string))
    }

    /// Consume a name starting at the next code point. The first code point that does not
    /// belong to the name is left in the stream.
    fn consume_name(&mut self) -> Arc<str> {
        let mut result = String::new();
        loop {
            self.consume();
            match self.current() {
                Some(c) if c.is_ident() => result.push(c),
                _ if self.has_valid_escape() => result.push(self.consume_escape()),
                _ => {
                    self.reconsume();
                    return self.intern(&result);
                }
            }
        }
    }

    fn consume_digits(&mut self, repr: &mut String) {
        while let Some(c) = self.peek(1).filter(|c| c.is_css_digit()) {
            self.consume();
            repr.push(c);
        }
    }

    /// Consume a number starting at the next code point.
    fn consume_number(&mut self) -> Number {
        debug_assert!(Self::is_start_number(self.peekn::<3>()));
        let mut repr = String::new();
        let mut kind = NumberKind::default();

        if let Some(sign @ ('+' | '-')) = self.peek(1) {
            self.consume();
            repr.push(sign);
        }
        self.consume_digits(&mut repr);

        // Parse decimal
        if let [Some('.'), second] = self.peekn::<2>() {
            if second.is_css_digit() {
                self.consume();
                repr.push('.');
                kind = NumberKind::Number;
                self.consume_digits(&mut repr);
            }
        }

        // Parse exponent
        match self.peekn::<3>() {
            [Some(e @ ('E' | 'e')), second, _] if second.is_css_digit() => {
                self.consume();
                repr.push(e);
                kind = NumberKind::Number;
                self.consume_digits(&mut repr);
            }
            [Some(e @ ('E' | 'e')), Some(sign @ ('+' | '-')), third] if third.is_css_digit() => {
                self.consume_n(2);
                repr.push(e);
                repr.push(sign);
                kind = NumberKind::Number;
                self.consume_digits(&mut repr);
            }
            _ => {}
        }

        Number::new(self.intern(&repr), kind)
    }

    /// Consume a number, percentage or dimension starting at the next code point.
    fn consume_numeric(&mut self) -> TokenKind {
        let number = self.consume_number();
        if Self::is_start_ident(self.peekn::<3>()) {
            TokenKind::Dimension {
                value: number,
                unit: self.consume_name(),
            }
        } else if self.peek(1) == Some('%') {
            self.consume();
            TokenKind::Percentage(number)
        } else {
            TokenKind::Number(number)
        }
    }

    /// Consume the remnants of a bad url up to and including the closing `)`.
    fn consume_bad_url_remnants(&mut self) {
        loop {
            self.consume();
            match self.current() {
                None | Some(')') => return,
                _ if self.has_valid_escape() => {
                    let _ = self.consume_escape();
                }
                _ => {}
            }
        }
    }

    fn bad_url(&mut self) -> TokenKind {
        self.consume_bad_url_remnants();
        TokenKind::Error(TokenizationError::BadUrl)
    }

    /// Consume an unquoted url. Assumes `url(` was already consumed.
    fn consume_url(&mut self) -> TokenKind {
        let mut value = String::new();
        while self.peek(1).is_css_whitespace() {
            self.consume();
        }
        if self.peek(1).is_none() {
            return TokenKind::Url(self.intern(&value));
        }
        loop {
            self.consume();
            match self.current() {
                None | Some(')') => break,
                Some(c) if c.is_css_whitespace() => {
                    while self.peek(1).is_css_whitespace() {
                        self.consume();
                    }
                    if let None | Some(')') = self.peek(1) {
                        self.consume();
                        break;
                    }
                    return self.bad_url();
                }
                Some('"' | '\'' | '(') => return self.bad_url(),
                Some(c) if c.is_non_printable() => return self.bad_url(),
                Some('\\') => {
                    if !self.has_valid_escape() {
                        return self.bad_url();
                    }
                    value.push(self.consume_escape());
                }
                Some(c) => value.push(c),
            }
        }
        TokenKind::Url(self.intern(&value))
    }

    /// Consume an ident, function or url starting at the next code point.
    fn consume_ident_like(&mut self) -> TokenKind {
        let name = self.consume_name();
        if name.eq_ignore_ascii_case("url") && self.peek(1) == Some('(') {
            self.consume();
            while self.peek(1).is_css_whitespace() && self.peek(2).is_css_whitespace() {
                self.consume();
            }
            match self.peekn::<2>() {
                [Some('"' | '\''), _] => TokenKind::Function(name),
                [first, Some('"' | '\'')] if first.is_css_whitespace() => TokenKind::Function(name),
                _ => self.consume_url(),
            }
        } else if self.peek(1) == Some('(') {
            self.consume();
            TokenKind::Function(name)
        } else {
            TokenKind::Ident(name)
        }
    }

    /// Consume `c=` as `token`, or `c` alone as a delimiter.
    #[inline]
    fn consume_match(&mut self, c: char, token: TokenKind) -> TokenKind {
        if self.peek(1) == Some('=') {
            self.consume();
            token
        } else {
            TokenKind::Delim(c)
        }
    }

    /// Consume the next token. Its position is the position of its first code point.
    ///
    /// May return [`TokenKind::Error`] for recoverable errors, and [`TokenKind::EOF`] when only
    /// comments were left.
    pub fn consume_a_token(&mut self) -> Token {
        self.consume_comments();
        self.consume();
        let mark = self.mark();

        let kind = match self.current() {
            None => TokenKind::EOF,
            Some(c) if c.is_css_whitespace() => {
                while self.peek(1).is_css_whitespace() {
                    self.consume();
                }
                TokenKind::Whitespace
            }
            Some(quote @ ('"' | '\'')) => self.consume_string(quote, mark),
            Some('#') => {
                let [first, second, _] = self.peekn::<3>();
                if first.is_ident() || Self::is_valid_escape([first, second]) {
                    let hash_type = if Self::is_start_ident(self.peekn::<3>()) {
                        HashType::Id
                    } else {
                        HashType::Unrestricted
                    };
                    TokenKind::Hash(self.consume_name(), hash_type)
                } else {
                    TokenKind::Delim('#')
                }
            }
            Some('$') => self.consume_match('$', TokenKind::SuffixMatch),
            Some('*') => self.consume_match('*', TokenKind::SubstringMatch),
            Some('^') => self.consume_match('^', TokenKind::PrefixMatch),
            Some('~') => self.consume_match('~', TokenKind::IncludeMatch),
            Some('|') => match self.peek(1) {
                Some('=') => {
                    self.consume();
                    TokenKind::DashMatch
                }
                Some('|') => {
                    self.consume();
                    TokenKind::Column
                }
                _ => TokenKind::Delim('|'),
            },
            Some('(') => TokenKind::OpenParen,
            Some(')') => TokenKind::CloseParen,
            Some('[') => TokenKind::OpenSquare,
            Some(']') => TokenKind::CloseSquare,
            Some('{') => TokenKind::OpenCurly,
            Some('}') => TokenKind::CloseCurly,
            Some(',') => TokenKind::Comma,
            Some(':') => TokenKind::Colon,
            Some(';') => TokenKind::Semicolon,
            Some(c @ ('+' | '.')) => {
                if self.has_start_number() {
                    self.reconsume();
                    self.consume_numeric()
                } else {
                    TokenKind::Delim(c)
                }
            }
            Some('-') => {
                if self.has_start_number() {
                    self.reconsume();
                    self.consume_numeric()
                } else if let [Some('-'), Some('>')] = self.peekn::<2>() {
                    self.consume_n(2);
                    TokenKind::CDC
                } else if self.has_start_ident() {
                    self.reconsume();
                    self.consume_ident_like()
                } else {
                    TokenKind::Delim('-')
                }
            }
            Some('<') => {
                if let [Some('!'), Some('-'), Some('-')] = self.peekn::<3>() {
                    self.consume_n(3);
                    TokenKind::CDO
                } else {
                    TokenKind::Delim('<')
                }
            }
            Some('@') => {
                if Self::is_start_ident(self.peekn::<3>()) {
                    TokenKind::AtKeyword(self.consume_name())
                } else {
                    TokenKind::Delim('@')
                }
            }
            Some('\\') => {
                if self.has_valid_escape() {
                    self.reconsume();
                    self.consume_ident_like()
                } else {
                    // A backslash directly followed by a newline.
                    TokenKind::Error(TokenizationError::StrayTrailingBackslash)
                }
            }
            Some(c) if c.is_css_digit() => {
                self.reconsume();
                self.consume_numeric()
            }
            Some(c) if c.is_ident_start() => {
                self.reconsume();
                self.consume_ident_like()
            }
            Some(c) => TokenKind::Delim(c),
        };

        Token::new(kind, mark)
    }
}

/// Yields every non-error token, ending with exactly one EOF token.
impl Iterator for Tokenizer {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if self.peek(1).is_none() {
                self.finished = true;
                return Some(Token::new(TokenKind::EOF, self.positions.eof()));
            }

            let token = self.consume_a_token();
            self.iterations += 1;
            assert!(
                self.iterations <= self.input.len() * 2,
                "internal error: tokenizer is looping"
            );

            match token.kind {
                // Only trailing comments were left; the final EOF is emitted above.
                TokenKind::EOF => {}
                TokenKind::Error(error) => self.record(error, token.position),
                _ => return Some(token),
            }
        }
        None
    }
}

/// Tokenize `source`, numbering positions from `start_line`/`start_col`.
///
/// Returns the tokens, always terminated by a single EOF token, and the recoverable errors met
/// along the way.
pub fn tokenize(source: &str, start_line: usize, start_col: usize) -> (Vec<Token>, Vec<ErrorToken>) {
    let options = TokenizerOptions::default().start(start_line, start_col);
    Tokenizer::new(CodePointStream::from_str(source), &options).run()
}

/// Same as [`tokenize`] for UTF-16 input. Surrogate pairs become single code points.
pub fn tokenize_utf16(units: &[u16], start_line: usize, start_col: usize) -> (Vec<Token>, Vec<ErrorToken>) {
    let options = TokenizerOptions::default().start(start_line, start_col);
    Tokenizer::new(CodePointStream::from_utf16(units), &options).run()
}

/// Same as [`tokenize`] for raw bytes decoded with the configured encoding.
pub fn tokenize_bytes(bytes: &[u8], options: &TokenizerOptions) -> (Vec<Token>, Vec<ErrorToken>) {
    Tokenizer::new(CodePointStream::from_bytes(bytes, options.encoding), options).run()
}
