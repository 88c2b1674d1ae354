use std::{fmt::Debug, ops::Index};

use encoding_rs::{Encoding, UTF_8};

pub const REPLACEMENT_CHARACTER: char = char::REPLACEMENT_CHARACTER;
pub const FORM_FEED: char = 0x000C as char;
pub const NULL: char = 0x0000 as char;

const LEAD_SURROGATES: std::ops::RangeInclusive<u16> = 0xD800..=0xDBFF;
const TRAIL_SURROGATES: std::ops::RangeInclusive<u16> = 0xDC00..=0xDFFF;

/// Character classes from the CSS Syntax Level 3 tokenizer definitions.
///
/// Every predicate is total. They assume the input already went through
/// preprocessing, so `\r` and form feeds are never seen as newlines.
pub trait TokenizeCharHelper {
    fn is_css_digit(&self) -> bool;
    fn is_css_hex_digit(&self) -> bool;
    fn is_letter(&self) -> bool;
    fn is_non_ascii(&self) -> bool;
    fn is_ident_start(&self) -> bool;
    fn is_ident(&self) -> bool;
    fn is_non_printable(&self) -> bool;
    fn is_newline(&self) -> bool;
    fn is_css_whitespace(&self) -> bool;
}

impl TokenizeCharHelper for char {
    fn is_css_digit(&self) -> bool {
        self.is_ascii_digit()
    }

    fn is_css_hex_digit(&self) -> bool {
        self.is_ascii_hexdigit()
    }

    fn is_letter(&self) -> bool {
        self.is_ascii_alphabetic()
    }

    fn is_non_ascii(&self) -> bool {
        *self as u32 >= 0x0080
    }

    fn is_ident_start(&self) -> bool {
        self.is_letter() || self.is_non_ascii() || self == &'_'
    }

    fn is_ident(&self) -> bool {
        self.is_ident_start() || self.is_css_digit() || self == &'-'
    }

    fn is_non_printable(&self) -> bool {
        let val = *self as u32;
        val == 0x000B
            || val == 0x007F
            || (0x0000..=0x0008).contains(&val)
            || (0x000E..=0x001F).contains(&val)
    }

    fn is_newline(&self) -> bool {
        self == &'\n'
    }

    fn is_css_whitespace(&self) -> bool {
        self.is_newline() || self == &'\t' || self == &' '
    }
}

/// EOF never belongs to any class.
impl TokenizeCharHelper for Option<char> {
    fn is_css_digit(&self) -> bool {
        matches!(self, Some(c) if c.is_css_digit())
    }

    fn is_css_hex_digit(&self) -> bool {
        matches!(self, Some(c) if c.is_css_hex_digit())
    }

    fn is_letter(&self) -> bool {
        matches!(self, Some(c) if c.is_letter())
    }

    fn is_non_ascii(&self) -> bool {
        matches!(self, Some(c) if c.is_non_ascii())
    }

    fn is_ident_start(&self) -> bool {
        matches!(self, Some(c) if c.is_ident_start())
    }

    fn is_ident(&self) -> bool {
        matches!(self, Some(c) if c.is_ident())
    }

    fn is_non_printable(&self) -> bool {
        matches!(self, Some(c) if c.is_non_printable())
    }

    fn is_newline(&self) -> bool {
        matches!(self, Some(c) if c.is_newline())
    }

    fn is_css_whitespace(&self) -> bool {
        matches!(self, Some(c) if c.is_css_whitespace())
    }
}

/// An immutable sequence of preprocessed code points.
///
/// Preprocessing replaces `\r\n`, `\r` and `\f` with `\n` and U+0000 (NULL) with U+FFFD
/// REPLACEMENT CHARACTER (�). Astral characters are always a single entry, whatever encoding
/// they arrived in. Reading past the end yields `None`, which the tokenizer treats as EOF.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CodePointStream {
    points: Vec<char>,
}

impl Debug for CodePointStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodePointStream")
            .field("points", &self.points.iter().collect::<String>())
            .finish()
    }
}

impl CodePointStream {
    /// Preprocess a Rust string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Self {
        Self {
            points: Self::filter_code_points(source.chars()),
        }
    }

    /// Preprocess UTF-16 code units, recombining surrogate pairs into astral code points.
    ///
    /// A surrogate without its partner has no `char` representation and becomes U+FFFD.
    pub fn from_utf16(units: &[u16]) -> Self {
        let mut decoded = Vec::with_capacity(units.len());
        let mut iter = units.iter().copied().peekable();
        while let Some(unit) = iter.next() {
            let code = if LEAD_SURROGATES.contains(&unit) {
                match iter.peek().copied() {
                    Some(trail) if TRAIL_SURROGATES.contains(&trail) => {
                        let _ = iter.next();
                        0x10000 + (u32::from(unit) - 0xD800) * 0x400 + (u32::from(trail) - 0xDC00)
                    }
                    _ => REPLACEMENT_CHARACTER as u32,
                }
            } else {
                u32::from(unit)
            };
            decoded.push(char::from_u32(code).unwrap_or(REPLACEMENT_CHARACTER));
        }
        Self {
            points: Self::filter_code_points(decoded),
        }
    }

    /// Decode raw bytes with `encoding` (UTF-8 when `None`) and preprocess the result.
    ///
    /// A byte order mark overrides the requested encoding. Malformed sequences decode to U+FFFD.
    pub fn from_bytes(bytes: &[u8], encoding: Option<&'static Encoding>) -> Self {
        let encoding = encoding.unwrap_or(UTF_8);
        let (decoded, used, had_errors) = encoding.decode(bytes);
        if had_errors {
            tracing::debug!(encoding = used.name(), "malformed input replaced while decoding");
        }
        Self::from_str(&decoded)
    }

    #[inline]
    fn filter_code_points<I: IntoIterator<Item = char>>(points: I) -> Vec<char> {
        let mut result = Vec::new();
        let mut iter = points.into_iter().peekable();
        while let Some(next) = iter.next() {
            match next {
                '\r' => {
                    result.push('\n');
                    if let Some('\n') = iter.peek().copied() {
                        let _ = iter.next();
                    }
                }
                FORM_FEED => result.push('\n'),
                NULL => result.push(REPLACEMENT_CHARACTER),
                other => result.push(other),
            }
        }
        result
    }

    /// The code point at `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<char> {
        self.points.get(index).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn as_slice(&self) -> &[char] {
        &self.points
    }
}

impl Index<usize> for CodePointStream {
    type Output = char;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl From<&str> for CodePointStream {
    fn from(value: &str) -> Self {
        Self::from_str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newlines_are_normalized() {
        let stream = CodePointStream::from_str("a\r\nb\rc\u{c}d\ne");
        assert_eq!(stream.as_slice(), &['a', '\n', 'b', '\n', 'c', '\n', 'd', '\n', 'e']);
    }

    #[test]
    fn null_is_replaced() {
        let stream = CodePointStream::from_str("a\0b");
        assert_eq!(stream.as_slice(), &['a', REPLACEMENT_CHARACTER, 'b']);
    }

    #[test]
    fn lone_carriage_return_at_end() {
        let stream = CodePointStream::from_str("a\r");
        assert_eq!(stream.as_slice(), &['a', '\n']);
    }

    #[test]
    fn surrogate_pairs_are_recombined() {
        let units = "x\u{1F642}y".encode_utf16().collect::<Vec<_>>();
        assert_eq!(units.len(), 4);
        let stream = CodePointStream::from_utf16(&units);
        assert_eq!(stream.as_slice(), &['x', '\u{1F642}', 'y']);
    }

    #[test]
    fn unpaired_surrogates_do_not_fail() {
        let stream = CodePointStream::from_utf16(&[0x61, 0xD800, 0x62, 0xDC00]);
        assert_eq!(
            stream.as_slice(),
            &['a', REPLACEMENT_CHARACTER, 'b', REPLACEMENT_CHARACTER]
        );

        let stream = CodePointStream::from_utf16(&[0xD83D]);
        assert_eq!(stream.as_slice(), &[REPLACEMENT_CHARACTER]);
    }

    #[test]
    fn utf16_input_is_preprocessed() {
        let units = "a\r\n\0".encode_utf16().collect::<Vec<_>>();
        let stream = CodePointStream::from_utf16(&units);
        assert_eq!(stream.as_slice(), &['a', '\n', REPLACEMENT_CHARACTER]);
    }

    #[test]
    fn read_code_points_from_bytes() {
        let stream = CodePointStream::from_bytes(
            &[240u8, 159, 153, 130, 0xFF, 34, 104, 105, 34, b'\r', b'\n'],
            None,
        );
        assert_eq!(
            stream.as_slice(),
            &['\u{1F642}', REPLACEMENT_CHARACTER, '"', 'h', 'i', '"', '\n']
        );
    }

    #[test]
    fn read_code_points_with_encoding() {
        let stream = CodePointStream::from_bytes(&[0x61, 0x00, 0x3D, 0xD8, 0x42, 0xDE], Some(encoding_rs::UTF_16LE));
        assert_eq!(stream.as_slice(), &['a', '\u{1F642}']);
    }

    #[test]
    fn past_the_end_is_eof() {
        let stream = CodePointStream::from_str("ab");
        assert_eq!(stream.get(1), Some('b'));
        assert_eq!(stream.get(2), None);
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn classifiers() {
        assert!('7'.is_css_digit());
        assert!(!'a'.is_css_digit());
        assert!('F'.is_css_hex_digit() && 'a'.is_css_hex_digit() && !'g'.is_css_hex_digit());
        assert!('z'.is_letter() && !'_'.is_letter());
        assert!('é'.is_non_ascii() && !'\u{7f}'.is_non_ascii());
        assert!('_'.is_ident_start() && 'é'.is_ident_start() && !'-'.is_ident_start());
        assert!('-'.is_ident() && '9'.is_ident() && !'.'.is_ident());
        assert!('\u{0}'.is_non_printable() && '\u{b}'.is_non_printable() && '\u{7f}'.is_non_printable());
        assert!(!'\t'.is_non_printable() && !'\n'.is_non_printable() && !'\u{c}'.is_non_printable());
        assert!('\n'.is_newline() && !'\r'.is_newline());
        assert!(' '.is_css_whitespace() && '\t'.is_css_whitespace() && !'\u{a0}'.is_css_whitespace());
    }

    #[test]
    fn eof_has_no_class() {
        let eof: Option<char> = None;
        assert!(!eof.is_ident() && !eof.is_css_whitespace() && !eof.is_non_printable());
        assert!(Some('a').is_ident_start());
    }
}
