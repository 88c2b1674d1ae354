use std::fmt::Display;

use crate::code_point::{CodePointStream, TokenizeCharHelper};

/// A line/column pair. Lines start at whatever the caller asked for (1 by default), columns
/// count code points from 0 on each line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ":{}:{}", self.line, self.col)
    }
}

/// Precomputed position of every code point in a stream.
///
/// The table holds one extra entry past the last code point, which is where EOF sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionTable {
    positions: Vec<Position>,
}

impl PositionTable {
    pub fn new(stream: &CodePointStream, start: Position) -> Self {
        let mut positions = Vec::with_capacity(stream.len() + 1);
        let mut current = start;
        for &point in stream.as_slice() {
            positions.push(current);
            if point.is_newline() {
                current.line += 1;
                current.col = 0;
            } else {
                current.col += 1;
            }
        }
        positions.push(current);
        Self { positions }
    }

    /// Position of the code point at `index`. Indices past the end clamp to the EOF position.
    #[inline]
    pub fn get(&self, index: usize) -> Position {
        let last = self.positions.len() - 1;
        self.positions[index.min(last)]
    }

    /// Position just after the last code point.
    #[inline]
    pub fn eof(&self) -> Position {
        self.positions[self.positions.len() - 1]
    }

    /// Position of the first code point, i.e. the start the table was built with.
    #[inline]
    pub fn start(&self) -> Position {
        self.positions[0]
    }
}
