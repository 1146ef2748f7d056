//! Where terms come from.

use std::fmt;

/// Span of source text that a term was parsed from.
///
/// Terms built programmatically have the empty span at offset zero.
#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct Location
{
    /// Byte offset of the first byte of the span.
    pub offset: usize,

    /// Length of the span in bytes.
    pub length: usize,
}

impl Location
{
    /// Create a span.
    pub fn new(offset: usize, length: usize) -> Self
    {
        Self{offset, length}
    }
}

impl fmt::Debug for Location
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        write!(f, "{}..{}", self.offset, self.offset + self.length)
    }
}

impl fmt::Display for Location
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        if self.length == 0 {
            write!(f, "offset {}", self.offset)
        } else {
            write!(f, "offsets {}..{}", self.offset, self.offset + self.length)
        }
    }
}
