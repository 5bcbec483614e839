//! Natural ordering of frame names.
//!
//! Names are split into alternating runs of digits and non-digits. Digit runs
//! compare by numeric value first, so `tile2` sorts before `tile10`, and values
//! of any length are supported without parsing into a fixed-width integer.

use std::cmp::Ordering;

/// Compares two frame names in natural order.
///
/// - digit runs compare by value, equal values fall back to the literal text
///   (`"07"` sorts before `"7"`)
/// - other runs compare lexicographically
/// - when every compared run ties, the name with fewer runs sorts first
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let mut lhs = Segments::new(a);
    let mut rhs = Segments::new(b);
    loop {
        match (lhs.next(), rhs.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_segments(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    if is_digits(a) && is_digits(b) {
        compare_numeric(a, b).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

/// Compares two digit strings by the value they denote.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn is_digits(s: &str) -> bool {
    s.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Iterator over the digit / non-digit runs of a string.
struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.as_bytes().first()?;
        let digit = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digit)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (seg, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(seg)
    }
}
