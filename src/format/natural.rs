//! Natural ordering for archive entry paths.
//!
//! Readers expect `page2.jpg` before `page10.jpg`, and `Cover.png` next to
//! `cover.png`. Paths are split into runs of ASCII digits and runs of
//! everything else. Digit runs compare by numeric value and text runs compare
//! case-insensitively. Paths that are still equal fall back to byte order so
//! the result is a total order.

use std::cmp::Ordering;

/// Split a string into alternating digit / non-digit runs.
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

fn is_digit_run(chunk: &str) -> bool {
    chunk.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    let a_lower = a.chars().flat_map(char::to_lowercase);
    let b_lower = b.chars().flat_map(char::to_lowercase);
    a_lower.cmp(b_lower)
}

/// Compare two paths in natural order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = if is_digit_run(x) && is_digit_run(y) {
                    compare_numeric(x, y)
                } else {
                    compare_text(x, y)
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
