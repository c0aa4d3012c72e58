//! Helpers shared by the decoder and encoder: line tracking over a streaming
//! window, whitespace checks, and element name validation.

use std::io::{self, BufRead, Read};

/// Default size of the streaming window the tokenizer reads through.
pub const DEFAULT_WINDOW_SIZE: usize = 2048;

/// One indentation level in encoded output.
pub const INDENT_UNIT: &str = "\t";

/// A `BufRead` adapter that remembers where every consumed newline was, so
/// tokenizer byte offsets can be reported as line numbers without keeping the
/// document itself around.
pub(crate) struct LineTracker<R> {
    inner: R,
    consumed: u64,
    newlines: Vec<u64>,
}

impl<R: BufRead> LineTracker<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            consumed: 0,
            newlines: Vec::new(),
        }
    }

    /// 1-based line containing the byte at `offset`.
    pub(crate) fn line_at(&self, offset: u64) -> u64 {
        self.newlines.partition_point(|&nl| nl < offset) as u64 + 1
    }

    /// Total bytes handed to the tokenizer so far.
    pub(crate) fn consumed(&self) -> u64 {
        self.consumed
    }
}

impl<R: BufRead> Read for LineTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        note_newlines(&mut self.newlines, self.consumed, &buf[..n]);
        self.consumed += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for LineTracker<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        // The window is still filled from the preceding fill_buf call, so this
        // does no IO; it only exposes the bytes about to be consumed.
        if let Ok(window) = self.inner.fill_buf() {
            let window = &window[..amt.min(window.len())];
            note_newlines(&mut self.newlines, self.consumed, window);
        }
        self.consumed += amt as u64;
        self.inner.consume(amt);
    }
}

fn note_newlines(newlines: &mut Vec<u64>, base: u64, bytes: &[u8]) {
    newlines.extend(memchr::memchr_iter(b'\n', bytes).map(|i| base + i as u64));
}

/// Checks if a text fragment consists only of XML whitespace.
pub(crate) fn is_blank(text: &[u8]) -> bool {
    text.iter()
        .all(|b| matches!(b, b' ' | b'\n' | b'\r' | b'\t'))
}

/// Checks if `name` can be written as an element name.
///
/// Accepts qualified names (`soap:Body`) and the dotted action names the API
/// uses (`Subscriber.Add`). Rejects anything that would break the markup.
pub fn is_valid_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_' || first == ':') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn test_line_tracker_counts_consumed_lines() {
        let data = b"<r>\n<a>1</a>\n<b>2</b>\n</r>";
        let mut tracker = LineTracker::new(BufReader::with_capacity(4, &data[..]));

        let mut out = Vec::new();
        loop {
            let window = tracker.fill_buf().unwrap();
            if window.is_empty() {
                break;
            }
            let n = window.len();
            out.extend_from_slice(window);
            tracker.consume(n);
        }

        assert_eq!(out, data);
        assert_eq!(tracker.consumed(), data.len() as u64);
        assert_eq!(tracker.line_at(0), 1);
        assert_eq!(tracker.line_at(3), 1);
        assert_eq!(tracker.line_at(4), 2);
        assert_eq!(tracker.line_at(data.len() as u64), 4);
    }

    #[test]
    fn test_line_tracker_read_path() {
        let data = b"a\nb\nc";
        let mut tracker = LineTracker::new(&data[..]);
        let mut out = String::new();
        tracker.read_to_string(&mut out).unwrap();
        assert_eq!(out, "a\nb\nc");
        assert_eq!(tracker.line_at(4), 3);
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(b""));
        assert!(is_blank(b" \n\t\r"));
        assert!(!is_blank(b" x "));
    }

    #[test]
    fn test_is_valid_element_name() {
        assert!(is_valid_element_name("ListID"));
        assert!(is_valid_element_name("soap:Body"));
        assert!(is_valid_element_name("Subscriber.AddWithCustomFields"));
        assert!(is_valid_element_name("_private-name"));
        assert!(!is_valid_element_name(""));
        assert!(!is_valid_element_name("0"));
        assert!(!is_valid_element_name("two words"));
        assert!(!is_valid_element_name("a<b"));
        assert!(!is_valid_element_name("a&b"));
    }
}
