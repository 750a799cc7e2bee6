//! Line framing for message-based instruments.
//!
//! Commands are ASCII text followed by a write termination; replies are
//! ASCII lines ended by a read termination. The helpers here are pure so the
//! [`Adapter`](crate::Adapter) can be tested separately from the byte-level
//! buffering it does.

use instrlib_core::error::{Error, Result};

/// Result of attempting to take one line from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete line was found.
    Line {
        /// Line text with the termination removed.
        text: String,
        /// Number of bytes consumed from the buffer, termination included.
        consumed: usize,
    },

    /// A terminated line was found but it is not valid UTF-8.
    Invalid(usize),

    /// The buffer does not yet contain a termination.
    Incomplete,
}

/// Append `termination` to `command`.
pub fn encode_message(command: &str, termination: &str) -> Vec<u8> {
    let mut msg = Vec::with_capacity(command.len() + termination.len());
    msg.extend_from_slice(command.as_bytes());
    msg.extend_from_slice(termination.as_bytes());
    msg
}

/// Position of the first occurrence of `termination` in `buf`.
///
/// An empty termination never matches.
pub fn find_termination(buf: &[u8], termination: &[u8]) -> Option<usize> {
    if termination.is_empty() || buf.len() < termination.len() {
        return None;
    }
    buf.windows(termination.len())
        .position(|window| window == termination)
}

/// Take the first terminated line from `buf`.
///
/// # Examples
///
/// ```
/// use instrlib_message::framing::{DecodeResult, decode_line};
///
/// assert_eq!(
///     decode_line(b"HP5384A\r\nrest", b"\r\n"),
///     DecodeResult::Line { text: "HP5384A".into(), consumed: 9 },
/// );
/// assert_eq!(decode_line(b"HP53", b"\r\n"), DecodeResult::Incomplete);
/// ```
pub fn decode_line(buf: &[u8], termination: &[u8]) -> DecodeResult {
    let Some(pos) = find_termination(buf, termination) else {
        return DecodeResult::Incomplete;
    };
    let consumed = pos + termination.len();
    match std::str::from_utf8(&buf[..pos]) {
        Ok(text) => DecodeResult::Line {
            text: text.to_string(),
            consumed,
        },
        Err(_) => DecodeResult::Invalid(consumed),
    }
}

/// Parse a separated list of numbers, e.g. `"1.0,2.5,-3"`.
///
/// Blank entries (such as a trailing separator) are skipped.
pub fn parse_values(reply: &str, separator: char) -> Result<Vec<f64>> {
    reply
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| {
                Error::MalformedReply(format!("{s:?} in {reply:?} is not a number"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_appends_termination() {
        assert_eq!(encode_message("CF 1000000HZ", "\n"), b"CF 1000000HZ\n");
        assert_eq!(encode_message("IP", ""), b"IP");
    }

    #[test]
    fn decode_line_with_crlf() {
        match decode_line(b"+1.0E+06\r\n", b"\r\n") {
            DecodeResult::Line { text, consumed } => {
                assert_eq!(text, "+1.0E+06");
                assert_eq!(consumed, 10);
            }
            other => panic!("expected Line, got {other:?}"),
        }
    }

    #[test]
    fn decode_line_takes_first_of_several() {
        assert_eq!(
            decode_line(b"1\n2\n", b"\n"),
            DecodeResult::Line {
                text: "1".into(),
                consumed: 2
            }
        );
    }

    #[test]
    fn decode_line_empty_line() {
        assert_eq!(
            decode_line(b"\n", b"\n"),
            DecodeResult::Line {
                text: String::new(),
                consumed: 1
            }
        );
    }

    #[test]
    fn decode_line_incomplete() {
        assert_eq!(decode_line(b"", b"\n"), DecodeResult::Incomplete);
        assert_eq!(decode_line(b"ID\r", b"\r\n"), DecodeResult::Incomplete);
        assert_eq!(decode_line(b"ID\n", b""), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_line_invalid_utf8() {
        assert_eq!(decode_line(&[0xFF, 0xFE, b'\n'], b"\n"), DecodeResult::Invalid(3));
    }

    #[test]
    fn parse_values_list() {
        assert_eq!(parse_values("1.0, 2.5,-3", ',').unwrap(), vec![1.0, 2.5, -3.0]);
        assert_eq!(parse_values("4;5;", ';').unwrap(), vec![4.0, 5.0]);
        assert!(parse_values("", ',').unwrap().is_empty());
    }

    #[test]
    fn parse_values_rejects_text() {
        let err = parse_values("1,x,3", ',').unwrap_err();
        assert!(matches!(err, Error::MalformedReply(_)));
    }
}
