//! Logging helpers: keep alert text on a single log line and avoid writing full
//! phone numbers into log files.

/// Escape a string for single-line logging.
///
/// Newlines, carriage returns, tabs and backslashes are escaped; other control
/// characters become `\xNN`. Output is capped at 200 characters with an ellipsis.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 200;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Mask all but the last two digits of a phone number.
///
/// Non-digit characters (`+`, spaces, dashes) are kept so the shape stays
/// recognisable: `+1 555-0100` becomes `+* ***-**00`.
pub fn redact_number(number: &str) -> String {
    let digits = number.chars().filter(|c| c.is_ascii_digit()).count();
    let keep_from = digits.saturating_sub(2);
    let mut seen = 0usize;
    number
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen > keep_from {
                    c
                } else {
                    '*'
                }
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_text_stays_on_one_line() {
        let text = "Help\nMy current location: https://maps.google.com/?q=1,2";
        assert_eq!(
            escape_log(text),
            "Help\\nMy current location: https://maps.google.com/?q=1,2"
        );
    }

    #[test]
    fn long_text_is_truncated() {
        let long = "x".repeat(500);
        let esc = escape_log(&long);
        assert!(esc.ends_with('…'));
        assert_eq!(esc.chars().count(), 201);
    }

    #[test]
    fn numbers_keep_last_two_digits() {
        assert_eq!(redact_number("+1 555-0100"), "+* ***-**00");
        assert_eq!(redact_number("42"), "42");
        assert_eq!(redact_number(""), "");
    }
}
