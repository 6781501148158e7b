//! Line-oriented input for the running service.
//!
//! One token per line, case-insensitive:
//!
//! | Line | Meaning |
//! |------|---------|
//! | `START_RECURRING_ALERT` | start the recurring alert |
//! | `STOP_RECURRING_ALERT` | stop the recurring alert |
//! | `SEND_ALERT` | one-shot alert (suppressed while recurring) |
//! | `STATUS` | log controller statistics |
//! | `VOLUME_UP [DOWN\|UP]` | volume key event (key-down when no action given) |
//! | `VOLUME_DOWN [DOWN\|UP]` | volume key event |
//! | any other key name | key event the trigger detector ignores |

use crate::trigger::{KeyAction, KeyCode, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    StartRecurring,
    StopRecurring,
    SendAlert,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Command(ServiceCommand),
    Key(KeyEvent),
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Option<InputLine> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut parts = line.split_whitespace();
    let head = parts.next()?.to_ascii_uppercase();

    let command = match head.as_str() {
        "START_RECURRING_ALERT" => Some(ServiceCommand::StartRecurring),
        "STOP_RECURRING_ALERT" => Some(ServiceCommand::StopRecurring),
        "SEND_ALERT" => Some(ServiceCommand::SendAlert),
        "STATUS" => Some(ServiceCommand::Status),
        _ => None,
    };
    if let Some(command) = command {
        return Some(InputLine::Command(command));
    }

    let code = match head.as_str() {
        "VOLUME_UP" => KeyCode::VolumeUp,
        "VOLUME_DOWN" => KeyCode::VolumeDown,
        _ => KeyCode::Other(head),
    };
    let action = match parts.next().map(|s| s.to_ascii_uppercase()).as_deref() {
        Some("UP") => KeyAction::Up,
        _ => KeyAction::Down,
    };
    Some(InputLine::Key(KeyEvent { code, action }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_case_insensitively() {
        assert_eq!(
            parse_line("start_recurring_alert"),
            Some(InputLine::Command(ServiceCommand::StartRecurring))
        );
        assert_eq!(
            parse_line("  STOP_RECURRING_ALERT  "),
            Some(InputLine::Command(ServiceCommand::StopRecurring))
        );
        assert_eq!(
            parse_line("Send_Alert"),
            Some(InputLine::Command(ServiceCommand::SendAlert))
        );
    }

    #[test]
    fn parses_key_events() {
        assert_eq!(
            parse_line("VOLUME_UP"),
            Some(InputLine::Key(KeyEvent::down(KeyCode::VolumeUp)))
        );
        assert_eq!(
            parse_line("volume_down up"),
            Some(InputLine::Key(KeyEvent::up(KeyCode::VolumeDown)))
        );
        assert_eq!(
            parse_line("power"),
            Some(InputLine::Key(KeyEvent::down(KeyCode::Other("POWER".into()))))
        );
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("# VOLUME_UP"), None);
    }
}
