//! Terminal rendering: the live readout and supervisor notices.

use std::io::{self, IsTerminal, Write};

use chrono::Local;
use owo_colors::OwoColorize;

use waterpanel_core::{DisplaySink, Notice, Reading};

use crate::cli::{ColorMode, OutputFormat};

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// One reading as a line of text or JSON.
pub fn render_reading(reading: &Reading, format: OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({
            "tag": reading.tag,
            "value": reading.formatted(),
            "transport": reading.transport,
            "received_at": reading.received_at,
        })
        .to_string(),
        OutputFormat::Text => {
            let stamp = reading
                .received_at
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string();
            let value = reading.formatted();
            if color {
                format!(
                    "{}  {}  {}",
                    stamp.dimmed(),
                    reading.tag.cyan(),
                    value.bold().green()
                )
            } else {
                format!("{stamp}  {}  {value}", reading.tag)
            }
        }
    }
}

/// Prints each reading to stdout.
#[derive(Debug, Clone, Copy)]
pub struct TerminalDisplay {
    format: OutputFormat,
    color: bool,
}

impl TerminalDisplay {
    pub fn new(format: OutputFormat, color: bool) -> Self {
        Self { format, color }
    }
}

impl DisplaySink for TerminalDisplay {
    fn show(&mut self, reading: &Reading) {
        let line = render_reading(reading, self.format, self.color);
        let mut out = io::stdout().lock();
        // A closed pipe is not worth dying over mid-session.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// Notices go to stderr so stdout stays a clean stream of readings.
pub fn print_notice(notice: &Notice, color: bool) {
    let text = notice.to_string();
    let is_good = matches!(notice, Notice::Connected { .. });
    match (color, is_good) {
        (false, _) => eprintln!("{text}"),
        (true, true) => eprintln!("{} {text}", "✓".green()),
        (true, false) => eprintln!("{} {}", "!".yellow().bold(), text.yellow()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterpanel_core::Transport;

    #[test]
    fn text_line_without_color_is_plain() {
        let reading = Reading::new("Flow_1", 42.5, Transport::Rest).unwrap();
        let line = render_reading(&reading, OutputFormat::Text, false);
        assert!(line.ends_with("  Flow_1  42.50"), "got {line}");
        assert!(!line.contains('\u{1b}'));
    }

    #[test]
    fn json_line_carries_formatted_value() {
        let reading = Reading::new("currentInjector", 7.1, Transport::Mqtt).unwrap();
        let line = render_reading(&reading, OutputFormat::Json, false);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["value"], "7.10");
        assert_eq!(parsed["transport"], "mqtt");
        assert_eq!(parsed["tag"], "currentInjector");
    }
}
