//! Plain-text rendering of a [`Snapshot`].

use std::fmt::Write;

use snooper_core::{ConnectionStatus, Record, Snapshot};

const TIME_PLACEHOLDER: &str = "--:--:--";

/// Full screen: header, counters, table
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let badge = match snapshot.connection_status {
        ConnectionStatus::Connected => "● Connected",
        ConnectionStatus::Connecting => "○ Connecting",
        ConnectionStatus::Disconnected => "○ Disconnected",
    };
    let _ = write!(out, "CAN Snooper  [{}]", badge);
    if snapshot.paused {
        out.push_str("  PAUSED");
    }
    if !snapshot.filter_query.trim().is_empty() {
        let _ = write!(out, "  filter: {:?}", snapshot.filter_query.trim());
    }
    out.push('\n');
    let _ = writeln!(
        out,
        "Total messages: {}   Unique signals: {}",
        snapshot.total_message_count, snapshot.unique_signal_count
    );
    out.push('\n');
    let _ = writeln!(
        out,
        "{:<10} {:<12} {:<24} {:>16}",
        "Time", "CAN ID", "Signal", "Value"
    );
    if snapshot.view.is_empty() {
        out.push_str("No messages yet.\n");
    }
    for record in &snapshot.view {
        out.push_str(&format_row(record));
        out.push('\n');
    }
    out.push_str("\n[p] pause/resume  [c] clear  [/text] filter  [q] quit\n");
    out
}

/// One table row: local time, hex id, signal, value
pub fn format_row(record: &Record) -> String {
    format!(
        "{:<10} {:<12} {:<24} {:>16}",
        format_time(record),
        record.can_id_hex(),
        record.signal_name,
        format_value(record.value)
    )
}

/// Shortest round-trip form; exponent notation outside [1e-6, 1e21)
fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if value.is_finite() && value != 0.0 && (magnitude >= 1e21 || magnitude < 1e-6) {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

fn format_time(record: &Record) -> String {
    record
        .time_local()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| TIME_PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_uses_hex_id_and_plain_value() {
        let row = format_row(&Record::new(520, "speed", 42.5, 1000.0));
        assert!(row.contains("0x208"));
        assert!(row.contains("speed"));
        assert!(row.trim_end().ends_with("42.5"));
    }

    #[test]
    fn test_extreme_values_use_exponent() {
        let row = format_row(&Record::new(1, "x", 1.7e308, 1000.0));
        assert!(row.trim_end().ends_with("1.7e308"));
        assert!(row.len() < 80);
        assert_eq!(format_value(-2.5e-9), "-2.5e-9");
        assert_eq!(format_value(1e21), "1e21");
        assert_eq!(format_value(123456.75), "123456.75");
        assert_eq!(format_value(0.0), "0");
    }

    #[test]
    fn test_unrepresentable_time_placeholder() {
        let row = format_row(&Record::new(1, "x", 0.0, 1e300));
        assert!(row.starts_with(TIME_PLACEHOLDER));
    }

    #[test]
    fn test_empty_view() {
        let screen = render(&Snapshot::default());
        assert!(screen.contains("No messages yet."));
        assert!(screen.contains("Connecting"));
        assert!(screen.contains("Total messages: 0"));
    }

    #[test]
    fn test_header_flags() {
        let snapshot = Snapshot {
            view: vec![Record::new(521, "rpm", 3000.0, 1001.0)],
            connection_status: ConnectionStatus::Connected,
            paused: true,
            total_message_count: 1,
            unique_signal_count: 1,
            filter_query: " rpm ".into(),
        };
        let screen = render(&snapshot);
        assert!(screen.contains("PAUSED"));
        assert!(screen.contains("filter: \"rpm\""));
        assert!(screen.contains("0x209"));
        assert!(!screen.contains("No messages yet."));
    }
}
