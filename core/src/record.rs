//! Decoded CAN signal observations as they arrive on the wire.
//!
//! One JSON object per transport message:
//! `{ "can_id": 520, "signal_name": "speed", "value": 42.0, "timestamp": 1000.0 }`

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A single decoded signal reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier of the source bus frame
    pub can_id: u32,
    /// Name of the decoded signal
    pub signal_name: String,
    /// Physical value
    pub value: f64,
    /// Seconds since Unix epoch, assigned by the sender
    pub timestamp: f64,
}

impl Record {
    pub fn new(can_id: u32, signal_name: impl Into<String>, value: f64, timestamp: f64) -> Self {
        Self {
            can_id,
            signal_name: signal_name.into(),
            value,
            timestamp,
        }
    }

    /// Parse one wire payload
    pub fn parse(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Parse a binary frame; it must carry UTF-8 JSON
    pub fn parse_bytes(payload: Vec<u8>) -> Result<Self> {
        let text = String::from_utf8(payload)?;
        Self::parse(&text)
    }

    /// `0x` prefixed uppercase hex, e.g. `0x208` for 520
    pub fn can_id_hex(&self) -> String {
        format!("0x{:X}", self.can_id)
    }

    /// Sender timestamp as UTC. `None` when it does not fit a calendar date.
    pub fn time_utc(&self) -> Option<DateTime<Utc>> {
        if !self.timestamp.is_finite() {
            return None;
        }
        let millis = (self.timestamp * 1000.0).round();
        if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
            return None;
        }
        Utc.timestamp_millis_opt(millis as i64).single()
    }

    /// Sender timestamp in the local timezone
    pub fn time_local(&self) -> Option<DateTime<Local>> {
        self.time_utc().map(|t| t.with_timezone(&Local))
    }
}
