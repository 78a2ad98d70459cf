// Stream controller: connection status, pause gate, record log and filter
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::record::Record;
use crate::transport::TransportEvent;
use crate::view::{ViewCache, VIEW_WINDOW};

/// Connection state as seen by the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
        }
    }
}

/// User commands issued by the display
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    TogglePause,
    Clear,
    SetFilter(String),
}

/// Read-only projection handed to the display
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// At most `window` records, most recent first
    pub view: Vec<Record>,
    pub connection_status: ConnectionStatus,
    pub paused: bool,
    pub total_message_count: usize,
    pub unique_signal_count: usize,
    pub filter_query: String,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            view: Vec::new(),
            connection_status: ConnectionStatus::Connecting,
            paused: false,
            total_message_count: 0,
            unique_signal_count: 0,
            filter_query: String::new(),
        }
    }
}

/// Counters for records that never reached the log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub malformed: u64,
    pub dropped_while_paused: u64,
}

/// Owns the stream state. Every mutation goes through [`handle_event`](Self::handle_event)
/// or [`handle_command`](Self::handle_command).
#[derive(Debug)]
pub struct StreamController {
    status: ConnectionStatus,
    paused: bool,
    log: Vec<Record>,
    filter_query: String,
    // bumped on every log mutation, keys the view cache
    revision: u64,
    signal_names: HashSet<String>,
    cache: ViewCache,
    stats: IngestStats,
    torn_down: bool,
}

impl Default for StreamController {
    fn default() -> Self {
        Self::new(VIEW_WINDOW)
    }
}

impl StreamController {
    pub fn new(window: usize) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            paused: false,
            log: Vec::new(),
            filter_query: String::new(),
            revision: 0,
            signal_names: HashSet::new(),
            cache: ViewCache::new(window),
            stats: IngestStats::default(),
            torn_down: false,
        }
    }

    /// Apply one transport event
    pub fn handle_event(&mut self, event: TransportEvent) {
        if self.torn_down {
            debug!("Ignoring transport event after teardown");
            return;
        }
        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(payload) => self.ingest(Record::parse(&payload)),
            TransportEvent::Binary(payload) => self.ingest(Record::parse_bytes(payload)),
            TransportEvent::Closed => {
                info!("Transport closed");
                self.status = ConnectionStatus::Disconnected;
            }
            TransportEvent::Errored(reason) => {
                warn!(error = %reason, "Transport error");
                self.status = ConnectionStatus::Disconnected;
            }
        }
    }

    /// Apply one user command
    pub fn handle_command(&mut self, command: Command) {
        if self.torn_down {
            debug!(?command, "Ignoring command after teardown");
            return;
        }
        match command {
            Command::Pause => self.paused = true,
            Command::Resume => self.paused = false,
            Command::TogglePause => self.paused = !self.paused,
            Command::Clear => {
                self.log.clear();
                self.signal_names.clear();
                self.revision += 1;
            }
            Command::SetFilter(query) => self.filter_query = query,
        }
    }

    /// Stop accepting input. The status becomes `Disconnected`.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.status = ConnectionStatus::Disconnected;
        info!(
            total = self.log.len(),
            malformed = self.stats.malformed,
            dropped_while_paused = self.stats.dropped_while_paused,
            "Stream controller torn down"
        );
    }

    fn on_open(&mut self) {
        match self.status {
            ConnectionStatus::Connecting => {
                info!("Transport connected");
                self.status = ConnectionStatus::Connected;
            }
            other => warn!(status = other.as_str(), "Unexpected open event ignored"),
        }
    }

    fn ingest(&mut self, parsed: crate::Result<Record>) {
        let record = match parsed {
            Ok(record) => record,
            Err(e) => {
                self.stats.malformed += 1;
                warn!(error = %e, "Failed to parse message");
                return;
            }
        };
        if self.paused {
            self.stats.dropped_while_paused += 1;
            debug!(can_id = record.can_id, signal = %record.signal_name, "Dropped while paused");
            return;
        }
        debug!(can_id = record.can_id, signal = %record.signal_name, value = record.value, "Record");
        if !self.signal_names.contains(&record.signal_name) {
            self.signal_names.insert(record.signal_name.clone());
        }
        self.log.push(record);
        self.revision += 1;
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn log(&self) -> &[Record] {
        &self.log
    }

    pub fn total_message_count(&self) -> usize {
        self.log.len()
    }

    pub fn unique_signal_count(&self) -> usize {
        self.signal_names.len()
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Current filtered, windowed view (memoized)
    pub fn view(&mut self) -> &[Record] {
        self.cache.get(&self.log, self.revision, &self.filter_query)
    }

    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot {
            view: self.view().to_vec(),
            connection_status: self.status,
            paused: self.paused,
            total_message_count: self.log.len(),
            unique_signal_count: self.signal_names.len(),
            filter_query: self.filter_query.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(can_id: u32, name: &str, value: f64, ts: f64) -> TransportEvent {
        TransportEvent::Message(
            serde_json::json!({
                "can_id": can_id,
                "signal_name": name,
                "value": value,
                "timestamp": ts,
            })
            .to_string(),
        )
    }

    #[test]
    fn test_status_transitions() {
        let mut c = StreamController::default();
        assert_eq!(c.status(), ConnectionStatus::Connecting);
        c.handle_event(TransportEvent::Opened);
        assert_eq!(c.status(), ConnectionStatus::Connected);
        c.handle_event(TransportEvent::Closed);
        assert_eq!(c.status(), ConnectionStatus::Disconnected);
        // terminal
        c.handle_event(TransportEvent::Opened);
        assert_eq!(c.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_error_before_open() {
        let mut c = StreamController::default();
        c.handle_event(TransportEvent::Errored("refused".into()));
        assert_eq!(c.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_unique_count_tracks_appends_and_clear() {
        let mut c = StreamController::default();
        c.handle_event(payload(520, "speed", 1.0, 1.0));
        c.handle_event(payload(520, "speed", 2.0, 2.0));
        c.handle_event(payload(521, "rpm", 3.0, 3.0));
        assert_eq!(c.unique_signal_count(), 2);
        assert_eq!(c.unique_signal_count(), crate::view::unique_signal_count(c.log()));

        c.handle_command(Command::Clear);
        assert_eq!(c.unique_signal_count(), 0);
        c.handle_event(payload(521, "rpm", 3.0, 3.0));
        assert_eq!(c.unique_signal_count(), 1);
    }

    #[test]
    fn test_toggle_pause() {
        let mut c = StreamController::default();
        c.handle_command(Command::TogglePause);
        assert!(c.is_paused());
        c.handle_event(payload(1, "a", 0.0, 0.0));
        c.handle_command(Command::TogglePause);
        assert!(!c.is_paused());
        c.handle_event(payload(2, "b", 0.0, 0.0));
        assert_eq!(c.total_message_count(), 1);
        assert_eq!(c.stats().dropped_while_paused, 1);
    }

    #[test]
    fn test_malformed_is_counted() {
        let mut c = StreamController::default();
        c.handle_event(TransportEvent::Message("{".into()));
        c.handle_event(TransportEvent::Binary(vec![0xc3, 0x28]));
        assert_eq!(c.stats().malformed, 2);
        assert!(c.log().is_empty());
    }

    #[test]
    fn test_view_follows_filter_changes() {
        let mut c = StreamController::default();
        c.handle_event(payload(520, "speed", 42.0, 1000.0));
        c.handle_event(payload(521, "rpm", 3000.0, 1001.0));
        assert_eq!(c.view().len(), 2);
        c.handle_command(Command::SetFilter("rpm".into()));
        assert_eq!(c.view()[0].signal_name, "rpm");
        assert_eq!(c.view().len(), 1);
        c.handle_command(Command::SetFilter(String::new()));
        assert_eq!(c.view().len(), 2);
    }
}
