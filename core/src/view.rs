//! View computation over the record log.
//!
//! Everything here is a pure function of `(log, filter query, window)`.
//! [`ViewCache`] memoizes the result keyed on the log revision and the query.

use std::collections::HashSet;

use crate::record::Record;

/// Maximum number of records handed to the display
pub const VIEW_WINDOW: usize = 200;

/// Whether `record` passes the filter.
///
/// `query` must already be trimmed; an empty query matches everything.
/// Signal names match case-insensitively, CAN ids match on their decimal digits.
pub fn matches(record: &Record, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    record.signal_name.to_lowercase().contains(&needle)
        || record.can_id.to_string().contains(query)
}

/// Filtered, windowed, most-recent-first view of `log`
pub fn compute_view(log: &[Record], query: &str, window: usize) -> Vec<Record> {
    let query = query.trim();
    // Walking backwards yields the most recent matches first and stops at the window
    log.iter()
        .rev()
        .filter(|record| matches(record, query))
        .take(window)
        .cloned()
        .collect()
}

/// Number of distinct signal names across the whole log
pub fn unique_signal_count(log: &[Record]) -> usize {
    log.iter()
        .map(|record| record.signal_name.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Memoized view keyed on `(log revision, query)`
#[derive(Debug)]
pub struct ViewCache {
    window: usize,
    key: Option<(u64, String)>,
    view: Vec<Record>,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new(VIEW_WINDOW)
    }
}

impl ViewCache {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            key: None,
            view: Vec::new(),
        }
    }

    /// Return the view for `log` at `revision`, recomputing only when the key changed
    pub fn get(&mut self, log: &[Record], revision: u64, query: &str) -> &[Record] {
        let fresh = matches!(&self.key, Some((rev, q)) if *rev == revision && q == query);
        if !fresh {
            self.view = compute_view(log, query, self.window);
            self.key = Some((revision, query.to_string()));
        }
        &self.view
    }
}
