use time::OffsetDateTime;

pub const NOTHING_PLAYED: &str = "Nothing has been played yet.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub stamp: String,
    pub description: String,
}

/// Pieces started this session, keyed by `HH:MM:SS`.
///
/// Keys have one-second granularity: a second piece starting within the same
/// second overwrites the first entry's description and keeps its position.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, description: &str) {
        self.record_at(local_stamp(), description);
    }

    pub fn record_at(&mut self, stamp: String, description: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.stamp == stamp) {
            entry.description = description.to_string();
            return;
        }
        self.entries.push(HistoryEntry {
            stamp,
            description: description.to_string(),
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return NOTHING_PLAYED.to_string();
        }
        self.entries
            .iter()
            .map(|entry| format!("[{}] {}\n", entry.stamp, entry.description))
            .collect()
    }
}

pub fn local_stamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
}
