//! Food log: local CSV append plus an optional webhook mirror

use crate::cloud::client::{encode_query_value, HttpFetch, SpaceEncoding};
use crate::error::StorageError;
use crate::types::LogEntry;
use log::{info, warn};
use std::io::Read;

/// Append-only text store holding the CSV log.
pub trait LogStore {
    type Reader: Read + 'static;

    /// Append one line, creating the store if it does not exist yet.
    fn append(&mut self, line: &str) -> Result<(), StorageError>;
    /// Reader over the current contents and their length, `None` if nothing
    /// has been written yet.
    fn open(&self) -> Result<Option<LogContents<Self::Reader>>, StorageError>;
}

pub struct LogContents<R> {
    pub reader: R,
    pub len: u64,
}

pub struct LogSink<S> {
    store: S,
    webhook_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordReport {
    pub stored: bool,
    /// `None` when no webhook is configured.
    pub mirrored: Option<bool>,
}

impl<S: LogStore> LogSink<S> {
    pub fn new(store: S, webhook_url: Option<String>) -> Self {
        Self { store, webhook_url }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Both side effects are attempted independently; failures are logged
    /// and reported, never propagated.
    pub fn record(&mut self, entry: &LogEntry, fetcher: &mut impl HttpFetch) -> RecordReport {
        let stored = match self.store.append(&entry.csv_line()) {
            Ok(()) => {
                info!("💾 Saved to CSV: {} {}g {} kcal", entry.food_name, entry.weight_g, entry.calories);
                true
            }
            Err(e) => {
                warn!("⚠️ CSV write failed: {}", e);
                false
            }
        };

        let mirrored = self
            .webhook_url
            .as_deref()
            .map(|base| Self::mirror(base, entry, fetcher));

        RecordReport { stored, mirrored }
    }

    fn mirror(base: &str, entry: &LogEntry, fetcher: &mut impl HttpFetch) -> bool {
        let url = webhook_url(base, entry);
        info!("☁️ Sending to cloud...");
        // Response body is irrelevant; only transport success is reported.
        match fetcher.get(&url, &[]) {
            Ok(reply) => {
                info!("☁️ Cloud upload done (HTTP {})", reply.status);
                true
            }
            Err(e) => {
                warn!("⚠️ Cloud upload failed: {}", e);
                false
            }
        }
    }
}

pub fn webhook_url(base: &str, entry: &LogEntry) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}date={}&food={}&weight={}&calories={}",
        base,
        separator,
        encode_query_value(&entry.timestamp, SpaceEncoding::Percent),
        encode_query_value(&entry.food_name, SpaceEncoding::Percent),
        entry.weight_g,
        entry.calories
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cloud::client::HttpReply;
    use crate::error::LookupError;

    /// In-memory store shared with the router and controller tests.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub contents: Option<String>,
        pub fail_writes: bool,
    }

    impl LogStore for MemoryStore {
        type Reader = std::io::Cursor<Vec<u8>>;

        fn append(&mut self, line: &str) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Io("disk full".to_string()));
            }
            self.contents.get_or_insert_with(String::new).push_str(line);
            Ok(())
        }

        fn open(&self) -> Result<Option<LogContents<Self::Reader>>, StorageError> {
            Ok(self.contents.clone().map(|text| LogContents {
                len: text.len() as u64,
                reader: std::io::Cursor::new(text.into_bytes()),
            }))
        }
    }

    #[derive(Default)]
    struct RecordingFetch {
        urls: Vec<String>,
        fail: bool,
    }

    impl HttpFetch for RecordingFetch {
        fn get(&mut self, url: &str, _headers: &[(&str, &str)]) -> Result<HttpReply, LookupError> {
            self.urls.push(url.to_string());
            if self.fail {
                return Err(LookupError::Transport("unreachable".to_string()));
            }
            Ok(HttpReply {
                status: 200,
                body: "Accepted".to_string(),
            })
        }
    }

    fn entry() -> LogEntry {
        LogEntry {
            timestamp: "2024-03-01 12:30".to_string(),
            food_name: "Apple pie".to_string(),
            weight_g: 120,
            calories: 287,
        }
    }

    #[test]
    fn appends_line_and_mirrors() {
        let mut sink = LogSink::new(
            MemoryStore::default(),
            Some("https://hook.example.com/abc".to_string()),
        );
        let mut fetch = RecordingFetch::default();

        let report = sink.record(&entry(), &mut fetch);

        assert_eq!(report, RecordReport { stored: true, mirrored: Some(true) });
        assert_eq!(
            sink.store().contents.as_deref(),
            Some("2024-03-01 12:30,Apple pie,120,287\n")
        );
        assert_eq!(
            fetch.urls,
            vec!["https://hook.example.com/abc?date=2024-03-01%2012%3A30&food=Apple%20pie&weight=120&calories=287"]
        );
    }

    #[test]
    fn no_webhook_configured_skips_mirror() {
        let mut sink = LogSink::new(MemoryStore::default(), None);
        let mut fetch = RecordingFetch::default();

        let report = sink.record(&entry(), &mut fetch);

        assert_eq!(report.mirrored, None);
        assert!(fetch.urls.is_empty());
    }

    #[test]
    fn write_failure_still_mirrors() {
        let store = MemoryStore {
            fail_writes: true,
            ..Default::default()
        };
        let mut sink = LogSink::new(store, Some("https://hook.example.com/abc".to_string()));
        let mut fetch = RecordingFetch::default();

        let report = sink.record(&entry(), &mut fetch);

        assert_eq!(report, RecordReport { stored: false, mirrored: Some(true) });
        assert_eq!(fetch.urls.len(), 1);
    }

    #[test]
    fn mirror_failure_keeps_local_line() {
        let mut sink = LogSink::new(
            MemoryStore::default(),
            Some("https://hook.example.com/abc?src=scale".to_string()),
        );
        let mut fetch = RecordingFetch {
            fail: true,
            ..Default::default()
        };

        let report = sink.record(&entry(), &mut fetch);

        assert_eq!(report, RecordReport { stored: true, mirrored: Some(false) });
        assert!(sink.store().contents.is_some());
        assert!(fetch.urls[0].starts_with("https://hook.example.com/abc?src=scale&date="));
    }
}
