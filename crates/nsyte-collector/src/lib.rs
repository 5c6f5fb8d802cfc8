//! Thread-safe Progress/Message Collector (spec 4.I).
//!
//! The collector is renderer-independent: every producer across the
//! pipeline (scanner, diff engine, uploader, prober, relay publisher,
//! deletion orchestrator) records messages here through a shared handle,
//! and any number of consumers — a terminal progress bar, a JSONL run
//! log, a test assertion — pull a snapshot whenever they like. Nothing in
//! this crate renders anything; see `nsyte-progress` for the
//! `indicatif`-based terminal renderer built on top of this crate's
//! snapshot API.
//!
//! Built as an append-only JSONL log split into two responsibilities: an
//! in-memory duplicate-count merge (so a flaky relay that times out 50
//! times in a retry loop doesn't flood the report with 50 identical
//! lines) and grouped summary queries by relay/server/file/event.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default run-log file name.
pub const COLLECTOR_LOG_FILE: &str = "run.jsonl";

/// Return the run-log path within a state directory.
pub fn collector_log_path(state_dir: &Path) -> PathBuf {
    state_dir.join(COLLECTOR_LOG_FILE)
}

/// Severity of a collected message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageKind {
    Info,
    Warn,
    Error,
}

/// The dimension a message is grouped under for summary queries
/// (spec 4.I: "grouped summary queries by relay/server/file/event").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Relay,
    Server,
    File,
    Event,
    General,
}

/// One collected message: what happened, about what, at what severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    pub category: Category,
    /// The relay URL, server URL, file path, or event id this message is
    /// about.
    pub target: String,
    pub content: String,
    /// How many times an identical `(kind, category, target, content)`
    /// message was recorded; merged in-place rather than duplicated.
    pub occurrences: u32,
}

impl Message {
    fn matches(&self, kind: MessageKind, category: Category, target: &str, content: &str) -> bool {
        self.kind == kind && self.category == category && self.target == target && self.content == content
    }
}

/// Thread-safe message aggregator. Cloneable handles share the same
/// underlying store via `Arc`-free interior mutability — callers hold a
/// `&Collector` (typically behind their own `Arc`) across threads.
#[derive(Debug, Default)]
pub struct Collector {
    messages: Mutex<Vec<Message>>,
}

/// Narrow, synchronous reporting surface for immediate human-facing
/// output. Takes `&self` rather than `&mut self`: every nsyte implementor
/// (the [`Collector`] itself, and `nsyte-cli`'s stderr reporter) is
/// internally synchronized, so the trait no longer needs exclusive
/// access to stay `Send` across the worker pool.
pub trait Reporter {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

impl Reporter for Collector {
    fn info(&self, msg: &str) {
        Collector::info(self, Category::General, "", msg);
    }

    fn warn(&self, msg: &str) {
        Collector::warn(self, Category::General, "", msg);
    }

    fn error(&self, msg: &str) {
        Collector::error(self, Category::General, "", msg);
    }
}

impl Collector {
    pub fn new() -> Self {
        Self { messages: Mutex::new(Vec::new()) }
    }

    /// Record a message, merging into an existing entry with the same
    /// `(kind, category, target, content)` by incrementing its
    /// occurrence count instead of appending a duplicate.
    pub fn record(&self, kind: MessageKind, category: Category, target: impl Into<String>, content: impl Into<String>) {
        let target = target.into();
        let content = content.into();
        let mut messages = self.messages.lock().expect("collector lock poisoned");

        if let Some(existing) = messages.iter_mut().find(|m| m.matches(kind, category, &target, &content)) {
            existing.occurrences += 1;
            return;
        }

        messages.push(Message {
            timestamp: Utc::now(),
            kind,
            category,
            target,
            content,
            occurrences: 1,
        });
    }

    pub fn info(&self, category: Category, target: impl Into<String>, content: impl Into<String>) {
        self.record(MessageKind::Info, category, target, content);
    }

    pub fn warn(&self, category: Category, target: impl Into<String>, content: impl Into<String>) {
        self.record(MessageKind::Warn, category, target, content);
    }

    pub fn error(&self, category: Category, target: impl Into<String>, content: impl Into<String>) {
        self.record(MessageKind::Error, category, target, content);
    }

    /// Pull-based snapshot of every message recorded so far, in
    /// insertion order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().expect("collector lock poisoned").clone()
    }

    /// Messages about a specific target (relay URL, server URL, file
    /// path, or event id).
    pub fn for_target(&self, target: &str) -> Vec<Message> {
        self.messages
            .lock()
            .expect("collector lock poisoned")
            .iter()
            .filter(|m| m.target == target)
            .cloned()
            .collect()
    }

    /// Count of messages per category, accounting for merged
    /// occurrences.
    pub fn counts_by_category(&self) -> BTreeMap<Category, u32> {
        let messages = self.messages.lock().expect("collector lock poisoned");
        let mut counts = BTreeMap::new();
        for message in messages.iter() {
            *counts.entry(message.category).or_insert(0) += message.occurrences;
        }
        counts
    }

    /// Count of error-kind messages, accounting for merged occurrences.
    pub fn error_count(&self) -> u32 {
        self.messages
            .lock()
            .expect("collector lock poisoned")
            .iter()
            .filter(|m| m.kind == MessageKind::Error)
            .map(|m| m.occurrences)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().expect("collector lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append the current snapshot to a JSONL run log.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create run log dir {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open run log {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);

        for message in self.snapshot() {
            let line = serde_json::to_string(&message).context("failed to serialize message to JSON")?;
            writeln!(writer, "{line}").context("failed to write run log line")?;
        }

        writer.flush().context("failed to flush run log")?;
        Ok(())
    }

    /// Load messages previously written by [`Collector::write_to_file`]
    /// into a fresh collector.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let file = File::open(path)
            .with_context(|| format!("failed to open run log {}", path.display()))?;
        let reader = BufReader::new(file);
        let mut messages = Vec::new();

        for line in reader.lines() {
            let line = line.with_context(|| format!("failed to read line from {}", path.display()))?;
            let message: Message = serde_json::from_str(&line)
                .with_context(|| format!("failed to parse run log line: {line}"))?;
            messages.push(message);
        }

        Ok(Self { messages: Mutex::new(messages) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn identical_messages_merge_into_one_with_incremented_count() {
        let collector = Collector::new();
        collector.warn(Category::Relay, "wss://r1", "timeout");
        collector.warn(Category::Relay, "wss://r1", "timeout");
        collector.warn(Category::Relay, "wss://r1", "timeout");

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].occurrences, 3);
    }

    #[test]
    fn distinct_targets_do_not_merge() {
        let collector = Collector::new();
        collector.warn(Category::Relay, "wss://r1", "timeout");
        collector.warn(Category::Relay, "wss://r2", "timeout");
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn counts_by_category_accounts_for_merged_occurrences() {
        let collector = Collector::new();
        collector.info(Category::File, "/a.txt", "uploaded");
        collector.info(Category::File, "/a.txt", "uploaded");
        collector.info(Category::Server, "https://s1", "probed");

        let counts = collector.counts_by_category();
        assert_eq!(counts[&Category::File], 2);
        assert_eq!(counts[&Category::Server], 1);
    }

    #[test]
    fn error_count_sums_occurrences_not_distinct_messages() {
        let collector = Collector::new();
        collector.error(Category::Server, "https://s1", "503");
        collector.error(Category::Server, "https://s1", "503");
        collector.error(Category::Event, "abcd", "rejected");
        assert_eq!(collector.error_count(), 3);
    }

    #[test]
    fn for_target_filters_across_categories() {
        let collector = Collector::new();
        collector.info(Category::File, "/a.txt", "scanned");
        collector.warn(Category::File, "/a.txt", "large file");
        collector.info(Category::File, "/b.txt", "scanned");

        let for_a = collector.for_target("/a.txt");
        assert_eq!(for_a.len(), 2);
    }

    #[test]
    fn write_then_read_round_trips_through_jsonl() {
        let dir = tempdir().expect("tempdir");
        let path = collector_log_path(dir.path());

        let collector = Collector::new();
        collector.info(Category::File, "/a.txt", "uploaded");
        collector.error(Category::Server, "https://s1", "timeout");
        collector.write_to_file(&path).expect("write");

        let loaded = Collector::read_from_file(&path).expect("read");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.error_count(), 1);
    }

    #[test]
    fn read_from_file_returns_empty_collector_when_missing() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("missing.jsonl");
        let loaded = Collector::read_from_file(&path).expect("read");
        assert!(loaded.is_empty());
    }
}
