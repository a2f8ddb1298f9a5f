// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk spool broker for `file://` URIs
//!
//! Layout under the spool root:
//! ```text
//! queues/<queue>/<nanos>-<uuid>.msg   one file per pending payload
//! topics/<topic>/<generation>.jsonl  append-only, one JSON string per line
//! sets/<set>/<key>.json               latest payload per key
//! ```
//! Receivers claim a message by deleting it, so competing consumers on the
//! same spool never see the same payload twice. Subscribers tail the topic
//! file from its length at subscription time. Once a topic file passes its
//! size limit the next publish starts a new generation; the one before it is
//! kept so subscribers can finish it, older ones are deleted.

use super::{Broker, BrokerError, QueueReceiver, Subscription};
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc;

const MESSAGE_EXT: &str = "msg";
const SET_EXT: &str = "json";
const TOPIC_EXT: &str = "jsonl";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_TOPIC_LIMIT: u64 = 4 * 1024 * 1024;

/// Broker backed by a shared directory
#[derive(Debug, Clone)]
pub struct SpoolBroker {
    root: PathBuf,
    poll_interval: Duration,
    topic_limit: u64,
}

impl SpoolBroker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            topic_limit: DEFAULT_TOPIC_LIMIT,
        }
    }

    /// Parse a `file:///path/to/spool` URI.
    pub fn from_uri(uri: &str) -> Result<Self, BrokerError> {
        match uri.strip_prefix("file://") {
            Some(path) if !path.is_empty() => Ok(Self::new(path)),
            _ => Err(BrokerError::InvalidUri(uri.to_string())),
        }
    }

    /// How often receivers and subscribers re-scan the spool
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Size in bytes at which a topic starts a new generation
    pub fn with_topic_limit(mut self, bytes: u64) -> Self {
        self.topic_limit = bytes.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The spool root must exist; a missing directory means the broker is gone.
    async fn ensure_root(&self) -> Result<(), BrokerError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(BrokerError::Unreachable(format!(
                "spool directory {} is missing",
                self.root.display()
            ))),
        }
    }

    fn queue_dir(&self, queue: &str) -> PathBuf {
        self.root.join("queues").join(file_name(queue))
    }

    fn topic_dir(&self, topic: &str) -> PathBuf {
        self.root.join("topics").join(file_name(topic))
    }

    fn set_dir(&self, set: &str) -> PathBuf {
        self.root.join("sets").join(file_name(set))
    }

    /// Keep the generation before `current` for lagging subscribers, drop older ones.
    async fn prune_generations(&self, dir: &Path, current: u64) -> Result<(), BrokerError> {
        for generation in generations(dir).await? {
            if generation + 1 >= current {
                break;
            }
            match tokio::fs::remove_file(generation_file(dir, generation)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Map a destination or key name onto a file name.
///
/// Percent-encoding keeps distinct names distinct. A leading dot is encoded
/// too so no name maps onto `.`, `..` or a hidden temp file.
fn file_name(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let encoded = urlencoding::encode(name);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}"),
        None => encoded.into_owned(),
    }
}

fn message_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{nanos:020}-{}.{MESSAGE_EXT}", uuid::Uuid::new_v4())
}

/// Write `contents` next to `target` and atomically move it into place.
async fn write_atomic(target: &Path, contents: &str) -> Result<(), BrokerError> {
    let dir = target.parent().unwrap_or(Path::new("."));
    let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, target).await?;
    Ok(())
}

/// Files with extension `ext` in `dir`, missing directory reads as empty.
async fn files_with_ext(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, BrokerError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn remove_dir_if_present(dir: &Path) -> Result<(), BrokerError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Receive handle on one spool queue
pub struct SpoolReceiver {
    broker: SpoolBroker,
    queue: String,
    closed: bool,
}

impl SpoolReceiver {
    async fn claim_next(&self) -> Result<Option<String>, BrokerError> {
        self.broker.ensure_root().await?;
        let dir = self.broker.queue_dir(&self.queue);
        for path in files_with_ext(&dir, MESSAGE_EXT).await? {
            let payload = match tokio::fs::read_to_string(&path).await {
                Ok(payload) => payload,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            // Removing the file is the claim. No await between it and the
            // return, so a receive dropped mid-way never loses a message.
            match std::fs::remove_file(&path) {
                Ok(()) => return Ok(Some(payload)),
                // Another receiver got there first
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl QueueReceiver for SpoolReceiver {
    async fn receive(&mut self, timeout: Duration) -> Result<Option<String>, BrokerError> {
        if self.closed {
            return Err(BrokerError::Closed);
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(payload) = self.claim_next().await? {
                return Ok(Some(payload));
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.broker.poll_interval.min(deadline - now)).await;
        }
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

fn generation_file(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("{generation:020}.{TOPIC_EXT}"))
}

/// Generations present in a topic directory, oldest first.
async fn generations(dir: &Path) -> Result<Vec<u64>, BrokerError> {
    Ok(files_with_ext(dir, TOPIC_EXT)
        .await?
        .iter()
        .filter_map(|path| path.file_stem()?.to_str()?.parse().ok())
        .collect())
}

/// Bytes of `file` from `offset` to its end. A missing file reads as empty.
async fn read_from(file: &Path, offset: u64) -> std::io::Result<Vec<u8>> {
    let mut handle = match tokio::fs::File::open(file).await {
        Ok(handle) => handle,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    handle.seek(SeekFrom::Start(offset)).await?;
    let mut bytes = Vec::new();
    handle.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

/// Send every complete line in `bytes`. Returns the bytes consumed, or
/// `None` once the subscription has been dropped.
fn deliver(topic: &str, bytes: &[u8], tx: &mpsc::UnboundedSender<String>) -> Option<u64> {
    // Only consume complete lines; a writer may be mid-append.
    let Some(end) = bytes.iter().rposition(|b| *b == b'\n') else {
        return Some(0);
    };
    let chunk = &bytes[..=end];
    for line in String::from_utf8_lossy(chunk).lines() {
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<String>(line) {
            Ok(payload) => tx.send(payload).ok()?,
            Err(e) => tracing::warn!(topic, error = %e, "skipping corrupt topic record"),
        }
    }
    Some(chunk.len() as u64)
}

/// Follows one topic across generations
struct TopicTail {
    topic: String,
    dir: PathBuf,
    generation: u64,
    offset: u64,
    tx: mpsc::UnboundedSender<String>,
}

impl TopicTail {
    /// Deliver what has been appended to the current generation.
    async fn read(&mut self) -> Option<()> {
        match read_from(&generation_file(&self.dir, self.generation), self.offset).await {
            Ok(bytes) => self.offset += deliver(&self.topic, &bytes, &self.tx)?,
            Err(e) => tracing::debug!(topic = %self.topic, error = %e, "topic read failed, retrying"),
        }
        Some(())
    }

    /// Move to the next generation once the publisher has.
    async fn advance(&mut self) -> Option<()> {
        let next = match generations(&self.dir).await {
            Ok(gens) => gens.into_iter().find(|g| *g > self.generation),
            Err(e) => {
                tracing::debug!(topic = %self.topic, error = %e, "topic scan failed, retrying");
                None
            }
        };
        let Some(next) = next else {
            return Some(());
        };
        // Nothing is appended to a generation once a newer one exists
        self.read().await?;
        if next > self.generation + 1 {
            tracing::warn!(topic = %self.topic, "subscriber fell behind, records skipped");
        }
        self.generation = next;
        self.offset = 0;
        Some(())
    }

    async fn run(mut self, poll_interval: Duration) {
        while !self.tx.is_closed() {
            if self.read().await.is_none() || self.advance().await.is_none() {
                return;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[async_trait]
impl Broker for SpoolBroker {
    type Receiver = SpoolReceiver;

    async fn open_receiver(&self, queue: &str) -> Result<SpoolReceiver, BrokerError> {
        self.ensure_root().await?;
        Ok(SpoolReceiver {
            broker: self.clone(),
            queue: queue.to_string(),
            closed: false,
        })
    }

    async fn submit(&self, queue: &str, payload: String) -> Result<(), BrokerError> {
        self.ensure_root().await?;
        let dir = self.queue_dir(queue);
        tokio::fs::create_dir_all(&dir).await?;
        write_atomic(&dir.join(message_name()), &payload).await
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), BrokerError> {
        self.ensure_root().await?;
        let dir = self.topic_dir(topic);
        tokio::fs::create_dir_all(&dir).await?;
        let mut line = serde_json::Value::String(payload).to_string();
        line.push('\n');

        let mut generation = generations(&dir).await?.last().copied().unwrap_or(0);
        let current = generation_file(&dir, generation);
        match tokio::fs::metadata(&current).await {
            Ok(meta) if meta.len() > 0 && meta.len() + line.len() as u64 > self.topic_limit => {
                generation += 1;
                self.prune_generations(&dir, generation).await?;
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(generation_file(&dir, generation))
            .await?;
        handle.write_all(line.as_bytes()).await?;
        handle.flush().await?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError> {
        self.ensure_root().await?;
        let dir = self.topic_dir(topic);
        let generation = generations(&dir).await?.last().copied().unwrap_or(0);
        let offset = match tokio::fs::metadata(generation_file(&dir, generation)).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let tail = TopicTail {
            topic: topic.to_string(),
            dir,
            generation,
            offset,
            tx,
        };
        tokio::spawn(tail.run(self.poll_interval));
        Ok(Subscription::new(topic, rx))
    }

    async fn upsert(&self, set: &str, key: &str, payload: String) -> Result<(), BrokerError> {
        self.ensure_root().await?;
        let dir = self.set_dir(set);
        tokio::fs::create_dir_all(&dir).await?;
        write_atomic(&dir.join(format!("{}.{SET_EXT}", file_name(key))), &payload).await
    }

    /// Entries ordered by last update.
    async fn set_entries(&self, set: &str) -> Result<Vec<String>, BrokerError> {
        self.ensure_root().await?;
        let mut stamped = Vec::new();
        for path in files_with_ext(&self.set_dir(set), SET_EXT).await? {
            let modified = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta.modified().unwrap_or(UNIX_EPOCH),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            stamped.push((modified, path));
        }
        stamped.sort();

        let mut entries = Vec::with_capacity(stamped.len());
        for (_, path) in stamped {
            match tokio::fs::read_to_string(&path).await {
                Ok(payload) => entries.push(payload),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(entries)
    }

    async fn queue_entries(&self, queue: &str) -> Result<Vec<String>, BrokerError> {
        self.ensure_root().await?;
        let mut entries = Vec::new();
        for path in files_with_ext(&self.queue_dir(queue), MESSAGE_EXT).await? {
            match tokio::fs::read_to_string(&path).await {
                Ok(payload) => entries.push(payload),
                // Claimed while browsing
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(entries)
    }

    async fn clear(&self, name: &str) -> Result<(), BrokerError> {
        self.ensure_root().await?;
        remove_dir_if_present(&self.queue_dir(name)).await?;
        remove_dir_if_present(&self.set_dir(name)).await
    }
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
