//! Input queues the pipeline drains.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::config::IntakeConfig;
use crate::error::{QuarryError, Result};

/// How long a [`FileTopic`] waits between checks of an idle topic.
const IDLE_BACKOFF: Duration = Duration::from_millis(20);

/// Source of raw queue messages.
///
/// Delivery is at-least-once: messages returned by [`poll`] are only
/// acknowledged by [`commit`], and may be redelivered if the commit never
/// happens.
///
/// [`poll`]: MessageQueue::poll
/// [`commit`]: MessageQueue::commit
pub trait MessageQueue: Send {
    /// Wait at most `timeout` for the next message.
    ///
    /// `Ok(None)` means nothing arrived in time.
    fn poll(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>>;

    /// Acknowledge every message returned so far.
    fn commit(&mut self) -> Result<()>;

    /// Queue name for logging.
    fn name(&self) -> &str;
}

enum Delivery {
    Message(Vec<u8>),
    Failure(String),
}

/// In-process queue, for tests and embedding.
///
/// Failures can be scripted with [`MemoryQueue::push_failure`] to
/// exercise error handling in consumers.
#[derive(Default)]
pub struct MemoryQueue {
    pending: VecDeque<Delivery>,
    delivered: usize,
    committed: usize,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue raw message bytes.
    pub fn push(&mut self, message: impl Into<Vec<u8>>) {
        self.pending.push_back(Delivery::Message(message.into()));
    }

    /// Enqueue a value serialized as JSON.
    pub fn push_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(serde_json::to_vec(value)?);
        Ok(())
    }

    /// Make the next poll at this position fail with `message`.
    pub fn push_failure(&mut self, message: impl Into<String>) {
        self.pending.push_back(Delivery::Failure(message.into()));
    }

    /// Messages not yet delivered.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Messages acknowledged by the last commit.
    pub fn committed(&self) -> usize {
        self.committed
    }
}

impl MessageQueue for MemoryQueue {
    fn poll(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.pending.pop_front() {
            Some(Delivery::Message(bytes)) => {
                self.delivered += 1;
                Ok(Some(bytes))
            }
            Some(Delivery::Failure(message)) => Err(QuarryError::Queue(message)),
            None => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn commit(&mut self) -> Result<()> {
        self.committed = self.delivered;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryQueue")
            .field("pending", &self.pending.len())
            .field("delivered", &self.delivered)
            .field("committed", &self.committed)
            .finish()
    }
}

/// A durable topic backed by a local append-only file.
///
/// Producers append one message per line to `<queue_dir>/<topic>.jsonl`.
/// Each consumer group tracks its byte offset in
/// `<queue_dir>/<topic>.<group>.offset`; a group without an offset file
/// starts from the beginning of the topic. A trailing line without its
/// newline is still being written and is left for a later poll.
#[derive(Debug)]
pub struct FileTopic {
    name: String,
    topic_path: PathBuf,
    offset_path: PathBuf,
    reader: Option<BufReader<File>>,
    position: u64,
    committed: u64,
}

impl FileTopic {
    /// Open `topic` for consumer `group`, creating `queue_dir` if needed.
    pub fn open(queue_dir: impl AsRef<Path>, topic: &str, group: &str) -> Result<Self> {
        let queue_dir = queue_dir.as_ref();
        if topic.is_empty() || topic.contains(['/', '\\']) {
            return Err(QuarryError::Config(format!("invalid topic name '{}'", topic)));
        }
        if group.is_empty() || group.contains(['/', '\\']) {
            return Err(QuarryError::Config(format!("invalid consumer group '{}'", group)));
        }
        fs::create_dir_all(queue_dir).map_err(|e| QuarryError::io(queue_dir, e))?;

        let topic_path = queue_dir.join(format!("{}.jsonl", topic));
        let offset_path = queue_dir.join(format!("{}.{}.offset", topic, group));
        let committed = read_offset(&offset_path)?;

        Ok(Self {
            name: format!("{}/{}", topic, group),
            topic_path,
            offset_path,
            reader: None,
            position: committed,
            committed,
        })
    }

    /// Open the topic named in an intake configuration.
    pub fn from_config(config: &IntakeConfig) -> Result<Self> {
        Self::open(&config.queue_dir, &config.topic, &config.group)
    }

    /// Path of the topic log.
    pub fn topic_path(&self) -> &Path {
        &self.topic_path
    }

    /// Byte offset of the next message to deliver.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Byte offset persisted by the last commit.
    pub fn committed_offset(&self) -> u64 {
        self.committed
    }

    /// Append one message to the topic.
    pub fn publish(&self, payload: &[u8]) -> Result<()> {
        if payload.contains(&b'\n') {
            return Err(QuarryError::Queue(
                "message must not contain a newline".to_string(),
            ));
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.topic_path)
            .map_err(|e| QuarryError::io(&self.topic_path, e))?;
        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload);
        line.push(b'\n');
        file.write_all(&line)
            .map_err(|e| QuarryError::io(&self.topic_path, e))
    }

    /// Append a value serialized as compact JSON.
    pub fn publish_json<T: Serialize>(&self, value: &T) -> Result<()> {
        self.publish(&serde_json::to_vec(value)?)
    }

    /// Read the next complete, non-blank line, if one is available.
    fn try_read_line(&mut self) -> Result<Option<Vec<u8>>> {
        if self.reader.is_none() {
            let mut file = match File::open(&self.topic_path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(QuarryError::io(&self.topic_path, e)),
            };
            file.seek(SeekFrom::Start(self.position))
                .map_err(|e| QuarryError::io(&self.topic_path, e))?;
            self.reader = Some(BufReader::new(file));
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        loop {
            let mut line = Vec::new();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| QuarryError::io(&self.topic_path, e))?;
            if read == 0 {
                return Ok(None);
            }
            if line.last() != Some(&b'\n') {
                // Producer is mid-write; rewind so the line is re-read whole.
                reader
                    .seek(SeekFrom::Start(self.position))
                    .map_err(|e| QuarryError::io(&self.topic_path, e))?;
                return Ok(None);
            }

            self.position += read as u64;
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(line));
        }
    }
}

impl MessageQueue for FileTopic {
    fn poll(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.try_read_line()? {
                return Ok(Some(message));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(IDLE_BACKOFF.min(deadline - now));
        }
    }

    fn commit(&mut self) -> Result<()> {
        if self.position == self.committed && self.offset_path.exists() {
            return Ok(());
        }
        let staging = self.offset_path.with_extension("offset.tmp");
        fs::write(&staging, self.position.to_string())
            .map_err(|e| QuarryError::io(&staging, e))?;
        fs::rename(&staging, &self.offset_path)
            .map_err(|e| QuarryError::io(&self.offset_path, e))?;
        debug!(topic = %self.name, offset = self.position, "offset committed");
        self.committed = self.position;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn read_offset(path: &Path) -> Result<u64> {
    match fs::read_to_string(path) {
        Ok(contents) => contents.trim().parse().map_err(|_| {
            QuarryError::Queue(format!(
                "corrupt offset file '{}': {:?}",
                path.display(),
                contents.trim()
            ))
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(QuarryError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const NO_WAIT: Duration = Duration::from_millis(0);

    #[test]
    fn test_memory_queue_delivers_in_order() {
        let mut queue = MemoryQueue::new();
        queue.push("a");
        queue.push_failure("broker hiccup");
        queue.push_json(&json!({"text": "b"})).unwrap();

        assert_eq!(queue.poll(NO_WAIT).unwrap(), Some(b"a".to_vec()));
        assert!(queue.poll(NO_WAIT).is_err());
        assert_eq!(queue.poll(NO_WAIT).unwrap(), Some(br#"{"text":"b"}"#.to_vec()));
        assert_eq!(queue.poll(NO_WAIT).unwrap(), None);

        queue.commit().unwrap();
        assert_eq!(queue.committed(), 2);
    }

    #[test]
    fn test_file_topic_missing_topic_is_idle() {
        let dir = TempDir::new().unwrap();
        let mut topic = FileTopic::open(dir.path(), "raw_text", "dq").unwrap();
        assert_eq!(topic.poll(NO_WAIT).unwrap(), None);
    }

    #[test]
    fn test_file_topic_resumes_from_committed_offset() {
        let dir = TempDir::new().unwrap();
        let mut topic = FileTopic::open(dir.path(), "raw_text", "dq").unwrap();
        topic.publish(b"one").unwrap();
        topic.publish(b"two").unwrap();

        assert_eq!(topic.poll(NO_WAIT).unwrap(), Some(b"one".to_vec()));
        topic.commit().unwrap();
        assert_eq!(topic.committed_offset(), 4);

        let mut reopened = FileTopic::open(dir.path(), "raw_text", "dq").unwrap();
        assert_eq!(reopened.poll(NO_WAIT).unwrap(), Some(b"two".to_vec()));
        assert_eq!(reopened.poll(NO_WAIT).unwrap(), None);
    }

    #[test]
    fn test_file_topic_uncommitted_messages_are_redelivered() {
        let dir = TempDir::new().unwrap();
        let mut topic = FileTopic::open(dir.path(), "raw_text", "dq").unwrap();
        topic.publish(b"one").unwrap();
        assert_eq!(topic.poll(NO_WAIT).unwrap(), Some(b"one".to_vec()));
        drop(topic);

        let mut reopened = FileTopic::open(dir.path(), "raw_text", "dq").unwrap();
        assert_eq!(reopened.poll(NO_WAIT).unwrap(), Some(b"one".to_vec()));
    }

    #[test]
    fn test_file_topic_groups_are_independent() {
        let dir = TempDir::new().unwrap();
        let mut first = FileTopic::open(dir.path(), "raw_text", "dq").unwrap();
        first.publish(b"hello").unwrap();
        first.poll(NO_WAIT).unwrap();
        first.commit().unwrap();

        let mut other = FileTopic::open(dir.path(), "raw_text", "audit").unwrap();
        assert_eq!(other.poll(NO_WAIT).unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_file_topic_waits_for_partial_line() {
        let dir = TempDir::new().unwrap();
        let mut topic = FileTopic::open(dir.path(), "raw_text", "dq").unwrap();
        fs::write(topic.topic_path(), b"{\"text\":").unwrap();

        assert_eq!(topic.poll(NO_WAIT).unwrap(), None);
        assert_eq!(topic.position(), 0);

        let mut file = OpenOptions::new().append(true).open(topic.topic_path()).unwrap();
        file.write_all(b"\"late\"}\n").unwrap();

        assert_eq!(topic.poll(NO_WAIT).unwrap(), Some(br#"{"text":"late"}"#.to_vec()));
    }

    #[test]
    fn test_file_topic_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let mut topic = FileTopic::open(dir.path(), "raw_text", "dq").unwrap();
        fs::write(topic.topic_path(), b"\n  \r\nx\r\n").unwrap();

        assert_eq!(topic.poll(NO_WAIT).unwrap(), Some(b"x".to_vec()));
    }

    #[test]
    fn test_publish_rejects_embedded_newline() {
        let dir = TempDir::new().unwrap();
        let topic = FileTopic::open(dir.path(), "raw_text", "dq").unwrap();
        assert!(topic.publish(b"a\nb").is_err());
    }

    #[test]
    fn test_corrupt_offset_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("raw_text.dq.offset"), "lots").unwrap();
        assert!(FileTopic::open(dir.path(), "raw_text", "dq").is_err());
    }

    #[test]
    fn test_invalid_topic_name() {
        let dir = TempDir::new().unwrap();
        assert!(FileTopic::open(dir.path(), "../escape", "dq").is_err());
        assert!(FileTopic::open(dir.path(), "raw_text", "").is_err());
    }
}
