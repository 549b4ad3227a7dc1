//! Best-effort mirror of documents, conversations and quizzes.
//!
//! The in-memory vector store stays the source of truth. Mirror writes run on
//! a background writer task and a failure is only logged.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studybuddy_rag::DocumentMetadata;
use studybuddy_tutor::{ChatTurn, Question};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, warn};

/// External store that mirrors what the service does.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn upsert_document(&self, id: &str, metadata: &DocumentMetadata) -> std::io::Result<()>;

    async fn delete_document(&self, id: &str) -> std::io::Result<()>;

    async fn record_conversation(&self, conversation: &ConversationRecord) -> std::io::Result<()>;

    async fn record_quiz(&self, quiz: &QuizRecord) -> std::io::Result<()>;
}

/// One answered chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub message: String,
    pub reply: String,
    pub history: Vec<ChatTurn>,
    pub source_document_ids: Vec<String>,
    pub document_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One generated quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub quiz_id: String,
    pub topic: String,
    pub document_id: Option<String>,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

/// A line of the mirror log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MirrorEntry {
    #[serde(rename_all = "camelCase")]
    UpsertDocument { ts: DateTime<Utc>, id: String, metadata: DocumentMetadata },
    #[serde(rename_all = "camelCase")]
    DeleteDocument { ts: DateTime<Utc>, id: String },
    Conversation(ConversationRecord),
    Quiz(QuizRecord),
}

/// Mirror that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMirror;

#[async_trait]
impl DurableStore for NoopMirror {
    async fn upsert_document(&self, _id: &str, _metadata: &DocumentMetadata) -> std::io::Result<()> {
        Ok(())
    }

    async fn delete_document(&self, _id: &str) -> std::io::Result<()> {
        Ok(())
    }

    async fn record_conversation(&self, _conversation: &ConversationRecord) -> std::io::Result<()> {
        Ok(())
    }

    async fn record_quiz(&self, _quiz: &QuizRecord) -> std::io::Result<()> {
        Ok(())
    }
}

/// Mirror that appends one JSON object per line to `<dir>/studybuddy.jsonl`.
#[derive(Debug)]
pub struct JsonlMirror {
    path: PathBuf,
    // Serializes appends so lines never interleave.
    write_lock: Mutex<()>,
}

impl JsonlMirror {
    pub const FILE_NAME: &'static str = "studybuddy.jsonl";

    /// Create the directory if needed and open the mirror in it.
    pub async fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        Ok(Self { path: dir.join(Self::FILE_NAME), write_lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &MirrorEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file =
            tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Read every entry written so far, skipping lines that do not parse.
    pub async fn entries(&self) -> std::io::Result<Vec<MirrorEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(content.lines().filter_map(|line| serde_json::from_str(line).ok()).collect())
    }
}

#[async_trait]
impl DurableStore for JsonlMirror {
    async fn upsert_document(&self, id: &str, metadata: &DocumentMetadata) -> std::io::Result<()> {
        self.append(&MirrorEntry::UpsertDocument {
            ts: Utc::now(),
            id: id.to_string(),
            metadata: metadata.clone(),
        })
        .await
    }

    async fn delete_document(&self, id: &str) -> std::io::Result<()> {
        self.append(&MirrorEntry::DeleteDocument { ts: Utc::now(), id: id.to_string() }).await
    }

    async fn record_conversation(&self, conversation: &ConversationRecord) -> std::io::Result<()> {
        self.append(&MirrorEntry::Conversation(conversation.clone())).await
    }

    async fn record_quiz(&self, quiz: &QuizRecord) -> std::io::Result<()> {
        self.append(&MirrorEntry::Quiz(quiz.clone())).await
    }
}

/// Fire-and-forget handle around a [`DurableStore`].
///
/// Writes are queued to a single writer task and reach the store in the order
/// they were issued.
#[derive(Clone)]
pub struct Mirror {
    queue: Option<mpsc::UnboundedSender<MirrorOp>>,
}

enum MirrorOp {
    UpsertDocument(String, DocumentMetadata),
    DeleteDocument(String),
    Conversation(ConversationRecord),
    Quiz(QuizRecord),
    Flush(oneshot::Sender<()>),
}

impl Mirror {
    /// Start the writer task for `store`. Must be called inside a Tokio runtime.
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        let (queue, ops) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, ops));
        Self { queue: Some(queue) }
    }

    pub fn noop() -> Self {
        Self { queue: None }
    }

    pub fn upsert_document(&self, id: String, metadata: DocumentMetadata) {
        self.enqueue(MirrorOp::UpsertDocument(id, metadata));
    }

    pub fn delete_document(&self, id: String) {
        self.enqueue(MirrorOp::DeleteDocument(id));
    }

    pub fn record_conversation(&self, conversation: ConversationRecord) {
        self.enqueue(MirrorOp::Conversation(conversation));
    }

    pub fn record_quiz(&self, quiz: QuizRecord) {
        self.enqueue(MirrorOp::Quiz(quiz));
    }

    /// Wait until every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done, waiter) = oneshot::channel();
        self.enqueue(MirrorOp::Flush(done));
        let _ = waiter.await;
    }

    fn enqueue(&self, op: MirrorOp) {
        if let Some(queue) = &self.queue {
            if queue.send(op).is_err() {
                warn!("persistence mirror writer has stopped, dropping write");
            }
        }
    }
}

async fn run_writer(store: Arc<dyn DurableStore>, mut ops: mpsc::UnboundedReceiver<MirrorOp>) {
    while let Some(op) = ops.recv().await {
        match op {
            MirrorOp::UpsertDocument(id, metadata) => {
                report("upsert_document", store.upsert_document(&id, &metadata).await)
            }
            MirrorOp::DeleteDocument(id) => {
                report("delete_document", store.delete_document(&id).await)
            }
            MirrorOp::Conversation(conversation) => {
                report("record_conversation", store.record_conversation(&conversation).await)
            }
            MirrorOp::Quiz(quiz) => report("record_quiz", store.record_quiz(&quiz).await),
            MirrorOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

fn report(op: &'static str, result: std::io::Result<()>) {
    match result {
        Ok(()) => debug!(op, "mirrored"),
        Err(e) => warn!(op, error = %e, "persistence mirror write failed"),
    }
}
