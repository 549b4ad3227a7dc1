//! Application service: uploads, retrieval-grounded chat and quizzes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studybuddy_rag::{
    Document, EmbeddingProvider, IngestOutcome, IngestRequest, Ingestor, InMemoryVectorStore,
    PdfExtractor, RagConfig, Retriever, SearchResult, StoreStats, TextExtractor, VectorStore,
};
use studybuddy_tutor::{ChatTurn, Generator, Question, ResilientGenerator};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::error::ApiError;
use crate::persistence::{ConversationRecord, Mirror, QuizRecord};

/// Longest source excerpt returned with a chat reply, in characters.
pub const SOURCE_PREVIEW_CHARS: usize = 200;

/// Largest quiz a client may ask for.
pub const MAX_QUIZ_QUESTIONS: usize = 20;

const DEFAULT_QUIZ_QUESTIONS: usize = 5;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// A document as listed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub num_chunks: usize,
    pub num_pages: usize,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.metadata.filename,
            uploaded_at: doc.metadata.uploaded_at,
            num_chunks: doc.metadata.num_chunks,
            num_pages: doc.metadata.num_pages,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub document_id: Option<String>,
}

/// A passage cited by a chat reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub text: String,
    pub similarity: f32,
    pub filename: String,
}

impl Source {
    fn from_passage(passage: &SearchResult) -> Self {
        Self {
            text: preview(&passage.text),
            similarity: passage.similarity,
            filename: passage.metadata.filename.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResult {
    pub reply: String,
    pub sources: Vec<Source>,
    #[serde(rename = "usedRAG")]
    pub used_rag: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    pub topic: String,
    #[serde(default)]
    pub num_questions: Option<usize>,
    #[serde(default)]
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub quiz_id: String,
    pub topic: String,
    pub questions: Vec<Question>,
    pub source_count: usize,
}

/// Truncate `text` to [`SOURCE_PREVIEW_CHARS`] characters, marking the cut with `...`.
pub fn preview(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(SOURCE_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn is_pdf(filename: &str, content_type: Option<&str>) -> bool {
    let by_extension = Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    let by_type = content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"));
    by_extension || by_type
}

/// Everything the HTTP layer can ask of the application.
pub struct StudyService {
    ingestor: Arc<Ingestor>,
    retriever: Retriever,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    mirror: Mirror,
    upload_dir: PathBuf,
    max_upload_bytes: usize,
}

impl StudyService {
    pub fn builder() -> StudyServiceBuilder {
        StudyServiceBuilder::default()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validate, store and ingest an uploaded PDF.
    ///
    /// The raw file is kept as `<docId>.pdf` in the upload directory and is
    /// removed again if ingestion fails.
    pub async fn ingest_upload(
        &self,
        filename: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> ApiResult<IngestOutcome> {
        let filename = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if filename.is_empty() {
            return Err(ApiError::BadRequest("upload is missing a filename".into()));
        }
        if !is_pdf(&filename, content_type) {
            return Err(ApiError::BadRequest(format!("only PDF files are accepted, got '{filename}'")));
        }
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".into()));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "upload is {} bytes, the limit is {}",
                bytes.len(),
                self.max_upload_bytes
            )));
        }

        let document_id = Uuid::new_v4().to_string();
        let upload_dir = self.upload_dir.clone();
        let ingestor = Arc::clone(&self.ingestor);
        let store = Arc::clone(&self.store);
        let mirror = self.mirror.clone();

        // Detached from the request: once started, ingestion runs to completion
        // or failure even if the caller goes away.
        let task = tokio::spawn(async move {
            let path = upload_dir.join(format!("{document_id}.pdf"));
            tokio::fs::create_dir_all(&upload_dir).await?;
            if let Err(e) = tokio::fs::write(&path, &bytes).await {
                remove_upload(&path).await;
                return Err(ApiError::from(e));
            }

            let request =
                IngestRequest::new(filename, bytes, path.clone()).with_document_id(&document_id);
            let outcome = match ingestor.ingest(request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    remove_upload(&path).await;
                    return Err(ApiError::from(e));
                }
            };

            if let Some(document) = store.get_document(&document_id).await? {
                mirror.upsert_document(document.id, document.metadata);
            }
            Ok::<_, ApiError>(outcome)
        });

        task.await
            .map_err(|e| ApiError::Internal(format!("ingestion task failed: {e}")))?
    }

    pub async fn list_documents(&self) -> ApiResult<Vec<DocumentSummary>> {
        let documents = self.store.list_documents().await?;
        Ok(documents.into_iter().map(DocumentSummary::from).collect())
    }

    pub async fn get_document(&self, id: &str) -> ApiResult<DocumentSummary> {
        self.store
            .get_document(id)
            .await?
            .map(DocumentSummary::from)
            .ok_or_else(|| ApiError::NotFound(format!("Document not found: {id}")))
    }

    /// Remove a document, its vectors and its uploaded file.
    pub async fn delete_document(&self, id: &str) -> ApiResult<DocumentSummary> {
        let document = self.store.delete_document(id).await?;
        remove_upload(&document.metadata.source_path).await;
        self.mirror.delete_document(document.id.clone());
        info!(document.id = %id, "deleted document");
        Ok(document.into())
    }

    pub async fn search(&self, request: SearchRequest) -> ApiResult<Vec<SearchResult>> {
        if request.top_k == Some(0) {
            return Err(ApiError::BadRequest("topK must be at least 1".into()));
        }
        let results = self
            .retriever
            .search(&request.query, request.top_k, request.document_id.as_deref())
            .await?;
        Ok(results)
    }

    /// Answer a chat message from the best-matching passages.
    pub async fn chat(&self, request: ChatRequest) -> ApiResult<ChatResult> {
        let ChatRequest { message, history, document_id } = request;
        if message.trim().is_empty() {
            return Err(ApiError::BadRequest("message must not be empty".into()));
        }

        let passages = self.retriever.search(&message, None, document_id.as_deref()).await?;
        let reply = self.generator.chat_response(&message, &passages, &history).await?;

        let sources: Vec<Source> = passages.iter().map(Source::from_passage).collect();
        let used_rag = !passages.is_empty();

        let mut seen = HashSet::new();
        let source_document_ids: Vec<String> = passages
            .iter()
            .filter(|p| seen.insert(p.document_id.as_str()))
            .map(|p| p.document_id.clone())
            .collect();
        self.mirror.record_conversation(ConversationRecord {
            message,
            reply: reply.clone(),
            history,
            source_document_ids,
            document_id,
            created_at: Utc::now(),
        });

        Ok(ChatResult { reply, sources, used_rag })
    }

    /// Generate a quiz on a topic from the best-matching passages.
    pub async fn quiz(&self, request: QuizRequest) -> ApiResult<QuizResult> {
        let QuizRequest { topic, num_questions, document_id } = request;
        let topic = topic.trim().to_string();
        if topic.is_empty() {
            return Err(ApiError::BadRequest("topic must not be empty".into()));
        }
        let num_questions = num_questions.unwrap_or(DEFAULT_QUIZ_QUESTIONS);
        if !(1..=MAX_QUIZ_QUESTIONS).contains(&num_questions) {
            return Err(ApiError::BadRequest(format!(
                "numQuestions must be between 1 and {MAX_QUIZ_QUESTIONS}"
            )));
        }

        let passages = self.retriever.search(&topic, None, document_id.as_deref()).await?;
        let questions = self.generator.quiz(&topic, &passages, num_questions).await?;

        let result = QuizResult {
            quiz_id: Uuid::new_v4().to_string(),
            topic,
            questions,
            source_count: passages.len(),
        };
        self.mirror.record_quiz(QuizRecord {
            quiz_id: result.quiz_id.clone(),
            topic: result.topic.clone(),
            document_id,
            questions: result.questions.clone(),
            created_at: Utc::now(),
        });
        Ok(result)
    }

    pub async fn stats(&self) -> ApiResult<StoreStats> {
        Ok(self.store.stats().await?)
    }

    /// Wait for queued mirror writes to be attempted.
    pub async fn flush_mirror(&self) {
        self.mirror.flush().await;
    }
}

async fn remove_upload(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove uploaded file");
        }
    }
}

/// Builder for [`StudyService`].
///
/// Only the upload directory is required. Defaults are a PDF extractor, the
/// offline embedder and tutor, an in-memory store sized to the config and a
/// no-op mirror.
#[derive(Default)]
pub struct StudyServiceBuilder {
    rag_config: Option<RagConfig>,
    extractor: Option<Arc<dyn TextExtractor>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn Generator>>,
    mirror: Option<Mirror>,
    upload_dir: Option<PathBuf>,
    max_upload_bytes: Option<usize>,
}

impl StudyServiceBuilder {
    pub fn rag_config(mut self, config: RagConfig) -> Self {
        self.rag_config = Some(config);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = Some(bytes);
        self
    }

    pub fn build(self) -> studybuddy_rag::Result<StudyService> {
        let config = self.rag_config.unwrap_or_default();
        let upload_dir = self.upload_dir.ok_or_else(|| {
            studybuddy_rag::RagError::ConfigError("upload_dir is required".to_string())
        })?;

        let embedder = self.embedder.unwrap_or_else(|| {
            Arc::new(studybuddy_rag::ResilientEmbedder::new(config.dimensions, config.model_timeout))
        });
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryVectorStore::new(config.dimensions)));
        let generator = self
            .generator
            .unwrap_or_else(|| Arc::new(ResilientGenerator::new(config.model_timeout)));
        let extractor = self.extractor.unwrap_or_else(|| Arc::new(PdfExtractor::new()));

        let ingestor = Ingestor::builder()
            .config(config.clone())
            .extractor(extractor)
            .embedding_provider(Arc::clone(&embedder))
            .vector_store(Arc::clone(&store))
            .build()?;
        let retriever = Retriever::new(embedder, Arc::clone(&store), config.top_k);

        Ok(StudyService {
            ingestor: Arc::new(ingestor),
            retriever,
            store,
            generator,
            mirror: self.mirror.unwrap_or_else(Mirror::noop),
            upload_dir,
            max_upload_bytes: self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_text() {
        let long = "a".repeat(250);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), SOURCE_PREVIEW_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let text = "é".repeat(201);
        assert_eq!(preview(&text), format!("{}...", "é".repeat(200)));
    }

    struct SlowExtractor(std::time::Duration);

    impl TextExtractor for SlowExtractor {
        fn extract(&self, bytes: &[u8]) -> studybuddy_rag::Result<studybuddy_rag::ExtractedText> {
            std::thread::sleep(self.0);
            studybuddy_rag::PlainTextExtractor.extract(bytes)
        }
    }

    async fn uploaded_files(dir: &Path) -> usize {
        let mut count = 0;
        if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
            while entries.next_entry().await.unwrap().is_some() {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn abandoned_upload_still_finishes_ingesting() {
        let dir = tempfile::tempdir().unwrap();
        let service = StudyService::builder()
            .extractor(Arc::new(SlowExtractor(std::time::Duration::from_millis(300))))
            .upload_dir(dir.path())
            .build()
            .unwrap();
        let notes = "Arrays store elements in contiguous memory. ".repeat(20).into_bytes();

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            service.ingest_upload("notes.pdf", Some("application/pdf"), notes),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        assert_eq!(uploaded_files(dir.path()).await, 1);
        assert_eq!(service.stats().await.unwrap().total_documents, 1);
    }

    #[tokio::test]
    async fn abandoned_failing_upload_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = StudyService::builder()
            .extractor(Arc::new(SlowExtractor(std::time::Duration::from_millis(300))))
            .upload_dir(dir.path())
            .build()
            .unwrap();

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            service.ingest_upload("scan.pdf", None, b"  \n\t ".to_vec()),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        assert_eq!(uploaded_files(dir.path()).await, 0);
        assert_eq!(service.stats().await.unwrap().total_documents, 0);
    }

    #[test]
    fn pdf_detection_uses_extension_or_type() {
        assert!(is_pdf("Notes.PDF", None));
        assert!(is_pdf("scan", Some("application/pdf")));
        assert!(!is_pdf("notes.docx", Some("application/msword")));
    }
}
