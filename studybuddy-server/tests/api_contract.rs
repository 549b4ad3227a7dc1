use std::sync::Arc;

use reqwest::{StatusCode, multipart};
use serde_json::{Value, json};
use studybuddy_rag::PlainTextExtractor;
use studybuddy_server::{AppState, JsonlMirror, Mirror, StudyService, app_router};
use tempfile::TempDir;

struct TestServer {
    base: String,
    dir: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    fn upload_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }
}

async fn spawn_server_with(max_upload_bytes: usize) -> TestServer {
    let dir = tempfile::tempdir().expect("temp dir");
    let mirror = JsonlMirror::open(dir.path().join("data")).await.expect("mirror");
    let service = StudyService::builder()
        .extractor(Arc::new(PlainTextExtractor))
        .mirror(Mirror::new(Arc::new(mirror)))
        .upload_dir(dir.path().join("uploads"))
        .max_upload_bytes(max_upload_bytes)
        .build()
        .expect("service");
    let app = app_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    TestServer { base: format!("http://{}", addr), dir, handle }
}

async fn spawn_server() -> TestServer {
    spawn_server_with(1024 * 1024).await
}

fn study_notes() -> String {
    "Arrays store elements in contiguous memory. Each element is reached by its index. "
        .repeat(30)
}

async fn upload(
    client: &reqwest::Client,
    base: &str,
    filename: &str,
    mime: &str,
    bytes: Vec<u8>,
) -> reqwest::Response {
    let part = multipart::Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str(mime)
        .expect("mime");
    let form = multipart::Form::new().part("file", part);
    client
        .post(format!("{}/api/documents", base))
        .multipart(form)
        .send()
        .await
        .expect("upload response")
}

#[tokio::test]
async fn health_reports_ok() {
    let server = spawn_server().await;
    let body: Value = reqwest::get(format!("{}/health", server.base))
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(body["status"], "ok");
    server.handle.abort();
}

#[tokio::test]
async fn upload_lists_and_stores_document() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response =
        upload(&client, &server.base, "arrays.pdf", "application/pdf", study_notes().into_bytes())
            .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let outcome: Value = response.json().await.expect("outcome json");
    let doc_id = outcome["docId"].as_str().expect("docId").to_string();
    assert!(outcome["chunkCount"].as_u64().expect("chunkCount") >= 2);
    assert_eq!(outcome["pageCount"], 1);

    assert!(server.upload_dir().join(format!("{doc_id}.pdf")).exists());

    let listed: Value = client
        .get(format!("{}/api/documents", server.base))
        .send()
        .await
        .expect("list response")
        .json()
        .await
        .expect("list json");
    assert_eq!(listed.as_array().expect("array").len(), 1);
    assert_eq!(listed[0]["id"], doc_id.as_str());
    assert_eq!(listed[0]["filename"], "arrays.pdf");
    assert!(listed[0]["uploadedAt"].is_string());
    assert_eq!(listed[0]["numChunks"], outcome["chunkCount"]);

    let stats: Value = client
        .get(format!("{}/api/stats", server.base))
        .send()
        .await
        .expect("stats response")
        .json()
        .await
        .expect("stats json");
    assert_eq!(stats["totalDocuments"], 1);
    assert_eq!(stats["totalVectors"], outcome["chunkCount"]);

    server.handle.abort();
}

#[tokio::test]
async fn chat_hello_without_documents_uses_greeting() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/chat", server.base))
        .json(&json!({ "message": "hello" }))
        .send()
        .await
        .expect("chat response");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("chat json");
    assert!(body["reply"].as_str().expect("reply").starts_with("Hello!"));
    assert_eq!(body["usedRAG"], false);
    assert_eq!(body["sources"].as_array().expect("sources").len(), 0);

    server.handle.abort();
}

#[tokio::test]
async fn chat_and_quiz_use_uploaded_passages() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    upload(&client, &server.base, "arrays.pdf", "application/pdf", study_notes().into_bytes())
        .await;

    let chat: Value = client
        .post(format!("{}/api/chat", server.base))
        .json(&json!({
            "message": "what is an array?",
            "history": [{ "role": "user", "content": "hi" }, { "role": "assistant", "content": "Hello!" }]
        }))
        .send()
        .await
        .expect("chat response")
        .json()
        .await
        .expect("chat json");
    assert_eq!(chat["usedRAG"], true);
    let sources = chat["sources"].as_array().expect("sources");
    assert!(!sources.is_empty());
    for source in sources {
        assert_eq!(source["filename"], "arrays.pdf");
        assert!(source["text"].as_str().expect("text").chars().count() <= 203);
    }
    assert!(chat["reply"].as_str().expect("reply").contains("> Arrays store elements"));

    let quiz: Value = client
        .post(format!("{}/api/quiz", server.base))
        .json(&json!({ "topic": "Arrays", "numQuestions": 5 }))
        .send()
        .await
        .expect("quiz response")
        .json()
        .await
        .expect("quiz json");
    assert!(quiz["quizId"].is_string());
    assert_eq!(quiz["topic"], "Arrays");
    assert!(quiz["sourceCount"].as_u64().expect("sourceCount") > 0);
    let questions = quiz["questions"].as_array().expect("questions");
    assert_eq!(questions.len(), 5);
    let mc = questions.iter().filter(|q| q["type"] == "multiple-choice").count();
    assert_eq!(mc, 3);
    let ids: Vec<u64> = questions.iter().map(|q| q["id"].as_u64().expect("id")).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    server.handle.abort();
}

#[tokio::test]
async fn rejects_non_pdf_and_oversized_uploads() {
    let server = spawn_server_with(1024).await;
    let client = reqwest::Client::new();

    let response =
        upload(&client, &server.base, "notes.txt", "text/plain", b"plain notes".to_vec()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("error json");
    assert!(body["error"].as_str().expect("error").contains("PDF"));

    let response =
        upload(&client, &server.base, "big.pdf", "application/pdf", vec![b'a'; 2048]).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    server.handle.abort();
}

#[tokio::test]
async fn blank_upload_is_unprocessable_and_leaves_no_file() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response =
        upload(&client, &server.base, "scan.pdf", "application/pdf", b"   \n\t  ".to_vec()).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut entries = tokio::fs::read_dir(server.upload_dir()).await.expect("upload dir");
    assert!(entries.next_entry().await.expect("read dir").is_none());

    let stats: Value = client
        .get(format!("{}/api/stats", server.base))
        .send()
        .await
        .expect("stats response")
        .json()
        .await
        .expect("stats json");
    assert_eq!(stats["totalDocuments"], 0);

    server.handle.abort();
}

#[tokio::test]
async fn delete_removes_document_and_file() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let outcome: Value =
        upload(&client, &server.base, "arrays.pdf", "application/pdf", study_notes().into_bytes())
            .await
            .json()
            .await
            .expect("outcome json");
    let doc_id = outcome["docId"].as_str().expect("docId").to_string();

    let response = client
        .delete(format!("{}/api/documents/{}", server.base, doc_id))
        .send()
        .await
        .expect("delete response");
    assert!(response.status().is_success());
    assert!(!server.upload_dir().join(format!("{doc_id}.pdf")).exists());

    let response = client
        .get(format!("{}/api/documents/{}", server.base, doc_id))
        .send()
        .await
        .expect("get response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .delete(format!("{}/api/documents/{}", server.base, doc_id))
        .send()
        .await
        .expect("second delete response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .post(format!("{}/api/search", server.base))
        .json(&json!({ "query": "arrays", "documentId": doc_id }))
        .send()
        .await
        .expect("search response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.handle.abort();
}

#[tokio::test]
async fn invalid_requests_are_bad_requests() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/chat", server.base))
        .json(&json!({ "message": "   " }))
        .send()
        .await
        .expect("chat response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/api/quiz", server.base))
        .json(&json!({ "topic": "Arrays", "numQuestions": 0 }))
        .send()
        .await
        .expect("quiz response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/api/search", server.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("search response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("error json");
    assert!(body["error"].is_string());

    server.handle.abort();
}
