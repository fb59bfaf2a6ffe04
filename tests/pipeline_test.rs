//! Integration tests for the document pipeline with in-memory collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use unscan::analysis::{AnalysisPage, DocumentLocation, FeatureType, JobStatus};
use unscan::error::{Error, Result};
use unscan::storage::PROMPT_KEY;
use unscan::{
    cancel_pair, AnalysisService, Block, BlobStore, CancelToken, LanguageModel, MemoryBlobStore,
    ModelRequest, Pipeline, PipelineOptions, PollPolicy, SelectionStatus, Session,
};

const PDF: &[u8] = b"%PDF-1.7\n...";

/// Analysis service returning a fixed block set, optionally failing.
struct MockAnalysis {
    status: JobStatus,
    started: Arc<Mutex<Vec<String>>>,
}

impl MockAnalysis {
    fn new(status: JobStatus) -> Self {
        Self {
            status,
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn blocks() -> Vec<Block> {
        vec![
            Block::page("p").with_children(["l2", "l1"]),
            Block::line("l1", "Name: Ann").at(0.1, 0.1),
            Block::line("l2", "Agree?").at(0.1, 0.2).with_children(["s1"]),
            Block::selection("s1", SelectionStatus::Selected),
        ]
    }
}

impl AnalysisService for MockAnalysis {
    fn start_analysis(&self, location: &DocumentLocation, features: &[FeatureType]) -> Result<String> {
        assert_eq!(features, &[FeatureType::Tables]);
        self.started.lock().unwrap().push(location.to_string());
        Ok("job".to_string())
    }

    fn get_analysis(&self, _job_id: &str, _next_token: Option<&str>) -> Result<AnalysisPage> {
        let mut page = AnalysisPage::status(self.status);
        if self.status == JobStatus::Succeeded {
            page = page.with_blocks(Self::blocks());
        } else if self.status == JobStatus::Failed {
            page.status_message = Some("bad document".to_string());
        }
        Ok(page)
    }
}

/// Model that echoes a summary of the prompt, or fails on demand.
struct MockModel {
    fail: bool,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl MockModel {
    fn new() -> Self {
        Self {
            fail: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

impl LanguageModel for MockModel {
    fn model_id(&self) -> &str {
        "mock"
    }

    fn invoke(&self, request: &ModelRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(Error::Model("throttled".to_string()));
        }
        Ok(format!("reply #{}", self.requests.lock().unwrap().len()))
    }
}

/// Blob store shared between the pipeline and the test.
#[derive(Clone)]
struct SharedStore(Arc<MemoryBlobStore>);

impl BlobStore for SharedStore {
    fn bucket(&self) -> &str {
        self.0.bucket()
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.0.get(key)
    }

    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.0.put(key, data, content_type)
    }
}

fn store_with_prompt() -> SharedStore {
    let store = SharedStore(Arc::new(MemoryBlobStore::with_bucket("docs")));
    store.put_text(PROMPT_KEY, "Summarize as a form.").unwrap();
    store
}

fn fast_options() -> PipelineOptions {
    PipelineOptions::new().with_poll(
        PollPolicy::new()
            .with_interval(Duration::from_millis(1))
            .with_timeout(Duration::from_millis(50)),
    )
}

#[test]
fn test_full_pipeline_writes_artifacts() {
    let store = store_with_prompt();
    let analysis = MockAnalysis::new(JobStatus::Succeeded);
    let started = analysis.started.clone();
    let model = MockModel::new();
    let requests = model.requests.clone();
    let pipeline = Pipeline::new(store.clone(), analysis, model).with_options(fast_options());

    let key = pipeline.upload("../scans/form.pdf", PDF).unwrap();
    assert_eq!(key, "uploads/form.pdf");
    assert_eq!(store.0.content_type(&key).as_deref(), Some("application/pdf"));

    let parsed = pipeline.process_document(&key, &CancelToken::never()).unwrap();
    assert_eq!(parsed, "Name: Ann\nAgree? SELECTED");
    assert_eq!(started.lock().unwrap().as_slice(), ["docs/uploads/form.pdf"]);
    assert_eq!(store.get_text("uploads/form.pdf_parsed.txt").unwrap(), parsed);

    let raw: serde_json::Value =
        serde_json::from_str(&store.get_text("uploads/form.pdf_raw.json").unwrap()).unwrap();
    assert_eq!(raw["Blocks"].as_array().unwrap().len(), 4);

    let context = pipeline.restructure_document(&key).unwrap();
    assert_eq!(context, "reply #1");
    assert_eq!(store.get_text("uploads/form.pdf_LM_info.txt").unwrap(), "reply #1");

    let answer = pipeline.ask(&key, "  What is the name?  ").unwrap();
    assert_eq!(answer, "reply #2");

    let requests = requests.lock().unwrap();
    let restructure = &requests[0];
    assert_eq!(restructure.max_tokens, 10000);
    assert_eq!(restructure.temperature, 0.5);
    let unscan::llm::ContentBlock::Text { text } = &restructure.messages[0].content[0];
    assert!(text.starts_with("Summarize as a form.\n\nHere's the parsed document:\n\nName: Ann"));

    let question = &requests[1];
    assert_eq!(question.max_tokens, 250);
    let unscan::llm::ContentBlock::Text { text } = &question.messages[0].content[0];
    assert!(text.contains("reply #1"));
    assert!(text.contains("Question: What is the name?\n"));
}

#[test]
fn test_rejects_unsupported_upload() {
    let pipeline = Pipeline::new(
        store_with_prompt(),
        MockAnalysis::new(JobStatus::Succeeded),
        MockModel::new(),
    );
    let result = pipeline.upload("notes.txt", b"hello");
    assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
}

#[test]
fn test_failed_job_writes_nothing() {
    let store = store_with_prompt();
    let pipeline = Pipeline::new(store.clone(), MockAnalysis::new(JobStatus::Failed), MockModel::new())
        .with_options(fast_options());
    let key = pipeline.upload("form.pdf", PDF).unwrap();

    let result = pipeline.process_document(&key, &CancelToken::never());
    assert!(matches!(result, Err(Error::JobFailed { .. })));
    assert!(!store.exists("uploads/form.pdf_parsed.txt").unwrap());
    assert!(!store.exists("uploads/form.pdf_raw.json").unwrap());
}

/// Store that refuses writes to keys with the given suffix.
struct RejectingStore {
    inner: SharedStore,
    suffix: &'static str,
}

impl BlobStore for RejectingStore {
    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        if key.ends_with(self.suffix) {
            return Err(Error::Storage("disk full".to_string()));
        }
        self.inner.put(key, data, content_type)
    }
}

#[test]
fn test_failed_raw_write_leaves_no_parsed_text() {
    let store = store_with_prompt();
    let rejecting = RejectingStore {
        inner: store.clone(),
        suffix: "_raw.json",
    };
    let pipeline = Pipeline::new(rejecting, MockAnalysis::new(JobStatus::Succeeded), MockModel::new())
        .with_options(fast_options());
    let key = pipeline.upload("form.pdf", PDF).unwrap();

    let result = pipeline.process_document(&key, &CancelToken::never());
    assert!(matches!(result, Err(Error::Storage(_))));
    assert!(!store.exists("uploads/form.pdf_parsed.txt").unwrap());
    assert!(matches!(
        pipeline.restructure_document(&key),
        Err(Error::NotFound(k)) if k == "uploads/form.pdf_parsed.txt"
    ));
}

#[test]
fn test_stuck_job_times_out() {
    let pipeline = Pipeline::new(
        store_with_prompt(),
        MockAnalysis::new(JobStatus::InProgress),
        MockModel::new(),
    )
    .with_options(fast_options());
    let key = pipeline.upload("form.pdf", PDF).unwrap();

    let result = pipeline.process_document(&key, &CancelToken::never());
    assert!(matches!(result, Err(Error::Timeout(_))));
}

#[test]
fn test_cancelled_processing() {
    let pipeline = Pipeline::new(
        store_with_prompt(),
        MockAnalysis::new(JobStatus::InProgress),
        MockModel::new(),
    )
    .with_options(PipelineOptions::new().with_poll(PollPolicy::new().unbounded()));
    let key = pipeline.upload("form.pdf", PDF).unwrap();

    let (handle, token) = cancel_pair();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        handle.cancel();
    });
    let result = pipeline.process_document(&key, &token);
    canceller.join().unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
fn test_restructure_requires_prompt() {
    let store = SharedStore(Arc::new(MemoryBlobStore::new()));
    let pipeline = Pipeline::new(store, MockAnalysis::new(JobStatus::Succeeded), MockModel::new())
        .with_options(fast_options());
    let key = pipeline.upload("form.pdf", PDF).unwrap();
    pipeline.process_document(&key, &CancelToken::never()).unwrap();

    let result = pipeline.restructure_document(&key);
    assert!(matches!(result, Err(Error::NotFound(k)) if k == PROMPT_KEY));
}

#[test]
fn test_failed_restructure_leaves_no_context() {
    let store = store_with_prompt();
    let pipeline = Pipeline::new(
        store.clone(),
        MockAnalysis::new(JobStatus::Succeeded),
        MockModel::failing(),
    )
    .with_options(fast_options());
    let key = pipeline.upload("form.pdf", PDF).unwrap();
    pipeline.process_document(&key, &CancelToken::never()).unwrap();

    assert!(matches!(pipeline.restructure_document(&key), Err(Error::Model(_))));
    assert!(!store.exists("uploads/form.pdf_LM_info.txt").unwrap());

    let result = pipeline.ask(&key, "Who?");
    assert!(matches!(result, Err(Error::MissingContext(k)) if k == "uploads/form.pdf_LM_info.txt"));
}

#[test]
fn test_blank_question_rejected() {
    let pipeline = Pipeline::new(
        store_with_prompt(),
        MockAnalysis::new(JobStatus::Succeeded),
        MockModel::new(),
    );
    assert!(matches!(pipeline.ask("uploads/form.pdf", "   "), Err(Error::InvalidInput(_))));
}

#[test]
fn test_session_processes_once() {
    let analysis = MockAnalysis::new(JobStatus::Succeeded);
    let started = analysis.started.clone();
    let pipeline = Pipeline::new(store_with_prompt(), analysis, MockModel::new())
        .with_options(fast_options());

    let mut session = Session::new();
    pipeline
        .ingest(&mut session, "form.pdf", PDF, &CancelToken::never())
        .unwrap();
    assert!(session.is_processed());
    assert_eq!(session.key(), Some("uploads/form.pdf"));
    assert!(session.processed_at.is_some());

    pipeline
        .ingest(&mut session, "other.png", b"\x89PNG\r\n\x1a\n", &CancelToken::never())
        .unwrap();
    assert_eq!(started.lock().unwrap().len(), 1);
    assert_eq!(session.key(), Some("uploads/form.pdf"));

    assert_eq!(pipeline.ask_in_session(&session, "Name?").unwrap(), "reply #2");
}

#[test]
fn test_failed_ingest_leaves_session_unprocessed() {
    let pipeline = Pipeline::new(
        store_with_prompt(),
        MockAnalysis::new(JobStatus::Succeeded),
        MockModel::failing(),
    )
    .with_options(fast_options());

    let mut session = Session::new();
    let result = pipeline.ingest(&mut session, "form.pdf", PDF, &CancelToken::never());
    assert!(result.is_err());
    assert!(!session.is_processed());
    assert_eq!(session.key(), Some("uploads/form.pdf"));
    assert!(matches!(
        pipeline.ask_in_session(&session, "Name?"),
        Err(Error::MissingContext(_))
    ));
}

#[test]
fn test_ask_in_empty_session() {
    let pipeline = Pipeline::new(
        store_with_prompt(),
        MockAnalysis::new(JobStatus::Succeeded),
        MockModel::new(),
    );
    let result = pipeline.ask_in_session(&Session::new(), "Name?");
    assert!(matches!(result, Err(e) if e.is_not_found()));
}
