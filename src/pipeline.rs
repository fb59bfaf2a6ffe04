//! End-to-end document processing.
//!
//! A [`Pipeline`] ties a blob store, an analysis service and a language
//! model together:
//!
//! ```text
//! upload ─► analyse ─► order ─► flatten ─► K_parsed.txt
//!                 └─► K_raw.json
//! K_parsed.txt + PROMPT.txt ─► model ─► K_LM_info.txt
//! K_LM_info.txt + question ─► model ─► answer
//! ```
//!
//! Every stage talks to external services. A failing stage is logged and
//! aborted and writes nothing further; later stages then fail on the
//! missing artifact instead of working from stale or partial state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{run_analysis, AnalysisService, CancelToken, DocumentLocation, FeatureType, PollPolicy};
use crate::detect::detect_upload;
use crate::error::{Error, Result};
use crate::llm::{answer_prompt, restructure_prompt, LanguageModel, ModelRequest, ModelSettings};
use crate::parser::OrderOptions;
use crate::render::{to_json, JsonFormat};
use crate::storage::{upload_key, ArtifactKeys, BlobStore, JSON_CONTENT_TYPE, PROMPT_KEY};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Reading-order settings
    pub order: OrderOptions,

    /// Analysis job polling
    pub poll: PollPolicy,

    /// Structures requested from the analysis service
    pub features: Vec<FeatureType>,

    /// Key of the restructuring instructions
    pub prompt_key: String,

    /// Model settings for restructuring
    pub restructure: ModelSettings,

    /// Model settings for answering questions
    pub answer: ModelSettings,

    /// Layout of the stored raw block JSON
    pub raw_format: JsonFormat,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            order: OrderOptions::default(),
            poll: PollPolicy::default(),
            features: vec![FeatureType::Tables],
            prompt_key: PROMPT_KEY.to_string(),
            restructure: ModelSettings::restructure(),
            answer: ModelSettings::answer(),
            raw_format: JsonFormat::Compact,
        }
    }
}

impl PipelineOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set reading-order options.
    pub fn with_order(mut self, order: OrderOptions) -> Self {
        self.order = order;
        self
    }

    /// Set the polling policy.
    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Set the requested analysis features.
    pub fn with_features(mut self, features: Vec<FeatureType>) -> Self {
        self.features = features;
        self
    }

    /// Read restructuring instructions from another key.
    pub fn with_prompt_key(mut self, key: impl Into<String>) -> Self {
        self.prompt_key = key.into();
        self
    }

    /// Set the restructuring model settings.
    pub fn with_restructure_settings(mut self, settings: ModelSettings) -> Self {
        self.restructure = settings;
        self
    }

    /// Set the answering model settings.
    pub fn with_answer_settings(mut self, settings: ModelSettings) -> Self {
        self.answer = settings;
        self
    }

    /// Set the raw JSON layout.
    pub fn with_raw_format(mut self, format: JsonFormat) -> Self {
        self.raw_format = format;
        self
    }
}

/// State of one interactive session: which document it works on and
/// whether that document went through the whole pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Storage key of the uploaded document
    pub key: Option<String>,

    /// Set once processing and restructuring both succeeded
    pub processed: bool,

    /// When processing finished
    pub processed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Start an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the session's document is ready for questions.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Storage key of the session's document.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Forget the current document.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn mark_processed(&mut self) {
        self.processed = true;
        self.processed_at = Some(Utc::now());
    }
}

/// Document pipeline over pluggable collaborators.
pub struct Pipeline {
    store: Box<dyn BlobStore>,
    analysis: Box<dyn AnalysisService>,
    model: Box<dyn LanguageModel>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline with default options.
    pub fn new(
        store: impl BlobStore + 'static,
        analysis: impl AnalysisService + 'static,
        model: impl LanguageModel + 'static,
    ) -> Self {
        Self::from_boxed(Box::new(store), Box::new(analysis), Box::new(model))
    }

    /// Create a pipeline from boxed collaborators.
    pub fn from_boxed(
        store: Box<dyn BlobStore>,
        analysis: Box<dyn AnalysisService>,
        model: Box<dyn LanguageModel>,
    ) -> Self {
        Self {
            store,
            analysis,
            model,
            options: PipelineOptions::default(),
        }
    }

    /// Replace the options and return self.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// The blob store artifacts are written to.
    pub fn store(&self) -> &dyn BlobStore {
        self.store.as_ref()
    }

    /// Store an uploaded document and return its key.
    ///
    /// Only PDF, PNG and JPEG uploads are accepted.
    pub fn upload(&self, name: &str, data: &[u8]) -> Result<String> {
        stage("Uploading file", || {
            let format = detect_upload(name, data)?;
            let key = upload_key(name)?;
            self.store.put(&key, data, format.mime_type())?;
            log::info!("Stored {} upload at {}", format, key);
            Ok(key)
        })
    }

    /// Analyse the document at `key` and store the raw and flattened
    /// artifacts. Returns the flattened text.
    pub fn process_document(&self, key: &str, cancel: &CancelToken) -> Result<String> {
        let keys = ArtifactKeys::for_upload(key);

        let doc = stage("Running document analysis", || {
            let location = DocumentLocation::new(self.store.bucket(), key);
            run_analysis(
                self.analysis.as_ref(),
                &location,
                &self.options.features,
                &self.options.poll,
                cancel,
            )
        })?;

        let raw = stage("Serializing analysis blocks", || {
            to_json(&doc, self.options.raw_format)
        })?;

        let parsed = stage("Flattening document", || {
            Ok(crate::flatten(doc, &self.options.order))
        })?;

        // Parsed text goes last: it is what the next stage reads.
        stage("Saving analysis results", || {
            self.store
                .put(&keys.raw(), raw.as_bytes(), JSON_CONTENT_TYPE)?;
            self.store.put_text(&keys.parsed(), &parsed)
        })?;

        Ok(parsed)
    }

    /// Ask the model to restructure the flattened text of `key` and store
    /// the result as the document context. Returns the context.
    pub fn restructure_document(&self, key: &str) -> Result<String> {
        let keys = ArtifactKeys::for_upload(key);

        let parsed = stage("Retrieving parsed document", || {
            self.store.get_text(&keys.parsed())
        })?;
        let instructions = stage("Retrieving restructuring prompt", || {
            self.store.get_text(&self.options.prompt_key)
        })?;

        let context = stage("Restructuring document", || {
            let request = ModelRequest::user(
                restructure_prompt(&instructions, &parsed),
                self.options.restructure,
            );
            self.model.invoke(&request)
        })?;

        stage("Saving document context", || {
            self.store.put_text(&keys.context(), &context)
        })?;

        Ok(context)
    }

    /// Answer a question about the processed document at `key`.
    ///
    /// Leading and trailing whitespace is trimmed from `question` before it
    /// goes into the prompt.
    ///
    /// # Errors
    /// * [`Error::InvalidInput`] if the question is blank
    /// * [`Error::MissingContext`] if the document was never restructured
    pub fn ask(&self, key: &str, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question is empty".to_string()));
        }

        let context_key = ArtifactKeys::for_upload(key).context();
        let context = stage("Retrieving document context", || {
            self.store.get_text(&context_key).map_err(|e| match e {
                Error::NotFound(_) => Error::MissingContext(context_key.clone()),
                other => other,
            })
        })?;

        stage("Answering question", || {
            let request = ModelRequest::user(answer_prompt(&context, question), self.options.answer);
            self.model.invoke(&request)
        })
    }

    /// Upload, process and restructure a document within a session.
    ///
    /// Does nothing when the session already holds a processed document.
    /// The session is only marked processed when every stage succeeded.
    pub fn ingest(
        &self,
        session: &mut Session,
        name: &str,
        data: &[u8],
        cancel: &CancelToken,
    ) -> Result<()> {
        if session.is_processed() {
            log::info!(
                "Session already processed {}, skipping {}",
                session.key().unwrap_or("a document"),
                name
            );
            return Ok(());
        }

        let key = self.upload(name, data)?;
        session.key = Some(key.clone());

        self.process_document(&key, cancel)?;
        self.restructure_document(&key)?;

        session.mark_processed();
        log::info!("Document processed and restructured: {}", key);
        Ok(())
    }

    /// Answer a question about the session's document.
    pub fn ask_in_session(&self, session: &Session, question: &str) -> Result<String> {
        match session.key() {
            Some(key) if session.is_processed() => self.ask(key, question),
            Some(key) => Err(Error::MissingContext(ArtifactKeys::for_upload(key).context())),
            None => Err(Error::MissingContext("no document in session".to_string())),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("bucket", &self.store.bucket())
            .field("model", &self.model.model_id())
            .field("options", &self.options)
            .finish()
    }
}

fn stage<T>(name: &str, run: impl FnOnce() -> Result<T>) -> Result<T> {
    log::info!("{}: in progress", name);
    match run() {
        Ok(value) => {
            log::debug!("{}: done", name);
            Ok(value)
        }
        Err(e) => {
            log::error!("{}: {}", name, e);
            Err(e)
        }
    }
}
