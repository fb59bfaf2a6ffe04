//! # unscan
//!
//! Scanned-document extraction and question answering.
//!
//! A document analysis service returns a scanned form as a flat, loosely
//! ordered list of blocks (pages, lines, words, checkboxes, tables, cells).
//! This library puts those blocks back into reading order and flattens them
//! into one linear text that a language model can work with: checkbox lines
//! end in `SELECTED` or `UNANSWERED`, tables become `|`-separated rows.
//!
//! ## Quick Start
//!
//! ```no_run
//! use unscan::{flatten_json, OrderOptions};
//!
//! fn main() -> unscan::Result<()> {
//!     let raw = std::fs::read_to_string("form.pdf_raw.json")?;
//!     let text = flatten_json(&raw, &OrderOptions::default())?;
//!     println!("{}", text);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Reading order**: top-to-bottom, left-to-right with row-band tolerance
//! - **Checkbox state**: selection elements rendered as `SELECTED` / `UNANSWERED`
//! - **Tables**: rows rendered as `A | B`
//! - **Pipeline**: upload, analysis, restructuring and Q&A over pluggable
//!   storage, analysis and model backends
//! - **AWS clients** (`remote` feature): S3, Textract and Bedrock through the
//!   AWS SDK, plus the Anthropic API over HTTP

pub mod analysis;
pub mod detect;
pub mod error;
pub mod llm;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod storage;

#[cfg(feature = "remote")]
pub mod aws;

// Re-export commonly used types
pub use analysis::{
    cancel_pair, run_analysis, AnalysisPage, AnalysisService, CancelHandle, CancelToken,
    DocumentLocation, FeatureType, JobStatus, PollPolicy,
};
pub use detect::{detect_format_from_bytes, detect_format_from_path, detect_upload, UploadFormat};
pub use error::{Error, Result};
pub use llm::{LanguageModel, Message, ModelRequest, ModelSettings, Role};
pub use model::{
    AnalysisDocument, Block, BlockType, Cell, Document, Line, Page, Row, SelectionStatus, Table,
    Word,
};
pub use parser::{assemble, order_blocks, MissingGeometry, OrderOptions};
pub use pipeline::{Pipeline, PipelineOptions, Session};
pub use render::{to_json, to_text, JsonFormat};
pub use storage::{ArtifactKeys, BlobStore, FsBlobStore, MemoryBlobStore};

#[cfg(feature = "remote")]
pub use analysis::TextractClient;
#[cfg(feature = "remote")]
pub use aws::AwsContext;
#[cfg(feature = "remote")]
pub use llm::{AnthropicModel, BedrockModel};
#[cfg(feature = "remote")]
pub use storage::S3BlobStore;

/// Order, assemble and flatten a combined block set.
///
/// # Example
///
/// ```
/// use unscan::{flatten, AnalysisDocument, Block, OrderOptions};
///
/// let doc = AnalysisDocument::from_blocks(vec![
///     Block::page("p").with_children(["b", "a"]),
///     Block::line("a", "First").at(0.1, 0.1),
///     Block::line("b", "Second").at(0.1, 0.2),
/// ]);
/// assert_eq!(flatten(doc, &OrderOptions::default()), "First\nSecond");
/// ```
pub fn flatten(mut doc: AnalysisDocument, options: &OrderOptions) -> String {
    order_blocks(&mut doc, options);
    to_text(&assemble(&doc))
}

/// Flatten a raw `{"Blocks": [...]}` analysis result.
pub fn flatten_json(json: &str, options: &OrderOptions) -> Result<String> {
    Ok(flatten(AnalysisDocument::from_json(json)?, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_orders_before_rendering() {
        let doc = AnalysisDocument::from_blocks(vec![
            Block::page("p").with_children(["c", "a", "b"]),
            Block::line("a", "ten").at(0.1, 10.0),
            Block::line("b", "twenty").at(0.1, 20.0),
            Block::line("c", "thirty").at(0.1, 30.0),
        ]);
        assert_eq!(flatten(doc, &OrderOptions::default()), "ten\ntwenty\nthirty");
    }

    #[test]
    fn test_flatten_json() {
        let json = r#"{"Blocks":[
            {"BlockType":"PAGE","Id":"p","Relationships":[{"Type":"CHILD","Ids":["l"]}]},
            {"BlockType":"LINE","Id":"l","Text":"Name:",
             "Geometry":{"BoundingBox":{"Width":0.1,"Height":0.01,"Left":0.1,"Top":0.1}}}
        ]}"#;
        assert_eq!(flatten_json(json, &OrderOptions::default()).unwrap(), "Name:");
        assert!(flatten_json("{", &OrderOptions::default()).is_err());
    }
}
