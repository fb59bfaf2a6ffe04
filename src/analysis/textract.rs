//! Amazon Textract client.
//!
//! SDK response blocks are converted into the crate's [`Block`] model so
//! the stored raw artifact keeps Textract's own JSON field names.

use aws_sdk_textract::error::DisplayErrorContext;
use aws_sdk_textract::types as sdk;
use aws_sdk_textract::Client;

use super::{AnalysisPage, AnalysisService, DocumentLocation, FeatureType, JobStatus};
use crate::aws::AwsContext;
use crate::error::{Error, Result};
use crate::model::{
    Block, BlockType, BoundingBox, Geometry, Point, Relationship, RelationshipType,
    SelectionStatus,
};

/// [`AnalysisService`] backed by Textract's asynchronous document analysis.
#[derive(Debug, Clone)]
pub struct TextractClient {
    client: Client,
    aws: AwsContext,
}

impl TextractClient {
    /// Create a client for the context's region.
    pub fn new(aws: &AwsContext) -> Self {
        Self {
            client: Client::new(aws.sdk_config()),
            aws: aws.clone(),
        }
    }

    async fn start(&self, location: &DocumentLocation, features: &[FeatureType]) -> Result<String> {
        let object = sdk::S3Object::builder()
            .bucket(&location.bucket)
            .name(&location.name)
            .build();
        let document = sdk::DocumentLocation::builder().s3_object(object).build();

        let output = self
            .client
            .start_document_analysis()
            .document_location(document)
            .set_feature_types(Some(features.iter().map(|f| sdk_feature(*f)).collect()))
            .send()
            .await
            .map_err(|e| service_error("StartDocumentAnalysis", e))?;

        output.job_id().map(str::to_string).ok_or_else(|| {
            Error::MalformedResponse("StartDocumentAnalysis returned no job id".to_string())
        })
    }

    async fn fetch(&self, job_id: &str, next_token: Option<&str>) -> Result<AnalysisPage> {
        let output = self
            .client
            .get_document_analysis()
            .job_id(job_id)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| service_error("GetDocumentAnalysis", e))?;

        let job_status = match output.job_status() {
            Some(sdk::JobStatus::InProgress) => JobStatus::InProgress,
            Some(sdk::JobStatus::Succeeded) => JobStatus::Succeeded,
            Some(sdk::JobStatus::Failed) => JobStatus::Failed,
            Some(sdk::JobStatus::PartialSuccess) => JobStatus::PartialSuccess,
            other => {
                return Err(Error::MalformedResponse(format!(
                    "unexpected job status {:?} for job {}",
                    other, job_id
                )))
            }
        };

        Ok(AnalysisPage {
            job_status,
            next_token: output.next_token().map(str::to_string),
            blocks: output.blocks().iter().map(convert_block).collect(),
            status_message: output.status_message().map(str::to_string),
        })
    }
}

impl AnalysisService for TextractClient {
    fn start_analysis(
        &self,
        location: &DocumentLocation,
        features: &[FeatureType],
    ) -> Result<String> {
        self.aws.block_on(self.start(location, features))
    }

    fn get_analysis(&self, job_id: &str, next_token: Option<&str>) -> Result<AnalysisPage> {
        self.aws.block_on(self.fetch(job_id, next_token))
    }
}

fn service_error<E: std::error::Error>(operation: &str, err: E) -> Error {
    Error::Service(format!("Textract {}: {}", operation, DisplayErrorContext(err)))
}

fn sdk_feature(feature: FeatureType) -> sdk::FeatureType {
    match feature {
        FeatureType::Tables => sdk::FeatureType::Tables,
        FeatureType::Forms => sdk::FeatureType::Forms,
    }
}

fn index(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

fn convert_geometry(geometry: &sdk::Geometry) -> Geometry {
    Geometry {
        bounding_box: geometry
            .bounding_box()
            .map(|b| BoundingBox::new(b.left(), b.top(), b.width(), b.height())),
        polygon: geometry
            .polygon()
            .iter()
            .map(|p| Point { x: p.x(), y: p.y() })
            .collect(),
    }
}

fn convert_block(block: &sdk::Block) -> Block {
    let block_type = block
        .block_type()
        .map(|t| BlockType::from(t.as_str().to_string()))
        .unwrap_or_else(|| BlockType::Other(String::new()));

    let mut out = Block::new(block.id().unwrap_or_default(), block_type);
    out.text = block.text().map(str::to_string);
    out.confidence = block.confidence();
    out.geometry = block.geometry().map(convert_geometry);
    out.relationships = block
        .relationships()
        .iter()
        .map(|r| Relationship {
            kind: r
                .r#type()
                .map(|t| RelationshipType::from(t.as_str().to_string()))
                .unwrap_or_else(|| RelationshipType::Other(String::new())),
            ids: r.ids().to_vec(),
        })
        .collect();
    out.selection_status = match block.selection_status() {
        Some(sdk::SelectionStatus::Selected) => Some(SelectionStatus::Selected),
        Some(sdk::SelectionStatus::NotSelected) => Some(SelectionStatus::NotSelected),
        _ => None,
    };
    out.row_index = index(block.row_index());
    out.column_index = index(block.column_index());
    out.row_span = index(block.row_span());
    out.column_span = index(block.column_span());
    out.page = index(block.page());

    if let Some(text_type) = block.text_type() {
        out.extra
            .insert("TextType".to_string(), text_type.as_str().into());
    }
    if !block.entity_types().is_empty() {
        let types = block
            .entity_types()
            .iter()
            .map(|t| serde_json::Value::from(t.as_str()))
            .collect();
        out.extra
            .insert("EntityTypes".to_string(), serde_json::Value::Array(types));
    }
    out
}
