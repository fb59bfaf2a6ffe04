//! JSON rendering for block sets and documents.

use serde::Serialize;

use crate::error::{Error, Result};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize a block set or document to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Other(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalysisDocument, Block};

    #[test]
    fn test_to_json_pretty() {
        let doc = AnalysisDocument::from_blocks(vec![Block::line("l1", "Hello")]);

        let json = to_json(&doc, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"Blocks\""));
        assert!(json.contains("\"BlockType\": \"LINE\""));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let doc = AnalysisDocument::from_blocks(vec![Block::page("p1")]);

        let json = to_json(&doc, JsonFormat::Compact).unwrap();
        assert_eq!(json, r#"{"Blocks":[{"BlockType":"PAGE","Id":"p1"}]}"#);
    }
}
