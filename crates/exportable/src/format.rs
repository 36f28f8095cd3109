//! Textual encodings of documents

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{FormatError, FormatResult};

/// Supported document encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Detect the format from a path suffix
    pub fn from_path(path: &Path) -> FormatResult<Format> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| FormatError::Unsupported(path.display().to_string()))?;
        extension.parse()
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Yaml => "application/yaml",
        }
    }

    pub fn encode(self, document: &Document) -> FormatResult<String> {
        self.encode_value(document)
    }

    pub fn decode(self, input: &str) -> FormatResult<Document> {
        self.decode_value(input)
    }

    /// Encode any serializable value in this format
    pub fn encode_value<T: Serialize + ?Sized>(self, value: &T) -> FormatResult<String> {
        match self {
            Format::Json => Ok(serde_json::to_string_pretty(value)?),
            Format::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    /// Decode any deserializable value in this format
    pub fn decode_value<T: for<'de> Deserialize<'de>>(self, input: &str) -> FormatResult<T> {
        match self {
            Format::Json => Ok(serde_json::from_str(input)?),
            Format::Yaml => Ok(serde_yaml::from_str(input)?),
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Format::Json
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" => Ok(Format::Yaml),
            _ => Err(FormatError::Unsupported(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentNode;
    use crate::value::attributes;

    #[test]
    fn test_parse_names() {
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("YAML".parse::<Format>().unwrap(), Format::Yaml);
        assert!(matches!(
            "xml".parse::<Format>(),
            Err(FormatError::Unsupported(name)) if name == "xml"
        ));
    }

    #[test]
    fn test_from_path_suffix() {
        assert_eq!(Format::from_path(Path::new("/tmp/order_7.json")).unwrap(), Format::Json);
        assert_eq!(Format::from_path(Path::new("order.yaml")).unwrap(), Format::Yaml);
        assert!(Format::from_path(Path::new("order.csv")).is_err());
        assert!(Format::from_path(Path::new("order")).is_err());
    }

    #[test]
    fn test_encodings_are_structurally_identical() {
        let document = Document::One(DocumentNode::new(
            "Order",
            attributes([("id", 7), ("total", 42)]),
        ));

        for format in [Format::Json, Format::Yaml] {
            let text = format.encode(&document).unwrap();
            assert_eq!(format.decode(&text).unwrap(), document, "format {}", format);
        }
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(Format::Json.decode("{not json"), Err(FormatError::Json(_))));
        assert!(matches!(Format::Yaml.decode("class_name: [unclosed"), Err(FormatError::Yaml(_))));
    }
}
