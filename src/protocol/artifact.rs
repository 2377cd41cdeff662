//! Typed task outputs

use std::{fmt, str::FromStr};

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::error::A2AError;

/// Recognized artifact kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// Plain text; content is a non-empty JSON string
    Text,

    /// A file; content is a [`FileContent`] object
    File,

    /// Structured data; content is a JSON object or array
    Data,
}

impl ArtifactType {
    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Text => "text",
            ArtifactType::File => "file",
            ArtifactType::Data => "data",
        }
    }

    /// Check that `content` has the shape this type requires
    pub fn check_content(&self, content: &Value) -> Result<(), A2AError> {
        match self {
            ArtifactType::Text => match content.as_str() {
                Some(text) if !text.is_empty() => Ok(()),
                Some(_) => Err(A2AError::InvalidArtifactContent(
                    "Text artifact cannot be empty".into(),
                )),
                None => Err(A2AError::InvalidArtifactContent(
                    "Text artifact content must be a string".into(),
                )),
            },
            ArtifactType::File => {
                let file: FileContent = serde_json::from_value(content.clone()).map_err(|e| {
                    A2AError::InvalidArtifactContent(format!("Malformed file content: {}", e))
                })?;
                file.check()
            }
            ArtifactType::Data => {
                if content.is_object() || content.is_array() {
                    Ok(())
                } else {
                    Err(A2AError::InvalidArtifactContent(
                        "Data artifact content must be an object or array".into(),
                    ))
                }
            }
        }
    }
}

impl FromStr for ArtifactType {
    type Err = A2AError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ArtifactType::Text),
            "file" => Ok(ArtifactType::File),
            "data" => Ok(ArtifactType::Data),
            other => Err(A2AError::InvalidArtifactType {
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content of a file artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// Name of the file
    pub name: String,

    /// MIME type of the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// URI reference to the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_with_uri: Option<String>,

    /// Base64-encoded file content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_with_bytes: Option<String>,
}

impl FileContent {
    /// File referenced by URI
    pub fn from_uri(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            file_with_uri: Some(uri.into()),
            file_with_bytes: None,
        }
    }

    /// File carried inline; `bytes` are base64-encoded here
    pub fn from_bytes(name: impl Into<String>, bytes: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            file_with_uri: None,
            file_with_bytes: Some(general_purpose::STANDARD.encode(bytes)),
        }
    }

    /// Set the MIME type
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    fn check(&self) -> Result<(), A2AError> {
        if self.name.is_empty() {
            return Err(A2AError::InvalidArtifactContent(
                "File name cannot be empty".into(),
            ));
        }

        match (&self.file_with_uri, &self.file_with_bytes) {
            (Some(uri), None) => {
                Url::parse(uri).map_err(|e| {
                    A2AError::InvalidArtifactContent(format!("Invalid file URI {}: {}", uri, e))
                })?;
                Ok(())
            }
            (None, Some(bytes)) => {
                general_purpose::STANDARD.decode(bytes).map_err(|e| {
                    A2AError::InvalidArtifactContent(format!("File bytes are not base64: {}", e))
                })?;
                Ok(())
            }
            (Some(_), Some(_)) => Err(A2AError::InvalidArtifactContent(
                "File must have either URI or bytes content, not both".into(),
            )),
            (None, None) => Err(A2AError::InvalidArtifactContent(
                "File must have either URI or bytes content".into(),
            )),
        }
    }
}

/// An immutable output produced by a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Unique identifier of the artifact
    pub id: String,

    /// The task that produced it
    pub task_id: String,

    /// Artifact kind
    #[serde(rename = "type")]
    pub kind: ArtifactType,

    /// Payload, shaped according to `kind`
    pub content: Value,

    /// When the artifact was created
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Check the artifact's invariants
    pub fn validate(&self) -> Result<(), A2AError> {
        if self.id.is_empty() {
            return Err(A2AError::InvalidArtifactContent(
                "Artifact ID cannot be empty".into(),
            ));
        }
        if self.task_id.is_empty() {
            return Err(A2AError::InvalidArtifactContent(
                "Artifact task ID cannot be empty".into(),
            ));
        }
        self.kind.check_content(&self.content)
    }

    /// Text content, for text artifacts
    pub fn text(&self) -> Option<&str> {
        match self.kind {
            ArtifactType::Text => self.content.as_str(),
            _ => None,
        }
    }

    /// File content, for file artifacts
    pub fn file(&self) -> Option<FileContent> {
        match self.kind {
            ArtifactType::File => serde_json::from_value(self.content.clone()).ok(),
            _ => None,
        }
    }
}

/// Build a validated artifact for `task_id`
///
/// # Errors
///
/// - [`A2AError::InvalidArtifactType`] if `kind` is not a recognized type
/// - [`A2AError::InvalidArtifactContent`] if `content` does not match the type
pub fn create_artifact(
    kind: &str,
    content: Value,
    task_id: impl Into<String>,
) -> Result<Artifact, A2AError> {
    let kind: ArtifactType = kind.parse()?;
    let artifact = Artifact {
        id: Uuid::now_v7().to_string(),
        task_id: task_id.into(),
        kind,
        content,
        created_at: Utc::now(),
    };
    artifact.validate()?;
    Ok(artifact)
}

/// Whether an artifact satisfies its invariants
///
/// Applied on construction and again to every artifact received over the wire.
pub fn validate_artifact(artifact: &Artifact) -> bool {
    artifact.validate().is_ok()
}
