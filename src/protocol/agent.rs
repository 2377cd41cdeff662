//! Agent discovery and capability types

use serde::{Deserialize, Serialize};
use url::Url;

use super::{artifact::ArtifactType, error::A2AError};

/// Agent Card for agent discovery
///
/// The Agent Card is published at `/.well-known/agent-card.json` and describes what the agent
/// offers. It is built once at startup and never changes afterwards; construction goes through
/// [`AgentCardBuilder`] so a malformed card can never exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Name of the agent
    pub name: String,

    /// Agent version
    pub version: String,

    /// Human-readable description of the agent
    pub description: String,

    /// Task kinds the agent accepts
    pub capabilities: Vec<String>,

    /// Supports streaming task updates
    #[serde(default)]
    pub streaming: bool,

    /// Artifact types the agent produces
    #[serde(default = "all_artifact_types")]
    pub artifact_types: Vec<ArtifactType>,

    /// Authentication requirements, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthRequirements>,
}

fn all_artifact_types() -> Vec<ArtifactType> {
    vec![ArtifactType::Text, ArtifactType::File, ArtifactType::Data]
}

impl AgentCard {
    /// Start building a card
    pub fn builder(name: impl Into<String>) -> AgentCardBuilder {
        AgentCardBuilder::new(name)
    }

    /// Whether the agent accepts tasks of `kind`
    pub fn supports(&self, kind: &str) -> bool {
        self.capabilities.iter().any(|c| c == kind)
    }

    /// Whether the agent declares artifacts of `kind`
    pub fn produces(&self, kind: ArtifactType) -> bool {
        self.artifact_types.contains(&kind)
    }

    /// Check the card's invariants
    pub fn validate(&self) -> Result<(), A2AError> {
        if self.name.trim().is_empty() {
            return Err(A2AError::InvalidAgentCard("Agent name cannot be empty".into()));
        }
        if self.version.trim().is_empty() {
            return Err(A2AError::InvalidAgentCard(
                "Agent version cannot be empty".into(),
            ));
        }
        if self.capabilities.is_empty() {
            return Err(A2AError::InvalidAgentCard(
                "Agent card must declare at least one capability".into(),
            ));
        }
        if self.capabilities.iter().any(|c| c.trim().is_empty()) {
            return Err(A2AError::InvalidAgentCard(
                "Capability names cannot be empty".into(),
            ));
        }
        if self.artifact_types.is_empty() {
            return Err(A2AError::InvalidAgentCard(
                "Agent card must declare at least one artifact type".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`AgentCard`]
#[derive(Debug, Clone)]
pub struct AgentCardBuilder {
    card: AgentCard,
}

impl AgentCardBuilder {
    /// Create a builder for an agent named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            card: AgentCard {
                name: name.into(),
                version: "0.1.0".to_string(),
                description: String::new(),
                capabilities: Vec::new(),
                streaming: false,
                artifact_types: all_artifact_types(),
                auth: None,
            },
        }
    }

    /// Set the agent version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.card.version = version.into();
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.card.description = description.into();
        self
    }

    /// Declare a supported task kind
    pub fn capability(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        if !self.card.capabilities.contains(&kind) {
            self.card.capabilities.push(kind);
        }
        self
    }

    /// Enable streaming
    pub fn streaming(mut self, enabled: bool) -> Self {
        self.card.streaming = enabled;
        self
    }

    /// Restrict the artifact types the agent produces
    pub fn artifact_types(mut self, types: impl IntoIterator<Item = ArtifactType>) -> Self {
        self.card.artifact_types = types.into_iter().collect();
        self
    }

    /// Add authentication requirements
    pub fn auth(mut self, auth: AuthRequirements) -> Self {
        self.card.auth = Some(auth);
        self
    }

    /// Build the card
    ///
    /// # Errors
    ///
    /// Returns [`A2AError::InvalidAgentCard`] if the card is malformed, e.g. declares no
    /// capability.
    pub fn build(self) -> Result<AgentCard, A2AError> {
        self.card.validate()?;
        Ok(self.card)
    }
}

/// Authentication requirements advertised by the card
///
/// Descriptive only; enforcement belongs to the transport in front of the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthRequirements {
    /// Accepted schemes, any of which satisfies the agent
    pub schemes: Vec<SecurityScheme>,
}

/// API Key security scheme
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySecurityScheme {
    pub description: Option<String>,
    #[serde(rename = "in")]
    pub location: String,
    pub name: String,
}

/// HTTP authentication security scheme
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpAuthSecurityScheme {
    pub description: Option<String>,
    pub scheme: String,
    pub bearer_format: Option<String>,
}

/// OpenID Connect security scheme
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenIdConnectSecurityScheme {
    pub description: Option<String>,
    pub open_id_connect_url: Url,
}

/// Security scheme for authentication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SecurityScheme {
    #[serde(rename = "apiKeySecurityScheme")]
    ApiKey(ApiKeySecurityScheme),
    #[serde(rename = "httpAuthSecurityScheme")]
    HttpAuth(HttpAuthSecurityScheme),
    #[serde(rename = "openIdConnectSecurityScheme")]
    OpenIdConnect(OpenIdConnectSecurityScheme),
}
