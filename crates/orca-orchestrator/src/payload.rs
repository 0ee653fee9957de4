//! Per-family request and output structures.
//!
//! Payloads and outputs are tagged unions keyed by [`TaskType`]: every family
//! has one concrete request struct and one concrete output struct, so fields
//! are known statically instead of being carried as loose JSON.

use orca_core::{OrcaError, OrcaResult, TaskType};
use serde::{Deserialize, Serialize};

/// Content language for generated pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

/// Platform a voice agent is deployed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoicePlatform {
    Retell,
    CrewAi,
    Chat,
    Automation,
}

// --- Requests ---

/// Generate an SEO article for a practice area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGenerationRequest {
    pub practice_area: String,
    pub target_keywords: Vec<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub word_count: Option<u32>,
}

impl ContentGenerationRequest {
    pub fn new(practice_area: impl Into<String>, target_keywords: Vec<String>) -> Self {
        Self {
            practice_area: practice_area.into(),
            target_keywords,
            language: Language::default(),
            word_count: None,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_word_count(mut self, words: u32) -> Self {
        self.word_count = Some(words);
        self
    }
}

/// Deploy (or redeploy) a voice agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDeploymentRequest {
    pub agent_name: String,
    pub platform: VoicePlatform,
    pub languages: Vec<Language>,
    #[serde(default)]
    pub health_check_endpoint: Option<String>,
    #[serde(default)]
    pub rollback_enabled: bool,
}

/// Analyse competitor sites for content gaps and keyword opportunities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorAnalysisRequest {
    pub practice_area: String,
    pub competitor_domains: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// A task request, tagged by family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskPayload {
    ContentGeneration(ContentGenerationRequest),
    VoiceAgentDeployment(VoiceDeploymentRequest),
    CompetitorAnalysis(CompetitorAnalysisRequest),
}

impl TaskPayload {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskPayload::ContentGeneration(_) => TaskType::ContentGeneration,
            TaskPayload::VoiceAgentDeployment(_) => TaskType::VoiceAgentDeployment,
            TaskPayload::CompetitorAnalysis(_) => TaskType::CompetitorAnalysis,
        }
    }

    /// Check the family-specific shape of the request.
    pub fn validate(&self) -> OrcaResult<()> {
        match self {
            TaskPayload::ContentGeneration(req) => {
                require_text("practice_area", &req.practice_area)?;
                require_items("target_keywords", &req.target_keywords)?;
                if let Some(words) = req.word_count {
                    if words == 0 || words > MAX_WORD_COUNT {
                        return Err(OrcaError::Validation(format!(
                            "word_count must be between 1 and {MAX_WORD_COUNT}, got {words}"
                        )));
                    }
                }
                Ok(())
            }
            TaskPayload::VoiceAgentDeployment(req) => {
                require_text("agent_name", &req.agent_name)?;
                if req.languages.is_empty() {
                    return Err(OrcaError::Validation(
                        "languages must list at least one language".into(),
                    ));
                }
                if let Some(endpoint) = &req.health_check_endpoint {
                    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                        return Err(OrcaError::Validation(format!(
                            "health_check_endpoint must be an http(s) URL, got '{endpoint}'"
                        )));
                    }
                }
                Ok(())
            }
            TaskPayload::CompetitorAnalysis(req) => {
                require_text("practice_area", &req.practice_area)?;
                require_items("competitor_domains", &req.competitor_domains)
            }
        }
    }
}

const MAX_WORD_COUNT: u32 = 10_000;

fn require_text(field: &str, value: &str) -> OrcaResult<()> {
    if value.trim().is_empty() {
        return Err(OrcaError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_items(field: &str, values: &[String]) -> OrcaResult<()> {
    if values.is_empty() {
        return Err(OrcaError::Validation(format!(
            "{field} must contain at least one entry"
        )));
    }
    if let Some(pos) = values.iter().position(|v| v.trim().is_empty()) {
        return Err(OrcaError::Validation(format!("{field}[{pos}] is blank")));
    }
    Ok(())
}

// --- Outputs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGenerationOutput {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub keywords_used: Vec<String>,
    pub word_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceDeploymentOutput {
    pub deployment_id: String,
    pub agent_name: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub deployment_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorAnalysisOutput {
    pub content_gaps: Vec<String>,
    pub keyword_opportunities: Vec<String>,
}

/// A capability's result, tagged by family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskOutput {
    ContentGeneration(ContentGenerationOutput),
    VoiceAgentDeployment(VoiceDeploymentOutput),
    CompetitorAnalysis(CompetitorAnalysisOutput),
}

impl TaskOutput {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskOutput::ContentGeneration(_) => TaskType::ContentGeneration,
            TaskOutput::VoiceAgentDeployment(_) => TaskType::VoiceAgentDeployment,
            TaskOutput::CompetitorAnalysis(_) => TaskType::CompetitorAnalysis,
        }
    }
}
