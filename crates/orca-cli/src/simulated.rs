use async_trait::async_trait;
use orca_core::OrcaResult;
use orca_orchestrator::{
    AgentCapability, CompetitorAnalysisOutput, ContentGenerationOutput, Language, TaskOutput,
    TaskPayload, TaskRecord, VoiceDeploymentOutput,
};
use std::time::{Duration, Instant};

const DEFAULT_WORD_COUNT: u32 = 800;

/// Offline stand-in for a real agent backend.
///
/// Produces deterministic outputs from the request so batches can be run and
/// reported on without any external service.
pub struct SimulatedAgent {
    latency: Duration,
}

impl SimulatedAgent {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl AgentCapability for SimulatedAgent {
    async fn invoke(&self, task: &TaskRecord) -> OrcaResult<TaskOutput> {
        let started = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let output = match &task.payload {
            TaskPayload::ContentGeneration(req) => {
                let lead = req
                    .target_keywords
                    .first()
                    .map(String::as_str)
                    .unwrap_or(req.practice_area.as_str());
                let title = match req.language {
                    Language::En => format!("{}: A Complete Guide to {}", title_case(lead), req.practice_area),
                    Language::Es => format!("{}: Guía Completa de {}", title_case(lead), req.practice_area),
                };
                TaskOutput::ContentGeneration(ContentGenerationOutput {
                    slug: slugify(&title),
                    body: req
                        .target_keywords
                        .iter()
                        .map(|k| format!("## {}\n", title_case(k)))
                        .collect(),
                    title,
                    keywords_used: req.target_keywords.clone(),
                    word_count: req.word_count.unwrap_or(DEFAULT_WORD_COUNT),
                })
            }
            TaskPayload::VoiceAgentDeployment(req) => {
                TaskOutput::VoiceAgentDeployment(VoiceDeploymentOutput {
                    deployment_id: format!("{}-{}", slugify(&req.agent_name), task.id.simple()),
                    agent_name: req.agent_name.clone(),
                    endpoint: req.health_check_endpoint.clone(),
                    deployment_ms: started.elapsed().as_millis() as u64,
                })
            }
            TaskPayload::CompetitorAnalysis(req) => {
                let area = match &req.location {
                    Some(location) => format!("{} in {location}", req.practice_area),
                    None => req.practice_area.clone(),
                };
                TaskOutput::CompetitorAnalysis(CompetitorAnalysisOutput {
                    content_gaps: req
                        .competitor_domains
                        .iter()
                        .map(|d| format!("{d} has no FAQ coverage for {area}"))
                        .collect(),
                    keyword_opportunities: vec![
                        format!("{area} lawyer"),
                        format!("best {area} attorney"),
                    ],
                })
            }
        };
        Ok(output)
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn slugify(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
