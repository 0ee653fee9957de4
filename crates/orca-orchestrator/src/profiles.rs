use crate::registry::AgentDescriptor;
use orca_core::TaskType;

/// Default worker roster used when the config declares no agents.
pub fn default_agents() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor::new(SEO_WRITER, [TaskType::ContentGeneration]),
        AgentDescriptor::new(
            BLOG_STRATEGIST,
            [TaskType::ContentGeneration, TaskType::CompetitorAnalysis],
        ),
        AgentDescriptor::new(VOICE_DEPLOYER, [TaskType::VoiceAgentDeployment]),
        AgentDescriptor::new(COMPETITOR_ANALYST, [TaskType::CompetitorAnalysis]),
    ]
}

pub const SEO_WRITER: &str = "seo-writer";
pub const BLOG_STRATEGIST: &str = "blog-strategist";
pub const VOICE_DEPLOYER: &str = "voice-deployer";
pub const COMPETITOR_ANALYST: &str = "competitor-analyst";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_agents_count() {
        assert_eq!(default_agents().len(), 4);
    }

    #[test]
    fn test_all_families_covered() {
        let agents = default_agents();
        for task_type in TaskType::ALL {
            assert!(
                agents.iter().any(|a| a.can_serve(task_type)),
                "no default agent serves {task_type}"
            );
        }
    }

    #[test]
    fn test_names_unique() {
        let agents = default_agents();
        let mut names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), agents.len());
    }
}
