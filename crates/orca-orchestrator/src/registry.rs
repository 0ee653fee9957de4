use chrono::{DateTime, Utc};
use orca_core::TaskType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{info, warn};

/// A named worker and the task families it can serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub capabilities: BTreeSet<TaskType>,
    pub active: bool,
    /// Last successful invocation or explicit re-activation. `None` until either happens.
    #[serde(default)]
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// Set when the failure threshold tripped; cleared on recovery or manual status changes.
    #[serde(default)]
    pub deactivated_at: Option<DateTime<Utc>>,
    /// Consecutive connectivity-class failures since the last success.
    #[serde(default)]
    pub consecutive_failures: u32,
    /// Dispatch counter stamp used for least-recently-used selection; 0 = never.
    #[serde(default)]
    pub last_dispatch_seq: u64,
}

impl AgentDescriptor {
    pub fn new(name: impl Into<String>, capabilities: impl IntoIterator<Item = TaskType>) -> Self {
        Self {
            name: name.into(),
            capabilities: capabilities.into_iter().collect(),
            active: true,
            last_heartbeat_at: None,
            deactivated_at: None,
            consecutive_failures: 0,
            last_dispatch_seq: 0,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn can_serve(&self, task_type: TaskType) -> bool {
        self.active && self.capabilities.contains(&task_type)
    }
}

/// Known workers and their liveness.
pub struct AgentRegistry {
    agents: BTreeMap<String, AgentDescriptor>,
    failure_threshold: u32,
    recovery_timeout: Option<Duration>,
    dispatch_seq: u64,
}

impl AgentRegistry {
    /// `failure_threshold` consecutive connectivity failures deactivate an agent.
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            agents: BTreeMap::new(),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout: None,
            dispatch_seq: 0,
        }
    }

    /// Re-activate auto-deactivated agents once `timeout` has passed. `None` disables recovery.
    pub fn with_recovery_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Insert or replace by name.
    pub fn register(&mut self, descriptor: AgentDescriptor) {
        info!(
            agent = %descriptor.name,
            capabilities = ?descriptor.capabilities,
            active = descriptor.active,
            "Registered agent"
        );
        self.agents.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&AgentDescriptor> {
        self.agents.get(name)
    }

    /// Returns false if the agent is unknown.
    pub fn mark_active(&mut self, name: &str) -> bool {
        match self.agents.get_mut(name) {
            Some(agent) => {
                agent.active = true;
                agent.consecutive_failures = 0;
                agent.deactivated_at = None;
                agent.last_heartbeat_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Returns false if the agent is unknown.
    pub fn mark_inactive(&mut self, name: &str) -> bool {
        match self.agents.get_mut(name) {
            Some(agent) => {
                agent.active = false;
                agent.deactivated_at = None;
                true
            }
            None => false,
        }
    }

    /// Successful invocation: heartbeat and a clean failure streak.
    pub fn record_success(&mut self, name: &str) {
        if let Some(agent) = self.agents.get_mut(name) {
            agent.last_heartbeat_at = Some(Utc::now());
            agent.consecutive_failures = 0;
        }
    }

    /// Failed invocation. Only connectivity-class failures count toward the
    /// threshold. Returns true when this call deactivated the agent.
    pub fn record_failure(&mut self, name: &str, connectivity: bool) -> bool {
        let Some(agent) = self.agents.get_mut(name) else {
            return false;
        };
        if !connectivity {
            return false;
        }
        agent.consecutive_failures += 1;
        if agent.active && agent.consecutive_failures >= self.failure_threshold {
            agent.active = false;
            agent.deactivated_at = Some(Utc::now());
            warn!(
                agent = %name,
                failures = agent.consecutive_failures,
                "Agent deactivated after consecutive connectivity failures"
            );
            return true;
        }
        false
    }

    /// Bring back every auto-deactivated agent whose cool-down has elapsed at `now`.
    /// Returns the recovered names.
    pub fn recover_due(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let Some(timeout) = self.recovery_timeout else {
            return Vec::new();
        };
        let mut recovered = Vec::new();
        for agent in self.agents.values_mut() {
            let Some(since) = agent.deactivated_at else {
                continue;
            };
            let elapsed = (now - since).to_std().unwrap_or_default();
            if agent.active || elapsed < timeout {
                continue;
            }
            agent.active = true;
            agent.consecutive_failures = 0;
            agent.deactivated_at = None;
            info!(agent = %agent.name, cooled_down = ?elapsed, "Agent recovered");
            recovered.push(agent.name.clone());
        }
        recovered
    }

    /// Active agents able to serve `task_type`.
    pub fn find_capable(&self, task_type: TaskType) -> Vec<&AgentDescriptor> {
        self.agents
            .values()
            .filter(|a| a.can_serve(task_type))
            .collect()
    }

    pub fn has_capable(&self, task_type: TaskType) -> bool {
        self.agents.values().any(|a| a.can_serve(task_type))
    }

    /// Pick the least recently dispatched capable agent and stamp it.
    /// Ties go to the lexicographically first name.
    pub fn select_for(&mut self, task_type: TaskType) -> Option<String> {
        let name = self
            .agents
            .values()
            .filter(|a| a.can_serve(task_type))
            .min_by_key(|a| a.last_dispatch_seq)
            .map(|a| a.name.clone())?;
        self.dispatch_seq += 1;
        if let Some(agent) = self.agents.get_mut(&name) {
            agent.last_dispatch_seq = self.dispatch_seq;
        }
        Some(name)
    }

    /// `{name → active}`.
    pub fn status(&self) -> BTreeMap<String, bool> {
        self.agents
            .iter()
            .map(|(name, a)| (name.clone(), a.active))
            .collect()
    }

    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.agents.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registry() -> AgentRegistry {
        let mut registry = AgentRegistry::new(3);
        registry.register(AgentDescriptor::new(
            "seo-writer",
            [TaskType::ContentGeneration],
        ));
        registry.register(AgentDescriptor::new(
            "blog-writer",
            [TaskType::ContentGeneration, TaskType::CompetitorAnalysis],
        ));
        registry.register(
            AgentDescriptor::new("voice-deployer", [TaskType::VoiceAgentDeployment]).inactive(),
        );
        registry
    }

    #[test]
    fn test_register_is_upsert() {
        let mut registry = registry();
        assert_eq!(registry.len(), 3);
        registry.register(AgentDescriptor::new(
            "seo-writer",
            [TaskType::CompetitorAnalysis],
        ));
        assert_eq!(registry.len(), 3);
        assert!(registry
            .get("seo-writer")
            .unwrap()
            .capabilities
            .contains(&TaskType::CompetitorAnalysis));
    }

    #[test]
    fn test_find_capable_requires_active() {
        let mut registry = registry();
        assert_eq!(registry.find_capable(TaskType::ContentGeneration).len(), 2);
        assert!(registry
            .find_capable(TaskType::VoiceAgentDeployment)
            .is_empty());

        assert!(registry.mark_active("voice-deployer"));
        assert_eq!(
            registry.find_capable(TaskType::VoiceAgentDeployment)[0].name,
            "voice-deployer"
        );
        assert!(!registry.mark_active("ghost"));
    }

    #[test]
    fn test_select_least_recently_used() {
        let mut registry = registry();
        let first = registry.select_for(TaskType::ContentGeneration).unwrap();
        let second = registry.select_for(TaskType::ContentGeneration).unwrap();
        let third = registry.select_for(TaskType::ContentGeneration).unwrap();
        assert_eq!(first, "blog-writer");
        assert_eq!(second, "seo-writer");
        assert_eq!(third, "blog-writer");
        assert!(registry.select_for(TaskType::VoiceAgentDeployment).is_none());
    }

    #[test]
    fn test_auto_deactivation_after_threshold() {
        let mut registry = registry();
        assert!(!registry.record_failure("seo-writer", true));
        assert!(!registry.record_failure("seo-writer", true));
        assert!(registry.record_failure("seo-writer", true));
        assert!(!registry.get("seo-writer").unwrap().active);
        assert!(!registry.status()["seo-writer"]);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let mut registry = registry();
        registry.record_failure("seo-writer", true);
        registry.record_failure("seo-writer", true);
        registry.record_success("seo-writer");
        assert!(!registry.record_failure("seo-writer", true));
        assert!(registry.get("seo-writer").unwrap().active);
    }

    #[test]
    fn test_non_connectivity_failures_do_not_count() {
        let mut registry = registry();
        for _ in 0..5 {
            assert!(!registry.record_failure("seo-writer", false));
        }
        let agent = registry.get("seo-writer").unwrap();
        assert!(agent.active);
        assert_eq!(agent.consecutive_failures, 0);
    }

    #[test]
    fn test_heartbeat_only_from_real_activity() {
        let mut registry = registry();
        assert!(registry.get("seo-writer").unwrap().last_heartbeat_at.is_none());

        registry.record_success("seo-writer");
        assert!(registry.get("seo-writer").unwrap().last_heartbeat_at.is_some());
        assert!(registry.mark_active("voice-deployer"));
        assert!(registry
            .get("voice-deployer")
            .unwrap()
            .last_heartbeat_at
            .is_some());
    }

    #[test]
    fn test_recovery_after_cool_down() {
        let mut registry =
            AgentRegistry::new(2).with_recovery_timeout(Some(Duration::from_secs(60)));
        registry.register(AgentDescriptor::new("seo-writer", [TaskType::ContentGeneration]));
        registry.record_failure("seo-writer", true);
        assert!(registry.record_failure("seo-writer", true));
        let tripped_at = registry.get("seo-writer").unwrap().deactivated_at.unwrap();

        assert!(registry
            .recover_due(tripped_at + chrono::Duration::seconds(59))
            .is_empty());
        assert!(!registry.has_capable(TaskType::ContentGeneration));

        let recovered = registry.recover_due(tripped_at + chrono::Duration::seconds(60));
        assert_eq!(recovered, vec!["seo-writer".to_string()]);
        let agent = registry.get("seo-writer").unwrap();
        assert!(agent.active);
        assert_eq!(agent.consecutive_failures, 0);
        assert!(agent.deactivated_at.is_none());
    }

    #[test]
    fn test_manual_deactivation_is_not_recovered() {
        let mut registry =
            AgentRegistry::new(1).with_recovery_timeout(Some(Duration::from_secs(1)));
        registry.register(AgentDescriptor::new("seo-writer", [TaskType::ContentGeneration]));
        assert!(registry.mark_inactive("seo-writer"));
        let later = Utc::now() + chrono::Duration::hours(1);
        assert!(registry.recover_due(later).is_empty());

        let mut without = AgentRegistry::new(1);
        without.register(AgentDescriptor::new("seo-writer", [TaskType::ContentGeneration]));
        assert!(without.record_failure("seo-writer", true));
        assert!(without.recover_due(later).is_empty());
    }

    #[test]
    fn test_status_projection() {
        let registry = registry();
        let status = registry.status();
        assert_eq!(status.len(), 3);
        assert!(status["seo-writer"]);
        assert!(!status["voice-deployer"]);
    }
}
