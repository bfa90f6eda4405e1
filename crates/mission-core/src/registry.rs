//! Agent registry: the single source of truth for "which agents may act
//! now". All status and emotional mutation during a mission flows through
//! here; other components compute deltas and hand them over.

use std::collections::BTreeMap;

use contracts::{AgentRecord, AgentStatus, DecayConfig, EmotionalDelta};

use crate::emotion::{self, ElapsedHours};
use crate::error::EngineError;

#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, AgentRecord>,
}

impl AgentRegistry {
    pub fn from_records(records: Vec<AgentRecord>) -> Self {
        let mut agents = BTreeMap::new();
        for record in records {
            agents.insert(record.agent_id.clone(), record);
        }
        Self { agents }
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentRecord> {
        self.agents.get(agent_id)
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &AgentRecord> {
        self.agents.values()
    }

    pub fn into_records(self) -> Vec<AgentRecord> {
        self.agents.into_values().collect()
    }

    /// Agents from `participant_ids` whose status permits acting. Captured
    /// and dead agents are excluded unconditionally. Order follows the input
    /// so results are reproducible. Callers must re-query at every phase
    /// entry; eligibility is never cached.
    pub fn get_eligible(&self, participant_ids: &[String]) -> Vec<String> {
        participant_ids
            .iter()
            .filter(|id| {
                self.agents
                    .get(id.as_str())
                    .map(|record| record.status.may_act())
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Enforce the one-way status lattice `Active → Wounded → {Captured,
    /// Dead}` (with the direct drops allowed). Re-asserting the current
    /// status is a no-op; every other move, in particular anything out of
    /// `Captured` or `Dead`, is an `InvalidTransition`.
    pub fn apply_status_change(
        &mut self,
        agent_id: &str,
        new_status: AgentStatus,
    ) -> Result<(), EngineError> {
        let record = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| EngineError::UnknownAgent(agent_id.to_string()))?;

        if record.status == new_status {
            return Ok(());
        }

        let allowed = match record.status {
            AgentStatus::Active => matches!(
                new_status,
                AgentStatus::Wounded | AgentStatus::Captured | AgentStatus::Dead
            ),
            AgentStatus::Wounded => {
                matches!(new_status, AgentStatus::Captured | AgentStatus::Dead)
            }
            AgentStatus::Captured | AgentStatus::Dead => false,
        };

        if !allowed {
            return Err(EngineError::InvalidTransition {
                agent_id: agent_id.to_string(),
                from: record.status,
                to: new_status,
            });
        }

        record.status = new_status;
        Ok(())
    }

    /// Add a delta to an agent's emotional state, then clamp every component
    /// to `[0, 1]`. The registry is the only writer.
    pub fn apply_emotional_delta(
        &mut self,
        agent_id: &str,
        delta: &EmotionalDelta,
    ) -> Result<(), EngineError> {
        let record = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| EngineError::UnknownAgent(agent_id.to_string()))?;
        record.emotional = record.emotional.plus(delta).clamped();
        Ok(())
    }

    /// Decay every agent's fear/stress over elapsed whole hours, e.g.
    /// between missions. Trauma barely moves per `DecayConfig`.
    pub fn decay_all(&mut self, elapsed: ElapsedHours, config: &DecayConfig) {
        for record in self.agents.values_mut() {
            record.emotional = emotion::decay(&record.emotional, elapsed, config);
        }
    }

    /// Mean fear across the given agents. Returns 0.0 for an empty set.
    pub fn mean_fear(&self, agent_ids: &[String]) -> f64 {
        let fears: Vec<f64> = agent_ids
            .iter()
            .filter_map(|id| self.agents.get(id.as_str()))
            .map(|record| record.emotional.fear)
            .collect();
        if fears.is_empty() {
            0.0
        } else {
            fears.iter().sum::<f64>() / fears.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::EmotionalState;

    fn registry_of(ids: &[&str]) -> AgentRegistry {
        AgentRegistry::from_records(ids.iter().map(|id| AgentRecord::new(*id)).collect())
    }

    fn participant_ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn eligible_excludes_captured_and_dead() {
        let mut registry = registry_of(&["a1", "a2", "a3", "a4"]);
        registry.apply_status_change("a2", AgentStatus::Captured).unwrap();
        registry.apply_status_change("a3", AgentStatus::Dead).unwrap();
        registry.apply_status_change("a4", AgentStatus::Wounded).unwrap();

        let eligible = registry.get_eligible(&participant_ids(&["a1", "a2", "a3", "a4"]));
        // Wounded agents act with penalty; captured/dead never.
        assert_eq!(eligible, vec!["a1".to_string(), "a4".to_string()]);
    }

    #[test]
    fn eligible_ignores_unknown_ids() {
        let registry = registry_of(&["a1"]);
        let eligible = registry.get_eligible(&participant_ids(&["a1", "ghost"]));
        assert_eq!(eligible, vec!["a1".to_string()]);
    }

    #[test]
    fn no_transition_out_of_terminal_statuses() {
        let mut registry = registry_of(&["a1", "a2"]);
        registry.apply_status_change("a1", AgentStatus::Captured).unwrap();
        registry.apply_status_change("a2", AgentStatus::Dead).unwrap();

        for target in [AgentStatus::Active, AgentStatus::Wounded, AgentStatus::Dead] {
            let result = registry.apply_status_change("a1", target);
            assert!(
                matches!(result, Err(EngineError::InvalidTransition { .. })),
                "captured -> {target} must be rejected"
            );
        }
        let result = registry.apply_status_change("a2", AgentStatus::Active);
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
    }

    #[test]
    fn wounded_cannot_recover_inside_the_engine() {
        let mut registry = registry_of(&["a1"]);
        registry.apply_status_change("a1", AgentStatus::Wounded).unwrap();
        let result = registry.apply_status_change("a1", AgentStatus::Active);
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
    }

    #[test]
    fn reasserting_current_status_is_a_noop() {
        let mut registry = registry_of(&["a1"]);
        registry.apply_status_change("a1", AgentStatus::Wounded).unwrap();
        assert!(registry.apply_status_change("a1", AgentStatus::Wounded).is_ok());
        assert_eq!(registry.get("a1").unwrap().status, AgentStatus::Wounded);
    }

    #[test]
    fn emotional_delta_is_applied_and_clamped() {
        let mut registry = registry_of(&["a1"]);
        let delta = EmotionalDelta {
            fear: 5.0,
            trust: -5.0,
            ..EmotionalDelta::none()
        };
        registry.apply_emotional_delta("a1", &delta).unwrap();

        let state = registry.get("a1").unwrap().emotional;
        assert_eq!(state.fear, 1.0);
        assert_eq!(state.trust, 0.0);
        assert!(state.in_bounds());
    }

    #[test]
    fn unknown_agent_is_an_error() {
        let mut registry = registry_of(&["a1"]);
        let result = registry.apply_emotional_delta("ghost", &EmotionalDelta::none());
        assert!(matches!(result, Err(EngineError::UnknownAgent(_))));
    }

    #[test]
    fn mean_fear_over_participants() {
        let mut registry = AgentRegistry::from_records(vec![
            {
                let mut r = AgentRecord::new("a1");
                r.emotional = EmotionalState {
                    fear: 0.9,
                    ..EmotionalState::baseline()
                };
                r
            },
            {
                let mut r = AgentRecord::new("a2");
                r.emotional = EmotionalState {
                    fear: 0.5,
                    ..EmotionalState::baseline()
                };
                r
            },
        ]);
        let ids = participant_ids(&["a1", "a2"]);
        assert!((registry.mean_fear(&ids) - 0.7).abs() < 1e-12);
        assert_eq!(registry.mean_fear(&[]), 0.0);

        // Decay pass lowers fear for everyone.
        registry.decay_all(ElapsedHours(48), &DecayConfig::default());
        assert!(registry.mean_fear(&ids) < 0.7);
    }
}
