//! Campaign-level agent store spanning missions. Agents deploy to at most
//! one mission at a time: checkout hands a mission-local registry to the
//! engine, commit merges the survivors back along with the cascade heat the
//! mission left behind at its locations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use contracts::{AgentRecord, DecayConfig, LocationProfile};

use crate::cascade::CascadeLedger;
use crate::emotion::{self, ElapsedHours};
use crate::error::EngineError;
use crate::registry::AgentRegistry;

/// Long-lived agent roster plus the security consequences of past missions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignStore {
    agents: BTreeMap<String, AgentRecord>,
    /// Agent id → mission id currently holding the agent.
    deployed: BTreeMap<String, String>,
    /// Security heat by location, accumulated from committed ledgers.
    security_heat: BTreeMap<String, f64>,
}

impl CampaignStore {
    pub fn new(records: Vec<AgentRecord>) -> Self {
        let mut agents = BTreeMap::new();
        for record in records {
            agents.insert(record.agent_id.clone(), record);
        }
        Self {
            agents,
            deployed: BTreeMap::new(),
            security_heat: BTreeMap::new(),
        }
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentRecord> {
        self.agents.get(agent_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &AgentRecord> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Mission currently holding the agent, if any.
    pub fn deployed_on(&self, agent_id: &str) -> Option<&str> {
        self.deployed.get(agent_id).map(String::as_str)
    }

    /// Recruit or replace an agent. Rejected while the agent is deployed;
    /// the mission-local copy would silently win on commit otherwise.
    pub fn upsert(&mut self, record: AgentRecord) -> Result<(), EngineError> {
        if self.deployed.contains_key(&record.agent_id) {
            return Err(EngineError::AgentUnavailable(record.agent_id));
        }
        self.agents.insert(record.agent_id.clone(), record);
        Ok(())
    }

    /// Move the named agents onto a mission. All-or-nothing: any unknown or
    /// already-deployed agent fails the whole checkout with no state change.
    pub fn checkout(
        &mut self,
        mission_id: &str,
        agent_ids: &[String],
    ) -> Result<AgentRegistry, EngineError> {
        for agent_id in agent_ids {
            if !self.agents.contains_key(agent_id) {
                return Err(EngineError::UnknownAgent(agent_id.clone()));
            }
            if self.deployed.contains_key(agent_id) {
                return Err(EngineError::AgentUnavailable(agent_id.clone()));
            }
        }

        let mut records = Vec::with_capacity(agent_ids.len());
        for agent_id in agent_ids {
            if let Some(record) = self.agents.get(agent_id) {
                records.push(record.clone());
            }
            self.deployed
                .insert(agent_id.clone(), mission_id.to_string());
        }
        Ok(AgentRegistry::from_records(records))
    }

    /// Merge a finished mission back: updated agent records become canonical
    /// and the ledger's security shifts persist for future missions. Every
    /// record must have been checked out to this mission.
    pub fn commit(
        &mut self,
        mission_id: &str,
        registry: AgentRegistry,
        ledger: &CascadeLedger,
    ) -> Result<(), EngineError> {
        for record in registry.records() {
            match self.deployed.get(&record.agent_id) {
                Some(holder) if holder == mission_id => {}
                Some(_) => {
                    return Err(EngineError::AgentUnavailable(record.agent_id.clone()));
                }
                None => {
                    return Err(EngineError::UnknownAgent(record.agent_id.clone()));
                }
            }
        }

        for record in registry.into_records() {
            self.deployed.remove(&record.agent_id);
            self.agents.insert(record.agent_id.clone(), record);
        }
        for (location_id, heat) in ledger.security_shifts() {
            *self
                .security_heat
                .entry(location_id.clone())
                .or_insert(0.0) += heat;
        }
        Ok(())
    }

    pub fn security_heat(&self, location_id: &str) -> f64 {
        self.security_heat.get(location_id).copied().unwrap_or(0.0)
    }

    /// Base security plus accumulated heat, rounded and clamped to 0-10.
    pub fn effective_security(&self, location: &LocationProfile) -> u8 {
        let shifted = f64::from(location.security) + self.security_heat(&location.location_id);
        shifted.round().clamp(0.0, 10.0) as u8
    }

    /// Profile to hand the next mission at this location, heat applied.
    pub fn heated_location(&self, location: &LocationProfile) -> LocationProfile {
        LocationProfile {
            location_id: location.location_id.clone(),
            security: self.effective_security(location),
            support: location.support,
        }
    }

    /// Downtime emotional decay for everyone currently at rest. Deployed
    /// agents are skipped; their mission-local copies are authoritative.
    pub fn decay_all(&mut self, elapsed: ElapsedHours, config: &DecayConfig) {
        for (agent_id, record) in self.agents.iter_mut() {
            if self.deployed.contains_key(agent_id) {
                continue;
            }
            record.emotional = emotion::decay(&record.emotional, elapsed, config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::EmotionalState;

    fn store() -> CampaignStore {
        CampaignStore::new(vec![
            AgentRecord::new("a1"),
            AgentRecord::new("a2"),
            AgentRecord::new("a3"),
        ])
    }

    #[test]
    fn double_checkout_is_rejected_without_state_change() {
        let mut store = store();
        store
            .checkout("m1", &["a1".to_string(), "a2".to_string()])
            .expect("first checkout");

        let err = store
            .checkout("m2", &["a3".to_string(), "a1".to_string()])
            .expect_err("a1 is deployed");
        assert!(matches!(err, EngineError::AgentUnavailable(ref id) if id == "a1"));

        // All-or-nothing: a3 stayed free despite being listed first.
        assert_eq!(store.deployed_on("a3"), None);
        store
            .checkout("m2", &["a3".to_string()])
            .expect("a3 still available");
    }

    #[test]
    fn commit_makes_mission_results_canonical_and_frees_agents() {
        let mut store = store();
        let mut registry = store
            .checkout("m1", &["a1".to_string()])
            .expect("checkout");
        registry
            .apply_status_change("a1", contracts::AgentStatus::Wounded)
            .expect("wound");

        store
            .commit("m1", registry, &CascadeLedger::new())
            .expect("commit");

        assert_eq!(
            store.get("a1").map(|r| r.status),
            Some(contracts::AgentStatus::Wounded)
        );
        assert_eq!(store.deployed_on("a1"), None);
    }

    #[test]
    fn capture_excludes_the_agent_from_later_missions_too() {
        let mut store = store();
        let ids: Vec<String> = vec!["a1".to_string(), "a2".to_string()];
        let mut registry = store.checkout("m1", &ids).expect("checkout");
        registry
            .apply_status_change("a1", contracts::AgentStatus::Captured)
            .expect("capture");
        store
            .commit("m1", registry, &CascadeLedger::new())
            .expect("commit");

        // The next mission sees the capture and filters the agent out.
        let registry = store.checkout("m2", &ids).expect("checkout");
        assert_eq!(registry.get_eligible(&ids), vec!["a2".to_string()]);
    }

    #[test]
    fn commit_to_the_wrong_mission_is_rejected() {
        let mut store = store();
        let registry = store
            .checkout("m1", &["a1".to_string()])
            .expect("checkout");

        let err = store
            .commit("m2", registry, &CascadeLedger::new())
            .expect_err("wrong mission");
        assert!(matches!(err, EngineError::AgentUnavailable(_)));
        // Still deployed to m1; nothing merged.
        assert_eq!(store.deployed_on("a1"), Some("m1"));
    }

    #[test]
    fn effective_security_includes_heat_and_clamps() {
        let mut store = store();
        store
            .security_heat
            .insert("docks".to_string(), 1.6);
        let docks = LocationProfile {
            location_id: "docks".to_string(),
            security: 5,
            support: 3,
        };
        assert_eq!(store.effective_security(&docks), 7);

        store
            .security_heat
            .insert("docks".to_string(), 40.0);
        assert_eq!(store.effective_security(&docks), 10);
    }

    #[test]
    fn decay_skips_deployed_agents() {
        let mut store = store();
        for record in store.agents.values_mut() {
            record.emotional = EmotionalState {
                fear: 0.8,
                ..EmotionalState::baseline()
            };
        }
        store
            .checkout("m1", &["a1".to_string()])
            .expect("checkout");

        let config = DecayConfig::default();
        store.decay_all(ElapsedHours(96), &config);

        let resting = store.get("a2").expect("a2").emotional.fear;
        let deployed = store.get("a1").expect("a1").emotional.fear;
        assert!(resting < 0.8);
        assert_eq!(deployed, 0.8);
    }
}
