//! Cascading effects engine: translates a phase result into downstream
//! consequences for other agents, the location, and future missions.
//! Magnitudes compose additively within one mission, capped at the
//! configured ceiling; exceeding it clamps and logs, never crashes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use contracts::{
    AgentStatus, CascadeEvent, CascadeKind, CascadeState, EmotionalDelta, EngineConfig, IntelKind,
    IntelligenceEvent, LocationProfile, MissionPhase, ObjectiveKind, PhaseOutcome, PhaseResult,
};

use crate::error::EngineError;
use crate::providers::IntelligenceSource;
use crate::registry::AgentRegistry;

/// Mission-scoped context for one propagation cycle.
#[derive(Debug, Clone)]
pub struct MissionContext<'a> {
    pub mission_id: &'a str,
    pub phase: MissionPhase,
    pub location: &'a LocationProfile,
    pub objective: ObjectiveKind,
}

/// Accumulated cascade pressure for one mission, plus the security heat it
/// leaves behind for future missions at affected locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CascadeLedger {
    accumulated: f64,
    security_shift_by_location: BTreeMap<String, f64>,
    next_cascade_seq: u64,
}

impl CascadeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Magnitude accumulated so far (post-cap). Resolver input for
    /// subsequent phases, never retroactive.
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    pub fn security_shift(&self, location_id: &str) -> f64 {
        self.security_shift_by_location
            .get(location_id)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn security_shifts(&self) -> &BTreeMap<String, f64> {
        &self.security_shift_by_location
    }

    /// Add a magnitude, clamping at the ceiling. Returns the overflow error
    /// when the clamp engaged; the caller logs it and carries on.
    fn absorb(&mut self, magnitude: f64, ceiling: f64) -> Option<EngineError> {
        let raw = self.accumulated + magnitude.max(0.0);
        if raw > ceiling {
            self.accumulated = ceiling;
            Some(EngineError::CascadeOverflow {
                accumulated: raw,
                ceiling,
            })
        } else {
            self.accumulated = raw;
            None
        }
    }

    fn next_cascade_id(&mut self, mission_id: &str) -> String {
        let seq = self.next_cascade_seq;
        self.next_cascade_seq += 1;
        format!("cas-{mission_id}-{seq}")
    }
}

/// Result of one propagation cycle.
#[derive(Debug)]
pub struct Propagation {
    pub events: Vec<CascadeEvent>,
    /// First overflow hit while absorbing magnitudes, if any.
    pub overflow: Option<EngineError>,
    /// Intelligence events requested from the external generator.
    pub intel: Vec<IntelligenceEvent>,
}

/// Agents sharing a relationship edge with `agent_id`, in either direction,
/// excluding the agent itself and anyone already out of play.
fn linked_agents(registry: &AgentRegistry, agent_id: &str) -> Vec<String> {
    let mut linked = BTreeSet::new();
    for record in registry.records() {
        if record.agent_id == agent_id {
            for edge in &record.relationships {
                linked.insert(edge.other_id.clone());
            }
        } else if record.relationships.iter().any(|e| e.other_id == agent_id) {
            linked.insert(record.agent_id.clone());
        }
    }
    linked
        .into_iter()
        .filter(|id| {
            id != agent_id
                && registry
                    .get(id)
                    .map(|r| r.status.may_act())
                    .unwrap_or(false)
        })
        .collect()
}

/// Translate a phase result into cascade events and apply the ones that
/// survive suppression. Later events in the same resolution cycle may
/// invalidate earlier ones; suppression is explicit and carries a reason.
pub fn propagate(
    result: &PhaseResult,
    ctx: &MissionContext<'_>,
    trigger_event_id: &str,
    registry: &mut AgentRegistry,
    ledger: &mut CascadeLedger,
    intel_source: &dyn IntelligenceSource,
    config: &EngineConfig,
) -> Propagation {
    let magnitudes = &config.magnitudes;
    let mut pending: Vec<CascadeEvent> = Vec::new();

    // Outcome-level consequences first, then per-casualty consequences, so
    // a casualty-driven event can supersede an outcome-driven one.
    match result.outcome {
        PhaseOutcome::CompleteFailure => {
            let cascade_id = ledger.next_cascade_id(ctx.mission_id);
            pending.push(CascadeEvent {
                cascade_id,
                trigger_event_id: trigger_event_id.to_string(),
                kind: CascadeKind::ExposureRisk,
                magnitude: magnitudes.exposure_complete,
                state: CascadeState::Pending,
                affected_agents: Vec::new(),
                location_id: ctx.location.location_id.clone(),
            });
        }
        PhaseOutcome::CatastrophicFailure => {
            let cascade_id = ledger.next_cascade_id(ctx.mission_id);
            pending.push(CascadeEvent {
                cascade_id,
                trigger_event_id: trigger_event_id.to_string(),
                kind: CascadeKind::ExposureRisk,
                magnitude: magnitudes.exposure_catastrophic,
                state: CascadeState::Pending,
                affected_agents: Vec::new(),
                location_id: ctx.location.location_id.clone(),
            });
        }
        PhaseOutcome::SuccessWithComplications => {
            let cascade_id = ledger.next_cascade_id(ctx.mission_id);
            pending.push(CascadeEvent {
                cascade_id,
                trigger_event_id: trigger_event_id.to_string(),
                kind: CascadeKind::ResourceShortage,
                magnitude: magnitudes.resource_shortage,
                state: CascadeState::Pending,
                affected_agents: Vec::new(),
                location_id: ctx.location.location_id.clone(),
            });
        }
        PhaseOutcome::PerfectSuccess | PhaseOutcome::PartialSuccess | PhaseOutcome::Aborted => {}
    }

    for casualty in &result.casualties {
        if casualty.new_status != AgentStatus::Captured {
            continue;
        }
        let linked = linked_agents(registry, &casualty.agent_id);
        let mut affected = vec![casualty.agent_id.clone()];
        affected.extend(linked);

        let cascade_id = ledger.next_cascade_id(ctx.mission_id);
        pending.push(CascadeEvent {
            cascade_id,
            trigger_event_id: trigger_event_id.to_string(),
            kind: CascadeKind::AgentCompromise,
            magnitude: magnitudes.compromise,
            state: CascadeState::Pending,
            affected_agents: affected,
            location_id: ctx.location.location_id.clone(),
        });

        // A capture before the team is clear of the approach burns the
        // safehouse: the captured agent knows where it is.
        if matches!(ctx.phase, MissionPhase::Planning | MissionPhase::Infiltration) {
            let cascade_id = ledger.next_cascade_id(ctx.mission_id);
            pending.push(CascadeEvent {
                cascade_id,
                trigger_event_id: trigger_event_id.to_string(),
                kind: CascadeKind::SafehouseBurn,
                magnitude: magnitudes.safehouse_burn,
                state: CascadeState::Pending,
                affected_agents: vec![casualty.agent_id.clone()],
                location_id: ctx.location.location_id.clone(),
            });
        }
    }

    // Suppression pass: a later event in the same cycle can invalidate an
    // earlier one.
    for i in 0..pending.len() {
        if pending[i].kind == CascadeKind::AgentCompromise
            && ctx.objective == ObjectiveKind::Rescue
            && result.outcome.is_success()
        {
            pending[i].state = CascadeState::Suppressed {
                reason: "agent freed in the same resolution cycle by the rescue".to_string(),
            };
            continue;
        }
        if pending[i].kind == CascadeKind::ExposureRisk {
            let superseded = pending[i + 1..].iter().any(|later| {
                later.kind == CascadeKind::SafehouseBurn
                    && later.location_id == pending[i].location_id
            });
            if superseded {
                pending[i].state = CascadeState::Suppressed {
                    reason: "superseded by safehouse burn at the same location".to_string(),
                };
            }
        }
    }

    // Apply pass.
    let mut overflow = None;
    let mut intel = Vec::new();
    for event in &mut pending {
        if matches!(event.state, CascadeState::Suppressed { .. }) {
            continue;
        }

        if let Some(err) = ledger.absorb(event.magnitude, config.cascade_ceiling) {
            overflow.get_or_insert(err);
        }

        match event.kind {
            CascadeKind::AgentCompromise => {
                let delta = EmotionalDelta {
                    trust: -config.cascade_trust_penalty,
                    ..EmotionalDelta::none()
                };
                for linked_id in event.affected_agents.iter().skip(1) {
                    // Linked agents were filtered to live ones at collection
                    // time; a failed lookup here is a no-op, not a fault.
                    let _ = registry.apply_emotional_delta(linked_id, &delta);
                }
                *ledger
                    .security_shift_by_location
                    .entry(event.location_id.clone())
                    .or_insert(0.0) += config.cascade_security_shift * event.magnitude;
            }
            CascadeKind::SafehouseBurn => {
                *ledger
                    .security_shift_by_location
                    .entry(event.location_id.clone())
                    .or_insert(0.0) += config.cascade_security_shift * event.magnitude;
                intel.push(intel_source.generate_event(
                    IntelKind::SafehouseWatch,
                    &event.location_id,
                    (event.magnitude * 10.0).clamp(0.0, 10.0) as u8,
                    "cascade-engine",
                ));
            }
            CascadeKind::ExposureRisk | CascadeKind::ResourceShortage => {}
        }

        event.state = CascadeState::Applied;
    }

    Propagation {
        events: pending,
        overflow,
        intel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AgentRecord, Casualty, RelationshipEdge, RelationshipKind};

    use crate::providers::NullIntelligence;

    fn location() -> LocationProfile {
        LocationProfile {
            location_id: "docks".to_string(),
            security: 5,
            support: 3,
        }
    }

    fn linked_registry() -> AgentRegistry {
        let mut captured = AgentRecord::new("a1");
        captured.relationships.push(RelationshipEdge {
            other_id: "a2".to_string(),
            kind: RelationshipKind::Comrade,
        });
        let friend = AgentRecord::new("a2");
        let mut backlink = AgentRecord::new("a3");
        backlink.relationships.push(RelationshipEdge {
            other_id: "a1".to_string(),
            kind: RelationshipKind::Family,
        });
        AgentRegistry::from_records(vec![captured, friend, backlink])
    }

    fn capture_result(phase: MissionPhase) -> PhaseResult {
        PhaseResult {
            phase,
            outcome: PhaseOutcome::CatastrophicFailure,
            success_probability: 0.2,
            casualties: vec![Casualty {
                agent_id: "a1".to_string(),
                new_status: AgentStatus::Captured,
            }],
            narrative_event_ids: Vec::new(),
        }
    }

    #[test]
    fn capture_compromises_and_penalizes_linked_agents() {
        let config = EngineConfig::default();
        let mut registry = linked_registry();
        let mut ledger = CascadeLedger::new();
        let loc = location();
        let ctx = MissionContext {
            mission_id: "m1",
            phase: MissionPhase::Execution,
            location: &loc,
            objective: ObjectiveKind::Sabotage,
        };
        let trust_before = registry.get("a2").unwrap().emotional.trust;

        let propagation = propagate(
            &capture_result(MissionPhase::Execution),
            &ctx,
            "evt-2-9",
            &mut registry,
            &mut ledger,
            &NullIntelligence,
            &config,
        );

        let compromise = propagation
            .events
            .iter()
            .find(|e| e.kind == CascadeKind::AgentCompromise)
            .expect("compromise raised");
        assert_eq!(compromise.state, CascadeState::Applied);
        assert_eq!(compromise.trigger_event_id, "evt-2-9");
        // Both directions of the relationship graph are affected.
        assert!(compromise.affected_agents.contains(&"a2".to_string()));
        assert!(compromise.affected_agents.contains(&"a3".to_string()));

        let trust_after = registry.get("a2").unwrap().emotional.trust;
        assert!((trust_before - trust_after - config.cascade_trust_penalty).abs() < 1e-12);

        // Location heat recorded for future missions.
        assert!(ledger.security_shift("docks") > 0.0);
        assert!(ledger.accumulated() > 0.0);
    }

    #[test]
    fn capture_during_infiltration_burns_the_safehouse() {
        let config = EngineConfig::default();
        let mut registry = linked_registry();
        let mut ledger = CascadeLedger::new();
        let loc = location();
        let ctx = MissionContext {
            mission_id: "m1",
            phase: MissionPhase::Infiltration,
            location: &loc,
            objective: ObjectiveKind::Sabotage,
        };

        let propagation = propagate(
            &capture_result(MissionPhase::Infiltration),
            &ctx,
            "evt-1-4",
            &mut registry,
            &mut ledger,
            &NullIntelligence,
            &config,
        );

        let burn = propagation
            .events
            .iter()
            .find(|e| e.kind == CascadeKind::SafehouseBurn)
            .expect("safehouse burned");
        assert_eq!(burn.state, CascadeState::Applied);
        // The burn requests an intelligence event from the collaborator.
        assert_eq!(propagation.intel.len(), 1);
        assert_eq!(propagation.intel[0].location_id(), "docks");

        // The same cycle's exposure risk is superseded, not silently dropped.
        let exposure = propagation
            .events
            .iter()
            .find(|e| e.kind == CascadeKind::ExposureRisk)
            .expect("exposure still present");
        assert!(matches!(exposure.state, CascadeState::Suppressed { .. }));
    }

    #[test]
    fn rescue_success_suppresses_same_cycle_compromise() {
        let config = EngineConfig::default();
        let mut registry = linked_registry();
        let mut ledger = CascadeLedger::new();
        let loc = location();
        let ctx = MissionContext {
            mission_id: "m1",
            phase: MissionPhase::Execution,
            location: &loc,
            objective: ObjectiveKind::Rescue,
        };
        let result = PhaseResult {
            phase: MissionPhase::Execution,
            outcome: PhaseOutcome::PartialSuccess,
            success_probability: 0.6,
            casualties: vec![Casualty {
                agent_id: "a1".to_string(),
                new_status: AgentStatus::Captured,
            }],
            narrative_event_ids: Vec::new(),
        };
        let trust_before = registry.get("a2").unwrap().emotional.trust;

        let propagation = propagate(
            &result,
            &ctx,
            "evt-2-1",
            &mut registry,
            &mut ledger,
            &NullIntelligence,
            &config,
        );

        let compromise = propagation
            .events
            .iter()
            .find(|e| e.kind == CascadeKind::AgentCompromise)
            .expect("compromise exists");
        assert!(matches!(compromise.state, CascadeState::Suppressed { .. }));

        // Suppressed events contribute nothing: no trust penalty, no heat.
        assert_eq!(registry.get("a2").unwrap().emotional.trust, trust_before);
        assert_eq!(ledger.accumulated(), 0.0);
    }

    #[test]
    fn magnitude_overflow_clamps_at_ceiling() {
        let mut config = EngineConfig::default();
        config.cascade_ceiling = 0.5;
        let mut registry = linked_registry();
        let mut ledger = CascadeLedger::new();
        let loc = location();
        let ctx = MissionContext {
            mission_id: "m1",
            phase: MissionPhase::Infiltration,
            location: &loc,
            objective: ObjectiveKind::Sabotage,
        };

        let propagation = propagate(
            &capture_result(MissionPhase::Infiltration),
            &ctx,
            "evt-1-0",
            &mut registry,
            &mut ledger,
            &NullIntelligence,
            &config,
        );

        assert!(matches!(
            propagation.overflow,
            Some(EngineError::CascadeOverflow { .. })
        ));
        assert_eq!(ledger.accumulated(), 0.5);
    }

    #[test]
    fn clean_success_raises_nothing() {
        let config = EngineConfig::default();
        let mut registry = linked_registry();
        let mut ledger = CascadeLedger::new();
        let loc = location();
        let ctx = MissionContext {
            mission_id: "m1",
            phase: MissionPhase::Execution,
            location: &loc,
            objective: ObjectiveKind::Theft,
        };
        let result = PhaseResult {
            phase: MissionPhase::Execution,
            outcome: PhaseOutcome::PerfectSuccess,
            success_probability: 0.8,
            casualties: Vec::new(),
            narrative_event_ids: Vec::new(),
        };

        let propagation = propagate(
            &result,
            &ctx,
            "evt-2-0",
            &mut registry,
            &mut ledger,
            &NullIntelligence,
            &config,
        );
        assert!(propagation.events.is_empty());
        assert_eq!(ledger.accumulated(), 0.0);
    }
}
