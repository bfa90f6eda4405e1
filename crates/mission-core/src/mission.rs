//! Mission phase state machine. Drives one mission from `Planning` to a
//! terminal state, pulling eligible agents from the registry at every phase
//! entry, invoking the resolver, applying results back through the registry,
//! and handing the phase result to the cascading effects engine.
//!
//! A phase always completes to a result before state is observed; an
//! external abort directive lands between phases as an explicit `Aborted`
//! transition, never an error.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use contracts::{
    ActorRef, AgentRecord, AgentStatus, CascadeEvent, EmotionalDelta, EngineConfig,
    IntelligenceEvent, MissionConfig, MissionPhase, MissionReport, MissionTerminal,
    NarrativeEvent, NarrativeEventType, ObjectiveKind, PhaseOutcome, PhaseResult, StimulusKind,
    SCHEMA_VERSION_V1,
};

use crate::cascade::{self, CascadeLedger, MissionContext};
use crate::emotion;
use crate::error::EngineError;
use crate::narrative::NarrativeLog;
use crate::providers::Collaborators;
use crate::registry::AgentRegistry;
use crate::resolver::{self, Participant, ResolveRequest, Resolution};
use crate::rng::{phase_seed, MissionRng};

// ---------------------------------------------------------------------------
// Phase flavor tables
// ---------------------------------------------------------------------------

/// Stimulus an agent is exposed to during a phase; matched against recorded
/// trauma triggers. Planning happens in the safehouse and carries none.
fn phase_stimulus(phase: MissionPhase, objective: ObjectiveKind) -> Option<StimulusKind> {
    match phase {
        MissionPhase::Planning | MissionPhase::Resolution => None,
        MissionPhase::Infiltration | MissionPhase::Extraction => Some(StimulusKind::Pursuit),
        MissionPhase::Execution => Some(match objective {
            ObjectiveKind::Sabotage => StimulusKind::Explosion,
            ObjectiveKind::Assassination | ObjectiveKind::Rescue => StimulusKind::Violence,
            ObjectiveKind::Theft | ObjectiveKind::Propaganda => StimulusKind::Pursuit,
        }),
    }
}

/// Skill consulted for each phase.
fn relevant_skill(phase: MissionPhase, objective: ObjectiveKind) -> &'static str {
    match phase {
        MissionPhase::Planning | MissionPhase::Resolution => "tactics",
        MissionPhase::Infiltration => "stealth",
        MissionPhase::Extraction => "evasion",
        MissionPhase::Execution => match objective {
            ObjectiveKind::Sabotage => "demolitions",
            ObjectiveKind::Assassination => "marksmanship",
            ObjectiveKind::Propaganda => "rhetoric",
            ObjectiveKind::Theft => "larceny",
            ObjectiveKind::Rescue => "tactics",
        },
    }
}

/// Squad-wide emotional deltas by outcome, applied by the registry to every
/// surviving participant after the phase.
fn outcome_delta(outcome: PhaseOutcome) -> EmotionalDelta {
    match outcome {
        PhaseOutcome::PerfectSuccess => EmotionalDelta {
            fear: -0.10,
            stress: -0.05,
            trust: 0.05,
            ..EmotionalDelta::none()
        },
        PhaseOutcome::SuccessWithComplications => EmotionalDelta {
            fear: -0.05,
            stress: 0.05,
            trust: 0.02,
            ..EmotionalDelta::none()
        },
        PhaseOutcome::PartialSuccess => EmotionalDelta {
            fear: 0.05,
            stress: 0.05,
            ..EmotionalDelta::none()
        },
        PhaseOutcome::CompleteFailure => EmotionalDelta {
            fear: 0.15,
            anger: 0.10,
            stress: 0.15,
            trust: -0.05,
            ..EmotionalDelta::none()
        },
        PhaseOutcome::CatastrophicFailure => EmotionalDelta {
            fear: 0.30,
            anger: 0.15,
            trauma: 0.15,
            stress: 0.25,
            trust: -0.10,
            ..EmotionalDelta::none()
        },
        PhaseOutcome::Aborted => EmotionalDelta {
            stress: 0.05,
            ..EmotionalDelta::none()
        },
    }
}

/// Extra delta for agents who watched a teammate go down.
fn witness_delta() -> EmotionalDelta {
    EmotionalDelta {
        fear: 0.10,
        trauma: 0.10,
        ..EmotionalDelta::none()
    }
}

// ---------------------------------------------------------------------------
// Step report
// ---------------------------------------------------------------------------

/// What one `step` did. Contained errors (degradations, overflow, per-agent
/// update failures) are reported here as well as narrated in the log.
#[derive(Debug)]
pub struct StepReport {
    pub phase: Option<MissionPhase>,
    pub terminal: Option<MissionTerminal>,
    pub errors: Vec<EngineError>,
}

// ---------------------------------------------------------------------------
// MissionEngine
// ---------------------------------------------------------------------------

/// Single-threaded, synchronous engine for one mission. Owns a mission-local
/// registry view; the same agents must not be concurrently owned by another
/// mission (the campaign registry enforces that).
#[derive(Debug, Clone)]
pub struct MissionEngine {
    config: EngineConfig,
    mission: MissionConfig,
    registry: AgentRegistry,
    ledger: CascadeLedger,
    log: NarrativeLog,
    cascade_events: Vec<CascadeEvent>,
    intel_events: Vec<IntelligenceEvent>,
    phase_results: Vec<PhaseResult>,
    cursor: usize,
    terminal: Option<MissionTerminal>,
    pending_abort: Option<String>,
}

impl MissionEngine {
    /// Validate the mission configuration against the hydrated registry.
    /// Structural problems here are the only errors fatal to a mission.
    pub fn new(
        config: EngineConfig,
        mission: MissionConfig,
        registry: AgentRegistry,
    ) -> Result<Self, EngineError> {
        if mission.participants.is_empty() {
            return Err(EngineError::MissionConfig(
                "mission has no participants".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for id in &mission.participants {
            if !seen.insert(id.as_str()) {
                return Err(EngineError::MissionConfig(format!(
                    "participant {id} listed twice"
                )));
            }
            if !registry.contains(id) {
                return Err(EngineError::MissionConfig(format!(
                    "participant {id} is not in the agent snapshot"
                )));
            }
        }
        if mission.phases.is_empty() {
            return Err(EngineError::MissionConfig("mission has no phases".to_string()));
        }
        if mission.phases.last() != Some(&MissionPhase::Resolution) {
            return Err(EngineError::MissionConfig(
                "mission must end with the resolution phase".to_string(),
            ));
        }
        if mission.phases.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(EngineError::MissionConfig(
                "phases must be in canonical order without repeats".to_string(),
            ));
        }
        if mission.location.security > 10 || mission.location.support > 10 {
            return Err(EngineError::MissionConfig(
                "location ratings run 0-10".to_string(),
            ));
        }

        let log = NarrativeLog::new(mission.mission_id.clone());
        Ok(Self {
            config,
            mission,
            registry,
            ledger: CascadeLedger::new(),
            log,
            cascade_events: Vec::new(),
            intel_events: Vec::new(),
            phase_results: Vec::new(),
            cursor: 0,
            terminal: None,
            pending_abort: None,
        })
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Hand the mission-local registry back, e.g. to the campaign store.
    pub fn into_registry(self) -> AgentRegistry {
        self.registry
    }

    pub fn mission(&self) -> &MissionConfig {
        &self.mission
    }

    pub fn narrative_events(&self) -> &[NarrativeEvent] {
        self.log.events()
    }

    pub fn phase_results(&self) -> &[PhaseResult] {
        &self.phase_results
    }

    pub fn cascade_events(&self) -> &[CascadeEvent] {
        &self.cascade_events
    }

    /// Intelligence events requested from the external generator so far.
    pub fn intel_events(&self) -> &[IntelligenceEvent] {
        &self.intel_events
    }

    pub fn cascade_ledger(&self) -> &CascadeLedger {
        &self.ledger
    }

    pub fn terminal(&self) -> Option<MissionTerminal> {
        self.terminal
    }

    /// Phase the next `step` will enter, `None` once terminal.
    pub fn current_phase(&self) -> Option<MissionPhase> {
        if self.terminal.is_some() {
            None
        } else {
            self.mission.phases.get(self.cursor).copied()
        }
    }

    pub fn replay_hash(&self) -> u64 {
        self.log.replay_hash()
    }

    /// Operator abort directive. Takes effect between phases as an explicit
    /// `Aborted` transition; a phase in flight always completes first.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.terminal.is_none() {
            self.pending_abort = Some(reason.into());
        }
    }

    /// Resolve the next phase. Returns what happened; errors local to one
    /// agent or one phase are contained, narrated, and reported without
    /// stopping the mission.
    pub fn step(&mut self, collab: &Collaborators<'_>) -> StepReport {
        if let Some(terminal) = self.terminal {
            return StepReport {
                phase: None,
                terminal: Some(terminal),
                errors: Vec::new(),
            };
        }

        let phase = self.mission.phases[self.cursor];
        let turn = self.cursor as u64;
        let mut errors: Vec<EngineError> = Vec::new();
        let mut event_ids: Vec<String> = Vec::new();

        // Operator abort lands here, between phases.
        if let Some(reason) = self.pending_abort.take() {
            let id = self.log.emit(
                turn,
                NarrativeEventType::OperatorAborted,
                Vec::new(),
                Some(json!({ "reason": reason })),
            );
            event_ids.push(id);
            self.record_result(phase, PhaseOutcome::Aborted, 0.0, Vec::new(), event_ids);
            self.terminalize(turn, MissionTerminal::Aborted, json!({ "cause": "operator" }));
            return StepReport {
                phase: Some(phase),
                terminal: self.terminal,
                errors,
            };
        }

        let entered_id = self.log.emit(
            turn,
            NarrativeEventType::PhaseEntered,
            Vec::new(),
            Some(json!({ "phase": phase.to_string() })),
        );
        event_ids.push(entered_id);

        // Resolution is bookkeeping: summarize and archive.
        if phase == MissionPhase::Resolution {
            let overall = self.overall_outcome();
            self.record_result(phase, overall, 1.0, Vec::new(), event_ids);
            self.terminalize(
                turn,
                MissionTerminal::Resolved,
                json!({ "overall_outcome": overall.to_string() }),
            );
            return StepReport {
                phase: Some(phase),
                terminal: self.terminal,
                errors,
            };
        }

        // (a) Fresh eligibility query; never cached across phases.
        let eligible = self.registry.get_eligible(&self.mission.participants);

        // (b) Nobody left who can act: forced abort, complete failure.
        if eligible.is_empty() {
            let id = self.log.emit(
                turn,
                NarrativeEventType::TeamAborted,
                Vec::new(),
                Some(json!({ "reason": "no eligible agents" })),
            );
            event_ids.push(id);
            self.record_result(phase, PhaseOutcome::CompleteFailure, 0.0, Vec::new(), event_ids);
            self.terminalize(turn, MissionTerminal::Aborted, json!({ "cause": "no_agents" }));
            return StepReport {
                phase: Some(phase),
                terminal: self.terminal,
                errors,
            };
        }

        // (e) Cautious-team abort, checked before the resolver ever runs.
        let mean_fear = self.registry.mean_fear(&eligible);
        if mean_fear >= self.config.abort_fear_threshold {
            let id = self.log.emit(
                turn,
                NarrativeEventType::TeamAborted,
                eligible.iter().map(ActorRef::agent).collect(),
                Some(json!({
                    "reason": "team fear over threshold",
                    "mean_fear": mean_fear,
                    "threshold": self.config.abort_fear_threshold,
                })),
            );
            event_ids.push(id);
            self.record_result(phase, PhaseOutcome::Aborted, 0.0, Vec::new(), event_ids);
            self.terminalize(turn, MissionTerminal::Aborted, json!({ "cause": "team_fear" }));
            return StepReport {
                phase: Some(phase),
                terminal: self.terminal,
                errors,
            };
        }

        // Trauma triggers reduce the triggered agents' contribution.
        let mut triggered: BTreeSet<String> = BTreeSet::new();
        if let Some(stimulus) = phase_stimulus(phase, self.mission.objective) {
            for agent_id in &eligible {
                let Some(record) = self.registry.get(agent_id) else {
                    continue;
                };
                if let Some(trauma) = emotion::check_trauma_trigger(
                    &record.emotional,
                    stimulus,
                    &record.trauma_triggers,
                    self.config.trauma_trigger_threshold,
                ) {
                    let id = self.log.emit(
                        turn,
                        NarrativeEventType::TraumaTriggered,
                        vec![ActorRef::agent(agent_id)],
                        Some(json!({
                            "stimulus": format!("{:?}", trauma.stimulus).to_lowercase(),
                            "trauma_level": trauma.trauma_level,
                        })),
                    );
                    event_ids.push(id);
                    triggered.insert(agent_id.clone());
                }
            }
        }

        // (c) Resolve, with effectiveness precomputed per agent.
        let mut participants: Vec<Participant> = Vec::new();
        for agent_id in &eligible {
            let Some(record) = self.registry.get(agent_id) else {
                continue;
            };
            let mut effectiveness = emotion::effectiveness_modifier(&record.emotional);
            if record.status == AgentStatus::Wounded {
                effectiveness *= self.config.wounded_penalty;
            }
            if triggered.contains(agent_id) {
                effectiveness *= self.config.trauma_penalty;
            }
            effectiveness *= collab.modifiers.modifier_for(agent_id, phase);

            let skill = record
                .skills
                .get(relevant_skill(phase, self.mission.objective))
                .copied()
                .unwrap_or(1.0);

            participants.push(Participant {
                agent_id: agent_id.clone(),
                status: record.status,
                effectiveness,
                fear: record.emotional.fear,
                skill,
            });
        }

        let mut rng = MissionRng::new(phase_seed(
            self.config.seed,
            &self.mission.mission_id,
            turn,
        ));
        let request = ResolveRequest {
            phase,
            participants: &participants,
            location: &self.mission.location,
            objective: self.mission.objective,
            cascade_magnitude: self.ledger.accumulated(),
            config: &self.config,
        };

        // (f) A resolver error degrades this phase only.
        let resolution = match resolver::resolve(&request, &mut rng) {
            Ok(resolution) => resolution,
            Err(err) => {
                let id = self.log.emit(
                    turn,
                    NarrativeEventType::OutcomeDegraded,
                    Vec::new(),
                    Some(json!({
                        "error": err.to_string(),
                        "fallback": PhaseOutcome::CompleteFailure.to_string(),
                    })),
                );
                event_ids.push(id);
                errors.push(err);
                Resolution {
                    outcome: PhaseOutcome::CompleteFailure,
                    success_probability: 0.0,
                    casualties: Vec::new(),
                }
            }
        };

        let resolved_id = self.log.emit_caused_by(
            turn,
            NarrativeEventType::PhaseResolved,
            eligible.iter().map(ActorRef::agent).collect(),
            Some(json!({
                "phase": phase.to_string(),
                "outcome": resolution.outcome.to_string(),
                "success_probability": resolution.success_probability,
            })),
            vec![event_ids[0].clone()],
        );
        event_ids.push(resolved_id.clone());

        // (g) Casualties flow through the registry; a rejected transition is
        // fatal for that update only.
        let mut applied_casualties = Vec::new();
        for casualty in &resolution.casualties {
            match self
                .registry
                .apply_status_change(&casualty.agent_id, casualty.new_status)
            {
                Ok(()) => {
                    let id = self.log.emit_caused_by(
                        turn,
                        NarrativeEventType::CasualtySuffered,
                        vec![ActorRef::agent(&casualty.agent_id)],
                        Some(json!({ "new_status": casualty.new_status.to_string() })),
                        vec![resolved_id.clone()],
                    );
                    event_ids.push(id);
                    applied_casualties.push(casualty.clone());
                }
                Err(err) => {
                    let id = self.log.emit_caused_by(
                        turn,
                        NarrativeEventType::OutcomeDegraded,
                        vec![ActorRef::agent(&casualty.agent_id)],
                        Some(json!({ "error": err.to_string() })),
                        vec![resolved_id.clone()],
                    );
                    event_ids.push(id);
                    errors.push(err);
                }
            }
        }

        // (h) Emotional aftermath for survivors.
        let squad_delta = outcome_delta(resolution.outcome);
        let witnessed = !applied_casualties.is_empty();
        for agent_id in &eligible {
            let still_acting = self
                .registry
                .get(agent_id)
                .map(|r| r.status.may_act())
                .unwrap_or(false);
            if !still_acting {
                continue;
            }
            let mut delta = squad_delta;
            if witnessed {
                let extra = witness_delta();
                delta.fear += extra.fear;
                delta.trauma += extra.trauma;
            }
            if applied_casualties
                .iter()
                .any(|c| c.agent_id == *agent_id && c.new_status == AgentStatus::Wounded)
            {
                delta.trauma += 0.20;
            }
            if let Err(err) = self.registry.apply_emotional_delta(agent_id, &delta) {
                errors.push(err);
            }
        }
        let shift_id = self.log.emit_caused_by(
            turn,
            NarrativeEventType::EmotionalShift,
            eligible.iter().map(ActorRef::agent).collect(),
            Some(json!({
                "outcome": resolution.outcome.to_string(),
                "witnessed_casualties": applied_casualties.len(),
            })),
            vec![resolved_id.clone()],
        );
        event_ids.push(shift_id);

        // (i) Cascade propagation; may itself mutate the registry.
        let provisional = PhaseResult {
            phase,
            outcome: resolution.outcome,
            success_probability: resolution.success_probability,
            casualties: applied_casualties.clone(),
            narrative_event_ids: Vec::new(),
        };
        let ctx = MissionContext {
            mission_id: &self.mission.mission_id,
            phase,
            location: &self.mission.location,
            objective: self.mission.objective,
        };
        let propagation = cascade::propagate(
            &provisional,
            &ctx,
            &resolved_id,
            &mut self.registry,
            &mut self.ledger,
            collab.intel,
            &self.config,
        );
        if let Some(err) = propagation.overflow {
            let id = self.log.emit_caused_by(
                turn,
                NarrativeEventType::OutcomeDegraded,
                Vec::new(),
                Some(json!({ "error": err.to_string() })),
                vec![resolved_id.clone()],
            );
            event_ids.push(id);
            errors.push(err);
        }
        for cascade_event in &propagation.events {
            let event_type = match cascade_event.state {
                contracts::CascadeState::Applied => NarrativeEventType::CascadeApplied,
                contracts::CascadeState::Suppressed { .. } => NarrativeEventType::CascadeSuppressed,
                contracts::CascadeState::Pending => NarrativeEventType::CascadeRaised,
            };
            let id = self.log.emit_caused_by(
                turn,
                event_type,
                cascade_event
                    .affected_agents
                    .iter()
                    .map(ActorRef::agent)
                    .collect(),
                Some(json!({
                    "cascade_id": cascade_event.cascade_id,
                    "kind": format!("{:?}", cascade_event.kind).to_lowercase(),
                    "magnitude": cascade_event.magnitude,
                })),
                vec![resolved_id.clone()],
            );
            event_ids.push(id);
        }
        self.cascade_events.extend(propagation.events);
        self.intel_events.extend(propagation.intel);

        self.record_result(
            phase,
            resolution.outcome,
            resolution.success_probability,
            applied_casualties,
            event_ids,
        );

        // (j) Next state.
        match resolution.outcome {
            PhaseOutcome::CatastrophicFailure
                if matches!(phase, MissionPhase::Execution | MissionPhase::Extraction) =>
            {
                self.terminalize(turn, MissionTerminal::Disaster, json!({ "cause": "catastrophe" }));
            }
            PhaseOutcome::CatastrophicFailure => {
                // The team scatters before reaching the objective.
                self.terminalize(turn, MissionTerminal::Aborted, json!({ "cause": "catastrophe" }));
            }
            _ => {
                self.cursor += 1;
                if self.cursor >= self.mission.phases.len() {
                    self.terminalize(turn, MissionTerminal::Resolved, json!({ "cause": "complete" }));
                }
            }
        }

        StepReport {
            phase: Some(phase),
            terminal: self.terminal,
            errors,
        }
    }

    /// Drive the mission to a terminal state and archive it as a report.
    pub fn run(&mut self, collab: &Collaborators<'_>) -> MissionReport {
        let terminal = loop {
            let report = self.step(collab);
            if let Some(terminal) = report.terminal {
                break terminal;
            }
        };

        MissionReport {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission_id: self.mission.mission_id.clone(),
            terminal,
            phase_results: self.phase_results.clone(),
            cascade_events: self.cascade_events.clone(),
            accumulated_magnitude: self.ledger.accumulated(),
            replay_hash: self.log.replay_hash(),
        }
    }

    fn record_result(
        &mut self,
        phase: MissionPhase,
        outcome: PhaseOutcome,
        success_probability: f64,
        casualties: Vec<contracts::Casualty>,
        narrative_event_ids: Vec<String>,
    ) {
        self.phase_results.push(PhaseResult {
            phase,
            outcome,
            success_probability,
            casualties,
            narrative_event_ids,
        });
    }

    fn terminalize(&mut self, turn: u64, terminal: MissionTerminal, details: serde_json::Value) {
        self.log.emit(
            turn,
            NarrativeEventType::MissionResolved,
            Vec::new(),
            Some(json!({ "terminal": terminal.to_string(), "details": details })),
        );
        self.terminal = Some(terminal);
    }

    /// Mission-level outcome summarized at resolution: the execution phase's
    /// outcome when one was resolved, otherwise the worst field result.
    fn overall_outcome(&self) -> PhaseOutcome {
        if let Some(result) = self
            .phase_results
            .iter()
            .find(|r| r.phase == MissionPhase::Execution)
        {
            return result.outcome;
        }
        self.phase_results
            .iter()
            .max_by_key(|r| r.outcome.severity())
            .map(|r| r.outcome)
            .unwrap_or(PhaseOutcome::CompleteFailure)
    }

    // -----------------------------------------------------------------------
    // Snapshot / restore across the persistence boundary
    // -----------------------------------------------------------------------

    /// Full engine state as a serde value. The engine does no I/O; the
    /// embedder stores this wherever it likes.
    pub fn snapshot(&self) -> MissionSnapshot {
        MissionSnapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            config: self.config.clone(),
            mission: self.mission.clone(),
            records: self.registry.clone().into_records(),
            cursor: self.cursor as u64,
            terminal: self.terminal,
            pending_abort: self.pending_abort.clone(),
            phase_results: self.phase_results.clone(),
            cascade_events: self.cascade_events.clone(),
            intel_events: self.intel_events.clone(),
            ledger: self.ledger.clone(),
            log: self.log.clone(),
        }
    }

    /// Resume from a snapshot. Because phase seeds are derived, not carried
    /// as RNG state, a restored engine replays identically to one that never
    /// stopped.
    pub fn restore(snapshot: MissionSnapshot) -> Result<Self, EngineError> {
        // A terminal mission may legitimately carry cursor == len after the
        // final advance; a live one must still point at a real phase.
        let cursor = snapshot.cursor as usize;
        let phase_count = snapshot.mission.phases.len();
        let cursor_valid = if snapshot.terminal.is_some() {
            cursor <= phase_count
        } else {
            cursor < phase_count
        };
        if !cursor_valid {
            return Err(EngineError::MissionConfig(
                "snapshot cursor past the end of the phase list".to_string(),
            ));
        }
        Ok(Self {
            config: snapshot.config,
            registry: AgentRegistry::from_records(snapshot.records),
            ledger: snapshot.ledger,
            log: snapshot.log,
            cascade_events: snapshot.cascade_events,
            intel_events: snapshot.intel_events,
            phase_results: snapshot.phase_results,
            cursor: snapshot.cursor as usize,
            terminal: snapshot.terminal,
            pending_abort: snapshot.pending_abort,
            mission: snapshot.mission,
        })
    }
}

/// Serializable image of a mission in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSnapshot {
    pub schema_version: String,
    pub config: EngineConfig,
    pub mission: MissionConfig,
    pub records: Vec<AgentRecord>,
    pub cursor: u64,
    pub terminal: Option<MissionTerminal>,
    pub pending_abort: Option<String>,
    pub phase_results: Vec<PhaseResult>,
    pub cascade_events: Vec<CascadeEvent>,
    #[serde(default)]
    pub intel_events: Vec<IntelligenceEvent>,
    pub ledger: CascadeLedger,
    pub log: NarrativeLog,
}
