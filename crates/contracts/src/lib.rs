//! v1 cross-boundary contracts for the mission engine, campaign layer,
//! narrative consumers, and the playtest driver.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod serde_u64_string;

pub const SCHEMA_VERSION_V1: &str = "1.0";

// ---------------------------------------------------------------------------
// Agent contracts
// ---------------------------------------------------------------------------

/// Availability of an agent. `Captured` and `Dead` are terminal within the
/// engine: no transition leads out of them without an explicit rescue or
/// recovery event handled by an external collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Wounded,
    Captured,
    Dead,
}

impl AgentStatus {
    /// Terminal statuses never transition again inside the engine.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Captured | Self::Dead)
    }

    /// Whether an agent with this status may act in a phase.
    /// Wounded agents act with a penalty; captured/dead agents never act.
    pub fn may_act(self) -> bool {
        matches!(self, Self::Active | Self::Wounded)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Wounded => "wounded",
            Self::Captured => "captured",
            Self::Dead => "dead",
        };
        write!(f, "{label}")
    }
}

/// Bounded psychological vector. Every component lives in `[0.0, 1.0]` and is
/// never NaN; `clamped` is the only way values enter the range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EmotionalState {
    pub fear: f64,
    pub anger: f64,
    pub trauma: f64,
    pub trust: f64,
    pub stress: f64,
}

impl EmotionalState {
    /// A calm baseline state: low arousal, moderate trust.
    pub fn baseline() -> Self {
        Self {
            fear: 0.1,
            anger: 0.1,
            trauma: 0.0,
            trust: 0.5,
            stress: 0.1,
        }
    }

    /// Clamp every component into `[0.0, 1.0]`, mapping NaN to 0.0.
    pub fn clamped(self) -> Self {
        fn clamp01(value: f64) -> f64 {
            if value.is_nan() {
                0.0
            } else {
                value.clamp(0.0, 1.0)
            }
        }
        Self {
            fear: clamp01(self.fear),
            anger: clamp01(self.anger),
            trauma: clamp01(self.trauma),
            trust: clamp01(self.trust),
            stress: clamp01(self.stress),
        }
    }

    /// Component-wise addition of a delta. The result is unclamped; the
    /// registry clamps on application.
    pub fn plus(self, delta: &EmotionalDelta) -> Self {
        Self {
            fear: self.fear + delta.fear,
            anger: self.anger + delta.anger,
            trauma: self.trauma + delta.trauma,
            trust: self.trust + delta.trust,
            stress: self.stress + delta.stress,
        }
    }

    /// True when every component is finite and within `[0.0, 1.0]`.
    pub fn in_bounds(&self) -> bool {
        [self.fear, self.anger, self.trauma, self.trust, self.stress]
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self::baseline()
    }
}

/// A signed change to an emotional state. Components may be any finite value;
/// the registry applies and clamps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct EmotionalDelta {
    pub fear: f64,
    pub anger: f64,
    pub trauma: f64,
    pub trust: f64,
    pub stress: f64,
}

impl EmotionalDelta {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Stimulus categories that can match a recorded trauma trigger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    Violence,
    Capture,
    Betrayal,
    Explosion,
    Pursuit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Family,
    Friend,
    Comrade,
    Romantic,
    Rival,
}

/// A directed relationship edge owned by an external collaborator; the engine
/// reads these when spreading cascade consequences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipEdge {
    pub other_id: String,
    pub kind: RelationshipKind,
}

/// Full agent snapshot as handed across the persistence boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    pub agent_id: String,
    pub status: AgentStatus,
    pub emotional: EmotionalState,
    /// Skill name → proficiency (0–10). Consumed, never mutated, by the engine.
    #[serde(default)]
    pub skills: BTreeMap<String, f64>,
    #[serde(default)]
    pub relationships: Vec<RelationshipEdge>,
    /// Stimulus categories that can set off this agent's trauma.
    #[serde(default)]
    pub trauma_triggers: Vec<StimulusKind>,
}

impl AgentRecord {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            status: AgentStatus::Active,
            emotional: EmotionalState::baseline(),
            skills: BTreeMap::new(),
            relationships: Vec::new(),
            trauma_triggers: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Mission contracts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    Planning,
    Infiltration,
    Execution,
    Extraction,
    Resolution,
}

impl MissionPhase {
    /// Phases where operatives are in the field and casualties can occur.
    pub fn in_the_field(self) -> bool {
        matches!(self, Self::Infiltration | Self::Execution | Self::Extraction)
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Planning => "planning",
            Self::Infiltration => "infiltration",
            Self::Execution => "execution",
            Self::Extraction => "extraction",
            Self::Resolution => "resolution",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    Sabotage,
    Assassination,
    Propaganda,
    Theft,
    Rescue,
}

impl fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Sabotage => "sabotage",
            Self::Assassination => "assassination",
            Self::Propaganda => "propaganda",
            Self::Theft => "theft",
            Self::Rescue => "rescue",
        };
        write!(f, "{label}")
    }
}

/// Target location profile. Ratings run 0–10.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationProfile {
    pub location_id: String,
    pub security: u8,
    pub support: u8,
}

/// Mission configuration handed to the engine fully hydrated. The participant
/// set is fixed at mission start; there is no mid-mission recruitment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionConfig {
    pub schema_version: String,
    pub mission_id: String,
    pub phases: Vec<MissionPhase>,
    pub participants: Vec<String>,
    pub location: LocationProfile,
    pub objective: ObjectiveKind,
}

impl MissionConfig {
    pub fn new(
        mission_id: impl Into<String>,
        participants: Vec<String>,
        location: LocationProfile,
        objective: ObjectiveKind,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission_id: mission_id.into(),
            phases: vec![
                MissionPhase::Planning,
                MissionPhase::Infiltration,
                MissionPhase::Execution,
                MissionPhase::Extraction,
                MissionPhase::Resolution,
            ],
            participants,
            location,
            objective,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase results
// ---------------------------------------------------------------------------

/// Discrete outcome tiers ordered best → worst.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOutcome {
    PerfectSuccess,
    SuccessWithComplications,
    PartialSuccess,
    CompleteFailure,
    CatastrophicFailure,
    Aborted,
}

impl PhaseOutcome {
    /// Rank from best (0) to worst (5). `Aborted` sits past the failures
    /// because nothing was achieved at all.
    pub fn severity(self) -> u8 {
        match self {
            Self::PerfectSuccess => 0,
            Self::SuccessWithComplications => 1,
            Self::PartialSuccess => 2,
            Self::CompleteFailure => 3,
            Self::CatastrophicFailure => 4,
            Self::Aborted => 5,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(
            self,
            Self::PerfectSuccess | Self::SuccessWithComplications | Self::PartialSuccess
        )
    }
}

impl fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PerfectSuccess => "perfect_success",
            Self::SuccessWithComplications => "success_with_complications",
            Self::PartialSuccess => "partial_success",
            Self::CompleteFailure => "complete_failure",
            Self::CatastrophicFailure => "catastrophic_failure",
            Self::Aborted => "aborted",
        };
        write!(f, "{label}")
    }
}

/// A status change suffered during a phase, applied by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Casualty {
    pub agent_id: String,
    pub new_status: AgentStatus,
}

/// Result of resolving one mission phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseResult {
    pub phase: MissionPhase,
    pub outcome: PhaseOutcome,
    /// Computed success probability before the tier roll.
    pub success_probability: f64,
    pub casualties: Vec<Casualty>,
    /// Narrative event ids emitted while resolving this phase, in order.
    pub narrative_event_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Cascading effects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CascadeKind {
    AgentCompromise,
    ResourceShortage,
    ExposureRisk,
    SafehouseBurn,
}

/// Lifecycle of a cascade event. Suppression is always explicit and carries a
/// reason; events are never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CascadeState {
    Pending,
    Applied,
    Suppressed { reason: String },
}

/// A downstream consequence of a phase result. Magnitude feeds the resolver
/// for subsequent phases and missions, never retroactively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CascadeEvent {
    pub cascade_id: String,
    /// Narrative event id of the phase result that raised this cascade.
    pub trigger_event_id: String,
    pub kind: CascadeKind,
    pub magnitude: f64,
    pub state: CascadeState,
    pub affected_agents: Vec<String>,
    pub location_id: String,
}

// ---------------------------------------------------------------------------
// Mission terminal states and reports
// ---------------------------------------------------------------------------

/// Terminal state of a mission run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissionTerminal {
    /// Reached `Resolution` and archived.
    Resolved,
    /// Abort path: empty team, team fear, operator directive, or a
    /// catastrophe before the team reached the objective.
    Aborted,
    /// Catastrophic failure during execution or extraction.
    Disaster,
}

impl fmt::Display for MissionTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Resolved => "resolved",
            Self::Aborted => "aborted",
            Self::Disaster => "disaster",
        };
        write!(f, "{label}")
    }
}

/// Final report handed back once a mission reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionReport {
    pub schema_version: String,
    pub mission_id: String,
    pub terminal: MissionTerminal,
    pub phase_results: Vec<PhaseResult>,
    pub cascade_events: Vec<CascadeEvent>,
    /// Additive cascade magnitude accumulated over the mission, post-cap.
    pub accumulated_magnitude: f64,
    #[serde(with = "serde_u64_string")]
    pub replay_hash: u64,
}

// ---------------------------------------------------------------------------
// Narrative events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeEventType {
    PhaseEntered,
    PhaseResolved,
    CasualtySuffered,
    TraumaTriggered,
    TeamAborted,
    OperatorAborted,
    CascadeRaised,
    CascadeApplied,
    CascadeSuppressed,
    OutcomeDegraded,
    EmotionalShift,
    MissionResolved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorRef {
    pub actor_kind: String,
    pub actor_id: String,
}

impl ActorRef {
    pub fn agent(agent_id: impl Into<String>) -> Self {
        Self {
            actor_kind: "agent".to_string(),
            actor_id: agent_id.into(),
        }
    }
}

/// Structured record in the append-only narrative stream. Consumers render
/// or log; the engine never blocks on them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeEvent {
    pub schema_version: String,
    pub mission_id: String,
    /// Phase index within the mission when the event was emitted.
    pub turn: u64,
    pub event_id: String,
    pub sequence: u64,
    pub event_type: NarrativeEventType,
    pub actors: Vec<ActorRef>,
    #[serde(default)]
    pub caused_by: Vec<String>,
    pub details: Option<Value>,
}

// ---------------------------------------------------------------------------
// Intelligence events (external collaborator contract)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntelKind {
    PatrolShift,
    InformantReport,
    CrackdownWarning,
    SafehouseWatch,
}

/// Versioned intelligence event schema. Fields are private: the engine only
/// goes through `new` and treats the payload as opaque, so a schema change on
/// the generator side cannot silently desynchronize field names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntelligenceEvent {
    schema_version: String,
    event_id: String,
    kind: IntelKind,
    location_id: String,
    priority: u8,
    source: String,
}

impl IntelligenceEvent {
    pub fn new(
        event_id: impl Into<String>,
        kind: IntelKind,
        location_id: impl Into<String>,
        priority: u8,
        source: impl Into<String>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            event_id: event_id.into(),
            kind,
            location_id: location_id.into(),
            priority,
            source: source.into(),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn kind(&self) -> IntelKind {
        self.kind
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

/// Objective difficulty weights. Higher weight makes the location security
/// count for more against the team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectiveDifficulty {
    pub sabotage: f64,
    pub assassination: f64,
    pub propaganda: f64,
    pub theft: f64,
    pub rescue: f64,
}

impl ObjectiveDifficulty {
    pub fn weight(&self, objective: ObjectiveKind) -> f64 {
        match objective {
            ObjectiveKind::Sabotage => self.sabotage,
            ObjectiveKind::Assassination => self.assassination,
            ObjectiveKind::Propaganda => self.propaganda,
            ObjectiveKind::Theft => self.theft,
            ObjectiveKind::Rescue => self.rescue,
        }
    }
}

impl Default for ObjectiveDifficulty {
    fn default() -> Self {
        Self {
            sabotage: 1.0,
            assassination: 1.3,
            propaganda: 0.8,
            theft: 0.9,
            rescue: 1.2,
        }
    }
}

/// Shares that carve the success/failure mass into outcome tiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeBands {
    /// Fraction of success mass that is a perfect success.
    pub perfect_share: f64,
    /// Fraction of the remaining success mass that is clean-ish (the rest is
    /// partial).
    pub clean_share: f64,
    /// Fraction of failure mass that is an ordinary complete failure (the
    /// rest is catastrophic).
    pub complete_share: f64,
}

impl Default for OutcomeBands {
    fn default() -> Self {
        Self {
            perfect_share: 0.25,
            clean_share: 0.45,
            complete_share: 0.8,
        }
    }
}

/// Casualty derivation tuning. All chances are per-agent and fear-weighted,
/// so a frightened agent is the one most likely to be taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CasualtyTuning {
    /// Base chance an agent is lost in a catastrophic failure.
    pub base_risk: f64,
    /// Added chance per point of fear in a catastrophic failure.
    pub fear_weight: f64,
    /// Probability a lost agent is captured rather than killed.
    pub capture_bias: f64,
    /// Base wound chance in an ordinary complete failure.
    pub wound_base_risk: f64,
    /// Added wound chance per point of fear.
    pub wound_fear_weight: f64,
}

impl Default for CasualtyTuning {
    fn default() -> Self {
        Self {
            base_risk: 0.35,
            fear_weight: 0.5,
            capture_bias: 0.6,
            wound_base_risk: 0.25,
            wound_fear_weight: 0.25,
        }
    }
}

/// Magnitudes for each cascade kind. These compose additively within one
/// mission, capped by `EngineConfig::cascade_ceiling`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CascadeMagnitudes {
    pub compromise: f64,
    pub safehouse_burn: f64,
    pub exposure_complete: f64,
    pub exposure_catastrophic: f64,
    pub resource_shortage: f64,
}

impl Default for CascadeMagnitudes {
    fn default() -> Self {
        Self {
            compromise: 0.5,
            safehouse_burn: 0.8,
            exposure_complete: 0.3,
            exposure_catastrophic: 0.7,
            resource_shortage: 0.2,
        }
    }
}

/// Emotional decay tuning. Half-lives are whole in-game hours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecayConfig {
    pub fear_half_life_hours: u64,
    pub stress_half_life_hours: u64,
    /// Trauma is near-persistent; this default is months of in-game time.
    pub trauma_half_life_hours: u64,
    pub fear_baseline: f64,
    pub stress_baseline: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            fear_half_life_hours: 48,
            stress_half_life_hours: 72,
            trauma_half_life_hours: 2_160,
            fear_baseline: 0.1,
            stress_baseline: 0.1,
        }
    }
}

/// All engine tunables. Nothing is hard-coded in the engine: every threshold
/// is read from this config at the point of use, so playtest recalibration
/// never needs a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub schema_version: String,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    /// Mean fear across the eligible team at phase entry that forces an abort.
    pub abort_fear_threshold: f64,
    /// Trauma level at or above which a matching stimulus fires a trigger.
    pub trauma_trigger_threshold: f64,
    /// Multiplier on a wounded agent's effectiveness.
    pub wounded_penalty: f64,
    /// Multiplier on a triggered agent's effectiveness for the phase.
    pub trauma_penalty: f64,
    /// Additive cascade magnitude cap per mission.
    pub cascade_ceiling: f64,
    /// Trust delta applied to agents linked to a captured agent.
    pub cascade_trust_penalty: f64,
    /// Location security heat added per compromise, for future missions.
    pub cascade_security_shift: f64,
    /// Steepness of the security-vs-skill probability curve.
    pub security_pressure: f64,
    pub difficulty: ObjectiveDifficulty,
    pub bands: OutcomeBands,
    pub casualties: CasualtyTuning,
    pub magnitudes: CascadeMagnitudes,
    pub decay: DecayConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            seed: 1337,
            abort_fear_threshold: 0.8,
            trauma_trigger_threshold: 0.7,
            wounded_penalty: 0.6,
            trauma_penalty: 0.5,
            cascade_ceiling: 3.0,
            cascade_trust_penalty: 0.15,
            cascade_security_shift: 1.0,
            security_pressure: 2.0,
            difficulty: ObjectiveDifficulty::default(),
            bands: OutcomeBands::default(),
            casualties: CasualtyTuning::default(),
            magnitudes: CascadeMagnitudes::default(),
            decay: DecayConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_terminality_and_eligibility() {
        assert!(AgentStatus::Captured.is_terminal());
        assert!(AgentStatus::Dead.is_terminal());
        assert!(!AgentStatus::Active.is_terminal());
        assert!(!AgentStatus::Wounded.is_terminal());

        assert!(AgentStatus::Active.may_act());
        assert!(AgentStatus::Wounded.may_act());
        assert!(!AgentStatus::Captured.may_act());
        assert!(!AgentStatus::Dead.may_act());
    }

    #[test]
    fn emotional_clamp_handles_overflow_and_nan() {
        let state = EmotionalState {
            fear: 1.7,
            anger: -0.3,
            trauma: f64::NAN,
            trust: 0.4,
            stress: 2.0,
        }
        .clamped();
        assert!(state.in_bounds());
        assert_eq!(state.fear, 1.0);
        assert_eq!(state.anger, 0.0);
        assert_eq!(state.trauma, 0.0);
    }

    #[test]
    fn outcome_severity_is_ordered_best_to_worst() {
        let ordered = [
            PhaseOutcome::PerfectSuccess,
            PhaseOutcome::SuccessWithComplications,
            PhaseOutcome::PartialSuccess,
            PhaseOutcome::CompleteFailure,
            PhaseOutcome::CatastrophicFailure,
            PhaseOutcome::Aborted,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].severity() < pair[1].severity());
        }
    }

    #[test]
    fn mission_config_defaults_to_full_phase_sequence() {
        let config = MissionConfig::new(
            "m1",
            vec!["a1".into()],
            LocationProfile {
                location_id: "docks".into(),
                security: 5,
                support: 3,
            },
            ObjectiveKind::Sabotage,
        );
        assert_eq!(config.phases.len(), 5);
        assert_eq!(config.phases.last(), Some(&MissionPhase::Resolution));
    }

    #[test]
    fn engine_config_round_trips_through_json() {
        let config = EngineConfig::default();
        let raw = serde_json::to_string(&config).expect("serialize");
        let back: EngineConfig = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(config, back);
    }

    #[test]
    fn intelligence_event_is_built_only_via_constructor() {
        let event = IntelligenceEvent::new("intel-1", IntelKind::PatrolShift, "docks", 3, "ears");
        assert_eq!(event.event_id(), "intel-1");
        assert_eq!(event.kind(), IntelKind::PatrolShift);
        assert_eq!(event.location_id(), "docks");
        assert_eq!(event.priority(), 3);
        assert_eq!(event.source(), "ears");
    }
}
