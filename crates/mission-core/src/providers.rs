//! Collaborator seams. The engine consumes these as narrow, pure-looking
//! interfaces and never reaches around them.

use contracts::{IntelKind, IntelligenceEvent, MissionPhase};

/// External intelligence-event generator. The engine only ever calls this
/// constructor contract and treats the returned event as opaque; it never
/// assembles an `IntelligenceEvent` from loose fields itself.
pub trait IntelligenceSource {
    fn generate_event(
        &self,
        kind: IntelKind,
        location_id: &str,
        priority: u8,
        source: &str,
    ) -> IntelligenceEvent;
}

/// Deterministic stand-in used by tests and the playtest driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIntelligence;

impl IntelligenceSource for NullIntelligence {
    fn generate_event(
        &self,
        kind: IntelKind,
        location_id: &str,
        priority: u8,
        source: &str,
    ) -> IntelligenceEvent {
        // Id derived from the inputs so replays stay byte-identical.
        let event_id = format!("intel-{kind:?}-{location_id}-{priority}").to_lowercase();
        IntelligenceEvent::new(event_id, kind, location_id, priority, source)
    }
}

/// Read-only equipment/skill modifier lookup supplied by an external
/// equipment system. Treated as a pure function of agent and phase.
pub trait ModifierProvider {
    fn modifier_for(&self, agent_id: &str, phase: MissionPhase) -> f64;
}

/// No equipment: every modifier is 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitModifiers;

impl ModifierProvider for UnitModifiers {
    fn modifier_for(&self, _agent_id: &str, _phase: MissionPhase) -> f64 {
        1.0
    }
}

/// Both collaborator handles bundled for a phase step.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub modifiers: &'a dyn ModifierProvider,
    pub intel: &'a dyn IntelligenceSource,
}

impl Collaborators<'_> {
    /// Default stubs: no equipment, deterministic intelligence.
    pub fn stub() -> Collaborators<'static> {
        Collaborators {
            modifiers: &UnitModifiers,
            intel: &NullIntelligence,
        }
    }
}
