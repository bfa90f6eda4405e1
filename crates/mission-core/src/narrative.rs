//! Append-only narrative event log plus the deterministic replay hash.
//! Consumers (rendering, logging) drain the buffer; the engine never blocks
//! on them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use contracts::{ActorRef, NarrativeEvent, NarrativeEventType, SCHEMA_VERSION_V1};

/// Buffered, ordered narrative stream for one mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeLog {
    mission_id: String,
    events: Vec<NarrativeEvent>,
    next_sequence: u64,
}

impl NarrativeLog {
    pub fn new(mission_id: impl Into<String>) -> Self {
        Self {
            mission_id: mission_id.into(),
            events: Vec::new(),
            next_sequence: 0,
        }
    }

    pub fn events(&self) -> &[NarrativeEvent] {
        &self.events
    }

    /// Emit an event with no causal parents. Returns the event id.
    pub fn emit(
        &mut self,
        turn: u64,
        event_type: NarrativeEventType,
        actors: Vec<ActorRef>,
        details: Option<Value>,
    ) -> String {
        self.emit_caused_by(turn, event_type, actors, details, Vec::new())
    }

    /// Emit an event with causal parent references. Returns the event id.
    pub fn emit_caused_by(
        &mut self,
        turn: u64,
        event_type: NarrativeEventType,
        actors: Vec<ActorRef>,
        details: Option<Value>,
        caused_by: Vec<String>,
    ) -> String {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let event_id = format!("evt-{turn}-{sequence}");

        self.events.push(NarrativeEvent {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission_id: self.mission_id.clone(),
            turn,
            event_id: event_id.clone(),
            sequence,
            event_type,
            actors,
            caused_by,
            details,
        });

        event_id
    }

    pub fn replay_hash(&self) -> u64 {
        replay_hash_of_events(&self.events)
    }
}

/// Fold a u64 into a running FNV-1a hash.
fn fnv1a_fold(hash: u64, value: u64) -> u64 {
    let mut h = hash;
    for &b in &value.to_le_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

/// Fold a string into a running FNV-1a hash, with a separator byte so
/// adjacent strings cannot collide.
fn fnv1a_fold_str(hash: u64, s: &str) -> u64 {
    let mut h = hash;
    for &b in s.as_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h ^= 0xff;
    h.wrapping_mul(0x100000001b3)
}

/// Deterministic hash over the fields the engine produces: turn, sequence,
/// event type, actors, and details. Two runs with the same seed and inputs
/// must produce identical hashes.
pub fn replay_hash_of_events(events: &[NarrativeEvent]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325; // FNV offset basis

    for event in events {
        h = fnv1a_fold(h, event.turn);
        h = fnv1a_fold(h, event.sequence);
        h = fnv1a_fold_str(h, &format!("{:?}", event.event_type));
        for actor in &event.actors {
            h = fnv1a_fold_str(h, &actor.actor_id);
        }
        if let Some(ref details) = event.details {
            h = fnv1a_fold_str(h, &details.to_string());
        }
    }

    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequences_are_monotonic_and_ids_unique() {
        let mut log = NarrativeLog::new("m1");
        let first = log.emit(0, NarrativeEventType::PhaseEntered, vec![], None);
        let second = log.emit(
            0,
            NarrativeEventType::PhaseResolved,
            vec![ActorRef::agent("a1")],
            Some(json!({"outcome": "partial_success"})),
        );
        assert_ne!(first, second);
        assert_eq!(log.events()[0].sequence, 0);
        assert_eq!(log.events()[1].sequence, 1);
    }

    #[test]
    fn caused_by_links_are_preserved_in_order() {
        let mut log = NarrativeLog::new("m1");
        let root = log.emit(0, NarrativeEventType::PhaseResolved, vec![], None);
        log.emit_caused_by(
            0,
            NarrativeEventType::CasualtySuffered,
            vec![ActorRef::agent("a1")],
            None,
            vec![root.clone()],
        );
        assert_eq!(log.events()[1].caused_by, vec![root]);
    }

    #[test]
    fn empty_log_hash_is_fnv_offset_basis() {
        assert_eq!(replay_hash_of_events(&[]), 0xcbf29ce484222325_u64);
    }

    #[test]
    fn identical_logs_hash_identically() {
        let build = || {
            let mut log = NarrativeLog::new("m1");
            log.emit(0, NarrativeEventType::PhaseEntered, vec![], None);
            log.emit(
                0,
                NarrativeEventType::PhaseResolved,
                vec![ActorRef::agent("a1")],
                Some(json!({"p": 0.4})),
            );
            log
        };
        assert_eq!(build().replay_hash(), build().replay_hash());
    }

    #[test]
    fn differing_details_change_the_hash() {
        let mut a = NarrativeLog::new("m1");
        a.emit(0, NarrativeEventType::PhaseResolved, vec![], Some(json!({"p": 0.4})));
        let mut b = NarrativeLog::new("m1");
        b.emit(0, NarrativeEventType::PhaseResolved, vec![], Some(json!({"p": 0.5})));
        assert_ne!(a.replay_hash(), b.replay_hash());
    }
}
