//! Engine error taxonomy. Errors local to one agent or one phase are
//! contained and degrade gracefully; only a structurally invalid mission
//! configuration is fatal to the whole mission.

use std::fmt;

use contracts::AgentStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Status state-machine violation. Fatal for that agent's update only.
    InvalidTransition {
        agent_id: String,
        from: AgentStatus,
        to: AgentStatus,
    },
    /// Agent id not present in the registry.
    UnknownAgent(String),
    /// Resolver input error: empty, duplicate, or ineligible participants.
    /// Degrades the current phase to a complete failure.
    InvalidParticipantSet(String),
    /// Resolver input error: objective difficulty weight is unusable.
    InvalidObjectiveType(String),
    /// Cascade magnitude ceiling exceeded. Clamped and logged, non-fatal.
    CascadeOverflow { accumulated: f64, ceiling: f64 },
    /// Malformed elapsed-time argument. The decay tick is skipped.
    DurationFormat(String),
    /// Structurally invalid mission configuration. Fatal to the mission.
    MissionConfig(String),
    /// Agent already owned by a concurrently running mission.
    AgentUnavailable(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { agent_id, from, to } => {
                write!(f, "invalid status transition for {agent_id}: {from} -> {to}")
            }
            Self::UnknownAgent(agent_id) => write!(f, "unknown agent: {agent_id}"),
            Self::InvalidParticipantSet(reason) => {
                write!(f, "invalid participant set: {reason}")
            }
            Self::InvalidObjectiveType(reason) => write!(f, "invalid objective type: {reason}"),
            Self::CascadeOverflow {
                accumulated,
                ceiling,
            } => write!(
                f,
                "cascade magnitude {accumulated:.2} exceeds ceiling {ceiling:.2}; clamped"
            ),
            Self::DurationFormat(raw) => write!(f, "malformed duration: {raw}"),
            Self::MissionConfig(reason) => write!(f, "invalid mission configuration: {reason}"),
            Self::AgentUnavailable(agent_id) => {
                write!(f, "agent {agent_id} is already deployed on another mission")
            }
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_transition() {
        let err = EngineError::InvalidTransition {
            agent_id: "a7".into(),
            from: AgentStatus::Captured,
            to: AgentStatus::Active,
        };
        let text = err.to_string();
        assert!(text.contains("a7"));
        assert!(text.contains("captured"));
        assert!(text.contains("active"));
    }
}
