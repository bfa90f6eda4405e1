//! Mission execution engine: resolves an insurgent operation phase by phase
//! while integrating each agent's psychological state and availability.
//!
//! The flow per phase is: registry eligibility query → team-fear abort check →
//! trauma triggers → outcome resolution → casualty/emotional application →
//! cascade propagation → next phase. Agents removed from play (captured or
//! dead) can never act again; the registry enforces that by construction.

pub mod campaign;
pub mod cascade;
pub mod emotion;
pub mod error;
pub mod mission;
pub mod narrative;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod rng;

pub use campaign::CampaignStore;
pub use error::EngineError;
pub use mission::{MissionEngine, MissionSnapshot, StepReport};
pub use providers::Collaborators;
pub use registry::AgentRegistry;
