//! Mission outcome resolver: a pure function from phase inputs to a phase
//! result. No owned state; all randomness comes from the caller-supplied
//! deterministic RNG, and every threshold comes from `EngineConfig`.

use std::collections::BTreeSet;

use contracts::{
    AgentStatus, Casualty, EngineConfig, LocationProfile, MissionPhase, ObjectiveKind,
    OutcomeBands, PhaseOutcome,
};

use crate::error::EngineError;
use crate::rng::MissionRng;

/// One eligible agent as seen by the resolver. Effectiveness is precomputed
/// by the state machine (emotion modifier × wounded penalty × trauma penalty
/// × equipment modifier).
#[derive(Debug, Clone)]
pub struct Participant {
    pub agent_id: String,
    pub status: AgentStatus,
    pub effectiveness: f64,
    pub fear: f64,
    /// Proficiency in the skill relevant to this phase, 0–10.
    pub skill: f64,
}

#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    pub phase: MissionPhase,
    pub participants: &'a [Participant],
    pub location: &'a LocationProfile,
    pub objective: ObjectiveKind,
    /// Additive cascade magnitude accumulated in earlier phases.
    pub cascade_magnitude: f64,
    pub config: &'a EngineConfig,
}

/// Outcome tier, probability, and casualties for one resolved phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcome: PhaseOutcome,
    pub success_probability: f64,
    pub casualties: Vec<Casualty>,
}

/// Defensive double-check of the participant set. The registry should never
/// hand over an ineligible agent, but the resolver refuses to trust that.
fn validate(request: &ResolveRequest<'_>) -> Result<(), EngineError> {
    if request.participants.is_empty() {
        return Err(EngineError::InvalidParticipantSet(
            "no participants".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for participant in request.participants {
        if !seen.insert(participant.agent_id.as_str()) {
            return Err(EngineError::InvalidParticipantSet(format!(
                "duplicate agent {}",
                participant.agent_id
            )));
        }
        if !participant.status.may_act() {
            return Err(EngineError::InvalidParticipantSet(format!(
                "agent {} has status {} and may not act",
                participant.agent_id, participant.status
            )));
        }
        if !participant.effectiveness.is_finite() || participant.effectiveness <= 0.0 {
            return Err(EngineError::InvalidParticipantSet(format!(
                "agent {} has unusable effectiveness {}",
                participant.agent_id, participant.effectiveness
            )));
        }
    }

    let weight = request.config.difficulty.weight(request.objective);
    if !weight.is_finite() || weight <= 0.0 {
        return Err(EngineError::InvalidObjectiveType(format!(
            "{} has difficulty weight {weight}",
            request.objective
        )));
    }

    Ok(())
}

/// Computed success probability in `[0.0, 1.0]`.
///
/// Team relevant-skill (support-adjusted) is set against location security
/// weighted by objective difficulty; each participant's effectiveness then
/// applies multiplicatively, so one severely shaken agent drags the whole
/// team down rather than averaging out. Accumulated cascade magnitude is a
/// further multiplicative drag.
pub fn success_probability(request: &ResolveRequest<'_>) -> Result<f64, EngineError> {
    validate(request)?;

    let config = request.config;
    let weight = config.difficulty.weight(request.objective);

    let skill_sum: f64 = request.participants.iter().map(|p| p.skill.max(0.0)).sum();
    let support_bonus = 1.0 + f64::from(request.location.support) / 20.0;
    let strength = skill_sum * support_bonus;
    let pressure = f64::from(request.location.security) * weight * config.security_pressure;

    let base = strength / (strength + pressure + 1.0);

    let team_effectiveness: f64 = request
        .participants
        .iter()
        .map(|p| p.effectiveness)
        .product();

    let drag = 1.0 + request.cascade_magnitude.max(0.0);

    Ok((base * team_effectiveness / drag).clamp(0.0, 1.0))
}

/// Map a uniform roll in `[0, 1)` to an outcome tier for probability `p`.
///
/// The success mass `p` is carved into perfect/clean/partial by the band
/// shares, the failure mass `1 - p` into complete/catastrophic. Comparisons
/// are strict, so a roll landing exactly on a tier boundary resolves to the
/// less favorable tier (conservative bias).
pub fn outcome_for_roll(p: f64, roll: f64, bands: &OutcomeBands) -> PhaseOutcome {
    let perfect_cut = p * bands.perfect_share;
    let clean_cut = p * (bands.perfect_share + bands.clean_share);
    let partial_cut = p;
    let complete_cut = p + (1.0 - p) * bands.complete_share;

    if roll < perfect_cut {
        PhaseOutcome::PerfectSuccess
    } else if roll < clean_cut {
        PhaseOutcome::SuccessWithComplications
    } else if roll < partial_cut {
        PhaseOutcome::PartialSuccess
    } else if roll < complete_cut {
        PhaseOutcome::CompleteFailure
    } else {
        PhaseOutcome::CatastrophicFailure
    }
}

/// Derive casualties from the sampled tier. Catastrophic failures may
/// capture or kill up to the whole team, weighted by individual fear;
/// complete failures may wound; success tiers cause none. Planning and
/// resolution happen off-site and never produce casualties.
fn derive_casualties(
    request: &ResolveRequest<'_>,
    outcome: PhaseOutcome,
    rng: &mut MissionRng,
) -> Vec<Casualty> {
    if !request.phase.in_the_field() {
        return Vec::new();
    }

    let tuning = &request.config.casualties;
    let mut casualties = Vec::new();

    match outcome {
        PhaseOutcome::CatastrophicFailure => {
            for participant in request.participants {
                let risk =
                    (tuning.base_risk + tuning.fear_weight * participant.fear).clamp(0.0, 0.95);
                if rng.next_f64() < risk {
                    let new_status = if rng.next_f64() < tuning.capture_bias {
                        AgentStatus::Captured
                    } else {
                        AgentStatus::Dead
                    };
                    casualties.push(Casualty {
                        agent_id: participant.agent_id.clone(),
                        new_status,
                    });
                }
            }
        }
        PhaseOutcome::CompleteFailure => {
            for participant in request.participants {
                let risk = (tuning.wound_base_risk + tuning.wound_fear_weight * participant.fear)
                    .clamp(0.0, 0.95);
                if rng.next_f64() < risk {
                    casualties.push(Casualty {
                        agent_id: participant.agent_id.clone(),
                        new_status: AgentStatus::Wounded,
                    });
                }
            }
        }
        PhaseOutcome::PerfectSuccess
        | PhaseOutcome::SuccessWithComplications
        | PhaseOutcome::PartialSuccess
        | PhaseOutcome::Aborted => {}
    }

    casualties
}

/// Resolve one phase. Pure given the request and the RNG stream.
pub fn resolve(request: &ResolveRequest<'_>, rng: &mut MissionRng) -> Result<Resolution, EngineError> {
    let p = success_probability(request)?;
    let roll = rng.next_f64();
    let outcome = outcome_for_roll(p, roll, &request.config.bands);
    let casualties = derive_casualties(request, outcome, rng);

    Ok(Resolution {
        outcome,
        success_probability: p,
        casualties,
    })
}
