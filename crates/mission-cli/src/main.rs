use std::collections::BTreeMap;
use std::env;

use contracts::{
    AgentRecord, EmotionalState, EngineConfig, LocationProfile, MissionConfig, MissionPhase,
    MissionReport, ObjectiveKind, StimulusKind,
};
use mission_core::emotion::ElapsedHours;
use mission_core::rng::MissionRng;
use mission_core::{AgentRegistry, CampaignStore, Collaborators, MissionEngine};
use rayon::prelude::*;

fn print_usage() {
    println!("mission-cli <command>");
    println!("commands:");
    println!("  simulate <mission_id> <seed> [objective] [team_size]");
    println!("    runs one deterministic mission and prints the report as json");
    println!("    objectives: sabotage assassination propaganda theft rescue");
    println!("  playtest <seed> <iterations> [objective]");
    println!("    runs independent missions in parallel and prints outcome telemetry");
    println!("  campaign <seed> <missions> [downtime]");
    println!("    runs sequential missions over one roster with downtime decay between them");
    println!("    downtime is whole hours, e.g. 48 or 48h (default 48h)");
}

fn parse_seed(value: Option<&String>) -> Result<u64, String> {
    let raw = value.ok_or_else(|| "missing seed".to_string())?;
    raw.parse::<u64>()
        .map_err(|_| format!("invalid seed: {raw}"))
}

fn parse_u64(value: Option<&String>, label: &str) -> Result<u64, String> {
    let raw = value.ok_or_else(|| format!("missing {}", label))?;
    raw.parse::<u64>()
        .map_err(|_| format!("invalid {}: {}", label, raw))
}

fn parse_objective(value: Option<&String>) -> Result<ObjectiveKind, String> {
    match value.map(String::as_str) {
        None | Some("sabotage") => Ok(ObjectiveKind::Sabotage),
        Some("assassination") => Ok(ObjectiveKind::Assassination),
        Some("propaganda") => Ok(ObjectiveKind::Propaganda),
        Some("theft") => Ok(ObjectiveKind::Theft),
        Some("rescue") => Ok(ObjectiveKind::Rescue),
        Some(other) => Err(format!("unknown objective: {other}")),
    }
}

/// Deterministic demo roster. Skills, baseline fear, and trauma triggers are
/// all drawn from the seed so two playtest runs with the same seed produce
/// identical batches.
fn demo_roster(seed: u64, team_size: usize) -> Vec<AgentRecord> {
    const NAMES: [&str; 8] = [
        "vera", "tomas", "ilka", "marek", "sofia", "anton", "lena", "pavel",
    ];
    const SKILLS: [&str; 7] = [
        "tactics",
        "stealth",
        "demolitions",
        "marksmanship",
        "rhetoric",
        "larceny",
        "evasion",
    ];

    let mut rng = MissionRng::new(seed ^ 0xa5a5_a5a5_a5a5_a5a5);
    let mut roster = Vec::with_capacity(team_size);
    for index in 0..team_size {
        let name = NAMES[index % NAMES.len()];
        let mut record = if index < NAMES.len() {
            AgentRecord::new(name)
        } else {
            AgentRecord::new(format!("{name}-{index}"))
        };
        for skill in SKILLS {
            record
                .skills
                .insert(skill.to_string(), 2.0 + rng.next_f64() * 6.0);
        }
        record.emotional = EmotionalState {
            fear: 0.05 + rng.next_f64() * 0.2,
            stress: 0.05 + rng.next_f64() * 0.2,
            ..EmotionalState::baseline()
        };
        // Roughly one operative in four carries an old wound.
        if rng.next_f64() < 0.25 {
            record.emotional.trauma = 0.6 + rng.next_f64() * 0.3;
            record.trauma_triggers.push(StimulusKind::Explosion);
            record.trauma_triggers.push(StimulusKind::Pursuit);
        }
        roster.push(record);
    }
    roster
}

fn build_engine(
    mission_id: &str,
    seed: u64,
    objective: ObjectiveKind,
    team_size: usize,
) -> Result<MissionEngine, String> {
    let roster = demo_roster(seed, team_size);
    let participants = roster.iter().map(|r| r.agent_id.clone()).collect();
    let mission = MissionConfig::new(
        mission_id,
        participants,
        LocationProfile {
            location_id: "powerplant".to_string(),
            security: 6,
            support: 3,
        },
        objective,
    );
    let mut config = EngineConfig::default();
    config.seed = seed;
    MissionEngine::new(config, mission, AgentRegistry::from_records(roster))
        .map_err(|err| format!("invalid mission: {err}"))
}

fn run_simulation(args: &[String]) -> Result<(), String> {
    let mission_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing mission_id".to_string())?;
    let seed = parse_seed(args.get(3))?;
    let objective = parse_objective(args.get(4))?;
    let team_size = args
        .get(5)
        .map(|value| {
            value
                .parse::<usize>()
                .map_err(|_| format!("invalid team_size: {value}"))
        })
        .transpose()?
        .unwrap_or(3)
        .clamp(1, 8);

    let mut engine = build_engine(&mission_id, seed, objective, team_size)?;
    let report = engine.run(&Collaborators::stub());

    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to render report: {err}"))?;
    println!("{rendered}");
    eprintln!(
        "mission_id={} seed={} terminal={} phases={} events={} replay_hash={}",
        mission_id,
        seed,
        report.terminal,
        report.phase_results.len(),
        engine.narrative_events().len(),
        report.replay_hash,
    );
    Ok(())
}

/// Aggregate telemetry for a playtest batch. The execution-phase outcome
/// distribution is the main calibration signal.
#[derive(Default)]
struct Telemetry {
    terminals: BTreeMap<String, u64>,
    execution_outcomes: BTreeMap<String, u64>,
    casualties: u64,
    cascades_applied: u64,
    aborted_before_execution: u64,
}

impl Telemetry {
    fn absorb(&mut self, report: &MissionReport) {
        *self
            .terminals
            .entry(report.terminal.to_string())
            .or_insert(0) += 1;

        let execution = report
            .phase_results
            .iter()
            .find(|r| r.phase == MissionPhase::Execution);
        match execution {
            Some(result) => {
                *self
                    .execution_outcomes
                    .entry(result.outcome.to_string())
                    .or_insert(0) += 1;
            }
            None => self.aborted_before_execution += 1,
        }

        for result in &report.phase_results {
            self.casualties += result.casualties.len() as u64;
        }
        self.cascades_applied += report
            .cascade_events
            .iter()
            .filter(|e| e.state == contracts::CascadeState::Applied)
            .count() as u64;
    }

    fn merge(mut self, other: Telemetry) -> Telemetry {
        for (key, count) in other.terminals {
            *self.terminals.entry(key).or_insert(0) += count;
        }
        for (key, count) in other.execution_outcomes {
            *self.execution_outcomes.entry(key).or_insert(0) += count;
        }
        self.casualties += other.casualties;
        self.cascades_applied += other.cascades_applied;
        self.aborted_before_execution += other.aborted_before_execution;
        self
    }

    fn print(&self, iterations: u64) {
        println!("missions: {iterations}");
        println!("terminals:");
        for (terminal, count) in &self.terminals {
            let share = 100.0 * *count as f64 / iterations as f64;
            println!("  {terminal}: {count} ({share:.1}%)");
        }
        println!("execution outcomes:");
        for (outcome, count) in &self.execution_outcomes {
            let share = 100.0 * *count as f64 / iterations as f64;
            println!("  {outcome}: {count} ({share:.1}%)");
        }
        println!(
            "aborted before execution: {} ({:.1}%)",
            self.aborted_before_execution,
            100.0 * self.aborted_before_execution as f64 / iterations as f64,
        );
        println!(
            "casualties: {} ({:.2} per mission)",
            self.casualties,
            self.casualties as f64 / iterations as f64,
        );
        println!(
            "cascades applied: {} ({:.2} per mission)",
            self.cascades_applied,
            self.cascades_applied as f64 / iterations as f64,
        );
    }
}

/// Resolve `iterations` independent missions in parallel and fold their
/// reports into one telemetry aggregate. Each iteration owns its roster, so
/// the batch shares no state.
fn playtest_batch(
    seed: u64,
    iterations: u64,
    objective: ObjectiveKind,
) -> Result<Telemetry, String> {
    (0..iterations)
        .into_par_iter()
        .map(|index| {
            let mission_seed = seed.wrapping_add(index);
            let mission_id = format!("playtest-{index}");
            let mut engine = build_engine(&mission_id, mission_seed, objective, 3)
                .map_err(|err| format!("iteration {index}: {err}"))?;
            Ok(engine.run(&Collaborators::stub()))
        })
        .try_fold(
            Telemetry::default,
            |mut telemetry, report: Result<MissionReport, String>| -> Result<Telemetry, String> {
                telemetry.absorb(&report?);
                Ok(telemetry)
            },
        )
        .try_reduce(Telemetry::default, |a, b| Ok(a.merge(b)))
}

fn run_playtest(args: &[String]) -> Result<(), String> {
    let seed = parse_seed(args.get(2))?;
    let iterations = parse_u64(args.get(3), "iterations")?.max(1);
    let objective = parse_objective(args.get(4))?;

    let telemetry = playtest_batch(seed, iterations, objective)?;
    telemetry.print(iterations);
    Ok(())
}

fn run_campaign(args: &[String]) -> Result<(), String> {
    let seed = parse_seed(args.get(2))?;
    let mission_count = parse_u64(args.get(3), "missions")?.clamp(1, 64);
    let downtime_raw = args.get(4).map(String::as_str).unwrap_or("48h");
    // A malformed downtime disables decay rather than aborting the campaign.
    let downtime = match downtime_raw.parse::<ElapsedHours>() {
        Ok(elapsed) => Some(elapsed),
        Err(err) => {
            eprintln!("warning: {err}; downtime decay disabled");
            None
        }
    };

    let roster = demo_roster(seed, 4);
    let agent_ids: Vec<String> = roster.iter().map(|r| r.agent_id.clone()).collect();
    let mut store = CampaignStore::new(roster);
    let base_config = EngineConfig::default();
    let base_location = LocationProfile {
        location_id: "powerplant".to_string(),
        security: 6,
        support: 3,
    };
    let collab = Collaborators::stub();

    for index in 0..mission_count {
        let mission_id = format!("campaign-{index}");
        let registry = store
            .checkout(&mission_id, &agent_ids)
            .map_err(|err| format!("checkout failed: {err}"))?;
        // Heat from earlier missions raises this one's effective security.
        let location = store.heated_location(&base_location);
        let mission = MissionConfig::new(
            mission_id.clone(),
            agent_ids.clone(),
            location,
            ObjectiveKind::Sabotage,
        );
        let mut config = base_config.clone();
        config.seed = seed.wrapping_add(index);

        let mut engine = MissionEngine::new(config, mission, registry)
            .map_err(|err| format!("invalid mission: {err}"))?;
        let report = engine.run(&collab);

        let ledger = engine.cascade_ledger().clone();
        store
            .commit(&mission_id, engine.into_registry(), &ledger)
            .map_err(|err| format!("commit failed: {err}"))?;

        let casualties: usize = report
            .phase_results
            .iter()
            .map(|r| r.casualties.len())
            .sum();
        println!(
            "{} terminal={} casualties={} magnitude={:.2} heat={:.2}",
            mission_id,
            report.terminal,
            casualties,
            report.accumulated_magnitude,
            store.security_heat(&base_location.location_id),
        );

        if let Some(elapsed) = downtime {
            store.decay_all(elapsed, &base_config.decay);
        }
    }

    let still_active = store
        .records()
        .filter(|record| record.status.may_act())
        .count();
    println!(
        "roster: {} of {} operatives still able to act",
        still_active,
        store.len(),
    );
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("simulate") => {
            if let Err(err) = run_simulation(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("playtest") => {
            if let Err(err) = run_playtest(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("campaign") => {
            if let Err(err) = run_campaign(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}
