//! Strength mapping: translating the uniform 1-10 user dial onto whichever
//! USI options a given engine advertises. Grounded on `_apply_strength`.

use log::warn;

use crate::config::EngineDescriptor;
use crate::error::OrchestratorResult;
use crate::process::EngineProcess;

/// Fixed Elo table for levels 1..=10. Preserved literally even though it
/// over-caps some engines' descriptor-reported Elo — the descriptor's
/// `estimatedElo` is informational only, never a ceiling on this table.
const ELO_TABLE: [(u8, u32); 10] = [
    (1, 600),
    (2, 850),
    (3, 1075),
    (4, 1225),
    (5, 1450),
    (6, 1700),
    (7, 1950),
    (8, 2200),
    (9, 2550),
    (10, 3000),
];

pub fn elo_for_level(level: u8) -> u32 {
    ELO_TABLE
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, elo)| *elo)
        .unwrap_or(3000)
}

/// `round((level - 1) * 20 / 9)`, mapping 1..=10 onto the 0..=20 USI
/// `Skill Level` range.
pub fn skill_level_for(level: u8) -> u8 {
    let numerator = (level as i64 - 1) * 20;
    ((numerator as f64 / 9.0).round()) as u8
}

/// Applies the strength dial to a running engine, preferring `uciElo` over
/// `skillLevel` when both are advertised — `uciElo` offers finer
/// granularity. Does nothing when the descriptor declares no strength
/// control support.
pub async fn apply_strength(process: &mut EngineProcess, descriptor: &EngineDescriptor, level: u8) -> OrchestratorResult<()> {
    if !descriptor.strength_control.supported {
        return Ok(());
    }

    let methods = &descriptor.strength_control.methods;
    if methods.contains("uciElo") {
        apply_elo_strength(process, level).await
    } else if methods.contains("skillLevel") {
        apply_skill_level(process, level).await
    } else {
        warn!(
            "engine '{}' declares strength control support but no actionable method ({:?})",
            descriptor.id, methods
        );
        Ok(())
    }
}

async fn apply_elo_strength(process: &mut EngineProcess, level: u8) -> OrchestratorResult<()> {
    let elo = elo_for_level(level);
    process.set_option("UCI_LimitStrength", "true").await?;
    process.set_option("UCI_Elo", &elo.to_string()).await
}

async fn apply_skill_level(process: &mut EngineProcess, level: u8) -> OrchestratorResult<()> {
    let skill = skill_level_for(level);
    process.set_option("Skill Level", &skill.to_string()).await
}
