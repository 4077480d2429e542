//! Preference Store: persists `RoleAssignment` minus its transient
//! `currentPosition`/`moveHistory` fields. Grounded on
//! `engine_manager.py`'s `load_preferences`/`save_preferences` — a whole
//! file JSON load/overwrite that falls back to defaults on any failure.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::role::{Role, RoleAssignment};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleEntry {
    engine_id: Option<String>,
    strength_level: u8,
    #[serde(default)]
    custom_options: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisEntry {
    engine_id: Option<String>,
    strength_level: u8,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    custom_options: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnginesSection {
    black: RoleEntry,
    white: RoleEntry,
    analysis: AnalysisEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesFile {
    engines: EnginesSection,
}

impl From<&RoleAssignment> for PreferencesFile {
    fn from(assignment: &RoleAssignment) -> Self {
        let entry = |role: Role| RoleEntry {
            engine_id: assignment.roles.get(&role).cloned().flatten(),
            strength_level: *assignment.strength_levels.get(&role).unwrap_or(&10),
            custom_options: assignment.custom_options.get(&role).cloned().unwrap_or_default(),
        };

        PreferencesFile {
            engines: EnginesSection {
                black: entry(Role::Black),
                white: entry(Role::White),
                analysis: AnalysisEntry {
                    engine_id: assignment.roles.get(&Role::Analysis).cloned().flatten(),
                    strength_level: *assignment.strength_levels.get(&Role::Analysis).unwrap_or(&10),
                    enabled: assignment.analysis_enabled,
                    custom_options: assignment.custom_options.get(&Role::Analysis).cloned().unwrap_or_default(),
                },
            },
        }
    }
}

impl PreferencesFile {
    /// Default preferences: no engines assigned, all strengths 10, analysis
    /// disabled. Note this deliberately diverges from the upstream Python
    /// implementation's default (which pre-assigns "yaneuraou" to both
    /// players) — this crate follows the documented contract literally.
    fn defaults() -> Self {
        let empty = RoleEntry {
            engine_id: None,
            strength_level: 10,
            custom_options: IndexMap::new(),
        };
        PreferencesFile {
            engines: EnginesSection {
                black: empty.clone(),
                white: empty,
                analysis: AnalysisEntry {
                    engine_id: None,
                    strength_level: 10,
                    enabled: false,
                    custom_options: IndexMap::new(),
                },
            },
        }
    }

    fn into_assignment(self) -> RoleAssignment {
        let mut assignment = RoleAssignment::default();
        assignment.roles.insert(Role::Black, self.engines.black.engine_id);
        assignment.strength_levels.insert(Role::Black, self.engines.black.strength_level);
        assignment.custom_options.insert(Role::Black, self.engines.black.custom_options);

        assignment.roles.insert(Role::White, self.engines.white.engine_id);
        assignment.strength_levels.insert(Role::White, self.engines.white.strength_level);
        assignment.custom_options.insert(Role::White, self.engines.white.custom_options);

        assignment.roles.insert(Role::Analysis, self.engines.analysis.engine_id);
        assignment
            .strength_levels
            .insert(Role::Analysis, self.engines.analysis.strength_level);
        assignment
            .custom_options
            .insert(Role::Analysis, self.engines.analysis.custom_options);
        assignment.analysis_enabled = self.engines.analysis.enabled;

        assignment
    }
}

pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A load on a missing or malformed file yields the documented
    /// defaults rather than propagating an error — the orchestrator must
    /// always be able to start.
    pub fn load(&self) -> RoleAssignment {
        Self::load_from(&self.path)
    }

    fn load_from(path: &Path) -> RoleAssignment {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return PreferencesFile::defaults().into_assignment(),
        };
        match serde_json::from_str::<PreferencesFile>(&contents) {
            Ok(file) => file.into_assignment(),
            Err(e) => {
                warn!("failed to parse preference file {path:?}: {e}, falling back to defaults");
                PreferencesFile::defaults().into_assignment()
            }
        }
    }

    /// A whole-file overwrite. Partial writes are tolerable: a subsequent
    /// load of a corrupted file falls back to defaults rather than erroring.
    pub fn save(&self, assignment: &RoleAssignment) -> std::io::Result<()> {
        let file = PreferencesFile::from(assignment);
        let json = serde_json::to_string_pretty(&file)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)
    }
}
