//! Top-level facade implementing the orchestrator's external API surface.
//! Wires the Engine Config Store, Role Manager, and Preference Store
//! together; this is the only type external callers (the HTTP surface,
//! out of scope here) are expected to hold.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::warn;
use once_cell::sync::OnceCell;

use crate::config::{discover_engines as discover_engines_on_disk, EngineDescriptor};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::preferences::PreferenceStore;
use crate::role::{Role, RoleManager};
use crate::usi::{GoParams, InfoAccumulator, USIOption};

pub struct Orchestrator {
    engines_root: PathBuf,
    preference_store: PreferenceStore,
    role_manager: OnceCell<RoleManager>,
}

impl Orchestrator {
    pub fn new(engines_root: impl Into<PathBuf>, preferences_path: impl Into<PathBuf>) -> Self {
        Self {
            engines_root: engines_root.into(),
            preference_store: PreferenceStore::new(preferences_path.into()),
            role_manager: OnceCell::new(),
        }
    }

    fn role_manager(&self) -> &RoleManager {
        self.role_manager.get_or_init(|| {
            let descriptors = discover_engines_on_disk(&self.engines_root);
            RoleManager::new(descriptors)
        })
    }

    /// Scans the engines root and builds the catalog. A no-op if discovery
    /// already ran: the catalog is read-mostly and immutable thereafter.
    pub fn discover_engines(&self) -> Vec<EngineDescriptor> {
        self.role_manager().catalog().cloned().collect()
    }

    /// The caller-facing subset of the catalog: engines flagged
    /// `usageNotes.notForPlay` are omitted.
    pub fn list_descriptors(&self) -> Vec<EngineDescriptor> {
        self.role_manager()
            .catalog()
            .filter(|d| d.is_playable())
            .cloned()
            .collect()
    }

    pub async fn set_engine(
        &self,
        role: &str,
        engine_id: Option<String>,
        strength_level: u8,
        custom_options: IndexMap<String, String>,
        enabled: Option<bool>,
    ) -> OrchestratorResult<()> {
        let role = parse_role(role)?;
        self.role_manager()
            .set_engine(role, engine_id, strength_level, custom_options, enabled)
            .await
    }

    pub async fn update_position(&self, sfen: &str, moves: &[String]) -> OrchestratorResult<()> {
        self.role_manager().update_position(sfen, moves).await
    }

    pub async fn get_move(
        &self,
        side: &str,
        params: &GoParams,
        info_callback: Option<&mut dyn FnMut(&InfoAccumulator)>,
    ) -> OrchestratorResult<Option<(String, Option<String>, InfoAccumulator)>> {
        let role = parse_role(side)?;
        self.role_manager().get_move(role, params, info_callback).await
    }

    pub async fn analyze_position(
        &self,
        sfen: &str,
        moves: &[String],
        engine_id: Option<String>,
        movetime: u64,
        info_callback: Option<&mut dyn FnMut(&InfoAccumulator)>,
    ) -> OrchestratorResult<Option<(String, Option<String>, InfoAccumulator)>> {
        self.role_manager()
            .analyze_position(sfen, moves, engine_id, movetime, info_callback)
            .await
    }

    pub async fn inspect_options(&self, engine_id: &str) -> OrchestratorResult<Vec<USIOption>> {
        self.role_manager().inspect_options(engine_id).await
    }

    /// Loads the persisted role assignment and realizes it by starting (or
    /// reusing) the engines it names. A role whose stored engine id is no
    /// longer in the catalog, or fails to start, is logged and left
    /// unassigned rather than aborting the whole restore.
    pub async fn load_preferences(&self) -> OrchestratorResult<()> {
        let assignment = self.preference_store.load();
        let manager = self.role_manager();

        for role in [Role::Black, Role::White, Role::Analysis] {
            let engine_id = assignment.roles.get(&role).cloned().flatten();
            let level = *assignment.strength_levels.get(&role).unwrap_or(&10);
            let options = assignment.custom_options.get(&role).cloned().unwrap_or_default();
            let enabled = (role == Role::Analysis).then_some(assignment.analysis_enabled);

            if let Err(e) = manager.set_engine(role, engine_id.clone(), level, options, enabled).await {
                warn!("failed to restore role {role:?} to engine {engine_id:?}: {e}");
            }
        }
        Ok(())
    }

    pub async fn save_preferences(&self) -> std::io::Result<()> {
        let assignment = self.role_manager().assignment_snapshot().await;
        self.preference_store.save(&assignment)
    }

    pub async fn shutdown(&self) {
        self.role_manager().shutdown().await;
    }
}

fn parse_role(role: &str) -> OrchestratorResult<Role> {
    Role::parse(role).ok_or_else(|| OrchestratorError::UnknownRole(role.to_string()))
}

pub fn default_preferences_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shogi-orchestrator")
        .join("preferences.json")
}

pub fn default_engines_root(app_data_dir: Option<&Path>) -> PathBuf {
    app_data_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("engines")
}
