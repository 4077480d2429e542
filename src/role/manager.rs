use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{info, warn};
use tokio::sync::Mutex;

use crate::config::EngineDescriptor;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::process::{EngineProcess, EngineState};
use crate::usi::{GoParams, InfoAccumulator};

use super::assignment::{Role, RoleAssignment};
use super::strength::apply_strength;

struct HandleEntry {
    process: Arc<Mutex<EngineProcess>>,
    refcount: u32,
}

struct ManagerState {
    assignment: RoleAssignment,
    handles: HashMap<String, HandleEntry>,
}

/// Maintains `RoleAssignment` and the live, reference-counted handle table.
/// One mutex guards both together (spec's concurrency model); each handle
/// additionally serializes its own USI traffic via its own mutex. Lock
/// order is always this manager's lock first, a handle's lock second.
pub struct RoleManager {
    catalog: HashMap<String, EngineDescriptor>,
    state: Mutex<ManagerState>,
}

impl RoleManager {
    pub fn new(catalog: Vec<EngineDescriptor>) -> Self {
        let catalog = catalog.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self {
            catalog,
            state: Mutex::new(ManagerState {
                assignment: RoleAssignment::default(),
                handles: HashMap::new(),
            }),
        }
    }

    pub fn descriptor(&self, engine_id: &str) -> Option<&EngineDescriptor> {
        self.catalog.get(engine_id)
    }

    pub fn catalog(&self) -> impl Iterator<Item = &EngineDescriptor> {
        self.catalog.values()
    }

    /// A clone of the current assignment, suitable for `savePreferences`.
    pub async fn assignment_snapshot(&self) -> RoleAssignment {
        self.state.lock().await.assignment.clone()
    }

    pub async fn live_handle_count(&self) -> usize {
        self.state.lock().await.handles.len()
    }

    /// The central hot-swap operation (spec §4.4). Validates and clamps,
    /// records custom options/strength/analysis-enabled unconditionally,
    /// then starts, reuses, or releases handles as needed. A failure to
    /// start a *new* handle leaves the role's previous engine assignment
    /// intact — only the freshly recorded strength/options survive, per the
    /// specified step ordering.
    pub async fn set_engine(
        &self,
        role: Role,
        engine_id: Option<String>,
        strength_level: u8,
        custom_options: IndexMap<String, String>,
        enabled: Option<bool>,
    ) -> OrchestratorResult<()> {
        let clamped_level = match &engine_id {
            Some(id) => {
                let descriptor = self
                    .catalog
                    .get(id)
                    .ok_or_else(|| OrchestratorError::UnknownEngine(id.clone()))?;
                let clamped = descriptor.clamp_strength(strength_level);
                if clamped != strength_level {
                    warn!("clamping strength {strength_level} to {clamped} for '{id}' (role {role:?})");
                }
                clamped
            }
            None => strength_level,
        };

        let mut state = self.state.lock().await;
        state.assignment.custom_options.insert(role, custom_options.clone());
        state.assignment.strength_levels.insert(role, clamped_level);
        if role == Role::Analysis {
            if let Some(enabled) = enabled {
                state.assignment.analysis_enabled = enabled;
            }
        }

        let old_id = state.assignment.roles.get(&role).cloned().flatten();

        let Some(new_id) = engine_id else {
            state.assignment.roles.insert(role, None);
            let stale = old_id.and_then(|id| Self::decrement(&mut state, &id));
            drop(state);
            if let Some(stale) = stale {
                Self::quit_handle(stale).await;
            }
            return Ok(());
        };

        if old_id.as_deref() == Some(new_id.as_str()) {
            let handle = state.handles.get(&new_id).map(|e| e.process.clone());
            drop(state);
            if let Some(handle) = handle {
                let descriptor = self
                    .catalog
                    .get(&new_id)
                    .ok_or_else(|| OrchestratorError::UnknownEngine(new_id.clone()))?;
                let mut process = handle.lock().await;
                apply_strength(&mut process, descriptor, clamped_level).await?;
                for (name, value) in &custom_options {
                    process.set_option(name, value).await?;
                }
            }
            return Ok(());
        }

        let needs_spawn = !state.handles.contains_key(&new_id);
        let descriptor = self
            .catalog
            .get(&new_id)
            .ok_or_else(|| OrchestratorError::UnknownEngine(new_id.clone()))?
            .clone();
        let current_position = state.assignment.current_position.clone();
        let move_history = state.assignment.move_history.clone();
        drop(state);

        let handle = if needs_spawn {
            let process = EngineProcess::spawn(descriptor.clone()).await?;
            Arc::new(Mutex::new(process))
        } else {
            let state = self.state.lock().await;
            state.handles.get(&new_id).expect("checked above").process.clone()
        };

        {
            let mut process = handle.lock().await;
            apply_strength(&mut process, &descriptor, clamped_level).await?;
            for (name, value) in &custom_options {
                process.set_option(name, value).await?;
            }
            process.new_game().await?;
            process.set_position(&current_position, &move_history).await?;
        }

        let mut state = self.state.lock().await;
        if needs_spawn {
            state.handles.insert(new_id.clone(), HandleEntry { process: handle, refcount: 1 });
        } else if let Some(entry) = state.handles.get_mut(&new_id) {
            entry.refcount += 1;
        }
        state.assignment.roles.insert(role, Some(new_id.clone()));

        let stale = old_id.and_then(|id| Self::decrement(&mut state, &id));
        drop(state);
        if let Some(stale) = stale {
            Self::quit_handle(stale).await;
        }

        info!("role {role:?} now assigned to engine '{new_id}'");
        Ok(())
    }

    /// Overwrites the shared game view and broadcasts `usinewgame` +
    /// `position ...` to every live handle, in that order.
    pub async fn update_position(&self, sfen: &str, moves: &[String]) -> OrchestratorResult<()> {
        let handles: Vec<Arc<Mutex<EngineProcess>>> = {
            let mut state = self.state.lock().await;
            state.assignment.current_position = sfen.to_string();
            state.assignment.move_history = moves.to_vec();
            state.handles.values().map(|e| e.process.clone()).collect()
        };

        for handle in handles {
            let mut process = handle.lock().await;
            process.new_game().await?;
            process.set_position(sfen, moves).await?;
        }
        Ok(())
    }

    /// Locates the handle assigned to `side` and runs one search cycle on
    /// it. Returns `Ok(None)` when no engine is assigned to that role —
    /// this is not an error.
    pub async fn get_move(
        &self,
        side: Role,
        params: &GoParams,
        info_callback: Option<&mut dyn FnMut(&InfoAccumulator)>,
    ) -> OrchestratorResult<Option<(String, Option<String>, InfoAccumulator)>> {
        let handle = {
            let state = self.state.lock().await;
            let Some(Some(id)) = state.assignment.roles.get(&side) else {
                return Ok(None);
            };
            match state.handles.get(id) {
                Some(entry) => entry.process.clone(),
                None => return Ok(None),
            }
        };

        if Self::handle_is_errored(&handle).await {
            self.reap_errored_handles().await;
            return Ok(None);
        }

        let mut process = handle.lock().await;
        let result = match info_callback {
            Some(cb) => process.go(params, Some(cb)).await?,
            None => process.go(params, None).await?,
        };
        Ok(Some((result.best_move, result.ponder, result.info)))
    }

    /// Runs a one-off search on the position `(sfen, moves)` using the
    /// engine assigned to the inferred (or explicit) side, then restores
    /// the handle's shared view so a later `getMove` is not corrupted.
    pub async fn analyze_position(
        &self,
        sfen: &str,
        moves: &[String],
        engine_id: Option<String>,
        movetime: u64,
        info_callback: Option<&mut dyn FnMut(&InfoAccumulator)>,
    ) -> OrchestratorResult<Option<(String, Option<String>, InfoAccumulator)>> {
        let (handle, shared_sfen, shared_moves) = {
            let state = self.state.lock().await;

            let resolved_id = match engine_id {
                Some(id) => Some(id),
                None => {
                    let side = RoleAssignment::side_to_move(sfen, moves);
                    let primary = state.assignment.roles.get(&side).cloned().flatten();
                    primary.or_else(|| {
                        side.other_side()
                            .and_then(|other| state.assignment.roles.get(&other).cloned().flatten())
                    })
                }
            };

            let Some(id) = resolved_id else {
                return Ok(None);
            };
            let Some(entry) = state.handles.get(&id) else {
                return Ok(None);
            };

            (
                entry.process.clone(),
                state.assignment.current_position.clone(),
                state.assignment.move_history.clone(),
            )
        };

        if Self::handle_is_errored(&handle).await {
            self.reap_errored_handles().await;
            return Ok(None);
        }

        let mut process = handle.lock().await;
        process.set_position(sfen, moves).await?;
        let go_params = GoParams {
            movetime: Some(movetime),
            ..Default::default()
        };
        let result = match info_callback {
            Some(cb) => process.go(&go_params, Some(cb)).await?,
            None => process.go(&go_params, None).await?,
        };
        process.set_position(&shared_sfen, &shared_moves).await?;

        Ok(Some((result.best_move, result.ponder, result.info)))
    }

    /// Starts the engine if it is not already running, returns its
    /// advertised options, and stops it again if it was started solely for
    /// this inspection.
    pub async fn inspect_options(&self, engine_id: &str) -> OrchestratorResult<Vec<crate::usi::USIOption>> {
        let existing = {
            let state = self.state.lock().await;
            state.handles.get(engine_id).map(|e| e.process.clone())
        };

        if let Some(handle) = existing {
            let process = handle.lock().await;
            return Ok(process.options().to_vec());
        }

        let descriptor = self
            .catalog
            .get(engine_id)
            .ok_or_else(|| OrchestratorError::UnknownEngine(engine_id.to_string()))?
            .clone();
        let mut process = EngineProcess::spawn(descriptor).await?;
        let options = process.options().to_vec();
        process.quit().await?;
        Ok(options)
    }

    /// Stops and removes every live handle, regardless of refcount.
    pub async fn shutdown(&self) {
        let handles: Vec<Arc<Mutex<EngineProcess>>> = {
            let mut state = self.state.lock().await;
            state.handles.drain().map(|(_, entry)| entry.process).collect()
        };
        for handle in handles {
            Self::quit_handle(handle).await;
        }
    }

    /// True if the handle is already known dead: either its state machine
    /// observed a read/write failure (`Error`), or its child exited without
    /// ever producing one (no pending read was in flight to catch it).
    async fn handle_is_errored(handle: &Arc<Mutex<EngineProcess>>) -> bool {
        let mut process = handle.lock().await;
        process.state() == EngineState::Error || !process.is_alive()
    }

    /// Sweeps any handle observed dead (`Error` state, or an exited child
    /// that never hit a read/write to notice): tears it down and reverts
    /// every role that pointed to it to `null`.
    pub async fn reap_errored_handles(&self) {
        let stale: Vec<(String, Arc<Mutex<EngineProcess>>)> = {
            let mut state = self.state.lock().await;
            let mut stale = Vec::new();
            for (id, entry) in state.handles.iter() {
                if Self::handle_is_errored(&entry.process).await {
                    stale.push(id.clone());
                }
            }
            let mut removed = Vec::new();
            for id in stale {
                if let Some(entry) = state.handles.remove(&id) {
                    removed.push((id.clone(), entry.process));
                }
                for slot in state.assignment.roles.values_mut() {
                    if slot.as_deref() == Some(id.as_str()) {
                        *slot = None;
                    }
                }
            }
            removed
        };
        for (id, handle) in stale {
            warn!("reaping errored engine handle '{id}'");
            Self::quit_handle(handle).await;
        }
    }

    /// Releases the departing role's reference to `id`. The refcount alone
    /// decides removal — it is already the count of roles pointing at this
    /// handle, so re-deriving that count from a role-table scan here would
    /// double-account for the very role being cleared.
    fn decrement(state: &mut ManagerState, id: &str) -> Option<Arc<Mutex<EngineProcess>>> {
        let Some(entry) = state.handles.get_mut(id) else {
            return None;
        };
        entry.refcount = entry.refcount.saturating_sub(1);
        if entry.refcount == 0 {
            state.handles.remove(id).map(|e| e.process)
        } else {
            None
        }
    }

    async fn quit_handle(handle: Arc<Mutex<EngineProcess>>) {
        match Arc::try_unwrap(handle) {
            Ok(mutex) => {
                let process = mutex.into_inner();
                if let Err(e) = process.quit().await {
                    warn!("error stopping engine: {e}");
                }
            }
            Err(handle) => {
                // Another clone is still outstanding (a concurrent caller mid
                // search); best-effort stop without consuming the process.
                let mut process = handle.lock().await;
                let _ = process.stop_search().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_with(id: &str, min: u8, max: u8) -> EngineDescriptor {
        let json = format!(
            r#"{{
                "id": "{id}", "name": "{id}", "author": "a", "version": "1.0",
                "description": "d", "license": "MIT", "executable": "engine",
                "protocol": "USI", "requiredFiles": [], "optionalFiles": [],
                "defaultOptions": {{}},
                "features": {{ "nnue": false, "ponder": false, "multiPV": false,
                    "skillLevel": true, "uciElo": true, "openingBook": false }},
                "strength": {{ "estimatedElo": 2000, "level": 10, "minLevel": {min}, "maxLevel": {max}, "notes": "" }},
                "strengthControl": {{ "supported": true, "methods": ["uciElo"], "notes": "" }}
            }}"#
        );
        let dir = tempfile::tempdir().unwrap();
        EngineDescriptor::load(dir.path(), &json).unwrap()
    }

    /// A descriptor that actually spawns, pointed at a fixture shell script
    /// under `tests/fixtures/` rather than a nonexistent executable.
    fn spawnable_descriptor(id: &str, script: &str) -> EngineDescriptor {
        let executable = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(script);
        let json = format!(
            r#"{{
                "id": "{id}", "name": "{id}", "author": "a", "version": "1.0",
                "description": "d", "license": "MIT", "executable": "{executable}",
                "protocol": "USI", "requiredFiles": [], "optionalFiles": [],
                "defaultOptions": {{}},
                "features": {{ "nnue": false, "ponder": false, "multiPV": false,
                    "skillLevel": true, "uciElo": true, "openingBook": false }},
                "strength": {{ "estimatedElo": 2000, "level": 10, "minLevel": 1, "maxLevel": 10, "notes": "" }},
                "strengthControl": {{ "supported": true, "methods": ["uciElo"], "notes": "" }}
            }}"#,
            executable = executable.display(),
        );
        let dir = tempfile::tempdir().unwrap();
        EngineDescriptor::load(dir.path(), &json).unwrap()
    }

    #[tokio::test]
    async fn unknown_engine_id_is_rejected_before_any_mutation() {
        let manager = RoleManager::new(vec![descriptor_with("yaneuraou", 1, 10)]);
        let err = manager
            .set_engine(Role::Black, Some("does-not-exist".into()), 10, IndexMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownEngine(_)));
        assert_eq!(manager.live_handle_count().await, 0);
    }

    #[tokio::test]
    async fn clearing_a_shared_handle_only_tears_it_down_once_unreferenced() {
        let manager = RoleManager::new(vec![spawnable_descriptor("shared", "fake_usi_engine.sh")]);

        manager
            .set_engine(Role::Black, Some("shared".into()), 10, IndexMap::new(), None)
            .await
            .unwrap();
        manager
            .set_engine(Role::White, Some("shared".into()), 10, IndexMap::new(), None)
            .await
            .unwrap();
        assert_eq!(manager.live_handle_count().await, 1);

        manager.set_engine(Role::Black, None, 10, IndexMap::new(), None).await.unwrap();
        assert_eq!(manager.live_handle_count().await, 1, "white still references the handle");

        manager.set_engine(Role::White, None, 10, IndexMap::new(), None).await.unwrap();
        assert_eq!(manager.live_handle_count().await, 0, "handle must be torn down once unreferenced");
    }

    #[tokio::test]
    async fn an_errored_handle_is_reaped_and_the_role_reverts_to_unassigned() {
        let manager = RoleManager::new(vec![spawnable_descriptor("dying", "dying_usi_engine.sh")]);
        manager
            .set_engine(Role::Black, Some("dying".into()), 10, IndexMap::new(), None)
            .await
            .unwrap();

        let params = GoParams::default();
        let first = manager.get_move(Role::Black, &params, None).await;
        assert!(first.is_err(), "a mid-search failure must surface to the caller");

        let second = manager.get_move(Role::Black, &params, None).await.unwrap();
        assert!(second.is_none(), "the role must read back as unassigned after reaping");
        assert_eq!(manager.live_handle_count().await, 0);
    }

    #[tokio::test]
    async fn side_to_move_defaults_to_black() {
        assert_eq!(RoleAssignment::side_to_move("startpos", &[]), Role::Black);
        assert_eq!(
            RoleAssignment::side_to_move("lnsgkgsnl/9/ppppppppp/9/9/9/PPPPPPPPP/9/LNSGKGSNL w - 1", &[]),
            Role::White
        );
        assert_eq!(
            RoleAssignment::side_to_move("startpos", &["7g7f".to_string()]),
            Role::White
        );
    }
}
