//! Crate-wide error taxonomy for the orchestrator.
//!
//! Mirrors the cause-based taxonomy the orchestrator is specified against:
//! discovery failures are absorbed by the caller (logged and skipped), while
//! handshake, spawn, and runtime failures propagate and tear down the handle
//! that produced them.

use std::path::PathBuf;

use crate::process::EngineState;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine descriptor in {engine_dir:?} is invalid: {reason}")]
    DescriptorInvalid { engine_dir: PathBuf, reason: String },

    #[error("engine in {engine_dir:?} is missing required file {file:?}")]
    MissingFile { engine_dir: PathBuf, file: PathBuf },

    #[error("failed to spawn engine executable {path:?}: {source}")]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine did not complete the {phase} handshake within its deadline")]
    HandshakeTimeout { phase: &'static str },

    #[error("engine '{engine_id}' exited unexpectedly")]
    UnexpectedExit { engine_id: String },

    #[error("write to engine '{engine_id}' stdin failed: {source}")]
    WriteFailed {
        engine_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: EngineState, to: EngineState },

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown engine id: {0}")]
    UnknownEngine(String),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
