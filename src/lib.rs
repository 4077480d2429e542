//! # Shogi Engine Orchestrator
//!
//! A long-lived supervisor that discovers, launches, configures, and
//! multiplexes external USI-speaking shogi engines across three roles:
//! black player, white player, and position analyzer.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Orchestrator   │────│   Role Manager  │────│ Preference Store│
//! │   (facade)      │    │ (role↔engine,   │    │  (load/save)    │
//! │                 │    │  refcounting)   │    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!                                  │
//!                         ┌─────────────────┐    ┌─────────────────┐
//!                         │ Engine Process  │────│    USI Codec    │
//!                         │ (one child per  │    │ (pure parse/    │
//!                         │    handle)      │    │    format)      │
//!                         └─────────────────┘    └─────────────────┘
//!                                  │
//!                         ┌─────────────────┐
//!                         │  Config Store   │
//!                         │ (descriptor     │
//!                         │  discovery)     │
//!                         └─────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! - **usi**: wire-format formatters and parsers; no I/O, no state.
//! - **config**: on-disk engine descriptor discovery and validation.
//! - **process**: owns one spawned child end-to-end — handshake, options,
//!   search cycle, shutdown.
//! - **role**: role → engine-id assignment, reference-counted handle table,
//!   strength mapping, position broadcast.
//! - **preferences**: persists the role assignment across restarts.
//! - **orchestrator**: the facade callers hold; wires the above together.

mod config;
mod error;
mod preferences;
mod process;
mod role;
mod usi;

mod orchestrator;

pub use config::{EngineDescriptor, EngineFeatures, EngineStrength, StrengthControl, UsageNotes};
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{default_engines_root, default_preferences_path, Orchestrator};
pub use process::EngineState;
pub use role::{elo_for_level, skill_level_for, Role, RoleAssignment};
pub use usi::{format_go, format_position, format_setoption, parse_bestmove, parse_info, parse_option, GoParams, InfoAccumulator, USIOption, USIOptionKind};
