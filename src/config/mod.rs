//! Engine Config Store: on-disk descriptor discovery and validation.

mod descriptor;
mod discovery;

pub use descriptor::{EngineDescriptor, EngineFeatures, EngineStrength, StrengthControl, UsageNotes};
pub use discovery::{discover_engines, playable};
