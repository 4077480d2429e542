use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// Capability flags an engine declares about itself. All six are required to
/// be present in `config.json` — a missing flag invalidates the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineFeatures {
    pub nnue: bool,
    pub ponder: bool,
    pub multi_pv: bool,
    pub skill_level: bool,
    pub uci_elo: bool,
    pub opening_book: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStrength {
    pub estimated_elo: i64,
    pub level: u8,
    pub min_level: u8,
    pub max_level: u8,
    #[serde(default)]
    pub notes: String,
}

/// Strength-control methods an engine exposes. Kept as a set of known
/// strings rather than an enum set because the catalog is allowed to name
/// methods the Role Manager doesn't act on (`"time"`, `"hash"`, `"threads"`)
/// — they are informational, only `uciElo`/`skillLevel` drive §4.4.1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrengthControl {
    pub supported: bool,
    #[serde(default)]
    pub methods: HashSet<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageNotes {
    #[serde(default)]
    pub not_for_play: bool,
}

/// The static, on-disk description of an engine. Immutable after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineDescriptor {
    pub id: String,
    pub name: String,
    pub author: String,
    pub version: String,
    pub description: String,
    pub license: String,

    pub executable_path: PathBuf,
    pub working_directory: PathBuf,

    pub protocol: String,

    #[serde(default)]
    pub required_files: Vec<PathBuf>,
    #[serde(default)]
    pub optional_files: Vec<PathBuf>,

    /// Preserves declaration order: applied in that order at handshake time.
    #[serde(default)]
    pub default_options: IndexMap<String, String>,

    pub features: EngineFeatures,
    pub strength: EngineStrength,
    pub strength_control: StrengthControl,

    #[serde(default)]
    pub usage_notes: UsageNotes,
}

/// The shape of `config.json` on disk, before paths are resolved relative to
/// the directory it was found in. `executable` is a filename or relative
/// path; `executablePath`/`workingDirectory` do not exist in the file itself
/// — they are derived during discovery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    id: String,
    name: String,
    author: String,
    version: String,
    description: String,
    license: String,
    executable: PathBuf,
    protocol: String,
    #[serde(default)]
    required_files: Vec<PathBuf>,
    #[serde(default)]
    optional_files: Vec<PathBuf>,
    #[serde(default)]
    default_options: IndexMap<String, String>,
    features: EngineFeatures,
    strength: EngineStrength,
    strength_control: StrengthControl,
    #[serde(default)]
    usage_notes: UsageNotes,
}

impl EngineDescriptor {
    /// Parses, resolves, and validates a `config.json` found at
    /// `engine_dir/config.json`. Never panics; every failure becomes a
    /// `DescriptorInvalid`/`MissingFile` error for the caller (discovery) to
    /// log and skip.
    pub fn load(engine_dir: &Path, config_json: &str) -> Result<Self, OrchestratorError> {
        let raw: RawDescriptor = serde_json::from_str(config_json).map_err(|e| OrchestratorError::DescriptorInvalid {
            engine_dir: engine_dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        if raw.protocol != "USI" {
            return Err(OrchestratorError::DescriptorInvalid {
                engine_dir: engine_dir.to_path_buf(),
                reason: format!("unsupported protocol {:?}, expected \"USI\"", raw.protocol),
            });
        }

        if raw.strength.min_level < 1
            || raw.strength.max_level > 10
            || raw.strength.min_level > raw.strength.max_level
        {
            return Err(OrchestratorError::DescriptorInvalid {
                engine_dir: engine_dir.to_path_buf(),
                reason: format!(
                    "strength level range {}..{} is invalid, expected 1..=10",
                    raw.strength.min_level, raw.strength.max_level
                ),
            });
        }

        let descriptor = EngineDescriptor {
            id: raw.id,
            name: raw.name,
            author: raw.author,
            version: raw.version,
            description: raw.description,
            license: raw.license,
            executable_path: engine_dir.join(&raw.executable),
            working_directory: engine_dir.to_path_buf(),
            protocol: raw.protocol,
            required_files: raw.required_files,
            optional_files: raw.optional_files,
            default_options: raw.default_options,
            features: raw.features,
            strength: raw.strength,
            strength_control: raw.strength_control,
            usage_notes: raw.usage_notes,
        };

        for required in &descriptor.required_files {
            let path = descriptor.working_directory.join(required);
            if !path.exists() {
                return Err(OrchestratorError::MissingFile {
                    engine_dir: engine_dir.to_path_buf(),
                    file: required.clone(),
                });
            }
        }

        Ok(descriptor)
    }

    pub fn is_playable(&self) -> bool {
        !self.usage_notes.not_for_play
    }

    pub fn clamp_strength(&self, level: u8) -> u8 {
        level.clamp(self.strength.min_level, self.strength.max_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json(protocol: &str) -> String {
        format!(
            r#"{{
                "id": "yaneuraou",
                "name": "YaneuraOu",
                "author": "Yaneurao",
                "version": "7.00",
                "description": "A strong shogi engine",
                "license": "GPL-3.0",
                "executable": "YaneuraOu",
                "protocol": "{protocol}",
                "requiredFiles": [],
                "optionalFiles": [],
                "defaultOptions": {{ "Hash": "128", "Threads": "2" }},
                "features": {{
                    "nnue": true, "ponder": true, "multiPV": true,
                    "skillLevel": true, "uciElo": true, "openingBook": false
                }},
                "strength": {{ "estimatedElo": 3500, "level": 10, "minLevel": 1, "maxLevel": 10, "notes": "" }},
                "strengthControl": {{ "supported": true, "methods": ["uciElo", "skillLevel"], "notes": "" }}
            }}"#
        )
    }

    #[test]
    fn loads_valid_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = EngineDescriptor::load(dir.path(), &sample_json("USI")).unwrap();
        assert_eq!(descriptor.id, "yaneuraou");
        let keys: Vec<&str> = descriptor.default_options.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Hash", "Threads"]);
        assert_eq!(descriptor.default_options.get("Hash").unwrap(), "128");
        assert!(descriptor.is_playable());
    }

    #[test]
    fn rejects_non_usi_protocol() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EngineDescriptor::load(dir.path(), &sample_json("UCI")).is_err());
    }

    #[test]
    fn rejects_missing_required_file() {
        let dir = tempfile::tempdir().unwrap();
        let json = sample_json("USI").replace(r#""requiredFiles": [],"#, r#""requiredFiles": ["nn.bin"],"#);
        let err = EngineDescriptor::load(dir.path(), &json).unwrap_err();
        assert!(matches!(err, OrchestratorError::MissingFile { .. }));
    }

    #[test]
    fn clamps_strength_to_descriptor_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = EngineDescriptor::load(dir.path(), &sample_json("USI")).unwrap();
        assert_eq!(descriptor.clamp_strength(15), 10);
        assert_eq!(descriptor.clamp_strength(0), 1);
        assert_eq!(descriptor.clamp_strength(5), 5);
    }
}
