use std::path::{Path, PathBuf};

/// Absolute path to the fixture USI engine shell script.
pub fn fixture_engine_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fake_usi_engine.sh")
}

/// Absolute path to the fixture engine that completes the handshake and
/// then exits before ever answering `go`.
pub fn dying_engine_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/dying_usi_engine.sh")
}

/// Writes `<engines_root>/<id>/config.json` pointing at the fixture engine,
/// with `strength.minLevel..maxLevel` spanning the whole 1..=10 range unless
/// overridden.
pub fn write_engine_descriptor(engines_root: &Path, id: &str, min_level: u8, max_level: u8) {
    write_engine_descriptor_with(engines_root, id, min_level, max_level, &fixture_engine_path());
}

pub fn write_engine_descriptor_with(
    engines_root: &Path,
    id: &str,
    min_level: u8,
    max_level: u8,
    executable: &Path,
) {
    let engine_dir = engines_root.join(id);
    std::fs::create_dir_all(&engine_dir).unwrap();
    let json = format!(
        r#"{{
            "id": "{id}",
            "name": "{id}",
            "author": "Test",
            "version": "1.0",
            "description": "fixture engine",
            "license": "MIT",
            "executable": "{executable}",
            "protocol": "USI",
            "requiredFiles": [],
            "optionalFiles": [],
            "defaultOptions": {{ "USI_Hash": "16" }},
            "features": {{
                "nnue": false, "ponder": true, "multiPV": false,
                "skillLevel": true, "uciElo": true, "openingBook": false
            }},
            "strength": {{ "estimatedElo": 2000, "level": 10, "minLevel": {min_level}, "maxLevel": {max_level}, "notes": "" }},
            "strengthControl": {{ "supported": true, "methods": ["uciElo", "skillLevel"], "notes": "" }}
        }}"#,
        executable = executable.display(),
    );
    std::fs::write(engine_dir.join("config.json"), json).unwrap();
}
