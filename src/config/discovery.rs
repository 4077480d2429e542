use std::path::Path;

use log::{info, warn};

use super::descriptor::EngineDescriptor;

/// Enumerates immediate subdirectories of `engines_root`; each one
/// containing a `config.json` is a candidate engine. A subdirectory that
/// fails to parse or validate is logged and skipped — discovery never
/// aborts on a single engine's failure.
pub fn discover_engines(engines_root: &Path) -> Vec<EngineDescriptor> {
    let mut descriptors = Vec::new();

    let entries = match std::fs::read_dir(engines_root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot read engines root {engines_root:?}: {e}");
            return descriptors;
        }
    };

    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }

        let config_path = dir.join("config.json");
        let json = match std::fs::read_to_string(&config_path) {
            Ok(json) => json,
            Err(_) => {
                warn!("no config.json found in {dir:?}, skipping");
                continue;
            }
        };

        match EngineDescriptor::load(&dir, &json) {
            Ok(descriptor) => {
                info!("discovered engine '{}' in {dir:?}", descriptor.id);
                descriptors.push(descriptor);
            }
            Err(e) => {
                warn!("failed to load engine from {dir:?}: {e}");
            }
        }
    }

    descriptors
}

/// The subset of the catalog exposed to normal play UIs: engines flagged
/// `usageNotes.notForPlay` remain discoverable but are hidden here.
pub fn playable<'a>(descriptors: &'a [EngineDescriptor]) -> Vec<&'a EngineDescriptor> {
    descriptors.iter().filter(|d| d.is_playable()).collect()
}
