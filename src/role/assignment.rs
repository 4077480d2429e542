use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The three slots an engine can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Black,
    White,
    Analysis,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "black" => Some(Role::Black),
            "white" => Some(Role::White),
            "analysis" => Some(Role::Analysis),
            _ => None,
        }
    }

    pub fn other_side(self) -> Option<Role> {
        match self {
            Role::Black => Some(Role::White),
            Role::White => Some(Role::Black),
            Role::Analysis => None,
        }
    }
}

/// Owned by the Role Manager: the current engine-to-role mapping, per-role
/// strength/options, and the shared game view every live handle is kept
/// synchronized to.
#[derive(Debug, Clone)]
pub struct RoleAssignment {
    pub roles: HashMap<Role, Option<String>>,
    pub strength_levels: HashMap<Role, u8>,
    pub custom_options: HashMap<Role, IndexMap<String, String>>,
    pub analysis_enabled: bool,
    pub current_position: String,
    pub move_history: Vec<String>,
}

impl Default for RoleAssignment {
    fn default() -> Self {
        let mut roles = HashMap::new();
        let mut strength_levels = HashMap::new();
        let mut custom_options = HashMap::new();
        for role in [Role::Black, Role::White, Role::Analysis] {
            roles.insert(role, None);
            strength_levels.insert(role, 10);
            custom_options.insert(role, IndexMap::new());
        }
        Self {
            roles,
            strength_levels,
            custom_options,
            analysis_enabled: false,
            current_position: "startpos".to_string(),
            move_history: Vec::new(),
        }
    }
}

impl RoleAssignment {
    /// Determines which side is to move from an explicit move list (parity)
    /// or, failing that, the SFEN's side-to-move field. Defaults to black
    /// when neither is available — preserved from the source implementation.
    pub fn side_to_move(sfen: &str, moves: &[String]) -> Role {
        if !moves.is_empty() {
            return if moves.len() % 2 == 0 { Role::Black } else { Role::White };
        }
        if sfen == "startpos" {
            return Role::Black;
        }
        let parts: Vec<&str> = sfen.split_whitespace().collect();
        if parts.len() >= 2 {
            return if parts[1] == "w" { Role::White } else { Role::Black };
        }
        Role::Black
    }
}
