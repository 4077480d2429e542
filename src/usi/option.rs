use serde::{Deserialize, Serialize};

/// A USI option as reported by an engine during the `usi`/`usiok` handshake.
///
/// Kept as a tagged variant per kind rather than one weakly-typed struct, so
/// `min`/`max`/`choices` only exist on the shapes that actually carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum USIOptionKind {
    Spin { min: i64, max: i64 },
    Check,
    Combo { choices: Vec<String> },
    String,
    Button,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct USIOption {
    pub name: String,
    pub default: String,
    #[serde(flatten)]
    pub kind: USIOptionKind,
}

impl USIOption {
    pub fn spin(name: impl Into<String>, default: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            kind: USIOptionKind::Spin { min, max },
        }
    }

    pub fn check(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            kind: USIOptionKind::Check,
        }
    }

    pub fn combo(name: impl Into<String>, default: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            kind: USIOptionKind::Combo { choices },
        }
    }
}
