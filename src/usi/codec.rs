//! USI line protocol: formatters and parsers.
//!
//! Pure functions only — no I/O, no state. Grounded on the wire semantics of
//! the original `usi_protocol.py` (keyword-scan `parse_info`, regex-based
//! `parse_option`, ordered-token `format_go`).

use super::option::{USIOption, USIOptionKind};

/// Parameters for a `go` command. Any subset may be set; `infinite` is
/// exclusive of the rest when true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub btime: Option<u64>,
    pub wtime: Option<u64>,
    pub binc: Option<u64>,
    pub winc: Option<u64>,
    pub byoyomi: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<u64>,
    pub nodes: Option<u64>,
    pub infinite: bool,
}

/// The running accumulator built from `info` lines during a search.
/// Later lines overwrite earlier ones field-by-field, matching
/// `best_info.update(info)` in the original implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoAccumulator {
    pub depth: Option<u64>,
    pub seldepth: Option<u64>,
    pub score_cp: Option<i64>,
    pub mate: Option<i64>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub time: Option<u64>,
    pub hashfull: Option<u64>,
    pub pv: Vec<String>,
}

impl InfoAccumulator {
    /// Merge a freshly parsed `info` line into the accumulator: every field
    /// the new line sets replaces the accumulator's value.
    pub fn merge(&mut self, line: InfoAccumulator) {
        if line.depth.is_some() {
            self.depth = line.depth;
        }
        if line.seldepth.is_some() {
            self.seldepth = line.seldepth;
        }
        if line.score_cp.is_some() {
            self.score_cp = line.score_cp;
        }
        if line.mate.is_some() {
            self.mate = line.mate;
        }
        if line.nodes.is_some() {
            self.nodes = line.nodes;
        }
        if line.nps.is_some() {
            self.nps = line.nps;
        }
        if line.time.is_some() {
            self.time = line.time;
        }
        if line.hashfull.is_some() {
            self.hashfull = line.hashfull;
        }
        if !line.pv.is_empty() {
            self.pv = line.pv;
        }
    }

    /// True iff parsing the line yielded no recognized field at all —
    /// used by callers deciding whether a line contributed anything.
    pub fn is_empty(&self) -> bool {
        self.depth.is_none()
            && self.seldepth.is_none()
            && self.score_cp.is_none()
            && self.mate.is_none()
            && self.nodes.is_none()
            && self.nps.is_none()
            && self.time.is_none()
            && self.hashfull.is_none()
            && self.pv.is_empty()
    }
}

/// `setoption name <name> value <value>`
pub fn format_setoption(name: &str, value: &str) -> String {
    format!("setoption name {name} value {value}")
}

/// `position startpos [moves ...]` or `position sfen <sfen> [moves ...]`.
pub fn format_position(sfen: &str, moves: &[String]) -> String {
    let mut cmd = if sfen == "startpos" || sfen.starts_with("startpos") {
        "position startpos".to_string()
    } else {
        format!("position sfen {sfen}")
    };
    if !moves.is_empty() {
        cmd.push_str(" moves ");
        cmd.push_str(&moves.join(" "));
    }
    cmd
}

/// Assembles a `go` command in the fixed token order the protocol expects.
/// `infinite` is exclusive: when true, no other parameter is emitted.
pub fn format_go(params: &GoParams) -> String {
    let mut parts = vec!["go".to_string()];

    if params.infinite {
        parts.push("infinite".to_string());
        return parts.join(" ");
    }

    if let Some(v) = params.btime {
        parts.push("btime".into());
        parts.push(v.to_string());
    }
    if let Some(v) = params.wtime {
        parts.push("wtime".into());
        parts.push(v.to_string());
    }
    if let Some(v) = params.binc {
        parts.push("binc".into());
        parts.push(v.to_string());
    }
    if let Some(v) = params.winc {
        parts.push("winc".into());
        parts.push(v.to_string());
    }
    if let Some(v) = params.byoyomi {
        parts.push("byoyomi".into());
        parts.push(v.to_string());
    }
    if let Some(v) = params.movetime {
        parts.push("movetime".into());
        parts.push(v.to_string());
    }
    if let Some(v) = params.depth {
        parts.push("depth".into());
        parts.push(v.to_string());
    }
    if let Some(v) = params.nodes {
        parts.push("nodes".into());
        parts.push(v.to_string());
    }

    parts.join(" ")
}

/// Parses an `option name ... type ...` line reported during the handshake.
/// Malformed input returns `None`: the line is skipped, never fatal.
pub fn parse_option(line: &str) -> Option<USIOption> {
    let rest = line.strip_prefix("option name ")?.trim();

    let type_idx = rest.find(" type ")?;
    let name = rest[..type_idx].trim().to_string();
    let rest = rest[type_idx + " type ".len()..].trim();

    let mut tokens = rest.split_whitespace().peekable();
    let option_type = tokens.next()?.to_string();

    let mut default: Option<String> = None;
    let mut min: Option<i64> = None;
    let mut max: Option<i64> = None;
    let mut choices = Vec::new();

    let remaining: Vec<&str> = tokens.collect();
    let mut i = 0;
    while i < remaining.len() {
        match remaining[i] {
            "default" if i + 1 < remaining.len() => {
                default = Some(remaining[i + 1].to_string());
                i += 2;
            }
            "min" if i + 1 < remaining.len() => {
                min = remaining[i + 1].parse().ok();
                i += 2;
            }
            "max" if i + 1 < remaining.len() => {
                max = remaining[i + 1].parse().ok();
                i += 2;
            }
            "var" if i + 1 < remaining.len() => {
                choices.push(remaining[i + 1].to_string());
                i += 2;
            }
            _ => i += 1,
        }
    }

    let default = default.unwrap_or_default();
    let kind = match option_type.as_str() {
        "spin" => USIOptionKind::Spin {
            min: min.unwrap_or(0),
            max: max.unwrap_or(0),
        },
        "check" => USIOptionKind::Check,
        "combo" => USIOptionKind::Combo { choices },
        "string" => USIOptionKind::String,
        "button" => USIOptionKind::Button,
        _ => return None,
    };

    Some(USIOption { name, default, kind })
}

/// `bestmove <move> [ponder <move>]`. Special tokens (`resign`, `win`,
/// `pass`) are returned verbatim as the move.
pub fn parse_bestmove(line: &str) -> Option<(String, Option<String>)> {
    let rest = line.strip_prefix("bestmove ")?;
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let best = parts.first()?.to_string();
    let ponder = if parts.len() >= 3 && parts[1] == "ponder" {
        Some(parts[2].to_string())
    } else {
        None
    };
    Some((best, ponder))
}

/// Extracts recognized fields from an `info` line by keyword scan. Keywords
/// missing their expected following token are skipped without error.
pub fn parse_info(line: &str) -> InfoAccumulator {
    let mut info = InfoAccumulator::default();
    if !line.starts_with("info ") {
        return info;
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut i = 1; // skip "info"
    while i < parts.len() {
        match parts[i] {
            "depth" if i + 1 < parts.len() => {
                info.depth = parts[i + 1].parse().ok();
                i += 2;
            }
            "seldepth" if i + 1 < parts.len() => {
                info.seldepth = parts[i + 1].parse().ok();
                i += 2;
            }
            "score" if i + 2 < parts.len() => {
                match parts[i + 1] {
                    "cp" => info.score_cp = parts[i + 2].parse().ok(),
                    "mate" => info.mate = parts[i + 2].parse().ok(),
                    _ => {}
                }
                i += 3;
            }
            "nodes" if i + 1 < parts.len() => {
                info.nodes = parts[i + 1].parse().ok();
                i += 2;
            }
            "nps" if i + 1 < parts.len() => {
                info.nps = parts[i + 1].parse().ok();
                i += 2;
            }
            "time" if i + 1 < parts.len() => {
                info.time = parts[i + 1].parse().ok();
                i += 2;
            }
            "hashfull" if i + 1 < parts.len() => {
                info.hashfull = parts[i + 1].parse().ok();
                i += 2;
            }
            "pv" => {
                info.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            _ => i += 1,
        }
    }

    info
}
