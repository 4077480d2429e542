//! USI (Universal Shogi Interface) line protocol: pure formatting and
//! parsing with no I/O of its own. Engine Process owns the actual streams
//! and calls into this module for every outbound/inbound line.

mod codec;
mod option;

pub use codec::{format_go, format_position, format_setoption, parse_bestmove, parse_info, parse_option, GoParams, InfoAccumulator};
pub use option::{USIOption, USIOptionKind};
