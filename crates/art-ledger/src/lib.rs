//! Append-only per-run ledger and its deterministic projection to
//! provider-ready messages (spec §3 "Transcript / ledger", §4.6).

pub mod entry;
pub mod ledger;
pub mod projection;
pub mod turn_sequencer;

pub use entry::LedgerEntry;
pub use ledger::Ledger;
pub use projection::{project, validate_no_dangling_tool_use};
pub use turn_sequencer::TurnSequencer;
