//! Deterministic projection of the ledger to provider messages (spec
//! §4.6 "Transcript, ledger and message projection").
//!
//! Rules enforced here:
//! 2. Conversation messages alternate user/assistant; every assistant
//!    message with `tool_use` parts is immediately followed by exactly
//!    one user (tool) message whose `tool_result` parts match the
//!    `tool_use` ids in the same order.
//! 4. Projection fails with a structured error rather than sending
//!    invalid content downstream.

use art_domain::{ToolCallId, TranscriptError};
use art_model::{Message, Part};

use crate::entry::LedgerEntry;

/// Project a run's ledger entries into the assistant/tool message pairs
/// that belong after the system+user preamble the caller already holds.
pub fn project(entries: &[LedgerEntry]) -> Result<Vec<Message>, TranscriptError> {
    let mut messages = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        match &entries[i] {
            LedgerEntry::AssistantText { .. }
            | LedgerEntry::AssistantThinking { .. }
            | LedgerEntry::ToolUse { .. } => {
                let mut parts = Vec::new();
                let mut expected_ids: Vec<ToolCallId> = Vec::new();
                while i < entries.len() {
                    match &entries[i] {
                        LedgerEntry::AssistantText { text, .. } => {
                            parts.push(Part::Text { text: text.clone() });
                            i += 1;
                        }
                        LedgerEntry::AssistantThinking { text, .. } => {
                            parts.push(Part::Thinking { text: text.clone() });
                            i += 1;
                        }
                        LedgerEntry::ToolUse {
                            tool_call_id,
                            tool_id,
                            arguments,
                            ..
                        } => {
                            parts.push(Part::ToolUse {
                                id: tool_call_id.to_string(),
                                name: tool_id.clone(),
                                input: arguments.clone(),
                            });
                            expected_ids.push(*tool_call_id);
                            i += 1;
                        }
                        _ => break,
                    }
                }
                messages.push(Message::assistant(parts));

                if !expected_ids.is_empty() {
                    let (tool_message, consumed) = collect_tool_results(&entries[i..], &expected_ids)?;
                    messages.push(tool_message);
                    i += consumed;
                }
            }
            LedgerEntry::ToolResult { tool_call_id, .. } => {
                return Err(TranscriptError::InvalidSequence(format!(
                    "tool_result for {tool_call_id} with no preceding assistant tool_use block"
                )));
            }
            LedgerEntry::PlannerNote { .. } | LedgerEntry::UsageDelta { .. } => {
                i += 1;
            }
        }
    }
    Ok(messages)
}

fn collect_tool_results(
    rest: &[LedgerEntry],
    expected_ids: &[ToolCallId],
) -> Result<(Message, usize), TranscriptError> {
    let mut parts = Vec::new();
    let mut consumed = 0;
    for entry in rest {
        match entry {
            LedgerEntry::ToolResult {
                tool_call_id,
                result,
                is_error,
                ..
            } => {
                parts.push(Part::ToolResult {
                    tool_use_id: tool_call_id.to_string(),
                    content: result.to_string(),
                    is_error: *is_error,
                });
                consumed += 1;
            }
            _ => break,
        }
    }

    let got_ids: Vec<String> = parts
        .iter()
        .filter_map(Part::tool_use_id)
        .map(String::from)
        .collect();
    let want_ids: Vec<String> = expected_ids.iter().map(ToString::to_string).collect();
    if got_ids != want_ids {
        return Err(TranscriptError::InvalidSequence(format!(
            "tool_result order {got_ids:?} does not match tool_use order {want_ids:?}"
        )));
    }

    Ok((Message::tool_results(parts), consumed))
}

/// Validate that a *final* transcript has no dangling `tool_use` (spec §8
/// universal property 2): every `tool_use` must have a matching
/// `tool_result` in the immediately following message.
pub fn validate_no_dangling_tool_use(entries: &[LedgerEntry]) -> Result<(), TranscriptError> {
    project(entries).map(|_| ())
}
