//! Conversation session state: one record per live conversation, owned by
//! the turn orchestrator and persisted between turns.

pub mod store;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::NEUTRAL_LSM;

/// Avatar arm of the experimental design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarKind {
    Generated,
    Premade,
    None,
}

/// Assigned experimental condition: two independent axes. `lsm` selects
/// adaptive vs static prompting; `avatar`/`avatar_type` describe the
/// avatar arm (rendered elsewhere, carried here for assignment and logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub avatar: bool,
    pub lsm: bool,
    #[serde(rename = "avatarType")]
    pub avatar_type: AvatarKind,
}

/// Resolve one of the six named experiment cells.
pub fn condition_for_name(name: &str) -> Option<Condition> {
    let c = |avatar, lsm, avatar_type| Condition { avatar, lsm, avatar_type };
    match name {
        "generated_adaptive" => Some(c(true, true, AvatarKind::Generated)),
        "generated_static" => Some(c(true, false, AvatarKind::Generated)),
        "premade_adaptive" => Some(c(true, true, AvatarKind::Premade)),
        "premade_static" => Some(c(true, false, AvatarKind::Premade)),
        "none_adaptive" => Some(c(false, true, AvatarKind::None)),
        "none_static" => Some(c(false, false, AvatarKind::None)),
        _ => None,
    }
}

/// Speaker role of one history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Legacy alias some clients send for assistant turns.
    Model,
}

/// One message in the ordered conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub turn_number: u32,
}

/// Mutable per-conversation record. Exclusively owned by the orchestrator
/// for the duration of a turn; engine components only ever see copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub participant_id: String,
    pub condition: Condition,
    pub condition_name: String,
    pub turn_number: u32,
    /// Exponentially smoothed LSM. `None` means "never recorded", which is
    /// distinct from the explicit neutral prior and must survive
    /// round-trips through the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothed_lsm_score: Option<f64>,
    pub history: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_prompt: Option<String>,
    pub log_file_path: PathBuf,
}

impl Session {
    /// Create a fresh session at turn 0 with the explicit neutral prior.
    pub fn new(
        session_id: String,
        participant_id: String,
        condition: Condition,
        condition_name: String,
        log_dir: &std::path::Path,
    ) -> Self {
        let log_file_path =
            log_dir.join(format!("participant_{participant_id}_{session_id}.jsonl"));
        Self {
            session_id,
            participant_id,
            condition,
            condition_name,
            turn_number: 0,
            smoothed_lsm_score: Some(NEUTRAL_LSM),
            history: Vec::new(),
            avatar_url: None,
            avatar_prompt: None,
            log_file_path,
        }
    }

    /// Smoothed LSM with the neutral prior standing in for a record that
    /// never carried one.
    pub fn effective_lsm(&self) -> f64 {
        self.smoothed_lsm_score.unwrap_or(NEUTRAL_LSM)
    }

    /// Append one message at the given turn.
    pub fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(Message {
            role,
            content: content.into(),
            turn_number: self.turn_number,
        });
    }
}

/// Fixed assistant opener recorded as turn 0 of every conversation.
pub fn initial_greeting() -> String {
    format!(
        "Hey there, I'm {}. What's on your mind today, or how's your day been so far?",
        crate::config::DEFAULT_BOT_NAME
    )
}
