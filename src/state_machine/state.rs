//! Session state types

use crate::config::GradeRules;
use crate::grades::{GradeEntry, PendingEntry};
use serde::{Deserialize, Serialize};

/// Chat-platform user identifier
pub type UserId = i64;

/// Which persisted grade list an operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeSlot {
    /// Overwritten on every average computation
    Last,
    /// Written only when the user asks to save
    Saved,
}

/// Conversation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// No conversation in progress
    #[default]
    Idle,

    /// `start` received, degree flag being read from the profile
    Starting,

    /// Waiting for the exact-sciences yes/no buttons
    AskDegree,

    /// Accepting grade lines and grade-list actions
    EnterGrade,

    /// Validated entries waiting for the advanced/regular choice
    ChooseCourseType { pending: Vec<PendingEntry> },

    /// Waiting for an index list to delete
    DeleteGrade,

    /// A stored grade list is being read for appending
    LoadingGrades { slot: GradeSlot },

    /// Average computed, saved grades being read for the save-skip check
    CheckingSaved,

    /// Waiting for save / don't save
    SaveDecision,

    WriteFeedback,

    WriteBroadcast,

    GetTargetUserId,

    WritePrivateMessage { target: UserId },

    /// Conversation finished; the runtime tears the session down
    Ended,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::AskDegree => "ask_degree",
            SessionState::EnterGrade => "enter_grade",
            SessionState::ChooseCourseType { .. } => "choose_course_type",
            SessionState::DeleteGrade => "delete_grade",
            SessionState::LoadingGrades { .. } => "loading_grades",
            SessionState::CheckingSaved => "checking_saved",
            SessionState::SaveDecision => "save_decision",
            SessionState::WriteFeedback => "write_feedback",
            SessionState::WriteBroadcast => "write_broadcast",
            SessionState::GetTargetUserId => "get_target_user_id",
            SessionState::WritePrivateMessage { .. } => "write_private_message",
            SessionState::Ended => "ended",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Ended)
    }
}

/// In-memory conversation data for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub is_exact_sciences: Option<bool>,
    pub grades: Vec<GradeEntry>,
    pub state: SessionState,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            is_exact_sciences: None,
            grades: Vec::new(),
            state: SessionState::Idle,
        }
    }

    /// Same data, different state
    pub fn with_state(&self, state: SessionState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn is_exact_sciences(&self) -> bool {
        self.is_exact_sciences.unwrap_or(false)
    }
}

/// Immutable configuration handed to every transition
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub rules: GradeRules,
}

impl SessionContext {
    pub fn new(rules: GradeRules) -> Self {
        Self { rules }
    }
}
