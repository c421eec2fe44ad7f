//! Events that drive a session

use super::state::{GradeSlot, UserId};
use crate::grades::GradeEntry;
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    Start,
    Text { body: String },
    Button(Button),
    Command(Command),

    // Profile store replies
    DegreeFlagLoaded { is_exact_sciences: Option<bool> },
    GradesLoaded { slot: GradeSlot, grades: Vec<GradeEntry> },
}

impl Event {
    pub fn text(body: impl Into<String>) -> Self {
        Event::Text { body: body.into() }
    }

    pub fn is_button(&self) -> bool {
        matches!(self, Event::Button(_))
    }

    /// Events produced by the runtime rather than the user
    pub fn is_store_reply(&self) -> bool {
        matches!(
            self,
            Event::DegreeFlagLoaded { .. } | Event::GradesLoaded { .. }
        )
    }
}

/// Inline button tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    DegreeYes,
    DegreeNo,
    Finished,
    Delete,
    ChangeDegree,
    LoadLastGrades,
    LoadSavedGrades,
    Advanced,
    Regular,
    GoBack,
    SaveGrades,
    DontSaveGrades,
    ExitFeedback,
}

impl Button {
    pub fn tag(self) -> &'static str {
        match self {
            Button::DegreeYes => "degree_yes",
            Button::DegreeNo => "degree_no",
            Button::Finished => "finished",
            Button::Delete => "delete",
            Button::ChangeDegree => "change_degree",
            Button::LoadLastGrades => "load_last_grades",
            Button::LoadSavedGrades => "load_saved_grades",
            Button::Advanced => "advanced",
            Button::Regular => "regular",
            Button::GoBack => "go_back",
            Button::SaveGrades => "save_grades",
            Button::DontSaveGrades => "dont_save_grades",
            Button::ExitFeedback => "exit_feedback",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Button::DegreeYes => "Yes",
            Button::DegreeNo => "No",
            Button::Finished => "Done",
            Button::Delete => "Delete grades by index",
            Button::ChangeDegree => "Change degree type",
            Button::LoadLastGrades => "Load last grades",
            Button::LoadSavedGrades => "Load saved grades",
            Button::Advanced => "Advanced",
            Button::Regular => "Regular",
            Button::GoBack => "Back",
            Button::SaveGrades => "Save",
            Button::DontSaveGrades => "Don't save",
            Button::ExitFeedback => "Cancel",
        }
    }
}

/// Slash commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    End,
    Feedback,
    /// Admin only
    Broadcast,
    /// Admin only; an id argument skips the target prompt
    Single { target: Option<UserId> },
    Unknown { name: String },
}

impl Command {
    pub fn parse(name: &str, args: &[String]) -> Self {
        match name.trim_start_matches('/') {
            "end" => Command::End,
            "feedback" => Command::Feedback,
            "broadcast" => Command::Broadcast,
            "single" => Command::Single {
                target: args.first().and_then(|a| a.trim().parse().ok()),
            },
            other => Command::Unknown {
                name: other.to_string(),
            },
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Command::Broadcast | Command::Single { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            Command::End => "end",
            Command::Feedback => "feedback",
            Command::Broadcast => "broadcast",
            Command::Single { .. } => "single",
            Command::Unknown { name } => name,
        }
    }
}
