//! Effects produced by state transitions

use super::event::Button;
use super::state::{GradeSlot, UserId};
use crate::grades::GradeEntry;
use serde::Serialize;

/// Keyboard layouts attached to prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonSet {
    Degree,
    GradeActions,
    LoadOrChangeDegree,
    CourseType,
    GoBack,
    SaveDecision,
    ExitFeedback,
}

impl ButtonSet {
    /// Button rows, top to bottom
    pub fn rows(self) -> Vec<Vec<Button>> {
        match self {
            ButtonSet::Degree => vec![vec![Button::DegreeYes, Button::DegreeNo]],
            ButtonSet::GradeActions => vec![
                vec![Button::LoadLastGrades],
                vec![Button::LoadSavedGrades],
                vec![Button::Finished, Button::Delete],
                vec![Button::ChangeDegree],
            ],
            ButtonSet::LoadOrChangeDegree => vec![
                vec![Button::LoadLastGrades, Button::LoadSavedGrades],
                vec![Button::ChangeDegree],
            ],
            ButtonSet::CourseType => vec![vec![Button::Advanced, Button::Regular]],
            ButtonSet::GoBack => vec![vec![Button::GoBack]],
            ButtonSet::SaveDecision => vec![vec![Button::SaveGrades, Button::DontSaveGrades]],
            ButtonSet::ExitFeedback => vec![vec![Button::ExitFeedback]],
        }
    }
}

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a message to the session's user
    SendPrompt {
        text: String,
        buttons: Option<ButtonSet>,
    },

    /// Answer the button press, optionally with a toast
    Acknowledge { toast: Option<String> },

    Log { message: String },

    /// Read the degree flag; replies with `DegreeFlagLoaded`
    LoadDegreeFlag,

    PersistDegreeFlag { is_exact_sciences: bool },

    /// Read a grade list; replies with `GradesLoaded`
    LoadGrades { slot: GradeSlot },

    PersistGrades {
        slot: GradeSlot,
        grades: Vec<GradeEntry>,
    },

    /// Store feedback and forward it to the admins
    StoreFeedback { text: String },

    /// Deliver to every known user
    Broadcast { text: String },

    DeliverPrivate { target: UserId, text: String },

    /// Remove the session from the active registry
    EndSession,
}

impl Effect {
    pub fn prompt(text: impl Into<String>) -> Self {
        Effect::SendPrompt {
            text: text.into(),
            buttons: None,
        }
    }

    pub fn prompt_with(text: impl Into<String>, buttons: ButtonSet) -> Self {
        Effect::SendPrompt {
            text: text.into(),
            buttons: Some(buttons),
        }
    }

    pub fn ack() -> Self {
        Effect::Acknowledge { toast: None }
    }

    pub fn toast(text: impl Into<String>) -> Self {
        Effect::Acknowledge {
            toast: Some(text.into()),
        }
    }

    pub fn log(message: impl Into<String>) -> Self {
        Effect::Log {
            message: message.into(),
        }
    }
}
