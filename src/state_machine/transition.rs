//! Pure state transition function
//!
//! Given the same session, context and event this always produces the same
//! result. Store access and message delivery happen only through the returned
//! effects.

use super::effect::ButtonSet;
use super::event::{Button, Command};
use super::prompts;
use super::state::GradeSlot;
use super::{Effect, Event, Session, SessionContext, SessionState};
use crate::grades::{
    delete_by_indices, parse_grades, parse_indices, validate, weighted_average, DeletionError,
    GradeError, PendingEntry,
};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Rejections; the session stays as it was
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error(transparent)]
    Grades(#[from] GradeError),
    #[error(transparent)]
    Deletion(#[from] DeletionError),
    #[error("unexpected input in state {state}")]
    UnexpectedInput {
        state: &'static str,
        hint: &'static str,
    },
    #[error("conversation has not been started")]
    NotStarted,
    #[error("unknown command /{0}")]
    UnknownCommand(String),
    #[error("invalid user id")]
    InvalidUserId,
    #[error("store reply does not match state {0}")]
    StaleReply(&'static str),
}

impl TransitionError {
    /// Text shown to the user in reply
    pub fn user_message(&self) -> String {
        match self {
            TransitionError::Grades(GradeError::NoGrades) => prompts::NO_GRADES_ERROR.to_string(),
            TransitionError::Grades(e) => format!("❌ Invalid input: {e}."),
            TransitionError::Deletion(DeletionError::NotANumber)
            | TransitionError::InvalidUserId => prompts::WRONG_NUMBER_ERROR.to_string(),
            TransitionError::Deletion(e) => format!("❌ {e}. Please try again."),
            TransitionError::UnexpectedInput { hint, .. } => (*hint).to_string(),
            TransitionError::NotStarted => prompts::UNKNOWN_TEXT_BEFORE_START.to_string(),
            TransitionError::UnknownCommand(_) => prompts::UNKNOWN_COMMAND.to_string(),
            TransitionError::StaleReply(_) => prompts::SOMETHING_WENT_WRONG.to_string(),
        }
    }
}

/// Pure transition function
#[allow(clippy::too_many_lines)]
pub fn transition(
    session: &Session,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let rules = &context.rules;

    match (&session.state, event) {
        // ============================================================
        // Commands valid from any state
        // ============================================================
        (_, Event::Start) => {
            let fresh = Session::new(session.user_id).with_state(SessionState::Starting);
            Ok(TransitionResult::new(fresh)
                .with_effect(Effect::prompt(prompts::START_TEXT))
                .with_effect(Effect::LoadDegreeFlag))
        }

        (_, Event::Command(Command::End)) => Ok(end(session)),

        (_, Event::Command(Command::Feedback)) => Ok(TransitionResult::new(
            session.with_state(SessionState::WriteFeedback),
        )
        .with_effect(Effect::prompt_with(
            prompts::FEEDBACK_PROMPT,
            ButtonSet::ExitFeedback,
        ))),

        (_, Event::Command(Command::Broadcast)) => Ok(TransitionResult::new(
            session.with_state(SessionState::WriteBroadcast),
        )
        .with_effect(Effect::prompt(prompts::BROADCAST_PROMPT))),

        (_, Event::Command(Command::Single { target: None })) => Ok(TransitionResult::new(
            session.with_state(SessionState::GetTargetUserId),
        )
        .with_effect(Effect::prompt(prompts::TARGET_USER_PROMPT))),

        (_, Event::Command(Command::Single {
            target: Some(target),
        })) => Ok(TransitionResult::new(
            session.with_state(SessionState::WritePrivateMessage { target }),
        )
        .with_effect(Effect::prompt(prompts::private_message_prompt(target)))),

        (_, Event::Command(Command::Unknown { name })) => {
            Err(TransitionError::UnknownCommand(name))
        }

        // ============================================================
        // Degree selection
        // ============================================================
        (SessionState::Starting, Event::DegreeFlagLoaded { is_exact_sciences }) => {
            match is_exact_sciences {
                Some(flag) => {
                    let next = Session {
                        is_exact_sciences: Some(flag),
                        ..session.with_state(SessionState::EnterGrade)
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::prompt(prompts::degree_acknowledgement(flag)))
                        .with_effect(Effect::prompt_with(
                            prompts::grade_prompt(rules),
                            ButtonSet::LoadOrChangeDegree,
                        )))
                }
                None => Ok(TransitionResult::new(session.with_state(SessionState::AskDegree))
                    .with_effect(Effect::prompt_with(
                        prompts::EXACT_SCIENCES_QUESTION,
                        ButtonSet::Degree,
                    ))),
            }
        }

        (SessionState::AskDegree, Event::Button(button @ (Button::DegreeYes | Button::DegreeNo))) => {
            let flag = button == Button::DegreeYes;
            let next = Session {
                is_exact_sciences: Some(flag),
                grades: Vec::new(),
                ..session.with_state(SessionState::EnterGrade)
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::ack())
                .with_effect(Effect::PersistDegreeFlag {
                    is_exact_sciences: flag,
                })
                .with_effect(Effect::prompt(prompts::degree_acknowledgement(flag)))
                .with_effect(Effect::prompt_with(
                    prompts::grade_prompt(rules),
                    ButtonSet::LoadOrChangeDegree,
                )))
        }

        // ============================================================
        // Grade entry
        // ============================================================
        (SessionState::EnterGrade, Event::Text { body }) => {
            let pending = validate(parse_grades(&body)?, rules)?;
            let question = prompts::course_type_question(&pending);
            Ok(
                TransitionResult::new(session.with_state(SessionState::ChooseCourseType { pending }))
                    .with_effect(Effect::prompt_with(question, ButtonSet::CourseType)),
            )
        }

        (SessionState::EnterGrade, Event::Button(Button::Finished)) => {
            // Checked before the calculator is ever reached
            if session.grades.is_empty() {
                return Err(GradeError::NoGrades.into());
            }
            let average = weighted_average(
                &session.grades,
                session.is_exact_sciences(),
                rules.advanced_multiplier,
            )?;
            Ok(TransitionResult::new(session.with_state(SessionState::CheckingSaved))
                .with_effect(Effect::toast(prompts::COMPUTING_AVERAGE))
                .with_effect(Effect::PersistGrades {
                    slot: GradeSlot::Last,
                    grades: session.grades.clone(),
                })
                .with_effect(Effect::prompt(prompts::average_message(average)))
                .with_effect(Effect::log(format!(
                    "calculated average {average:.2} over {} grades",
                    session.grades.len()
                )))
                .with_effect(Effect::LoadGrades {
                    slot: GradeSlot::Saved,
                }))
        }

        (SessionState::EnterGrade, Event::Button(Button::Delete)) => {
            if session.grades.is_empty() {
                return Err(GradeError::NoGrades.into());
            }
            Ok(TransitionResult::new(session.with_state(SessionState::DeleteGrade))
                .with_effect(Effect::toast(prompts::WAITING_FOR_INDICES))
                .with_effect(Effect::prompt_with(
                    format!(
                        "{}\n\n{}",
                        prompts::history(&session.grades, session.is_exact_sciences()),
                        prompts::DELETE_GRADE_PROMPT
                    ),
                    ButtonSet::GoBack,
                )))
        }

        (SessionState::EnterGrade, Event::Button(Button::ChangeDegree)) => {
            // Grades survive until a degree is chosen again
            Ok(TransitionResult::new(session.with_state(SessionState::AskDegree))
                .with_effect(Effect::toast(prompts::WAITING_FOR_DEGREE_TYPE))
                .with_effect(Effect::prompt_with(
                    prompts::EXACT_SCIENCES_QUESTION,
                    ButtonSet::Degree,
                )))
        }

        (
            SessionState::EnterGrade,
            Event::Button(button @ (Button::LoadLastGrades | Button::LoadSavedGrades)),
        ) => {
            let slot = if button == Button::LoadLastGrades {
                GradeSlot::Last
            } else {
                GradeSlot::Saved
            };
            Ok(
                TransitionResult::new(session.with_state(SessionState::LoadingGrades { slot }))
                    .with_effect(Effect::ack())
                    .with_effect(Effect::LoadGrades { slot }),
            )
        }

        (SessionState::LoadingGrades { slot }, Event::GradesLoaded { slot: loaded, grades })
            if *slot == loaded =>
        {
            let mut next = session.with_state(SessionState::EnterGrade);
            if grades.is_empty() {
                let result = TransitionResult::new(next.clone())
                    .with_effect(Effect::prompt(prompts::LOAD_GRADES_ERROR));
                return Ok(result.with_effect(grade_list_prompt(&next, rules)));
            }
            next.grades.extend(grades);
            let list = grade_list_prompt(&next, rules);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::prompt(prompts::SUCCESSFULLY_LOADED_GRADES))
                .with_effect(list))
        }

        // ============================================================
        // Course type
        // ============================================================
        (
            SessionState::ChooseCourseType { pending },
            Event::Button(button @ (Button::Advanced | Button::Regular)),
        ) => {
            let is_advanced = button == Button::Advanced;
            let mut next = session.with_state(SessionState::EnterGrade);
            next.grades.extend(
                pending
                    .iter()
                    .cloned()
                    .map(|p: PendingEntry| p.into_entry(is_advanced)),
            );
            let list = grade_list_prompt(&next, rules);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::ack())
                .with_effect(Effect::prompt(prompts::SUCCESSFULLY_ADDED_GRADES))
                .with_effect(list))
        }

        // ============================================================
        // Deletion
        // ============================================================
        (SessionState::DeleteGrade, Event::Text { body }) => {
            let indices = parse_indices(&body)?;
            let remaining = delete_by_indices(&session.grades, &indices)?;
            let removed = session.grades.len() - remaining.len();
            let next = Session {
                grades: remaining,
                ..session.with_state(SessionState::EnterGrade)
            };
            let list = grade_list_prompt(&next, rules);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::log(format!("deleted {removed} grades")))
                .with_effect(Effect::prompt(prompts::SUCCESSFULLY_DELETED_GRADES))
                .with_effect(list))
        }

        (SessionState::DeleteGrade, Event::Button(Button::GoBack)) => {
            let next = session.with_state(SessionState::EnterGrade);
            let list = grade_list_prompt(&next, rules);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::toast(prompts::GOING_BACK_TO_GRADES_INPUT))
                .with_effect(list))
        }

        // ============================================================
        // Save decision
        // ============================================================
        (SessionState::CheckingSaved, Event::GradesLoaded {
            slot: GradeSlot::Saved,
            grades: saved,
        }) => {
            // Order-sensitive comparison
            if saved == session.grades {
                return Ok(chain_end(
                    TransitionResult::new(session.clone())
                        .with_effect(Effect::log("grades already saved, skipping save prompt")),
                ));
            }
            let question = if saved.is_empty() {
                prompts::NOT_EXISTS_SAVED_GRADES_PROMPT
            } else {
                prompts::EXISTS_SAVED_GRADES_PROMPT
            };
            Ok(TransitionResult::new(session.with_state(SessionState::SaveDecision))
                .with_effect(Effect::prompt_with(question, ButtonSet::SaveDecision)))
        }

        (SessionState::SaveDecision, Event::Button(Button::SaveGrades)) => {
            let result = TransitionResult::new(session.clone())
                .with_effect(Effect::ack())
                .with_effect(Effect::PersistGrades {
                    slot: GradeSlot::Saved,
                    grades: session.grades.clone(),
                })
                .with_effect(Effect::log(format!("saved {} grades", session.grades.len())))
                .with_effect(Effect::prompt(prompts::SUCCESSFULLY_SAVED_GRADES));
            Ok(chain_end(result))
        }

        (SessionState::SaveDecision, Event::Button(Button::DontSaveGrades)) => {
            let result = TransitionResult::new(session.clone())
                .with_effect(Effect::ack())
                .with_effect(Effect::prompt(prompts::SUCCESSFULLY_NOT_SAVED_GRADES));
            Ok(chain_end(result))
        }

        // ============================================================
        // Feedback and admin side conversations
        // ============================================================
        (SessionState::WriteFeedback, Event::Text { body }) => {
            let result = TransitionResult::new(session.clone())
                .with_effect(Effect::StoreFeedback { text: body })
                .with_effect(Effect::prompt(prompts::FEEDBACK_THANKS));
            Ok(chain_end(result))
        }

        (SessionState::WriteFeedback, Event::Button(Button::ExitFeedback)) => {
            Ok(chain_end(TransitionResult::new(session.clone()).with_effect(Effect::ack())))
        }

        (SessionState::WriteBroadcast, Event::Text { body }) => Ok(chain_end(
            TransitionResult::new(session.clone()).with_effect(Effect::Broadcast { text: body }),
        )),

        (SessionState::GetTargetUserId, Event::Text { body }) => {
            let target = body
                .trim()
                .parse()
                .map_err(|_| TransitionError::InvalidUserId)?;
            Ok(TransitionResult::new(
                session.with_state(SessionState::WritePrivateMessage { target }),
            )
            .with_effect(Effect::prompt(prompts::private_message_prompt(target))))
        }

        (SessionState::WritePrivateMessage { target }, Event::Text { body }) => {
            Ok(chain_end(TransitionResult::new(session.clone()).with_effect(
                Effect::DeliverPrivate {
                    target: *target,
                    text: body,
                },
            )))
        }

        // ============================================================
        // Invalid transitions
        // ============================================================
        (SessionState::Idle | SessionState::Ended, _) => Err(TransitionError::NotStarted),

        (state, event) if event.is_store_reply() => Err(TransitionError::StaleReply(state.name())),

        (state, _) => Err(TransitionError::UnexpectedInput {
            state: state.name(),
            hint: expected_input_hint(state),
        }),
    }
}

/// Terminate the conversation from the current state
fn end(session: &Session) -> TransitionResult {
    chain_end(TransitionResult::new(session.clone()))
}

/// Append the closing message and move the result to `Ended`
fn chain_end(result: TransitionResult) -> TransitionResult {
    let TransitionResult { session, effects } = result;
    TransitionResult::new(session.with_state(SessionState::Ended))
        .with_effects(effects)
        .with_effect(Effect::prompt(prompts::END_TEXT))
        .with_effect(Effect::EndSession)
}

/// The prompt shown on returning to grade entry
fn grade_list_prompt(session: &Session, rules: &crate::config::GradeRules) -> Effect {
    if session.grades.is_empty() {
        Effect::prompt_with(prompts::grade_prompt(rules), ButtonSet::LoadOrChangeDegree)
    } else {
        Effect::prompt_with(
            format!(
                "{}{}",
                prompts::ADD_GRADE,
                prompts::history(&session.grades, session.is_exact_sciences())
            ),
            ButtonSet::GradeActions,
        )
    }
}

fn expected_input_hint(state: &SessionState) -> &'static str {
    match state {
        SessionState::DeleteGrade => prompts::FINISH_DELETION_FIRST,
        SessionState::EnterGrade => prompts::ENTER_GRADES_OR_BUTTON,
        SessionState::Starting
        | SessionState::LoadingGrades { .. }
        | SessionState::CheckingSaved => prompts::NOT_FINISHED_LOADING,
        SessionState::WriteFeedback
        | SessionState::WriteBroadcast
        | SessionState::GetTargetUserId
        | SessionState::WritePrivateMessage { .. } => prompts::TEXT_EXPECTED,
        SessionState::AskDegree => prompts::CHOOSE_DEGREE_FIRST,
        SessionState::ChooseCourseType { .. } => prompts::CHOOSE_COURSE_TYPE_FIRST,
        SessionState::SaveDecision => prompts::CHOOSE_SAVE_FIRST,
        SessionState::Idle | SessionState::Ended => prompts::CHOOSE_BUTTON_FIRST,
    }
}
