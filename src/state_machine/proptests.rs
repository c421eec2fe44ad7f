//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::state::*;
use super::*;
use crate::grades::{GradeEntry, PendingEntry};
use crate::runtime::testing::runtime_with;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::default()
}

fn entry_is_valid(entry: &GradeEntry, ctx: &SessionContext) -> bool {
    ctx.rules.score_range.contains(&entry.score)
        && ctx.rules.credit_range.contains(&entry.credits)
        && entry.description.chars().count() <= ctx.rules.max_description_len
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_entry() -> impl Strategy<Value = GradeEntry> {
    ("[a-z]{0,10}", 60u32..=100, 1u32..=8, any::<bool>())
        .prop_map(|(d, s, c, a)| GradeEntry::new(d, s, c, a))
}

fn arb_grades() -> impl Strategy<Value = Vec<GradeEntry>> {
    proptest::collection::vec(arb_entry(), 0..6)
}

fn arb_pending() -> impl Strategy<Value = Vec<PendingEntry>> {
    proptest::collection::vec(
        ("[a-z]{0,10}", 60u32..=100, 1u32..=8).prop_map(|(description, score, credits)| {
            PendingEntry {
                description,
                score,
                credits,
            }
        }),
        1..4,
    )
}

fn arb_slot() -> impl Strategy<Value = GradeSlot> {
    prop_oneof![Just(GradeSlot::Last), Just(GradeSlot::Saved)]
}

fn arb_button() -> impl Strategy<Value = Button> {
    prop_oneof![
        Just(Button::DegreeYes),
        Just(Button::DegreeNo),
        Just(Button::Finished),
        Just(Button::Delete),
        Just(Button::ChangeDegree),
        Just(Button::LoadLastGrades),
        Just(Button::LoadSavedGrades),
        Just(Button::Advanced),
        Just(Button::Regular),
        Just(Button::GoBack),
        Just(Button::SaveGrades),
        Just(Button::DontSaveGrades),
        Just(Button::ExitFeedback),
    ]
}

/// Text that is sometimes a grade line, sometimes an index list, sometimes noise
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        (40u32..120, 0u32..10).prop_map(|(s, c)| format!("{s} {c}")),
        ("[a-z]{1,8}", 60u32..=100, 1u32..=8).prop_map(|(d, s, c)| format!("{d} {s} {c}")),
        proptest::collection::vec(0i64..8, 1..4).prop_map(|v| {
            v.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
        }),
        "[a-zA-Z .]{0,20}",
    ]
}

fn arb_user_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        1 => Just(Event::Start),
        4 => arb_text().prop_map(Event::text),
        4 => arb_button().prop_map(Event::Button),
        1 => Just(Event::Command(Command::End)),
    ]
}

fn arb_store_reply() -> impl Strategy<Value = Event> {
    prop_oneof![
        proptest::option::of(any::<bool>())
            .prop_map(|is_exact_sciences| Event::DegreeFlagLoaded { is_exact_sciences }),
        (arb_slot(), arb_grades()).prop_map(|(slot, grades)| Event::GradesLoaded { slot, grades }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![4 => arb_user_event(), 1 => arb_store_reply()]
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        Just(SessionState::Idle),
        Just(SessionState::Starting),
        Just(SessionState::AskDegree),
        Just(SessionState::EnterGrade),
        arb_pending().prop_map(|pending| SessionState::ChooseCourseType { pending }),
        Just(SessionState::DeleteGrade),
        arb_slot().prop_map(|slot| SessionState::LoadingGrades { slot }),
        Just(SessionState::CheckingSaved),
        Just(SessionState::SaveDecision),
        Just(SessionState::WriteFeedback),
        Just(SessionState::Ended),
    ]
}

fn arb_session() -> impl Strategy<Value = Session> {
    (arb_state(), arb_grades(), proptest::option::of(any::<bool>())).prop_map(
        |(state, grades, is_exact_sciences)| Session {
            user_id: 1,
            is_exact_sciences,
            grades,
            state,
        },
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: A rejected event leaves the runtime's session as it was
    #[test]
    fn prop_rejection_leaves_session_untouched(session in arb_session(), event in arb_event()) {
        if transition(&session, &test_context(), event.clone()).is_err() {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let kept = rt.block_on(async {
                let mut runtime = runtime_with(session.clone());
                runtime.process_event(event).await;
                runtime.session().clone()
            });
            prop_assert_eq!(kept, session);
        }
    }

    // Invariant 2: Committed grades always satisfy the domain bounds
    #[test]
    fn prop_grades_always_valid(events in proptest::collection::vec(arb_event(), 0..30)) {
        let ctx = test_context();
        let mut session = Session::new(1);
        for event in events {
            if let Ok(result) = transition(&session, &ctx, event) {
                session = result.session;
            }
            for entry in &session.grades {
                prop_assert!(entry_is_valid(entry, &ctx), "invalid entry {:?}", entry);
            }
        }
    }

    // Invariant 3: A course type is chosen for every pending entry or none
    #[test]
    fn prop_course_type_applies_to_whole_batch(
        pending in arb_pending(),
        grades in arb_grades(),
        advanced in any::<bool>()
    ) {
        let session = Session {
            user_id: 1,
            is_exact_sciences: Some(true),
            grades: grades.clone(),
            state: SessionState::ChooseCourseType { pending: pending.clone() },
        };
        let button = if advanced { Button::Advanced } else { Button::Regular };
        let result = transition(&session, &test_context(), Event::Button(button)).unwrap();

        prop_assert_eq!(result.session.state, SessionState::EnterGrade);
        prop_assert_eq!(result.session.grades.len(), grades.len() + pending.len());
        prop_assert_eq!(&result.session.grades[..grades.len()], &grades[..]);
        for (added, p) in result.session.grades[grades.len()..].iter().zip(&pending) {
            prop_assert_eq!(added.is_advanced, advanced);
            prop_assert_eq!(added.score, p.score);
            prop_assert_eq!(added.credits, p.credits);
        }
    }

    // Invariant 4: Finishing with no grades never reaches the calculator
    #[test]
    fn prop_empty_finish_rejected(is_exact_sciences in proptest::option::of(any::<bool>())) {
        let session = Session {
            user_id: 1,
            is_exact_sciences,
            grades: vec![],
            state: SessionState::EnterGrade,
        };
        let result = transition(&session, &test_context(), Event::Button(Button::Finished));
        prop_assert!(result.is_err());
    }

    // Invariant 5: Saved grades equal to the current ones end without asking
    #[test]
    fn prop_save_skip_when_unchanged(grades in arb_grades()) {
        prop_assume!(!grades.is_empty());
        let session = Session {
            user_id: 1,
            is_exact_sciences: Some(false),
            grades: grades.clone(),
            state: SessionState::CheckingSaved,
        };
        let result = transition(
            &session,
            &test_context(),
            Event::GradesLoaded { slot: GradeSlot::Saved, grades },
        )
        .unwrap();
        let persisted_saved = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::PersistGrades { slot: GradeSlot::Saved, .. }));
        prop_assert_eq!(result.session.state, SessionState::Ended);
        prop_assert!(!persisted_saved);
    }

    // Invariant 6: Start always resets to a fresh session and reads the profile
    #[test]
    fn prop_start_resets(session in arb_session()) {
        let result = transition(&session, &test_context(), Event::Start).unwrap();
        prop_assert_eq!(result.session.state, SessionState::Starting);
        prop_assert!(result.session.grades.is_empty());
        prop_assert_eq!(result.session.is_exact_sciences, None);
        prop_assert!(result.effects.contains(&Effect::LoadDegreeFlag));
    }

    // Invariant 7: Ended is reached exactly when EndSession is emitted
    #[test]
    fn prop_end_session_iff_ended(session in arb_session(), event in arb_event()) {
        if let Ok(result) = transition(&session, &test_context(), event) {
            let ends = result.effects.contains(&Effect::EndSession);
            prop_assert_eq!(ends, result.session.state.is_terminal());
        }
    }

    // Invariant 8: Button presses that are accepted are acknowledged
    #[test]
    fn prop_accepted_buttons_acknowledged(session in arb_session(), button in arb_button()) {
        if let Ok(result) = transition(&session, &test_context(), Event::Button(button)) {
            let acked = result
                .effects
                .iter()
                .any(|e| matches!(e, Effect::Acknowledge { .. }));
            prop_assert!(acked);
        }
    }
}
