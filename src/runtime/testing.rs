//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{RuntimeSettings, SessionRegistry, SessionRuntime};
use crate::grades::GradeEntry;
use crate::state_machine::{GradeSlot, Session, SessionContext, UserId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Mock Profile Store
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockProfile {
    pub is_exact_sciences: Option<bool>,
    pub last_grades: Option<Vec<GradeEntry>>,
    pub saved_grades: Option<Vec<GradeEntry>>,
}

/// In-memory profile store that can be switched into a failing mode
#[derive(Default)]
pub struct MockProfileStore {
    profiles: Mutex<HashMap<UserId, MockProfile>>,
    feedback: Mutex<Vec<(UserId, String)>>,
    parked: Mutex<HashMap<UserId, Session>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn with_profile(self, user_id: UserId, profile: MockProfile) -> Self {
        self.profiles.lock().unwrap().insert(user_id, profile);
        self
    }

    pub fn profile(&self, user_id: UserId) -> Option<MockProfile> {
        self.profiles.lock().unwrap().get(&user_id).cloned()
    }

    pub fn recorded_feedback(&self) -> Vec<(UserId, String)> {
        self.feedback.lock().unwrap().clone()
    }

    pub fn parked(&self, user_id: UserId) -> Option<Session> {
        self.parked.lock().unwrap().get(&user_id).cloned()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError("mock store is failing".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn load_degree_flag(&self, user_id: UserId) -> Result<Option<bool>, StoreError> {
        self.check()?;
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .and_then(|p| p.is_exact_sciences))
    }

    async fn save_degree_flag(
        &self,
        user_id: UserId,
        is_exact_sciences: bool,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.profiles
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .is_exact_sciences = Some(is_exact_sciences);
        Ok(())
    }

    async fn load_grades(
        &self,
        user_id: UserId,
        slot: GradeSlot,
    ) -> Result<Vec<GradeEntry>, StoreError> {
        self.check()?;
        let profiles = self.profiles.lock().unwrap();
        let grades = profiles.get(&user_id).and_then(|p| match slot {
            GradeSlot::Last => p.last_grades.clone(),
            GradeSlot::Saved => p.saved_grades.clone(),
        });
        Ok(grades.unwrap_or_default())
    }

    async fn save_grades(
        &self,
        user_id: UserId,
        slot: GradeSlot,
        grades: &[GradeEntry],
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.entry(user_id).or_default();
        match slot {
            GradeSlot::Last => profile.last_grades = Some(grades.to_vec()),
            GradeSlot::Saved => profile.saved_grades = Some(grades.to_vec()),
        }
        Ok(())
    }

    async fn store_feedback(&self, user_id: UserId, text: &str) -> Result<(), StoreError> {
        self.check()?;
        self.feedback
            .lock()
            .unwrap()
            .push((user_id, text.to_string()));
        Ok(())
    }

    async fn all_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        self.check()?;
        let mut ids: Vec<UserId> = self.profiles.lock().unwrap().keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.profiles.lock().unwrap().contains_key(&user_id))
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        self.check()?;
        Ok(i64::try_from(self.profiles.lock().unwrap().len()).unwrap_or(i64::MAX))
    }

    async fn park_session(&self, session: &Session) -> Result<(), StoreError> {
        self.check()?;
        self.parked
            .lock()
            .unwrap()
            .insert(session.user_id, session.clone());
        Ok(())
    }

    async fn take_parked_session(&self, user_id: UserId) -> Result<Option<Session>, StoreError> {
        self.check()?;
        Ok(self.parked.lock().unwrap().remove(&user_id))
    }
}

// ============================================================================
// Mock Message Channel
// ============================================================================

/// Records deliveries; selected recipients can be made unreachable
#[derive(Default)]
pub struct MockChannel {
    unreachable: HashSet<UserId>,
    pub deliveries: Mutex<Vec<(UserId, String)>>,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unreachable(mut self, user_id: UserId) -> Self {
        self.unreachable.insert(user_id);
        self
    }

    pub fn recorded_deliveries(&self) -> Vec<(UserId, String)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageChannel for MockChannel {
    async fn deliver(&self, to: UserId, text: &str) -> Result<(), DeliveryError> {
        if self.unreachable.contains(&to) {
            return Err(DeliveryError::Unreachable(to));
        }
        self.deliveries.lock().unwrap().push((to, text.to_string()));
        Ok(())
    }
}

// ============================================================================
// Runtime Fixture
// ============================================================================

/// A runtime over fresh mocks that already holds `session`; its inbox is never read
pub fn runtime_with(session: Session) -> SessionRuntime<Arc<MockProfileStore>, Arc<MockChannel>> {
    let (_inbox_tx, inbox_rx) = mpsc::channel(1);
    let settings = RuntimeSettings {
        admin_ids: Vec::new(),
        broadcast_delay: Duration::ZERO,
        idle_timeout: Duration::from_secs(60),
    };
    SessionRuntime::new(
        session.user_id,
        SessionContext::default(),
        settings,
        Arc::new(MockProfileStore::new()),
        Arc::new(MockChannel::new()),
        Arc::new(SessionRegistry::new()),
        inbox_rx,
    )
    .with_session(session)
}

#[cfg(test)]
mod tests {
    use super::super::{Outbound, RuntimeManager};
    use super::*;
    use crate::state_machine::{prompts, Button, Command, Event, SessionState};

    const ADMIN: UserId = 1000;

    struct Harness {
        manager: RuntimeManager,
        store: Arc<MockProfileStore>,
        channel: Arc<MockChannel>,
        registry: Arc<SessionRegistry>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with(MockProfileStore::new(), MockChannel::new(), Duration::from_secs(60))
        }

        fn with(store: MockProfileStore, channel: MockChannel, idle_timeout: Duration) -> Self {
            let store = Arc::new(store);
            let channel = Arc::new(channel);
            let registry = Arc::new(SessionRegistry::new());
            let settings = RuntimeSettings {
                admin_ids: vec![ADMIN],
                broadcast_delay: Duration::ZERO,
                idle_timeout,
            };
            let manager = RuntimeManager::new(
                store.clone(),
                channel.clone(),
                registry.clone(),
                SessionContext::default(),
                settings,
            );
            Self {
                manager,
                store,
                channel,
                registry,
            }
        }

        async fn send(&self, user_id: UserId, event: Event) -> Vec<Outbound> {
            self.manager.send_event(user_id, event).await.unwrap()
        }

        async fn texts(&self, user_id: UserId, event: Event) -> Vec<String> {
            texts(&self.send(user_id, event).await)
        }
    }

    fn texts(replies: &[Outbound]) -> Vec<String> {
        replies
            .iter()
            .filter_map(|r| match r {
                Outbound::Prompt { text, .. } => Some(text.clone()),
                Outbound::Acknowledge { .. } => None,
            })
            .collect()
    }

    fn button(b: Button) -> Event {
        Event::Button(b)
    }

    #[tokio::test]
    async fn test_mock_store_round_trip() {
        let store = MockProfileStore::new();
        assert_eq!(store.load_degree_flag(1).await.unwrap(), None);
        store.save_degree_flag(1, true).await.unwrap();
        assert_eq!(store.load_degree_flag(1).await.unwrap(), Some(true));
        assert!(store.user_exists(1).await.unwrap());

        store.set_failing(true);
        assert!(store.load_grades(1, GradeSlot::Last).await.is_err());
    }

    #[tokio::test]
    async fn test_full_conversation_saves_grades() {
        let h = Harness::new();

        let replies = h.texts(1, Event::Start).await;
        assert_eq!(replies, vec![prompts::START_TEXT, prompts::EXACT_SCIENCES_QUESTION]);
        assert_eq!(h.registry.count(), 1);

        h.send(1, button(Button::DegreeNo)).await;
        let replies = h.texts(1, Event::text("Calculus 90 5\n80 4")).await;
        assert_eq!(replies, vec![prompts::COURSE_TYPE_QUESTION_LONG]);
        h.send(1, button(Button::Regular)).await;

        let replies = h.send(1, button(Button::Finished)).await;
        assert!(replies[0].is_acknowledge());
        let replies = texts(&replies);
        assert_eq!(
            replies,
            vec![
                "🎓 Your weighted average is: 85.56".to_string(),
                prompts::NOT_EXISTS_SAVED_GRADES_PROMPT.to_string(),
            ]
        );

        let replies = h.texts(1, button(Button::SaveGrades)).await;
        assert_eq!(
            replies,
            vec![prompts::SUCCESSFULLY_SAVED_GRADES, prompts::END_TEXT]
        );

        let profile = h.store.profile(1).unwrap();
        let expected = vec![
            GradeEntry::new("Calculus", 90, 5, false),
            GradeEntry::new("", 80, 4, false),
        ];
        assert_eq!(profile.is_exact_sciences, Some(false));
        assert_eq!(profile.last_grades, Some(expected.clone()));
        assert_eq!(profile.saved_grades, Some(expected));
        assert_eq!(h.registry.count(), 0);
    }

    #[tokio::test]
    async fn test_returning_user_skips_degree_question() {
        let store = MockProfileStore::new().with_profile(
            1,
            MockProfile {
                is_exact_sciences: Some(true),
                ..MockProfile::default()
            },
        );
        let h = Harness::with(store, MockChannel::new(), Duration::from_secs(60));

        let replies = h.texts(1, Event::Start).await;
        assert_eq!(replies[1], prompts::EXACT_ACKNOWLEDGEMENT);
    }

    #[tokio::test]
    async fn test_unchanged_grades_skip_save_question() {
        let saved = vec![GradeEntry::new("", 90, 5, false)];
        let store = MockProfileStore::new().with_profile(
            1,
            MockProfile {
                is_exact_sciences: Some(false),
                last_grades: None,
                saved_grades: Some(saved.clone()),
            },
        );
        let h = Harness::with(store, MockChannel::new(), Duration::from_secs(60));

        h.send(1, Event::Start).await;
        let replies = h.texts(1, button(Button::LoadSavedGrades)).await;
        assert_eq!(replies[0], prompts::SUCCESSFULLY_LOADED_GRADES);

        let replies = h.texts(1, button(Button::Finished)).await;
        assert_eq!(replies.last().unwrap(), prompts::END_TEXT);
        assert!(!replies
            .iter()
            .any(|t| t == prompts::EXISTS_SAVED_GRADES_PROMPT));
        assert_eq!(h.store.profile(1).unwrap().saved_grades, Some(saved));
        assert_eq!(h.registry.count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_on_start_keeps_session() {
        let store = MockProfileStore::new();
        store.set_failing(true);
        let h = Harness::with(store, MockChannel::new(), Duration::from_secs(60));

        let replies = h.texts(1, Event::Start).await;
        assert_eq!(replies, vec![prompts::SOMETHING_WENT_WRONG]);
        assert_eq!(h.registry.count(), 0);

        // Still idle: text is answered with the not-started notice
        h.store.set_failing(false);
        let replies = h.texts(1, Event::text("90 5")).await;
        assert_eq!(replies, vec![prompts::UNKNOWN_TEXT_BEFORE_START]);
    }

    #[tokio::test]
    async fn test_store_failure_discards_queued_prompts() {
        let h = Harness::new();
        h.send(1, Event::Start).await;
        h.send(1, button(Button::DegreeYes)).await;
        h.send(1, Event::text("90 5")).await;
        h.send(1, button(Button::Advanced)).await;

        h.store.set_failing(true);
        let replies = h.send(1, button(Button::Finished)).await;
        assert_eq!(
            replies,
            vec![Outbound::ack(), Outbound::prompt(prompts::SOMETHING_WENT_WRONG)]
        );

        // Grades survived; finishing again works once the store recovers
        h.store.set_failing(false);
        let replies = h.texts(1, button(Button::Finished)).await;
        assert_eq!(replies[0], "🎓 Your weighted average is: 90.00");
    }

    #[tokio::test]
    async fn test_rejected_button_is_still_acknowledged() {
        let h = Harness::new();
        h.send(1, Event::Start).await;
        h.send(1, button(Button::DegreeYes)).await;

        let replies = h.send(1, button(Button::Finished)).await;
        assert_eq!(
            replies,
            vec![Outbound::ack(), Outbound::prompt(prompts::NO_GRADES_ERROR)]
        );
    }

    #[tokio::test]
    async fn test_end_command_tears_down_session() {
        let h = Harness::new();
        h.send(1, Event::Start).await;
        h.send(1, button(Button::DegreeYes)).await;
        assert_eq!(h.registry.count(), 1);

        let replies = h.texts(1, Event::Command(Command::End)).await;
        assert_eq!(replies, vec![prompts::END_TEXT]);
        assert_eq!(h.registry.count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_requires_admin() {
        let h = Harness::new();
        let replies = h.texts(1, Event::Command(Command::Broadcast)).await;
        assert_eq!(replies, vec![prompts::UNKNOWN_COMMAND]);
    }

    #[tokio::test]
    async fn test_broadcast_counts_deliveries() {
        let store = MockProfileStore::new()
            .with_profile(1, MockProfile::default())
            .with_profile(2, MockProfile::default())
            .with_profile(3, MockProfile::default());
        let channel = MockChannel::new().with_unreachable(2);
        let h = Harness::with(store, channel, Duration::from_secs(60));

        h.send(ADMIN, Event::Command(Command::Broadcast)).await;
        let replies = h.texts(ADMIN, Event::text("maintenance tonight")).await;
        assert_eq!(
            replies,
            vec![
                "📢 Broadcast delivered to 2 of 3 users.".to_string(),
                prompts::END_TEXT.to_string(),
            ]
        );
        assert_eq!(
            h.channel.recorded_deliveries(),
            vec![
                (1, "maintenance tonight".to_string()),
                (3, "maintenance tonight".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_feedback_stored_and_forwarded() {
        let h = Harness::new();
        h.send(5, Event::Command(Command::Feedback)).await;
        let replies = h.texts(5, Event::text("love it")).await;
        assert_eq!(replies, vec![prompts::FEEDBACK_THANKS, prompts::END_TEXT]);

        assert_eq!(h.store.recorded_feedback(), vec![(5, "love it".to_string())]);
        let deliveries = h.channel.recorded_deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, ADMIN);
        assert!(deliveries[0].1.contains("love it"));
    }

    #[tokio::test]
    async fn test_private_message_to_unknown_user() {
        let store = MockProfileStore::new().with_profile(7, MockProfile::default());
        let h = Harness::with(store, MockChannel::new(), Duration::from_secs(60));

        h.send(ADMIN, Event::Command(Command::Single { target: Some(8) }))
            .await;
        let replies = h.texts(ADMIN, Event::text("hi")).await;
        assert_eq!(replies[0], "❌ User 8 was not found.");

        h.send(ADMIN, Event::Command(Command::Single { target: None }))
            .await;
        let replies = h.texts(ADMIN, Event::text("seven")).await;
        assert_eq!(replies, vec![prompts::WRONG_NUMBER_ERROR]);
        h.send(ADMIN, Event::text("7")).await;
        let replies = h.texts(ADMIN, Event::text("hi")).await;
        assert_eq!(replies[0], "✅ Message delivered to user 7.");
        assert_eq!(h.channel.recorded_deliveries(), vec![(7, "hi".to_string())]);
    }

    const IDLE: Duration = Duration::from_millis(50);
    const PAST_IDLE: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_idle_session_is_parked_and_resumed() {
        let h = Harness::with(MockProfileStore::new(), MockChannel::new(), IDLE);
        h.send(1, Event::Start).await;
        h.send(1, button(Button::DegreeNo)).await;
        h.send(1, Event::text("90 5")).await;
        h.send(1, button(Button::Regular)).await;

        tokio::time::sleep(PAST_IDLE).await;
        assert_eq!(h.registry.count(), 0);
        assert_eq!(h.manager.resident_sessions().await, 0);
        let parked = h.store.parked(1).unwrap();
        assert_eq!(parked.state, SessionState::EnterGrade);
        assert_eq!(parked.grades, vec![GradeEntry::new("", 90, 5, false)]);

        // A fresh task picks the conversation up where it stopped
        let replies = h.texts(1, button(Button::Finished)).await;
        assert_eq!(replies[0], "🎓 Your weighted average is: 90.00");
        assert!(h.store.parked(1).is_none());
        assert_eq!(h.registry.count(), 1);
    }

    #[tokio::test]
    async fn test_idle_session_without_conversation_is_not_parked() {
        let h = Harness::with(MockProfileStore::new(), MockChannel::new(), IDLE);
        let replies = h.texts(1, Event::text("hello")).await;
        assert_eq!(replies, vec![prompts::UNKNOWN_TEXT_BEFORE_START]);

        tokio::time::sleep(PAST_IDLE).await;
        assert!(h.store.parked(1).is_none());
        assert_eq!(h.manager.resident_sessions().await, 0);

        let replies = h.texts(1, button(Button::DegreeYes)).await;
        assert_eq!(replies, vec![prompts::UNKNOWN_TEXT_BEFORE_START]);
    }

    #[tokio::test]
    async fn test_idle_session_stays_resident_while_store_is_down() {
        let h = Harness::with(MockProfileStore::new(), MockChannel::new(), IDLE);
        h.send(1, Event::Start).await;
        h.send(1, button(Button::DegreeYes)).await;
        h.send(1, Event::text("Physics 95 6")).await;
        h.send(1, button(Button::Advanced)).await;

        h.store.set_failing(true);
        tokio::time::sleep(PAST_IDLE).await;
        assert_eq!(h.manager.resident_sessions().await, 1);
        assert_eq!(h.registry.count(), 1);

        h.store.set_failing(false);
        let replies = h.texts(1, button(Button::Finished)).await;
        assert_eq!(replies[0], "🎓 Your weighted average is: 95.00");
    }

    #[tokio::test]
    async fn test_exited_sessions_release_their_handles() {
        let h = Harness::with(MockProfileStore::new(), MockChannel::new(), IDLE);
        for user_id in 1..=51 {
            h.send(user_id, Event::Start).await;
        }
        assert_eq!(h.manager.resident_sessions().await, 51);
        assert_eq!(h.registry.count(), 51);

        tokio::time::sleep(PAST_IDLE).await;
        assert_eq!(h.registry.count(), 0);
        assert_eq!(h.manager.resident_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let h = Harness::new();
        h.send(1, Event::Start).await;
        h.send(2, Event::Start).await;
        h.send(1, button(Button::DegreeYes)).await;
        h.send(2, button(Button::DegreeNo)).await;

        let (a, b) = tokio::join!(
            h.texts(1, Event::text("90 5")),
            h.texts(2, Event::text("abc"))
        );
        assert_eq!(a, vec![prompts::COURSE_TYPE_QUESTION_SHORT]);
        assert!(b[0].starts_with("❌"));

        let stats = h.manager.stats().await.unwrap();
        assert_eq!(stats.active_sessions, 2);
        assert_eq!(stats.total_users, 2);
    }
}
