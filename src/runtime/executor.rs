//! Session runtime executor

use super::traits::{MessageChannel, ProfileStore, StoreError};
use super::{Inbound, Outbound, RuntimeSettings, SessionRegistry};

use crate::state_machine::{
    prompts, transition, Effect, Event, Session, SessionContext, SessionState, UserId,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Generic session runtime that can work with any store and channel implementations
pub struct SessionRuntime<S, C>
where
    S: ProfileStore + 'static,
    C: MessageChannel + 'static,
{
    session: Session,
    context: SessionContext,
    settings: RuntimeSettings,
    store: S,
    channel: C,
    registry: Arc<SessionRegistry>,
    inbox: mpsc::Receiver<Inbound>,
}

impl<S, C> SessionRuntime<S, C>
where
    S: ProfileStore + 'static,
    C: MessageChannel + 'static,
{
    pub fn new(
        user_id: UserId,
        context: SessionContext,
        settings: RuntimeSettings,
        store: S,
        channel: C,
        registry: Arc<SessionRegistry>,
        inbox: mpsc::Receiver<Inbound>,
    ) -> Self {
        Self {
            session: Session::new(user_id),
            context,
            settings,
            store,
            channel,
            registry,
            inbox,
        }
    }

    fn user_id(&self) -> UserId {
        self.session.user_id
    }

    #[cfg(test)]
    pub(crate) fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub async fn run(mut self) {
        tracing::debug!(user_id = self.user_id(), "Starting session runtime");
        self.resume().await;

        loop {
            match tokio::time::timeout(self.settings.idle_timeout, self.inbox.recv()).await {
                Ok(Some(inbound)) => self.dispatch(inbound).await,
                Ok(None) => break,
                Err(_) => {
                    let in_progress = self.session.state != SessionState::Idle;
                    if in_progress {
                        if let Err(e) = self.store.park_session(&self.session).await {
                            tracing::error!(
                                user_id = self.user_id(),
                                error = %e,
                                "Could not park idle session, staying resident"
                            );
                            continue;
                        }
                    }

                    // Anything that raced the timeout is still answered
                    self.inbox.close();
                    let mut raced = false;
                    while let Ok(inbound) = self.inbox.try_recv() {
                        self.dispatch(inbound).await;
                        raced = true;
                    }
                    if raced && (in_progress || self.session.state != SessionState::Idle) {
                        if let Err(e) = self.store.park_session(&self.session).await {
                            tracing::error!(
                                user_id = self.user_id(),
                                error = %e,
                                "Could not park session after late events"
                            );
                        }
                    }

                    tracing::info!(
                        user_id = self.user_id(),
                        parked = in_progress,
                        "Session idle, shutting down"
                    );
                    break;
                }
            }
        }

        self.registry.unregister(self.user_id());
        tracing::debug!(user_id = self.user_id(), "Session runtime stopped");
    }

    /// Pick up a conversation parked by an earlier task for this user
    async fn resume(&mut self) {
        match self.store.take_parked_session(self.user_id()).await {
            Ok(Some(session)) if session.user_id == self.user_id() => {
                tracing::info!(
                    user_id = self.user_id(),
                    state = session.state.name(),
                    "Resuming parked session"
                );
                if session.state != SessionState::Idle {
                    self.registry.register(self.user_id());
                }
                self.session = session;
            }
            Ok(Some(session)) => {
                tracing::warn!(
                    user_id = self.user_id(),
                    parked_user = session.user_id,
                    "Ignoring parked session for another user"
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(
                    user_id = self.user_id(),
                    error = %e,
                    "Could not resume parked session, starting fresh"
                );
            }
        }
    }

    async fn dispatch(&mut self, inbound: Inbound) {
        let replies = self.process_event(inbound.event).await;
        if inbound.reply.send(replies).is_err() {
            tracing::warn!(user_id = self.user_id(), "Caller went away before the reply");
        }
    }

    /// Run one inbound event to completion, including store replies it triggers.
    ///
    /// The session is committed only when every transition in the chain
    /// succeeded and every store operation completed.
    pub(crate) async fn process_event(&mut self, event: Event) -> Vec<Outbound> {
        let is_button = event.is_button();
        let mut candidate = self.session.clone();
        let mut replies = Vec::new();
        let mut events_to_process = VecDeque::from([event]);
        let mut is_follow_up = false;

        while let Some(current_event) = events_to_process.pop_front() {
            let result = match transition(&candidate, &self.context, current_event) {
                Ok(r) => r,
                Err(e) if !is_follow_up => {
                    tracing::debug!(
                        user_id = self.user_id(),
                        state = candidate.state.name(),
                        error = %e,
                        "Transition rejected"
                    );
                    if is_button {
                        replies.push(Outbound::ack());
                    }
                    replies.push(Outbound::prompt(e.user_message()));
                    return replies;
                }
                Err(e) => {
                    tracing::error!(
                        user_id = self.user_id(),
                        state = candidate.state.name(),
                        error = %e,
                        "Store reply rejected"
                    );
                    return self.abort(is_button);
                }
            };

            candidate = result.session;

            for effect in result.effects {
                match self.execute_effect(effect, &mut replies).await {
                    Ok(Some(generated_event)) => events_to_process.push_back(generated_event),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(
                            user_id = self.user_id(),
                            error = %e,
                            "Store operation failed, discarding transition"
                        );
                        return self.abort(is_button);
                    }
                }
            }
            is_follow_up = true;
        }

        if is_button && !replies.iter().any(Outbound::is_acknowledge) {
            replies.insert(0, Outbound::ack());
        }

        self.commit(candidate);
        replies
    }

    /// Keep the previous session and answer with a generic failure
    fn abort(&self, is_button: bool) -> Vec<Outbound> {
        let mut replies = Vec::new();
        if is_button {
            replies.push(Outbound::ack());
        }
        replies.push(Outbound::prompt(prompts::SOMETHING_WENT_WRONG));
        replies
    }

    fn commit(&mut self, session: Session) {
        let old_state = std::mem::replace(&mut self.session, session).state;

        if self.session.state.is_terminal() {
            self.registry.unregister(self.user_id());
            self.session = Session::new(self.user_id());
        } else if self.session.state != SessionState::Idle {
            self.registry.register(self.user_id());
        }

        if old_state.name() != self.session.state.name() {
            tracing::debug!(
                user_id = self.user_id(),
                from = old_state.name(),
                to = self.session.state.name(),
                "State changed"
            );
        }
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(
        &mut self,
        effect: Effect,
        replies: &mut Vec<Outbound>,
    ) -> Result<Option<Event>, StoreError> {
        let user_id = self.user_id();

        match effect {
            Effect::SendPrompt { .. } | Effect::Acknowledge { .. } => {
                if let Some(reply) = Outbound::from_effect(effect) {
                    replies.push(reply);
                }
                Ok(None)
            }

            Effect::Log { message } => {
                tracing::info!(user_id, "{message}");
                Ok(None)
            }

            Effect::LoadDegreeFlag => {
                let is_exact_sciences = self.store.load_degree_flag(user_id).await?;
                Ok(Some(Event::DegreeFlagLoaded { is_exact_sciences }))
            }

            Effect::PersistDegreeFlag { is_exact_sciences } => {
                self.store
                    .save_degree_flag(user_id, is_exact_sciences)
                    .await?;
                Ok(None)
            }

            Effect::LoadGrades { slot } => {
                let grades = self.store.load_grades(user_id, slot).await?;
                Ok(Some(Event::GradesLoaded { slot, grades }))
            }

            Effect::PersistGrades { slot, grades } => {
                self.store.save_grades(user_id, slot, &grades).await?;
                Ok(None)
            }

            Effect::StoreFeedback { text } => {
                self.store.store_feedback(user_id, &text).await?;
                let forwarded = format!("📬 Feedback from user {user_id}:\n{text}");
                for &admin in &self.settings.admin_ids {
                    if let Err(e) = self.channel.deliver(admin, &forwarded).await {
                        tracing::warn!(user_id, admin, error = %e, "Failed to forward feedback");
                    }
                }
                Ok(None)
            }

            Effect::Broadcast { text } => {
                let recipients = self.store.all_user_ids().await?;
                let delivered = self.broadcast(&recipients, &text).await;
                tracing::info!(
                    user_id,
                    delivered,
                    total = recipients.len(),
                    "Broadcast finished"
                );
                replies.push(Outbound::prompt(format!(
                    "📢 Broadcast delivered to {delivered} of {} users.",
                    recipients.len()
                )));
                Ok(None)
            }

            Effect::DeliverPrivate { target, text } => {
                let report = if self.store.user_exists(target).await? {
                    match self.channel.deliver(target, &text).await {
                        Ok(()) => format!("✅ Message delivered to user {target}."),
                        Err(e) => {
                            tracing::warn!(user_id, target, error = %e, "Private delivery failed");
                            format!("❌ Could not deliver the message to user {target}.")
                        }
                    }
                } else {
                    format!("❌ User {target} was not found.")
                };
                replies.push(Outbound::prompt(report));
                Ok(None)
            }

            Effect::EndSession => {
                tracing::debug!(user_id, "Conversation ended");
                Ok(None)
            }
        }
    }

    /// Paced delivery to every recipient; returns the success count
    async fn broadcast(&self, recipients: &[UserId], text: &str) -> usize {
        let mut delivered = 0;
        for (i, &to) in recipients.iter().enumerate() {
            if i > 0 && !self.settings.broadcast_delay.is_zero() {
                tokio::time::sleep(self.settings.broadcast_delay).await;
            }
            match self.channel.deliver(to, text).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(to, error = %e, "Broadcast delivery failed"),
            }
        }
        delivered
    }
}
