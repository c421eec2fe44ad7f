//! Runtime for executing per-user sessions
//!
//! Each user gets a tokio task that owns their `Session` and consumes an
//! mpsc inbox, so events for one user are handled strictly in order while
//! different users proceed concurrently.
//!
//! A task that sits idle parks an unfinished conversation in the profile
//! store and exits; the next event for that user spawns a task that resumes it.

mod executor;
mod registry;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use registry::SessionRegistry;
pub use traits::*;

use crate::config::AppConfig;
use crate::db::Database;
use crate::state_machine::{Button, ButtonSet, Command, Effect, Event, SessionContext, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, RwLock};

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = SessionRuntime<Arc<dyn ProfileStore>, Arc<dyn MessageChannel>>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session for user {0} could not be reached")]
    SessionUnavailable(UserId),
    #[error("session for user {0} stopped before replying")]
    ReplyDropped(UserId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Knobs shared by every session task
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub admin_ids: Vec<UserId>,
    pub broadcast_delay: Duration,
    pub idle_timeout: Duration,
}

impl RuntimeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            admin_ids: config.admin_ids.clone(),
            broadcast_delay: config.broadcast_delay,
            idle_timeout: config.session_idle_timeout,
        }
    }
}

/// An event plus the channel its sender-facing effects go back on
#[derive(Debug)]
pub struct Inbound {
    pub event: Event,
    pub reply: oneshot::Sender<Vec<Outbound>>,
}

/// Button as rendered by transports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonView {
    pub tag: &'static str,
    pub label: &'static str,
}

impl From<Button> for ButtonView {
    fn from(button: Button) -> Self {
        Self {
            tag: button.tag(),
            label: button.label(),
        }
    }
}

/// Effects returned to the sender of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Prompt {
        text: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        buttons: Vec<Vec<ButtonView>>,
    },
    Acknowledge {
        #[serde(skip_serializing_if = "Option::is_none")]
        toast: Option<String>,
    },
}

impl Outbound {
    pub fn prompt(text: impl Into<String>) -> Self {
        Outbound::Prompt {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn ack() -> Self {
        Outbound::Acknowledge { toast: None }
    }

    pub fn is_acknowledge(&self) -> bool {
        matches!(self, Outbound::Acknowledge { .. })
    }

    /// `None` for effects that are not meant for the sender
    pub fn from_effect(effect: Effect) -> Option<Self> {
        match effect {
            Effect::SendPrompt { text, buttons } => Some(Outbound::Prompt {
                text,
                buttons: buttons.map(render_buttons).unwrap_or_default(),
            }),
            Effect::Acknowledge { toast } => Some(Outbound::Acknowledge { toast }),
            _ => None,
        }
    }
}

fn render_buttons(set: ButtonSet) -> Vec<Vec<ButtonView>> {
    set.rows()
        .into_iter()
        .map(|row| row.into_iter().map(ButtonView::from).collect())
        .collect()
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub inbox_tx: mpsc::Sender<Inbound>,
    /// Flips to true once the task has parked its session and exited
    pub stopped: watch::Receiver<bool>,
}

/// Point-in-time counters for the stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub active_sessions: usize,
    pub resident_sessions: usize,
    pub total_users: i64,
}

/// Manager for all session runtimes
pub struct RuntimeManager {
    store: Arc<dyn ProfileStore>,
    channel: Arc<dyn MessageChannel>,
    registry: Arc<SessionRegistry>,
    context: SessionContext,
    settings: RuntimeSettings,
    runtimes: Arc<RwLock<HashMap<UserId, SessionHandle>>>,
}

impl RuntimeManager {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        channel: Arc<dyn MessageChannel>,
        registry: Arc<SessionRegistry>,
        context: SessionContext,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            store,
            channel,
            registry,
            context,
            settings,
            runtimes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Production wiring: sqlite-backed store and the outbox channel
    pub fn from_config(
        db: Database,
        outbox: OutboxChannel,
        registry: Arc<SessionRegistry>,
        config: &AppConfig,
    ) -> Self {
        Self::new(
            Arc::new(DatabaseStore::new(db)),
            Arc::new(outbox),
            registry,
            SessionContext::new(config.rules.clone()),
            RuntimeSettings::from_config(config),
        )
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.settings.admin_ids.contains(&user_id)
    }

    /// Get the running session for a user, starting one if needed
    async fn get_or_create(&self, user_id: UserId) -> SessionHandle {
        // Check if already running
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(&user_id) {
                if !handle.inbox_tx.is_closed() {
                    return handle.clone();
                }
            }
        }

        let mut runtimes = self.runtimes.write().await;
        if let Some(handle) = runtimes.get(&user_id) {
            if !handle.inbox_tx.is_closed() {
                return handle.clone();
            }
        }

        let (inbox_tx, inbox_rx) = mpsc::channel(32);
        let runtime: ProductionRuntime = SessionRuntime::new(
            user_id,
            self.context.clone(),
            self.settings.clone(),
            self.store.clone(),
            self.channel.clone(),
            self.registry.clone(),
            inbox_rx,
        );

        let (stopped_tx, stopped) = watch::channel(false);
        let previous = runtimes.get(&user_id).map(|h| h.stopped.clone());
        let handles = Arc::clone(&self.runtimes);
        let own_tx = inbox_tx.clone();

        tokio::spawn(async move {
            // The replaced task may still be parking its session
            if let Some(mut previous) = previous {
                let _ = previous.wait_for(|&done| done).await;
            }
            runtime.run().await;
            stopped_tx.send_replace(true);

            let mut runtimes = handles.write().await;
            if runtimes
                .get(&user_id)
                .is_some_and(|h| h.inbox_tx.same_channel(&own_tx))
            {
                runtimes.remove(&user_id);
            }
        });
        tracing::debug!(user_id, "Spawned session runtime");

        let handle = SessionHandle { inbox_tx, stopped };
        runtimes.insert(user_id, handle.clone());
        handle
    }

    /// Send an event to a user's session and wait for the sender-facing replies
    pub async fn send_event(
        &self,
        user_id: UserId,
        event: Event,
    ) -> Result<Vec<Outbound>, RuntimeError> {
        let mut event = self.gate(user_id, event);

        // A task that just went idle closes its inbox; retry once on a fresh one
        for _ in 0..2 {
            let handle = self.get_or_create(user_id).await;
            let (reply_tx, reply_rx) = oneshot::channel();
            let inbound = Inbound {
                event,
                reply: reply_tx,
            };
            match handle.inbox_tx.send(inbound).await {
                Ok(()) => {
                    return reply_rx
                        .await
                        .map_err(|_| RuntimeError::ReplyDropped(user_id));
                }
                Err(mpsc::error::SendError(returned)) => {
                    tracing::debug!(user_id, "Session inbox closed, respawning");
                    event = returned.event;
                }
            }
        }

        Err(RuntimeError::SessionUnavailable(user_id))
    }

    /// Admin-only commands from anyone else are treated as unknown
    fn gate(&self, user_id: UserId, event: Event) -> Event {
        match event {
            Event::Command(command) if command.requires_admin() && !self.is_admin(user_id) => {
                tracing::warn!(
                    user_id,
                    command = command.name(),
                    "Admin command from non-admin"
                );
                Event::Command(Command::Unknown {
                    name: command.name().to_string(),
                })
            }
            other => other,
        }
    }

    /// Session tasks currently running, idle or not
    pub async fn resident_sessions(&self) -> usize {
        self.runtimes.read().await.len()
    }

    pub async fn stats(&self) -> Result<Stats, RuntimeError> {
        Ok(Stats {
            active_sessions: self.registry.count(),
            resident_sessions: self.resident_sessions().await,
            total_users: self.store.count_users().await?,
        })
    }
}
