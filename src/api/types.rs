//! API request and response types

use crate::runtime::Outbound;
use crate::state_machine::{Button, Command, Event};
use serde::{Deserialize, Serialize};

/// An inbound user interaction as posted by a transport
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundRequest {
    Start,
    Text {
        body: String,
    },
    Button {
        tag: Button,
    },
    Command {
        name: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl From<InboundRequest> for Event {
    fn from(request: InboundRequest) -> Self {
        match request {
            InboundRequest::Start => Event::Start,
            InboundRequest::Text { body } => Event::Text { body },
            InboundRequest::Button { tag } => Event::Button(tag),
            InboundRequest::Command { name, args } => {
                // `/start` arrives as a command on most transports
                if name.trim_start_matches('/') == "start" {
                    Event::Start
                } else {
                    Event::Command(Command::parse(&name, &args))
                }
            }
        }
    }
}

/// Effects for the sender of an event
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub effects: Vec<Outbound>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
