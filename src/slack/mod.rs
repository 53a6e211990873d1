//! Slack integration
//!
//! [`SlackClient`] is the outbound [`ChatTransport`](crate::bridge::ChatTransport)
//! over the Web API. [`SocketModeListener`] is the inbound event stream.

mod api;
mod events;
mod socket;

pub use api::{BotIdentity, SLACK_API_BASE, SlackClient, check_response};
pub use events::{SlackEvent, SocketEnvelope, parse_events_api_payload};
pub use socket::{SocketModeListener, envelope_ack};
