//! Gateway: request/reply calls and event subscription against the
//! Chainball scoreboard server.
//!
//! Lifecycle:
//! 1. Build a [`ScoreboardClient`] from the `[scoreboard]` config section
//! 2. Issue calls by kind, by name ([`ScoreboardClient::dispatch`]) or through
//!    the typed helpers
//! 3. Optionally spawn an [`EventSubscriber`] and drain its [`EventQueue`]
//!
//! Every call opens a fresh request channel and releases it before returning,
//! so concurrent calls never share a socket.

pub mod client;
pub mod error;
pub mod events;
pub mod registry;
pub mod snapshot;
pub mod transport;

pub use {
    client::ScoreboardClient,
    error::{Error, ErrorKind, Result},
    events::{
        Event, EventFeed, EventQueue, EventSubscriber, FeedConnector, ReconnectPolicy,
        SubscriberHandle, ZmqFeedConnector,
    },
    registry::{CallDescriptor, CallKind, CallRegistry},
    snapshot::StatusSnapshot,
    transport::{RequestTransport, ZmqTransport, exchange},
};
