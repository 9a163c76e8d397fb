//! Live-update client for the Rule Forge Hub storefront.
//!
//! SYSTEM CONTEXT
//! ==============
//! The storefront receives server push notifications (order status, catalog
//! refreshes) over one client-initiated WebSocket. This crate owns that
//! connection: it authenticates with a token appended to the endpoint URL,
//! reconnects on a fixed interval after unintended closes, and fans each
//! inbound envelope out to listeners registered under its type tag.
//!
//! ```no_run
//! use forge_live::{CredentialStore, LiveClient, LiveConfig, WsConnector, event};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), forge_live::ConfigError> {
//! let credentials = CredentialStore::new();
//! let client = LiveClient::with_parts(LiveConfig::from_env()?, Arc::new(WsConnector), Arc::new(credentials.clone()));
//! let _orders = client.on("order:paid", |n| println!("{n:?}"));
//! let _status = client.on(event::CONNECTED, |_| println!("live"));
//! client.connect();
//! // ... on shutdown:
//! client.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod envelope;
pub mod event;
pub mod registry;
pub mod token;
pub mod transport;

pub use client::{ConnectionStatus, LiveClient, Subscription};
pub use config::{ConfigError, LiveConfig};
pub use envelope::{Envelope, EnvelopeError};
pub use event::Notification;
pub use registry::{Callback, EventRegistry, callback};
pub use token::{CredentialStore, NoToken, StaticToken, TicketEndpoint, TokenError, TokenSource};
pub use transport::{Connector, Incoming, Outgoing, RemoteEnd, Session, TransportError, WsConnector};
