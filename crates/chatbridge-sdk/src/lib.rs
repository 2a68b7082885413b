//! # chatbridge SDK
//!
//! Long-lived chat session plumbing:
//!
//! * [`ChatTransport`] — what a chat protocol client must provide
//!   (connect, ping, say).
//! * [`IrcTransport`] — the production transport, IRC over a WebSocket.
//! * [`ConnectionSupervisor`] — connects once, pings on a fixed interval and
//!   forwards every inbound [`ChatEvent`](chatbridge_models::ChatEvent) to a
//!   [`Dispatch`] implementation.  Fails fast; never reconnects.
//! * [`ChatSession`] — cloneable handle handlers use to reply.
//! * [`SessionError`] — unified error type.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use chatbridge_models::{Channel, ChatEvent, ChatIdentity};
//! use chatbridge_sdk::{
//!     ChatSession, ConnectionSupervisor, Dispatch, IrcTransport, IrcTransportConfig,
//!     SupervisorConfig,
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Dispatch for Echo {
//!     async fn dispatch(&self, session: &ChatSession, event: ChatEvent) {
//!         let _ = session.say(&event.channel, &event.text).await;
//!     }
//! }
//!
//! # async fn run() -> Result<(), chatbridge_sdk::SessionError> {
//! let identity = ChatIdentity::new("mybot", "access-token").unwrap();
//! let channels = vec![Channel::new("somestreamer").unwrap()];
//! let transport = Arc::new(IrcTransport::new(IrcTransportConfig::default()));
//!
//! let supervisor =
//!     ConnectionSupervisor::start(transport, identity, channels, SupervisorConfig::default())
//!         .await?;
//! let err = supervisor.run(&Echo).await;
//! eprintln!("session ended: {err}");
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod irc;
pub mod irc_transport;
pub mod session;
pub mod supervisor;
pub mod transport;

pub use dispatch::Dispatch;
pub use error::SessionError;
pub use irc_transport::{IrcTransport, IrcTransportConfig};
pub use session::ChatSession;
pub use supervisor::{ConnectionSupervisor, SupervisorConfig};
pub use transport::{ChatTransport, Connected};
