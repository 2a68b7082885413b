//! Boundary between the supervisor and bot logic.

use async_trait::async_trait;
use chatbridge_models::ChatEvent;

use crate::session::ChatSession;

/// Receives every inbound chat event, in arrival order.
///
/// The supervisor awaits each call before taking the next event.  Keep-alive
/// pings are unaffected, but while a call is pending inbound events queue up
/// in the transport and, once its buffer is full, the socket stops being
/// read.  A handler that needs to do slow work should spawn it.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Handle one event.  `session` can be used to reply.
    async fn dispatch(&self, session: &ChatSession, event: ChatEvent);
}
