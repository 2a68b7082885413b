//! Command routing for inbound chat messages.
//!
//! Every event is logged.  Messages that start with the command prefix are
//! looked up in a fixed table of named handlers; unknown commands are
//! ignored.

use std::collections::HashMap;

use async_trait::async_trait;
use chatbridge_models::ChatEvent;
use chatbridge_sdk::{ChatSession, Dispatch, SessionError};
use tracing::{debug, info, warn};

/// One named chat command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run the command.  `args` is the text after the command name.
    async fn handle(
        &self,
        session: &ChatSession,
        event: &ChatEvent,
        args: &str,
    ) -> Result<(), SessionError>;
}

/// Health check: answers `pong` in the channel it was asked in.
pub struct PingCommand;

#[async_trait]
impl CommandHandler for PingCommand {
    async fn handle(
        &self,
        session: &ChatSession,
        event: &ChatEvent,
        _args: &str,
    ) -> Result<(), SessionError> {
        session.say(&event.channel, "pong").await
    }
}

/// [`Dispatch`] implementation backed by a static command table.
pub struct CommandRouter {
    prefix: String,
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandRouter {
    /// Empty table.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            handlers: HashMap::new(),
        }
    }

    /// Table with the built-in commands (`ping`).
    pub fn with_builtins(prefix: impl Into<String>) -> Self {
        Self::new(prefix).register("ping", PingCommand)
    }

    /// Add a command; names are matched case-insensitively.
    pub fn register(mut self, name: &'static str, handler: impl CommandHandler + 'static) -> Self {
        self.handlers.insert(name, Box::new(handler));
        self
    }
}

#[async_trait]
impl Dispatch for CommandRouter {
    async fn dispatch(&self, session: &ChatSession, event: ChatEvent) {
        info!(
            channel = %event.channel,
            user = %event.username,
            display_name = %event.display_name,
            message_id = event.message_id.as_deref().unwrap_or("-"),
            text = %event.text,
            "chat message"
        );

        let Some((name, args)) = event.command(&self.prefix) else {
            return;
        };
        let Some(handler) = self.handlers.get(name.to_lowercase().as_str()) else {
            debug!(command = name, "unknown command");
            return;
        };

        if let Err(e) = handler.handle(session, &event, args).await {
            warn!(command = name, channel = %event.channel, error = %e, "command failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chatbridge_models::{Channel, ChatIdentity, RemoteEndpoint};
    use chatbridge_sdk::{ChatTransport, Connected, ConnectionSupervisor, SupervisorConfig};
    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;

    /// Records what the bot says; hands out an idle event stream.
    #[derive(Default)]
    struct Outbox {
        said: Mutex<Vec<(String, String)>>,
        events: Mutex<Option<mpsc::Receiver<ChatEvent>>>,
    }

    #[async_trait]
    impl ChatTransport for Outbox {
        async fn connect(
            &self,
            _identity: &ChatIdentity,
            _channels: &[Channel],
        ) -> Result<Connected, SessionError> {
            let events = self
                .events
                .lock()
                .unwrap()
                .take()
                .ok_or(SessionError::Disconnected)?;
            Ok(Connected {
                endpoint: RemoteEndpoint::new("chat.test", 443),
                events,
            })
        }

        async fn ping(&self) -> Result<Duration, SessionError> {
            Ok(Duration::ZERO)
        }

        async fn say(&self, channel: &Channel, text: &str) -> Result<(), SessionError> {
            self.said
                .lock()
                .unwrap()
                .push((channel.to_string(), text.to_string()));
            Ok(())
        }
    }

    struct Shout;

    #[async_trait]
    impl CommandHandler for Shout {
        async fn handle(
            &self,
            session: &ChatSession,
            event: &ChatEvent,
            args: &str,
        ) -> Result<(), SessionError> {
            session.say(&event.channel, &args.to_uppercase()).await
        }
    }

    async fn session() -> (Arc<Outbox>, ChatSession, mpsc::Sender<ChatEvent>) {
        let (tx, rx) = mpsc::channel(4);
        let outbox = Arc::new(Outbox {
            events: Mutex::new(Some(rx)),
            ..Outbox::default()
        });
        let sup = ConnectionSupervisor::start(
            outbox.clone(),
            ChatIdentity::new("mybot", "abc").unwrap(),
            vec![Channel::new("streamerone").unwrap()],
            SupervisorConfig::default(),
        )
        .await
        .unwrap();
        (outbox, sup.session().clone(), tx)
    }

    fn event(text: &str) -> ChatEvent {
        ChatEvent {
            channel: Channel::new("streamerone").unwrap(),
            username: "viewer".into(),
            display_name: "Viewer".into(),
            user_id: "42".into(),
            message_id: Some("m1".into()),
            text: text.into(),
            tags: HashMap::new(),
            received_at: Utc::now(),
            raw: String::new(),
        }
    }

    #[tokio::test]
    async fn builtin_ping_answers_pong() {
        let (outbox, session, _tx) = session().await;
        let router = CommandRouter::with_builtins("!");

        router.dispatch(&session, event("!ping")).await;

        let said = outbox.said.lock().unwrap();
        assert_eq!(*said, [("#streamerone".to_string(), "pong".to_string())]);
    }

    #[tokio::test]
    async fn command_names_are_case_insensitive() {
        let (outbox, session, _tx) = session().await;
        let router = CommandRouter::with_builtins("!");

        router.dispatch(&session, event("!PING")).await;

        assert_eq!(outbox.said.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn plain_chat_and_unknown_commands_are_ignored() {
        let (outbox, session, _tx) = session().await;
        let router = CommandRouter::with_builtins("!");

        router.dispatch(&session, event("hello there")).await;
        router.dispatch(&session, event("!nope")).await;
        router.dispatch(&session, event("?ping")).await;

        assert!(outbox.said.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registered_handlers_get_their_arguments() {
        let (outbox, session, _tx) = session().await;
        let router = CommandRouter::new("?").register("shout", Shout);

        router.dispatch(&session, event("?shout  hello world")).await;

        let said = outbox.said.lock().unwrap();
        assert_eq!(said[0].1, "HELLO WORLD");
    }
}
