//! Connection supervisor: one connect, then keep-alive and event forwarding
//! until something breaks.
//!
//! The supervisor never reconnects.  Whatever [`ConnectionSupervisor::run`]
//! returns is terminal and the caller is expected to exit.

use std::sync::Arc;
use std::time::Duration;

use chatbridge_models::{Channel, ChatEvent, ChatIdentity};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, trace};

use crate::dispatch::Dispatch;
use crate::error::SessionError;
use crate::session::ChatSession;
use crate::transport::ChatTransport;

/// Keep-alive settings.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Time between keep-alive pings.  The first ping goes out one full
    /// interval after start.
    pub ping_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(60),
        }
    }
}

impl SupervisorConfig {
    /// Read `CHATBRIDGE_PING_INTERVAL_SECS` (default `60`).
    pub fn from_env() -> Self {
        let secs: u64 = std::env::var("CHATBRIDGE_PING_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        Self {
            ping_interval: Duration::from_secs(secs.max(1)),
        }
    }
}

/// Owns a connected [`ChatSession`] and its inbound event stream.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    session: ChatSession,
    events: mpsc::Receiver<ChatEvent>,
    config: SupervisorConfig,
}

impl ConnectionSupervisor {
    /// Connect through `transport` as `identity` and join `channels`.
    ///
    /// Any connect failure is returned as [`SessionError::EstablishFailed`];
    /// there is no retry.
    pub async fn start(
        transport: Arc<dyn ChatTransport>,
        identity: ChatIdentity,
        channels: Vec<Channel>,
        config: SupervisorConfig,
    ) -> Result<Self, SessionError> {
        let connected = match transport.connect(&identity, &channels).await {
            Ok(connected) => connected,
            Err(e) => {
                error!(username = %identity.username, error = %e, "failed to establish chat session");
                return Err(match e {
                    SessionError::EstablishFailed(_) => e,
                    other => SessionError::EstablishFailed(other.to_string()),
                });
            }
        };

        info!(
            endpoint = %connected.endpoint,
            username = %identity.username,
            "connected to chat server"
        );

        let session = ChatSession::new(connected.endpoint, identity, channels, transport);
        Ok(Self {
            session,
            events: connected.events,
            config,
        })
    }

    /// The live session.
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Ping on a fixed interval and hand every inbound event to `dispatch`.
    ///
    /// Keep-alive pings run on their own task, so a slow handler does not
    /// hold back the ping schedule.  Events are still dispatched one at a
    /// time, in arrival order.
    ///
    /// Only returns on failure: [`SessionError::KeepAliveFailed`] when a ping
    /// fails, [`SessionError::Closed`] when the event stream ends.
    pub async fn run<D>(mut self, dispatch: &D) -> SessionError
    where
        D: Dispatch + ?Sized,
    {
        let mut keep_alive = tokio::spawn(keep_alive(
            self.session.clone(),
            self.config.ping_interval,
        ));

        let err = loop {
            tokio::select! {
                result = &mut keep_alive => {
                    break result.unwrap_or_else(|e| {
                        SessionError::Closed(format!("keep-alive task failed: {e}"))
                    });
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        error!(endpoint = %self.session.endpoint(), "chat event stream ended");
                        break SessionError::Closed("event stream ended".into());
                    };
                    dispatch.dispatch(&self.session, event).await;
                }
            }
        };

        keep_alive.abort();
        err
    }
}

/// Ping `session` every `period` until a ping fails.
async fn keep_alive(session: ChatSession, period: Duration) -> SessionError {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match session.ping().await {
            Ok(latency) => trace!(?latency, "keep-alive ping"),
            Err(e) => {
                error!(
                    endpoint = %session.endpoint(),
                    error = %e,
                    "keep-alive ping failed"
                );
                return SessionError::KeepAliveFailed(Box::new(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chatbridge_models::RemoteEndpoint;
    use chrono::Utc;

    use super::*;
    use crate::transport::Connected;

    /// Scripted transport.  `connect` succeeds once with the prepared event
    /// receiver unless `connect_error` is set.
    #[derive(Default)]
    struct FakeTransport {
        connects: AtomicUsize,
        pings: AtomicUsize,
        events: Mutex<Option<mpsc::Receiver<ChatEvent>>>,
        connect_error: Mutex<Option<SessionError>>,
        ping_results: Mutex<VecDeque<Result<Duration, SessionError>>>,
        said: Mutex<Vec<(Channel, String)>>,
    }

    impl FakeTransport {
        fn with_events() -> (Arc<Self>, mpsc::Sender<ChatEvent>) {
            let (tx, rx) = mpsc::channel(16);
            let fake = Self {
                events: Mutex::new(Some(rx)),
                ..Self::default()
            };
            (Arc::new(fake), tx)
        }
    }

    #[async_trait]
    impl ChatTransport for FakeTransport {
        async fn connect(
            &self,
            _identity: &ChatIdentity,
            _channels: &[Channel],
        ) -> Result<Connected, SessionError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.connect_error.lock().unwrap().take() {
                return Err(err);
            }
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
            self.pings.fetch_add(1, Ordering::SeqCst);
            self.ping_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Duration::from_millis(1)))
        }

        async fn say(&self, channel: &Channel, text: &str) -> Result<(), SessionError> {
            self.said
                .lock()
                .unwrap()
                .push((channel.clone(), text.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl Dispatch for Recorder {
        async fn dispatch(&self, session: &ChatSession, event: ChatEvent) {
            self.seen.lock().unwrap().push(event.text.clone());
            if let Some(reply) = self.reply {
                session.say(&event.channel, reply).await.unwrap();
            }
        }
    }

    fn identity() -> ChatIdentity {
        ChatIdentity::new("MyBot", "abc").unwrap()
    }

    fn channels() -> Vec<Channel> {
        vec![Channel::new("streamerone").unwrap()]
    }

    fn event(text: &str) -> ChatEvent {
        ChatEvent {
            channel: Channel::new("streamerone").unwrap(),
            username: "viewer".into(),
            display_name: "Viewer".into(),
            user_id: "42".into(),
            message_id: None,
            text: text.into(),
            tags: HashMap::new(),
            received_at: Utc::now(),
            raw: String::new(),
        }
    }

    fn quiet() -> SupervisorConfig {
        SupervisorConfig {
            ping_interval: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn start_exposes_the_connected_session() {
        let (fake, _tx) = FakeTransport::with_events();
        let sup = ConnectionSupervisor::start(fake.clone(), identity(), channels(), quiet())
            .await
            .unwrap();

        let session = sup.session();
        assert_eq!(session.endpoint().to_string(), "chat.test:443");
        assert_eq!(session.identity().username, "mybot");
        assert!(session.channels().contains(&Channel::new("#StreamerOne").unwrap()));
        assert_eq!(fake.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_failure_is_establish_failed_without_retry() {
        let fake = Arc::new(FakeTransport::default());
        *fake.connect_error.lock().unwrap() =
            Some(SessionError::LoginRejected("Login authentication failed".into()));

        let err = ConnectionSupervisor::start(fake.clone(), identity(), channels(), quiet())
            .await
            .unwrap_err();

        match err {
            SessionError::EstablishFailed(msg) => assert!(msg.contains("Login authentication failed")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fake.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ping_failure_ends_run_without_reconnecting() {
        let (fake, _tx) = FakeTransport::with_events();
        fake.ping_results.lock().unwrap().extend([
            Ok(Duration::from_millis(3)),
            Err(SessionError::PingTimeout(Duration::from_secs(10))),
        ]);
        let config = SupervisorConfig {
            ping_interval: Duration::from_millis(20),
        };
        let sup = ConnectionSupervisor::start(fake.clone(), identity(), channels(), config)
            .await
            .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), sup.run(&Recorder::default()))
            .await
            .unwrap();

        assert!(matches!(
            err,
            SessionError::KeepAliveFailed(ref cause) if matches!(**cause, SessionError::PingTimeout(_))
        ));
        assert_eq!(fake.pings.load(Ordering::SeqCst), 2);
        assert_eq!(fake.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn events_are_forwarded_in_order_until_stream_ends() {
        let (fake, tx) = FakeTransport::with_events();
        let sup = ConnectionSupervisor::start(fake, identity(), channels(), quiet())
            .await
            .unwrap();
        for text in ["one", "two", "three"] {
            tx.send(event(text)).await.unwrap();
        }
        drop(tx);

        let recorder = Recorder::default();
        let err = sup.run(&recorder).await;

        assert!(matches!(err, SessionError::Closed(_)));
        assert_eq!(*recorder.seen.lock().unwrap(), ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn handlers_reply_through_the_session() {
        let (fake, tx) = FakeTransport::with_events();
        let sup = ConnectionSupervisor::start(fake.clone(), identity(), channels(), quiet())
            .await
            .unwrap();
        tx.send(event("!ping")).await.unwrap();
        drop(tx);

        let recorder = Recorder {
            reply: Some("pong"),
            ..Recorder::default()
        };
        sup.run(&recorder).await;

        let said = fake.said.lock().unwrap();
        assert_eq!(said.len(), 1);
        assert_eq!(said[0].0.as_str(), "#streamerone");
        assert_eq!(said[0].1, "pong");
    }

    /// Holds every event for a fixed time before recording it.
    struct Slow(Duration, AtomicUsize);

    #[async_trait]
    impl Dispatch for Slow {
        async fn dispatch(&self, _session: &ChatSession, _event: ChatEvent) {
            tokio::time::sleep(self.0).await;
            self.1.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn slow_handler_does_not_hold_back_pings() {
        let (fake, tx) = FakeTransport::with_events();
        let config = SupervisorConfig {
            ping_interval: Duration::from_millis(20),
        };
        let sup = ConnectionSupervisor::start(fake.clone(), identity(), channels(), config)
            .await
            .unwrap();
        tx.send(event("slow")).await.unwrap();
        drop(tx);

        let slow = Slow(Duration::from_millis(300), AtomicUsize::new(0));
        let err = tokio::time::timeout(Duration::from_secs(5), sup.run(&slow))
            .await
            .unwrap();

        assert!(matches!(err, SessionError::Closed(_)));
        assert_eq!(slow.1.load(Ordering::SeqCst), 1);
        let pings = fake.pings.load(Ordering::SeqCst);
        assert!(pings >= 5, "only {pings} pings during a 300ms handler");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fake.pings.load(Ordering::SeqCst), pings);
    }

    #[test]
    fn default_ping_interval_is_one_minute() {
        assert_eq!(SupervisorConfig::default().ping_interval, Duration::from_secs(60));
    }
}
