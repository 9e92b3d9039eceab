use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::{MetricPublisher, PublishError};

/// Delay before another connect attempt after a failed one.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
/// Time a connect attempt may take before it is considered failed.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Birthed,
    Live,
}

/// Payload sequence number, wrapping at 256.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCounter(u8);

impl SequenceCounter {
    pub fn reset(&mut self) {
        self.0 = 0;
    }

    /// Take the next sequence number.
    pub fn claim(&mut self) -> u8 {
        let seq = self.0;
        self.0 = self.0.wrapping_add(1);
        seq
    }

    /// The number the next claim will return.
    pub fn peek(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub births: u64,
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub connection_losses: u64,
    pub data_published: u64,
    pub not_ready: u64,
    pub publish_failures: u64,
}

/// Owns the session lifecycle, the payload sequence and the bdSeq.
///
/// `Disconnected -> Connecting -> Birthed -> Live`, back to `Disconnected` on a
/// connect failure or a lost connection. A failed connect attempt is retried after the
/// reconnect backoff, a lost session is retried immediately. Every successful connect
/// produces a new birth with the sequence restarted at 0.
pub struct SessionStateMachine {
    state: SessionState,
    seq: SequenceCounter,
    bdseq: u8,
    reconnect_backoff: Duration,
    connect_timeout: Duration,
    retry_at: Option<Instant>,
    connect_deadline: Option<Instant>,
    stats: SessionStats,
}

impl SessionStateMachine {
    pub fn new(reconnect_backoff: Duration, connect_timeout: Duration) -> Self {
        Self {
            state: SessionState::Disconnected,
            seq: SequenceCounter::default(),
            bdseq: 0,
            reconnect_backoff,
            connect_timeout,
            retry_at: None,
            connect_deadline: None,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == SessionState::Live
    }

    pub fn bdseq(&self) -> u8 {
        self.bdseq
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// When the next connect attempt is due, if one is scheduled.
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    /// When the current connect attempt times out.
    pub fn connect_deadline(&self) -> Option<Instant> {
        self.connect_deadline
    }

    /// Start a connect attempt if disconnected and the backoff has elapsed.
    pub fn begin_connect(&mut self, now: Instant) -> bool {
        if self.state != SessionState::Disconnected {
            return false;
        }
        if let Some(retry_at) = self.retry_at {
            if now < retry_at {
                return false;
            }
        }
        self.enter_connecting(now);
        true
    }

    fn enter_connecting(&mut self, now: Instant) {
        self.state = SessionState::Connecting;
        self.retry_at = None;
        self.connect_deadline = Some(now + self.connect_timeout);
        self.stats.connect_attempts += 1;
        info!("Session connecting. attempt={}", self.stats.connect_attempts);
    }

    pub fn check_connect_timeout(&mut self, now: Instant) {
        if let Some(deadline) = self.connect_deadline {
            if self.state == SessionState::Connecting && now >= deadline {
                self.on_connect_failed(now, "connect timed out");
            }
        }
    }

    pub fn on_connect_failed(&mut self, now: Instant, reason: &str) {
        if self.state != SessionState::Connecting {
            debug!("Ignoring connect failure outside a connect attempt. state={:?}", self.state);
            return;
        }
        self.state = SessionState::Disconnected;
        self.connect_deadline = None;
        self.retry_at = Some(now + self.reconnect_backoff);
        self.stats.connect_failures += 1;
        warn!(
            "Connect attempt failed. reason={reason} retry_in={:?}",
            self.reconnect_backoff
        );
    }

    /// The transport reported the connection gone.
    pub fn on_connection_lost(&mut self, now: Instant) {
        match self.state {
            SessionState::Birthed | SessionState::Live => {
                self.end_epoch();
                self.stats.connection_losses += 1;
                warn!("Session lost. bdseq={}", self.bdseq);
            }
            SessionState::Connecting => self.on_connect_failed(now, "connection closed"),
            SessionState::Disconnected => (),
        }
    }

    fn end_epoch(&mut self) {
        self.state = SessionState::Disconnected;
        self.connect_deadline = None;
        self.retry_at = None;
        self.bdseq = self.bdseq.wrapping_add(1);
    }

    /// The transport connected: subscribe and publish the birth certificates.
    ///
    /// Does nothing if the session is already birthed.
    pub async fn on_connected(&mut self, publisher: &MetricPublisher) -> Result<(), PublishError> {
        match self.state {
            SessionState::Birthed | SessionState::Live => {
                debug!("Already birthed, ignoring connect");
                return Ok(());
            }
            SessionState::Disconnected => self.enter_connecting(Instant::now()),
            SessionState::Connecting => (),
        }
        self.connect_deadline = None;

        if publisher.subscribe().await.is_err() {
            self.on_connect_failed(Instant::now(), "subscribe failed");
            return Err(PublishError::Transport);
        }
        self.birth(publisher).await
    }

    /// Publish a fresh birth pair while live.
    pub async fn rebirth(&mut self, publisher: &MetricPublisher) -> Result<(), PublishError> {
        if !self.is_live() {
            return Err(PublishError::NotReady(self.state));
        }
        info!("Rebirthing session. bdseq={}", self.bdseq);
        self.birth(publisher).await
    }

    async fn birth(&mut self, publisher: &MetricPublisher) -> Result<(), PublishError> {
        self.seq.reset();

        let seq = self.seq.claim();
        if let Err(e) = publisher.publish_node_birth(seq, self.bdseq).await {
            self.on_birth_failed();
            return Err(e);
        }
        self.state = SessionState::Birthed;

        let seq = self.seq.claim();
        if let Err(e) = publisher.publish_device_birth(seq).await {
            self.on_birth_failed();
            return Err(e);
        }
        self.state = SessionState::Live;
        self.stats.births += 1;
        info!("Session live. bdseq={} births={}", self.bdseq, self.stats.births);
        Ok(())
    }

    fn on_birth_failed(&mut self) {
        // An NBIRTH that went out used up the bdseq it announced
        if self.state != SessionState::Connecting {
            self.bdseq = self.bdseq.wrapping_add(1);
        }
        self.state = SessionState::Disconnected;
        self.connect_deadline = None;
        self.retry_at = Some(Instant::now() + self.reconnect_backoff);
        self.stats.connect_failures += 1;
        warn!("Birth failed. retry_in={:?}", self.reconnect_backoff);
    }

    /// Check the session is live, counting the rejection if not.
    pub fn ensure_live(&mut self) -> Result<(), PublishError> {
        if self.is_live() {
            return Ok(());
        }
        self.stats.not_ready += 1;
        warn!("Publish rejected, session not live. state={:?}", self.state);
        Err(PublishError::NotReady(self.state))
    }

    /// Claim the sequence number for a data payload about to be handed to the transport.
    ///
    /// Only valid once [ensure_live](Self::ensure_live) has passed for this publish.
    pub(crate) fn claim_data_seq(&mut self) -> u8 {
        debug_assert!(self.is_live());
        self.seq.claim()
    }

    pub fn record_published(&mut self) {
        self.stats.data_published += 1;
    }

    pub fn record_publish_failure(&mut self) {
        self.stats.publish_failures += 1;
    }

    /// Orderly end of the session.
    pub fn on_shutdown(&mut self) {
        if self.state != SessionState::Disconnected {
            self.end_epoch();
        }
        info!("Session closed. state={:?}", self.state);
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: SessionState) {
        self.state = state;
    }
}
