use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Utc};
use glance_core::{
    FrameOutcome, GestureState, LandmarkSample, LivenessConfig, Observation, SessionDriver,
    TransitionEvent,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Point-in-time view of the current session, published after every change.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: GestureState,
    pub status_text: String,
    pub instruction_text: String,
    pub consecutive_blink_frames: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A confirmed gesture, stamped with the session it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub event: TransitionEvent,
    pub at: DateTime<Utc>,
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    Observe {
        observation: Observation,
        reply: oneshot::Sender<FrameOutcome>,
    },
    Reset {
        reply: oneshot::Sender<Uuid>,
    },
    Events {
        reply: oneshot::Sender<Vec<EventRecord>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl EngineHandle {
    /// Hand the landmarks of the current frame to the session.
    pub async fn push_sample(&self, sample: LandmarkSample) -> Result<FrameOutcome, EngineError> {
        self.observe(Observation::Face(sample)).await
    }

    /// Report a frame in which the detector found no face.
    pub async fn no_face(&self) -> Result<FrameOutcome, EngineError> {
        self.observe(Observation::NoFace).await
    }

    /// Discard the current session and start a new one. Returns its id.
    pub async fn reset(&self) -> Result<Uuid, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Reset { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Recent transition events, oldest first.
    pub async fn events(&self) -> Result<Vec<EventRecord>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Events { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Latest published snapshot. Never waits on the engine thread.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    async fn observe(&self, observation: Observation) -> Result<FrameOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Observe {
                observation,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Sole owner of the session. Lives on the engine thread.
struct Engine {
    driver: SessionDriver,
    session_id: Uuid,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    history: VecDeque<EventRecord>,
    history_len: usize,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl Engine {
    fn new(
        config: LivenessConfig,
        history_len: usize,
        now: Instant,
    ) -> (Self, watch::Receiver<SessionSnapshot>) {
        let driver = SessionDriver::new(config, now);
        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let snapshot = SessionSnapshot {
            session_id,
            state: driver.session().state(),
            status_text: driver.session().status_text().to_string(),
            instruction_text: driver.session().instruction_text().to_string(),
            consecutive_blink_frames: 0,
            started_at,
            completed_at: None,
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot);

        let engine = Self {
            driver,
            session_id,
            started_at,
            completed_at: None,
            history: VecDeque::with_capacity(history_len),
            history_len,
            snapshot_tx,
        };
        (engine, snapshot_rx)
    }

    fn observe(&mut self, now: Instant, observation: Observation) -> FrameOutcome {
        let outcome = self.driver.offer(now, observation);
        if !outcome.accepted {
            return outcome;
        }

        if let Some(event) = outcome.event {
            let at = Utc::now();
            if event.to == GestureState::Complete {
                self.completed_at = Some(at);
                tracing::info!(session_id = %self.session_id, "liveness verified");
            }
            self.record(EventRecord {
                session_id: self.session_id,
                event,
                at,
            });
        }
        self.publish();
        outcome
    }

    fn reset(&mut self, now: Instant) -> Uuid {
        self.driver.reset(now);
        self.session_id = Uuid::new_v4();
        self.started_at = Utc::now();
        self.completed_at = None;
        tracing::info!(session_id = %self.session_id, "new session started");
        self.publish();
        self.session_id
    }

    fn record(&mut self, record: EventRecord) {
        if self.history_len == 0 {
            return;
        }
        while self.history.len() >= self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    fn publish(&self) {
        let session = self.driver.session();
        self.snapshot_tx.send_replace(SessionSnapshot {
            session_id: self.session_id,
            state: session.state(),
            status_text: session.status_text().to_string(),
            instruction_text: session.instruction_text().to_string(),
            consecutive_blink_frames: session.consecutive_blink_frames(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        });
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The thread owns the only [`SessionDriver`], so every session mutation
/// happens in request order on one thread. Readers that only need the
/// current state use [`EngineHandle::snapshot`] instead of a round trip.
pub fn spawn_engine(
    config: LivenessConfig,
    history_len: usize,
) -> Result<EngineHandle, EngineError> {
    let (mut engine, snapshot) = Engine::new(config, history_len, Instant::now());
    tracing::info!(session_id = %engine.session_id, "session started");

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(16);

    std::thread::Builder::new()
        .name("glance-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Observe { observation, reply } => {
                        let outcome = engine.observe(Instant::now(), observation);
                        let _ = reply.send(outcome);
                    }
                    EngineRequest::Reset { reply } => {
                        let id = engine.reset(Instant::now());
                        let _ = reply.send(id);
                    }
                    EngineRequest::Events { reply } => {
                        let _ = reply.send(engine.history.iter().cloned().collect());
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx, snapshot })
}
