//! Peer directory, event fan-out, and the hub task.
//!
//! Every connected participant has a bounded outbox drained by its write
//! task. [`Fanout`] maps participants to outboxes and turns a session's
//! `(Recipient, ServerEvent)` list into enqueued frames. The hub task owns
//! registration: connections announce themselves on the way in and post an
//! `Unregister` on the way out, which is where disconnects are applied.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use farkle_game::{DisconnectOutcome, Outbound, Session};
use farkle_protocol::{Codec, GameCode, ParticipantId, Recipient, ServerEvent};
use farkle_registry::{Registry, SharedSession};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// Encoded frames waiting for one participant's write task.
pub(crate) type Outbox = mpsc::Sender<Arc<[u8]>>;

/// The session a participant is currently bound to.
pub(crate) struct Membership {
    pub(crate) code: GameCode,
    pub(crate) session: SharedSession,
}

pub(crate) enum HubCommand {
    Register {
        participant: ParticipantId,
        outbox: Outbox,
        ack: oneshot::Sender<()>,
    },
    Unregister {
        participant: ParticipantId,
        membership: Option<Membership>,
    },
}

// ---------------------------------------------------------------------------
// Fanout
// ---------------------------------------------------------------------------

/// Participant → outbox directory plus the codec frames are encoded with.
pub(crate) struct Fanout<C: Codec> {
    peers: RwLock<HashMap<ParticipantId, Outbox>>,
    codec: C,
}

impl<C: Codec> Fanout<C> {
    pub(crate) fn new(codec: C) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            codec,
        }
    }

    pub(crate) fn codec(&self) -> &C {
        &self.codec
    }

    fn register(&self, participant: ParticipantId, outbox: Outbox) {
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(participant, outbox);
    }

    /// Dropping the outbox lets the write task drain and exit.
    fn unregister(&self, participant: ParticipantId) {
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&participant);
    }

    /// Delivers a session's events. Call with the session lock held so
    /// every participant sees the session's operations in the same order.
    pub(crate) fn dispatch(&self, session: &Session, events: Outbound) {
        for (recipient, event) in events {
            let Some(frame) = self.encode(&event) else {
                continue;
            };
            match recipient {
                Recipient::All => {
                    for (_, participant) in session.participants() {
                        self.deliver(participant, &frame, event.kind());
                    }
                }
                Recipient::Slot(slot) => {
                    if let Some(participant) = session.participant_at(slot) {
                        self.deliver(participant, &frame, event.kind());
                    }
                }
            }
        }
    }

    /// Sends one event to one participant, outside of any session.
    pub(crate) fn send_private(&self, participant: ParticipantId, event: &ServerEvent) {
        if let Some(frame) = self.encode(event) {
            self.deliver(participant, &frame, event.kind());
        }
    }

    fn encode(&self, event: &ServerEvent) -> Option<Arc<[u8]>> {
        match self.codec.encode(event) {
            Ok(bytes) => Some(bytes.into()),
            Err(e) => {
                tracing::error!(kind = event.kind(), error = %e, "failed to encode event");
                None
            }
        }
    }

    fn deliver(&self, participant: ParticipantId, frame: &Arc<[u8]>, kind: &'static str) {
        let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);
        let Some(outbox) = peers.get(&participant) else {
            return;
        };
        match outbox.try_send(Arc::clone(frame)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%participant, kind, "outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(%participant, kind, "outbound queue closed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Leaving a session
// ---------------------------------------------------------------------------

/// Unbinds `participant` from its session.
///
/// Remaining players get the disconnect events. If nobody is left the
/// session is dropped from the registry.
pub(crate) async fn leave_session<C: Codec>(
    registry: &Registry,
    fanout: &Fanout<C>,
    participant: ParticipantId,
    membership: Membership,
) {
    let Membership { code, session } = membership;
    let mut guard = session.lock().await;
    match guard.disconnect(participant) {
        DisconnectOutcome::Continue(events) => {
            tracing::info!(%code, %participant, "player left game");
            fanout.dispatch(&guard, events);
        }
        DisconnectOutcome::Abandoned => {
            drop(guard);
            if registry.discard(&code, &session).await {
                tracing::info!(%code, "session abandoned");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Hub task
// ---------------------------------------------------------------------------

/// Runs until every command sender is gone.
pub(crate) async fn run_hub<C: Codec>(
    mut commands: mpsc::UnboundedReceiver<HubCommand>,
    registry: Arc<Registry>,
    fanout: Arc<Fanout<C>>,
) {
    tracing::debug!("hub started");
    while let Some(command) = commands.recv().await {
        match command {
            HubCommand::Register {
                participant,
                outbox,
                ack,
            } => {
                fanout.register(participant, outbox);
                let _ = ack.send(());
            }
            HubCommand::Unregister {
                participant,
                membership,
            } => {
                fanout.unregister(participant);
                if let Some(membership) = membership {
                    leave_session(&registry, &fanout, participant, membership).await;
                }
                tracing::trace!(%participant, "unregistered");
            }
        }
    }
    tracing::debug!("hub stopped");
}
