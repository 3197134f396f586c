//! Per-connection handler: intent decoding and routing.
//!
//! Each accepted connection gets a read task (this handler) and a write
//! task draining its outbox. The flow is:
//!   1. Register the outbox with the hub and wait for the ack
//!   2. Loop: receive frame → decode intent → apply to registry or session
//!   3. On close, the [`Peer`] guard posts `Unregister` to the hub

use std::sync::Arc;

use farkle_game::{GameError, Outbound, Session};
use farkle_protocol::{ClientIntent, Codec, ParticipantId, ProtocolError, ServerEvent};
use farkle_registry::{Registry, Seated};
use farkle_transport::{Connection, WebSocketConnection};
use tokio::sync::{mpsc, oneshot};

use crate::hub::{leave_session, Fanout, HubCommand, Membership};
use crate::FarkleError;

/// Sent for any frame that isn't a well-formed intent.
pub(crate) const INVALID_MESSAGE: &str = "Invalid message";

/// Shared by every connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Arc<Registry>,
    pub(crate) fanout: Arc<Fanout<C>>,
    pub(crate) hub: mpsc::UnboundedSender<HubCommand>,
    pub(crate) send_buffer_size: usize,
}

/// One connected participant and the session it is bound to.
///
/// Dropping it hands the membership to the hub, which applies the
/// disconnect. This runs even if the handler panics.
struct Peer {
    participant: ParticipantId,
    membership: Option<Membership>,
    hub: mpsc::UnboundedSender<HubCommand>,
}

impl Drop for Peer {
    fn drop(&mut self) {
        let _ = self.hub.send(HubCommand::Unregister {
            participant: self.participant,
            membership: self.membership.take(),
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), FarkleError> {
    let conn = Arc::new(conn);
    let participant = ParticipantId(conn.id().into_inner());

    let (outbox, mut outbound) = mpsc::channel::<Arc<[u8]>>(state.send_buffer_size);
    let (ack, registered) = oneshot::channel();
    state
        .hub
        .send(HubCommand::Register {
            participant,
            outbox,
            ack,
        })
        .map_err(|_| FarkleError::HubClosed)?;
    let mut peer = Peer {
        participant,
        membership: None,
        hub: state.hub.clone(),
    };
    registered.await.map_err(|_| FarkleError::HubClosed)?;
    tracing::info!(%participant, "connection opened");

    let writer_conn = Arc::clone(&conn);
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = writer_conn.send(&frame).await {
                tracing::debug!(%participant, error = %e, "send failed");
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = conn.recv() => match frame {
                Ok(Some(data)) => handle_frame(&state, &mut peer, &data).await,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(%participant, error = %e, "recv error");
                    break;
                }
            },
            _ = &mut writer => {
                tracing::debug!(%participant, "write task ended");
                break;
            }
        }
    }

    writer.abort();
    drop(peer);
    tracing::info!(%participant, "connection closed");
    Ok(())
}

/// Decodes one frame and applies it. Every failure becomes a private
/// `error` event; none of them end the connection.
async fn handle_frame<C: Codec>(state: &ServerState<C>, peer: &mut Peer, data: &[u8]) {
    let who = peer.participant;
    let intent = match ClientIntent::decode(state.fanout.codec(), data) {
        Ok(intent) => intent,
        Err(e) => {
            tracing::debug!(participant = %who, error = %e, "failed to decode intent");
            let message = match e {
                ProtocolError::UnknownType(_) => e.to_string(),
                _ => INVALID_MESSAGE.to_string(),
            };
            state.fanout.send_private(who, &ServerEvent::error(message));
            return;
        }
    };

    let kind = intent.kind();
    tracing::trace!(participant = %who, kind, "intent");
    if let Err(e) = apply_intent(state, peer, intent).await {
        tracing::debug!(participant = %who, kind, error = %e, "intent rejected");
        state.fanout.send_private(who, &ServerEvent::error(e.to_string()));
    }
}

async fn apply_intent<C: Codec>(
    state: &ServerState<C>,
    peer: &mut Peer,
    intent: ClientIntent,
) -> Result<(), FarkleError> {
    let who = peer.participant;
    match intent {
        ClientIntent::Ping => {
            state.fanout.send_private(who, &ServerEvent::Pong);
            Ok(())
        }
        ClientIntent::Create {
            player_name,
            victory_target,
        } => {
            leave_finished(state, peer).await?;
            let seated = state
                .registry
                .create(who, &player_name, victory_target)
                .await?;
            bind(state, peer, seated);
            Ok(())
        }
        ClientIntent::Join {
            game_code,
            player_name,
        } => {
            leave_finished(state, peer).await?;
            let seated = state.registry.join(&game_code, who, &player_name).await?;
            bind(state, peer, seated);
            Ok(())
        }
        ClientIntent::Start => with_session(state, peer, |s| s.start(who)).await,
        ClientIntent::Roll => with_session(state, peer, |s| s.roll(who)).await,
        ClientIntent::ToggleSelect { index } => {
            with_session(state, peer, |s| s.toggle_select(who, index)).await
        }
        ClientIntent::SetAside => with_session(state, peer, |s| s.set_aside(who)).await,
        ClientIntent::Bank => with_session(state, peer, |s| s.bank(who)).await,
    }
}

/// Runs `op` under the session lock and delivers its events before
/// releasing it.
async fn with_session<C: Codec>(
    state: &ServerState<C>,
    peer: &Peer,
    op: impl FnOnce(&mut Session) -> Result<Outbound, GameError>,
) -> Result<(), FarkleError> {
    let membership = peer.membership.as_ref().ok_or(FarkleError::NotInGame)?;
    let mut session = membership.session.lock().await;
    let events = op(&mut session)?;
    state.fanout.dispatch(&session, events);
    Ok(())
}

/// Drops a finished membership so the participant can create or join
/// again. An unfinished one is kept and the intent refused.
async fn leave_finished<C: Codec>(state: &ServerState<C>, peer: &mut Peer) -> Result<(), FarkleError> {
    let Some(membership) = peer.membership.take() else {
        return Ok(());
    };
    let playing = membership.session.lock().await.status().is_playing();
    if playing {
        peer.membership = Some(membership);
        return Err(FarkleError::AlreadyInGame);
    }
    leave_session(&state.registry, &state.fanout, peer.participant, membership).await;
    Ok(())
}

/// Delivers the seat's events while its lock is still held, then records
/// the membership.
fn bind<C: Codec>(state: &ServerState<C>, peer: &mut Peer, seated: Seated) {
    let Seated {
        code,
        session,
        guard,
        slot,
        events,
    } = seated;
    state.fanout.dispatch(&guard, events);
    drop(guard);
    tracing::debug!(%code, participant = %peer.participant, slot, "bound to session");
    peer.membership = Some(Membership { code, session });
}
