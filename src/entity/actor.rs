//! Cart actor: one task owning one cart's state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info, warn, Instrument};

use super::{DispatchError, SnapshotPolicy};
use crate::cart::{CartCommand, CartId, CartState, Reply};
use crate::storage::{self, EventStore, Snapshot, SnapshotStore};
use crate::tagging::Tag;

pub(crate) type DispatchResult = Result<Reply, DispatchError>;

pub(crate) struct ActorMessage {
    command: CartCommand,
    reply: oneshot::Sender<DispatchResult>,
}

/// Sending side of a cart actor's mailbox.
#[derive(Debug, Clone)]
pub struct CartHandle {
    cart_id: CartId,
    sender: mpsc::Sender<ActorMessage>,
}

impl CartHandle {
    pub fn cart_id(&self) -> &CartId {
        &self.cart_id
    }

    /// `false` once the actor has passivated or exited.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a command. Hands the command back if the mailbox is closed.
    pub(crate) async fn send(
        &self,
        command: CartCommand,
    ) -> Result<oneshot::Receiver<DispatchResult>, CartCommand> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(ActorMessage { command, reply })
            .await
            .map_err(|e| e.0.command)?;
        Ok(rx)
    }

    /// Send a command and wait for its reply, without a deadline.
    pub async fn ask(&self, command: CartCommand) -> DispatchResult {
        let rx = self
            .send(command)
            .await
            .map_err(|_| DispatchError::EntityStopped {
                cart_id: self.cart_id.clone(),
            })?;
        rx.await.map_err(|_| DispatchError::EntityStopped {
            cart_id: self.cart_id.clone(),
        })?
    }
}

/// Stores and policy an actor needs.
#[derive(Clone)]
pub(crate) struct ActorContext {
    pub events: Arc<dyn EventStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub policy: SnapshotPolicy,
    pub passivation_timeout: Duration,
    pub mailbox_capacity: usize,
}

struct CartActor {
    cart_id: CartId,
    tag: Tag,
    state: CartState,
    sequence_nr: u64,
    // Set when in-memory state may no longer match the log.
    stale: bool,
    ctx: ActorContext,
}

impl CartActor {
    fn new(cart_id: CartId, tag: Tag, ctx: ActorContext) -> Self {
        Self {
            cart_id,
            tag,
            state: CartState::default(),
            sequence_nr: 0,
            stale: true,
            ctx,
        }
    }

    /// Rebuild state from the latest snapshot and the events after it.
    async fn recover(&mut self) -> storage::Result<()> {
        let snapshot = self.ctx.snapshots.latest(&self.cart_id).await?;
        let (mut state, mut sequence_nr) = match snapshot {
            Some(s) => (s.state, s.sequence_nr),
            None => (CartState::default(), 0),
        };
        let from_snapshot = sequence_nr;

        let envelopes = self.ctx.events.load_from(&self.cart_id, sequence_nr + 1).await?;
        let replayed = envelopes.len();
        for envelope in envelopes {
            let event = envelope.decode().map_err(|e| {
                storage::StorageError::InvalidData(format!(
                    "cart {} event {}: {}",
                    self.cart_id, envelope.sequence_nr, e
                ))
            })?;
            state = state.apply(&event);
            sequence_nr = envelope.sequence_nr;
        }

        self.state = state;
        self.sequence_nr = sequence_nr;
        self.stale = false;
        debug!(from_snapshot, replayed, sequence_nr, "recovered");
        Ok(())
    }

    async fn handle(&mut self, command: CartCommand) -> DispatchResult {
        if self.stale {
            self.recover().await.map_err(DispatchError::Recovery)?;
        }

        let events = match self.state.handle(&self.cart_id, &command, Utc::now()) {
            Ok(events) => events,
            Err(rejection) => {
                debug!(command = command.name(), %rejection, "command rejected");
                return Ok(Reply::Rejected {
                    reason: rejection.to_string(),
                });
            }
        };

        if events.is_empty() {
            return Ok(Reply::Accepted {
                summary: self.state.summary(),
            });
        }

        let persisted = match self
            .ctx
            .events
            .append(&self.cart_id, &self.tag, self.sequence_nr + 1, &events)
            .await
        {
            Ok(persisted) => persisted,
            Err(e) => {
                error!(command = command.name(), error = %e, "failed to persist events");
                self.stale = true;
                return Err(DispatchError::Persistence(e));
            }
        };

        let before = self.sequence_nr;
        self.state = std::mem::take(&mut self.state).replay(&events);
        self.sequence_nr = persisted
            .last()
            .map(|e| e.sequence_nr)
            .unwrap_or(before + events.len() as u64);

        if self.ctx.policy.crosses(before, self.sequence_nr) {
            self.snapshot().await;
        }

        Ok(Reply::Accepted {
            summary: self.state.summary(),
        })
    }

    async fn snapshot(&self) {
        let snapshot = Snapshot {
            cart_id: self.cart_id.clone(),
            sequence_nr: self.sequence_nr,
            state: self.state.clone(),
            created_at: Utc::now(),
        };
        match self.ctx.snapshots.save(&snapshot, self.ctx.policy.keep).await {
            Ok(()) => debug!(sequence_nr = self.sequence_nr, "snapshot saved"),
            Err(e) => warn!(sequence_nr = self.sequence_nr, error = %e, "failed to save snapshot"),
        }
    }

    async fn process(&mut self, message: ActorMessage) {
        let result = self.handle(message.command).await;
        // Caller may have timed out and dropped the receiver.
        let _ = message.reply.send(result);
    }
}

/// Start an actor for `cart_id` and return its handle.
///
/// The actor holds `lease` for its whole life, so a replacement spawned
/// while it drains waits before recovering. `on_stop` runs once the actor
/// has exited and released the lease.
pub(crate) fn spawn_cart_actor<F>(
    cart_id: CartId,
    tag: Tag,
    ctx: ActorContext,
    lease: Arc<Mutex<()>>,
    on_stop: F,
) -> CartHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let (sender, rx) = mpsc::channel(ctx.mailbox_capacity);
    let span = tracing::info_span!("cart", cart_id = %cart_id, tag = %tag);
    let actor = CartActor::new(cart_id.clone(), tag, ctx);
    tokio::spawn(
        async move {
            run_actor(actor, rx, lease).await;
            on_stop.await;
        }
        .instrument(span),
    );
    CartHandle { cart_id, sender }
}

async fn run_actor(
    mut actor: CartActor,
    mut rx: mpsc::Receiver<ActorMessage>,
    lease: Arc<Mutex<()>>,
) {
    let _lease = lease.lock_owned().await;

    if let Err(e) = actor.recover().await {
        // Stays stale; the next command retries recovery.
        error!(error = %e, "failed to recover cart");
    }

    let idle = actor.ctx.passivation_timeout;
    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(message)) => actor.process(message).await,
            Ok(None) => break,
            Err(_) => {
                info!(idle_secs = idle.as_secs(), "passivating idle cart");
                rx.close();
                while let Some(message) = rx.recv().await {
                    actor.process(message).await;
                }
                break;
            }
        }
    }

    debug!("cart actor stopped");
}
