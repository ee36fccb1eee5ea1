//! Routes commands to cart actors, spawning them on demand.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use super::actor::{spawn_cart_actor, ActorContext, CartHandle, DispatchResult};
use super::{DispatchError, EntitySettings};
use crate::cart::{CartCommand, CartId};
use crate::storage::{EventStore, SnapshotStore};
use crate::tagging::ShardTagger;

struct Entry {
    handle: CartHandle,
    lease: Arc<Mutex<()>>,
}

type Entries = RwLock<HashMap<CartId, Entry>>;

/// Entry point for sending commands to carts.
///
/// Keeps at most one live actor per cart. A passivated actor's handle is
/// replaced on the next dispatch; the per-cart lease carries over so the
/// new actor starts only after the old one has finished draining. An
/// actor that stops with no replacement removes its own entry.
pub struct CartRegistry {
    entries: Arc<Entries>,
    ctx: ActorContext,
    tagger: ShardTagger,
    settings: EntitySettings,
}

impl CartRegistry {
    pub fn new(
        events: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
        tagger: ShardTagger,
        settings: EntitySettings,
    ) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ctx: ActorContext {
                events,
                snapshots,
                policy: settings.snapshot,
                passivation_timeout: settings.passivation_timeout,
                mailbox_capacity: settings.mailbox_capacity,
            },
            tagger,
            settings,
        }
    }

    pub fn tagger(&self) -> &ShardTagger {
        &self.tagger
    }

    pub fn settings(&self) -> &EntitySettings {
        &self.settings
    }

    /// Send `command` to its cart and wait up to the ask timeout for the
    /// reply.
    ///
    /// On `DispatchError::Timeout` the outcome is unknown: the command may
    /// still be applied after the caller has given up.
    #[instrument(skip_all, fields(cart_id = %cart_id, command = command.name()))]
    pub async fn dispatch(&self, cart_id: &CartId, command: CartCommand) -> DispatchResult {
        let after = self.settings.ask_timeout;
        match tokio::time::timeout(after, self.deliver(cart_id, command)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?after, "dispatch timed out");
                Err(DispatchError::Timeout {
                    cart_id: cart_id.clone(),
                    after,
                })
            }
        }
    }

    async fn deliver(&self, cart_id: &CartId, command: CartCommand) -> DispatchResult {
        let handle = self.handle_for(cart_id).await;
        let rx = match handle.send(command).await {
            Ok(rx) => rx,
            Err(command) => {
                // Lost the race with passivation; one retry on a fresh actor.
                debug!("mailbox closed, respawning cart actor");
                let handle = self.handle_for(cart_id).await;
                handle
                    .send(command)
                    .await
                    .map_err(|_| DispatchError::EntityStopped {
                        cart_id: cart_id.clone(),
                    })?
            }
        };

        rx.await.map_err(|_| DispatchError::EntityStopped {
            cart_id: cart_id.clone(),
        })?
    }

    /// Live handle for `cart_id`, spawning an actor if needed.
    pub async fn handle_for(&self, cart_id: &CartId) -> CartHandle {
        if let Some(entry) = self.entries.read().await.get(cart_id) {
            if entry.handle.is_alive() {
                return entry.handle.clone();
            }
        }

        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(cart_id) {
            if entry.handle.is_alive() {
                return entry.handle.clone();
            }
        }

        let lease = entries
            .get(cart_id)
            .map(|entry| entry.lease.clone())
            .unwrap_or_default();
        let handle = spawn_cart_actor(
            cart_id.clone(),
            self.tagger.tag_for(cart_id),
            self.ctx.clone(),
            lease.clone(),
            forget_stopped(Arc::downgrade(&self.entries), cart_id.clone()),
        );
        entries.insert(
            cart_id.clone(),
            Entry {
                handle: handle.clone(),
                lease,
            },
        );
        handle
    }

    /// Number of carts with a live actor.
    pub async fn active_count(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.handle.is_alive())
            .count()
    }

    /// Number of carts the registry holds an entry for, live or draining.
    pub async fn tracked_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Drop `cart_id`'s entry once its actor has exited.
///
/// Kept if a replacement actor was spawned in the meantime: its handle is
/// alive, or its task still holds a clone of the lease.
async fn forget_stopped(entries: Weak<Entries>, cart_id: CartId) {
    let Some(entries) = entries.upgrade() else {
        return;
    };
    let mut entries = entries.write().await;
    let stopped = entries
        .get(&cart_id)
        .is_some_and(|entry| !entry.handle.is_alive() && Arc::strong_count(&entry.lease) == 1);
    if stopped {
        entries.remove(&cart_id);
        debug!(cart_id = %cart_id, "forgot stopped cart");
    }
}
