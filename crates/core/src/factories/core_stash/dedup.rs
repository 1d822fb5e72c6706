use modproxy_api::*;
use std::collections::{hash_map::Entry, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

type Outcome = ProxyResult<String>;

/// Callers waiting on the in-flight stash of each key.
type InFlight = Arc<Mutex<HashMap<ModuleKey, Vec<oneshot::Sender<Outcome>>>>>;

/// Collapses concurrent stashes of the same module version into one call
/// of the wrapped stasher.
///
/// The first caller for a key registers it and spawns the wrapped stash
/// as its own task; later callers for that key only subscribe. When the
/// stash finishes, its outcome is sent to every subscriber and the key is
/// forgotten. A caller that stops waiting (drops its future) only drops
/// its own subscription: the stash keeps running for everyone else.
///
/// The registry lock is only held for map bookkeeping.
#[derive(Debug)]
pub struct DedupStasher {
    inner: DynStasher,
    in_flight: InFlight,
}

impl DedupStasher {
    /// Wrap `inner` with deduplication.
    pub fn new(inner: DynStasher) -> Self {
        Self {
            inner,
            in_flight: Default::default(),
        }
    }

    /// Subscribe to the outcome for `key`, returning true if this is the
    /// first subscriber and the caller must start the stash.
    fn subscribe(
        &self,
        key: &ModuleKey,
        slot: oneshot::Sender<Outcome>,
    ) -> bool {
        match self.in_flight.lock().unwrap().entry(key.clone()) {
            Entry::Occupied(mut o) => {
                o.get_mut().push(slot);
                false
            }
            Entry::Vacant(v) => {
                v.insert(vec![slot]);
                true
            }
        }
    }
}

impl Stasher for DedupStasher {
    fn stash(
        &self,
        module: &str,
        version: &str,
    ) -> BoxFut<'_, ProxyResult<String>> {
        let key = ModuleKey::new(module, version);
        Box::pin(async move {
            let (slot_tx, slot_rx) = oneshot::channel();

            if self.subscribe(&key, slot_tx) {
                tracing::trace!(%key, "starting stash");
                let inner = self.inner.clone();
                let mut guard = Delivery {
                    key,
                    in_flight: self.in_flight.clone(),
                    outcome: None,
                };
                tokio::task::spawn(async move {
                    let outcome = inner
                        .stash(&guard.key.module, &guard.key.version)
                        .await;
                    guard.set(outcome);
                });
            } else {
                tracing::trace!(%key, "joining in-flight stash");
            }

            slot_rx.await.map_err(|_| {
                ProxyError::other("stash ended without delivering an outcome")
            })?
        })
    }
}

/// Hands the outcome of a stash to its subscribers and forgets the key
/// when dropped, even if the stash task panicked or was aborted.
struct Delivery {
    key: ModuleKey,
    in_flight: InFlight,
    outcome: Option<Outcome>,
}

impl Delivery {
    fn set(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            Err(ProxyError::other(format!(
                "stash {} was interrupted",
                self.key
            )))
        });

        let subscribers = match self.in_flight.lock() {
            Ok(mut lock) => lock.remove(&self.key).unwrap_or_default(),
            Err(poisoned) => {
                poisoned.into_inner().remove(&self.key).unwrap_or_default()
            }
        };

        tracing::trace!(
            key = %self.key,
            subscribers = subscribers.len(),
            ok = outcome.is_ok(),
            "delivering stash outcome"
        );

        for slot in subscribers {
            // subscribers that stopped waiting have dropped their receiver
            let _ = slot.send(outcome.clone());
        }
    }
}
