//! Request coalescing for concurrent fetches of the same resource
//!
//! Concurrent calls for one key share a single physical fetch. The fetch
//! runs in its own spawned task, so it keeps going even if the caller that
//! started it is abandoned; every waiter that subscribed while the fetch was
//! in flight receives the same result.

use crate::error::{Result, ServeError};
use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

type FetchResult = Result<Bytes>;
type GroupTable = Arc<Mutex<HashMap<String, broadcast::Sender<FetchResult>>>>;

/// Collapses concurrent fetches for one key into a single detached read
pub struct FetchCoalescer {
    groups: GroupTable,
}

impl Default for FetchCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchCoalescer {
    pub fn new() -> Self {
        FetchCoalescer {
            groups: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch the payload for `key`, invoking `producer` at most once across
    /// all concurrent callers of the same key
    ///
    /// The producer runs to completion in a detached task: dropping this
    /// call's future stops the caller from observing the result but never
    /// cancels the underlying fetch, so later waiters and the cache still
    /// benefit from it. Calls for different keys never wait on each other.
    pub async fn fetch<F, Fut>(&self, key: &str, producer: F) -> FetchResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        let mut rx = {
            let mut groups = self.groups.lock().unwrap();
            match groups.get(key) {
                Some(tx) => {
                    debug!(key, "joining in-flight fetch");
                    tx.subscribe()
                }
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    groups.insert(key.to_string(), tx.clone());

                    let fut = producer();
                    let groups = Arc::clone(&self.groups);
                    let key = key.to_string();
                    tokio::spawn(async move {
                        let result = fut.await;
                        // Remove the group before broadcasting so every
                        // subscriber exists before the send and none can
                        // subscribe after it.
                        groups.lock().unwrap().remove(&key);
                        match tx.send(result) {
                            Ok(waiters) => debug!(key = %key, waiters, "fetch result delivered"),
                            Err(_) => debug!(key = %key, "fetch finished with no remaining waiters"),
                        }
                    });
                    rx
                }
            }
        };

        match rx.recv().await {
            Ok(result) => result,
            Err(e) => Err(ServeError::Internal(format!(
                "in-flight fetch dropped its result: {}",
                e
            ))),
        }
    }

    /// Number of fetches currently in flight
    pub fn in_flight(&self) -> usize {
        self.groups.lock().unwrap().len()
    }
}
