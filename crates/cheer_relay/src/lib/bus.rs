//! Fan-out of TTS notifications to the overlay clients currently connected.
//!
//! Each client owns an unbounded receiver. A broadcast copies the current
//! set of senders under a read lock and sends outside of it, so clients may
//! connect or disconnect while a broadcast is in flight. There is no backlog:
//! a client only sees notifications broadcast while it is registered.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use futures::Stream;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::types::TtsNotification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct BusInner {
    clients: RwLock<HashMap<ClientId, mpsc::UnboundedSender<TtsNotification>>>,
    next_id: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct LiveBus {
    inner: Arc<BusInner>,
}

impl LiveBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new client. It is unregistered again by
    /// [`unsubscribe`](Self::unsubscribe) or when the handle is dropped.
    pub fn subscribe(&self) -> LiveClient {
        let id = ClientId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, receiver) = mpsc::unbounded_channel();
        self.inner.clients.write().insert(id, tx);

        tracing::info!(client_id = %id, "Live client connected");
        LiveClient {
            id,
            receiver,
            bus: Arc::downgrade(&self.inner),
        }
    }

    pub fn unsubscribe(&self, id: ClientId) -> bool {
        self.inner.clients.write().remove(&id).is_some()
    }

    /// Sends `notification` to every registered client and returns how many
    /// accepted it. Clients whose receiver is gone are pruned, not retried.
    pub fn broadcast(&self, notification: TtsNotification) -> usize {
        let snapshot = self
            .inner
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect::<Vec<_>>();

        let mut delivered = 0;
        let mut gone = Vec::new();
        for (id, tx) in snapshot {
            match tx.send(notification.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => gone.push(id),
            }
        }

        if !gone.is_empty() {
            let mut clients = self.inner.clients.write();
            for id in &gone {
                clients.remove(id);
            }
        }

        tracing::info!(
            delivered,
            pruned = gone.len(),
            audio_url = %notification.audio_url,
            "Notified live clients"
        );
        delivered
    }

    pub fn client_count(&self) -> usize {
        self.inner.clients.read().len()
    }

    /// Drops every registered sender, ending all client streams
    pub fn disconnect_all(&self) {
        let mut clients = self.inner.clients.write();
        tracing::info!(count = clients.len(), "Disconnecting all live clients");
        clients.clear();
    }
}

/// Handle held by one connected overlay client
#[derive(Debug)]
pub struct LiveClient {
    id: ClientId,
    receiver: mpsc::UnboundedReceiver<TtsNotification>,
    bus: Weak<BusInner>,
}

impl LiveClient {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Next notification; `None` once the client has been unregistered
    pub async fn recv(&mut self) -> Option<TtsNotification> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<TtsNotification> {
        self.receiver.try_recv().ok()
    }

    /// Turns the handle into a stream. The client stays registered for as
    /// long as the stream is alive.
    pub fn into_stream(self) -> impl Stream<Item = TtsNotification> + Send + 'static {
        futures::stream::unfold(self, |mut client| async move {
            client.recv().await.map(|notification| (notification, client))
        })
    }
}

impl Drop for LiveClient {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.clients.write().remove(&self.id);
        }
        tracing::info!(client_id = %self.id, "Live client disconnected");
    }
}
