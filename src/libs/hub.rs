use super::message::{ChatMessage, ConnectionId, Frame};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{
    mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    oneshot,
};

/// Write side of one connection, drained by its socket task.
pub type Outbox = UnboundedSender<Frame>;

#[derive(Debug)]
pub enum HubEvent {
    Connected {
        outbox: Outbox,
        reply: oneshot::Sender<ConnectionId>,
    },
    MessageReceived {
        from: ConnectionId,
        payload: Value,
    },
    Disconnected {
        id: ConnectionId,
    },
}

/// The active set. Only the hub task touches it.
#[derive(Debug, Default)]
pub struct Hub {
    connections: HashMap<ConnectionId, Outbox>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn connect(&mut self, outbox: Outbox) -> ConnectionId {
        let mut id = ConnectionId::random();
        while self.connections.contains_key(&id) {
            id = ConnectionId::random();
        }
        let _ = outbox.send(Frame::connect(&id));
        self.connections.insert(id.clone(), outbox);
        tracing::debug!("[hub] {} joined, {} active", id, self.len());
        id
    }

    /// Stamps `payload` with the sender and fans it out to the whole active
    /// set, sender included. Returns how many outboxes accepted it.
    pub fn on_message(&self, from: &ConnectionId, payload: Value) -> usize {
        if !self.contains(from) {
            tracing::debug!("dropping message from inactive {}", from);
            return 0;
        }
        let frame = ChatMessage::from((from.clone(), payload)).into_frame();
        let mut delivered = 0;
        for (id, outbox) in self.connections.iter() {
            match outbox.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::debug!("delivery to {} failed", id),
            }
        }
        tracing::debug!("[hub] {} -> {:?} ({} delivered)", from, &frame.data, delivered);
        delivered
    }

    pub fn on_disconnect(&mut self, id: &ConnectionId) -> bool {
        let removed = self.connections.remove(id).is_some();
        if removed {
            tracing::debug!("[hub] {} left, {} active", id, self.len());
        }
        removed
    }

    pub fn dispatch(&mut self, event: HubEvent) {
        match event {
            HubEvent::Connected { outbox, reply } => {
                let id = self.connect(outbox);
                if reply.send(id.clone()).is_err() {
                    // the socket went away before it learned its id
                    self.on_disconnect(&id);
                }
            }
            HubEvent::MessageReceived { from, payload } => {
                self.on_message(&from, payload);
            }
            HubEvent::Disconnected { id } => {
                self.on_disconnect(&id);
            }
        }
    }

    pub async fn run(mut self, mut rx: UnboundedReceiver<HubEvent>) {
        while let Some(event) = rx.recv().await {
            self.dispatch(event);
        }
        tracing::debug!("hub stopped");
    }
}

#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: UnboundedSender<HubEvent>,
}

impl HubHandle {
    pub fn spawn() -> Self {
        let (tx, rx) = unbounded_channel();
        tokio::spawn(Hub::new().run(rx));
        HubHandle { tx }
    }

    pub async fn connect(&self, outbox: Outbox) -> Result<ConnectionId> {
        let (reply, id) = oneshot::channel();
        self.tx
            .send(HubEvent::Connected { outbox, reply })
            .context("hub is gone")?;
        id.await.context("hub dropped the connect request")
    }

    pub fn message(&self, from: ConnectionId, payload: Value) -> Result<()> {
        self.tx
            .send(HubEvent::MessageReceived { from, payload })
            .context("hub is gone")
    }

    pub fn disconnect(&self, id: ConnectionId) {
        let _ = self.tx.send(HubEvent::Disconnected { id });
    }
}
