//! Client side of the privileged-operation channel
//!
//! Long-running requests (compress, extract) are correlated by id. Each one
//! has an entry in the pending table until its terminal `End`/`Error` event
//! arrives or its handle is cancelled.

use crate::{FsError, ItemPath, LocalHost, Result};
use ipc_proto::{EventKind, PrivilegedEvent, PrivilegedRequest};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Receives progress percentages in 0..=100
pub type ProgressCallback = Box<dyn FnMut(u8) + Send>;

/// Caller side of a running operation
#[derive(Debug)]
pub struct OperationHandle {
    id: Uuid,
    destination: ItemPath,
    token: CancellationToken,
    outcome: oneshot::Receiver<Result<()>>,
}

/// Producer side of a running operation
pub struct OperationSink {
    id: Uuid,
    destination: ItemPath,
    token: CancellationToken,
    done: CancellationToken,
    on_progress: Option<ProgressCallback>,
    outcome: Option<oneshot::Sender<Result<()>>>,
}

/// Create a connected handle/sink pair for an operation producing `destination`
pub fn operation(
    destination: ItemPath,
    on_progress: Option<ProgressCallback>,
) -> (OperationHandle, OperationSink) {
    let id = ipc_proto::request_id();
    let token = CancellationToken::new();
    let (tx, rx) = oneshot::channel();

    let handle = OperationHandle {
        id,
        destination: destination.clone(),
        token: token.clone(),
        outcome: rx,
    };

    let sink = OperationSink {
        id,
        destination,
        token,
        done: CancellationToken::new(),
        on_progress,
        outcome: Some(tx),
    };

    (handle, sink)
}

impl OperationHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path the operation will create
    pub fn destination(&self) -> &ItemPath {
        &self.destination
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Detach from the operation. No more progress is delivered and
    /// [`finished`](Self::finished) resolves with [`FsError::Cancelled`].
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the terminal event
    pub async fn finished(self) -> Result<ItemPath> {
        let OperationHandle {
            destination,
            token,
            mut outcome,
            ..
        } = self;

        // Cancellation drops the sink, so check the token before the channel
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(FsError::Cancelled),
            result = &mut outcome => match result {
                Ok(Ok(())) => Ok(destination),
                Ok(Err(e)) => Err(e),
                Err(_) if token.is_cancelled() => Err(FsError::Cancelled),
                Err(_) => Err(FsError::Channel("operation ended without a result".into())),
            },
        }
    }
}

impl OperationSink {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn destination(&self) -> &ItemPath {
        &self.destination
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancelled once the sink is finished or dropped
    fn done_token(&self) -> CancellationToken {
        self.done.clone()
    }

    pub fn progress(&mut self, percent: u8) {
        if self.is_cancelled() {
            return;
        }

        if let Some(on_progress) = self.on_progress.as_mut() {
            on_progress(percent.min(100));
        }
    }

    pub fn finish(mut self, result: Result<()>) {
        if let Some(outcome) = self.outcome.take() {
            let _ = outcome.send(result);
        }
    }
}

impl Drop for OperationSink {
    fn drop(&mut self) {
        self.done.cancel();
    }
}

/// Carries encoded request frames to the privileged host
pub trait PrivilegedTransport: Send + Sync {
    fn send(&self, frame: Vec<u8>) -> Result<()>;
}

type PendingTable = Mutex<HashMap<Uuid, OperationSink>>;

pub struct Bridge {
    transport: Arc<dyn PrivilegedTransport>,
    pending: Arc<PendingTable>,
}

impl Bridge {
    pub fn new(transport: Arc<dyn PrivilegedTransport>) -> Self {
        Self {
            transport,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Bridge backed by an in-process [`LocalHost`]. Must be called inside a
    /// tokio runtime.
    pub fn local() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = Arc::new(Self::new(Arc::new(LocalHost::new(tx))));
        Self::listen(&bridge, rx);
        bridge
    }

    /// Pump event frames from the host into [`dispatch`](Self::dispatch).
    /// The task ends when the bridge is dropped or the channel closes.
    pub fn listen(
        bridge: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> tokio::task::JoinHandle<()> {
        let bridge: Weak<Self> = Arc::downgrade(bridge);

        tokio::spawn(async move {
            while let Some(frame) = events.recv().await {
                let Some(bridge) = bridge.upgrade() else {
                    break;
                };

                match ipc_proto::decode::<PrivilegedEvent>(&frame) {
                    Ok(event) => bridge.dispatch(event),
                    Err(e) => tracing::warn!("Dropping malformed event frame: {}", e),
                }
            }
            tracing::debug!("Privileged event listener stopped");
        })
    }

    /// One-way trash request
    pub fn send_trash(&self, path: &ItemPath) -> Result<()> {
        self.send(&PrivilegedRequest::Trash {
            path: path.with_folder_flag(false).full_path(),
        })
    }

    /// Register a pending operation and send the request built for its id
    pub fn request<F>(
        &self,
        destination: ItemPath,
        on_progress: Option<ProgressCallback>,
        build: F,
    ) -> Result<OperationHandle>
    where
        F: FnOnce(Uuid) -> PrivilegedRequest,
    {
        self.prune();

        let (handle, sink) = operation(destination, on_progress);
        let id = handle.id();
        let done = sink.done_token();
        let token = handle.cancellation_token();

        self.pending.lock().insert(id, sink);

        if let Err(e) = self.send(&build(id)) {
            self.pending.lock().remove(&id);
            return Err(e);
        }

        let pending = Arc::downgrade(&self.pending);
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            tokio::select! {
                _ = done.cancelled() => {}
                _ = token.cancelled() => {
                    if let Some(pending) = pending.upgrade() {
                        pending.lock().remove(&id);
                    }
                    match ipc_proto::encode(&PrivilegedRequest::Cancel { id }) {
                        Ok(frame) => {
                            if let Err(e) = transport.send(frame) {
                                tracing::warn!("Failed to send cancel for {}: {}", id, e);
                            }
                        }
                        Err(e) => tracing::warn!("Failed to encode cancel for {}: {}", id, e),
                    }
                    tracing::debug!("Request {} cancelled", id);
                }
            }
        });

        tracing::debug!("Request {} sent", id);
        Ok(handle)
    }

    /// Deliver an event to its pending operation
    pub fn dispatch(&self, event: PrivilegedEvent) {
        let Some(mut sink) = self.pending.lock().remove(&event.id) else {
            tracing::debug!("Ignoring event for unknown request {}", event.id);
            return;
        };

        match event.kind {
            EventKind::Progress(percent) => {
                sink.progress(percent);
                if !sink.is_cancelled() {
                    self.pending.lock().insert(event.id, sink);
                }
            }
            EventKind::End => {
                tracing::info!("Request {} finished: {}", event.id, sink.destination());
                sink.finish(Ok(()));
            }
            EventKind::Error(message) => {
                tracing::warn!("Request {} failed: {}", event.id, message);
                let err = FsError::from_message(message, Some(sink.destination()));
                sink.finish(Err(err));
            }
        }
    }

    /// Number of requests still waiting for a terminal event
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn prune(&self) {
        self.pending.lock().retain(|_, sink| !sink.is_cancelled());
    }

    fn send(&self, request: &PrivilegedRequest) -> Result<()> {
        let frame = ipc_proto::encode(request).map_err(|e| FsError::Channel(e.to_string()))?;
        self.transport.send(frame)
    }
}
