//! Watch-maintained local replica of a subtree
//!
//! # Architecture
//!
//! ```text
//! coordination service
//!        │ subscription (ordered per path)
//!        ▼
//! ┌─────────────────┐
//! │  mirror task    │  one per mirror, one event at a time
//! └──────┬──────────┘
//!        │ 1. apply to DashMap
//!        │ 2. notify listeners (in registration order)
//!        ▼
//! ┌─────────────────┐
//! │ MirrorListener  │  e.g. InputChangeDispatcher
//! └─────────────────┘
//! ```
//!
//! Reads (`current_data`, `current_children`) go to the local map only and
//! never issue network calls. They may lag a write this process just issued
//! until that write's own event has been applied.


use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use crate::layout::parent_path;
use crate::layout::node_name;
use crate::ConnectionSession;
use crate::NodeEvent;
use crate::NodeEventKind;
use crate::Result;

/// Receives mirror events after they have been applied locally.
///
/// Called from the mirror's task, one event at a time, or from the caller of
/// [`SubtreeMirror::add_listener`] during replay. Errors are logged and do
/// not stop delivery of later events.
///
/// Calls run while the mirror's listener lock is held: an implementation
/// must not call [`SubtreeMirror::add_listener`] on the same mirror, or it
/// deadlocks.
pub trait MirrorListener: Send + Sync + 'static {
    fn on_event(
        &self,
        view: &MirrorView,
        event: &NodeEvent,
    ) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedNode {
    data: Bytes,
    version: i32,
}

/// Read handle on a mirror's local map
#[derive(Debug, Clone, Default)]
pub struct MirrorView {
    nodes: Arc<DashMap<String, CachedNode>>,
}

impl MirrorView {
    pub fn current_data(
        &self,
        path: &str,
    ) -> Option<Bytes> {
        self.nodes.get(path).map(|n| n.data.clone())
    }

    pub fn current_version(
        &self,
        path: &str,
    ) -> Option<i32> {
        self.nodes.get(path).map(|n| n.version)
    }

    pub fn contains(
        &self,
        path: &str,
    ) -> bool {
        self.nodes.contains_key(path)
    }

    /// Direct children of `path` keyed by node name
    pub fn current_children(
        &self,
        path: &str,
    ) -> BTreeMap<String, Bytes> {
        self.nodes
            .iter()
            .filter(|entry| parent_path(entry.key()) == Some(path))
            .map(|entry| (node_name(entry.key()).to_string(), entry.value().data.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Applies an event, returning `false` when it is older than what the
    /// map already holds
    pub(crate) fn apply(
        &self,
        event: &NodeEvent,
    ) -> bool {
        match event.kind {
            NodeEventKind::Added | NodeEventKind::Updated => {
                if let Some(current) = self.nodes.get(&event.path) {
                    if current.version > event.version {
                        trace!(
                            path = %event.path,
                            cached = current.version,
                            incoming = event.version,
                            "stale event ignored"
                        );
                        return false;
                    }
                }
                self.nodes.insert(
                    event.path.clone(),
                    CachedNode {
                        data: event.data.clone(),
                        version: event.version,
                    },
                );
                true
            }
            NodeEventKind::Removed => {
                self.nodes.remove(&event.path);
                true
            }
        }
    }

    fn snapshot(&self) -> BTreeMap<String, CachedNode> {
        self.nodes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

type Listeners = Arc<Mutex<Vec<Arc<dyn MirrorListener>>>>;

pub struct SubtreeMirror {
    path: String,
    session: Arc<ConnectionSession>,
    view: MirrorView,
    listeners: Listeners,
    started: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SubtreeMirror {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SubtreeMirror")
            .field("path", &self.path)
            .field("nodes", &self.view.len())
            .field("listeners", &self.listeners.lock().len())
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl SubtreeMirror {
    /// Attaches to `path`; nothing is read until [`SubtreeMirror::start`]
    pub fn open(
        session: Arc<ConnectionSession>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            session,
            view: MirrorView::default(),
            listeners: Arc::new(Mutex::new(Vec::new())),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn view(&self) -> &MirrorView {
        &self.view
    }

    pub fn current_data(
        &self,
        path: &str,
    ) -> Option<Bytes> {
        self.view.current_data(path)
    }

    pub fn current_children(
        &self,
        path: &str,
    ) -> BTreeMap<String, Bytes> {
        self.view.current_children(path)
    }

    /// Subscribes, applies the current subtree contents before returning, then
    /// streams later changes on a background task. Calling it again is a no-op.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut subscription = match self.session.subscribe(&self.path).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let initial = subscription.take_initial();
        info!("Mirror of {} started with {} nodes", self.path, initial.len());
        for event in &initial {
            dispatch(&self.view, &self.listeners, event);
        }

        let view = self.view.clone();
        let listeners = self.listeners.clone();
        let cancel = self.cancel.clone();
        let path = self.path.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Mirror of {} cancelled", path);
                        break;
                    }
                    event = subscription.recv() => match event {
                        Some(event) => dispatch(&view, &listeners, &event),
                        None => {
                            debug!("Subscription for {} ended", path);
                            break;
                        }
                    }
                }
            }
        });
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// Registers a listener. Current contents are replayed to it as `Added`
    /// events, parents first, before any later event reaches it.
    pub fn add_listener(
        &self,
        listener: Arc<dyn MirrorListener>,
    ) {
        let mut listeners = self.listeners.lock();
        for (path, node) in self.view.snapshot() {
            let event = NodeEvent::added(path, node.data, node.version);
            notify(listener.as_ref(), &self.view, &event);
        }
        listeners.push(listener);
    }

    /// Stops event delivery; the local map keeps its last contents
    pub fn close(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for SubtreeMirror {
    fn drop(&mut self) {
        self.close();
    }
}

fn dispatch(
    view: &MirrorView,
    listeners: &Listeners,
    event: &NodeEvent,
) {
    // Apply and notify under one lock so a listener added concurrently sees
    // the event either in its replay or live, never both
    let listeners = listeners.lock();
    if !view.apply(event) {
        return;
    }
    for listener in listeners.iter() {
        notify(listener.as_ref(), view, event);
    }
}

fn notify(
    listener: &dyn MirrorListener,
    view: &MirrorView,
    event: &NodeEvent,
) {
    match std::panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(view, event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Listener failed on {:?} {}: {}", event.kind, event.path, e),
        Err(_) => error!("Listener panicked on {:?} {}", event.kind, event.path),
    }
}
