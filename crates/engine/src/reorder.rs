//! Client side of drag-and-drop reordering.
//!
//! A gesture is applied to the displayed order immediately, then sent as one
//! `persist_order` call. On success the candidate becomes the known-good
//! order. On any failure the candidate is thrown away and the full order is
//! refetched; the write is all-or-nothing on the server, so ground truth is
//! always whatever a fresh read returns.

use std::fmt;

use tracing::{debug, info, warn};

use sitecms_core::{CollectionKind, CollectionRef, EntityId, ItemKey};

/// Something with an order that can be fetched and rewritten as a whole.
pub trait OrderTarget: Clone + fmt::Debug {
    type Key: Clone + PartialEq + fmt::Debug;
}

impl OrderTarget for CollectionRef {
    type Key = ItemKey;
}

/// The sections of one page, identified by slug and ordered by section key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSections(pub String);

impl OrderTarget for PageSections {
    type Key = String;
}

pub trait OrderBackend<T: OrderTarget> {
    type Error: fmt::Display;

    fn fetch_order(&mut self, target: &T) -> Result<Vec<T::Key>, Self::Error>;

    fn persist_order(&mut self, target: &T, order: &[T::Key]) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderPhase {
    /// Displayed order is the last known-good order.
    Idle,
    /// A candidate is displayed but not yet sent.
    LocallyReordered,
    /// At least one candidate is in flight.
    Persisting,
    /// Local state is being replaced from the backend.
    Reconciling,
}

/// A candidate order handed out by [`ReorderSession::begin`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReorder<K> {
    seq: u64,
    order: Vec<K>,
}

impl<K> PendingReorder<K> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn order(&self) -> &[K] {
        &self.order
    }
}

#[derive(Debug)]
pub enum Gesture<K> {
    /// Dropped onto itself.
    NoOp,
    /// The dragged item or the target is not displayed. Reconcile.
    Stale,
    Pending(PendingReorder<K>),
}

#[derive(Debug)]
pub enum DragOutcome<E> {
    NoOp,
    Committed,
    /// The gesture referenced an item we no longer display; local state was refetched.
    Stale,
    /// No valid drop target, e.g. across collections. Nothing was sent.
    Rejected,
    /// The write failed and local state was refetched. Carries the write error.
    Reconciled(E),
}

impl<E> DragOutcome<E> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Move the element at `from` so that it ends up at index `to`.
pub fn move_item<K: Clone>(items: &[K], from: usize, to: usize) -> Vec<K> {
    let mut moved = items.to_vec();
    if from < moved.len() && to < moved.len() {
        let item = moved.remove(from);
        moved.insert(to, item);
    }
    moved
}

pub struct ReorderSession<T: OrderTarget> {
    target: T,
    displayed: Vec<T::Key>,
    committed: Vec<T::Key>,
    phase: ReorderPhase,
    next_seq: u64,
    in_flight: usize,
}

impl<T: OrderTarget> ReorderSession<T> {
    pub fn from_order(target: T, order: Vec<T::Key>) -> Self {
        Self {
            target,
            displayed: order.clone(),
            committed: order,
            phase: ReorderPhase::Idle,
            next_seq: 0,
            in_flight: 0,
        }
    }

    pub fn load<B: OrderBackend<T>>(backend: &mut B, target: T) -> Result<Self, B::Error> {
        let order = backend.fetch_order(&target)?;
        Ok(Self::from_order(target, order))
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// What the editor currently shows.
    pub fn displayed(&self) -> &[T::Key] {
        &self.displayed
    }

    /// The last order confirmed by the backend.
    pub fn committed(&self) -> &[T::Key] {
        &self.committed
    }

    pub fn phase(&self) -> ReorderPhase {
        self.phase
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply a drop locally and hand back the order to persist.
    pub fn begin(&mut self, active: &T::Key, over: &T::Key) -> Gesture<T::Key> {
        if active == over {
            return Gesture::NoOp;
        }
        let from = self.displayed.iter().position(|k| k == active);
        let to = self.displayed.iter().position(|k| k == over);
        let (Some(from), Some(to)) = (from, to) else {
            debug!(list = ?self.target, ?active, ?over, "drop references an item not on display");
            self.phase = ReorderPhase::Reconciling;
            return Gesture::Stale;
        };

        self.displayed = move_item(&self.displayed, from, to);
        self.phase = ReorderPhase::LocallyReordered;
        self.in_flight += 1;
        self.next_seq += 1;
        Gesture::Pending(PendingReorder {
            seq: self.next_seq,
            order: self.displayed.clone(),
        })
    }

    /// Send a pending order. Exactly one backend write per gesture.
    pub fn send<B: OrderBackend<T>>(
        &mut self,
        backend: &mut B,
        pending: &PendingReorder<T::Key>,
    ) -> Result<(), B::Error> {
        self.phase = ReorderPhase::Persisting;
        backend.persist_order(&self.target, &pending.order)
    }

    /// Fold the result of a send back into local state.
    ///
    /// Success promotes the candidate to known-good. Failure discards it and
    /// refetches; the write error is returned inside `Reconciled`. If the
    /// refetch fails too, the display falls back to the last known-good order
    /// and the refetch error is returned.
    ///
    /// Once nothing is in flight the display equals the known-good order, even
    /// when gestures settled out of order.
    pub fn settle<B: OrderBackend<T>>(
        &mut self,
        backend: &mut B,
        pending: PendingReorder<T::Key>,
        result: Result<(), B::Error>,
    ) -> Result<DragOutcome<B::Error>, B::Error> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(()) => {
                info!(list = ?self.target, seq = pending.seq, count = pending.order.len(), "reorder committed");
                self.committed = pending.order;
                if self.in_flight == 0 && self.displayed != self.committed {
                    debug!(list = ?self.target, seq = pending.seq, "older gesture landed last, showing its order");
                    self.displayed = self.committed.clone();
                }
                self.phase = self.resting_phase();
                Ok(DragOutcome::Committed)
            }
            Err(error) => {
                warn!(list = ?self.target, seq = pending.seq, %error, "reorder failed, refetching");
                self.reconcile(backend)?;
                Ok(DragOutcome::Reconciled(error))
            }
        }
    }

    /// Replace local state with the backend's order.
    pub fn reconcile<B: OrderBackend<T>>(&mut self, backend: &mut B) -> Result<(), B::Error> {
        self.phase = ReorderPhase::Reconciling;
        match backend.fetch_order(&self.target) {
            Ok(fresh) => {
                self.displayed = fresh.clone();
                self.committed = fresh;
                self.phase = self.resting_phase();
                Ok(())
            }
            Err(error) => {
                warn!(list = ?self.target, %error, "refetch failed, showing last committed order");
                self.displayed = self.committed.clone();
                Err(error)
            }
        }
    }

    /// Run a whole gesture: apply, persist, settle.
    pub fn drag<B: OrderBackend<T>>(
        &mut self,
        backend: &mut B,
        active: &T::Key,
        over: &T::Key,
    ) -> Result<DragOutcome<B::Error>, B::Error> {
        match self.begin(active, over) {
            Gesture::NoOp => Ok(DragOutcome::NoOp),
            Gesture::Stale => {
                self.reconcile(backend)?;
                Ok(DragOutcome::Stale)
            }
            Gesture::Pending(pending) => {
                let result = self.send(backend, &pending);
                self.settle(backend, pending, result)
            }
        }
    }

    fn resting_phase(&self) -> ReorderPhase {
        if self.in_flight > 0 {
            ReorderPhase::Persisting
        } else {
            ReorderPhase::Idle
        }
    }
}

/// One drag-and-drop area showing several collections side by side, such as
/// a case's images and videos. Drops are routed by item-key prefix.
#[derive(Default)]
pub struct DragSurface {
    sessions: Vec<ReorderSession<CollectionRef>>,
}

impl DragSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&mut self, session: ReorderSession<CollectionRef>) {
        self.sessions.push(session);
    }

    /// Images and videos of one case.
    pub fn load_case_media<B: OrderBackend<CollectionRef>>(
        backend: &mut B,
        case_id: EntityId,
    ) -> Result<Self, B::Error> {
        let mut surface = Self::new();
        surface.add_session(ReorderSession::load(backend, CollectionRef::images(case_id))?);
        surface.add_session(ReorderSession::load(backend, CollectionRef::videos(case_id))?);
        Ok(surface)
    }

    pub fn session(&self, kind: CollectionKind) -> Option<&ReorderSession<CollectionRef>> {
        self.sessions.iter().find(|s| s.target().kind == kind)
    }

    /// Handle a drop of `active_id` onto `over_id`, both raw item keys.
    pub fn drop_item<B: OrderBackend<CollectionRef>>(
        &mut self,
        backend: &mut B,
        active_id: &str,
        over_id: &str,
    ) -> Result<DragOutcome<B::Error>, B::Error> {
        let (active, over) = match (active_id.parse::<ItemKey>(), over_id.parse::<ItemKey>()) {
            (Ok(active), Ok(over)) => (active, over),
            _ => {
                debug!(active_id, over_id, "drop with unparseable item key");
                return Ok(DragOutcome::Rejected);
            }
        };
        if active.kind() != over.kind() {
            warn!(active_id, over_id, "drop across collections rejected");
            return Ok(DragOutcome::Rejected);
        }

        let kind = active.kind();
        let index = self
            .sessions
            .iter()
            .position(|s| s.target().kind == kind && s.displayed().contains(&active))
            .or_else(|| self.sessions.iter().position(|s| s.target().kind == kind));
        match index {
            Some(i) => self.sessions[i].drag(backend, &active, &over),
            None => Ok(DragOutcome::Rejected),
        }
    }
}
