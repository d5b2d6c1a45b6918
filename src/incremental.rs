//! Incremental Scheduler (`spec.md` §4.6).
//!
//! Owns the tree of pending deferred/streamed records and the emission
//! queue that turns their completions into `hasNext`-terminated payloads.
//! Every mutation goes through the operations below — the Value Completer
//! never pokes a record's fields directly (`spec.md` §9).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use fnv::FnvHashMap;
use futures::channel::mpsc;
use futures::stream::Stream;

use crate::path::{GraphQlError, Path};
use crate::value::Value;

pub type RecordId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    DeferFragment,
    StreamItem,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RecordState {
    Pending,
    Completed,
    Failed,
}

struct Record {
    parent: Option<RecordId>,
    path: Arc<Path>,
    label: Option<String>,
    kind: RecordKind,
    state: RecordState,
    data: Option<Value>,
    errors: Vec<GraphQlError>,
    emitted: bool,
}

/// One entry of the initial payload's `pending` list (`spec.md` §4.6).
pub struct PendingDescriptor {
    pub id: RecordId,
    pub path: Arc<Path>,
    pub label: Option<String>,
}

/// One entry of a subsequent payload's `incremental` list.
pub enum IncrementalEntry {
    Fragment { id: RecordId, path: Arc<Path>, label: Option<String>, data: Value, errors: Vec<GraphQlError> },
    StreamItems { id: RecordId, path: Arc<Path>, items: Vec<Value>, errors: Vec<GraphQlError> },
}

pub struct CompletedEntry {
    pub id: RecordId,
    pub path: Arc<Path>,
    pub label: Option<String>,
    pub errors: Vec<GraphQlError>,
}

/// A subsequent payload (`spec.md` §6 "Incremental output").
#[derive(Default)]
pub struct SubsequentPayload {
    pub incremental: Vec<IncrementalEntry>,
    pub completed: Vec<CompletedEntry>,
    pub has_next: bool,
}

struct SchedulerState {
    next_id: RecordId,
    records: FnvHashMap<RecordId, Record>,
    ready: VecDeque<RecordId>,
    outstanding: usize,
    root_emitted: bool,
    terminated: bool,
}

/// Coordinates pending deferred/streamed work for one operation.
///
/// Cloneable: every in-flight resolver continuation holds a handle and calls
/// back into it from wherever it happens to complete, matching the "single
/// output stream the executor pushes payloads into" framing in `spec.md`
/// §4.6. Multi-threaded hosts must still serialize access to this the way
/// `spec.md` §5 requires; the internal `Mutex` does that.
#[derive(Clone)]
pub struct IncrementalScheduler {
    state: Arc<Mutex<SchedulerState>>,
    sender: mpsc::UnboundedSender<SubsequentPayload>,
}

pub struct IncrementalReceiver {
    pub receiver: mpsc::UnboundedReceiver<SubsequentPayload>,
}

impl IncrementalScheduler {
    pub fn new() -> (Self, IncrementalReceiver) {
        let (sender, receiver) = mpsc::unbounded();
        (
            Self {
                state: Arc::new(Mutex::new(SchedulerState {
                    next_id: 0,
                    records: FnvHashMap::default(),
                    ready: VecDeque::new(),
                    outstanding: 0,
                    // Flipped on by `mark_root_ready` once the caller has
                    // captured the initial payload's `pending` list — root
                    // children must not drain into the subsequent-payload
                    // stream before that snapshot is taken.
                    root_emitted: false,
                    terminated: false,
                })),
                sender,
            },
            IncrementalReceiver { receiver },
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SchedulerState> {
        self.state.lock().expect("incremental scheduler mutex poisoned")
    }

    /// Registers a new pending record as a child of `parent` (`None` means a
    /// child of the root). Returns its id.
    pub fn register(&self, parent: Option<RecordId>, path: Arc<Path>, label: Option<String>, kind: RecordKind) -> RecordId {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.outstanding += 1;
        state.records.insert(
            id,
            Record { parent, path, label, kind, state: RecordState::Pending, data: None, errors: Vec::new(), emitted: false },
        );
        id
    }

    /// Describes every record registered so far, for the initial payload's
    /// `pending` list.
    pub fn pending_descriptors(&self) -> Vec<PendingDescriptor> {
        let state = self.lock();
        state
            .records
            .iter()
            .filter(|(_, r)| !r.emitted)
            .map(|(id, r)| PendingDescriptor { id: *id, path: r.path.clone(), label: r.label.clone() })
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.lock().outstanding > 0
    }

    /// Whether any `@defer`/`@stream` record was ever registered against
    /// this operation, regardless of whether it has since been emitted — the
    /// signal the Public Execute API uses to decide between its
    /// non-incremental and incremental response shapes (`spec.md` §4.8).
    pub fn had_incremental_work(&self) -> bool {
        !self.lock().records.is_empty()
    }

    /// Lets root-level records (`parent == None`) start draining into the
    /// subsequent-payload stream. Callers must invoke this only after the
    /// initial payload's `data`/`pending` have already been captured, so the
    /// `pending` snapshot reflects every record that was still unemitted at
    /// that point (`spec.md` §4.6).
    pub fn mark_root_ready(&self) {
        let mut emit_now = Vec::new();
        {
            let mut state = self.lock();
            state.root_emitted = true;
            Self::drain_ready(&mut state, &mut emit_now);
        }
        self.flush(emit_now);
    }

    fn parent_ready(state: &SchedulerState, record: &Record) -> bool {
        match record.parent {
            None => state.root_emitted,
            Some(parent_id) => state.records.get(&parent_id).is_some_and(|p| p.emitted),
        }
    }

    /// Marks `id` completed with `data`; enqueues it for emission if its
    /// parent has already emitted, otherwise it waits (`spec.md` §4.6).
    pub fn complete(&self, id: RecordId, data: Value, errors: Vec<GraphQlError>) {
        crate::__exec_trace!("incremental record completed", id);
        let mut emit_now = Vec::new();
        {
            let mut state = self.lock();
            if let Some(record) = state.records.get_mut(&id) {
                record.state = RecordState::Completed;
                record.data = Some(data);
                record.errors = errors;
            }
            Self::drain_ready(&mut state, &mut emit_now);
        }
        self.flush(emit_now);
    }

    /// Marks `id` failed; its subtree's data becomes `null` for this payload
    /// and it is reported as completed with errors rather than as a
    /// fragment/stream-items entry (`spec.md` §4.6 `fail`).
    pub fn fail(&self, id: RecordId, errors: Vec<GraphQlError>) {
        crate::__exec_trace!("incremental record failed", id);
        let mut emit_now = Vec::new();
        {
            let mut state = self.lock();
            if let Some(record) = state.records.get_mut(&id) {
                record.state = RecordState::Failed;
                record.data = Some(Value::Null);
                record.errors = errors;
            }
            Self::drain_ready(&mut state, &mut emit_now);
        }
        self.flush(emit_now);
    }

    /// Drains every record that has become ready, looping to a fixed point
    /// so that a child whose parent becomes `emitted` in this same call
    /// (e.g. a nested `@defer` one level below a root-level one) is caught
    /// without waiting for a separate triggering `complete`/`fail` call.
    fn drain_ready(state: &mut SchedulerState, emit_now: &mut Vec<SubsequentPayload>) {
        loop {
            let mut batch = SubsequentPayload::default();
            let ready_ids: Vec<RecordId> = state
                .records
                .iter()
                .filter(|(_, r)| !r.emitted && r.state != RecordState::Pending && Self::parent_ready(state, r))
                .map(|(id, _)| *id)
                .collect();
            if ready_ids.is_empty() {
                break;
            }

            for id in ready_ids {
                let record = state.records.get_mut(&id).expect("record disappeared");
                record.emitted = true;
                state.outstanding = state.outstanding.saturating_sub(1);
                match record.kind {
                    RecordKind::DeferFragment => {
                        if record.state == RecordState::Failed {
                            batch.completed.push(CompletedEntry {
                                id,
                                path: record.path.clone(),
                                label: record.label.clone(),
                                errors: record.errors.clone(),
                            });
                        } else {
                            batch.incremental.push(IncrementalEntry::Fragment {
                                id,
                                path: record.path.clone(),
                                label: record.label.clone(),
                                data: record.data.clone().unwrap_or(Value::Null),
                                errors: record.errors.clone(),
                            });
                        }
                    }
                    RecordKind::StreamItem => {
                        let items = match record.data.clone() {
                            Some(Value::List(items)) => items,
                            Some(other) => vec![other],
                            None => Vec::new(),
                        };
                        batch.incremental.push(IncrementalEntry::StreamItems {
                            id,
                            path: record.path.clone(),
                            items,
                            errors: record.errors.clone(),
                        });
                    }
                }
            }

            if !batch.incremental.is_empty() || !batch.completed.is_empty() {
                batch.has_next = state.outstanding > 0;
                if !batch.has_next {
                    state.terminated = true;
                }
                emit_now.push(batch);
            }
        }
    }

    fn flush(&self, payloads: Vec<SubsequentPayload>) {
        for payload in payloads {
            let _ = self.sender.unbounded_send(payload);
        }
    }

    /// Terminates the stream with a single `hasNext: false` payload if
    /// nothing is outstanding and a terminator hasn't already gone out as
    /// part of the last real batch (`spec.md` §4.6 / §8 "Incremental
    /// termination": exactly one `hasNext: false`, ever).
    pub fn finish_if_idle(&self) {
        let mut state = self.lock();
        if !state.terminated && state.outstanding == 0 {
            state.terminated = true;
            drop(state);
            let _ = self.sender.unbounded_send(SubsequentPayload { has_next: false, ..Default::default() });
        }
    }

    /// Cancellation: drop all pending records without emitting further
    /// payloads beyond what was already enqueued (`spec.md` §4.6 "On
    /// abort").
    pub fn abort(&self) {
        let mut state = self.lock();
        state.outstanding = 0;
        state.records.clear();
        state.terminated = true;
    }
}

impl Stream for IncrementalReceiver {
    type Item = SubsequentPayload;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        std::pin::Pin::new(&mut self.receiver).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_emits_before_child() {
        let (scheduler, _rx) = IncrementalScheduler::new();
        let root_path = Path::root();
        let parent_id = scheduler.register(None, root_path.clone(), None, RecordKind::DeferFragment);
        let child_path = root_path.push_field("inner");
        let child_id = scheduler.register(Some(parent_id), child_path, None, RecordKind::DeferFragment);

        // Simulates the initial payload already having been built and its
        // `pending` list captured; root-level records may now drain.
        scheduler.mark_root_ready();

        scheduler.complete(child_id, Value::string("too early"), Vec::new());
        assert!(scheduler.has_pending());

        scheduler.complete(parent_id, Value::string("parent"), Vec::new());
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn pending_excludes_records_drained_by_mark_root_ready() {
        let (scheduler, _rx) = IncrementalScheduler::new();
        let id = scheduler.register(None, Path::root(), None, RecordKind::DeferFragment);
        scheduler.complete(id, Value::string("done"), Vec::new());

        // Still unemitted: root hasn't been marked ready yet, so the
        // initial payload's `pending` snapshot must still include it.
        assert_eq!(scheduler.pending_descriptors().len(), 1);

        scheduler.mark_root_ready();
        assert!(scheduler.pending_descriptors().is_empty());
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn fail_reports_as_completed_not_as_a_null_fragment() {
        let (scheduler, mut rx) = IncrementalScheduler::new();
        let id = scheduler.register(None, Path::root(), None, RecordKind::DeferFragment);
        scheduler.mark_root_ready();
        scheduler.fail(id, vec![GraphQlError::new("boom")]);

        let payload = rx.receiver.try_next().unwrap().expect("payload sent");
        assert!(payload.incremental.is_empty());
        assert_eq!(payload.completed.len(), 1);
        assert_eq!(payload.completed[0].errors.len(), 1);
    }

    #[test]
    fn terminator_is_emitted_exactly_once() {
        let (scheduler, mut rx) = IncrementalScheduler::new();
        let id = scheduler.register(None, Path::root(), None, RecordKind::DeferFragment);
        scheduler.complete(id, Value::string("done"), Vec::new());
        scheduler.mark_root_ready();
        scheduler.finish_if_idle();
        scheduler.finish_if_idle();

        let first = rx.receiver.try_next().unwrap().expect("one real payload");
        assert!(!first.has_next);
        assert!(rx.receiver.try_next().unwrap().is_none(), "no second terminator should be queued");
    }
}
