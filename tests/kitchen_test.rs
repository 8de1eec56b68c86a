//! Integration tests for the kitchen: intake, assignment, worker lifecycle,
//! recovery.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use kiosk_rs::engine::{Kitchen, KitchenConfig, RecoveryReport};
use kiosk_rs::error::{Error, ErrorKind};
use kiosk_rs::model::producer::{Producer, ProducerId};
use kiosk_rs::model::worker::{Worker, WorkerId};
use kiosk_rs::model::{NewOrder, Order, OrderId, OrderStats, State, Tier};
use kiosk_rs::storage::{
    MemoryStore, OrderStore, ProducerDirectory, SqliteStore, WorkerStore,
};

const SERVING: Duration = Duration::from_secs(10);

fn config() -> KitchenConfig {
    KitchenConfig {
        serving_duration: SERVING,
        pool_size: 1,
        poll_interval: Duration::from_millis(100),
    }
}

fn kitchen() -> (Kitchen, Arc<MemoryStore>) {
    Kitchen::in_memory(config())
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_persists_pending_order_with_producer_tier() {
    let (kitchen, store) = kitchen();
    let vip = store.add_producer("ada", Tier::Privileged);

    let order = kitchen.submit_order(vip.id).unwrap();

    assert_eq!(order.tier, Tier::Privileged);
    assert_eq!(order.state, State::Pending);
    assert_eq!(order.worker, None);
    assert_eq!(kitchen.order(order.id).unwrap(), order);
    assert_eq!(kitchen.queue_size(), 1);
    assert_eq!(kitchen.queue().tier_len(Tier::Privileged), 1);
}

#[tokio::test]
async fn submit_from_unknown_producer_is_rejected() {
    let (kitchen, _store) = kitchen();

    let err = kitchen.submit_order(ProducerId::new()).unwrap_err();

    assert!(matches!(err, Error::UnknownProducer(_)));
    assert_eq!(err.kind(), ErrorKind::Client);
    assert_eq!(kitchen.queue_size(), 0);
}

#[tokio::test]
async fn retired_producer_cannot_submit() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    store.retire_producer(regular.id).unwrap();

    let err = kitchen.submit_order(regular.id).unwrap_err();

    assert!(matches!(err, Error::ProducerRetired(id) if id == regular.id));
    assert_eq!(kitchen.stats().unwrap(), OrderStats::default());
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn privileged_order_is_accepted_before_earlier_standard_one() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let vip = store.add_producer("ada", Tier::Privileged);
    let cook = kitchen.register_worker("cook-1").unwrap();

    let first = kitchen.submit_order(regular.id).unwrap();
    let second = kitchen.submit_order(vip.id).unwrap();

    let accepted = kitchen.accept_next(cook.id).unwrap();
    assert_eq!(accepted.id, second.id);
    assert_eq!(accepted.state, State::InProgress);
    assert_eq!(accepted.worker, Some(cook.id));

    let stored = kitchen.order(second.id).unwrap();
    assert_eq!(stored.state, State::InProgress);
    assert_eq!(stored.worker, Some(cook.id));

    assert_eq!(kitchen.accept_next(cook.id).unwrap().id, first.id);
    kitchen.shutdown().await;
}

#[tokio::test]
async fn accept_on_empty_queue_reports_nothing_available() {
    let (kitchen, _store) = kitchen();
    let cook = kitchen.register_worker("cook-1").unwrap();

    let err = kitchen.accept_next(cook.id).unwrap_err();

    assert!(matches!(err, Error::EmptyQueue));
    assert!(err.is_nothing_to_do());
    assert_eq!(err.kind(), ErrorKind::NothingAvailable);
}

#[tokio::test]
async fn accept_by_unknown_worker_leaves_queue_untouched() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    kitchen.submit_order(regular.id).unwrap();

    let err = kitchen.accept_next(WorkerId::new()).unwrap_err();

    assert!(matches!(err, Error::UnknownWorker(_)));
    assert_eq!(kitchen.queue_size(), 1);
}

#[tokio::test(start_paused = true)]
async fn served_order_is_done_after_serving_duration() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let cook = kitchen.register_worker("cook-1").unwrap();
    let order = kitchen.submit_order(regular.id).unwrap();

    kitchen.accept_next(cook.id).unwrap();

    tokio::time::sleep(SERVING - Duration::from_millis(1)).await;
    assert_eq!(kitchen.order(order.id).unwrap().state, State::InProgress);

    tokio::time::sleep(Duration::from_millis(2)).await;
    let done = kitchen.order(order.id).unwrap();
    assert_eq!(done.state, State::Done);
    assert_eq!(done.worker, Some(cook.id));
    assert!(done.completed_at.is_some());
    assert_eq!(
        kitchen.stats().unwrap(),
        OrderStats {
            completed: 1,
            incomplete: 0
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_never_share_an_order() {
    let (kitchen, store) = kitchen();
    let vip = store.add_producer("ada", Tier::Privileged);
    let regular = store.add_producer("bob", Tier::Standard);
    for i in 0..200 {
        let producer = if i % 3 == 0 { vip.id } else { regular.id };
        kitchen.submit_order(producer).unwrap();
    }

    let mut tasks = Vec::new();
    for i in 0..8 {
        let cook = kitchen.register_worker(format!("cook-{i}")).unwrap();
        let kitchen = kitchen.clone();
        tasks.push(tokio::spawn(async move {
            let mut taken = Vec::new();
            loop {
                match kitchen.accept_next(cook.id) {
                    Ok(order) => taken.push(order.id),
                    Err(Error::EmptyQueue) => break,
                    Err(e) => panic!("unexpected error: {e}"),
                }
                tokio::task::yield_now().await;
            }
            taken
        }));
    }

    let mut seen = HashSet::new();
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(seen.insert(id), "order {id} handed out twice");
        }
    }
    assert_eq!(seen.len(), 200);
    assert!(kitchen.queue().is_empty());

    kitchen.shutdown().await;
}

// ---------------------------------------------------------------------------
// Worker lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_worker_persists_it() {
    let (kitchen, store) = kitchen();

    let cook = kitchen.register_worker("cook-1").unwrap();

    assert!(cook.active);
    assert_eq!(store.list_workers().unwrap(), vec![cook.clone()]);
    let status = kitchen.worker(cook.id).unwrap();
    assert!(!status.running);
    assert_eq!(status.worker, cook);
}

#[tokio::test(start_paused = true)]
async fn removing_worker_requeues_its_order_at_front_of_tier() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let first = kitchen.register_worker("cook-1").unwrap();
    let second = kitchen.register_worker("cook-2").unwrap();

    let held = kitchen.submit_order(regular.id).unwrap();
    kitchen.accept_next(first.id).unwrap();
    let waiting = kitchen.submit_order(regular.id).unwrap();

    let requeued = kitchen.remove_worker(first.id).unwrap();
    assert_eq!(requeued, vec![held.id]);

    let stored = kitchen.order(held.id).unwrap();
    assert_eq!(stored.state, State::Pending);
    assert_eq!(stored.worker, None);
    assert_eq!(kitchen.queue().peek().unwrap().id, held.id);

    // The cancelled serving timer must not complete the re-queued order.
    tokio::time::sleep(SERVING * 2).await;
    assert_eq!(kitchen.order(held.id).unwrap().state, State::Pending);

    assert_eq!(kitchen.accept_next(second.id).unwrap().id, held.id);
    assert_eq!(kitchen.accept_next(second.id).unwrap().id, waiting.id);
    kitchen.shutdown().await;
}

#[tokio::test]
async fn requeued_orders_keep_their_relative_order() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let vip = store.add_producer("ada", Tier::Privileged);
    let cook = kitchen.register_worker("cook-1").unwrap();

    let a = kitchen.submit_order(regular.id).unwrap();
    let b = kitchen.submit_order(regular.id).unwrap();
    kitchen.accept_next(cook.id).unwrap();
    kitchen.accept_next(cook.id).unwrap();
    let c = kitchen.submit_order(regular.id).unwrap();
    let v = kitchen.submit_order(vip.id).unwrap();

    let requeued = kitchen.remove_worker(cook.id).unwrap();
    assert_eq!(requeued, vec![a.id, b.id]);

    let drained: Vec<OrderId> = std::iter::from_fn(|| kitchen.queue().dequeue().ok())
        .map(|o| o.id)
        .collect();
    assert_eq!(drained, vec![v.id, a.id, b.id, c.id]);
}

#[tokio::test]
async fn removed_worker_cannot_accept_and_cannot_be_removed_twice() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let cook = kitchen.register_worker("cook-1").unwrap();
    kitchen.submit_order(regular.id).unwrap();

    assert!(kitchen.remove_worker(cook.id).unwrap().is_empty());

    let err = kitchen.accept_next(cook.id).unwrap_err();
    assert!(matches!(err, Error::WorkerInactive(_)));
    assert!(err.is_nothing_to_do());
    assert_eq!(kitchen.queue_size(), 1);

    assert!(matches!(
        kitchen.remove_worker(cook.id),
        Err(Error::AlreadyRemoved(_))
    ));
    assert!(!store.list_workers().unwrap()[0].active);
}

#[tokio::test]
async fn remove_unknown_worker_fails() {
    let (kitchen, _store) = kitchen();
    assert!(matches!(
        kitchen.remove_worker(WorkerId::new()),
        Err(Error::UnknownWorker(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn reinstated_worker_serves_again() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let cook = kitchen.register_worker("cook-1").unwrap();

    assert!(matches!(
        kitchen.reinstate_worker(cook.id),
        Err(Error::NotRemoved(_))
    ));

    kitchen.remove_worker(cook.id).unwrap();
    let reinstated = kitchen.reinstate_worker(cook.id).unwrap();
    assert!(reinstated.active);
    assert!(store.list_workers().unwrap()[0].active);

    let order = kitchen.submit_order(regular.id).unwrap();
    kitchen.accept_next(cook.id).unwrap();
    tokio::time::sleep(SERVING + Duration::from_millis(1)).await;
    assert_eq!(kitchen.order(order.id).unwrap().state, State::Done);
}

// ---------------------------------------------------------------------------
// Store failures
// ---------------------------------------------------------------------------

/// Memory store whose writes can be made to fail on demand.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_save_worker: AtomicBool,
    fail_assign: AtomicBool,
    fail_get_by_worker: AtomicBool,
    /// Refuse moving this order into this state.
    fail_transition: Mutex<Option<(OrderId, State)>>,
}

impl FlakyStore {
    fn fail_transition(&self, id: OrderId, to: State) {
        *self.fail_transition.lock() = Some((id, to));
    }
}

fn injected() -> Error {
    Error::Persistence("injected failure".to_string())
}

impl ProducerDirectory for FlakyStore {
    fn lookup(&self, id: ProducerId) -> kiosk_rs::error::Result<Producer> {
        self.inner.lookup(id)
    }
}

impl OrderStore for FlakyStore {
    fn create(&self, new: NewOrder) -> kiosk_rs::error::Result<Order> {
        self.inner.create(new)
    }

    fn get(&self, id: OrderId) -> kiosk_rs::error::Result<Order> {
        self.inner.get(id)
    }

    fn get_by_worker(&self, worker: WorkerId) -> kiosk_rs::error::Result<Vec<Order>> {
        if self.fail_get_by_worker.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.get_by_worker(worker)
    }

    fn set_state(&self, id: OrderId, state: State) -> kiosk_rs::error::Result<()> {
        if *self.fail_transition.lock() == Some((id, state)) {
            return Err(injected());
        }
        self.inner.set_state(id, state)
    }

    fn assign_worker(&self, id: OrderId, worker: WorkerId) -> kiosk_rs::error::Result<()> {
        if self.fail_assign.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.assign_worker(id, worker)
    }

    fn clear_worker(&self, id: OrderId) -> kiosk_rs::error::Result<()> {
        self.inner.clear_worker(id)
    }

    fn list_unfinished(&self) -> kiosk_rs::error::Result<Vec<Order>> {
        self.inner.list_unfinished()
    }

    fn list(&self, state: Option<State>, limit: usize) -> kiosk_rs::error::Result<Vec<Order>> {
        self.inner.list(state, limit)
    }

    fn stats(&self) -> kiosk_rs::error::Result<OrderStats> {
        self.inner.stats()
    }
}

impl WorkerStore for FlakyStore {
    fn save_worker(&self, worker: &Worker) -> kiosk_rs::error::Result<()> {
        if self.fail_save_worker.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.save_worker(worker)
    }

    fn set_worker_active(&self, id: WorkerId, active: bool) -> kiosk_rs::error::Result<()> {
        self.inner.set_worker_active(id, active)
    }

    fn list_workers(&self) -> kiosk_rs::error::Result<Vec<Worker>> {
        self.inner.list_workers()
    }
}

#[tokio::test]
async fn failed_worker_registration_is_rolled_back() {
    let store = Arc::new(FlakyStore::default());
    let kitchen = Kitchen::with_store(Arc::clone(&store), config());
    store.fail_save_worker.store(true, Ordering::SeqCst);

    let err = kitchen.register_worker("cook-1").unwrap_err();

    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(err.kind(), ErrorKind::Server);
    assert!(kitchen.workers().is_empty());
}

#[tokio::test]
async fn failed_binding_returns_order_to_queue_front() {
    let store = Arc::new(FlakyStore::default());
    let kitchen = Kitchen::with_store(Arc::clone(&store), config());
    let regular = store.inner.add_producer("bob", Tier::Standard);
    let cook = kitchen.register_worker("cook-1").unwrap();
    let first = kitchen.submit_order(regular.id).unwrap();
    kitchen.submit_order(regular.id).unwrap();

    store.fail_assign.store(true, Ordering::SeqCst);
    assert!(matches!(
        kitchen.accept_next(cook.id),
        Err(Error::Persistence(_))
    ));

    assert_eq!(kitchen.queue_size(), 2);
    assert_eq!(kitchen.queue().peek().unwrap().id, first.id);
    let stored = kitchen.order(first.id).unwrap();
    assert_eq!(stored.state, State::Pending);
    assert_eq!(stored.worker, None);

    store.fail_assign.store(false, Ordering::SeqCst);
    assert_eq!(kitchen.accept_next(cook.id).unwrap().id, first.id);
    kitchen.shutdown().await;
}

#[tokio::test]
async fn removal_marks_worker_inactive_even_if_its_orders_cannot_be_loaded() {
    let store = Arc::new(FlakyStore::default());
    let kitchen = Kitchen::with_store(Arc::clone(&store), config());
    let cook = kitchen.register_worker("cook-1").unwrap();

    store.fail_get_by_worker.store(true, Ordering::SeqCst);
    assert!(matches!(
        kitchen.remove_worker(cook.id),
        Err(Error::Persistence(_))
    ));

    assert!(!kitchen.worker(cook.id).unwrap().worker.active);
    assert!(!store.list_workers().unwrap()[0].active);
}

#[tokio::test]
async fn failed_start_undoes_worker_assignment() {
    let store = Arc::new(FlakyStore::default());
    let kitchen = Kitchen::with_store(Arc::clone(&store), config());
    let regular = store.inner.add_producer("bob", Tier::Standard);
    let cook = kitchen.register_worker("cook-1").unwrap();
    let first = kitchen.submit_order(regular.id).unwrap();
    let second = kitchen.submit_order(regular.id).unwrap();

    store.fail_transition(first.id, State::InProgress);
    assert!(matches!(
        kitchen.accept_next(cook.id),
        Err(Error::Persistence(_))
    ));

    let stored = kitchen.order(first.id).unwrap();
    assert_eq!(stored.state, State::Pending);
    assert_eq!(stored.worker, None);
    assert!(store.get_by_worker(cook.id).unwrap().is_empty());
    assert_eq!(kitchen.queue_size(), 2);
    assert_eq!(kitchen.queue().peek().unwrap().id, first.id);

    *store.fail_transition.lock() = None;
    assert_eq!(kitchen.accept_next(cook.id).unwrap().id, first.id);
    assert_eq!(kitchen.accept_next(cook.id).unwrap().id, second.id);
    kitchen.shutdown().await;
}

#[tokio::test]
async fn removal_requeues_remaining_orders_when_one_fails() {
    let store = Arc::new(FlakyStore::default());
    let kitchen = Kitchen::with_store(Arc::clone(&store), config());
    let regular = store.inner.add_producer("bob", Tier::Standard);
    let cook = kitchen.register_worker("cook-1").unwrap();
    let stuck = kitchen.submit_order(regular.id).unwrap();
    let moved = kitchen.submit_order(regular.id).unwrap();
    kitchen.accept_next(cook.id).unwrap();
    kitchen.accept_next(cook.id).unwrap();
    let waiting = kitchen.submit_order(regular.id).unwrap();

    store.fail_transition(stuck.id, State::Pending);
    let requeued = kitchen.remove_worker(cook.id).unwrap();
    assert_eq!(requeued, vec![moved.id]);

    let left = kitchen.order(stuck.id).unwrap();
    assert_eq!(left.state, State::InProgress);
    assert_eq!(left.worker, Some(cook.id));
    assert!(!kitchen.worker(cook.id).unwrap().worker.active);

    let drained: Vec<OrderId> = std::iter::from_fn(|| kitchen.queue().dequeue().ok())
        .map(|o| o.id)
        .collect();
    assert_eq!(drained, vec![moved.id, waiting.id]);
}

#[test]
fn accept_outside_runtime_leaves_order_queued() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let cook = kitchen.register_worker("cook-1").unwrap();
    let order = kitchen.submit_order(regular.id).unwrap();

    let err = kitchen.accept_next(cook.id).unwrap_err();
    assert!(matches!(err, Error::NoRuntime));
    assert!(matches!(
        kitchen.start_worker(cook.id),
        Err(Error::NoRuntime)
    ));

    assert_eq!(kitchen.queue_size(), 1);
    let stored = kitchen.order(order.id).unwrap();
    assert_eq!(stored.state, State::Pending);
    assert_eq!(stored.worker, None);
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn recover_requeues_unfinished_orders_in_creation_order() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let regular = store.add_producer("bob", Tier::Standard).unwrap();
    let vip = store.add_producer("ada", Tier::Privileged).unwrap();

    let (interrupted, waiting, cook) = {
        let kitchen = Kitchen::with_store(Arc::clone(&store), config());
        let cook = kitchen.register_worker("cook-1").unwrap();
        let interrupted = kitchen.submit_order(regular.id).unwrap();
        kitchen.accept_next(cook.id).unwrap();
        let waiting = kitchen.submit_order(vip.id).unwrap();
        kitchen.shutdown().await;
        (interrupted, waiting, cook)
    };
    assert_eq!(
        store.get(interrupted.id).unwrap().state,
        State::InProgress
    );

    let kitchen = Kitchen::with_store(Arc::clone(&store), config());
    let report = kitchen.recover().unwrap();
    assert_eq!(
        report,
        RecoveryReport {
            workers: 1,
            orders: 2,
            interrupted: 1,
            skipped: 0,
        }
    );

    let restored = kitchen.order(interrupted.id).unwrap();
    assert_eq!(restored.state, State::Pending);
    assert_eq!(restored.worker, None);
    assert_eq!(kitchen.worker(cook.id).unwrap().worker, cook);

    assert_eq!(kitchen.accept_next(cook.id).unwrap().id, waiting.id);
    assert_eq!(kitchen.accept_next(cook.id).unwrap().id, interrupted.id);
    kitchen.shutdown().await;
}

#[tokio::test]
async fn recover_keeps_removed_workers_inactive_and_runs_once() {
    let store = Arc::new(MemoryStore::new());
    let cook = {
        let kitchen = Kitchen::with_store(Arc::clone(&store), config());
        let cook = kitchen.register_worker("cook-1").unwrap();
        kitchen.remove_worker(cook.id).unwrap();
        cook
    };

    let kitchen = Kitchen::with_store(Arc::clone(&store), config());
    kitchen.recover().unwrap();

    assert!(!kitchen.worker(cook.id).unwrap().worker.active);
    assert!(matches!(
        kitchen.accept_next(cook.id),
        Err(Error::WorkerInactive(_))
    ));
    assert!(kitchen.recover().is_err());
}

#[tokio::test]
async fn list_orders_filters_by_state_newest_first() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let cook = kitchen.register_worker("cook-1").unwrap();
    let a = kitchen.submit_order(regular.id).unwrap();
    let b = kitchen.submit_order(regular.id).unwrap();
    let c = kitchen.submit_order(regular.id).unwrap();
    kitchen.accept_next(cook.id).unwrap();

    let all: Vec<OrderId> = kitchen
        .list_orders(None, 10)
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(all, vec![c.id, b.id, a.id]);

    let pending = kitchen.list_orders(Some(State::Pending), 1).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, c.id);

    let cooking = kitchen.list_orders(Some(State::InProgress), 10).unwrap();
    assert_eq!(cooking.len(), 1);
    assert_eq!(cooking[0].id, a.id);
    kitchen.shutdown().await;
}

#[tokio::test]
async fn recover_is_refused_after_an_order_was_submitted() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let order = kitchen.submit_order(regular.id).unwrap();

    assert!(kitchen.recover().is_err());

    assert_eq!(kitchen.queue_size(), 1);
    assert_eq!(kitchen.queue().dequeue().unwrap().id, order.id);
    assert!(kitchen.queue().is_empty());
}

#[tokio::test]
async fn recover_is_refused_after_an_order_was_bound() {
    let (kitchen, store) = kitchen();
    let regular = store.add_producer("bob", Tier::Standard);
    let first = kitchen.register_worker("cook-1").unwrap();
    let second = kitchen.register_worker("cook-2").unwrap();
    let order = kitchen.submit_order(regular.id).unwrap();
    kitchen.accept_next(first.id).unwrap();

    assert!(kitchen.recover().is_err());

    assert!(matches!(
        kitchen.accept_next(second.id),
        Err(Error::EmptyQueue)
    ));
    assert_eq!(kitchen.order(order.id).unwrap().worker, Some(first.id));
    kitchen.shutdown().await;
}

#[tokio::test]
async fn recover_skips_orders_it_cannot_restore() {
    let store = Arc::new(FlakyStore::default());
    let regular = store.inner.add_producer("bob", Tier::Standard);
    let (stuck, fine) = {
        let kitchen = Kitchen::with_store(Arc::clone(&store), config());
        let cook = kitchen.register_worker("cook-1").unwrap();
        let stuck = kitchen.submit_order(regular.id).unwrap();
        kitchen.accept_next(cook.id).unwrap();
        let fine = kitchen.submit_order(regular.id).unwrap();
        kitchen.shutdown().await;
        (stuck, fine)
    };

    store.fail_transition(stuck.id, State::Pending);
    let kitchen = Kitchen::with_store(Arc::clone(&store), config());
    let report = kitchen.recover().unwrap();

    assert_eq!(
        report,
        RecoveryReport {
            workers: 1,
            orders: 1,
            interrupted: 0,
            skipped: 1,
        }
    );
    assert_eq!(kitchen.queue_size(), 1);
    assert_eq!(kitchen.queue().peek().unwrap().id, fine.id);
    assert_eq!(kitchen.order(stuck.id).unwrap().state, State::InProgress);
}
