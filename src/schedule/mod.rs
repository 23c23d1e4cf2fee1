//! # Animation Scheduler
//!
//! A micro-DSL for sequencing timed and callback steps into a single
//! cancellable asynchronous run. Sequences pace everything with a visual
//! consequence: enemy movement waits, post-phase pauses, cinematic
//! entrances.
//!
//! Steps are a tagged variant type evaluated by an explicit interpreter,
//! so ordering and cancellation are testable independently of any caller.
//! Execution is cooperative: each step suspends the sequence until it
//! completes, strictly in the order appended. Nested blocks (branch and
//! loop bodies) run their sub-steps to completion before control returns
//! to the outer list.
//!
//! Cancellation is voluntary: `SequenceHandle::cancel` invalidates any
//! pending delay and makes every later suspension point reject. A step
//! already in flight is never preempted, but nothing after it runs. A
//! cancelled sequence never resolves its `start()` future successfully.

use crate::{WarrenError, WarrenResult};
use log::debug;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Boxed future produced by a callback step.
pub type StepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A callback step. Loop bodies may invoke the same callback repeatedly,
/// so these are `FnMut`.
pub type StepFn = Box<dyn FnMut() -> StepFuture + Send>;

/// A condition closure gating a branch or loop.
pub type StepCondition = Box<dyn Fn() -> bool + Send>;

/// Wraps an async closure into a [`StepFn`].
pub fn async_step<F, Fut>(mut f: F) -> StepFn
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move || Box::pin(f()) as StepFuture)
}

/// Wraps a synchronous closure into a [`StepFn`].
pub fn sync_step<F>(mut f: F) -> StepFn
where
    F: FnMut() + Send + 'static,
{
    Box::new(move || {
        f();
        Box::pin(std::future::ready(())) as StepFuture
    })
}

/// One step of a sequence.
pub enum Step {
    /// Suspend for a fixed delay
    Wait(Duration),
    /// Run a single callback to completion
    Call(StepFn),
    /// Run a set of callbacks concurrently; the step completes when all do
    Concurrent(Vec<StepFn>),
    /// Binary conditional; exactly one branch's steps run, in order
    Branch {
        condition: StepCondition,
        then_steps: Vec<Step>,
        else_steps: Vec<Step>,
    },
    /// Re-run the body while the condition holds
    Loop { condition: StepCondition, body: Vec<Step> },
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Wait(d) => write!(f, "Wait({:?})", d),
            Step::Call(_) => write!(f, "Call"),
            Step::Concurrent(fs) => write!(f, "Concurrent({})", fs.len()),
            Step::Branch { .. } => write!(f, "Branch"),
            Step::Loop { .. } => write!(f, "Loop"),
        }
    }
}

/// Cancellation flag shared between a running sequence and its handle.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Sets the cancelled flag and wakes any pending delay. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> WarrenResult<()> {
        if self.is_cancelled() {
            Err(WarrenError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for the given duration, waking early with an error if the
    /// token is cancelled.
    async fn cancellable_delay(&self, duration: Duration) -> WarrenResult<()> {
        // Register the waiter before checking the flag so a cancel between
        // the check and the await cannot be missed.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        self.ensure_active()?;
        tokio::select! {
            _ = &mut notified => Err(WarrenError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

/// Interprets a step list in order, honoring cancellation at every
/// suspension point.
async fn run_steps(steps: &mut [Step], token: &CancelToken) -> WarrenResult<()> {
    for step in steps.iter_mut() {
        token.ensure_active()?;
        match step {
            Step::Wait(duration) => token.cancellable_delay(*duration).await?,
            Step::Call(callback) => callback().await,
            Step::Concurrent(callbacks) => {
                let handles: Vec<_> = callbacks
                    .iter_mut()
                    .map(|callback| tokio::spawn(callback()))
                    .collect();
                for handle in handles {
                    let _ = handle.await;
                }
            }
            Step::Branch {
                condition,
                then_steps,
                else_steps,
            } => {
                if condition() {
                    Box::pin(run_steps(then_steps, token)).await?;
                } else {
                    Box::pin(run_steps(else_steps, token)).await?;
                }
            }
            Step::Loop { condition, body } => {
                while condition() {
                    token.ensure_active()?;
                    Box::pin(run_steps(body, token)).await?;
                }
            }
        }
    }
    // A cancel that landed during the final step must still reject.
    token.ensure_active()?;
    Ok(())
}

/// Chainable list of steps shared by top-level sequences and nested
/// branch/loop bodies.
#[derive(Default)]
pub struct StepList {
    steps: Vec<Step>,
}

impl StepList {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a fixed delay.
    pub fn wait(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Wait(duration));
        self
    }

    /// Appends a synchronous callback step.
    pub fn then<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.steps.push(Step::Call(sync_step(callback)));
        self
    }

    /// Appends an asynchronous callback step.
    pub fn then_async<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.steps.push(Step::Call(async_step(callback)));
        self
    }

    /// Appends a set of callbacks that run concurrently.
    pub fn concurrently(mut self, callbacks: Vec<StepFn>) -> Self {
        self.steps.push(Step::Concurrent(callbacks));
        self
    }

    /// Appends a binary conditional; each branch is built from an empty
    /// step list.
    pub fn branch<C, T, E>(mut self, condition: C, then_build: T, else_build: E) -> Self
    where
        C: Fn() -> bool + Send + 'static,
        T: FnOnce(StepList) -> StepList,
        E: FnOnce(StepList) -> StepList,
    {
        self.steps.push(Step::Branch {
            condition: Box::new(condition),
            then_steps: then_build(StepList::new()).steps,
            else_steps: else_build(StepList::new()).steps,
        });
        self
    }

    /// Appends a condition-gated loop over a nested step list.
    pub fn repeat_while<C, B>(mut self, condition: C, body_build: B) -> Self
    where
        C: Fn() -> bool + Send + 'static,
        B: FnOnce(StepList) -> StepList,
    {
        self.steps.push(Step::Loop {
            condition: Box::new(condition),
            body: body_build(StepList::new()).steps,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Owns the active-sequence table. Cheap to clone; clones share the table.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    active: Mutex<HashMap<u64, Arc<CancelToken>>>,
    next_id: AtomicU64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins building a sequence. Steps are appended via the chainable
    /// calls and only begin executing on `start()`.
    pub fn create_sequence(&self) -> SequenceBuilder {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let token = Arc::new(CancelToken::default());
        self.inner
            .active
            .lock()
            .expect("scheduler table poisoned")
            .insert(id, token.clone());
        SequenceBuilder {
            id,
            token,
            scheduler: self.clone(),
            list: StepList::new(),
        }
    }

    /// A single cancellable delay. Turn pacing routes every wait through
    /// here so cancellation plumbing is shared.
    pub async fn pause(&self, duration: Duration) -> WarrenResult<()> {
        self.create_sequence().wait(duration).start().await
    }

    /// Number of sequences created but not yet finished or cancelled.
    pub fn active_count(&self) -> usize {
        self.inner
            .active
            .lock()
            .expect("scheduler table poisoned")
            .len()
    }

    /// Cancels every active sequence.
    pub fn cancel_all(&self) {
        let tokens: Vec<Arc<CancelToken>> = {
            let table = self.inner.active.lock().expect("scheduler table poisoned");
            table.values().cloned().collect()
        };
        for token in tokens {
            token.cancel();
        }
    }

    fn deregister(&self, id: u64) {
        // Idempotent: completion and cancellation may both get here.
        self.inner
            .active
            .lock()
            .expect("scheduler table poisoned")
            .remove(&id);
    }
}

/// Builder for one cancellable sequence.
pub struct SequenceBuilder {
    id: u64,
    token: Arc<CancelToken>,
    scheduler: Scheduler,
    list: StepList,
}

impl SequenceBuilder {
    /// Handle for cancelling this sequence before or during its run.
    pub fn handle(&self) -> SequenceHandle {
        SequenceHandle {
            id: self.id,
            token: self.token.clone(),
            scheduler: self.scheduler.clone(),
        }
    }

    pub fn wait(mut self, duration: Duration) -> Self {
        self.list = self.list.wait(duration);
        self
    }

    pub fn then<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.list = self.list.then(callback);
        self
    }

    pub fn then_async<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.list = self.list.then_async(callback);
        self
    }

    pub fn concurrently(mut self, callbacks: Vec<StepFn>) -> Self {
        self.list = self.list.concurrently(callbacks);
        self
    }

    pub fn branch<C, T, E>(mut self, condition: C, then_build: T, else_build: E) -> Self
    where
        C: Fn() -> bool + Send + 'static,
        T: FnOnce(StepList) -> StepList,
        E: FnOnce(StepList) -> StepList,
    {
        self.list = self.list.branch(condition, then_build, else_build);
        self
    }

    pub fn repeat_while<C, B>(mut self, condition: C, body_build: B) -> Self
    where
        C: Fn() -> bool + Send + 'static,
        B: FnOnce(StepList) -> StepList,
    {
        self.list = self.list.repeat_while(condition, body_build);
        self
    }

    /// Runs the sequence to completion.
    ///
    /// Resolves `Err(WarrenError::Cancelled)` if the sequence was cancelled
    /// at any suspension point, including before the first step ran. The
    /// sequence deregisters from the scheduler either way.
    pub async fn start(mut self) -> WarrenResult<()> {
        let result = run_steps(&mut self.list.steps, &self.token).await;
        self.scheduler.deregister(self.id);
        if result.is_err() {
            debug!("sequence {} cancelled", self.id);
        }
        result
    }
}

/// Cancellation handle detached from the builder.
#[derive(Clone)]
pub struct SequenceHandle {
    id: u64,
    token: Arc<CancelToken>,
    scheduler: Scheduler,
}

impl SequenceHandle {
    /// Cancels the sequence. Safe to call repeatedly and after completion.
    pub fn cancel(&self) {
        self.token.cancel();
        self.scheduler.deregister(self.id);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Bounds an animated flow with a safety timeout so a missing completion
/// event cannot leave the caller suspended forever.
pub async fn with_safety_timeout<T, F>(flow: F, limit: Duration) -> WarrenResult<T>
where
    F: Future<Output = WarrenResult<T>>,
{
    match tokio::time::timeout(limit, flow).await {
        Ok(result) => result,
        Err(_) => Err(WarrenError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_run_strictly_in_order() {
        let scheduler = Scheduler::new();
        let log = recorder();

        let log_a = log.clone();
        let log_b = log.clone();

        scheduler
            .create_sequence()
            .then(move || log_a.lock().unwrap().push("first"))
            .wait(Duration::from_millis(100))
            .then(move || log_b.lock().unwrap().push("second"))
            .start()
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_branch_runs_exactly_one_side() {
        let scheduler = Scheduler::new();
        let log = recorder();

        let then_log = log.clone();
        let else_log = log.clone();
        scheduler
            .create_sequence()
            .branch(
                || false,
                move |steps| {
                    let sink = then_log.clone();
                    steps.then(move || sink.lock().unwrap().push("then"))
                },
                move |steps| {
                    let sink = else_log.clone();
                    steps.then(move || sink.lock().unwrap().push("else"))
                },
            )
            .start()
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["else"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_until_condition_clears() {
        let scheduler = Scheduler::new();
        let remaining = Arc::new(Mutex::new(3u32));
        let ticks = Arc::new(Mutex::new(0u32));

        let cond_remaining = remaining.clone();
        let body_remaining = remaining.clone();
        let body_ticks = ticks.clone();

        scheduler
            .create_sequence()
            .repeat_while(
                move || *cond_remaining.lock().unwrap() > 0,
                move |steps| {
                    let remaining = body_remaining.clone();
                    let ticks = body_ticks.clone();
                    steps
                        .wait(Duration::from_millis(10))
                        .then(move || {
                            *remaining.lock().unwrap() -= 1;
                            *ticks.lock().unwrap() += 1;
                        })
                },
            )
            .start()
            .await
            .unwrap();

        assert_eq!(*ticks.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callbacks_all_resolve() {
        let scheduler = Scheduler::new();
        let count = Arc::new(Mutex::new(0u32));

        let callbacks: Vec<StepFn> = (0..4)
            .map(|_| {
                let count = count.clone();
                async_step(move || {
                    let count = count.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        *count.lock().unwrap() += 1;
                    }
                })
            })
            .collect();

        scheduler
            .create_sequence()
            .concurrently(callbacks)
            .start()
            .await
            .unwrap();

        assert_eq!(*count.lock().unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_rejects_without_running_steps() {
        let scheduler = Scheduler::new();
        let ran = Arc::new(Mutex::new(false));

        let ran_flag = ran.clone();
        let sequence = scheduler
            .create_sequence()
            .then(move || *ran_flag.lock().unwrap() = true);
        let handle = sequence.handle();
        handle.cancel();

        let result = sequence.start().await;
        assert!(matches!(result, Err(WarrenError::Cancelled)));
        assert!(!*ran.lock().unwrap());
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait_stops_later_steps() {
        let scheduler = Scheduler::new();
        let log = recorder();

        let before = log.clone();
        let after = log.clone();
        let sequence = scheduler
            .create_sequence()
            .then(move || before.lock().unwrap().push("before"))
            .wait(Duration::from_secs(60))
            .then(move || after.lock().unwrap().push("after"));
        let handle = sequence.handle();

        let join = tokio::spawn(sequence.start());
        // Let the sequence reach its wait before cancelling.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        handle.cancel();

        let result = join.await.unwrap();
        assert!(matches!(result, Err(WarrenError::Cancelled)));
        assert_eq!(*log.lock().unwrap(), vec!["before"]);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let scheduler = Scheduler::new();
        let sequence = scheduler.create_sequence().wait(Duration::from_millis(1));
        let handle = sequence.handle();

        sequence.start().await.unwrap();
        assert_eq!(scheduler.active_count(), 0);

        // Cancelling a completed sequence has no effect and does not panic.
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_sequences_deregister() {
        let scheduler = Scheduler::new();
        assert_eq!(scheduler.active_count(), 0);

        let sequence = scheduler.create_sequence().wait(Duration::from_millis(1));
        assert_eq!(scheduler.active_count(), 1);

        sequence.start().await.unwrap();
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_is_cancellable_via_cancel_all() {
        let scheduler = Scheduler::new();

        let waiter = scheduler.clone();
        let join = tokio::spawn(async move { waiter.pause(Duration::from_secs(60)).await });
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        scheduler.cancel_all();

        let result = join.await.unwrap();
        assert!(matches!(result, Err(WarrenError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_safety_timeout_bounds_a_flow() {
        let stalled = async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        };
        let result = with_safety_timeout(stalled, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(WarrenError::Cancelled)));
    }
}
