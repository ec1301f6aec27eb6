//! Timer contract.
//!
//! The host supplies the timer: a hook that arranges for a one-shot task
//! to run no earlier than `ms` milliseconds later, **on the thread that
//! drives dispatch**. The runtime never cancels a timer; a stale firing
//! is disarmed by a membership check inside the armed task.

use std::rc::Rc;
use std::time::Duration;

/// One-shot task handed to the timer.
pub type TimeoutTask = Box<dyn FnOnce()>;

/// Installed timer hook: `hook(ms, task)` schedules `task`.
pub type TimerHook = Rc<dyn Fn(u32, TimeoutTask)>;

/// Timer hook backed by the tokio runtime.
///
/// Tasks are `spawn_local`ed, so this needs a current-thread runtime with
/// a running `LocalSet`; that also gives the thread-affinity the contract
/// asks for.
pub fn tokio_timer() -> impl Fn(u32, TimeoutTask) + 'static {
    |ms, task| {
        tokio::task::spawn_local(async move {
            tokio::time::sleep(Duration::from_millis(u64::from(ms))).await;
            task();
        });
    }
}
