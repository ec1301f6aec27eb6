//! Manually advanced timer: a deterministic stand-in for the host timer.
//!
//! Armed tasks fire in deadline order (arm order breaks ties) when the
//! clock is advanced past them; a task fired while advancing may arm new
//! timers, and those fire too if they land inside the same advance.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use tether_core::TimeoutTask;

#[derive(Default)]
struct TimerState {
    now: u64,
    next_id: u64,
    entries: Vec<Entry>,
}

struct Entry {
    deadline: u64,
    id: u64,
    task: TimeoutTask,
}

#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Rc<RefCell<TimerState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hook to install with `Peer::set_timer`.
    pub fn hook(&self) -> impl Fn(u32, TimeoutTask) + 'static {
        let state = self.state.clone();
        move |ms, task| {
            let mut state = state.borrow_mut();
            let deadline = state.now + u64::from(ms);
            let id = state.next_id;
            state.next_id += 1;
            trace!(deadline, id, "arm timer");
            state.entries.push(Entry { deadline, id, task });
        }
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    /// Number of armed, not-yet-fired tasks.
    pub fn pending(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Advance the clock by `ms`, firing every task due on the way.
    pub fn advance(&self, ms: u64) {
        let target = self.state.borrow().now + ms;
        loop {
            let task = {
                let mut state = self.state.borrow_mut();
                let due = state
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.deadline <= target)
                    .min_by_key(|(_, entry)| (entry.deadline, entry.id))
                    .map(|(index, _)| index);
                match due {
                    Some(index) => {
                        let entry = state.entries.remove(index);
                        state.now = state.now.max(entry.deadline);
                        Some(entry.task)
                    }
                    None => None,
                }
            };
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        self.state.borrow_mut().now = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn fires_in_deadline_order() {
        let timer = ManualTimer::new();
        let hook = timer.hook();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (ms, tag) in [(30u32, "late"), (10, "early"), (20, "middle")] {
            let order = order.clone();
            hook(ms, Box::new(move || order.borrow_mut().push(tag)));
        }

        timer.advance(15);
        assert_eq!(*order.borrow(), vec!["early"]);
        timer.advance(100);
        assert_eq!(*order.borrow(), vec!["early", "middle", "late"]);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn arm_order_breaks_ties() {
        let timer = ManualTimer::new();
        let hook = timer.hook();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let order = order.clone();
            hook(5, Box::new(move || order.borrow_mut().push(tag)));
        }
        timer.advance(5);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn tasks_armed_while_firing_can_fire_in_the_same_advance() {
        let timer = ManualTimer::new();
        let hook = timer.hook();
        let fired = Rc::new(RefCell::new(Vec::new()));

        let rearm_hook = timer.hook();
        let inner_fired = fired.clone();
        let outer_fired = fired.clone();
        hook(
            10,
            Box::new(move || {
                outer_fired.borrow_mut().push("first");
                let fired = inner_fired.clone();
                rearm_hook(10, Box::new(move || fired.borrow_mut().push("second")));
            }),
        );

        timer.advance(25);
        assert_eq!(*fired.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn not_due_tasks_stay_armed() {
        let timer = ManualTimer::new();
        let hook = timer.hook();
        hook(50, Box::new(|| {}));
        timer.advance(49);
        assert_eq!(timer.pending(), 1);
        assert_eq!(timer.now(), 49);
    }
}
