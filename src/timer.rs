//! Recurring tasks on a virtual tick clock.
//!
//! Nothing here knows about wall time. The binary maps 50ms of real time onto
//! one tick and calls [`TickScheduler::tick_until`]; tests just call it with
//! whatever tick they want to reach.
use std::cell::Cell;
use std::rc::Rc;

use crate::prelude::*;

pub type Ticks = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub trait Task<C> {
    fn run(&mut self, ctx: &mut C) -> Flow;
    /// Called once, instead of `run`, when the task's handle was cancelled.
    fn cancelled(&mut self, _ctx: &mut C) {}
}
impl<C, F: FnMut(&mut C) -> Flow> Task<C> for F {
    fn run(&mut self, ctx: &mut C) -> Flow {
        self(ctx)
    }
}

pub trait Timer<C> {
    /// Runs `task` `delay` ticks from now, then every `interval` ticks until it
    /// returns [`Flow::Stop`] or the handle is cancelled.
    fn schedule_recurring(&mut self, delay: Ticks, interval: Ticks, task: Box<dyn Task<C>>) -> TaskHandle;
}

/// Stops a scheduled task. Cloning shares the same task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    cancelled: Rc<Cell<bool>>,
}
impl TaskHandle {
    /// Returns whether this call was the one that stopped the task.
    pub fn cancel(&self) -> bool {
        !self.cancelled.replace(true)
    }
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

struct Scheduled<C> {
    next_due: Ticks,
    interval: Ticks,
    cancelled: Rc<Cell<bool>>,
    task: Box<dyn Task<C>>,
}

pub struct TickScheduler<C> {
    tick: Ticks,
    tasks: SlotMap<Scheduled<C>>,
}
impl<C> Default for TickScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}
impl<C> TickScheduler<C> {
    pub fn new() -> Self {
        Self {
            tick: 0,
            tasks: SlotMap::new(),
        }
    }
    pub fn tick(&self) -> Ticks {
        self.tick
    }
    pub fn next_tick(&self) -> Ticks {
        self.tick + 1
    }
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
    pub fn tick_until(&mut self, tickn: Ticks, ctx: &mut C) {
        while self.tick < tickn {
            self.tick += 1;
            self.fire(ctx);
        }
    }
    fn fire(&mut self, ctx: &mut C) {
        let now = self.tick;
        self.tasks.retain(|key, scheduled| {
            if scheduled.cancelled.get() {
                log::trace!("dropping cancelled task {}", key.index());
                scheduled.task.cancelled(ctx);
                return false;
            }
            if scheduled.next_due > now {
                return true;
            }
            match scheduled.task.run(ctx) {
                Flow::Continue => {
                    scheduled.next_due = now + scheduled.interval;
                    true
                }
                Flow::Stop => false,
            }
        });
    }
    fn insert(&mut self, delay: Ticks, interval: Ticks, task: Box<dyn Task<C>>) -> (Key, TaskHandle) {
        let cancelled = Rc::new(Cell::new(false));
        let key = self.tasks.insert(Scheduled {
            next_due: self.tick + delay.max(1),
            interval: interval.max(1),
            cancelled: cancelled.clone(),
            task,
        });
        (key, TaskHandle { cancelled })
    }
}
impl<C> Timer<C> for TickScheduler<C> {
    fn schedule_recurring(&mut self, delay: Ticks, interval: Ticks, task: Box<dyn Task<C>>) -> TaskHandle {
        let (key, handle) = self.insert(delay, interval, task);
        log::trace!("scheduled task {} every {interval} ticks", key.index());
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_the_interval() {
        let mut timer = TickScheduler::<Vec<Ticks>>::new();
        let mut fired = vec![];
        let mut now = 0;
        timer.schedule_recurring(1, 3, Box::new(move |log: &mut Vec<Ticks>| {
            now += 1;
            log.push(now);
            Flow::Continue
        }));
        timer.tick_until(7, &mut fired);
        // runs on ticks 1, 4 and 7
        assert_eq!(fired, [1, 2, 3]);
    }

    #[test]
    fn stop_removes_the_task() {
        let mut timer = TickScheduler::<u32>::new();
        let mut runs = 0;
        timer.schedule_recurring(1, 1, Box::new(|n: &mut u32| {
            *n += 1;
            if *n == 2 { Flow::Stop } else { Flow::Continue }
        }));
        timer.tick_until(10, &mut runs);
        assert_eq!(runs, 2);
        assert_eq!(timer.pending(), 0);
    }

    struct Counted {
        runs: u32,
        cancels: u32,
    }
    struct Probe;
    impl Task<Counted> for Probe {
        fn run(&mut self, ctx: &mut Counted) -> Flow {
            ctx.runs += 1;
            Flow::Continue
        }
        fn cancelled(&mut self, ctx: &mut Counted) {
            ctx.cancels += 1;
        }
    }

    #[test]
    fn cancelled_tasks_never_run_again() {
        let mut timer = TickScheduler::new();
        let mut ctx = Counted { runs: 0, cancels: 0 };
        let handle = timer.schedule_recurring(1, 1, Box::new(Probe));
        timer.tick_until(3, &mut ctx);
        assert_eq!(ctx.runs, 3);

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(handle.clone().is_cancelled());
        timer.tick_until(10, &mut ctx);
        assert_eq!(ctx.runs, 3);
        assert_eq!(ctx.cancels, 1);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn stale_handles_do_not_touch_reused_slots() {
        let mut timer = TickScheduler::new();
        let mut ctx = Counted { runs: 0, cancels: 0 };
        let first = timer.schedule_recurring(1, 1, Box::new(|_: &mut Counted| Flow::Stop));
        timer.tick_until(1, &mut ctx);
        assert_eq!(timer.pending(), 0);

        let _second = timer.schedule_recurring(1, 1, Box::new(Probe));
        assert!(first.cancel());
        timer.tick_until(3, &mut ctx);
        assert_eq!(ctx.runs, 2);
        assert_eq!(ctx.cancels, 0);
    }

    #[test]
    fn delay_zero_waits_for_the_next_tick() {
        let mut timer = TickScheduler::<u32>::new();
        let mut runs = 0;
        timer.tick_until(5, &mut runs);
        timer.schedule_recurring(0, 2, Box::new(|n: &mut u32| {
            *n += 1;
            Flow::Continue
        }));
        timer.tick_until(5, &mut runs);
        assert_eq!(runs, 0);
        timer.tick_until(6, &mut runs);
        assert_eq!(runs, 1);
    }
}
