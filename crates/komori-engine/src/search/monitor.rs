//! Node-count and time tracking for a single top-level search.
//!
//! `move_count` and the stop flag are atomics so the observer thread (§5)
//! can request a stop or sample progress without synchronizing with the
//! search thread. Depth, the NPS history, and the node-limit/GC bookkeeping
//! are touched only by the search thread itself, but through a shared
//! `&SearchMonitor` (the recursive `search_impl` never holds `&mut`), so
//! they live behind `Cell`/`RefCell` rather than being plain fields.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Number of recent `(instant, move_count)` samples kept for NPS smoothing.
const HISTORY_LEN: usize = 16;

pub struct SearchMonitor {
    move_count: AtomicU64,
    stop: AtomicBool,
    print_requested: AtomicBool,
    seldepth: AtomicU32,
    start: Instant,
    history: RefCell<Vec<(Instant, u64)>>,
    move_limit: Cell<u64>,
    limit_stack: RefCell<Vec<u64>>,
    gc_interval: Cell<u64>,
    next_gc_count: Cell<u64>,
}

impl SearchMonitor {
    pub fn new() -> Self {
        SearchMonitor {
            move_count: AtomicU64::new(0),
            stop: AtomicBool::new(false),
            print_requested: AtomicBool::new(false),
            seldepth: AtomicU32::new(0),
            start: Instant::now(),
            history: RefCell::new(Vec::with_capacity(HISTORY_LEN)),
            move_limit: Cell::new(u64::MAX),
            limit_stack: RefCell::new(Vec::new()),
            gc_interval: Cell::new(u64::MAX),
            next_gc_count: Cell::new(u64::MAX),
        }
    }

    /// Reset all search-thread-local state for a fresh top-level search.
    /// `gc_interval` is typically `entries / 2 * 3` (see `super::tt::gc_interval`).
    pub fn new_search(&mut self, gc_interval: u64) {
        self.start = Instant::now();
        self.seldepth.store(0, Ordering::Relaxed);
        self.history.borrow_mut().clear();
        self.move_count.store(0, Ordering::Relaxed);
        self.stop.store(false, Ordering::Relaxed);
        self.print_requested.store(false, Ordering::Relaxed);
        self.move_limit.set(u64::MAX);
        self.limit_stack.borrow_mut().clear();
        self.gc_interval.set(gc_interval);
        self.reset_next_gc();
    }

    /// Record one node visit at `depth`, updating the seldepth high-water
    /// mark.
    pub fn visit(&self, depth: u32) {
        self.move_count.fetch_add(1, Ordering::Relaxed);
        self.seldepth.fetch_max(depth, Ordering::Relaxed);
    }

    pub fn move_count(&self) -> u64 {
        self.move_count.load(Ordering::Relaxed)
    }

    pub fn seldepth(&self) -> u32 {
        self.seldepth.load(Ordering::Relaxed)
    }

    /// Request a stop. Callable from the observer thread.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire) || self.move_count() >= self.move_limit.get()
    }

    /// Request that the next `SearchImpl` iteration emit an info line.
    /// Callable from the observer thread.
    pub fn request_print(&self) {
        self.print_requested.store(true, Ordering::Release);
    }

    /// Consume the print request, returning whether one was pending.
    pub fn take_print_request(&self) -> bool {
        self.print_requested.swap(false, Ordering::AcqRel)
    }

    pub fn should_gc(&self) -> bool {
        self.move_count() >= self.next_gc_count.get()
    }

    pub fn reset_next_gc(&self) {
        self.next_gc_count
            .set(self.move_count().saturating_add(self.gc_interval.get()));
    }

    /// Push a tighter node limit (the effective limit is the min of the
    /// stack). Pair with [`pop_limit`](Self::pop_limit).
    pub fn push_limit(&self, limit: u64) {
        self.limit_stack.borrow_mut().push(self.move_limit.get());
        self.move_limit.set(self.move_limit.get().min(limit));
    }

    pub fn pop_limit(&self) {
        if let Some(previous) = self.limit_stack.borrow_mut().pop() {
            self.move_limit.set(previous);
        }
    }

    /// Record an `(now, move_count)` sample for NPS smoothing, evicting the
    /// oldest sample once the ring buffer is full.
    pub fn tick(&self) {
        let mut history = self.history.borrow_mut();
        if history.len() >= HISTORY_LEN {
            history.remove(0);
        }
        history.push((Instant::now(), self.move_count()));
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Nodes per second, estimated from the history ring buffer when it has
    /// enough samples, falling back to total-elapsed/total-nodes otherwise.
    pub fn nodes_per_second(&self) -> u64 {
        let history = self.history.borrow();
        if let (Some(&(t0, n0)), Some(&(t1, n1))) = (history.first(), history.last()) {
            let elapsed = t1.saturating_duration_since(t0).as_secs_f64();
            if elapsed > 0.0 && n1 > n0 {
                return ((n1 - n0) as f64 / elapsed) as u64;
            }
        }
        drop(history);
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            (self.move_count() as f64 / elapsed) as u64
        } else {
            0
        }
    }
}

impl Default for SearchMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_increments_move_count_and_seldepth() {
        let monitor = SearchMonitor::new();
        monitor.visit(3);
        monitor.visit(5);
        assert_eq!(monitor.move_count(), 2);
        assert_eq!(monitor.seldepth(), 5);
    }

    #[test]
    fn should_stop_honors_move_limit() {
        let mut monitor = SearchMonitor::new();
        monitor.new_search(1_000);
        monitor.push_limit(2);
        monitor.visit(0);
        monitor.visit(0);
        assert!(monitor.should_stop());
    }

    #[test]
    fn push_pop_limit_restores_previous_bound() {
        let monitor = SearchMonitor::new();
        monitor.push_limit(10);
        monitor.push_limit(2);
        monitor.pop_limit();
        assert!(!monitor.should_stop());
        for _ in 0..11 {
            monitor.visit(0);
        }
        assert!(monitor.should_stop());
    }

    #[test]
    fn request_stop_is_observable_from_another_handle() {
        let monitor = SearchMonitor::new();
        assert!(!monitor.should_stop());
        monitor.request_stop();
        assert!(monitor.should_stop());
    }

    #[test]
    fn should_gc_fires_after_gc_interval_nodes() {
        let mut monitor = SearchMonitor::new();
        monitor.new_search(3);
        assert!(!monitor.should_gc());
        monitor.visit(0);
        monitor.visit(0);
        monitor.visit(0);
        assert!(monitor.should_gc());
        monitor.reset_next_gc();
        assert!(!monitor.should_gc());
    }

    #[test]
    fn print_request_is_consumed_once() {
        let monitor = SearchMonitor::new();
        monitor.request_print();
        assert!(monitor.take_print_request());
        assert!(!monitor.take_print_request());
    }
}
