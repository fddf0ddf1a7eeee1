//! Thin platform primitives: an atomic counter, a test-and-set spinlock,
//! and a joinable task.
//!
//! The engine itself is threading-agnostic; these shims exist for hosts
//! that drive it from multiple tasks. A non-recursive blocking mutex with
//! try-acquire is [`std::sync::Mutex`] as-is, so no wrapper is provided.

use std::{
    sync::atomic::{AtomicBool, AtomicIsize, Ordering},
    thread::{self, JoinHandle},
};

use crossbeam_utils::Backoff;

/// A pointer-sized atomic counter.
///
/// `increment`/`decrement` return the *new* value; `swap` returns the
/// *previous* one.
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicIsize);

impl AtomicCounter {
    pub fn new(value: isize) -> Self {
        AtomicCounter(AtomicIsize::new(value))
    }

    pub fn get(&self) -> isize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn increment(&self) -> isize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn decrement(&self) -> isize {
        self.0.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn swap(&self, value: isize) -> isize {
        self.0.swap(value, Ordering::SeqCst)
    }
}

/// A test-and-set spinlock built on atomic exchange.
///
/// Intended for short critical sections; waiters spin with exponential
/// backoff instead of parking.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    pub fn new() -> Self {
        SpinLock {
            locked: AtomicBool::new(false),
        }
    }

    pub fn acquire(&self) -> SpinGuard<'_> {
        let backoff = Backoff::new();
        while self.locked.swap(true, Ordering::Acquire) {
            backoff.snooze();
        }
        SpinGuard { lock: self }
    }

    pub fn try_acquire(&self) -> Option<SpinGuard<'_>> {
        if self.locked.swap(true, Ordering::Acquire) {
            None
        } else {
            Some(SpinGuard { lock: self })
        }
    }
}

/// Releases the lock on drop.
#[derive(Debug)]
pub struct SpinGuard<'a> {
    lock: &'a SpinLock,
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// A joinable worker thread.
#[derive(Debug)]
pub struct Task<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> Task<T> {
    pub fn spawn(work: impl FnOnce() -> T + Send + 'static) -> Self {
        Task {
            handle: thread::spawn(work),
        }
    }

    /// Wait for the task and return its result; a panicked task surfaces
    /// as `Err` with the panic payload.
    pub fn join(self) -> thread::Result<T> {
        self.handle.join()
    }
}
