use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct LockState {
    active_readers: usize,
    writer_active: bool,
    waiting_writers: usize,
}

/// A writer-preferring read/write lock.
///
/// Any number of readers may hold the lock at once; a writer is exclusive.
/// A waiting writer blocks new readers, so bursts of merges cannot be
/// starved by a read-mostly search load; readers queued behind a writer
/// acquire together once it releases.
///
/// Guards release on drop. The lock is not reentrant: acquiring the write
/// side while holding any guard on the same lock deadlocks.
pub struct FairRwLock<T> {
    state: Mutex<LockState>,
    readers: Condvar,
    writers: Condvar,
    data: UnsafeCell<T>,
}

// The UnsafeCell is only dereferenced while the guard protocol below holds:
// shared access under active_readers > 0, exclusive under writer_active.
unsafe impl<T: Send> Send for FairRwLock<T> {}
unsafe impl<T: Send + Sync> Sync for FairRwLock<T> {}

impl<T> FairRwLock<T> {
    pub fn new(data: T) -> Self {
        FairRwLock {
            state: Mutex::new(LockState::default()),
            readers: Condvar::new(),
            writers: Condvar::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Blocks while a writer holds or awaits the lock, then returns a
    /// shared guard.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut state = self.state.lock();
        while state.writer_active || state.waiting_writers > 0 {
            self.readers.wait(&mut state);
        }
        state.active_readers += 1;
        ReadGuard { lock: self }
    }

    /// Blocks until the lock can be held exclusively, then returns an
    /// exclusive guard.
    pub fn write(&self) -> WriteGuard<'_, T> {
        let mut state = self.state.lock();
        state.waiting_writers += 1;
        while state.writer_active || state.active_readers > 0 {
            self.writers.wait(&mut state);
        }
        state.waiting_writers -= 1;
        state.writer_active = true;
        WriteGuard { lock: self }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

pub struct ReadGuard<'a, T> {
    lock: &'a FairRwLock<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.lock.state.lock();
        state.active_readers -= 1;
        if state.active_readers == 0 {
            self.lock.writers.notify_one();
        }
    }
}

pub struct WriteGuard<'a, T> {
    lock: &'a FairRwLock<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.lock.state.lock();
        state.writer_active = false;
        if state.waiting_writers > 0 {
            self.lock.writers.notify_one();
        } else {
            self.lock.readers.notify_all();
        }
    }
}
