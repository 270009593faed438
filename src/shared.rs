//! A [`ChannelManager`] behind a critical-section mutex.
//!
//! The manager itself is single-owner. Put it in a [`SharedChannelManager`] (usually in a
//! `static` via `StaticCell`) when several tasks or an interrupt handler need it.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::channel_manager::ChannelManager;

/// Interrupt-safe shared access to one [`ChannelManager`].
pub struct SharedChannelManager<D, M, const N: usize> {
    manager: Mutex<CriticalSectionRawMutex, RefCell<ChannelManager<D, M, N>>>,
}

impl<D, M, const N: usize> SharedChannelManager<D, M, N> {
    /// Wrap `manager`.
    #[must_use]
    pub const fn new(manager: ChannelManager<D, M, N>) -> Self {
        Self {
            manager: Mutex::new(RefCell::new(manager)),
        }
    }

    /// Run `f` with exclusive access inside a critical section. Keep `f` short and do not
    /// call `lock` again from inside it.
    pub fn lock<R>(&self, f: impl FnOnce(&mut ChannelManager<D, M, N>) -> R) -> R {
        self.manager.lock(|manager| f(&mut manager.borrow_mut()))
    }

    /// Take the manager back.
    pub fn into_inner(self) -> ChannelManager<D, M, N> {
        self.manager.into_inner().into_inner()
    }
}
