#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::{
        cell::UnsafeCell,
        sync::{
            Mutex, MutexGuard,
            atomic::{AtomicU8, AtomicU64, Ordering},
        },
        thread_local,
    };

    pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap()
    }

    /// Loom must observe every busy-wait iteration as a yield point.
    pub(crate) fn spin_loop() {
        loom::thread::yield_now();
    }
}

#[cfg(not(feature = "loom"))]
mod imp {
    use crate::types::SyncUnsafeCell;
    pub(crate) use core::{
        cell::UnsafeCell,
        sync::atomic::{AtomicU8, AtomicU64, Ordering},
    };
    pub(crate) use parking_lot::{Mutex, MutexGuard};
    pub(crate) use std::thread_local;

    #[inline]
    pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock()
    }

    #[inline]
    pub(crate) fn spin_loop() {
        core::hint::spin_loop();
    }

    pub(crate) trait LoomPtrCompat: Sized {
        type Ptr;
        fn with<R>(self, f: impl FnOnce(Self::Ptr) -> R) -> R;
    }

    impl<T> LoomPtrCompat for *mut T {
        type Ptr = *mut T;
        fn with<R>(self, f: impl FnOnce(Self::Ptr) -> R) -> R {
            f(self)
        }
    }

    pub(crate) trait LoomUnsafeCellCompat<T> {
        fn get_mut(&self) -> impl LoomPtrCompat<Ptr = *mut T>;
    }

    impl<T> LoomUnsafeCellCompat<T> for SyncUnsafeCell<T> {
        fn get_mut(&self) -> impl LoomPtrCompat<Ptr = *mut T> {
            self.get()
        }
    }
}

pub(crate) use imp::*;
