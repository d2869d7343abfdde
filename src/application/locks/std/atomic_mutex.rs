use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use super::shared::caller_location;
use super::shared::now;
use super::LockAcquisition;
use super::LockCallbackFn;
use super::LockCallbackInfo;
use super::LockType;

/// An `Arc<Mutex<T>>` wrapper to make data thread-safe and easy to work with.
///
/// # Examples
/// ```
/// # use neptune_keystore::application::locks::std::AtomicMutex;
/// struct Car {
///     year: u16,
/// };
/// let atomic_car = AtomicMutex::from(Car{year: 2016});
/// atomic_car.lock(|c| {println!("year: {}", c.year)});
/// atomic_car.lock_mut(|c| {c.year = 2023});
/// ```
///
/// It is also possible to provide a name and callback fn
/// during instantiation.  In this way, the application
/// can easily trace lock acquisitions.
///
/// A poisoned mutex is recovered rather than propagated as a panic. Callers
/// that mutate the protected data must leave it consistent at every point a
/// panic could occur.
#[derive(Debug)]
pub struct AtomicMutex<T> {
    inner: Arc<Mutex<T>>,
    lock_callback_info: LockCallbackInfo,
}

impl<T: Default> Default for AtomicMutex<T> {
    fn default() -> Self {
        Self {
            inner: Default::default(),
            lock_callback_info: LockCallbackInfo::new(LockType::Mutex, None, None),
        }
    }
}

impl<T> From<T> for AtomicMutex<T> {
    #[inline]
    fn from(t: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(t)),
            lock_callback_info: LockCallbackInfo::new(LockType::Mutex, None, None),
        }
    }
}

impl<T> From<(T, Option<&'static str>, Option<LockCallbackFn>)> for AtomicMutex<T> {
    /// Create from a name and an optional callback function, which
    /// is called when a lock event occurs.
    #[inline]
    fn from(v: (T, Option<&'static str>, Option<LockCallbackFn>)) -> Self {
        Self {
            inner: Arc::new(Mutex::new(v.0)),
            lock_callback_info: LockCallbackInfo::new(LockType::Mutex, v.1, v.2),
        }
    }
}

impl<T> Clone for AtomicMutex<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            lock_callback_info: self.lock_callback_info,
        }
    }
}

impl<T> AtomicMutex<T> {
    /// Acquire the lock and return an `AtomicMutexGuard`
    ///
    /// # Examples
    /// ```
    /// # use neptune_keystore::application::locks::std::AtomicMutex;
    /// struct Car {
    ///     year: u16,
    /// };
    /// let atomic_car = AtomicMutex::from(Car{year: 2016});
    /// atomic_car.lock_guard().year = 2022;
    /// ```
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    pub fn lock_guard(&self) -> AtomicMutexGuard<'_, T> {
        self.lock_callback_info.try_acquire(LockAcquisition::Write);

        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        AtomicMutexGuard::new(guard, &self.lock_callback_info, LockAcquisition::Write)
    }

    /// Immutably access the data of type `T` in a closure and possibly return a result of type `R`
    ///
    /// # Examples
    /// ```
    /// # use neptune_keystore::application::locks::std::AtomicMutex;
    /// struct Car {
    ///     year: u16,
    /// };
    /// let atomic_car = AtomicMutex::from(Car{year: 2016});
    /// atomic_car.lock(|c| println!("year: {}", c.year));
    /// let year = atomic_car.lock(|c| c.year);
    /// ```
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    pub fn lock<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.lock_callback_info.try_acquire(LockAcquisition::Read);

        let inner_guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let guard =
            AtomicMutexGuard::new(inner_guard, &self.lock_callback_info, LockAcquisition::Read);
        f(&guard)
    }

    /// Mutably access the data of type `T` in a closure and possibly return a result of type `R`
    ///
    /// # Examples
    /// ```
    /// # use neptune_keystore::application::locks::std::AtomicMutex;
    /// struct Car {
    ///     year: u16,
    /// };
    /// let atomic_car = AtomicMutex::from(Car{year: 2016});
    /// atomic_car.lock_mut(|c| c.year = 2022);
    /// let year = atomic_car.lock_mut(|c| {c.year = 2023; c.year});
    /// ```
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    pub fn lock_mut<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.lock_callback_info.try_acquire(LockAcquisition::Write);

        let inner_guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut guard =
            AtomicMutexGuard::new(inner_guard, &self.lock_callback_info, LockAcquisition::Write);
        f(&mut guard)
    }
}

/// A wrapper for [MutexGuard] that can optionally call a callback to notify
/// when the lock event occurs.
#[derive(Debug)]
pub struct AtomicMutexGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    lock_callback_info: &'a LockCallbackInfo,
    acquisition: LockAcquisition,
    acquire_at: Option<std::time::Instant>,
    location: Option<&'static core::panic::Location<'static>>,
}

impl<'a, T> AtomicMutexGuard<'a, T> {
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    fn new(
        guard: MutexGuard<'a, T>,
        lock_callback_info: &'a LockCallbackInfo,
        acquisition: LockAcquisition,
    ) -> Self {
        let my_guard = Self {
            guard,
            lock_callback_info,
            acquisition,
            acquire_at: now(),
            location: caller_location(),
        };
        lock_callback_info.acquired(acquisition, my_guard.acquire_at, my_guard.location);
        my_guard
    }
}

impl<T> Drop for AtomicMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.lock_callback_info
            .released(self.acquisition, self.acquire_at, self.location);
    }
}

impl<T> Deref for AtomicMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for AtomicMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::application::locks::std::LockEvent;

    /// Verify (compile-time) that AtomicMutex:.lock() and :.lock_mut() accept
    /// mutable values. (FnMut)
    #[test]
    fn mutable_assignment() {
        let name = "Jim".to_string();
        let atomic_name = AtomicMutex::from(name);

        let mut new_name = String::new();
        atomic_name.lock_mut(|n| *n = "Sally".to_string());
        atomic_name.lock(|n| new_name = n.to_string());
        assert_eq!("Sally", new_name);
    }

    #[test]
    fn callback_sees_acquire_and_release() {
        static ACQUIRED: AtomicUsize = AtomicUsize::new(0);
        static RELEASED: AtomicUsize = AtomicUsize::new(0);

        fn count_events(lock_event: LockEvent) {
            assert_eq!(Some("counter"), lock_event.info().name());
            match lock_event {
                LockEvent::Acquire { .. } => ACQUIRED.fetch_add(1, Ordering::SeqCst),
                LockEvent::Release { .. } => RELEASED.fetch_add(1, Ordering::SeqCst),
                LockEvent::TryAcquire { .. } => 0,
            };
        }

        const COUNT_EVENTS_CB: LockCallbackFn = count_events;
        let counter = AtomicMutex::<u32>::from((0, Some("counter"), Some(COUNT_EVENTS_CB)));
        counter.lock_mut(|c| *c += 1);
        let value = counter.lock(|c| *c);

        assert_eq!(1, value);
        assert_eq!(2, ACQUIRED.load(Ordering::SeqCst));
        assert_eq!(2, RELEASED.load(Ordering::SeqCst));
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let atomic_value = AtomicMutex::from(7u8);
        let clone = atomic_value.clone();
        let _ = std::thread::spawn(move || {
            clone.lock_mut(|_| panic!("poison the mutex"));
        })
        .join();

        assert_eq!(7, atomic_value.lock(|v| *v));
    }
}
