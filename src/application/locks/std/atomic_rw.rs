use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use super::shared::caller_location;
use super::shared::now;
use super::LockAcquisition;
use super::LockCallbackFn;
use super::LockCallbackInfo;
use super::LockType;

/// An `Arc<RwLock<T>>` wrapper to make data thread-safe and easy to work with.
///
/// # Example
/// ```
/// # use neptune_keystore::application::locks::std::AtomicRw;
/// struct Car {
///     year: u16,
/// };
/// let atomic_car = AtomicRw::from(Car{year: 2016});
/// atomic_car.lock(|c| println!("year: {}", c.year));
/// atomic_car.lock_mut(|c| c.year = 2023);
/// ```
///
/// Poisoning is recovered the same way as for
/// [`AtomicMutex`](super::AtomicMutex).
#[derive(Debug)]
pub struct AtomicRw<T> {
    inner: Arc<RwLock<T>>,
    lock_callback_info: LockCallbackInfo,
}

impl<T: Default> Default for AtomicRw<T> {
    fn default() -> Self {
        Self {
            inner: Default::default(),
            lock_callback_info: LockCallbackInfo::new(LockType::RwLock, None, None),
        }
    }
}

impl<T> From<T> for AtomicRw<T> {
    #[inline]
    fn from(t: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(t)),
            lock_callback_info: LockCallbackInfo::new(LockType::RwLock, None, None),
        }
    }
}

impl<T> From<(T, Option<&'static str>, Option<LockCallbackFn>)> for AtomicRw<T> {
    /// Create from a name and an optional callback function, which
    /// is called when a lock event occurs.
    #[inline]
    fn from(v: (T, Option<&'static str>, Option<LockCallbackFn>)) -> Self {
        Self {
            inner: Arc::new(RwLock::new(v.0)),
            lock_callback_info: LockCallbackInfo::new(LockType::RwLock, v.1, v.2),
        }
    }
}

impl<T> Clone for AtomicRw<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            lock_callback_info: self.lock_callback_info,
        }
    }
}

impl<T> AtomicRw<T> {
    /// Acquire read lock and return an `AtomicRwReadGuard`
    ///
    /// # Examples
    /// ```
    /// # use neptune_keystore::application::locks::std::AtomicRw;
    /// struct Car {
    ///     year: u16,
    /// };
    /// let atomic_car = AtomicRw::from(Car{year: 2016});
    /// let year = atomic_car.lock_guard().year;
    /// ```
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    pub fn lock_guard(&self) -> AtomicRwReadGuard<'_, T> {
        self.lock_callback_info.try_acquire(LockAcquisition::Read);
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        AtomicRwReadGuard::new(guard, &self.lock_callback_info)
    }

    /// Acquire write lock and return an `AtomicRwWriteGuard`
    ///
    /// # Examples
    /// ```
    /// # use neptune_keystore::application::locks::std::AtomicRw;
    /// struct Car {
    ///     year: u16,
    /// };
    /// let atomic_car = AtomicRw::from(Car{year: 2016});
    /// atomic_car.lock_guard_mut().year = 2022;
    /// ```
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    pub fn lock_guard_mut(&self) -> AtomicRwWriteGuard<'_, T> {
        self.lock_callback_info.try_acquire(LockAcquisition::Write);
        let guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        AtomicRwWriteGuard::new(guard, &self.lock_callback_info)
    }

    /// Immutably access the data of type `T` in a closure and possibly return a result of type `R`
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    pub fn lock<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let guard = self.lock_guard();
        f(&guard)
    }

    /// Mutably access the data of type `T` in a closure and possibly return a result of type `R`
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    pub fn lock_mut<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.lock_guard_mut();
        f(&mut guard)
    }
}

/// A wrapper for [RwLockReadGuard] that can optionally call a callback to notify
/// when the lock is acquired or released.
#[derive(Debug)]
pub struct AtomicRwReadGuard<'a, T> {
    guard: RwLockReadGuard<'a, T>,
    lock_callback_info: &'a LockCallbackInfo,
    acquire_at: Option<std::time::Instant>,
    location: Option<&'static core::panic::Location<'static>>,
}

impl<'a, T> AtomicRwReadGuard<'a, T> {
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    fn new(guard: RwLockReadGuard<'a, T>, lock_callback_info: &'a LockCallbackInfo) -> Self {
        let my_guard = Self {
            guard,
            lock_callback_info,
            acquire_at: now(),
            location: caller_location(),
        };
        lock_callback_info.acquired(
            LockAcquisition::Read,
            my_guard.acquire_at,
            my_guard.location,
        );
        my_guard
    }
}

impl<T> Drop for AtomicRwReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock_callback_info
            .released(LockAcquisition::Read, self.acquire_at, self.location);
    }
}

impl<T> Deref for AtomicRwReadGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// A wrapper for [RwLockWriteGuard] that can optionally call a callback to notify
/// when the lock is acquired or released.
#[derive(Debug)]
pub struct AtomicRwWriteGuard<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
    lock_callback_info: &'a LockCallbackInfo,
    acquire_at: Option<std::time::Instant>,
    location: Option<&'static core::panic::Location<'static>>,
}

impl<'a, T> AtomicRwWriteGuard<'a, T> {
    #[cfg_attr(feature = "track-lock-location", track_caller)]
    fn new(guard: RwLockWriteGuard<'a, T>, lock_callback_info: &'a LockCallbackInfo) -> Self {
        let my_guard = Self {
            guard,
            lock_callback_info,
            acquire_at: now(),
            location: caller_location(),
        };
        lock_callback_info.acquired(
            LockAcquisition::Write,
            my_guard.acquire_at,
            my_guard.location,
        );
        my_guard
    }
}

impl<T> Drop for AtomicRwWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock_callback_info
            .released(LockAcquisition::Write, self.acquire_at, self.location);
    }
}

impl<T> Deref for AtomicRwWriteGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for AtomicRwWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
