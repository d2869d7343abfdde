/// Indicates the lock's underlying type
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LockType {
    Mutex,
    RwLock,
}

/// Indicates how a lock was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LockAcquisition {
    Read,
    Write,
}

/// Contains metadata about a lock
#[derive(Debug, Clone, Copy)]
pub struct LockInfo {
    name: Option<&'static str>,
    lock_type: LockType,
}

impl LockInfo {
    pub(super) fn new(lock_type: LockType, name: Option<&'static str>) -> Self {
        Self { name, lock_type }
    }

    /// get the lock's name
    #[inline]
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// get the lock's type
    #[inline]
    pub fn lock_type(&self) -> LockType {
        self.lock_type
    }
}

/// Represents an event (acquire/release) for a lock
#[derive(Debug, Clone, Copy)]
pub enum LockEvent {
    TryAcquire {
        info: LockInfo,
        acquisition: LockAcquisition,
        location: Option<&'static core::panic::Location<'static>>,
    },
    Acquire {
        info: LockInfo,
        acquisition: LockAcquisition,
        acquire_at: Option<std::time::Instant>,
        location: Option<&'static core::panic::Location<'static>>,
    },
    Release {
        info: LockInfo,
        acquisition: LockAcquisition,
        acquire_at: Option<std::time::Instant>,
        location: Option<&'static core::panic::Location<'static>>,
    },
}

impl LockEvent {
    pub fn event_type_name(&self) -> &'static str {
        match self {
            Self::TryAcquire { .. } => "TryAcquire",
            Self::Acquire { .. } => "Acquire",
            Self::Release { .. } => "Release",
        }
    }

    pub fn info(&self) -> LockInfo {
        match self {
            Self::TryAcquire { info, .. }
            | Self::Acquire { info, .. }
            | Self::Release { info, .. } => *info,
        }
    }

    pub fn acquisition(&self) -> LockAcquisition {
        match self {
            Self::TryAcquire { acquisition, .. }
            | Self::Acquire { acquisition, .. }
            | Self::Release { acquisition, .. } => *acquisition,
        }
    }

    pub fn location(&self) -> Option<&'static core::panic::Location<'static>> {
        match self {
            Self::TryAcquire { location, .. }
            | Self::Acquire { location, .. }
            | Self::Release { location, .. } => *location,
        }
    }

    /// how long the lock has been held, only known for release events when
    /// the `track-lock-time` feature is enabled.
    pub fn held_for(&self) -> Option<std::time::Duration> {
        match self {
            Self::Release { acquire_at, .. } => acquire_at.map(|t| t.elapsed()),
            _ => None,
        }
    }
}

/// A callback fn for receiving [LockEvent] event
/// each time a lock is acquired or released.
pub type LockCallbackFn = fn(lock_event: LockEvent);

#[derive(Debug, Clone, Copy)]
pub(super) struct LockCallbackInfo {
    pub info: LockInfo,
    pub lock_callback_fn: Option<LockCallbackFn>,
}

impl LockCallbackInfo {
    pub fn new(
        lock_type: LockType,
        name: Option<&'static str>,
        lock_callback_fn: Option<LockCallbackFn>,
    ) -> Self {
        Self {
            info: LockInfo::new(lock_type, name),
            lock_callback_fn,
        }
    }

    #[cfg_attr(feature = "track-lock-location", track_caller)]
    pub fn try_acquire(&self, acquisition: LockAcquisition) {
        if let Some(cb) = self.lock_callback_fn {
            cb(LockEvent::TryAcquire {
                info: self.info,
                acquisition,
                location: caller_location(),
            });
        }
    }

    pub fn acquired(
        &self,
        acquisition: LockAcquisition,
        acquire_at: Option<std::time::Instant>,
        location: Option<&'static core::panic::Location<'static>>,
    ) {
        if let Some(cb) = self.lock_callback_fn {
            cb(LockEvent::Acquire {
                info: self.info,
                acquisition,
                acquire_at,
                location,
            });
        }
    }

    pub fn released(
        &self,
        acquisition: LockAcquisition,
        acquire_at: Option<std::time::Instant>,
        location: Option<&'static core::panic::Location<'static>>,
    ) {
        if let Some(cb) = self.lock_callback_fn {
            cb(LockEvent::Release {
                info: self.info,
                acquisition,
                acquire_at,
                location,
            });
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
#[cfg(feature = "track-lock-location")]
#[track_caller]
pub(super) fn caller_location() -> Option<&'static core::panic::Location<'static>> {
    Some(core::panic::Location::caller())
}

#[cfg(not(feature = "track-lock-location"))]
pub(super) fn caller_location() -> Option<&'static core::panic::Location<'static>> {
    None
}

#[allow(clippy::unnecessary_wraps)]
#[cfg(feature = "track-lock-time")]
pub(super) fn now() -> Option<std::time::Instant> {
    Some(std::time::Instant::now())
}

#[cfg(not(feature = "track-lock-time"))]
pub(super) fn now() -> Option<std::time::Instant> {
    None
}
