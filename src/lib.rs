#![deny(clippy::shadow_unrelated)]
//
// If code coverage tool `cargo-llvm-cov` is running with the nightly toolchain,
// enable the unstable “coverage” attribute. This allows using the annotation
// `#[coverage(off)]` to explicitly exclude certain parts of the code from
// being considered as “code under test.” Most prominently, the annotation
// should be added to every `#[cfg(test)]` module. Since the “coverage”
// feature is enable only conditionally, the annotation to use is:
// `#[cfg_attr(coverage_nightly, coverage(off))]`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod application;
pub mod state;

pub use state::wallet::address::KeyId;
pub use state::wallet::address::PaymentAddress;
pub use state::wallet::address::SpendingKey;
pub use state::wallet::address::TransparentPublicKey;
pub use state::wallet::address::TransparentSecretKey;
pub use state::wallet::address::ViewingKey;
pub use state::wallet::crypto_key_store::CryptoKeyStore;
pub use state::wallet::crypto_key_store::KeyStoreError;
pub use state::wallet::crypto_key_store::KeyStoreEvent;
pub use state::wallet::crypto_key_store::LockStatus;
pub use state::wallet::encryption::Crypter;
pub use state::wallet::encryption::KeyingMaterial;
pub use state::wallet::encryption::MasterKeyRecord;
pub use state::wallet::encryption::SecureString;

use crate::application::locks::std as sync_std;

#[cfg(any(test, feature = "log-lock_events"))]
pub(crate) fn current_thread_id() -> u64 {
    // workaround: parse thread_id debug output into a u64.
    // (because ThreadId::as_u64() is unstable)
    let thread_id_dbg: String = format!("{:?}", std::thread::current().id());
    thread_id_dbg
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse::<u64>()
        .unwrap_or_default()
}

// This is a callback fn passed to AtomicRw, AtomicMutex
// and called when a lock event occurs.  This way
// we can track which threads are acquiring
// which locks for reads and/or mutations.
pub(crate) fn log_lock_event_cb(lock_event: sync_std::LockEvent) {
    #[cfg(feature = "log-lock_events")]
    log_lock_event(&lock_event);

    #[cfg(not(feature = "log-lock_events"))]
    let _ = lock_event;
}

// notes:
//   1. this feature is very verbose in the logs.
//   2. It's not really needed except when debugging lock acquisitions
#[cfg(feature = "log-lock_events")]
pub(crate) fn log_lock_event(lock_event: &sync_std::LockEvent) {
    let location_str = match lock_event.location() {
        Some(l) => format!("\n\t|-- acquirer: {}", l),
        None => String::default(),
    };
    let held_str = match lock_event.held_for() {
        Some(d) => format!("\n\t|-- held: {} secs", d.as_secs_f32()),
        None => String::default(),
    };

    let info = lock_event.info();

    tracing::trace!(
        ?lock_event,
        "{} lock `{}` of type `{}` for `{}` by\n\t|-- thread {}, (`{}`){}{}\n\t|--",
        lock_event.event_type_name(),
        info.name().unwrap_or("?"),
        info.lock_type(),
        lock_event.acquisition(),
        current_thread_id(),
        std::thread::current().name().unwrap_or("?"),
        location_str,
        held_str,
    );
}

const LOG_LOCK_EVENT_CB: sync_std::LockCallbackFn = log_lock_event_cb;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn thread_ids_are_parsed() {
        let here = current_thread_id();
        let there = std::thread::spawn(current_thread_id).join().unwrap();

        assert_ne!(here, there);
    }
}
