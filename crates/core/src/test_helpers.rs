//! Shared test helpers.

use std::sync::{Mutex, MutexGuard};

/// Process env is global; tests touching it take this lock.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Puts the saved values back on drop, panicking test or not.
struct EnvRestore {
    saved: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            set_or_remove(&key, value.as_deref());
        }
    }
}

fn set_or_remove(key: &str, value: Option<&str>) {
    // SAFETY: callers hold ENV_LOCK, so no other test reads env concurrently.
    unsafe {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
}

/// Run `f` with the given variables set (`Some`) or unset (`None`).
pub fn with_env_overrides<T>(updates: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _restore = EnvRestore {
        saved: updates
            .iter()
            .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
            .collect(),
        _lock: lock,
    };
    for (key, value) in updates {
        set_or_remove(key, *value);
    }
    f()
}
