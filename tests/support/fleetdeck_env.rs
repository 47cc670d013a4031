use std::{
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};

const CONFIG_HOME_ENV: &str = "FLEETDECK_CONFIG_HOME";
const API_URL_ENV: &str = "FLEETDECK_API_URL";

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Points the dashboard's config lookups at a temp dir for the guard's lifetime.
pub struct FleetdeckEnvGuard {
    previous: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl FleetdeckEnvGuard {
    pub fn set_config_home(path: PathBuf) -> Self {
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let mut guard = Self {
            previous: Vec::new(),
            _lock: lock,
        };
        guard.set(CONFIG_HOME_ENV, Some(path.to_string_lossy().into_owned()));
        guard.set(API_URL_ENV, None);
        guard
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.set(API_URL_ENV, Some(url.to_string()));
        self
    }

    fn set(&mut self, key: &'static str, value: Option<String>) {
        if !self.previous.iter().any(|(saved, _)| *saved == key) {
            self.previous.push((key, std::env::var(key).ok()));
        }
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        unsafe {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

impl Drop for FleetdeckEnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            // SAFETY: tests run under a global lock to prevent concurrent env mutations.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
