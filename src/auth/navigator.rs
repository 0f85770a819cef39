//! Navigation capability used by the session guard.

use std::sync::Mutex;

/// Where the user currently is, and how to send them elsewhere.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

/// Tracks a location in memory and records every redirect.
#[derive(Debug)]
pub struct MemoryNavigator {
    state: Mutex<NavState>,
}

#[derive(Debug)]
struct NavState {
    location: String,
    redirects: Vec<String>,
}

impl MemoryNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(NavState {
                location: location.into(),
                redirects: Vec::new(),
            }),
        }
    }

    /// Every target passed to `navigate`, in order.
    pub fn redirects(&self) -> Vec<String> {
        self.state.lock().expect("navigator mutex poisoned").redirects.clone()
    }

    pub fn set_location(&self, location: impl Into<String>) {
        self.state.lock().expect("navigator mutex poisoned").location = location.into();
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.state.lock().expect("navigator mutex poisoned").location.clone()
    }

    fn navigate(&self, path: &str) {
        let mut state = self.state.lock().expect("navigator mutex poisoned");
        state.location = path.to_string();
        state.redirects.push(path.to_string());
    }
}

/// Headless navigator: logs the redirect instead of performing it.
#[derive(Debug, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn current_path(&self) -> String {
        "/".to_string()
    }

    fn navigate(&self, path: &str) {
        tracing::warn!(target_path = %path, "Session expired, sign in again");
    }
}
