//! Two-state "timer running" indicator driven purely by the timer store.

use crate::timer::{ActiveTimer, StoreError, SubscriptionId, TimerStore};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

pub const ACTIVE_TEXT: &str = "ON";
pub const ACTIVE_COLOR: &str = "#22c55e";

/// Something that can display a short badge: a status file, a log line, a tray icon.
pub trait Indicator: Send + Sync {
    fn show(&self, text: &str, color: &str);
    fn clear(&self);
}

fn render(indicator: &dyn Indicator, timer: Option<&ActiveTimer>) {
    match timer {
        Some(_) => indicator.show(ACTIVE_TEXT, ACTIVE_COLOR),
        None => indicator.clear(),
    }
}

/// Keeps an [`Indicator`] in sync with a store for as long as it lives.
pub struct BadgeNotifier<S: TimerStore> {
    store: Arc<S>,
    subscription: SubscriptionId,
}

impl<S: TimerStore> BadgeNotifier<S> {
    /// Subscribes, then renders the value already in the store so a timer started
    /// before the notifier existed is shown immediately.
    pub fn attach(store: Arc<S>, indicator: Arc<dyn Indicator>) -> Result<Self, StoreError> {
        let listener_indicator = indicator.clone();
        let subscription = store.subscribe(Arc::new(move |timer: Option<&ActiveTimer>| {
            render(listener_indicator.as_ref(), timer);
        }));
        match store.read() {
            Ok(current) => render(indicator.as_ref(), current.as_ref()),
            Err(err) => {
                store.unsubscribe(subscription);
                return Err(err);
            }
        }
        Ok(Self {
            store,
            subscription,
        })
    }
}

impl<S: TimerStore> Drop for BadgeNotifier<S> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

/// Writes the badge text to a file for status bars to pick up; empty when cleared.
pub struct StatusFileIndicator {
    path: PathBuf,
}

impl StatusFileIndicator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write(&self, text: &str) {
        let result = self
            .path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(&self.path, text));
        if let Err(err) = result {
            warn!("Failed to update badge at {}: {}", self.path.display(), err);
        }
    }
}

impl Indicator for StatusFileIndicator {
    fn show(&self, text: &str, _color: &str) {
        self.write(text);
    }

    fn clear(&self) {
        self.write("");
    }
}

pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn show(&self, text: &str, color: &str) {
        info!("Badge: {} ({})", text, color);
    }

    fn clear(&self) {
        info!("Badge cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::MemoryTimerStore;
    use std::env;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl Indicator for Recording {
        fn show(&self, text: &str, color: &str) {
            self.events.lock().unwrap().push(format!("{text} {color}"));
        }

        fn clear(&self) {
            self.events.lock().unwrap().push("clear".to_string());
        }
    }

    #[test]
    fn follows_store_transitions() {
        let store = Arc::new(MemoryTimerStore::new());
        let indicator = Arc::new(Recording::default());
        let _notifier = BadgeNotifier::attach(store.clone(), indicator.clone()).unwrap();

        store.write(Some(ActiveTimer::start_now("10001"))).unwrap();
        store.write(None).unwrap();

        assert_eq!(
            *indicator.events.lock().unwrap(),
            vec!["clear", "ON #22c55e", "clear"]
        );
    }

    #[test]
    fn shows_timer_running_before_attach() {
        let store = Arc::new(MemoryTimerStore::new());
        store.write(Some(ActiveTimer::start_now("10001"))).unwrap();
        let indicator = Arc::new(Recording::default());

        let _notifier = BadgeNotifier::attach(store, indicator.clone()).unwrap();
        assert_eq!(*indicator.events.lock().unwrap(), vec!["ON #22c55e"]);
    }

    #[test]
    fn dropping_notifier_stops_updates() {
        let store = Arc::new(MemoryTimerStore::new());
        let indicator = Arc::new(Recording::default());
        let notifier = BadgeNotifier::attach(store.clone(), indicator.clone()).unwrap();
        drop(notifier);

        store.write(Some(ActiveTimer::start_now("10001"))).unwrap();
        assert_eq!(indicator.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn status_file_holds_badge_text() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = env::temp_dir().join(format!("jiratime-tests-badge-{nanos}"));
        let indicator = StatusFileIndicator::new(dir.join("badge"));

        indicator.show(ACTIVE_TEXT, ACTIVE_COLOR);
        assert_eq!(fs::read_to_string(dir.join("badge")).unwrap(), "ON");
        indicator.clear();
        assert_eq!(fs::read_to_string(dir.join("badge")).unwrap(), "");

        let _ = fs::remove_dir_all(dir);
    }
}
