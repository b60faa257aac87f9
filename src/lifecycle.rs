use log::{debug, info};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

/// Broadcasts foreground/background transitions of the app
pub struct AppLifecycle {
    sender: watch::Sender<AppState>,
}

impl Default for AppLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl AppLifecycle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(AppState::Active);
        Self { sender }
    }

    pub fn state(&self) -> AppState {
        *self.sender.borrow()
    }

    pub fn set_state(&self, state: AppState) {
        let previous = self.sender.send_replace(state);
        if previous != state {
            info!("App state {:?} -> {:?}", previous, state);
        }
    }

    pub fn subscribe(&self) -> LifecycleSubscription {
        let receiver = self.sender.subscribe();
        let last = *receiver.borrow();
        LifecycleSubscription { receiver, last }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Listener held by a mounted screen; dropping it unsubscribes
pub struct LifecycleSubscription {
    receiver: watch::Receiver<AppState>,
    last: AppState,
}

impl LifecycleSubscription {
    /// Transitions seen since the last call, collapsed to the latest state
    pub fn poll(&mut self) -> Option<(AppState, AppState)> {
        if !self.receiver.has_changed().unwrap_or(false) {
            return None;
        }
        let current = *self.receiver.borrow_and_update();
        let previous = std::mem::replace(&mut self.last, current);
        if is_foreground_transition(previous, current) {
            debug!("App returned to foreground from {:?}", previous);
        }
        (previous != current).then_some((previous, current))
    }
}

pub fn is_foreground_transition(previous: AppState, current: AppState) -> bool {
    previous != AppState::Active && current == AppState::Active
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreground_transition() {
        assert!(is_foreground_transition(AppState::Background, AppState::Active));
        assert!(is_foreground_transition(AppState::Inactive, AppState::Active));
        assert!(!is_foreground_transition(AppState::Active, AppState::Active));
        assert!(!is_foreground_transition(AppState::Active, AppState::Background));
    }

    #[test]
    fn test_poll_collapses_changes() {
        let lifecycle = AppLifecycle::new();
        let mut subscription = lifecycle.subscribe();
        assert_eq!(subscription.poll(), None);

        lifecycle.set_state(AppState::Inactive);
        lifecycle.set_state(AppState::Background);
        assert_eq!(subscription.poll(), Some((AppState::Active, AppState::Background)));
        assert_eq!(subscription.poll(), None);
    }

    #[test]
    fn test_poll_reports_foreground_return() {
        let lifecycle = AppLifecycle::new();
        let mut subscription = lifecycle.subscribe();

        lifecycle.set_state(AppState::Background);
        assert!(subscription.poll().is_some());
        lifecycle.set_state(AppState::Active);
        let (previous, current) = subscription.poll().unwrap();
        assert!(is_foreground_transition(previous, current));
    }

    #[test]
    fn test_poll_after_source_dropped() {
        let lifecycle = AppLifecycle::new();
        let mut subscription = lifecycle.subscribe();
        lifecycle.set_state(AppState::Background);
        drop(lifecycle);
        assert_eq!(subscription.poll(), None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let lifecycle = AppLifecycle::new();
        let subscription = lifecycle.subscribe();
        assert_eq!(lifecycle.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(lifecycle.subscriber_count(), 0);
    }
}
