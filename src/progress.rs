//! Bar-style progress reporting back to the host.

/// Observer invoked with `(current, total)` after every update.
pub type ProgressHook = Box<dyn FnMut(u64, u64) + Send>;

/// Step counter with a fixed total estimate.
///
/// The total is only an estimate, so `current` saturates at `total` rather
/// than overshooting it.
pub struct ProgressBar {
    total: u64,
    current: u64,
    hook: Option<ProgressHook>,
}

impl ProgressBar {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            current: 0,
            hook: None,
        }
    }

    /// Attach an observer, e.g. the host UI channel.
    pub fn with_hook(mut self, hook: ProgressHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Advance by `steps`.
    pub fn update(&mut self, steps: u64) {
        self.current = self.current.saturating_add(steps).min(self.total);
        tracing::trace!(current = self.current, total = self.total, "progress");
        if let Some(hook) = self.hook.as_mut() {
            hook(self.current, self.total);
        }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl std::fmt::Debug for ProgressBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBar")
            .field("total", &self.total)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn update_saturates_at_total() {
        let mut bar = ProgressBar::new(3);
        for _ in 0..5 {
            bar.update(1);
        }
        assert_eq!(bar.current(), 3);
        assert_eq!(bar.total(), 3);
    }

    #[test]
    fn hook_sees_every_update() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut bar = ProgressBar::new(10).with_hook(Box::new(move |current: u64, total: u64| {
            sink.lock().unwrap().push((current, total));
        }));
        bar.update(1);
        bar.update(2);
        assert_eq!(*seen.lock().unwrap(), vec![(1, 10), (3, 10)]);
    }
}
