use std::rc::Rc;
use std::sync::Arc;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

/// Byte progress reported by an asset source for a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadEvent {
    pub resource_url: String,
    pub bytes_loaded: u64,
    pub bytes_total: u64,
}

impl LoadEvent {
    pub fn new(resource_url: impl Into<String>, bytes_loaded: u64, bytes_total: u64) -> Self {
        Self {
            resource_url: resource_url.into(),
            bytes_loaded,
            bytes_total,
        }
    }
}

/// Last progress value written to the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressState {
    pub percent_complete: f32,
}

/// Output surface for load progress (a DOM progress bar, a terminal bar, a test double).
pub trait ProgressSink {
    fn set_percent(&self, percent: f32);
    fn set_visible(&self, visible: bool);
}

impl<T> ProgressSink for Arc<T>
where
    T: ProgressSink + ?Sized,
{
    fn set_percent(&self, percent: f32) {
        (**self).set_percent(percent)
    }

    fn set_visible(&self, visible: bool) {
        (**self).set_visible(visible)
    }
}

impl<T> ProgressSink for Rc<T>
where
    T: ProgressSink + ?Sized,
{
    fn set_percent(&self, percent: f32) {
        (**self).set_percent(percent)
    }

    fn set_visible(&self, visible: bool) {
        (**self).set_visible(visible)
    }
}


#[cfg(test)]
pub(crate) use recording::RecordingSink;

/// Callback handlers for a load session, writing into a [`ProgressSink`].
pub struct ProgressTracker {
    sink: Box<dyn ProgressSink>,
    state: ProgressState,
}

impl ProgressTracker {
    pub fn new(sink: impl ProgressSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            state: ProgressState::default(),
        }
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn on_session_start(&mut self, resource_url: &str, item_index: usize, total_items: usize) {
        self.state = ProgressState::default();
        info!("load session started: {resource_url} (item {item_index} of {total_items})");
    }

    /// Writes `bytes_loaded / bytes_total` as a percentage.
    ///
    /// A zero total leaves the indicator untouched instead of writing a non-finite value.
    pub fn on_progress(&mut self, resource_url: &str, bytes_loaded: u64, bytes_total: u64) {
        if bytes_total == 0 {
            warn!("ignoring progress for {resource_url}: total size is unknown");
            return;
        }
        let percent = (bytes_loaded as f64 / bytes_total as f64 * 100.0).clamp(0.0, 100.0) as f32;
        self.state.percent_complete = percent;
        self.sink.set_percent(percent);
    }

    pub fn on_event(&mut self, event: &LoadEvent) {
        self.on_progress(&event.resource_url, event.bytes_loaded, event.bytes_total);
    }

    pub fn on_session_complete(&mut self) {
        self.sink.set_visible(false);
    }

    pub fn on_session_error(&mut self, resource_url: &str) {
        error!("failed to load {resource_url}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> (ProgressTracker, RecordingSink) {
        let sink = RecordingSink::new();
        (ProgressTracker::new(sink.clone()), sink)
    }

    #[test]
    fn quarter_progress_writes_twenty_five() {
        let (mut tracker, sink) = tracker();
        tracker.on_progress("env.hdr", 50, 200);
        assert_eq!(sink.percent(), Some(25.0));
        assert_eq!(tracker.state().percent_complete, 25.0);
    }

    #[test]
    fn percent_matches_ratio_for_valid_inputs() {
        let (mut tracker, sink) = tracker();
        for total in [1u64, 3, 7, 200, 4096, 1 << 40] {
            for loaded in [0, total / 3, total / 2, total] {
                tracker.on_progress("asset", loaded, total);
                let expected = (loaded as f64 / total as f64 * 100.0) as f32;
                let written = sink.percent().unwrap();
                assert!((written - expected).abs() < 1e-4, "{loaded}/{total}");
                assert!((0.0..=100.0).contains(&written));
            }
        }
    }

    #[test]
    fn zero_total_is_ignored() {
        let (mut tracker, sink) = tracker();
        tracker.on_progress("font.json", 10, 0);
        assert_eq!(sink.percent(), None);
        tracker.on_progress("font.json", 5, 10);
        tracker.on_progress("font.json", 7, 0);
        assert_eq!(sink.percent(), Some(50.0));
        assert!(sink.history().iter().all(|value| value.is_finite()));
    }

    #[test]
    fn overshoot_is_clamped() {
        let (mut tracker, sink) = tracker();
        tracker.on_progress("env.hdr", 300, 200);
        assert_eq!(sink.percent(), Some(100.0));
    }

    #[test]
    fn completion_is_idempotent() {
        let (mut tracker, sink) = tracker();
        assert!(sink.is_visible());
        tracker.on_session_complete();
        assert!(!sink.is_visible());
        tracker.on_session_complete();
        assert!(!sink.is_visible());
    }

    #[test]
    fn start_and_error_leave_indicator_alone() {
        let (mut tracker, sink) = tracker();
        tracker.on_session_start("env.hdr", 0, 1);
        tracker.on_session_error("env.hdr");
        assert_eq!(sink.percent(), None);
        assert!(sink.is_visible());
    }
}
