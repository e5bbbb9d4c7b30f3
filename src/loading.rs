//! Load-session bookkeeping shared by every asset request.
//!
//! A session opens when the first item starts and closes once every started
//! item has ended, whether it succeeded or failed. Byte progress is summed
//! over all items seen in the session before it reaches the tracker.

use std::collections::HashMap;

use crate::progress::{LoadEvent, ProgressTracker};

pub struct LoadingManager {
    tracker: ProgressTracker,
    items_loaded: usize,
    items_total: usize,
    loading: bool,
    bytes: HashMap<String, (u64, u64)>,
}

impl LoadingManager {
    pub fn new(tracker: ProgressTracker) -> Self {
        Self {
            tracker,
            items_loaded: 0,
            items_total: 0,
            loading: false,
            bytes: HashMap::new(),
        }
    }

    pub fn items_loaded(&self) -> usize {
        self.items_loaded
    }

    pub fn items_total(&self) -> usize {
        self.items_total
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn item_start(&mut self, url: &str) {
        self.items_total += 1;
        if !self.loading {
            self.bytes.clear();
            self.tracker
                .on_session_start(url, self.items_loaded, self.items_total);
        }
        self.loading = true;
        self.bytes.insert(url.to_string(), (0, 0));
    }

    pub fn item_progress(&mut self, url: &str, bytes_loaded: u64, bytes_total: u64) {
        self.bytes
            .insert(url.to_string(), (bytes_loaded, bytes_total));
        let event = self.aggregate(url);
        self.tracker.on_event(&event);
    }

    pub fn item_error(&mut self, url: &str) {
        self.tracker.on_session_error(url);
    }

    pub fn item_end(&mut self, url: &str) {
        self.items_loaded += 1;
        if self.items_loaded == self.items_total {
            self.loading = false;
            self.tracker.on_session_complete();
        }
        log::debug!(
            "finished {url} ({} of {} items)",
            self.items_loaded,
            self.items_total
        );
    }

    /// Sums byte counts over the session's items, saturating at `u64::MAX`.
    fn aggregate(&self, url: &str) -> LoadEvent {
        let (loaded, total) = self
            .bytes
            .values()
            .fold((0u64, 0u64), |(loaded, total), (item_loaded, item_total)| {
                (
                    loaded.saturating_add(*item_loaded),
                    total.saturating_add(*item_total),
                )
            });
        LoadEvent::new(url, loaded, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::RecordingSink;

    fn manager() -> (LoadingManager, RecordingSink) {
        let sink = RecordingSink::new();
        (LoadingManager::new(ProgressTracker::new(sink.clone())), sink)
    }

    #[test]
    fn single_item_session_completes() {
        let (mut manager, sink) = manager();
        manager.item_start("env.hdr");
        assert!(manager.is_loading());
        manager.item_progress("env.hdr", 50, 200);
        assert_eq!(sink.percent(), Some(25.0));
        manager.item_end("env.hdr");
        assert!(!manager.is_loading());
        assert!(!sink.is_visible());
    }

    #[test]
    fn progress_is_aggregated_over_items() {
        let (mut manager, sink) = manager();
        manager.item_start("a");
        manager.item_start("b");
        manager.item_progress("a", 100, 100);
        manager.item_progress("b", 0, 300);
        assert_eq!(sink.percent(), Some(25.0));
        manager.item_end("a");
        assert!(sink.is_visible());
        manager.item_progress("b", 300, 300);
        manager.item_end("b");
        assert_eq!(sink.percent(), Some(100.0));
        assert!(!sink.is_visible());
        assert_eq!(manager.items_loaded(), 2);
        assert_eq!(manager.items_total(), 2);
    }

    #[test]
    fn huge_totals_saturate_instead_of_overflowing() {
        let (mut manager, sink) = manager();
        manager.item_start("a");
        manager.item_start("b");
        manager.item_progress("a", 1, u64::MAX);
        manager.item_progress("b", 1, 2);
        let percent = sink.percent().unwrap();
        assert!(percent.is_finite());
        assert!((0.0..=100.0).contains(&percent));
        manager.item_progress("a", u64::MAX, u64::MAX);
        manager.item_progress("b", 2, 2);
        assert_eq!(sink.percent(), Some(100.0));
    }

    #[test]
    fn failed_item_still_closes_session() {
        let (mut manager, sink) = manager();
        manager.item_start("missing.json");
        manager.item_error("missing.json");
        manager.item_end("missing.json");
        assert!(!manager.is_loading());
        assert!(!sink.is_visible());
    }

    #[test]
    fn sequential_items_open_new_sessions() {
        let (mut manager, sink) = manager();
        manager.item_start("env.hdr");
        manager.item_progress("env.hdr", 10, 10);
        manager.item_end("env.hdr");
        manager.item_start("font.json");
        assert!(manager.is_loading());
        manager.item_progress("font.json", 1, 4);
        assert_eq!(sink.percent(), Some(25.0));
        manager.item_end("font.json");
        assert!(!manager.is_loading());
    }
}
