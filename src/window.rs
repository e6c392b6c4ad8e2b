use crate::source::{SubscribeResponse, TreeResponse};
use serde::{Deserialize, Serialize};

const EDGE_TOLERANCE_PX: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        }
    }
}

/// Boundaries of the resident slice versus the remote collection.
///
/// `user_size` is the size of the remote user-visible set (roots plus expanded descendants);
/// `visible_set_size` is how many of those rows are resident and never exceeds the configured
/// maximum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowState {
    pub total_size: usize,
    pub user_size: usize,
    pub visible_set_size: usize,
    pub first_visible_id: Option<String>,
    pub last_visible_id: Option<String>,
}

impl WindowState {
    pub fn apply_subscribe(&mut self, response: &SubscribeResponse) {
        self.total_size = response.all_ids_size;
        self.apply_bounds(
            response.user_ids_size,
            response.user_first_id.clone(),
            response.user_last_id.clone(),
        );
    }

    pub fn apply_tree(&mut self, response: &TreeResponse) {
        self.apply_bounds(
            response.user_ids_size,
            response.user_first_id.clone(),
            response.user_last_id.clone(),
        );
    }

    fn apply_bounds(&mut self, size: usize, first: Option<String>, last: Option<String>) {
        self.user_size = size;
        self.first_visible_id = first;
        self.last_visible_id = last;
    }

    pub fn exceeds(&self, max_resident: usize) -> bool {
        self.user_size > max_resident
    }
}

/// One reading of the rendering surface's scroller, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollSample {
    fn at_top(&self) -> bool {
        self.scroll_top <= EDGE_TOLERANCE_PX
    }

    fn at_bottom(&self) -> bool {
        self.scroll_height - (self.scroll_top + self.client_height) <= EDGE_TOLERANCE_PX
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollTracker {
    last_scroll_top: Option<f64>,
    client_height: f64,
}

impl ScrollTracker {
    /// Classifies the motion and reports a refetch direction when an edge is reached while the
    /// remote set is larger than the resident window.
    pub fn observe(&mut self, sample: ScrollSample, window_is_partial: bool) -> Option<ScrollDirection> {
        let direction = self.last_scroll_top.map(|last| {
            if last >= sample.scroll_top {
                ScrollDirection::Up
            } else {
                ScrollDirection::Down
            }
        });
        self.last_scroll_top = Some(sample.scroll_top);
        self.client_height = sample.client_height;

        if !window_is_partial || !(sample.at_top() || sample.at_bottom()) {
            return None;
        }

        self.reset();
        direction
    }

    pub fn reset(&mut self) {
        self.last_scroll_top = None;
    }

    pub fn client_height(&self) -> f64 {
        self.client_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(top: f64) -> ScrollSample {
        ScrollSample {
            scroll_top: top,
            scroll_height: 1000.0,
            client_height: 200.0,
        }
    }

    #[test]
    fn first_sample_after_reset_has_no_direction() {
        let mut tracker = ScrollTracker::default();
        assert_eq!(tracker.observe(sample(800.0), true), None);
    }

    #[test]
    fn reaching_bottom_while_going_down_requests_down() {
        let mut tracker = ScrollTracker::default();
        assert_eq!(tracker.observe(sample(500.0), true), None);
        assert_eq!(tracker.observe(sample(799.5), true), Some(ScrollDirection::Down));
        // The edge hit resets the baseline.
        assert_eq!(tracker.observe(sample(800.0), true), None);
    }

    #[test]
    fn reaching_top_while_going_up_requests_up() {
        let mut tracker = ScrollTracker::default();
        tracker.observe(sample(300.0), true);
        assert_eq!(tracker.observe(sample(0.0), true), Some(ScrollDirection::Up));
    }

    #[test]
    fn full_window_never_requests() {
        let mut tracker = ScrollTracker::default();
        tracker.observe(sample(500.0), false);
        assert_eq!(tracker.observe(sample(800.0), false), None);
    }

    #[test]
    fn middle_of_surface_never_requests() {
        let mut tracker = ScrollTracker::default();
        tracker.observe(sample(300.0), true);
        assert_eq!(tracker.observe(sample(400.0), true), None);
        assert_eq!(tracker.client_height(), 200.0);
    }

    #[test]
    fn window_state_tracks_responses() {
        let mut window = WindowState::default();
        window.apply_subscribe(&SubscribeResponse {
            all_ids_size: 900,
            user_ids_size: 500,
            user_first_id: Some("1".to_string()),
            user_last_id: Some("500".to_string()),
        });
        assert!(window.exceeds(100));

        window.apply_tree(&TreeResponse {
            user_ids_size: 80,
            user_first_id: Some("1".to_string()),
            user_last_id: Some("80".to_string()),
        });
        assert_eq!(window.total_size, 900);
        assert_eq!(window.user_size, 80);
        assert!(!window.exceeds(100));
    }
}
