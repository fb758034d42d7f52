//! Debounce of the per-frame proximity signal.
//!
//! A single positive frame is noise. The state machine counts consecutive
//! positive frames and fires exactly once per run that reaches
//! [`FRAMES_THRESHOLD`]. Any negative frame is a hard reset: the count drops to
//! zero and the latch re-arms.

/// Consecutive "near" frames required before an alert fires.
pub const FRAMES_THRESHOLD: u32 = 30;

pub const ALERT_TITLE: &str = "Hair Pulling Alert";
pub const ALERT_SUBTITLE: &str = "Hair Pulling Detection";
pub const ALERT_BODY: &str = "You might be pulling your hair. Try to be mindful of this behavior.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebouncePhase {
    Idle,
    Accumulating,
    Alerted,
}

/// Fire-once event produced on the rising edge of a sustained run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertEvent {
    /// Run length at the moment the alert fired.
    pub consecutive_hits: u32,
}

impl AlertEvent {
    pub fn title(&self) -> &'static str {
        ALERT_TITLE
    }

    pub fn body(&self) -> &'static str {
        ALERT_BODY
    }
}

/// Cross-frame detection state. Owned by the frame loop; mutated only through
/// [`DebounceState::observe`] and [`DebounceState::reset`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DebounceState {
    consecutive_hits: u32,
    latched: bool,
}

impl DebounceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_hits(&self) -> u32 {
        self.consecutive_hits
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn phase(&self) -> DebouncePhase {
        if self.latched {
            DebouncePhase::Alerted
        } else if self.consecutive_hits == 0 {
            DebouncePhase::Idle
        } else {
            DebouncePhase::Accumulating
        }
    }

    /// Feed one frame's signal. Returns an event only on the frame that
    /// completes a run of [`FRAMES_THRESHOLD`] while unlatched.
    pub fn observe(&mut self, near: bool) -> Option<AlertEvent> {
        if !near {
            self.reset();
            return None;
        }

        self.consecutive_hits = self.consecutive_hits.saturating_add(1);
        if self.consecutive_hits >= FRAMES_THRESHOLD && !self.latched {
            self.latched = true;
            return Some(AlertEvent {
                consecutive_hits: self.consecutive_hits,
            });
        }
        None
    }

    pub fn reset(&mut self) {
        self.consecutive_hits = 0;
        self.latched = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(state: &mut DebounceState, near: bool, frames: u32) -> Vec<(u32, AlertEvent)> {
        (1..=frames)
            .filter_map(|i| state.observe(near).map(|ev| (i, ev)))
            .collect()
    }

    #[test]
    fn starts_idle() {
        let state = DebounceState::new();
        assert_eq!(state.phase(), DebouncePhase::Idle);
        assert_eq!(state.consecutive_hits(), 0);
        assert!(!state.is_latched());
    }

    #[test]
    fn short_run_never_alerts() {
        let mut state = DebounceState::new();
        assert!(feed(&mut state, true, FRAMES_THRESHOLD - 1).is_empty());
        assert_eq!(state.phase(), DebouncePhase::Accumulating);
        assert!(state.observe(false).is_none());
        assert_eq!(state.phase(), DebouncePhase::Idle);
    }

    #[test]
    fn alerts_on_threshold_frame() {
        let mut state = DebounceState::new();
        let events = feed(&mut state, true, FRAMES_THRESHOLD);
        assert_eq!(
            events,
            vec![(
                FRAMES_THRESHOLD,
                AlertEvent {
                    consecutive_hits: FRAMES_THRESHOLD
                }
            )]
        );
        assert_eq!(state.phase(), DebouncePhase::Alerted);
    }

    #[test]
    fn long_run_alerts_once() {
        let mut state = DebounceState::new();
        let events = feed(&mut state, true, FRAMES_THRESHOLD * 2);
        assert_eq!(events.len(), 1);
        assert_eq!(state.consecutive_hits(), FRAMES_THRESHOLD * 2);
        assert!(state.is_latched());
    }

    #[test]
    fn negative_frame_rearms_after_alert() {
        let mut state = DebounceState::new();
        assert_eq!(feed(&mut state, true, FRAMES_THRESHOLD).len(), 1);

        assert!(state.observe(false).is_none());
        assert_eq!(state.consecutive_hits(), 0);
        assert!(!state.is_latched());

        let events = feed(&mut state, true, FRAMES_THRESHOLD);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, FRAMES_THRESHOLD);
    }

    #[test]
    fn interrupted_run_starts_over() {
        let mut state = DebounceState::new();
        feed(&mut state, true, 20);
        state.observe(false);
        assert!(feed(&mut state, true, 20).is_empty());
        assert_eq!(state.consecutive_hits(), 20);
    }

    #[test]
    fn event_carries_fixed_text() {
        let ev = AlertEvent {
            consecutive_hits: FRAMES_THRESHOLD,
        };
        assert_eq!(ev.title(), "Hair Pulling Alert");
        assert!(ev.body().starts_with("You might be pulling your hair"));
    }
}
