use std::sync::Arc;

use crate::prompt::fix_prompt;

/// Consecutive automatic corrections allowed before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealState {
    Idle,
    /// An AI-generated fragment was submitted and its compile result is due.
    AwaitingFirstResult { fragment: Arc<str> },
    /// That fragment failed; a corrective request is waiting to be sent.
    PendingFix { fragment: Arc<str>, error: String },
    /// The corrective request is in flight.
    Regenerating,
}

/// What a compile failure led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Not the fragment being tracked, or nothing is tracked.
    Ignored,
    FixPending,
    /// The attempt budget is spent; back to idle.
    Exhausted { attempts: u32 },
    /// Automatic correction is turned off.
    Disabled,
}

/// A corrective request ready to be sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRequest {
    pub fragment: Arc<str>,
    pub error: String,
    pub prompt: String,
    pub attempt: u32,
}

/// Turns a compile failure of the most recent AI-generated fragment into one
/// corrective request, at most `max_attempts` times in a row.
///
/// Fragments are tracked by `Arc` identity, so a late failure for a shader
/// that has since been replaced never triggers a fix.
#[derive(Debug)]
pub struct SelfHealCoordinator {
    state: HealState,
    attempts: u32,
    max_attempts: u32,
}

impl SelfHealCoordinator {
    /// `max_attempts == 0` disables automatic correction.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: HealState::Idle,
            attempts: 0,
            max_attempts,
        }
    }

    pub fn state(&self) -> &HealState {
        &self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn has_pending_fix(&self) -> bool {
        matches!(self.state, HealState::PendingFix { .. })
    }

    /// Records `fragment` as the AI-generated submission whose result is due.
    pub fn track_ai_submission(&mut self, fragment: Arc<str>) {
        self.state = HealState::AwaitingFirstResult { fragment };
    }

    /// Any successful compile ends the cycle, except while a correction is
    /// already in flight.
    pub fn record_success(&mut self) {
        if matches!(self.state, HealState::Regenerating) {
            return;
        }
        self.state = HealState::Idle;
        self.attempts = 0;
    }

    pub fn record_failure(&mut self, fragment: &Arc<str>, error: &str) -> FailureDisposition {
        let tracked = match &self.state {
            HealState::AwaitingFirstResult { fragment: pending } => Arc::ptr_eq(pending, fragment),
            _ => false,
        };
        if !tracked {
            return FailureDisposition::Ignored;
        }
        if self.max_attempts == 0 {
            self.state = HealState::Idle;
            return FailureDisposition::Disabled;
        }
        if self.attempts >= self.max_attempts {
            let attempts = self.attempts;
            self.state = HealState::Idle;
            self.attempts = 0;
            tracing::warn!(attempts, "self-heal attempts exhausted");
            return FailureDisposition::Exhausted { attempts };
        }
        self.state = HealState::PendingFix {
            fragment: fragment.clone(),
            error: error.to_string(),
        };
        FailureDisposition::FixPending
    }

    /// Hands out the pending fix once, unless a generation is already running.
    pub fn take_fix_request(&mut self, generating: bool) -> Option<FixRequest> {
        if generating || !self.has_pending_fix() {
            return None;
        }
        let HealState::PendingFix { fragment, error } =
            std::mem::replace(&mut self.state, HealState::Regenerating)
        else {
            return None;
        };
        self.attempts += 1;
        tracing::info!(attempt = self.attempts, max = self.max_attempts, "requesting shader fix");
        Some(FixRequest {
            prompt: fix_prompt(&fragment, &error),
            fragment,
            error,
            attempt: self.attempts,
        })
    }

    /// The corrective round-trip failed; nothing left to submit.
    pub fn regeneration_failed(&mut self) {
        if matches!(self.state, HealState::Regenerating) {
            self.state = HealState::Idle;
        }
    }

    /// A new user prompt starts a fresh budget and drops any unsent fix.
    pub fn user_prompt_started(&mut self) {
        self.attempts = 0;
        if !matches!(self.state, HealState::Regenerating) {
            self.state = HealState::Idle;
        }
    }

    pub fn reset(&mut self) {
        self.state = HealState::Idle;
        self.attempts = 0;
    }
}

impl Default for SelfHealCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str) -> Arc<str> {
        Arc::from(text)
    }

    #[test]
    fn failure_of_tracked_fragment_yields_one_fix() {
        let mut heal = SelfHealCoordinator::default();
        let broken = fragment("let x = 0.0; x = 1.0;");
        heal.track_ai_submission(broken.clone());

        assert_eq!(
            heal.record_failure(&broken, "Line 1: bad"),
            FailureDisposition::FixPending
        );
        let fix = heal.take_fix_request(false).expect("fix request");
        assert!(Arc::ptr_eq(&fix.fragment, &broken));
        assert_eq!(fix.error, "Line 1: bad");
        assert!(fix.prompt.contains("Error: Line 1: bad"));
        assert_eq!(heal.state(), &HealState::Regenerating);
        assert!(heal.take_fix_request(false).is_none());
    }

    #[test]
    fn untracked_failure_is_ignored() {
        let mut heal = SelfHealCoordinator::default();
        let hand_written = fragment("oops");
        assert_eq!(
            heal.record_failure(&hand_written, "Line 1: bad"),
            FailureDisposition::Ignored
        );
        assert!(heal.take_fix_request(false).is_none());
    }

    #[test]
    fn stale_failure_with_equal_text_is_ignored() {
        let mut heal = SelfHealCoordinator::default();
        let older = fragment("same text");
        let newer = fragment("same text");
        heal.track_ai_submission(newer);
        assert_eq!(
            heal.record_failure(&older, "Line 1: bad"),
            FailureDisposition::Ignored
        );
        assert!(!heal.has_pending_fix());
    }

    #[test]
    fn success_clears_tracking() {
        let mut heal = SelfHealCoordinator::default();
        let shader = fragment("ok");
        heal.track_ai_submission(shader.clone());
        heal.record_success();
        assert_eq!(heal.state(), &HealState::Idle);
        assert_eq!(heal.record_failure(&shader, "late"), FailureDisposition::Ignored);
    }

    #[test]
    fn fix_waits_while_generating() {
        let mut heal = SelfHealCoordinator::default();
        let broken = fragment("broken");
        heal.track_ai_submission(broken.clone());
        heal.record_failure(&broken, "Line 2: nope");
        assert!(heal.take_fix_request(true).is_none());
        assert!(heal.has_pending_fix());
        assert!(heal.take_fix_request(false).is_some());
    }

    #[test]
    fn consecutive_fixes_are_bounded() {
        let mut heal = SelfHealCoordinator::new(2);
        for attempt in 1..=2 {
            let broken = fragment("still broken");
            heal.track_ai_submission(broken.clone());
            assert_eq!(
                heal.record_failure(&broken, "Line 1: bad"),
                FailureDisposition::FixPending
            );
            assert_eq!(heal.take_fix_request(false).map(|fix| fix.attempt), Some(attempt));
        }
        let broken = fragment("still broken");
        heal.track_ai_submission(broken.clone());
        assert_eq!(
            heal.record_failure(&broken, "Line 1: bad"),
            FailureDisposition::Exhausted { attempts: 2 }
        );
        assert_eq!(heal.state(), &HealState::Idle);
        assert_eq!(heal.attempts(), 0);
    }

    #[test]
    fn success_resets_attempt_budget() {
        let mut heal = SelfHealCoordinator::new(1);
        let broken = fragment("broken");
        heal.track_ai_submission(broken.clone());
        heal.record_failure(&broken, "e");
        heal.take_fix_request(false);
        let fixed = fragment("fixed");
        heal.track_ai_submission(fixed);
        heal.record_success();
        assert_eq!(heal.attempts(), 0);

        let broken_again = fragment("broken again");
        heal.track_ai_submission(broken_again.clone());
        assert_eq!(
            heal.record_failure(&broken_again, "e"),
            FailureDisposition::FixPending
        );
    }

    #[test]
    fn zero_budget_disables_healing() {
        let mut heal = SelfHealCoordinator::new(0);
        let broken = fragment("broken");
        heal.track_ai_submission(broken.clone());
        assert_eq!(heal.record_failure(&broken, "e"), FailureDisposition::Disabled);
        assert!(heal.take_fix_request(false).is_none());
    }

    #[test]
    fn failed_regeneration_returns_to_idle() {
        let mut heal = SelfHealCoordinator::default();
        let broken = fragment("broken");
        heal.track_ai_submission(broken.clone());
        heal.record_failure(&broken, "e");
        heal.take_fix_request(false);
        heal.regeneration_failed();
        assert_eq!(heal.state(), &HealState::Idle);
    }

    #[test]
    fn user_prompt_drops_unsent_fix() {
        let mut heal = SelfHealCoordinator::default();
        let broken = fragment("broken");
        heal.track_ai_submission(broken.clone());
        heal.record_failure(&broken, "e");
        heal.user_prompt_started();
        assert!(heal.take_fix_request(false).is_none());
    }
}
