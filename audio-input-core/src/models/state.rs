use serde::Serialize;

/// Session lifecycle state.
///
/// State transitions:
/// ```text
/// working → draining → terminated
/// ```
///
/// Transitions are monotonic. A session never goes back to `Working`; a new
/// session has to be opened instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// The capture callback may run, or the monitor may be reconnecting.
    Working,
    /// Close was requested; the next worker to look must hand off and terminate.
    Draining,
    /// The handoff happened. No worker touches the session any more.
    Terminated,
}

impl LifecycleState {
    pub fn is_working(&self) -> bool {
        matches!(self, Self::Working)
    }

    pub fn is_draining(&self) -> bool {
        matches!(self, Self::Draining)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        matches!(
            (self, next),
            (Self::Working, Self::Draining) | (Self::Draining, Self::Terminated)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_only_move_forward() {
        use LifecycleState::*;

        assert!(Working.can_transition_to(Draining));
        assert!(Draining.can_transition_to(Terminated));

        assert!(!Working.can_transition_to(Terminated));
        assert!(!Draining.can_transition_to(Working));
        assert!(!Terminated.can_transition_to(Working));
        assert!(!Terminated.can_transition_to(Draining));
        assert!(!Working.can_transition_to(Working));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&LifecycleState::Draining).unwrap();
        assert_eq!(json, "\"draining\"");
    }
}
