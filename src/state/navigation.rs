use std::fmt;

/// Phases of a single guarded navigation
///
/// Each attempt runs Configure → Load → ChallengeCheck → Pace. A failure in
/// Configure, Load or ChallengeCheck moves to Retry, which either re-enters
/// Configure or ends in Exhausted once the attempt budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationPhase {
    // ===== Attempt States =====
    /// Applying the stealth identity (user agent, proxy)
    Configure,

    /// Issuing the navigation under a timeout
    Load,

    /// Inspecting the loaded page for a verification challenge
    ChallengeCheck,

    /// Randomized delay after a successful load
    Pace,

    /// Backing off before the next attempt
    Retry,

    // ===== Terminal States =====
    /// The page is loaded and free of challenges
    Done,

    /// Every attempt failed
    Exhausted,
}

impl NavigationPhase {
    /// Returns true if navigation ends in this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Exhausted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Load => "load",
            Self::ChallengeCheck => "challenge_check",
            Self::Pace => "pace",
            Self::Retry => "retry",
            Self::Done => "done",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for NavigationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
