//! Timeout-bounded wait policies over browser state.
//!
//! Every wait in the suite is a bounded spin-poll on the calling thread: a
//! [`Condition`] is checked at a fixed interval until it holds or the
//! budget elapses. Mandatory call sites turn an expired budget into
//! [`ProbeError::Timeout`](crate::ProbeError::Timeout); best-effort call
//! sites consume the tri-state [`WaitVerdict`] instead and degrade to a
//! logged no-op.

use std::time::Duration;

/// Default polling interval for waits (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// A predicate over browser state that a wait can hold out for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Element exists in the DOM (not necessarily visible)
    Present,
    /// Element exists and has a nonzero rendered size
    Visible,
    /// Element is visible and not disabled
    Clickable,
    /// Element does not exist in the DOM (awaits banner/spinner dismissal)
    Absent,
    /// Element's trimmed text equals the given string (case-sensitive)
    TextEquals(String),
    /// Element's trimmed text contains the given string (case-sensitive)
    TextContains(String),
    /// Current page URL differs from the given baseline
    UrlChanged(String),
}

impl Condition {
    /// Whether the condition yields a concrete element when it holds.
    ///
    /// `Absent` and `UrlChanged` describe page state rather than a
    /// resolvable element and are only valid for tri-state waits.
    #[must_use]
    pub const fn yields_element(&self) -> bool {
        !matches!(self, Self::Absent | Self::UrlChanged(_))
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Visible => write!(f, "visible"),
            Self::Clickable => write!(f, "clickable"),
            Self::Absent => write!(f, "absent"),
            Self::TextEquals(text) => write!(f, "text == {text:?}"),
            Self::TextContains(text) => write!(f, "text contains {text:?}"),
            Self::UrlChanged(baseline) => write!(f, "url changed from {baseline:?}"),
        }
    }
}

/// A timeout plus the condition to poll for; created per call, never stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Total budget for the wait
    pub timeout: Duration,
    /// Interval between condition checks
    pub poll_interval: Duration,
    /// Condition the wait holds out for
    pub condition: Condition,
}

impl WaitPolicy {
    /// Create a policy with the default poll interval
    #[must_use]
    pub fn new(condition: Condition, timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            condition,
        }
    }

    /// Wait for DOM presence
    #[must_use]
    pub fn present(timeout: Duration) -> Self {
        Self::new(Condition::Present, timeout)
    }

    /// Wait for visibility
    #[must_use]
    pub fn visible(timeout: Duration) -> Self {
        Self::new(Condition::Visible, timeout)
    }

    /// Wait for clickability
    #[must_use]
    pub fn clickable(timeout: Duration) -> Self {
        Self::new(Condition::Clickable, timeout)
    }

    /// Wait for the element to leave the DOM
    #[must_use]
    pub fn absent(timeout: Duration) -> Self {
        Self::new(Condition::Absent, timeout)
    }

    /// Wait until the element's text equals `text`
    #[must_use]
    pub fn text_equals(text: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Condition::TextEquals(text.into()), timeout)
    }

    /// Wait until the element's text contains `text`
    #[must_use]
    pub fn text_contains(text: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Condition::TextContains(text.into()), timeout)
    }

    /// Wait until the page URL differs from `baseline`
    #[must_use]
    pub fn url_changed(baseline: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Condition::UrlChanged(baseline.into()), timeout)
    }

    /// Override the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Timeout in whole milliseconds (for error reporting)
    #[must_use]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Outcome of a tri-state wait: the condition held, or the budget expired.
///
/// Best-effort steps consume this directly instead of catching errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitVerdict {
    /// The condition held within budget
    Matched {
        /// Time spent waiting before the condition held
        elapsed: Duration,
    },
    /// The budget elapsed without the condition holding
    TimedOut {
        /// Time spent waiting
        waited: Duration,
    },
}

impl WaitVerdict {
    /// Whether the condition held
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// Time spent in the wait, whichever way it ended
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Matched { elapsed } => *elapsed,
            Self::TimedOut { waited } => *waited,
        }
    }
}
