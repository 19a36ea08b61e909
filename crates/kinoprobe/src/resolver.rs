//! Element resolution with bounded waits and ordered fallback.
//!
//! [`ElementResolver`] turns [`Locator`]s into live element handles by
//! polling the browser collaborator under a [`WaitPolicy`]. Fallback
//! across a [`LocatorSet`] is data-driven: candidates are tried strictly
//! in declared order, the first success wins, and nothing after the first
//! hit is queried. Resolution is read-only; it never mutates the page.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::browser::{BrowserSession, PageElement};
use crate::locator::{Locator, LocatorSet};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{Condition, WaitPolicy, WaitVerdict};

/// Resolves locators against one live browser session
#[derive(Debug)]
pub struct ElementResolver<'a, S: BrowserSession> {
    session: &'a S,
}

impl<'a, S: BrowserSession> ElementResolver<'a, S> {
    /// Create a resolver over `session`
    #[must_use]
    pub const fn new(session: &'a S) -> Self {
        Self { session }
    }

    /// The underlying session
    #[must_use]
    pub const fn session(&self) -> &S {
        self.session
    }

    /// Whether `element` currently satisfies an element-level condition
    fn satisfied(element: &S::Element, condition: &Condition) -> ProbeResult<bool> {
        match condition {
            Condition::Present => Ok(true),
            Condition::Visible => element.is_displayed(),
            Condition::Clickable => Ok(element.is_displayed()? && element.is_enabled()?),
            Condition::TextEquals(expected) => Ok(element.text()?.trim() == expected),
            Condition::TextContains(expected) => {
                Ok(element.text()?.trim().contains(expected.as_str()))
            }
            Condition::Absent | Condition::UrlChanged(_) => Ok(false),
        }
    }

    fn first_match(
        &self,
        locator: &Locator,
        condition: &Condition,
    ) -> ProbeResult<Option<S::Element>> {
        for element in self.session.query(locator)? {
            if Self::satisfied(&element, condition)? {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    fn require_element_condition(policy: &WaitPolicy) -> ProbeResult<()> {
        if policy.condition.yields_element() {
            Ok(())
        } else {
            Err(ProbeError::InvalidState {
                message: format!(
                    "condition '{}' does not yield an element; use wait_until",
                    policy.condition
                ),
            })
        }
    }

    /// Resolve a single locator under a wait policy.
    ///
    /// Polls until one matching element satisfies the policy's condition.
    /// Surfaces [`ProbeError::Timeout`] when the budget elapses; callers
    /// decide whether that is fatal.
    pub fn resolve_one(&self, locator: &Locator, policy: &WaitPolicy) -> ProbeResult<S::Element> {
        Self::require_element_condition(policy)?;
        let start = Instant::now();
        loop {
            if let Some(element) = self.first_match(locator, &policy.condition)? {
                return Ok(element);
            }
            if start.elapsed() >= policy.timeout {
                debug!(%locator, condition = %policy.condition, "resolution timed out");
                return Err(ProbeError::Timeout {
                    ms: policy.timeout_ms(),
                });
            }
            std::thread::sleep(policy.poll_interval);
        }
    }

    /// Resolve every element matching the locator once at least one
    /// satisfies the policy's condition.
    ///
    /// An empty result never comes back: the wait either produces a
    /// non-empty list or times out.
    pub fn resolve_all(
        &self,
        locator: &Locator,
        policy: &WaitPolicy,
    ) -> ProbeResult<Vec<S::Element>> {
        Self::require_element_condition(policy)?;
        let start = Instant::now();
        loop {
            let mut matching = Vec::new();
            for element in self.session.query(locator)? {
                if Self::satisfied(&element, &policy.condition)? {
                    matching.push(element);
                }
            }
            if !matching.is_empty() {
                return Ok(matching);
            }
            if start.elapsed() >= policy.timeout {
                return Err(ProbeError::Timeout {
                    ms: policy.timeout_ms(),
                });
            }
            std::thread::sleep(policy.poll_interval);
        }
    }

    /// Try the set's candidates in declared order, waiting for presence at
    /// a short per-candidate budget; the first success wins.
    ///
    /// Exhausting every candidate is `Ok(None)`, not an error; callers
    /// that require a hit convert it to
    /// [`ProbeError::ResolutionFailed`].
    pub fn resolve_first_of(
        &self,
        set: &LocatorSet,
        per_locator_timeout: Duration,
    ) -> ProbeResult<Option<S::Element>> {
        Ok(self
            .resolve_first_of_indexed(set, per_locator_timeout)?
            .map(|(_, element)| element))
    }

    /// As [`resolve_first_of`](Self::resolve_first_of), also reporting
    /// which candidate matched.
    pub fn resolve_first_of_indexed(
        &self,
        set: &LocatorSet,
        per_locator_timeout: Duration,
    ) -> ProbeResult<Option<(usize, S::Element)>> {
        for (index, locator) in set.iter().enumerate() {
            match self.resolve_one(locator, &WaitPolicy::present(per_locator_timeout)) {
                Ok(element) => {
                    debug!(%locator, index, "locator candidate matched");
                    return Ok(Some((index, element)));
                }
                Err(err) if err.is_timeout() => {
                    debug!(%locator, index, "locator candidate absent, trying next");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    /// Tri-state wait: poll until the condition holds or the budget
    /// elapses, reporting the outcome instead of raising.
    ///
    /// This is the form every best-effort step consumes. `Absent` and
    /// `UrlChanged` are only expressible here.
    pub fn wait_until(&self, locator: &Locator, policy: &WaitPolicy) -> ProbeResult<WaitVerdict> {
        let start = Instant::now();
        loop {
            let holds = match &policy.condition {
                Condition::Absent => self.session.query(locator)?.is_empty(),
                Condition::UrlChanged(baseline) => self.session.current_url()? != *baseline,
                element_condition => self.first_match(locator, element_condition)?.is_some(),
            };
            if holds {
                return Ok(WaitVerdict::Matched {
                    elapsed: start.elapsed(),
                });
            }
            if start.elapsed() >= policy.timeout {
                return Ok(WaitVerdict::TimedOut {
                    waited: start.elapsed(),
                });
            }
            std::thread::sleep(policy.poll_interval);
        }
    }

    /// Tri-state wait over a whole set: holds as soon as any candidate
    /// satisfies the condition.
    pub fn wait_until_any(
        &self,
        set: &LocatorSet,
        policy: &WaitPolicy,
    ) -> ProbeResult<WaitVerdict> {
        let start = Instant::now();
        loop {
            for locator in set {
                let holds = match &policy.condition {
                    Condition::Absent => self.session.query(locator)?.is_empty(),
                    Condition::UrlChanged(baseline) => self.session.current_url()? != *baseline,
                    element_condition => self.first_match(locator, element_condition)?.is_some(),
                };
                if holds {
                    return Ok(WaitVerdict::Matched {
                        elapsed: start.elapsed(),
                    });
                }
            }
            if start.elapsed() >= policy.timeout {
                return Ok(WaitVerdict::TimedOut {
                    waited: start.elapsed(),
                });
            }
            std::thread::sleep(policy.poll_interval);
        }
    }

    /// Tri-state wait until a page script evaluates to `expected`.
    ///
    /// Used for readiness signals (document parse state, pending
    /// async-library activity).
    pub fn wait_for_script(
        &self,
        script: &str,
        expected: &serde_json::Value,
        timeout: Duration,
    ) -> ProbeResult<WaitVerdict> {
        let poll_interval = Duration::from_millis(crate::wait::DEFAULT_POLL_INTERVAL_MS);
        let start = Instant::now();
        loop {
            if self.session.evaluate_script(script)? == *expected {
                return Ok(WaitVerdict::Matched {
                    elapsed: start.elapsed(),
                });
            }
            if start.elapsed() >= timeout {
                return Ok(WaitVerdict::TimedOut {
                    waited: start.elapsed(),
                });
            }
            std::thread::sleep(poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::{ElementSpec, MockBrowser};
    use serde_json::json;

    fn fast(policy: WaitPolicy) -> WaitPolicy {
        policy.with_poll_interval(Duration::from_millis(5))
    }

    mod resolve_one_tests {
        use super::*;

        #[test]
        fn test_immediate_presence() {
            let browser = MockBrowser::new("https://movies.test/");
            let locator = Locator::css("input");
            let _ = browser.add_element(locator.clone(), ElementSpec::new());

            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::present(Duration::from_millis(100)));
            assert!(resolver.resolve_one(&locator, &policy).is_ok());
        }

        #[test]
        fn test_timeout_when_absent() {
            let browser = MockBrowser::new("https://movies.test/");
            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::present(Duration::from_millis(50)));

            let err = resolver
                .resolve_one(&Locator::css(".missing"), &policy)
                .unwrap_err();
            assert!(err.is_timeout());
        }

        #[test]
        fn test_element_appearing_within_budget() {
            let browser = MockBrowser::new("https://movies.test/");
            let locator = Locator::css(".late");
            let _ = browser.add_element(
                locator.clone(),
                ElementSpec::new().appears_after(Duration::from_millis(30)),
            );

            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::present(Duration::from_millis(300)));
            assert!(resolver.resolve_one(&locator, &policy).is_ok());
        }

        #[test]
        fn test_visible_skips_hidden_elements() {
            let browser = MockBrowser::new("https://movies.test/");
            let locator = Locator::css(".maybe");
            let _ = browser.add_element(locator.clone(), ElementSpec::new().hidden());

            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::visible(Duration::from_millis(50)));
            assert!(resolver.resolve_one(&locator, &policy).unwrap_err().is_timeout());
        }

        #[test]
        fn test_clickable_requires_enabled() {
            let browser = MockBrowser::new("https://movies.test/");
            let locator = Locator::css("button");
            let _ = browser.add_element(locator.clone(), ElementSpec::new().disabled());

            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::clickable(Duration::from_millis(50)));
            assert!(resolver.resolve_one(&locator, &policy).unwrap_err().is_timeout());
        }

        #[test]
        fn test_text_equals_condition() {
            let browser = MockBrowser::new("https://movies.test/");
            let locator = Locator::css(".title");
            let _ = browser.add_element(locator.clone(), ElementSpec::new().text("  Матрица  "));

            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::text_equals("Матрица", Duration::from_millis(100)));
            assert!(resolver.resolve_one(&locator, &policy).is_ok());
        }

        #[test]
        fn test_text_contains_condition() {
            let browser = MockBrowser::new("https://movies.test/");
            let locator = Locator::css(".title");
            let _ = browser.add_element(locator.clone(), ElementSpec::new().text("Матрица (1999)"));

            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::text_contains("Матриц", Duration::from_millis(100)));
            assert!(resolver.resolve_one(&locator, &policy).is_ok());

            let other = fast(WaitPolicy::text_contains("Титаник", Duration::from_millis(40)));
            assert!(resolver.resolve_one(&locator, &other).unwrap_err().is_timeout());
        }

        #[test]
        fn test_absent_condition_is_rejected() {
            let browser = MockBrowser::new("https://movies.test/");
            let resolver = ElementResolver::new(&browser);
            let policy = WaitPolicy::absent(Duration::from_millis(50));

            let err = resolver
                .resolve_one(&Locator::css("x"), &policy)
                .unwrap_err();
            assert!(matches!(err, ProbeError::InvalidState { .. }));
        }
    }

    mod resolve_all_tests {
        use super::*;

        #[test]
        fn test_returns_every_match() {
            let browser = MockBrowser::new("https://movies.test/");
            let locator = Locator::css(".result");
            let _ = browser.add_element(locator.clone(), ElementSpec::new().text("Матрица"));
            let _ = browser.add_element(locator.clone(), ElementSpec::new().text("Матрица 2"));

            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::present(Duration::from_millis(100)));
            let all = resolver.resolve_all(&locator, &policy).unwrap();
            assert_eq!(all.len(), 2);
        }

        #[test]
        fn test_times_out_on_no_match() {
            let browser = MockBrowser::new("https://movies.test/");
            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::present(Duration::from_millis(40)));
            assert!(resolver
                .resolve_all(&Locator::css(".none"), &policy)
                .unwrap_err()
                .is_timeout());
        }
    }

    mod resolve_first_of_tests {
        use super::*;

        #[test]
        fn test_first_candidate_wins_and_rest_untouched() {
            let browser = MockBrowser::new("https://movies.test/");
            let primary = Locator::xpath("//input[@name='kp_query']");
            let secondary = Locator::name("kp_query");
            let _ = browser.add_element(primary.clone(), ElementSpec::new());
            let _ = browser.add_element(secondary.clone(), ElementSpec::new());

            let resolver = ElementResolver::new(&browser);
            let set = LocatorSet::new(vec![primary, secondary.clone()]);
            let found = resolver
                .resolve_first_of(&set, Duration::from_millis(60))
                .unwrap();
            assert!(found.is_some());
            // first success stops the scan: the secondary is never queried
            assert_eq!(browser.query_count(&secondary), 0);
        }

        #[test]
        fn test_falls_back_to_secondary_without_error() {
            let browser = MockBrowser::new("https://movies.test/");
            let primary = Locator::xpath("//input[@name='kp_query']");
            let secondary = Locator::css("form input");
            let _ = browser.add_element(secondary.clone(), ElementSpec::new().text("second"));

            let resolver = ElementResolver::new(&browser);
            let set = LocatorSet::new(vec![primary, secondary]);
            let (index, element) = resolver
                .resolve_first_of_indexed(&set, Duration::from_millis(60))
                .unwrap()
                .expect("secondary candidate should resolve");
            assert_eq!(index, 1);
            assert_eq!(element.text().unwrap(), "second");
        }

        #[test]
        fn test_exhausted_set_is_none_not_error() {
            let browser = MockBrowser::new("https://movies.test/");
            let resolver = ElementResolver::new(&browser);
            let set = LocatorSet::new(vec![Locator::css(".a"), Locator::css(".b")]);

            let found = resolver
                .resolve_first_of(&set, Duration::from_millis(30))
                .unwrap();
            assert!(found.is_none());
        }
    }

    mod wait_until_tests {
        use super::*;

        #[test]
        fn test_absent_after_dismissal() {
            let browser = MockBrowser::new("https://movies.test/");
            let locator = Locator::css(".banner");
            let banner = browser.add_element(locator.clone(), ElementSpec::new().removed_on_click());

            let resolver = ElementResolver::new(&browser);
            let policy = fast(WaitPolicy::absent(Duration::from_millis(100)));
            assert!(!resolver.wait_until(&locator, &policy).unwrap().is_matched());

            banner.click().unwrap();
            assert!(resolver.wait_until(&locator, &policy).unwrap().is_matched());
        }

        #[test]
        fn test_url_changed() {
            let browser = MockBrowser::new("https://movies.test/");
            let resolver = ElementResolver::new(&browser);
            let locator = Locator::css("body");

            let unchanged = fast(WaitPolicy::url_changed(
                "https://movies.test/",
                Duration::from_millis(40),
            ));
            assert!(!resolver.wait_until(&locator, &unchanged).unwrap().is_matched());

            browser.navigate("https://movies.test/search?query=x").unwrap();
            assert!(resolver.wait_until(&locator, &unchanged).unwrap().is_matched());
        }

        #[test]
        fn test_wait_until_any_picks_up_second_candidate() {
            let browser = MockBrowser::new("https://movies.test/");
            let second = Locator::css(".alt");
            let _ = browser.add_element(second.clone(), ElementSpec::new());

            let resolver = ElementResolver::new(&browser);
            let set = LocatorSet::new(vec![Locator::css(".primary"), second]);
            let verdict = resolver
                .wait_until_any(&set, &fast(WaitPolicy::present(Duration::from_millis(100))))
                .unwrap();
            assert!(verdict.is_matched());
        }
    }

    mod script_wait_tests {
        use super::*;

        #[test]
        fn test_ready_state_script() {
            let browser = MockBrowser::new("https://movies.test/");
            browser.set_script("document.readyState", json!("complete"));

            let resolver = ElementResolver::new(&browser);
            let verdict = resolver
                .wait_for_script(
                    "document.readyState",
                    &json!("complete"),
                    Duration::from_millis(100),
                )
                .unwrap();
            assert!(verdict.is_matched());
        }

        #[test]
        fn test_script_mismatch_times_out_silently() {
            let browser = MockBrowser::new("https://movies.test/");
            let resolver = ElementResolver::new(&browser);
            let verdict = resolver
                .wait_for_script("jQuery.active === 0", &json!(true), Duration::from_millis(30))
                .unwrap();
            assert!(!verdict.is_matched());
        }
    }
}
