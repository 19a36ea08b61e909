//! Higher-level element interactions with built-in recovery.
//!
//! [`PageOps`] sits on top of the resolver and owns the suite's two
//! recovery policies: the two-tier click (native click, then DOM-level
//! dispatch when an overlay intercepts it) and the value-echo confirmation
//! after typing (asynchronous input handlers may rewrite or delay the
//! entered value). Neither retries whole operations; partial progress is
//! never rolled back.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::browser::{BrowserSession, PageElement};
use crate::config::WaitSettings;
use crate::locator::{Locator, LocatorSet};
use crate::resolver::ElementResolver;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{Condition, WaitPolicy};

/// How [`PageOps::type_text`] finishes the entry
#[derive(Debug, Clone, Copy)]
pub enum SubmitMode<'a> {
    /// Leave the typed value as-is
    None,
    /// Press Enter in the field
    Enter,
    /// Click the first available button from the set; falls back to Enter
    /// when no button resolves
    Button(&'a LocatorSet),
}

/// Interaction operations over one page
#[derive(Debug)]
pub struct PageOps<'a, S: BrowserSession> {
    resolver: ElementResolver<'a, S>,
    waits: &'a WaitSettings,
}

impl<'a, S: BrowserSession> PageOps<'a, S> {
    /// Create interaction ops over `session` with the given wait budgets
    #[must_use]
    pub const fn new(session: &'a S, waits: &'a WaitSettings) -> Self {
        Self {
            resolver: ElementResolver::new(session),
            waits,
        }
    }

    /// The underlying resolver
    #[must_use]
    pub const fn resolver(&self) -> &ElementResolver<'a, S> {
        &self.resolver
    }

    fn policy(&self, condition: Condition, timeout: Duration) -> WaitPolicy {
        WaitPolicy::new(condition, timeout).with_poll_interval(self.waits.poll_interval)
    }

    /// Resolve a target that the caller cannot proceed without.
    ///
    /// A single locator gets the full explicit budget and surfaces
    /// `Timeout`; a multi-candidate set is walked at the per-candidate
    /// budget and exhaustion surfaces `ResolutionFailed`.
    fn resolve_required(
        &self,
        target: &LocatorSet,
        condition: Condition,
    ) -> ProbeResult<S::Element> {
        if target.len() == 1 {
            let locator = &target.candidates()[0];
            return self
                .resolver
                .resolve_one(locator, &self.policy(condition, self.waits.explicit));
        }
        for locator in target {
            match self
                .resolver
                .resolve_one(locator, &self.policy(condition.clone(), self.waits.candidate))
            {
                Ok(element) => return Ok(element),
                Err(err) if err.is_timeout() => {
                    debug!(%locator, %condition, "candidate not ready, trying next");
                }
                Err(err) => return Err(err),
            }
        }
        Err(ProbeError::ResolutionFailed {
            what: target.to_string(),
        })
    }

    /// Click the first clickable candidate of `target`.
    ///
    /// An intercepted native click falls back to a DOM-level dispatch on
    /// the same resolved element; the interception is never surfaced.
    pub fn click(&self, target: &LocatorSet) -> ProbeResult<()> {
        let element = self.resolve_required(target, Condition::Clickable)?;
        self.click_element(&element, target)
    }

    /// Two-tier click on an already resolved element
    pub fn click_element(&self, element: &S::Element, target: &LocatorSet) -> ProbeResult<()> {
        match element.click() {
            Ok(()) => Ok(()),
            Err(ProbeError::InteractionBlocked { what }) => {
                debug!(locators = %target, blocked = %what, "native click intercepted, dispatching DOM click");
                element.dispatch_click()
            }
            Err(err) => Err(err),
        }
    }

    /// Clear the field, inject `text`, confirm the echo, then submit.
    ///
    /// The echo confirmation is bounded by the echo budget and non-fatal:
    /// a value that never stabilizes is logged and the operation proceeds.
    pub fn type_text(
        &self,
        target: &LocatorSet,
        text: &str,
        submit: SubmitMode<'_>,
    ) -> ProbeResult<()> {
        let element = self.resolve_required(target, Condition::Clickable)?;
        element.clear()?;
        element.send_text(text)?;
        self.confirm_value(&element, text, target);

        match submit {
            SubmitMode::None => {}
            SubmitMode::Enter => element.send_text("\n")?,
            SubmitMode::Button(buttons) => {
                match self.resolver.resolve_first_of(buttons, self.waits.candidate)? {
                    Some(button) => self.click_element(&button, buttons)?,
                    None => {
                        debug!(%buttons, "no submit button resolved, falling back to Enter");
                        element.send_text("\n")?;
                    }
                }
            }
        }
        Ok(())
    }

    fn confirm_value(&self, element: &S::Element, expected: &str, target: &LocatorSet) {
        let start = Instant::now();
        loop {
            match element.attribute("value") {
                Ok(Some(value)) if value == expected => return,
                Ok(_) => {}
                Err(err) => {
                    warn!(locators = %target, %err, "could not read back typed value");
                    return;
                }
            }
            if start.elapsed() >= self.waits.echo {
                warn!(
                    locators = %target,
                    expected,
                    waited_ms = self.waits.echo.as_millis() as u64,
                    "typed value did not echo back"
                );
                return;
            }
            std::thread::sleep(self.waits.poll_interval);
        }
    }

    /// Resolve to PRESENT and return the trimmed text
    pub fn read_text(&self, target: &LocatorSet) -> ProbeResult<String> {
        let element = self.resolve_required(target, Condition::Present)?;
        Ok(element.text()?.trim().to_string())
    }

    /// Dismiss a transient overlay if it is on the page.
    ///
    /// Probes at the per-candidate budget, clicks the match, and waits for
    /// it to leave the DOM. Best-effort: every internal failure is logged
    /// and reported as "not dismissed".
    pub fn dismiss_if_present(&self, target: &LocatorSet) -> bool {
        let (index, element) = match self
            .resolver
            .resolve_first_of_indexed(target, self.waits.candidate)
        {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                debug!(locators = %target, "overlay not present");
                return false;
            }
            Err(err) => {
                warn!(locators = %target, %err, "overlay probe failed");
                return false;
            }
        };

        if let Err(err) = self.click_element(&element, target) {
            warn!(locators = %target, %err, "could not click overlay");
            return false;
        }

        let locator = &target.candidates()[index];
        match self
            .resolver
            .wait_until(locator, &self.policy(Condition::Absent, self.waits.banner_dismiss))
        {
            Ok(verdict) => {
                if !verdict.is_matched() {
                    warn!(%locator, "overlay still present after dismissal");
                }
                verdict.is_matched()
            }
            Err(err) => {
                warn!(%locator, %err, "could not confirm overlay dismissal");
                false
            }
        }
    }

    /// Boolean presence probe; timeouts and probe failures are `false`
    #[must_use]
    pub fn is_present(&self, locator: &Locator, timeout: Duration) -> bool {
        self.probe(locator, Condition::Present, timeout)
    }

    /// Boolean visibility probe; timeouts and probe failures are `false`
    #[must_use]
    pub fn is_visible(&self, locator: &Locator, timeout: Duration) -> bool {
        self.probe(locator, Condition::Visible, timeout)
    }

    fn probe(&self, locator: &Locator, condition: Condition, timeout: Duration) -> bool {
        match self.resolver.resolve_one(locator, &self.policy(condition, timeout)) {
            Ok(_) => true,
            Err(err) if err.is_timeout() => false,
            Err(err) => {
                warn!(%locator, %err, "probe failed");
                false
            }
        }
    }
}
