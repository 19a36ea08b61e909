//! Search workflow over the catalog start page.
//!
//! [`SearchPage`] drives the full "open page → resolve search box → submit
//! query → wait for results or empty-state" sequence. It only knows
//! logical element names; which concrete markup variant is live is decided
//! at resolution time by the configured [`LocatorTable`](crate::config::LocatorTable)
//! fallback order. The workflow never fails a search solely because the
//! result wait timed out; result-count assertions stay with the caller.

use std::time::Instant;

use serde_json::json;
use tracing::{debug, warn};

use crate::browser::{BrowserSession, PageElement};
use crate::config::Settings;
use crate::page::{PageOps, SubmitMode};
use crate::reporter::{NullReporter, StepReporter};
use crate::resolver::ElementResolver;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::WaitPolicy;

/// Document parse state probe
const READY_STATE_JS: &str = "document.readyState";
/// No pending jQuery activity (sites without jQuery report idle)
const DYNAMIC_IDLE_JS: &str = "typeof jQuery === 'undefined' || jQuery.active === 0";

/// Workflow progression of one search page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// Nothing opened yet
    Initial,
    /// Start page open, overlays handled
    Loaded,
    /// Query typed and submitted
    QueryEntered,
    /// Results (or the empty-state) settled
    ResultsSettled,
}

/// How a search query is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSubmit {
    /// Press Enter in the search field (default)
    Enter,
    /// Click a submit button; falls back to Enter when none resolves
    Button,
}

/// Terminal view of a settled search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Distinct result elements found by the matching container locator
    pub result_count: usize,
    /// Extracted result titles, lower-cased (not deduplicated)
    pub titles: Vec<String>,
    /// Whether a "nothing found" message was shown
    pub no_results_shown: bool,
}

impl SearchOutcome {
    /// Whether any extracted title contains `needle` (case-insensitive)
    #[must_use]
    pub fn has_title_containing(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.titles.iter().any(|title| title.contains(&needle))
    }

    /// Whether the search produced no results
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result_count == 0
    }
}

/// Page object for the catalog search flow
#[derive(Debug)]
pub struct SearchPage<S: BrowserSession> {
    session: S,
    settings: Settings,
    reporter: Box<dyn StepReporter>,
    state: WorkflowState,
}

impl<S: BrowserSession> SearchPage<S> {
    /// Create a page object over an owned browser session
    #[must_use]
    pub fn new(session: S, settings: Settings) -> Self {
        Self {
            session,
            settings,
            reporter: Box::new(NullReporter),
            state: WorkflowState::Initial,
        }
    }

    /// Attach a reporting sink
    #[must_use]
    pub fn with_reporter(mut self, reporter: Box<dyn StepReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Current workflow state
    #[must_use]
    pub const fn state(&self) -> WorkflowState {
        self.state
    }

    /// The underlying session
    #[must_use]
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// The injected configuration
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The attached reporting sink
    #[must_use]
    pub fn reporter(&self) -> &dyn StepReporter {
        self.reporter.as_ref()
    }

    fn ops(&self) -> PageOps<'_, S> {
        PageOps::new(&self.session, &self.settings.waits)
    }

    /// Open the catalog start page and bring it to a workable state.
    ///
    /// Navigation is mandatory; the readiness probes, cookie-banner
    /// dismissal, and search-input wait are all best-effort.
    pub fn open(&mut self) -> ProbeResult<()> {
        self.reporter.step("open catalog start page");
        self.session.navigate(&self.settings.ui.base_url)?;
        self.wait_for_ready();

        let ops = self.ops();
        if ops.dismiss_if_present(&self.settings.locators.cookie_banner) {
            debug!("cookie banner dismissed");
        }

        let verdict = ops.resolver().wait_until_any(
            &self.settings.locators.search_inputs,
            &WaitPolicy::present(self.settings.waits.settle)
                .with_poll_interval(self.settings.waits.poll_interval),
        )?;
        if !verdict.is_matched() {
            warn!("search input did not appear while loading the start page");
        }

        self.state = WorkflowState::Loaded;
        Ok(())
    }

    /// Readiness probes after navigation: document parse state, then a
    /// short grace wait for async-library activity. Both expire silently.
    fn wait_for_ready(&self) {
        let resolver = ElementResolver::new(&self.session);
        match resolver.wait_for_script(
            READY_STATE_JS,
            &json!("complete"),
            self.settings.waits.page_load,
        ) {
            Ok(verdict) if !verdict.is_matched() => {
                warn!("document did not report a complete parse state");
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "readiness probe failed"),
        }
        match resolver.wait_for_script(
            DYNAMIC_IDLE_JS,
            &json!(true),
            self.settings.waits.dynamic_grace,
        ) {
            Ok(verdict) if !verdict.is_matched() => {
                debug!("async library still active after grace period");
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "dynamic content probe failed"),
        }
    }

    /// Search with the default Enter submission
    pub fn search(&mut self, query: &str) -> ProbeResult<SearchOutcome> {
        self.search_with(query, SearchSubmit::Enter)
    }

    /// Run a full search and settle on its outcome.
    ///
    /// Resolving the search input and typing the query are mandatory;
    /// waiting for results is best-effort and never fails the search on
    /// its own.
    pub fn search_with(
        &mut self,
        query: &str,
        submit: SearchSubmit,
    ) -> ProbeResult<SearchOutcome> {
        if self.state == WorkflowState::Initial {
            return Err(ProbeError::InvalidState {
                message: "search requested before the start page was opened".to_string(),
            });
        }
        self.reporter.step(&format!("search for '{query}'"));

        {
            let ops = self.ops();
            let submit_mode = match submit {
                SearchSubmit::Enter => SubmitMode::Enter,
                SearchSubmit::Button => {
                    SubmitMode::Button(&self.settings.locators.search_buttons)
                }
            };
            ops.type_text(&self.settings.locators.search_inputs, query, submit_mode)
                .map_err(|err| match err {
                    ProbeError::ResolutionFailed { .. } => ProbeError::ResolutionFailed {
                        what: format!(
                            "search input {}",
                            self.settings.locators.search_inputs
                        ),
                    },
                    other => other,
                })?;
        }
        self.state = WorkflowState::QueryEntered;

        self.settle_results()?;
        self.state = WorkflowState::ResultsSettled;

        let outcome = self.collect_outcome()?;
        self.reporter.step(&format!(
            "results settled: {} found, no-results message: {}",
            outcome.result_count, outcome.no_results_shown
        ));
        Ok(outcome)
    }

    /// Wait until any result container fills up or a no-results message
    /// shows; a timeout here is logged and the workflow proceeds.
    fn settle_results(&self) -> ProbeResult<()> {
        self.wait_for_ready();
        let start = Instant::now();
        loop {
            if self.any_results_present()? || self.no_results_message_present()? {
                return Ok(());
            }
            if start.elapsed() >= self.settings.waits.settle {
                warn!(
                    waited_ms = start.elapsed().as_millis() as u64,
                    "search results did not settle, proceeding anyway"
                );
                return Ok(());
            }
            std::thread::sleep(self.settings.waits.poll_interval);
        }
    }

    fn any_results_present(&self) -> ProbeResult<bool> {
        for locator in &self.settings.locators.search_results {
            if !self.session.query(locator)?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the page currently shows one of the configured
    /// "nothing found" phrases
    pub fn no_results_message_present(&self) -> ProbeResult<bool> {
        let text = self.session.page_text()?.to_lowercase();
        Ok(self
            .settings
            .locators
            .no_results_phrases
            .iter()
            .any(|phrase| text.contains(phrase.as_str())))
    }

    /// Count and titles from whichever result locator matched first
    fn collect_outcome(&self) -> ProbeResult<SearchOutcome> {
        let mut result_count = 0;
        let mut titles = Vec::new();

        for locator in &self.settings.locators.search_results {
            let elements = self.session.query(locator)?;
            if elements.is_empty() {
                continue;
            }
            debug!(%locator, count = elements.len(), "result container matched");
            result_count = elements.len();
            for element in &elements {
                match element.text() {
                    Ok(text) => {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            titles.push(trimmed.to_lowercase());
                        }
                    }
                    Err(err) => warn!(%err, "could not read a result's text"),
                }
            }
            break;
        }

        if titles.is_empty() {
            // last resort: scrape page headings for anything title-shaped
            for element in self.session.query(&self.settings.locators.fallback_titles)? {
                if let Ok(text) = element.text() {
                    let trimmed = text.trim();
                    if trimmed.len() > 1 {
                        titles.push(trimmed.to_lowercase());
                    }
                }
            }
            if !titles.is_empty() {
                debug!(count = titles.len(), "titles scraped from headings");
            }
        }

        Ok(SearchOutcome {
            result_count,
            titles,
            no_results_shown: self.no_results_message_present()?,
        })
    }

    /// Whether a search input is displayed and enabled
    #[must_use]
    pub fn is_search_input_displayed(&self) -> bool {
        let resolver = ElementResolver::new(&self.session);
        match resolver.resolve_first_of(
            &self.settings.locators.search_inputs,
            self.settings.waits.candidate,
        ) {
            Ok(Some(element)) => {
                element.is_displayed().unwrap_or(false) && element.is_enabled().unwrap_or(false)
            }
            Ok(None) => false,
            Err(err) => {
                warn!(%err, "search input probe failed");
                false
            }
        }
    }

    /// Whether the current URL looks like a search results page
    pub fn is_on_search_results_page(&self) -> ProbeResult<bool> {
        let url = self.session.current_url()?.to_lowercase();
        Ok(url.contains("search") || url.contains("query"))
    }

    /// Current page URL
    pub fn current_url(&self) -> ProbeResult<String> {
        self.session.current_url()
    }

    /// Screenshot of the current page state
    pub fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        self.session.screenshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::{ElementSpec, MockBrowser, MockElement};
    use crate::config::WaitSettings;
    use crate::reporter::RecordingReporter;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_settings() -> Settings {
        Settings {
            waits: WaitSettings {
                explicit: Duration::from_millis(120),
                page_load: Duration::from_millis(80),
                dynamic_grace: Duration::from_millis(40),
                candidate: Duration::from_millis(60),
                echo: Duration::from_millis(60),
                settle: Duration::from_millis(120),
                banner_dismiss: Duration::from_millis(120),
                poll_interval: Duration::from_millis(5),
            },
            ..Settings::default()
        }
    }

    /// Opt-in log capture: `RUST_LOG=kinoprobe=debug cargo test`
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    /// Can the readiness scripts so `open` does not burn its grace budgets
    fn ready(browser: &MockBrowser) {
        browser.set_script(READY_STATE_JS, json!("complete"));
        browser.set_script(DYNAMIC_IDLE_JS, json!(true));
    }

    fn stage_input(browser: &MockBrowser, settings: &Settings) -> MockElement {
        let locator = settings.locators.search_inputs.candidates()[0].clone();
        browser.add_element(locator, ElementSpec::new())
    }

    fn stage_result(browser: &MockBrowser, settings: &Settings, title: &str) -> MockElement {
        let locator = settings.locators.search_results.candidates()[0].clone();
        let element = browser.add_element(locator, ElementSpec::new().text(title));
        browser.on_submit_reveal(&element);
        element
    }

    fn opened_page(browser: &MockBrowser, settings: Settings) -> SearchPage<MockBrowser> {
        let mut page = SearchPage::new(browser.clone(), settings);
        page.open().expect("start page should open");
        page
    }

    mod state_machine_tests {
        use super::*;

        #[test]
        fn test_search_before_open_is_invalid() {
            let browser = MockBrowser::new("about:blank");
            let mut page = SearchPage::new(browser, test_settings());

            let err = page.search("матрица").unwrap_err();
            assert!(matches!(err, ProbeError::InvalidState { .. }));
            assert_eq!(page.state(), WorkflowState::Initial);
        }

        #[test]
        fn test_open_reaches_loaded() {
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            let _ = stage_input(&browser, &settings);

            let page = opened_page(&browser, settings);
            assert_eq!(page.state(), WorkflowState::Loaded);
            assert!(browser
                .history()
                .iter()
                .any(|call| call.starts_with("navigate:https://www.kinopoisk.ru")));
        }

        #[test]
        fn test_open_tolerates_missing_readiness_signals() {
            // no canned scripts: both readiness probes expire silently
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            let _ = stage_input(&browser, &settings);

            let page = opened_page(&browser, settings);
            assert_eq!(page.state(), WorkflowState::Loaded);
        }

        #[test]
        fn test_search_ends_results_settled() {
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            let _ = stage_input(&browser, &settings);
            let _ = stage_result(&browser, &settings, "Матрица (1999)");

            let mut page = opened_page(&browser, settings);
            let _ = page.search("матрица").unwrap();
            assert_eq!(page.state(), WorkflowState::ResultsSettled);
        }
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn test_query_with_matches_yields_relevant_titles() {
            init_tracing();
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            let _ = stage_input(&browser, &settings);
            let _ = stage_result(&browser, &settings, "Матрица (1999)");
            let _ = stage_result(&browser, &settings, "Матрица: Перезагрузка (2003)");
            browser.on_submit_set_url("https://www.kinopoisk.ru/index.php?kp_query=матрица&search=1");

            let mut page = opened_page(&browser, settings);
            let outcome = page.search("матрица").unwrap();

            assert_eq!(outcome.result_count, 2);
            assert!(outcome.has_title_containing("матриц"));
            assert!(!outcome.no_results_shown);
            assert!(page.is_on_search_results_page().unwrap());
        }

        #[test]
        fn test_query_without_matches_reports_no_results() {
            init_tracing();
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            let _ = stage_input(&browser, &settings);
            browser.on_submit_set_page_text("По вашему запросу ничего не найдено");

            let mut page = opened_page(&browser, settings);
            let outcome = page.search("zzzxxxnonexistentmovie123").unwrap();

            assert_eq!(outcome.result_count, 0);
            assert!(outcome.is_empty());
            assert!(outcome.no_results_shown);
            assert!(outcome.titles.is_empty());
        }

        #[test]
        fn test_cookie_banner_is_dismissed_before_searching() {
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            let banner_locator = settings.locators.cookie_banner.candidates()[0].clone();
            let banner = browser.add_element(
                banner_locator,
                ElementSpec::new().removed_on_click(),
            );
            let _ = stage_input(&browser, &settings);

            let page = opened_page(&browser, settings);
            assert!(!banner.is_present());
            assert!(page.is_search_input_displayed());
        }

        #[test]
        fn test_secondary_input_candidate_is_used_when_primary_is_absent() {
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            // only the second candidate of the input set exists
            let secondary = settings.locators.search_inputs.candidates()[1].clone();
            let input = browser.add_element(secondary, ElementSpec::new());
            let _ = stage_result(&browser, &settings, "Тарантино: документальный");

            let mut page = opened_page(&browser, settings);
            let outcome = page.search("тар").unwrap();

            assert_eq!(input.current_value(), "тар");
            assert_eq!(outcome.result_count, 1);
        }

        #[test]
        fn test_button_submission_clicks_the_button() {
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            let _ = stage_input(&browser, &settings);
            let button_locator = settings.locators.search_buttons.candidates()[0].clone();
            let button = browser.add_element(button_locator, ElementSpec::new());
            let _ = stage_result(&browser, &settings, "Титаник (1997)");

            let mut page = opened_page(&browser, settings);
            // the mock only reacts to Enter, so settle falls through on its
            // budget; the workflow must still finish without an error
            let outcome = page.search_with("Титаник", SearchSubmit::Button).unwrap();
            assert_eq!(button.native_clicks(), 1);
            assert!(outcome.result_count <= 1);
        }

        #[test]
        fn test_missing_search_input_is_a_resolution_failure() {
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);

            let mut page = opened_page(&browser, settings);
            let err = page.search("матрица").unwrap_err();
            assert!(matches!(err, ProbeError::ResolutionFailed { .. }));
        }

        #[test]
        fn test_settle_timeout_is_nonfatal() {
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            let _ = stage_input(&browser, &settings);
            // nothing revealed on submit and no message: settle expires

            let mut page = opened_page(&browser, settings);
            let outcome = page.search("тишина").unwrap();
            assert_eq!(outcome.result_count, 0);
            assert!(!outcome.no_results_shown);
        }

        #[test]
        fn test_heading_fallback_collects_titles() {
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            let _ = stage_input(&browser, &settings);
            let heading = browser.add_element(
                settings.locators.fallback_titles.clone(),
                ElementSpec::new().text("Матрица"),
            );
            browser.on_submit_reveal(&heading);
            browser.on_submit_set_page_text("Матрица — смотреть онлайн");

            let mut page = opened_page(&browser, settings);
            let outcome = page.search("матрица").unwrap();
            // no result container matched, but headings were scraped
            assert_eq!(outcome.result_count, 0);
            assert!(outcome.has_title_containing("матрица"));
        }
    }

    mod reporter_tests {
        use super::*;

        #[test]
        fn test_steps_are_reported() {
            let settings = test_settings();
            let browser = MockBrowser::new("about:blank");
            ready(&browser);
            let _ = stage_input(&browser, &settings);
            let _ = stage_result(&browser, &settings, "Матрица");

            let recording = Arc::new(RecordingReporter::new());
            let mut page = SearchPage::new(browser, settings)
                .with_reporter(Box::new(Arc::clone(&recording)));
            page.open().unwrap();
            let _ = page.search("матрица").unwrap();

            let steps = recording.steps();
            assert!(steps.iter().any(|s| s.contains("open catalog start page")));
            assert!(steps.iter().any(|s| s.contains("search for 'матрица'")));
            assert!(steps.iter().any(|s| s.contains("results settled")));
        }
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_has_title_containing_is_case_insensitive() {
            let outcome = SearchOutcome {
                result_count: 1,
                titles: vec!["матрица (1999)".to_string()],
                no_results_shown: false,
            };
            assert!(outcome.has_title_containing("МАТРИЦ"));
            assert!(!outcome.has_title_containing("титаник"));
        }
    }
}
