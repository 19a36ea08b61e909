//! Per-test wiring: build the page, run the body, attach evidence on
//! failure.
//!
//! Each test gets an independently-owned browser session and page object;
//! nothing is shared across tests. A failing body gets a screenshot
//! captured and attached through the page's reporter before the error
//! propagates.

use tracing::warn;

use crate::browser::BrowserSession;
use crate::config::Settings;
use crate::reporter::StepReporter;
use crate::result::ProbeResult;
use crate::search::SearchPage;

/// Build a search page over a fresh session and open the start page
pub fn open_search_page<S: BrowserSession>(
    session: S,
    settings: Settings,
    reporter: Box<dyn StepReporter>,
) -> ProbeResult<SearchPage<S>> {
    let mut page = SearchPage::new(session, settings).with_reporter(reporter);
    page.open()?;
    Ok(page)
}

/// Run a UI test body against an opened page.
///
/// On failure a screenshot is captured and attached under the test's
/// name; capture failures are logged, never raised.
pub fn run_ui_test<S, F>(name: &str, page: &mut SearchPage<S>, body: F) -> ProbeResult<()>
where
    S: BrowserSession,
    F: FnOnce(&mut SearchPage<S>) -> ProbeResult<()>,
{
    match body(page) {
        Ok(()) => Ok(()),
        Err(err) => {
            match page.screenshot() {
                Ok(png) => page.reporter().attach_screenshot(name, &png),
                Err(shot_err) => {
                    warn!(test = name, %shot_err, "could not capture failure screenshot");
                }
            }
            Err(err)
        }
    }
}
