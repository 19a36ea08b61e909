//! Browser collaborator surface.
//!
//! The suite never talks to a concrete automation backend directly; it
//! consumes the capability set below. [`BrowserSession`] is one live page
//! in one browser session (one session per test lifetime), and
//! [`PageElement`] is an opaque handle to a located element. Swapping the
//! backend means implementing these two traits; the bundled
//! [`mock::MockBrowser`] implements them for unit and scenario tests, and
//! the `browser` feature adds a chromium-backed implementation.

use crate::locator::Locator;
use crate::result::ProbeResult;

/// Opaque handle to a located UI element.
///
/// The suite never inspects an element beyond this capability set.
pub trait PageElement {
    /// Issue a native click
    fn click(&self) -> ProbeResult<()>;

    /// Dispatch a DOM-level click directly on the element.
    ///
    /// Used as the recovery path when a native [`click`](Self::click) is
    /// intercepted by an overlay.
    fn dispatch_click(&self) -> ProbeResult<()>;

    /// Type text into the element; a `'\n'` submits the enclosing form
    fn send_text(&self, text: &str) -> ProbeResult<()>;

    /// Clear the element's current value
    fn clear(&self) -> ProbeResult<()>;

    /// The element's text content (not trimmed)
    fn text(&self) -> ProbeResult<String>;

    /// Read an attribute or matching property (`"value"` reads the live
    /// input value)
    fn attribute(&self, name: &str) -> ProbeResult<Option<String>>;

    /// Whether the element has a nonzero rendered size and is not hidden
    fn is_displayed(&self) -> ProbeResult<bool>;

    /// Whether the element is enabled for interaction
    fn is_enabled(&self) -> ProbeResult<bool>;
}

/// One live page in one browser session.
///
/// All queries are read-only; waiting and fallback policy live above this
/// trait in the resolver.
pub trait BrowserSession {
    /// Element handle type produced by [`query`](Self::query)
    type Element: PageElement;

    /// Navigate the page to `url`
    fn navigate(&self, url: &str) -> ProbeResult<()>;

    /// Evaluate a script in page context and return its value
    fn evaluate_script(&self, script: &str) -> ProbeResult<serde_json::Value>;

    /// Find all elements currently matching `locator` (possibly none)
    fn query(&self, locator: &Locator) -> ProbeResult<Vec<Self::Element>>;

    /// Current page URL
    fn current_url(&self) -> ProbeResult<String>;

    /// Rendered text of the whole page (for message scans)
    fn page_text(&self) -> ProbeResult<String>;

    /// Capture a screenshot as PNG bytes
    fn screenshot(&self) -> ProbeResult<Vec<u8>>;
}

pub mod mock {
    //! Scriptable in-memory browser for unit and scenario tests.
    //!
    //! Elements are registered against exact locators and can be staged to
    //! appear late, block clicks, vanish when clicked, or rewrite typed
    //! values, enough to play back the site behaviors the real suite has
    //! to survive. Every call is recorded for order assertions.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use serde_json::Value;

    use super::{BrowserSession, PageElement};
    use crate::locator::Locator;
    use crate::result::{ProbeError, ProbeResult};

    /// Staged behavior for one mock element
    #[derive(Debug, Clone)]
    pub struct ElementSpec {
        text: String,
        value: String,
        attributes: HashMap<String, String>,
        displayed: bool,
        enabled: bool,
        blocked_clicks: u32,
        remove_on_click: bool,
        appear_after: Option<Duration>,
        rewrite_value_to: Option<String>,
    }

    impl Default for ElementSpec {
        fn default() -> Self {
            Self {
                text: String::new(),
                value: String::new(),
                attributes: HashMap::new(),
                displayed: true,
                enabled: true,
                blocked_clicks: 0,
                remove_on_click: false,
                appear_after: None,
                rewrite_value_to: None,
            }
        }
    }

    impl ElementSpec {
        /// A visible, enabled element with no text
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Set the element text
        #[must_use]
        pub fn text(mut self, text: impl Into<String>) -> Self {
            self.text = text.into();
            self
        }

        /// Set an attribute
        #[must_use]
        pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
            let _ = self.attributes.insert(name.into(), value.into());
            self
        }

        /// Mark the element as not displayed
        #[must_use]
        pub const fn hidden(mut self) -> Self {
            self.displayed = false;
            self
        }

        /// Mark the element as disabled
        #[must_use]
        pub const fn disabled(mut self) -> Self {
            self.enabled = false;
            self
        }

        /// Make the first `n` native clicks fail as intercepted
        #[must_use]
        pub const fn blocks_clicks(mut self, n: u32) -> Self {
            self.blocked_clicks = n;
            self
        }

        /// Remove the element from the DOM when clicked (banners)
        #[must_use]
        pub const fn removed_on_click(mut self) -> Self {
            self.remove_on_click = true;
            self
        }

        /// Make the element absent until `delay` has passed
        #[must_use]
        pub const fn appears_after(mut self, delay: Duration) -> Self {
            self.appear_after = Some(delay);
            self
        }

        /// Simulate an async input handler rewriting the typed value
        #[must_use]
        pub fn rewrites_value_to(mut self, value: impl Into<String>) -> Self {
            self.rewrite_value_to = Some(value.into());
            self
        }
    }

    #[derive(Debug)]
    struct NodeState {
        locator: Locator,
        text: String,
        value: String,
        attributes: HashMap<String, String>,
        present: bool,
        displayed: bool,
        enabled: bool,
        blocked_clicks: u32,
        native_clicks: u32,
        forced_clicks: u32,
        remove_on_click: bool,
        appear_at: Option<Instant>,
        rewrite_value_to: Option<String>,
    }

    impl NodeState {
        fn is_present(&self) -> bool {
            self.present && self.appear_at.map_or(true, |at| Instant::now() >= at)
        }
    }

    #[derive(Debug)]
    enum SubmitEffect {
        Reveal(usize),
        SetUrl(String),
        SetPageText(String),
    }

    #[derive(Debug)]
    struct Shared {
        url: Mutex<String>,
        page_text: Mutex<String>,
        scripts: Mutex<HashMap<String, Value>>,
        screenshot_png: Mutex<Vec<u8>>,
        nodes: Mutex<Vec<NodeState>>,
        calls: Mutex<Vec<String>>,
        submit_effects: Mutex<Vec<SubmitEffect>>,
    }

    impl Shared {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn apply_submit_effects(&self) {
            let effects = self.submit_effects.lock().unwrap();
            for effect in effects.iter() {
                match effect {
                    SubmitEffect::Reveal(index) => {
                        let mut nodes = self.nodes.lock().unwrap();
                        if let Some(node) = nodes.get_mut(*index) {
                            node.present = true;
                            node.appear_at = None;
                        }
                    }
                    SubmitEffect::SetUrl(url) => {
                        *self.url.lock().unwrap() = url.clone();
                    }
                    SubmitEffect::SetPageText(text) => {
                        *self.page_text.lock().unwrap() = text.clone();
                    }
                }
            }
        }
    }

    /// Handle to a staged element; doubles as the session's element type
    /// and as a probe for assertions (click counters, typed value).
    #[derive(Debug, Clone)]
    pub struct MockElement {
        shared: Arc<Shared>,
        index: usize,
    }

    impl MockElement {
        fn with_state<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
            let mut nodes = self.shared.nodes.lock().unwrap();
            f(&mut nodes[self.index])
        }

        /// Native clicks received so far
        #[must_use]
        pub fn native_clicks(&self) -> u32 {
            self.with_state(|n| n.native_clicks)
        }

        /// Forced DOM-dispatch clicks received so far
        #[must_use]
        pub fn forced_clicks(&self) -> u32 {
            self.with_state(|n| n.forced_clicks)
        }

        /// Current typed value
        #[must_use]
        pub fn current_value(&self) -> String {
            self.with_state(|n| n.value.clone())
        }

        /// Whether the element is currently in the DOM
        #[must_use]
        pub fn is_present(&self) -> bool {
            self.with_state(|n| n.is_present())
        }

        /// Put the element in or out of the DOM
        pub fn set_present(&self, present: bool) {
            self.with_state(|n| {
                n.present = present;
                n.appear_at = None;
            });
        }
    }

    impl PageElement for MockElement {
        fn click(&self) -> ProbeResult<()> {
            let blocked = self.with_state(|n| {
                if n.blocked_clicks > 0 {
                    n.blocked_clicks -= 1;
                    Some(n.locator.to_string())
                } else {
                    n.native_clicks += 1;
                    if n.remove_on_click {
                        n.present = false;
                    }
                    None
                }
            });
            match blocked {
                Some(what) => Err(ProbeError::InteractionBlocked { what }),
                None => Ok(()),
            }
        }

        fn dispatch_click(&self) -> ProbeResult<()> {
            self.with_state(|n| {
                n.forced_clicks += 1;
                if n.remove_on_click {
                    n.present = false;
                }
            });
            Ok(())
        }

        fn send_text(&self, text: &str) -> ProbeResult<()> {
            let submitted = text.contains('\n');
            self.with_state(|n| {
                let typed: String = text.chars().filter(|c| *c != '\n').collect();
                n.value.push_str(&typed);
                if let Some(rewrite) = n.rewrite_value_to.clone() {
                    n.value = rewrite;
                }
            });
            if submitted {
                self.shared.apply_submit_effects();
            }
            Ok(())
        }

        fn clear(&self) -> ProbeResult<()> {
            self.with_state(|n| n.value.clear());
            Ok(())
        }

        fn text(&self) -> ProbeResult<String> {
            Ok(self.with_state(|n| n.text.clone()))
        }

        fn attribute(&self, name: &str) -> ProbeResult<Option<String>> {
            Ok(self.with_state(|n| {
                if name == "value" {
                    Some(n.value.clone())
                } else {
                    n.attributes.get(name).cloned()
                }
            }))
        }

        fn is_displayed(&self) -> ProbeResult<bool> {
            Ok(self.with_state(|n| n.displayed))
        }

        fn is_enabled(&self) -> ProbeResult<bool> {
            Ok(self.with_state(|n| n.enabled))
        }
    }

    /// Scriptable in-memory browser session
    #[derive(Debug, Clone)]
    pub struct MockBrowser {
        shared: Arc<Shared>,
    }

    impl MockBrowser {
        /// Create a session currently showing `url`
        #[must_use]
        pub fn new(url: impl Into<String>) -> Self {
            Self {
                shared: Arc::new(Shared {
                    url: Mutex::new(url.into()),
                    page_text: Mutex::new(String::new()),
                    scripts: Mutex::new(HashMap::new()),
                    screenshot_png: Mutex::new(vec![0x89, b'P', b'N', b'G']),
                    nodes: Mutex::new(Vec::new()),
                    calls: Mutex::new(Vec::new()),
                    submit_effects: Mutex::new(Vec::new()),
                }),
            }
        }

        /// Stage an element behind `locator` and return its probe handle
        pub fn add_element(&self, locator: Locator, spec: ElementSpec) -> MockElement {
            let mut nodes = self.shared.nodes.lock().unwrap();
            let index = nodes.len();
            nodes.push(NodeState {
                locator,
                text: spec.text,
                value: spec.value,
                attributes: spec.attributes,
                present: true,
                displayed: spec.displayed,
                enabled: spec.enabled,
                blocked_clicks: spec.blocked_clicks,
                native_clicks: 0,
                forced_clicks: 0,
                remove_on_click: spec.remove_on_click,
                appear_at: spec.appear_after.map(|d| Instant::now() + d),
                rewrite_value_to: spec.rewrite_value_to,
            });
            MockElement {
                shared: Arc::clone(&self.shared),
                index,
            }
        }

        /// Set the rendered page text
        pub fn set_page_text(&self, text: impl Into<String>) {
            *self.shared.page_text.lock().unwrap() = text.into();
        }

        /// Can the result of a script evaluation
        pub fn set_script(&self, script: impl Into<String>, value: Value) {
            let _ = self
                .shared
                .scripts
                .lock()
                .unwrap()
                .insert(script.into(), value);
        }

        /// Set the screenshot bytes returned by the session
        pub fn set_screenshot(&self, png: Vec<u8>) {
            *self.shared.screenshot_png.lock().unwrap() = png;
        }

        /// Make `element` enter the DOM when a form is submitted
        pub fn on_submit_reveal(&self, element: &MockElement) {
            element.set_present(false);
            self.shared
                .submit_effects
                .lock()
                .unwrap()
                .push(SubmitEffect::Reveal(element.index));
        }

        /// Change the page URL when a form is submitted
        pub fn on_submit_set_url(&self, url: impl Into<String>) {
            self.shared
                .submit_effects
                .lock()
                .unwrap()
                .push(SubmitEffect::SetUrl(url.into()));
        }

        /// Change the page text when a form is submitted
        pub fn on_submit_set_page_text(&self, text: impl Into<String>) {
            self.shared
                .submit_effects
                .lock()
                .unwrap()
                .push(SubmitEffect::SetPageText(text.into()));
        }

        /// Every recorded call, in order
        #[must_use]
        pub fn history(&self) -> Vec<String> {
            self.shared.calls.lock().unwrap().clone()
        }

        /// How many times `locator` has been queried
        #[must_use]
        pub fn query_count(&self, locator: &Locator) -> usize {
            let needle = format!("query:{locator}");
            self.shared
                .calls
                .lock()
                .unwrap()
                .iter()
                .filter(|call| **call == needle)
                .count()
        }
    }

    impl BrowserSession for MockBrowser {
        type Element = MockElement;

        fn navigate(&self, url: &str) -> ProbeResult<()> {
            self.shared.record(format!("navigate:{url}"));
            *self.shared.url.lock().unwrap() = url.to_string();
            Ok(())
        }

        fn evaluate_script(&self, script: &str) -> ProbeResult<Value> {
            self.shared.record(format!("script:{script}"));
            Ok(self
                .shared
                .scripts
                .lock()
                .unwrap()
                .get(script)
                .cloned()
                .unwrap_or(Value::Null))
        }

        fn query(&self, locator: &Locator) -> ProbeResult<Vec<MockElement>> {
            self.shared.record(format!("query:{locator}"));
            let nodes = self.shared.nodes.lock().unwrap();
            Ok(nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.locator == *locator && n.is_present())
                .map(|(index, _)| MockElement {
                    shared: Arc::clone(&self.shared),
                    index,
                })
                .collect())
        }

        fn current_url(&self) -> ProbeResult<String> {
            Ok(self.shared.url.lock().unwrap().clone())
        }

        fn page_text(&self) -> ProbeResult<String> {
            Ok(self.shared.page_text.lock().unwrap().clone())
        }

        fn screenshot(&self) -> ProbeResult<Vec<u8>> {
            self.shared.record("screenshot".to_string());
            Ok(self.shared.screenshot_png.lock().unwrap().clone())
        }
    }
}
