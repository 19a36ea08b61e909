//! kinoprobe: end-to-end test harness for the Kinopoisk movie catalog.
//!
//! The site's markup varies across deployments and experiments, so the
//! harness is built around data-driven fallback: logical elements are
//! described by ordered locator alternatives, and a synchronous
//! resolution/wait layer decides at runtime which variant is live.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  test case                                                      │
//! │     │                                                           │
//! │     ▼                                                           │
//! │  SearchPage ──► PageOps ──► ElementResolver ──► BrowserSession  │
//! │  (workflow)    (click/type)  (wait + fallback)   (collaborator) │
//! │     │                                                           │
//! │     └──► KinopoiskClient (API scenarios, outside the workflow)  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is created per test and discarded at test end; the crate
//! holds no global state. Waits are bounded spin-polls on the calling
//! thread; cancellation is timeout-based only.

#![warn(missing_docs)]

pub mod api;
pub mod browser;
pub mod config;
pub mod fixture;
pub mod locator;
pub mod page;
pub mod reporter;
pub mod resolver;
pub mod result;
pub mod search;
pub mod wait;

/// Chromium-backed [`BrowserSession`](browser::BrowserSession)
#[cfg(feature = "browser")]
pub mod chromium;

pub use crate::locator::{Locator, LocatorSet, Strategy};
pub use crate::result::{ProbeError, ProbeResult};
pub use crate::wait::{Condition, WaitPolicy, WaitVerdict};

/// Commonly used types in one import
pub mod prelude {
    pub use crate::api::{KinopoiskClient, Movie, MovieSearchResponse};
    pub use crate::browser::{BrowserSession, PageElement};
    pub use crate::config::{LocatorTable, Settings, WaitSettings};
    pub use crate::fixture::{open_search_page, run_ui_test};
    pub use crate::locator::{Locator, LocatorSet, Strategy};
    pub use crate::page::{PageOps, SubmitMode};
    pub use crate::reporter::{FsReporter, NullReporter, StepReporter};
    pub use crate::resolver::ElementResolver;
    pub use crate::result::{ProbeError, ProbeResult};
    pub use crate::search::{SearchOutcome, SearchPage, SearchSubmit, WorkflowState};
    pub use crate::wait::{Condition, WaitPolicy, WaitVerdict};
}
