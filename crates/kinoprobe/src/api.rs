//! Thin client for the public catalog search API.
//!
//! Used by API test scenarios; the browser workflow never touches it. One
//! client per test, no shared state. Transport-level retry semantics are
//! the HTTP stack's business, not ours.

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ApiSettings;
use crate::result::{ProbeError, ProbeResult};

/// Movie search endpoint path
const MOVIE_SEARCH_PATH: &str = "/movie/search";
/// Movie detail endpoint path
const MOVIE_PATH: &str = "/movie";

/// Aggregate ratings of a movie
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// Kinopoisk rating
    #[serde(default)]
    pub kp: Option<f64>,
    /// IMDb rating
    #[serde(default)]
    pub imdb: Option<f64>,
}

/// One movie record from the catalog API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Catalog id
    pub id: u64,
    /// Localized title
    #[serde(default)]
    pub name: Option<String>,
    /// Original or transliterated title
    #[serde(default)]
    pub alternative_name: Option<String>,
    /// Release year
    #[serde(default)]
    pub year: Option<u32>,
    /// Aggregate ratings
    #[serde(default)]
    pub rating: Option<Rating>,
}

impl Movie {
    /// Best available title: localized first, then the alternative
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.alternative_name.as_deref())
            .unwrap_or("")
    }
}

/// Paged search response from the catalog API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSearchResponse {
    /// Matching movies on this page
    #[serde(default)]
    pub docs: Vec<Movie>,
    /// Total matches across all pages
    #[serde(default)]
    pub total: u64,
    /// Page size used
    #[serde(default)]
    pub limit: u32,
    /// Page number (1-based)
    #[serde(default)]
    pub page: u32,
    /// Total number of pages
    #[serde(default)]
    pub pages: u32,
}

impl MovieSearchResponse {
    /// Whether the search produced any results
    #[must_use]
    pub fn has_results(&self) -> bool {
        !self.docs.is_empty()
    }

    /// The first result, when there is one
    #[must_use]
    pub fn first(&self) -> Option<&Movie> {
        self.docs.first()
    }
}

/// Blocking client for the catalog search API
#[derive(Debug, Clone)]
pub struct KinopoiskClient {
    http: Client,
    base_url: String,
}

impl KinopoiskClient {
    /// Build a client from API settings.
    ///
    /// The token is attached to every request as `X-API-KEY`.
    pub fn new(api: &ApiSettings) -> ProbeResult<Self> {
        let mut token =
            HeaderValue::from_str(&api.token).map_err(|_| ProbeError::Config {
                message: "API token contains characters not valid in a header".to_string(),
            })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        let _ = headers.insert("X-API-KEY", token);

        // the public endpoint's certificate chain is broken behind some
        // proxies; verification stays off, matching the suite's usage
        let http = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are issued against (version prefix included)
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search movies by title
    pub fn search_movies(
        &self,
        query: &str,
        page: u32,
        limit: u32,
    ) -> ProbeResult<MovieSearchResponse> {
        let url = format!("{}{MOVIE_SEARCH_PATH}", self.base_url);
        debug!(%url, query, page, limit, "searching movies");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("page", page.to_string()),
                ("limit", limit.to_string()),
                ("query", query.to_string()),
            ])
            .send()?;
        Self::parse(response)
    }

    /// Fetch one movie by catalog id
    pub fn movie_by_id(&self, id: u64) -> ProbeResult<Movie> {
        let url = format!("{}{MOVIE_PATH}/{id}", self.base_url);
        debug!(%url, "fetching movie");
        let response = self.http.get(&url).send()?;
        Self::parse(response)
    }

    fn parse<T: DeserializeOwned>(response: Response) -> ProbeResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Api {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
        Ok(response.json()?)
    }
}
