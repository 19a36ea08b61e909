//! Locator abstraction: strategy + selector pairs and ordered fallback lists.
//!
//! The catalog's markup varies across deployments and experiments, so a
//! logical element ("the search input") is described by a [`LocatorSet`]:
//! an ordered list of [`Locator`] alternatives tried strictly in declared
//! order. Order is a deliberate priority, not interchangeable.

use serde::{Deserialize, Serialize};

/// How a locator's selector string should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Element id attribute
    Id,
    /// CSS selector
    Css,
    /// XPath expression
    XPath,
    /// Form control name attribute
    Name,
}

impl Strategy {
    /// Short name used in logs and locator rendering
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::Name => "name",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable descriptor of how to find an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    strategy: Strategy,
    value: String,
}

impl Locator {
    /// Create a locator with an explicit strategy
    #[must_use]
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    /// Locate by element id
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::new(Strategy::Id, value)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(value: impl Into<String>) -> Self {
        Self::new(Strategy::Css, value)
    }

    /// Locate by XPath expression
    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, value)
    }

    /// Locate by form control name
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self::new(Strategy::Name, value)
    }

    /// Get the strategy
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Get the selector string
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Render as a CSS selector where the strategy allows it.
    ///
    /// XPath locators have no CSS equivalent and return `None`.
    #[must_use]
    pub fn as_css(&self) -> Option<String> {
        match self.strategy {
            Strategy::Id => Some(format!("#{}", self.value)),
            Strategy::Css => Some(self.value.clone()),
            Strategy::Name => Some(format!("[name='{}']", self.value)),
            Strategy::XPath => None,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.strategy, self.value)
    }
}

/// An ordered list of locators considered equivalent alternatives.
///
/// Resolution tries candidates in declared order and stops at the first
/// success within one call; it never continues past a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSet {
    candidates: Vec<Locator>,
}

impl LocatorSet {
    /// Create a locator set from candidates in priority order
    #[must_use]
    pub fn new(candidates: Vec<Locator>) -> Self {
        Self { candidates }
    }

    /// Candidates in priority order
    #[must_use]
    pub fn candidates(&self) -> &[Locator] {
        &self.candidates
    }

    /// Number of candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the set has no candidates
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Iterate candidates in priority order
    pub fn iter(&self) -> std::slice::Iter<'_, Locator> {
        self.candidates.iter()
    }
}

impl From<Locator> for LocatorSet {
    fn from(locator: Locator) -> Self {
        Self::new(vec![locator])
    }
}

impl FromIterator<Locator> for LocatorSet {
    fn from_iter<I: IntoIterator<Item = Locator>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a LocatorSet {
    type Item = &'a Locator;
    type IntoIter = std::slice::Iter<'a, Locator>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

impl std::fmt::Display for LocatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, locator) in self.candidates.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{locator}")?;
        }
        write!(f, "]")
    }
}
