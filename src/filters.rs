//! Page-scoped filter selection and its single-writer store.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::log_filters_applied;

/// Active year/region/category constraint. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSelection {
    pub year: Option<i32>,
    pub region: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid year filter: {0:?}")]
    InvalidYear(String),
}

impl FilterSelection {
    pub fn unconstrained() -> Self {
        Self::default()
    }

    /// Builds a selection from raw form fields; blank fields mean "no constraint".
    pub fn from_form(year: &str, region: &str, category: &str) -> Result<Self, FilterError> {
        let year = match non_blank(year) {
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|_| FilterError::InvalidYear(raw.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            year,
            region: non_blank(region).map(str::to_string),
            category: non_blank(category).map(str::to_string),
        })
    }

    pub fn is_unconstrained(&self) -> bool {
        self.year.is_none() && self.region.is_none() && self.category.is_none()
    }

    /// Query parameters for the constrained fields only.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(year) = self.year {
            pairs.push(("year", year.to_string()));
        }
        if let Some(region) = &self.region {
            pairs.push(("region", region.clone()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        pairs
    }
}

/// Year as a client sends it: a JSON number or its text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum YearField {
    Number(i32),
    Text(String),
}

/// Posted filter payload. Missing, `null` and blank fields are unconstrained,
/// so a snapshot's `filters` object can be posted back as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterForm {
    pub year: Option<YearField>,
    pub region: Option<String>,
    pub category: Option<String>,
}

impl FilterForm {
    pub fn into_selection(self) -> Result<FilterSelection, FilterError> {
        let year = match self.year {
            Some(YearField::Number(year)) => year.to_string(),
            Some(YearField::Text(raw)) => raw,
            None => String::new(),
        };
        FilterSelection::from_form(
            &year,
            self.region.as_deref().unwrap_or_default(),
            self.category.as_deref().unwrap_or_default(),
        )
    }
}

fn non_blank(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// The one reader that reacts to filter changes.
pub trait FilterSubscriber: Send + Sync + 'static {
    fn on_filters_changed(&self, selection: &FilterSelection);
}

#[derive(Clone)]
pub struct FilterStore {
    selection: Arc<RwLock<FilterSelection>>,
    subscriber: Arc<dyn FilterSubscriber>,
}

impl FilterStore {
    pub fn new(subscriber: Arc<dyn FilterSubscriber>) -> Self {
        Self {
            selection: Arc::new(RwLock::new(FilterSelection::unconstrained())),
            subscriber,
        }
    }

    pub fn selection(&self) -> FilterSelection {
        self.selection
            .read()
            .expect("filter selection lock should not be poisoned")
            .clone()
    }

    /// Replaces the whole selection and notifies the subscriber.
    ///
    /// The write lock is held through the notification so concurrent applies
    /// reach the subscriber in the order they were stored. The subscriber must
    /// not call back into the store.
    pub fn apply(&self, selection: FilterSelection) {
        let mut guard = self
            .selection
            .write()
            .expect("filter selection lock should not be poisoned");
        *guard = selection;

        log_filters_applied(&guard);
        self.subscriber.on_filters_changed(&guard);
    }

    pub fn clear(&self) {
        self.apply(FilterSelection::unconstrained());
    }
}
