//! Scraped items and the records kept from them
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use crate::errors::*;

/// Closed range every valence score has to fall in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValenceRange {
    floor: f64,
    ceil: f64,
}

impl Default for ValenceRange {
    fn default() -> Self {
        ValenceRange { floor: -1.0, ceil: 1.0 }
    }
}

impl ValenceRange {
    pub fn new(floor: f64, ceil: f64) -> Result<Self> {
        if !(floor.is_finite() && ceil.is_finite()) || floor > ceil {
            return Err(Error::InvalidRange(format!(
                "[{}, {}] is not a usable valence range", floor, ceil)));
        }
        Ok(ValenceRange { floor: floor, ceil: ceil })
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn ceil(&self) -> f64 {
        self.ceil
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.floor && value <= self.ceil
    }

    /// The value itself if it is in range
    pub fn check(&self, value: f64) -> Result<f64> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(Error::ValenceOutOfRange { value: value, floor: self.floor, ceil: self.ceil })
        }
    }

    /// Map `value` linearly from `[min, max]` onto this range
    ///
    /// Values outside `[min, max]` land outside this range and fail `check` later on.
    pub fn rescale(&self, value: f64, min: f64, max: f64) -> Result<f64> {
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(Error::InvalidRange(format!("cannot rescale from [{}, {}]", min, max)));
        }
        Ok(self.floor + (value - min) / (max - min) * (self.ceil - self.floor))
    }
}

/// How a site rated an item
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rating {
    /// Already a valence score
    Valence(f64),
    /// A rating on the site's own scale, such as 4 out of 5 stars
    Scale { value: f64, min: f64, max: f64 },
}

/// One item as a scraper produces it
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedInfo {
    pub text: String,
    pub rating: Rating,
    pub metadata: BTreeMap<String, Value>,
}

impl ScrapedInfo {
    pub fn new<S: Into<String>>(text: S, rating: Rating) -> Self {
        ScrapedInfo { text: text.into(), rating: rating, metadata: BTreeMap::new() }
    }

    pub fn with_metadata<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The rating expressed in `range`. Not checked.
    pub fn valence_score(&self, range: &ValenceRange) -> Result<f64> {
        match self.rating {
            Rating::Valence(value) => Ok(value),
            Rating::Scale { value, min, max } => range.rescale(value, min, max),
        }
    }
}

/// One accumulated record, as it is written to the checkpoint JSON
///
/// Fields are declared in alphabetical order and metadata is a sorted map, so the JSON keys
/// come out sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedRecord {
    pub metadata: BTreeMap<String, Value>,
    pub text: String,
    pub valence: f64,
}

impl ScrapedRecord {
    /// Fails if the valence score is outside `range`
    pub fn new(info: ScrapedInfo, range: &ValenceRange) -> Result<Self> {
        let valence = range.check(info.valence_score(range)?)?;
        Ok(ScrapedRecord { metadata: info.metadata, text: info.text, valence: valence })
    }
}
