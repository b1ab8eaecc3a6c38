// Copyright 2026 Savor Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shared domain types used across loading, ranking, and rendering.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::RecommendError;
use crate::error::RecommendResult;
use crate::output::TimingBreakdown;

pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantRecord {
    pub id: String,
    pub name: String,
    pub city: String,
    pub area: Option<String>,
    pub cuisine: String,
    pub rating: f64,
    pub rating_count: u64,
    pub cost: f64,
}

/// Lookup seam between the engine and whatever holds the feature vectors.
pub trait EncodingSource {
    fn encoding(&self, id: &str) -> Option<&[f64]>;
}

impl EncodingSource for HashMap<String, Vec<f64>> {
    fn encoding(&self, id: &str) -> Option<&[f64]> {
        self.get(id).map(Vec::as_slice)
    }
}

/// Row-aligned feature vectors keyed by restaurant id, all of one dimension.
#[derive(Debug, Clone, Default)]
pub struct EncodingTable {
    dim: usize,
    rows: HashMap<String, Vec<f64>>,
}

impl EncodingTable {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            rows: HashMap::new(),
        }
    }

    /// Inserts a row. The first row fixes the dimension when the table was
    /// created with `dim == 0`.
    pub fn insert(&mut self, id: String, vector: Vec<f64>) -> anyhow::Result<()> {
        if self.dim == 0 && self.rows.is_empty() {
            self.dim = vector.len();
        }
        if vector.len() != self.dim {
            anyhow::bail!(
                "encoding '{}' has dim {}, expected {}",
                id,
                vector.len(),
                self.dim
            );
        }
        if let Some(bad) = vector.iter().find(|v| !v.is_finite()) {
            anyhow::bail!("encoding '{}' has non-finite component {}", id, bad);
        }
        if self.rows.contains_key(&id) {
            anyhow::bail!("duplicate encoding id '{}'", id);
        }
        self.rows.insert(id, vector);
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }
}

impl EncodingSource for EncodingTable {
    fn encoding(&self, id: &str) -> Option<&[f64]> {
        self.rows.get(id).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum AreaFilter {
    Any,
    Named(String),
}

impl AreaFilter {
    /// Maps the "all areas" sentinel label to `Any`.
    pub fn from_label(label: Option<&str>, all_areas: &str) -> Self {
        match label {
            None => AreaFilter::Any,
            Some(raw) if raw.trim().eq_ignore_ascii_case(all_areas.trim()) => AreaFilter::Any,
            Some(raw) => AreaFilter::Named(raw.to_string()),
        }
    }

    pub fn label<'a>(&'a self, all_areas: &'a str) -> &'a str {
        match self {
            AreaFilter::Any => all_areas,
            AreaFilter::Named(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCriteria {
    pub city: String,
    pub area: AreaFilter,
    pub cuisines: Vec<String>,
    pub min_rating: f64,
    pub max_cost: f64,
    pub top_n: usize,
}

impl FilterCriteria {
    pub fn validate(&self) -> RecommendResult<()> {
        if self.city.trim().is_empty() {
            return Err(invalid("city must not be empty"));
        }
        if let AreaFilter::Named(name) = &self.area
            && name.trim().is_empty()
        {
            return Err(invalid("area must not be empty"));
        }
        if self.cuisines.iter().any(|c| c.trim().is_empty()) {
            return Err(invalid("cuisine names must not be empty"));
        }
        if !self.min_rating.is_finite() || !(0.0..=MAX_RATING).contains(&self.min_rating) {
            return Err(invalid(&format!(
                "min_rating must be within [0, {MAX_RATING}], got {}",
                self.min_rating
            )));
        }
        if !self.max_cost.is_finite() || self.max_cost < 0.0 {
            return Err(invalid(&format!(
                "max_cost must be a non-negative number, got {}",
                self.max_cost
            )));
        }
        if self.top_n == 0 {
            return Err(invalid("top_n must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> RecommendError {
    RecommendError::InvalidCriteria(msg.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub record: RestaurantRecord,
    pub similarity_score: f64,
}

/// Pool size after each filter stage. A stage that never ran stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub catalog: usize,
    pub city: Option<usize>,
    pub area: Option<usize>,
    pub cuisine: Option<usize>,
    pub rating_cost: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Recommendation {
    pub items: Vec<RankedResult>,
    pub stages: StageCounts,
    pub pool_size: usize,
    pub dim: usize,
    pub timings: TimingBreakdown,
}
