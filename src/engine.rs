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

//! Filter-and-rank recommendation.
//!
//! Candidates that survive the filters are scored by their mean cosine
//! similarity to the whole surviving pool, so the ranking favors the most
//! representative members of the current selection. There is no seed item.

use std::collections::HashSet;
use std::time::Instant;

use serde_json::json;
use tracing::debug;

use crate::error::RecommendError;
use crate::error::RecommendResult;
use crate::model::AreaFilter;
use crate::model::EncodingSource;
use crate::model::FilterCriteria;
use crate::model::RankedResult;
use crate::model::Recommendation;
use crate::model::RestaurantRecord;
use crate::model::StageCounts;
use crate::output::TimingBreakdown;
use crate::similarity::mean_similarity;

pub const SCORING_MODE: &str = "mean_pairwise_cosine";

/// Case fold used for every match. Whitespace is significant.
pub fn fold(value: &str) -> String {
    value.to_lowercase()
}

struct FoldedCriteria {
    city: String,
    area: Option<String>,
    cuisines: HashSet<String>,
}

impl FoldedCriteria {
    fn new(criteria: &FilterCriteria) -> Self {
        Self {
            city: fold(&criteria.city),
            area: match &criteria.area {
                AreaFilter::Any => None,
                AreaFilter::Named(name) => Some(fold(name)),
            },
            cuisines: criteria.cuisines.iter().map(|c| fold(c)).collect(),
        }
    }
}

pub fn recommend<E>(
    catalog: &[RestaurantRecord],
    encodings: &E,
    criteria: &FilterCriteria,
) -> RecommendResult<Vec<RankedResult>>
where
    E: EncodingSource + ?Sized,
{
    recommend_with_report(catalog, encodings, criteria).map(|report| report.items)
}

pub fn recommend_with_report<E>(
    catalog: &[RestaurantRecord],
    encodings: &E,
    criteria: &FilterCriteria,
) -> RecommendResult<Recommendation>
where
    E: EncodingSource + ?Sized,
{
    criteria.validate()?;
    let mut timings = TimingBreakdown::default();
    let mut stages = StageCounts {
        catalog: catalog.len(),
        ..Default::default()
    };

    let filter_start = Instant::now();
    let pool = filter_pool(catalog, criteria, &mut stages);
    timings.filter_ms = Some(filter_start.elapsed().as_millis() as i64);

    if pool.is_empty() {
        debug!(?stages, "candidate pool empty, skipping similarity");
        return Ok(Recommendation {
            items: Vec::new(),
            stages,
            pool_size: 0,
            dim: 0,
            timings,
        });
    }

    let sim_start = Instant::now();
    let vectors = gather_encodings(catalog, encodings, &pool)?;
    let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
    let scores = mean_similarity(&vectors);
    timings.similarity_ms = Some(sim_start.elapsed().as_millis() as i64);

    let rank_start = Instant::now();
    let mut ranked: Vec<(usize, f64)> = pool.iter().copied().zip(scores).collect();
    sort_by_score_with_tiebreak(&mut ranked);
    ranked.truncate(criteria.top_n);
    let items: Vec<RankedResult> = ranked
        .into_iter()
        .map(|(idx, score)| RankedResult {
            record: catalog[idx].clone(),
            similarity_score: score,
        })
        .collect();
    timings.rank_ms = Some(rank_start.elapsed().as_millis() as i64);

    debug!(
        pool = pool.len(),
        dim,
        returned = items.len(),
        "ranked candidate pool"
    );

    Ok(Recommendation {
        items,
        stages,
        pool_size: pool.len(),
        dim,
        timings,
    })
}

/// Returns catalog positions surviving every predicate, in catalog order.
/// Stops at the first stage that leaves nothing.
fn filter_pool(
    catalog: &[RestaurantRecord],
    criteria: &FilterCriteria,
    stages: &mut StageCounts,
) -> Vec<usize> {
    let folded = FoldedCriteria::new(criteria);

    let mut pool: Vec<usize> = catalog
        .iter()
        .enumerate()
        .filter(|(_, r)| fold(&r.city) == folded.city)
        .map(|(i, _)| i)
        .collect();
    stages.city = Some(pool.len());
    if pool.is_empty() {
        return pool;
    }

    if let Some(area) = &folded.area {
        pool.retain(|&i| {
            catalog[i]
                .area
                .as_deref()
                .is_some_and(|a| fold(a) == *area)
        });
        stages.area = Some(pool.len());
        if pool.is_empty() {
            return pool;
        }
    }

    if !folded.cuisines.is_empty() {
        pool.retain(|&i| folded.cuisines.contains(&fold(&catalog[i].cuisine)));
        stages.cuisine = Some(pool.len());
        if pool.is_empty() {
            return pool;
        }
    }

    pool.retain(|&i| {
        let record = &catalog[i];
        record.rating >= criteria.min_rating && record.cost <= criteria.max_cost
    });
    stages.rating_cost = Some(pool.len());
    pool
}

fn gather_encodings<'a, E>(
    catalog: &[RestaurantRecord],
    encodings: &'a E,
    pool: &[usize],
) -> RecommendResult<Vec<&'a [f64]>>
where
    E: EncodingSource + ?Sized,
{
    let mut vectors: Vec<&'a [f64]> = Vec::with_capacity(pool.len());
    for &idx in pool {
        let id = &catalog[idx].id;
        let vector = encodings
            .encoding(id)
            .ok_or_else(|| RecommendError::DataIntegrity { id: id.clone() })?;
        if let Some(first) = vectors.first()
            && first.len() != vector.len()
        {
            return Err(RecommendError::DimensionMismatch {
                id: id.clone(),
                expected: first.len(),
                actual: vector.len(),
            });
        }
        vectors.push(vector);
    }
    Ok(vectors)
}

/// Descending by score; equal scores keep catalog order.
fn sort_by_score_with_tiebreak(items: &mut [(usize, f64)]) {
    items.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

pub fn build_explain_payload(
    report: &Recommendation,
    criteria: &FilterCriteria,
    all_areas: &str,
) -> serde_json::Value {
    json!({
        "mode": SCORING_MODE,
        "stages": report.stages,
        "pool_size": report.pool_size,
        "dim": report.dim,
        "truncated": report.pool_size > report.items.len(),
        "resolved_criteria": {
            "city": criteria.city,
            "area": criteria.area.label(all_areas),
            "cuisines": criteria.cuisines,
            "min_rating": criteria.min_rating,
            "max_cost": criteria.max_cost,
            "top_n": criteria.top_n,
        },
    })
}
