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

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::model::RankedResult;

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct TimingBreakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct StatsOut {
    pub took_ms: i64,
    pub total_hits: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped_unknown_area: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_dim: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_count: Option<i64>,
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings: Option<TimingBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOut {
    pub city: String,
    pub area: String,
    pub cuisines: Vec<String>,
    pub min_rating: f64,
    pub max_cost: f64,
    pub top_n: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorOut {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct JsonResponse {
    pub ok: bool,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOut>,
}

impl JsonResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            schema_version: "1".to_string(),
            ..Default::default()
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            ok: false,
            schema_version: "1".to_string(),
            error: Some(ErrorOut {
                code: code.to_string(),
                message: message.to_string(),
                details: None,
                hint: None,
            }),
            ..Default::default()
        }
    }

    pub fn with_error_hint(mut self, hint: &str) -> Self {
        if let Some(error) = &mut self.error {
            error.hint = Some(hint.to_string());
        }
        self
    }

    pub fn with_query(mut self, query: QueryOut) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_results(mut self, results: Vec<Value>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_facets(mut self, facets: Vec<String>) -> Self {
        self.facets = Some(facets);
        self
    }

    pub fn with_explain(mut self, explain: Value) -> Self {
        self.explain = Some(explain);
        self
    }

    pub fn with_stats(mut self, stats: StatsOut) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Value) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

pub fn print_json(resp: &JsonResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(resp)?;
    println!("{text}");
    Ok(())
}

pub fn results_to_json(items: &[RankedResult]) -> Result<Vec<Value>> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(Into::into))
        .collect()
}

/// One tab-separated line per result, best first.
pub fn print_results(items: &[RankedResult], explain: bool) {
    for (rank, item) in items.iter().enumerate() {
        let r = &item.record;
        let line = format!(
            "{}\t{}\t{:.1} ({} reviews)\t{}\t{}\t{}",
            rank + 1,
            r.name,
            r.rating,
            r.rating_count,
            format_cost(r.cost),
            r.cuisine,
            r.area.as_deref().unwrap_or("-"),
        );
        if explain {
            println!("{:.3}\t{line}", item.similarity_score);
        } else {
            println!("{line}");
        }
    }
}

pub fn format_cost(cost: f64) -> String {
    if cost.fract() == 0.0 {
        format!("{cost:.0}")
    } else {
        format!("{cost:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RestaurantRecord;

    #[test]
    fn results_flatten_record_fields() {
        let item = RankedResult {
            record: RestaurantRecord {
                id: "7".to_string(),
                name: "Trattoria".to_string(),
                city: "Metro".to_string(),
                area: None,
                cuisine: "Italian".to_string(),
                rating: 4.5,
                rating_count: 12,
                cost: 400.0,
            },
            similarity_score: 0.5,
        };
        let json = results_to_json(&[item]).expect("to json");
        assert_eq!(json[0]["id"], "7");
        assert_eq!(json[0]["area"], Value::Null);
        assert_eq!(json[0]["similarity_score"], 0.5);
        assert_eq!(json[0]["rating_count"], 12);
    }

    #[test]
    fn cost_drops_zero_fraction() {
        assert_eq!(format_cost(400.0), "400");
        assert_eq!(format_cost(399.5), "399.50");
    }

    #[test]
    fn error_envelope_skips_empty_sections() {
        let resp = JsonResponse::error("invalid_criteria", "city must not be empty")
            .with_error_hint("pass --city");
        let value = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["code"], "invalid_criteria");
        assert_eq!(value["error"]["hint"], "pass --city");
        assert!(value.get("results").is_none());
        assert!(value.get("warnings").is_none());
    }
}
