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

//! Loading the restaurant catalog and its encoding table.
//!
//! Both tables are read once and stay immutable afterwards. Catalog rows whose
//! area is the configured "unknown" label are dropped here so the engine never
//! sees them.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use csv::ReaderBuilder;
use csv::StringRecord;
use csv::Trim;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use tracing::debug;
use tracing::info;

use crate::config::Config;
use crate::engine::fold;
use crate::model::AreaFilter;
use crate::model::EncodingTable;
use crate::model::MAX_RATING;
use crate::model::RestaurantRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    JsonLines,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("jsonl") | Some("ndjson") => TableFormat::JsonLines,
            _ => TableFormat::Csv,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub catalog: Vec<RestaurantRecord>,
    pub encodings: EncodingTable,
    pub dropped_unknown_area: usize,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub catalog_count: usize,
    pub dropped_unknown_area: usize,
    pub encoding_count: usize,
    pub encoding_dim: usize,
    pub city_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub status: &'static str,
    pub missing_encodings: Vec<String>,
    pub orphan_encodings: usize,
}

impl Dataset {
    pub fn load(catalog_path: &Path, encodings_path: &Path, config: &Config) -> Result<Self> {
        let catalog_bytes = std::fs::read(catalog_path)
            .with_context(|| format!("read catalog {}", catalog_path.display()))?;
        let encoding_bytes = std::fs::read(encodings_path)
            .with_context(|| format!("read encodings {}", encodings_path.display()))?;

        let catalog = match TableFormat::from_path(catalog_path) {
            TableFormat::Csv => read_catalog_csv(catalog_bytes.as_slice()),
            TableFormat::JsonLines => read_catalog_jsonl(catalog_bytes.as_slice()),
        }
        .with_context(|| format!("parse catalog {}", catalog_path.display()))?;
        let encodings = match TableFormat::from_path(encodings_path) {
            TableFormat::Csv => read_encodings_csv(encoding_bytes.as_slice()),
            TableFormat::JsonLines => read_encodings_jsonl(encoding_bytes.as_slice()),
        }
        .with_context(|| format!("parse encodings {}", encodings_path.display()))?;

        let mut dataset = Self::from_parts(catalog, encodings, &config.unknown_area)?;
        dataset.fingerprint = Some(fingerprint(&catalog_bytes, &encoding_bytes));
        info!(
            catalog = dataset.catalog.len(),
            dropped = dataset.dropped_unknown_area,
            encodings = dataset.encodings.len(),
            dim = dataset.encodings.dim(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Builds a dataset from already parsed tables, dropping unknown-area rows.
    pub fn from_parts(
        catalog: Vec<RestaurantRecord>,
        encodings: EncodingTable,
        unknown_area: &str,
    ) -> Result<Self> {
        let unknown = fold(unknown_area);
        let mut seen = HashSet::new();
        for record in &catalog {
            if !seen.insert(record.id.as_str()) {
                anyhow::bail!("duplicate catalog id '{}'", record.id);
            }
        }
        let before = catalog.len();
        let catalog: Vec<RestaurantRecord> = catalog
            .into_iter()
            .filter(|r| {
                unknown.is_empty() || r.area.as_deref().is_none_or(|area| fold(area) != unknown)
            })
            .collect();
        let dropped_unknown_area = before - catalog.len();
        if dropped_unknown_area > 0 {
            debug!(dropped_unknown_area, "dropped catalog rows with unknown area");
        }
        Ok(Self {
            catalog,
            encodings,
            dropped_unknown_area,
            fingerprint: None,
        })
    }

    /// Distinct cities, sorted. Spellings that differ only by case collapse to
    /// the first one seen.
    pub fn cities(&self) -> Vec<String> {
        let mut cities = distinct(self.catalog.iter().map(|r| r.city.as_str()));
        cities.sort();
        cities
    }

    /// Distinct areas of a city in catalog order. The "all areas" label leads
    /// the list when there is a real choice to make.
    pub fn areas(&self, city: &str, all_areas_label: &str) -> Vec<String> {
        let city = fold(city);
        let mut areas = distinct(
            self.catalog
                .iter()
                .filter(|r| fold(&r.city) == city)
                .filter_map(|r| r.area.as_deref()),
        );
        if areas.len() > 1 {
            areas.insert(0, all_areas_label.to_string());
        }
        areas
    }

    pub fn cuisines(&self, city: &str, area: &AreaFilter) -> Vec<String> {
        let city = fold(city);
        let area = match area {
            AreaFilter::Any => None,
            AreaFilter::Named(name) => Some(fold(name)),
        };
        let mut cuisines = distinct(
            self.catalog
                .iter()
                .filter(|r| fold(&r.city) == city)
                .filter(|r| match &area {
                    None => true,
                    Some(area) => r.area.as_deref().is_some_and(|a| fold(a) == *area),
                })
                .map(|r| r.cuisine.as_str()),
        );
        cuisines.sort();
        cuisines
    }

    pub fn integrity_check(&self) -> IntegrityReport {
        let missing_encodings: Vec<String> = self
            .catalog
            .iter()
            .filter(|r| !self.encodings.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        let catalog_ids: HashSet<&str> = self.catalog.iter().map(|r| r.id.as_str()).collect();
        let orphan_encodings = self
            .encodings
            .ids()
            .filter(|id| !catalog_ids.contains(id))
            .count();
        IntegrityReport {
            status: if missing_encodings.is_empty() {
                "ok"
            } else {
                "misaligned"
            },
            missing_encodings,
            orphan_encodings,
        }
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            catalog_count: self.catalog.len(),
            dropped_unknown_area: self.dropped_unknown_area,
            encoding_count: self.encodings.len(),
            encoding_dim: self.encodings.dim(),
            city_count: self.cities().len(),
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        if value.is_empty() {
            continue;
        }
        if seen.insert(fold(value)) {
            out.push(value.to_string());
        }
    }
    out
}

fn fingerprint(catalog: &[u8], encodings: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((catalog.len() as u64).to_le_bytes());
    hasher.update(catalog);
    hasher.update((encodings.len() as u64).to_le_bytes());
    hasher.update(encodings);
    hex::encode(hasher.finalize())
}

fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

#[derive(Debug)]
enum IdColumn {
    Named(usize),
    RowPosition,
}

#[derive(Debug)]
struct CatalogColumns {
    id: IdColumn,
    name: usize,
    city: usize,
    area: Option<usize>,
    cuisine: usize,
    rating: usize,
    rating_count: Option<usize>,
    cost: usize,
}

impl CatalogColumns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |want: &str| names.iter().position(|n| n == want);
        let require = |want: &str| {
            find(want).ok_or_else(|| anyhow::anyhow!("catalog is missing a '{want}' column"))
        };
        let id = match find("id") {
            Some(idx) => IdColumn::Named(idx),
            None if names.first().is_some_and(|n| n.is_empty()) => IdColumn::Named(0),
            None => IdColumn::RowPosition,
        };
        Ok(Self {
            id,
            name: require("name")?,
            city: require("city")?,
            area: find("area"),
            cuisine: require("cuisine")?,
            rating: require("rating")?,
            rating_count: find("rating_count"),
            cost: require("cost")?,
        })
    }

    fn parse(&self, record: &StringRecord, row: usize) -> Result<RestaurantRecord> {
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let id = match self.id {
            IdColumn::Named(idx) => field(idx).to_string(),
            IdColumn::RowPosition => row.to_string(),
        };
        if id.is_empty() {
            anyhow::bail!("row {row}: empty id");
        }
        let rating = parse_number(field(self.rating), "rating", row)?;
        if !(0.0..=MAX_RATING).contains(&rating) {
            anyhow::bail!("row {row}: rating {rating} outside [0, {MAX_RATING}]");
        }
        let cost = parse_number(field(self.cost), "cost", row)?;
        if cost < 0.0 {
            anyhow::bail!("row {row}: negative cost {cost}");
        }
        let rating_count = match self.rating_count {
            Some(idx) => parse_count(field(idx), row)?,
            None => 0,
        };
        let area = self
            .area
            .map(field)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        Ok(RestaurantRecord {
            id,
            name: field(self.name).to_string(),
            city: field(self.city).to_string(),
            area,
            cuisine: field(self.cuisine).to_string(),
            rating,
            rating_count,
            cost,
        })
    }
}

fn parse_number(raw: &str, column: &str, row: usize) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("row {row}: {column} '{raw}' is not a number"))?;
    if !value.is_finite() {
        anyhow::bail!("row {row}: {column} '{raw}' is not finite");
    }
    Ok(value)
}

fn parse_count(raw: &str, row: usize) -> Result<u64> {
    if raw.is_empty() {
        return Ok(0);
    }
    if let Ok(count) = raw.parse::<u64>() {
        return Ok(count);
    }
    let value = parse_number(raw, "rating_count", row)?;
    if value < 0.0 {
        anyhow::bail!("row {row}: negative rating_count {raw}");
    }
    Ok(value.trunc() as u64)
}

pub fn read_catalog_csv(reader: impl std::io::Read) -> Result<Vec<RestaurantRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().context("read catalog header")?.clone();
    let columns = CatalogColumns::resolve(&headers)?;
    let mut out = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("read catalog row {row}"))?;
        out.push(columns.parse(&record, row)?);
    }
    Ok(out)
}

/// First column is the id, every other column is one vector component.
pub fn read_encodings_csv(reader: impl std::io::Read) -> Result<EncodingTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let width = rdr.headers().context("read encoding header")?.len();
    if width < 2 {
        anyhow::bail!("encoding table needs an id column and at least one component");
    }
    let mut table = EncodingTable::new(width - 1);
    for (row, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("read encoding row {row}"))?;
        let mut fields = record.iter();
        let id = fields.next().unwrap_or("").to_string();
        if id.is_empty() {
            anyhow::bail!("encoding row {row}: empty id");
        }
        let vector = fields
            .map(|raw| {
                raw.parse::<f64>()
                    .with_context(|| format!("encoding row {row}: '{raw}' is not a number"))
            })
            .collect::<Result<Vec<f64>>>()?;
        table.insert(id, vector)?;
    }
    Ok(table)
}

#[derive(Debug, Deserialize)]
struct CatalogLine {
    id: serde_json::Value,
    name: String,
    #[serde(alias = "City")]
    city: String,
    #[serde(default, alias = "Area")]
    area: Option<String>,
    cuisine: String,
    rating: f64,
    #[serde(default)]
    rating_count: Option<serde_json::Value>,
    cost: f64,
}

#[derive(Debug, Deserialize)]
struct EncodingLine {
    id: serde_json::Value,
    vector: Vec<f64>,
}

fn json_id(value: serde_json::Value, line: usize) -> Result<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => anyhow::bail!("line {line}: unsupported id {other}"),
    }
}

/// Counts written from a float column arrive as `80.0`; accept them like CSV does.
fn json_count(value: Option<serde_json::Value>, line: usize) -> Result<u64> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(0),
        Some(serde_json::Value::Number(n)) => parse_count(&n.to_string(), line),
        Some(serde_json::Value::String(s)) => parse_count(s.trim(), line),
        Some(other) => anyhow::bail!("line {line}: unsupported rating_count {other}"),
    }
}

fn json_lines(reader: impl std::io::Read) -> impl Iterator<Item = (usize, Result<String>)> {
    std::io::BufReader::new(reader)
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.map_err(anyhow::Error::from)))
        .filter(|(_, line)| !matches!(line, Ok(text) if text.trim().is_empty()))
}

pub fn read_catalog_jsonl(reader: impl std::io::Read) -> Result<Vec<RestaurantRecord>> {
    let mut out = Vec::new();
    for (line_no, line) in json_lines(reader) {
        let line = line.with_context(|| format!("read line {line_no}"))?;
        let parsed: CatalogLine =
            serde_json::from_str(&line).with_context(|| format!("parse line {line_no}"))?;
        if !parsed.rating.is_finite() || !(0.0..=MAX_RATING).contains(&parsed.rating) {
            anyhow::bail!("line {line_no}: rating {} outside [0, {MAX_RATING}]", parsed.rating);
        }
        if !parsed.cost.is_finite() || parsed.cost < 0.0 {
            anyhow::bail!("line {line_no}: invalid cost {}", parsed.cost);
        }
        out.push(RestaurantRecord {
            id: json_id(parsed.id, line_no)?,
            name: parsed.name.trim().to_string(),
            city: parsed.city.trim().to_string(),
            area: parsed
                .area
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            cuisine: parsed.cuisine.trim().to_string(),
            rating: parsed.rating,
            rating_count: json_count(parsed.rating_count, line_no)?,
            cost: parsed.cost,
        });
    }
    Ok(out)
}

pub fn read_encodings_jsonl(reader: impl std::io::Read) -> Result<EncodingTable> {
    let mut table = EncodingTable::new(0);
    for (line_no, line) in json_lines(reader) {
        let line = line.with_context(|| format!("read line {line_no}"))?;
        let parsed: EncodingLine =
            serde_json::from_str(&line).with_context(|| format!("parse line {line_no}"))?;
        if parsed.vector.is_empty() {
            anyhow::bail!("line {line_no}: empty vector");
        }
        let id = json_id(parsed.id, line_no)?;
        table.insert(id, parsed.vector)?;
    }
    Ok(table)
}
