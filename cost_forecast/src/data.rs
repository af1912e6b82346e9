//! Historical cost data for training
//!
//! Cost histories are kept per item kind, one table each for materials and
//! labor, with rows of `(date, cost, item)`.

use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of item a cost series belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Material,
    Labor,
}

impl ItemKind {
    /// Every kind, in training order
    pub const ALL: [ItemKind; 2] = [ItemKind::Material, ItemKind::Labor];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Material => "material",
            ItemKind::Labor => "labor",
        }
    }

    /// Name of the history table for this kind
    pub fn table(&self) -> &'static str {
        match self {
            ItemKind::Material => "material_history",
            ItemKind::Labor => "labor_history",
        }
    }

    /// Name of the column holding the item identifier
    pub fn item_column(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "material" => Ok(ItemKind::Material),
            "labor" => Ok(ItemKind::Labor),
            other => Err(ForecastError::InvalidArgument(format!(
                "Unknown item kind '{}', expected 'material' or 'labor'",
                other
            ))),
        }
    }
}

/// One dated cost observation for an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostObservation {
    pub date: NaiveDate,
    pub cost: f64,
    pub item: String,
}

impl CostObservation {
    pub fn new(date: NaiveDate, cost: f64, item: impl Into<String>) -> Self {
        Self {
            date,
            cost,
            item: item.into(),
        }
    }
}

/// Date-ordered cost series for a single item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSeries {
    /// Item identifier as stored in the source
    pub item: String,
    /// Observations ordered by date
    pub points: Vec<(NaiveDate, f64)>,
}

impl ItemSeries {
    /// Costs in date order
    pub fn costs(&self) -> Vec<f64> {
        self.points.iter().map(|(_, cost)| *cost).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Group observations into one series per distinct item.
///
/// Items keep the order in which they first appear; each series is sorted by
/// date, with same-day observations kept in source order.
pub fn group_series(observations: Vec<CostObservation>) -> Vec<ItemSeries> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<ItemSeries> = Vec::new();

    for obs in observations {
        let slot = match index.get(&obs.item) {
            Some(&slot) => slot,
            None => {
                index.insert(obs.item.clone(), groups.len());
                groups.push(ItemSeries {
                    item: obs.item.clone(),
                    points: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[slot].points.push((obs.date, obs.cost));
    }

    for group in &mut groups {
        group.points.sort_by_key(|(date, _)| *date);
    }

    groups
}

/// Source of historical cost observations
pub trait HistoricalSource {
    /// Fetch every observation of the given kind.
    ///
    /// Failing here fails the whole training run.
    fn fetch(&self, kind: ItemKind) -> Result<Vec<CostObservation>>;

    /// Human-readable description used in logs
    fn describe(&self) -> String;
}

/// Parse a date cell, accepting plain dates and date-times
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(text).map(|dt| dt.date_naive()))
        .map_err(|_| ForecastError::DataError(format!("Unparseable date '{}'", text)))
}

/// Directory of CSV tables, one `<table>.csv` per kind
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the table holding the given kind
    pub fn table_path(&self, kind: ItemKind) -> PathBuf {
        self.dir.join(format!("{}.csv", kind.table()))
    }

    /// Write observations as the table for the given kind, replacing it
    pub fn write(&self, kind: ItemKind, observations: &[CostObservation]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut writer = csv::Writer::from_path(self.table_path(kind))?;
        writer.write_record(["date", "cost", kind.item_column()])?;
        for obs in observations {
            writer.write_record([
                obs.date.format("%Y-%m-%d").to_string(),
                obs.cost.to_string(),
                obs.item.clone(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn column(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ForecastError::DataSource(format!(
                    "{} has no '{}' column",
                    path.display(),
                    name
                ))
            })
    }
}

impl HistoricalSource for CsvSource {
    fn fetch(&self, kind: ItemKind) -> Result<Vec<CostObservation>> {
        let path = self.table_path(kind);
        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            ForecastError::DataSource(format!("Cannot open {}: {}", path.display(), e))
        })?;

        let headers = reader.headers()?.clone();
        let date_idx = Self::column(&headers, "date", &path)?;
        let cost_idx = Self::column(&headers, "cost", &path)?;
        let item_idx = Self::column(&headers, kind.item_column(), &path)?;

        let mut observations = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let field = |idx: usize| record.get(idx).unwrap_or("").trim();

            let date = parse_date(field(date_idx)).map_err(|e| {
                ForecastError::DataSource(format!("{} row {}: {}", path.display(), line + 1, e))
            })?;
            let cost: f64 = field(cost_idx).parse().map_err(|_| {
                ForecastError::DataSource(format!(
                    "{} row {}: cost '{}' is not a number",
                    path.display(),
                    line + 1,
                    field(cost_idx)
                ))
            })?;

            observations.push(CostObservation::new(date, cost, field(item_idx)));
        }

        Ok(observations)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.dir.display())
    }
}

/// In-memory source, mainly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<ItemKind, Vec<CostObservation>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add observations to the table of the given kind
    pub fn with(mut self, kind: ItemKind, observations: Vec<CostObservation>) -> Self {
        self.tables.entry(kind).or_default().extend(observations);
        self
    }
}

impl HistoricalSource for MemorySource {
    fn fetch(&self, kind: ItemKind) -> Result<Vec<CostObservation>> {
        Ok(self.tables.get(&kind).cloned().unwrap_or_default())
    }

    fn describe(&self) -> String {
        let rows: usize = self.tables.values().map(Vec::len).sum();
        format!("memory:{} rows", rows)
    }
}
