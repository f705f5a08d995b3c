use std::path::Path;

use serde::Deserialize;

use crate::error::{PedigreeError, Result};
use crate::types::IndividualId;

use super::individual::Individual;
use super::store::Population;

/// Accepted header names for each CSV column, matched case-insensitively.
const ID_COLUMNS: &[&str] = &["id", "animal", "individual"];
const OWNER_COLUMNS: &[&str] = &["owner", "name"];
const LEFT_COLUMNS: &[&str] = &["left", "left_parent", "sire"];
const RIGHT_COLUMNS: &[&str] = &["right", "right_parent", "dam"];

/// One record of the remote service payload.
#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: IndividualId,
    #[serde(default, alias = "name")]
    owner: Option<String>,
    #[serde(default)]
    coi: Option<f64>,
    #[serde(default)]
    parents: Option<Vec<ApiParent>>,
}

#[derive(Debug, Deserialize)]
struct ApiParent {
    #[serde(default, rename = "tokenId")]
    token_id: Option<IndividualId>,
}

/// Either `{"result": [...]}` as served, or a bare array of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiDocument {
    Envelope { result: Vec<ApiRecord> },
    Bare(Vec<ApiRecord>),
}

impl ApiRecord {
    fn into_individual(self) -> Individual {
        // First parent entry is the left parent, second the right parent.
        let mut parents = self.parents.unwrap_or_default().into_iter();
        let left = parents.next().and_then(|p| p.token_id);
        let right = parents.next().and_then(|p| p.token_id);

        Individual {
            id: self.id,
            owner: self.owner.unwrap_or_default(),
            left_parent: left,
            right_parent: right,
            reported_coi: self.coi,
        }
    }
}

impl Population {
    /// Read a population from a CSV file.
    ///
    /// Expected columns (header required, case-insensitive): `id`, `left`,
    /// `right`, and optionally `owner`. The aliases `animal`, `sire`, `dam`,
    /// `left_parent`, `right_parent` and `name` are accepted as well.
    /// Unknown parents are coded as `"0"`, `""`, or `"NA"`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, columns are missing, an
    /// id does not parse as a non-negative integer, or an id is duplicated.
    ///
    /// # Examples
    /// ```no_run
    /// use lineage_graph_core::population::Population;
    ///
    /// let pop = Population::from_csv("pedigree.csv").unwrap();
    /// println!("{} individuals", pop.len());
    /// ```
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let pop = Self::from_csv_reader(reader)?;
        log::info!(
            "Loaded {} individuals from '{}'",
            pop.len(),
            path.display()
        );
        Ok(pop)
    }

    /// Read a population from CSV text already held in memory.
    ///
    /// Same column rules as [`Population::from_csv`].
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        Self::from_csv_reader(reader)
    }

    fn from_csv_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();

        let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));

        let id_col = find(ID_COLUMNS)
            .ok_or_else(|| PedigreeError::Data("CSV missing 'id' column".to_string()))?;
        let left_col = find(LEFT_COLUMNS)
            .ok_or_else(|| PedigreeError::Data("CSV missing 'left' column".to_string()))?;
        let right_col = find(RIGHT_COLUMNS)
            .ok_or_else(|| PedigreeError::Data("CSV missing 'right' column".to_string()))?;
        let owner_col = find(OWNER_COLUMNS);

        let mut pop = Population::new();

        for (row, result) in reader.records().enumerate() {
            let record = result?;
            // Header is line 1.
            let line = row + 2;

            let id_raw = record.get(id_col).unwrap_or("");
            let id = parse_id(id_raw).ok_or_else(|| {
                PedigreeError::Data(format!("Invalid id '{}' on line {}", id_raw, line))
            })?;

            let left = parse_parent(record.get(left_col).unwrap_or(""), line)?;
            let right = parse_parent(record.get(right_col).unwrap_or(""), line)?;
            let owner = owner_col
                .and_then(|c| record.get(c))
                .unwrap_or("")
                .to_string();

            pop.insert(Individual::new(id, owner).with_parents(left, right))?;
        }

        Ok(pop)
    }

    /// Parse the remote service payload.
    ///
    /// Accepts `{"result": [...]}` or a bare array. Each record carries
    /// `id`, optional `owner`, optional `coi` and an optional `parents`
    /// list of `{"tokenId": n}` entries (first = left, second = right).
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or an id is duplicated.
    pub fn from_api_json(json: &str) -> Result<Self> {
        let doc: ApiDocument = serde_json::from_str(json)?;
        let records = match doc {
            ApiDocument::Envelope { result } => result,
            ApiDocument::Bare(records) => records,
        };
        Self::from_records(records.into_iter().map(ApiRecord::into_individual))
    }

    /// Read the remote service payload from a file.
    pub fn from_api_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let pop = Self::from_api_json(&content)?;
        log::info!(
            "Loaded {} individuals from '{}'",
            pop.len(),
            path.display()
        );
        Ok(pop)
    }

    /// Load a population choosing the format from the file extension
    /// (`.json` for the service payload, anything else as CSV).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_api_json_path(path)
        } else {
            Self::from_csv(path)
        }
    }
}

fn parse_id(s: &str) -> Option<IndividualId> {
    s.trim().parse().ok()
}

/// Parse a parent field, returning `None` for unknown parents.
///
/// Unknown parents are coded as `"0"`, `""`, `"NA"`, or `"na"`.
fn parse_parent(s: &str, line: usize) -> Result<Option<IndividualId>> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "0" || trimmed.eq_ignore_ascii_case("na") {
        return Ok(None);
    }
    parse_id(trimmed).map(Some).ok_or_else(|| {
        PedigreeError::Data(format!("Invalid parent id '{}' on line {}", trimmed, line))
    })
}
