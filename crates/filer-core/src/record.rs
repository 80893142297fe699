//! Raw filing records and JSON intake
//!
//! The fetch collaborator hands over one JSON object per submission. Intake
//! turns each object into a `RawFilingRecord` or a `MalformedRecord`; a bad
//! row never stops the run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FilerError, MalformedRecord, RecordProblem};

/// One regulatory submission, as received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFilingRecord {
    /// Zero-based position in the input collection
    pub position: usize,
    /// Upstream submission identifier, when the source provides one
    pub submission_id: Option<String>,
    pub filer_name: String,
    pub submission_type: String,
    pub date_received: Option<NaiveDate>,
    /// Docket(s), "; "-joined when the filing names several
    pub docket_number: String,
    /// Free-text name of the proceeding the submission was filed under
    pub proceeding_description: Option<String>,
    pub document_urls: Vec<String>,
    pub filing_status: Option<String>,
    pub detail_url: Option<String>,
}

impl RawFilingRecord {
    /// Create a record with only the required fields
    pub fn new(
        position: usize,
        filer_name: impl Into<String>,
        submission_type: impl Into<String>,
    ) -> Self {
        Self {
            position,
            submission_id: None,
            filer_name: filer_name.into(),
            submission_type: submission_type.into(),
            date_received: None,
            docket_number: String::new(),
            proceeding_description: None,
            document_urls: Vec::new(),
            filing_status: None,
            detail_url: None,
        }
    }

    /// Builder method to set the upstream submission id
    pub fn with_submission_id(mut self, id: impl Into<String>) -> Self {
        self.submission_id = Some(id.into());
        self
    }

    /// Builder method to set the received date
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date_received = Some(date);
        self
    }

    /// Builder method to set the docket number
    pub fn with_docket(mut self, docket: impl Into<String>) -> Self {
        self.docket_number = docket.into();
        self
    }

    /// Builder method to set the proceeding description
    pub fn with_proceeding(mut self, description: impl Into<String>) -> Self {
        self.proceeding_description = Some(description.into());
        self
    }

    /// Builder method to set document URLs
    pub fn with_document_urls(mut self, urls: Vec<String>) -> Self {
        self.document_urls = urls;
        self
    }

    /// Identifier of the fact row built from this record
    ///
    /// The upstream submission id when present, otherwise derived from the
    /// input position so repeated runs over the same input agree.
    pub fn filing_id(&self) -> String {
        match &self.submission_id {
            Some(id) => id.clone(),
            None => format!("record-{}", self.position),
        }
    }

    /// Individual docket numbers
    pub fn dockets(&self) -> impl Iterator<Item = &str> {
        self.docket_number
            .split(';')
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Document URLs arrive either as a list or as one "; "-joined string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UrlList {
    List(Vec<String>),
    Joined(String),
}

impl UrlList {
    fn into_vec(self) -> Vec<String> {
        let urls = match self {
            UrlList::List(urls) => urls,
            UrlList::Joined(joined) => joined
                .split(';')
                .map(str::to_string)
                .collect(),
        };
        urls.into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect()
    }
}

/// Wire shape of one input object; every field optional so that absence is
/// reported as a malformed record rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
struct RawFilingInput {
    #[serde(default, alias = "company_name")]
    filer_name: Option<String>,
    #[serde(default)]
    submission_type: Option<String>,
    #[serde(default)]
    date_received: Option<String>,
    #[serde(default)]
    docket_number: Option<String>,
    #[serde(default)]
    proceeding_description: Option<String>,
    #[serde(default)]
    document_urls: Option<UrlList>,
    #[serde(default)]
    filing_status: Option<String>,
    #[serde(default)]
    detail_url: Option<String>,
}

/// Records decoded from one input collection
#[derive(Debug, Clone, Default)]
pub struct ParsedInput {
    pub records: Vec<RawFilingRecord>,
    pub malformed: Vec<MalformedRecord>,
}

impl ParsedInput {
    /// Total number of input objects seen
    pub fn total(&self) -> usize {
        self.records.len() + self.malformed.len()
    }
}

/// Decode a collection of JSON objects, keeping input order
pub fn parse_records(values: &[Value]) -> ParsedInput {
    let mut parsed = ParsedInput::default();

    for (position, value) in values.iter().enumerate() {
        match parse_record(position, value) {
            Ok(record) => parsed.records.push(record),
            Err(malformed) => {
                tracing::warn!("Skipping malformed input: {}", malformed);
                parsed.malformed.push(malformed);
            }
        }
    }

    parsed
}

/// Decode a JSON document holding an array of filing objects
pub fn parse_records_json(json: &str) -> Result<ParsedInput, FilerError> {
    let document: Value = serde_json::from_str(json)?;
    match document {
        Value::Array(values) => Ok(parse_records(&values)),
        other => Err(FilerError::Input(format!(
            "expected a JSON array of filings, found {}",
            json_kind(&other)
        ))),
    }
}

fn parse_record(position: usize, value: &Value) -> Result<RawFilingRecord, MalformedRecord> {
    let submission_id = ["submission_id", "filing_id", "id_submission"]
        .iter()
        .find_map(|field| value.get(*field).and_then(id_text));

    let malformed = |problem: RecordProblem| MalformedRecord {
        position,
        submission_id: submission_id.clone(),
        problem,
    };

    let input: RawFilingInput = serde_json::from_value(value.clone()).map_err(|e| {
        malformed(RecordProblem::Undecodable {
            message: e.to_string(),
        })
    })?;

    let filer_name = required(input.filer_name)
        .ok_or_else(|| malformed(RecordProblem::MissingField { field: "filer_name" }))?;
    let submission_type = required(input.submission_type).ok_or_else(|| {
        malformed(RecordProblem::MissingField {
            field: "submission_type",
        })
    })?;

    let date_received = match required(input.date_received) {
        Some(raw) => Some(parse_date(&raw).ok_or_else(|| {
            malformed(RecordProblem::InvalidField {
                field: "date_received",
                message: format!("'{}' is not a YYYY-MM-DD date", raw),
            })
        })?),
        None => None,
    };

    Ok(RawFilingRecord {
        position,
        submission_id,
        filer_name,
        submission_type,
        date_received,
        docket_number: input.docket_number.unwrap_or_default().trim().to_string(),
        proceeding_description: required(input.proceeding_description),
        document_urls: input
            .document_urls
            .map(UrlList::into_vec)
            .unwrap_or_default(),
        filing_status: required(input.filing_status),
        detail_url: required(input.detail_url),
    })
}

/// Submission ids arrive as strings or bare numbers
fn id_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Trimmed value, `None` when absent or blank
fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts plain dates and ISO timestamps ("2024-03-01T12:00:00Z")
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
