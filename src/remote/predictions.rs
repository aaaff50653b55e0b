//! Prediction uploads for model runs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::client::{get_path, Client};
use crate::error::SdkError;

const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

const CREATE_IMPORT_FIELD: &str = "createModelErrorAnalysisPredictionImport";
const CREATE_IMPORT_MUTATION: &str = "mutation createModelErrorAnalysisPredictionImportPyApi(\
    $name: String!, $modelRunId: ID!, $fileUrl: String!) {\
    createModelErrorAnalysisPredictionImport(data: {\
    name: $name, modelRunId: $modelRunId, fileUrl: $fileUrl}) {\
    id name modelRunId inputFileUrl state }}";

/// Where a batch of predictions comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum PredictionSource {
    /// A local NDJSON file, validated and uploaded first.
    FilePath(PathBuf),
    /// A URL the service can fetch NDJSON from directly.
    Url(String),
    /// In-memory rows, each a JSON object.
    Records(Vec<Value>),
}

impl From<PathBuf> for PredictionSource {
    fn from(path: PathBuf) -> Self {
        PredictionSource::FilePath(path)
    }
}

impl From<Vec<Value>> for PredictionSource {
    fn from(records: Vec<Value>) -> Self {
        PredictionSource::Records(records)
    }
}

/// The import job created on the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionImport {
    #[serde(rename = "id")]
    pub uid: String,
    pub name: String,
    pub model_run_id: String,
    pub input_file_url: String,
    /// Server-side state, e.g. `RUNNING` or `FINISHED`.
    #[serde(default)]
    pub state: Option<String>,
}

/// Checks that every non-blank line of `content` is a JSON object and that
/// there is at least one.
pub fn validate_ndjson(content: &str) -> Result<(), SdkError> {
    let mut records = 0usize;
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(_)) => records += 1,
            Ok(_) => {
                return Err(SdkError::InvalidArgument(format!(
                    "line {} of the NDJSON input is not a JSON object",
                    idx + 1
                )))
            }
            Err(err) => {
                return Err(SdkError::InvalidArgument(format!(
                    "line {} of the NDJSON input is not valid JSON: {}",
                    idx + 1,
                    err
                )))
            }
        }
    }
    if records == 0 {
        return Err(SdkError::InvalidArgument(
            "the NDJSON input contains no records".to_string(),
        ));
    }
    Ok(())
}

/// Serializes rows as NDJSON, one object per line.
pub fn records_to_ndjson(records: &[Value]) -> Result<String, SdkError> {
    let mut out = String::new();
    for (idx, record) in records.iter().enumerate() {
        if !record.is_object() {
            return Err(SdkError::InvalidArgument(format!(
                "prediction record {} is not a JSON object",
                idx
            )));
        }
        out.push_str(&record.to_string());
        out.push('\n');
    }
    Ok(out)
}

/// Resolves `source` to a URL, uploading local content first.
pub(crate) fn resolve_source_url(
    client: &dyn Client,
    name: &str,
    source: PredictionSource,
) -> Result<String, SdkError> {
    match source {
        PredictionSource::Url(url) => Ok(url),
        PredictionSource::FilePath(path) => {
            let content =
                fs::read_to_string(&path).map_err(|source| SdkError::FileRead {
                    path: path.clone(),
                    source,
                })?;
            validate_ndjson(&content)?;
            let file_name = upload_name(&path, name);
            log::debug!("uploading predictions from {}", path.display());
            client.upload_data(content.as_bytes(), &file_name, NDJSON_CONTENT_TYPE)
        }
        PredictionSource::Records(records) => {
            if records.is_empty() {
                return Err(SdkError::InvalidArgument(
                    "no prediction records given".to_string(),
                ));
            }
            let content = records_to_ndjson(&records)?;
            log::debug!("uploading {} prediction record(s)", records.len());
            client.upload_data(
                content.as_bytes(),
                &format!("{}.ndjson", name),
                NDJSON_CONTENT_TYPE,
            )
        }
    }
}

fn upload_name(path: &Path, fallback: &str) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or_else(|| format!("{}.ndjson", fallback), str::to_string)
}

pub(crate) fn create_import(
    client: &dyn Client,
    model_run_id: &str,
    name: &str,
    file_url: &str,
) -> Result<PredictionImport, SdkError> {
    let response = client.execute(
        CREATE_IMPORT_MUTATION,
        &json!({
            "name": name,
            "modelRunId": model_run_id,
            "fileUrl": file_url,
        }),
    )?;
    let node = get_path(&response, &[CREATE_IMPORT_FIELD])?;
    serde_json::from_value(node.clone()).map_err(|err| SdkError::UnexpectedResponse {
        path: CREATE_IMPORT_FIELD.to_string(),
        message: err.to_string(),
    })
}
