//! Model runs and the data rows registered against them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::client::{get_path, get_str, Client};
use super::pagination::PaginatedCollection;
use super::polling::{poll_until, PollOptions, PollOutcome};
use super::predictions::{create_import, resolve_source_url, PredictionImport, PredictionSource};
use crate::error::SdkError;

const LABEL_REGISTRATION_MUTATION: &str = "createMEAModelRunLabelRegistrationTask";
const LABEL_REGISTRATION_QUERY: &str = "mutation createMEAModelRunLabelRegistrationTaskPyApi(\
    $modelRunId: ID!, $labelIds: [ID!]!) {\
    createMEAModelRunLabelRegistrationTask(\
    where: {id: $modelRunId}, data: {labelIds: $labelIds})}";
const LABEL_STATUS_FIELD: &str = "MEALabelRegistrationTaskStatus";
const LABEL_STATUS_QUERY: &str = "query MEALabelRegistrationTaskStatusPyApi(\
    $where: WhereUniqueIdInput!) {\
    MEALabelRegistrationTaskStatus(where: $where) {status errorMessage}}";

const DATA_ROW_REGISTRATION_MUTATION: &str = "createMEAModelRunDataRowRegistrationTask";
const DATA_ROW_REGISTRATION_QUERY: &str = "mutation createMEAModelRunDataRowRegistrationTaskPyApi(\
    $modelRunId: ID!, $dataRowIds: [ID!]!) {\
    createMEAModelRunDataRowRegistrationTask(\
    where: {id: $modelRunId}, data: {dataRowIds: $dataRowIds})}";
const DATA_ROW_STATUS_FIELD: &str = "MEADataRowRegistrationTaskStatus";
const DATA_ROW_STATUS_QUERY: &str = "query MEADataRowRegistrationTaskStatusPyApi(\
    $where: WhereUniqueIdInput!) {\
    MEADataRowRegistrationTaskStatus(where: $where) {status errorMessage}}";

const DATA_ROWS_QUERY: &str = "query modelRunPyApi($modelRunId: ID!, $from: String, $first: Int) {\
    annotationGroups(where: {modelRunId: {id: $modelRunId}}, after: $from, first: $first) {\
    nodes {id labelId modelRunId dataRow {id}} pageInfo {endCursor}}}";

const DELETE_MODEL_RUN_QUERY: &str = "mutation DeleteModelRunPyApi($ids: ID!) {\
    deleteModelRuns(where: {ids: [$ids]})}";
const DELETE_DATA_ROWS_QUERY: &str = "mutation DeleteModelRunDataRowsPyApi(\
    $modelRunId: ID!, $dataRowIds: [ID!]!) {\
    deleteModelRunDataRows(where: {modelRunId: $modelRunId, dataRowIds: $dataRowIds})}";

/// A server-side model run. Holds no association data locally; see
/// [`ModelRun::model_run_data_rows`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRun {
    #[serde(rename = "id")]
    pub uid: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "createdBy")]
    pub created_by_id: String,
    pub model_id: String,
}

impl ModelRun {
    /// Parses a model run from a query result node.
    pub fn from_value(value: Value) -> Result<Self, SdkError> {
        serde_json::from_value(value).map_err(|err| SdkError::UnexpectedResponse {
            path: "modelRun".to_string(),
            message: err.to_string(),
        })
    }

    /// Registers labels (and their data rows) with this run and waits for
    /// the registration task to finish.
    pub fn upsert_labels(
        &self,
        client: &dyn Client,
        label_ids: &[String],
        timeout: Duration,
    ) -> Result<(), SdkError> {
        if label_ids.is_empty() {
            return Err(SdkError::InvalidArgument(
                "must provide at least one label id".to_string(),
            ));
        }
        let task_id = self.submit_task(
            client,
            LABEL_REGISTRATION_QUERY,
            LABEL_REGISTRATION_MUTATION,
            "labelIds",
            label_ids,
        )?;
        let opts = client.config().poll.with_timeout(timeout);
        wait_for_task(client, &opts, LABEL_STATUS_QUERY, LABEL_STATUS_FIELD, &task_id)
    }

    /// Registers data rows without labels and waits for the registration
    /// task to finish.
    pub fn upsert_data_rows(
        &self,
        client: &dyn Client,
        data_row_ids: &[String],
        timeout: Duration,
    ) -> Result<(), SdkError> {
        if data_row_ids.is_empty() {
            return Err(SdkError::InvalidArgument(
                "must provide at least one data row id".to_string(),
            ));
        }
        let task_id = self.submit_task(
            client,
            DATA_ROW_REGISTRATION_QUERY,
            DATA_ROW_REGISTRATION_MUTATION,
            "dataRowIds",
            data_row_ids,
        )?;
        let opts = client.config().poll.with_timeout(timeout);
        wait_for_task(
            client,
            &opts,
            DATA_ROW_STATUS_QUERY,
            DATA_ROW_STATUS_FIELD,
            &task_id,
        )
    }

    fn submit_task(
        &self,
        client: &dyn Client,
        query: &str,
        field: &str,
        ids_param: &str,
        ids: &[String],
    ) -> Result<String, SdkError> {
        let mut params = Map::new();
        params.insert("modelRunId".to_string(), json!(self.uid));
        params.insert(ids_param.to_string(), json!(ids));

        let response = client.execute(query, &Value::Object(params))?;
        let task_id = get_str(&response, &[field])?.to_string();
        log::debug!("model run {} submitted task {}", self.uid, task_id);
        Ok(task_id)
    }

    /// Creates a prediction import named `name` from `source`.
    pub fn add_predictions(
        &self,
        client: &dyn Client,
        name: &str,
        source: PredictionSource,
    ) -> Result<PredictionImport, SdkError> {
        let url = resolve_source_url(client, name, source)?;
        create_import(client, &self.uid, name, &url)
    }

    /// Every data row registered with this run, fetched page by page.
    pub fn model_run_data_rows<'c>(
        &self,
        client: &'c dyn Client,
    ) -> PaginatedCollection<'c, ModelRunDataRow> {
        let mut params = Map::new();
        params.insert("modelRunId".to_string(), json!(self.uid));
        let model_id = self.model_id.clone();
        PaginatedCollection::new(
            client,
            DATA_ROWS_QUERY,
            params,
            &["annotationGroups", "nodes"],
            &["annotationGroups", "pageInfo", "endCursor"],
            move |node| ModelRunDataRow::from_node(node, &model_id),
        )
    }

    pub fn delete(&self, client: &dyn Client) -> Result<(), SdkError> {
        client.execute(DELETE_MODEL_RUN_QUERY, &json!({ "ids": self.uid }))?;
        log::debug!("deleted model run {}", self.uid);
        Ok(())
    }

    /// Removes data rows (and their labels) from this run.
    pub fn delete_model_run_data_rows(
        &self,
        client: &dyn Client,
        data_row_ids: &[String],
    ) -> Result<(), SdkError> {
        client.execute(
            DELETE_DATA_ROWS_QUERY,
            &json!({
                "modelRunId": self.uid,
                "dataRowIds": data_row_ids,
            }),
        )?;
        Ok(())
    }
}

/// Polls a registration task's status until COMPLETE or FAILED.
fn wait_for_task(
    client: &dyn Client,
    opts: &PollOptions,
    query: &str,
    field: &str,
    task_id: &str,
) -> Result<(), SdkError> {
    let params = json!({ "where": { "id": task_id } });
    poll_until(opts, || {
        let response = client.execute(query, &params)?;
        task_outcome(get_path(&response, &[field])?)
    })
}

fn task_outcome(status: &Value) -> Result<PollOutcome<()>, SdkError> {
    match get_str(status, &["status"])? {
        "COMPLETE" => Ok(PollOutcome::Ready(())),
        "FAILED" => Err(SdkError::TaskFailed {
            message: status
                .get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or("no details given")
                .to_string(),
        }),
        _ => Ok(PollOutcome::Pending),
    }
}

/// A data row registered with a model run, optionally with a label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRunDataRow {
    pub uid: String,
    pub label_id: Option<String>,
    pub model_run_id: String,
    pub data_row_id: String,
    /// The model owning the run; used to build links.
    pub model_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataRowNode {
    id: String,
    #[serde(default)]
    label_id: Option<String>,
    model_run_id: String,
    data_row: DataRowRef,
}

#[derive(Deserialize)]
struct DataRowRef {
    id: String,
}

impl ModelRunDataRow {
    fn from_node(node: Value, model_id: &str) -> Result<Self, SdkError> {
        let node: DataRowNode =
            serde_json::from_value(node).map_err(|err| SdkError::UnexpectedResponse {
                path: "annotationGroups.nodes".to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            uid: node.id,
            label_id: node.label_id,
            model_run_id: node.model_run_id,
            data_row_id: node.data_row.id,
            model_id: model_id.to_string(),
        })
    }

    /// Link to this row in the model run's carousel view.
    pub fn url(&self, app_url: &str) -> String {
        format!(
            "{}/models/{}/{}/AllDatarowsSlice/{}?view=carousel",
            app_url.trim_end_matches('/'),
            self.model_id,
            self.model_run_id,
            self.uid
        )
    }
}
