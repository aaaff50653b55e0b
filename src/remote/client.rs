//! The collaborator every remote proxy talks through.

use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::SdkError;

/// Executes queries and uploads files against the labeling service.
///
/// Transport, authentication and retries are the implementor's concern;
/// this crate only builds query strings and parameters and interprets the
/// returned JSON `data` payload.
pub trait Client {
    /// Runs a query or mutation and returns its `data` object.
    fn execute(&self, query: &str, params: &Value) -> Result<Value, SdkError>;

    /// Uploads a file and returns a URL the service can read it from.
    fn upload_data(
        &self,
        content: &[u8],
        file_name: &str,
        content_type: &str,
    ) -> Result<String, SdkError>;

    /// App URL, poll defaults and page size used by the proxies.
    fn config(&self) -> &ClientConfig;
}

/// Follows `path` through nested objects.
pub fn get_path<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value, SdkError> {
    let mut current = value;
    for (depth, key) in path.iter().enumerate() {
        current = current.get(key).ok_or_else(|| SdkError::UnexpectedResponse {
            path: path[..=depth].join("."),
            message: "field is missing".to_string(),
        })?;
    }
    Ok(current)
}

/// Like [`get_path`], but the value must be a string.
pub fn get_str<'a>(value: &'a Value, path: &[&str]) -> Result<&'a str, SdkError> {
    get_path(value, path)?
        .as_str()
        .ok_or_else(|| SdkError::UnexpectedResponse {
            path: path.join("."),
            message: "expected a string".to_string(),
        })
}
