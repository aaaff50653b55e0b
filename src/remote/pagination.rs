//! Cursor-based pagination over query results.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use super::client::{get_path, Client};
use crate::error::SdkError;

type ParseFn<'c, T> = Box<dyn Fn(Value) -> Result<T, SdkError> + 'c>;

/// Lazily fetches pages and yields one parsed item at a time.
///
/// Each request sends the fixed parameters plus `from` (the previous end
/// cursor, `null` at first) and `first` (the page size). Iteration stops
/// after a page whose end cursor is `null`, or an empty page. A failed
/// request or parse is yielded once and ends the iteration.
pub struct PaginatedCollection<'c, T> {
    client: &'c dyn Client,
    query: String,
    params: Map<String, Value>,
    nodes_path: Vec<String>,
    cursor_path: Vec<String>,
    page_size: usize,
    parse: ParseFn<'c, T>,
    buffer: VecDeque<Value>,
    cursor: Option<String>,
    exhausted: bool,
}

impl<'c, T> PaginatedCollection<'c, T> {
    pub fn new(
        client: &'c dyn Client,
        query: impl Into<String>,
        params: Map<String, Value>,
        nodes_path: &[&str],
        cursor_path: &[&str],
        parse: impl Fn(Value) -> Result<T, SdkError> + 'c,
    ) -> Self {
        Self {
            client,
            query: query.into(),
            params,
            nodes_path: nodes_path.iter().map(|s| s.to_string()).collect(),
            cursor_path: cursor_path.iter().map(|s| s.to_string()).collect(),
            page_size: client.config().page_size,
            parse: Box::new(parse),
            buffer: VecDeque::new(),
            cursor: None,
            exhausted: false,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn fetch_page(&mut self) -> Result<(), SdkError> {
        let mut params = self.params.clone();
        params.insert(
            "from".to_string(),
            self.cursor.clone().map_or(Value::Null, Value::String),
        );
        params.insert("first".to_string(), Value::from(self.page_size));

        log::debug!(
            "fetching page of {} after cursor {:?}",
            self.page_size,
            self.cursor
        );
        let response = self.client.execute(&self.query, &Value::Object(params))?;

        let nodes_path: Vec<&str> = self.nodes_path.iter().map(String::as_str).collect();
        let nodes = match get_path(&response, &nodes_path)? {
            Value::Array(nodes) => nodes.clone(),
            Value::Null => Vec::new(),
            _ => {
                return Err(SdkError::UnexpectedResponse {
                    path: self.nodes_path.join("."),
                    message: "expected a list of nodes".to_string(),
                })
            }
        };

        let cursor_path: Vec<&str> = self.cursor_path.iter().map(String::as_str).collect();
        self.cursor = match get_path(&response, &cursor_path) {
            Ok(Value::String(cursor)) => Some(cursor.clone()),
            Ok(Value::Null) | Err(_) => None,
            Ok(_) => {
                return Err(SdkError::UnexpectedResponse {
                    path: self.cursor_path.join("."),
                    message: "expected a string cursor".to_string(),
                })
            }
        };

        if nodes.is_empty() || self.cursor.is_none() {
            self.exhausted = true;
        }
        self.buffer.extend(nodes);
        Ok(())
    }
}

impl<T> Iterator for PaginatedCollection<'_, T> {
    type Item = Result<T, SdkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fetch_page() {
                self.exhausted = true;
                self.buffer.clear();
                return Some(Err(err));
            }
        }

        let node = self.buffer.pop_front()?;
        let item = (self.parse)(node);
        if item.is_err() {
            self.exhausted = true;
            self.buffer.clear();
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::json;
    use std::cell::RefCell;

    /// Serves `total` numbered nodes, `first` at a time.
    struct Pages {
        total: u64,
        config: ClientConfig,
        requests: RefCell<Vec<Value>>,
    }

    impl Client for Pages {
        fn execute(&self, _query: &str, params: &Value) -> Result<Value, SdkError> {
            self.requests.borrow_mut().push(params.clone());
            let start: u64 = params["from"]
                .as_str()
                .map_or(0, |c| c.parse().unwrap());
            let first = params["first"].as_u64().unwrap();
            let end = (start + first).min(self.total);
            let nodes: Vec<Value> = (start..end).map(|i| json!({ "n": i })).collect();
            let cursor = if end < self.total {
                json!(end.to_string())
            } else {
                Value::Null
            };
            Ok(json!({"items": {"nodes": nodes, "pageInfo": {"endCursor": cursor}}}))
        }

        fn upload_data(&self, _: &[u8], _: &str, _: &str) -> Result<String, SdkError> {
            unreachable!()
        }

        fn config(&self) -> &ClientConfig {
            &self.config
        }
    }

    fn pages(total: u64) -> Pages {
        Pages {
            total,
            config: ClientConfig {
                page_size: 2,
                ..Default::default()
            },
            requests: RefCell::new(Vec::new()),
        }
    }

    fn collect(client: &Pages) -> Result<Vec<u64>, SdkError> {
        let mut params = Map::new();
        params.insert("fixed".to_string(), json!("yes"));
        PaginatedCollection::new(
            client,
            "query",
            params,
            &["items", "nodes"],
            &["items", "pageInfo", "endCursor"],
            |node| Ok(node["n"].as_u64().unwrap_or_default()),
        )
        .collect()
    }

    #[test]
    fn test_iterates_all_pages() {
        let client = pages(5);
        assert_eq!(collect(&client).unwrap(), vec![0, 1, 2, 3, 4]);

        let requests = client.requests.borrow();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0]["from"], Value::Null);
        assert_eq!(requests[0]["first"], json!(2));
        assert_eq!(requests[0]["fixed"], json!("yes"));
        assert_eq!(requests[1]["from"], json!("2"));
    }

    #[test]
    fn test_empty_collection() {
        let client = pages(0);
        assert!(collect(&client).unwrap().is_empty());
        assert_eq!(client.requests.borrow().len(), 1);
    }

    #[test]
    fn test_bad_response_is_yielded_once() {
        struct Broken(ClientConfig);
        impl Client for Broken {
            fn execute(&self, _: &str, _: &Value) -> Result<Value, SdkError> {
                Ok(json!({"items": {"nodes": 3}}))
            }
            fn upload_data(&self, _: &[u8], _: &str, _: &str) -> Result<String, SdkError> {
                unreachable!()
            }
            fn config(&self) -> &ClientConfig {
                &self.0
            }
        }

        let client = Broken(ClientConfig::default());
        let mut items = PaginatedCollection::new(
            &client,
            "query",
            Map::new(),
            &["items", "nodes"],
            &["items", "pageInfo", "endCursor"],
            Ok,
        );
        assert!(matches!(
            items.next(),
            Some(Err(SdkError::UnexpectedResponse { .. }))
        ));
        assert!(items.next().is_none());
    }
}
