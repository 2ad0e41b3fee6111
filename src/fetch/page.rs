//! Pure wire-format handling for the two response shapes the API serves.
//!
//! Flat-array endpoints return a bare JSON array (or a single object,
//! normalized to a one-row array). Wrapped endpoints return an object whose
//! result array sits under `data` (with a `pagination.hasNextPage` flag) or
//! `items` (with `totalCount`/`page`/`pageSize`). Termination logic lives
//! here so it can be tested without any HTTP in the loop.

use serde_json::{Map, Value};

use super::FetchError;

/// Rows of a flat-array response. A single object is normalized to one row;
/// anything else is a protocol-shape failure, never silently coerced.
pub(crate) fn flat_rows(payload: Value) -> Result<Vec<Map<String, Value>>, FetchError> {
    match payload {
        Value::Array(items) => items.into_iter().map(object_row).collect(),
        Value::Object(map) => Ok(vec![map]),
        other => Err(FetchError::ResponseShape(format!(
            "expected array or object, got {}",
            json_kind(&other)
        ))),
    }
}

/// One parsed page of a wrapped response plus the metadata that decides
/// whether another page should be requested.
#[derive(Debug)]
pub(crate) struct WrappedPage {
    pub rows: Vec<Map<String, Value>>,
    pub control: PageControl,
}

/// Pagination metadata, tagged by which wrapper key the response used.
#[derive(Debug)]
pub(crate) enum PageControl {
    /// `data` + `pagination.hasNextPage` shape.
    HasNext(bool),
    /// `items` + `totalCount`/`pageSize` shape.
    Counted { total_count: u64, page_size: u64 },
}

impl WrappedPage {
    /// Whether pagination terminates after this page, given the cumulative
    /// row count fetched so far (this page included).
    ///
    /// `data` shape: stop when `hasNextPage` is false, regardless of row
    /// count. `items` shape: stop when the page came back short of the page
    /// size, or the cumulative count has reached `totalCount`.
    pub fn is_last(&self, fetched_so_far: u64) -> bool {
        match self.control {
            PageControl::HasNext(has_next) => !has_next,
            PageControl::Counted {
                total_count,
                page_size,
            } => (self.rows.len() as u64) < page_size || fetched_so_far >= total_count,
        }
    }
}

/// Parse one page of a wrapped response. `requested_page_size` backfills the
/// `items` shape's `pageSize` when the server omits it.
pub(crate) fn wrapped_page(
    payload: Value,
    requested_page_size: u64,
) -> Result<WrappedPage, FetchError> {
    let Value::Object(mut map) = payload else {
        return Err(FetchError::ResponseShape(format!(
            "expected wrapped object, got {}",
            json_kind(&payload)
        )));
    };

    if let Some(items) = map.remove("items") {
        let rows = array_rows(items)?;
        let total_count = map.get("totalCount").and_then(Value::as_u64).unwrap_or(0);
        let page_size = map
            .get("pageSize")
            .and_then(Value::as_u64)
            .unwrap_or(requested_page_size);
        return Ok(WrappedPage {
            rows,
            control: PageControl::Counted {
                total_count,
                page_size,
            },
        });
    }

    let rows = match map.remove("data") {
        Some(data) => array_rows(data)?,
        None => Vec::new(),
    };
    let has_next = map
        .get("pagination")
        .and_then(|p| p.get("hasNextPage"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(WrappedPage {
        rows,
        control: PageControl::HasNext(has_next),
    })
}

fn array_rows(value: Value) -> Result<Vec<Map<String, Value>>, FetchError> {
    match value {
        Value::Array(items) => items.into_iter().map(object_row).collect(),
        other => Err(FetchError::ResponseShape(format!(
            "expected result array, got {}",
            json_kind(&other)
        ))),
    }
}

fn object_row(value: Value) -> Result<Map<String, Value>, FetchError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(FetchError::ResponseShape(format!(
            "expected record object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
