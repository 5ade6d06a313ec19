//! Report endpoints and the page cursor.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::model::{PageResult, Report, ReportDetail, ReportId};
use crate::api::{ApiError, ApiRequest, RequestExecutor, endpoint};

/// Records requested per page.
pub const PAGE_SIZE: u32 = 50;

/// Typed access to the report listing and detail endpoints.
#[derive(Debug, Clone)]
pub struct ReportsApi {
    executor: Arc<RequestExecutor>,
    base_url: Url,
}

impl ReportsApi {
    /// Creates the endpoint wrapper over a shared executor.
    #[must_use]
    pub fn new(executor: Arc<RequestExecutor>, base_url: Url) -> Self {
        Self { executor, base_url }
    }

    /// Fetches one page of reports created after `date_from`.
    ///
    /// # Errors
    ///
    /// Returns executor errors, or [`ApiError::Protocol`] when `data` is
    /// missing or not an array, or [`ApiError::Decode`] when a record has no
    /// usable id.
    #[instrument(skip(self, date_from), fields(date_from = %date_from))]
    pub async fn fetch_page(
        &self,
        date_from: NaiveDate,
        page_number: u32,
    ) -> Result<PageResult, ApiError> {
        let request = ApiRequest::get(endpoint(&self.base_url, &["reports"]))
            .query("created_after", date_from.format("%Y-%m-%d"))
            .query("page_size", PAGE_SIZE)
            .query("page_num", page_number);
        let url = request.url().to_string();

        let mut body: Value = self.executor.get_json(&request).await?;
        let records = match body.get_mut("data").map(Value::take) {
            Some(Value::Array(records)) => records,
            Some(other) => {
                return Err(ApiError::protocol(
                    url,
                    format!("`data` is not a list (got {})", json_kind(&other)),
                ));
            }
            None => return Err(ApiError::protocol(url, "response has no `data` field")),
        };
        let records = records
            .into_iter()
            .map(serde_json::from_value::<Report>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| ApiError::Decode {
                url: url.clone(),
                source,
            })?;

        let page = PageResult {
            records,
            page_number: read_u32(&body, "page_number").unwrap_or(page_number),
            total_pages: read_u32(&body, "total_pages"),
            total_count: body.get("total_count").and_then(Value::as_u64),
        };
        debug!(
            page = page.page_number,
            total_pages = ?page.total_pages,
            total_count = ?page.total_count,
            records = page.records.len(),
            "fetched report page"
        );
        Ok(page)
    }

    /// Fetches the detail record for `id`.
    ///
    /// # Errors
    ///
    /// Returns executor errors, or [`ApiError::Protocol`] when the response
    /// has no `data` object.
    #[instrument(skip(self, id), fields(report_id = %id))]
    pub async fn fetch_detail(&self, id: &ReportId) -> Result<ReportDetail, ApiError> {
        let request = ApiRequest::get(endpoint(&self.base_url, &["reports", id.as_str()]));
        let body: Value = self.executor.get_json(&request).await?;

        let Some(data) = body.get("data").filter(|data| data.is_object()) else {
            return Err(ApiError::protocol(
                request.url().as_str(),
                "detail response has no `data` object",
            ));
        };
        let url = data.get("url").and_then(Value::as_str).map(str::to_string);

        Ok(ReportDetail {
            id: id.clone(),
            url,
        })
    }
}

/// Returns the page to fetch after `page`, or `None` when the sweep is done.
///
/// The sweep also stops when the server omits `total_pages` or returns an
/// empty page, even if `total_pages` claims more remain.
#[must_use]
pub fn next_page(page: &PageResult) -> Option<u32> {
    if page.records.is_empty() {
        match page.total_pages {
            Some(total_pages) if page.page_number < total_pages => warn!(
                page = page.page_number,
                total_pages, "empty page before the reported last page; stopping"
            ),
            _ => debug!(page = page.page_number, "empty page; stopping"),
        }
        return None;
    }
    let Some(total_pages) = page.total_pages else {
        warn!(
            page = page.page_number,
            "response has no total_pages; stopping after this page"
        );
        return None;
    };
    if page.page_number >= total_pages {
        return None;
    }
    page.page_number.checked_add(1)
}

fn read_u32(body: &Value, key: &str) -> Option<u32> {
    body.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, total: Option<u32>, records: usize) -> PageResult {
        PageResult {
            records: (0..records as u64).map(Report::new).collect(),
            page_number: number,
            total_pages: total,
            total_count: None,
        }
    }

    #[test]
    fn test_next_page_advances_until_total() {
        assert_eq!(next_page(&page(1, Some(3), 50)), Some(2));
        assert_eq!(next_page(&page(2, Some(3), 50)), Some(3));
        assert_eq!(next_page(&page(3, Some(3), 7)), None);
    }

    #[test]
    fn test_next_page_stops_past_total() {
        assert_eq!(next_page(&page(5, Some(3), 1)), None);
    }

    #[test]
    fn test_next_page_stops_without_total() {
        assert_eq!(next_page(&page(1, None, 50)), None);
    }

    #[test]
    fn test_next_page_stops_on_empty_page() {
        assert_eq!(next_page(&page(1, Some(10), 0)), None);
    }

    #[test]
    fn test_json_kind_names() {
        assert_eq!(json_kind(&Value::Null), "null");
        assert_eq!(json_kind(&serde_json::json!({"a": 1})), "object");
    }
}
