//! Report listing, detail, and pagination.
//!
//! [`ReportsApi`] wraps the two report endpoints:
//! - `GET {base}/reports?created_after=<YYYY-MM-DD>&page_size=50&page_num=<n>`
//! - `GET {base}/reports/{id}`
//!
//! [`next_page`] decides whether a sweep continues after a page.

mod model;
mod walker;

pub use model::{PageResult, Report, ReportDetail, ReportId};
pub use walker::{PAGE_SIZE, ReportsApi, next_page};
