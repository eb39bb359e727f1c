//! Coverage Report Formatters
//!
//! LCOV and static HTML generators for CI integration.

mod html;
mod lcov;

pub use html::{coverage_class, page_name, HtmlFormatter};
pub use lcov::{LcovFormatter, DEFAULT_TEST_NAME};
