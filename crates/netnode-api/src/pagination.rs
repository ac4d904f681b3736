//! # Page-Number Pagination
//!
//! List endpoints return `{count, next, previous, results}` where `next` and
//! `previous` are page numbers. `page` is 1-based; `page_size` falls back to
//! the configured default and is capped at [`MAX_PAGE_SIZE`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::routes::network_nodes::NodeDetail;
use crate::routes::products::ProductDetail;
use crate::state::MAX_PAGE_SIZE;

/// One page of results.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(NodePage = Page<NodeDetail>, ProductPage = Page<ProductDetail>)]
pub struct Page<T> {
    /// Total number of matching records.
    pub count: usize,
    /// Next page number, if any.
    pub next: Option<usize>,
    /// Previous page number, if any.
    pub previous: Option<usize>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Convert every result, keeping the page metadata.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect::<Result<_, _>>()?,
        })
    }
}

/// Which page the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedPage {
    /// 1-based page number.
    Number(usize),
    /// `page=last`.
    Last,
}

/// Raw pagination parameters from the query string.
///
/// Kept as strings so a malformed `page` becomes a 404 rather than a query
/// parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PageParams {
    /// Effective page size. Unparseable or non-positive values fall back to
    /// the default; large values are capped.
    pub fn page_size(&self, default: usize) -> usize {
        match self.page_size.as_deref().map(str::trim).map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => n.min(MAX_PAGE_SIZE),
            _ => default,
        }
    }

    /// Requested page; defaults to the first.
    pub fn page_number(&self) -> Result<RequestedPage, AppError> {
        match self.page.as_deref().map(str::trim) {
            None | Some("") => Ok(RequestedPage::Number(1)),
            Some("last") => Ok(RequestedPage::Last),
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => Ok(RequestedPage::Number(n)),
                _ => Err(invalid_page()),
            },
        }
    }
}

fn invalid_page() -> AppError {
    AppError::NotFound("Invalid page.".into())
}

/// Slice an ordered collection into the requested page.
///
/// Page 1 of an empty collection is valid and empty; any other page beyond
/// the last is a 404.
pub fn paginate<T>(items: Vec<T>, params: &PageParams, default_size: usize) -> Result<Page<T>, AppError> {
    let size = params.page_size(default_size);
    let count = items.len();
    let pages = count.div_ceil(size).max(1);
    let page = match params.page_number()? {
        RequestedPage::Last => pages,
        RequestedPage::Number(n) if n > pages => return Err(invalid_page()),
        RequestedPage::Number(n) => n,
    };

    let results = items
        .into_iter()
        .skip((page - 1) * size)
        .take(size)
        .collect();

    Ok(Page {
        count,
        next: (page < pages).then_some(page + 1),
        previous: (page > 1).then_some(page - 1),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, size: Option<&str>) -> PageParams {
        PageParams {
            page: page.map(String::from),
            page_size: size.map(String::from),
        }
    }

    #[test]
    fn first_page_defaults() {
        let page = paginate((0..25).collect(), &PageParams::default(), 10).unwrap();
        assert_eq!(page.count, 25);
        assert_eq!(page.results, (0..10).collect::<Vec<_>>());
        assert_eq!(page.next, Some(2));
        assert_eq!(page.previous, None);
    }

    #[test]
    fn last_page_is_partial() {
        let page = paginate((0..25).collect(), &params(Some("3"), None), 10).unwrap();
        assert_eq!(page.results, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(2));

        let last = paginate((0..25).collect(), &params(Some("last"), None), 10).unwrap();
        assert_eq!(last.results, page.results);
    }

    #[test]
    fn empty_first_page_is_valid() {
        let page = paginate(Vec::<u8>::new(), &PageParams::default(), 10).unwrap();
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
        assert_eq!(page.next, None);
    }

    #[test]
    fn out_of_range_and_malformed_pages_are_not_found() {
        for raw in ["4", "0", "-1", "abc"] {
            let err = paginate((0..25).collect::<Vec<_>>(), &params(Some(raw), None), 10)
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)), "page {raw}");
        }
    }

    #[test]
    fn largest_page_number_is_not_last() {
        let raw = usize::MAX.to_string();
        assert_eq!(
            params(Some(&raw), None).page_number().unwrap(),
            RequestedPage::Number(usize::MAX)
        );
        let err = paginate((0..25).collect::<Vec<_>>(), &params(Some(&raw), None), 10)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn page_size_is_capped_and_defaulted() {
        assert_eq!(params(None, Some("1000")).page_size(10), MAX_PAGE_SIZE);
        assert_eq!(params(None, Some("0")).page_size(10), 10);
        assert_eq!(params(None, Some("x")).page_size(10), 10);
        assert_eq!(params(None, Some("5")).page_size(10), 5);
    }
}
