use serde::{Deserialize, Serialize};

use crate::{constants::MAX_PAGE_SIZE, error::TypeError, form::Form};

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(results: Vec<T>, count: i64, page: &Pagination) -> Self {
        let next = if page.page * page.limit < count {
            Some(page.page + 1)
        } else {
            None
        };
        let previous = if page.page > 1 {
            Some(page.page - 1)
        } else {
            None
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// 1-based page number and page size read from `?page=&limit=`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn from_form(form: &Form, default_limit: i64) -> Result<Self, potion::Error> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1).max(1);
        let limit = form
            .get_number::<i64>("limit")?
            .unwrap_or(default_limit)
            .clamp(1, MAX_PAGE_SIZE);

        // Keeps `offset` and the end of the page inside i64.
        if page.checked_mul(limit).is_none() {
            return Err(TypeError::new("Page number is out of range").into());
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination(query: &str) -> Pagination {
        let form = Form::from_query(query).unwrap_or_else(|_| panic!("query should parse"));
        Pagination::from_form(&form, 6).unwrap_or_else(|_| panic!("pagination should parse"))
    }

    #[test]
    fn defaults_and_bounds() {
        assert_eq!(pagination(""), Pagination { page: 1, limit: 6 });
        assert_eq!(pagination("page=0&limit=1000"), Pagination { page: 1, limit: 100 });
        assert_eq!(pagination("page=3&limit=10").offset(), 20);
    }

    #[test]
    fn huge_page_is_rejected() {
        let form = Form::from_query("page=9223372036854775807&limit=2")
            .unwrap_or_else(|_| panic!("query should parse"));
        match Pagination::from_form(&form, 6) {
            Ok(_) => panic!("page should be out of range"),
            Err(err) => assert_eq!(err.code as u16, 400),
        }

        let last = pagination("page=9223372036854775807&limit=1");
        assert_eq!(last.offset(), i64::MAX - 1);
        let page: PageContext<i32> = PageContext::from_rows(vec![], 3, &last);
        assert_eq!(page.next, None);
    }

    #[test]
    fn links_follow_position() {
        let first = PageContext::from_rows(vec![1, 2], 5, &Pagination { page: 1, limit: 2 });
        assert_eq!(first.next, Some(2));
        assert_eq!(first.previous, None);

        let last = PageContext::from_rows(vec![5], 5, &Pagination { page: 3, limit: 2 });
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(2));
    }

    #[test]
    fn empty_page() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, &Pagination { page: 1, limit: 6 });
        assert_eq!(page.count, 0);
        assert_eq!(page.next, None);
        assert!(page.results.is_empty());
    }
}
