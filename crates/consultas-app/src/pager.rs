// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{CellValue, QueryResult};

pub const PAGE_SIZE: usize = 10;

pub fn total_pages(row_count: usize) -> usize {
    if row_count == 0 {
        1
    } else {
        row_count.div_ceil(PAGE_SIZE)
    }
}

/// 1-based inclusive row numbers shown on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: usize,
    pub last: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultPager {
    result: Option<QueryResult>,
    page: usize,
}

impl Default for ResultPager {
    fn default() -> Self {
        Self {
            result: None,
            page: 1,
        }
    }
}

impl ResultPager {
    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    pub const fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.row_count())
    }

    pub fn row_count(&self) -> usize {
        self.result.as_ref().map_or(0, QueryResult::row_count)
    }

    pub fn needs_pagination(&self) -> bool {
        self.row_count() > PAGE_SIZE
    }

    pub fn clear(&mut self) {
        self.result = None;
        self.page = 1;
    }

    pub fn set_result(&mut self, result: QueryResult) {
        self.result = Some(result);
        self.page = 1;
    }

    pub fn visible_rows(&self) -> &[Vec<CellValue>] {
        let Some(result) = &self.result else {
            return &[];
        };
        let rows = result.rows();
        let start = (self.page - 1).saturating_mul(PAGE_SIZE).min(rows.len());
        let end = start.saturating_add(PAGE_SIZE).min(rows.len());
        &rows[start..end]
    }

    pub fn range(&self) -> Option<PageRange> {
        let total = self.row_count();
        if total == 0 {
            return None;
        }
        let first = (self.page - 1) * PAGE_SIZE + 1;
        Some(PageRange {
            first,
            last: (first + PAGE_SIZE - 1).min(total),
            total,
        })
    }

    /// Returns `true` when the page moved.
    pub fn prev_page(&mut self) -> bool {
        let before = self.page;
        self.page = self.page.saturating_sub(1).max(1);
        self.page != before
    }

    pub fn next_page(&mut self) -> bool {
        let before = self.page;
        self.page = (self.page + 1).min(self.total_pages());
        self.page != before
    }
}
