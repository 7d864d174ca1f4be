//! Page-number pagination shared by every listing.
//!
//! Page numbers are 1-based. A missing or non-numeric `page` parameter selects
//! the first page; a number below 1 or beyond the last page selects the last
//! page. An empty listing still has one (empty) page.

use serde::Serialize;

pub const PAGE_SIZE: u64 = 10;

/// Raw `page` query value as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageParam {
    First,
    Number(i64),
}

impl PageParam {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim) else {
            return PageParam::First;
        };
        if let Ok(number) = value.parse::<i64>() {
            return PageParam::Number(number);
        }

        // Integers too wide for i64 are still page numbers; saturate so they clamp.
        let (negative, digits) = match value.as_bytes().first() {
            Some(b'-') => (true, &value[1..]),
            Some(b'+') => (false, &value[1..]),
            _ => (false, value),
        };
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return PageParam::First;
        }
        PageParam::Number(if negative { i64::MIN } else { i64::MAX })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub number: u64,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    total: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(total: u64, per_page: u64) -> Self {
        Self {
            total,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> u64 {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    pub fn resolve(&self, param: PageParam) -> PageBounds {
        let last = self.num_pages();
        let number = match param {
            PageParam::First => 1,
            PageParam::Number(value) if value >= 1 && (value as u64) <= last => value as u64,
            PageParam::Number(_) => last,
        };

        PageBounds {
            number,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }

    /// Slice an in-memory sequence into the requested window.
    pub fn window<T>(items: Vec<T>, per_page: u64, param: PageParam) -> PageWindow<T> {
        let paginator = Paginator::new(items.len() as u64, per_page);
        let bounds = paginator.resolve(param);
        let offset = usize::try_from(bounds.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(bounds.limit).unwrap_or(usize::MAX);
        let page_items = items.into_iter().skip(offset).take(limit).collect();
        PageWindow::new(page_items, bounds.number, paginator.num_pages(), paginator.total)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageWindow<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> PageWindow<T> {
    pub fn new(items: Vec<T>, number: u64, num_pages: u64, total: u64) -> Self {
        Self {
            items,
            number,
            num_pages,
            total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then_some(self.number - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageWindow<U> {
        PageWindow {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}
