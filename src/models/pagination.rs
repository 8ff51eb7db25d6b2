use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits an `i64` at the largest page size
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Query string accepted by the history listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Inclusive lower bound on the entry date
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the entry date (whole day)
    pub end_date: Option<NaiveDate>,
    /// Page size (default: 10, max: 100)
    pub limit: Option<i64>,
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
}

impl ListQuery {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_PAGE_SIZE).contains(&limit) {
                return Err("Limit must be between 1 and 100");
            }
        }
        if let Some(page) = self.page {
            if page < 1 {
                return Err("Page must be at least 1");
            }
            if page > MAX_PAGE {
                return Err("Page is out of range");
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err("start_date must not be after end_date");
            }
        }
        Ok(())
    }

    pub fn get_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn get_page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn get_offset(&self) -> i64 {
        (self.get_page() - 1).saturating_mul(self.get_limit())
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            from: self
                .start_date
                .map(|d| d.and_time(NaiveTime::MIN).and_utc()),
            // exclusive: start of the day after end_date
            until: self
                .end_date
                .and_then(|d| d.succ_opt())
                .map(|d| d.and_time(NaiveTime::MIN).and_utc()),
        }
    }
}

/// Half-open date window `[from, until)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.until.map_or(true, |until| at < until)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl From<&ListQuery> for PageRequest {
    fn from(query: &ListQuery) -> Self {
        Self {
            limit: query.get_limit(),
            offset: query.get_offset(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub current_page: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, query: &ListQuery) -> Self {
        let limit = query.get_limit();
        Self {
            items,
            total,
            current_page: query.get_page(),
            total_pages: (total + limit - 1) / limit,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            current_page: self.current_page,
            total_pages: self.total_pages,
        }
    }
}
