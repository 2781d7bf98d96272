use chrono::NaiveDate;
use serde::Deserialize;

use crate::bookings::{BookingError, BookingStatus};

/// Default page size for the admin booking list
pub const DEFAULT_PAGE_LIMIT: u32 = 15;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Booking list ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingOrder {
    /// Newest submissions first (admin list)
    #[default]
    CreatedDesc,
    /// Latest booking date first (export, kitchen view)
    BookingDateDesc,
}

/// Validated filter for listing bookings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub search: Option<String>,
    pub status: Option<BookingStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// None returns every match
    pub limit: Option<u32>,
    pub offset: u32,
    pub order: BookingOrder,
}

impl BookingFilter {
    /// Bookings of a single day
    pub fn on_date(date: NaiveDate, status: Option<BookingStatus>) -> Self {
        Self {
            status,
            date_from: Some(date),
            date_to: Some(date),
            order: BookingOrder::CreatedDesc,
            ..Self::default()
        }
    }

    /// Does `booking` pass this filter? Mirrors the SQL built below.
    pub fn matches(&self, booking: &crate::bookings::Booking) -> bool {
        if let Some(status) = self.status {
            if booking.status != status {
                return false;
            }
        }
        if self.date_from.map_or(false, |from| booking.booking_date < from)
            || self.date_to.map_or(false, |to| booking.booking_date > to)
        {
            return false;
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                booking.booking_code.to_lowercase().contains(&term)
                    || booking.customer_name.to_lowercase().contains(&term)
                    || booking.whatsapp.contains(&term)
            }
            None => true,
        }
    }
}

/// SQL query builder for the booking list
/// Builds a page query and a matching count query sharing the same parameters
pub struct SQLQueryBuilder {
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_clause: &'static str,
    limit: Option<u32>,
    offset: u32,
}

impl SQLQueryBuilder {
    pub fn new() -> Self {
        Self {
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_clause: "created_at DESC, id DESC",
            limit: None,
            offset: 0,
        }
    }

    /// Builder with every filter of `filter` applied
    pub fn from_filter(filter: &BookingFilter) -> Self {
        let mut builder = Self::new();
        if let Some(search) = &filter.search {
            builder.add_search_filter(search);
        }
        if let Some(status) = filter.status {
            builder.add_status_filter(status);
        }
        builder.add_date_range(filter.date_from, filter.date_to);
        builder.set_order(filter.order);
        builder.limit = filter.limit;
        builder.offset = filter.offset;
        builder
    }

    /// Case-insensitive partial match on code, customer name or WhatsApp number
    pub fn add_search_filter(&mut self, search: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!(
            "(booking_code ILIKE ${0} OR customer_name ILIKE ${0} OR whatsapp ILIKE ${0})",
            param_index
        ));
        self.params.push(format!("%{}%", search));
    }

    pub fn add_status_filter(&mut self, status: BookingStatus) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!("status = ${}", param_index));
        self.params.push(status.as_str().to_string());
    }

    /// Both bounds are inclusive
    pub fn add_date_range(&mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) {
        if let Some(from) = from {
            let param_index = self.params.len() + 1;
            self.where_clauses.push(format!("booking_date >= ${}::date", param_index));
            self.params.push(from.to_string());
        }
        if let Some(to) = to {
            let param_index = self.params.len() + 1;
            self.where_clauses.push(format!("booking_date <= ${}::date", param_index));
            self.params.push(to.to_string());
        }
    }

    pub fn set_order(&mut self, order: BookingOrder) {
        self.order_clause = match order {
            BookingOrder::CreatedDesc => "created_at DESC, id DESC",
            BookingOrder::BookingDateDesc => "booking_date DESC, created_at DESC, id DESC",
        };
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// Page query selecting `columns`, plus the filter parameters
    pub fn build(&self, columns: &str) -> (String, Vec<String>) {
        let mut query = format!("SELECT {} FROM bookings{}", columns, self.where_sql());
        query.push_str(" ORDER BY ");
        query.push_str(self.order_clause);

        // LIMIT and OFFSET are integers in the query string, not text parameters
        if let Some(limit) = self.limit {
            query.push_str(&format!(" LIMIT {} OFFSET {}", limit, self.offset));
        }

        (query, self.params.clone())
    }

    /// COUNT(*) over the same filters
    pub fn build_count(&self) -> (String, Vec<String>) {
        (
            format!("SELECT COUNT(*) FROM bookings{}", self.where_sql()),
            self.params.clone(),
        )
    }
}

impl Default for SQLQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters of the admin booking list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListParams {
    pub search: Option<String>,
    pub status: Option<String>,
    /// Single day; overrides `date_from`/`date_to`
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query parameters of the export and kitchen views
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportParams {
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub format: Option<String>,
}

/// Validated page request
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedList {
    pub filter: BookingFilter,
    pub page: u32,
    pub limit: u32,
}

/// Query parameter validator
pub struct QueryValidator;

impl QueryValidator {
    pub fn validate_list(params: BookingListParams) -> Result<ValidatedList, BookingError> {
        let page = params.page.unwrap_or(1);
        let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        Self::validate_pagination_param(page, "page")?;
        Self::validate_pagination_param(limit, "limit")?;
        let limit = limit.min(MAX_PAGE_LIMIT);

        let (date_from, date_to) = Self::date_range(params.date, params.date_from, params.date_to)?;

        Ok(ValidatedList {
            filter: BookingFilter {
                search: Self::normalize_string(params.search),
                status: Self::parse_status(params.status)?,
                date_from,
                date_to,
                limit: Some(limit),
                offset: (page - 1) * limit,
                order: BookingOrder::CreatedDesc,
            },
            page,
            limit,
        })
    }

    /// Unpaged filter ordered by booking date
    pub fn validate_export(params: &ExportParams) -> Result<BookingFilter, BookingError> {
        let (date_from, date_to) = Self::date_range(params.date, params.date_from, params.date_to)?;
        Ok(BookingFilter {
            search: None,
            status: Self::parse_status(params.status.clone())?,
            date_from,
            date_to,
            limit: None,
            offset: 0,
            order: BookingOrder::BookingDateDesc,
        })
    }

    fn date_range(
        date: Option<NaiveDate>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<(Option<NaiveDate>, Option<NaiveDate>), BookingError> {
        if let Some(day) = date {
            return Ok((Some(day), Some(day)));
        }
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(BookingError::invalid(
                    "date_from",
                    "date_from cannot be after date_to",
                ));
            }
        }
        Ok((from, to))
    }

    /// Empty or "all" means no status filter
    fn parse_status(raw: Option<String>) -> Result<Option<BookingStatus>, BookingError> {
        match Self::normalize_string(raw) {
            None => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
            Some(s) => s
                .parse::<BookingStatus>()
                .map(Some)
                .map_err(|message| BookingError::invalid("status", message)),
        }
    }

    /// Trims whitespace; empty strings become None
    pub fn normalize_string(s: Option<String>) -> Option<String> {
        s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn validate_pagination_param(value: u32, param_name: &str) -> Result<(), BookingError> {
        if value == 0 {
            return Err(BookingError::invalid(
                param_name,
                format!("{} must be a positive number (greater than 0)", param_name),
            ));
        }
        Ok(())
    }
}
