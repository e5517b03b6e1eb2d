// src/common/pagination.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Maior página aceita nas listagens.
pub const MAX_PAGE: i64 = 1_000_000;

/// Deslocamento de uma página (a partir de 1); satura em vez de estourar.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    page.saturating_sub(1).max(0).saturating_mul(limit.max(0))
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

/// Parâmetros comuns a todas as listagens.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 1_000_000, message = "invalid_page"))]
    pub page: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "invalid_limit"))]
    pub limit: i64,

    pub sort_by: Option<String>,

    #[serde(default)]
    pub sort_order: SortOrder,

    pub search: Option<String>,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            sort_by: None,
            sort_order: SortOrder::default(),
            search: None,
            start_date: None,
            end_date: None,
        }
    }
}

impl ListQuery {
    pub fn offset(&self) -> i64 {
        page_offset(self.page, self.limit)
    }

    /// Texto de busca "útil": vazio ou só espaços equivale a nenhuma busca.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::from_dates(self.start_date, self.end_date)
    }
}

/// Janela de datas aplicada sobre `updated_at`: `start <= t < end_before`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    /// Meia-noite do dia seguinte a `end_date`; o dia final entra inteiro.
    pub end_before: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        let start = start.and_then(midnight);
        let end_before = end.and_then(|d| d.succ_opt()).and_then(midnight);
        Self { start, end_before }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| at >= s) && self.end_before.is_none_or(|e| at < e)
    }
}
