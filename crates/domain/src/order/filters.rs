//! Filters for the admin order listing.

use common::OrderStatus;
use store::SortDirection;

use crate::error::{DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Any,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn as_status(&self) -> Option<OrderStatus> {
        match self {
            StatusFilter::Any => None,
            StatusFilter::Only(status) => Some(*status),
        }
    }
}

/// Recognized options for `list_all_orders`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilters {
    pub status: StatusFilter,
    pub sort_by_created_at: SortDirection,
    /// Case-insensitive substring of the purchaser's name.
    pub purchaser_name_contains: Option<String>,
}

impl OrderFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = StatusFilter::Only(status);
        self
    }

    pub fn sort(mut self, direction: SortDirection) -> Self {
        self.sort_by_created_at = direction;
        self
    }

    pub fn purchaser_name_contains(mut self, needle: impl Into<String>) -> Self {
        self.purchaser_name_contains = Some(needle.into());
        self
    }

    /// Builds filters from loose key/value pairs. Unknown keys are ignored;
    /// known keys with unusable values are rejected.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut filters = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            match key {
                "status" => {
                    filters.status = if value.is_empty() || value.eq_ignore_ascii_case("any") {
                        StatusFilter::Any
                    } else {
                        StatusFilter::Only(
                            value
                                .parse()
                                .map_err(|e: common::ParseError| DomainError::invalid(e.to_string()))?,
                        )
                    };
                }
                "sortByCreatedAt" => {
                    filters.sort_by_created_at = match value.to_ascii_lowercase().as_str() {
                        "asc" => SortDirection::Asc,
                        "desc" => SortDirection::Desc,
                        _ => {
                            return Err(DomainError::invalid(format!(
                                "sortByCreatedAt must be asc or desc (got {value})"
                            )));
                        }
                    };
                }
                "purchaserNameContains" => {
                    filters.purchaser_name_contains =
                        (!value.is_empty()).then(|| value.to_string());
                }
                _ => {}
            }
        }
        Ok(filters)
    }

    pub(crate) fn matches_purchaser(&self, name: &str) -> bool {
        match &self.purchaser_name_contains {
            Some(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}
