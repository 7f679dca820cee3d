//! Business services. Each service owns a database handle and the event
//! sender; handlers stay thin and call into these.

pub mod asu_machines;
pub mod bom;
pub mod costing;
pub mod count_products;
pub mod dyeing;
pub mod inventory;
pub mod machines;
pub mod production_entries;
pub mod production_jobs;
pub mod users;
pub mod work_orders;

use chrono::NaiveDate;
use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal, RoundingStrategy,
};
use sea_orm::{
    sea_query::{Expr, Func, SimpleExpr},
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect,
};

use crate::errors::ServiceError;

/// One page of a list query, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Rows to skip; saturates instead of overflowing and never exceeds
    /// what a signed 64-bit `OFFSET` accepts.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// A page of results plus the unpaginated total.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Paged<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }

    /// Slice an in-memory list the same way a database page would be cut.
    pub fn from_vec(all: Vec<T>, page: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .collect();
        Self { items, total }
    }
}

/// Round half away from zero to `dp` decimal places.
pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// `f64` variant of [`round_dp`] for shift production figures. The value is
/// taken at its shortest decimal form first, so `1.005` rounds to `1.01`.
pub fn round_to(value: f64, dp: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| round_dp(d, dp))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Largest magnitude the `numeric(16, 4)` quantity and money columns hold.
pub(crate) fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 0)
}

fn ensure_storable(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value.abs() > max_amount() {
        return Err(ServiceError::ValidationError(format!(
            "{} must not exceed {}",
            field,
            max_amount()
        )));
    }
    Ok(())
}

/// Reject zero, negative and out-of-range quantities
pub(crate) fn ensure_positive(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} must be greater than 0",
            field
        )));
    }
    ensure_storable(field, value)
}

pub(crate) fn ensure_non_negative(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be negative",
            field
        )));
    }
    ensure_storable(field, value)
}

/// Overflow-checked arithmetic result, reported as a validation error
pub(crate) fn checked(value: Option<Decimal>, what: &str) -> Result<Decimal, ServiceError> {
    value.ok_or_else(|| ServiceError::ValidationError(format!("{} is out of range", what)))
}

/// Case-insensitive substring match that behaves the same on Postgres and SQLite
pub(crate) fn contains_ci<C: ColumnTrait>(column: C, needle: &str) -> SimpleExpr {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(column.as_column_ref())))
        .like(sea_orm::sea_query::LikeExpr::new(format!("%{}%", escaped)).escape('\\'))
}

/// Next `PREFIX-YYYYMMDD-NNNN` document number for `date`.
///
/// The sequence restarts every day. Two concurrent creators can race to the
/// same number; the unique index turns the loser into a 409.
pub(crate) async fn next_document_number<E, C>(
    conn: &C,
    column: E::Column,
    prefix: &str,
    date: NaiveDate,
) -> Result<String, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let stem = format!("{}-{}-", prefix, date.format("%Y%m%d"));
    let numbers: Vec<String> = E::find()
        .select_only()
        .column(column)
        .filter(column.starts_with(stem.as_str()))
        .into_tuple()
        .all(conn)
        .await?;

    let next = highest_sequence(&numbers) + 1;
    Ok(format!("{}{:04}", stem, next))
}

/// Numeric maximum of the trailing sequence; string order breaks past 9999.
fn highest_sequence(numbers: &[String]) -> u32 {
    numbers
        .iter()
        .filter_map(|number| number.rsplit('-').next())
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn page_request_clamps_to_first_page() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
    }

    #[test]
    fn huge_page_numbers_saturate() {
        let page = PageRequest::new(u64::MAX, 20);
        assert_eq!(page.offset(), i64::MAX as u64);
        let paged = Paged::from_vec(vec![1, 2, 3], page);
        assert!(paged.items.is_empty());
        assert_eq!(paged.total, 3);
    }

    #[test]
    fn in_memory_pages() {
        let paged = Paged::from_vec((1..=45).collect::<Vec<_>>(), PageRequest::new(3, 20));
        assert_eq!(paged.total, 45);
        assert_eq!(paged.items, (41..=45).collect::<Vec<_>>());

        let beyond = Paged::from_vec(vec![1, 2], PageRequest::new(5, 20));
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 2);
    }

    #[test]
    fn positive_quantities() {
        assert!(ensure_positive("quantity_kg", dec!(0.5)).is_ok());
        assert!(ensure_positive("quantity_kg", dec!(0)).is_err());
        assert!(ensure_positive("quantity_kg", dec!(-3)).is_err());
        assert!(ensure_positive("quantity_kg", dec!(1000000000000)).is_err());
        assert!(ensure_non_negative("rate_per_kg", dec!(0)).is_ok());
        assert!(ensure_non_negative("rate_per_kg", dec!(-0.01)).is_err());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_dp(dec!(1.005), 2), dec!(1.01));
        assert_eq!(round_dp(dec!(-2.5), 0), dec!(-3));
        assert_eq!(round_to(1.005, 2), 1.01);
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(1.0004, 3), 1.0);
    }

    #[test]
    fn checked_overflow_is_a_validation_error() {
        assert_matches!(
            checked(Decimal::MAX.checked_mul(dec!(2)), "batch cost"),
            Err(ServiceError::ValidationError(_))
        );
        assert_eq!(checked(dec!(2).checked_mul(dec!(3)), "x").unwrap(), dec!(6));
    }

    #[test]
    fn sequence_is_compared_numerically() {
        let numbers = vec![
            "WO-20240501-9999".to_string(),
            "WO-20240501-10000".to_string(),
            "WO-20240501-0042".to_string(),
        ];
        assert_eq!(highest_sequence(&numbers), 10_000);
        assert_eq!(highest_sequence(&[]), 0);
    }
}
