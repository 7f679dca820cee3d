//! Yarn cost build-up: material through yield loss, conversion, dyeing and
//! margin. All maths in `Decimal`, every output rounded to 2 places.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::{checked, round_dp};
use crate::errors::ServiceError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct YarnCostInput {
    #[schema(value_type = f64)]
    pub raw_material_rate_per_kg: Decimal,
    /// Usable yarn per kg of raw material, in percent (0 < y ≤ 100)
    #[schema(value_type = f64)]
    pub yield_percent: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub power_cost_per_kg: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub labour_cost_per_kg: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub overhead_cost_per_kg: Decimal,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub packing_cost_per_kg: Decimal,
    #[schema(value_type = Option<f64>)]
    pub dyeing_cost_per_kg: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = f64)]
    pub margin_percent: Decimal,
    #[schema(value_type = Option<f64>)]
    pub quantity_kg: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct YarnCostBreakdown {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub effective_material_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub conversion_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub dyeing_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_cost_per_kg: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub margin_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub selling_price_per_kg: Decimal,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    #[schema(value_type = Option<f64>)]
    pub batch_total_cost: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    #[schema(value_type = Option<f64>)]
    pub batch_selling_value: Option<Decimal>,
}

fn round2(value: Decimal) -> Decimal {
    round_dp(value, 2)
}

fn non_negative(field: &str, value: Decimal) -> Result<(), ServiceError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ServiceError::ValidationError(format!(
            "{} must not be negative",
            field
        )));
    }
    Ok(())
}

impl YarnCostInput {
    fn check(&self) -> Result<(), ServiceError> {
        non_negative("raw_material_rate_per_kg", self.raw_material_rate_per_kg)?;
        non_negative("power_cost_per_kg", self.power_cost_per_kg)?;
        non_negative("labour_cost_per_kg", self.labour_cost_per_kg)?;
        non_negative("overhead_cost_per_kg", self.overhead_cost_per_kg)?;
        non_negative("packing_cost_per_kg", self.packing_cost_per_kg)?;
        if let Some(dyeing) = self.dyeing_cost_per_kg {
            non_negative("dyeing_cost_per_kg", dyeing)?;
        }
        if let Some(quantity) = self.quantity_kg {
            non_negative("quantity_kg", quantity)?;
        }
        if self.yield_percent <= Decimal::ZERO || self.yield_percent > HUNDRED {
            return Err(ServiceError::ValidationError(
                "yield_percent must be greater than 0 and at most 100".to_string(),
            ));
        }
        if self.margin_percent < Decimal::ZERO || self.margin_percent > HUNDRED {
            return Err(ServiceError::ValidationError(
                "margin_percent must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-kg cost build-up for a yarn, plus batch totals when a quantity is given
#[instrument(skip(input))]
pub fn compute_yarn_cost(input: &YarnCostInput) -> Result<YarnCostBreakdown, ServiceError> {
    input.check()?;

    let effective_material_cost = checked(
        input
            .raw_material_rate_per_kg
            .checked_mul(HUNDRED)
            .and_then(|v| v.checked_div(input.yield_percent)),
        "effective material cost",
    )?;
    let conversion_cost = checked(
        input
            .power_cost_per_kg
            .checked_add(input.labour_cost_per_kg)
            .and_then(|v| v.checked_add(input.overhead_cost_per_kg))
            .and_then(|v| v.checked_add(input.packing_cost_per_kg)),
        "conversion cost",
    )?;
    let dyeing_cost = input.dyeing_cost_per_kg.unwrap_or(Decimal::ZERO);

    // Totals are built from the rounded components so the breakdown adds up
    let effective_material_cost = round2(effective_material_cost);
    let conversion_cost = round2(conversion_cost);
    let dyeing_cost = round2(dyeing_cost);
    let total_cost_per_kg = checked(
        effective_material_cost
            .checked_add(conversion_cost)
            .and_then(|v| v.checked_add(dyeing_cost)),
        "total cost per kg",
    )?;
    let margin_amount = round2(checked(
        total_cost_per_kg
            .checked_mul(input.margin_percent)
            .and_then(|v| v.checked_div(HUNDRED)),
        "margin amount",
    )?);
    let selling_price_per_kg = checked(
        total_cost_per_kg.checked_add(margin_amount),
        "selling price per kg",
    )?;

    let (batch_total_cost, batch_selling_value) = match input.quantity_kg {
        Some(quantity) => (
            Some(round2(checked(
                total_cost_per_kg.checked_mul(quantity),
                "batch total cost",
            )?)),
            Some(round2(checked(
                selling_price_per_kg.checked_mul(quantity),
                "batch selling value",
            )?)),
        ),
        None => (None, None),
    };

    Ok(YarnCostBreakdown {
        effective_material_cost,
        conversion_cost,
        dyeing_cost,
        total_cost_per_kg,
        margin_amount,
        selling_price_per_kg,
        batch_total_cost,
        batch_selling_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn input() -> YarnCostInput {
        YarnCostInput {
            raw_material_rate_per_kg: dec!(150),
            yield_percent: dec!(85),
            power_cost_per_kg: dec!(12.5),
            labour_cost_per_kg: dec!(8),
            overhead_cost_per_kg: dec!(5.25),
            packing_cost_per_kg: dec!(2),
            dyeing_cost_per_kg: None,
            margin_percent: dec!(10),
            quantity_kg: None,
        }
    }

    #[test]
    fn breakdown_for_grey_yarn() {
        let cost = compute_yarn_cost(&input()).unwrap();
        // 150 * 100 / 85 = 176.470588...
        assert_eq!(cost.effective_material_cost, dec!(176.47));
        assert_eq!(cost.conversion_cost, dec!(27.75));
        assert_eq!(cost.dyeing_cost, dec!(0));
        assert_eq!(cost.total_cost_per_kg, dec!(204.22));
        assert_eq!(cost.margin_amount, dec!(20.42));
        assert_eq!(cost.selling_price_per_kg, dec!(224.64));
        assert_eq!(cost.batch_total_cost, None);
    }

    #[test]
    fn dyed_yarn_with_batch() {
        let mut i = input();
        i.dyeing_cost_per_kg = Some(dec!(45));
        i.quantity_kg = Some(dec!(1000));
        let cost = compute_yarn_cost(&i).unwrap();
        assert_eq!(cost.total_cost_per_kg, dec!(249.22));
        assert_eq!(cost.margin_amount, dec!(24.92));
        assert_eq!(cost.batch_total_cost, Some(dec!(249220.00)));
        assert_eq!(cost.batch_selling_value, Some(dec!(274140.00)));
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        assert_eq!(round2(dec!(2.345)), dec!(2.35));
        assert_eq!(round2(dec!(2.344)), dec!(2.34));
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        let mut i = input();
        i.yield_percent = dec!(0);
        assert_matches!(compute_yarn_cost(&i), Err(ServiceError::ValidationError(_)));

        let mut i = input();
        i.yield_percent = dec!(100.5);
        assert!(compute_yarn_cost(&i).is_err());

        let mut i = input();
        i.margin_percent = dec!(120);
        assert!(compute_yarn_cost(&i).is_err());

        let mut i = input();
        i.labour_cost_per_kg = dec!(-1);
        assert!(compute_yarn_cost(&i).is_err());
    }

    #[test]
    fn overflowing_inputs_are_rejected_not_panicking() {
        let mut i = input();
        i.raw_material_rate_per_kg = dec!(1000000000000000000000000000);
        i.yield_percent = dec!(1);
        assert_matches!(compute_yarn_cost(&i), Err(ServiceError::ValidationError(_)));

        let mut i = input();
        i.quantity_kg = Some(Decimal::MAX);
        assert_matches!(compute_yarn_cost(&i), Err(ServiceError::ValidationError(_)));

        let mut i = input();
        i.raw_material_rate_per_kg = Decimal::MAX;
        i.yield_percent = dec!(0.0000001);
        assert_matches!(compute_yarn_cost(&i), Err(ServiceError::ValidationError(_)));

        let mut i = input();
        i.power_cost_per_kg = Decimal::MAX;
        i.labour_cost_per_kg = Decimal::MAX;
        assert_matches!(compute_yarn_cost(&i), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn serializes_as_numbers() {
        let json = serde_json::to_value(compute_yarn_cost(&input()).unwrap()).unwrap();
        assert_eq!(json["total_cost_per_kg"], 204.22);
        assert!(json["batch_total_cost"].is_null());
    }

    proptest! {
        #[test]
        fn selling_price_covers_cost(
            rate in 0u32..100_000,
            yield_pct in 1u32..=100,
            conversion in 0u32..10_000,
            margin in 0u32..=100,
        ) {
            let i = YarnCostInput {
                raw_material_rate_per_kg: Decimal::new(rate as i64, 2),
                yield_percent: Decimal::from(yield_pct),
                power_cost_per_kg: Decimal::new(conversion as i64, 2),
                labour_cost_per_kg: Decimal::ZERO,
                overhead_cost_per_kg: Decimal::ZERO,
                packing_cost_per_kg: Decimal::ZERO,
                dyeing_cost_per_kg: None,
                margin_percent: Decimal::from(margin),
                quantity_kg: None,
            };
            let cost = compute_yarn_cost(&i).unwrap();
            prop_assert!(cost.effective_material_cost >= round2(i.raw_material_rate_per_kg));
            prop_assert!(cost.selling_price_per_kg >= cost.total_cost_per_kg);
            prop_assert_eq!(cost.selling_price_per_kg, cost.total_cost_per_kg + cost.margin_amount);
            prop_assert_eq!(cost.total_cost_per_kg.scale() <= 2, true);
        }
    }
}
