//! Property-based tests for the stock ledger, VAT split, list parameters and
//! deployment status rules.

use std::collections::HashMap;

use autoshop_api::services::{
    deployments::{resolve_status, DeploymentState, StatusChange},
    forecasting::fit_and_project,
    listing::ListQuery,
    stock::{plan_stock_changes, StockContribution},
    vat::{VatPolicy, VatTreatment},
};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn part_strategy() -> impl Strategy<Value = Uuid> {
    // Three fixed parts so before/after often land on the same one.
    prop_oneof![
        Just(Uuid::from_u128(1)),
        Just(Uuid::from_u128(2)),
        Just(Uuid::from_u128(3)),
    ]
}

fn contribution_strategy() -> impl Strategy<Value = Option<StockContribution>> {
    prop::option::of((part_strategy(), -500i32..500).prop_map(|(part_id, quantity)| {
        StockContribution { part_id, quantity }
    }))
}

fn cents_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn date_strategy() -> impl Strategy<Value = Option<NaiveDate>> {
    prop::option::of((1u32..=28).prop_map(|d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap()))
}

proptest! {
    #[test]
    fn stock_plan_nets_to_after_minus_before(
        before in contribution_strategy(),
        after in contribution_strategy(),
    ) {
        let changes = plan_stock_changes(before, after);

        let mut expected: HashMap<Uuid, i32> = HashMap::new();
        if let Some(b) = before {
            *expected.entry(b.part_id).or_default() -= b.quantity;
        }
        if let Some(a) = after {
            *expected.entry(a.part_id).or_default() += a.quantity;
        }
        expected.retain(|_, delta| *delta != 0);

        let planned: HashMap<Uuid, i32> =
            changes.iter().map(|c| (c.part_id, c.delta)).collect();
        prop_assert_eq!(planned.len(), changes.len(), "a part appears twice");
        prop_assert_eq!(planned, expected);
    }

    #[test]
    fn undoing_a_write_plans_the_opposite_changes(
        before in contribution_strategy(),
        after in contribution_strategy(),
    ) {
        let forward = plan_stock_changes(before, after);
        let backward = plan_stock_changes(after, before);
        for change in &forward {
            let undo = backward.iter().find(|c| c.part_id == change.part_id);
            prop_assert_eq!(undo.map(|c| c.delta), Some(-change.delta));
        }
        prop_assert_eq!(forward.len(), backward.len());
    }

    #[test]
    fn vat_split_always_sums_to_amount(amount in cents_strategy(), rate in 0u32..30) {
        let policy = VatPolicy::new(Decimal::new(rate.into(), 2));
        let split = policy.split(amount, VatTreatment::Standard).unwrap();
        prop_assert_eq!(split.net_of_vat + split.vat, amount);
        prop_assert!(split.net_of_vat <= amount);
        prop_assert!(split.vat >= Decimal::ZERO);
        prop_assert!(split.net_of_vat.scale() <= 2);
    }

    #[test]
    fn exempt_amounts_carry_no_vat(
        amount in cents_strategy(),
        is_non_vat in any::<bool>(),
    ) {
        let policy = VatPolicy::new(dec!(0.12));
        let treatment = VatTreatment::from_flags(is_non_vat, !is_non_vat);
        let split = policy.split(amount, treatment).unwrap();
        prop_assert_eq!(split.net_of_vat, amount);
        prop_assert_eq!(split.vat, Decimal::ZERO);
    }

    #[test]
    fn list_window_never_exceeds_max(start in 0u64..10_000, len in 0u64..10_000) {
        let params = HashMap::from([
            ("_start".to_string(), start.to_string()),
            ("_end".to_string(), (start + len).to_string()),
        ]);
        let query = ListQuery::from_params(&params, 10, 100).unwrap();
        prop_assert_eq!(query.start, start);
        prop_assert!(query.limit() <= 100);
        prop_assert_eq!(query.limit(), len.min(100));
    }

    #[test]
    fn released_implies_deployed(
        deployed in any::<bool>(),
        released in any::<bool>(),
        change_deployed in prop::option::of(any::<bool>()),
        change_released in prop::option::of(any::<bool>()),
        deployment_date in date_strategy(),
        release_date in date_strategy(),
    ) {
        let today = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let current = DeploymentState {
            deployment_status: deployed,
            deployment_date: deployed.then_some(today),
            release_status: deployed && released,
            release_date: (deployed && released).then_some(today),
        };
        let change = StatusChange {
            deployment_status: change_deployed,
            deployment_date,
            release_status: change_released,
            release_date,
        };

        if let Ok(state) = resolve_status(current, change, today) {
            prop_assert!(!state.release_status || state.deployment_status);
            prop_assert_eq!(state.deployment_status, state.deployment_date.is_some());
            prop_assert_eq!(state.release_status, state.release_date.is_some());
        } else {
            prop_assert_eq!(change_released, Some(true));
            prop_assert!(!change_deployed.unwrap_or(deployed));
        }
    }

    #[test]
    fn projections_are_never_negative(
        history in prop::collection::vec(0.0f64..1_000_000.0, 2..24),
        periods in 1usize..24,
    ) {
        let settings = autoshop_api::services::forecasting::RegressionSettings {
            learning_rate: 0.1,
            iterations: 200,
        };
        let projected = fit_and_project(&history, periods, settings);
        prop_assert_eq!(projected.len(), periods);
        prop_assert!(projected.iter().all(|v| v.is_finite() && *v >= 0.0));
    }
}
