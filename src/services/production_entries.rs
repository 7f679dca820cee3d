use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{asu_machines::AsuMachineService, round_to, PageRequest, Paged};
use crate::{
    entities::{
        asu_machine::{self, Entity as AsuMachineEntity},
        production_entry::{self, Entity as ProductionEntryEntity, Shift},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Efficiency in percent, rounded to 2 decimals; 0 when nothing was expected.
pub fn compute_percentage(actual: f64, theoretical: f64) -> f64 {
    if theoretical <= 0.0 || !theoretical.is_finite() || !actual.is_finite() {
        return 0.0;
    }
    round_to(actual / theoretical * 100.0, 2)
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ShiftInput {
    pub actual_production: f64,
    /// Defaults to the 100% output of the configuration in force on the entry date
    pub theoretical_production: Option<f64>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateProductionEntry {
    pub unit: i32,
    #[serde(alias = "machineNumber")]
    pub machine_number: i32,
    pub date: NaiveDate,
    #[serde(alias = "dayShift")]
    pub day_shift: Option<ShiftInput>,
    #[serde(alias = "nightShift")]
    pub night_shift: Option<ShiftInput>,
}

impl CreateProductionEntry {
    fn shifts(&self) -> Vec<(Shift, &ShiftInput)> {
        [
            (Shift::Day, self.day_shift.as_ref()),
            (Shift::Night, self.night_shift.as_ref()),
        ]
        .into_iter()
        .filter_map(|(shift, input)| input.map(|i| (shift, i)))
        .collect()
    }

    fn check(&self) -> Result<(), ServiceError> {
        if !(1..=2).contains(&self.unit) {
            return Err(ServiceError::ValidationError(
                "unit must be 1 or 2".to_string(),
            ));
        }
        if self.machine_number <= 0 {
            return Err(ServiceError::ValidationError(
                "machine_number must be positive".to_string(),
            ));
        }
        let shifts = self.shifts();
        if shifts.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one of day_shift or night_shift is required".to_string(),
            ));
        }
        for (shift, input) in shifts {
            check_quantities(
                shift.as_str(),
                Some(input.actual_production),
                input.theoretical_production,
            )?;
        }
        Ok(())
    }
}

fn check_quantities(
    label: &str,
    actual: Option<f64>,
    theoretical: Option<f64>,
) -> Result<(), ServiceError> {
    for (field, value) in [
        ("actual_production", actual),
        ("theoretical_production", theoretical),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(ServiceError::ValidationError(format!(
                    "{} {} must be a non-negative number",
                    label, field
                )));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateProductionEntry {
    pub actual_production: Option<f64>,
    pub theoretical_production: Option<f64>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductionEntryFilter {
    pub unit: Option<i32>,
    pub machine_number: Option<i32>,
    pub shift: Option<Shift>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// A stored entry with its machine number joined in
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductionEntryView {
    #[serde(flatten)]
    pub entry: production_entry::Model,
    pub machine_number: i32,
    pub machine_name: String,
}

impl ProductionEntryView {
    fn new(entry: production_entry::Model, machine: &asu_machine::Model) -> Self {
        Self {
            entry,
            machine_number: machine.machine_no,
            machine_name: machine.machine_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShiftRecord {
    pub id: i32,
    pub actual_production: f64,
    pub theoretical_production: f64,
    pub percentage: f64,
    pub remarks: Option<String>,
}

/// Day and night rows of one machine on one date, reconciled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyProduction {
    pub date: NaiveDate,
    pub unit: i32,
    pub machine_id: i32,
    pub machine_number: i32,
    pub machine_name: String,
    pub day_shift: Option<ShiftRecord>,
    pub night_shift: Option<ShiftRecord>,
    pub total_actual: f64,
    pub total_theoretical: f64,
    pub percentage: f64,
}

/// Group flat entries into one row per `(date, machine)`.
///
/// Rows come back ordered by date descending, then machine number. The
/// combined percentage is recomputed from the totals.
pub fn group_daily(rows: Vec<ProductionEntryView>) -> Vec<DailyProduction> {
    // Key sorts date descending via Reverse, then machine number, then id
    let mut groups: BTreeMap<(std::cmp::Reverse<NaiveDate>, i32, i32), DailyProduction> =
        BTreeMap::new();

    for row in rows {
        let e = &row.entry;
        let key = (std::cmp::Reverse(e.date), row.machine_number, e.machine_id);
        let group = groups.entry(key).or_insert_with(|| DailyProduction {
            date: e.date,
            unit: e.unit,
            machine_id: e.machine_id,
            machine_number: row.machine_number,
            machine_name: row.machine_name.clone(),
            day_shift: None,
            night_shift: None,
            total_actual: 0.0,
            total_theoretical: 0.0,
            percentage: 0.0,
        });

        let record = ShiftRecord {
            id: e.id,
            actual_production: e.actual_production,
            theoretical_production: e.theoretical_production,
            percentage: e.percentage,
            remarks: e.remarks.clone(),
        };
        match e.shift {
            Shift::Day => group.day_shift = Some(record),
            Shift::Night => group.night_shift = Some(record),
        }
    }

    groups
        .into_values()
        .map(|mut g| {
            let shifts = g.day_shift.iter().chain(g.night_shift.iter());
            let (actual, theoretical) = shifts.fold((0.0, 0.0), |(a, t), s| {
                (a + s.actual_production, t + s.theoretical_production)
            });
            g.total_actual = round_to(actual, 3);
            g.total_theoretical = round_to(theoretical, 3);
            g.percentage = compute_percentage(actual, theoretical);
            g
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DateTotals {
    pub date: NaiveDate,
    pub total_actual: f64,
    pub total_theoretical: f64,
    pub percentage: f64,
    pub entry_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MachineTotals {
    pub unit: i32,
    pub machine_number: i32,
    pub machine_name: String,
    pub total_actual: f64,
    pub total_theoretical: f64,
    pub percentage: f64,
    pub entry_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductionSummary {
    pub total_actual: f64,
    pub total_theoretical: f64,
    pub percentage: f64,
    pub entry_count: u64,
    pub machine_count: u64,
    pub by_date: Vec<DateTotals>,
    pub by_machine: Vec<MachineTotals>,
}

#[derive(Default)]
struct Tally {
    actual: f64,
    theoretical: f64,
    count: u64,
}

impl Tally {
    fn add(&mut self, e: &production_entry::Model) {
        self.actual += e.actual_production;
        self.theoretical += e.theoretical_production;
        self.count += 1;
    }
}

/// Totals over a set of entries, by date (ascending) and by machine (ascending number)
pub fn summarize(rows: &[ProductionEntryView]) -> ProductionSummary {
    let mut overall = Tally::default();
    let mut by_date: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    let mut by_machine: BTreeMap<(i32, i32), (String, Tally)> = BTreeMap::new();
    let mut machines = BTreeSet::new();

    for row in rows {
        let e = &row.entry;
        overall.add(e);
        by_date.entry(e.date).or_default().add(e);
        by_machine
            .entry((row.machine_number, e.unit))
            .or_insert_with(|| (row.machine_name.clone(), Tally::default()))
            .1
            .add(e);
        machines.insert(e.machine_id);
    }

    ProductionSummary {
        total_actual: round_to(overall.actual, 3),
        total_theoretical: round_to(overall.theoretical, 3),
        percentage: compute_percentage(overall.actual, overall.theoretical),
        entry_count: overall.count,
        machine_count: machines.len() as u64,
        by_date: by_date
            .into_iter()
            .map(|(date, t)| DateTotals {
                date,
                total_actual: round_to(t.actual, 3),
                total_theoretical: round_to(t.theoretical, 3),
                percentage: compute_percentage(t.actual, t.theoretical),
                entry_count: t.count,
            })
            .collect(),
        by_machine: by_machine
            .into_iter()
            .map(|((machine_number, unit), (machine_name, t))| MachineTotals {
                unit,
                machine_number,
                machine_name,
                total_actual: round_to(t.actual, 3),
                total_theoretical: round_to(t.theoretical, 3),
                percentage: compute_percentage(t.actual, t.theoretical),
                entry_count: t.count,
            })
            .collect(),
    }
}

/// Per-shift production entries for ASU machines
#[derive(Clone)]
pub struct ProductionEntryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    machines: AsuMachineService,
    low_efficiency_threshold: f64,
}

impl ProductionEntryService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        machines: AsuMachineService,
        low_efficiency_threshold: f64,
    ) -> Self {
        Self {
            db,
            event_sender,
            machines,
            low_efficiency_threshold,
        }
    }

    fn condition(filter: &ProductionEntryFilter) -> Condition {
        let mut condition = Condition::all();
        if let Some(unit) = filter.unit {
            condition = condition.add(production_entry::Column::Unit.eq(unit));
        }
        if let Some(number) = filter.machine_number {
            condition = condition.add(asu_machine::Column::MachineNo.eq(number));
        }
        if let Some(shift) = filter.shift {
            condition = condition.add(production_entry::Column::Shift.eq(shift));
        }
        if let Some(from) = filter.date_from {
            condition = condition.add(production_entry::Column::Date.gte(from));
        }
        if let Some(to) = filter.date_to {
            condition = condition.add(production_entry::Column::Date.lte(to));
        }
        condition
    }

    async fn fetch_all(
        &self,
        filter: &ProductionEntryFilter,
    ) -> Result<Vec<ProductionEntryView>, ServiceError> {
        let rows = ProductionEntryEntity::find()
            .find_also_related(AsuMachineEntity)
            .filter(Self::condition(filter))
            .order_by_desc(production_entry::Column::Date)
            .order_by_asc(asu_machine::Column::MachineNo)
            .order_by_asc(production_entry::Column::Shift)
            .all(&*self.db)
            .await?;
        Ok(Self::join_rows(rows))
    }

    fn join_rows(
        rows: Vec<(production_entry::Model, Option<asu_machine::Model>)>,
    ) -> Vec<ProductionEntryView> {
        rows.into_iter()
            .filter_map(|(entry, machine)| match machine {
                Some(m) => Some(ProductionEntryView::new(entry, &m)),
                None => {
                    warn!(entry_id = entry.id, "Production entry without machine");
                    None
                }
            })
            .collect()
    }

    /// Flat, paginated list ordered by date desc, machine number, then shift
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductionEntryFilter,
        page: PageRequest,
    ) -> Result<Paged<ProductionEntryView>, ServiceError> {
        let db = &*self.db;
        let condition = Self::condition(filter);

        let total = ProductionEntryEntity::find()
            .inner_join(AsuMachineEntity)
            .filter(condition.clone())
            .count(db)
            .await?;

        let rows = ProductionEntryEntity::find()
            .find_also_related(AsuMachineEntity)
            .filter(condition)
            .order_by_desc(production_entry::Column::Date)
            .order_by_asc(asu_machine::Column::MachineNo)
            .order_by_asc(production_entry::Column::Shift)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;

        Ok(Paged {
            items: Self::join_rows(rows),
            total,
        })
    }

    /// Day/night reconciled rows, paginated over the grouped rows
    #[instrument(skip(self))]
    pub async fn daily(
        &self,
        filter: &ProductionEntryFilter,
        page: PageRequest,
    ) -> Result<Paged<DailyProduction>, ServiceError> {
        let grouped = group_daily(self.fetch_all(filter).await?);
        Ok(Paged::from_vec(grouped, page))
    }

    #[instrument(skip(self))]
    pub async fn summary(
        &self,
        filter: &ProductionEntryFilter,
    ) -> Result<ProductionSummary, ServiceError> {
        let rows = self.fetch_all(filter).await?;
        Ok(summarize(&rows))
    }

    pub async fn get(&self, id: i32) -> Result<ProductionEntryView, ServiceError> {
        let (entry, machine) = ProductionEntryEntity::find_by_id(id)
            .find_also_related(AsuMachineEntity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("production entry", id))?;
        let machine = machine.ok_or_else(|| ServiceError::not_found("ASU machine", entry.machine_id))?;
        Ok(ProductionEntryView::new(entry, &machine))
    }

    /// Record one or both shifts for a machine and date in a single transaction
    #[instrument(skip(self, input), fields(unit = input.unit, machine = input.machine_number, date = %input.date))]
    pub async fn create(
        &self,
        input: CreateProductionEntry,
        created_by: Option<Uuid>,
    ) -> Result<Vec<ProductionEntryView>, ServiceError> {
        input.check()?;

        let machine = self
            .machines
            .find_by_number(input.unit, input.machine_number)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "ASU machine {} not found in unit {}",
                    input.machine_number, input.unit
                ))
            })?;
        if !machine.is_active {
            return Err(ServiceError::ValidationError(format!(
                "ASU machine {} in unit {} is inactive",
                machine.machine_no, machine.unit
            )));
        }

        let default_theoretical = match self.machines.configuration_on(machine.id, input.date).await? {
            Some(config) => config.production_at_100,
            None => machine.production_at_100,
        };

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let mut created = Vec::new();

        for (shift, shift_input) in input.shifts() {
            let exists = ProductionEntryEntity::find()
                .filter(production_entry::Column::Unit.eq(input.unit))
                .filter(production_entry::Column::MachineId.eq(machine.id))
                .filter(production_entry::Column::Date.eq(input.date))
                .filter(production_entry::Column::Shift.eq(shift))
                .count(&txn)
                .await?;
            if exists > 0 {
                return Err(ServiceError::Conflict(format!(
                    "{} shift entry for machine {} in unit {} on {} already exists",
                    shift.as_str(),
                    machine.machine_no,
                    input.unit,
                    input.date
                )));
            }

            let theoretical = shift_input
                .theoretical_production
                .unwrap_or(default_theoretical);
            let entry = production_entry::ActiveModel {
                unit: Set(input.unit),
                machine_id: Set(machine.id),
                date: Set(input.date),
                shift: Set(shift),
                actual_production: Set(shift_input.actual_production),
                theoretical_production: Set(theoretical),
                percentage: Set(compute_percentage(shift_input.actual_production, theoretical)),
                remarks: Set(shift_input.remarks.clone()),
                created_by: Set(created_by),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            created.push(entry);
        }

        txn.commit().await?;

        for entry in &created {
            info!(
                entry_id = entry.id,
                shift = entry.shift.as_str(),
                percentage = entry.percentage,
                "Production entry recorded"
            );
            self.publish(entry, machine.machine_no, false);
        }

        Ok(created
            .into_iter()
            .map(|e| ProductionEntryView::new(e, &machine))
            .collect())
    }

    fn publish(&self, entry: &production_entry::Model, machine_number: i32, corrected: bool) {
        for event in entry_events(entry, machine_number, self.low_efficiency_threshold, corrected) {
            self.event_sender.emit(event);
        }
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: UpdateProductionEntry,
    ) -> Result<ProductionEntryView, ServiceError> {
        check_quantities("entry", input.actual_production, input.theoretical_production)?;
        let current = self.get(id).await?;
        let machine_number = current.machine_number;
        let machine_name = current.machine_name.clone();

        let actual = input
            .actual_production
            .unwrap_or(current.entry.actual_production);
        let theoretical = input
            .theoretical_production
            .unwrap_or(current.entry.theoretical_production);

        let mut active: production_entry::ActiveModel = current.entry.into();
        active.actual_production = Set(actual);
        active.theoretical_production = Set(theoretical);
        active.percentage = Set(compute_percentage(actual, theoretical));
        if let Some(remarks) = input.remarks {
            active.remarks = Set(Some(remarks));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.publish(&updated, machine_number, true);
        Ok(ProductionEntryView {
            entry: updated,
            machine_number,
            machine_name,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = ProductionEntryEntity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("production entry", id));
        }
        info!(id, "Production entry deleted");
        Ok(())
    }
}

/// Events for a stored entry: recorded or corrected, plus a low-efficiency
/// alert when a planned shift ran under `threshold` percent.
fn entry_events(
    entry: &production_entry::Model,
    machine_number: i32,
    threshold: f64,
    corrected: bool,
) -> Vec<Event> {
    let mut events = Vec::with_capacity(2);
    events.push(if corrected {
        Event::ProductionEntryUpdated {
            entry_id: entry.id,
            unit: entry.unit,
            machine_number,
            date: entry.date,
            shift: entry.shift,
            percentage: entry.percentage,
        }
    } else {
        Event::ProductionEntryRecorded {
            entry_id: entry.id,
            unit: entry.unit,
            machine_number,
            date: entry.date,
            shift: entry.shift,
            percentage: entry.percentage,
        }
    });
    if entry.theoretical_production > 0.0 && entry.percentage < threshold {
        events.push(Event::LowEfficiency {
            entry_id: entry.id,
            unit: entry.unit,
            machine_number,
            date: entry.date,
            shift: entry.shift,
            percentage: entry.percentage,
            threshold,
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn row(id: i32, day: u32, machine_no: i32, shift: Shift, actual: f64, theoretical: f64) -> ProductionEntryView {
        ProductionEntryView {
            entry: production_entry::Model {
                id,
                unit: 1,
                machine_id: machine_no * 10,
                date: date(day),
                shift,
                actual_production: actual,
                theoretical_production: theoretical,
                percentage: compute_percentage(actual, theoretical),
                remarks: None,
                created_by: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            machine_number: machine_no,
            machine_name: format!("ASU-{}", machine_no),
        }
    }

    #[rstest]
    #[case(85.0, 100.0, 85.0)]
    #[case(1.0, 3.0, 33.33)]
    #[case(2.0, 3.0, 66.67)]
    #[case(120.0, 100.0, 120.0)]
    #[case(50.0, 0.0, 0.0)]
    #[case(0.0, 0.0, 0.0)]
    fn percentage_cases(#[case] actual: f64, #[case] theoretical: f64, #[case] expected: f64) {
        assert_eq!(compute_percentage(actual, theoretical), expected);
    }

    #[test]
    fn daily_grouping_pairs_shifts_and_orders_rows() {
        let rows = vec![
            row(1, 1, 2, Shift::Day, 80.0, 100.0),
            row(2, 2, 5, Shift::Night, 45.0, 50.0),
            row(3, 1, 2, Shift::Night, 70.0, 100.0),
            row(4, 2, 1, Shift::Day, 90.0, 100.0),
        ];

        let grouped = group_daily(rows);
        let keys: Vec<_> = grouped.iter().map(|g| (g.date, g.machine_number)).collect();
        assert_eq!(keys, vec![(date(2), 1), (date(2), 5), (date(1), 2)]);

        let both = &grouped[2];
        assert_eq!(both.day_shift.as_ref().map(|s| s.id), Some(1));
        assert_eq!(both.night_shift.as_ref().map(|s| s.id), Some(3));
        assert_eq!(both.total_actual, 150.0);
        assert_eq!(both.total_theoretical, 200.0);
        assert_eq!(both.percentage, 75.0);

        let night_only = &grouped[1];
        assert!(night_only.day_shift.is_none());
        assert_eq!(night_only.percentage, 90.0);
    }

    #[test]
    fn combined_percentage_is_not_an_average() {
        // 50% of 10 and 100% of 90 is 95% overall, not 75%
        let grouped = group_daily(vec![
            row(1, 3, 7, Shift::Day, 5.0, 10.0),
            row(2, 3, 7, Shift::Night, 90.0, 90.0),
        ]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].percentage, 95.0);
    }

    #[test]
    fn summary_totals_by_date_and_machine() {
        let rows = vec![
            row(1, 2, 3, Shift::Day, 40.0, 50.0),
            row(2, 1, 3, Shift::Day, 50.0, 50.0),
            row(3, 1, 1, Shift::Night, 30.0, 60.0),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.entry_count, 3);
        assert_eq!(summary.machine_count, 2);
        assert_eq!(summary.total_actual, 120.0);
        assert_eq!(summary.total_theoretical, 160.0);
        assert_eq!(summary.percentage, 75.0);
        assert_eq!(summary.by_date.iter().map(|d| d.date).collect::<Vec<_>>(), vec![date(1), date(2)]);
        assert_eq!(summary.by_date[0].percentage, 72.73);
        assert_eq!(
            summary.by_machine.iter().map(|m| m.machine_number).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(summary.by_machine[1].percentage, 90.0);
    }

    #[test]
    fn corrections_raise_an_update_event_not_a_new_record() {
        let entry = row(9, 4, 2, Shift::Day, 40.0, 100.0).entry;

        let recorded = entry_events(&entry, 2, 60.0, false);
        assert_eq!(
            recorded.iter().map(Event::name).collect::<Vec<_>>(),
            vec!["production_entry_recorded", "low_efficiency"]
        );

        let corrected = entry_events(&entry, 2, 30.0, true);
        assert_eq!(
            corrected.iter().map(Event::name).collect::<Vec<_>>(),
            vec!["production_entry_updated"]
        );
    }

    #[test]
    fn unplanned_shifts_never_alert() {
        let entry = row(10, 4, 2, Shift::Night, 0.0, 0.0).entry;
        assert_eq!(entry_events(&entry, 2, 60.0, false).len(), 1);
    }

    #[test]
    fn empty_summary_is_zeroed() {
        let summary = summarize(&[]);
        assert_eq!(summary.entry_count, 0);
        assert_eq!(summary.percentage, 0.0);
        assert!(summary.by_date.is_empty());
    }

    #[test]
    fn create_requires_a_shift_and_non_negative_numbers() {
        let mut input = CreateProductionEntry {
            unit: 1,
            machine_number: 4,
            date: date(1),
            day_shift: None,
            night_shift: None,
        };
        assert!(matches!(input.check(), Err(ServiceError::ValidationError(_))));

        input.day_shift = Some(ShiftInput {
            actual_production: -1.0,
            theoretical_production: None,
            remarks: None,
        });
        assert!(matches!(input.check(), Err(ServiceError::ValidationError(_))));

        input.day_shift = Some(ShiftInput {
            actual_production: 10.0,
            theoretical_production: Some(12.0),
            remarks: None,
        });
        assert!(input.check().is_ok());

        input.unit = 3;
        assert!(input.check().is_err());
    }

    proptest! {
        #[test]
        fn percentage_matches_rounded_ratio(actual in 0.0f64..10_000.0, theoretical in 0.001f64..10_000.0) {
            let p = compute_percentage(actual, theoretical);
            prop_assert!(p >= 0.0);
            prop_assert!((p - actual / theoretical * 100.0).abs() <= 0.005 + 1e-9);
            prop_assert_eq!(round_to(p, 2), p);
        }

        #[test]
        fn grouping_never_loses_entries(shifts in proptest::collection::vec((1u32..5, 1i32..4, any::<bool>(), 0.0f64..200.0), 0..30)) {
            let mut seen = BTreeSet::new();
            let rows: Vec<_> = shifts
                .into_iter()
                .enumerate()
                .filter(|(_, (d, m, night, _))| seen.insert((*d, *m, *night)))
                .map(|(i, (d, m, night, actual))| {
                    let shift = if night { Shift::Night } else { Shift::Day };
                    row(i as i32, d, m, shift, actual, 100.0)
                })
                .collect();
            let count = rows.len();
            let grouped = group_daily(rows);
            let regrouped: usize = grouped
                .iter()
                .map(|g| g.day_shift.is_some() as usize + g.night_shift.is_some() as usize)
                .sum();
            prop_assert_eq!(regrouped, count);
        }
    }
}
