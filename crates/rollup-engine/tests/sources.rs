use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use rollup_engine::{
    run, DataSource, FilterCondition, Granularity, Record, RowKind, StatisticConfig,
    ROW_KIND_FIELD,
};
use std::collections::HashMap;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn orders() -> Vec<Record> {
    [
        ("2023-11-02", 5.0),
        ("2023-12-24", 7.0),
        ("2024-01-15", 10.0),
        ("2024-01-20", 2.0),
        ("2024-06-30", 4.0),
    ]
    .into_iter()
    .map(|(date, amt)| Record::new().with("date", date).with("amt", amt))
    .collect()
}

#[test]
fn every_source_kind_is_a_flat_record_sequence() {
    let config = StatisticConfig::vertical("date", Granularity::Year).with_statistic("amt", "Amt");
    let mut store = HashMap::new();
    store.insert(DataSource::Form("orders".into()), orders());
    store.insert(DataSource::VirtualTable("orders_enriched".into()), orders());

    let from_form = run(&store, &DataSource::Form("orders".into()), &config, now()).unwrap();
    let from_virtual = run(
        &store,
        &DataSource::VirtualTable("orders_enriched".into()),
        &config,
        now(),
    )
    .unwrap();
    assert_eq!(from_form, from_virtual);
}

#[test]
fn statistic_output_feeds_another_statistic() {
    let monthly = StatisticConfig::vertical("date", Granularity::Month).with_statistic("amt", "Amt");
    let mut store = HashMap::new();
    store.insert(DataSource::Form("orders".into()), orders());
    let monthly_out = run(&store, &DataSource::Form("orders".into()), &monthly, now()).unwrap();
    assert_eq!(monthly_out.data.len(), 5);

    store.insert(
        DataSource::Statistic("monthly_orders".into()),
        monthly_out.to_records(),
    );
    let yearly = StatisticConfig::vertical("period", Granularity::Year)
        .with_statistic("amt", "Amt")
        .with_filter(FilterCondition::specified(ROW_KIND_FIELD, ["data"]));
    let yearly_out = run(
        &store,
        &DataSource::Statistic("monthly_orders".into()),
        &yearly,
        now(),
    )
    .unwrap();

    let years: Vec<(Option<&str>, Option<f64>)> = yearly_out
        .data
        .iter()
        .map(|r| (r.text("period"), r.number("amt")))
        .collect();
    assert_eq!(
        years,
        [
            (Some("2023"), Some(12.0)),
            (Some("2024"), Some(16.0)),
            (Some("SUMMARY"), Some(28.0)),
        ]
    );
    assert_eq!(yearly_out.data[2].kind, RowKind::Summary);
    assert_eq!(yearly_out.data_range.unwrap().skipped_records, 0);
}

#[test]
fn quarterly_output_rebuckets_into_years() {
    let quarterly =
        StatisticConfig::vertical("date", Granularity::Quarter).with_statistic("amt", "Amt");
    let mut store = HashMap::new();
    store.insert(DataSource::Form("orders".into()), orders());
    let quarterly_out = run(&store, &DataSource::Form("orders".into()), &quarterly, now()).unwrap();
    let quarters: Vec<Option<&str>> = quarterly_out.data_rows().map(|r| r.text("period")).collect();
    assert_eq!(quarters, [Some("2023-Q4"), Some("2024-Q1"), Some("2024-Q2")]);

    store.insert(
        DataSource::Statistic("quarterly_orders".into()),
        quarterly_out.to_records(),
    );
    let yearly = StatisticConfig::vertical("period", Granularity::Year)
        .with_statistic("amt", "Amt")
        .with_filter(FilterCondition::specified(ROW_KIND_FIELD, ["data"]));
    let yearly_out = run(
        &store,
        &DataSource::Statistic("quarterly_orders".into()),
        &yearly,
        now(),
    )
    .unwrap();

    let years: Vec<(Option<&str>, Option<f64>, Option<f64>)> = yearly_out
        .data
        .iter()
        .map(|r| (r.text("period"), r.number("amt"), r.number("recordCount")))
        .collect();
    assert_eq!(
        years,
        [
            (Some("2023"), Some(12.0), Some(1.0)),
            (Some("2024"), Some(16.0), Some(2.0)),
            (Some("SUMMARY"), Some(28.0), Some(3.0)),
        ]
    );
    assert_eq!(yearly_out.data_range.unwrap().skipped_records, 0);
}
