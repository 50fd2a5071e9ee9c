use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use rollup_engine::{
    execute, Aggregation, ComparisonKind, ConfigError, FieldValue, FilterCondition, Granularity,
    RangeOperator, Record, RollupError, RowKind, StatisticConfig, StatisticOutput, ValueType,
};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 12, 31)
        .unwrap()
        .and_hms_opt(23, 0, 0)
        .unwrap()
}

fn records(rows: &[(&str, f64)]) -> Vec<Record> {
    rows.iter()
        .map(|(date, amt)| Record::new().with("date", *date).with("amt", *amt))
        .collect()
}

fn periods(out: &StatisticOutput) -> Vec<String> {
    out.data
        .iter()
        .map(|r| r.text("period").unwrap_or_default().to_string())
        .collect()
}

#[test]
fn monthly_sum_with_sequential_delta() {
    let data = records(&[("2024-01-05", 10.0), ("2024-02-10", 20.0)]);
    let config = StatisticConfig::vertical("date", Granularity::Month)
        .with_statistic("amt", "Amount")
        .with_value_types([ValueType::Absolute, ValueType::SequentialDelta]);

    let out = execute(&data, &config, now()).unwrap();

    assert_eq!(periods(&out), ["2024-01", "2024-02", "SUMMARY"]);
    let jan = &out.data[0];
    assert_eq!(jan.number("amt"), Some(10.0));
    assert_eq!(jan.get("amt_delta"), Some(&FieldValue::Blank));
    assert_eq!(jan.get("amt_ratio"), Some(&FieldValue::Blank));
    let feb = &out.data[1];
    assert_eq!(feb.number("amt"), Some(20.0));
    assert_eq!(feb.number("amt_ratio"), Some(1.0));
    assert_eq!(feb.number("amt_delta"), Some(10.0));
    let summary = &out.data[2];
    assert_eq!(summary.kind, RowKind::Summary);
    assert_eq!(summary.number("amt"), Some(30.0));
    assert_eq!(summary.text("periodName"), Some("汇总"));

    let range = out.data_range.unwrap();
    assert_eq!((range.from.as_str(), range.to.as_str()), ("2024-01", "2024-02"));
    assert_eq!(range.period_count, 2);
    assert_eq!(range.incomplete_count, 0);
}

#[test]
fn top_n_folds_the_rest_into_others() {
    let data: Vec<Record> = [("East", 50.0), ("West", 30.0), ("North", 20.0)]
        .into_iter()
        .map(|(region, sales)| Record::new().with("region", region).with("sales", sales))
        .collect();
    let config = StatisticConfig::horizontal(["region"])
        .with_statistic("sales", "Sales")
        .with_top_n(2);

    let out = execute(&data, &config, now()).unwrap();

    let kinds: Vec<RowKind> = out.data.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        [RowKind::Data, RowKind::Data, RowKind::Others, RowKind::GrandTotal]
    );
    assert_eq!(out.data[0].text("region"), Some("East"));
    assert_eq!(out.data[1].text("region"), Some("West"));
    assert_eq!(out.data[2].number("sales"), Some(20.0));
    assert_eq!(out.data[2].number("recordCount"), Some(1.0));
    assert_eq!(out.data[3].number("sales"), Some(100.0));
    assert!(out.data_range.is_none());
}

#[test]
fn cross_tab_two_products_by_two_months() {
    let data: Vec<Record> = [
        ("Apple", "Jan", 3.0),
        ("Apple", "Feb", 4.0),
        ("Pear", "Jan", 5.0),
        ("Pear", "Feb", 6.0),
        ("Pear", "Feb", 1.0),
    ]
    .into_iter()
    .map(|(product, month, qty)| {
        Record::new()
            .with("product", product)
            .with("month", month)
            .with("qty", qty)
    })
    .collect();
    let config = StatisticConfig::horizontal(["product", "month"])
        .with_statistic("qty", "Quantity")
        .with_cross_table("month");

    let out = execute(&data, &config, now()).unwrap();

    assert_eq!(out.data.len(), 3);
    assert_eq!(out.pivot_columns, ["Feb", "Jan"]);
    let pear = &out.data[1];
    assert_eq!(pear.text("product"), Some("Pear"));
    assert_eq!(pear.number("qty[Jan]"), Some(5.0));
    assert_eq!(pear.number("qty[Feb]"), Some(7.0));
    assert_eq!(pear.number("qty_total"), Some(12.0));
    let total = &out.data[2];
    assert_eq!(total.kind, RowKind::GrandTotal);
    assert_eq!(total.number("qty[Jan]"), Some(8.0));
    assert_eq!(total.number("qty[Feb]"), Some(11.0));
    assert_eq!(total.number("qty_total"), Some(19.0));
}

#[test]
fn cross_tab_with_a_single_group_field_falls_back() {
    let data = vec![Record::new().with("month", "Jan").with("qty", 1.0)];
    let config = StatisticConfig::horizontal(["month"])
        .with_statistic("qty", "Quantity")
        .with_cross_table("month");

    let out = execute(&data, &config, now()).unwrap();

    assert!(out.pivot_columns.is_empty());
    assert_eq!(out.data[0].text("month"), Some("Jan"));
    assert_eq!(out.data[1].kind, RowKind::GrandTotal);
}

#[test]
fn decad_bucketing_and_previous_period() {
    let data = records(&[("2024-01-05", 2.0), ("2024-01-15", 3.0)]);
    let config = StatisticConfig::vertical("date", Granularity::Decad)
        .with_statistic("amt", "Amount")
        .with_value_types([ValueType::Absolute, ValueType::SequentialDelta]);

    let out = execute(&data, &config, now()).unwrap();

    assert_eq!(periods(&out), ["2024-01-上旬", "2024-01-中旬", "SUMMARY"]);
    assert_eq!(out.data[1].text("periodName"), Some("2024年1月中旬"));
    assert_eq!(out.data[1].number("amt_delta"), Some(1.0));
    assert_eq!(out.data[1].number("amt_ratio"), Some(0.5));
}

#[test]
fn single_record_has_no_deltas() {
    let data = records(&[("2024-03-09", 7.0)]);
    let config = StatisticConfig::vertical("date", Granularity::Day)
        .with_statistic("amt", "Amount")
        .with_value_types([ValueType::Absolute, ValueType::SequentialDelta])
        .with_compare_types([
            ComparisonKind::WeekOverWeek,
            ComparisonKind::DecadOverDecad,
            ComparisonKind::MonthOverMonth,
            ComparisonKind::QuarterOverQuarter,
            ComparisonKind::YearOverYear,
        ]);

    let out = execute(&data, &config, now()).unwrap();

    assert_eq!(out.data.len(), 2);
    let row = &out.data[0];
    let delta_columns: Vec<&String> = row
        .cells
        .keys()
        .filter(|k| k.ends_with("_delta") || k.ends_with("_ratio"))
        .collect();
    assert_eq!(delta_columns.len(), 12);
    for column in delta_columns {
        assert_eq!(row.get(column), Some(&FieldValue::Blank), "{column}");
    }
}

#[test]
fn rerunning_is_byte_identical() {
    let data = records(&[
        ("2023-11-30", 3.0),
        ("2024-01-05", 10.0),
        ("2024-01-28", 1.5),
        ("2024-02-10", 20.0),
        ("not a date", 99.0),
    ]);
    let config = StatisticConfig::vertical("date", Granularity::Week)
        .with_statistic("amt", "Amount")
        .with_value_types([
            ValueType::Absolute,
            ValueType::Cumulative,
            ValueType::SequentialDelta,
        ])
        .with_compare_types([ComparisonKind::MonthOverMonth, ComparisonKind::YearOverYear]);

    let first = serde_json::to_vec(&execute(&data, &config, now()).unwrap()).unwrap();
    let second = serde_json::to_vec(&execute(&data, &config, now()).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn bucket_sums_add_up_to_the_dataset_sum() {
    let data = records(&[
        ("2022-12-31 23:59:59", 1.25),
        ("2023-01-01", 2.5),
        ("2023-06-15", 4.0),
        ("2023-06-16", -3.0),
        ("2024-02-29", 8.0),
    ]);
    let total: f64 = data.iter().filter_map(|r| r.value("amt").as_number()).sum();

    for granularity in Granularity::ALL {
        let config = StatisticConfig::vertical("date", granularity).with_statistic("amt", "Amount");
        let out = execute(&data, &config, now()).unwrap();
        let bucket_sum: f64 = out.data_rows().filter_map(|r| r.number("amt")).sum();
        assert_eq!(bucket_sum, total, "{granularity:?}");
        assert_eq!(out.data.last().unwrap().number("amt"), Some(total));
    }
}

#[test]
fn empty_input_is_not_an_error() {
    let config = StatisticConfig::vertical("date", Granularity::Month).with_statistic("amt", "A");
    let out = execute(&[], &config, now()).unwrap();
    assert!(out.data.is_empty());
    assert!(out.data_range.is_none());

    let config = StatisticConfig::horizontal(["region"]).with_statistic("amt", "A");
    assert_eq!(execute(&[], &config, now()).unwrap(), StatisticOutput::empty());
}

#[test]
fn filters_apply_before_bucketing() {
    let data = vec![
        Record::new().with("date", "2024-01-02").with("amt", 5.0).with("region", "East"),
        Record::new().with("date", "2024-01-03").with("amt", 50.0).with("region", "West"),
        Record::new().with("date", "2024-02-03").with("amt", 7.0).with("region", "East"),
    ];
    let config = StatisticConfig::vertical("date", Granularity::Month)
        .with_statistic("amt", "Amount")
        .with_filter(FilterCondition::specified("region", ["East"]))
        .with_filter(FilterCondition::range("amt", RangeOperator::Lt, 10.0));

    let out = execute(&data, &config, now()).unwrap();
    let amounts: Vec<Option<f64>> = out.data.iter().map(|r| r.number("amt")).collect();
    assert_eq!(amounts, [Some(5.0), Some(7.0), Some(12.0)]);
}

#[test]
fn count_aggregation_counts_numeric_values() {
    let data = vec![
        Record::new().with("date", "2024-01-02").with("amt", 5.0),
        Record::new().with("date", "2024-01-03").with("amt", "x"),
        Record::new().with("date", "2024-02-03").with("amt", 7.0),
    ];
    let config = StatisticConfig::vertical("date", Granularity::Month)
        .with_statistic("amt", "Amount")
        .with_aggregation(Aggregation::Count);
    let out = execute(&data, &config, now()).unwrap();
    let counts: Vec<Option<f64>> = out.data.iter().map(|r| r.number("amt")).collect();
    assert_eq!(counts, [Some(1.0), Some(1.0), Some(2.0)]);
}

#[test]
fn invalid_config_fails_fast() {
    let mut config = StatisticConfig::vertical("date", Granularity::Month).with_statistic("amt", "A");
    config.time_field_id = None;
    let err = execute(&records(&[("2024-01-01", 1.0)]), &config, now()).unwrap_err();
    assert!(matches!(
        err,
        RollupError::InvalidConfig(ConfigError::MissingTimeField)
    ));
    assert_eq!(
        err.to_string(),
        "invalid statistic config: vertical statistic requires a time field"
    );
}

#[test]
fn config_round_trips_through_json() {
    let config = StatisticConfig::horizontal(["region", "product"])
        .with_statistic("sales", "Sales")
        .with_top_n(3)
        .with_subtotal(true)
        .with_filter(FilterCondition::range("sales", RangeOperator::Ge, 1.0));
    let json = serde_json::to_string(&config).unwrap();
    let back: StatisticConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}
