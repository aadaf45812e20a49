use std::fs;
use std::io::Write;

use movie_insights::presenter::{ChartKind, ChartSeries};
use movie_insights::processor::{
    aggregator::{correlation, top_n},
    cleaner::clean,
    column::Column,
    loader::load_csv,
    table::Table,
};
use movie_insights::{AnalysisConfig, ChartSpec, JsonFileSink, MemorySink, Pipeline, ProcessorError, Value};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tempfile::NamedTempFile;

const TOP_MOVIES: &str = "\
Series_Title,Released_Year,Director,Gross,IMDB_Rating,No_of_Votes
The Dark Knight,2008,Christopher Nolan,\"534,858,444\",9.0,2303232
Inception,2010,Christopher Nolan,\"292,576,195\",8.8,2067042
\"Spirited Away\",2001,Hayao Miyazaki,\"10,055,859\",8.6,665758
Apollo 13,PG,Ron Howard,\"173,837,933\",7.6,269197
Seven Samurai,1954,Akira Kurosawa,,8.6,315744
\"Lock, Stock and Two Smoking Barrels\",1998,Guy Ritchie,\"3,897,569\",8.2,535216
";

const RATINGS: &str = "\
title,year,genre,rating,votes
A,1994,Drama,9.3,2000000
B,1972,Crime,9.2,1500000
C,1994,Crime,8.9,0
D,2008,Drama,,100
E,2008,Action,9.0,2300000
";

fn write_csv(csv: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{}", csv).unwrap();
    tmp
}

fn categories(spec: &ChartSpec) -> (&[String], &[f64]) {
    match &spec.series {
        ChartSeries::Categories { labels, values, .. } => (labels.as_slice(), values.as_slice()),
        other => panic!("expected categories, got {:?}", other),
    }
}

#[test]
fn test_top_movies_writes_chart_files() {
    let tmp = write_csv(TOP_MOVIES);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("outputs");
    let mut sink = JsonFileSink::new(&out);

    let report = Pipeline::new(AnalysisConfig::top_movies())
        .run(tmp.path(), &mut sink)
        .unwrap();

    assert_eq!(report.rows_loaded, 6);
    assert_eq!(report.rows_cleaned, 4);
    assert!(report.parse.errors.is_empty());
    assert_eq!(sink.written().len(), 4);
    for stem in ["top_ranked", "group_scatter", "yearly_trend", "group_ranking"] {
        assert!(out.join(format!("{}.json", stem)).exists(), "{}", stem);
    }

    let top: ChartSpec =
        serde_json::from_slice(&fs::read(out.join("top_ranked.json")).unwrap()).unwrap();
    assert_eq!(top.kind, ChartKind::HorizontalBar);
    assert!(top.invert_categories);
    let (labels, values) = categories(&top);
    assert_eq!(
        labels,
        &[
            "The Dark Knight",
            "Inception",
            "Spirited Away",
            "Lock, Stock and Two Smoking Barrels"
        ]
    );
    assert!((values[0] - 534.858444).abs() < 1e-9);
}

#[test]
fn test_top_movies_console_sections() {
    let tmp = write_csv(TOP_MOVIES);
    let report = Pipeline::new(AnalysisConfig::top_movies())
        .run(tmp.path(), &mut MemorySink::default())
        .unwrap();

    let headings: Vec<&str> = report.sections.iter().map(|(h, _)| h.as_str()).collect();
    assert_eq!(headings[0], "Initial Data Info");
    assert_eq!(headings[1], "Data Cleaning Complete");
    assert!(headings.contains(&"Top 5 Directors by Total Gross Revenue"));
    assert!(
        headings
            .iter()
            .any(|h| h.starts_with("Correlation between No_of_Votes"))
    );
    assert!(report.sections[0].1.starts_with("6 rows x 6 columns"));
}

#[test]
fn test_ratings_dashboard() {
    let tmp = write_csv(RATINGS);
    let mut sink = MemorySink::default();
    let report = Pipeline::new(AnalysisConfig::ratings_dashboard())
        .run(tmp.path(), &mut sink)
        .unwrap();

    // the record with no rating is dropped, zero votes are kept
    assert_eq!(report.rows_cleaned, 4);
    assert_eq!(sink.charts.len(), 3);

    let (labels, _) = categories(&sink.charts[0]);
    assert_eq!(labels, &["A", "B", "E", "C"]);

    let (labels, values) = categories(&sink.charts[1]);
    assert_eq!(labels, &["Drama", "Crime", "Action"]);
    assert!((values[1] - 9.05).abs() < 1e-9);

    match &sink.charts[2].series {
        ChartSeries::Points { points, .. } => {
            let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
            assert_eq!(xs, vec![1972.0, 1994.0, 2008.0]);
            assert!((points[1].y - 9.1).abs() < 1e-9);
        }
        other => panic!("expected points, got {:?}", other),
    }

    let r = report.correlations[0].2;
    assert!(r.is_finite() && (-1.0..=1.0).contains(&r));
}

#[test]
fn test_toml_config_run() {
    let toml = r#"
name = "cheapest"
required = ["Gross"]
formatted_numeric = ["Gross"]
year = ["Released_Year"]

[columns]
title = "Series_Title"
year = "Released_Year"
group = "Director"
measure = "Gross"

[[analyses]]
kind = "top_n"
sort_by = "Gross"
label = "Series_Title"
n = 2
ascending = true

[analyses.axis]
title = "Lowest grossing"
x_label = "Gross"
y_label = ""
"#;
    let config = AnalysisConfig::from_toml_str(toml).unwrap();
    let tmp = write_csv(TOP_MOVIES);
    let mut sink = MemorySink::default();
    let report = Pipeline::new(config).run(tmp.path(), &mut sink).unwrap();

    // only Gross is required, so the PG-rated year survives
    assert_eq!(report.rows_cleaned, 5);
    let (labels, _) = categories(&sink.charts[0]);
    assert_eq!(
        labels,
        &["Lock, Stock and Two Smoking Barrels", "Spirited Away"]
    );
}

#[test]
fn test_missing_source_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::new(AnalysisConfig::top_movies())
        .run(&dir.path().join("absent.csv"), &mut MemorySink::default())
        .unwrap_err();
    assert!(matches!(err, ProcessorError::SourceNotFound(_)));
    assert!(err.is_fatal_input());
}

#[test]
fn test_top_n_ties_keep_source_order() {
    let csv = "\
Series_Title,Released_Year,Director,Gross,IMDB_Rating,No_of_Votes
first,2000,X,\"100\",8.0,1
second,2000,X,\"300\",8.0,1
third,2000,X,\"100\",8.0,1
fourth,2000,X,\"300\",8.0,1
";
    let tmp = write_csv(csv);
    let config = AnalysisConfig::top_movies();
    let loaded = load_csv(tmp.path(), &config.referenced_columns()).unwrap();
    let table = clean(loaded.table, &config);

    let top = top_n(&table, "Gross", 4, false).unwrap();
    let titles: Vec<Value> = (0..top.row_count())
        .map(|i| top.value(i, "Series_Title").unwrap())
        .collect();
    assert_eq!(
        titles,
        ["second", "fourth", "first", "third"]
            .map(|s| Value::Str(s.into()))
            .to_vec()
    );
}

#[test]
fn test_top_n_nulls_last() {
    let table = Table::new(
        vec!["title".into(), "gross".into()],
        vec![
            Column::Str(vec![Some("a".into()), Some("b".into()), Some("c".into())]),
            Column::Float64(vec![None, Some(1.0), Some(2.0)]),
        ],
    )
    .unwrap();

    for ascending in [false, true] {
        let top = top_n(&table, "gross", 3, ascending).unwrap();
        assert_eq!(top.value(2, "title").unwrap(), Value::Str("a".into()));
    }
}

#[test]
fn test_correlation_of_independent_columns_near_zero() {
    let mut rng = StdRng::seed_from_u64(7);
    let n = 20_000;
    let a: Vec<Option<f64>> = (0..n).map(|_| Some(rng.random::<f64>())).collect();
    let b: Vec<Option<f64>> = (0..n).map(|_| Some(rng.random::<f64>())).collect();
    let table = Table::new(
        vec!["a".into(), "b".into()],
        vec![Column::Float64(a), Column::Float64(b)],
    )
    .unwrap();

    let r = correlation(&table, "a", "b").unwrap();
    assert!(r.abs() < 0.05, "r = {}", r);
    assert!((correlation(&table, "a", "a").unwrap() - 1.0).abs() < 1e-12);
}
