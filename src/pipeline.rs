//! One linear run: load, clean, aggregate, present.

use std::path::Path;

use tracing::{info, info_span, warn};

use crate::config::{Analysis, AnalysisConfig};
use crate::presenter::{
    AggregateView, ChartKind, ChartSink, ChartSpec,
    chart::{AxisConfig, present},
    summarize,
};
use crate::processor::{
    AggregateOp, FilterPredicate, ParseSummary, ProcessorError,
    aggregator::{GroupedResult, Reduction, correlation, filter_groups, group_reduce, top_n},
    cleaner::clean,
    loader::load_csv,
    table::Table,
};

const COUNT: &str = "count";

/// What a run produced
#[derive(Debug, Default)]
pub struct RunReport {
    pub rows_loaded: usize,
    pub rows_cleaned: usize,
    pub parse: ParseSummary,
    /// Console sections as `(heading, body)`
    pub sections: Vec<(String, String)>,
    pub charts: Vec<ChartSpec>,
    pub correlations: Vec<(String, String, f64)>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnalysisConfig,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Runs every configured analysis over `source`
    ///
    /// Charts are handed to `sink` only after all analyses have succeeded, so
    /// a failed run leaves no partial output.
    pub fn run(&self, source: &Path, sink: &mut dyn ChartSink) -> Result<RunReport, ProcessorError> {
        let _span = info_span!("run", config = %self.config.name).entered();

        let loaded = load_csv(source, &self.config.referenced_columns())?;
        let mut report = RunReport {
            rows_loaded: loaded.table.row_count(),
            parse: loaded.summary,
            ..RunReport::default()
        };
        report
            .sections
            .push(("Initial Data Info".into(), loaded.table.info()));

        let table = clean(loaded.table, &self.config);
        report.rows_cleaned = table.row_count();
        if table.is_empty() {
            warn!("no records survived cleaning");
        }

        let roles = &self.config.columns;
        let preview = table.head(
            self.config.preview_rows,
            &[roles.title.as_str(), roles.measure.as_str(), roles.year.as_str()],
        )?;
        report
            .sections
            .push(("Data Cleaning Complete".into(), preview));

        for analysis in &self.config.analyses {
            self.run_analysis(&table, analysis, &mut report)?;
        }

        for chart in &report.charts {
            sink.render(chart)?;
        }
        info!(
            charts = report.charts.len(),
            rows = report.rows_cleaned,
            "run complete"
        );
        Ok(report)
    }

    fn run_analysis(
        &self,
        table: &Table,
        analysis: &Analysis,
        report: &mut RunReport,
    ) -> Result<(), ProcessorError> {
        match analysis {
            Analysis::TopN {
                sort_by,
                label,
                n,
                ascending,
                axis,
            } => {
                let top = top_n(table, sort_by, *n, *ascending)?;
                let view = AggregateView::Ranked {
                    table: &top,
                    label,
                    value: sort_by,
                };
                self.emit(analysis, &view, ChartKind::HorizontalBar, axis, report)
            }

            Analysis::GroupRanking {
                group_by,
                value,
                op,
                min_count,
                limit,
                axis,
            } => {
                let reduction = Reduction::new(value, *op);
                let measure = reduction.name();
                let grouped = group_reduce(
                    table,
                    group_by,
                    &[reduction, Reduction::new(value, AggregateOp::Count).alias(COUNT)],
                )?;
                let mut ranked = at_least(grouped, *min_count)?.sort_by_measure(&measure, false)?;
                if let Some(limit) = limit {
                    ranked = ranked.head(*limit);
                }
                let view = AggregateView::Grouped {
                    result: &ranked,
                    x: None,
                    y: &measure,
                    size: None,
                };
                self.emit(analysis, &view, ChartKind::VerticalBar, axis, report)
            }

            Analysis::GroupScatter {
                group_by,
                x,
                x_op,
                y,
                y_op,
                count_of,
                min_count,
                axis,
            } => {
                let rx = Reduction::new(x, *x_op);
                let ry = Reduction::new(y, *y_op);
                let (x_name, y_name) = (rx.name(), ry.name());
                let grouped = group_reduce(
                    table,
                    group_by,
                    &[ry, rx, Reduction::new(count_of, AggregateOp::Count).alias(COUNT)],
                )?;
                let grouped = at_least(grouped, *min_count)?;
                let view = AggregateView::Grouped {
                    result: &grouped,
                    x: Some(x_name.as_str()),
                    y: &y_name,
                    size: Some(COUNT),
                };
                self.emit(analysis, &view, ChartKind::Scatter, axis, report)
            }

            Analysis::YearlyTrend { value, op, axis } => {
                let reduction = Reduction::new(value, *op);
                let measure = reduction.name();
                let trend = group_reduce(table, &self.config.columns.year, &[reduction])?
                    .sort_by_key(true);
                let view = AggregateView::Grouped {
                    result: &trend,
                    x: None,
                    y: &measure,
                    size: None,
                };
                self.emit(analysis, &view, ChartKind::Line, axis, report)
            }

            Analysis::Correlation { a, b } => {
                let r = correlation(table, a, b)?;
                let label = format!("Correlation between {} and {}", a, b);
                if r.is_nan() {
                    warn!(a = %a, b = %b, "correlation undefined");
                }
                let text = summarize(&AggregateView::Scalar { label: &label, value: r })?;
                report.sections.push((label, text));
                report.correlations.push((a.clone(), b.clone(), r));
                Ok(())
            }
        }
    }

    fn emit(
        &self,
        analysis: &Analysis,
        view: &AggregateView<'_>,
        kind: ChartKind,
        axis: &AxisConfig,
        report: &mut RunReport,
    ) -> Result<(), ProcessorError> {
        report
            .sections
            .push((axis.title.clone(), summarize(view)?));

        let mut spec = present(view, kind, axis)?;
        if let Some(stem) = analysis.file_stem() {
            spec = spec.with_output(stem);
        }
        report.charts.push(spec);
        Ok(())
    }
}

/// Drops groups whose record count is below `min_count`.
fn at_least(grouped: GroupedResult, min_count: Option<usize>) -> Result<GroupedResult, ProcessorError> {
    match min_count {
        Some(min) => filter_groups(grouped, COUNT, &FilterPredicate::AtLeast(min as f64)),
        None => Ok(grouped),
    }
}
