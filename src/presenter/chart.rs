use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::presenter::AggregateView;
use crate::processor::ProcessorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    HorizontalBar,
    VerticalBar,
    Scatter,
    Line,
}

fn unit() -> f64 {
    1.0
}

/// Labels and presentation-only transforms for one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub title: String,
    #[serde(default)]
    pub x_label: String,
    #[serde(default)]
    pub y_label: String,
    /// Value-axis divisor, e.g. `1e6` to plot millions
    #[serde(default = "unit")]
    pub scale: f64,
    /// Draw the first category at the top of a bar chart
    #[serde(default)]
    pub invert_categories: bool,
    /// Multiplier from the size field to marker size
    #[serde(default = "unit")]
    pub size_factor: f64,
    /// One colour for the whole series, or one per category
    #[serde(default)]
    pub colors: Vec<String>,
}

impl AxisConfig {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: String::new(),
            y_label: String::new(),
            scale: 1.0,
            invert_categories: false,
            size_factor: 1.0,
            colors: Vec::new(),
        }
    }

    pub fn labels(mut self, x: &str, y: &str) -> Self {
        self.x_label = x.to_string();
        self.y_label = y.to_string();
        self
    }

    pub fn scale(mut self, divisor: f64) -> Self {
        self.scale = divisor;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert_categories = true;
        self
    }

    pub fn size_factor(mut self, factor: f64) -> Self {
        self.size_factor = factor;
        self
    }

    pub fn colors(mut self, colors: &[&str]) -> Self {
        self.colors = colors.iter().map(|c| c.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSeries {
    Categories {
        labels: Vec<String>,
        values: Vec<f64>,
        colors: Vec<String>,
    },
    Points {
        points: Vec<ChartPoint>,
        colors: Vec<String>,
    },
}

/// Renderer-agnostic description of a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub invert_categories: bool,
    pub series: ChartSeries,
    /// Output file stem; the sink decides directory and extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl ChartSpec {
    pub fn len(&self) -> usize {
        match &self.series {
            ChartSeries::Categories { values, .. } => values.len(),
            ChartSeries::Points { points, .. } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn with_output(mut self, stem: &str) -> Self {
        self.output = Some(stem.to_string());
        self
    }
}

/// Maps an aggregate result onto a chart of the given kind
///
/// Values on the value axis are divided by `axis.scale`. Rows with a
/// non-finite value are left out; an empty result yields an empty series.
pub fn present(
    view: &AggregateView<'_>,
    kind: ChartKind,
    axis: &AxisConfig,
) -> Result<ChartSpec, ProcessorError> {
    let series = match kind {
        ChartKind::HorizontalBar | ChartKind::VerticalBar => categories(view, axis)?,
        ChartKind::Scatter => points(view, axis, false)?,
        ChartKind::Line => points(view, axis, true)?,
    };

    let spec = ChartSpec {
        kind,
        title: axis.title.clone(),
        x_label: axis.x_label.clone(),
        y_label: axis.y_label.clone(),
        invert_categories: axis.invert_categories,
        series,
        output: None,
    };
    debug!(kind = ?kind, title = %spec.title, len = spec.len(), "chart spec ready");
    Ok(spec)
}

fn categories(view: &AggregateView<'_>, axis: &AxisConfig) -> Result<ChartSeries, ProcessorError> {
    let pairs: Vec<(String, f64)> = match view {
        AggregateView::Ranked {
            table,
            label,
            value,
        } => {
            let labels = table.get_col(label)?;
            let values = table.get_col(value)?;
            (0..table.row_count())
                .filter_map(|i| Some((labels.value(i).to_string(), values.get_f64(i)?)))
                .collect()
        }
        AggregateView::Grouped { result, y, .. } => {
            let idx = result.measure_index(y)?;
            result
                .groups
                .iter()
                .map(|g| (g.key.to_string(), g.values[idx].as_f64()))
                .collect()
        }
        AggregateView::Scalar { label, .. } => {
            return Err(ProcessorError::Unchartable(label.to_string()));
        }
    };

    let (labels, values): (Vec<String>, Vec<f64>) = pairs
        .into_iter()
        .map(|(l, v)| (l, v / axis.scale))
        .filter(|(_, v)| v.is_finite())
        .unzip();

    let colors = match axis.colors.len() {
        0 | 1 => axis.colors.clone(),
        n => (0..labels.len()).map(|i| axis.colors[i % n].clone()).collect(),
    };

    Ok(ChartSeries::Categories {
        labels,
        values,
        colors,
    })
}

fn points(
    view: &AggregateView<'_>,
    axis: &AxisConfig,
    ordered: bool,
) -> Result<ChartSeries, ProcessorError> {
    let mut points: Vec<ChartPoint> = match view {
        AggregateView::Ranked {
            table,
            label,
            value,
        } => {
            let xs = table.get_col(label)?;
            let ys = table.get_col(value)?;
            (0..table.row_count())
                .filter_map(|i| {
                    Some(ChartPoint {
                        x: xs.get_f64(i)?,
                        y: ys.get_f64(i)? / axis.scale,
                        size: None,
                        label: None,
                    })
                })
                .collect()
        }
        AggregateView::Grouped { result, x, y, size } => {
            let x_idx = x.map(|m| result.measure_index(m)).transpose()?;
            let y_idx = result.measure_index(y)?;
            let size_idx = size.map(|m| result.measure_index(m)).transpose()?;

            result
                .groups
                .iter()
                .filter_map(|g| {
                    let x = match x_idx {
                        Some(i) => g.values[i].as_f64(),
                        None => g.key.as_f64()?,
                    };
                    Some(ChartPoint {
                        x,
                        y: g.values[y_idx].as_f64() / axis.scale,
                        size: size_idx.map(|i| g.values[i].as_f64() * axis.size_factor),
                        label: Some(g.key.to_string()),
                    })
                })
                .collect()
        }
        AggregateView::Scalar { label, .. } => {
            return Err(ProcessorError::Unchartable(label.to_string()));
        }
    };

    points.retain(|p| p.x.is_finite() && p.y.is_finite());
    if ordered {
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    Ok(ChartSeries::Points {
        points,
        colors: axis.colors.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{
        AggregateResult, Value,
        aggregator::{Group, GroupedResult},
        column::Column,
        table::Table,
    };

    fn grouped() -> GroupedResult {
        GroupedResult {
            key_column: "year".into(),
            measures: vec!["gross_mean".into(), "count".into()],
            groups: vec![
                Group {
                    key: Value::Int(2001),
                    values: vec![AggregateResult::Float(2e6), AggregateResult::Int(1)],
                },
                Group {
                    key: Value::Int(2000),
                    values: vec![AggregateResult::Float(75e4), AggregateResult::Int(2)],
                },
                Group {
                    key: Value::Null,
                    values: vec![AggregateResult::Float(f64::NAN), AggregateResult::Int(0)],
                },
            ],
        }
    }

    #[test]
    fn test_line_is_ordered_and_scaled() {
        let g = grouped();
        let view = AggregateView::Grouped {
            result: &g,
            x: None,
            y: "gross_mean",
            size: None,
        };
        let spec = present(&view, ChartKind::Line, &AxisConfig::new("trend").scale(1e6)).unwrap();
        match spec.series {
            ChartSeries::Points { points, .. } => {
                let xy: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
                assert_eq!(xy, vec![(2000.0, 0.75), (2001.0, 2.0)]);
            }
            other => panic!("unexpected series {:?}", other),
        }
    }

    #[test]
    fn test_vertical_bar_palette_per_category() {
        let g = grouped();
        let view = AggregateView::Grouped {
            result: &g,
            x: None,
            y: "count",
            size: None,
        };
        let axis = AxisConfig::new("counts").colors(&["red", "blue"]);
        let spec = present(&view, ChartKind::VerticalBar, &axis).unwrap();
        assert_eq!(
            spec.series,
            ChartSeries::Categories {
                labels: vec!["2001".into(), "2000".into(), "(null)".into()],
                values: vec![1.0, 2.0, 0.0],
                colors: vec!["red".into(), "blue".into(), "red".into()],
            }
        );
    }

    #[test]
    fn test_scatter_sizes() {
        let g = grouped();
        let view = AggregateView::Grouped {
            result: &g,
            x: Some("count"),
            y: "gross_mean",
            size: Some("count"),
        };
        let axis = AxisConfig::new("s").scale(1e6).size_factor(50.0);
        let spec = present(&view, ChartKind::Scatter, &axis).unwrap();
        let ChartSeries::Points { points, .. } = spec.series else {
            panic!("expected points");
        };
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].size, Some(100.0));
        assert_eq!(points[1].label.as_deref(), Some("2000"));
    }

    #[test]
    fn test_ranked_horizontal_bar() {
        let t = Table::new(
            vec!["title".into(), "gross".into()],
            vec![
                Column::Str(vec![Some("A".into()), Some("B".into())]),
                Column::Float64(vec![Some(3e6), Some(1e6)]),
            ],
        )
        .unwrap();
        let view = AggregateView::Ranked {
            table: &t,
            label: "title",
            value: "gross",
        };
        let axis = AxisConfig::new("top").scale(1e6).inverted();
        let spec = present(&view, ChartKind::HorizontalBar, &axis)
            .unwrap()
            .with_output("top_ranked");
        assert!(spec.invert_categories);
        assert_eq!(spec.output.as_deref(), Some("top_ranked"));
        let ChartSeries::Categories { labels, values, .. } = spec.series else {
            panic!("expected categories");
        };
        assert_eq!(labels, vec!["A", "B"]);
        assert_eq!(values, vec![3.0, 1.0]);
    }

    #[test]
    fn test_empty_and_scalar() {
        let t = Table::new(vec!["title".into()], vec![Column::Str(vec![])]).unwrap();
        let view = AggregateView::Ranked {
            table: &t,
            label: "title",
            value: "title",
        };
        assert!(present(&view, ChartKind::VerticalBar, &AxisConfig::new("e")).unwrap().is_empty());

        let scalar = AggregateView::Scalar {
            label: "corr",
            value: 0.5,
        };
        assert!(matches!(
            present(&scalar, ChartKind::Line, &AxisConfig::new("x")),
            Err(ProcessorError::Unchartable(_))
        ));
    }

    #[test]
    fn test_missing_measure() {
        let g = grouped();
        let view = AggregateView::Grouped {
            result: &g,
            x: None,
            y: "nope",
            size: None,
        };
        assert!(matches!(
            present(&view, ChartKind::Line, &AxisConfig::new("x")),
            Err(ProcessorError::MissingMeasure(_))
        ));
    }
}
