//! Run configuration: which columns play which role, how they are cleaned,
//! and which analyses are charted.

use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::presenter::chart::AxisConfig;
use crate::processor::{AggregateOp, ProcessorError};

/// Names of the columns the pipeline treats specially
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub title: String,
    pub year: String,
    /// Grouping key, e.g. director or genre
    pub group: String,
    /// Primary measure, e.g. gross revenue or rating
    pub measure: String,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub votes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Analysis {
    /// Top `n` records by `sort_by`, labelled by `label`
    TopN {
        sort_by: String,
        label: String,
        n: usize,
        #[serde(default)]
        ascending: bool,
        axis: AxisConfig,
    },
    /// One reduced value per group, ranked descending
    GroupRanking {
        group_by: String,
        value: String,
        op: AggregateOp,
        #[serde(default)]
        min_count: Option<usize>,
        #[serde(default)]
        limit: Option<usize>,
        axis: AxisConfig,
    },
    /// Per-group x/y reductions with point size from the group's record count
    GroupScatter {
        group_by: String,
        x: String,
        x_op: AggregateOp,
        y: String,
        y_op: AggregateOp,
        /// Column whose non-null count sizes each point
        count_of: String,
        #[serde(default)]
        min_count: Option<usize>,
        axis: AxisConfig,
    },
    /// `op(value)` per year, ordered by year
    YearlyTrend {
        value: String,
        op: AggregateOp,
        axis: AxisConfig,
    },
    /// Pearson correlation between two numeric columns
    Correlation { a: String, b: String },
}

impl Analysis {
    /// Fixed output file stem for the chart this analysis produces
    pub fn file_stem(&self) -> Option<&'static str> {
        match self {
            Analysis::TopN { .. } => Some("top_ranked"),
            Analysis::GroupRanking { .. } => Some("group_ranking"),
            Analysis::GroupScatter { .. } => Some("group_scatter"),
            Analysis::YearlyTrend { .. } => Some("yearly_trend"),
            Analysis::Correlation { .. } => None,
        }
    }

    fn columns(&self) -> Vec<&str> {
        match self {
            Analysis::TopN { sort_by, label, .. } => vec![sort_by.as_str(), label.as_str()],
            Analysis::GroupRanking {
                group_by, value, ..
            } => vec![group_by.as_str(), value.as_str()],
            Analysis::GroupScatter {
                group_by,
                x,
                y,
                count_of,
                ..
            } => vec![group_by.as_str(), x.as_str(), y.as_str(), count_of.as_str()],
            Analysis::YearlyTrend { value, .. } => vec![value.as_str()],
            Analysis::Correlation { a, b } => vec![a.as_str(), b.as_str()],
        }
    }
}

fn default_grouping_chars() -> String {
    ",".to_string()
}

fn default_preview_rows() -> usize {
    5
}

/// Immutable configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub name: String,
    pub columns: ColumnRoles,
    /// Numeric columns stored as text with grouping characters
    #[serde(default)]
    pub formatted_numeric: Vec<String>,
    /// Plain numeric columns, coerced to float
    #[serde(default)]
    pub numeric: Vec<String>,
    /// Columns coerced to integer years
    #[serde(default)]
    pub year: Vec<String>,
    #[serde(default = "default_grouping_chars")]
    pub grouping_chars: String,
    /// Records null in any of these are dropped after coercion
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(default)]
    pub analyses: Vec<Analysis>,
}

impl AnalysisConfig {
    /// IMDb top-movies list: gross revenue by title, director and release year.
    pub fn top_movies() -> Self {
        let roles = ColumnRoles {
            title: "Series_Title".into(),
            year: "Released_Year".into(),
            group: "Director".into(),
            measure: "Gross".into(),
            rating: Some("IMDB_Rating".into()),
            votes: Some("No_of_Votes".into()),
        };

        let analyses = vec![
            Analysis::TopN {
                sort_by: roles.measure.clone(),
                label: roles.title.clone(),
                n: 10,
                ascending: false,
                axis: AxisConfig::new("Top 10 Highest Grossing Movies (IMDb List)")
                    .labels("Gross Revenue (in Million USD)", "")
                    .scale(1e6)
                    .inverted()
                    .colors(&["teal"]),
            },
            Analysis::GroupScatter {
                group_by: roles.group.clone(),
                x: "IMDB_Rating".into(),
                x_op: AggregateOp::Mean,
                y: roles.measure.clone(),
                y_op: AggregateOp::Sum,
                count_of: roles.title.clone(),
                min_count: Some(2),
                axis: AxisConfig::new(
                    "Director's Total Gross vs. Average IMDB Rating (Bubble Size = Movie Count)",
                )
                .labels("Average IMDB Rating", "Total Gross (in Million USD)")
                .scale(1e6)
                .size_factor(50.0)
                .colors(&["darkorange"]),
            },
            Analysis::YearlyTrend {
                value: roles.measure.clone(),
                op: AggregateOp::Mean,
                axis: AxisConfig::new("Average Movie Gross Revenue Trend Over Years")
                    .labels("Release Year", "Average Revenue (in Million USD)")
                    .scale(1e6)
                    .colors(&["blue"]),
            },
            Analysis::GroupRanking {
                group_by: roles.group.clone(),
                value: roles.measure.clone(),
                op: AggregateOp::Sum,
                min_count: None,
                limit: Some(5),
                axis: AxisConfig::new("Top 5 Directors by Total Gross Revenue")
                    .labels("Director", "Total Gross Revenue (in Billions USD)")
                    .scale(1e9)
                    .colors(&["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd"]),
            },
            Analysis::Correlation {
                a: "No_of_Votes".into(),
                b: "IMDB_Rating".into(),
            },
        ];

        AnalysisConfig {
            name: "top_movies".into(),
            formatted_numeric: vec![roles.measure.clone()],
            numeric: vec!["IMDB_Rating".into(), "No_of_Votes".into()],
            year: vec![roles.year.clone()],
            grouping_chars: default_grouping_chars(),
            required: vec![roles.measure.clone(), roles.year.clone()],
            preview_rows: default_preview_rows(),
            columns: roles,
            analyses,
        }
    }

    /// Ratings dashboard: rating per title, genre and year.
    pub fn ratings_dashboard() -> Self {
        let roles = ColumnRoles {
            title: "title".into(),
            year: "year".into(),
            group: "genre".into(),
            measure: "rating".into(),
            rating: Some("rating".into()),
            votes: Some("votes".into()),
        };

        let analyses = vec![
            Analysis::TopN {
                sort_by: "rating".into(),
                label: "title".into(),
                n: 10,
                ascending: false,
                axis: AxisConfig::new("Top 10 Movies by IMDb Rating")
                    .labels("Rating", "Movie")
                    .inverted()
                    .colors(&["skyblue"]),
            },
            Analysis::GroupRanking {
                group_by: "genre".into(),
                value: "rating".into(),
                op: AggregateOp::Mean,
                min_count: None,
                limit: None,
                axis: AxisConfig::new("Average IMDb Rating by Genre")
                    .labels("Genre", "Average Rating")
                    .colors(&["orange"]),
            },
            Analysis::YearlyTrend {
                value: "rating".into(),
                op: AggregateOp::Mean,
                axis: AxisConfig::new("Average IMDb Rating Over Years")
                    .labels("Year", "Average Rating")
                    .colors(&["green"]),
            },
            Analysis::Correlation {
                a: "votes".into(),
                b: "rating".into(),
            },
        ];

        AnalysisConfig {
            name: "ratings_dashboard".into(),
            formatted_numeric: Vec::new(),
            numeric: vec!["rating".into(), "votes".into()],
            year: vec!["year".into()],
            grouping_chars: default_grouping_chars(),
            required: vec![
                "title".into(),
                "year".into(),
                "genre".into(),
                "rating".into(),
                "votes".into(),
            ],
            preview_rows: default_preview_rows(),
            columns: roles,
            analyses,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ProcessorError> {
        let config: AnalysisConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ProcessorError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ProcessorError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ProcessorError> {
        for a in &self.analyses {
            if let Analysis::TopN { n: 0, .. } = a {
                return Err(ProcessorError::Config("top_n requires n > 0".into()));
            }
        }
        Ok(())
    }

    /// Every column the source must provide, in first-mention order.
    pub fn referenced_columns(&self) -> Vec<String> {
        let roles = &self.columns;
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();

        let mut names: Vec<&str> = vec![
            roles.title.as_str(),
            roles.year.as_str(),
            roles.group.as_str(),
            roles.measure.as_str(),
        ];
        names.extend(roles.rating.as_deref());
        names.extend(roles.votes.as_deref());
        names.extend(self.formatted_numeric.iter().map(String::as_str));
        names.extend(self.numeric.iter().map(String::as_str));
        names.extend(self.year.iter().map(String::as_str));
        names.extend(self.required.iter().map(String::as_str));
        for a in &self.analyses {
            names.extend(a.columns());
        }

        for name in names {
            if seen.insert(name) {
                out.push(name.to_string());
            }
        }
        out
    }
}
