//! Picks a chart for a query result.
//!
//! The question's wording decides the intent (trend, distribution, ranking)
//! and the result's shape decides the rest: the first column is the x axis,
//! the first numeric column is the y axis, and row counts switch bar charts to
//! line charts once there are too many categories to read.

pub mod figure;

use crate::db::result::TabularResult;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
        }
    }
}

/// What to draw. All fields are `None` when no chart applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartDirective {
    pub kind: Option<ChartKind>,
    pub x: Option<String>,
    pub y: Option<String>,
}

impl ChartDirective {
    pub fn none() -> Self {
        Self {
            kind: None,
            x: None,
            y: None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Trend,
    Distribution,
    Ranking,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartRule {
    Always(ChartKind),
    /// Bar up to `max_bar_rows` rows, line beyond.
    BarUpTo(usize),
}

impl ChartRule {
    pub fn apply(&self, row_count: usize) -> ChartKind {
        match *self {
            ChartRule::Always(kind) => kind,
            ChartRule::BarUpTo(max_bar_rows) if row_count <= max_bar_rows => ChartKind::Bar,
            ChartRule::BarUpTo(_) => ChartKind::Line,
        }
    }
}

pub struct IntentRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
    pub rule: ChartRule,
}

/// Checked top to bottom; the first rule with a keyword in the question wins.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::Trend,
        keywords: &["trend", "over time", "monthly", "daily", "yearly", "by month", "by day"],
        rule: ChartRule::Always(ChartKind::Line),
    },
    IntentRule {
        intent: Intent::Distribution,
        keywords: &["distribution", "by", "per", "breakdown", "compare"],
        rule: ChartRule::BarUpTo(10),
    },
    IntentRule {
        intent: Intent::Ranking,
        keywords: &["top", "highest", "most", "best"],
        rule: ChartRule::Always(ChartKind::Bar),
    },
];

pub const DEFAULT_RULE: ChartRule = ChartRule::BarUpTo(20);

/// Finds the intent and rule for a question. Matching is by substring of the
/// lower-cased text, so "bypass" counts as "by".
pub fn classify(query: &str) -> (Intent, ChartRule) {
    let query = query.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|r| r.keywords.iter().any(|k| query.contains(k)))
        .map(|r| (r.intent, r.rule))
        .unwrap_or((Intent::Unspecified, DEFAULT_RULE))
}

/// Chooses a chart for `result`, given the question that produced it.
pub fn select_chart(result: &TabularResult, query: &str) -> ChartDirective {
    if result.is_empty() || result.columns.len() < 2 {
        return ChartDirective::none();
    }

    let Some(y) = result.numeric_columns().into_iter().next() else {
        return ChartDirective::none();
    };

    let (_, rule) = classify(query);
    ChartDirective {
        kind: Some(rule.apply(result.row_count())),
        x: Some(result.columns[0].clone()),
        y: Some(y),
    }
}
