use crate::chart::{ChartDirective, ChartKind, Intent, classify};
use crate::db::result::TabularResult;
use serde_json::{Value, json};

/// Styling applied to every figure.
pub struct ChartTheme {
    pub template: &'static str,
    pub margin: u32,
}

pub const THEME: ChartTheme = ChartTheme {
    template: "plotly_white",
    margin: 40,
};

/// Renders a Plotly figure document (`{data, layout}`) for `directive`.
///
/// Returns `None` for the "none" directive or when the directive names a
/// column the result does not have.
pub fn render(result: &TabularResult, directive: &ChartDirective, query: &str) -> Option<Value> {
    let (Some(kind), Some(x), Some(y)) = (directive.kind, &directive.x, &directive.y) else {
        return None;
    };
    if !result.columns.contains(x) || !result.columns.contains(y) {
        return None;
    }

    let xs: Vec<Value> = result.column_values(x).cloned().collect();
    let ys: Vec<Value> = result.column_values(y).cloned().collect();

    let trace = match kind {
        ChartKind::Bar => json!({ "type": "bar", "x": xs, "y": ys, "name": y }),
        ChartKind::Line => json!({ "type": "scatter", "mode": "lines", "x": xs, "y": ys, "name": y }),
    };

    let mut layout = json!({
        "template": THEME.template,
        "margin": { "l": THEME.margin, "r": THEME.margin, "t": THEME.margin, "b": THEME.margin },
        "xaxis": { "title": { "text": x } },
        "yaxis": { "title": { "text": y } },
    });
    if let Some(title) = title(classify(query).0, x, y) {
        layout["title"] = json!({ "text": title });
    }

    Some(json!({ "data": [trace], "layout": layout }))
}

fn title(intent: Intent, x: &str, y: &str) -> Option<String> {
    match intent {
        Intent::Trend => Some(format!("{} Trend", y)),
        Intent::Distribution => Some(format!("{} by {}", y, x)),
        Intent::Ranking => Some(format!("Top {}", y)),
        Intent::Unspecified => None,
    }
}
