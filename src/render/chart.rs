use super::format::{html_escape, value_as_f64, value_to_string};
use crate::dsl::{ChartDef, ChartType};
use crate::executor::Row;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 220.0;
const PADDING: f64 = 28.0;
const SERIES_COLORS: [&str; 6] = [
    "#3b82f6", "#f59e0b", "#10b981", "#ef4444", "#8b5cf6", "#14b8a6",
];

/// Inline SVG for a chart config's rows. Values that are not numeric count
/// as zero; the y-axis starts at zero and scales to the largest value.
pub fn render_chart(chart: &ChartDef, rows: &[Row]) -> String {
    if rows.is_empty() {
        return r#"<p class="empty">No data</p>"#.to_string();
    }

    let series: Vec<Vec<f64>> = chart
        .categories
        .iter()
        .map(|category| {
            rows.iter()
                .map(|row| row.get(category).and_then(value_as_f64).unwrap_or(0.0))
                .collect()
        })
        .collect();
    let max = series
        .iter()
        .flatten()
        .copied()
        .fold(0.0, f64::max)
        .max(f64::EPSILON);

    let plot_w = WIDTH - 2.0 * PADDING;
    let plot_h = HEIGHT - 2.0 * PADDING;
    let n = rows.len();
    let y = |v: f64| PADDING + plot_h - (v.max(0.0) / max) * plot_h;

    let mut body = String::new();
    match chart.chart_type {
        ChartType::Bar => {
            let slot = plot_w / n as f64;
            let bar_w = (slot * 0.8 / series.len() as f64).max(1.0);
            for (s, values) in series.iter().enumerate() {
                let color = SERIES_COLORS[s % SERIES_COLORS.len()];
                for (i, v) in values.iter().enumerate() {
                    let x = PADDING + i as f64 * slot + slot * 0.1 + s as f64 * bar_w;
                    let top = y(*v);
                    body.push_str(&format!(
                        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}</title></rect>"#,
                        x,
                        top,
                        bar_w,
                        PADDING + plot_h - top,
                        color,
                        v
                    ));
                }
            }
        }
        ChartType::Line | ChartType::Area => {
            let step = if n > 1 { plot_w / (n - 1) as f64 } else { 0.0 };
            for (s, values) in series.iter().enumerate() {
                let color = SERIES_COLORS[s % SERIES_COLORS.len()];
                let points: Vec<String> = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| format!("{:.1},{:.1}", PADDING + i as f64 * step, y(*v)))
                    .collect();
                if chart.chart_type == ChartType::Area {
                    let last_x = PADDING + (n - 1) as f64 * step;
                    body.push_str(&format!(
                        r#"<polygon points="{:.1},{:.1} {} {:.1},{:.1}" fill="{}" fill-opacity="0.25"/>"#,
                        PADDING,
                        PADDING + plot_h,
                        points.join(" "),
                        last_x,
                        PADDING + plot_h,
                        color
                    ));
                }
                body.push_str(&format!(
                    r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
                    points.join(" "),
                    color
                ));
            }
        }
    }

    let first = rows
        .first()
        .and_then(|r| r.get(&chart.index))
        .map(value_to_string)
        .unwrap_or_default();
    let last = rows
        .last()
        .and_then(|r| r.get(&chart.index))
        .map(value_to_string)
        .unwrap_or_default();

    let legend: Vec<String> = chart
        .categories
        .iter()
        .enumerate()
        .map(|(s, category)| {
            format!(
                r#"<span class="legend-item"><span class="swatch" style="background: {}"></span>{}</span>"#,
                SERIES_COLORS[s % SERIES_COLORS.len()],
                html_escape(category)
            )
        })
        .collect();

    format!(
        r#"<svg class="chart chart-{kind}" viewBox="0 0 {w} {h}" role="img">
<line x1="{p}" y1="{base}" x2="{right}" y2="{base}" class="axis"/>
<text x="{p}" y="{label_y}" class="axis-label">{first}</text>
<text x="{right}" y="{label_y}" class="axis-label" text-anchor="end">{last}</text>
<text x="{p}" y="{top_label}" class="axis-label">{max}</text>
{body}
</svg>
<div class="legend">{legend}</div>"#,
        kind = chart_type_name(chart.chart_type),
        w = WIDTH,
        h = HEIGHT,
        p = PADDING,
        base = PADDING + plot_h,
        right = WIDTH - PADDING,
        label_y = HEIGHT - 8.0,
        top_label = PADDING - 8.0,
        first = html_escape(&first),
        last = html_escape(&last),
        max = super::format::format_number_short(max),
        body = body,
        legend = legend.join(""),
    )
}

/// Chart for ad-hoc SQL: the first column is the x-axis and every other
/// column that is numeric in the first row becomes a series. `None` when
/// there is nothing to plot.
pub fn infer_chart(columns: &[String], rows: &[Row]) -> Option<ChartDef> {
    let (index, rest) = columns.split_first()?;
    let first = rows.first()?;
    let categories: Vec<String> = rest
        .iter()
        .filter(|column| first.get(column.as_str()).and_then(value_as_f64).is_some())
        .cloned()
        .collect();
    if categories.is_empty() {
        return None;
    }
    Some(ChartDef {
        chart_type: ChartType::Line,
        index: index.clone(),
        categories,
    })
}

fn chart_type_name(chart_type: ChartType) -> &'static str {
    match chart_type {
        ChartType::Bar => "bar",
        ChartType::Line => "line",
        ChartType::Area => "area",
    }
}
