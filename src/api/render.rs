//! HTML dashboard. All rounding happens here, never in the statistics engine.

use std::fmt::Write as _;
use std::time::Duration;

use crate::api::routes::{HistoryPoint, SummaryResponse};
use crate::types::{SpreadDirection, StatSummary};

const PLACEHOLDER: &str = "—";

const CHART_WIDTH: f64 = 560.0;
const CHART_HEIGHT: f64 = 140.0;
const CHART_PAD: f64 = 8.0;

/// Two decimals, or a dash for missing / NaN.
pub fn fmt(v: Option<f64>) -> String {
    match v {
        Some(x) if !x.is_nan() => format!("{x:.2}"),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Like `fmt`, with an explicit `+` on positive values.
pub fn fmt_signed(v: Option<f64>) -> String {
    match v {
        Some(x) if !x.is_nan() && x > 0.0 => format!("+{x:.2}"),
        other => fmt(other),
    }
}

fn fmt_percent(v: Option<f64>) -> String {
    match v {
        Some(x) if !x.is_nan() => format!("{}%", fmt_signed(Some(x))),
        _ => PLACEHOLDER.to_string(),
    }
}

pub struct InstrumentPanel {
    pub summary: SummaryResponse,
    pub history: Vec<HistoryPoint>,
}

pub fn render_dashboard(panels: &[InstrumentPanel], refresh_every: Duration) -> String {
    let refresh_secs = refresh_every.as_secs().max(1);
    let mut body = String::new();
    for panel in panels {
        render_panel(&mut body, panel);
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta http-equiv="refresh" content="{refresh_secs}" />
<title>Spread monitor</title>
<style>
body {{ font-family: Arial, sans-serif; padding: 20px; background: #0f1115; color: #e6e6e6; }}
section {{ border: 1px solid #2a2f3a; border-radius: 6px; padding: 12px 16px; margin-bottom: 18px; }}
table {{ border-collapse: collapse; margin: 8px 0; }}
td, th {{ padding: 3px 12px; text-align: right; }}
th {{ color: #9aa4b2; font-weight: normal; }}
td:first-child, th:first-child {{ text-align: left; }}
.pos {{ color: #3fb950; }} .neg {{ color: #f85149; }} .muted {{ color: #6e7681; }}
</style>
</head>
<body>
<h2>Cross-venue spread monitor</h2>
{body}<p class="muted">Auto-refresh every {refresh_secs}s.</p>
</body>
</html>
"#
    )
}

fn render_panel(out: &mut String, panel: &InstrumentPanel) {
    let s = &panel.summary;
    let latest = s.latest.unwrap_or_default();
    let window_min = s.window_secs / 60;

    let _ = write!(
        out,
        r#"<section>
<h3>{symbol}</h3>
<table>
<tr><th>Venue</th><th>Price</th></tr>
<tr><td>Primary last trade</td><td>{primary}</td></tr>
<tr><td>Counter bid</td><td>{bid}</td></tr>
<tr><td>Counter ask</td><td>{ask}</td></tr>
</table>
<table>
<tr><th>Direction</th><th>Now</th><th>%</th><th>Avg {window_min}m</th><th>Max</th><th>Min</th><th>Samples</th></tr>
"#,
        symbol = s.symbol,
        primary = fmt(latest.primary_price),
        bid = fmt(latest.counter_bid),
        ask = fmt(latest.counter_ask),
    );

    for direction in SpreadDirection::ALL {
        let (now, pct, stats) = match direction {
            SpreadDirection::A => (s.spreads.a, s.spreads.a_percent, s.stats.a),
            SpreadDirection::B => (s.spreads.b, s.spreads.b_percent, s.stats.b),
        };
        render_direction_row(out, direction, now, pct, stats);
    }
    out.push_str("</table>\n");
    out.push_str(&spread_chart_svg(&panel.history));
    out.push_str("</section>\n");
}

fn render_direction_row(
    out: &mut String,
    direction: SpreadDirection,
    now: Option<f64>,
    pct: Option<f64>,
    stats: Option<StatSummary>,
) {
    let class = match now {
        Some(v) if v > 0.0 => "pos",
        Some(v) if v < 0.0 => "neg",
        _ => "muted",
    };
    let (avg, max, min, count) = match stats {
        Some(st) => (
            fmt_signed(Some(st.average)),
            fmt_signed(Some(st.max)),
            fmt_signed(Some(st.min)),
            st.count.to_string(),
        ),
        None => (
            PLACEHOLDER.to_string(),
            PLACEHOLDER.to_string(),
            PLACEHOLDER.to_string(),
            "0".to_string(),
        ),
    };

    let _ = writeln!(
        out,
        r#"<tr><td>{direction} ({label})</td><td class="{class}">{now}</td><td>{pct}</td><td>{avg}</td><td>{max}</td><td>{min}</td><td>{count}</td></tr>"#,
        label = direction.label(),
        now = fmt_signed(now),
        pct = fmt_percent(pct),
    );
}

/// Line chart of both spread directions over the display history.
pub fn spread_chart_svg(points: &[HistoryPoint]) -> String {
    let values: Vec<f64> = points
        .iter()
        .flat_map(|p| [p.spread_a, p.spread_b])
        .flatten()
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return format!(r#"<p class="muted">Chart: {PLACEHOLDER} no data yet</p>"#);
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }

    let span_x = (points.len().max(2) - 1) as f64;
    let plot_w = CHART_WIDTH - 2.0 * CHART_PAD;
    let plot_h = CHART_HEIGHT - 2.0 * CHART_PAD;
    let project = |i: usize, v: f64| {
        let x = CHART_PAD + i as f64 / span_x * plot_w;
        let y = CHART_PAD + (hi - v) / (hi - lo) * plot_h;
        format!("{x:.1},{y:.1}")
    };
    let series = |pick: fn(&HistoryPoint) -> Option<f64>| {
        points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| pick(p).filter(|v| v.is_finite()).map(|v| project(i, v)))
            .collect::<Vec<_>>()
            .join(" ")
    };

    format!(
        r##"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" role="img">
<rect x="0" y="0" width="{w}" height="{h}" fill="#161b22" />
<polyline fill="none" stroke="#58a6ff" stroke-width="2" points="{a}" />
<polyline fill="none" stroke="#d29922" stroke-width="2" points="{b}" />
<text x="{pad}" y="14" fill="#9aa4b2" font-size="11">max {hi:.2}</text>
<text x="{pad}" y="{bottom}" fill="#9aa4b2" font-size="11">min {lo:.2}</text>
</svg>
<p class="muted">Last {n} samples: <span style="color:#58a6ff">A</span> / <span style="color:#d29922">B</span></p>
"##,
        w = CHART_WIDTH,
        h = CHART_HEIGHT,
        a = series(|p| p.spread_a),
        b = series(|p| p.spread_b),
        pad = CHART_PAD,
        bottom = CHART_HEIGHT - 4.0,
        n = points.len(),
    )
}
