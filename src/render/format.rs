use crate::dsl::ColumnFormat;
use crate::executor::Row;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

const CODE_PREVIEW_CHARS: usize = 80;
const BADGE_PALETTE: usize = 8;

/// Per-request state the cell renderers need.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Appended to internal links so navigation stays on the same host.
    pub host: usize,
    pub now: DateTime<Utc>,
}

impl RenderContext {
    pub fn new(host: usize) -> Self {
        Self {
            host,
            now: Utc::now(),
        }
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Plain string form of a JSON scalar; null is empty.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Numbers may arrive quoted (128-bit integers, decimals).
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Renders one cell's inner HTML. `column_max` is the largest value of the
/// column over the rendered rows, used by `background_bar`.
pub fn render_cell(
    format: &ColumnFormat,
    value: Option<&Value>,
    row: &Row,
    column_max: f64,
    ctx: &RenderContext,
) -> String {
    let value = match value {
        None | Some(Value::Null) => return String::new(),
        Some(value) => value,
    };
    let text = value_to_string(value);

    match format {
        ColumnFormat::Text => html_escape(&text),
        ColumnFormat::Number => numeric_or_text(value, &text, format_number),
        ColumnFormat::NumberShort => numeric_or_text(value, &text, format_number_short),
        ColumnFormat::ReadableSize => numeric_or_text(value, &text, format_readable_size),
        ColumnFormat::Duration => numeric_or_text(value, &text, format_duration),
        ColumnFormat::Badge => format!(r#"<span class="badge">{}</span>"#, html_escape(&text)),
        ColumnFormat::ColoredBadge => format!(
            r#"<span class="badge badge-{}">{}</span>"#,
            badge_color(&text),
            html_escape(&text)
        ),
        ColumnFormat::BackgroundBar => render_bar(value, &text, column_max),
        ColumnFormat::Boolean => render_boolean(value),
        ColumnFormat::Code => format!("<code>{}</code>", html_escape(&text)),
        ColumnFormat::CodeDialog => render_code_dialog(&text),
        ColumnFormat::RelatedTime => render_related_time(&text, ctx.now),
        ColumnFormat::Link { href } => {
            let href = link_href(href, row, ctx.host);
            format!(
                r#"<a href="{}">{}</a>"#,
                html_escape(&href),
                html_escape(&text)
            )
        }
    }
}

fn numeric_or_text(value: &Value, text: &str, f: fn(f64) -> String) -> String {
    match value_as_f64(value) {
        Some(n) => f(n),
        None => html_escape(text),
    }
}

/// Substitutes `[column]` with the row's percent-encoded value and keeps
/// internal links on the current host.
pub fn link_href(template: &str, row: &Row, host: usize) -> String {
    let mut href = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('[') {
        let Some(len) = rest[start..].find(']') else {
            break;
        };
        href.push_str(&rest[..start]);
        let column = &rest[start + 1..start + len];
        let value = row.get(column).map(value_to_string).unwrap_or_default();
        href.push_str(&percent_encode(&value));
        rest = &rest[start + len + 1..];
    }
    href.push_str(rest);

    if href.starts_with('/') && !href.contains("host=") {
        let sep = if href.contains('?') { '&' } else { '?' };
        href.push(sep);
        href.push_str(&format!("host={}", host));
    }
    href
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e18 {
        return group_thousands(&format!("{}", n as i64));
    }
    let formatted = format!("{:.2}", n);
    match formatted.split_once('.') {
        Some((int, frac)) => format!("{}.{}", group_thousands(int), frac),
        None => formatted,
    }
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{}{}", sign, out)
}

pub fn format_number_short(n: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
    for (scale, suffix) in UNITS {
        if n.abs() >= scale {
            return format!("{}{}", trim_decimals(n / scale), suffix);
        }
    }
    trim_decimals(n)
}

pub fn format_readable_size(bytes: f64) -> String {
    const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
    let mut size = bytes;
    let mut unit = 0;
    while size.abs() >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size as i64, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// Seconds as `1h 2m 3s`; sub-minute values keep two decimals.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{}s", trim_decimals(seconds));
    }
    let total = seconds.round() as u64;
    let (days, hours, minutes, secs) = (
        total / 86_400,
        total % 86_400 / 3600,
        total % 3600 / 60,
        total % 60,
    );
    let parts: Vec<String> = [(days, "d"), (hours, "h"), (minutes, "m"), (secs, "s")]
        .iter()
        .skip_while(|(v, _)| *v == 0)
        .filter(|(v, _)| *v > 0)
        .map(|(v, unit)| format!("{}{}", v, unit))
        .collect();
    parts.join(" ")
}

fn trim_decimals(n: f64) -> String {
    let s = format!("{:.2}", n);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn badge_color(text: &str) -> usize {
    let lower = text.to_ascii_lowercase();
    if lower.contains("fail") || lower.contains("error") || lower.contains("exception") {
        return 0;
    }
    let hash = text
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    1 + hash % (BADGE_PALETTE - 1)
}

fn render_bar(value: &Value, text: &str, column_max: f64) -> String {
    let Some(n) = value_as_f64(value) else {
        return html_escape(text);
    };
    let pct = if column_max > 0.0 {
        (n / column_max * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    format!(
        r#"<div class="bar-cell"><div class="bar" style="width: {:.1}%"></div><span>{}</span></div>"#,
        pct,
        format_number(n)
    )
}

fn render_boolean(value: &Value) -> String {
    let truthy = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    };
    if truthy {
        r#"<span class="bool bool-true">✓</span>"#.to_string()
    } else {
        r#"<span class="bool bool-false">✗</span>"#.to_string()
    }
}

fn render_code_dialog(text: &str) -> String {
    if text.chars().count() <= CODE_PREVIEW_CHARS && !text.contains('\n') {
        return format!("<code>{}</code>", html_escape(text));
    }
    let preview: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .take(CODE_PREVIEW_CHARS)
        .collect();
    format!(
        r#"<details class="code-dialog"><summary><code>{}…</code></summary><pre><code>{}</code></pre></details>"#,
        html_escape(preview.trim_end()),
        html_escape(text)
    )
}

/// Accepts ISO 8601 (`date_time_output_format=iso`) and the default
/// `YYYY-MM-DD hh:mm:ss` form, the latter taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(ts).num_seconds();
    let secs = delta.unsigned_abs();
    let (amount, unit) = match secs {
        0..=59 => (secs, "second"),
        60..=3_599 => (secs / 60, "minute"),
        3_600..=86_399 => (secs / 3_600, "hour"),
        86_400..=2_591_999 => (secs / 86_400, "day"),
        2_592_000..=31_535_999 => (secs / 2_592_000, "month"),
        _ => (secs / 31_536_000, "year"),
    };
    let plural = if amount == 1 { "" } else { "s" };
    if delta >= 0 {
        format!("{} {}{} ago", amount, unit, plural)
    } else {
        format!("in {} {}{}", amount, unit, plural)
    }
}

fn render_related_time(text: &str, now: DateTime<Utc>) -> String {
    match parse_timestamp(text) {
        Some(ts) => format!(
            r#"<time datetime="{}" title="{}">{}</time>"#,
            html_escape(text),
            html_escape(text),
            relative_time(ts, now)
        ),
        None => html_escape(text),
    }
}
