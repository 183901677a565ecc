// SVG chart generation for the dashboard panels

use std::f64::consts::PI;

use super::escape;
use crate::models::delivery::format_date;
use crate::services::summary::{KeyCount, LoadBin, PairCount, TimePoint};

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 340.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 150.0;
const MARGIN_TOP: f64 = 44.0;
const MARGIN_BOTTOM: f64 = 56.0;
const PLOT_W: f64 = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
const PLOT_H: f64 = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

const PALETTE: [&str; 10] = [
    "#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a", "#19d3f3", "#ff6692", "#b6e880",
    "#ff97ff", "#fecb52",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMode {
    Grouped,
    Stacked,
}

fn colour(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Whole numbers without decimals, everything else with one.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn svg(title: &str, body: &str) -> String {
    format!(
        r##"<svg class="chart" width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg" style="background:white; border-radius:8px">
  <text x="{tx}" y="24" font-size="15" font-weight="600">{title}</text>
{body}</svg>"##,
        w = WIDTH,
        h = HEIGHT,
        tx = MARGIN_LEFT,
        title = escape(title),
        body = body,
    )
}

/// Placeholder used whenever a view has nothing to draw
pub fn no_data(title: &str) -> String {
    svg(
        title,
        &format!(
            r##"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="14" fill="#888">No data</text>
"##,
            WIDTH / 2.0,
            HEIGHT / 2.0
        ),
    )
}

fn axes(max: f64) -> String {
    let x0 = MARGIN_LEFT;
    let y0 = MARGIN_TOP + PLOT_H;
    format!(
        r##"  <line x1="{x0}" y1="{y0}" x2="{x1}" y2="{y0}" stroke="#444"/>
  <line x1="{x0}" y1="{top}" x2="{x0}" y2="{y0}" stroke="#444"/>
  <text x="{lx:.1}" y="{top:.1}" text-anchor="end" font-size="11">{max}</text>
  <text x="{lx:.1}" y="{y0:.1}" text-anchor="end" font-size="11">0</text>
"##,
        x0 = x0,
        x1 = x0 + PLOT_W,
        y0 = y0,
        top = MARGIN_TOP,
        lx = x0 - 6.0,
        max = format_value(max),
    )
}

fn x_label(x: f64, label: &str) -> String {
    format!(
        r##"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>
"##,
        x,
        MARGIN_TOP + PLOT_H + 16.0,
        escape(label)
    )
}

fn legend(entries: &[String]) -> String {
    let x = MARGIN_LEFT + PLOT_W + 16.0;
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let y = MARGIN_TOP + 18.0 * i as f64;
            format!(
                r##"  <rect x="{x:.1}" y="{y:.1}" width="12" height="12" fill="{c}"/>
  <text x="{tx:.1}" y="{ty:.1}" font-size="11">{label}</text>
"##,
                x = x,
                y = y,
                c = colour(i),
                tx = x + 18.0,
                ty = y + 10.0,
                label = escape(entry),
            )
        })
        .collect()
}

fn rect(x: f64, y: f64, w: f64, h: f64, fill: &str, tooltip: &str) -> String {
    format!(
        r##"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" opacity="0.9"><title>{}</title></rect>
"##,
        x,
        y,
        w,
        h,
        fill,
        escape(tooltip)
    )
}

/// Single series bar chart with the value printed above each bar.
pub fn bar_chart(title: &str, bars: &[(String, f64)]) -> String {
    if bars.is_empty() {
        return no_data(title);
    }

    let max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let scale = if max > 0.0 { PLOT_H / max } else { 0.0 };
    let slot = PLOT_W / bars.len() as f64;
    let bar_w = slot * 0.7;

    let mut body = axes(max);
    for (i, (label, value)) in bars.iter().enumerate() {
        // Bars start at zero; negative values draw nothing
        let h = (value * scale).max(0.0);
        let x = MARGIN_LEFT + slot * i as f64 + (slot - bar_w) / 2.0;
        let y = MARGIN_TOP + PLOT_H - h;
        body.push_str(&rect(
            x,
            y,
            bar_w,
            h,
            colour(0),
            &format!("{}: {}", label, format_value(*value)),
        ));
        body.push_str(&format!(
            r##"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>
"##,
            x + bar_w / 2.0,
            y - 4.0,
            format_value(*value)
        ));
        body.push_str(&x_label(x + bar_w / 2.0, label));
    }

    svg(title, &body)
}

/// Multi-series bar chart; one colour per series, one slot per group.
pub fn series_bar_chart(title: &str, data: &[PairCount], mode: BarMode) -> String {
    if data.is_empty() {
        return no_data(title);
    }

    let mut groups: Vec<&str> = Vec::new();
    let mut series: Vec<&str> = Vec::new();
    for item in data {
        if !groups.contains(&item.group.as_str()) {
            groups.push(&item.group);
        }
        if !series.contains(&item.series.as_str()) {
            series.push(&item.series);
        }
    }
    series.sort_unstable();

    let count = |group: &str, name: &str| -> f64 {
        data.iter()
            .find(|d| d.group == group && d.series == name)
            .map_or(0.0, |d| d.count as f64)
    };

    let max = match mode {
        BarMode::Grouped => data.iter().map(|d| d.count as f64).fold(0.0, f64::max),
        BarMode::Stacked => groups
            .iter()
            .map(|g| series.iter().map(|s| count(*g, *s)).sum::<f64>())
            .fold(0.0, f64::max),
    };
    let scale = if max > 0.0 { PLOT_H / max } else { 0.0 };
    let slot = PLOT_W / groups.len() as f64;
    let group_w = slot * 0.8;

    let mut body = axes(max);
    for (gi, group) in groups.iter().enumerate() {
        let gx = MARGIN_LEFT + slot * gi as f64 + (slot - group_w) / 2.0;
        let mut stacked = 0.0;
        for (si, name) in series.iter().enumerate() {
            let value = count(*group, *name);
            if value == 0.0 {
                continue;
            }
            let h = value * scale;
            let tooltip = format!("{} / {}: {}", group, name, format_value(value));
            match mode {
                BarMode::Grouped => {
                    let w = group_w / series.len() as f64;
                    let x = gx + w * si as f64;
                    body.push_str(&rect(x, MARGIN_TOP + PLOT_H - h, w, h, colour(si), &tooltip));
                }
                BarMode::Stacked => {
                    stacked += h;
                    body.push_str(&rect(gx, MARGIN_TOP + PLOT_H - stacked, group_w, h, colour(si), &tooltip));
                }
            }
        }
        body.push_str(&x_label(gx + group_w / 2.0, group));
    }
    let names: Vec<String> = series.iter().map(|s| s.to_string()).collect();
    body.push_str(&legend(&names));

    svg(title, &body)
}

/// Line with markers; points are placed by their timestamp.
pub fn line_chart(title: &str, points: &[TimePoint]) -> String {
    if points.is_empty() {
        return no_data(title);
    }

    let first = points[0].at.and_utc().timestamp() as f64;
    let last = points[points.len() - 1].at.and_utc().timestamp() as f64;
    let span = last - first;
    let max = points.iter().map(|p| p.count as f64).fold(0.0, f64::max);
    let scale = if max > 0.0 { PLOT_H / max } else { 0.0 };

    let coords: Vec<(f64, f64)> = points
        .iter()
        .map(|p| {
            let t = p.at.and_utc().timestamp() as f64;
            let x = if span > 0.0 {
                MARGIN_LEFT + (t - first) / span * PLOT_W
            } else {
                MARGIN_LEFT + PLOT_W / 2.0
            };
            (x, MARGIN_TOP + PLOT_H - p.count as f64 * scale)
        })
        .collect();

    let path: Vec<String> = coords
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect();

    let mut body = axes(max);
    body.push_str(&format!(
        r##"  <polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>
"##,
        path.join(" "),
        colour(0)
    ));
    for ((x, y), point) in coords.iter().zip(points) {
        body.push_str(&format!(
            r##"  <circle cx="{:.1}" cy="{:.1}" r="4" fill="{}"><title>{}: {}</title></circle>
"##,
            x,
            y,
            colour(0),
            format_date(&point.at),
            point.count
        ));
    }
    body.push_str(&x_label(coords[0].0, &format_date(&points[0].at)));
    if points.len() > 1 {
        body.push_str(&x_label(coords[coords.len() - 1].0, &format_date(&points[points.len() - 1].at)));
    }

    svg(title, &body)
}

pub fn pie_chart(title: &str, slices: &[KeyCount]) -> String {
    let total: usize = slices.iter().map(|s| s.count).sum();
    if total == 0 {
        return no_data(title);
    }

    let cx = MARGIN_LEFT + PLOT_W / 2.0;
    let cy = MARGIN_TOP + PLOT_H / 2.0;
    let r = PLOT_H / 2.0;

    let mut body = String::new();
    if slices.len() == 1 {
        body.push_str(&format!(
            r##"  <circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}"><title>{}: {}</title></circle>
"##,
            cx,
            cy,
            r,
            colour(0),
            escape(&slices[0].key),
            slices[0].count
        ));
    } else {
        let mut angle = -PI / 2.0;
        for (i, slice) in slices.iter().enumerate() {
            let sweep = slice.count as f64 / total as f64 * 2.0 * PI;
            let (x0, y0) = (cx + r * angle.cos(), cy + r * angle.sin());
            angle += sweep;
            let (x1, y1) = (cx + r * angle.cos(), cy + r * angle.sin());
            let large = if sweep > PI { 1 } else { 0 };
            body.push_str(&format!(
                r##"  <path d="M{cx:.1},{cy:.1} L{x0:.1},{y0:.1} A{r:.1},{r:.1} 0 {large} 1 {x1:.1},{y1:.1} Z" fill="{c}" stroke="white"><title>{label}: {count}</title></path>
"##,
                cx = cx,
                cy = cy,
                x0 = x0,
                y0 = y0,
                r = r,
                large = large,
                x1 = x1,
                y1 = y1,
                c = colour(i),
                label = escape(&slice.key),
                count = slice.count,
            ));
        }
    }

    let entries: Vec<String> = slices
        .iter()
        .map(|s| format!("{} ({:.1}%)", s.key, s.count as f64 / total as f64 * 100.0))
        .collect();
    body.push_str(&legend(&entries));

    svg(title, &body)
}

pub fn histogram_chart(title: &str, bins: &[LoadBin]) -> String {
    if bins.is_empty() {
        return no_data(title);
    }

    let max = bins.iter().map(|b| b.count as f64).fold(0.0, f64::max);
    let scale = if max > 0.0 { PLOT_H / max } else { 0.0 };
    let w = PLOT_W / bins.len() as f64;

    let mut body = axes(max);
    for (i, bin) in bins.iter().enumerate() {
        let h = bin.count as f64 * scale;
        body.push_str(&rect(
            MARGIN_LEFT + w * i as f64,
            MARGIN_TOP + PLOT_H - h,
            w,
            h,
            colour(0),
            &format!("{:.2} - {:.2}: {}", bin.lower, bin.upper, bin.count),
        ));
    }
    body.push_str(&x_label(MARGIN_LEFT, &format!("{:.1}", bins[0].lower)));
    body.push_str(&x_label(
        MARGIN_LEFT + PLOT_W,
        &format!("{:.1}", bins[bins.len() - 1].upper),
    ));

    svg(title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_empty_views_render_placeholder() {
        assert!(bar_chart("Trips", &[]).contains("No data"));
        assert!(series_bar_chart("Status", &[], BarMode::Grouped).contains("No data"));
        assert!(line_chart("Over time", &[]).contains("No data"));
        assert!(pie_chart("Urgency", &[]).contains("No data"));
        assert!(histogram_chart("Load", &[]).contains("No data"));
    }

    #[test]
    fn test_bar_chart_escapes_labels() {
        let svg = bar_chart("Trips", &[("<Gulu & Co>".to_string(), 3.0)]);

        assert!(svg.contains("&lt;Gulu &amp; Co&gt;"));
        assert!(!svg.contains("<Gulu"));
        assert_eq!(svg.matches("<rect").count(), 1);
    }

    #[test]
    fn test_bar_chart_negative_values_have_no_negative_height() {
        let svg = bar_chart(
            "Capacity",
            &[("Gulu".to_string(), -12.5), ("Lira".to_string(), 40.0)],
        );

        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(!svg.contains(r#"height="-"#));
        assert!(svg.contains("Gulu: -12.5"));
    }

    #[test]
    fn test_stacked_chart_draws_one_rect_per_pair() {
        let data = vec![
            PairCount { group: "Gulu".into(), series: "Food".into(), count: 2 },
            PairCount { group: "Gulu".into(), series: "Water".into(), count: 1 },
            PairCount { group: "Lira".into(), series: "Food".into(), count: 4 },
        ];

        let svg = series_bar_chart("Cargo", &data, BarMode::Stacked);

        // three bars plus two legend swatches
        assert_eq!(svg.matches("<rect").count(), 5);
    }

    #[test]
    fn test_line_chart_has_marker_per_point() {
        let day = |d| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let points = vec![
            TimePoint { at: day(1), count: 2 },
            TimePoint { at: day(3), count: 1 },
        ];

        let svg = line_chart("Over time", &points);

        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("2024-01-01"));
        assert!(svg.contains("2024-01-03"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(12.0), "12");
        assert_eq!(format_value(12.75), "12.8");
    }
}
