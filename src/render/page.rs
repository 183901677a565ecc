use std::fmt::Write as _;

use super::charts::{self, BarMode};
use super::escape;
use crate::db::delivery_tables::DeliveryTable;
use crate::models::delivery::{DeliveryRecord, format_date};
use crate::services::{
    DashboardSummary, FilterOptions, FilterQuery, FilterSelection, export::EXPORT_FILE_NAME,
    summary::KeyCount,
};

const PAGE_TITLE: &str = "Humanitarian Deliveries Dashboard";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; display: flex; background: #f4f5f7; color: #222; }
aside { width: 240px; padding: 16px; background: #fff; border-right: 1px solid #ddd; min-height: 100vh; }
aside label, aside fieldset { display: block; margin-bottom: 14px; }
aside select { width: 100%; }
main { flex: 1; padding: 16px 24px; overflow-x: auto; }
.metrics { display: flex; gap: 16px; }
.metric { background: #fff; border-radius: 8px; padding: 12px 16px; min-width: 160px; }
.metric .value { font-size: 26px; font-weight: 600; }
.charts { display: flex; flex-wrap: wrap; gap: 16px; }
table { border-collapse: collapse; background: #fff; font-size: 12px; }
th, td { border: 1px solid #ddd; padding: 4px 6px; white-space: nowrap; }
"#;

/// Everything one dashboard render needs
pub struct DashboardView<'a> {
    pub options: &'a FilterOptions,
    pub selection: &'a FilterSelection,
    pub summary: &'a DashboardSummary,
    pub attention: &'a [&'a DeliveryRecord],
    pub filtered: &'a [&'a DeliveryRecord],
}

pub fn render_dashboard(view: &DashboardView<'_>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
{sidebar}
<main>
<h1>{title}</h1>
{metrics}
{charts}
<section>
<h2>Delayed or Low Utilisation Deliveries</h2>
{attention}
</section>
<section>
<h2>Detailed Deliveries Data</h2>
{detail}
<p><a href="/download/{file}?{query}" download="{file}">Download Filtered Data as CSV</a></p>
</section>
</main>
</body>
</html>
"#,
        title = PAGE_TITLE,
        style = STYLE,
        sidebar = sidebar(view.options, view.selection),
        metrics = metrics(view.summary),
        charts = chart_panels(view.summary),
        attention = record_table(view.attention),
        detail = record_table(view.filtered),
        file = EXPORT_FILE_NAME,
        query = escape(&FilterQuery::encode(view.selection)),
    );
    html
}

fn sidebar(options: &FilterOptions, selection: &FilterSelection) -> String {
    let mut html = String::from("<aside>\n<h2>Filters</h2>\n<form method=\"get\" action=\"/\">\n");

    html.push_str("<label>Region<select name=\"region\">\n");
    for region in &options.regions {
        html.push_str(&option_tag(region, *region == selection.region));
    }
    html.push_str("</select></label>\n");

    html.push_str("<fieldset><legend>Delivery Status</legend>\n");
    for status in &options.statuses {
        let checked = if selection.statuses.contains(status) { " checked" } else { "" };
        let _ = writeln!(
            html,
            r#"<label><input type="checkbox" name="status" value="{v}"{checked}> {v}</label>"#,
            v = escape(status),
            checked = checked,
        );
    }
    html.push_str("</fieldset>\n");

    html.push_str("<label>Week Range<select name=\"week\">\n");
    for week in &options.week_ranges {
        html.push_str(&option_tag(week, *week == selection.week_range));
    }
    html.push_str("</select></label>\n");

    html.push_str("<input type=\"hidden\" name=\"applied\" value=\"1\">\n");
    html.push_str("<button type=\"submit\">Apply</button>\n</form>\n</aside>");
    html
}

fn option_tag(value: &str, selected: bool) -> String {
    format!(
        "<option value=\"{v}\"{s}>{v}</option>\n",
        v = escape(value),
        s = if selected { " selected" } else { "" }
    )
}

/// Percentages with one decimal, or "no data" when nothing was averaged.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "no data".to_string(),
    }
}

fn metrics(summary: &DashboardSummary) -> String {
    let tiles = [
        ("Deliveries", summary.deliveries.to_string()),
        ("Total Beneficiaries", summary.total_beneficiaries.to_string()),
        ("Avg Capacity Utilisation", format_percent(summary.avg_capacity_utilisation)),
        ("Avg Return %", format_percent(summary.avg_return_percentage)),
    ];

    let mut html = String::from("<section>\n<h2>Key Metrics</h2>\n<div class=\"metrics\">\n");
    for (label, value) in tiles {
        let _ = writeln!(
            html,
            r#"<div class="metric"><div class="label">{}</div><div class="value">{}</div></div>"#,
            label,
            escape(&value)
        );
    }
    html.push_str("</div>\n</section>");
    html
}

fn chart_panels(summary: &DashboardSummary) -> String {
    let means: Vec<(String, f64)> = summary
        .avg_capacity_per_branch
        .iter()
        .map(|m| (m.key.clone(), m.mean))
        .collect();

    let panels = [
        charts::bar_chart("Total Trips per Branch", &count_bars(&summary.trips_per_branch)),
        charts::series_bar_chart(
            "Delivery Status per Branch",
            &summary.status_per_branch,
            BarMode::Grouped,
        ),
        charts::line_chart("Deliveries Over Time", &summary.deliveries_over_time),
        charts::bar_chart("Total Deliveries per Week", &count_bars(&summary.deliveries_by_week)),
        charts::bar_chart("Average Capacity Utilisation (%) per Branch", &means),
        charts::pie_chart("Trips per Vehicle Type", &summary.trips_per_vehicle),
        charts::histogram_chart(
            "Vehicle Load Distribution (tonnes)",
            &summary.vehicle_load_distribution,
        ),
        charts::pie_chart("Deliveries by Urgency Level", &summary.urgency_distribution),
        charts::series_bar_chart(
            "Cargo Type per Region",
            &summary.cargo_type_by_region,
            BarMode::Stacked,
        ),
        charts::series_bar_chart(
            "Cargo Type Distribution per Branch",
            &summary.cargo_type_by_branch,
            BarMode::Stacked,
        ),
        charts::series_bar_chart(
            "Cargo Subtype per Branch",
            &summary.cargo_subtype_by_branch,
            BarMode::Stacked,
        ),
    ];

    let mut html = String::from("<section class=\"charts\">\n");
    for panel in panels {
        html.push_str(&panel);
        html.push('\n');
    }
    html.push_str("</section>");
    html
}

fn count_bars(items: &[KeyCount]) -> Vec<(String, f64)> {
    items.iter().map(|c| (c.key.clone(), c.count as f64)).collect()
}

/// Cell text for each projected column, in projection order.
fn record_cells(record: &DeliveryRecord) -> [String; 22] {
    [
        record.branch.clone(),
        record.route.clone(),
        record.delivery_id.clone(),
        format_date(&record.arrival_date),
        record.beneficiaries_count.to_string(),
        record.capacity_utilisation.to_string(),
        record.cargo_subtype.clone(),
        record.cargo_type.clone(),
        format_date(&record.created_date),
        record.day_of_week.clone(),
        record.distribution_center.clone(),
        record.driver_name.clone(),
        record.region.clone(),
        record.released_tonnes.to_string(),
        record.requested_tonnes.to_string(),
        record.return_percentage.to_string(),
        record.status.clone(),
        record.urgency_level.clone(),
        record.vehicle.clone(),
        record.vehicle_load_tonnes.to_string(),
        record.warehouse_release_time_hours.to_string(),
        record.week_range.clone(),
    ]
}

fn record_table(records: &[&DeliveryRecord]) -> String {
    if records.is_empty() {
        return "<p class=\"empty\">No deliveries match the current filters.</p>".to_string();
    }

    let mut html = String::from("<table>\n<thead><tr>");
    for column in DeliveryTable::COLUMNS {
        let _ = write!(html, "<th>{}</th>", column);
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for record in records {
        html.push_str("<tr>");
        for cell in record_cells(record) {
            let _ = write!(html, "<td>{}</td>", escape(&cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}
