use super::export::format_prediction;
use super::payload::ReportPayload;
use super::RenderError;
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub heading: String,
    pub lines: Vec<String>,
}

impl Section {
    fn new(heading: &str, lines: Vec<String>) -> Self {
        Self {
            heading: heading.to_string(),
            lines,
        }
    }
}

/// Section-by-section text of a report, independent of the output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLayout {
    pub title: String,
    pub sections: Vec<Section>,
}

/// Turns a layout into document bytes.
pub trait DocumentEncoder: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn extension(&self) -> &'static str;
    fn encode(&self, layout: &DocumentLayout) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextEncoder;

impl DocumentEncoder for PlainTextEncoder {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn encode(&self, layout: &DocumentLayout) -> Result<Vec<u8>, RenderError> {
        let mut out = String::new();
        writeln!(out, "{}", layout.title)?;
        writeln!(out, "{}", "=".repeat(layout.title.chars().count()))?;
        for section in &layout.sections {
            writeln!(out)?;
            writeln!(out, "{}", section.heading)?;
            writeln!(out, "{}", "-".repeat(section.heading.chars().count()))?;
            for line in &section.lines {
                writeln!(out, "  {line}")?;
            }
        }
        Ok(out.into_bytes())
    }
}

pub fn layout_report(payload: &ReportPayload) -> DocumentLayout {
    let mut sections = vec![
        header(payload),
        kpis(payload),
        trends(payload),
        rankings(payload),
        compliance(payload),
    ];
    if let Some(section) = predictive(payload) {
        sections.push(section);
    }
    if !payload.notes.is_empty() {
        sections.push(Section::new("Notes", payload.notes.clone()));
    }

    DocumentLayout {
        title: format!("Vehicle Registration Report: {}", payload.meta.period_label),
        sections,
    }
}

fn header(payload: &ReportPayload) -> Section {
    let meta = &payload.meta;
    Section::new(
        "Report Details",
        vec![
            format!("Scope: {}", meta.scope_label),
            format!("Period: {}", meta.period_label),
            format!("Generated: {}", meta.generated_at.format("%Y-%m-%d %H:%M")),
            format!("Generated by: {}", meta.actor),
            format!("Municipality: {}", meta.filters.municipality),
            format!("Vehicle type: {}", meta.filters.vehicle_type),
            format!("License status: {}", meta.filters.license_status.label()),
        ],
    )
}

fn kpis(payload: &ReportPayload) -> Section {
    let kpis = &payload.kpis;
    let mut lines = vec![
        format!("Total vehicles: {}", kpis.total_vehicles),
        format!("Active registrations: {}", kpis.active_vehicles),
        format!("Expired registrations: {}", kpis.expired_vehicles),
        format!("Total owners: {}", kpis.total_owners),
        format!("Owners with license: {}", kpis.owners_with_license),
        format!("Owners without license: {}", kpis.owners_without_license),
        format!("License compliance: {:.2}%", kpis.overall_compliance_rate),
        format!(
            "Plates: {} permanent, {} temporary",
            kpis.permanent_plates, kpis.temporary_plates
        ),
        format!(
            "Classifications: {} private, {} for hire, {} government",
            kpis.classifications.private,
            kpis.classifications.for_hire,
            kpis.classifications.government
        ),
    ];
    for (label, count) in &kpis.classifications.other {
        lines.push(format!("Other classification {label}: {count}"));
    }
    Section::new("Key Indicators", lines)
}

fn rate(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |rate| format!("{rate:.2}%"))
}

fn trends(payload: &ReportPayload) -> Section {
    let trends = &payload.trends;
    let mut lines = vec![
        format!("Direction: {}", trends.trend_direction_label),
        format!("Average yearly growth: {}", rate(trends.avg_yearly_growth_rate)),
        format!("Average monthly growth: {}", rate(trends.avg_monthly_growth_rate)),
    ];
    if let Some(peak) = &trends.peak_year {
        lines.push(format!("Peak year: {} ({} registrations)", peak.label, peak.count));
    }
    if let Some(peak) = &trends.peak_month {
        lines.push(format!("Peak month: {} ({} registrations)", peak.label, peak.count));
    }
    if let Some(average) = trends.monthly_average {
        lines.push(format!("Monthly average: {average:.0}"));
    }
    for point in &trends.monthly {
        lines.push(format!("{}: {}", point.label, point.count));
    }
    Section::new("Registration Trends", lines)
}

fn rankings(payload: &ReportPayload) -> Section {
    let lines = if payload.municipality_rankings.is_empty() {
        vec!["No registrations in this period.".to_string()]
    } else {
        payload
            .municipality_rankings
            .iter()
            .enumerate()
            .map(|(index, stat)| {
                format!(
                    "{}. {}: {} vehicles ({} active, {} expired), {} owners, {:.2}% licensed",
                    index + 1,
                    stat.name,
                    stat.total_vehicles,
                    stat.active_vehicles,
                    stat.expired_vehicles,
                    stat.total_owners,
                    stat.compliance_rate
                )
            })
            .collect()
    };
    Section::new("Municipality Rankings", lines)
}

fn compliance(payload: &ReportPayload) -> Section {
    let summary = &payload.compliance;
    let mut lines = vec![format!(
        "Overall compliance: {:.2}%",
        summary.overall_compliance_rate
    )];
    if let Some(top) = &summary.top_compliance_municipality {
        lines.push(format!(
            "Top compliance: {} ({:.2}%)",
            top.municipality, top.compliance_rate
        ));
    }
    if let Some(need) = &summary.highest_need_area {
        lines.push(format!(
            "Highest need: {} (need score {:.2})",
            need.municipality, need.need_score
        ));
    }
    lines.push(format!(
        "Municipalities needing attention: {}",
        summary.municipalities_needing_attention
    ));
    Section::new("License Compliance", lines)
}

fn predictive(payload: &ReportPayload) -> Option<Section> {
    let block = payload.predictive.as_ref()?;
    let mut lines = vec![format!(
        "Predicted registrations over {} weeks: {}",
        block.weeks,
        format_prediction(block.total_predicted)
    )];
    for week in &block.weekly {
        lines.push(format!(
            "Week of {}: {}",
            week.week_start,
            format_prediction(week.predicted)
        ));
    }
    if !block.caravan_priority.is_empty() {
        lines.push("Caravan priority (lowest predicted first):".to_string());
        for entry in &block.caravan_priority {
            lines.push(format!(
                "{}. {} ({})",
                entry.rank,
                entry.municipality,
                format_prediction(entry.predicted_registrations)
            ));
        }
    }
    Some(Section::new("Predictive Insights", lines))
}
