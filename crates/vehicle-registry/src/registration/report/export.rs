use super::payload::CsvRow;
use super::RenderError;

pub const CSV_COLUMNS: [&str; 18] = [
    "period_scope",
    "period_label",
    "municipality_name",
    "total_registrations",
    "active_registrations",
    "expired_registrations",
    "owners_with_license",
    "owners_without_license",
    "private_vehicles",
    "for_hire_vehicles",
    "government_vehicles",
    "plate_permanent",
    "plate_temporary",
    "overall_compliance_rate",
    "predicted_registrations",
    "is_peak_month",
    "caravan_priority_rank",
    "notes",
];

impl CsvRow {
    /// Cells in `CSV_COLUMNS` order.
    pub fn to_record(&self) -> [String; 18] {
        [
            self.period_scope.to_string(),
            self.period_label.clone(),
            self.municipality_name.clone(),
            self.total_registrations.to_string(),
            self.active_registrations.to_string(),
            self.expired_registrations.to_string(),
            self.owners_with_license.to_string(),
            self.owners_without_license.to_string(),
            self.private_vehicles.to_string(),
            self.for_hire_vehicles.to_string(),
            self.government_vehicles.to_string(),
            self.plate_permanent.to_string(),
            self.plate_temporary.to_string(),
            format!("{:.2}", self.overall_compliance_rate),
            self.predicted_registrations
                .map(format_prediction)
                .unwrap_or_default(),
            if self.is_peak_month { "yes" } else { "no" }.to_string(),
            self.caravan_priority_rank
                .map(|rank| rank.to_string())
                .unwrap_or_default(),
            self.notes.join("; "),
        ]
    }
}

pub(crate) fn format_prediction(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Header plus one line per row; an empty row list still yields the header.
pub fn encode_csv(rows: &[CsvRow]) -> Result<Vec<u8>, RenderError> {
    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }
    writer.flush()?;
    writer.into_inner().map_err(|err| {
        RenderError::Io(std::io::Error::new(err.error().kind(), err.error().to_string()))
    })
}
