//! End-to-end scenarios through the public report service: records in, artifacts out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;

use vehicle_registry::config::ForecastConfig;
use vehicle_registry::registration::forecast::WeeklyPrediction;
use vehicle_registry::registration::{
    FixedClock, Forecast, ForecastError, ForecastQuery, ForecastSource, InMemoryRecordSource,
    PlateStatusResolver, PredictiveInsightsClient, RegistrationReportService, RegistrationStatus,
    ReportFilters, ReportFormat, ReportRequest, VehicleRecord, VehicleStatusType,
};

fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid date")
}

fn vehicle(plate: &str, owner: &str, licensed: bool, town: &str) -> VehicleRecord {
    serde_json::from_value(json!({
        "plateNumber": plate,
        "classification": "Private",
        "renewalHistory": [{ "date": "2025-10-03" }, "2024-10-01"],
        "vehicleStatusType": "Old",
        "owner": {
            "_id": owner,
            "fullName": "Registered Owner",
            "hasDriversLicense": licensed,
            "address": { "barangay": "San Isidro", "municipality": town, "province": "Catanduanes" }
        }
    }))
    .expect("record parses")
}

/// Virac: 10 vehicles, 4 of 10 owners licensed. Bato: 5 vehicles, 1 of 5 licensed.
fn two_municipalities() -> Vec<VehicleRecord> {
    let mut records = Vec::new();
    for index in 0..5 {
        records.push(vehicle(
            &format!("BTO{index}11"),
            &format!("bato-{index}"),
            index == 0,
            "Bato",
        ));
    }
    for index in 0..10 {
        records.push(vehicle(
            &format!("VRC{index}11"),
            &format!("virac-{index}"),
            index < 4,
            "virac",
        ));
    }
    records
}

fn service(records: Vec<VehicleRecord>) -> RegistrationReportService<InMemoryRecordSource> {
    RegistrationReportService::new(
        Arc::new(InMemoryRecordSource::new(records)),
        Arc::new(FixedClock(at(2025, 10, 18))),
    )
}

#[tokio::test]
async fn csv_export_ranks_by_volume_and_flags_low_compliance() {
    let request = ReportRequest {
        filters: ReportFilters::default(),
        format: ReportFormat::Csv,
        actor: Some("lto-virac".to_string()),
    };

    let artifact = service(two_municipalities())
        .generate(&request)
        .await
        .expect("csv export succeeds");
    assert_eq!(artifact.filename, "registration-data-monthly-october-2025.csv");

    let text = String::from_utf8(artifact.bytes).expect("utf-8 csv");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "period_scope,period_label,municipality_name,total_registrations,active_registrations,expired_registrations,owners_with_license,owners_without_license,private_vehicles,for_hire_vehicles,government_vehicles,plate_permanent,plate_temporary,overall_compliance_rate,predicted_registrations,is_peak_month,caravan_priority_rank,notes",
            "monthly,October 2025,VIRAC,10,10,0,4,6,10,0,0,10,0,40.00,,yes,,Below 50% compliance",
            "monthly,October 2025,BATO,5,5,0,1,4,5,0,0,5,0,20.00,,yes,,Below 50% compliance",
        ]
    );
}

#[tokio::test]
async fn payload_carries_compliance_and_trend_sections() {
    let payload = service(two_municipalities())
        .build_payload(&ReportRequest::default())
        .await
        .expect("payload builds");

    assert_eq!(payload.kpis.total_vehicles, 15);
    assert_eq!(payload.kpis.owners_with_license, 5);
    assert_eq!(payload.compliance.overall_compliance_rate, 33.33);
    assert_eq!(payload.compliance.municipalities_needing_attention, 2);
    let top = payload
        .compliance
        .top_compliance_municipality
        .as_ref()
        .expect("top municipality");
    assert_eq!(top.municipality, "VIRAC");
    assert_eq!(
        payload
            .compliance
            .highest_need_area
            .as_ref()
            .map(|need| need.need_score),
        Some(80.0)
    );
    assert_eq!(payload.trends.peak_month.as_ref().map(|p| p.label.as_str()), Some("October 2025"));
    assert_eq!(
        payload.notes,
        vec!["2 municipalities below 50% license compliance.".to_string()]
    );
}

struct StubForecasts;

#[async_trait]
impl ForecastSource for StubForecasts {
    async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast, ForecastError> {
        let predicted = match query.municipality.as_deref() {
            None => 64.0,
            Some("VIRAC") => 21.0,
            Some("BATO") => 3.0,
            Some("PANDAN") => 9.0,
            Some(_) => return Err(ForecastError::Status(404)),
        };
        Ok(Forecast {
            weekly: vec![WeeklyPrediction {
                week_start: "2025-10-20".to_string(),
                predicted,
            }],
        })
    }
}

#[tokio::test]
async fn forecasts_fill_caravan_columns() {
    let config = ForecastConfig {
        base_url: None,
        timeout: Duration::from_secs(2),
        weeks: 4,
        concurrency: 4,
    };
    let service = service(two_municipalities())
        .with_predictive(PredictiveInsightsClient::new(Arc::new(StubForecasts), &config));

    let payload = service
        .build_payload(&ReportRequest::default())
        .await
        .expect("payload builds");
    let block = payload.predictive.as_ref().expect("predictive block");
    assert_eq!(block.total_predicted, 64.0);
    let ranking: Vec<&str> = block
        .caravan_priority
        .iter()
        .map(|entry| entry.municipality.as_str())
        .collect();
    assert_eq!(ranking, vec!["BATO", "PANDAN", "VIRAC"]);

    let virac = &payload.csv_rows[0];
    assert_eq!(virac.municipality_name, "VIRAC");
    assert_eq!(virac.predicted_registrations, Some(21.0));
    assert_eq!(virac.caravan_priority_rank, Some(3));

    let document = service
        .generate(&ReportRequest::default())
        .await
        .expect("document renders");
    let text = String::from_utf8(document.bytes).expect("utf-8");
    assert!(text.contains("Predictive Insights"));
    assert!(text.contains("1. BATO (3)"));
}

#[test]
fn plate_scenarios_resolve_expected_expirations() {
    let resolver = PlateStatusResolver::at(at(2025, 10, 20));
    let july = resolver
        .resolve("AL3127", Some(at(2025, 10, 3)), VehicleStatusType::Old)
        .expect("plate resolves");
    assert_eq!(july.week_label, "First Week");
    assert_eq!(july.month_label, "July");
    assert_eq!(july.expires_at, at(2026, 7, 8));
    assert_eq!(july.status, RegistrationStatus::Active);
    assert_eq!(july.status_code, "1");

    let resolver = PlateStatusResolver::at(at(2025, 11, 20));
    let october = resolver
        .resolve("250LNV", Some(at(2025, 6, 5)), VehicleStatusType::Old)
        .expect("plate resolves");
    assert_eq!(october.last_two_digits, "50");
    assert_eq!(october.month_label, "October");
    assert_eq!(october.expires_at, at(2026, 10, 15));
}

#[test]
fn dashboard_filters_by_license_status() {
    let filters = ReportFilters {
        license_status: vehicle_registry::registration::LicenseStatusFilter::WithLicense,
        ..ReportFilters::default()
    };
    let dashboard = service(two_municipalities())
        .dashboard(&filters)
        .expect("dashboard builds");
    assert_eq!(dashboard.kpis.total_vehicles, 5);
    assert_eq!(dashboard.kpis.overall_compliance_rate, 100.0);
    assert!(dashboard.bottom_municipalities.len() <= 5);
}
