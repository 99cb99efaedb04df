//! Package reports and CSV export.
//!
//! The projection joins packages with recipient and creator names; export
//! renders it as CSV and audits the generation. CSV quoting follows RFC
//! 4180: fields containing commas, quotes, or newlines are quoted with
//! inner quotes doubled.

use serde_json::json;

use mailroom_core::result::AppResult;
use mailroom_database::audit::AuditSink;
use mailroom_database::repositories::package::{ExportRow, PackageFilters, PackageRepository};
use mailroom_entity::audit::AuthEventKind;
use mailroom_entity::user::User;

const EXPORT_HEADER: &str =
    "tracking_no,carrier,recipient,department,status,registered_by,created_at,updated_at";

/// Report generation over the package projection.
#[derive(Clone)]
pub struct ReportService {
    packages: PackageRepository,
    audit: AuditSink,
}

impl ReportService {
    /// Creates the service.
    pub fn new(packages: PackageRepository, audit: AuditSink) -> Self {
        Self { packages, audit }
    }

    /// Report rows for the preview surface.
    pub async fn preview(&self, filters: PackageFilters) -> AppResult<Vec<ExportRow>> {
        self.packages.export_rows(filters).await
    }

    /// Renders the filtered report as CSV and records `export_generated`.
    pub async fn export_csv(
        &self,
        filters: PackageFilters,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<String> {
        let rows = self.packages.export_rows(filters).await?;

        let mut csv = String::with_capacity(rows.len() * 96 + EXPORT_HEADER.len() + 1);
        csv.push_str(EXPORT_HEADER);
        csv.push('\n');
        for row in &rows {
            let created_at = row.created_at.to_rfc3339();
            let updated_at = row.updated_at.to_rfc3339();
            let fields = [
                row.tracking_no.as_str(),
                row.carrier.as_str(),
                row.recipient_name.as_str(),
                row.recipient_department.as_str(),
                row.status.as_str(),
                row.created_by_name.as_str(),
                created_at.as_str(),
                updated_at.as_str(),
            ];
            let line: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
            csv.push_str(&line.join(","));
            csv.push('\n');
        }

        self.audit
            .record(
                AuthEventKind::ExportGenerated,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({ "rows": rows.len() })),
            )
            .await;

        Ok(csv)
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
