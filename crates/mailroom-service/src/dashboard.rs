//! Dashboard read projection.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

use mailroom_core::result::AppResult;
use mailroom_core::types::pagination::PageRequest;
use mailroom_database::repositories::package::{
    PackageFilters, PackageRepository, PackageSummary,
};
use mailroom_entity::package::PackageStatus;

/// How many packages the dashboard's recent list shows.
const RECENT_LIMIT: u64 = 10;

/// Aggregate numbers for the landing page.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// Package counts per lifecycle state (absent states count zero).
    pub status_counts: HashMap<String, u64>,
    /// Packages registered since midnight UTC.
    pub registered_today: u64,
    /// Most recently registered packages.
    pub recent: Vec<PackageSummary>,
}

/// Builds the dashboard projection over read handles.
#[derive(Clone)]
pub struct DashboardService {
    packages: PackageRepository,
}

impl DashboardService {
    /// Creates the service.
    pub fn new(packages: PackageRepository) -> Self {
        Self { packages }
    }

    /// The dashboard summary.
    pub async fn summary(&self) -> AppResult<DashboardSummary> {
        let mut status_counts: HashMap<String, u64> = PackageStatus::all()
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for (status, count) in self.packages.status_counts().await? {
            status_counts.insert(status.as_str().to_string(), count);
        }

        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);
        let registered_today = self.packages.count_created_since(midnight).await?;

        let recent = self
            .packages
            .search(PackageFilters::default(), PageRequest::new(1, RECENT_LIMIT))
            .await?
            .items;

        Ok(DashboardSummary {
            status_counts,
            registered_today,
            recent,
        })
    }
}
