//! Demand and response store
//!
//! Holds the authoritative in-memory list of demands and service responses,
//! seeded from a fixed sample set until a real backend takes over, plus the
//! active filter parameters and their resulting projection. The dataset is
//! persisted under the `demand-storage` key in the same `{"state": ...}`
//! wrapper the session uses; filter state and pagination are transient.
//!
//! Filtering and search are pure projections: they never mutate the base
//! collection, and the only failure mode of any operation is "not found",
//! signalled by `None` or a no-op rather than an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use iserve_protocol::common::{
    Demand, DemandPatch, DemandStatus, ResponsePatch, ResponseStatus, ServiceResponse, ServiceType,
};

use crate::config::StorageConfig;
use crate::error::{IserveError, Result};

/// Input for creating a demand
#[derive(Debug, Clone)]
pub struct NewDemand {
    pub user_id: String,
    pub service_type: ServiceType,
    pub title: String,
    pub description: String,
    pub address: String,
}

/// Input for creating a service response
#[derive(Debug, Clone)]
pub struct NewResponse {
    pub demand_id: String,
    pub user_id: String,
    pub content: String,
}

/// Active page of the filtered projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub current: usize,
    pub page_size: usize,
    pub total: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current: 1,
            page_size: 10,
            total: 0,
        }
    }
}

/// One month of offline activity, for the overview table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyOverview {
    pub month: String,
    pub demand_count: u64,
    pub response_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DatasetState {
    demands: Vec<Demand>,
    service_responses: Vec<ServiceResponse>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedDataset {
    #[serde(default)]
    state: DatasetState,
}

/// Store for demands and service responses
#[derive(Debug)]
pub struct DemandStore {
    path: PathBuf,
    demands: Vec<Demand>,
    responses: Vec<ServiceResponse>,
    filtered: Vec<Demand>,
    current: Option<Demand>,
    filter_type: Option<ServiceType>,
    filter_user: Option<String>,
    search_keyword: String,
    pagination: Pagination,
    my_responses: Vec<ServiceResponse>,
    my_responses_user: Option<String>,
}

impl DemandStore {
    /// Open the store, loading the persisted dataset or seeding the sample set
    pub fn open(storage: &StorageConfig) -> Self {
        let path = storage.dataset_path();
        let state = Self::load(&path);

        let mut store = Self {
            path,
            demands: state.demands,
            responses: state.service_responses,
            filtered: Vec::new(),
            current: None,
            filter_type: None,
            filter_user: None,
            search_keyword: String::new(),
            pagination: Pagination::default(),
            my_responses: Vec::new(),
            my_responses_user: None,
        };
        store.apply_filters();
        store
    }

    fn load(path: &Path) -> DatasetState {
        if let Ok(content) = std::fs::read_to_string(path) {
            match serde_json::from_str::<PersistedDataset>(&content) {
                Ok(persisted) => return persisted.state,
                Err(err) => warn!("discarding malformed dataset storage: {}", err),
            }
        }

        DatasetState {
            demands: sample_demands(),
            service_responses: sample_responses(),
        }
    }

    /// Write the dataset out explicitly
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| IserveError::io_from_error("Dataset storage", e))?;
        }

        let persisted = PersistedDataset {
            state: DatasetState {
                demands: self.demands.clone(),
                service_responses: self.responses.clone(),
            },
        };
        let content = serde_json::to_string_pretty(&persisted)?;
        std::fs::write(&self.path, content)
            .map_err(|e| IserveError::io_from_error("Dataset storage", e))?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(err) = self.save() {
            warn!("failed to persist dataset: {}", err);
        }
    }

    // ---- Filtering ------------------------------------------------------

    /// Recompute the filtered projection from the base collection and the
    /// three filter parameters, in order: user, category, keyword
    fn apply_filters(&mut self) {
        let mut filtered: Vec<Demand> = self.demands.clone();

        if let Some(user) = &self.filter_user {
            let user_matched: Vec<Demand> = filtered
                .iter()
                .filter(|d| &d.user_id == user)
                .cloned()
                .collect();
            // A user with no demands sees the full list, not an empty one
            if !user_matched.is_empty() {
                filtered = user_matched;
            }
        }

        if let Some(service_type) = self.filter_type {
            filtered.retain(|d| d.service_type == service_type);
        }

        if !self.search_keyword.is_empty() {
            let keyword = self.search_keyword.to_lowercase();
            filtered.retain(|d| {
                d.title.to_lowercase().contains(&keyword)
                    || d.description.to_lowercase().contains(&keyword)
                    || d.address.to_lowercase().contains(&keyword)
            });
        }

        self.pagination.total = filtered.len();
        self.pagination.current = 1;
        self.filtered = filtered;
    }

    /// Filter by service category; `None` matches all
    pub fn filter_by_type(&mut self, service_type: Option<ServiceType>) {
        self.filter_type = service_type;
        self.apply_filters();
    }

    /// Filter by owning user; `None` matches all
    pub fn filter_by_user(&mut self, user_id: Option<String>) {
        self.filter_user = user_id;
        self.apply_filters();
    }

    /// Keyword search over title, description and address
    pub fn search(&mut self, keyword: &str) {
        self.search_keyword = keyword.to_string();
        self.apply_filters();
    }

    /// Clear all filter parameters
    pub fn reset_filters(&mut self) {
        self.filter_type = None;
        self.filter_user = None;
        self.search_keyword.clear();
        self.apply_filters();
    }

    pub fn demands(&self) -> &[Demand] {
        &self.demands
    }

    pub fn filtered(&self) -> &[Demand] {
        &self.filtered
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn set_page(&mut self, page: usize, page_size: usize) {
        self.pagination.current = page.max(1);
        self.pagination.page_size = page_size.max(1);
    }

    /// Slice of the filtered projection for the active page
    pub fn page(&self) -> &[Demand] {
        let start = (self.pagination.current - 1) * self.pagination.page_size;
        if start >= self.filtered.len() {
            return &[];
        }
        let end = (start + self.pagination.page_size).min(self.filtered.len());
        &self.filtered[start..end]
    }

    // ---- Demand CRUD ----------------------------------------------------

    /// Look up a demand and cache it as the current one
    pub fn get_by_id(&mut self, id: &str) -> Option<Demand> {
        let demand = self.demands.iter().find(|d| d.id == id).cloned();
        self.current = demand.clone();
        demand
    }

    pub fn current(&self) -> Option<&Demand> {
        self.current.as_ref()
    }

    /// Create a demand with a fresh identity, both timestamps set to now and
    /// status defaulted to pending
    pub fn create(&mut self, input: NewDemand) -> Demand {
        let now = Utc::now();
        let demand = Demand {
            id: next_id(self.demands.iter().map(|d| d.id.as_str())),
            user_id: input.user_id,
            service_type: input.service_type,
            title: input.title,
            description: input.description,
            address: input.address,
            status: DemandStatus::Pending,
            create_time: now,
            update_time: now,
        };

        self.demands.push(demand.clone());
        self.apply_filters();
        self.persist();
        demand
    }

    /// Merge patch fields into a demand, refreshing its update timestamp
    ///
    /// Returns `None` when the id is unknown. Keeps the current-demand cache
    /// consistent so detail views need no re-fetch.
    pub fn update(&mut self, id: &str, patch: &DemandPatch) -> Option<Demand> {
        let demand = self.demands.iter_mut().find(|d| d.id == id)?;

        if let Some(service_type) = patch.service_type {
            demand.service_type = service_type;
        }
        if let Some(title) = &patch.title {
            demand.title = title.clone();
        }
        if let Some(description) = &patch.description {
            demand.description = description.clone();
        }
        if let Some(address) = &patch.address {
            demand.address = address.clone();
        }
        if let Some(status) = patch.status {
            demand.status = status;
        }
        demand.update_time = Utc::now();

        let updated = demand.clone();
        self.apply_filters();

        if self.current.as_ref().is_some_and(|c| c.id == id) {
            self.current = Some(updated.clone());
        }

        self.persist();
        Some(updated)
    }

    /// Remove a demand; unknown ids are a no-op
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.demands.len();
        self.demands.retain(|d| d.id != id);

        if self.demands.len() == before {
            return false;
        }

        self.apply_filters();

        if self.current.as_ref().is_some_and(|c| c.id == id) {
            self.current = None;
        }

        self.persist();
        true
    }

    // ---- Service responses ----------------------------------------------

    /// Project a response with a fresh view of its parent demand
    ///
    /// The denormalized fields are recomputed on every read; `None` marks a
    /// demand that no longer exists.
    fn project_response(&self, response: &ServiceResponse) -> ServiceResponse {
        let demand = self.demands.iter().find(|d| d.id == response.demand_id);

        let mut projected = response.clone();
        projected.demand_title = demand.map(|d| d.title.clone());
        projected.service_type = demand.map(|d| d.service_type);
        projected.demand_status = demand.map(|d| d.status);
        projected
    }

    fn refresh_my_responses(&mut self, user_id: &str) {
        let projected: Vec<ServiceResponse> = self
            .responses
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| self.project_response(r))
            .collect();

        self.my_responses = projected;
        self.my_responses_user = Some(user_id.to_string());
    }

    /// All responses submitted by a user, each carrying a fresh projection of
    /// its parent demand
    pub fn list_my_responses(&mut self, user_id: &str) -> Vec<ServiceResponse> {
        self.refresh_my_responses(user_id);
        self.my_responses.clone()
    }

    pub fn my_responses(&self) -> &[ServiceResponse] {
        &self.my_responses
    }

    /// Create a response to a demand
    pub fn create_response(&mut self, input: NewResponse) -> ServiceResponse {
        let response = ServiceResponse {
            id: next_id(self.responses.iter().map(|r| r.id.as_str())),
            demand_id: input.demand_id,
            user_id: input.user_id.clone(),
            content: input.content,
            status: ResponseStatus::PendingReview,
            response_time: Utc::now(),
            demand_title: None,
            service_type: None,
            demand_status: None,
        };
        let projected = self.project_response(&response);

        self.responses.push(projected.clone());
        self.refresh_my_responses(&input.user_id);
        self.persist();
        projected
    }

    /// Merge patch fields into a response; `None` when the id is unknown
    pub fn update_response(&mut self, id: &str, patch: &ResponsePatch) -> Option<ServiceResponse> {
        let response = self.responses.iter_mut().find(|r| r.id == id)?;

        if let Some(content) = &patch.content {
            response.content = content.clone();
        }
        if let Some(status) = patch.status {
            response.status = status;
        }

        let user_id = response.user_id.clone();
        let updated_id = response.id.clone();

        self.refresh_my_responses(&user_id);
        self.persist();

        self.responses
            .iter()
            .find(|r| r.id == updated_id)
            .map(|r| self.project_response(r))
    }

    /// Remove a response; unknown ids are a no-op
    pub fn delete_response(&mut self, id: &str) -> bool {
        let Some(user_id) = self
            .responses
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.user_id.clone())
        else {
            return false;
        };

        self.responses.retain(|r| r.id != id);
        self.refresh_my_responses(&user_id);
        self.persist();
        true
    }

    // ---- Aggregation ----------------------------------------------------

    /// Offline monthly activity counts, grouped by `YYYY-MM`
    pub fn monthly_overview(&self) -> Vec<MonthlyOverview> {
        let mut months: BTreeMap<String, (u64, u64)> = BTreeMap::new();

        for demand in &self.demands {
            let month = demand.create_time.format("%Y-%m").to_string();
            months.entry(month).or_default().0 += 1;
        }
        for response in &self.responses {
            let month = response.response_time.format("%Y-%m").to_string();
            months.entry(month).or_default().1 += 1;
        }

        months
            .into_iter()
            .map(|(month, (demand_count, response_count))| MonthlyOverview {
                month,
                demand_count,
                response_count,
            })
            .collect()
    }
}

/// Next identity for a collection of string ids
///
/// Ids are decimal strings; the next one is one past the numeric maximum.
fn next_id<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let max = ids.filter_map(|id| id.parse::<u64>().ok()).max().unwrap_or(0);
    (max + 1).to_string()
}

fn seed_time(raw: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Sample demands used until a real backend takes over
fn sample_demands() -> Vec<Demand> {
    let demand = |id: &str,
                  user_id: &str,
                  service_type: ServiceType,
                  title: &str,
                  description: &str,
                  status: DemandStatus,
                  created: &str,
                  updated: &str,
                  address: &str| Demand {
        id: id.to_string(),
        user_id: user_id.to_string(),
        service_type,
        title: title.to_string(),
        description: description.to_string(),
        address: address.to_string(),
        status,
        create_time: seed_time(created),
        update_time: seed_time(updated),
    };

    vec![
        demand(
            "1",
            "user-1",
            ServiceType::PipeRepair,
            "Bathroom pipe leaking",
            "The drain pipe under the bathroom sink is leaking badly and needs repair",
            DemandStatus::Pending,
            "2024-01-15T10:30:00Z",
            "2024-01-15T10:30:00Z",
            "Room 502, Unit 3, Building 1, Harmony Court",
        ),
        demand(
            "2",
            "user-2",
            ServiceType::ElderCare,
            "Companion care for an elderly resident",
            "Companion care needed on Monday, Wednesday and Friday afternoons",
            DemandStatus::InProgress,
            "2024-01-14T14:20:00Z",
            "2024-01-15T09:15:00Z",
            "Room 301, Unit 2, Building 2, Sunshine Homes",
        ),
        demand(
            "3",
            "user-1",
            ServiceType::Cleaning,
            "Whole-home deep clean",
            "Deep cleaning for the whole flat, including kitchen and bathroom",
            DemandStatus::Completed,
            "2024-01-13T09:10:00Z",
            "2024-01-14T16:45:00Z",
            "Room 201, Unit 1, Building 3, Concord Community",
        ),
        demand(
            "4",
            "user-3",
            ServiceType::MedicalEscort,
            "Hospital visit escort",
            "Escort an elderly resident to hospital, help with registration and prescriptions",
            DemandStatus::Pending,
            "2024-01-15T08:45:00Z",
            "2024-01-15T08:45:00Z",
            "Room 602, Unit 5, Building 4, Serenity Court",
        ),
        demand(
            "5",
            "user-1",
            ServiceType::MealDelivery,
            "Daily meals for an elderly resident",
            "Daily nutritious meal delivery needed for an elderly resident",
            DemandStatus::InProgress,
            "2024-01-12T11:20:00Z",
            "2024-01-14T10:30:00Z",
            "Room 401, Unit 3, Building 5, Longevity Garden",
        ),
        demand(
            "6",
            "user-2",
            ServiceType::SchoolPickup,
            "School run for a child",
            "Daily pick-up and drop-off for a primary school child",
            DemandStatus::Completed,
            "2024-01-11T16:15:00Z",
            "2024-01-13T17:20:00Z",
            "Near Hope Primary School",
        ),
    ]
}

fn sample_responses() -> Vec<ServiceResponse> {
    vec![
        ServiceResponse {
            id: "1".to_string(),
            demand_id: "1".to_string(),
            user_id: "user-2".to_string(),
            content: "I have three years of pipe repair experience and can come tomorrow afternoon"
                .to_string(),
            status: ResponseStatus::PendingReview,
            response_time: seed_time("2024-01-15T11:00:00Z"),
            demand_title: Some("Bathroom pipe leaking".to_string()),
            service_type: Some(ServiceType::PipeRepair),
            demand_status: Some(DemandStatus::Pending),
        },
        ServiceResponse {
            id: "2".to_string(),
            demand_id: "4".to_string(),
            user_id: "user-1".to_string(),
            content: "I can escort hospital visits and have years of experience caring for the elderly"
                .to_string(),
            status: ResponseStatus::Accepted,
            response_time: seed_time("2024-01-15T09:00:00Z"),
            demand_title: Some("Hospital visit escort".to_string()),
            service_type: Some(ServiceType::MedicalEscort),
            demand_status: Some(DemandStatus::Pending),
        },
    ]
}
