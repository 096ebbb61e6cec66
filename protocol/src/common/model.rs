//! Domain model types for the iServe platform
//!
//! This module contains the core entities shared across endpoints: service
//! demands, service responses, user profiles, and uploaded file records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Enumerations
// ============================================================================

/// Fixed set of service categories a demand can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    PipeRepair,
    ElderCare,
    Cleaning,
    MedicalEscort,
    MealDelivery,
    SchoolPickup,
}

impl ServiceType {
    /// Every known service type, in display order
    pub const ALL: [ServiceType; 6] = [
        ServiceType::PipeRepair,
        ServiceType::ElderCare,
        ServiceType::Cleaning,
        ServiceType::MedicalEscort,
        ServiceType::MealDelivery,
        ServiceType::SchoolPickup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::PipeRepair => "pipe-repair",
            ServiceType::ElderCare => "elder-care",
            ServiceType::Cleaning => "cleaning",
            ServiceType::MedicalEscort => "medical-escort",
            ServiceType::MealDelivery => "meal-delivery",
            ServiceType::SchoolPickup => "school-pickup",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown service type: {}", s))
    }
}

/// Lifecycle status of a demand
///
/// Any status may follow any other on the client; transition legality is
/// enforced server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemandStatus {
    Pending,
    InProgress,
    Completed,
}

impl DemandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemandStatus::Pending => "pending",
            DemandStatus::InProgress => "in-progress",
            DemandStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for DemandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DemandStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DemandStatus::Pending),
            "in-progress" => Ok(DemandStatus::InProgress),
            "completed" => Ok(DemandStatus::Completed),
            other => Err(format!("unknown demand status: {}", other)),
        }
    }
}

/// Review status of a service response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseStatus {
    PendingReview,
    Accepted,
    Rejected,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::PendingReview => "pending-review",
            ResponseStatus::Accepted => "accepted",
            ResponseStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ResponseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending-review" => Ok(ResponseStatus::PendingReview),
            "accepted" => Ok(ResponseStatus::Accepted),
            "rejected" => Ok(ResponseStatus::Rejected),
            other => Err(format!("unknown response status: {}", other)),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A posted service demand
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demand {
    pub id: String,
    pub user_id: String,
    pub service_type: ServiceType,
    pub title: String,
    pub description: String,
    pub address: String,
    pub status: DemandStatus,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Fields of a demand that can change after creation
#[derive(Debug, Clone, Default)]
pub struct DemandPatch {
    pub service_type: Option<ServiceType>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub status: Option<DemandStatus>,
}

/// A user's response offering to fulfil a demand
///
/// `demand_title`, `service_type` and `demand_status` are projections of the
/// referenced demand, recomputed on every read. `None` means the demand no
/// longer exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: String,
    pub demand_id: String,
    pub user_id: String,
    pub content: String,
    pub status: ResponseStatus,
    pub response_time: DateTime<Utc>,
    #[serde(default)]
    pub demand_title: Option<String>,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
    #[serde(default)]
    pub demand_status: Option<DemandStatus>,
}

/// Fields of a service response that can change after creation
#[derive(Debug, Clone, Default)]
pub struct ResponsePatch {
    pub content: Option<String>,
    pub status: Option<ResponseStatus>,
}

/// Profile of a registered user
///
/// All contact fields are optional; the backend omits what it does not know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    /// The backend reports numeric ids, the offline dataset uses strings;
    /// both decode to the string form
    #[serde(deserialize_with = "flexible_id")]
    pub id: Option<String>,
    pub username: String,
    pub real_name: Option<String>,
    pub phone: Option<String>,
    pub biography: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Minimal profile used when the server returns no user information
    pub fn placeholder(username: &str) -> Self {
        UserProfile {
            username: username.to_string(),
            ..UserProfile::default()
        }
    }
}

fn flexible_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Text(String),
        Number(serde_json::Number),
    }

    let id = Option::<IdRepr>::deserialize(deserializer)?;
    Ok(id.map(|id| match id {
        IdRepr::Text(text) => text,
        IdRepr::Number(number) => number.to_string(),
    }))
}

/// Server-side record of an uploaded attachment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: u64,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub rel_path: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_round_trips_through_str() {
        for ty in ServiceType::ALL {
            assert_eq!(ty.as_str().parse::<ServiceType>().unwrap(), ty);
        }
        assert!("plumbing".parse::<ServiceType>().is_err());
    }

    #[test]
    fn statuses_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&DemandStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::to_string(&ResponseStatus::PendingReview).unwrap(),
            "\"pending-review\""
        );
    }

    #[test]
    fn user_profile_tolerates_sparse_json() {
        let profile: UserProfile = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(profile.username, "alice");
        assert!(profile.id.is_none());
        assert!(profile.email.is_none());
    }

    #[test]
    fn user_profile_accepts_numeric_and_string_ids() {
        let numeric: UserProfile =
            serde_json::from_str(r#"{"id":7,"username":"alice"}"#).unwrap();
        assert_eq!(numeric.id.as_deref(), Some("7"));

        let text: UserProfile =
            serde_json::from_str(r#"{"id":"user-1","username":"bob"}"#).unwrap();
        assert_eq!(text.id.as_deref(), Some("user-1"));
    }
}
