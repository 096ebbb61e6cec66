//! Statistics API DTOs

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Filter parameters for the monthly demand statistics endpoints
///
/// List parameters are sent as repeated query keys; time bounds as RFC 3339.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsQuery {
    pub match_location_ids: Vec<u64>,
    pub match_service_type_ids: Vec<u64>,
    pub earliest_create_time: Option<DateTime<Utc>>,
    pub latest_create_time: Option<DateTime<Utc>>,
}

impl StatisticsQuery {
    /// Flatten into query pairs, repeating list keys per element
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for id in &self.match_location_ids {
            pairs.push(("matchLocationIds".to_string(), id.to_string()));
        }
        for id in &self.match_service_type_ids {
            pairs.push(("matchServiceTypeIds".to_string(), id.to_string()));
        }
        if let Some(t) = &self.earliest_create_time {
            pairs.push((
                "earliestCreateTime".to_string(),
                t.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        if let Some(t) = &self.latest_create_time {
            pairs.push((
                "latestCreateTime".to_string(),
                t.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        pairs
    }
}

/// One month's worth of aggregated demand activity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    /// Month in `YYYY-MM` form
    pub month: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn query_pairs_repeat_list_keys() {
        let query = StatisticsQuery {
            match_location_ids: vec![1, 2],
            match_service_type_ids: vec![7],
            earliest_create_time: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            latest_create_time: None,
        };

        let pairs = query.to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("matchLocationIds".to_string(), "1".to_string()),
                ("matchLocationIds".to_string(), "2".to_string()),
                ("matchServiceTypeIds".to_string(), "7".to_string()),
                (
                    "earliestCreateTime".to_string(),
                    "2024-01-01T00:00:00Z".to_string()
                ),
            ]
        );
    }
}
