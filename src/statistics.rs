//! Aggregate demand statistics queries

use reqwest::Method;

use iserve_protocol::api::{MonthlyCount, StatisticsQuery};

use crate::client::ApiClient;
use crate::error::Result;

/// Client for the monthly demand statistics endpoints
pub struct StatisticsService<'a, C: ApiClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: ApiClient + ?Sized> StatisticsService<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Monthly counts of created demands matching the query
    pub async fn monthly_creation(&self, query: &StatisticsQuery) -> Result<Vec<MonthlyCount>> {
        self.client
            .request_query(
                Method::GET,
                "/statistics/demand/creation/monthly",
                &query.to_query_pairs(),
            )
            .await
    }

    /// Monthly counts of demands that received responses, matching the query
    pub async fn monthly_responded(&self, query: &StatisticsQuery) -> Result<Vec<MonthlyCount>> {
        self.client
            .request_query(
                Method::GET,
                "/statistics/demand/responded/monthly",
                &query.to_query_pairs(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockApiClient;
    use crate::tests::utils::test_helpers::*;
    use serde_json::json;

    #[tokio::test]
    async fn monthly_creation_decodes_counts() {
        let temp_dir = create_temp_dir();
        let client = MockApiClient::new(test_client_config(&temp_dir));
        client.add_response(
            "/statistics/demand/creation/monthly",
            json!([
                {"month": "2024-01", "count": 6},
                {"month": "2024-02", "count": 2}
            ]),
        );

        let service = StatisticsService::new(&client);
        let counts = service
            .monthly_creation(&StatisticsQuery::default())
            .await
            .unwrap();

        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].month, "2024-01");
        assert_eq!(counts[0].count, 6);
    }

    #[tokio::test]
    async fn monthly_responded_sends_filter_pairs() {
        let temp_dir = create_temp_dir();
        let client = MockApiClient::new(test_client_config(&temp_dir));
        client.add_response("/statistics/demand/responded/monthly", json!([]));

        let query = StatisticsQuery {
            match_location_ids: vec![3, 5],
            match_service_type_ids: vec![1],
            ..StatisticsQuery::default()
        };

        let service = StatisticsService::new(&client);
        service.monthly_responded(&query).await.unwrap();

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].endpoint, "/statistics/demand/responded/monthly");
        assert_eq!(
            requests[0].query,
            vec![
                ("matchLocationIds".to_string(), "3".to_string()),
                ("matchLocationIds".to_string(), "5".to_string()),
                ("matchServiceTypeIds".to_string(), "1".to_string()),
            ]
        );
    }
}
