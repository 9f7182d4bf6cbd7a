//! One-shot GraphQL queries over HTTPS.

use crate::error::ClientError;
use powerctl_protocol::query::{HOMES_QUERY, PRICES_QUERY};
use powerctl_protocol::{GraphQlRequest, GraphQlResponse, Home, PriceInfo, GRAPHQL_ENDPOINT, USER_AGENT};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Request timeout for one-shot queries.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: Viewer,
}

#[derive(Debug, Deserialize)]
struct Viewer {
    #[serde(default)]
    homes: Vec<Home>,
}

/// Client for the Tibber GraphQL HTTP endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphQlClient {
    pub fn new(token: &str) -> Result<Self, ClientError> {
        Self::with_endpoint(token, GRAPHQL_ENDPOINT)
    }

    pub fn with_endpoint(token: &str, endpoint: impl Into<String>) -> Result<Self, ClientError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Executes a request and deserializes its `data` member.
    pub async fn execute<T: DeserializeOwned>(&self, request: &GraphQlRequest) -> Result<T, ClientError> {
        tracing::debug!("POST {}", self.endpoint);
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GraphQlResponse = serde_json::from_str(&body)?;
        if let Some(message) = parsed.first_error() {
            return Err(ClientError::GraphQl(message.to_string()));
        }
        let data = parsed.data.filter(|d| !d.is_null()).ok_or(ClientError::MissingData)?;
        Ok(serde_json::from_value(data)?)
    }

    /// All homes of the token's owner.
    pub async fn homes(&self) -> Result<Vec<Home>, ClientError> {
        let data: ViewerData = self.execute(&GraphQlRequest::new(HOMES_QUERY)).await?;
        tracing::debug!("Fetched {} home(s)", data.viewer.homes.len());
        Ok(data.viewer.homes)
    }

    /// Price information for `home_id`, or for the first home that has any.
    pub async fn prices(&self, home_id: Option<&str>) -> Result<PriceInfo, ClientError> {
        let data: ViewerData = self.execute(&GraphQlRequest::new(PRICES_QUERY)).await?;
        select_price_info(data.viewer.homes, home_id)
    }

    /// The first home with real-time consumption enabled.
    pub async fn live_capable_home(&self) -> Result<Option<Home>, ClientError> {
        Ok(self.homes().await?.into_iter().find(Home::is_live_capable))
    }
}

fn select_price_info(homes: Vec<Home>, home_id: Option<&str>) -> Result<PriceInfo, ClientError> {
    homes
        .into_iter()
        .filter(|home| home_id.map_or(true, |id| home.id == id))
        .find_map(|home| home.current_subscription.and_then(|s| s.price_info))
        .ok_or(ClientError::NoPriceInfo)
}
