//! Apify actor invocation: start a run, poll to completion, fetch the
//! dataset items, and resolve the vendor-reported cost.

pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{ActorRun, RunData};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Anything that can execute a vendor actor and hand back its dataset.
/// The orchestrator depends on this trait so steps can be exercised with
/// canned items in tests.
#[async_trait]
pub trait ActorInvoker: Send + Sync {
    async fn run_actor(&self, actor_id: &str, input: JsonValue) -> Result<ActorRun>;
}

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Start an actor run. Returns immediately with run metadata.
    async fn start_run(&self, actor_id: &str, input: &JsonValue) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", BASE_URL, actor_path(actor_id));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient
    /// long-polling.
    async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        loop {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", BASE_URL, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(api_resp.data.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run. Items are heterogeneous
    /// per-actor JSON; normalization happens downstream.
    async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<JsonValue>> {
        let url = format!("{}/datasets/{}/items?format=json", BASE_URL, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<JsonValue> = resp.json().await?;
        Ok(items)
    }

    /// Fetch the billed cost of a completed run. Best-effort: billing
    /// lookups never fail an otherwise successful scrape.
    async fn run_cost(&self, run_id: &str, item_count: usize) -> f64 {
        let url = format!("{}/actor-runs/{}", BASE_URL, run_id);
        let resp = match self.client.get(&url).bearer_auth(&self.token).send().await {
            Ok(resp) => resp,
            Err(_) => return 0.0,
        };
        if !resp.status().is_success() {
            return 0.0;
        }
        match resp.json::<ApiResponse<RunData>>().await {
            Ok(api_resp) => api_resp.data.cost_usd(item_count),
            Err(_) => 0.0,
        }
    }
}

#[async_trait]
impl ActorInvoker for ApifyClient {
    async fn run_actor(&self, actor_id: &str, input: JsonValue) -> Result<ActorRun> {
        tracing::info!(actor_id, "Starting actor run");
        let run = self.start_run(actor_id, &input).await?;
        tracing::info!(run_id = %run.id, "Actor run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        let items = self.dataset_items(&completed.default_dataset_id).await?;
        let cost_usd = self.run_cost(&completed.id, items.len()).await;
        tracing::info!(count = items.len(), cost_usd, "Fetched actor dataset");

        Ok(ActorRun {
            run_id: completed.id,
            items,
            cost_usd,
        })
    }
}

/// Apify addresses `user/actor-name` actors as `user~actor-name` in URLs.
fn actor_path(actor_id: &str) -> String {
    actor_id.replace('/', "~")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_path_escapes_owner_separator() {
        assert_eq!(
            actor_path("harvestapi/linkedin-profile-posts"),
            "harvestapi~linkedin-profile-posts"
        );
        assert_eq!(actor_path("nH2AHrwxeTRJoN5hX"), "nH2AHrwxeTRJoN5hX");
    }
}
