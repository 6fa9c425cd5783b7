use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Actor run metadata, including the billing fields used to resolve cost.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "usageTotalUsd")]
    pub usage_total_usd: Option<f64>,
    #[serde(rename = "pricingInfo")]
    pub pricing_info: Option<PricingInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingInfo {
    #[serde(rename = "pricePerUnitUsd")]
    pub price_per_unit_usd: Option<f64>,
}

impl RunData {
    /// PAY_PER_EVENT actors report `usageTotalUsd` directly;
    /// PRICE_PER_DATASET_ITEM actors bill per item fetched.
    pub fn cost_usd(&self, item_count: usize) -> f64 {
        if let Some(usage) = self.usage_total_usd {
            return usage;
        }
        if let Some(price) = self
            .pricing_info
            .as_ref()
            .and_then(|p| p.price_per_unit_usd)
        {
            return price * item_count as f64;
        }
        0.0
    }
}

/// Result of one end-to-end actor invocation.
#[derive(Debug, Clone)]
pub struct ActorRun {
    pub run_id: String,
    pub items: Vec<JsonValue>,
    pub cost_usd: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_from(json: &str) -> RunData {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn pay_per_event_cost_comes_from_usage_total() {
        let run = run_from(
            r#"{"id":"r1","status":"SUCCEEDED","defaultDatasetId":"d1","usageTotalUsd":1.25}"#,
        );
        assert_eq!(run.cost_usd(40), 1.25);
    }

    #[test]
    fn per_item_cost_multiplies_by_item_count() {
        let run = run_from(
            r#"{"id":"r1","status":"SUCCEEDED","defaultDatasetId":"d1","pricingInfo":{"pricePerUnitUsd":0.002}}"#,
        );
        assert!((run.cost_usd(50) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn unknown_pricing_model_costs_zero() {
        let run = run_from(r#"{"id":"r1","status":"SUCCEEDED","defaultDatasetId":"d1"}"#);
        assert_eq!(run.cost_usd(10), 0.0);
    }
}
