use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use std::time::Duration;

/// The endpoint takes positional JSON data: the new input first, then the
/// prior history as (user, assistant) pairs. Serialized as nested arrays.
#[derive(Serialize)]
struct PredictRequest {
    data: (String, Vec<(String, String)>),
}

#[derive(Deserialize)]
struct PredictResponse {
    data: Vec<String>,
}

#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    endpoint: String,
}

impl InferenceClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Sends one turn to the inference endpoint and returns the reply text.
    pub async fn predict(&self, input: &str, history: Vec<(String, String)>) -> Result<String> {
        let request = PredictRequest {
            data: (input.to_string(), history),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(Duration::from_secs(60))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "predict request to {} failed with status: {}",
                self.endpoint,
                response.status()
            ));
        }

        let predict_response: PredictResponse = response.json().await?;
        extract_reply(predict_response)
    }
}

/// The reply sits at the first position of the response data array.
fn extract_reply(response: PredictResponse) -> Result<String> {
    response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("response data array was empty"))
}
