use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use common::{Advisor, AdvisoryRequest, Config, Error, Recommendation, Result};

use crate::prompt::build_prompt;

const TEMPERATURE: f64 = 0.7;

/// Advisory client for Google's Gemini `generateContent` endpoint.
///
/// The model is asked for JSON matching [`response_schema`]; the text it
/// returns is parsed straight into a [`Recommendation`] without any range
/// checks.
pub struct GeminiAdvisor {
    api_key: Option<String>,
    model: String,
    base_url: String,
    http: Client,
}

impl GeminiAdvisor {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.advisor_api_key.clone(),
            cfg.advisor_model.clone(),
            cfg.advisor_base_url.clone(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Advisor for GeminiAdvisor {
    async fn recommend(&self, request: &AdvisoryRequest) -> Result<Recommendation> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("API key not configured for the advisory model".into()))?;

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": build_prompt(request) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
                "temperature": TEMPERATURE,
            },
        });

        debug!(model = %self.model, instrument = %request.instrument, "Calling advisory model");
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Advisor(format!("HTTP {status}: {text}")));
        }
        parse_response(&text)
    }
}

// ─── Response parsing ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Pull the recommendation JSON out of a `generateContent` response body.
pub fn parse_response(body: &str) -> Result<Recommendation> {
    let resp: GenerateResponse = serde_json::from_str(body)?;
    let text = resp
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .ok_or_else(|| Error::Advisor("model returned no content".into()))?;
    Ok(serde_json::from_str(text.trim())?)
}

/// JSON schema the model must answer with.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "strategyName": {
                "type": "STRING",
                "description": "A creative name for the trading strategy, e.g., 'Bullish Momentum Ride'."
            },
            "action": {
                "type": "STRING",
                "enum": ["BUY", "SELL", "HOLD"],
                "description": "The recommended trading action."
            },
            "confidence": {
                "type": "NUMBER",
                "description": "Confidence level for this strategy, from 0 to 100."
            },
            "entryPrice": { "type": "NUMBER", "description": "Suggested price to enter the trade." },
            "targetPrice": { "type": "NUMBER", "description": "Price target for taking profits." },
            "stopLoss": {
                "type": "NUMBER",
                "description": "Price at which to exit the trade to limit losses."
            },
            "reasoning": {
                "type": "STRING",
                "description": "A step-by-step explanation of the recommendation, covering market sentiment and the technical indicators."
            }
        },
        "required": [
            "strategyName", "action", "confidence", "entryPrice", "targetPrice", "stopLoss", "reasoning"
        ]
    })
}
