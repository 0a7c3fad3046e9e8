//! HTTP analyzer over a `generateContent`-style endpoint.

use super::{parse_structured, Analyzer, Insights, Mentorship, ReceiptExtraction, Recommendation};
use crate::config::AiConfig;
use crate::error::{Error, Result};
use crate::finance::StrategyScenario;
use crate::model::Transaction;
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default [`Analyzer`]: one request per call, explicit timeout, no retries.
pub struct HttpAnalyzer {
    client: reqwest::Client,
    config: AiConfig,
}

impl HttpAnalyzer {
    #[must_use]
    pub fn new(config: AiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Build from the environment and `~/.aurafin/config.json`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the config file is unreadable or no API key is set.
    pub fn from_env() -> Result<Self> {
        let config = AiConfig::resolve()?;
        if config.api_key.is_none() {
            return Err(Error::Config(
                "no AI API key configured (set AURAFIN_AI_KEY or ai.api_key)".into(),
            ));
        }
        Ok(Self::new(config))
    }

    async fn generate(&self, parts: Vec<Part<'_>>, json: bool) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );

        let request = GenerateRequest {
            contents: [Content { parts }],
            generation_config: json.then_some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        let mut builder = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("x-goog-api-key", key);
        }

        debug!(model = %self.config.model, "Sending generateContent request");

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("AI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("AI request returned {status}: {body}")));
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedUpstream(format!("Failed to parse AI response: {e}")))?;

        let text: String = data
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: String },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn text(s: String) -> Part<'static> {
    Part::Text { text: s }
}

impl Analyzer for HttpAnalyzer {
    async fn suggest_tip(&self, balance: f64, expenses: f64) -> Result<String> {
        let prompt = format!(
            "User current balance: {balance:.2}. Monthly expenses so far: {expenses:.2}. \
             Give a short, encouraging financial tip (max 2 sentences) in Portuguese."
        );
        self.generate(vec![text(prompt)], false).await
    }

    async fn mentorship(&self, scenario: &StrategyScenario) -> Result<Mentorship> {
        let prompt = format!(
            "Analise o cenário financeiro a seguir e forneça uma mentoria estratégica em Português. \
             Cenário: {}. Responda em JSON com as chaves priority_list (lista), loan_advice, \
             behavioral_tips (lista), action_plan (lista de 3 passos) e mentorship_note.",
            serde_json::to_string(scenario)?
        );
        let raw = self.generate(vec![text(prompt)], true).await?;
        parse_structured(&raw, "mentorship")
    }

    async fn investment_recommendations(&self, amount: f64) -> Result<Vec<Recommendation>> {
        let prompt = format!(
            "O usuário quer investir R$ {amount:.2} este mês. Considerando o cenário econômico \
             brasileiro atual, sugira 3 opções de investimento. Responda com uma lista JSON de \
             objetos com as chaves name, risk, expectedReturn e description."
        );
        let raw = self.generate(vec![text(prompt)], true).await?;
        parse_structured(&raw, "investment recommendations")
    }

    async fn analyze_finance(&self, transactions: &[Transaction]) -> Result<Insights> {
        let prompt = format!(
            "Analyze the following financial data and provide insights:\n{}",
            serde_json::to_string_pretty(transactions)?
        );
        let insights = self.generate(vec![text(prompt)], false).await?;
        Ok(Insights { insights })
    }

    async fn extract_receipt(&self, image: &[u8], mime: &str) -> Result<ReceiptExtraction> {
        let prompt = "Extract data from this receipt: date (YYYY-MM-DD), total amount (number), \
                      category (one word), merchant name and whether the expense is fixed or \
                      variable. Return a JSON object with the keys date, total, category, \
                      merchant and type.";
        let parts = vec![
            text(prompt.to_string()),
            Part::Inline {
                inline_data: InlineData {
                    mime_type: mime,
                    data: BASE64_STANDARD.encode(image),
                },
            },
        ];
        let raw = self.generate(parts, true).await?;
        ReceiptExtraction::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: [Content {
                parts: vec![
                    text("hi".into()),
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: BASE64_STANDARD.encode([1u8, 2, 3]),
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(v["contents"][0]["parts"][1]["inline_data"]["data"], "AQID");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_response_text_is_joined() {
        let data: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]}"#,
        )
        .unwrap();
        let joined: String = data.candidates[0]
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.clone())
            .collect();
        assert_eq!(joined, "ab");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_upstream_error() {
        let analyzer = HttpAnalyzer::new(AiConfig {
            endpoint: "http://127.0.0.1:9".into(),
            model: "m".into(),
            api_key: Some("k".into()),
            timeout: Duration::from_millis(500),
        });
        let err = analyzer.suggest_tip(1.0, 1.0).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }
}
