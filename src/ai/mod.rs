//! Generative-AI collaborator.
//!
//! The [`Analyzer`] trait is what the rest of the crate talks to; the
//! default implementation is [`HttpAnalyzer`]. Collaborator output is
//! untrusted: every structured response is parsed and validated here
//! before it reaches the data layer.

mod http;

pub use http::HttpAnalyzer;

use crate::error::{Error, Result};
use crate::finance::{parse_date, StrategyScenario};
use crate::model::{ExpenseType, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use tracing::warn;

/// Tip shown when the collaborator fails.
pub const FALLBACK_TIP: &str = "Mantenha o controle das suas finanças para um futuro próspero.";

/// Tip shown when the collaborator answers with nothing.
pub const EMPTY_TIP: &str = "Continue focado em seus objetivos financeiros!";

/// Category used when a receipt's category cannot be read.
pub const DEFAULT_RECEIPT_CATEGORY: &str = "Outros";

const TREASURY_LINK: &str = "https://www.tesourodireto.com.br/";
const BANK_LINK: &str = "https://www.itau.com.br/investimentos";
const BROKER_LINK: &str = "https://www.nuinvest.com.br/";

/// Trait for AI collaborators.
///
/// Implemented by [`HttpAnalyzer`]; tests substitute in-process fakes.
pub trait Analyzer: Send + Sync {
    /// Short encouraging tip for the dashboard.
    fn suggest_tip(
        &self,
        balance: f64,
        expenses: f64,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Strategic mentorship for a financial snapshot.
    fn mentorship(
        &self,
        scenario: &StrategyScenario,
    ) -> impl Future<Output = Result<Mentorship>> + Send;

    /// Investment options for `amount`.
    fn investment_recommendations(
        &self,
        amount: f64,
    ) -> impl Future<Output = Result<Vec<Recommendation>>> + Send;

    /// Free-form insights over a set of transactions.
    fn analyze_finance(
        &self,
        transactions: &[Transaction],
    ) -> impl Future<Output = Result<Insights>> + Send;

    /// Read a receipt image.
    fn extract_receipt(
        &self,
        image: &[u8],
        mime: &str,
    ) -> impl Future<Output = Result<ReceiptExtraction>> + Send;
}

/// Dashboard tip, never failing.
pub async fn tip_or_fallback<A: Analyzer>(analyzer: &A, balance: f64, expenses: f64) -> String {
    match analyzer.suggest_tip(balance, expenses).await {
        Ok(tip) if tip.trim().is_empty() => EMPTY_TIP.to_string(),
        Ok(tip) => tip.trim().to_string(),
        Err(e) => {
            warn!(error = %e, "Tip request failed, using fallback");
            FALLBACK_TIP.to_string()
        }
    }
}

/// Recommendations with reference links attached.
///
/// # Errors
///
/// Propagates the collaborator's error.
pub async fn recommend<A: Analyzer>(analyzer: &A, amount: f64) -> Result<Vec<Recommendation>> {
    let recs = analyzer.investment_recommendations(amount).await?;
    Ok(recs.into_iter().map(Recommendation::with_link).collect())
}

// ==================
// Response types
// ==================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentorship {
    pub priority_list: Vec<String>,
    pub loan_advice: String,
    pub behavioral_tips: Vec<String>,
    pub action_plan: Vec<String>,
    pub mentorship_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub risk: String,
    #[serde(rename = "expectedReturn", alias = "expected_return")]
    pub expected_return: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Recommendation {
    /// Reference link for an investment name.
    #[must_use]
    pub fn reference_link(name: &str) -> &'static str {
        let name = name.to_lowercase();
        if name.contains("fii") || name.contains("bolsa") {
            BROKER_LINK
        } else if name.contains("cdb") || name.contains("banco") {
            BANK_LINK
        } else {
            TREASURY_LINK
        }
    }

    #[must_use]
    pub fn with_link(mut self) -> Self {
        self.link = Some(Self::reference_link(&self.name).to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    pub insights: String,
}

/// Validated fields read from a receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptExtraction {
    pub amount: f64,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub category: String,
    /// Merchant or short description.
    pub description: String,
    pub expense_type: Option<ExpenseType>,
}

impl ReceiptExtraction {
    /// Parse and validate collaborator output.
    ///
    /// Accepts `total` or `amount` for the value and `merchant` or
    /// `description` for the label. Markdown code fences are tolerated.
    ///
    /// # Errors
    ///
    /// Returns `MalformedUpstream` when the text is not a JSON object, the
    /// amount is missing, negative or not finite, or the date is not
    /// `YYYY-MM-DD`.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(strip_fences(text))
            .map_err(|e| Error::MalformedUpstream(format!("receipt data is not JSON: {e}")))?;
        let Value::Object(obj) = value else {
            return Err(Error::MalformedUpstream("receipt data is not an object".into()));
        };

        let amount = obj
            .get("total")
            .or_else(|| obj.get("amount"))
            .and_then(number)
            .ok_or_else(|| Error::MalformedUpstream("receipt amount missing".into()))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::MalformedUpstream(format!("invalid receipt amount: {amount}")));
        }

        let date = obj
            .get("date")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|d| d.len() == 10 && parse_date(d).is_some())
            .ok_or_else(|| Error::MalformedUpstream("receipt date must be YYYY-MM-DD".into()))?
            .to_string();

        let text_field = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        };

        let expense_type = text_field("type").and_then(|t| match t.to_lowercase().as_str() {
            "fixed" => Some(ExpenseType::Fixed),
            "variable" => Some(ExpenseType::Variable),
            _ => None,
        });

        Ok(Self {
            amount,
            date,
            category: text_field("category")
                .unwrap_or_else(|| DEFAULT_RECEIPT_CATEGORY.to_string()),
            description: text_field("merchant")
                .or_else(|| text_field("description"))
                .unwrap_or_default(),
            expense_type,
        })
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Strip a surrounding Markdown code fence, if any.
pub(crate) fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse collaborator JSON into `T`.
pub(crate) fn parse_structured<T: serde::de::DeserializeOwned>(
    text: &str,
    what: &str,
) -> Result<T> {
    serde_json::from_str(strip_fences(text))
        .map_err(|e| Error::MalformedUpstream(format!("{what}: {e}")))
}


#[cfg(test)]
mod tests {
    use super::testing::FakeAnalyzer;
    use super::*;

    #[test]
    fn test_receipt_accepts_either_key_set() {
        let a = ReceiptExtraction::parse(
            r#"{"date": "2024-05-01", "amount": 42.5, "category": "Mercado", "merchant": "Pão de Açúcar"}"#,
        )
        .unwrap();
        assert!((a.amount - 42.5).abs() < f64::EPSILON);
        assert_eq!(a.description, "Pão de Açúcar");
        assert!(a.expense_type.is_none());

        let b = ReceiptExtraction::parse(
            r#"{"total": 10, "date": "2024-05-02", "type": "fixed", "category": "Moradia", "description": "Aluguel"}"#,
        )
        .unwrap();
        assert!((b.amount - 10.0).abs() < f64::EPSILON);
        assert_eq!(b.description, "Aluguel");
        assert_eq!(b.expense_type, Some(ExpenseType::Fixed));
    }

    #[test]
    fn test_receipt_rejects_bad_dates_and_amounts() {
        for raw in [
            r#"{"amount": 1, "date": "01/05/2024"}"#,
            r#"{"amount": 1, "date": "2024-02-30"}"#,
            r#"{"amount": 1}"#,
            r#"{"amount": -3, "date": "2024-05-01"}"#,
            r#"{"date": "2024-05-01"}"#,
            r#"[1, 2]"#,
            "not json",
        ] {
            let err = ReceiptExtraction::parse(raw).unwrap_err();
            assert!(matches!(err, Error::MalformedUpstream(_)), "accepted {raw}");
        }
    }

    #[test]
    fn test_receipt_defaults_category_and_strips_fences() {
        let fenced = "```json\n{\"amount\": \"12,90\", \"date\": \"2024-05-01\"}\n```";
        let r = ReceiptExtraction::parse(fenced).unwrap();
        assert!((r.amount - 12.9).abs() < 1e-9);
        assert_eq!(r.category, DEFAULT_RECEIPT_CATEGORY);
        assert_eq!(r.description, "");
    }

    #[test]
    fn test_reference_links() {
        assert_eq!(Recommendation::reference_link("CDB Banco Inter"), BANK_LINK);
        assert_eq!(Recommendation::reference_link("FII de Tijolo"), BROKER_LINK);
        assert_eq!(Recommendation::reference_link("Ações na Bolsa via banco"), BROKER_LINK);
        assert_eq!(Recommendation::reference_link("Tesouro Selic"), TREASURY_LINK);
    }

    #[test]
    fn test_mentorship_requires_all_fields() {
        let ok = r#"{"priority_list": ["a"], "loan_advice": "no", "behavioral_tips": [], "action_plan": ["1","2","3"], "mentorship_note": "go"}"#;
        assert!(parse_structured::<Mentorship>(ok, "mentorship").is_ok());
        let missing = r#"{"priority_list": ["a"]}"#;
        assert!(matches!(
            parse_structured::<Mentorship>(missing, "mentorship"),
            Err(Error::MalformedUpstream(_))
        ));
    }

    #[tokio::test]
    async fn test_tip_falls_back() {
        let failing = FakeAnalyzer::default();
        assert_eq!(tip_or_fallback(&failing, 10.0, 5.0).await, FALLBACK_TIP);

        let empty = FakeAnalyzer {
            tip: Some("  ".into()),
            ..FakeAnalyzer::default()
        };
        assert_eq!(tip_or_fallback(&empty, 10.0, 5.0).await, EMPTY_TIP);

        let good = FakeAnalyzer {
            tip: Some("Poupe 10%.\n".into()),
            ..FakeAnalyzer::default()
        };
        assert_eq!(tip_or_fallback(&good, 10.0, 5.0).await, "Poupe 10%.");
    }

    #[tokio::test]
    async fn test_recommend_attaches_links() {
        let fake = FakeAnalyzer {
            recommendations: vec![Recommendation {
                name: "CDB".into(),
                risk: "Baixo".into(),
                expected_return: "110% CDI".into(),
                description: "Liquidez diária".into(),
                link: None,
            }],
            ..FakeAnalyzer::default()
        };
        let recs = recommend(&fake, 500.0).await.unwrap();
        assert_eq!(recs[0].link.as_deref(), Some(BANK_LINK));
    }
}
