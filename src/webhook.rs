//! Messaging webhook.
//!
//! Inbound messages arrive as the messaging platform's JSON payload. A
//! sender is matched to an identity by the `phone` field of the profiles
//! table; a receipt photo from a known sender becomes a paid expense owned
//! by that identity. Every outcome is answered with a text reply.

use crate::ai::Analyzer;
use crate::auth::{Identity, Session};
use crate::config::MessagingConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::model::{Transaction, TransactionStatus, TransactionType, PROFILES};
use crate::storage::RecordStore;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use tracing::{info, warn};

/// Source tag stored on transactions created from messages.
pub const MESSAGE_SOURCE: &str = "whatsapp";

/// Profile field holding the messaging number.
pub const PHONE_FIELD: &str = "phone";

const REPLY_UNKNOWN: &str =
    "Seu número não foi encontrado no AuraFin. Por favor, cadastre-se primeiro.";
const REPLY_ANALYZING: &str = "Analisando seu recibo... 🤖";
const REPLY_INSTRUCTIONS: &str = "Olá! Envie a foto de um recibo para que eu possa analisá-lo.";
const REPLY_FAILED: &str =
    "Ocorreu um erro ao processar sua solicitação. Tente novamente mais tarde.";

/// Downloaded media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Trait for messaging platforms.
pub trait Messenger: Send + Sync {
    fn send_text(&self, to: &str, body: &str) -> impl Future<Output = Result<()>> + Send;

    /// Resolve a media id to a download URL.
    fn media_url(&self, media_id: &str) -> impl Future<Output = Result<String>> + Send;

    fn download(&self, url: &str) -> impl Future<Output = Result<Media>> + Send;
}

/// What [`handle_inbound`] did with a payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// The payload carried no message.
    Ignored,
    UnknownSender { from: String },
    Instructed { from: String },
    Recorded {
        from: String,
        user_id: String,
        transaction_id: String,
        amount: f64,
        category: String,
    },
    Failed { from: String, reason: String },
}

/// Answer a subscription verification request.
///
/// Returns `Ok(None)` when `mode` or `token` is missing (nothing to answer),
/// and the challenge when the mode is `subscribe` and the token matches.
///
/// # Errors
///
/// Returns `VerificationFailed` for any other mode or a wrong token.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected: &str,
) -> Result<Option<String>> {
    let (Some(mode), Some(token)) = (mode, token) else {
        return Ok(None);
    };

    if mode == "subscribe" && token == expected {
        info!("Webhook verified");
        Ok(Some(challenge.unwrap_or_default().to_string()))
    } else {
        Err(Error::VerificationFailed)
    }
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    from: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    image: Option<InboundImage>,
}

#[derive(Debug, Deserialize)]
struct InboundImage {
    id: String,
}

fn first_message(payload: &Value) -> Option<InboundMessage> {
    let message = payload.pointer("/entry/0/changes/0/value/messages/0")?;
    serde_json::from_value(message.clone()).ok()
}

/// Handle one inbound webhook payload.
///
/// Never fails: processing errors are logged, answered with an apology
/// and reported as [`WebhookOutcome::Failed`].
pub async fn handle_inbound<S, A, M>(
    db: &mut Database<S>,
    analyzer: &A,
    messenger: &M,
    payload: &Value,
) -> WebhookOutcome
where
    S: RecordStore,
    A: Analyzer,
    M: Messenger,
{
    let Some(message) = first_message(payload) else {
        return WebhookOutcome::Ignored;
    };
    // A blank sender would match profiles that never set a phone.
    if message.from.trim().is_empty() {
        warn!("Message without sender, ignoring");
        return WebhookOutcome::Ignored;
    }
    let from = message.from.clone();

    match process(db, analyzer, messenger, message).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(from = %from, error = %format!("{e:#}"), "Error processing webhook");
            reply(messenger, &from, REPLY_FAILED).await;
            WebhookOutcome::Failed {
                from,
                reason: format!("{e:#}"),
            }
        }
    }
}

async fn process<S, A, M>(
    db: &mut Database<S>,
    analyzer: &A,
    messenger: &M,
    message: InboundMessage,
) -> anyhow::Result<WebhookOutcome>
where
    S: RecordStore,
    A: Analyzer,
    M: Messenger,
{
    let from = message.from;

    let Some(user_id) = db
        .find_owner(PROFILES, PHONE_FIELD, from.as_str())
        .context("looking up sender")?
    else {
        reply(messenger, &from, REPLY_UNKNOWN).await;
        return Ok(WebhookOutcome::UnknownSender { from });
    };

    let image = match (message.kind.as_str(), message.image) {
        ("image", Some(image)) => image,
        _ => {
            reply(messenger, &from, REPLY_INSTRUCTIONS).await;
            return Ok(WebhookOutcome::Instructed { from });
        }
    };

    reply(messenger, &from, REPLY_ANALYZING).await;

    let url = messenger
        .media_url(&image.id)
        .await
        .context("resolving media url")?;
    let media = messenger.download(&url).await.context("downloading media")?;
    let extracted = analyzer
        .extract_receipt(&media.bytes, &media.mime)
        .await
        .context("reading receipt")?;

    let transaction = Transaction {
        kind: TransactionType::Expense,
        sub_type: extracted.expense_type,
        income_category: None,
        description: extracted.description,
        amount: extracted.amount,
        date: extracted.date,
        category: extracted.category,
        status: TransactionStatus::Paid,
        payment_method: String::new(),
        card_id: None,
        receipt_url: None,
        source: Some(MESSAGE_SOURCE.to_string()),
    };

    let session = Session::authenticated(Identity::new(user_id.as_str(), ""));
    let record = db.create(&session, &transaction).context("saving transaction")?;

    reply(
        messenger,
        &from,
        &format!(
            "Recibo de R$ {:.2} salvo com sucesso na categoria {}!",
            record.data.amount, record.data.category
        ),
    )
    .await;

    info!(user = %user_id, id = %record.id(), "Recorded transaction from message");

    Ok(WebhookOutcome::Recorded {
        from,
        user_id,
        transaction_id: record.id().to_string(),
        amount: record.data.amount,
        category: record.data.category,
    })
}

/// Send a reply; failures are logged, not propagated.
async fn reply<M: Messenger>(messenger: &M, to: &str, body: &str) {
    if let Err(e) = messenger.send_text(to, body).await {
        warn!(to, error = %e, "Failed to send reply");
    }
}

// ==================
// HTTP messenger
// ==================

/// Default [`Messenger`] over the platform's Graph-style HTTP API.
pub struct HttpMessenger {
    client: reqwest::Client,
    config: MessagingConfig,
}

#[derive(Debug, Deserialize)]
struct MediaInfo {
    url: String,
}

impl HttpMessenger {
    #[must_use]
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn token(&self) -> Result<&str> {
        self.config
            .access_token
            .as_deref()
            .ok_or_else(|| Error::Config("no messaging access token configured".into()))
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Upstream(format!("{what} returned {status}: {body}")))
    }
}

impl Messenger for HttpMessenger {
    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        let phone_id = self
            .config
            .phone_number_id
            .as_deref()
            .ok_or_else(|| Error::Config("no messaging phone number id configured".into()))?;
        let url = format!("{}/{phone_id}/messages", self.config.api_base.trim_end_matches('/'));

        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "text": { "body": body },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token()?)
            .timeout(self.config.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("send message failed: {e}")))?;

        Self::check(response, "send message").await?;
        Ok(())
    }

    async fn media_url(&self, media_id: &str) -> Result<String> {
        let url = format!("{}/{media_id}", self.config.api_base.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token()?)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("media lookup failed: {e}")))?;

        let info: MediaInfo = Self::check(response, "media lookup")
            .await?
            .json()
            .await
            .map_err(|e| Error::MalformedUpstream(format!("media lookup response: {e}")))?;
        Ok(info.url)
    }

    async fn download(&self, url: &str) -> Result<Media> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token()?)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("media download failed: {e}")))?;
        let response = Self::check(response, "media download").await?;

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Upstream(format!("media download failed: {e}")))?;

        Ok(Media {
            bytes: bytes.to_vec(),
            mime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::FakeAnalyzer;
    use crate::model::{to_row, Profile, TRANSACTIONS};
    use crate::query::Query;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeMessenger {
        sent: Mutex<Vec<(String, String)>>,
        fail_media: bool,
    }

    impl FakeMessenger {
        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Messenger for FakeMessenger {
        async fn send_text(&self, to: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(())
        }

        async fn media_url(&self, media_id: &str) -> Result<String> {
            if self.fail_media {
                return Err(Error::Upstream("media gone".into()));
            }
            Ok(format!("https://media.example/{media_id}"))
        }

        async fn download(&self, _url: &str) -> Result<Media> {
            Ok(Media {
                bytes: vec![0xFF, 0xD8],
                mime: "image/png".into(),
            })
        }
    }

    fn payload(message: Value) -> Value {
        json!({"entry": [{"changes": [{"value": {"messages": [message]}}]}]})
    }

    fn image_from(phone: &str) -> Value {
        payload(json!({"from": phone, "type": "image", "image": {"id": "m1"}}))
    }

    fn db_with_phone(user: &str, phone: &str) -> Database<MemoryStore> {
        let mut db = Database::new(MemoryStore::new(), Identity::new(user, "x@aurafin.com"));
        let session = db.sign_in("x@aurafin.com", "pw").unwrap();
        let mut profile = Profile::new("x@aurafin.com");
        profile.phone = Some(phone.to_string());
        db.insert(&session, PROFILES, to_row(&profile).unwrap()).unwrap();
        db.sign_out().unwrap();
        db
    }

    #[test]
    fn test_verify_subscription() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("tok"), Some("123"), "tok").unwrap(),
            Some("123".to_string())
        );
        assert!(matches!(
            verify_subscription(Some("subscribe"), Some("bad"), Some("123"), "tok"),
            Err(Error::VerificationFailed)
        ));
        assert!(verify_subscription(Some("unsubscribe"), Some("tok"), None, "tok").is_err());
        assert_eq!(verify_subscription(None, Some("tok"), None, "tok").unwrap(), None);
        assert_eq!(verify_subscription(Some("subscribe"), None, None, "tok").unwrap(), None);
    }

    #[tokio::test]
    async fn test_payload_without_message_is_ignored() {
        let mut db = db_with_phone("u1", "5511999");
        let analyzer = FakeAnalyzer::default();
        let messenger = FakeMessenger::default();
        let out = handle_inbound(&mut db, &analyzer, &messenger, &json!({"entry": []})).await;
        assert_eq!(out, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_unknown_sender_gets_registration_reply() {
        let mut db = db_with_phone("u1", "5511999");
        let messenger = FakeMessenger::default();

        let analyzer = FakeAnalyzer::default();
        let out = handle_inbound(&mut db, &analyzer, &messenger, &image_from("000")).await;

        assert_eq!(out, WebhookOutcome::UnknownSender { from: "000".into() });
        assert_eq!(messenger.sent(), vec![("000".to_string(), REPLY_UNKNOWN.to_string())]);
        assert!(db.store().read(TRANSACTIONS).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_sender_never_matches_a_profile() {
        let mut db = Database::new(MemoryStore::new(), Identity::new("u1", "x@aurafin.com"));
        let session = db.sign_in("x@aurafin.com", "pw").unwrap();
        let row = json!({"email": "x@aurafin.com", "phone": ""});
        db.insert(&session, PROFILES, row.as_object().unwrap().clone()).unwrap();
        db.sign_out().unwrap();

        let messenger = FakeMessenger::default();
        let analyzer = FakeAnalyzer::with_receipt(r#"{"total": 10, "date": "2024-05-04"}"#);
        for from in ["", "   "] {
            let out = handle_inbound(&mut db, &analyzer, &messenger, &image_from(from)).await;
            assert_eq!(out, WebhookOutcome::Ignored);
        }

        assert!(messenger.sent().is_empty());
        assert_eq!(analyzer.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(db.store().read(TRANSACTIONS).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_message_gets_instructions() {
        let mut db = db_with_phone("u1", "5511999");
        let messenger = FakeMessenger::default();
        let msg = payload(json!({"from": "5511999", "type": "text", "text": {"body": "oi"}}));

        let out = handle_inbound(&mut db, &FakeAnalyzer::default(), &messenger, &msg).await;
        assert_eq!(out, WebhookOutcome::Instructed { from: "5511999".into() });
        assert_eq!(messenger.sent()[0].1, REPLY_INSTRUCTIONS);
    }

    #[tokio::test]
    async fn test_receipt_image_records_expense_for_owner() {
        let mut db = db_with_phone("u1", "5511999");
        let messenger = FakeMessenger::default();
        let receipt = json!({
            "total": 57.3,
            "date": "2024-05-04",
            "type": "variable",
            "category": "Mercado",
            "description": "Feira"
        });
        let analyzer = FakeAnalyzer::with_receipt(&receipt.to_string());

        let out = handle_inbound(&mut db, &analyzer, &messenger, &image_from("5511999")).await;

        let WebhookOutcome::Recorded { user_id, category, .. } = &out else {
            panic!("unexpected outcome {out:?}");
        };
        assert_eq!(user_id, "u1");
        assert_eq!(category, "Mercado");
        assert_eq!(analyzer.last_mime.lock().unwrap().as_deref(), Some("image/png"));

        let owner = Session::authenticated(Identity::new("u1", ""));
        let rows = db.execute(&owner, &Query::select(TRANSACTIONS).build()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["source"], "whatsapp");
        assert_eq!(rows[0]["type"], "expense");
        assert_eq!(rows[0]["sub_type"], "variable");
        assert_eq!(rows[0]["status"], "paid");
        assert_eq!(rows[0]["user_id"], "u1");

        let replies: Vec<_> = messenger.sent().into_iter().map(|(_, b)| b).collect();
        assert_eq!(replies[0], REPLY_ANALYZING);
        assert!(replies[1].contains("57.30"));
    }

    #[tokio::test]
    async fn test_malformed_extraction_is_apologized() {
        let mut db = db_with_phone("u1", "5511999");
        let messenger = FakeMessenger::default();
        let analyzer = FakeAnalyzer::with_receipt(r#"{"total": 10, "date": "yesterday"}"#);

        let out = handle_inbound(&mut db, &analyzer, &messenger, &image_from("5511999")).await;

        assert!(matches!(out, WebhookOutcome::Failed { .. }));
        assert_eq!(messenger.sent().last().unwrap().1, REPLY_FAILED);
        assert!(db.store().read(TRANSACTIONS).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_media_failure_is_apologized() {
        let mut db = db_with_phone("u1", "5511999");
        let messenger = FakeMessenger {
            fail_media: true,
            ..FakeMessenger::default()
        };

        let analyzer = FakeAnalyzer::default();
        let out = handle_inbound(&mut db, &analyzer, &messenger, &image_from("5511999")).await;
        let WebhookOutcome::Failed { reason, .. } = out else {
            panic!("expected failure");
        };
        assert!(reason.contains("media"));
    }
}
