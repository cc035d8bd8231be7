use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Verdict returned by the AI-content detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub is_ai_generated: bool,
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
}

impl Classification {
    /// A confidence outside `[0, 1]` (or NaN) means the detector misbehaved.
    pub fn check(self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.confidence),
            "classifier confidence out of range: {}",
            self.confidence
        );
        Ok(self)
    }

    pub fn verifies_ai(&self, min_confidence: f64) -> bool {
        self.is_ai_generated && self.confidence >= min_confidence
    }
}

#[axum::async_trait]
pub trait AiClassifier: Send + Sync {
    async fn classify(&self, image_url: &str) -> anyhow::Result<Classification>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    image_url: &'a str,
}

/// Detector reached over HTTP: `POST {url}` with `{ "image_url": ... }`.
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build classifier http client")?;

        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }
}

#[axum::async_trait]
impl AiClassifier for HttpClassifier {
    async fn classify(&self, image_url: &str) -> anyhow::Result<Classification> {
        let mut request = self.client.post(&self.url).json(&ClassifyRequest { image_url });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let classification = request
            .send()
            .await
            .context("classifier request failed")?
            .error_for_status()
            .context("classifier returned an error status")?
            .json::<Classification>()
            .await
            .context("classifier response was not a classification")?;

        classification.check()
    }
}

/// Stand-in when no detector is configured: every call fails, so image
/// uploads go to community review.
pub struct UnconfiguredClassifier;

#[axum::async_trait]
impl AiClassifier for UnconfiguredClassifier {
    async fn classify(&self, _image_url: &str) -> anyhow::Result<Classification> {
        anyhow::bail!("no AI classifier configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(is_ai_generated: bool, confidence: f64) -> Classification {
        Classification {
            is_ai_generated,
            confidence,
            reason: String::new(),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(verdict(true, 0.7).verifies_ai(0.7));
        assert!(!verdict(true, 0.69).verifies_ai(0.7));
        assert!(!verdict(false, 0.99).verifies_ai(0.7));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        assert!(verdict(true, 1.5).check().is_err());
        assert!(verdict(true, f64::NAN).check().is_err());
        assert!(verdict(true, 0.0).check().is_ok());
    }

    #[test]
    fn reason_is_optional_on_the_wire() {
        let parsed: Classification =
            serde_json::from_str(r#"{"is_ai_generated":true,"confidence":0.91}"#).unwrap();
        assert_eq!(parsed.reason, "");
    }

    #[tokio::test]
    async fn unconfigured_classifier_always_fails() {
        assert!(UnconfiguredClassifier.classify("https://cdn.example/a.png").await.is_err());
    }

    #[tokio::test]
    async fn unreachable_detector_is_an_error() {
        let classifier =
            HttpClassifier::new("http://127.0.0.1:9/classify", None, Duration::from_millis(200)).unwrap();
        assert!(classifier.classify("https://cdn.example/a.png").await.is_err());
    }
}
