use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use aiboom_shared::errors::{AppError, AppResult, ErrorCode};

use crate::events::EventPublisher;
use crate::models::{NewPost, Post, PostStatus};
use crate::store::SharedStore;

use super::classifier::AiClassifier;

pub const CATEGORIES: [&str; 4] = ["ai-art", "ai-photography", "ai-video", "ai-abstract"];

const IN_APP_TOOL: &str = "in-app";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Upload,
    Generate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitPostRequest {
    #[validate(url(message = "image_url must be a valid URL"))]
    pub image_url: Option<String>,
    #[validate(url(message = "video_url must be a valid URL"))]
    pub video_url: Option<String>,
    #[serde(default)]
    pub origin: Origin,
    #[validate(length(max = 2200, message = "caption must be at most 2200 characters"))]
    pub caption: Option<String>,
    pub category: String,
    pub ai_tool: Option<String>,
    #[serde(default)]
    #[validate(length(max = 30, message = "at most 30 tags"))]
    pub tags: Vec<String>,
}

enum Media {
    Image(String),
    Video(String),
}

/// Where a new post lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Published and marked verified AI.
    Verified,
    /// Published without verification (videos).
    Published,
    /// Held for community review.
    Review,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Verified => "verified",
            Placement::Published => "published",
            Placement::Review => "review",
        }
    }

    fn initial_state(&self, now: DateTime<Utc>, window: Duration) -> (PostStatus, bool, Option<DateTime<Utc>>) {
        match self {
            Placement::Verified => (PostStatus::Approved, true, None),
            Placement::Published => (PostStatus::Approved, false, None),
            Placement::Review => (PostStatus::PendingReview, false, Some(now + window)),
        }
    }
}

/// Decides at creation time whether a post is published or held for review,
/// and writes it in that state with a single insert.
#[derive(Clone)]
pub struct SubmissionGate {
    store: SharedStore,
    classifier: Arc<dyn AiClassifier>,
    publisher: EventPublisher,
    voting_window: Duration,
    min_confidence: f64,
}

impl SubmissionGate {
    pub fn new(
        store: SharedStore,
        classifier: Arc<dyn AiClassifier>,
        publisher: EventPublisher,
        voting_window: Duration,
        min_confidence: f64,
    ) -> Self {
        Self {
            store,
            classifier,
            publisher,
            voting_window,
            min_confidence,
        }
    }

    pub async fn submit(&self, owner_id: Uuid, req: SubmitPostRequest, now: DateTime<Utc>) -> AppResult<Post> {
        req.validate()
            .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

        let media = match (non_blank(req.image_url), non_blank(req.video_url)) {
            (Some(image), None) => Media::Image(image),
            (None, Some(video)) => Media::Video(video),
            _ => {
                return Err(AppError::new(
                    ErrorCode::MediaRequired,
                    "provide exactly one of image_url or video_url",
                ))
            }
        };

        if !CATEGORIES.contains(&req.category.as_str()) {
            return Err(AppError::with_details(
                ErrorCode::InvalidCategory,
                format!("unknown category: {}", req.category),
                serde_json::json!({ "allowed": CATEGORIES }),
            ));
        }

        let ai_tool = match req.origin {
            Origin::Generate => IN_APP_TOOL.to_string(),
            Origin::Upload => non_blank(req.ai_tool)
                .ok_or_else(|| AppError::new(ErrorCode::AiToolRequired, "select the AI tool used"))?,
        };

        let placement = self.place(&media, req.origin).await;
        let (status, is_verified_ai, voting_expires_at) = placement.initial_state(now, self.voting_window);

        let (image_url, video_url) = match media {
            Media::Image(url) => (Some(url), None),
            Media::Video(url) => (None, Some(url)),
        };

        let post = self
            .store
            .create_post(NewPost {
                user_id: owner_id,
                image_url,
                video_url,
                caption: non_blank(req.caption),
                category: req.category,
                ai_tool,
                tags: req
                    .tags
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
                status: status.to_string(),
                is_verified_ai,
                voting_expires_at,
            })
            .await?;

        counter!("moderation_submissions_total", "placement" => placement.as_str()).increment(1);
        tracing::info!(
            post_id = %post.id,
            user_id = %owner_id,
            placement = placement.as_str(),
            "post submitted"
        );

        self.publisher.post_submitted(&post).await;

        Ok(post)
    }

    /// Generated content and videos skip detection; images go through the
    /// classifier, and any classifier failure sends them to review.
    async fn place(&self, media: &Media, origin: Origin) -> Placement {
        let image_url = match (origin, media) {
            (Origin::Generate, _) => return Placement::Verified,
            (Origin::Upload, Media::Video(_)) => return Placement::Published,
            (Origin::Upload, Media::Image(url)) => url,
        };

        match self.classifier.classify(image_url).await.and_then(|c| c.check()) {
            Ok(c) if c.verifies_ai(self.min_confidence) => Placement::Verified,
            Ok(c) => {
                tracing::debug!(confidence = c.confidence, reason = %c.reason, "classifier did not verify image");
                Placement::Review
            }
            Err(e) => {
                counter!("moderation_classifier_failures_total").increment(1);
                tracing::warn!(error = %e, "classifier unavailable, sending post to review");
                Placement::Review
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, PostStore};
    use crate::submission::classifier::Classification;

    struct FixedClassifier(Option<Classification>);

    #[axum::async_trait]
    impl AiClassifier for FixedClassifier {
        async fn classify(&self, _image_url: &str) -> anyhow::Result<Classification> {
            self.0.clone().ok_or_else(|| anyhow::anyhow!("detector down"))
        }
    }

    fn gate(store: &Arc<MemoryStore>, verdict: Option<(bool, f64)>) -> SubmissionGate {
        let classification = verdict.map(|(is_ai_generated, confidence)| Classification {
            is_ai_generated,
            confidence,
            reason: "test".into(),
        });
        SubmissionGate::new(
            store.clone(),
            Arc::new(FixedClassifier(classification)),
            EventPublisher::disabled(),
            Duration::hours(24),
            0.7,
        )
    }

    fn image_upload() -> SubmitPostRequest {
        SubmitPostRequest {
            image_url: Some("https://cdn.example/u/1.png".into()),
            video_url: None,
            origin: Origin::Upload,
            caption: Some("  sunset  ".into()),
            category: "ai-art".into(),
            ai_tool: Some("DALL-E".into()),
            tags: vec!["sky".into(), " ".into()],
        }
    }

    #[tokio::test]
    async fn confident_classifier_publishes_verified() {
        let store = Arc::new(MemoryStore::new());
        let post = gate(&store, Some((true, 0.9)))
            .submit(Uuid::new_v4(), image_upload(), Utc::now())
            .await
            .unwrap();

        assert_eq!(post.status(), PostStatus::Approved);
        assert!(post.is_verified_ai);
        assert_eq!(post.voting_expires_at, None);
        assert_eq!(post.caption.as_deref(), Some("sunset"));
        assert_eq!(post.tags, vec!["sky".to_string()]);
    }

    #[tokio::test]
    async fn weak_or_negative_verdict_goes_to_review() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();

        for verdict in [(true, 0.5), (false, 0.95)] {
            let post = gate(&store, Some(verdict))
                .submit(Uuid::new_v4(), image_upload(), now)
                .await
                .unwrap();
            assert!(post.is_pending());
            assert!(!post.is_verified_ai);
            assert_eq!(post.voting_expires_at, Some(now + Duration::hours(24)));
        }
    }

    #[tokio::test]
    async fn classifier_failure_never_blocks_posting() {
        let store = Arc::new(MemoryStore::new());

        let down = gate(&store, None).submit(Uuid::new_v4(), image_upload(), Utc::now()).await.unwrap();
        assert!(down.is_pending());

        let garbage = gate(&store, Some((true, 7.0)))
            .submit(Uuid::new_v4(), image_upload(), Utc::now())
            .await
            .unwrap();
        assert!(garbage.is_pending());
    }

    #[tokio::test]
    async fn videos_and_generated_content_skip_review() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(&store, None);

        let video = SubmitPostRequest {
            image_url: None,
            video_url: Some("https://cdn.example/u/1.mp4".into()),
            category: "ai-video".into(),
            ..image_upload()
        };
        let post = gate.submit(Uuid::new_v4(), video, Utc::now()).await.unwrap();
        assert_eq!(post.status(), PostStatus::Approved);
        assert!(!post.is_verified_ai);

        let generated = SubmitPostRequest {
            origin: Origin::Generate,
            ai_tool: None,
            ..image_upload()
        };
        let post = gate.submit(Uuid::new_v4(), generated, Utc::now()).await.unwrap();
        assert!(post.is_verified_ai);
        assert_eq!(post.ai_tool, "in-app");
    }

    #[tokio::test]
    async fn malformed_requests_are_rejected_without_writing() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(&store, Some((true, 0.9)));
        let owner = Uuid::new_v4();
        let now = Utc::now();

        let both = SubmitPostRequest {
            video_url: Some("https://cdn.example/u/1.mp4".into()),
            ..image_upload()
        };
        assert_eq!(gate.submit(owner, both, now).await.unwrap_err().code(), ErrorCode::MediaRequired);

        let neither = SubmitPostRequest { image_url: None, ..image_upload() };
        assert_eq!(gate.submit(owner, neither, now).await.unwrap_err().code(), ErrorCode::MediaRequired);

        let no_tool = SubmitPostRequest { ai_tool: Some(" ".into()), ..image_upload() };
        assert_eq!(gate.submit(owner, no_tool, now).await.unwrap_err().code(), ErrorCode::AiToolRequired);

        let category = SubmitPostRequest { category: "memes".into(), ..image_upload() };
        assert_eq!(gate.submit(owner, category, now).await.unwrap_err().code(), ErrorCode::InvalidCategory);

        let long = SubmitPostRequest { caption: Some("x".repeat(2201)), ..image_upload() };
        assert_eq!(gate.submit(owner, long, now).await.unwrap_err().code(), ErrorCode::ValidationError);

        let (_, total) = store.open_pending_posts(now, 0, 10).await.unwrap();
        assert_eq!(total, 0);
    }
}
