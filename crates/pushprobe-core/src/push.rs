//! Remote trigger for rich push messages.
//!
//! Scenarios never talk to the push backend directly; they hold a
//! [`PushSender`] and call [`send`](PushSender::send) with an [`Audience`].
//! Delivery is asynchronous on the backend side, so a successful send only
//! means the request was accepted. The caller polls the device for the
//! notification afterwards.
//!
//! [`AirshipSender`] is the HTTP implementation, speaking the version 3 push
//! API with the project's app key and master secret as basic-auth
//! credentials.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ProbeConfig;

const ACCEPT_V3: &str = "application/vnd.urbanairship+json; version=3";

/// Title shown by the notification and the message.
pub const DEFAULT_TITLE: &str = "Rich Push Sample";
/// Alert text of the notification.
pub const DEFAULT_ALERT: &str = "Rich Push Alert";

/// Errors raised while sending a push.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The request never got a response.
    #[error("push API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("push API rejected the request with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnosis.
        body: String,
    },

    /// The app key or master secret is not configured.
    #[error("push credentials are not configured (app key and master secret required)")]
    MissingCredentials,
}

/// Who a push is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every device of the app.
    All,
    /// Devices in a named segment (e.g. `home`).
    Segment(String),
}

impl Audience {
    /// `All` when no segment is given, `Segment` otherwise.
    pub fn from_segment(segment: Option<&str>) -> Self {
        match segment {
            Some(name) => Audience::Segment(name.to_string()),
            None => Audience::All,
        }
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::All => write!(f, "all"),
            Audience::Segment(name) => write!(f, "segment \"{}\"", name),
        }
    }
}

/// Sends a rich push to the device under test.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Requests delivery of one rich push to `audience`.
    async fn send(&self, audience: &Audience) -> Result<(), DeliveryError>;
}

/// Content of the rich push. The notification and inbox checks look for
/// [`DEFAULT_TITLE`] and [`DEFAULT_ALERT`], so the content is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RichPushMessage {
    /// Notification alert text.
    alert: String,
    /// Inbox message title.
    title: String,
    /// HTML body rendered by the app's web view.
    html_body: String,
}

impl Default for RichPushMessage {
    fn default() -> Self {
        Self {
            alert: DEFAULT_ALERT.to_string(),
            title: DEFAULT_TITLE.to_string(),
            html_body: "<html><body><h1>Rich Push Sample</h1>\
                        <p>Sent by pushprobe.</p></body></html>"
                .to_string(),
        }
    }
}

/// Sender backed by the HTTP push API.
pub struct AirshipSender {
    client: Client,
    base_url: String,
    app_key: String,
    master_secret: String,
    message: RichPushMessage,
}

impl AirshipSender {
    /// Create a sender for the given endpoint and credentials.
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        app_key: impl Into<String>,
        master_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            app_key: app_key.into(),
            master_secret: master_secret.into(),
            message: RichPushMessage::default(),
        }
    }

    /// Build a sender from the configuration.
    ///
    /// Fails with [`DeliveryError::MissingCredentials`] unless both the app
    /// key and the master secret are set.
    pub fn from_config(config: &ProbeConfig) -> Result<Self, DeliveryError> {
        match (&config.app_key, &config.master_secret) {
            (Some(key), Some(secret)) => Ok(Self::new(
                Client::new(),
                config.api_base_url.clone(),
                key.clone(),
                secret.clone(),
            )),
            _ => Err(DeliveryError::MissingCredentials),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/push/", self.base_url.trim_end_matches('/'))
    }

    fn payload<'a>(&'a self, audience: &'a Audience) -> PushPayload<'a> {
        PushPayload {
            audience: match audience {
                Audience::All => AudienceSpec::All("all"),
                Audience::Segment(name) => AudienceSpec::Tag { tag: name },
            },
            device_types: &["android"],
            notification: NotificationSpec {
                alert: &self.message.alert,
            },
            message: MessageSpec {
                title: &self.message.title,
                body: &self.message.html_body,
                content_type: "text/html",
            },
        }
    }
}

#[async_trait]
impl PushSender for AirshipSender {
    async fn send(&self, audience: &Audience) -> Result<(), DeliveryError> {
        let url = self.endpoint();
        debug!(%url, %audience, "sending rich push");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.app_key, Some(&self.master_secret))
            .header("Accept", ACCEPT_V3)
            .json(&self.payload(audience))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(%audience, status = status.as_u16(), "rich push accepted");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    audience: AudienceSpec<'a>,
    device_types: &'a [&'a str],
    notification: NotificationSpec<'a>,
    message: MessageSpec<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AudienceSpec<'a> {
    All(&'static str),
    Tag { tag: &'a str },
}

#[derive(Debug, Serialize)]
struct NotificationSpec<'a> {
    alert: &'a str,
}

#[derive(Debug, Serialize)]
struct MessageSpec<'a> {
    title: &'a str,
    body: &'a str,
    content_type: &'static str,
}
