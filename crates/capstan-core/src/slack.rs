//! Slack incoming-webhook backend for [`Notifier`].
//!
//! Renders deploy announcements as webhook payloads with a colour-coded
//! attachment and posts them with `reqwest`.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::domain::{CapstanError, Result};
use crate::notify::{Announcement, Notifier, Wrapup};

/// Attachment colour while a deploy is running.
pub const STARTING_COLOR: &str = "#FFCC00";
/// Attachment colour for a successful wrap-up.
pub const FINISHED_COLOR: &str = "#009933";
/// Attachment colour for a failed deploy.
pub const FAILURE_COLOR: &str = "#CC0000";

const PRODUCTION_CHANNEL: &str = "#deployments-prod";
const DEFAULT_CHANNEL: &str = "#deployments-other";

/// Configuration for the Slack notifier.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Full incoming-webhook URL.
    pub webhook_url: String,
    /// Who the notification claims to be from.
    pub username: String,
    pub icon_emoji: String,
    /// Explicit channel; when unset, production deploys go to
    /// `#deployments-prod` and everything else to `#deployments-other`.
    pub channel: Option<String>,
    /// Application name shown in the announcement.
    pub application: String,
    /// SCM web UI base, used to link the revision label.
    pub scm_base_url: Option<String>,
    /// Whether this target is a production stage (drives the channel
    /// default).
    pub production: bool,
}

// -- webhook payload (https://api.slack.com/incoming-webhooks) -------------

#[derive(Debug, Serialize, PartialEq)]
struct Field {
    title: String,
    value: String,
    short: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct Attachment {
    fallback: String,
    color: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<Field>,
}

#[derive(Debug, Serialize, PartialEq)]
struct Payload {
    text: String,
    username: String,
    icon_emoji: String,
    channel: String,
    mrkdwn: bool,
    attachments: Vec<Attachment>,
}

/// `Notifier` backend posting to a Slack incoming webhook.
pub struct SlackNotifier {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(config: SlackConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn channel(&self) -> String {
        match (&self.config.channel, self.config.production) {
            (Some(channel), _) => channel.clone(),
            (None, true) => PRODUCTION_CHANNEL.to_string(),
            (None, false) => DEFAULT_CHANNEL.to_string(),
        }
    }

    /// `<url|label>` when an SCM base is configured, `---` for an empty
    /// label.
    fn revision_value(&self, label: &str) -> String {
        if label.is_empty() {
            return "---".to_string();
        }
        match &self.config.scm_base_url {
            Some(base) => format!("<{base}/tree/{label}|{label}>"),
            None => label.to_string(),
        }
    }

    fn starting_payload(&self, announcement: &Announcement) -> Payload {
        let text = format!("{} is deploying.", announcement.deployer);
        let mut fields = vec![
            Field {
                title: "Application".to_string(),
                value: self.config.application.clone(),
                short: true,
            },
            Field {
                title: "Environment".to_string(),
                value: announcement.environment.clone(),
                short: true,
            },
            Field {
                title: "Revision".to_string(),
                value: self.revision_value(&announcement.revision_label),
                short: true,
            },
        ];
        if !announcement.changelog.is_empty() {
            let lines: Vec<String> = announcement
                .changelog
                .iter()
                .map(|entry| format!("• {} ({})", entry.summary, entry.commit_link))
                .collect();
            fields.push(Field {
                title: "Changelog".to_string(),
                value: lines.join("\n"),
                short: false,
            });
        }
        Payload {
            text: text.clone(),
            username: self.config.username.clone(),
            icon_emoji: self.config.icon_emoji.clone(),
            channel: self.channel(),
            mrkdwn: true,
            attachments: vec![Attachment {
                fallback: text,
                color: STARTING_COLOR.to_string(),
                fields,
            }],
        }
    }

    fn finished_payload(&self, wrapup: &Wrapup) -> Payload {
        let text = format!(
            "{} deployed {} to {} successfully in {} seconds.",
            wrapup.deployer, self.config.application, wrapup.environment, wrapup.duration_seconds
        );
        Payload {
            text: String::new(),
            username: self.config.username.clone(),
            icon_emoji: self.config.icon_emoji.clone(),
            channel: self.channel(),
            mrkdwn: true,
            attachments: vec![Attachment {
                fallback: text.clone(),
                color: FINISHED_COLOR.to_string(),
                fields: vec![Field {
                    title: String::new(),
                    value: text,
                    short: true,
                }],
            }],
        }
    }

    async fn post(&self, payload: &Payload) -> Result<()> {
        debug!(channel = %payload.channel, "posting slack notification");
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|err| CapstanError::Notify {
                reason: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(CapstanError::Notify {
                reason: format!("webhook returned {}", response.status()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify_starting(&self, announcement: &Announcement) -> Result<()> {
        self.post(&self.starting_payload(announcement)).await
    }

    async fn notify_finished(&self, wrapup: &Wrapup) -> Result<()> {
        self.post(&self.finished_payload(wrapup)).await
    }
}
