//! Slack Web API client for posting and updating status messages.

use std::fmt;

use ci_status_core::{
    Error, Result,
    dispatch::{Message, MessageApi},
};
use serde::Deserialize;
use serde_json::{Value, json};

const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    bot_token: String,
}

impl fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackClient").finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Request body for `chat.postMessage`, or `chat.update` when `ts` is set.
fn message_body(message: &Message, ts: Option<&str>) -> Value {
    let mut body = json!({
        "channel": message.channel,
        "text": message.text,
        "blocks": message.blocks,
        "unfurl_links": false,
        "unfurl_media": false,
    });
    if let Some(ts) = ts {
        body["ts"] = json!(ts);
    }
    body
}

impl SlackClient {
    pub fn new(bot_token: String) -> Self { Self { http: reqwest::Client::new(), bot_token } }

    pub async fn post_message(&self, message: &Message) -> Result<String> {
        tracing::debug!(channel = %message.channel, "Posting message");
        let resp = self.call_bot_api("chat.postMessage", &message_body(message, None)).await?;
        resp.ts.ok_or_else(|| Error::Dispatch("chat.postMessage response missing 'ts'".into()))
    }

    pub async fn update_message(&self, ts: &str, message: &Message) -> Result<String> {
        tracing::debug!(channel = %message.channel, ts, "Updating message");
        let resp = self.call_bot_api("chat.update", &message_body(message, Some(ts))).await?;
        resp.ts.ok_or_else(|| Error::Dispatch("chat.update response missing 'ts'".into()))
    }

    async fn call_bot_api(&self, method: &str, body: &Value) -> Result<SlackApiResponse> {
        let resp = self
            .http
            .post(format!("{SLACK_API_BASE}/{method}"))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Dispatch(format!("{method} request failed: {e}")))?;
        let api_resp: SlackApiResponse = resp
            .json()
            .await
            .map_err(|e| Error::Dispatch(format!("{method} response parse failed: {e}")))?;
        if !api_resp.ok {
            let error = api_resp.error.unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(method, error = %error, "Slack API error");
            return Err(Error::Dispatch(error));
        }
        Ok(api_resp)
    }
}

impl MessageApi for SlackClient {
    async fn post(&self, message: &Message) -> Result<String> { self.post_message(message).await }

    async fn update(&self, message_id: &str, message: &Message) -> Result<String> {
        self.update_message(message_id, message).await
    }
}
