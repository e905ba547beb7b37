use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::KeyValueStore;
use crate::error::StoreError;

/// Remote Redis reached through the Upstash REST interface.
///
/// `GET {url}/get/{key}` and `POST {url}/set/{key}` (value as the body), both
/// authorized with a bearer token. Replies are `{"result": ...}` on success and
/// `{"error": "..."}` otherwise.
#[derive(Debug, Clone)]
pub struct UpstashStore {
    client: Client,
    url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UpstashReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(url: &str, token: &str) -> Self {
        UpstashStore {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn read_reply(res: reqwest::Response) -> Result<Value, StoreError> {
        let status = res.status();
        let reply: UpstashReply = res.json().await?;

        if let Some(error) = reply.error {
            return Err(StoreError::Rejected(error));
        }
        if !status.is_success() {
            return Err(StoreError::Rejected(status.to_string()));
        }

        Ok(reply.result)
    }
}

#[async_trait]
impl KeyValueStore for UpstashStore {
    fn backend(&self) -> &'static str {
        "upstash"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let url = format!("{}/get/{}", self.url, key);
        let res = self.client.get(&url).bearer_auth(&self.token).send().await?;

        match Self::read_reply(res).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let url = format!("{}/set/{}", self.url, key);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .body(value.to_string())
            .send()
            .await?;

        Self::read_reply(res).await?;

        Ok(())
    }
}
