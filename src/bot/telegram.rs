use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::join_all;

use crate::{
    bot::Notifier,
    config,
    util::http::{HttpTransport, JsonTransport},
};

const API_HOST: &str = "https://api.telegram.org";

pub struct Telegram {
    send_message_url: String,
    chat_ids: Vec<i64>,
    transport: Arc<dyn JsonTransport>,
}

impl Telegram {
    pub fn new(settings: &config::Telegram) -> Self {
        Self::with_transport(settings, Arc::new(HttpTransport))
    }

    pub fn with_transport(settings: &config::Telegram, transport: Arc<dyn JsonTransport>) -> Self {
        Self {
            send_message_url: format!("{}/bot{}/sendMessage", API_HOST, settings.token),
            chat_ids: settings.chat_ids.clone(),
            transport,
        }
    }

    /// 同時送給所有 chat，回傳第一個失敗
    pub async fn send(&self, message: &str) -> Result<()> {
        let futures: Vec<_> = self
            .chat_ids
            .iter()
            .map(|id| self.send_message(*id, message))
            .collect();

        join_all(futures)
            .await
            .into_iter()
            .find(|res| res.is_err())
            .unwrap_or_else(|| Ok(()))
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let chat_id = chat_id.to_string();
        let res = self
            .transport
            .post_form_json(
                &self.send_message_url,
                None,
                &[
                    ("chat_id", chat_id.as_str()),
                    ("text", text),
                    ("disable_notification", "true"),
                ],
            )
            .await
            .map_err(|err| anyhow!("Failed to send_message because: {:?}", err))?;

        match res.get("ok").and_then(|ok| ok.as_bool()) {
            Some(true) => Ok(()),
            _ => Err(anyhow!("Telegram rejected the message: {}", res)),
        }
    }
}

#[async_trait]
impl Notifier for Telegram {
    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.send(&format!("{}\r\n{}", title, body)).await
    }
}
