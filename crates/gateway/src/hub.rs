//! The seam between HTTP handlers and whatever produces the answers.

use std::{collections::HashMap, time::Duration};

use {
    async_trait::async_trait,
    base64::{Engine, engine::general_purpose::STANDARD},
    hubline_bus::BusError,
    hubline_config::GatewayConfig,
    hubline_sessions::SessionId,
    serde::{Deserialize, Serialize},
};

const DEFAULT_LANDING_PAGE: &str = include_str!("assets/landing.html");

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub did not answer within {0:?}")]
    Timeout(Duration),

    #[error("unknown media '{0}'")]
    UnknownMedia(String),

    #[error("media '{key}' is not valid base64: {reason}")]
    BadMedia { key: String, reason: String },

    #[error("hub connection closed")]
    Closed,

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Body of a `json-post` answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonAnswer {
    pub messages: Vec<String>,
    pub explanations: Vec<String>,
}

impl JsonAnswer {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            messages: vec![text.into()],
            explanations: Vec::new(),
        }
    }
}

#[async_trait]
pub trait HubService: Send + Sync {
    /// Answer to `text`, or the default answer when there is no text.
    async fn text_answer(
        &self,
        session: &SessionId,
        text: Option<&str>,
    ) -> Result<String, HubError>;

    async fn json_answer(&self, session: &SessionId, text: &str) -> Result<JsonAnswer, HubError>;

    /// Raw bytes of the media item `key`.
    async fn media_answer(&self, key: &str) -> Result<Vec<u8>, HubError>;

    fn landing_page(&self) -> String;
}

/// Canned answers taken from configuration.
#[derive(Debug, Clone)]
pub struct StaticHub {
    default_answer: String,
    landing_page: Option<String>,
    media: HashMap<String, String>,
}

impl StaticHub {
    pub fn new(default_answer: impl Into<String>) -> Self {
        Self {
            default_answer: default_answer.into(),
            landing_page: None,
            media: HashMap::new(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            default_answer: config.default_answer.clone(),
            landing_page: config.landing_page.clone(),
            media: config.media.clone(),
        }
    }

    pub fn with_media(mut self, key: impl Into<String>, base64: impl Into<String>) -> Self {
        self.media.insert(key.into(), base64.into());
        self
    }

    fn decode_media(&self, key: &str) -> Result<Vec<u8>, HubError> {
        let encoded = self
            .media
            .get(key)
            .ok_or_else(|| HubError::UnknownMedia(key.to_string()))?;
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| HubError::BadMedia {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl HubService for StaticHub {
    async fn text_answer(
        &self,
        _session: &SessionId,
        _text: Option<&str>,
    ) -> Result<String, HubError> {
        Ok(self.default_answer.clone())
    }

    async fn json_answer(&self, _session: &SessionId, _text: &str) -> Result<JsonAnswer, HubError> {
        Ok(JsonAnswer::message(self.default_answer.clone()))
    }

    async fn media_answer(&self, key: &str) -> Result<Vec<u8>, HubError> {
        self.decode_media(key)
    }

    fn landing_page(&self) -> String {
        self.landing_page
            .clone()
            .unwrap_or_else(|| DEFAULT_LANDING_PAGE.to_string())
    }
}
