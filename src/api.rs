use crate::attachment::PickedFile;
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unreadable response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server returned {0}")]
    Status(u16),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatMode {
    Text,
    Search,
    Image,
    File,
}

impl ChatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatMode::Text => "text",
            ChatMode::Search => "search",
            ChatMode::Image => "image",
            ChatMode::File => "file",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Upload {
    Image(PickedFile),
    File(PickedFile),
}

impl Upload {
    fn field(&self) -> &'static str {
        match self {
            Upload::Image(_) => "image",
            Upload::File(_) => "file",
        }
    }

    fn file(&self) -> &PickedFile {
        match self {
            Upload::Image(file) | Upload::File(file) => file,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub personality: String,
    pub model: String,
    pub mode: ChatMode,
    pub upload: Option<Upload>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegenerateRequest {
    pub personality: String,
    pub model: String,
}

/// What the backend said, when it answered at all.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiReply {
    Answer(String),
    /// Non-2xx status, with the server's `error` text if it sent one.
    Rejected(Option<String>),
}

#[derive(Deserialize)]
struct ReplyBody {
    response: Option<String>,
    error: Option<String>,
}

/// Interprets a `{response}` / `{error}` body for the given status.
pub fn parse_reply(success: bool, body: &str) -> ApiResult<ApiReply> {
    let parsed: ReplyBody = serde_json::from_str(body)?;
    Ok(match (success, parsed.response) {
        (true, Some(answer)) => ApiReply::Answer(answer),
        _ => ApiReply::Rejected(parsed.error.filter(|e| !e.trim().is_empty())),
    })
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> ApiResult<ApiReply>;
    async fn regenerate(&self, request: RegenerateRequest) -> ApiResult<ApiReply>;
    async fn clear(&self) -> ApiResult<()>;
}

pub struct HttpChatApi {
    client: Client,
    chat_url: String,
    regenerate_url: String,
    clear_url: String,
}

impl HttpChatApi {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            chat_url: config.endpoint("api/chat"),
            regenerate_url: config.endpoint("api/regenerate"),
            clear_url: config.endpoint("api/clear"),
        }
    }

    fn build_form(request: ChatRequest) -> ApiResult<Form> {
        let mut form = Form::new()
            .text("message", request.message)
            .text("personality", request.personality)
            .text("model", request.model)
            .text("mode", request.mode.as_str());
        if let Some(upload) = request.upload {
            let field = upload.field();
            let file = upload.file().clone();
            let part = Part::bytes(file.bytes)
                .file_name(file.name)
                .mime_str(&file.mime)?;
            form = form.part(field, part);
        }
        Ok(form)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn chat(&self, request: ChatRequest) -> ApiResult<ApiReply> {
        let mode = request.mode;
        let form = Self::build_form(request)?;
        tracing::debug!(mode = mode.as_str(), "posting chat message");
        let response = self
            .client
            .post(&self.chat_url)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(%status, "chat request rejected");
        }
        parse_reply(status.is_success(), &body)
    }

    async fn regenerate(&self, request: RegenerateRequest) -> ApiResult<ApiReply> {
        let response = self
            .client
            .post(&self.regenerate_url)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        parse_reply(status.is_success(), &body)
    }

    async fn clear(&self) -> ApiResult<()> {
        let response = self
            .client
            .post(&self.clear_url)
            .header("content-type", "application/json")
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_shapes() {
        assert_eq!(
            parse_reply(true, r#"{"response":"hi"}"#).unwrap(),
            ApiReply::Answer("hi".to_string())
        );
        assert_eq!(
            parse_reply(false, r#"{"error":"Model tidak valid"}"#).unwrap(),
            ApiReply::Rejected(Some("Model tidak valid".to_string()))
        );
        assert_eq!(parse_reply(false, "{}").unwrap(), ApiReply::Rejected(None));
        assert!(matches!(
            parse_reply(false, "<html>502</html>"),
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn test_endpoints_follow_config() {
        let config = Config {
            api_base: "http://example.test/calavera-ai".to_string(),
            ..Config::default()
        };
        let api = HttpChatApi::new(&config);
        assert_eq!(api.chat_url, "http://example.test/calavera-ai/api/chat");
        assert_eq!(api.clear_url, "http://example.test/calavera-ai/api/clear");
    }

    #[test]
    fn test_form_accepts_upload() {
        let request = ChatRequest {
            message: "what is this?".to_string(),
            personality: String::new(),
            model: "gemini".to_string(),
            mode: ChatMode::Image,
            upload: Some(Upload::Image(PickedFile::new("cat.png", vec![1, 2, 3]))),
        };
        assert!(HttpChatApi::build_form(request).is_ok());
    }
}
