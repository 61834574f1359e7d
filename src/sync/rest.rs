//! [`CommandApi`] over the platform's REST API.

use std::time::Duration;

use async_trait::async_trait;
use cordkit_proto::{RemoteCommand, Snowflake};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::api::CommandApi;
use crate::commands::Scope;
use crate::config::ApiConfig;
use crate::error::ApiError;

/// REST client for the application-command endpoints.
#[derive(Debug, Clone)]
pub struct HttpCommandApi {
    client: Client,
    base_url: String,
    application_id: Snowflake,
    bot_token: String,
}

impl HttpCommandApi {
    pub fn new(application_id: Snowflake, token: &str, config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        // Accept tokens pasted with their scheme.
        let bot_token = token.strip_prefix("Bot ").unwrap_or(token).to_string();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            application_id,
            bot_token,
        })
    }

    fn commands_url(&self, scope: Scope) -> String {
        match scope {
            Scope::Global => format!("{}/applications/{}/commands", self.base_url, self.application_id),
            Scope::Guild(guild) => format!(
                "{}/applications/{}/guilds/{}/commands",
                self.base_url, self.application_id, guild
            ),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bot {}", self.bot_token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Option<Value>, ApiError> {
        let response = request.send().await?;
        handle_response(response).await
    }

    async fn send_command(&self, request: RequestBuilder) -> Result<RemoteCommand, ApiError> {
        let body = self.send(request).await?.unwrap_or(Value::Null);
        Ok(RemoteCommand::from_payload(body)?)
    }
}

/// Map a response to its JSON body, or to an error for non-2xx statuses.
/// `204 No Content` yields `None`.
async fn handle_response(response: Response) -> Result<Option<Value>, ApiError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let header = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok());
        let retry_after = match header {
            Some(secs) => secs,
            None => response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.retry_after)
                .unwrap_or(30.0),
        };
        return Err(ApiError::RateLimited { retry_after });
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let bytes = response.bytes().await?;
    if status.is_success() {
        return Ok(Some(serde_json::from_slice(&bytes)?));
    }

    let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_else(|_| ErrorBody {
        code: None,
        message: Some(String::from_utf8_lossy(&bytes).into_owned()),
        retry_after: None,
    });
    Err(ApiError::Api {
        status: status.as_u16(),
        code: body.code,
        message: body.message.unwrap_or_else(|| "Unknown error".into()),
    })
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<i64>,
    message: Option<String>,
    retry_after: Option<f64>,
}

#[async_trait]
impl CommandApi for HttpCommandApi {
    #[instrument(skip(self), fields(scope = %scope))]
    async fn list_commands(&self, scope: Scope) -> Result<Vec<RemoteCommand>, ApiError> {
        let url = self.commands_url(scope);
        let body = self.send(self.request(Method::GET, &url)).await?;
        let Some(Value::Array(items)) = body else {
            return Ok(Vec::new());
        };
        debug!(count = items.len(), "Listed remote commands");
        items
            .into_iter()
            .map(|item| RemoteCommand::from_payload(item).map_err(ApiError::from))
            .collect()
    }

    #[instrument(skip(self, payload), fields(scope = %scope))]
    async fn create_command(&self, scope: Scope, payload: &Value) -> Result<RemoteCommand, ApiError> {
        let url = self.commands_url(scope);
        self.send_command(self.request(Method::POST, &url).json(payload))
            .await
    }

    #[instrument(skip(self, payload), fields(scope = %scope))]
    async fn update_command(
        &self,
        scope: Scope,
        id: Snowflake,
        payload: &Value,
    ) -> Result<RemoteCommand, ApiError> {
        let url = format!("{}/{}", self.commands_url(scope), id);
        self.send_command(self.request(Method::PATCH, &url).json(payload))
            .await
    }

    #[instrument(skip(self), fields(scope = %scope))]
    async fn delete_command(&self, scope: Scope, id: Snowflake) -> Result<(), ApiError> {
        let url = format!("{}/{}", self.commands_url(scope), id);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> HttpCommandApi {
        let config = ApiConfig {
            base_url: "https://chat.example/api/v10/".into(),
            ..ApiConfig::default()
        };
        HttpCommandApi::new(Snowflake(11), "Bot secret", &config).unwrap()
    }

    #[test]
    fn test_urls() {
        let api = api();
        assert_eq!(
            api.commands_url(Scope::Global),
            "https://chat.example/api/v10/applications/11/commands"
        );
        assert_eq!(
            api.commands_url(Scope::Guild(Snowflake(22))),
            "https://chat.example/api/v10/applications/11/guilds/22/commands"
        );
    }

    #[test]
    fn test_token_prefix_stripped() {
        assert_eq!(api().bot_token, "secret");
    }
}
