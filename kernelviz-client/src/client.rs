use crate::{Error, Result};
use kernelviz_models::{
    Expression, GridSize, GridSnapshot, KernelSize, PlaybackState, StepResult, UpdateResponse,
};
use reqwest::{Method, Response};
use serde_json::{Value, json};
use std::{fmt::Display, time::Duration};
use tracing::{debug, instrument, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// No timeout unless set; a hung request then stalls its caller.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    client: reqwest::Client,
}

pub fn new(config: ClientConfig) -> Result<Client> {
    let base_url = parse_base_url(&config.base_url)?;

    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }
    let http_client = builder.build()?;

    Ok(Client {
        base_url,
        client: http_client,
    })
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    // Without the trailing slash `Url::join` would replace the last path segment.
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };

    Url::parse(&normalized).map_err(|error| Error::InvalidUrl {
        url: base_url.to_string(),
        message: error.to_string(),
    })
}

enum Endpoint {
    Grid,
    UpdateGridSize,
    UpdateKernelSize,
    ApplyExpression,
    ProcessStep,
    TogglePlay,
    ToggleDisplayMode,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoint = match self {
            Endpoint::Grid => "get_grid",
            Endpoint::UpdateGridSize => "update_grid_size",
            Endpoint::UpdateKernelSize => "update_kernel_size",
            Endpoint::ApplyExpression => "apply_expression",
            Endpoint::ProcessStep => "process_step",
            Endpoint::TogglePlay => "toggle_play",
            Endpoint::ToggleDisplayMode => "toggle_display_mode",
        };

        f.write_str(endpoint)
    }
}

macro_rules! get {
    ($self:ident, $endpoint:expr) => {
        match $self.make_call(Method::GET, $endpoint, None).await {
            Ok(response) => serde_json::from_str(response.as_str()).map_err(|error| {
                Error::DeserializeJson {
                    message: error.to_string(),
                }
            }),
            Err(error) => Err(error),
        }
    };
}

macro_rules! post {
    ($self:ident, $endpoint:expr) => {
        post!($self, $endpoint, None)
    };
    ($self:ident, $endpoint:expr, $body:expr) => {
        match $self.make_call(Method::POST, $endpoint, $body).await {
            Ok(response) => serde_json::from_str(response.as_str()).map_err(|error| {
                Error::DeserializeJson {
                    message: error.to_string(),
                }
            }),
            Err(error) => Err(error),
        }
    };
}

impl Client {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[instrument(skip(self))]
    pub async fn grid(&self) -> Result<GridSnapshot> {
        get!(self, Endpoint::Grid)
    }

    #[instrument(skip(self))]
    pub async fn update_grid_size(&self, grid_size: GridSize) -> Result<UpdateResponse> {
        post!(
            self,
            Endpoint::UpdateGridSize,
            Some(json!({ "grid_size": grid_size.get() }))
        )
    }

    #[instrument(skip(self))]
    pub async fn update_kernel_size(&self, kernel_size: KernelSize) -> Result<UpdateResponse> {
        post!(
            self,
            Endpoint::UpdateKernelSize,
            Some(json!({ "kernel_size": kernel_size.get() }))
        )
    }

    #[instrument(skip(self))]
    pub async fn apply_expression(&self, expression: &Expression) -> Result<UpdateResponse> {
        post!(
            self,
            Endpoint::ApplyExpression,
            Some(json!({ "expression": expression.as_str() }))
        )
    }

    #[instrument(skip(self))]
    pub async fn process_step(&self) -> Result<StepResult> {
        post!(self, Endpoint::ProcessStep)
    }

    #[instrument(skip(self))]
    pub async fn toggle_play(&self) -> Result<PlaybackState> {
        post!(self, Endpoint::TogglePlay)
    }

    #[instrument(skip(self))]
    pub async fn toggle_display_mode(&self) -> Result<UpdateResponse> {
        post!(self, Endpoint::ToggleDisplayMode)
    }

    async fn make_call(
        &self,
        method: Method,
        endpoint: Endpoint,
        body: Option<Value>,
    ) -> Result<String> {
        let url = self
            .base_url
            .join(&endpoint.to_string())
            .map_err(|error| Error::InvalidUrl {
                url: format!("{}{}", self.base_url, endpoint),
                message: error.to_string(),
            })?;

        debug!("calling {} {}, with body {body:?}", method, url);
        let mut request = self.client.request(method, url);

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn handle_response(&self, response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            let message = serde_json::from_str::<UpdateResponse>(&body)
                .ok()
                .and_then(|response| response.error)
                .unwrap_or_else(|| status.to_string());

            warn!(status = status.as_u16(), "request rejected: {message}");

            Err(Error::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
