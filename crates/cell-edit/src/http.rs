//! `reqwest`-backed [`RemoteWriter`].

use futures_util::future::BoxFuture;

use crate::config::{HttpWriterConfig, PayloadEncoding};
use crate::error::RemoteWriteError;
use crate::persistence::{RemoteWriter, SaveRequest};

/// Posts save requests over HTTP(S). Any 2xx answer counts as success.
#[derive(Clone, Debug)]
pub struct HttpRemoteWriter {
    client: reqwest::Client,
    config: HttpWriterConfig,
}

impl HttpRemoteWriter {
    pub fn new(config: HttpWriterConfig) -> Result<Self, RemoteWriteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| RemoteWriteError::Transport(err.to_string()))?;
        Ok(Self { client, config })
    }

    /// Reuse an existing client (connection pool, proxy settings, ...). `config.timeout_ms` is
    /// applied per request.
    pub fn with_client(client: reqwest::Client, config: HttpWriterConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &HttpWriterConfig {
        &self.config
    }

    async fn send(&self, request: &SaveRequest) -> Result<(), RemoteWriteError> {
        let body = request.body();
        let mut builder = self
            .client
            .post(request.endpoint.clone())
            .timeout(self.config.timeout());
        for (name, value) in &self.config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match self.config.encoding {
            PayloadEncoding::Form => builder.form(&body),
            PayloadEncoding::Json => builder.json(&body),
        };

        let response = builder.send().await.map_err(|err| {
            if err.is_builder() {
                RemoteWriteError::Encode(err.to_string())
            } else {
                RemoteWriteError::Transport(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteWriteError::Status {
                status: status.as_u16(),
                url: request.endpoint.to_string(),
            });
        }
        Ok(())
    }
}

impl RemoteWriter for HttpRemoteWriter {
    fn post<'a>(&'a self, request: &'a SaveRequest) -> BoxFuture<'a, Result<(), RemoteWriteError>> {
        Box::pin(self.send(request))
    }
}
