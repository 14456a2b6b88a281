//! The REST collaborator of the gateway engine.
//!
//! Only gateway URL discovery lives here; the wider HTTP API surface is a
//! separate concern and not part of this crate.

use std::fmt::Display;

use serde::Deserialize;

use crate::error::Result;

/// Base URL of the Discord HTTP API.
pub const API_URL: &str = "https://discord.com/api";

/// The API version requests are made against.
pub const API_VERSION: u8 = 10;

#[derive(Debug)]
pub enum Error {
    /// A transport-level failure.
    Http(reqwest::Error),
    /// A non-success response from the API.
    Api {
        /// The HTTP status code.
        status: u16,
        /// The response body, useful for diagnostics.
        body: String,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(err) => Display::fmt(&err, f),
            Error::Api { status, body } => write!(f, "REST request failed with {status}: {body}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Api { .. } => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

#[derive(Debug, Clone, Deserialize)]
/// Response of `GET /gateway`.
pub struct GetGateway {
    /// The WSS URL clients may connect to.
    pub url: String,
}

/// A minimal Discord REST client.
///
/// Redirects are followed and HTTP/2 is negotiated when the server offers
/// it, both reqwest defaults.
#[derive(Debug, Clone)]
pub struct Rest {
    http: reqwest::Client,
}

impl Rest {
    pub fn new(user_agent: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent.unwrap_or(crate::USER_AGENT))
            .build()
            .map_err(Error::from)?;

        Ok(Self { http })
    }

    /// Discover the gateway WSS URL.
    ///
    /// [Discord documentation](https://discord.com/developers/docs/events/gateway#get-gateway)
    pub async fn get_gateway(&self) -> Result<GetGateway> {
        let response = self
            .http
            .get(format!("{API_URL}/v{API_VERSION}/gateway"))
            .send()
            .await
            .map_err(Error::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            })?;
        }

        Ok(response.json().await.map_err(Error::from)?)
    }
}
