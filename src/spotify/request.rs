use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub(crate) fn bearer(request: RequestBuilder, access_token: &str) -> Result<RequestBuilder> {
    let value = HeaderValue::from_str(&format!("Bearer {access_token}"))
        .map_err(|_| Error::NotAuthenticated)?;
    Ok(request.header(AUTHORIZATION, value))
}

/// Sends a Web API request and decodes the JSON body, turning Spotify's
/// `{"error": {"message": ..}}` replies into [`Error::Api`].
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        return Err(Error::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
