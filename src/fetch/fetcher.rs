use std::time::Duration;

use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::constants::PKG_VERSION;
use crate::errors::ClientError;
use crate::errors::ErrorKind::*;
use crate::model::flag::FeatureFlagCollection;
use crate::model::Error;

const APP_NAME_HEADER: &str = "unleash-appname";
const INSTANCE_ID_HEADER: &str = "unleash-instanceid";

pub struct Fetcher {
    url: String,
    http_client: reqwest::Client,
}

impl Fetcher {
    pub fn new(
        url: String,
        timeout: Duration,
        app_name: Option<&str>,
        instance_id: Option<&str>,
        extra_headers: &[(String, String)],
    ) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            header_value(format!("unleash-client-rust/{PKG_VERSION}").as_str())?,
        );
        if let Some(app_name) = app_name {
            headers.insert(APP_NAME_HEADER, header_value(app_name)?);
        }
        if let Some(instance_id) = instance_id {
            headers.insert(INSTANCE_ID_HEADER, header_value(instance_id)?);
        }
        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                ClientError::new(
                    HttpClientInitFailure,
                    format!("Invalid HTTP header name '{name}'. {err}"),
                )
            })?;
            headers.insert(name, header_value(value)?);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| {
                ClientError::new(
                    HttpClientInitFailure,
                    format!("Failed to initialize the HTTP client. {err}"),
                )
            })?;
        Ok(Self { url, http_client })
    }

    /// Issues one request to the features endpoint and decodes the response.
    pub async fn fetch(&self) -> Result<FeatureFlagCollection, ClientError> {
        let result = self.http_client.get(self.url.as_str()).send().await;

        match result {
            Ok(response) => match response.status().as_u16() {
                200 => {
                    let body_result = response.text().await;
                    match body_result {
                        Ok(body_str) => match FeatureFlagCollection::from_json(body_str.as_str()) {
                            Ok(flags) => {
                                debug!("Fetch was successful: {} feature flags fetched", flags.len());
                                Ok(flags)
                            }
                            Err(parse_error) => Err(report(decode_error(parse_error))),
                        },
                        Err(body_error) => {
                            let msg = format!("Fetching feature flags was successful but the HTTP response content was invalid. {body_error}");
                            Err(report(ClientError::new(InvalidHttpResponseContent, msg)))
                        }
                    }
                }
                code => {
                    let msg = format!("Unexpected HTTP response was received while trying to fetch feature flags. Status code: {code}");
                    Err(report(ClientError::new(UnexpectedHttpResponse, msg)))
                }
            },
            Err(error) => {
                if error.is_timeout() {
                    let msg = "Request timed out while trying to fetch feature flags.".to_owned();
                    Err(report(ClientError::new(HttpRequestTimeout, msg)))
                } else {
                    let msg = format!("Unexpected error occurred while trying to fetch feature flags. It is most likely due to a local network issue. Please make sure your application can reach the flag service over HTTP. {error}");
                    Err(report(ClientError::new(HttpRequestFailure, msg)))
                }
            }
        }
    }
}

/// Maps a flag set decoding failure to the client error reported for it.
fn decode_error(err: Error) -> ClientError {
    ClientError::new(
        InvalidHttpResponseContent,
        format!("Fetching feature flags was successful but the HTTP response content was invalid. {err}"),
    )
}

fn report(err: ClientError) -> ClientError {
    error!(event_id = err.kind.as_u8(); "{}", err);
    err
}

fn header_value(value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|err| {
        ClientError::new(
            HttpClientInitFailure,
            format!("Invalid HTTP header value '{value}'. {err}"),
        )
    })
}
