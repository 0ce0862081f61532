use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{RawRiver, RawStation};
use crate::error::FangstError;

/// Read-side interface to the field-data service. PostgREST-style endpoints
/// returning arrays of snake_case records.
pub trait ApiClient: Send + Sync {
    fn fetch_rivers(&self) -> Result<Vec<RawRiver>, FangstError>;
    fn fetch_stations(&self) -> Result<Vec<RawStation>, FangstError>;
    fn fetch_river_summary(&self, id: i64) -> Result<Vec<RawRiver>, FangstError>;
    fn fetch_station_summary(&self, id: i64) -> Result<Vec<RawStation>, FangstError>;
    fn fetch_station_download(&self, ids: &[i64]) -> Result<Vec<RawStation>, FangstError>;
}

#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    auth_url: String,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl HttpApiClient {
    pub fn new(base_url: &str, auth_url: &str) -> Result<Self, FangstError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("fangstdata/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FangstError::ApiHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| FangstError::ApiHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_url: auth_url.trim_end_matches('/').to_string(),
        })
    }

    /// Session-cookie login. The cookie jar keeps the session for later
    /// fetches; nothing is returned on success.
    pub fn login(&self, username: &str, password: &str) -> Result<(), FangstError> {
        let response = self
            .client
            .post(format!("{}/login", self.auth_url))
            .json(&Credentials { username, password })
            .send()
            .map_err(|err| FangstError::ApiHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FangstError::Auth(status_text(response.status())));
        }
        Ok(())
    }

    fn refresh_session(&self) -> Result<(), FangstError> {
        let response = self
            .client
            .post(format!("{}/refresh", self.auth_url))
            .send()
            .map_err(|err| FangstError::ApiHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FangstError::Auth(status_text(response.status())));
        }
        Ok(())
    }

    /// A 401 gets one session refresh and one retry; 204 means no content and
    /// yields an empty list; any other non-2xx surfaces the HTTP status text.
    fn get_records<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<Vec<T>, FangstError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let mut response = self.send_with_retries(|| self.client.get(&url))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.refresh_session()?;
            response = self.send_with_retries(|| self.client.get(&url))?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(FangstError::Auth(status_text(response.status())));
            }
        }
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(FangstError::ApiStatus {
                status: response.status().as_u16(),
                message: status_text(response.status()),
            });
        }
        response
            .json()
            .map_err(|err| FangstError::ApiHttp(err.to_string()))
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, FangstError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(FangstError::ApiHttp(err.to_string()));
                }
            }
        }
    }
}

impl ApiClient for HttpApiClient {
    fn fetch_rivers(&self) -> Result<Vec<RawRiver>, FangstError> {
        self.get_records("/rivers")
    }

    fn fetch_stations(&self) -> Result<Vec<RawStation>, FangstError> {
        self.get_records("/stations")
    }

    fn fetch_river_summary(&self, id: i64) -> Result<Vec<RawRiver>, FangstError> {
        self.get_records(&format!("/rivers?id=eq.{id}"))
    }

    fn fetch_station_summary(&self, id: i64) -> Result<Vec<RawStation>, FangstError> {
        self.get_records(&format!("/stations?id=eq.{id}&select=*,observations(*)"))
    }

    fn fetch_station_download(&self, ids: &[i64]) -> Result<Vec<RawStation>, FangstError> {
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.get_records(&format!(
            "/stations?id=in.({id_list})&select=*,observations(*)"
        ))
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
