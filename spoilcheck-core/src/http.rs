//! HTTP session wrapper for the verifier. A thin layer over
//! `reqwest::Client` that pins the base URL and bearer token of the run,
//! offers the verb-specific calls the scenarios need, and mirrors each
//! request/response pair into a task-local channel so reporters can show
//! the traffic behind a failed scenario.

use eyre::WrapErr;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::{
    ops::Deref,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::broadcast;
use tracing::*;
use url::Url;

pub use reqwest::{Method, StatusCode};

tokio::task_local! {
    pub static CHANNEL: Arc<Mutex<Option<broadcast::Sender<Log>>>>;
}

/// Subscribe to the channel to see the real-time network logs.
pub fn subscribe() -> eyre::Result<broadcast::Receiver<Log>> {
    let ch = CHANNEL.get();
    let Ok(guard) = ch.lock() else {
        eyre::bail!("failed to acquire http channel lock");
    };
    let Some(tx) = guard.deref() else {
        eyre::bail!("http channel has been already closed");
    };

    Ok(tx.subscribe())
}

/// Mirror a completed call into the capture channel, if one is in scope.
/// Setup code such as the authentication exchange runs outside the runner
/// and has no channel; capture is skipped there.
fn capture(log: Log) -> eyre::Result<()> {
    let Ok(ch) = CHANNEL.try_with(Arc::clone) else {
        return Ok(());
    };
    let Ok(guard) = ch.lock() else {
        eyre::bail!("failed to acquire http channel lock");
    };
    if let Some(tx) = guard.deref() {
        tx.send(log)
            .wrap_err("failed to send a message to http channel")?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HttpError: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to deserialize http response into the specified type: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("{0:#}")]
    Unexpected(eyre::Error),
}

// Manual impl: `eyre::Report` does not implement `std::error::Error`, so
// thiserror's `#[from]` cannot derive this one.
impl From<eyre::Error> for Error {
    fn from(e: eyre::Error) -> Error {
        Error::Unexpected(e)
    }
}

#[derive(Debug, Clone)]
pub struct LogRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
}

#[derive(Debug, Clone, Default)]
pub struct LogResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Log {
    pub request: LogRequest,
    pub response: LogResponse,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub headers: HeaderMap,
    pub status: StatusCode,
    pub text: String,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub async fn text(self) -> Result<String, Error> {
        Ok(self.text)
    }

    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, Error> {
        Ok(serde_json::from_str(&self.text)?)
    }

    async fn from(res: reqwest::Response) -> Self {
        Response {
            headers: res.headers().clone(),
            status: res.status(),
            text: res.text().await.unwrap_or_default(),
        }
    }
}

/// The verifier's HTTP session: one base URL, one optional bearer token,
/// shared by every call of the run. No retries, no caching.
#[derive(Debug, Clone)]
pub struct Client {
    inner: reqwest::Client,
    base_url: Url,
    bearer: Option<String>,
}

impl Client {
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.into(),
            bearer: None,
            timeout: None,
        }
    }

    /// Session without a token, e.g. for the authentication call itself.
    pub fn new(base_url: impl Into<String>) -> Result<Client, Error> {
        Client::builder(base_url).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    // A join failure is deferred into the builder and surfaced by send(),
    // so call sites keep the fluent reqwest shape.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let inner = self.base_url.join(path).map_err(Error::from).map(|url| {
            debug!("Requesting {method} {url}");
            let req = self.inner.request(method, url);
            match &self.bearer {
                Some(token) => req.bearer_auth(token),
                None => req,
            }
        });
        RequestBuilder {
            inner,
            client: self.inner.clone(),
        }
    }
}

pub struct ClientBuilder {
    base_url: String,
    bearer: Option<String>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Attach the bearer token issued by the authentication endpoint.
    pub fn bearer(mut self, token: impl Into<String>) -> ClientBuilder {
        self.bearer = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> ClientBuilder {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Client {
            inner: builder.build()?,
            base_url: Url::parse(&self.base_url)?,
            bearer: self.bearer,
        })
    }
}

pub struct RequestBuilder {
    inner: Result<reqwest::RequestBuilder, Error>,
    client: reqwest::Client,
}

impl RequestBuilder {
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> RequestBuilder {
        self.inner = self.inner.map(|inner| inner.json(json));
        self
    }

    pub fn header<K, V>(mut self, key: K, value: V) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.inner = self.inner.map(|inner| inner.header(key, value));
        self
    }

    pub async fn send(self) -> Result<Response, Error> {
        let req = self.inner?.build()?;

        let log_request = LogRequest {
            url: req.url().clone(),
            method: req.method().clone(),
            headers: req.headers().clone(),
        };

        match self.client.execute(req).await {
            Ok(res) => {
                let res = Response::from(res).await;
                capture(Log {
                    request: log_request,
                    response: LogResponse {
                        status: Some(res.status),
                        headers: res.headers.clone(),
                        body: res.text.clone(),
                    },
                })?;
                Ok(res)
            }
            Err(e) => {
                capture(Log {
                    request: log_request,
                    response: LogResponse::default(),
                })?;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[tokio::test]
    async fn bearer_token_is_attached() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/ping")
            .match_header("authorization", "Bearer secret-token")
            .with_status(200)
            .with_body("pong")
            .create_async()
            .await;

        let client = Client::builder(server.url()).bearer("secret-token").build()?;
        let res = client.get("/ping").send().await?;

        m.assert_async().await;
        assert_eq!(StatusCode::OK, res.status());
        assert_eq!("pong", res.text().await?);
        Ok(())
    }

    #[tokio::test]
    async fn json_response_deserializes() -> eyre::Result<()> {
        #[derive(Debug, Deserialize)]
        struct Pong {
            ok: bool,
        }

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/echo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = Client::new(server.url())?;
        let res = client
            .post("/echo")
            .json(&serde_json::json!({"name": "n"}))
            .send()
            .await?;
        let pong: Pong = res.json().await?;
        assert!(pong.ok);
        Ok(())
    }

    #[tokio::test]
    async fn calls_are_captured_in_scope() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/captured")
            .with_status(200)
            .with_body("done")
            .create_async()
            .await;

        let client = Client::new(server.url())?;
        let slot = Arc::new(Mutex::new(Some(broadcast::channel(16).0)));
        CHANNEL
            .scope(slot, async move {
                let mut rx = subscribe()?;
                client.get("/captured").send().await?;

                let log = rx.try_recv()?;
                assert_eq!(Method::GET, log.request.method);
                assert!(log.request.url.path().ends_with("/captured"));
                assert_eq!(Some(StatusCode::OK), log.response.status);
                assert_eq!("done", log.response.body);
                eyre::Ok(())
            })
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn capture_is_skipped_outside_scope() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/plain")
            .with_status(200)
            .create_async()
            .await;

        // No task-local channel here; the call must still succeed.
        let client = Client::new(server.url())?;
        let res = client.get("/plain").send().await?;
        assert_eq!(StatusCode::OK, res.status());
        Ok(())
    }

    #[test]
    fn invalid_base_url_surfaces_at_build() {
        assert!(Client::new("not a url").is_err());
    }
}
