//! Firebase Realtime Database client over HTTPS
//!
//! Each request opens a fresh TLS connection; the feeder makes at most a
//! handful of requests per feeding, so connection reuse is not worth the
//! memory.

use defmt::*;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::TcpClient;
use embassy_time::{with_timeout, Duration};
use heapless::Vec;
use rand_core::RngCore;
use reqwless::client::{HttpClient, TlsConfig, TlsVerify};
use reqwless::headers::ContentType;
use reqwless::request::{Method, RequestBuilder};

use ezfeeder_core::config::{RemoteSettings, TimeString};
use ezfeeder_core::remote::firebase::{self, TIMESTAMP_BODY};
use ezfeeder_core::remote::{RemoteError, RemoteStore};

/// TLS record buffer size (one full TLS record each way)
pub const TLS_BUFFER_LEN: usize = 16_640;

/// HTTP response buffer size
pub const RX_BUFFER_LEN: usize = 4096;

/// Largest response body kept for decoding
const MAX_BODY_LEN: usize = 256;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP client used for HTTPS
pub type Tcp = TcpClient<'static, 1, 4096, 4096>;

/// Response status and (possibly truncated) body
struct RawResponse {
    status: u16,
    body: Vec<u8, MAX_BODY_LEN>,
}

/// Buffers that must outlive every request
pub struct FirebaseBuffers {
    pub tls_read: [u8; TLS_BUFFER_LEN],
    pub tls_write: [u8; TLS_BUFFER_LEN],
    pub rx: [u8; RX_BUFFER_LEN],
}

impl FirebaseBuffers {
    pub const fn new() -> Self {
        Self {
            tls_read: [0; TLS_BUFFER_LEN],
            tls_write: [0; TLS_BUFFER_LEN],
            rx: [0; RX_BUFFER_LEN],
        }
    }
}

/// Remote store backed by the Firebase REST API
pub struct FirebaseClient<R> {
    tcp: &'static Tcp,
    dns: &'static DnsSocket<'static>,
    buffers: &'static mut FirebaseBuffers,
    settings: RemoteSettings,
    rng: R,
}

impl<R: RngCore> FirebaseClient<R> {
    pub fn new(
        tcp: &'static Tcp,
        dns: &'static DnsSocket<'static>,
        buffers: &'static mut FirebaseBuffers,
        settings: RemoteSettings,
        rng: R,
    ) -> Self {
        Self {
            tcp,
            dns,
            buffers,
            settings,
            rng,
        }
    }

    async fn get(&mut self, path: &str) -> Result<firebase::Value, RemoteError> {
        let response = self.exchange(Method::GET, path, None).await?;
        firebase::check_status(response.status, &response.body)?;
        firebase::parse_value(&response.body)
    }

    async fn exchange(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<RawResponse, RemoteError> {
        let url = firebase::url(
            self.settings.host.as_str(),
            path,
            self.settings.auth.as_str(),
        )?;
        trace!("Request {}", path);

        match with_timeout(REQUEST_TIMEOUT, self.send(method, url.as_str(), body)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }

    async fn send(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<RawResponse, RemoteError> {
        let seed = self.rng.next_u64();
        let buffers = &mut *self.buffers;
        let tls = TlsConfig::new(
            seed,
            &mut buffers.tls_read,
            &mut buffers.tls_write,
            TlsVerify::None,
        );
        let mut client = HttpClient::new_with_tls(self.tcp, self.dns, tls);

        let request = client.request(method, url).await.map_err(map_error)?;

        match body {
            Some(body) => {
                let mut request = request.body(body).content_type(ContentType::ApplicationJson);
                let response = request.send(&mut buffers.rx).await.map_err(map_error)?;
                let status = response.status.0;
                let body = response.body().read_to_end().await.map_err(map_error)?;
                Ok(RawResponse {
                    status,
                    body: truncated(body),
                })
            }
            None => {
                let mut request = request;
                let response = request.send(&mut buffers.rx).await.map_err(map_error)?;
                let status = response.status.0;
                let body = response.body().read_to_end().await.map_err(map_error)?;
                Ok(RawResponse {
                    status,
                    body: truncated(body),
                })
            }
        }
    }
}

impl<R: RngCore> RemoteStore for FirebaseClient<R> {
    async fn get_int(&mut self, path: &str) -> Result<i64, RemoteError> {
        self.get(path).await?.into_int()
    }

    async fn get_string(&mut self, path: &str) -> Result<TimeString, RemoteError> {
        self.get(path).await?.into_string()
    }

    async fn push_timestamp(&mut self, path: &str) -> Result<(), RemoteError> {
        let response = self
            .exchange(Method::POST, path, Some(TIMESTAMP_BODY))
            .await?;
        firebase::check_status(response.status, &response.body)?;
        let key = firebase::parse_push_response(&response.body)?;
        debug!("Logged feeding as {}", key.as_str());
        Ok(())
    }
}

fn truncated(body: &[u8]) -> Vec<u8, MAX_BODY_LEN> {
    let len = body.len().min(MAX_BODY_LEN);
    let mut out = Vec::new();
    // len <= capacity
    let _ = out.extend_from_slice(&body[..len]);
    out
}

fn map_error(e: reqwless::Error) -> RemoteError {
    warn!("HTTP error: {:?}", e);
    match e {
        reqwless::Error::BufferTooSmall => RemoteError::Malformed,
        _ => RemoteError::Connection,
    }
}
