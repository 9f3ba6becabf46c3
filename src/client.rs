//! Timed request executor
//!
//! Every measurement request runs on a fresh connection so that each phase
//! can be observed: name resolution, TCP connect, TLS handshake, first
//! response byte and the end of the body. The exchange is driven directly
//! over a tokio socket with HTTP/1.1 and `Connection: close`.

pub mod http1;
pub mod metadata;
pub mod server_timing;


pub use metadata::{ClientTrace, MetadataClient};

use crate::{
    error::{AppError, Result},
    models::{TimingBuilder, TimingRecord},
};
use async_trait::async_trait;
use reqwest::{Method, Url};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::{
    io::ErrorKind,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tokio_rustls::TlsConnector;
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    system_conf, TokioAsyncResolver,
};

const READ_CHUNK: usize = 16 * 1024;
const UPLOAD_CHUNK: usize = 64 * 1024;

/// Path serving a download payload of `?bytes=N`
pub const DOWNLOAD_PATH: &str = "/__down";
/// Path accepting an upload payload
pub const UPLOAD_PATH: &str = "/__up";

/// Performs one measurement request and reports its phase timestamps
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Issue the request on its own connection and drain the response
    async fn execute(&self, request: &MeasurementRequest) -> Result<TimingRecord>;
}

/// One request of a measurement loop
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRequest {
    pub method: Method,
    /// Path and query relative to the server base URL
    pub target: String,
    /// Size of the request body, if any
    pub body_bytes: Option<u64>,
}

impl MeasurementRequest {
    /// GET a payload of `bytes` bytes
    pub fn download(bytes: u64) -> Self {
        Self {
            method: Method::GET,
            target: format!("{}?bytes={}", DOWNLOAD_PATH, bytes),
            body_bytes: None,
        }
    }

    /// POST a body of `bytes` bytes
    pub fn upload(bytes: u64) -> Self {
        Self {
            method: Method::POST,
            target: UPLOAD_PATH.to_string(),
            body_bytes: Some(bytes),
        }
    }

    /// Bytes the request carries in either direction
    pub fn payload_bytes(&self) -> u64 {
        self.body_bytes.unwrap_or_else(|| {
            self.target
                .split_once("bytes=")
                .and_then(|(_, n)| n.parse().ok())
                .unwrap_or(0)
        })
    }
}

/// Where the connection goes
#[derive(Debug, Clone)]
enum Endpoint {
    Domain(String),
    Ip(IpAddr),
}

/// [`RequestExecutor`] that records every connection phase
pub struct PhaseTimedExecutor {
    endpoint: Endpoint,
    port: u16,
    host_header: String,
    path_prefix: String,
    tls: Option<TlsConnector>,
    resolver: TokioAsyncResolver,
    timeout: Option<Duration>,
}

impl PhaseTimedExecutor {
    /// Executor for `base_url` (http or https). `timeout` bounds each request.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let url = Url::parse(base_url)?;

        let tls = match url.scheme() {
            "https" => Some(Self::tls_connector()?),
            "http" => None,
            other => {
                return Err(AppError::config(format!(
                    "Unsupported scheme '{}' in server URL",
                    other
                )))
            }
        };

        let endpoint = match url.host() {
            Some(url::Host::Domain(domain)) => Endpoint::Domain(domain.to_string()),
            Some(url::Host::Ipv4(ip)) => Endpoint::Ip(IpAddr::V4(ip)),
            Some(url::Host::Ipv6(ip)) => Endpoint::Ip(IpAddr::V6(ip)),
            None => return Err(AppError::config(format!("Server URL has no host: {}", base_url))),
        };

        let port = url
            .port_or_known_default()
            .ok_or_else(|| AppError::config(format!("Server URL has no port: {}", base_url)))?;

        let host = url.host_str().unwrap_or_default();
        let host_header = match url.port() {
            Some(explicit) => format!("{}:{}", host, explicit),
            None => host.to_string(),
        };

        Ok(Self {
            endpoint,
            port,
            host_header,
            path_prefix: url.path().trim_end_matches('/').to_string(),
            tls,
            resolver: Self::uncached_resolver(),
            timeout,
        })
    }

    fn tls_connector() -> Result<TlsConnector> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        Ok(TlsConnector::from(Arc::new(config)))
    }

    /// System resolver with caching disabled so every request pays its own lookup
    fn uncached_resolver() -> TokioAsyncResolver {
        let (config, mut opts) = system_conf::read_system_conf()
            .unwrap_or_else(|_| (ResolverConfig::default(), ResolverOpts::default()));
        opts.cache_size = 0;
        TokioAsyncResolver::tokio(config, opts)
    }

    async fn resolve(&self, timing: &mut TimingBuilder) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = match &self.endpoint {
            Endpoint::Ip(ip) => vec![SocketAddr::new(*ip, self.port)],
            Endpoint::Domain(domain) => {
                let lookup = self.resolver.lookup_ip(domain.as_str()).await?;
                timing.dns_resolved();
                lookup.iter().map(|ip| SocketAddr::new(ip, self.port)).collect()
            }
        };

        if addrs.is_empty() {
            return Err(AppError::network(format!("No addresses found for {}", self.host_header)));
        }
        Ok(addrs)
    }

    fn server_name(&self) -> Result<ServerName<'static>> {
        match &self.endpoint {
            Endpoint::Ip(ip) => Ok(ServerName::from(*ip)),
            Endpoint::Domain(domain) => ServerName::try_from(domain.clone())
                .map_err(|e| AppError::config(format!("Invalid TLS server name '{}': {}", domain, e))),
        }
    }

    async fn exchange(&self, request: &MeasurementRequest) -> Result<TimingRecord> {
        let mut timing = TimingBuilder::new();

        let addrs = self.resolve(&mut timing).await?;
        let tcp = TcpStream::connect(&addrs[..])
            .await
            .map_err(|e| AppError::network(format!("Connect to {} failed: {}", self.host_header, e)))?;
        tcp.set_nodelay(true)?;
        timing.tcp_connected();

        match &self.tls {
            Some(connector) => {
                let stream = connector
                    .connect(self.server_name()?, tcp)
                    .await
                    .map_err(|e| AppError::network(format!("TLS handshake with {} failed: {}", self.host_header, e)))?;
                timing.tls_handshaked();
                self.transact(stream, request, timing).await
            }
            None => self.transact(tcp, request, timing).await,
        }
    }

    async fn transact<S>(
        &self,
        mut stream: S,
        request: &MeasurementRequest,
        mut timing: TimingBuilder,
    ) -> Result<TimingRecord>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let target = format!("{}{}", self.path_prefix, request.target);
        let head = http1::request_head(request.method.as_str(), &target, &self.host_header, request.body_bytes);

        stream.write_all(head.as_bytes()).await.map_err(write_error)?;
        if let Some(length) = request.body_bytes {
            write_body(&mut stream, length).await?;
        }
        stream.flush().await.map_err(write_error)?;

        let mut buf = vec![0u8; READ_CHUNK];
        let mut head_bytes = Vec::new();

        let (response, head_end) = loop {
            let n = read_some(&mut stream, &mut buf).await?;
            if n == 0 {
                return Err(AppError::network("Connection closed before the response head"));
            }
            timing.first_byte();
            head_bytes.extend_from_slice(&buf[..n]);

            if let Some(end) = http1::find_head_end(&head_bytes) {
                let response = http1::parse_response_head(&head_bytes[..end])?;
                break (response, end);
            }
            if head_bytes.len() > http1::MAX_HEAD_BYTES {
                return Err(AppError::network("Response head too large"));
            }
        };

        let header = response
            .header("server-timing")
            .ok_or_else(|| AppError::network("Response has no server-timing header"))?;
        let server_ms = server_timing::server_processing_ms(header)?;

        let buffered = &head_bytes[head_end..];

        if response.is_chunked() {
            let mut decoder = http1::ChunkedDecoder::new();
            let mut done = decoder.feed(buffered)?;
            while !done {
                let n = read_some(&mut stream, &mut buf).await?;
                if n == 0 {
                    return Err(AppError::network(format!(
                        "Chunked body ended after {} bytes without its last chunk",
                        decoder.body_bytes()
                    )));
                }
                done = decoder.feed(&buf[..n])?;
            }
            return timing.finish(response.status, server_ms);
        }

        match response.content_length()? {
            Some(expected) => {
                let mut body_read = buffered.len() as u64;
                while body_read < expected {
                    let n = read_some(&mut stream, &mut buf).await?;
                    if n == 0 {
                        return Err(AppError::network(format!(
                            "Body truncated at {} of {} bytes",
                            body_read, expected
                        )));
                    }
                    body_read += n as u64;
                }
            }
            // Unframed: the server closes after the last byte
            None => while read_some(&mut stream, &mut buf).await? > 0 {},
        }

        timing.finish(response.status, server_ms)
    }
}

#[async_trait]
impl RequestExecutor for PhaseTimedExecutor {
    async fn execute(&self, request: &MeasurementRequest) -> Result<TimingRecord> {
        match self.timeout {
            Some(limit) => timeout(limit, self.exchange(request))
                .await
                .map_err(|_| AppError::network(format!("Request timed out after {}s", limit.as_secs())))?,
            None => self.exchange(request).await,
        }
    }
}

fn write_error(error: std::io::Error) -> AppError {
    AppError::network(format!("Sending request failed: {}", error))
}

/// Read into `buf`; a peer closing without TLS close_notify counts as EOF
async fn read_some<S: AsyncRead + Unpin>(stream: &mut S, buf: &mut [u8]) -> Result<usize> {
    match stream.read(buf).await {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(0),
        Err(e) => Err(AppError::network(format!("Reading response failed: {}", e))),
    }
}

/// Stream `length` filler bytes
async fn write_body<S: AsyncWrite + Unpin>(stream: &mut S, length: u64) -> Result<()> {
    let chunk = vec![b'0'; UPLOAD_CHUNK.min(length as usize)];
    let mut remaining = length;

    while remaining > 0 {
        let len = (chunk.len() as u64).min(remaining) as usize;
        stream.write_all(&chunk[..len]).await.map_err(write_error)?;
        remaining -= len as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_request() {
        let request = MeasurementRequest::download(101_000);
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.target, "/__down?bytes=101000");
        assert_eq!(request.body_bytes, None);
        assert_eq!(request.payload_bytes(), 101_000);
    }

    #[test]
    fn test_upload_request() {
        let request = MeasurementRequest::upload(11_000);
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.target, "/__up");
        assert_eq!(request.payload_bytes(), 11_000);
    }

    #[tokio::test]
    async fn test_executor_accepts_http_and_https() {
        assert!(PhaseTimedExecutor::new("https://speed.cloudflare.com", None).is_ok());
        let executor = PhaseTimedExecutor::new("http://127.0.0.1:8080/base/", None).unwrap();
        assert_eq!(executor.host_header, "127.0.0.1:8080");
        assert_eq!(executor.path_prefix, "/base");
        assert!(executor.tls.is_none());
    }

    #[tokio::test]
    async fn test_executor_rejects_bad_urls() {
        assert!(matches!(
            PhaseTimedExecutor::new("ftp://example.com", None),
            Err(AppError::Config(_))
        ));
        assert!(PhaseTimedExecutor::new("not a url", None).is_err());
    }

    #[test]
    fn test_write_body_length() {
        tokio_test::block_on(async {
            let mut sink = Vec::new();
            write_body(&mut sink, 150_000).await.unwrap();
            assert_eq!(sink.len(), 150_000);
            assert!(sink.iter().all(|b| *b == b'0'));

            let mut empty = Vec::new();
            write_body(&mut empty, 0).await.unwrap();
            assert!(empty.is_empty());
        });
    }
}
