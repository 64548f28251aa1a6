//! Minimal HTTP/1.1 client shared by the prober and the ingest notifier.
//!
//! One TCP connection per request, driven by hyper's low-level `conn` API.
//! Callers bound the whole exchange with their own timeout.

use bytes::Bytes;
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tracing::debug;

pub(crate) const USER_AGENT: &str = concat!("bridge-health/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub(crate) enum ClientError {
    #[error("invalid url {0:?}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("request failed: {0}")]
    Request(#[source] hyper::Error),

    #[error("failed to read body: {0}")]
    Body(#[source] hyper::Error),
}

/// Status and fully buffered body of a response.
pub(crate) struct Reply {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Send one request and buffer the whole response.
pub(crate) async fn send(
    method: Method,
    url: &str,
    body: Option<(Bytes, &'static str)>,
) -> Result<Reply, ClientError> {
    let uri: Uri = url
        .parse()
        .map_err(|_| ClientError::InvalidUrl(url.to_string()))?;
    // IPv6 literals keep their brackets in the URI but not in a socket address.
    let host = uri
        .host()
        .ok_or_else(|| ClientError::InvalidUrl(url.to_string()))?
        .trim_start_matches('[')
        .trim_end_matches(']');
    let port = uri.port_u16().unwrap_or(80);
    let authority = uri
        .authority()
        .map(|a| a.as_str().to_string())
        .unwrap_or_else(|| host.to_string());
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    let stream = tokio::net::TcpStream::connect((host, port))
        .await
        .map_err(ClientError::Connect)?;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(ClientError::Handshake)?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "http connection closed with error");
        }
    });

    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(http::header::HOST, authority)
        .header(http::header::USER_AGENT, USER_AGENT);
    let payload = match body {
        Some((bytes, content_type)) => {
            builder = builder.header(http::header::CONTENT_TYPE, content_type);
            bytes
        }
        None => Bytes::new(),
    };
    let req = builder
        .body(Full::new(payload))
        .map_err(|_| ClientError::InvalidUrl(url.to_string()))?;

    let resp = sender.send_request(req).await.map_err(ClientError::Request)?;
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(ClientError::Body)?
        .to_bytes();

    Ok(Reply { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connects_to_ipv6_literal() {
        // Hosts without IPv6 loopback have nothing to test.
        let Ok(listener) = TcpListener::bind("[::1]:0").await else {
            return;
        };
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await.unwrap();
            stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\n{}")
                .await
                .unwrap();
        });

        let reply = send(Method::GET, &format!("http://[::1]:{port}/health"), None)
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, Bytes::from_static(b"{}"));
    }

    #[tokio::test]
    async fn rejects_url_without_host() {
        let err = send(Method::GET, "/health", None).await.err().unwrap();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }
}
