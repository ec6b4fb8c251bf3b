//! Request field extraction.

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request, Version};
use std::net::SocketAddr;

use crate::fingerprint::Fingerprint;
use crate::net::tls::TlsInfo;

/// Build a [`Fingerprint`] from an inbound request.
///
/// Never fails: absent headers become empty strings, unknown peers an empty
/// address, and TLS fields stay zero unless the connection attached a
/// [`TlsInfo`] extension.
pub fn extract<B>(request: &Request<B>) -> Fingerprint {
    let headers = request.headers();
    let get = |name: &str| header_value(headers, name);

    let ip_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    let (tls_version, tls_cipher_suite) = request
        .extensions()
        .get::<TlsInfo>()
        .map(|tls| (tls.version, tls.cipher_suite))
        .unwrap_or((0, 0));

    let host = headers
        .get(header::HOST)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let transfer_encoding = transfer_encoding(headers);

    Fingerprint {
        user_agent: get("user-agent"),
        ip_address,
        accept_language: get("accept-language"),
        accept_encoding: get("accept-encoding"),
        accept_charset: get("accept-charset"),
        accept: get("accept"),
        connection: get("connection"),
        host,
        x_forwarded_for: get("x-forwarded-for"),
        referer: get("referer"),
        cookie: get("cookie"),
        dnt: get("dnt"),
        upgrade_insecure_requests: get("upgrade-insecure-requests"),
        cache_control: get("cache-control"),
        pragma: get("pragma"),
        via: get("via"),
        forwarded: get("forwarded"),
        x_real_ip: get("x-real-ip"),
        x_forwarded_proto: get("x-forwarded-proto"),
        x_forwarded_host: get("x-forwarded-host"),
        x_forwarded_port: get("x-forwarded-port"),
        x_amz_date: get("x-amz-date"),
        x_api_key: get("x-api-key"),
        x_request_id: get("x-request-id"),
        authorization: get("authorization"),
        content_type: get("content-type"),
        content_length: content_length(headers, &transfer_encoding),
        method: request.method().as_str().to_string(),
        request_uri: request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().to_string()),
        protocol: protocol(request.version()).to_string(),
        transfer_encoding,
        tls_version,
        tls_cipher_suite,
    }
}

/// First value of a header, lossily decoded, or an empty string.
fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default()
}

/// Transfer-coding tokens across all `Transfer-Encoding` header lines.
fn transfer_encoding(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::TRANSFER_ENCODING)
        .iter()
        .flat_map(|v| {
            String::from_utf8_lossy(v.as_bytes())
                .split(',')
                .map(|token| token.trim().to_ascii_lowercase())
                .filter(|token| !token.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Declared body length; `-1` when framing makes it unknown.
fn content_length(headers: &HeaderMap, transfer_encoding: &[String]) -> i64 {
    if transfer_encoding.iter().any(|t| t == "chunked") {
        return -1;
    }
    match headers.get(header::CONTENT_LENGTH) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n >= 0)
            .unwrap_or(-1),
        None => 0,
    }
}

fn protocol(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "",
    }
}
