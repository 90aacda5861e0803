// resource-analyzer compares live cloud resources against IaC declarations
// Copyright (C) 2025  Peoples Grocers LLC
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// To purchase a license under different terms contact admin@peoplesgrocers.com
// To request changes, report bugs, or give user feedback contact
// marxism@peoplesgrocers.com
//

//! Optional upload of the finished report to S3-compatible storage.
//!
//! Aimed at LocalStack during development, which is why the endpoint and
//! credentials default to `http://localhost:4566` and `test`/`test`. Real S3
//! works too when real credentials are in the environment. Requests use
//! path-style addressing (`{endpoint}/{bucket}/{key}`) and are signed with
//! AWS Signature Version 4.
//!
//! Nothing here knows what a report contains. It ships bytes.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode, Url};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticCode};

pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:4566";
pub const DEFAULT_REGION: &str = "us-east-1";

const SERVICE: &str = "s3";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
        }
    }

    /// Standard AWS environment variables, falling back to the LocalStack
    /// test pair.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            access_key_id: var("AWS_ACCESS_KEY_ID").unwrap_or_else(|| "test".to_string()),
            secret_access_key: var("AWS_SECRET_ACCESS_KEY").unwrap_or_else(|| "test".to_string()),
            session_token: var("AWS_SESSION_TOKEN"),
        }
    }
}

/// `--region`, then `AWS_REGION`, then `AWS_DEFAULT_REGION`, then us-east-1.
/// Empty values are skipped.
pub fn resolve_region(flag: Option<&str>) -> String {
    region_from(flag, |name| std::env::var(name).ok())
}

fn region_from(flag: Option<&str>, env: impl Fn(&str) -> Option<String>) -> String {
    let non_empty = |value: &String| !value.is_empty();
    flag.map(str::to_string)
        .filter(non_empty)
        .or_else(|| env("AWS_REGION").filter(non_empty))
        .or_else(|| env("AWS_DEFAULT_REGION").filter(non_empty))
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

/// Where the report goes.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    endpoint: Url,
    pub bucket: String,
    pub key: String,
    pub region: String,
}

impl UploadTarget {
    pub fn new(endpoint_url: &str, bucket: &str, key: &str, region: &str) -> Result<Self, Diagnostic> {
        let endpoint = Url::parse(endpoint_url).map_err(|e| {
            Diagnostic::fatal(
                DiagnosticCode::InvalidEndpoint,
                format!("I couldn't parse the endpoint URL '{}': {}", endpoint_url, e),
            )
            .with_advice("Use a full URL such as http://localhost:4566.".to_string())
        })?;

        if endpoint.host_str().is_none() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Diagnostic::fatal(
                DiagnosticCode::InvalidEndpoint,
                format!("The endpoint URL '{}' needs an http(s) scheme and a host.", endpoint_url),
            )
            .with_advice("Use a full URL such as http://localhost:4566.".to_string()));
        }

        Ok(Self {
            endpoint,
            bucket: bucket.to_string(),
            key: key.trim_start_matches('/').to_string(),
            region: region.to_string(),
        })
    }

    pub fn bucket_path(&self) -> String {
        format!("{}/{}", self.base_path(), uri_encode(&self.bucket))
    }

    pub fn object_path(&self) -> String {
        let encoded_key: Vec<String> = self.key.split('/').map(uri_encode).collect();
        format!("{}/{}", self.bucket_path(), encoded_key.join("/"))
    }

    fn base_path(&self) -> &str {
        self.endpoint.path().trim_end_matches('/')
    }

    fn url_for(&self, path: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    fn host_header(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    pub fn display_location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Upload `report_json` to `target`, creating the bucket if it doesn't exist.
pub fn upload_report(
    report_json: &str,
    target: &UploadTarget,
    credentials: &Credentials,
) -> Result<(), Diagnostic> {
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| {
            Diagnostic::fatal(
                DiagnosticCode::UploadFailed,
                format!("I couldn't set up the HTTP client: {}", e),
            )
        })?;

    upload_with_client(&client, report_json, target, credentials)
}

fn upload_with_client(
    client: &Client,
    report_json: &str,
    target: &UploadTarget,
    credentials: &Credentials,
) -> Result<(), Diagnostic> {
    ensure_bucket(client, target, credentials)?;

    let path = target.object_path();
    let response = send(
        client,
        Method::PUT,
        &path,
        report_json.as_bytes().to_vec(),
        Some("application/json"),
        target,
        credentials,
    )
    .map_err(|e| unreachable_endpoint(DiagnosticCode::UploadFailed, target, e))?;

    if !response.status().is_success() {
        return Err(Diagnostic::fatal(
            DiagnosticCode::UploadFailed,
            format!(
                "Uploading the report to {} failed with HTTP {}.",
                target.display_location(),
                response.status()
            ),
        )
        .with_snippet(response_excerpt(response)));
    }

    info!(location = %target.display_location(), bytes = report_json.len(), "uploaded report");
    Ok(())
}

fn ensure_bucket(
    client: &Client,
    target: &UploadTarget,
    credentials: &Credentials,
) -> Result<(), Diagnostic> {
    let path = target.bucket_path();
    let response = send(client, Method::HEAD, &path, Vec::new(), None, target, credentials)
        .map_err(|e| unreachable_endpoint(DiagnosticCode::BucketUnavailable, target, e))?;

    match response.status() {
        status if status.is_success() => Ok(()),
        StatusCode::NOT_FOUND => {
            debug!(bucket = %target.bucket, "bucket not found, creating it");
            let response = send(
                client,
                Method::PUT,
                &path,
                create_bucket_body(&target.region),
                None,
                target,
                credentials,
            )
            .map_err(|e| unreachable_endpoint(DiagnosticCode::BucketUnavailable, target, e))?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(Diagnostic::fatal(
                    DiagnosticCode::BucketUnavailable,
                    format!(
                        "Bucket '{}' does not exist and creating it failed with HTTP {}.",
                        target.bucket,
                        response.status()
                    ),
                )
                .with_snippet(response_excerpt(response)))
            }
        }
        status => Err(Diagnostic::fatal(
            DiagnosticCode::BucketUnavailable,
            format!(
                "Unable to verify bucket '{}' before upload: HTTP {}.",
                target.bucket, status
            ),
        )
        .with_advice("Check the credentials and that the bucket belongs to you.".to_string())),
    }
}

fn create_bucket_body(region: &str) -> Vec<u8> {
    if region == DEFAULT_REGION {
        return Vec::new();
    }
    format!(
        "<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
         <LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
        region
    )
    .into_bytes()
}

fn send(
    client: &Client,
    method: Method,
    path: &str,
    body: Vec<u8>,
    content_type: Option<&str>,
    target: &UploadTarget,
    credentials: &Credentials,
) -> Result<Response, SendError> {
    let headers = sign_request(method.as_str(), path, &body, target, credentials, Utc::now())
        .map_err(SendError::Signing)?;

    let mut request = client.request(method, target.url_for(path));
    for (name, value) in headers {
        request = request.header(name, value);
    }
    if let Some(content_type) = content_type {
        request = request.header("content-type", content_type);
    }
    request.body(body).send().map_err(SendError::Http)
}

enum SendError {
    Signing(Diagnostic),
    Http(reqwest::Error),
}

fn unreachable_endpoint(code: DiagnosticCode, target: &UploadTarget, error: SendError) -> Diagnostic {
    match error {
        SendError::Signing(diagnostic) => diagnostic,
        SendError::Http(e) => Diagnostic::fatal(
            code,
            format!("I couldn't reach {}: {}", target.endpoint, e),
        )
        .with_advice(format!(
            "Make sure the object store is running at {} (for LocalStack: `localstack start`), \
             or pass a different --endpoint-url.",
            target.endpoint
        )),
    }
}

fn response_excerpt(response: Response) -> String {
    let body = response.text().unwrap_or_default();
    body.chars().take(500).collect()
}

/// Headers that sign one request: `authorization`, `x-amz-date`,
/// `x-amz-content-sha256`, and `x-amz-security-token` with session
/// credentials. `path` must already be URI-encoded.
pub fn sign_request(
    method: &str,
    path: &str,
    body: &[u8],
    target: &UploadTarget,
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<Vec<(&'static str, String)>, Diagnostic> {
    let payload_hash = sha256_hex(body);

    let mut headers: Vec<(&'static str, String)> = vec![
        ("host", target.host_header()),
        ("x-amz-content-sha256", payload_hash.clone()),
        ("x-amz-date", now.format("%Y%m%dT%H%M%SZ").to_string()),
    ];
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token", token.clone()));
    }

    let request = CanonicalRequest {
        method,
        path,
        query: "",
        headers: &headers,
        payload_hash: &payload_hash,
    };
    let authorization = authorization(&request, &target.region, credentials, now)?;

    // reqwest sets Host itself from the URL
    headers.retain(|(name, _)| *name != "host");
    headers.push(("authorization", authorization));
    Ok(headers)
}

/// The parts of a request that go into its signature. Header names are
/// lowercase and sorted.
struct CanonicalRequest<'a> {
    method: &'a str,
    path: &'a str,
    query: &'a str,
    headers: &'a [(&'static str, String)],
    payload_hash: &'a str,
}

fn authorization(
    request: &CanonicalRequest<'_>,
    region: &str,
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<String, Diagnostic> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();

    let canonical_headers: String = request
        .headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = request
        .headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        request.path,
        request.query,
        canonical_headers,
        signed_headers,
        request.payload_hash
    );

    let scope = format!("{}/{}/{}/aws4_request", date_stamp, region, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(&credentials.secret_access_key, &date_stamp, region, SERVICE)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key_id, scope, signed_headers, signature
    ))
}

fn signing_key(
    secret_access_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, Diagnostic> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_access_key).as_bytes(),
        date_stamp.as_bytes(),
    )?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Diagnostic> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| {
        Diagnostic::fatal(
            DiagnosticCode::UploadFailed,
            format!("I couldn't sign the upload request: {}", e),
        )
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Percent-encode everything except the RFC 3986 unreserved characters.
fn uri_encode(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
