use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

// ============================================================
// Shared primitives
// ============================================================

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts keys of any length"));
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// SHA-256 hash and hex-encode.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn uri_encode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

/// Sorted, re-encoded query string as both signing schemes expect it.
fn canonical_query(url: &reqwest::Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &reqwest::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

struct CanonicalRequest {
    text: String,
    signed_headers: String,
}

fn canonical_request(
    method: &str,
    canonical_uri: &str,
    url: &reqwest::Url,
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> CanonicalRequest {
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let text = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        canonical_uri,
        canonical_query(url),
        canonical_headers,
        signed_headers,
        payload_hash
    );
    CanonicalRequest {
        text,
        signed_headers,
    }
}

// ============================================================
// AWS Signature Version 4
// ============================================================

pub struct SigV4<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub session_token: Option<&'a str>,
    pub region: &'a str,
    pub service: &'a str,
}

impl SigV4<'_> {
    /// Sign a request and return the headers to attach to it.
    ///
    /// `extra_headers` must use lowercase names; they are included in the
    /// signature.
    pub fn sign(
        &self,
        method: &str,
        url: &reqwest::Url,
        extra_headers: &[(&str, &str)],
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = sha256_hex(body);

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        headers.insert("host".to_string(), host_header(url));
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(token) = self.session_token {
            headers.insert("x-amz-security-token".to_string(), token.to_string());
        }
        for (k, v) in extra_headers {
            headers.insert(k.to_string(), v.to_string());
        }

        let canonical_uri = if url.path().is_empty() { "/" } else { url.path() };
        let request = canonical_request(method, canonical_uri, url, &headers, &payload_hash);

        let algorithm = "AWS4-HMAC-SHA256";
        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            algorithm,
            amz_date,
            credential_scope,
            sha256_hex(request.text.as_bytes())
        );

        let k_date = hmac_sha256(
            format!("AWS4{}", self.secret_access_key).as_bytes(),
            date_stamp.as_bytes(),
        );
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        let k_signing = hmac_sha256(&k_service, b"aws4_request");
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            algorithm, self.access_key_id, credential_scope, request.signed_headers, signature
        );

        let mut result = vec![
            ("Authorization".to_string(), authorization),
            ("x-amz-date".to_string(), amz_date),
        ];
        if let Some(token) = self.session_token {
            result.push(("x-amz-security-token".to_string(), token.to_string()));
        }
        result
    }
}

// ============================================================
// Huawei Cloud SDK-HMAC-SHA256
// ============================================================

pub struct SdkHmac<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
}

impl SdkHmac<'_> {
    /// Sign a request and return the headers to attach to it.
    ///
    /// `extra_headers` must use lowercase names; they are included in the
    /// signature.
    pub fn sign(
        &self,
        method: &str,
        url: &reqwest::Url,
        extra_headers: &[(&str, &str)],
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let sdk_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        headers.insert("host".to_string(), host_header(url));
        headers.insert("x-sdk-date".to_string(), sdk_date.clone());
        for (k, v) in extra_headers {
            headers.insert(k.to_string(), v.to_string());
        }

        // APIG canonical URIs always end with a slash.
        let mut canonical_uri = url.path().to_string();
        if !canonical_uri.ends_with('/') {
            canonical_uri.push('/');
        }
        let request = canonical_request(method, &canonical_uri, url, &headers, &sha256_hex(body));

        let algorithm = "SDK-HMAC-SHA256";
        let string_to_sign = format!(
            "{}\n{}\n{}",
            algorithm,
            sdk_date,
            sha256_hex(request.text.as_bytes())
        );
        let signature = hex::encode(hmac_sha256(
            self.secret_key.as_bytes(),
            string_to_sign.as_bytes(),
        ));

        let authorization = format!(
            "{} Access={}, SignedHeaders={}, Signature={}",
            algorithm, self.access_key, request.signed_headers, signature
        );

        vec![
            ("Authorization".to_string(), authorization),
            ("X-Sdk-Date".to_string(), sdk_date),
        ]
    }
}
