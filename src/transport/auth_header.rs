//! `Authorization` header construction
//!
//! Basic (RFC 7617) and Bearer (RFC 6750) headers are fixed for the life of
//! the credential. Digest (RFC 7616) responses depend on the request, a
//! fresh client nonce and the nonce count, so they are computed for every
//! request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::credential::{ClientCredential, DigestAlgorithm, DigestCredential};

/// Builds the `Authorization` header value for `credential`.
///
/// Returns `None` for [`ClientCredential::None`]. `method` and `uri` are
/// only used by Digest.
pub fn authorization_header(
    credential: &ClientCredential,
    method: &str,
    uri: &str,
) -> Option<String> {
    match credential {
        ClientCredential::None => None,
        ClientCredential::Basic { username, password } => Some(format!(
            "Basic {}",
            STANDARD.encode(format!("{username}:{password}"))
        )),
        ClientCredential::Bearer { token } => Some(format!("Bearer {token}")),
        ClientCredential::Digest(digest) => {
            Some(digest_header(digest, method, uri, &new_cnonce()))
        }
    }
}

/// Formats a complete `Digest` header value for one request.
///
/// With `qop=auth` each call advances the credential's nonce count.
pub fn digest_header(digest: &DigestCredential, method: &str, uri: &str, cnonce: &str) -> String {
    let qop = digest.qop_auth.then_some("auth");
    let nc = qop
        .map(|_| format!("{:08x}", digest.next_nonce_count()))
        .unwrap_or_default();
    let response = digest_response(
        digest.algorithm,
        &DigestInput {
            username: &digest.username,
            realm: &digest.realm,
            password: &digest.password,
            nonce: &digest.nonce,
            cnonce,
            nc: &nc,
            qop,
            method,
            uri,
        },
    );

    let mut header = format!(
        "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
        quote(&digest.username),
        quote(&digest.realm),
        quote(&digest.nonce),
        quote(uri),
        digest.algorithm.as_str(),
        response,
    );
    if let Some(opaque) = &digest.opaque {
        header.push_str(&format!(", opaque=\"{}\"", quote(opaque)));
    }
    if let Some(qop) = qop {
        header.push_str(&format!(
            ", qop={qop}, nc={nc}, cnonce=\"{cnonce}\""
        ));
    }
    header
}

/// Inputs to a Digest response computation.
#[derive(Debug, Clone, Copy)]
pub struct DigestInput<'a> {
    pub username: &'a str,
    pub realm: &'a str,
    pub password: &'a str,
    pub nonce: &'a str,
    pub cnonce: &'a str,
    pub nc: &'a str,
    pub qop: Option<&'a str>,
    pub method: &'a str,
    pub uri: &'a str,
}

/// Computes the `response` value of RFC 7616 section 3.4.1.
pub fn digest_response(algorithm: DigestAlgorithm, input: &DigestInput<'_>) -> String {
    let hash = |data: String| hex_digest(algorithm, data.as_bytes());

    let mut ha1 = hash(format!(
        "{}:{}:{}",
        input.username, input.realm, input.password
    ));
    if algorithm.is_session() {
        ha1 = hash(format!("{ha1}:{}:{}", input.nonce, input.cnonce));
    }
    let ha2 = hash(format!("{}:{}", input.method, input.uri));

    match input.qop {
        Some(qop) => hash(format!(
            "{ha1}:{}:{}:{}:{qop}:{ha2}",
            input.nonce, input.nc, input.cnonce
        )),
        None => hash(format!("{ha1}:{}:{ha2}", input.nonce)),
    }
}

fn hex_digest(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    match algorithm {
        DigestAlgorithm::Md5 | DigestAlgorithm::Md5Sess => format!("{:x}", md5::compute(data)),
        DigestAlgorithm::Sha256 | DigestAlgorithm::Sha256Sess => {
            format!("{:x}", Sha256::digest(data))
        }
    }
}

fn new_cnonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
