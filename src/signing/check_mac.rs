use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const SIGNATURE_FIELD: &str = "CheckMacValue";

/// ECPay CheckMacValue codec.
///
/// The reference implementation the processor interoperates with is .NET, so
/// the encoding step follows `HttpUtility.UrlEncode` rather than standard
/// percent-encoding: the whole string is encoded, lowercased, and then a fixed
/// set of punctuation is restored to literal characters.
#[derive(Clone)]
pub struct CheckMacCodec {
    pub hash_key: String,
    pub hash_iv: String,
}

impl CheckMacCodec {
    /// Sort by key (case-insensitive), join as `k=v` pairs, wrap with the
    /// HashKey/HashIV secrets. The signature field itself is excluded.
    pub fn canonicalize(&self, params: &[(String, String)]) -> String {
        let mut pairs: Vec<&(String, String)> = params
            .iter()
            .filter(|(k, _)| k != SIGNATURE_FIELD)
            .collect();
        pairs.sort_by(|a, b| {
            a.0.to_lowercase()
                .cmp(&b.0.to_lowercase())
                .then_with(|| a.0.cmp(&b.0))
        });

        let joined = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        format!("HashKey={}&{}&HashIV={}", self.hash_key, joined, self.hash_iv)
    }

    pub fn sign(&self, canonical: &str) -> String {
        let encoded = dotnet_urlencode(canonical);
        let digest = Sha256::digest(encoded.as_bytes());
        hex::encode(digest).to_uppercase()
    }

    pub fn generate(&self, params: &[(String, String)]) -> String {
        self.sign(&self.canonicalize(params))
    }

    /// Recompute the MAC over the inbound payload (minus the signature field
    /// and blank values) and compare in constant time. A missing signature is
    /// a verification failure, not an error.
    pub fn verify(&self, params: &HashMap<String, String>) -> bool {
        let received = match params.get(SIGNATURE_FIELD) {
            Some(v) if !v.trim().is_empty() => v.to_uppercase(),
            _ => {
                tracing::warn!("callback is missing CheckMacValue");
                return false;
            }
        };

        let filtered: Vec<(String, String)> = params
            .iter()
            .filter(|(k, v)| k.as_str() != SIGNATURE_FIELD && !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let calculated = self.generate(&filtered);
        tracing::info!(received = %received, calculated = %calculated, "checkmac verification");

        calculated.as_bytes().ct_eq(received.as_bytes()).into()
    }
}

/// `.NET HttpUtility.UrlEncode` equivalent: percent-encode every
/// non-alphanumeric byte, lowercase the result, then restore the characters
/// .NET leaves literal (`- _ . ! * ( )`, space becomes `+`).
pub fn dotnet_urlencode(raw: &str) -> String {
    utf8_percent_encode(raw, NON_ALPHANUMERIC)
        .to_string()
        .to_lowercase()
        .replace("%20", "+")
        .replace("%2d", "-")
        .replace("%5f", "_")
        .replace("%2e", ".")
        .replace("%21", "!")
        .replace("%2a", "*")
        .replace("%28", "(")
        .replace("%29", ")")
}
