use crate::error::Result;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// An issued anti-forgery credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    /// Unique, unpredictable identifier the value is stored under
    pub name: String,

    /// Secret token value
    pub value: String,
}

impl CsrfToken {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Compare a submitted value against this token's value in constant time
    pub fn matches(&self, value: &str) -> bool {
        constant_time_eq(&self.value, value)
    }
}

/// Source of cryptographically secure random bytes
pub trait EntropySource: Send + Sync {
    /// Fill `dest` entirely or fail; implementations must never fall back to a
    /// weaker generator
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// Operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(dest)?;
        Ok(())
    }
}

/// Draw `strength` random bytes and hex-encode them
pub fn random_token_value(entropy: &dyn EntropySource, strength: usize) -> Result<String> {
    let mut bytes = vec![0u8; strength];
    entropy.fill(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// Build a fresh token name from the prefix and a random UUID
pub fn token_name(prefix: &str) -> String {
    format!("{}{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Equal-time string comparison, independent of the first differing byte
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
