use std::fmt;

use zeroize::Zeroizing;

/// The wallet password-derived key handed to the engine.
///
/// Zeroed on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey(Zeroizing<String>);

impl EncryptionKey {
    pub fn new(secret: Zeroizing<String>) -> Self {
        Self(secret)
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for EncryptionKey {
    fn from(secret: &str) -> Self {
        Self(Zeroizing::new(secret.to_string()))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}
