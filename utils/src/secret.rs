use std::fmt;

use zeroize::Zeroizing;

const REDACTED: &str = "[REDACTED]";

/// A token that is wiped from memory on drop and
/// never shows up in formatted output.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(Zeroizing<String>);

impl SecretValue {
    /// The raw value, for handing to the tool that needs it.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SecretValue {
    /// Surrounding whitespace, like the newline of a token
    /// read from a file, is dropped.
    fn from(value: &str) -> Self {
        Self(Zeroizing::new(value.trim().to_owned()))
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        let value = Zeroizing::new(value);
        Self::from(value.as_str())
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
