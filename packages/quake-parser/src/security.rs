//! API keys held in secure memory.
//!
//! Model, search and rendering keys are loaded once at startup and only
//! exposed when a request header is built. Startup logging uses
//! [`SecretString::masked`], which keeps just enough of the key to tell two
//! keys apart.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// Characters of a key shown by [`SecretString::masked`].
const VISIBLE_PREFIX: usize = 4;

/// A credential that never shows up in logs or debug output.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        let value: Box<str> = value.into().into_boxed_str();
        Self(SecretBox::new(value))
    }

    /// Expose the secret. Only call this when building a request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Key length in characters.
    pub fn char_len(&self) -> usize {
        self.expose().chars().count()
    }

    /// Key with everything past the first few characters starred out,
    /// e.g. `sk-l*******`.
    pub fn masked(&self) -> String {
        let len = self.char_len();
        let shown: String = self.expose().chars().take(VISIBLE_PREFIX).collect();
        format!("{}{}", shown, "*".repeat(len.saturating_sub(VISIBLE_PREFIX)))
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
