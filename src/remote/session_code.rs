// SPDX-License-Identifier: GPL-3.0-only

//! Session codes
//!
//! A short code shown on the kiosk and typed on the phone. Both sides
//! derive the same channel name from it.

use crate::constants::session_code::{ALPHABET, CHANNEL_PREFIX, LENGTH};
use rand::Rng;

/// A validated session code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionCode(String);

impl SessionCode {
    /// Draw a fresh random code
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..LENGTH)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Parse user input, ignoring case and surrounding whitespace
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == LENGTH && code.bytes().all(|b| ALPHABET.contains(&b));
        valid.then_some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the realtime channel for this code
    pub fn channel_name(&self) -> String {
        format!("{}{}", CHANNEL_PREFIX, self.0)
    }
}

impl std::fmt::Display for SessionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_parse() {
        for _ in 0..100 {
            let code = SessionCode::generate();
            assert_eq!(code.as_str().len(), LENGTH);
            assert_eq!(SessionCode::parse(code.as_str()), Some(code));
        }
    }

    #[test]
    fn test_parse_normalises_case() {
        let code = SessionCode::parse("  abc234 ").unwrap();
        assert_eq!(code.as_str(), "ABC234");
        assert_eq!(code.channel_name(), "photobooth-remote-ABC234");
    }

    #[test]
    fn test_parse_rejects_ambiguous_characters() {
        assert!(SessionCode::parse("ABCD0O").is_none());
        assert!(SessionCode::parse("ABCD1I").is_none());
        assert!(SessionCode::parse("ABC").is_none());
    }
}
