use rand::{rng, Rng};

/// Generates a cryptographically secure API key with 256 bits of entropy.
///
/// The key is formatted as `gb_{hex_encoded_random_bytes}` where the random
/// bytes are 32 bytes (256 bits) of cryptographically secure random data.
///
/// # Returns
///
/// A string in the format `gb_{64_character_hex_string}`
pub fn generate_api_key() -> String {
    // Generate 32 bytes (256 bits) of cryptographically secure random data
    let mut key_bytes = [0u8; 32];
    rng().fill(&mut key_bytes);

    format!("gb_{}", hex::encode(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_api_key_format() {
        let key = generate_api_key();

        // Should start with "gb_"
        assert!(key.starts_with("gb_"));

        // Should be correct length: "gb_" (3) + hex(32 bytes) (64)
        assert_eq!(key.len(), 67);

        // Should only contain lowercase hex characters after the prefix
        let key_part = &key[3..];
        assert!(key_part.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_generate_api_key_uniqueness() {
        let mut keys = HashSet::new();

        // Generate 1000 keys and ensure they're all unique
        for _ in 0..1000 {
            let key = generate_api_key();
            assert!(keys.insert(key), "Generated duplicate API key");
        }
    }
}
