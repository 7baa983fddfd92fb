//! Component list encoding
//!
//! Components are persisted as a JSON array in a single TEXT column, so a
//! component name may contain any character, commas included. Any value that
//! is not a JSON string array is a row written as plain comma-joined text and
//! is decoded by splitting on `,`.

/// Encode an ordered component list for the `components` column
pub fn encode_components(components: &[String]) -> String {
    // Serializing a slice of strings cannot fail.
    serde_json::to_string(components).unwrap_or_else(|_| "[]".to_string())
}

/// Decode the `components` column of the row identified by `serial`
pub fn decode_components(serial: &str, text: &str) -> Vec<String> {
    if text.trim_start().starts_with('[') {
        if let Ok(components) = serde_json::from_str::<Vec<String>>(text) {
            return components;
        }
    }

    tracing::warn!("Decoding legacy comma-joined components for {}", serial);
    text.split(',').map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_with_commas_survive() {
        let components = vec!["fw,v2".to_string(), "kernel".to_string()];
        let encoded = encode_components(&components);
        assert_eq!(decode_components("SN1", &encoded), components);
    }

    #[test]
    fn test_legacy_comma_text() {
        assert_eq!(decode_components("SN1", "bootloader,kernel"), vec!["bootloader", "kernel"]);
    }

    #[test]
    fn test_bracketed_legacy_text_falls_back_to_comma_split() {
        assert_eq!(
            decode_components("SN1", "[beta]bootloader,kernel"),
            vec!["[beta]bootloader", "kernel"]
        );
        assert_eq!(decode_components("SN1", "[1,2]"), vec!["[1", "2]"]);
    }
}
