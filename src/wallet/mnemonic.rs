//! BIP-39 recovery phrases

use crate::error::{NodeError, Result};
use bip39::{Language, Mnemonic};
use rand::RngCore;

pub const DEFAULT_STRENGTH: usize = 256;

pub const DEFAULT_LANGUAGE: &str = "english";

/// Generate a recovery phrase from `strength` bits of fresh entropy.
///
/// `strength` is one of 128, 160, 192, 224 or 256 and yields 12 to 24
/// words. `language` names a BIP-39 wordlist (`english`, `spanish`,
/// `chinese_simplified`, ...).
pub fn generate_mnemonic(strength: usize, language: &str) -> Result<String> {
    if !(128..=256).contains(&strength) || strength % 32 != 0 {
        return Err(NodeError::Configuration(format!(
            "invalid mnemonic strength {}: expected 128, 160, 192, 224 or 256 bits",
            strength
        )));
    }
    let language = parse_language(language)?;

    let mut entropy = vec![0u8; strength / 8];
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy_in(language, &entropy)
        .map_err(|e| NodeError::Unclassified(format!("mnemonic generation failed: {}", e)))?;
    Ok(mnemonic.to_string())
}

fn parse_language(name: &str) -> Result<Language> {
    let language = match name.trim().to_lowercase().replace('-', "_").as_str() {
        "english" => Language::English,
        "chinese_simplified" | "simplified_chinese" => Language::SimplifiedChinese,
        "chinese_traditional" | "traditional_chinese" => Language::TraditionalChinese,
        "czech" => Language::Czech,
        "french" => Language::French,
        "italian" => Language::Italian,
        "japanese" => Language::Japanese,
        "korean" => Language::Korean,
        "spanish" => Language::Spanish,
        other => {
            return Err(NodeError::Configuration(format!(
                "unsupported mnemonic language `{}`",
                other
            )))
        }
    };
    Ok(language)
}
