/*!
 * Tests for language utility functions
 */

use subalign::language_utils::{
    get_language_name, language_codes_match, normalize_to_part1_or_part2t, normalize_to_part2t,
    primary_subtag,
};

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("eng").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fra").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
    assert_eq!(normalize_to_part2t("chi").unwrap(), "zho");

    // Case insensitivity
    assert_eq!(normalize_to_part2t("EN").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("FRE").unwrap(), "fra");

    // Whitespace
    assert_eq!(normalize_to_part2t(" en ").unwrap(), "eng");

    // Invalid codes
    assert!(normalize_to_part2t("xyz").is_err());
    assert!(normalize_to_part2t("123").is_err());
    assert!(normalize_to_part2t("e").is_err());
}

/// Test normalization of regional subtags down to the primary language
#[test]
fn test_normalize_to_part2t_withRegionalSubtags_shouldDropRegion() {
    assert_eq!(normalize_to_part2t("en-US").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("zh-Hans").unwrap(), "zho");
    assert_eq!(normalize_to_part2t("pt_BR").unwrap(), "por");

    assert_eq!(primary_subtag("en-US"), "en");
    assert_eq!(primary_subtag("zh_Hant_TW"), "zh");
    assert_eq!(primary_subtag("ja"), "ja");
}

/// Test normalization to the shortest usable code
#[test]
fn test_normalize_to_part1_or_part2t_withValidCodes_shouldPreferPart1() {
    assert_eq!(normalize_to_part1_or_part2t("eng").unwrap(), "en");
    assert_eq!(normalize_to_part1_or_part2t("en").unwrap(), "en");
    assert_eq!(normalize_to_part1_or_part2t("fre").unwrap(), "fr");
    assert_eq!(normalize_to_part1_or_part2t("zh-CN").unwrap(), "zh");
    assert!(normalize_to_part1_or_part2t("xyz").is_err());
}

/// Test matching of different language code formats
#[test]
fn test_language_codes_match_withMatchingCodes_shouldReturnTrue() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("eng", "en"));
    assert!(language_codes_match("eng", "eng"));
    assert!(language_codes_match("fr", "fra"));
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("fra", "fre"));

    // Case insensitivity
    assert!(language_codes_match("EN", "eng"));
    assert!(language_codes_match("EN", "ENG"));

    // Whitespace
    assert!(language_codes_match(" en ", "eng"));

    // Regional subtags
    assert!(language_codes_match("en-US", "eng"));
    assert!(language_codes_match("zh-Hans", "zh"));

    // Non-matches
    assert!(!language_codes_match("en", "fra"));
    assert!(!language_codes_match("eng", "fre"));
    assert!(!language_codes_match("en", "xyz"));
}

/// Test retrieval of language names from codes
#[test]
fn test_get_language_name_withValidCodes_shouldReturnCorrectName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("eng").unwrap(), "English");
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(get_language_name("fra").unwrap(), "French");
    assert_eq!(get_language_name("fre").unwrap(), "French");

    // Invalid codes
    assert!(get_language_name("xyz").is_err());
}
