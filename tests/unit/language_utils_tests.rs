/*!
 * Tests for language utility functions
 */

use chunkwise::language_utils::{
    Level, SUPPORTED_LANGUAGES, get_language_name, is_supported, level_tag, requires_level,
};

/// Every supported code resolves to an English name
#[test]
fn test_getLanguageName_withEverySupportedCode_shouldResolve() {
    for code in SUPPORTED_LANGUAGES {
        let name = get_language_name(code).unwrap();
        assert!(!name.is_empty(), "no name for {}", code);
    }
    assert_eq!(get_language_name("pt").unwrap(), "Portuguese");
}

#[test]
fn test_isSupported_shouldBeExact() {
    assert!(is_supported("en"));
    assert!(!is_supported("EN"));
    assert!(!is_supported(" en"));
    assert!(!is_supported("eng"));
}

#[test]
fn test_requiresLevel_shouldOnlyApplyToGerman() {
    assert!(requires_level("de"));
    for code in SUPPORTED_LANGUAGES.iter().filter(|c| **c != "de") {
        assert!(!requires_level(code));
    }
}

#[test]
fn test_level_shouldRoundTripThroughTag() {
    for level in Level::ALL {
        assert_eq!(level_tag(Some(level)).parse::<Level>().unwrap(), level);
    }
    assert_eq!(level_tag(None), "");
}
