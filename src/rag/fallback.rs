//! Static answers used when the pipeline cannot generate one.
//!
//! Both functions only look at the first two characters of the resolved
//! language and default to English.

use super::prompt::language_key;

const FALLBACK_EN: &str = "I’m unable to answer right now. A teammate will get back to you shortly.";
const FALLBACK_FR: &str =
    "Je ne peux pas répondre pour le moment. Un membre de l’équipe vous contactera bientôt.";

const INSUFFICIENT_EN: &str = "I don’t have enough information in the FAQ to answer. \
Shall I connect you with a human teammate?";
const INSUFFICIENT_FR: &str = "Je ne dispose pas d’informations suffisantes dans la base FAQ. \
Souhaitez-vous qu’un membre de l’équipe prenne le relais ?";

/// Apology returned when generation is disabled or fails.
pub fn fallback_text(lang: Option<&str>) -> &'static str {
    match language_key(lang).as_str() {
        "fr" => FALLBACK_FR,
        _ => FALLBACK_EN,
    }
}

/// Answer used when no knowledge-base entry grounds a reply.
pub fn insufficient_context_text(lang: Option<&str>) -> &'static str {
    match language_key(lang).as_str() {
        "fr" => INSUFFICIENT_FR,
        _ => INSUFFICIENT_EN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_selects_by_two_letter_code() {
        assert_eq!(fallback_text(Some("fr")), FALLBACK_FR);
        assert_eq!(fallback_text(Some("FR-ca")), FALLBACK_FR);
        assert_eq!(fallback_text(Some("en-GB")), FALLBACK_EN);
        assert_eq!(fallback_text(Some("es")), FALLBACK_EN);
        assert_eq!(fallback_text(Some("")), FALLBACK_EN);
        assert_eq!(fallback_text(None), FALLBACK_EN);
    }

    #[test]
    fn test_insufficient_context_selects_by_two_letter_code() {
        assert_eq!(insufficient_context_text(Some("fra")), INSUFFICIENT_FR);
        assert_eq!(insufficient_context_text(Some("de")), INSUFFICIENT_EN);
        assert!(insufficient_context_text(None).contains("FAQ"));
    }

    #[test]
    fn test_selection_is_stable() {
        for lang in ["fr", "en", "pt-BR", "x"] {
            assert_eq!(fallback_text(Some(lang)), fallback_text(Some(lang)));
            assert_eq!(
                insufficient_context_text(Some(lang)),
                insufficient_context_text(Some(lang))
            );
        }
    }
}
