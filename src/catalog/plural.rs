//! Numerus (plural form) rules per language.
//!
//! A numerus message carries one `<numerusform>` per plural form of the
//! target language; the families below decide how many forms there are and
//! which one a count selects.

use serde::Serialize;

/// Plural rule families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PluralRule {
    /// No plural distinction (ja, zh, ko, tr, tt, ...).
    Japanese,
    /// `n == 1` is singular.
    English,
    /// `n <= 1` is singular.
    French,
    /// ru, uk, be and the Serbo-Croatian languages.
    SlavicEast,
    /// cs, sk
    Czech,
    Polish,
    Lithuanian,
    Latvian,
    Romanian,
    Macedonian,
    Slovenian,
    Maltese,
    Welsh,
    Irish,
    Arabic,
}

const JAPANESE: &[&str] = &[
    "bo", "dz", "fa", "fj", "gn", "hu", "id", "ja", "jv", "ka", "km", "ko", "lo", "ms", "my",
    "na", "om", "su", "th", "tr", "tt", "ug", "vi", "yo", "za", "zh",
];

const ENGLISH: &[&str] = &[
    "af", "az", "bg", "bn", "ca", "da", "de", "el", "en", "eo", "es", "et", "eu", "fi", "fo",
    "fy", "gl", "gu", "he", "hi", "hy", "is", "it", "kk", "kn", "ky", "lb", "ml", "mn", "mr",
    "nb", "ne", "nl", "nn", "no", "pa", "ps", "pt", "sq", "sv", "sw", "ta", "te", "tk", "ur",
    "uz",
];

const FRENCH: &[&str] = &["br", "fr", "ln", "mg", "oc", "ti"];

const SLAVIC_EAST: &[&str] = &["be", "bs", "hr", "ru", "sh", "sr", "uk"];

/// Full locales whose rule differs from their primary language.
const LOCALE_OVERRIDES: &[(&str, PluralRule)] = &[("pt_br", PluralRule::French)];

impl PluralRule {
    /// Number of `<numerusform>` entries a translation needs.
    #[must_use]
    pub const fn form_count(self) -> usize {
        match self {
            Self::Japanese => 1,
            Self::English | Self::French => 2,
            Self::SlavicEast
            | Self::Czech
            | Self::Polish
            | Self::Lithuanian
            | Self::Latvian
            | Self::Romanian
            | Self::Macedonian => 3,
            Self::Slovenian | Self::Maltese | Self::Welsh => 4,
            Self::Irish => 5,
            Self::Arabic => 6,
        }
    }

    /// Index of the form used for the count `n`.
    #[must_use]
    pub const fn form_index(self, n: u64) -> usize {
        let n10 = n % 10;
        let n100 = n % 100;
        let few_tens = n100 < 10 || n100 >= 20;

        match self {
            Self::Japanese => 0,
            Self::English => {
                if n == 1 { 0 } else { 1 }
            }
            Self::French => {
                if n <= 1 { 0 } else { 1 }
            }
            Self::SlavicEast => {
                if n10 == 1 && n100 != 11 {
                    0
                } else if n10 >= 2 && n10 <= 4 && few_tens {
                    1
                } else {
                    2
                }
            }
            Self::Czech => match n {
                1 => 0,
                2..=4 => 1,
                _ => 2,
            },
            Self::Polish => {
                if n == 1 {
                    0
                } else if n10 >= 2 && n10 <= 4 && few_tens {
                    1
                } else {
                    2
                }
            }
            Self::Lithuanian => {
                if n10 == 1 && n100 != 11 {
                    0
                } else if n10 >= 2 && few_tens {
                    1
                } else {
                    2
                }
            }
            Self::Latvian => {
                if n10 == 1 && n100 != 11 {
                    0
                } else if n != 0 {
                    1
                } else {
                    2
                }
            }
            Self::Romanian => {
                if n == 1 {
                    0
                } else if n == 0 || (n100 >= 1 && n100 <= 19) {
                    1
                } else {
                    2
                }
            }
            Self::Macedonian => match n10 {
                1 => 0,
                2 => 1,
                _ => 2,
            },
            Self::Slovenian => match n100 {
                1 => 0,
                2 => 1,
                3 | 4 => 2,
                _ => 3,
            },
            Self::Maltese => {
                if n == 1 {
                    0
                } else if n == 0 || (n100 >= 1 && n100 <= 10) {
                    1
                } else if n100 >= 11 && n100 <= 19 {
                    2
                } else {
                    3
                }
            }
            Self::Welsh => match n {
                1 => 0,
                2 => 1,
                8 | 11 => 2,
                _ => 3,
            },
            Self::Irish => match n {
                1 => 0,
                2 => 1,
                3..=6 => 2,
                7..=10 => 3,
                _ => 4,
            },
            Self::Arabic => match n {
                0 => 0,
                1 => 1,
                2 => 2,
                _ if n100 >= 3 && n100 <= 10 => 3,
                _ if n100 >= 11 => 4,
                _ => 5,
            },
        }
    }
}

/// Resolves the plural rule of a locale such as `uk_UA`, `ru-RU` or `pt_BR`.
///
/// Returns `None` for languages without a known rule.
#[must_use]
pub fn plural_rule(language: &str) -> Option<PluralRule> {
    let normalized = language.trim().replace('-', "_").to_ascii_lowercase();
    if let Some((_, rule)) = LOCALE_OVERRIDES.iter().find(|(locale, _)| normalized == *locale) {
        return Some(*rule);
    }

    let primary = normalized.split(['_', '.', '@']).next().unwrap_or_default();
    let rule = match primary {
        "cs" | "sk" => PluralRule::Czech,
        "pl" => PluralRule::Polish,
        "lt" => PluralRule::Lithuanian,
        "lv" => PluralRule::Latvian,
        "ro" | "mo" => PluralRule::Romanian,
        "mk" => PluralRule::Macedonian,
        "sl" => PluralRule::Slovenian,
        "mt" => PluralRule::Maltese,
        "cy" => PluralRule::Welsh,
        "ga" => PluralRule::Irish,
        "ar" => PluralRule::Arabic,
        _ if JAPANESE.contains(&primary) => PluralRule::Japanese,
        _ if ENGLISH.contains(&primary) => PluralRule::English,
        _ if FRENCH.contains(&primary) => PluralRule::French,
        _ if SLAVIC_EAST.contains(&primary) => PluralRule::SlavicEast,
        _ => return None,
    };
    Some(rule)
}
