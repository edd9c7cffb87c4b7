//! Catalog consistency checks.
//!
//! Problems found here are content issues, not errors: a catalog with issues
//! still loads and still answers lookups.

use std::collections::{
    BTreeSet,
    HashSet,
};
use std::fmt;

use serde::Serialize;

use super::model::{
    Message,
    MessageKey,
    TranslationBody,
    TranslationKind,
};
use super::parser::ParsedCatalog;
use super::plural::plural_rule;

/// Options for [`validate`].
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Language used for plural rules; falls back to the `<TS language>` attribute.
    pub language: Option<String>,
    /// Report messages still marked unfinished.
    pub report_unfinished: bool,
}

/// One problem found in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogIssue {
    pub context: String,
    /// Source text of the message, when it has one.
    pub source: Option<String>,
    /// Document-order index of the message; `None` for catalog-wide issues.
    pub message: Option<usize>,
    pub kind: IssueKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IssueKind {
    MissingSource,
    DuplicateMessage,
    NumerusFormCount { expected: usize, found: usize },
    UnknownPluralRules { language: String },
    UnexpectedNumerusForms,
    MissingPluralMarker,
    PlaceMarkerMismatch { missing: Vec<String>, extra: Vec<String> },
    AcceleratorMismatch,
    Unfinished,
    EmptyTranslation,
}

/// Groups of issues that share one configurable severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    MissingSource,
    Duplicates,
    Numerus,
    PlaceMarkers,
    Accelerators,
    Unfinished,
    EmptyTranslations,
}

impl IssueKind {
    #[must_use]
    pub const fn category(&self) -> IssueCategory {
        match self {
            Self::MissingSource => IssueCategory::MissingSource,
            Self::DuplicateMessage => IssueCategory::Duplicates,
            Self::NumerusFormCount { .. }
            | Self::UnknownPluralRules { .. }
            | Self::UnexpectedNumerusForms
            | Self::MissingPluralMarker => IssueCategory::Numerus,
            Self::PlaceMarkerMismatch { .. } => IssueCategory::PlaceMarkers,
            Self::AcceleratorMismatch => IssueCategory::Accelerators,
            Self::Unfinished => IssueCategory::Unfinished,
            Self::EmptyTranslation => IssueCategory::EmptyTranslations,
        }
    }

    /// Stable identifier used as the diagnostic code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingSource => "missing-source",
            Self::DuplicateMessage => "duplicate-message",
            Self::NumerusFormCount { .. } => "numerus-form-count",
            Self::UnknownPluralRules { .. } => "unknown-plural-rules",
            Self::UnexpectedNumerusForms => "unexpected-numerus-forms",
            Self::MissingPluralMarker => "missing-plural-marker",
            Self::PlaceMarkerMismatch { .. } => "place-marker-mismatch",
            Self::AcceleratorMismatch => "accelerator-mismatch",
            Self::Unfinished => "unfinished",
            Self::EmptyTranslation => "empty-translation",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSource => write!(f, "Message has no <source> element"),
            Self::DuplicateMessage => write!(f, "Duplicate message in this context"),
            Self::NumerusFormCount { expected, found } => {
                write!(f, "Expected {expected} plural forms, found {found}")
            }
            Self::UnknownPluralRules { language } if language.is_empty() => {
                write!(f, "Catalog has no language; plural forms cannot be checked")
            }
            Self::UnknownPluralRules { language } => {
                write!(f, "No plural rules known for language '{language}'")
            }
            Self::UnexpectedNumerusForms => {
                write!(f, "Plural forms in a message not marked numerus=\"yes\"")
            }
            Self::MissingPluralMarker => write!(f, "Plural message source has no %n"),
            Self::PlaceMarkerMismatch { missing, extra } => {
                let mut parts = Vec::new();
                if !missing.is_empty() {
                    parts.push(format!("missing {}", missing.join(", ")));
                }
                if !extra.is_empty() {
                    parts.push(format!("unexpected {}", extra.join(", ")));
                }
                write!(f, "Place markers differ from source: {}", parts.join("; "))
            }
            Self::AcceleratorMismatch => {
                write!(f, "Accelerator (&) present in only one of source and translation")
            }
            Self::Unfinished => write!(f, "Translation is unfinished"),
            Self::EmptyTranslation => write!(f, "Translation marked finished is empty"),
        }
    }
}

/// Checks a parsed catalog and returns its issues in document order.
///
/// Catalog-wide issues come first.
#[must_use]
pub fn validate(parsed: &ParsedCatalog, options: &ValidationOptions) -> Vec<CatalogIssue> {
    let catalog = &parsed.catalog;
    let language = options.language.as_deref().or(catalog.language.as_deref()).unwrap_or_default();
    let rule = plural_rule(language);

    let mut issues: Vec<CatalogIssue> = parsed
        .dropped
        .iter()
        .map(|dropped| CatalogIssue {
            context: dropped.context.clone(),
            source: None,
            message: Some(dropped.document_index),
            kind: IssueKind::MissingSource,
        })
        .collect();

    let mut seen: HashSet<MessageKey> = HashSet::new();
    let mut needs_plural_rules = false;

    for (context_index, context) in catalog.contexts.iter().enumerate() {
        for (message_index, message) in context.messages.iter().enumerate() {
            let mut report = |kind| {
                issues.push(CatalogIssue {
                    context: context.name.clone(),
                    source: Some(message.source.clone()),
                    message: parsed.document_index(context_index, message_index),
                    kind,
                });
            };

            if !seen.insert(message.key(&context.name)) {
                report(IssueKind::DuplicateMessage);
            }

            if !message.translation.kind.is_active() {
                continue;
            }

            if message.numerus {
                needs_plural_rules = true;
                if !contains_plural_marker(&message.source) {
                    report(IssueKind::MissingPluralMarker);
                }
                if let Some(rule) = rule {
                    let found = message.translation.forms().len();
                    if found != rule.form_count() {
                        report(IssueKind::NumerusFormCount { expected: rule.form_count(), found });
                    }
                }
            } else if matches!(message.translation.body, TranslationBody::NumerusForms(_)) {
                report(IssueKind::UnexpectedNumerusForms);
            }

            match message.translation.kind {
                TranslationKind::Unfinished if options.report_unfinished => {
                    report(IssueKind::Unfinished);
                }
                TranslationKind::Finished
                    if message.translation.forms().iter().any(|form| form.is_empty()) =>
                {
                    report(IssueKind::EmptyTranslation);
                }
                _ => {}
            }

            if let Some(kind) = place_marker_mismatch(message) {
                report(kind);
            }
            if accelerator_mismatch(message) {
                report(IssueKind::AcceleratorMismatch);
            }
        }
    }

    if needs_plural_rules && rule.is_none() {
        issues.push(CatalogIssue {
            context: String::new(),
            source: None,
            message: None,
            kind: IssueKind::UnknownPluralRules { language: language.to_string() },
        });
    }

    issues.sort_by_key(|issue| issue.message);
    issues
}

fn contains_plural_marker(text: &str) -> bool {
    place_markers(text).contains("%n")
}

/// Compares the `%1`..`%99` and `%n` markers of the source with every
/// non-empty translation form.
///
/// In numerus messages `%n` is not compared: a singular form may spell the
/// number out.
fn place_marker_mismatch(message: &Message) -> Option<IssueKind> {
    let mut expected = place_markers(&message.source);
    if message.numerus {
        expected.remove("%n");
    }

    let mut missing = BTreeSet::new();
    let mut extra = BTreeSet::new();
    for form in message.translation.forms().into_iter().filter(|form| !form.is_empty()) {
        let mut found = place_markers(form);
        if message.numerus {
            found.remove("%n");
        }
        missing.extend(expected.difference(&found).cloned());
        extra.extend(found.difference(&expected).cloned());
    }

    if missing.is_empty() && extra.is_empty() {
        None
    } else {
        Some(IssueKind::PlaceMarkerMismatch {
            missing: missing.into_iter().collect(),
            extra: extra.into_iter().collect(),
        })
    }
}

/// Place markers in `text`, with the locale flag (`%L1`, `%Ln`) dropped.
fn place_markers(text: &str) -> BTreeSet<String> {
    let mut markers = BTreeSet::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            continue;
        }
        if chars.peek() == Some(&'L') {
            chars.next();
        }
        match chars.peek() {
            Some('n') => {
                chars.next();
                markers.insert("%n".to_string());
            }
            Some(digit) if digit.is_ascii_digit() && *digit != '0' => {
                let mut marker = String::from("%");
                while marker.len() < 3 {
                    match chars.peek() {
                        Some(digit) if digit.is_ascii_digit() => {
                            marker.push(*digit);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                markers.insert(marker);
            }
            _ => {}
        }
    }

    markers
}

fn accelerator_mismatch(message: &Message) -> bool {
    let in_source = has_accelerator(&message.source);
    message
        .translation
        .forms()
        .into_iter()
        .filter(|form| !form.is_empty())
        .any(|form| has_accelerator(form) != in_source)
}

/// `&X` marks a keyboard accelerator; `&&` is a literal ampersand.
fn has_accelerator(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '&' {
            continue;
        }
        match chars.peek() {
            Some('&') => {
                chars.next();
            }
            Some(next) if !next.is_whitespace() => return true,
            _ => {}
        }
    }
    false
}
