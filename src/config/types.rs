use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;
use tower_lsp::lsp_types::DiagnosticSeverity;

use crate::catalog::validate::IssueCategory;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "catalogFiles.includePatterns[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Settings as sent by clients that namespace them: `{"linguist": {...}}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    pub linguist: LinguistSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinguistSettings {
    pub catalog_files: CatalogFilesConfig,

    /// Excluded from every walk, on top of `catalogFiles.excludePatterns`.
    pub exclude_patterns: Vec<String>,

    /// Language of the `<source>` texts, written as `sourcelanguage` when
    /// `linguist.updateCatalog` produces a catalog without one.
    pub source_language: String,

    pub indexing: IndexingConfig,

    /// Languages whose unfinished messages are reported.
    ///
    /// - `None`: All detected languages are required (default)
    /// - `Some([...])`: Only specified languages are required
    ///
    /// Mutually exclusive with `optional_languages`.
    pub required_languages: Option<Vec<String>>,

    /// Languages whose unfinished messages are not reported.
    ///
    /// Mutually exclusive with `required_languages`.
    pub optional_languages: Option<Vec<String>>,

    pub diagnostics: DiagnosticsConfig,
    pub compile: CompileConfig,

    /// Languages listed first in hover, after the catalog being edited.
    pub primary_languages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexingConfig {
    /// Parallel catalog loads while indexing.
    /// Default: 80% of CPU cores (minimum 1).
    pub num_threads: Option<usize>,
}

/// Severity of a diagnostic category; `off` hides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
    Off,
}

impl Severity {
    #[must_use]
    pub const fn to_lsp(self) -> Option<DiagnosticSeverity> {
        match self {
            Self::Error => Some(DiagnosticSeverity::ERROR),
            Self::Warning => Some(DiagnosticSeverity::WARNING),
            Self::Information => Some(DiagnosticSeverity::INFORMATION),
            Self::Hint => Some(DiagnosticSeverity::HINT),
            Self::Off => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticsConfig {
    pub unfinished: Severity,
    pub duplicates: Severity,
    pub numerus: Severity,
    pub place_markers: Severity,
    pub accelerators: Severity,
    pub empty_translations: Severity,
    pub missing_source: Severity,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            unfinished: Severity::Information,
            duplicates: Severity::Error,
            numerus: Severity::Error,
            place_markers: Severity::Warning,
            accelerators: Severity::Warning,
            empty_translations: Severity::Warning,
            missing_source: Severity::Error,
        }
    }
}

impl DiagnosticsConfig {
    #[must_use]
    pub const fn severity(&self, category: IssueCategory) -> Severity {
        match category {
            IssueCategory::MissingSource => self.missing_source,
            IssueCategory::Duplicates => self.duplicates,
            IssueCategory::Numerus => self.numerus,
            IssueCategory::PlaceMarkers => self.place_markers,
            IssueCategory::Accelerators => self.accelerators,
            IssueCategory::Unfinished => self.unfinished,
            IssueCategory::EmptyTranslations => self.empty_translations,
        }
    }
}

/// Options for `linguist.translate`, mirroring lrelease flags.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileConfig {
    pub include_unfinished: bool,
    pub remove_identical: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self { include_unfinished: true, remove_identical: false }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogFilesConfig {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for CatalogFilesConfig {
    fn default() -> Self {
        Self { include_patterns: vec!["**/*.ts".to_string()], exclude_patterns: Vec::new() }
    }
}

impl LinguistSettings {
    /// # Errors
    /// - Required field is empty
    /// - Invalid glob pattern
    /// - Both language lists set
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.catalog_files.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "catalogFiles.includePatterns",
                "At least one pattern is required. Example: [\"**/translations/*.ts\"]",
            ));
        }

        let pattern_lists = [
            ("catalogFiles.includePatterns", &self.catalog_files.include_patterns),
            ("catalogFiles.excludePatterns", &self.catalog_files.exclude_patterns),
            ("excludePatterns", &self.exclude_patterns),
        ];
        for (field, patterns) in pattern_lists {
            for (index, pattern) in patterns.iter().enumerate() {
                if let Err(e) = globset::Glob::new(pattern) {
                    errors.push(ValidationError::new(
                        format!("{field}[{index}]"),
                        format!("Invalid glob pattern '{pattern}': {e}"),
                    ));
                }
            }
        }

        if self.source_language.trim().is_empty() {
            errors.push(ValidationError::new(
                "sourceLanguage",
                "The source language cannot be empty. Example: \"en\"",
            ));
        }

        if self.indexing.num_threads == Some(0) {
            errors.push(ValidationError::new(
                "indexing.numThreads",
                "At least one thread is required, or remove this field to use the default",
            ));
        }

        if self.required_languages.is_some() && self.optional_languages.is_some() {
            errors.push(ValidationError::new(
                "requiredLanguages/optionalLanguages",
                "Cannot specify both 'requiredLanguages' and 'optionalLanguages'. Please use only one",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Whether unfinished messages of `language` should be reported.
    ///
    /// Locales compare case-insensitively with `-` and `_` treated alike.
    #[must_use]
    pub fn is_language_required(&self, language: &str) -> bool {
        let matches = |list: &Vec<String>| {
            list.iter().any(|candidate| normalize_locale(candidate) == normalize_locale(language))
        };
        match (&self.required_languages, &self.optional_languages) {
            (Some(required), _) => matches(required),
            (None, Some(optional)) => !matches(optional),
            (None, None) => true,
        }
    }

    /// Parallel loads while indexing: `indexing.numThreads`, or 80% of the
    /// CPU cores.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.indexing
            .num_threads
            .unwrap_or_else(|| num_cpus::get().saturating_mul(4) / 5)
            .max(1)
    }
}

/// `uk-UA` and `uk_ua` name the same locale.
#[must_use]
pub fn normalize_locale(locale: &str) -> String {
    locale.trim().replace('-', "_").to_lowercase()
}

impl Default for LinguistSettings {
    fn default() -> Self {
        Self {
            catalog_files: CatalogFilesConfig::default(),
            exclude_patterns: vec!["**/node_modules/**".to_string(), "**/target/**".to_string()],
            source_language: "en".to_string(),
            indexing: IndexingConfig::default(),
            required_languages: None,
            optional_languages: None,
            diagnostics: DiagnosticsConfig::default(),
            compile: CompileConfig::default(),
            primary_languages: None,
        }
    }
}
