use wizflow::core::error::{AppError, DefaultErrorReporter, ErrorReporter, PipelineError, TranslationError};
use wizflow::core::types::{ErrorCategory, ErrorSeverity, PipelineStage};

#[test]
fn test_error_creation_all_categories() {
    let categories = vec![
        ErrorCategory::ValidationError,
        ErrorCategory::DependencyError,
        ErrorCategory::ExecutionError,
        ErrorCategory::TimeoutError,
        ErrorCategory::StorageError,
        ErrorCategory::ConfigurationError,
        ErrorCategory::SerializationError,
        ErrorCategory::IoError,
        ErrorCategory::InternalError,
    ];

    for category in categories {
        let error = AppError::new(category, "test message");
        assert_eq!(error.category, category);
        assert_eq!(error.message, "test message");
        assert!(error.context.is_empty());
        assert!(error.recovery_suggestions.is_empty());
        assert!(error.occurred_at <= chrono::Utc::now());
        assert!(error.source.is_none());
    }
}

#[test]
fn test_error_severity_mapping() {
    assert_eq!(
        AppError::new(ErrorCategory::StorageError, "x").severity(),
        ErrorSeverity::Error
    );
    assert_eq!(
        AppError::new(ErrorCategory::TimeoutError, "x").severity(),
        ErrorSeverity::Error
    );
}

#[test]
fn test_error_builder_chain() {
    let mut error = AppError::new(ErrorCategory::StorageError, "workflow 'alert' has not been saved")
        .with_code("WIZ-STORE-002")
        .with_suggestion("Run `wizflow compile` first");
    error.add_context("name", "alert");

    assert_eq!(error.code, "WIZ-STORE-002");
    assert_eq!(error.recovery_suggestions.len(), 1);
    let rendered = error.to_string();
    assert!(rendered.starts_with("[WIZ-STORE-002] StorageError"));
    assert!(rendered.contains("name=alert"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let error: AppError = io.into();
    assert_eq!(error.category, ErrorCategory::IoError);
    assert_eq!(error.code, "IO_ERROR");
    assert!(error.source.is_some());
}

#[test]
fn test_pipeline_error_stages() {
    let cases: Vec<(PipelineError, PipelineStage)> = vec![
        (
            PipelineError::Translation(TranslationError::Failed("boom".into())),
            PipelineStage::Translate,
        ),
        (
            PipelineError::Document {
                reasons: vec!["bad name".into()],
            },
            PipelineStage::Generate,
        ),
        (
            PipelineError::Generation {
                reasons: vec!["[WIZ-VAL-001] missing".into()],
            },
            PipelineStage::Validate,
        ),
        (
            PipelineError::DependencyMissing {
                modules: vec!["requests".into()],
            },
            PipelineStage::Dependencies,
        ),
        (
            PipelineError::Storage(AppError::new(ErrorCategory::StorageError, "disk full")),
            PipelineStage::Persist,
        ),
    ];

    for (error, stage) in cases {
        assert_eq!(error.stage(), stage, "{}", error);
        assert!(!error.reasons().is_empty());
    }
}

#[test]
fn test_missing_modules_reasons() {
    let error = PipelineError::DependencyMissing {
        modules: vec!["bs4".into(), "requests".into()],
    };
    assert_eq!(
        error.reasons(),
        vec![
            "module 'bs4' is not importable".to_string(),
            "module 'requests' is not importable".to_string()
        ]
    );
    assert_eq!(error.to_string(), "missing modules: bs4, requests");
}

#[test]
fn test_default_reporter_does_not_panic() {
    let reporter = DefaultErrorReporter::new();
    reporter.report_error(&AppError::new(ErrorCategory::IoError, "x").with_suggestion("retry"));
    reporter.report_pipeline_error(&PipelineError::Generation {
        reasons: vec!["syntax".into()],
    });
}

