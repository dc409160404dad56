//! Error handling for replug.
//!
//! Two layers, following the same split the CLI uses throughout:
//! 1. [`ReplugError`] - strongly-typed failure kinds for precise handling
//! 2. [`ErrorContext`] - user-facing wrapper that adds suggestions and details
//!
//! Every failure the update machinery can hit maps to one of four kinds:
//!
//! - **Network**: [`ReplugError::NetworkFailure`] - transport error or
//!   non-success HTTP status from the remote source
//! - **Parse**: [`ReplugError::VersionMarkerMissing`],
//!   [`ReplugError::EmptyVersion`] - the version marker is absent or unusable
//! - **File system**: [`ReplugError::FileSystemFailure`] - read/write/delete
//!   on the installed file, sidecar, backup, or helper
//! - **Host signal**: [`ReplugError::HostSignalTimeout`] - an enable/disable
//!   acknowledgement never arrived (only inferable by polling)
//!
//! All kinds are recovered at the top of an update cycle: logged, the cycle
//! aborts, and the installed version stays untouched. None are fatal to the
//! host application.
//!
//! Use [`user_friendly_error`] at the CLI boundary to convert any
//! [`anyhow::Error`] into a colored, suggestion-bearing message.

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for replug operations.
///
/// Each variant carries enough context (URL, path, plugin name) to render an
/// actionable message without re-deriving state at the error site.
#[derive(Error, Debug)]
pub enum ReplugError {
    /// Network request failed: transport error, timeout, or non-2xx status.
    #[error("network request to {url} failed: {reason}")]
    NetworkFailure {
        /// The URL that was being fetched.
        url: String,
        /// Transport error text or the HTTP status line.
        reason: String,
    },

    /// No version marker was found in the scanned text.
    ///
    /// The marker is the `version` keyword followed by whitespace and a
    /// dotted-number token inside the plugin's source text.
    #[error("no version marker found in {location}")]
    VersionMarkerMissing {
        /// Human-readable description of what was scanned (URL or path).
        location: String,
    },

    /// A version string was empty or blank; comparison is indeterminate.
    #[error("version string is empty")]
    EmptyVersion,

    /// A file system operation on one of the managed paths failed.
    #[error("{operation} failed for {}", .path.display())]
    FileSystemFailure {
        /// What was being attempted ("read installed plugin", "write backup").
        operation: String,
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The host never acknowledged an enable/disable signal.
    ///
    /// The host exposes no completion callback, so this is inferred by
    /// polling [`HostControl::state`](crate::host::HostControl::state) until
    /// a timeout elapses.
    #[error("host did not acknowledge '{expected}' for plugin '{name}' within {waited_ms}ms")]
    HostSignalTimeout {
        /// Plugin the signal was sent for.
        name: String,
        /// The state that was being waited for ("enabled" / "disabled").
        expected: String,
        /// How long the sequencer polled before giving up.
        waited_ms: u64,
    },

    /// No update target is configured and none was supplied on the command line.
    #[error("no update target configured")]
    TargetNotConfigured,

    /// Configuration file could not be parsed.
    #[error("invalid configuration in {file}: {reason}")]
    ConfigParseError {
        /// Path of the configuration file.
        file: String,
        /// Parser error text.
        reason: String,
    },

    /// Catch-all for errors that don't fit the categories above.
    #[error("{message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// User-facing error wrapper with an optional suggestion and details.
///
/// Rendered at the CLI boundary with color coding: the error in red, details
/// in yellow, the suggestion in green.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying replug error.
    pub error: ReplugError,
    /// Optional actionable suggestion for resolving the error.
    pub suggestion: Option<String>,
    /// Optional additional details about why the error occurred.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: ReplugError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add explanatory details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`] for CLI display.
///
/// Recognizes [`ReplugError`] variants and common wrapped errors
/// ([`std::io::Error`], [`toml::de::Error`]) and attaches tailored
/// suggestions; everything else falls through with the plain message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(replug_error) = error.downcast_ref::<ReplugError>() {
        return contextualize(replug_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(ReplugError::Other {
                    message: error.to_string(),
                })
                .with_suggestion(
                    "Check ownership of the plugins directory, or re-run with write access to it",
                )
                .with_details(
                    "replug needs read/write access to the installed plugin file and its siblings",
                );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(ReplugError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check that the installed plugin path exists and is spelled correctly");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(ReplugError::ConfigParseError {
            file: "config.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in your replug config file");
    }

    ErrorContext::new(ReplugError::Other {
        message: format!("{error:#}"),
    })
}

/// Attach the standard suggestion/details for each [`ReplugError`] kind.
fn contextualize(error: &ReplugError) -> ErrorContext {
    match error {
        ReplugError::NetworkFailure { url, reason } => ErrorContext::new(ReplugError::NetworkFailure {
            url: url.clone(),
            reason: reason.clone(),
        })
        .with_suggestion("Check your network connection and that the source URL is reachable")
        .with_details("The update check is best-effort; the installed version is unchanged"),

        ReplugError::VersionMarkerMissing { location } => {
            ErrorContext::new(ReplugError::VersionMarkerMissing {
                location: location.clone(),
            })
            .with_suggestion(
                "Verify the source text carries a 'version X.Y.Z' documentation marker",
            )
            .with_details("The marker is the sole source of truth for version comparison")
        }

        ReplugError::EmptyVersion => ErrorContext::new(ReplugError::EmptyVersion)
            .with_details("An empty version makes the comparison indeterminate; the cycle is skipped"),

        ReplugError::FileSystemFailure {
            operation,
            path,
            source,
        } => ErrorContext::new(ReplugError::FileSystemFailure {
            operation: operation.clone(),
            path: path.clone(),
            source: std::io::Error::new(source.kind(), source.to_string()),
        })
        .with_suggestion("Check permissions and free space in the plugins directory"),

        ReplugError::HostSignalTimeout {
            name,
            expected,
            waited_ms,
        } => ErrorContext::new(ReplugError::HostSignalTimeout {
            name: name.clone(),
            expected: expected.clone(),
            waited_ms: *waited_ms,
        })
        .with_details("The host exposes no completion callback; state changes are only inferable by polling"),

        ReplugError::TargetNotConfigured => ErrorContext::new(ReplugError::TargetNotConfigured)
            .with_suggestion(
                "Set [target] in the replug config file, or pass --name, --file and --url",
            ),

        ReplugError::ConfigParseError { file, reason } => {
            ErrorContext::new(ReplugError::ConfigParseError {
                file: file.clone(),
                reason: reason.clone(),
            })
            .with_suggestion("Check the TOML syntax in your replug config file")
        }

        ReplugError::Other { message } => ErrorContext::new(ReplugError::Other {
            message: message.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReplugError::NetworkFailure {
            url: "https://example.com/p.js".to_string(),
            reason: "HTTP 404".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "network request to https://example.com/p.js failed: HTTP 404"
        );
    }

    #[test]
    fn test_context_builder() {
        let ctx = ErrorContext::new(ReplugError::EmptyVersion)
            .with_suggestion("do the thing")
            .with_details("because");

        let rendered = format!("{ctx}");
        assert!(rendered.contains("version string is empty"));
        assert!(rendered.contains("Suggestion: do the thing"));
        assert!(rendered.contains("Details: because"));
    }

    #[test]
    fn test_user_friendly_downcast() {
        let err = anyhow::Error::from(ReplugError::TargetNotConfigured);
        let ctx = user_friendly_error(err);
        assert!(ctx.suggestion.is_some());
        assert!(matches!(ctx.error, ReplugError::TargetNotConfigured));
    }

    #[test]
    fn test_user_friendly_io_permission() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let ctx = user_friendly_error(anyhow::Error::from(io));
        assert!(ctx.suggestion.as_deref().unwrap_or("").contains("write access"));
    }
}
