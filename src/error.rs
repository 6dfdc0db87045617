// src/error.rs
//! Unified error handling for the gesture recognizer
//!
//! Component errors (parsing, transport, configuration, template storage and
//! numeric processing) are small `thiserror` enums owned by their modules.
//! They are converted into [`GestureError`], which carries an [`ErrorContext`]
//! describing where the failure surfaced so a fatal loop exit can be reported
//! once with enough detail to diagnose it.

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use crate::config::ConfigError;
use crate::hal::types::ParseError;
use crate::hal::TransportError;
use crate::processing::ProcessingError;
use crate::templates::TemplateError;

/// Unified error type for the recognizer
#[derive(Debug)]
pub enum GestureError {
    /// A sample line could not be turned into a sample
    Parse {
        error: ParseError,
        context: ErrorContext,
    },

    /// The sample transport failed or could not be opened
    Transport {
        error: TransportError,
        context: ErrorContext,
    },

    /// Invalid options or an unusable template set
    Configuration {
        error: ConfigError,
        context: ErrorContext,
    },

    /// Template storage failures
    Template {
        error: TemplateError,
        context: ErrorContext,
    },

    /// Internal computation errors during evaluation
    Processing {
        error: ProcessingError,
        context: ErrorContext,
    },
}

/// Where an error surfaced
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub additional_info: HashMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
            additional_info: HashMap::new(),
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }

    /// Add additional information to the context
    pub fn add_info<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.additional_info.insert(key.into(), value.to_string());
        self
    }

    fn render_info(&self) -> String {
        let mut keys: Vec<_> = self.additional_info.keys().collect();
        keys.sort();
        keys.iter()
            .map(|k| format!("{}={}", k, self.additional_info[*k]))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

impl GestureError {
    /// Context attached to this error
    pub fn context(&self) -> &ErrorContext {
        match self {
            GestureError::Parse { context, .. }
            | GestureError::Transport { context, .. }
            | GestureError::Configuration { context, .. }
            | GestureError::Template { context, .. }
            | GestureError::Processing { context, .. } => context,
        }
    }

    /// Replace the context, keeping the underlying error
    pub fn with_context(mut self, new_context: ErrorContext) -> Self {
        match &mut self {
            GestureError::Parse { context, .. }
            | GestureError::Transport { context, .. }
            | GestureError::Configuration { context, .. }
            | GestureError::Template { context, .. }
            | GestureError::Processing { context, .. } => *context = new_context,
        }
        self
    }

    /// Parse errors are the only recoverable class
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GestureError::Parse { .. })
    }
}

impl fmt::Display for GestureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = self.context();
        match self {
            GestureError::Parse { error, .. } => {
                write!(f, "[PARSE] {} ({})", error, context.operation)?
            }
            GestureError::Transport { error, .. } => {
                write!(f, "[TRANSPORT] {} in {} ({})", error, context.component, context.operation)?
            }
            GestureError::Configuration { error, .. } => {
                write!(f, "[CONFIG] Configuration error in {}: {} ({})",
                       context.component, error, context.operation)?
            }
            GestureError::Template { error, .. } => {
                write!(f, "[TEMPLATE] {} ({})", error, context.operation)?
            }
            GestureError::Processing { error, .. } => {
                write!(f, "[PROCESSING] {} in {} ({})", error, context.component, context.operation)?
            }
        }
        if !context.additional_info.is_empty() {
            write!(f, " [{}]", context.render_info())?;
        }
        if let (Some(file), Some(line)) = (context.file, context.line) {
            write!(f, " at {}:{}", file, line)?;
        }
        Ok(())
    }
}

impl std::error::Error for GestureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GestureError::Parse { error, .. } => Some(error),
            GestureError::Transport { error, .. } => Some(error),
            GestureError::Configuration { error, .. } => Some(error),
            GestureError::Template { error, .. } => Some(error),
            GestureError::Processing { error, .. } => Some(error),
        }
    }
}

impl From<ParseError> for GestureError {
    fn from(error: ParseError) -> Self {
        GestureError::Parse { error, context: error_context!("ingest", "parse_sample") }
    }
}

impl From<TransportError> for GestureError {
    fn from(error: TransportError) -> Self {
        GestureError::Transport { error, context: error_context!("transport", "read_line") }
    }
}

impl From<ConfigError> for GestureError {
    fn from(error: ConfigError) -> Self {
        GestureError::Configuration { error, context: error_context!("config", "validate") }
    }
}

impl From<TemplateError> for GestureError {
    fn from(error: TemplateError) -> Self {
        GestureError::Template { error, context: error_context!("templates", "load") }
    }
}

impl From<ProcessingError> for GestureError {
    fn from(error: ProcessingError) -> Self {
        GestureError::Processing { error, context: error_context!("processing", "evaluate") }
    }
}

/// Result type alias for recognizer operations
pub type GestureResult<T> = Result<T, GestureError>;

/// Attach a context to component results
pub trait ResultExt<T> {
    fn context(self, component: &str, operation: &str) -> GestureResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<GestureError>,
{
    fn context(self, component: &str, operation: &str) -> GestureResult<T> {
        self.map_err(|err| err.into().with_context(ErrorContext::new(component, operation)))
    }
}
