use std::fmt::Display;

use serde::Serialize;
use snafu::Snafu;

use crate::config::{ComponentId, VoteId};

/// A validation failure for a single field of a payload.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The list of field errors returned instead of the requested resource.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }

    /// Ok if no error was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msgs: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", msgs.join("; "))
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BallotError {
    #[snafu(display("Validation failed: {errors}"))]
    Validation { errors: ValidationErrors },

    #[snafu(display("{what} not found: {key}"))]
    NotFound { what: &'static str, key: String },

    #[snafu(display("Data integrity fault in component {component} (vote {vote:?}): {message}"))]
    DataIntegrity {
        component: ComponentId,
        vote: Option<VoteId>,
        message: String,
    },

    #[snafu(display("Calculating the results of component {component} ({title}) failed"))]
    ComponentFailed {
        component: ComponentId,
        title: String,
        #[snafu(source(from(BallotError, Box::new)))]
        source: Box<BallotError>,
    },

    #[snafu(display("Too many {what}: {actual} (limit {limit})"))]
    LimitExceeded {
        what: &'static str,
        limit: usize,
        actual: usize,
    },

    #[snafu(display("Error writing the results table"))]
    CsvWrite { source: csv::Error },

    #[snafu(display("Error flushing the results table"))]
    CsvFlush { source: std::io::Error },
}

pub type BallotResult<T> = Result<T, BallotError>;

impl From<ValidationErrors> for BallotError {
    fn from(errors: ValidationErrors) -> Self {
        BallotError::Validation { errors }
    }
}

impl BallotError {
    /// The field errors, if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            BallotError::Validation { errors } => Some(errors),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BallotError::NotFound { .. })
    }
}

pub(crate) fn integrity(
    component: ComponentId,
    vote: Option<&VoteId>,
    message: impl Into<String>,
) -> BallotError {
    BallotError::DataIntegrity {
        component,
        vote: vote.cloned(),
        message: message.into(),
    }
}
