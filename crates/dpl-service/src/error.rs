use std::fmt;

use dpl_pool::ValidationError;
use dpl_schemas::{DrawId, TemplateId};
use dpl_template::InstantiateError;

/// Everything an apply/clone command can fail with.
///
/// Blocked changes (`AwardedPrizeConflict`) are deliberately NOT here: they
/// are non-fatal and ride inside the successful DTO. Validation and
/// instantiation failures abort before any persistence; a concurrency
/// conflict is surfaced only after bounded retries are exhausted.
#[derive(Debug)]
pub enum ApplyError {
    DrawNotFound(DrawId),
    TemplateNotFound(TemplateId),
    SourceDrawNotFound(DrawId),
    SelfCloneNotAllowed(DrawId),
    Instantiate(InstantiateError),
    Validation(ValidationError),
    /// The conditional write lost every attempt. Safe to retry from scratch:
    /// the whole computation is pure given a fresh read.
    ConcurrencyConflict { attempts: u32 },
    /// Store/infrastructure failure (connectivity, decode, ...).
    Store(anyhow::Error),
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::DrawNotFound(id) => write!(f, "draw not found: {id}"),
            ApplyError::TemplateNotFound(id) => write!(f, "template not found: {id}"),
            ApplyError::SourceDrawNotFound(id) => write!(f, "source draw not found: {id}"),
            ApplyError::SelfCloneNotAllowed(id) => {
                write!(f, "draw {id} cannot clone its own pool")
            }
            ApplyError::Instantiate(e) => write!(f, "template instantiation failed: {e}"),
            ApplyError::Validation(e) => write!(f, "pool validation failed: {e}"),
            ApplyError::ConcurrencyConflict { attempts } => write!(
                f,
                "pool version conflict after {attempts} attempts; retry the operation"
            ),
            ApplyError::Store(e) => write!(f, "store failure: {e}"),
        }
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplyError::Instantiate(e) => Some(e),
            ApplyError::Validation(e) => Some(e),
            ApplyError::Store(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<InstantiateError> for ApplyError {
    fn from(e: InstantiateError) -> Self {
        ApplyError::Instantiate(e)
    }
}

impl From<ValidationError> for ApplyError {
    fn from(e: ValidationError) -> Self {
        ApplyError::Validation(e)
    }
}
