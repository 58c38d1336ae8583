use crate::error::LikeError;

/// What to do when a single log source fails
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop everything and report the error
    #[default]
    Abort,
    /// Record the error inline and keep going with the other sources
    Continue,
}

impl FailurePolicy {
    pub fn from_ignore_errors(ignore_errors: bool) -> Self {
        if ignore_errors {
            Self::Continue
        } else {
            Self::Abort
        }
    }

    /// Resolve a source failure into the marker line to write in its place.
    ///
    /// Output errors are returned under either policy.
    pub fn resolve(&self, err: LikeError) -> Result<Vec<u8>, LikeError> {
        if err.is_destination() {
            return Err(err);
        }

        match self {
            Self::Abort => Err(err),
            Self::Continue => Ok(format!("error: {}\n", err).into_bytes()),
        }
    }
}
