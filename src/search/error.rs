use std::time::Duration;
use thiserror::Error;

use crate::api::{Deadline, ProviderError};

#[derive(Error, Debug)]
pub enum SearchError {
    /// Every specificity level was geocoded without a match
    #[error("no location found for '{query}'")]
    NoLocationFound { query: String },

    /// Every provider call that was attempted failed
    #[error("data source unavailable after {attempts} failed request(s): {last}")]
    SourceUnavailable {
        attempts: usize,
        #[source]
        last: ProviderError,
    },

    #[error("search timed out after {0:?}")]
    Timeout(Duration),
}

impl SearchError {
    pub(crate) fn timed_out(deadline: &Deadline) -> Self {
        SearchError::Timeout(deadline.budget().unwrap_or_default())
    }
}

/// `Timeout` once `deadline` has passed.
pub(crate) fn ensure_time_left(deadline: &Deadline) -> Result<(), SearchError> {
    if deadline.is_expired() {
        Err(SearchError::timed_out(deadline))
    } else {
        Ok(())
    }
}
