use std::sync::Arc;
use std::time::Duration;

use crate::search::HospitalFinder;

pub struct AppState {
    pub finder: Arc<HospitalFinder>,
    /// Upper bound on one request, including waits on the rate limiter
    pub request_timeout: Duration,
}
