use crate::wire::HealthRes;

/// Simple health service used by the REST API.
///
/// This service provides a standardised way to check the health status of the clinic API.
pub struct HealthService;

impl HealthService {
    /// Report that the API is up.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Clinic API is alive".into(),
        }
    }
}
