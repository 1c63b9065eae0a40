/// Orbit radius expressed as a multiple of the Earth model's visual radius.
pub const ORBIT_RADIUS_FACTOR: f32 = 1.7;

/// Remote coordinate store. A POST registers the source, a GET returns the
/// latest `{ "latitude", "longitude" }` pair.
pub const POSITION_SERVICE_URL: &str =
    "https://qs80ms8u7c.execute-api.us-east-2.amazonaws.com/prod/iss-location";

/// Environment variable overriding [`POSITION_SERVICE_URL`].
pub const POSITION_SERVICE_URL_ENV: &str = "SPACECRAFT_AR_POSITION_URL";

/// Seconds between live position refreshes for a placed ISS composite.
pub const ISS_REFRESH_SECS: f64 = 10.0;

/// HTTP timeout for each leg of the position round trip.
pub const POSITION_REQUEST_TIMEOUT_SECS: u64 = 10;
