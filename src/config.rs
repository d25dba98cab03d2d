// Configuration module: everything the process reads from the
// environment, captured once at startup and passed around by reference.

/// Process configuration resolved from the environment.
///
/// `username`/`password` are optional pre-supplied credentials; each one
/// that is present suppresses the matching interactive prompt during
/// re-authentication.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Build a Config from `BEAGLE_ENDPOINT`, `BEAGLE_USER` and
    /// `BEAGLE_PW`, falling back to a local development endpoint.
    pub fn from_env() -> Self {
        Config {
            endpoint: std::env::var("BEAGLE_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8000".into()),
            username: std::env::var("BEAGLE_USER").ok(),
            password: std::env::var("BEAGLE_PW").ok(),
        }
    }
}

/// Relative paths of the backend endpoints. Read-only catalog; every
/// dispatcher call joins one of these (plus an optional identifier)
/// onto the configured base URL.
pub mod endpoints {
    pub const AUTH: &str = "api-token-auth/";
    pub const VERIFY: &str = "api-token-verify/";
    pub const REFRESH: &str = "api-token-refresh/";

    pub const STORAGE: &str = "v0/fs/storage/";
    pub const FILE_TYPES: &str = "v0/fs/file-types/";
    pub const FILES: &str = "v0/fs/files/";
    pub const FILE_GROUPS: &str = "v0/fs/file-groups/";

    pub const PIPELINES: &str = "v0/run/pipelines/";
    pub const RUNS: &str = "v0/run/api/";
    pub const REQUEST_OPERATOR: &str = "v0/run/operator/request/";
    pub const TEMPO_MPGEN: &str = "v0/run/operator/tempo-mpgen/";

    pub const ETL_JOBS: &str = "v0/etl/jobs/";
    pub const IMPORT_REQUESTS: &str = "v0/etl/import-requests/";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_when_unset() {
        // Other tests never set BEAGLE_ENDPOINT, so from_env falls back.
        std::env::remove_var("BEAGLE_ENDPOINT");
        let config = Config::from_env();
        assert_eq!(config.endpoint, "http://localhost:8000");
    }
}
