//! Service configuration from the command line and environment.

use std::time::Duration;

use clap::Parser;
use ee_client::{HttpConfig, ProjectInfo, ProjectSource};

/// Backend project used when `GEE_PROJECT` is not set.
pub const DEFAULT_PROJECT_ID: &str = "ee-silasnascimento";

/// NDVI / climate statistics server.
#[derive(Parser, Debug, Clone)]
#[command(name = "ndvi-api")]
#[command(about = "Multi-period NDVI and climate statistics over a remote processing backend")]
pub struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:5000", env = "NDVI_LISTEN_ADDR")]
    pub listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Number of worker threads
    #[arg(long, env = "NDVI_WORKER_THREADS")]
    pub worker_threads: Option<usize>,

    /// Backend API root
    #[arg(
        long,
        default_value = "https://earthengine.googleapis.com",
        env = "EE_API_URL"
    )]
    pub backend_url: String,

    /// Backend project identifier
    #[arg(long, env = "GEE_PROJECT")]
    pub project: Option<String>,

    /// Bearer token for the backend
    #[arg(long, env = "EE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Per-call backend timeout in seconds (unset waits indefinitely)
    #[arg(long, env = "EE_TIMEOUT_SECS")]
    pub backend_timeout_secs: Option<u64>,

    /// Skip connecting to the backend at startup
    #[arg(long, env = "NDVI_LAZY_INIT")]
    pub lazy_init: bool,
}

impl Args {
    /// Project id and whether it came from the environment.
    pub fn project(&self) -> (String, ProjectSource) {
        match self.project {
            Some(ref id) if !id.trim().is_empty() => {
                (id.clone(), ProjectSource::EnvironmentVariable)
            }
            _ => (DEFAULT_PROJECT_ID.to_string(), ProjectSource::Default),
        }
    }

    pub fn project_info(&self) -> ProjectInfo {
        let (id, source) = self.project();
        ProjectInfo::initialized(id, source)
    }

    pub fn http_config(&self) -> HttpConfig {
        let (project_id, project_source) = self.project();
        HttpConfig {
            base_url: self.backend_url.clone(),
            project_id,
            project_source,
            access_token: self.access_token.clone(),
            request_timeout: self.backend_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_project_is_reported_as_environment() {
        let args = Args::try_parse_from(["ndvi-api", "--project", "my-project"]).unwrap();
        let info = args.project_info();
        assert_eq!(info.project_id, "my-project");
        assert_eq!(info.source, ProjectSource::EnvironmentVariable);
    }

    #[test]
    fn test_blank_project_falls_back_to_default() {
        let args = Args::try_parse_from(["ndvi-api", "--project", " "]).unwrap();
        assert_eq!(args.project().0, DEFAULT_PROJECT_ID);
        assert_eq!(args.project().1, ProjectSource::Default);
    }

    #[test]
    fn test_http_config_timeout() {
        let args =
            Args::try_parse_from(["ndvi-api", "--backend-timeout-secs", "45"]).unwrap();
        assert_eq!(
            args.http_config().request_timeout,
            Some(Duration::from_secs(45))
        );
    }
}
