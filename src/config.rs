use std::net::{IpAddr, SocketAddr};
use std::thread;
use std::time::Duration;

use clap::Parser;

use crate::generation::{DEFAULT_API_BASE, DEFAULT_MODEL};

/// Server settings. Every flag can also come from the environment.
#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Emoji story generator service", long_about = None)]
pub struct ServerConfig {
    #[clap(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[clap(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    #[clap(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[clap(long, env = "GROQ_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[clap(long, env = "GROQ_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Upper bound on one model call, in seconds
    #[clap(long, default_value = "120")]
    pub request_timeout_secs: u64,

    /// Tokio worker threads (defaults to the number of logical cores)
    #[clap(long)]
    pub workers: Option<usize>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn worker_threads(&self) -> usize {
        self.workers
        .filter(|&n| n > 0)
        .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}
