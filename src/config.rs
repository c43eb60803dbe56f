use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GTFS_URL: &str = "http://gtfs.translink.ca/static/latest";
pub const DEFAULT_RTTI_URL: &str = "https://api.translink.ca/rttiapi/v1";

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Directory holding the extracted GTFS csv files
    #[arg(long, global = true, default_value = "gtfs")]
    pub gtfs_dir: PathBuf,

    /// Root of the generated datasets
    #[arg(long, global = true, default_value = "datasets")]
    pub datasets_dir: PathBuf,

    /// Location of the static GTFS zip
    #[arg(long, global = true, default_value = DEFAULT_GTFS_URL)]
    pub gtfs_url: String,

    /// Base URL of the real-time transit information API
    #[arg(long, global = true, default_value = DEFAULT_RTTI_URL)]
    pub rtti_url: String,

    /// API key for the real-time transit information API
    #[arg(long, global = true, env = "TL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Attempts per HTTP request before giving up
    #[arg(long, global = true, default_value_t = 5)]
    pub max_retries: u32,

    /// Timeout of a single HTTP request, in seconds
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gtfs_dir: PathBuf::from("gtfs"),
            datasets_dir: PathBuf::from("datasets"),
            gtfs_url: DEFAULT_GTFS_URL.to_owned(),
            rtti_url: DEFAULT_RTTI_URL.to_owned(),
            api_key: None,
            max_retries: 5,
            timeout_secs: 60,
        }
    }
}
