//! Configuration module

use relay_client::TrackerClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the tracker service
    pub tracker_url: String,
}

impl Config {
    pub fn client(&self) -> TrackerClient {
        TrackerClient::new(&self.tracker_url)
    }
}
