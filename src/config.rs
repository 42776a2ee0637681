use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::region::MAX_REGION_CHUNKS;
use crate::session::ExpiryPolicy;
use crate::timer::Ticks;
use crate::transfer::{TransferOptions, DEFAULT_INTERVAL};

const MAX_TICK_MILLIS: u64 = 60_000;
const MAX_TICKS_BETWEEN_CHUNKS: Ticks = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the console listens on
    pub bind: String,
    pub tick_millis: u64,
    pub ticks_between_chunks: Ticks,
    pub retries: u32,
    /// Refuse transfers bigger than this many chunks. `None` leaves only
    /// the hard ceiling of [`MAX_REGION_CHUNKS`].
    pub max_chunks: Option<u64>,
    pub forget_selection_on_disconnect: bool,
    pub worlds: Vec<String>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:25575".into(),
            tick_millis: 50,
            ticks_between_chunks: DEFAULT_INTERVAL,
            retries: 0,
            max_chunks: Some(65_536),
            forget_selection_on_disconnect: false,
            worlds: vec!["world".into(), "world_nether".into(), "world_the_end".into()],
        }
    }
}
impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TICK_MILLIS).contains(&self.tick_millis) {
            return Err(ConfigError::Invalid("tick_millis must be between 1 and 60000"));
        }
        if !(1..=MAX_TICKS_BETWEEN_CHUNKS).contains(&self.ticks_between_chunks) {
            return Err(ConfigError::Invalid("ticks_between_chunks must be between 1 and 1000000"));
        }
        if self.max_chunks.map_or(false, |max| max > MAX_REGION_CHUNKS) {
            return Err(ConfigError::Invalid("max_chunks is above the 16777216 chunk ceiling"));
        }
        if self.worlds.is_empty() {
            return Err(ConfigError::Invalid("at least one world is needed"));
        }
        for (i, name) in self.worlds.iter().enumerate() {
            if self.worlds[..i].iter().any(|other| other.eq_ignore_ascii_case(name)) {
                return Err(ConfigError::Invalid("world names must be unique"));
            }
        }
        Ok(())
    }
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            interval: self.ticks_between_chunks,
            retries: self.retries,
        }
    }
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        if self.forget_selection_on_disconnect {
            ExpiryPolicy::ClearOnDisconnect
        } else {
            ExpiryPolicy::KeepForSession
        }
    }
}
