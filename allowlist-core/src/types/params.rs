//! Parameters sent upstream on every refresh.

use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use crate::constants::{
    DEFAULT_ENDORSEMENTS, DEFAULT_GUARANTORS, DEFAULT_RETURN_LIMIT, SOFTWARE_FILTER,
    STALENESS_THRESHOLD_SECS,
};

/// Refresh parameters, resolved once when a cache is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshParameters {
    /// Minimum endorsements a domain needs
    pub endorsements: u32,
    /// Minimum guarantors a domain needs
    pub guarantors: u32,
    /// Maximum number of domains to return
    pub limit: u32,
    /// Software filter (`software_csv`)
    pub software: String,
    /// Age after which cached data is refreshed. Fixed; input is ignored.
    #[serde(
        serialize_with = "serialize_secs",
        skip_deserializing,
        default = "staleness_threshold"
    )]
    staleness: Duration,
}

fn staleness_threshold() -> Duration {
    Duration::from_secs(STALENESS_THRESHOLD_SECS)
}

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl Default for RefreshParameters {
    fn default() -> Self {
        Self {
            endorsements: DEFAULT_ENDORSEMENTS,
            guarantors: DEFAULT_GUARANTORS,
            limit: DEFAULT_RETURN_LIMIT,
            software: SOFTWARE_FILTER.into(),
            staleness: staleness_threshold(),
        }
    }
}

impl RefreshParameters {
    /// Creates parameters with the given trust thresholds and limit.
    pub fn new(endorsements: u32, guarantors: u32, limit: u32) -> Self {
        Self {
            endorsements,
            guarantors,
            limit,
            ..Default::default()
        }
    }

    /// Age after which cached data is refreshed.
    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    /// Staleness threshold in whole seconds.
    pub fn staleness_secs(&self) -> i64 {
        i64::try_from(self.staleness.as_secs()).unwrap_or(i64::MAX)
    }
}
