//! Failure policy applied to missing assets, manifests and revisions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, Result};

/// How a recoverable failure should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Continue silently with a degraded result.
    Ignore,
    /// Emit a warning diagnostic and continue with a degraded result.
    #[default]
    Notice,
    /// Abort resolution with the error.
    Exception,
}

impl FailurePolicy {
    /// Accepted configuration spellings.
    pub const CHOICES: [&'static str; 3] = ["exception", "notice", "ignore"];

    /// Configuration spelling of this policy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Notice => "notice",
            Self::Exception => "exception",
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = AssetError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "ignore" => Ok(Self::Ignore),
            "notice" => Ok(Self::Notice),
            "exception" => Ok(Self::Exception),
            other => Err(AssetError::InvalidConfiguration(format!(
                "unexpected failure policy '{other}', allowed values: {}",
                Self::CHOICES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of failure that a [`FailurePolicy`] is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Resolved asset file is missing on disk.
    MissingAsset,
    /// No manifest could be located.
    MissingManifest,
    /// Manifest has no entry for the asset.
    MissingRevision,
}

impl FailureKind {
    /// Configuration key that selects the policy for this kind.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::MissingAsset => "missingAsset",
            Self::MissingManifest => "missingManifest",
            Self::MissingRevision => "missingRevision",
        }
    }
}

/// Effective handling for one failure, derived from the policy and the per-call `need` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Drop the failure.
    Suppress,
    /// Log the failure and continue.
    Notify,
    /// Return the failure to the caller.
    Raise,
}

impl FailureAction {
    /// Combine the configured policy with the `need` flag of the current call.
    ///
    /// A call that does not need the asset never fails, whatever the policy says.
    pub fn resolve(policy: FailurePolicy, need: bool) -> Self {
        if !need {
            return Self::Suppress;
        }

        match policy {
            FailurePolicy::Ignore => Self::Suppress,
            FailurePolicy::Notice => Self::Notify,
            FailurePolicy::Exception => Self::Raise,
        }
    }

    /// Apply the action to a failure, returning it only when it must be raised.
    pub fn apply(self, error: AssetError) -> Result<()> {
        match self {
            Self::Suppress => {
                tracing::trace!(error = %error, "suppressed asset failure");
                Ok(())
            }
            Self::Notify => {
                let kind = error.failure_kind().map(FailureKind::config_key);
                tracing::warn!(kind = kind.unwrap_or("unknown"), "{error}");
                Ok(())
            }
            Self::Raise => Err(error),
        }
    }
}
