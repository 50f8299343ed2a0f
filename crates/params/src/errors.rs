use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    /// No version is in force at the height. Never fall back to another version here: scripts
    /// rebuilt from the wrong version will not match the staking output.
    #[error("no parameter version covers height {height}")]
    NotFound { height: u64 },

    #[error("versions {first} and {second} both activate at height {height}")]
    OverlappingVersions { first: u32, second: u32, height: u64 },

    #[error("duplicate parameter version {0}")]
    DuplicateVersion(u32),

    #[error("invalid parameter version {version}: {reason}")]
    Invalid { version: u32, reason: String },
}
