use std::collections::HashSet;

use crate::{errors::ParamsError, version::ProtocolParamsVersion};

/// A validated history of parameter versions, ordered by activation height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamsVersions {
    versions: Vec<ProtocolParamsVersion>,
}

/// The version in force at some height, together with the one that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentVersion<'a> {
    pub current: &'a ProtocolParamsVersion,
    pub next: Option<&'a ProtocolParamsVersion>,

    /// Whether `next` activates within the current version's confirmation depth.
    pub is_approaching_next: bool,
}

impl ParamsVersions {
    /// Sorts the versions by activation height and checks that their ranges do not overlap.
    /// Version numbers only need to be unique; ranges are ordered by height alone.
    pub fn new(mut versions: Vec<ProtocolParamsVersion>) -> Result<Self, ParamsError> {
        versions.sort_by_key(|v| v.activation_height);

        let mut seen = HashSet::with_capacity(versions.len());
        for v in &versions {
            if !seen.insert(v.version) {
                return Err(ParamsError::DuplicateVersion(v.version));
            }
        }

        for pair in versions.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.activation_height == next.activation_height {
                return Err(ParamsError::OverlappingVersions {
                    first: prev.version,
                    second: next.version,
                    height: next.activation_height,
                });
            }
        }

        Ok(Self { versions })
    }

    pub fn versions(&self) -> &[ProtocolParamsVersion] {
        &self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Activation height of the oldest version, if any.
    pub fn first_activation_height(&self) -> Option<u64> {
        self.versions.first().map(|v| v.activation_height)
    }

    /// Returns the version whose range contains `height`.
    pub fn resolve(&self, height: u64) -> Result<&ProtocolParamsVersion, ParamsError> {
        self.position(height)
            .map(|idx| &self.versions[idx])
            .ok_or(ParamsError::NotFound { height })
    }

    /// Returns the version in force at `height` along with its successor.
    pub fn current_with_next(&self, height: u64) -> Result<CurrentVersion<'_>, ParamsError> {
        let idx = self.position(height).ok_or(ParamsError::NotFound { height })?;
        let current = &self.versions[idx];
        let next = self.versions.get(idx + 1);
        let is_approaching_next = next.is_some_and(|n| {
            n.activation_height.saturating_sub(current.confirmation_depth) <= height
        });

        Ok(CurrentVersion {
            current,
            next,
            is_approaching_next,
        })
    }

    fn position(&self, height: u64) -> Option<usize> {
        // Number of versions activated at or below `height`; the last of them is in force.
        let activated = self
            .versions
            .partition_point(|v| v.activation_height <= height);
        activated.checked_sub(1)
    }
}

/// Selects the parameter version that was in force at `start_height`.
pub fn resolve(
    start_height: u64,
    versions: &[ProtocolParamsVersion],
) -> Result<ProtocolParamsVersion, ParamsError> {
    let history = ParamsVersions::new(versions.to_vec())?;
    history.resolve(start_height).cloned()
}
