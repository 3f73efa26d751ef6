use std::fmt;

use crate::RepoError;

/// Lifecycle of a repository.
///
/// `Idle → Initializing → Ready → Refreshing → Ready`, with `Destroyed` as
/// the terminal state. Scans never overlap: starting one while another runs
/// fails with [`RepoError::Busy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Created, nothing scanned yet.
    #[default]
    Idle,
    /// First scan running.
    Initializing,
    /// Index available.
    Ready,
    /// Re-scan running; the previous index is still served.
    Refreshing,
    /// Shut down for good.
    Destroyed,
}

impl Lifecycle {
    /// Whether a scan is running.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Initializing | Self::Refreshing)
    }

    /// State entered when a scan starts.
    ///
    /// A refresh needs a completed first scan; an init on a ready
    /// repository behaves like a refresh.
    pub(crate) const fn begin_scan(self, refresh: bool) -> Result<Self, RepoError> {
        match self {
            Self::Idle if refresh => Err(RepoError::NotReady(self)),
            Self::Idle => Ok(Self::Initializing),
            Self::Ready => Ok(Self::Refreshing),
            Self::Initializing | Self::Refreshing => Err(RepoError::Busy(self)),
            Self::Destroyed => Err(RepoError::Destroyed),
        }
    }

    /// State entered when a scan ends. A failed first scan goes back to idle.
    pub(crate) const fn finish_scan(self, ok: bool) -> Self {
        match self {
            Self::Initializing if !ok => Self::Idle,
            Self::Initializing | Self::Refreshing | Self::Ready => Self::Ready,
            Self::Idle | Self::Destroyed => self,
        }
    }

    /// Check that edits are allowed.
    pub(crate) const fn ensure_ready(self) -> Result<(), RepoError> {
        match self {
            Self::Ready => Ok(()),
            Self::Initializing | Self::Refreshing => Err(RepoError::Busy(self)),
            Self::Idle => Err(RepoError::NotReady(self)),
            Self::Destroyed => Err(RepoError::Destroyed),
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Refreshing => "refreshing",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_follow_the_state_machine() {
        assert_eq!(Lifecycle::Idle.begin_scan(false).ok(), Some(Lifecycle::Initializing));
        assert!(matches!(Lifecycle::Idle.begin_scan(true), Err(RepoError::NotReady(_))));
        assert_eq!(Lifecycle::Ready.begin_scan(true).ok(), Some(Lifecycle::Refreshing));
        assert!(matches!(
            Lifecycle::Initializing.begin_scan(false),
            Err(RepoError::Busy(Lifecycle::Initializing))
        ));
        assert!(matches!(Lifecycle::Destroyed.begin_scan(false), Err(RepoError::Destroyed)));
    }

    #[test]
    fn failed_first_scan_returns_to_idle() {
        assert_eq!(Lifecycle::Initializing.finish_scan(false), Lifecycle::Idle);
        assert_eq!(Lifecycle::Initializing.finish_scan(true), Lifecycle::Ready);
        assert_eq!(Lifecycle::Refreshing.finish_scan(false), Lifecycle::Ready);
        assert_eq!(Lifecycle::Destroyed.finish_scan(true), Lifecycle::Destroyed);
    }

    #[test]
    fn edits_need_a_ready_index() {
        assert!(Lifecycle::Ready.ensure_ready().is_ok());
        assert!(matches!(Lifecycle::Refreshing.ensure_ready(), Err(RepoError::Busy(_))));
        assert!(matches!(Lifecycle::Idle.ensure_ready(), Err(RepoError::NotReady(_))));
    }
}
