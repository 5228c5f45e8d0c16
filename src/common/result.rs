use crate::common::error::SyncError;

/// Result type used across the crate.
///
/// # Examples
///
/// ```
/// use sync_repos::common::result::SyncReposResult;
/// use sync_repos::common::error::SyncError;
///
/// fn example_function() -> SyncReposResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> SyncReposResult<()> {
///     Err(SyncError::not_found("git-https:example.org:0:alice"))
/// }
///
/// assert!(example_function().is_ok());
/// assert!(example_with_error().is_err());
/// ```
pub type SyncReposResult<T> = Result<T, SyncError>;

/// Conversion helpers from `Option` into [`SyncReposResult`].
pub trait OptionExt<T> {
    /// Turn `None` into a [`SyncError::BadRelayInvocation`] for `variable`.
    fn ok_or_bad_invocation(self, variable: impl Into<String>) -> SyncReposResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_bad_invocation(self, variable: impl Into<String>) -> SyncReposResult<T> {
        self.ok_or_else(|| SyncError::bad_relay_invocation(variable))
    }
}
