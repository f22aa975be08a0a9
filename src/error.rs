//! Error conditions reported by `Dict` operations.

use thiserror::Error;

/// Failure modes of fallible `Dict` operations. Each condition is kept
/// distinct so callers can react to it precisely.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum DictError {
    /// `add` found the key already present in one of the tables.
    #[error("key already exists")]
    KeyExists,
    /// `delete`/`unlink` did not find the key.
    #[error("key not found")]
    NotFound,
    /// `expand`/`resize` was called while a rehash is still pending.
    #[error("a rehash is already in progress")]
    AlreadyRehashing,
    /// `expand` was asked for fewer buckets than there are live entries.
    #[error("requested size {requested} is smaller than the {used} live entries")]
    SizeTooSmall { requested: usize, used: usize },
    /// `resize` was called while the resize policy is disabled.
    #[error("resizing is disabled")]
    ResizeDisabled,
    /// The bucket array could not be allocated (or its size overflows).
    #[error("failed to allocate a table of {buckets} buckets")]
    AllocationFailed { buckets: usize },
}

#[cfg(test)]
mod tests {
    use super::DictError;

    #[test]
    fn messages_name_the_condition() {
        assert_eq!(DictError::KeyExists.to_string(), "key already exists");
        assert_eq!(
            DictError::SizeTooSmall {
                requested: 2,
                used: 9
            }
            .to_string(),
            "requested size 2 is smaller than the 9 live entries"
        );
        assert_eq!(
            DictError::AllocationFailed { buckets: 8 }.to_string(),
            "failed to allocate a table of 8 buckets"
        );
    }
}
