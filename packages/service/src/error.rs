use pole_guard_elevation::ElevationError;
use pole_guard_policy_models::{MAX_NOTES_LEN, OverlapConflict};
use pole_guard_store::StoreError;
use pole_guard_zone_models::{LandOwnerId, PoleId, UserId, ValidationError, ZoneId};

/// Errors returned by [`crate::PolicyService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// An input value is out of range.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The pole position is not inside its zone's boundary.
    #[error("Pole coordinates must be within zone boundary")]
    PoleOutsideZone,

    /// The pole's restricted circle intersects another pole's in the zone.
    #[error("Pole radius overlaps with existing pole: {}", .0.pole_name)]
    Overlap(OverlapConflict),

    /// No zone with this id.
    #[error("Zone {0} not found")]
    ZoneNotFound(ZoneId),

    /// No pole with this id.
    #[error("Pole {0} not found")]
    PoleNotFound(PoleId),

    /// No land owner with this id.
    #[error("Land owner {0} not found")]
    LandOwnerNotFound(LandOwnerId),

    /// No user with this id.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// The zone still owns poles or users.
    #[error("Cannot delete zone with assigned resources")]
    ZoneInUse {
        /// Zone that was to be deleted.
        zone_id: ZoneId,
        /// Poles still assigned to it.
        poles: usize,
        /// Users still assigned to it.
        users: usize,
    },

    /// Another zone already uses this name.
    #[error("Zone name has already been taken: {name}")]
    ZoneNameTaken {
        /// The requested name.
        name: String,
    },

    /// Fewer than three boundary points survived normalization.
    #[error("Zone boundary needs at least 3 valid points, got {usable}")]
    InvalidBoundary {
        /// Number of usable points found.
        usable: usize,
    },

    /// Calculation notes are too long.
    #[error("Calculation notes must be at most {MAX_NOTES_LEN} characters, got {length}")]
    NotesTooLong {
        /// Character count of the rejected notes.
        length: usize,
    },

    /// An elevation could not be fetched, so no calculation was recorded.
    #[error(
        "Failed to fetch elevation data. Please check your API key and ensure Elevation API is enabled: {0}"
    )]
    ElevationUnavailable(#[source] ElevationError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
