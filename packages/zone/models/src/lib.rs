#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate, zone, and pole types for the pole policy engine.
//!
//! A [`Zone`] is an administrator-drawn polygon stored as a list of
//! [`BoundaryPoint`]s, which may arrive in several shapes depending on the
//! client that drew it. A [`Pole`] sits inside exactly one zone and carries
//! a restricted marketing radius in meters.
//!
//! Range checks live here so that every entry point of the geometry and
//! policy crates can assume its inputs are already valid.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Smallest restricted radius an administrator may assign, in meters.
pub const MIN_RESTRICTED_RADIUS_M: f64 = 50.0;

/// Largest restricted radius an administrator may assign, in meters.
pub const MAX_RESTRICTED_RADIUS_M: f64 = 5000.0;

/// Longest pole or zone name accepted.
pub const MAX_NAME_LEN: usize = 255;

/// Errors raised when a value falls outside its valid numeric range.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Latitude outside `[-90, 90]` (or not a finite number).
    #[error("Latitude {value} is outside [-90, 90]")]
    Latitude {
        /// The rejected value.
        value: f64,
    },

    /// Longitude outside `[-180, 180]` (or not a finite number).
    #[error("Longitude {value} is outside [-180, 180]")]
    Longitude {
        /// The rejected value.
        value: f64,
    },

    /// Restricted radius outside `[50, 5000]` meters.
    #[error("Restricted radius {value} m is outside [50, 5000]")]
    RestrictedRadius {
        /// The rejected value.
        value: f64,
    },

    /// Pole height that is not strictly positive.
    #[error("Pole height {value} m must be greater than zero")]
    PoleHeight {
        /// The rejected value.
        value: f64,
    },

    /// Empty or overlong name.
    #[error("Name must be 1-{MAX_NAME_LEN} characters, got {length}")]
    Name {
        /// Character count of the rejected name.
        length: usize,
    },

    /// A position patch that sets only one axis.
    #[error("Latitude and longitude must be updated together")]
    PartialPosition,
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Primary key of a [`Zone`].
    ZoneId
);
id_type!(
    /// Primary key of a [`Pole`].
    PoleId
);
id_type!(
    /// Primary key of a user (administrator or agent).
    UserId
);
id_type!(
    /// Primary key of a land owner record.
    LandOwnerId
);
id_type!(
    /// Primary key of a line-of-sight calculation record.
    CalculationId
);

/// A validated WGS84 position.
///
/// The fields are private so a `Coordinate` can only exist with
/// `latitude ∈ [-90, 90]` and `longitude ∈ [-180, 180]`. Deserialization
/// goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = ValidationError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Creates a coordinate after range-checking both axes.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Latitude`] or [`ValidationError::Longitude`]
    /// if either axis is out of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::Latitude { value: latitude });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::Longitude { value: longitude });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// A zone boundary vertex in whatever shape the drawing client produced.
///
/// The admin panel stores `{lat, lng}` objects, some imports use
/// `{latitude, longitude}`, and others send bare two-element arrays whose
/// axis order is not declared. Anything else is kept as raw JSON so that a
/// single bad vertex never fails deserialization of the whole zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundaryPoint {
    /// `{"lat": .., "lng": ..}`
    LatLng {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lng: f64,
    },
    /// `{"latitude": .., "longitude": ..}`
    LatitudeLongitude {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
    /// `[a, b]` with unknown axis order.
    Pair([f64; 2]),
    /// Anything else (string-encoded numbers, nulls, partial objects).
    Other(serde_json::Value),
}

impl From<Coordinate> for BoundaryPoint {
    fn from(value: Coordinate) -> Self {
        Self::LatLng {
            lat: value.latitude,
            lng: value.longitude,
        }
    }
}

/// A normalized zone boundary: an ordered ring of valid coordinates.
///
/// Vertex order defines the polygon edges and is never changed. The ring
/// is implicitly closed (the last vertex connects back to the first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneBoundary(Vec<Coordinate>);

impl ZoneBoundary {
    /// Minimum vertex count for a boundary to enclose any area.
    pub const MIN_VERTICES: usize = 3;

    /// Wraps an ordered vertex list.
    #[must_use]
    pub const fn new(points: Vec<Coordinate>) -> Self {
        Self(points)
    }

    /// The vertices in insertion order.
    #[must_use]
    pub fn points(&self) -> &[Coordinate] {
        &self.0
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the boundary has no vertices at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the boundary has enough vertices to form a polygon.
    #[must_use]
    pub fn is_polygon(&self) -> bool {
        self.0.len() >= Self::MIN_VERTICES
    }
}

/// Lifecycle status shared by zones and poles.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    /// In service.
    #[default]
    Active,
    /// Soft-disabled.
    Inactive,
}

impl Status {
    /// Returns the opposite status.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }
}

/// An administrator-defined polygonal area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Primary key.
    pub id: ZoneId,
    /// Unique display name.
    #[serde(rename = "zone_name")]
    pub name: String,
    /// Raw boundary vertices as stored.
    #[serde(rename = "zone_boundary", default)]
    pub boundary: Vec<BoundaryPoint>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the zone is in service.
    #[serde(default)]
    pub status: Status,
}

/// Input for creating a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewZone {
    /// Unique display name.
    #[serde(rename = "zone_name")]
    pub name: String,
    /// Raw boundary vertices.
    #[serde(rename = "zone_boundary")]
    pub boundary: Vec<BoundaryPoint>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Initial status (defaults to active).
    #[serde(default)]
    pub status: Option<Status>,
}

/// Partial update for a zone. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneUpdate {
    /// New display name.
    #[serde(rename = "zone_name", default)]
    pub name: Option<String>,
    /// Replacement boundary.
    #[serde(rename = "zone_boundary", default)]
    pub boundary: Option<Vec<BoundaryPoint>>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<Status>,
}

/// A physical pole with a restricted marketing radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pole {
    /// Primary key.
    pub id: PoleId,
    /// Display name, used in overlap and restriction messages.
    pub pole_name: String,
    /// Where the pole stands.
    #[serde(flatten)]
    pub position: Coordinate,
    /// Height above ground in meters.
    pub pole_height: f64,
    /// Marketing exclusion radius in meters.
    pub restricted_radius: f64,
    /// Whether the pole currently restricts anything.
    #[serde(default)]
    pub status: Status,
    /// Owning zone.
    pub zone_id: ZoneId,
    /// Associated land owner, if any.
    #[serde(default)]
    pub land_owner_id: Option<LandOwnerId>,
}

impl Pole {
    /// Whether the pole participates in live restriction checks.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Checks name, height, and radius ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.pole_name)?;
        validate_pole_height(self.pole_height)?;
        validate_restricted_radius(self.restricted_radius)
    }
}

/// Input for creating a pole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPole {
    /// Display name.
    pub pole_name: String,
    /// Where the pole stands.
    #[serde(flatten)]
    pub position: Coordinate,
    /// Height above ground in meters.
    pub pole_height: f64,
    /// Marketing exclusion radius in meters.
    pub restricted_radius: f64,
    /// Owning zone.
    pub zone_id: ZoneId,
    /// Associated land owner, if any.
    #[serde(default)]
    pub land_owner_id: Option<LandOwnerId>,
    /// Initial status (defaults to active).
    #[serde(default)]
    pub status: Option<Status>,
}

impl NewPole {
    /// Materializes the input as a pole record with the given id.
    #[must_use]
    pub fn into_pole(self, id: PoleId) -> Pole {
        Pole {
            id,
            pole_name: self.pole_name,
            position: self.position,
            pole_height: self.pole_height,
            restricted_radius: self.restricted_radius,
            status: self.status.unwrap_or_default(),
            zone_id: self.zone_id,
            land_owner_id: self.land_owner_id,
        }
    }
}

/// Partial update for a pole. `None` fields are left unchanged.
///
/// A pole never moves between zones through an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoleUpdate {
    /// New display name.
    #[serde(default)]
    pub pole_name: Option<String>,
    /// New latitude. Must be set together with `longitude`.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// New longitude. Must be set together with `latitude`.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// New height.
    #[serde(default)]
    pub pole_height: Option<f64>,
    /// New restricted radius.
    #[serde(default)]
    pub restricted_radius: Option<f64>,
    /// New land owner.
    #[serde(default)]
    pub land_owner_id: Option<LandOwnerId>,
    /// New status.
    #[serde(default)]
    pub status: Option<Status>,
}

impl PoleUpdate {
    /// The new position, if the patch moves the pole.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PartialPosition`] if only one axis is set,
    /// or a range error from [`Coordinate::new`].
    pub fn position(&self) -> Result<Option<Coordinate>, ValidationError> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Coordinate::new(latitude, longitude).map(Some),
            (None, None) => Ok(None),
            _ => Err(ValidationError::PartialPosition),
        }
    }

    /// Applies the patch on top of `pole`, returning the updated record.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the position patch is invalid.
    pub fn apply(self, pole: &Pole) -> Result<Pole, ValidationError> {
        let position = self.position()?.unwrap_or(pole.position);
        Ok(Pole {
            id: pole.id,
            pole_name: self.pole_name.unwrap_or_else(|| pole.pole_name.clone()),
            position,
            pole_height: self.pole_height.unwrap_or(pole.pole_height),
            restricted_radius: self.restricted_radius.unwrap_or(pole.restricted_radius),
            status: self.status.unwrap_or(pole.status),
            zone_id: pole.zone_id,
            land_owner_id: self.land_owner_id.or(pole.land_owner_id),
        })
    }
}

/// Role of a user account.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Sees every zone; never assigned to one.
    SuperAdmin,
    /// Manages a single zone.
    Admin,
    /// Field agent checked against a single zone.
    Agent,
}

/// A user account, reduced to what zone scoping needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Primary key.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Account role.
    pub role: Role,
    /// Assigned zone. `None` for super admins and unassigned agents.
    #[serde(default)]
    pub zone_id: Option<ZoneId>,
    /// Whether the account is enabled.
    #[serde(default)]
    pub status: Status,
}

/// The owner of the land a pole stands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandOwner {
    /// Primary key.
    pub id: LandOwnerId,
    /// Owner's name.
    pub owner_name: String,
    /// Contact number.
    pub mobile_number: String,
    /// Postal address.
    pub address: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Zone the owner is registered in.
    pub zone_id: ZoneId,
}

/// Checks that a restricted radius lies within `[50, 5000]` meters.
///
/// # Errors
///
/// Returns [`ValidationError::RestrictedRadius`] otherwise.
pub fn validate_restricted_radius(value: f64) -> Result<(), ValidationError> {
    if (MIN_RESTRICTED_RADIUS_M..=MAX_RESTRICTED_RADIUS_M).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::RestrictedRadius { value })
    }
}

/// Checks that a pole height is finite and strictly positive.
///
/// # Errors
///
/// Returns [`ValidationError::PoleHeight`] otherwise.
pub fn validate_pole_height(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::PoleHeight { value })
    }
}

/// Checks that a name is non-blank and at most [`MAX_NAME_LEN`] characters.
///
/// # Errors
///
/// Returns [`ValidationError::Name`] otherwise.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if name.trim().is_empty() || length > MAX_NAME_LEN {
        Err(ValidationError::Name { length })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pole() -> Pole {
        Pole {
            id: PoleId(1),
            pole_name: "P-1".to_string(),
            position: Coordinate::new(31.52, 74.35).unwrap(),
            pole_height: 20.0,
            restricted_radius: 100.0,
            status: Status::Active,
            zone_id: ZoneId(1),
            land_owner_id: None,
        }
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert_eq!(
            Coordinate::new(90.5, 0.0),
            Err(ValidationError::Latitude { value: 90.5 })
        );
        assert_eq!(
            Coordinate::new(0.0, -180.1),
            Err(ValidationError::Longitude { value: -180.1 })
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn coordinate_deserialization_is_range_checked() {
        let ok: Coordinate =
            serde_json::from_value(serde_json::json!({"latitude": 10.0, "longitude": 20.0}))
                .unwrap();
        assert!((ok.latitude() - 10.0).abs() < f64::EPSILON);

        let bad = serde_json::from_value::<Coordinate>(
            serde_json::json!({"latitude": 100.0, "longitude": 20.0}),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn boundary_points_accept_every_known_shape() {
        let points: Vec<BoundaryPoint> = serde_json::from_value(serde_json::json!([
            {"lat": 1.0, "lng": 2.0},
            {"latitude": 3.0, "longitude": 4.0},
            [5.0, 6.0],
            {"lat": "7.0", "lng": "8.0"},
            null
        ]))
        .unwrap();

        assert_eq!(points[0], BoundaryPoint::LatLng { lat: 1.0, lng: 2.0 });
        assert_eq!(
            points[1],
            BoundaryPoint::LatitudeLongitude {
                latitude: 3.0,
                longitude: 4.0
            }
        );
        assert_eq!(points[2], BoundaryPoint::Pair([5.0, 6.0]));
        assert!(matches!(points[3], BoundaryPoint::Other(_)));
        assert_eq!(points[4], BoundaryPoint::Other(serde_json::Value::Null));
    }

    #[test]
    fn pole_round_trips_flat_json_fields() {
        let value = serde_json::to_value(pole()).unwrap();
        assert_eq!(value["latitude"], 31.52);
        assert_eq!(value["longitude"], 74.35);
        assert_eq!(value["restricted_radius"], 100.0);
        assert_eq!(value["status"], "active");

        let back: Pole = serde_json::from_value(value).unwrap();
        assert_eq!(back, pole());
    }

    #[test]
    fn restricted_radius_bounds_are_inclusive() {
        assert!(validate_restricted_radius(50.0).is_ok());
        assert!(validate_restricted_radius(5000.0).is_ok());
        assert!(validate_restricted_radius(49.99).is_err());
        assert!(validate_restricted_radius(5000.01).is_err());
        assert!(validate_restricted_radius(f64::NAN).is_err());
    }

    #[test]
    fn pole_validation_checks_height_and_name() {
        assert!(pole().validate().is_ok());

        let mut flat = pole();
        flat.pole_height = 0.0;
        assert_eq!(
            flat.validate(),
            Err(ValidationError::PoleHeight { value: 0.0 })
        );

        let mut unnamed = pole();
        unnamed.pole_name = "   ".to_string();
        assert_eq!(
            unnamed.validate(),
            Err(ValidationError::Name { length: 3 })
        );
    }

    #[test]
    fn update_keeps_zone_and_unset_fields() {
        let updated = PoleUpdate {
            restricted_radius: Some(250.0),
            status: Some(Status::Inactive),
            ..PoleUpdate::default()
        }
        .apply(&pole())
        .unwrap();

        assert_eq!(updated.zone_id, ZoneId(1));
        assert_eq!(updated.pole_name, "P-1");
        assert!((updated.restricted_radius - 250.0).abs() < f64::EPSILON);
        assert_eq!(updated.status, Status::Inactive);
    }

    #[test]
    fn update_moves_pole_from_flat_fields() {
        let update: PoleUpdate =
            serde_json::from_value(serde_json::json!({"latitude": 31.505, "longitude": 74.306}))
                .unwrap();
        assert_eq!(update.position(), Ok(Some(Coordinate::new(31.505, 74.306).unwrap())));

        let moved = update.apply(&pole()).unwrap();
        assert!((moved.position.latitude() - 31.505).abs() < f64::EPSILON);
        assert!((moved.position.longitude() - 74.306).abs() < f64::EPSILON);
    }

    #[test]
    fn update_rejects_half_a_position() {
        let update = PoleUpdate {
            latitude: Some(31.505),
            ..PoleUpdate::default()
        };
        assert_eq!(update.position(), Err(ValidationError::PartialPosition));
        assert_eq!(update.apply(&pole()), Err(ValidationError::PartialPosition));

        let out_of_range = PoleUpdate {
            latitude: Some(95.0),
            longitude: Some(74.3),
            ..PoleUpdate::default()
        };
        assert_eq!(
            out_of_range.position(),
            Err(ValidationError::Latitude { value: 95.0 })
        );
    }

    #[test]
    fn status_toggles_and_parses() {
        assert_eq!(Status::Active.toggled(), Status::Inactive);
        assert_eq!("inactive".parse::<Status>().unwrap(), Status::Inactive);
        assert_eq!(Status::Active.to_string(), "active");
    }
}
