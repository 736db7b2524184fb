#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geodesy primitives for zone and pole checks.
//!
//! Distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_M`]. Containment is an even-odd ray cast in raw
//! latitude/longitude space, which is accurate enough for city-sized zones
//! and matches what zone administrators see on the map.
//!
//! Zone boundaries are stored in whatever shape the drawing client sent.
//! [`normalize_boundary`] is the single place that turns those shapes into
//! a [`ZoneBoundary`]; the geometry functions only ever see the normalized
//! form.

use geo::Geometry;
use geojson::GeoJson;
use pole_guard_zone_models::{BoundaryPoint, Coordinate, ZoneBoundary};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Errors from parsing a `GeoJSON` boundary.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryParseError {
    /// The input is not valid `GeoJSON`.
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// The geometry is not a single polygon.
    #[error("Expected a Polygon geometry, got {kind}")]
    UnsupportedGeometry {
        /// Name of the geometry type that was found.
        kind: String,
    },

    /// A ring vertex lies outside the valid coordinate range.
    #[error("Invalid vertex: {0}")]
    Vertex(#[from] pole_guard_zone_models::ValidationError),
}

/// Great-circle distance between two coordinates in meters.
///
/// Symmetric in its arguments. Returns exactly `0.0` for identical inputs.
#[must_use]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lng = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0)
        .sin()
        .mul_add((d_lat / 2.0).sin(), lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2))
        .clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Even-odd ray-cast containment test.
///
/// Casts a ray from `point` towards increasing longitude and toggles on each
/// edge `(i, i - 1)` whose latitude span straddles the point. Boundaries with
/// fewer than three vertices never contain anything. Points exactly on an
/// edge may land on either side.
#[must_use]
pub fn point_in_polygon(point: Coordinate, boundary: &ZoneBoundary) -> bool {
    if !boundary.is_polygon() {
        return false;
    }

    let lat = point.latitude();
    let lng = point.longitude();
    let vertices = boundary.points();

    let mut inside = false;
    let mut j = vertices.len() - 1;

    for (i, vi) in vertices.iter().enumerate() {
        let vj = vertices[j];
        let (xi, yi) = (vi.longitude(), vi.latitude());
        let (xj, yj) = (vj.longitude(), vj.latitude());

        if (yi > lat) != (yj > lat) && lng < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }

        j = i;
    }

    inside
}

/// Normalizes raw boundary vertices and runs [`point_in_polygon`].
#[must_use]
pub fn point_in_zone(point: Coordinate, raw: &[BoundaryPoint]) -> bool {
    point_in_polygon(point, &normalize_boundary(raw))
}

/// Converts stored boundary vertices into a canonical [`ZoneBoundary`].
///
/// Vertex order is preserved. Vertices that cannot be read as a valid
/// coordinate are dropped. Bare `[a, b]` pairs are read as
/// `[latitude, longitude]` unless `a` is outside the latitude range, in
/// which case they are read as `[longitude, latitude]`.
#[must_use]
pub fn normalize_boundary(raw: &[BoundaryPoint]) -> ZoneBoundary {
    let points: Vec<Coordinate> = raw.iter().filter_map(normalize_point).collect();

    if points.len() < raw.len() {
        log::debug!(
            "Dropped {} of {} boundary vertices during normalization",
            raw.len() - points.len(),
            raw.len()
        );
    }

    ZoneBoundary::new(points)
}

/// Normalizes a single vertex, or returns `None` if it is unusable.
#[must_use]
pub fn normalize_point(point: &BoundaryPoint) -> Option<Coordinate> {
    match point {
        BoundaryPoint::LatLng { lat, lng } => Coordinate::new(*lat, *lng).ok(),
        BoundaryPoint::LatitudeLongitude {
            latitude,
            longitude,
        } => Coordinate::new(*latitude, *longitude).ok(),
        BoundaryPoint::Pair([a, b]) => pair_to_coordinate(*a, *b),
        BoundaryPoint::Other(value) => value_to_coordinate(value),
    }
}

fn pair_to_coordinate(a: f64, b: f64) -> Option<Coordinate> {
    if (-90.0..=90.0).contains(&a) {
        Coordinate::new(a, b).ok()
    } else {
        Coordinate::new(b, a).ok()
    }
}

fn value_to_coordinate(value: &serde_json::Value) -> Option<Coordinate> {
    match value {
        serde_json::Value::Object(map) => {
            let lat = map.get("lat").or_else(|| map.get("latitude"))?;
            let lng = map
                .get("lng")
                .or_else(|| map.get("lon"))
                .or_else(|| map.get("longitude"))?;
            Coordinate::new(json_number(lat)?, json_number(lng)?).ok()
        }
        serde_json::Value::Array(items) if items.len() == 2 => {
            pair_to_coordinate(json_number(&items[0])?, json_number(&items[1])?)
        }
        _ => None,
    }
}

fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses a `GeoJSON` `Polygon` (bare geometry or wrapped in a `Feature`)
/// into raw boundary vertices.
///
/// Only the exterior ring is used. The closing vertex that repeats the
/// first one is removed, since the ring is closed implicitly.
///
/// # Errors
///
/// Returns [`BoundaryParseError`] if the input is not `GeoJSON`, is not a
/// single polygon, or holds an out-of-range vertex.
pub fn boundary_from_geojson(input: &str) -> Result<Vec<BoundaryPoint>, BoundaryParseError> {
    let geojson: GeoJson = input.parse().map_err(Box::new)?;

    let geometry = match geojson {
        GeoJson::Geometry(geometry) => geometry,
        GeoJson::Feature(feature) => {
            feature
                .geometry
                .ok_or_else(|| BoundaryParseError::UnsupportedGeometry {
                    kind: "empty Feature".to_string(),
                })?
        }
        GeoJson::FeatureCollection(_) => {
            return Err(BoundaryParseError::UnsupportedGeometry {
                kind: "FeatureCollection".to_string(),
            });
        }
    };

    let converted: Geometry<f64> = geometry.try_into().map_err(Box::new)?;

    let polygon = match converted {
        Geometry::Polygon(polygon) => polygon,
        Geometry::MultiPolygon(mut multi) if multi.0.len() == 1 => multi.0.remove(0),
        other => {
            return Err(BoundaryParseError::UnsupportedGeometry {
                kind: geometry_kind(&other).to_string(),
            });
        }
    };

    let mut ring: Vec<geo::Coord<f64>> = polygon.exterior().coords().copied().collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    ring.into_iter()
        .map(|c| Coordinate::new(c.y, c.x).map(BoundaryPoint::from))
        .collect::<Result<_, _>>()
        .map_err(BoundaryParseError::from)
}

const fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
