//! Spatial operations: H3-based geographic indexing and road-distance estimates.
//!
//! This module provides:
//!
//! - **Road distance**: Haversine distance scaled by a road factor, LRU-cached
//! - **Cell lookup**: lat/lng to H3 cell at the working resolution
//! - **Ring queries**: cells at exactly k grid steps, with a step-distance fallback
//!
//! Default resolution is 9 (~240m cell size), suitable for city-scale fleets.
//! Cell conversion failures are encoded as `None`; callers fall back to
//! unindexed scans rather than propagating errors.

use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use h3o::{CellIndex, LatLng, Resolution};
use lru::LruCache;

/// Working H3 resolution for the fleet index.
pub const HEX_RESOLUTION: Resolution = Resolution::Nine;

/// Multiplier applied to great-circle distance to approximate road distance.
pub const ROAD_FACTOR: f64 = 1.3;

/// A WGS84 point as (latitude, longitude) in degrees.
pub type GeoPoint = (f64, f64);

fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    6371.0 * c
}

type PointKey = (u64, u64, u64, u64);

fn point_key(p: GeoPoint, q: GeoPoint) -> PointKey {
    (p.0.to_bits(), p.1.to_bits(), q.0.to_bits(), q.1.to_bits())
}

/// Global distance cache (10,000 entries). Planner scoring revisits the same
/// drop/pickup pairs many times within a pass.
fn get_distance_cache() -> &'static Mutex<LruCache<PointKey, f64>> {
    static CACHE: OnceLock<Mutex<LruCache<PointKey, f64>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        Mutex::new(LruCache::new(
            NonZeroUsize::new(10_000).expect("cache size must be non-zero"),
        ))
    })
}

/// Approximate road distance in kilometres between two points.
///
/// Haversine distance times [`ROAD_FACTOR`], rounded to 2 decimals. This is
/// the sole distance estimator on the planner hot path; no external routing
/// call is made.
pub fn road_distance_km(p: GeoPoint, q: GeoPoint) -> f64 {
    // Symmetric key (lexicographically smaller point first) to maximize cache hits.
    let key = if p <= q { point_key(p, q) } else { point_key(q, p) };

    let mut cache = get_distance_cache().lock().unwrap();
    *cache.get_or_insert(key, || {
        let km = haversine_km(p, q) * ROAD_FACTOR;
        (km * 100.0).round() / 100.0
    })
}

/// H3 cell containing the point at [`HEX_RESOLUTION`], or `None` for
/// coordinates outside the valid lat/lng domain.
pub fn cell_of(lat: f64, lng: f64) -> Option<CellIndex> {
    LatLng::new(lat, lng).ok().map(|ll| ll.to_cell(HEX_RESOLUTION))
}

/// Cells at exactly `k` grid steps from `origin`. `k = 0` is the origin cell
/// itself. Returns `None` when the hollow ring cannot be produced (pentagon
/// distortion); callers then compare grid-step distances directly.
pub fn ring(origin: CellIndex, k: u32) -> Option<Vec<CellIndex>> {
    if k == 0 {
        return Some(vec![origin]);
    }
    origin.grid_ring_fast(k).collect()
}

/// Grid-step distance between two cells, `None` when the cells are too far
/// apart or cross icosahedron faces.
pub fn cell_steps(a: CellIndex, b: CellIndex) -> Option<i32> {
    a.grid_distance(b).ok()
}
