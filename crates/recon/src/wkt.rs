//! Minimal WKT polygon reading, just enough to materialize creation
//! geometry from import footprints.

/// Outer ring of a WKT POLYGON as (lon, lat) pairs, in order, with the
/// closing point preserved. Inner rings are ignored. `None` when the text
/// is not a well-formed polygon.
pub fn polygon_outer_ring(wkt: &str) -> Option<Vec<(f64, f64)>> {
    let body = wkt.trim().strip_prefix("POLYGON")?.trim_start();
    let body = body.strip_prefix('(')?;
    // The outer ring is the first parenthesized coordinate list.
    let end = body.find(')')?;
    let ring = body.get(..end)?.trim_start_matches('(');

    let mut points = Vec::new();
    for pair in ring.split(',') {
        let mut parts = pair.split_whitespace();
        let lon: f64 = parts.next()?.parse().ok()?;
        let lat: f64 = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        points.push((lon, lat));
    }
    if points.len() < 4 || points.first() != points.last() {
        return None;
    }
    Some(points)
}
