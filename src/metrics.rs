//! Lengths and distances measured along or against polygon boundaries.
use crate::*;

/// Path length from the start of `ring` up to the vertex at `vertex_index`.
///
/// Indices past the last vertex give the length of the open vertex path.
///
/// # Example
/// ```rust
/// # use polyconv::*;
/// let r = Ring::new([[0.0, 0.0], [3.0, 0.0], [3.0, 4.0]]);
/// assert_eq!(metrics::cumulative_distance(&r, 0), 0.0);
/// assert_eq!(metrics::cumulative_distance(&r, 2), 7.0);
/// ```
pub fn cumulative_distance(ring: &Ring, vertex_index: usize) -> f64 {
    ring.vertices()
        .windows(2)
        .take(vertex_index)
        .map(|w| w[0].distance(&w[1]))
        .sum()
}

/// Total length around the ring, adding the closing segment when the source does not repeat
/// the first vertex.
pub fn ring_arc_length(ring: &Ring) -> f64 {
    ring.arc_length()
}

/// Each vertex's position along the ring as a fraction of the ring's arc length.
///
/// Positions start at `0`, never decrease, and never exceed `1`. The closing duplicate of an
/// explicitly closed ring sits at exactly `1`. A ring without length reports `0` everywhere.
pub fn normalised_positions(ring: &Ring) -> Vec<f64> {
    let total = ring_arc_length(ring);
    let cumulative = ring.cumulative_distances();

    if !(total > 0.0 && total.is_finite()) {
        return vec![0.0; cumulative.len()];
    }

    cumulative.into_iter().map(|d| (d / total).min(1.0)).collect()
}

/// Distance from `point` to the nearest boundary vertex of `polygon`.
///
/// This samples the boundary at its vertices only; it does not project onto segments, so the
/// result is at least the true distance to the boundary and can overshoot it on long edges.
/// Boundary vertices coincident with `point` are ignored so that a vertex can be measured
/// against the rest of the boundary.
///
/// Returns `None` when no other boundary vertex exists.
pub fn min_distance_to_boundary(point: &Vertex, polygon: &Polygon) -> Option<f64> {
    polygon
        .vertices()
        .filter(|v| !v.coincident(point))
        .map(|v| point.distance(v))
        .reduce(f64::min)
}
