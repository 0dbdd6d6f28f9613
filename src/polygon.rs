use crate::*;

/// A polygon feature: its rings in source order, tagged with the feature identifier.
///
/// Rings nested inside an odd number of other rings are treated as holes. There is no
/// requirement on ring orientation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polygon {
    source_id: i64,
    rings: Vec<Ring>,
}

impl Polygon {
    pub fn new<I>(source_id: i64, rings: I) -> Self
    where
        I: IntoIterator<Item = Ring>,
    {
        Self {
            source_id,
            rings: rings.into_iter().collect(),
        }
    }

    /// Construct a polygon from a single outer ring.
    pub fn from_outer<I, V>(source_id: i64, vertices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vertex>,
    {
        Self::new(source_id, [Ring::new(vertices)])
    }

    pub fn source_id(&self) -> i64 {
        self.source_id
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Number of vertices across all rings.
    pub fn vertex_count(&self) -> usize {
        self.rings.iter().map(Ring::len).sum()
    }

    /// Returns if the polygon holds no vertices at all.
    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// Every vertex of every ring, in source order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.rings.iter().flat_map(Ring::iter)
    }

    /// Every boundary segment of every ring.
    pub fn segments(&self) -> impl Iterator<Item = (Vertex, Vertex)> + '_ {
        self.rings.iter().flat_map(Ring::segments)
    }

    /// The `(min, max)` planar corners of the polygon's envelope.
    pub fn envelope(&self) -> Option<(Point2, Point2)> {
        self.vertices().fold(None, |acc, v| {
            let [x, y] = v.xy();
            Some(match acc {
                None => ([x, y], [x, y]),
                Some(([x0, y0], [x1, y1])) => ([x0.min(x), y0.min(y)], [x1.max(x), y1.max(y)]),
            })
        })
    }

    /// Flags each ring as a hole (`true`) or an outer boundary (`false`).
    ///
    /// A ring is a hole when its first vertex is enclosed by an odd number of the other rings.
    pub fn hole_flags(&self) -> Vec<bool> {
        self.rings
            .iter()
            .enumerate()
            .map(|(i, ring)| match ring.vertices().first() {
                Some(v) => {
                    self.rings
                        .iter()
                        .enumerate()
                        .filter(|(j, other)| *j != i && other.winds_around(v))
                        .count()
                        % 2
                        == 1
                }
                None => false,
            })
            .collect()
    }

    /// The area-weighted centroid of the polygon, with holes subtracted.
    ///
    /// This may fall outside the polygon for concave or multi-ring shapes.
    /// A polygon without area (relative to the size of its envelope) falls back to the mean of
    /// its distinct vertices; the closing vertex of an explicitly closed ring is not counted twice.
    /// Returns `None` for an empty polygon.
    pub fn centroid(&self) -> Option<Point2> {
        let ([x0, y0], [x1, y1]) = self.envelope()?;
        let (area, moment) = self.rings.iter().zip(self.hole_flags()).fold(
            (0.0, [0.0, 0.0]),
            |(area, moment): (f64, Point2), (ring, hole)| {
                let (a, m) = ring.moments();
                // normalise orientation, then subtract holes
                let sign = a.signum() * if hole { -1.0 } else { 1.0 };
                (area + a.abs() * if hole { -1.0 } else { 1.0 }, moment.add(m.scale(sign)))
            },
        );

        let extent = (x1 - x0).max(y1 - y0);
        if area.abs() > extent * extent * AREA_TOLERANCE {
            return Some(moment.scale(area.recip()));
        }

        let distinct = self.rings.iter().flat_map(|r| {
            let n = r.len() - usize::from(r.is_closed());
            r.vertices()[..n].iter()
        });
        let (sum, n) = distinct.fold(([0.0, 0.0], 0usize), |(acc, n): (Point2, _), v| {
            (acc.add(v.xy()), n + 1)
        });
        (n > 0).then(|| sum.scale((n as f64).recip()))
    }

    /// A point inside the polygon suitable for placing a label.
    ///
    /// A horizontal scan line is placed around the middle of the envelope, halfway between the
    /// nearest vertex ordinates either side of mid-height. The midpoint of the widest interior
    /// span along that line is returned. A vertex lying exactly at mid-height can sit on the
    /// line; crossings are counted half-open so it is still counted once.
    ///
    /// When that line misses every part (parts separated by a vertical gap), each outer ring is
    /// scanned at its own mid-height instead and the widest span over all of them wins. Only a
    /// polygon with no interior span at all (zero height) falls back to [`Polygon::centroid`].
    ///
    /// # Example
    /// ```rust
    /// # use polyconv::*;
    /// // a 'C' shape opening to the right
    /// let c = Polygon::from_outer(1, [
    ///     [0.0, 0.0], [3.0, 0.0], [3.0, 1.0], [1.0, 1.0],
    ///     [1.0, 2.0], [3.0, 2.0], [3.0, 3.0], [0.0, 3.0],
    /// ]);
    /// assert_eq!(c.label_point(), Some([0.5, 1.5]));
    /// ```
    pub fn label_point(&self) -> Option<Point2> {
        let ys = self.vertices().map(|v| v.y).collect::<Vec<_>>();
        let span = scan_ordinate(&ys).and_then(|scan| self.widest_span(scan));

        let span = span.or_else(|| {
            self.rings
                .iter()
                .zip(self.hole_flags())
                .filter(|(_, hole)| !hole)
                .filter_map(|(ring, _)| {
                    let ys = ring.iter().map(|v| v.y).collect::<Vec<_>>();
                    scan_ordinate(&ys).and_then(|scan| self.widest_span(scan))
                })
                .fold(None, |best: Option<(f64, Point2)>, (w, p)| match best {
                    Some((bw, _)) if bw >= w => best,
                    _ => Some((w, p)),
                })
        });

        match span {
            Some((_, p)) => Some(p),
            None => {
                log::debug!(
                    "polygon {} has no interior span, using centroid as label point",
                    self.source_id
                );
                self.centroid()
            }
        }
    }

    /// The widest interior span along the horizontal line `y = scan`, as its width and
    /// midpoint. Interior follows the even-odd rule over all rings.
    fn widest_span(&self, scan: f64) -> Option<(f64, Point2)> {
        let mut xs = self
            .segments()
            .filter(|(a, b)| (a.y < scan) != (b.y < scan))
            .map(|(a, b)| a.x + (scan - a.y) * (b.x - a.x) / (b.y - a.y))
            .collect::<Vec<_>>();
        xs.sort_by(f64::total_cmp);

        xs.chunks_exact(2)
            .map(|c| (c[0], c[1]))
            .filter(|(a, b)| b > a)
            .fold(None, |best: Option<(f64, f64)>, (a, b)| match best {
                Some((ba, bb)) if bb - ba >= b - a => best,
                _ => Some((a, b)),
            })
            .map(|(a, b)| (b - a, [(a + b) * 0.5, scan]))
    }
}

/// Areas at or below this fraction of the squared envelope extent count as no area.
const AREA_TOLERANCE: f64 = 1e-12;

/// A scan ordinate halfway between the nearest ordinates either side of the middle of `ys`.
fn scan_ordinate(ys: &[f64]) -> Option<f64> {
    let lo = ys.iter().copied().reduce(f64::min)?;
    let hi = ys.iter().copied().reduce(f64::max)?;
    let mid = (lo + hi) * 0.5;

    let (below, above) = ys.iter().fold(
        (f64::NEG_INFINITY, f64::INFINITY),
        |(below, above), &y| {
            if y < mid {
                (below.max(y), above)
            } else if y > mid {
                (below, above.min(y))
            } else {
                (below, above)
            }
        },
    );

    Some(if below.is_finite() && above.is_finite() {
        (below + above) * 0.5
    } else {
        mid
    })
}

impl Area for Polygon {
    /// 2D plan area, holes subtracted.
    fn area(&self) -> f64 {
        self.rings
            .iter()
            .zip(self.hole_flags())
            .map(|(r, hole)| if hole { -r.area() } else { r.area() })
            .sum()
    }
}

/// Test if point is _inside_ the polygon, accounting for holes.
///
/// A point is inside when it is enclosed by an odd number of rings.
impl<O: ToPoint2> Envelops<O> for Polygon {
    fn envelops(&self, p: O) -> bool {
        let p = p.to_p2();
        self.rings.iter().filter(|r| r.winds_around(p)).count() % 2 == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c_shape() -> Polygon {
        Polygon::from_outer(
            7,
            [
                [0.0, 0.0],
                [3.0, 0.0],
                [3.0, 1.0],
                [1.0, 1.0],
                [1.0, 2.0],
                [3.0, 2.0],
                [3.0, 3.0],
                [0.0, 3.0],
                [0.0, 0.0],
            ],
        )
    }

    fn square_with_hole() -> Polygon {
        Polygon::new(
            3,
            [
                Ring::new([[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]]),
                // same orientation as the outer ring, holes are found by nesting
                Ring::new([[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0], [1.0, 1.0]]),
            ],
        )
    }

    #[test]
    fn hole_detection() {
        assert_eq!(square_with_hole().hole_flags(), vec![false, true]);
        assert_eq!(c_shape().hole_flags(), vec![false]);

        let two_islands = Polygon::new(
            0,
            [
                Ring::new([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]),
                Ring::new([[5.0, 0.0], [6.0, 0.0], [6.0, 1.0]]),
            ],
        );
        assert_eq!(two_islands.hole_flags(), vec![false, false]);
    }

    #[test]
    fn area_subtracts_holes() {
        assert!((square_with_hole().area() - 15.0).abs() < 1e-11);
        assert!((c_shape().area() - 7.0).abs() < 1e-11);
    }

    #[test]
    fn envelops_accounts_for_holes() {
        let p = square_with_hole();
        assert!(p.envelops([0.5, 0.5]));
        assert!(p.envelops([3.0, 3.0]));
        assert!(!p.envelops([1.5, 1.5]));
        assert!(!p.envelops([5.0, 1.5]));
    }

    #[test]
    fn centroid_of_concave_shape_is_outside() {
        let c = c_shape();
        let [x, y] = c.centroid().unwrap();
        // (9 * 1.5 - 2 * 2.0) / 7
        assert!((x - 9.5 / 7.0).abs() < 1e-11);
        assert!((y - 1.5).abs() < 1e-11);
        assert!(!c.envelops([x, y]));
    }

    #[test]
    fn centroid_with_hole() {
        // hole centred at (1.5, 1.5) pulls the centroid away from it
        let [x, y] = square_with_hole().centroid().unwrap();
        let expected = (16.0 * 2.0 - 1.0 * 1.5) / 15.0;
        assert!((x - expected).abs() < 1e-11);
        assert!((y - expected).abs() < 1e-11);
    }

    #[test]
    fn centroid_of_degenerate_polygon() {
        let line = Polygon::from_outer(0, [[0.0, 0.0], [2.0, 0.0], [4.0, 0.0]]);
        assert_eq!(line.centroid(), Some([2.0, 0.0]));
        assert_eq!(Polygon::new(0, []).centroid(), None);
        assert_eq!(Polygon::new(0, [Ring::default()]).centroid(), None);
    }

    #[test]
    fn label_point_is_inside() {
        let c = c_shape();
        let l = c.label_point().unwrap();
        assert_eq!(l, [0.5, 1.5]);
        assert!(c.envelops(l));

        let p = square_with_hole();
        let l = p.label_point().unwrap();
        assert!(p.envelops(l));
        // scan line sits between the hole top (y = 2) and the outer top (y = 4)
        assert_eq!(l, [2.0, 2.5]);
    }

    fn separated_squares() -> Polygon {
        Polygon::new(
            9,
            [
                Ring::new([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]),
                Ring::new([[0.0, 10.0], [2.0, 10.0], [2.0, 11.0], [0.0, 11.0], [0.0, 10.0]]),
            ],
        )
    }

    #[test]
    fn label_point_of_separated_parts() {
        let p = separated_squares();
        let [_, cy] = p.centroid().unwrap();
        assert!(cy > 1.0 && cy < 10.0);

        let l = p.label_point().unwrap();
        assert!(p.envelops(l));
        // the wider upper square wins
        assert_eq!(l, [1.0, 10.5]);
    }

    #[test]
    fn centroid_of_tiny_polygon() {
        // an 'L' at nano-degree scale, well under f64::EPSILON in area
        let s = 1e-9;
        let l = Polygon::from_outer(
            0,
            [
                [0.0, 0.0],
                [3.0 * s, 0.0],
                [3.0 * s, s],
                [s, s],
                [s, 3.0 * s],
                [0.0, 3.0 * s],
                [0.0, 0.0],
            ],
        );
        let [x, y] = l.centroid().unwrap();
        assert!((x - 1.1 * s).abs() < 1e-20);
        assert!((y - 1.1 * s).abs() < 1e-20);
    }

    #[test]
    fn vertex_mean_skips_closing_vertex() {
        let line = Polygon::from_outer(0, [[0.0, 0.0], [3.0, 0.0], [0.0, 0.0]]);
        assert_eq!(line.centroid(), Some([1.5, 0.0]));
    }

    #[test]
    fn label_point_degenerate() {
        let flat = Polygon::from_outer(0, [[0.0, 1.0], [2.0, 1.0]]);
        assert_eq!(flat.label_point(), Some([1.0, 1.0]));
        assert_eq!(Polygon::new(0, []).label_point(), None);
    }

    #[test]
    fn envelope() {
        assert_eq!(c_shape().envelope(), Some(([0.0, 0.0], [3.0, 3.0])));
        assert_eq!(Polygon::new(0, []).envelope(), None);
    }
}
