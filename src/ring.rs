use crate::*;

/// One boundary loop of a polygon: an outer boundary or a hole.
///
/// The vertices are held as read from the source. A ring may or may not repeat its first vertex
/// at the end; arithmetic that needs a closed loop adds the closing segment when it is missing.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ring(Vec<Vertex>);

impl Ring {
    pub fn new<I, V>(vertices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vertex>,
    {
        Ring(vertices.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.0
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Vertex> + '_ {
        self.0.iter()
    }

    /// Returns if the last vertex repeats the first one (planar, exact).
    pub fn is_closed(&self) -> bool {
        match (self.0.first(), self.0.last()) {
            (Some(a), Some(b)) => self.len() > 1 && a.coincident(b),
            _ => false,
        }
    }

    /// The boundary segments of the ring.
    ///
    /// The closing segment (last vertex back to the first) is included only when the ring does
    /// not already repeat its first vertex. A ring with fewer than 2 vertices has no segments.
    pub fn segments(&self) -> impl Iterator<Item = (Vertex, Vertex)> + '_ {
        let closing = (self.len() > 1 && !self.is_closed())
            .then(|| (self.0[self.len() - 1], self.0[0]));

        self.0
            .windows(2)
            .map(|w| (w[0], w[1]))
            .chain(closing)
    }

    /// Running path length at each vertex, following source order.
    ///
    /// The returned vector has one entry per vertex, the first being `0`.
    pub fn cumulative_distances(&self) -> Vec<f64> {
        let mut acc = 0.0;
        std::iter::once(0.0)
            .chain(self.0.windows(2).map(|w| {
                acc += w[0].distance(&w[1]);
                acc
            }))
            .take(self.len())
            .collect()
    }

    /// Total length around the ring, including the closing segment if it is not explicit.
    pub fn arc_length(&self) -> f64 {
        self.segments().map(|(a, b)| a.distance(&b)).sum()
    }

    /// Shoelace area, positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        self.moments().0
    }

    /// The signed area and the first moment of area (`centroid * signed area`).
    pub(crate) fn moments(&self) -> (f64, Point2) {
        let (a, cx, cy) = self
            .segments()
            .fold((0.0, 0.0, 0.0), |(a, cx, cy), (p, q)| {
                let cross = p.x * q.y - q.x * p.y;
                (a + cross, cx + (p.x + q.x) * cross, cy + (p.y + q.y) * cross)
            });

        (a * 0.5, [cx / 6.0, cy / 6.0])
    }

    /// Test if a point is enclosed by this ring alone (holes are not considered).
    pub fn winds_around(&self, p: impl ToPoint2) -> bool {
        point_inside(&self.0, p)
    }
}

impl Area for Ring {
    /// 2D plan area enclosed by the ring.
    ///
    /// # Example
    /// ```rust
    /// use polyconv::*;
    /// let r = Ring::new([
    ///     [0.0, 0.0],
    ///     [2.0, 0.0],
    ///     [2.0, 3.0],
    ///     [0.0, 3.0]
    /// ]);
    ///
    /// assert!((r.area() - 6.0).abs() < 1e-3);
    /// ```
    fn area(&self) -> f64 {
        self.signed_area().abs()
    }
}

impl FromIterator<Vertex> for Ring {
    fn from_iter<T: IntoIterator<Item = Vertex>>(iter: T) -> Self {
        Ring(iter.into_iter().collect())
    }
}

/// Test if a point is _inside_ a ring of points.
///
/// Uses a winding counting number test. Fewer than 3 points never enclose anything.
pub fn point_inside<P, O>(ps: &[P], point: O) -> bool
where
    O: ToPoint2,
    for<'a> &'a P: ToPoint2,
{
    if ps.len() < 3 {
        return false;
    }

    /// Test if a point is on a line.
    /// > 0 : p is left of line
    /// = 0 : p is on line
    /// < 0 : p is right of line
    fn on((from, to): (Point2, Point2), p: Point2) -> f64 {
        let [ax, ay] = to.sub(from);
        let [bx, by] = p.sub(from);
        ax * by - bx * ay
    }

    let point = point.to_p2();
    let last = ps.len() - 1;
    let segments = ps
        .windows(2)
        .map(|w| (w[0].to_p2(), w[1].to_p2()))
        .chain(std::iter::once((ps[last].to_p2(), ps[0].to_p2())));

    let mut winding = 0;

    let pointy = point[1];
    for (from, to) in segments {
        let fromy = from[1];
        let toy = to[1];
        if fromy <= pointy {
            if toy > pointy && on((from, to), point) > 0.0 {
                winding += 1;
            }
        } else if toy <= pointy && on((from, to), point) < 0.0 {
            winding -= 1;
        }
    }

    winding != 0
}
