//! Turning polygons into representative points.
use crate::*;
use std::{fmt, str::FromStr};

/// How a polygon is reduced to points.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Strategy {
    /// Every ring vertex, in source order.
    Vertex,
    /// One interior point suitable for label placement.
    Label,
    /// The area centroid, which may fall outside the polygon.
    Center,
    /// The centroid when it is inside the polygon, otherwise the label point.
    #[serde(alias = "CenterIn")]
    CenterInterior,
    /// The ring vertex furthest from the rest of the boundary (vertex-sampled heuristic).
    DeepestPoint,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Vertex,
        Strategy::Label,
        Strategy::Center,
        Strategy::CenterInterior,
        Strategy::DeepestPoint,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Vertex => "Vertex",
            Strategy::Label => "Label",
            Strategy::Center => "Center",
            Strategy::CenterInterior => "CenterInterior",
            Strategy::DeepestPoint => "DeepestPoint",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    /// Parse a conversion option name. `CenterIn` is accepted for `CenterInterior`.
    fn from_str(s: &str) -> Result<Self> {
        if s == "CenterIn" {
            return Ok(Strategy::CenterInterior);
        }
        Strategy::ALL
            .into_iter()
            .find(|x| x.name() == s)
            .ok_or_else(|| {
                let names = Strategy::ALL.map(|x| x.name()).join(", ");
                Error::invalid(
                    "conversion_option",
                    format!("unknown option `{}`, expecting one of: {}", s, names),
                )
            })
    }
}

/// The `order` of a decomposed vertex.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Order {
    /// Zero-based index within the ring.
    Index(usize),
    /// Fraction of the ring's arc length, in `[0, 1]`.
    Position(f64),
}

impl Order {
    pub fn value(&self) -> f64 {
        match self {
            Order::Index(i) => *i as f64,
            Order::Position(p) => *p,
        }
    }
}

/// A representative point produced from a polygon.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecomposedPoint {
    pub geometry: Vertex,
    pub source_id: i64,
    /// Set for [`Strategy::Vertex`] only.
    pub ring_index: Option<usize>,
    /// Set for [`Strategy::Vertex`] only.
    pub order: Option<Order>,
    /// `"{source_id}_{ring_index}"`, set for [`Strategy::Vertex`] only.
    pub ring_id: Option<String>,
}

impl DecomposedPoint {
    fn single(polygon: &Polygon, geometry: Vertex) -> Self {
        Self {
            geometry,
            source_id: polygon.source_id(),
            ring_index: None,
            order: None,
            ring_id: None,
        }
    }
}

/// Decomposition configuration, validated once before any polygon is processed.
///
/// When deserialised, `conversion_option` is required; every other field defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecomposeOptions {
    #[serde(rename = "conversion_option")]
    pub strategy: Strategy,
    /// Skip vertices already emitted for the same polygon ([`Strategy::Vertex`] only).
    #[serde(default)]
    pub remove_duplicates: bool,
    /// Report `order` as a fraction of ring length rather than an index
    /// ([`Strategy::Vertex`] only).
    #[serde(default)]
    pub calc_point_position: bool,
    /// Keep `z` and `m` on emitted vertices, and compare them when removing duplicates.
    #[serde(default)]
    pub retain_elevation_measure: bool,
    /// Snap coordinates to a grid of this size when comparing for duplicates.
    #[serde(default)]
    pub dedup_tolerance: Option<f64>,
    /// Integer attribute holding the polygon identifier; the record's object id otherwise.
    #[serde(default)]
    pub id_field: Option<String>,
}

impl Default for DecomposeOptions {
    fn default() -> Self {
        Self::new(Strategy::Vertex)
    }
}

impl DecomposeOptions {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            remove_duplicates: false,
            calc_point_position: false,
            retain_elevation_measure: false,
            dedup_tolerance: None,
            id_field: None,
        }
    }

    /// Options for the strategy named `conversion_option`.
    pub fn from_option_name(conversion_option: &str) -> Result<Self> {
        conversion_option.parse().map(Self::new)
    }

    /// Check the options and normalise empty field names to unset.
    pub fn validate(mut self) -> Result<Self> {
        if let Some(t) = self.dedup_tolerance {
            if !(t.is_finite() && t > 0.0) {
                return Err(Error::invalid(
                    "dedup_tolerance",
                    format!("must be a positive finite number, got {}", t),
                ));
            }
        }
        self.id_field = normalise_field(self.id_field);

        if self.strategy != Strategy::Vertex {
            if self.remove_duplicates {
                log::warn!(
                    "remove_duplicates only applies to Vertex, ignored for {}",
                    self.strategy
                );
            }
            if self.calc_point_position {
                log::warn!(
                    "calc_point_position only applies to Vertex, ignored for {}",
                    self.strategy
                );
            }
        }

        Ok(self)
    }
}

/// Empty field names mean "not set".
pub(crate) fn normalise_field(field: Option<String>) -> Option<String> {
    field.filter(|f| !f.trim().is_empty())
}

/// Decomposes polygons under a validated set of options.
///
/// # Example
/// ```rust
/// # use polyconv::*;
/// let d = Decomposer::new(DecomposeOptions::new(Strategy::Center)).unwrap();
/// let square = Polygon::from_outer(4, [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
///
/// let pts = d.decompose(&square);
/// assert_eq!(pts.len(), 1);
/// assert_eq!(pts[0].geometry, Vertex::new(1.0, 1.0));
/// assert_eq!(pts[0].source_id, 4);
/// ```
#[derive(Clone, Debug)]
pub struct Decomposer {
    opts: DecomposeOptions,
}

impl Decomposer {
    pub fn new(opts: DecomposeOptions) -> Result<Self> {
        Ok(Self {
            opts: opts.validate()?,
        })
    }

    pub fn options(&self) -> &DecomposeOptions {
        &self.opts
    }

    /// The representative points of one polygon.
    ///
    /// Empty polygons and empty rings contribute nothing; they are logged and skipped.
    pub fn decompose(&self, polygon: &Polygon) -> Vec<DecomposedPoint> {
        if polygon.is_empty() {
            log::warn!("polygon {} has no vertices, skipping", polygon.source_id());
            return Vec::new();
        }

        match self.opts.strategy {
            Strategy::Vertex => self.vertices(polygon),
            Strategy::Label => label(polygon).into_iter().collect(),
            Strategy::Center => center(polygon).into_iter().collect(),
            Strategy::CenterInterior => center_interior(polygon).into_iter().collect(),
            Strategy::DeepestPoint => self.deepest(polygon).into_iter().collect(),
        }
    }

    /// Decompose a batch of polygons in parallel.
    ///
    /// The output is identical to decomposing each polygon in turn.
    pub fn decompose_all_par(&self, polygons: &[Polygon]) -> Vec<DecomposedPoint> {
        use rayon::prelude::*;

        polygons
            .par_iter()
            .flat_map_iter(|p| self.decompose(p))
            .collect()
    }

    fn keep_zm(&self, v: Vertex) -> Vertex {
        if self.opts.retain_elevation_measure {
            v
        } else {
            v.planar()
        }
    }

    fn vertices(&self, polygon: &Polygon) -> Vec<DecomposedPoint> {
        let opts = &self.opts;
        let mut seen = HashSet::default();
        let mut out = Vec::with_capacity(polygon.vertex_count());

        for (ring_index, ring) in polygon.rings().iter().enumerate() {
            if ring.is_empty() {
                log::warn!(
                    "polygon {} ring {} has no vertices, skipping",
                    polygon.source_id(),
                    ring_index
                );
                continue;
            }

            let positions = opts
                .calc_point_position
                .then(|| metrics::normalised_positions(ring));
            let ring_id = format!("{}_{}", polygon.source_id(), ring_index);

            for (i, v) in ring.iter().enumerate() {
                if opts.remove_duplicates {
                    let key = v.key(opts.retain_elevation_measure, opts.dedup_tolerance);
                    if !seen.insert(key) {
                        log::trace!("duplicate vertex {} of ring {} dropped", i, ring_id);
                        continue;
                    }
                }

                let order = match &positions {
                    Some(ps) => Order::Position(ps[i]),
                    None => Order::Index(i),
                };

                out.push(DecomposedPoint {
                    geometry: self.keep_zm(*v),
                    source_id: polygon.source_id(),
                    ring_index: Some(ring_index),
                    order: Some(order),
                    ring_id: Some(ring_id.clone()),
                });
            }
        }

        out
    }

    /// The vertex with the greatest vertex-sampled distance to the rest of the boundary.
    /// Ties keep the earliest vertex.
    fn deepest(&self, polygon: &Polygon) -> Option<DecomposedPoint> {
        polygon
            .vertices()
            .map(|v| {
                let d = metrics::min_distance_to_boundary(v, polygon).unwrap_or(0.0);
                (v, d)
            })
            .fold(None, |best: Option<(&Vertex, f64)>, (v, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((v, d)),
            })
            .map(|(v, _)| DecomposedPoint::single(polygon, self.keep_zm(*v)))
    }
}

fn label(polygon: &Polygon) -> Option<DecomposedPoint> {
    polygon
        .label_point()
        .map(|p| DecomposedPoint::single(polygon, p.into()))
}

fn center(polygon: &Polygon) -> Option<DecomposedPoint> {
    polygon
        .centroid()
        .map(|p| DecomposedPoint::single(polygon, p.into()))
}

fn center_interior(polygon: &Polygon) -> Option<DecomposedPoint> {
    match polygon.centroid() {
        Some(c) if polygon.envelops(c) => Some(DecomposedPoint::single(polygon, c.into())),
        _ => {
            log::debug!(
                "centroid of polygon {} is outside, using label point",
                polygon.source_id()
            );
            label(polygon)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;

    fn decomposer(opts: DecomposeOptions) -> Decomposer {
        Decomposer::new(opts).unwrap()
    }

    fn vertex_opts(remove_duplicates: bool, calc_point_position: bool) -> DecomposeOptions {
        DecomposeOptions {
            remove_duplicates,
            calc_point_position,
            ..DecomposeOptions::new(Strategy::Vertex)
        }
    }

    fn square_with_hole() -> Polygon {
        Polygon::new(
            12,
            [
                Ring::new([[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]]),
                Ring::new([[1.0, 1.0], [1.0, 2.0], [2.0, 2.0], [2.0, 1.0], [1.0, 1.0]]),
            ],
        )
    }

    fn c_shape() -> Polygon {
        Polygon::from_outer(
            5,
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

    #[test]
    fn deserialising_requires_conversion_option() {
        use serde::de::value::{Error as DeError, MapDeserializer};
        use serde::Deserialize;

        let de: MapDeserializer<_, DeError> =
            MapDeserializer::new(vec![("conversion_option", "CenterIn")].into_iter());
        let opts = DecomposeOptions::deserialize(de).unwrap();
        assert_eq!(opts, DecomposeOptions::new(Strategy::CenterInterior));

        let de: MapDeserializer<_, DeError> =
            MapDeserializer::new(vec![("remove_duplicates", true)].into_iter());
        let err = DecomposeOptions::deserialize(de).unwrap_err();
        assert!(err.to_string().contains("conversion_option"));
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("Vertex".parse::<Strategy>().unwrap(), Strategy::Vertex);
        assert_eq!("Label".parse::<Strategy>().unwrap(), Strategy::Label);
        assert_eq!("Center".parse::<Strategy>().unwrap(), Strategy::Center);
        assert_eq!(
            "CenterInterior".parse::<Strategy>().unwrap(),
            Strategy::CenterInterior
        );
        assert_eq!(
            "CenterIn".parse::<Strategy>().unwrap(),
            Strategy::CenterInterior
        );
        assert_eq!(
            "DeepestPoint".parse::<Strategy>().unwrap(),
            Strategy::DeepestPoint
        );

        let e = "Spiral".parse::<Strategy>().unwrap_err();
        assert!(e.is_configuration());
        assert!(e.to_string().contains("Spiral"));
        assert!(DecomposeOptions::from_option_name("vertex").is_err());
    }

    #[test]
    fn invalid_tolerance() {
        let opts = DecomposeOptions {
            dedup_tolerance: Some(0.0),
            ..vertex_opts(true, false)
        };
        assert!(Decomposer::new(opts).is_err());

        let opts = DecomposeOptions {
            dedup_tolerance: Some(f64::NAN),
            ..vertex_opts(true, false)
        };
        assert!(Decomposer::new(opts).is_err());
    }

    #[test]
    fn empty_id_field_is_unset() {
        let opts = DecomposeOptions {
            id_field: Some(" ".into()),
            ..vertex_opts(false, false)
        };
        assert_eq!(decomposer(opts).options().id_field, None);
    }

    #[test]
    fn vertex_indices_and_ring_ids() {
        let pts = decomposer(vertex_opts(false, false)).decompose(&square_with_hole());
        assert_eq!(pts.len(), 10);

        let outer = &pts[..5];
        let inner = &pts[5..];
        for (i, p) in outer.iter().enumerate() {
            assert_eq!(p.order, Some(Order::Index(i)));
            assert_eq!(p.ring_index, Some(0));
            assert_eq!(p.ring_id.as_deref(), Some("12_0"));
            assert_eq!(p.source_id, 12);
        }
        for (i, p) in inner.iter().enumerate() {
            assert_eq!(p.order, Some(Order::Index(i)));
            assert_eq!(p.ring_id.as_deref(), Some("12_1"));
        }
        assert_eq!(inner[2].geometry, Vertex::new(2.0, 2.0));
    }

    #[test]
    fn vertex_positions() {
        let pts = decomposer(vertex_opts(false, true)).decompose(&square_with_hole());
        let orders = pts
            .iter()
            .map(|p| p.order.unwrap().value())
            .collect::<Vec<_>>();
        assert_eq!(
            orders,
            vec![0.0, 0.25, 0.5, 0.75, 1.0, 0.0, 0.25, 0.5, 0.75, 1.0]
        );
    }

    #[test]
    fn dedup_spans_rings() {
        // the inner ring shares a corner with the outer ring
        let p = Polygon::new(
            1,
            [
                Ring::new([[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]]),
                Ring::new([[0.0, 0.0], [1.0, 2.0], [2.0, 1.0], [0.0, 0.0]]),
            ],
        );
        let pts = decomposer(vertex_opts(true, false)).decompose(&p);
        let xy = pts.iter().map(|p| p.geometry.xy()).collect::<Vec<_>>();
        assert_eq!(
            xy,
            vec![
                [0.0, 0.0],
                [4.0, 0.0],
                [4.0, 4.0],
                [0.0, 4.0],
                [1.0, 2.0],
                [2.0, 1.0]
            ]
        );
        // indices are kept from the ring, not renumbered
        assert_eq!(pts[4].order, Some(Order::Index(1)));
        assert_eq!(pts[4].ring_id.as_deref(), Some("1_1"));
    }

    #[test]
    fn dedup_with_zm() {
        let p = Polygon::from_outer(
            1,
            [
                Vertex::new(0.0, 0.0).with_z(1.0),
                Vertex::new(1.0, 0.0).with_z(1.0),
                Vertex::new(0.0, 0.0).with_z(2.0),
            ],
        );

        let pts = decomposer(vertex_opts(true, false)).decompose(&p);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].geometry.z, None);

        let opts = DecomposeOptions {
            retain_elevation_measure: true,
            ..vertex_opts(true, false)
        };
        let pts = decomposer(opts).decompose(&p);
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[2].geometry.z, Some(2.0));
    }

    #[test]
    fn dedup_with_tolerance() {
        let p = Polygon::from_outer(1, [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0001, 0.0]]);
        assert_eq!(decomposer(vertex_opts(true, false)).decompose(&p).len(), 4);

        let opts = DecomposeOptions {
            dedup_tolerance: Some(0.01),
            ..vertex_opts(true, false)
        };
        assert_eq!(decomposer(opts).decompose(&p).len(), 3);
    }

    #[test]
    fn empty_rings_and_polygons_yield_nothing() {
        let d = decomposer(vertex_opts(false, false));
        assert!(d.decompose(&Polygon::new(1, [])).is_empty());
        assert!(d.decompose(&Polygon::new(1, [Ring::default()])).is_empty());

        let p = Polygon::new(
            1,
            [Ring::default(), Ring::new([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]])],
        );
        let pts = d.decompose(&p);
        assert_eq!(pts.len(), 3);
        // ring numbering still counts the skipped ring
        assert_eq!(pts[0].ring_id.as_deref(), Some("1_1"));

        for s in Strategy::ALL {
            let d = decomposer(DecomposeOptions::new(s));
            assert!(d.decompose(&Polygon::new(1, [])).is_empty());
        }
    }

    #[test]
    fn single_point_strategies_leave_order_unset() {
        for s in [
            Strategy::Label,
            Strategy::Center,
            Strategy::CenterInterior,
            Strategy::DeepestPoint,
        ] {
            let pts = decomposer(DecomposeOptions::new(s)).decompose(&square_with_hole());
            assert_eq!(pts.len(), 1, "{}", s);
            assert_eq!(pts[0].order, None);
            assert_eq!(pts[0].ring_id, None);
            assert_eq!(pts[0].ring_index, None);
            assert_eq!(pts[0].source_id, 12);
        }
    }

    #[test]
    fn center_interior_falls_back_to_label() {
        let c = c_shape();
        let centroid = decomposer(DecomposeOptions::new(Strategy::Center)).decompose(&c);
        let label = decomposer(DecomposeOptions::new(Strategy::Label)).decompose(&c);
        let interior = decomposer(DecomposeOptions::new(Strategy::CenterInterior)).decompose(&c);

        assert!(!c.envelops(centroid[0].geometry));
        assert_eq!(interior, label);
        assert_eq!(interior[0].geometry, Vertex::new(0.5, 1.5));
    }

    #[test]
    fn separated_parts_stay_inside() {
        let p = Polygon::new(
            9,
            [
                Ring::new([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
                Ring::new([[0.0, 10.0], [1.0, 10.0], [1.0, 11.0], [0.0, 11.0]]),
            ],
        );
        // the centroid sits in the gap between the parts
        let centroid = decomposer(DecomposeOptions::new(Strategy::Center)).decompose(&p);
        assert!(!p.envelops(centroid[0].geometry));

        for s in [Strategy::Label, Strategy::CenterInterior] {
            let pts = decomposer(DecomposeOptions::new(s)).decompose(&p);
            assert_eq!(pts.len(), 1, "{}", s);
            assert!(p.envelops(pts[0].geometry), "{}", s);
        }
    }

    #[test]
    fn center_interior_keeps_inside_centroid() {
        let square = Polygon::from_outer(0, [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
        let pts = decomposer(DecomposeOptions::new(Strategy::CenterInterior)).decompose(&square);
        assert_eq!(pts[0].geometry, Vertex::new(1.0, 1.0));
    }

    #[test]
    fn deepest_point_heuristic() {
        // a unit square with a spike; the spike tip is furthest from every other vertex even
        // though the square's interior is where the true deepest point lies
        let p = Polygon::from_outer(
            2,
            [[0.0, 0.0], [1.0, 0.0], [5.0, 0.5], [1.0, 1.0], [0.0, 1.0]],
        );
        let pts = decomposer(DecomposeOptions::new(Strategy::DeepestPoint)).decompose(&p);
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0].geometry, Vertex::new(5.0, 0.5));

        // ties keep the first vertex
        let square = Polygon::from_outer(2, [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        let pts = decomposer(DecomposeOptions::new(Strategy::DeepestPoint)).decompose(&square);
        assert_eq!(pts[0].geometry, Vertex::new(0.0, 0.0));

        // every vertex is coincident, the first is kept
        let p = Polygon::from_outer(2, [Vertex::new(1.0, 1.0).with_z(5.0), Vertex::new(1.0, 1.0)]);
        let opts = DecomposeOptions {
            retain_elevation_measure: true,
            ..DecomposeOptions::new(Strategy::DeepestPoint)
        };
        let pts = decomposer(opts).decompose(&p);
        assert_eq!(pts[0].geometry, Vertex::new(1.0, 1.0).with_z(5.0));
    }

    #[test]
    fn parallel_matches_sequential() {
        let polygons = (0..50)
            .map(|i| {
                let o = i as f64;
                Polygon::from_outer(i, [[o, o], [o + 1.0, o], [o + 1.0, o + 1.0], [o, o]])
            })
            .collect::<Vec<_>>();
        let d = decomposer(vertex_opts(true, true));
        let seq = polygons.iter().flat_map(|p| d.decompose(p)).collect::<Vec<_>>();
        assert_eq!(d.decompose_all_par(&polygons), seq);
    }

    #[quickcheck]
    fn vertex_count_matches_rings(p: ArbPolygon) -> TestResult {
        let p = p.0;
        let pts = decomposer(vertex_opts(false, false)).decompose(&p);

        let indices_match = p
            .rings()
            .iter()
            .flat_map(|r| 0..r.len())
            .zip(&pts)
            .all(|(i, pt)| pt.order == Some(Order::Index(i)));

        TestResult::from_bool(pts.len() == p.vertex_count() && indices_match)
    }

    #[quickcheck]
    fn dedup_is_idempotent(p: ArbPolygon) -> TestResult {
        let d = decomposer(vertex_opts(true, false));
        let once = d.decompose(&p.0);

        // decomposing the deduplicated vertices again changes nothing
        let again = Polygon::from_outer(p.0.source_id(), once.iter().map(|x| x.geometry));
        let twice = d.decompose(&again);

        TestResult::from_bool(
            once == d.decompose(&p.0)
                && once.len() == twice.len()
                && once.iter().zip(&twice).all(|(a, b)| a.geometry == b.geometry),
        )
    }

    #[quickcheck]
    fn positions_stay_in_unit_range(p: ArbPolygon) -> TestResult {
        let pts = decomposer(vertex_opts(false, true)).decompose(&p.0);
        let mut prev: Option<(usize, f64)> = None;
        for pt in &pts {
            let (Some(r), Some(Order::Position(x))) = (pt.ring_index, pt.order) else {
                return TestResult::failed();
            };
            if !(0.0..=1.0).contains(&x) {
                return TestResult::failed();
            }
            match prev {
                Some((pr, px)) if pr == r && px > x => return TestResult::failed(),
                Some((pr, _)) if pr != r && x != 0.0 => return TestResult::failed(),
                None if x != 0.0 => return TestResult::failed(),
                _ => (),
            }
            prev = Some((r, x));
        }
        TestResult::passed()
    }
}
