//! Rebuilding polylines from keyed groups of points.
use crate::*;

/// A point to be threaded into a polyline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroupedPoint {
    pub geometry: Vertex,
    /// Points sharing a key form one polyline. `Null` is a key like any other.
    pub group_key: AttrValue,
    /// Sort key within the group; missing values sort as `0`.
    pub order_key: Option<AttrValue>,
    pub link_value: Option<String>,
}

impl GroupedPoint {
    pub fn new(group_key: impl Into<AttrValue>, geometry: Vertex) -> Self {
        Self {
            geometry,
            group_key: group_key.into(),
            order_key: None,
            link_value: None,
        }
    }

    pub fn with_order(self, order_key: impl Into<AttrValue>) -> Self {
        Self {
            order_key: Some(order_key.into()),
            ..self
        }
    }

    pub fn with_link(self, link_value: impl Into<String>) -> Self {
        Self {
            link_value: Some(link_value.into()),
            ..self
        }
    }
}

/// Reconstruction configuration, validated once before any point is read.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReconstructOptions {
    /// Attribute whose value groups points into polylines. Required.
    pub polyline_id_field: String,
    /// Attribute to sort each group by; source order is kept when unset.
    pub order_field: Option<String>,
    /// Attribute copied from the first and last point onto the polyline.
    pub link_field: Option<String>,
    /// Numeric attribute supplying each vertex's elevation.
    pub z_field: Option<String>,
    /// Numeric attribute supplying each vertex's measure.
    pub m_field: Option<String>,
}

impl ReconstructOptions {
    pub fn new(polyline_id_field: impl Into<String>) -> Self {
        Self {
            polyline_id_field: polyline_id_field.into(),
            ..Self::default()
        }
    }

    pub fn order_by(self, field: impl Into<String>) -> Self {
        Self {
            order_field: Some(field.into()),
            ..self
        }
    }

    pub fn link_by(self, field: impl Into<String>) -> Self {
        Self {
            link_field: Some(field.into()),
            ..self
        }
    }

    /// Check the options and normalise empty optional field names to unset.
    pub fn validate(self) -> Result<Self> {
        if self.polyline_id_field.trim().is_empty() {
            return Err(Error::invalid(
                "polyline_id_field",
                "a field to group points by is required",
            ));
        }

        Ok(Self {
            polyline_id_field: self.polyline_id_field,
            order_field: decompose::normalise_field(self.order_field),
            link_field: decompose::normalise_field(self.link_field),
            z_field: decompose::normalise_field(self.z_field),
            m_field: decompose::normalise_field(self.m_field),
        })
    }

    /// Every attribute field the options read.
    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.polyline_id_field.as_str())
            .chain(self.order_field.as_deref())
            .chain(self.link_field.as_deref())
            .chain(self.z_field.as_deref())
            .chain(self.m_field.as_deref())
    }
}

#[derive(Debug)]
struct Member {
    geometry: Vertex,
    order_key: Option<AttrValue>,
    link_value: Option<String>,
}

/// Points accumulated per group key, groups kept in first-seen order and members in arrival
/// order.
#[derive(Debug, Default)]
pub struct PointGroups {
    index: HashMap<AttrValue, usize>,
    groups: Vec<(AttrValue, Vec<Member>)>,
    points: usize,
}

impl PointGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: GroupedPoint) {
        let GroupedPoint {
            geometry,
            group_key,
            order_key,
            link_value,
        } = point;

        let i = match self.index.get(&group_key) {
            Some(&i) => i,
            None => {
                let i = self.groups.len();
                self.index.insert(group_key.clone(), i);
                self.groups.push((group_key, Vec::new()));
                i
            }
        };

        self.groups[i].1.push(Member {
            geometry,
            order_key,
            link_value,
        });
        self.points += 1;
    }

    /// Number of distinct group keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total points accumulated.
    pub fn points(&self) -> usize {
        self.points
    }

    /// Emit a polyline for every group with at least 2 points.
    ///
    /// With `ordered`, each group is stable-sorted on its order key (missing keys sort as `0`),
    /// so equal keys keep arrival order. With `linked`, the polyline carries the link values of
    /// its first and last points.
    pub fn into_polylines(self, ordered: bool, linked: bool) -> Vec<Polyline> {
        let zero = AttrValue::Int(0);

        self.groups
            .into_iter()
            .filter_map(|(key, mut members)| {
                if members.len() < 2 {
                    log::warn!(
                        "group `{}` has {} point, no polyline built",
                        key,
                        members.len()
                    );
                    return None;
                }

                if ordered {
                    members.sort_by(|a, b| {
                        let a = a.order_key.as_ref().filter(|x| !x.is_null()).unwrap_or(&zero);
                        let b = b.order_key.as_ref().filter(|x| !x.is_null()).unwrap_or(&zero);
                        a.total_cmp(b)
                    });
                }

                let (from, to) = match (members.first(), members.last()) {
                    (Some(f), Some(l)) if linked => (f.link_value.clone(), l.link_value.clone()),
                    _ => (None, None),
                };

                Polyline::new(key, members.into_iter().map(|m| m.geometry))
                    .ok()
                    .map(|p| p.with_attributes(from, to))
            })
            .collect()
    }
}

impl Extend<GroupedPoint> for PointGroups {
    fn extend<T: IntoIterator<Item = GroupedPoint>>(&mut self, iter: T) {
        for p in iter {
            self.push(p);
        }
    }
}

impl FromIterator<GroupedPoint> for PointGroups {
    fn from_iter<T: IntoIterator<Item = GroupedPoint>>(iter: T) -> Self {
        let mut g = Self::new();
        g.extend(iter);
        g
    }
}

/// Group `points` by key and build one polyline per group of 2 or more points.
///
/// Ordering applies when `opts.order_field` is set, link propagation when `opts.link_field` is
/// set. Polylines are returned in the order their keys were first seen.
///
/// # Example
/// ```rust
/// # use polyconv::*;
/// let pts = [
///     GroupedPoint::new("a", Vertex::new(1.0, 0.0)).with_order(1),
///     GroupedPoint::new("a", Vertex::new(0.0, 0.0)).with_order(0),
///     GroupedPoint::new("b", Vertex::new(5.0, 5.0)),
/// ];
/// let lines = reconstruct(pts, &ReconstructOptions::new("ID").order_by("SEQ"));
///
/// assert_eq!(lines.len(), 1);
/// assert_eq!(lines[0].first(), Vertex::new(0.0, 0.0));
/// ```
pub fn reconstruct<I>(points: I, opts: &ReconstructOptions) -> Vec<Polyline>
where
    I: IntoIterator<Item = GroupedPoint>,
{
    let groups = points.into_iter().collect::<PointGroups>();
    log::debug!(
        "reconstructing {} groups from {} points",
        groups.len(),
        groups.points()
    );
    groups.into_polylines(opts.order_field.is_some(), opts.link_field.is_some())
}
