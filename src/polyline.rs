use super::*;

/// A polyline rebuilt from a group of points.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polyline {
    vertices: Vec<Vertex>,
    /// The key shared by every point of the source group.
    pub group_key: AttrValue,
    /// Link value of the first point, when a link field is in use.
    pub from_attribute: Option<String>,
    /// Link value of the last point, when a link field is in use.
    pub to_attribute: Option<String>,
}

impl Polyline {
    pub fn new<I>(group_key: AttrValue, vertices: I) -> Result<Self, &'static str>
    where
        I: IntoIterator<Item = Vertex>,
    {
        let vertices = vertices.into_iter().collect::<Vec<_>>();
        if vertices.len() < 2 {
            Err("polyline requires 2 or more points to be valid")
        } else {
            Ok(Polyline {
                vertices,
                group_key,
                from_attribute: None,
                to_attribute: None,
            })
        }
    }

    pub fn with_attributes(self, from: Option<String>, to: Option<String>) -> Self {
        Self {
            from_attribute: from,
            to_attribute: to,
            ..self
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The first vertex. A polyline always has at least two.
    pub fn first(&self) -> Vertex {
        self.vertices[0]
    }

    pub fn last(&self) -> Vertex {
        self.vertices[self.vertices.len() - 1]
    }

    /// Planar length along the polyline.
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}

impl IntoIterator for Polyline {
    type Item = Vertex;
    type IntoIter = std::vec::IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.vertices.into_iter()
    }
}
