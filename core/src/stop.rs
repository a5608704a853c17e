use serde::Serialize;

/// A transit route serving one or more stops.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Route {
    pub id: String,
    pub name: Option<String>,
}

impl Route {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

const NAME_SEPARATOR: &str = " / ";

/// A physical stop, index-aligned with a graph node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub routes: Vec<Route>,
}

impl Stop {
    pub fn new(
        id: impl ToString,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        routes: Vec<Route>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.into(),
            latitude,
            longitude,
            routes,
        }
    }

    /// Placeholder stop for graphs built without stop metadata.
    pub fn placeholder(index: usize) -> Self {
        Self::new(index, format!("Stop {}", index), 0.0, 0.0, Vec::new())
    }

    /// Combine two stops into the synthetic stop that replaces them.
    ///
    /// Ids join with `-`. Names join with ` / `, skipping any name part
    /// already present, so chained merges of same-named stops keep a single
    /// name. Coordinates are the midpoint; routes are the union in
    /// first-seen order.
    pub fn merge_with(&self, other: &Stop) -> Stop {
        let mut name = self.name.clone();
        for part in other.name.split(NAME_SEPARATOR) {
            if !name.split(NAME_SEPARATOR).any(|existing| existing == part) {
                name.push_str(NAME_SEPARATOR);
                name.push_str(part);
            }
        }

        let mut routes = self.routes.clone();
        for route in &other.routes {
            if !routes.iter().any(|r| r.id == route.id) {
                routes.push(route.clone());
            }
        }

        Stop {
            id: format!("{}-{}", self.id, other.id),
            name,
            latitude: (self.latitude + other.latitude) / 2.0,
            longitude: (self.longitude + other.longitude) / 2.0,
            routes,
        }
    }
}
