use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifies a placed building (node) in the production graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Identifies a connection (directed link) between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// Identifies a resource kind in the catalog (`"ore"`, `"credits"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

/// Identifies a building kind in the catalog (`"oreMiner"`, `"smelter"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(ResourceId);
string_id!(BuildingId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId(7).to_string(), "node_7");
        assert_eq!(ConnectionId(3).to_string(), "conn_3");
    }

    #[test]
    fn string_ids_lookup_by_str() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ResourceId::new("ore"), 1.0);
        assert_eq!(map.get("ore"), Some(&1.0));
        assert!(map.get("metal").is_none());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&(NodeId(4), BuildingId::from("smelter"))).unwrap();
        assert_eq!(json, r#"[4,"smelter"]"#);
    }

    #[test]
    fn node_ids_order_numerically() {
        assert!(NodeId(2) < NodeId(10));
    }
}
