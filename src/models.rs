//! Core data models for wayfind
//!
//! These are the input documents handed to the analysis pipeline: the
//! circulation graph, wall obstacles, an optional greyscale floor raster,
//! the signage and landmark catalogs, and the origin/destination scenarios
//! to simulate. Everything here is plain serde data; the engines build
//! their own working structures from it.

use serde::{Deserialize, Serialize};

/// A 2D coordinate in the floor plan's frame (metres, or pixels when
/// sampled from a raster)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A wall, expressed as a line segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub start: Point,
    pub end: Point,
}

impl Obstacle {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }
}

/// A named position in the circulation graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x: None,
            y: None,
        }
    }

    pub fn at(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x: Some(x),
            y: Some(y),
        }
    }

    pub fn position(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        }
    }
}

/// An undirected, weighted connection (weight = walking distance in metres)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    #[serde(default = "default_edge_weight")]
    pub weight: f64,
}

fn default_edge_weight() -> f64 {
    1.0
}

impl EdgeSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>, weight: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            weight,
        }
    }
}

/// Serialized form of a circulation graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GraphSpec {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

/// Row-major greyscale floor plan. Bright pixels are walkable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorRaster {
    pub width: usize,
    pub height: usize,
    pub luminance: Vec<u8>,
}

/// Pixels brighter than this are free space
pub const FREE_SPACE_LUMINANCE: u8 = 128;

impl FloorRaster {
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.luminance.get(y * self.width + x).copied()
    }

    pub fn is_free(&self, x: usize, y: usize) -> bool {
        self.pixel(x, y)
            .map(|l| l > FREE_SPACE_LUMINANCE)
            .unwrap_or(false)
    }
}

/// Category of a wayfinding sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignageType {
    #[default]
    Directional,
    Identification,
    Informational,
    Regulatory,
    Landmark,
}

impl std::fmt::Display for SignageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignageType::Directional => write!(f, "directional"),
            SignageType::Identification => write!(f, "identification"),
            SignageType::Informational => write!(f, "informational"),
            SignageType::Regulatory => write!(f, "regulatory"),
            SignageType::Landmark => write!(f, "landmark"),
        }
    }
}

/// A sign placed at a circulation node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignageElement {
    pub node_id: String,
    #[serde(default, rename = "type")]
    pub signage_type: SignageType,
    #[serde(default)]
    pub font_size_mm: f64,
    #[serde(default)]
    pub contrast_ratio: f64,
    #[serde(default)]
    pub lighting_lux: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_zone: Option<String>,
    #[serde(default)]
    pub height_cm: f64,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub has_icons: bool,
    #[serde(default)]
    pub destinations: Vec<String>,
}

impl SignageElement {
    pub fn at(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            signage_type: SignageType::Directional,
            font_size_mm: 0.0,
            contrast_ratio: 0.0,
            lighting_lux: 0.0,
            color_zone: None,
            height_cm: 0.0,
            languages: Vec::new(),
            has_icons: false,
            destinations: Vec::new(),
        }
    }
}

/// A memorable feature that helps people orient themselves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub node_id: String,
    #[serde(default)]
    pub landmark_type: String,
    /// 0-1
    #[serde(default)]
    pub distinctiveness: f64,
    #[serde(default)]
    pub visibility_area: f64,
    #[serde(default)]
    pub color_uniqueness: f64,
}

impl Landmark {
    pub fn at(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            landmark_type: String::new(),
            distinctiveness: 0.0,
            visibility_area: 0.0,
            color_uniqueness: 0.0,
        }
    }
}

/// A named origin/destination journey to simulate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub origin: String,
    pub destination: String,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            destination: destination.into(),
        }
    }

    /// Journeys simulated when the input names none
    pub fn defaults() -> Vec<Scenario> {
        ["emergency", "radiology", "pharmacy"]
            .iter()
            .map(|dest| Scenario::new(format!("entrance_to_{dest}"), "entrance", *dest))
            .collect()
    }
}

/// Everything one analysis run consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisInput {
    pub graph: GraphSpec,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster: Option<FloorRaster>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixels_per_meter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_points: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrances: Option<Vec<String>>,
    #[serde(default)]
    pub signage: Vec<SignageElement>,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    /// Composite signage quality (0-100) from the signage collaborator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signage_score: Option<f64>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

impl AnalysisInput {
    /// Scenarios to simulate, falling back to the default hospital journeys
    pub fn effective_scenarios(&self) -> Vec<Scenario> {
        if self.scenarios.is_empty() {
            Scenario::defaults()
        } else {
            self.scenarios.clone()
        }
    }

    /// A small hospital ground floor used by `wayfind sample` and the tests
    pub fn sample_hospital() -> Self {
        let nodes = vec![
            NodeSpec::at("entrance", 2.0, 20.0),
            NodeSpec::at("node_1", 12.0, 20.0),
            NodeSpec::at("node_2", 20.0, 30.0),
            NodeSpec::at("node_3", 22.0, 12.0),
            NodeSpec::at("node_4", 32.0, 12.0),
            NodeSpec::at("emergency", 28.0, 34.0),
            NodeSpec::at("radiology", 40.0, 4.0),
            NodeSpec::at("pharmacy", 46.0, 14.0),
            NodeSpec::at("reception", 22.0, 35.0),
        ];
        let edges = vec![
            EdgeSpec::new("entrance", "node_1", 10.0),
            EdgeSpec::new("node_1", "node_2", 15.0),
            EdgeSpec::new("node_1", "node_3", 12.0),
            EdgeSpec::new("node_2", "emergency", 8.0),
            EdgeSpec::new("node_2", "reception", 5.0),
            EdgeSpec::new("node_3", "radiology", 20.0),
            EdgeSpec::new("node_3", "node_4", 10.0),
            EdgeSpec::new("node_4", "pharmacy", 15.0),
        ];

        let wall = |x1: f64, y1: f64, x2: f64, y2: f64| {
            Obstacle::new(Point::new(x1, y1), Point::new(x2, y2))
        };
        let obstacles = vec![
            // outer shell, 50 x 40
            wall(0.0, 0.0, 50.0, 0.0),
            wall(50.0, 0.0, 50.0, 40.0),
            wall(50.0, 40.0, 0.0, 40.0),
            wall(0.0, 40.0, 0.0, 0.0),
            // emergency / reception wing
            wall(16.0, 26.0, 36.0, 26.0),
            wall(36.0, 26.0, 36.0, 40.0),
            // imaging block
            wall(26.0, 8.0, 50.0, 8.0),
            wall(26.0, 0.0, 26.0, 4.0),
            // pharmacy counter
            wall(40.0, 16.0, 40.0, 24.0),
        ];

        let mut signage = SignageElement::at("node_1");
        signage.font_size_mm = 75.0;
        signage.contrast_ratio = 7.0;
        signage.lighting_lux = 300.0;
        signage.languages = vec!["en".to_string(), "ar".to_string()];
        signage.has_icons = true;
        signage.destinations = vec!["emergency".to_string(), "radiology".to_string()];

        let mut landmark = Landmark::at("reception");
        landmark.landmark_type = "desk".to_string();
        landmark.distinctiveness = 0.8;
        landmark.visibility_area = 120.0;
        landmark.color_uniqueness = 0.6;

        Self {
            graph: GraphSpec { nodes, edges },
            obstacles,
            raster: None,
            pixels_per_meter: Some(1.0),
            decision_points: None,
            entrances: None,
            signage: vec![signage],
            landmarks: vec![landmark],
            signage_score: Some(68.0),
            scenarios: Scenario::defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_free_space_threshold() {
        let raster = FloorRaster {
            width: 2,
            height: 1,
            luminance: vec![128, 129],
        };
        assert!(!raster.is_free(0, 0));
        assert!(raster.is_free(1, 0));
        assert!(!raster.is_free(2, 0));
    }

    #[test]
    fn test_default_scenarios() {
        let scenarios = Scenario::defaults();
        assert_eq!(scenarios.len(), 3);
        assert_eq!(scenarios[0].name, "entrance_to_emergency");
        assert!(scenarios.iter().all(|s| s.origin == "entrance"));
    }

    #[test]
    fn test_input_deserializes_with_defaults() {
        let json = r#"{
            "graph": {
                "nodes": [{"id": "a"}, {"id": "b", "x": 1.0, "y": 2.0}],
                "edges": [{"from": "a", "to": "b"}]
            },
            "signage": [{"node_id": "a", "type": "landmark"}]
        }"#;
        let input: AnalysisInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.graph.edges[0].weight, 1.0);
        assert_eq!(input.graph.nodes[1].position(), Some(Point::new(1.0, 2.0)));
        assert_eq!(input.signage[0].signage_type, SignageType::Landmark);
        assert!(input.scenarios.is_empty());
        assert_eq!(input.effective_scenarios().len(), 3);
    }
}
