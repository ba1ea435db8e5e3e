//! Earth Engine value graphs and the lazy handles built on top of them.
//!
//! Nothing here talks to the network: loading, renaming, mosaicking and
//! clipping only grow an expression tree that the platform evaluates when a
//! value is computed or an export is started.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// One node of an Earth Engine value graph
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Constant(Value),
    Invocation {
        function_name: String,
        arguments: BTreeMap<String, ValueNode>,
    },
}

impl ValueNode {
    pub fn constant(value: impl Into<Value>) -> Self {
        ValueNode::Constant(value.into())
    }

    pub fn invoke<'a>(
        function_name: &str,
        arguments: impl IntoIterator<Item = (&'a str, ValueNode)>,
    ) -> Self {
        ValueNode::Invocation {
            function_name: function_name.to_string(),
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        match self {
            ValueNode::Invocation { function_name, .. } => Some(function_name),
            ValueNode::Constant(_) => None,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&ValueNode> {
        match self {
            ValueNode::Invocation { arguments, .. } => arguments.get(name),
            ValueNode::Constant(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            ValueNode::Constant(v) => Some(v),
            ValueNode::Invocation { .. } => None,
        }
    }

    /// Wire form of the node, as found inside `Expression.values`
    pub fn to_json(&self) -> Value {
        match self {
            ValueNode::Constant(v) => json!({ "constantValue": v }),
            ValueNode::Invocation {
                function_name,
                arguments,
            } => {
                let args: Map<String, Value> = arguments
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                json!({
                    "functionInvocationValue": {
                        "functionName": function_name,
                        "arguments": args,
                    }
                })
            }
        }
    }

    /// Full `Expression` message with this node as its result
    pub fn to_expression(&self) -> Value {
        json!({
            "result": "0",
            "values": { "0": self.to_json() },
        })
    }
}

impl Serialize for ValueNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Lazy image handle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    /// Human-readable provenance, used in logs
    pub label: String,
    pub node: ValueNode,
}

impl Image {
    pub fn load(image_id: &str) -> Self {
        Image {
            label: image_id.to_string(),
            node: ValueNode::invoke("Image.load", [("id", ValueNode::constant(image_id))]),
        }
    }

    pub fn rename(&self, names: &[&str]) -> Self {
        Image {
            label: format!("{}.rename({})", self.label, names.join(",")),
            node: ValueNode::invoke(
                "Image.rename",
                [
                    ("input", self.node.clone()),
                    ("names", ValueNode::constant(names.to_vec())),
                ],
            ),
        }
    }

    pub fn select(&self, band: &str) -> Self {
        Image {
            label: format!("{}.select({})", self.label, band),
            node: ValueNode::invoke(
                "Image.select",
                [
                    ("input", self.node.clone()),
                    ("bandSelectors", ValueNode::constant(vec![band])),
                ],
            ),
        }
    }

    pub fn clip(&self, region: &Region) -> Self {
        Image {
            label: format!("{}.clip({})", self.label, region.table_id),
            node: ValueNode::invoke(
                "Image.clip",
                [("input", self.node.clone()), ("geometry", region.geometry())],
            ),
        }
    }

    /// Expression evaluating to this image's projection
    pub fn projection(&self) -> ValueNode {
        ValueNode::invoke("Image.projection", [("image", self.node.clone())])
    }
}

/// Lazy image collection handle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageCollection {
    pub id: String,
    pub node: ValueNode,
}

impl ImageCollection {
    pub fn load(collection_id: &str) -> Self {
        ImageCollection {
            id: collection_id.to_string(),
            node: ValueNode::invoke(
                "ImageCollection.load",
                [("id", ValueNode::constant(collection_id))],
            ),
        }
    }

    /// Composite the collection into one image; overlap precedence is the platform's
    pub fn mosaic(&self) -> Image {
        Image {
            label: format!("{}.mosaic()", self.id),
            node: ValueNode::invoke("ImageCollection.mosaic", [("collection", self.node.clone())]),
        }
    }
}

/// Clipping boundary of an export: a feature collection asset whose union
/// geometry bounds the output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    #[serde(rename = "asset")]
    pub table_id: String,
}

impl Region {
    pub fn asset(table_id: &str) -> Self {
        Region {
            table_id: table_id.to_string(),
        }
    }

    /// Expression evaluating to the boundary geometry
    pub fn geometry(&self) -> ValueNode {
        ValueNode::invoke(
            "Collection.geometry",
            [(
                "collection",
                ValueNode::invoke(
                    "Collection.loadTable",
                    [("tableId", ValueNode::constant(self.table_id.as_str()))],
                ),
            )],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mosaic_expression() {
        let image = ImageCollection::load("projects/sat-io/lulc").mosaic();
        let expr = image.node.to_expression();
        assert_eq!(expr["result"], "0");
        let root = &expr["values"]["0"]["functionInvocationValue"];
        assert_eq!(root["functionName"], "ImageCollection.mosaic");
        let inner = &root["arguments"]["collection"]["functionInvocationValue"];
        assert_eq!(inner["functionName"], "ImageCollection.load");
        assert_eq!(inner["arguments"]["id"]["constantValue"], "projects/sat-io/lulc");
    }

    #[test]
    fn test_rename_then_select() {
        let image = Image::load("projects/p/assets/elev").rename(&["elevation"]).select("elevation");
        assert_eq!(image.node.function_name(), Some("Image.select"));
        let input = image.node.argument("input").unwrap();
        assert_eq!(input.function_name(), Some("Image.rename"));
        assert_eq!(
            input.argument("names").unwrap().as_constant(),
            Some(&json!(["elevation"]))
        );
        assert_eq!(image.projection().function_name(), Some("Image.projection"));
    }

    #[test]
    fn test_region_asset_geometry() {
        let region = Region::asset("projects/p/assets/area");
        let node = region.geometry();
        assert_eq!(node.function_name(), Some("Collection.geometry"));
        let table = node.argument("collection").unwrap();
        assert_eq!(table.function_name(), Some("Collection.loadTable"));
        assert_eq!(
            serde_json::to_value(&region).unwrap(),
            json!({"asset": "projects/p/assets/area"})
        );
    }
}
