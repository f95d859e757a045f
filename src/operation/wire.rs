//! JSON wire codec
//!
//! Values use their natural JSON form where one exists (strings, booleans,
//! `Long` and `Double` numbers). Every other kind is written as a typed
//! pair such as `["Integer", 5]` or `["FreqMap", {"a": 1}]`. Elements, seeds,
//! pairs and keyed groups are objects tagged by `"class"`.
//!
//! # Multi-valued input
//!
//! A two-element array whose first member is a string is ambiguous: it may
//! be one typed value (`["Long", 5]`) or a collection of two items
//! (`["a", "b"]`). Multi-valued inputs are decoded by trying, in order:
//!
//! 1. a strict singular decode, giving a collection of one
//! 2. a multi-valued decode of every array member
//! 3. the raw JSON, passed through unmodified

use crate::element::{DirectedType, Edge, Element, ElementSeed, Entity, Properties, Value, ValueKind};
use crate::operation::data::{Data, Item};
use crate::operation::error::{OperationError, OperationResult};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;
use tracing::{debug, warn};

fn wire(reason: impl Into<String>) -> OperationError {
    OperationError::Wire(reason.into())
}

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Boolean(b) => Json::Bool(*b),
        Value::Long(n) => json!(n),
        Value::Double(d) => json!(d),
        Value::String(s) => Json::String(s.clone()),
        Value::Integer(n) => json!(["Integer", n]),
        Value::Float(f) => json!(["Float", f]),
        Value::Bytes(b) => json!(["Bytes", b]),
        Value::FreqMap(m) => json!(["FreqMap", m]),
        Value::List(items) => json!(["List", items.iter().map(value_to_json).collect::<Vec<_>>()]),
    }
}

pub fn value_from_json(json: &Json) -> OperationResult<Value> {
    match json {
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Long(i)),
            None => n
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| wire(format!("number {} is out of range", n))),
        },
        Json::Array(parts) => typed_value(parts)?
            .ok_or_else(|| wire("arrays must be typed values such as [\"Integer\", 1]")),
        Json::Null => Err(wire("null is not a value")),
        Json::Object(_) => Err(wire("objects are not values")),
    }
}

/// Decode `[kind, payload]`. `Ok(None)` when the array is not a typed value.
fn typed_value(parts: &[Json]) -> OperationResult<Option<Value>> {
    let [Json::String(name), payload] = parts else {
        return Ok(None);
    };
    let Some(kind) = ValueKind::from_name(name) else {
        return Ok(None);
    };
    let mismatch = || wire(format!("'{}' is not a valid {} payload", payload, kind));

    let value = match kind {
        ValueKind::Boolean => Value::Boolean(payload.as_bool().ok_or_else(mismatch)?),
        ValueKind::Integer => {
            let n = payload.as_i64().ok_or_else(mismatch)?;
            Value::Integer(i32::try_from(n).map_err(|_| mismatch())?)
        }
        ValueKind::Long => Value::Long(payload.as_i64().ok_or_else(mismatch)?),
        ValueKind::Float => Value::Float(payload.as_f64().ok_or_else(mismatch)? as f32),
        ValueKind::Double => Value::Double(payload.as_f64().ok_or_else(mismatch)?),
        ValueKind::String => Value::String(payload.as_str().ok_or_else(mismatch)?.to_string()),
        ValueKind::Bytes => Value::Bytes(serde_json::from_value(payload.clone()).map_err(|_| mismatch())?),
        ValueKind::FreqMap => {
            let map: BTreeMap<String, i64> = serde_json::from_value(payload.clone()).map_err(|_| mismatch())?;
            Value::FreqMap(map)
        }
        ValueKind::List => {
            let items = payload.as_array().ok_or_else(mismatch)?;
            Value::List(items.iter().map(value_from_json).collect::<OperationResult<_>>()?)
        }
    };
    Ok(Some(value))
}

fn properties_to_json(properties: &Properties) -> Json {
    Json::Object(
        properties
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect(),
    )
}

pub fn element_to_json(element: &Element) -> Json {
    match element {
        Element::Entity(e) => json!({
            "class": "Entity",
            "group": e.group,
            "vertex": value_to_json(&e.vertex),
            "properties": properties_to_json(&e.properties),
        }),
        Element::Edge(e) => json!({
            "class": "Edge",
            "group": e.group,
            "source": value_to_json(&e.source),
            "destination": value_to_json(&e.destination),
            "directed": e.directed,
            "properties": properties_to_json(&e.properties),
        }),
    }
}

fn seed_to_json(seed: &ElementSeed) -> Json {
    match seed {
        ElementSeed::Entity { vertex } => json!({
            "class": "EntitySeed",
            "vertex": value_to_json(vertex),
        }),
        ElementSeed::Edge {
            source,
            destination,
            directed,
        } => json!({
            "class": "EdgeSeed",
            "source": value_to_json(source),
            "destination": value_to_json(destination),
            "directedType": directed,
        }),
    }
}

pub fn item_to_json(item: &Item) -> Json {
    match item {
        Item::Null => Json::Null,
        Item::Value(v) => value_to_json(v),
        Item::Element(e) => element_to_json(e),
        Item::Seed(s) => seed_to_json(s),
        Item::Pair(first, second) => json!({
            "class": "Pair",
            "first": item_to_json(first),
            "second": item_to_json(second),
        }),
        Item::Keyed { key, values } => json!({
            "class": "Keyed",
            "key": item_to_json(key),
            "values": values.iter().map(item_to_json).collect::<Vec<_>>(),
        }),
        Item::List(items) => Json::Array(items.iter().map(item_to_json).collect()),
        Item::Raw(json) => json.clone(),
    }
}

/// Render operation output; streams are drained
pub fn data_to_json(data: Data) -> Json {
    match data {
        Data::Empty => Json::Null,
        Data::Item(item) => item_to_json(&item),
        stream => Json::Array(stream.into_items().map(|i| item_to_json(&i)).collect()),
    }
}

fn field<'a>(object: &'a Map<String, Json>, class: &str, name: &str) -> OperationResult<&'a Json> {
    object
        .get(name)
        .ok_or_else(|| wire(format!("{} is missing '{}'", class, name)))
}

fn properties_from_json(object: &Map<String, Json>) -> OperationResult<Properties> {
    match object.get("properties") {
        None | Some(Json::Null) => Ok(Properties::new()),
        Some(Json::Object(props)) => props
            .iter()
            .map(|(k, v)| Ok((k.clone(), value_from_json(v)?)))
            .collect(),
        Some(other) => Err(wire(format!("properties must be an object, got {}", other))),
    }
}

fn object_from_json(object: &Map<String, Json>) -> OperationResult<Item> {
    let class = object
        .get("class")
        .and_then(Json::as_str)
        .ok_or_else(|| wire("objects must carry a \"class\""))?;
    // Accept fully qualified class names
    let class = class.rsplit('.').next().unwrap_or(class);

    let group = || -> OperationResult<String> {
        field(object, class, "group")?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| wire(format!("{} group must be a string", class)))
    };
    let value = |name: &str| -> OperationResult<Value> { value_from_json(field(object, class, name)?) };

    match class {
        "Entity" => Ok(Item::Element(Element::Entity(Entity {
            group: group()?,
            vertex: value("vertex")?,
            properties: properties_from_json(object)?,
        }))),
        "Edge" => Ok(Item::Element(Element::Edge(Edge {
            group: group()?,
            source: value("source")?,
            destination: value("destination")?,
            directed: object.get("directed").and_then(Json::as_bool).unwrap_or(false),
            properties: properties_from_json(object)?,
        }))),
        "EntitySeed" => Ok(Item::Seed(ElementSeed::Entity {
            vertex: value("vertex")?,
        })),
        "EdgeSeed" => {
            let directed = match (object.get("directedType"), object.get("directed")) {
                (Some(t), _) => serde_json::from_value(t.clone())?,
                (None, Some(Json::Bool(true))) => DirectedType::Directed,
                (None, Some(Json::Bool(false))) => DirectedType::Undirected,
                _ => DirectedType::Either,
            };
            Ok(Item::Seed(ElementSeed::Edge {
                source: value("source")?,
                destination: value("destination")?,
                directed,
            }))
        }
        "Pair" => Ok(Item::pair(
            item_from_json(field(object, class, "first")?)?,
            item_from_json(field(object, class, "second")?)?,
        )),
        "Keyed" => {
            let values = field(object, class, "values")?
                .as_array()
                .ok_or_else(|| wire("Keyed values must be an array"))?
                .iter()
                .map(item_from_json)
                .collect::<OperationResult<Vec<_>>>()?;
            Ok(Item::keyed(item_from_json(field(object, class, "key")?)?, values))
        }
        other => Err(wire(format!("unknown class '{}'", other))),
    }
}

/// Decode one item. Arrays that are not typed values become lists.
pub fn item_from_json(json: &Json) -> OperationResult<Item> {
    match json {
        Json::Null => Ok(Item::Null),
        Json::Object(object) => object_from_json(object),
        Json::Array(parts) => match typed_value(parts)? {
            Some(value) => Ok(Item::Value(value)),
            None => Ok(Item::List(parts.iter().map(item_from_json).collect::<OperationResult<_>>()?)),
        },
        scalar => Ok(Item::Value(value_from_json(scalar)?)),
    }
}

/// Decode exactly one object; arrays must be typed values
fn singular_from_json(json: &Json) -> OperationResult<Item> {
    match json {
        Json::Array(parts) => typed_value(parts)?
            .map(Item::Value)
            .ok_or_else(|| wire("not a single typed value")),
        other => item_from_json(other),
    }
}

/// Shape check for the first rung of the ladder
fn is_singular(json: &Json) -> bool {
    match json {
        Json::Array(parts) => parts.len() == 2 && parts[0].is_string(),
        _ => true,
    }
}

/// Decode a multi-valued input through the fallback ladder
pub fn decode_multi_input(json: Json) -> Data {
    if json.is_null() {
        return Data::Empty;
    }

    if is_singular(&json) {
        match singular_from_json(&json) {
            Ok(item) => return Data::list(vec![item]),
            Err(e) => debug!(error = %e, "Singular decode failed, trying multi-valued"),
        }
    }

    if let Json::Array(parts) = &json {
        match parts.iter().map(item_from_json).collect::<OperationResult<Vec<_>>>() {
            Ok(items) => return Data::list(items),
            Err(e) => debug!(error = %e, "Multi-valued decode failed"),
        }
    }

    warn!("Input could not be decoded, passing the raw value through");
    Data::Item(Item::Raw(json))
}

/// Decode a single input, falling back to the raw value
pub fn decode_single_input(json: Json) -> Data {
    if json.is_null() {
        return Data::Empty;
    }
    match item_from_json(&json) {
        Ok(item) => Data::Item(item),
        Err(e) => {
            warn!(error = %e, "Input could not be decoded, passing the raw value through");
            Data::Item(Item::Raw(json))
        }
    }
}

/// `deserialize_with` target for multi-valued inputs
pub fn multi_input<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Data, D::Error> {
    Json::deserialize(deserializer).map(decode_multi_input)
}

/// `deserialize_with` target for single inputs
pub fn single_input<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Data, D::Error> {
    Json::deserialize(deserializer).map(decode_single_input)
}

/// `deserialize_with` target for arbitrary item fields
pub fn item<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Item, D::Error> {
    let json = Json::deserialize(deserializer)?;
    item_from_json(&json).map_err(D::Error::custom)
}

/// Serde adapter for `Value` fields
pub mod value_json {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
        value_to_json(value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        let json = Json::deserialize(deserializer)?;
        value_from_json(&json).map_err(D::Error::custom)
    }
}

/// Serde adapter for `Vec<Value>` fields
pub mod values_json {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[Value], serializer: S) -> Result<S::Ok, S::Error> {
        Json::Array(values.iter().map(value_to_json).collect()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
        let json = Json::deserialize(deserializer)?;
        let Json::Array(parts) = json else {
            return Err(D::Error::custom("expected an array of values"));
        };
        parts
            .iter()
            .map(value_from_json)
            .collect::<OperationResult<_>>()
            .map_err(D::Error::custom)
    }
}
