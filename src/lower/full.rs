//! Full (tagged, round-trippable) JSON lowering.
//!
//! Every AST node becomes a JSON object carrying a `__type__` discriminator.
//! Ordered containers (`OrderedMap`, list bodies) are rendered as JSON
//! *arrays* rather than objects — a `serde_json::Map` does not promise key
//! order on its own, and source order is precisely what this lowering is
//! required to preserve.

use crate::ast::*;
use crate::error::LowerError;
use serde_json::{json, Value as Json};

pub fn to_json(system: &System) -> Json {
    system_to_json(system)
}

fn annotation_to_json(a: &Annotation) -> Json {
    json!({
        "__type__": "Annotation",
        "name": a.name,
        "args": a.args,
    })
}

fn annotations_to_json(anns: &[Annotation]) -> Json {
    Json::Array(anns.iter().map(annotation_to_json).collect())
}

fn attribute_to_json(a: &Attribute) -> Json {
    json!({
        "__type__": "Attribute",
        "key": a.key,
        "value": value_to_json(&a.value),
        "annotations": annotations_to_json(&a.annotations),
    })
}

fn ordered_map_to_json(m: &OrderedMap) -> Json {
    Json::Array(m.iter().map(attribute_to_json).collect())
}

fn visibility_str(v: &Visibility) -> &'static str {
    match v {
        Visibility::Public => "public",
        Visibility::Private => "private",
        Visibility::Protected => "protected",
        Visibility::None => "none",
    }
}

fn visibility_from_str(s: &str) -> Result<Visibility, LowerError> {
    match s {
        "public" => Ok(Visibility::Public),
        "private" => Ok(Visibility::Private),
        "protected" => Ok(Visibility::Protected),
        "none" => Ok(Visibility::None),
        other => Err(LowerError::Malformed(format!("unknown visibility {:?}", other))),
    }
}

fn style_str(s: &EndpointStyle) -> &'static str {
    match s {
        EndpointStyle::Http => "http",
        EndpointStyle::Grpc => "grpc",
    }
}

fn style_from_str(s: &str) -> Result<EndpointStyle, LowerError> {
    match s {
        "http" => Ok(EndpointStyle::Http),
        "grpc" => Ok(EndpointStyle::Grpc),
        other => Err(LowerError::Malformed(format!("unknown endpoint style {:?}", other))),
    }
}

fn value_to_json(v: &Value) -> Json {
    match v {
        Value::String(s) => json!(s),
        Value::Map(m) => json!({"__type__": "Map", "entries": ordered_map_to_json(m)}),
        Value::List(items) => json!({"__type__": "List", "items": list_items_to_json(items)}),
        Value::Block(b) => block_to_json(b),
        Value::Endpoint(e) => endpoint_to_json(e),
        Value::Method(m) => method_to_json(m),
        Value::Field(f) => field_to_json(f),
    }
}

fn list_items_to_json(items: &[ListItem]) -> Json {
    Json::Array(items.iter().map(list_item_to_json).collect())
}

fn list_item_to_json(item: &ListItem) -> Json {
    match item {
        ListItem::Scalar(s) => json!({"__type__": "Scalar", "value": s}),
        ListItem::Map(m) => json!({"__type__": "Map", "entries": ordered_map_to_json(m)}),
        ListItem::Block(b) => block_to_json(b),
        ListItem::Field(f) => field_to_json(f),
        ListItem::Method(m) => method_to_json(m),
        ListItem::Endpoint(e) => endpoint_to_json(e),
        ListItem::Annotated(inner, anns) => json!({
            "__type__": "Annotated",
            "annotations": annotations_to_json(anns),
            "item": list_item_to_json(inner),
        }),
    }
}

fn block_to_json(b: &Block) -> Json {
    json!({
        "__type__": "Block",
        "kind": b.kind,
        "name": b.name,
        "attributes": ordered_map_to_json(&b.attributes),
        "annotations": annotations_to_json(&b.annotations),
    })
}

fn field_to_json(f: &Field) -> Json {
    json!({
        "__type__": "Field",
        "visibility": visibility_str(&f.visibility),
        "name": f.name,
        "type": f.type_string,
        "annotations": annotations_to_json(&f.annotations),
    })
}

fn method_to_json(m: &Method) -> Json {
    json!({
        "__type__": "Method",
        "visibility": visibility_str(&m.visibility),
        "name": m.name,
        "params": m.params,
        "returns": m.returns,
        "attributes": ordered_map_to_json(&m.attributes),
        "annotations": annotations_to_json(&m.annotations),
    })
}

fn shape_field_to_json(f: &ShapeField) -> Json {
    json!({"name": f.name, "type": f.type_name})
}

fn shape_output_to_json(o: &ShapeOutput) -> Json {
    json!({"name": o.name, "type": o.type_name, "optional": o.optional})
}

fn endpoint_to_json(e: &Endpoint) -> Json {
    json!({
        "__type__": "Endpoint",
        "style": style_str(&e.style),
        "method": e.method,
        "path": e.path,
        "request": e.request_raw,
        "response": e.response_raw,
        "inputs": e.inputs.iter().map(shape_field_to_json).collect::<Vec<_>>(),
        "outputs": e.outputs.iter().map(shape_output_to_json).collect::<Vec<_>>(),
        "attributes": ordered_map_to_json(&e.attributes),
        "annotations": annotations_to_json(&e.annotations),
    })
}

fn service_to_json(s: &Service) -> Json {
    json!({
        "__type__": "Service",
        "name": s.name,
        "attributes": ordered_map_to_json(&s.attributes),
        "annotations": annotations_to_json(&s.annotations),
    })
}

fn system_to_json(sys: &System) -> Json {
    json!({
        "__type__": "System",
        "attributes": ordered_map_to_json(&sys.attributes),
        "services": sys.services.iter().map(service_to_json).collect::<Vec<_>>(),
    })
}

// --- Reverse pass (round-trip back to the AST) ---

fn expect_type<'a>(obj: &'a serde_json::Map<String, Json>, want: &str) -> Result<(), LowerError> {
    match obj.get("__type__").and_then(Json::as_str) {
        Some(t) if t == want => Ok(()),
        Some(t) => Err(LowerError::Malformed(format!("expected __type__ {:?}, found {:?}", want, t))),
        None => Err(LowerError::Malformed(format!("missing __type__, expected {:?}", want))),
    }
}

fn as_obj(v: &Json) -> Result<&serde_json::Map<String, Json>, LowerError> {
    v.as_object().ok_or_else(|| LowerError::Malformed("expected a JSON object".to_string()))
}

fn as_arr(v: &Json) -> Result<&Vec<Json>, LowerError> {
    v.as_array().ok_or_else(|| LowerError::Malformed("expected a JSON array".to_string()))
}

fn as_str(v: &Json) -> Result<String, LowerError> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| LowerError::Malformed("expected a JSON string".to_string()))
}

fn field_of<'a>(obj: &'a serde_json::Map<String, Json>, key: &str) -> Result<&'a Json, LowerError> {
    obj.get(key).ok_or_else(|| LowerError::Malformed(format!("missing field {:?}", key)))
}

fn annotations_from_json(v: &Json) -> Result<Vec<Annotation>, LowerError> {
    as_arr(v)?
        .iter()
        .map(|a| {
            let obj = as_obj(a)?;
            expect_type(obj, "Annotation")?;
            let name = as_str(field_of(obj, "name")?)?;
            let args = as_arr(field_of(obj, "args")?)?
                .iter()
                .map(as_str)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Annotation { name, args })
        })
        .collect()
}

fn ordered_map_from_json(v: &Json) -> Result<OrderedMap, LowerError> {
    as_arr(v)?
        .iter()
        .map(|entry| {
            let obj = as_obj(entry)?;
            expect_type(obj, "Attribute")?;
            let key = as_str(field_of(obj, "key")?)?;
            let value = value_from_json(field_of(obj, "value")?)?;
            let annotations = match obj.get("annotations") {
                Some(a) => annotations_from_json(a)?,
                None => Vec::new(),
            };
            Ok(Attribute { key, value, annotations })
        })
        .collect()
}

fn value_from_json(v: &Json) -> Result<Value, LowerError> {
    match v {
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => Ok(Value::String(n.to_string())),
        Json::Bool(b) => Ok(Value::String(b.to_string())),
        Json::Object(obj) => match obj.get("__type__").and_then(Json::as_str) {
            Some("Map") => Ok(Value::Map(ordered_map_from_json(field_of(obj, "entries")?)?)),
            Some("List") => Ok(Value::List(list_items_from_json(field_of(obj, "items")?)?)),
            Some("Block") => Ok(Value::Block(block_from_json(obj)?)),
            Some("Endpoint") => Ok(Value::Endpoint(endpoint_from_json(obj)?)),
            Some("Method") => Ok(Value::Method(method_from_json(obj)?)),
            Some("Field") => Ok(Value::Field(field_from_json(obj)?)),
            other => Err(LowerError::Malformed(format!("unexpected value __type__ {:?}", other))),
        },
        other => Err(LowerError::Malformed(format!("unsupported value JSON {:?}", other))),
    }
}

fn list_items_from_json(v: &Json) -> Result<Vec<ListItem>, LowerError> {
    as_arr(v)?.iter().map(list_item_from_json).collect()
}

fn list_item_from_json(v: &Json) -> Result<ListItem, LowerError> {
    let obj = as_obj(v)?;
    match obj.get("__type__").and_then(Json::as_str) {
        Some("Scalar") => Ok(ListItem::Scalar(as_str(field_of(obj, "value")?)?)),
        Some("Map") => Ok(ListItem::Map(ordered_map_from_json(field_of(obj, "entries")?)?)),
        Some("Block") => Ok(ListItem::Block(block_from_json(obj)?)),
        Some("Field") => Ok(ListItem::Field(field_from_json(obj)?)),
        Some("Method") => Ok(ListItem::Method(method_from_json(obj)?)),
        Some("Endpoint") => Ok(ListItem::Endpoint(endpoint_from_json(obj)?)),
        Some("Annotated") => {
            let annotations = annotations_from_json(field_of(obj, "annotations")?)?;
            let inner = list_item_from_json(field_of(obj, "item")?)?;
            Ok(ListItem::Annotated(Box::new(inner), annotations))
        }
        other => Err(LowerError::Malformed(format!("unexpected list item __type__ {:?}", other))),
    }
}

fn block_from_json(obj: &serde_json::Map<String, Json>) -> Result<Block, LowerError> {
    expect_type(obj, "Block")?;
    Ok(Block {
        kind: as_str(field_of(obj, "kind")?)?,
        name: as_str(field_of(obj, "name")?)?,
        attributes: ordered_map_from_json(field_of(obj, "attributes")?)?,
        annotations: annotations_from_json(field_of(obj, "annotations")?)?,
    })
}

fn field_from_json(obj: &serde_json::Map<String, Json>) -> Result<Field, LowerError> {
    expect_type(obj, "Field")?;
    Ok(Field {
        visibility: visibility_from_str(&as_str(field_of(obj, "visibility")?)?)?,
        name: as_str(field_of(obj, "name")?)?,
        type_string: as_str(field_of(obj, "type")?)?,
        annotations: annotations_from_json(field_of(obj, "annotations")?)?,
    })
}

fn method_from_json(obj: &serde_json::Map<String, Json>) -> Result<Method, LowerError> {
    expect_type(obj, "Method")?;
    Ok(Method {
        visibility: visibility_from_str(&as_str(field_of(obj, "visibility")?)?)?,
        name: as_str(field_of(obj, "name")?)?,
        params: as_str(field_of(obj, "params")?)?,
        returns: as_str(field_of(obj, "returns")?)?,
        attributes: ordered_map_from_json(field_of(obj, "attributes")?)?,
        annotations: annotations_from_json(field_of(obj, "annotations")?)?,
    })
}

/// `inputs`/`outputs` are re-derived by the endpoint enricher rather than
/// trusted verbatim, so the round trip exercises the same enrichment logic
/// a fresh parse would (and stays correct if `request`/`response` and
/// `inputs`/`outputs` ever drift out of sync in hand-edited JSON).
fn endpoint_from_json(obj: &serde_json::Map<String, Json>) -> Result<Endpoint, LowerError> {
    expect_type(obj, "Endpoint")?;
    let path = as_str(field_of(obj, "path")?)?;
    let request_raw = as_str(field_of(obj, "request")?)?;
    let response_raw = as_str(field_of(obj, "response")?)?;
    let request_shape = crate::enrich::parse_shape(&request_raw);
    let response_shape = crate::enrich::parse_shape(&response_raw);
    let inputs = crate::enrich::derive_inputs(request_shape.as_ref(), &path);
    let outputs = crate::enrich::derive_outputs(response_shape.as_ref());
    Ok(Endpoint {
        style: style_from_str(&as_str(field_of(obj, "style")?)?)?,
        method: as_str(field_of(obj, "method")?)?,
        path,
        request_raw,
        response_raw,
        request_shape,
        response_shape,
        inputs,
        outputs,
        attributes: ordered_map_from_json(field_of(obj, "attributes")?)?,
        annotations: annotations_from_json(field_of(obj, "annotations")?)?,
    })
}

fn service_from_json(v: &Json) -> Result<Service, LowerError> {
    let obj = as_obj(v)?;
    expect_type(obj, "Service")?;
    Ok(Service {
        name: as_str(field_of(obj, "name")?)?,
        attributes: ordered_map_from_json(field_of(obj, "attributes")?)?,
        annotations: annotations_from_json(field_of(obj, "annotations")?)?,
    })
}

/// Reconstructs a [`System`] from full JSON. Intended to be the exact
/// inverse of [`to_json`] for any JSON it actually produced.
pub fn from_full_json(v: &Json) -> Result<System, LowerError> {
    let obj = as_obj(v)?;
    expect_type(obj, "System")?;
    Ok(System {
        attributes: ordered_map_from_json(field_of(obj, "attributes")?)?,
        services: as_arr(field_of(obj, "services")?)?
            .iter()
            .map(service_from_json)
            .collect::<Result<Vec<_>, _>>()?,
    })
}
