//! Simple (flattened, prompt-oriented) JSON lowering.
//!
//! Lossy by design: annotations collapse attribute values into a small
//! `{value, annotations}` wrapper only when present, containers flatten
//! straight into JSON object keys, and — in max-simple mode — a method or
//! endpoint with no attributes beyond its own signature compresses to a
//! single `def` string.

use crate::ast::*;
use serde_json::{json, Map, Value as Json};

pub fn to_json(system: &System) -> Json {
    lower_system(system, false)
}

pub fn to_max_simple_json(system: &System) -> Json {
    lower_system(system, true)
}

fn visibility_str(v: &Visibility) -> &'static str {
    match v {
        Visibility::Public => "public",
        Visibility::Private => "private",
        Visibility::Protected => "protected",
        Visibility::None => "none",
    }
}

fn style_str(s: &EndpointStyle) -> &'static str {
    match s {
        EndpointStyle::Http => "http",
        EndpointStyle::Grpc => "grpc",
    }
}

fn annotation_to_json(a: &Annotation) -> Json {
    json!({"name": a.name, "args": a.args})
}

fn attribute_value(a: &Attribute, max_simple: bool) -> Json {
    let value = lower_value(&a.value, max_simple);
    if a.annotations.is_empty() {
        value
    } else {
        json!({
            "value": value,
            "annotations": a.annotations.iter().map(annotation_to_json).collect::<Vec<_>>(),
        })
    }
}

fn flatten_attributes(map: &mut Map<String, Json>, attrs: &OrderedMap, max_simple: bool) {
    for attr in attrs {
        map.insert(attr.key.clone(), attribute_value(attr, max_simple));
    }
}

fn lower_value(v: &Value, max_simple: bool) -> Json {
    match v {
        Value::String(s) => json!(s),
        Value::Map(m) => {
            let mut obj = Map::new();
            flatten_attributes(&mut obj, m, max_simple);
            Json::Object(obj)
        }
        Value::List(items) => {
            Json::Array(items.iter().map(|i| lower_list_item(i, max_simple)).collect())
        }
        Value::Block(b) => lower_block(b, max_simple),
        Value::Endpoint(e) => lower_endpoint(e, max_simple),
        Value::Method(m) => lower_method(m, max_simple),
        Value::Field(f) => lower_field(f),
    }
}

fn lower_list_item(item: &ListItem, max_simple: bool) -> Json {
    match item {
        ListItem::Scalar(s) => json!(s),
        ListItem::Map(m) => {
            let mut obj = Map::new();
            flatten_attributes(&mut obj, m, max_simple);
            Json::Object(obj)
        }
        ListItem::Block(b) => lower_block(b, max_simple),
        ListItem::Field(f) => lower_field(f),
        ListItem::Method(m) => lower_method(m, max_simple),
        ListItem::Endpoint(e) => lower_endpoint(e, max_simple),
        ListItem::Annotated(inner, anns) => {
            let value = lower_list_item(inner, max_simple);
            json!({
                "value": value,
                "annotations": anns.iter().map(annotation_to_json).collect::<Vec<_>>(),
            })
        }
    }
}

fn lower_block(b: &Block, max_simple: bool) -> Json {
    let mut obj = Map::new();
    obj.insert("kind".to_string(), json!(b.kind));
    obj.insert("name".to_string(), json!(b.name));
    flatten_attributes(&mut obj, &b.attributes, max_simple);
    Json::Object(obj)
}

fn lower_field(f: &Field) -> Json {
    json!({
        "visibility": visibility_str(&f.visibility),
        "name": f.name,
        "type": f.type_string,
    })
}

/// A method's `def` header, as used in max-simple mode (e.g.
/// `"+GetUser(uuid string) -> User"`).
fn method_def(m: &Method) -> String {
    let marker = match m.visibility {
        Visibility::Public => "+",
        Visibility::Private => "-",
        Visibility::Protected => "#",
        Visibility::None => "",
    };
    format!("{}{}({}) -> {}", marker, m.name, m.params, m.returns)
}

fn lower_method(m: &Method, max_simple: bool) -> Json {
    if max_simple && m.attributes.is_empty() {
        return json!(method_def(m));
    }
    let mut obj = Map::new();
    obj.insert("visibility".to_string(), json!(visibility_str(&m.visibility)));
    obj.insert("name".to_string(), json!(m.name));
    obj.insert("params".to_string(), json!(m.params));
    obj.insert("returns".to_string(), json!(m.returns));
    if max_simple {
        obj.insert("def".to_string(), json!(method_def(m)));
    }
    if !m.attributes.is_empty() {
        let mut attrs = Map::new();
        flatten_attributes(&mut attrs, &m.attributes, max_simple);
        obj.insert("attributes".to_string(), Json::Object(attrs));
    }
    Json::Object(obj)
}

/// An endpoint's `def` header, e.g. `"GET /api/comments/{id} -> JSON{…}"` for
/// HTTP, or `"MethodName(request) -> response"` for RPC.
fn endpoint_def(e: &Endpoint) -> String {
    match e.style {
        EndpointStyle::Http => {
            if e.request_raw.is_empty() {
                format!("{} {} -> {}", e.method, e.path, e.response_raw)
            } else {
                format!("{} {} {} -> {}", e.method, e.path, e.request_raw, e.response_raw)
            }
        }
        EndpointStyle::Grpc => {
            format!("{}({}) -> {}", e.method, e.request_raw, e.response_raw)
        }
    }
}

fn lower_endpoint(e: &Endpoint, max_simple: bool) -> Json {
    if max_simple && e.attributes.is_empty() {
        return json!(endpoint_def(e));
    }
    let mut obj = Map::new();
    obj.insert("style".to_string(), json!(style_str(&e.style)));
    obj.insert("method".to_string(), json!(e.method));
    if e.style == EndpointStyle::Http {
        obj.insert("path".to_string(), json!(e.path));
    }
    obj.insert("request".to_string(), json!(e.request_raw));
    obj.insert("response".to_string(), json!(e.response_raw));
    if !e.inputs.is_empty() {
        obj.insert(
            "inputs".to_string(),
            json!(e
                .inputs
                .iter()
                .map(|f| json!({"name": f.name, "type": f.type_name}))
                .collect::<Vec<_>>()),
        );
    }
    if !e.outputs.is_empty() {
        obj.insert(
            "outputs".to_string(),
            json!(e
                .outputs
                .iter()
                .map(|o| json!({"name": o.name, "type": o.type_name, "optional": o.optional}))
                .collect::<Vec<_>>()),
        );
    }
    if max_simple {
        obj.insert("def".to_string(), json!(endpoint_def(e)));
    }
    if !e.attributes.is_empty() {
        let mut attrs = Map::new();
        flatten_attributes(&mut attrs, &e.attributes, max_simple);
        obj.insert("attributes".to_string(), Json::Object(attrs));
    }
    Json::Object(obj)
}

fn lower_service(s: &Service, max_simple: bool) -> Json {
    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(s.name));
    flatten_attributes(&mut obj, &s.attributes, max_simple);
    Json::Object(obj)
}

fn lower_system(sys: &System, max_simple: bool) -> Json {
    let mut obj = Map::new();
    flatten_attributes(&mut obj, &sys.attributes, max_simple);
    obj.insert(
        "services".to_string(),
        Json::Array(sys.services.iter().map(|s| lower_service(s, max_simple)).collect()),
    );
    Json::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser};

    fn parse_src(src: &str) -> System {
        parser::parse(lexer::tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn flattens_system_attributes_and_services() {
        let sys = parse_src("system { type: microservices  service s { langs: [go] } }");
        let json = to_json(&sys);
        assert_eq!(json["type"], "microservices");
        assert_eq!(json["services"][0]["name"], "s");
        assert_eq!(json["services"][0]["langs"][0], "go");
    }

    #[test]
    fn annotated_attribute_wraps_value() {
        let sys = parse_src("system { @Deprecated\n old: 1 }");
        let json = to_json(&sys);
        assert_eq!(json["old"]["value"], "1");
        assert_eq!(json["old"]["annotations"][0]["name"], "Deprecated");
    }

    #[test]
    fn plain_attribute_stays_bare() {
        let sys = parse_src("system { type: microservices }");
        let json = to_json(&sys);
        assert_eq!(json["type"], "microservices");
    }

    #[test]
    fn max_simple_compresses_method_with_no_attributes() {
        let sys = parse_src("system { service u { methods: [ +GetUser(uuid string) -> User ] } }");
        let json = to_max_simple_json(&sys);
        let methods = &json["services"][0]["methods"];
        assert_eq!(methods[0], "+GetUser(uuid string) -> User");
    }

    #[test]
    fn max_simple_keeps_def_alongside_attributes() {
        let sys = parse_src(
            "system { service u { methods: [ +GetUser(uuid string) -> User { timeout: 30s } ] } }",
        );
        let json = to_max_simple_json(&sys);
        let method = &json["services"][0]["methods"][0];
        assert_eq!(method["def"], "+GetUser(uuid string) -> User");
        assert_eq!(method["attributes"]["timeout"], "30s");
    }

    #[test]
    fn max_simple_compresses_http_endpoint() {
        let sys = parse_src(
            "system { service u { endpoints: [ GET /users/{id} -> JSON{name: str} ] } }",
        );
        let json = to_max_simple_json(&sys);
        let endpoints = &json["services"][0]["endpoints"];
        assert_eq!(endpoints[0], "GET /users/{id} -> JSON{name: str}");
    }
}
