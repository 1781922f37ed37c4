//! Success responses for generated routes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Remove `fields` from an object, or from every object in an array.
pub fn strip_fields(value: &mut Value, fields: &[String]) {
    if fields.is_empty() {
        return;
    }
    match value {
        Value::Object(map) => {
            for f in fields {
                map.remove(f);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                strip_fields(item, fields);
            }
        }
        _ => {}
    }
}

/// 200 with the adapter's data, minus stripped fields.
pub fn ok(mut data: Value, remove: &[String]) -> Response {
    strip_fields(&mut data, remove);
    (StatusCode::OK, Json(data)).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_objects_and_arrays() {
        let remove = vec!["password".to_string()];
        let mut one = json!({ "name": "alice", "password": "x" });
        strip_fields(&mut one, &remove);
        assert_eq!(one, json!({ "name": "alice" }));

        let mut many = json!([{ "name": "a", "password": "x" }, { "name": "b" }, 3]);
        strip_fields(&mut many, &remove);
        assert_eq!(many, json!([{ "name": "a" }, { "name": "b" }, 3]));
    }
}
