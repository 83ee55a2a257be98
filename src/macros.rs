/// Builds a [`Document`] from a JSON object literal.
///
/// ```ignore
/// let user = doc! { "_id": "u1", "name": "Ada", "tags": ["admin"] };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($tt:tt)+) => {
        match $crate::__serde_json::json!({ $($tt)+ }) {
            $crate::__serde_json::Value::Object(map) => map,
            _ => unreachable!("object literal always yields an object"),
        }
    };
}
