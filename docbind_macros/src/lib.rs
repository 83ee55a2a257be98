mod schematic;

use proc_macro::TokenStream;

/// Derive macro binding a serde type to a collection.
///
/// Implements `docbind::Schematic` for a struct with named fields.
///
/// # Attributes
///
/// - `#[document(collection = "...")]` on the struct picks the collection.
///   Without it the collection is the snake_case struct name plus `s`.
/// - `#[document(unique)]` on a field declares it unique. The stored field
///   name follows `#[serde(rename = "...")]` when present.
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Schematic)]
/// #[document(collection = "users")]
/// struct User {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<String>,
///     #[document(unique)]
///     email: String,
/// }
/// ```
#[proc_macro_derive(Schematic, attributes(document))]
pub fn derive_schematic(input: TokenStream) -> TokenStream {
    schematic::derive_schematic(input)
}
