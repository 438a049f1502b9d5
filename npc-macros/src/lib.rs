//! Proc macros for NPC tool schemas.
//!
//! Provides `#[derive(Tool)]`, which turns an argument struct into a
//! function-tool declaration for the chat-completions API.
//!
//! # Example
//!
//! ```ignore
//! /// Make the NPC walk to a named object
//! #[derive(Tool, Deserialize)]
//! #[tool(name = "move_to_object")]
//! struct MoveToObject {
//!     /// The name of the object to move to
//!     #[serde(rename = "objectName")]
//!     object_name: String,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field, Lit, Meta, Type};

/// Derive macro for generating tool declarations.
///
/// # Attributes
///
/// - `#[tool(name = "...")]` - Override the tool name (defaults to snake_case struct name)
/// - `#[tool(optional)]` on fields - Mark field as optional in JSON schema
/// - `#[tool(rename = "...")]` on fields - Override field name in schema
///
/// A field's `#[serde(rename = "...")]` is honored when no `tool(rename)` is
/// given, so the schema and the argument decoder agree on the wire name.
#[proc_macro_derive(Tool, attributes(tool))]
pub fn derive_tool(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_tool(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand_tool(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    let tool_name = get_tool_name(&input)?;
    let description = get_doc_comment(&input.attrs);

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            syn::Fields::Unit => Vec::new(),
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Tool derive only supports unit structs or structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(input, "Tool derive only supports structs")),
    };

    let mut property_tokens = Vec::new();
    let mut required_fields = Vec::new();

    for field in fields {
        let field_name_str = get_field_name(field)?;
        let field_desc = get_doc_comment(&field.attrs);
        let is_optional = is_field_optional(field);
        let field_type = &field.ty;

        let type_schema = type_to_schema(field_type)?;

        let desc_token = if field_desc.is_empty() {
            quote! {}
        } else {
            quote! { property["description"] = serde_json::json!(#field_desc); }
        };

        property_tokens.push(quote! {
            {
                let mut property = #type_schema;
                #desc_token
                properties.insert(#field_name_str.to_string(), property);
            }
        });

        if !is_optional && !is_option_type(field_type) {
            required_fields.push(field_name_str);
        }
    }

    let required_array: Vec<_> = required_fields.iter().map(|s| quote! { #s }).collect();

    Ok(quote! {
        impl #struct_name {
            /// Get the tool name.
            pub fn tool_name() -> &'static str {
                #tool_name
            }

            /// Get the tool description.
            pub fn tool_description() -> &'static str {
                #description
            }

            /// Generate the JSON schema for this tool's parameters.
            #[allow(unused_mut)]
            pub fn parameters_schema() -> serde_json::Value {
                let mut properties = serde_json::Map::new();
                #(#property_tokens)*

                let required: Vec<&str> = vec![#(#required_array),*];

                serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required
                })
            }

            /// Create a Tool definition for use with the Groq API.
            pub fn as_tool() -> groq::Tool {
                groq::Tool {
                    name: Self::tool_name().to_string(),
                    description: Self::tool_description().to_string(),
                    parameters: Self::parameters_schema(),
                }
            }
        }
    })
}

fn get_tool_name(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if attr.path().is_ident("tool") {
            let meta = attr.parse_args::<Meta>()?;
            if let Some(name) = name_value(&meta, "name") {
                return Ok(name);
            }
        }
    }

    Ok(to_snake_case(&input.ident.to_string()))
}

fn get_field_name(field: &Field) -> syn::Result<String> {
    let mut serde_name = None;

    for attr in &field.attrs {
        let Ok(meta) = attr.parse_args::<Meta>() else {
            continue;
        };
        if attr.path().is_ident("tool") {
            if let Some(name) = name_value(&meta, "rename") {
                return Ok(name);
            }
        } else if attr.path().is_ident("serde") {
            serde_name = serde_name.or_else(|| name_value(&meta, "rename"));
        }
    }

    match serde_name {
        Some(name) => Ok(name),
        None => field
            .ident
            .as_ref()
            .map(|ident| ident.to_string())
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field")),
    }
}

/// Extract `key = "value"` from a parsed attribute argument.
fn name_value(meta: &Meta, key: &str) -> Option<String> {
    let Meta::NameValue(nv) = meta else {
        return None;
    };
    if !nv.path.is_ident(key) {
        return None;
    }
    match &nv.value {
        syn::Expr::Lit(syn::ExprLit {
            lit: Lit::Str(s), ..
        }) => Some(s.value()),
        _ => None,
    }
}

fn is_field_optional(field: &Field) -> bool {
    field.attrs.iter().any(|attr| {
        attr.path().is_ident("tool")
            && matches!(attr.parse_args::<Meta>(), Ok(Meta::Path(path)) if path.is_ident("optional"))
    })
}

fn get_doc_comment(attrs: &[syn::Attribute]) -> String {
    let mut docs = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("doc") {
            if let Meta::NameValue(nv) = &attr.meta {
                if let syn::Expr::Lit(expr_lit) = &nv.value {
                    if let Lit::Str(s) = &expr_lit.lit {
                        docs.push(s.value().trim().to_string());
                    }
                }
            }
        }
    }
    docs.join(" ")
}

fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

fn type_to_schema(ty: &Type) -> syn::Result<TokenStream2> {
    Ok(match ty {
        Type::Path(type_path) => {
            if let Some(segment) = type_path.path.segments.last() {
                let ident_str = segment.ident.to_string();

                match ident_str.as_str() {
                    "String" | "str" => quote! { serde_json::json!({"type": "string"}) },
                    "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64"
                    | "usize" => {
                        quote! { serde_json::json!({"type": "integer"}) }
                    }
                    "f32" | "f64" => quote! { serde_json::json!({"type": "number"}) },
                    "bool" => quote! { serde_json::json!({"type": "boolean"}) },
                    "Option" => {
                        if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                            if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                                return type_to_schema(inner);
                            }
                        }
                        quote! { serde_json::json!({}) }
                    }
                    "Vec" => {
                        if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                            if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                                let inner_schema = type_to_schema(inner)?;
                                return Ok(quote! {
                                    serde_json::json!({
                                        "type": "array",
                                        "items": #inner_schema
                                    })
                                });
                            }
                        }
                        quote! { serde_json::json!({"type": "array"}) }
                    }
                    _ => quote! { serde_json::json!({"type": "object"}) },
                }
            } else {
                quote! { serde_json::json!({}) }
            }
        }
        _ => quote! { serde_json::json!({}) },
    })
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("ToggleFollow"), "toggle_follow");
        assert_eq!(to_snake_case("MoveToObject"), "move_to_object");
        assert_eq!(to_snake_case("wave"), "wave");
    }

    #[test]
    fn test_serde_rename_is_honored() {
        let field: syn::FieldsNamed = syn::parse_quote! {
            {
                #[serde(rename = "objectName")]
                object_name: String
            }
        };
        let field = field.named.first().unwrap();
        assert_eq!(get_field_name(field).unwrap(), "objectName");
    }

    #[test]
    fn test_tool_rename_beats_serde_rename() {
        let field: syn::FieldsNamed = syn::parse_quote! {
            {
                #[serde(rename = "objectName")]
                #[tool(rename = "target")]
                object_name: String
            }
        };
        let field = field.named.first().unwrap();
        assert_eq!(get_field_name(field).unwrap(), "target");
    }

    #[test]
    fn test_optional_attribute() {
        let fields: syn::FieldsNamed = syn::parse_quote! {
            {
                #[tool(optional)]
                speed: f32,
                name: String
            }
        };
        let mut iter = fields.named.iter();
        assert!(is_field_optional(iter.next().unwrap()));
        assert!(!is_field_optional(iter.next().unwrap()));
    }
}
