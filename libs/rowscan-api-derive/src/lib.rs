use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

/// Derive macro for scannable record types.
///
/// Generates an implementation of `rowscan_api::record::Record`:
///
/// - `fields() -> &'static [FieldDecl]`: static manifest (tag, kind,
///   nullability, required flag, flattened records).
/// - `set_field(&mut self, path, value)`: converts a raw value with the
///   field type's `FromValue` rule and stores it.
///
/// The struct must implement `Default` (the zero value rows start from).
///
/// # Example
///
/// ```ignore
/// #[derive(Record, Default)]
/// pub struct Beer {
///     #[scan(tag = "id", required)]
///     pub id: i64,
///
///     pub tags: Vec<String>,
///
///     #[scan(flatten, prefix = "brewery_")]
///     pub brewery: Brewery,
///
///     #[scan(skip)]
///     pub cached_label: String,
/// }
/// ```
///
/// Field attributes: `tag = "..."`, `required`, `skip`, `flatten`,
/// `prefix = "..."` (flatten only). `required` on a flattened field makes
/// every promoted field required. Leaf field types must implement
/// `FromValue`; flattened field types must implement `Record`.
#[proc_macro_derive(Record, attributes(scan))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

/// Parsed `#[scan(...)]` options of one field.
#[derive(Default)]
struct FieldOpts {
    tag: Option<String>,
    required: bool,
    skip: bool,
    flatten: bool,
    prefix: Option<String>,
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record only supports structs",
            ))
        }
    };

    let mut decl_tokens = Vec::new();
    let mut setter_tokens = Vec::new();

    for field in fields {
        let field_name = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "expected named field")
        })?;
        // `r#type` matches a `type` column
        let field_name_str = field_name.unraw().to_string();
        let field_ty = &field.ty;

        let opts = parse_opts(field)?;
        if opts.skip {
            continue;
        }

        let index = decl_tokens.len();
        let required = opts.required;

        if opts.flatten {
            if opts.tag.is_some() {
                return Err(syn::Error::new_spanned(
                    field_name,
                    "flattened fields take `prefix = \"...\"`, not a tag",
                ));
            }
            let prefix = opts.prefix.unwrap_or_default();
            decl_tokens.push(quote! {
                ::rowscan_api::schema::FieldDecl {
                    field: #field_name_str,
                    tag: ::core::option::Option::None,
                    required: #required,
                    shape: ::rowscan_api::schema::FieldShape::Flatten {
                        fields: <#field_ty as ::rowscan_api::record::Record>::fields,
                        type_name: ::core::any::type_name::<#field_ty>,
                        prefix: #prefix,
                    },
                }
            });
            setter_tokens.push(quote! {
                [#index, rest @ ..] => {
                    <#field_ty as ::rowscan_api::record::Record>::set_field(&mut self.#field_name, rest, value)
                }
            });
        } else {
            if opts.prefix.is_some() {
                return Err(syn::Error::new_spanned(
                    field_name,
                    "`prefix` is only valid together with `flatten`",
                ));
            }
            let tag_expr = match &opts.tag {
                Some(tag) => quote! { ::core::option::Option::Some(#tag) },
                None => quote! { ::core::option::Option::None },
            };
            decl_tokens.push(quote! {
                ::rowscan_api::schema::FieldDecl {
                    field: #field_name_str,
                    tag: #tag_expr,
                    required: #required,
                    shape: ::rowscan_api::schema::FieldShape::Leaf {
                        kind: <#field_ty as ::rowscan_api::convert::FromValue>::KIND,
                        nullable: <#field_ty as ::rowscan_api::convert::FromValue>::NULLABLE,
                    },
                }
            });
            setter_tokens.push(quote! {
                [#index] => {
                    self.#field_name = <#field_ty as ::rowscan_api::convert::FromValue>::from_value(value)?;
                    ::core::result::Result::Ok(())
                }
            });
        }
    }

    let expanded = quote! {
        impl ::rowscan_api::record::Record for #name {
            fn fields() -> &'static [::rowscan_api::schema::FieldDecl] {
                const FIELDS: &[::rowscan_api::schema::FieldDecl] = &[
                    #(#decl_tokens),*
                ];
                FIELDS
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                path: &[usize],
                value: ::rowscan_api::value::Value<'_>,
            ) -> ::core::result::Result<(), ::rowscan_api::error::ConvertError> {
                match path {
                    #(#setter_tokens)*
                    _ => ::core::result::Result::Err(
                        ::rowscan_api::error::ConvertError::Path(path.to_vec())
                    ),
                }
            }
        }
    };

    Ok(TokenStream::from(expanded))
}

fn parse_opts(field: &syn::Field) -> Result<FieldOpts, syn::Error> {
    let mut opts = FieldOpts::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("scan") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("tag must not be empty"));
                }
                opts.tag = Some(value.value());
            } else if meta.path.is_ident("prefix") {
                let value: LitStr = meta.value()?.parse()?;
                opts.prefix = Some(value.value());
            } else if meta.path.is_ident("required") {
                opts.required = true;
            } else if meta.path.is_ident("skip") {
                opts.skip = true;
            } else if meta.path.is_ident("flatten") {
                opts.flatten = true;
            } else {
                return Err(meta.error(
                    "unknown scan option (expected tag, required, skip, flatten, prefix)",
                ));
            }
            Ok(())
        })?;
    }

    Ok(opts)
}
