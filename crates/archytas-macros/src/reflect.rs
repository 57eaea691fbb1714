//! `#[derive(Reflect)]` expansion.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DataStruct, DeriveInput, Fields, FieldsNamed};

use crate::parse::{ContainerAttrs, FieldAttrs, Location};

/// Expands the derive for one input item.
pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect cannot be derived for generic types",
        ));
    }

    let container = ContainerAttrs::parse(&input.attrs)?;
    let ident = &input.ident;
    let name = container
        .rename
        .clone()
        .unwrap_or_else(|| unraw(&ident.to_string()));

    let body = match &input.data {
        Data::Struct(data) => struct_type_info(data, &container, &name)?,
        Data::Enum(data) => enum_type_info(data, &container, &name)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                ident,
                "Reflect cannot be derived for unions",
            ))
        }
    };

    let modifier = container.response_modifier.then(|| {
        quote! {
            fn as_response_modifier(&self) -> ::core::option::Option<&dyn ::archytas_core::ResponseModifier> {
                ::core::option::Option::Some(self)
            }
        }
    });

    Ok(quote! {
        #[automatically_derived]
        impl ::archytas_core::Reflect for #ident {
            fn type_info() -> ::archytas_core::TypeInfo {
                #body
            }

            #modifier
        }
    })
}

fn struct_type_info(
    data: &DataStruct,
    container: &ContainerAttrs,
    name: &str,
) -> syn::Result<TokenStream> {
    match &data.fields {
        Fields::Named(fields) => {
            let fields = named_fields(fields, container)?;
            Ok(quote! {
                ::archytas_core::TypeInfo::named::<Self>(
                    #name,
                    ::archytas_core::Kind::Struct(|| ::std::vec![#(#fields),*]),
                )
            })
        }
        Fields::Unit => Ok(quote! {
            ::archytas_core::TypeInfo::named::<Self>(
                #name,
                ::archytas_core::Kind::Struct(::std::vec::Vec::new),
            )
        }),
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            let inner = &fields.unnamed[0].ty;
            Ok(quote! {
                <#inner as ::archytas_core::Reflect>::type_info().rebrand::<Self>(#name)
            })
        }
        Fields::Unnamed(fields) => Err(syn::Error::new_spanned(
            fields,
            "Reflect supports tuple structs with exactly one field",
        )),
    }
}

fn named_fields(fields: &FieldsNamed, container: &ContainerAttrs) -> syn::Result<Vec<TokenStream>> {
    let mut out = Vec::with_capacity(fields.named.len());

    for field in &fields.named {
        let attrs = FieldAttrs::parse(&field.attrs)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if attrs.as_string && !attrs.serde_codec {
            return Err(syn::Error::new_spanned(
                field,
                "`as_string` needs a string serde representation, \
                 add #[serde(with = \"archytas_core::as_string\")]",
            ));
        }
        let ident_str = unraw(&ident.to_string());
        let ty = &field.ty;

        let rename = attrs
            .serde_rename
            .clone()
            .or_else(|| container.rename_all.map(|rule| rule.apply_to_field(&ident_str)));
        let rename = opt_str(rename.as_deref());

        let ty_fn = if attrs.skip {
            quote!(::archytas_core::opaque_type_info::<#ty>)
        } else {
            quote!(<#ty as ::archytas_core::Reflect>::type_info)
        };

        let skip = attrs.skip;
        let flatten = attrs.flatten;
        let api = api_attrs(&attrs);

        out.push(quote! {
            ::archytas_core::FieldInfo {
                ident: #ident_str,
                rename: #rename,
                ty: #ty_fn,
                skip: #skip,
                flatten: #flatten,
                api: #api,
            }
        });
    }

    Ok(out)
}

fn api_attrs(attrs: &FieldAttrs) -> TokenStream {
    let name = opt_str(attrs.name.as_deref());
    let location = match attrs.location {
        Some(Location::Path) => {
            quote!(::core::option::Option::Some(::archytas_core::ParamLocation::Path))
        }
        Some(Location::Query) => {
            quote!(::core::option::Option::Some(::archytas_core::ParamLocation::Query))
        }
        None => quote!(::core::option::Option::None),
    };
    let required = attrs.required;
    let private = attrs.private;
    let as_string = attrs.as_string;
    let enum_values = &attrs.enum_values;
    let minimum = opt_f64(attrs.minimum);
    let maximum = opt_f64(attrs.maximum);
    let min_length = opt_u64(attrs.min_length);
    let max_length = opt_u64(attrs.max_length);
    let pattern = opt_str(attrs.pattern.as_deref());
    let default = opt_str(attrs.default.as_deref());
    let description = opt_str(attrs.description.as_deref());

    quote! {
        ::archytas_core::ApiAttrs {
            name: #name,
            location: #location,
            required: #required,
            private: #private,
            as_string: #as_string,
            enum_values: &[#(#enum_values),*],
            minimum: #minimum,
            maximum: #maximum,
            min_length: #min_length,
            max_length: #max_length,
            pattern: #pattern,
            default: #default,
            description: #description,
        }
    }
}

fn enum_type_info(
    data: &DataEnum,
    container: &ContainerAttrs,
    name: &str,
) -> syn::Result<TokenStream> {
    let mut values = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Reflect supports enums whose variants carry no data",
            ));
        }
        let attrs = FieldAttrs::parse(&variant.attrs)?;
        if attrs.skip {
            continue;
        }
        let ident = unraw(&variant.ident.to_string());
        let value = attrs.serde_rename.unwrap_or_else(|| match container.rename_all {
            Some(rule) => rule.apply_to_variant(&ident),
            None => ident,
        });
        values.push(value);
    }

    Ok(quote! {
        ::archytas_core::TypeInfo::named::<Self>(#name, ::archytas_core::Kind::String)
            .with_enum_values(&[#(#values),*])
    })
}

fn opt_str(value: Option<&str>) -> TokenStream {
    match value {
        Some(v) => quote!(::core::option::Option::Some(#v)),
        None => quote!(::core::option::Option::None),
    }
}

fn opt_f64(value: Option<f64>) -> TokenStream {
    match value {
        Some(v) => quote!(::core::option::Option::Some(#v)),
        None => quote!(::core::option::Option::None),
    }
}

fn opt_u64(value: Option<u64>) -> TokenStream {
    match value {
        Some(v) => quote!(::core::option::Option::Some(#v)),
        None => quote!(::core::option::Option::None),
    }
}

fn unraw(ident: &str) -> String {
    ident.strip_prefix("r#").unwrap_or(ident).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand_str(input: DeriveInput) -> String {
        expand(&input).unwrap().to_string()
    }

    #[test]
    fn test_expand_named_struct() {
        let out = expand_str(parse_quote! {
            #[serde(rename_all = "camelCase")]
            struct Todo {
                todo_id: i64,
                #[serde(skip)]
                cache: Vec<u8>,
            }
        });

        assert!(out.contains("TypeInfo :: named :: < Self >"));
        assert!(out.contains("\"Todo\""));
        assert!(out.contains("\"todoId\""));
        assert!(out.contains("opaque_type_info :: < Vec < u8 > >"));
    }

    #[test]
    fn test_expand_container_rename_and_modifier() {
        let out = expand_str(parse_quote! {
            #[api(rename = "TodoItem", response_modifier)]
            struct Todo {
                id: i64,
            }
        });
        assert!(out.contains("\"TodoItem\""));
        assert!(out.contains("as_response_modifier"));
    }

    #[test]
    fn test_expand_fieldless_enum() {
        let out = expand_str(parse_quote! {
            #[serde(rename_all = "snake_case")]
            enum State {
                Open,
                InProgress,
                #[serde(rename = "closed")]
                Done,
            }
        });
        assert!(out.contains("Kind :: String"));
        assert!(out.contains("\"in_progress\""));
        assert!(out.contains("\"closed\""));
    }

    #[test]
    fn test_expand_as_string_requires_a_serde_codec() {
        let bare: DeriveInput = parse_quote! {
            struct Todo {
                #[api(as_string)]
                id: i64,
            }
        };
        let err = expand(&bare).unwrap_err();
        assert!(err.to_string().contains("archytas_core::as_string"));

        let out = expand_str(parse_quote! {
            struct Todo {
                #[serde(with = "archytas_core::as_string")]
                #[api(as_string)]
                id: i64,
            }
        });
        assert!(out.contains("as_string : true"));
    }

    #[test]
    fn test_expand_newtype() {
        let out = expand_str(parse_quote! {
            struct TodoId(u64);
        });
        assert!(out.contains("rebrand :: < Self >"));
    }

    #[test]
    fn test_expand_rejects_generics_and_data_enums() {
        let generic: DeriveInput = parse_quote! { struct Page<T> { items: Vec<T> } };
        assert!(expand(&generic).is_err());

        let data_enum: DeriveInput = parse_quote! { enum Shape { Circle(f64) } };
        assert!(expand(&data_enum).is_err());

        let tuple: DeriveInput = parse_quote! { struct Pair(u8, u8); };
        assert!(expand(&tuple).is_err());
    }
}
