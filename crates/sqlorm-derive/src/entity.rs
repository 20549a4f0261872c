//! Entity derive macro implementation

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Fields, Member, Meta, Result, Token};

struct FieldInfo {
    member: Member,
    name: String,
    ty: syn::Type,
    tag: Option<String>,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "Entity can only be derived for structs",
        ));
    };

    let kind = match &data.fields {
        Fields::Named(_) => quote!(::sqlorm::EntityKind::Struct),
        Fields::Unnamed(_) => quote!(::sqlorm::EntityKind::Tuple),
        Fields::Unit => quote!(::sqlorm::EntityKind::Unit),
    };

    let table_name = match struct_table(&input.attrs)? {
        Some(table) => quote!(::core::option::Option::Some(#table)),
        None => quote!(::core::option::Option::None),
    };

    let fields = data
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let (member, name) = match &field.ident {
                Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
                None => (Member::Unnamed(i.into()), i.to_string()),
            };
            Ok(FieldInfo {
                member,
                name,
                ty: field.ty.clone(),
                tag: field_tag(&field.attrs)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let descriptors = fields.iter().map(|f| {
        let FieldInfo {
            member,
            name: field_name,
            ty,
            tag,
        } = f;
        let tag = match tag {
            Some(tag) => quote!(::core::option::Option::Some(#tag)),
            None => quote!(::core::option::Option::None),
        };
        quote! {
            ::sqlorm::FieldDescriptor {
                name: #field_name,
                tag: #tag,
                ty: <#ty as ::sqlorm::SqlType>::TYPE,
                offset: ::core::mem::offset_of!(Self, #member),
            }
        }
    });

    let getters = fields.iter().map(|f| {
        let FieldInfo {
            member,
            name: field_name,
            ty,
            ..
        } = f;
        quote! {
            #field_name => ::core::option::Option::Some(
                <#ty as ::core::convert::Into<::sqlorm::Value>>::into(
                    ::core::clone::Clone::clone(&self.#member),
                ),
            ),
        }
    });

    let setters = fields.iter().map(|f| {
        let FieldInfo {
            member,
            name: field_name,
            ty,
            ..
        } = f;
        quote! {
            #field_name => {
                self.#member = <#ty as ::sqlorm::FromValue>::from_value(value)?;
                ::core::result::Result::Ok(())
            }
        }
    });

    let type_name = name.to_string();

    Ok(quote! {
        unsafe impl #impl_generics ::sqlorm::Entity for #name #ty_generics #where_clause {
            const DESCRIPTOR: ::sqlorm::EntityDescriptor = ::sqlorm::EntityDescriptor {
                type_name: #type_name,
                kind: #kind,
                table_name: #table_name,
                fields: &[#(#descriptors),*],
            };

            fn get_field(&self, name: &str) -> ::core::option::Option<::sqlorm::Value> {
                match name {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set_field(&mut self, name: &str, value: ::sqlorm::Value) -> ::sqlorm::OrmResult<()> {
                match name {
                    #(#setters)*
                    _ => ::core::result::Result::Err(
                        ::sqlorm::OrmError::UnknownField(::std::string::ToString::to_string(name)),
                    ),
                }
            }
        }
    })
}

/// `#[orm(table = "...")]` on the struct.
fn struct_table(attrs: &[syn::Attribute]) -> Result<Option<String>> {
    for attr in attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let items = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in items {
            match meta {
                Meta::NameValue(nv) if nv.path.is_ident("table") => {
                    return Ok(Some(lit_string(&nv.value)));
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "unknown struct attribute, expected `table = \"...\"`",
                    ));
                }
            }
        }
    }
    Ok(None)
}

/// Collect every `#[orm(...)]` item of a field into a raw `key=value,...` tag.
///
/// A bare key is kept as is, so registration can reject it.
fn field_tag(attrs: &[syn::Attribute]) -> Result<Option<String>> {
    let mut pairs = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let items = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in items {
            match meta {
                Meta::NameValue(nv) => {
                    pairs.push(format!("{}={}", path_string(&nv.path), lit_string(&nv.value)));
                }
                Meta::Path(path) => pairs.push(path_string(&path)),
                Meta::List(list) => {
                    return Err(syn::Error::new_spanned(
                        list,
                        "expected `key = \"value\"` in #[orm(...)]",
                    ));
                }
            }
        }
    }
    Ok((!pairs.is_empty()).then(|| pairs.join(",")))
}

fn path_string(path: &syn::Path) -> String {
    path.to_token_stream().to_string().replace(' ', "")
}

fn lit_string(expr: &syn::Expr) -> String {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => lit.value(),
        other => other.to_token_stream().to_string(),
    }
}
