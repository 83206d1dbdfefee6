#![recursion_limit = "256"]
// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

/// Implementation of the `FromArgs` and `argbind(...)` derive attributes.
///
/// The derive produces the same schema a hand-written `argbind::SchemaBuilder`
/// would, with names and short names computed at compile time.
///
/// For more thorough documentation, see the `argbind` crate itself.
extern crate proc_macro;

use {
    crate::{
        errors::Errors,
        parse_attrs::{Description, FieldAttrs, FieldKind, Short, TypeAttrs, ValidatorAttr},
    },
    argbind_shared::{default_short_name, NameTransform},
    proc_macro2::{Span, TokenStream},
    quote::{quote, quote_spanned, ToTokens},
    syn::{ext::IdentExt, spanned::Spanned},
};

mod errors;
mod parse_attrs;

/// Entrypoint for `#[derive(FromArgs)]`.
#[proc_macro_derive(FromArgs, attributes(argbind))]
pub fn argbind_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);
    let output = impl_from_args(&ast);
    output.into()
}

/// Transform the input into a token stream containing any generated implementations,
/// as well as all errors that occurred.
fn impl_from_args(input: &syn::DeriveInput) -> TokenStream {
    let errors = &Errors::default();
    if !input.generics.params.is_empty() {
        errors.err(
            &input.generics,
            "`#![derive(FromArgs)]` cannot be applied to types with generic parameters",
        );
    }
    let type_attrs = &TypeAttrs::parse(errors, input);
    let mut output_tokens = match &input.data {
        syn::Data::Struct(ds) => impl_from_args_struct(errors, &input.ident, type_attrs, ds),
        syn::Data::Enum(_) => {
            errors.err(input, "`#[derive(FromArgs)]` cannot be applied to enums");
            TokenStream::new()
        }
        syn::Data::Union(_) => {
            errors.err(input, "`#[derive(FromArgs)]` cannot be applied to unions");
            TokenStream::new()
        }
    };
    errors.to_tokens(&mut output_tokens);
    output_tokens
}

/// The slot a field binds through, with the types it is generic over.
enum Shape<'a> {
    Switch,
    Scalar(&'a syn::Type),
    Nullable(&'a syn::Type),
    Multi(&'a syn::Type),
    Dictionary(&'a syn::Type, &'a syn::Type),
}

/// A field of a `#![derive(FromArgs)]` struct with attributes and some other
/// notable metadata appended.
struct StructField<'a> {
    /// The original parsed field
    field: &'a syn::Field,
    /// The parsed attributes of the field
    attrs: FieldAttrs,
    /// The field name. This is contained optionally inside `field`,
    /// but is duplicated non-optionally here to indicate that all field that
    /// have reached this point must have a field name.
    ident: &'a syn::Ident,
    shape: Shape<'a>,
    /// The argument name after `name = "..."` or the type's name transform.
    name: String,
    short_name: Option<char>,
    position: Option<usize>,
}

impl<'a> StructField<'a> {
    /// Attempts to parse a field of a `#[derive(FromArgs)]` struct, pulling out the
    /// fields required for code generation.
    fn new(
        errors: &Errors,
        field: &'a syn::Field,
        attrs: FieldAttrs,
        transform: NameTransform,
        next_position: &mut usize,
    ) -> Option<Self> {
        let ident = field.ident.as_ref()?;

        // Ensure that one "kind" is present (switch, option, positional)
        let kind = if let Some(field_type) = &attrs.field_type {
            field_type.kind
        } else {
            errors.err(
                field,
                concat!(
                    "Missing `argbind` field kind attribute.\n",
                    "Expected one of: `switch`, `option`, `positional`",
                ),
            );
            return None;
        };

        let shape = match kind {
            FieldKind::Switch => {
                if !ty_expect_switch(errors, &field.ty) {
                    return None;
                }
                Shape::Switch
            }
            FieldKind::Option | FieldKind::Positional => {
                if let Some(inner) = ty_inner(&["Option"], &field.ty) {
                    Shape::Nullable(inner)
                } else if let Some(inner) = ty_inner(&["Vec"], &field.ty) {
                    Shape::Multi(inner)
                } else if let Some((key, value)) = ty_inner2(&["HashMap", "BTreeMap"], &field.ty) {
                    Shape::Dictionary(key, value)
                } else {
                    Shape::Scalar(&field.ty)
                }
            }
        };
        check_shape_attrs(errors, &attrs, &shape);

        let name = match &attrs.name {
            Some(name) => name.value(),
            None => transform.apply(&ident.unraw().to_string()),
        };
        if name.is_empty() {
            errors.err(field, "Argument names must not be empty");
        }
        let short_name = match &attrs.short {
            Some(Short::Explicit(c)) => Some(c.value()),
            Some(Short::FromName) => default_short_name(&name),
            None => None,
        };

        let position = match &attrs.position {
            Some(position) => match position.base10_parse::<usize>() {
                Ok(position) => Some(position),
                Err(err) => {
                    errors.push(err);
                    None
                }
            },
            None if kind == FieldKind::Positional => Some(*next_position),
            None => None,
        };
        if let Some(position) = position {
            *next_position = position + 1;
        }

        Some(StructField { field, attrs, ident, shape, name, short_name, position })
    }

    /// Whether the argument must be supplied on the command line.
    fn is_required(&self) -> bool {
        let scalar = matches!(self.shape, Shape::Scalar(_));
        self.attrs.required.is_some() || (scalar && self.attrs.default.is_none())
    }
}

/// Attributes that only make sense for some shapes of field.
fn check_shape_attrs(errors: &Errors, attrs: &FieldAttrs, shape: &Shape<'_>) {
    let is_map = matches!(shape, Shape::Dictionary(..));
    if !is_map {
        if let Some(lit) = &attrs.key_value_separator {
            errors.err(
                lit,
                "`key_value_separator` is only supported on `HashMap` and `BTreeMap` fields",
            );
        }
        if let Some(span) = attrs.allow_duplicate_keys {
            errors.err_span(
                span,
                "`allow_duplicate_keys` is only supported on `HashMap` and `BTreeMap` fields",
            );
        }
    }
    if let Some(path) = &attrs.from_str_fn {
        match shape {
            Shape::Switch => errors.err(path, "`from_str_fn` cannot be used on switches"),
            Shape::Dictionary(..) => errors.err(
                path,
                "`from_str_fn` cannot be used on maps; keys and values use their own conversions",
            ),
            _ => {}
        }
    }
}

/// Implements `FromArgs` for a `#[derive(FromArgs)]` struct.
fn impl_from_args_struct(
    errors: &Errors,
    name: &syn::Ident,
    type_attrs: &TypeAttrs,
    ds: &syn::DataStruct,
) -> TokenStream {
    let fields = match &ds.fields {
        syn::Fields::Named(fields) => fields,
        syn::Fields::Unnamed(_) => {
            errors.err(
                &ds.struct_token,
                "`#![derive(FromArgs)]` is not currently supported on tuple structs",
            );
            return TokenStream::new();
        }
        syn::Fields::Unit => {
            errors.err(&ds.struct_token, "#![derive(FromArgs)]` cannot be applied to unit structs");
            return TokenStream::new();
        }
    };

    let transform = name_transform(errors, type_attrs);
    let mut next_position = 0;
    let fields: Vec<_> = fields
        .named
        .iter()
        .filter_map(|field| {
            let attrs = FieldAttrs::parse(errors, field);
            StructField::new(errors, field, attrs, transform, &mut next_position)
        })
        .collect();

    let impl_span = Span::call_site();
    let init_fields = fields.iter().map(init_field);
    let arguments = fields.iter().map(|field| declare_argument(errors, field, &fields));
    let description = description_call(&type_attrs.description);
    let requires_any = type_attrs.requires_any.iter().map(|group| {
        let names =
            group.iter().filter_map(|reference| resolve_reference(errors, reference, &fields));
        quote! { .requires_any(&[ #( #names ),* ]) }
    });

    quote_spanned! { impl_span =>
        #[automatically_derived]
        impl ::argbind::FromArgs for #name {
            fn schema() -> ::argbind::Schema<Self> {
                ::argbind::SchemaBuilder::<Self>::with_constructor(
                    |__args: &mut ::argbind::ConstructorArgs| {
                        ::std::result::Result::Ok(#name {
                            #( #init_fields, )*
                        })
                    },
                )
                #description
                #( #arguments )*
                #( #requires_any )*
                .build()
            }
        }
    }
}

/// Parse the `name_transform` attribute, which must name one of the
/// transforms `NameTransform::from_str` accepts.
fn name_transform(errors: &Errors, type_attrs: &TypeAttrs) -> NameTransform {
    match &type_attrs.name_transform {
        Some(lit) => lit.value().parse().unwrap_or_else(|msg: String| {
            errors.err(lit, &msg);
            NameTransform::None
        }),
        None => NameTransform::None,
    }
}

fn description_call(description: &Option<Description>) -> TokenStream {
    match description {
        Some(description) => {
            let text = description.text();
            quote! { .description(#text) }
        }
        None => TokenStream::new(),
    }
}

/// Map a dependency reference onto an argument name. Field identifiers are
/// accepted as well as final names.
fn resolve_reference(
    errors: &Errors,
    reference: &syn::LitStr,
    fields: &[StructField<'_>],
) -> Option<String> {
    let value = reference.value();
    let by_ident = fields.iter().find(|field| field.ident.unraw() == value);
    let by_name = fields.iter().find(|field| field.name == value);
    match by_ident.or(by_name) {
        Some(field) => Some(field.name.clone()),
        None => {
            errors.err(reference, &["No argument named `", &value, "` on this type"].concat());
            None
        }
    }
}

/// The expression taking the field's value out of the constructor arguments.
fn init_field(field: &StructField<'_>) -> TokenStream {
    let ident = field.ident;
    let name = &field.name;
    let span = field.field.span();
    match field.shape {
        Shape::Switch => quote_spanned! { span =>
            #ident: __args.take_or_default::<bool>(#name)?
        },
        Shape::Scalar(ty) => quote_spanned! { span =>
            #ident: __args.take_required::<#ty>(#name)?
        },
        Shape::Nullable(ty) => quote_spanned! { span =>
            #ident: __args.take_or_default::<::std::option::Option<#ty>>(#name)?
        },
        Shape::Multi(ty) => quote_spanned! { span =>
            #ident: __args.take_or_default::<::std::vec::Vec<#ty>>(#name)?
        },
        Shape::Dictionary(key, value) => quote_spanned! { span =>
            #ident: __args
                .take_or_default::<::std::vec::Vec<(#key, #value)>>(#name)?
                .into_iter()
                .collect()
        },
    }
}

/// The slot kind expression for a field.
fn slot_kind(field: &StructField<'_>) -> TokenStream {
    let converter = |ty: &syn::Type| {
        field.attrs.from_str_fn.as_ref().map(|path| quote! { ::argbind::from_str_fn::<#ty>(#path) })
    };
    let with_converter = |kind: TokenStream, ty: &syn::Type| match converter(ty) {
        Some(converter) => quote! { #kind::<#ty>::with_converter(#converter) },
        None => quote! { #kind::<#ty>::default() },
    };
    match field.shape {
        Shape::Switch => quote! { ::argbind::slot::Switch },
        Shape::Scalar(ty) => with_converter(quote! { ::argbind::slot::Scalar }, ty),
        Shape::Nullable(ty) => with_converter(quote! { ::argbind::slot::Nullable }, ty),
        // `Vec<Option<T>>` collects the null sentinel as `None`.
        Shape::Multi(ty) => match ty_inner(&["Option"], ty) {
            Some(inner) => {
                let multi = quote! { ::argbind::slot::Multi::<::std::option::Option<#inner>> };
                match converter(inner) {
                    Some(converter) => quote! { #multi::nullable_with(#converter) },
                    None => quote! { #multi::nullable() },
                }
            }
            None => with_converter(quote! { ::argbind::slot::Multi }, ty),
        },
        Shape::Dictionary(key, value) => match ty_inner(&["Option"], value) {
            Some(inner) => {
                let value = quote! { ::std::option::Option<#inner> };
                quote! { ::argbind::slot::Dictionary::<#key, #value>::nullable_values() }
            }
            None => quote! { ::argbind::slot::Dictionary::<#key, #value>::default() },
        },
    }
}

fn validator(attr: &ValidatorAttr) -> TokenStream {
    let bound = |expr: &Option<syn::Expr>, ty: TokenStream| match expr {
        Some(expr) => quote! { ::std::option::Option::Some((#expr) as #ty) },
        None => quote! { ::std::option::Option::None },
    };
    match attr {
        ValidatorAttr::Range { min, max } => {
            let (min, max) = (bound(min, quote!(f64)), bound(max, quote!(f64)));
            quote! { ::argbind::Validator::Range { min: #min, max: #max } }
        }
        ValidatorAttr::Length { min, max } => {
            let (min, max) = (bound(min, quote!(usize)), bound(max, quote!(usize)));
            quote! { ::argbind::Validator::Length { min: #min, max: #max } }
        }
        ValidatorAttr::Count { min, max } => {
            let (min, max) = (bound(min, quote!(usize)), bound(max, quote!(usize)));
            quote! { ::argbind::Validator::Count { min: #min, max: #max } }
        }
        ValidatorAttr::Pattern(pattern) => {
            quote! { ::argbind::Validator::Pattern(::std::string::String::from(#pattern)) }
        }
        ValidatorAttr::NotEmpty => quote! { ::argbind::Validator::NotNullOrEmpty },
        ValidatorAttr::Custom(path) => {
            let check_name = path
                .path
                .segments
                .last()
                .map(|segment| segment.ident.unraw().to_string())
                .unwrap_or_default();
            quote! { ::argbind::Validator::custom(#check_name, #path) }
        }
    }
}

/// The `.argument(...)` call declaring one field.
fn declare_argument(
    errors: &Errors,
    field: &StructField<'_>,
    fields: &[StructField<'_>],
) -> TokenStream {
    let attrs = &field.attrs;
    let identifier = field.ident.unraw().to_string();
    let name = &field.name;
    let kind = slot_kind(field);

    let mut calls = vec![quote! { .name(#name) }];
    if let Some(short) = field.short_name {
        calls.push(quote! { .short(#short) });
    }
    calls.extend(attrs.aliases.iter().map(|alias| quote! { .alias(#alias) }));
    calls.extend(attrs.short_aliases.iter().map(|short| quote! { .short_alias(#short) }));
    if let Some(position) = field.position {
        calls.push(quote! { .position(#position) });
    }
    if field.is_required() {
        calls.push(quote! { .required() });
    }
    if let Some(default) = &attrs.default {
        calls.push(quote! { .default_value(#default) });
    }
    if let Some(separator) = &attrs.separator {
        calls.push(quote! { .separator(#separator) });
    }
    if let Some(separator) = &attrs.key_value_separator {
        calls.push(quote! { .key_value_separator(#separator) });
    }
    if attrs.allow_duplicate_keys.is_some() {
        calls.push(quote! { .allow_duplicate_keys() });
    }
    if attrs.cancel_parsing {
        calls.push(quote! { .cancel_parsing() });
    }
    if attrs.hidden {
        calls.push(quote! { .hidden() });
    }
    if let Some(description) = &attrs.description {
        let text = description.text();
        calls.push(quote! { .description(#text) });
    }
    if let Some(value_description) = &attrs.value_description {
        calls.push(quote! { .value_description(#value_description) });
    }
    calls.extend(attrs.validators.iter().map(|rule| {
        let rule = validator(rule);
        quote! { .validate(#rule) }
    }));
    for reference in &attrs.requires {
        if let Some(target) = resolve_reference(errors, reference, fields) {
            calls.push(quote! { .requires(#target) });
        }
    }
    for reference in &attrs.prohibits {
        if let Some(target) = resolve_reference(errors, reference, fields) {
            calls.push(quote! { .prohibits(#target) });
        }
    }

    quote! {
        .argument(#identifier, #kind, |__arg| __arg #( #calls )* .parameter())
    }
}

/// Require that a type can be a `switch`.
/// Throws an error for all types except booleans.
fn ty_expect_switch(errors: &Errors, ty: &syn::Type) -> bool {
    fn ty_can_be_switch(ty: &syn::Type) -> bool {
        if let syn::Type::Path(path) = ty {
            path.qself.is_none() && path.path.is_ident("bool")
        } else {
            false
        }
    }

    let res = ty_can_be_switch(ty);
    if !res {
        errors.err(ty, "switches must be of type `bool`");
    }
    res
}

/// The generic arguments of the last path segment, if the type is
/// `wrapper_name<...>` for any `wrapper_name` in `wrapper_names`.
fn ty_generics<'a>(
    wrapper_names: &[&str],
    ty: &'a syn::Type,
) -> Option<impl Iterator<Item = &'a syn::Type>> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    // Since we only check the last path segment, it isn't necessarily the case that
    // we're referring to `std::vec::Vec` or `std::option::Option`, but there isn't
    // a fool proof way to check these since name resolution happens after macro expansion,
    // so this is likely "good enough" (so long as people don't have their own types called
    // `Option` or `Vec` that take generic parameters they're looking to parse).
    let last_segment = path.path.segments.last()?;
    if !wrapper_names.iter().any(|name| last_segment.ident == *name) {
        return None;
    }
    let syn::PathArguments::AngleBracketed(gen_args) = &last_segment.arguments else {
        return None;
    };
    Some(gen_args.args.iter().filter_map(|arg| match arg {
        syn::GenericArgument::Type(ty) => Some(ty),
        _ => None,
    }))
}

/// Returns `Some(T)` if a type is `wrapper_name<T>` for any `wrapper_name` in `wrapper_names`.
fn ty_inner<'a>(wrapper_names: &[&str], ty: &'a syn::Type) -> Option<&'a syn::Type> {
    ty_generics(wrapper_names, ty)?.next()
}

/// Returns `Some((K, V))` if a type is `wrapper_name<K, V>`.
fn ty_inner2<'a>(
    wrapper_names: &[&str],
    ty: &'a syn::Type,
) -> Option<(&'a syn::Type, &'a syn::Type)> {
    let mut generics = ty_generics(wrapper_names, ty)?;
    Some((generics.next()?, generics.next()?))
}
