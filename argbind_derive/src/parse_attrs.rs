// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use {
    crate::errors::Errors,
    proc_macro2::Span,
    syn::{meta::ParseNestedMeta, spanned::Spanned},
};

/// Attributes applied to a field of a `#![derive(FromArgs)]` struct.
#[derive(Default)]
pub struct FieldAttrs {
    pub field_type: Option<FieldType>,
    pub name: Option<syn::LitStr>,
    pub short: Option<Short>,
    pub aliases: Vec<syn::LitStr>,
    pub short_aliases: Vec<syn::LitChar>,
    pub position: Option<syn::LitInt>,
    pub default: Option<syn::LitStr>,
    pub required: Option<Span>,
    pub separator: Option<syn::LitStr>,
    pub key_value_separator: Option<syn::LitStr>,
    pub allow_duplicate_keys: Option<Span>,
    pub cancel_parsing: bool,
    pub hidden: bool,
    pub value_description: Option<syn::LitStr>,
    pub from_str_fn: Option<syn::ExprPath>,
    pub requires: Vec<syn::LitStr>,
    pub prohibits: Vec<syn::LitStr>,
    pub validators: Vec<ValidatorAttr>,
    pub description: Option<Description>,
}

/// The kind of field, along with the span of the attribute naming it.
pub struct FieldType {
    pub kind: FieldKind,
    pub ident: syn::Ident,
}

/// The type of a field on a `#![derive(FromArgs)]` struct.
///
/// This is a simple enum with no data in order to make it more convenient
/// to compare.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Switches are booleans that are set to "true" by passing the flag.
    Switch,
    /// Options are `-name value` or `--name value` arguments.
    Option,
    /// Positional arguments are matched by position, and also by name.
    Positional,
}

/// `short = 'c'`, or a bare `short` taking the first character of the name.
pub enum Short {
    Explicit(syn::LitChar),
    FromName,
}

/// A validation rule from a field attribute.
pub enum ValidatorAttr {
    Range { min: Option<syn::Expr>, max: Option<syn::Expr> },
    Length { min: Option<syn::Expr>, max: Option<syn::Expr> },
    Count { min: Option<syn::Expr>, max: Option<syn::Expr> },
    Pattern(syn::LitStr),
    NotEmpty,
    Custom(syn::ExprPath),
}

/// Documentation collected from `///` comments.
pub struct Description {
    pub content: syn::LitStr,
}

/// Attributes applied to the struct itself.
#[derive(Default)]
pub struct TypeAttrs {
    pub name_transform: Option<syn::LitStr>,
    pub requires_any: Vec<Vec<syn::LitStr>>,
    pub description: Option<Description>,
}

fn set_once<T: Spanned>(errors: &Errors, kind: &str, slot: &mut Option<T>, value: T) {
    match slot {
        Some(first) => errors.duplicate_attrs(kind, first, &value),
        None => *slot = Some(value),
    }
}

fn set_flag(errors: &Errors, kind: &str, slot: &mut Option<Span>, span: Span) {
    match slot {
        Some(first) => errors.duplicate_attrs(kind, first, &span),
        None => *slot = Some(span),
    }
}

/// Parse `= ["a", "b"]` into its elements.
fn parse_list(meta: &ParseNestedMeta<'_>) -> syn::Result<syn::ExprArray> {
    meta.value()?.parse()
}

fn parse_str_list(errors: &Errors, meta: &ParseNestedMeta<'_>) -> syn::Result<Vec<syn::LitStr>> {
    let array = parse_list(meta)?;
    Ok(array.elems.iter().filter_map(|elem| errors.expect_str(elem).cloned()).collect())
}

/// Parse `(min = .., max = ..)`.
fn parse_bounds(meta: &ParseNestedMeta<'_>) -> syn::Result<(Option<syn::Expr>, Option<syn::Expr>)> {
    let (mut min, mut max) = (None, None);
    meta.parse_nested_meta(|bound| {
        if bound.path.is_ident("min") {
            min = Some(bound.value()?.parse()?);
        } else if bound.path.is_ident("max") {
            max = Some(bound.value()?.parse()?);
        } else {
            return Err(bound.error("expected `min` or `max`"));
        }
        Ok(())
    })?;
    Ok((min, max))
}

/// Parse `(path::to::function)`.
fn parse_fn_path(meta: &ParseNestedMeta<'_>) -> syn::Result<syn::ExprPath> {
    let content;
    syn::parenthesized!(content in meta.input);
    content.parse()
}

fn is_doc_attr(attr: &syn::Attribute) -> bool {
    attr.path().is_ident("doc")
}

fn is_argbind_attr(attr: &syn::Attribute) -> bool {
    attr.path().is_ident("argbind")
}

/// Append the text of a `#[doc = "..."]` attribute.
fn parse_doc(errors: &Errors, attr: &syn::Attribute, description: &mut Option<Description>) {
    let syn::Meta::NameValue(name_value) = &attr.meta else {
        return;
    };
    let Some(line) = errors.expect_str(&name_value.value) else {
        return;
    };
    let text = line.value();
    let text = text.trim();
    match description {
        Some(description) => {
            let mut value = description.content.value();
            value.push('\n');
            value.push_str(text);
            description.content = syn::LitStr::new(&value, description.content.span());
        }
        None => *description = Some(Description { content: syn::LitStr::new(text, line.span()) }),
    }
}

impl Description {
    /// The documentation with leading and trailing blank lines removed.
    pub fn text(&self) -> String {
        self.content.value().trim_matches('\n').to_owned()
    }
}

impl FieldAttrs {
    pub fn parse(errors: &Errors, field: &syn::Field) -> Self {
        let mut this = Self::default();

        for attr in &field.attrs {
            if is_doc_attr(attr) {
                parse_doc(errors, attr, &mut this.description);
                continue;
            }
            if !is_argbind_attr(attr) {
                continue;
            }
            if let Err(err) = attr.parse_nested_meta(|meta| this.parse_meta(errors, meta)) {
                errors.push(err);
            }
        }

        this
    }

    fn parse_meta(&mut self, errors: &Errors, meta: ParseNestedMeta<'_>) -> syn::Result<()> {
        let Some(ident) = meta.path.get_ident().cloned() else {
            return Err(meta.error("expected an `argbind` attribute name"));
        };
        let name = ident.to_string();
        match name.as_str() {
            "switch" | "option" | "positional" => {
                let kind = match name.as_str() {
                    "switch" => FieldKind::Switch,
                    "option" => FieldKind::Option,
                    _ => FieldKind::Positional,
                };
                match &self.field_type {
                    Some(first) => errors.duplicate_attrs("field kind", &first.ident, &ident),
                    None => self.field_type = Some(FieldType { kind, ident }),
                }
            }
            "name" => set_once(errors, "name", &mut self.name, meta.value()?.parse()?),
            "short" => {
                let short = if meta.input.peek(syn::Token![=]) {
                    Short::Explicit(meta.value()?.parse()?)
                } else {
                    Short::FromName
                };
                if self.short.is_some() {
                    errors.err(&ident, "Duplicate short attribute");
                }
                self.short = Some(short);
            }
            "aliases" => self.aliases.extend(parse_str_list(errors, &meta)?),
            "short_aliases" => {
                let array = parse_list(&meta)?;
                let shorts =
                    array.elems.iter().filter_map(|elem| errors.expect_char(elem).cloned());
                self.short_aliases.extend(shorts);
            }
            "position" => set_once(errors, "position", &mut self.position, meta.value()?.parse()?),
            "default" => set_once(errors, "default", &mut self.default, meta.value()?.parse()?),
            "required" => set_flag(errors, "required", &mut self.required, ident.span()),
            "separator" => {
                set_once(errors, "separator", &mut self.separator, meta.value()?.parse()?)
            }
            "key_value_separator" => set_once(
                errors,
                "key_value_separator",
                &mut self.key_value_separator,
                meta.value()?.parse()?,
            ),
            "allow_duplicate_keys" => {
                let span = ident.span();
                set_flag(errors, "allow_duplicate_keys", &mut self.allow_duplicate_keys, span)
            }
            "cancel_parsing" => self.cancel_parsing = true,
            "hidden" => self.hidden = true,
            "value_description" => set_once(
                errors,
                "value_description",
                &mut self.value_description,
                meta.value()?.parse()?,
            ),
            "from_str_fn" => {
                set_once(errors, "from_str_fn", &mut self.from_str_fn, parse_fn_path(&meta)?)
            }
            "requires" => self.requires.extend(parse_str_list(errors, &meta)?),
            "prohibits" => self.prohibits.extend(parse_str_list(errors, &meta)?),
            "range" => {
                let (min, max) = parse_bounds(&meta)?;
                self.validators.push(ValidatorAttr::Range { min, max });
            }
            "length" => {
                let (min, max) = parse_bounds(&meta)?;
                self.validators.push(ValidatorAttr::Length { min, max });
            }
            "count" => {
                let (min, max) = parse_bounds(&meta)?;
                self.validators.push(ValidatorAttr::Count { min, max });
            }
            "pattern" => self.validators.push(ValidatorAttr::Pattern(meta.value()?.parse()?)),
            "not_empty" => self.validators.push(ValidatorAttr::NotEmpty),
            "validate_with" => self.validators.push(ValidatorAttr::Custom(parse_fn_path(&meta)?)),
            _ => {
                return Err(meta.error(concat!(
                    "Invalid field-level `argbind` attribute\n",
                    "Expected one of: `switch`, `option`, `positional`, `name`, `short`, ",
                    "`aliases`, `short_aliases`, `position`, `default`, `required`, `separator`, ",
                    "`key_value_separator`, `allow_duplicate_keys`, `cancel_parsing`, `hidden`, ",
                    "`value_description`, `from_str_fn`, `requires`, `prohibits`, `range`, ",
                    "`length`, `count`, `pattern`, `not_empty`, `validate_with`",
                )));
            }
        }
        Ok(())
    }
}

impl TypeAttrs {
    /// Parse top-level `#[argbind(...)]` attributes
    pub fn parse(errors: &Errors, derive_input: &syn::DeriveInput) -> Self {
        let mut this = TypeAttrs::default();

        for attr in &derive_input.attrs {
            if is_doc_attr(attr) {
                parse_doc(errors, attr, &mut this.description);
                continue;
            }
            if !is_argbind_attr(attr) {
                continue;
            }
            let result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name_transform") {
                    let transform = meta.value()?.parse()?;
                    set_once(errors, "name_transform", &mut this.name_transform, transform);
                } else if meta.path.is_ident("requires_any") {
                    this.requires_any.push(parse_str_list(errors, &meta)?);
                } else {
                    return Err(meta.error(concat!(
                        "Invalid type-level `argbind` attribute\n",
                        "Expected one of: `name_transform`, `requires_any`",
                    )));
                }
                Ok(())
            });
            if let Err(err) = result {
                errors.push(err);
            }
        }

        this
    }
}
