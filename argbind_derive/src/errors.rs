// Copyright (c) 2020 Google LLC All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use {
    proc_macro2::{Span, TokenStream},
    quote::ToTokens,
    std::cell::RefCell,
};

/// A type for collecting procedural macro errors.
#[derive(Default)]
pub struct Errors {
    errors: RefCell<Vec<syn::Error>>,
}

impl Errors {
    /// Issue an error like:
    ///
    /// Duplicate foo attribute
    /// First foo attribute here
    pub fn duplicate_attrs(
        &self,
        attr_kind: &str,
        first: &impl syn::spanned::Spanned,
        second: &impl syn::spanned::Spanned,
    ) {
        self.err(second, &["Duplicate ", attr_kind, " attribute"].concat());
        self.err(first, &["First ", attr_kind, " attribute here"].concat());
    }

    /// A string literal expression, or an error.
    pub fn expect_str<'a>(&self, expr: &'a syn::Expr) -> Option<&'a syn::LitStr> {
        match expr {
            syn::Expr::Lit(syn::ExprLit { lit: syn::Lit::Str(lit), .. }) => Some(lit),
            _ => {
                self.err(expr, "Expected string literal");
                None
            }
        }
    }

    /// A character literal expression, or an error.
    pub fn expect_char<'a>(&self, expr: &'a syn::Expr) -> Option<&'a syn::LitChar> {
        match expr {
            syn::Expr::Lit(syn::ExprLit { lit: syn::Lit::Char(lit), .. }) => Some(lit),
            _ => {
                self.err(expr, "Expected character literal");
                None
            }
        }
    }

    /// Issue an error relating to a particular `Spanned` structure.
    pub fn err(&self, spanned: &impl syn::spanned::Spanned, msg: &str) {
        self.err_span(spanned.span(), msg);
    }

    /// Issue an error relating to a particular `Span`.
    pub fn err_span(&self, span: Span, msg: &str) {
        self.push(syn::Error::new(span, msg));
    }

    /// Push a `syn::Error` onto the list of errors to issue.
    pub fn push(&self, err: syn::Error) {
        self.errors.borrow_mut().push(err);
    }
}

impl ToTokens for Errors {
    /// Convert the errors into tokens that, when emit, will cause
    /// the user of the macro to receive compiler errors.
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.extend(self.errors.borrow().iter().map(|e| e.to_compile_error()));
    }
}
