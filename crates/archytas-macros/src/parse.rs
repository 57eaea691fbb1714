//! Attribute parsing for the `Reflect` derive.
//!
//! Reads the subset of `#[serde(...)]` that changes field names or presence,
//! the `#[api(...)]` metadata and `///` doc comments.

use syn::meta::ParseNestedMeta;
use syn::{Attribute, Expr, ExprLit, ExprUnary, Lit, LitStr, UnOp};

/// A serde `rename_all` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_str(rule: &LitStr) -> syn::Result<Self> {
        Ok(match rule.value().as_str() {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            other => {
                return Err(syn::Error::new(
                    rule.span(),
                    format!("unknown rename rule: {other}"),
                ))
            }
        })
    }

    /// Applies the rule to a `snake_case` field name.
    pub fn apply_to_field(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => {
                let mut out = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        out.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
            Self::Camel => {
                let pascal = Self::Pascal.apply_to_field(field);
                lower_first(&pascal)
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }

    /// Applies the rule to a `PascalCase` variant name.
    pub fn apply_to_variant(self, variant: &str) -> String {
        match self {
            Self::Pascal => variant.to_string(),
            Self::Lower => variant.to_ascii_lowercase(),
            Self::Upper => variant.to_ascii_uppercase(),
            Self::Camel => lower_first(variant),
            Self::Snake => {
                let mut out = String::with_capacity(variant.len() + 4);
                for (i, ch) in variant.char_indices() {
                    if i > 0 && ch.is_uppercase() {
                        out.push('_');
                    }
                    out.push(ch.to_ascii_lowercase());
                }
                out
            }
            Self::ScreamingSnake => Self::Snake.apply_to_variant(variant).to_ascii_uppercase(),
            Self::Kebab => Self::Snake.apply_to_variant(variant).replace('_', "-"),
            Self::ScreamingKebab => Self::ScreamingSnake
                .apply_to_variant(variant)
                .replace('_', "-"),
        }
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Container-level attributes.
#[derive(Debug, Default)]
pub struct ContainerAttrs {
    pub rename: Option<String>,
    pub rename_all: Option<RenameRule>,
    pub response_modifier: bool,
}

impl ContainerAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs {
            if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename_all") {
                        if meta.input.peek(syn::Token![=]) {
                            let rule: LitStr = meta.value()?.parse()?;
                            out.rename_all = Some(RenameRule::from_str(&rule)?);
                        } else {
                            meta.parse_nested_meta(|inner| {
                                let rule: LitStr = inner.value()?.parse()?;
                                if inner.path.is_ident("serialize") {
                                    out.rename_all = Some(RenameRule::from_str(&rule)?);
                                }
                                Ok(())
                            })?;
                        }
                        Ok(())
                    } else {
                        skip_meta(&meta)
                    }
                })?;
            } else if attr.path().is_ident("api") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let name: LitStr = meta.value()?.parse()?;
                        out.rename = Some(name.value());
                        Ok(())
                    } else if meta.path.is_ident("response_modifier") {
                        out.response_modifier = true;
                        Ok(())
                    } else {
                        Err(meta.error("unknown container attribute, expected `rename` or `response_modifier`"))
                    }
                })?;
            }
        }
        Ok(out)
    }
}

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Path,
    Query,
}

/// Field-level attributes.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    pub serde_rename: Option<String>,
    pub serde_codec: bool,
    pub skip: bool,
    pub flatten: bool,
    pub name: Option<String>,
    pub location: Option<Location>,
    pub required: bool,
    pub private: bool,
    pub as_string: bool,
    pub enum_values: Vec<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub default: Option<String>,
    pub description: Option<String>,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        let mut doc_lines = Vec::new();

        for attr in attrs {
            if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| out.parse_serde(&meta))?;
            } else if attr.path().is_ident("api") {
                attr.parse_nested_meta(|meta| out.parse_api(&meta))?;
            } else if attr.path().is_ident("doc") {
                if let syn::Meta::NameValue(nv) = &attr.meta {
                    if let Expr::Lit(ExprLit {
                        lit: Lit::Str(s), ..
                    }) = &nv.value
                    {
                        doc_lines.push(s.value().trim().to_string());
                    }
                }
            }
        }

        if out.description.is_none() {
            let doc = doc_lines.join(" ").trim().to_string();
            if !doc.is_empty() {
                out.description = Some(doc);
            }
        }
        Ok(out)
    }

    fn parse_serde(&mut self, meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("rename") {
            if meta.input.peek(syn::Token![=]) {
                let name: LitStr = meta.value()?.parse()?;
                self.serde_rename = Some(name.value());
            } else {
                meta.parse_nested_meta(|inner| {
                    let name: LitStr = inner.value()?.parse()?;
                    if inner.path.is_ident("serialize") {
                        self.serde_rename = Some(name.value());
                    }
                    Ok(())
                })?;
            }
            Ok(())
        } else if meta.path.is_ident("skip") {
            self.skip = true;
            Ok(())
        } else if meta.path.is_ident("flatten") {
            self.flatten = true;
            Ok(())
        } else if meta.path.is_ident("with") || meta.path.is_ident("deserialize_with") {
            self.serde_codec = true;
            skip_meta(meta)
        } else {
            skip_meta(meta)
        }
    }

    fn parse_api(&mut self, meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
        let path = &meta.path;
        if path.is_ident("name") {
            self.name = Some(string_value(meta)?);
        } else if path.is_ident("in") {
            let value: LitStr = meta.value()?.parse()?;
            self.location = Some(match value.value().as_str() {
                "path" => Location::Path,
                "query" => Location::Query,
                other => {
                    return Err(syn::Error::new(
                        value.span(),
                        format!("unsupported parameter location `{other}`, expected `path` or `query`"),
                    ))
                }
            });
        } else if path.is_ident("required") {
            self.required = true;
        } else if path.is_ident("private") {
            self.private = true;
        } else if path.is_ident("as_string") {
            self.as_string = true;
        } else if path.is_ident("enum") {
            self.enum_values = string_value(meta)?
                .split('|')
                .map(str::to_string)
                .collect();
        } else if path.is_ident("min") {
            self.minimum = Some(number_value(meta)?);
        } else if path.is_ident("max") {
            self.maximum = Some(number_value(meta)?);
        } else if path.is_ident("min_len") {
            self.min_length = Some(length_value(meta)?);
        } else if path.is_ident("max_len") {
            self.max_length = Some(length_value(meta)?);
        } else if path.is_ident("pattern") {
            self.pattern = Some(string_value(meta)?);
        } else if path.is_ident("default") {
            self.default = Some(string_value(meta)?);
        } else if path.is_ident("description") {
            self.description = Some(string_value(meta)?);
        } else {
            return Err(meta.error("unknown field attribute"));
        }
        Ok(())
    }
}

/// Consumes a serde argument this derive does not care about.
fn skip_meta(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let _: proc_macro2::TokenTree = meta.input.parse()?;
    }
    Ok(())
}

fn string_value(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    let value: LitStr = meta.value()?.parse()?;
    Ok(value.value())
}

fn number_value(meta: &ParseNestedMeta<'_>) -> syn::Result<f64> {
    let expr: Expr = meta.value()?.parse()?;
    parse_number(&expr)
}

fn parse_number(expr: &Expr) -> syn::Result<f64> {
    match expr {
        Expr::Lit(ExprLit { lit, .. }) => match lit {
            Lit::Int(i) => i.base10_parse::<f64>(),
            Lit::Float(f) => f.base10_parse::<f64>(),
            Lit::Str(s) => s
                .value()
                .trim()
                .parse::<f64>()
                .map_err(|e| syn::Error::new(s.span(), e.to_string())),
            other => Err(syn::Error::new(other.span(), "expected a number")),
        },
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => parse_number(expr).map(|n| -n),
        other => Err(syn::Error::new_spanned(other, "expected a number")),
    }
}

fn length_value(meta: &ParseNestedMeta<'_>) -> syn::Result<u64> {
    let expr: Expr = meta.value()?.parse()?;
    match &expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(i), ..
        }) => i.base10_parse::<u64>(),
        other => Err(syn::Error::new_spanned(other, "expected a non-negative integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_rename_rules_for_fields() {
        assert_eq!(RenameRule::Camel.apply_to_field("created_at"), "createdAt");
        assert_eq!(RenameRule::Pascal.apply_to_field("created_at"), "CreatedAt");
        assert_eq!(RenameRule::Kebab.apply_to_field("created_at"), "created-at");
        assert_eq!(
            RenameRule::ScreamingSnake.apply_to_field("created_at"),
            "CREATED_AT"
        );
    }

    #[test]
    fn test_rename_rules_for_variants() {
        assert_eq!(RenameRule::Snake.apply_to_variant("InProgress"), "in_progress");
        assert_eq!(RenameRule::Camel.apply_to_variant("InProgress"), "inProgress");
        assert_eq!(RenameRule::Lower.apply_to_variant("InProgress"), "inprogress");
        assert_eq!(
            RenameRule::ScreamingKebab.apply_to_variant("InProgress"),
            "IN-PROGRESS"
        );
    }

    #[test]
    fn test_field_attrs_parse_serde_and_api() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[doc = " The todo id."]),
            parse_quote!(#[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]),
            parse_quote!(#[api(in = "path", required, enum = "1|2", min = -1, max = 10.5, min_len = 1)]),
        ];
        let parsed = FieldAttrs::parse(&attrs).unwrap();

        assert_eq!(parsed.serde_rename.as_deref(), Some("id"));
        assert_eq!(parsed.location, Some(Location::Path));
        assert!(parsed.required);
        assert_eq!(parsed.enum_values, vec!["1", "2"]);
        assert_eq!(parsed.minimum, Some(-1.0));
        assert_eq!(parsed.maximum, Some(10.5));
        assert_eq!(parsed.min_length, Some(1));
        assert_eq!(parsed.description.as_deref(), Some("The todo id."));
    }

    #[test]
    fn test_field_attrs_detect_serde_codecs() {
        let plain: Vec<Attribute> = vec![parse_quote!(#[serde(default)])];
        assert!(!FieldAttrs::parse(&plain).unwrap().serde_codec);

        let with: Vec<Attribute> = vec![
            parse_quote!(#[serde(with = "archytas_core::as_string")]),
            parse_quote!(#[api(as_string)]),
        ];
        let parsed = FieldAttrs::parse(&with).unwrap();
        assert!(parsed.serde_codec);
        assert!(parsed.as_string);
    }

    #[test]
    fn test_field_attrs_reject_unknown_location() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[api(in = "header")])];
        assert!(FieldAttrs::parse(&attrs).is_err());
    }

    #[test]
    fn test_container_attrs() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[serde(rename_all = "camelCase", deny_unknown_fields)]),
            parse_quote!(#[api(rename = "Todo", response_modifier)]),
        ];
        let parsed = ContainerAttrs::parse(&attrs).unwrap();
        assert_eq!(parsed.rename_all, Some(RenameRule::Camel));
        assert_eq!(parsed.rename.as_deref(), Some("Todo"));
        assert!(parsed.response_modifier);
    }
}
