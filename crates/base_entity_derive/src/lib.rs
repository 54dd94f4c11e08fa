use std::collections::HashSet;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Expr, ExprLit, Field, Fields, Ident, ItemStruct, Lit, LitStr, Meta, Path, Token,
    parse_macro_input, parse_quote, punctuated::Punctuated,
};

/// Column roles the macro knows about, keyed by attribute name.
struct Columns {
    id: Ident,
    created_at: Ident,
    updated_at: Ident,
    owner: Option<Ident>,
    expires: Option<Ident>,
}

struct Options {
    traits: Path,
    active_model: Ident,
    columns: Columns,
}

impl Default for Options {
    fn default() -> Self {
        let ident = |name: &str| Ident::new(name, Span::call_site());
        Self {
            traits: parse_quote!(crate::db::dao::base_traits),
            active_model: ident("ActiveModel"),
            columns: Columns {
                id: ident("id"),
                created_at: ident("created_at"),
                updated_at: ident("updated_at"),
                owner: None,
                expires: None,
            },
        }
    }
}

/// Prepends the `id`, `created_at` and `updated_at` columns shared by every table
/// and implements the DAO marker traits for the generated entity.
///
/// `owner = "user_id"` names the foreign key bulk per-user deletes filter on.
/// `expires = "expires_at"` names the column expiry sweeps compare against.
/// Both must already be declared on the struct.
#[proc_macro_attribute]
pub fn base_entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr with Punctuated<Meta, Token![,]>::parse_terminated);
    let mut input = parse_macro_input!(item as ItemStruct);

    match expand(args, &mut input) {
        Ok(impls) => quote!(#input #impls).into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(
    args: Punctuated<Meta, Token![,]>,
    input: &mut ItemStruct,
) -> syn::Result<TokenStream2> {
    let options = parse_options(args)?;
    let Fields::Named(fields) = &mut input.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "base_entity requires a struct with named fields",
        ));
    };

    let declared: HashSet<String> = fields
        .named
        .iter()
        .filter_map(|field| field.ident.as_ref().map(ToString::to_string))
        .collect();

    let columns = &options.columns;
    for marker in [&columns.owner, &columns.expires].into_iter().flatten() {
        if !declared.contains(&marker.to_string()) {
            return Err(syn::Error::new_spanned(
                marker,
                format!("base_entity: field `{marker}` is not declared on the model"),
            ));
        }
    }

    let (id, created_at, updated_at) = (&columns.id, &columns.created_at, &columns.updated_at);
    let shared: [(&Ident, Field); 3] = [
        (
            id,
            parse_quote! {
                #[sea_orm(primary_key, auto_increment = false)]
                pub #id: uuid::Uuid
            },
        ),
        (
            created_at,
            parse_quote! {
                #[sea_orm(default_expr = "Expr::current_timestamp()")]
                pub #created_at: sea_orm::entity::prelude::DateTimeWithTimeZone
            },
        ),
        (
            updated_at,
            parse_quote! {
                #[sea_orm(default_expr = "Expr::current_timestamp()")]
                pub #updated_at: sea_orm::entity::prelude::DateTimeWithTimeZone
            },
        ),
    ];

    let mut merged: Punctuated<Field, Token![,]> = shared
        .into_iter()
        .filter(|(name, _)| !declared.contains(&name.to_string()))
        .map(|(_, field)| field)
        .collect();
    merged.extend(fields.named.iter().cloned());
    fields.named = merged;

    let traits = &options.traits;
    let active_model = &options.active_model;
    let created_at_column = column_variant(created_at);
    let owner_impl = columns
        .owner
        .as_ref()
        .map(|field| column_impl(traits, "HasOwnerColumn", "owner_column", field));
    let expires_impl = columns
        .expires
        .as_ref()
        .map(|field| column_impl(traits, "HasExpiryColumn", "expiry_column", field));

    Ok(quote! {
        impl #traits::HasIdActiveModel for #active_model {
            fn set_id(&mut self, id: uuid::Uuid) {
                self.#id = sea_orm::ActiveValue::Set(id);
            }
        }

        impl #traits::TimestampedActiveModel for #active_model {
            fn set_created_at(&mut self, ts: sea_orm::entity::prelude::DateTimeWithTimeZone) {
                self.#created_at = sea_orm::ActiveValue::Set(ts);
            }

            fn set_updated_at(&mut self, ts: sea_orm::entity::prelude::DateTimeWithTimeZone) {
                self.#updated_at = sea_orm::ActiveValue::Set(ts);
            }
        }

        impl #traits::HasCreatedAtColumn for Entity {
            fn created_at_column() -> Column {
                Column::#created_at_column
            }
        }

        #owner_impl
        #expires_impl
    })
}

fn column_impl(traits: &Path, trait_name: &str, method: &str, field: &Ident) -> TokenStream2 {
    let trait_ident = Ident::new(trait_name, Span::call_site());
    let method_ident = Ident::new(method, Span::call_site());
    let column = column_variant(field);
    quote! {
        impl #traits::#trait_ident for Entity {
            fn #method_ident() -> Column {
                Column::#column
            }
        }
    }
}

// `user_id` -> `UserId`, matching the Column variants DeriveEntityModel emits.
fn column_variant(field: &Ident) -> Ident {
    let camel: String = field
        .to_string()
        .trim_start_matches("r#")
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        })
        .collect();
    Ident::new(&camel, field.span())
}

fn parse_options(args: Punctuated<Meta, Token![,]>) -> syn::Result<Options> {
    let mut options = Options::default();

    for meta in args {
        let Meta::NameValue(pair) = meta else {
            return Err(syn::Error::new_spanned(
                meta,
                "expected `key = \"value\"`, e.g. owner = \"user_id\"",
            ));
        };
        let Some(key) = pair.path.get_ident().map(ToString::to_string) else {
            return Err(syn::Error::new_spanned(pair.path, "expected a plain attribute key"));
        };
        let value = match pair.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(value),
                ..
            }) => value,
            other => return Err(syn::Error::new_spanned(other, "expected a string literal")),
        };

        let columns = &mut options.columns;
        match key.as_str() {
            "traits" => {
                options.traits = value.parse::<Path>().map_err(|err| {
                    syn::Error::new(value.span(), format!("invalid traits path: {err}"))
                })?;
            }
            "active_model" => options.active_model = lit_ident(&value),
            "id" => columns.id = lit_ident(&value),
            "created_at" => columns.created_at = lit_ident(&value),
            "updated_at" => columns.updated_at = lit_ident(&value),
            "owner" => columns.owner = Some(lit_ident(&value)),
            "expires" => columns.expires = Some(lit_ident(&value)),
            other => {
                return Err(syn::Error::new(
                    value.span(),
                    format!("unknown base_entity key `{other}`"),
                ));
            }
        }
    }

    Ok(options)
}

fn lit_ident(value: &LitStr) -> Ident {
    Ident::new(&value.value(), value.span())
}
