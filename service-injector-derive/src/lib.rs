//! Derive macro for service-injector
//!
//! `#[derive(Inject)]` writes the field descriptors that
//! `service_injector::inject` walks.
//!
//! # Example
//!
//! ```rust,ignore
//! use service_injector::{BoxError, Inject, PostInject, Registry};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Default, Inject)]
//! struct Metrics {
//!     #[inject(key = "metrics.prefix", optional)]
//!     pub prefix: String,
//! }
//!
//! #[derive(Default, Inject)]
//! #[inject(post_inject)]
//! struct UserService {
//!     #[inject("db")]
//!     pub db: Option<Arc<Database>>,
//!     #[inject(embed)]
//!     pub metrics: Metrics,
//!     // Not annotated, left alone
//!     pub request_count: u64,
//! }
//!
//! impl PostInject for UserService {
//!     fn post_inject(&mut self) -> Result<(), BoxError> {
//!         self.db.as_ref().ok_or("database missing")?;
//!         Ok(())
//!     }
//! }
//!
//! let registry = Registry::new();
//! registry.set("db", Database { url: "postgres://localhost".into() })?;
//!
//! let mut users = UserService::default();
//! registry.inject(&mut users)?;
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{
    Attribute, Data, DeriveInput, Fields, Ident, Lit, LitStr, Type, Visibility, parse_macro_input,
    parse_quote,
};

/// Derive macro for field injection.
///
/// Implements `service_injector::Inject` for a struct with named fields.
///
/// # Field Attributes
///
/// - `#[inject("key")]` or `#[inject(key = "key")]` - Resolve the field from
///   the registry key.
/// - `#[inject(key = "key", optional)]` - Leave the field unchanged if the
///   key cannot be resolved. `optional = "..."` takes a boolean spelling
///   (`true`, `false`, `1`, `0`, `t`, `f`, ...) checked at injection time.
/// - `#[inject(embed)]` - Inject the fields of a nested struct in the same
///   pass. The field type must implement `Inject`. An `Option<T>` field is
///   filled with `T::default()` when empty, and emptied again if `T` has no
///   annotated fields.
///
/// Fields without `#[inject]` are left alone. Annotated fields must be
/// `pub`: injecting into a private field fails with `InvalidField`, and a
/// private embedded field is skipped.
///
/// The value conversion is picked from the field type: `Arc<T>` shares the
/// registered `T`, `Option<X>` converts to `X` and wraps it in `Some`, and
/// any other type clones the registered value.
///
/// # Struct Attributes
///
/// - `#[inject(post_inject)]` - Call `PostInject::post_inject` once the
///   struct's fields are injected.
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!('static));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Inject can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Inject can only be derived for structs",
            ));
        }
    };

    let mut descriptors = Vec::new();
    for field in fields {
        let Some(attr) = FieldAttr::parse(&field.attrs)? else {
            continue;
        };
        // Named fields always carry an ident
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        descriptors.push(field_descriptor(ident, &field.ty, &field.vis, attr)?);
    }

    let hook = if has_post_inject(&input.attrs)? {
        quote! { .hook(<Self as ::service_injector::PostInject>::post_inject) }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::service_injector::Inject for #name #ty_generics #where_clause {
            fn describe() -> ::service_injector::Descriptor<Self> {
                ::service_injector::Descriptor::new()
                    #(.field(#descriptors))*
                    #hook
            }
        }
    })
}

// =============================================================================
// Attribute parsing
// =============================================================================

/// Parsed `#[inject(...)]` on a field
enum FieldAttr {
    Service {
        key: LitStr,
        optional: Option<LitStr>,
    },
    Embed,
}

impl FieldAttr {
    fn parse(attrs: &[Attribute]) -> syn::Result<Option<Self>> {
        let mut parsed = None;

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
            if parsed.is_some() {
                return Err(syn::Error::new_spanned(attr, "duplicate #[inject] attribute"));
            }
            parsed = Some(Self::parse_one(attr)?);
        }

        Ok(parsed)
    }

    fn parse_one(attr: &Attribute) -> syn::Result<Self> {
        if attr.meta.require_path_only().is_ok() {
            return Err(syn::Error::new_spanned(
                attr,
                "expected #[inject(\"key\")] or #[inject(embed)]",
            ));
        }

        // #[inject("key")]
        if let Ok(key) = attr.parse_args::<LitStr>() {
            return Ok(Self::Service {
                key,
                optional: None,
            });
        }

        let mut key = None;
        let mut optional = None;
        let mut embed = false;

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key") {
                key = Some(meta.value()?.parse::<LitStr>()?);
            } else if meta.path.is_ident("optional") {
                let annotation = if meta.input.peek(syn::Token![=]) {
                    match meta.value()?.parse::<Lit>()? {
                        Lit::Str(value) => value,
                        Lit::Bool(value) => LitStr::new(
                            if value.value { "true" } else { "false" },
                            value.span(),
                        ),
                        other => {
                            return Err(syn::Error::new_spanned(
                                other,
                                "optional expects a string or boolean",
                            ));
                        }
                    }
                } else {
                    LitStr::new("true", meta.path.span())
                };
                optional = Some(annotation);
            } else if meta.path.is_ident("embed") {
                embed = true;
            } else {
                return Err(meta.error("unsupported inject attribute"));
            }
            Ok(())
        })?;

        match (key, embed) {
            (Some(key), false) => Ok(Self::Service { key, optional }),
            (None, true) if optional.is_none() => Ok(Self::Embed),
            (None, true) => Err(syn::Error::new_spanned(
                attr,
                "embedded fields cannot be optional",
            )),
            (Some(_), true) => Err(syn::Error::new_spanned(
                attr,
                "a field is either embedded or resolved from a key, not both",
            )),
            (None, false) => Err(syn::Error::new_spanned(attr, "missing registry key")),
        }
    }
}

fn has_post_inject(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut found = false;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("post_inject") {
                found = true;
                Ok(())
            } else {
                Err(meta.error("unsupported inject attribute"))
            }
        })?;
    }

    Ok(found)
}

// =============================================================================
// Code generation
// =============================================================================

fn field_descriptor(
    ident: &Ident,
    ty: &Type,
    vis: &Visibility,
    attr: FieldAttr,
) -> syn::Result<TokenStream2> {
    let name = ident.unraw().to_string();
    let settable = !matches!(vis, Visibility::Inherited);

    let tokens = match attr {
        FieldAttr::Service { key, optional } => {
            let optional = optional.map(|annotation| quote! { .optional(#annotation) });

            if settable {
                let service = Ident::new("__service", ident.span());
                let conversion = conversion(ty, &service);
                quote! {
                    ::service_injector::Field::service::<#ty>(
                        #name,
                        #key,
                        |__target: &mut Self, #service: &::service_injector::Service| {
                            match #conversion {
                                ::std::option::Option::Some(__value) => {
                                    __target.#ident = __value;
                                    true
                                }
                                ::std::option::Option::None => false,
                            }
                        },
                    )
                    #optional
                }
            } else {
                quote! {
                    ::service_injector::Field::sealed::<#ty>(#name, #key) #optional
                }
            }
        }
        FieldAttr::Embed if !settable => {
            quote! { ::service_injector::Field::hidden(#name) }
        }
        FieldAttr::Embed => {
            let walk = if generic_arg(ty, "Option").is_some() {
                quote! { ::service_injector::__private::walk_optional }
            } else {
                quote! { ::service_injector::__private::walk_embedded }
            };
            quote! {
                ::service_injector::Field::embedded(
                    #name,
                    |__target: &mut Self, __registry: &dyn ::service_injector::Resolve| {
                        #walk(&mut __target.#ident, __registry)
                    },
                )
            }
        }
    };

    Ok(tokens)
}

/// Expression converting `service` to `Option<ty>`
fn conversion(ty: &Type, service: &Ident) -> TokenStream2 {
    match generic_arg(ty, "Option") {
        Some(inner) => {
            let inner = shared_or_cloned(inner, service);
            quote! { (#inner).map(::std::option::Option::Some) }
        }
        None => shared_or_cloned(ty, service),
    }
}

fn shared_or_cloned(ty: &Type, service: &Ident) -> TokenStream2 {
    match generic_arg(ty, "Arc") {
        // Unsized values can only be registered as an Arc
        Some(inner) if is_unsized(inner) => quote! { #service.shared::<#inner>() },
        Some(inner) => quote! { #service.downcast::<#inner>() },
        None => quote! { #service.cloned::<#ty>() },
    }
}

/// Whether a type is known to be dynamically sized
fn is_unsized(ty: &Type) -> bool {
    match ty {
        Type::TraitObject(_) | Type::Slice(_) => true,
        Type::Paren(paren) => is_unsized(&paren.elem),
        Type::Group(group) => is_unsized(&group.elem),
        Type::Path(type_path) => type_path.qself.is_none()
            && type_path.path.segments.last().is_some_and(|segment| {
                matches!(segment.arguments, syn::PathArguments::None)
                    && ["str", "Path", "OsStr", "CStr"]
                        .iter()
                        .any(|name| segment.ident == name)
            }),
        _ => false,
    }
}

/// Extract T from Wrapper<T>
fn generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(input: DeriveInput) -> String {
        expand(&input).unwrap().to_string()
    }

    #[test]
    fn test_conversions() {
        let service: Ident = parse_quote!(s);

        let arc: Type = parse_quote!(Arc<Database>);
        assert_eq!(conversion(&arc, &service).to_string(), "s . downcast :: < Database > ()");

        let opt: Type = parse_quote!(Option<Arc<Database>>);
        assert!(conversion(&opt, &service).to_string().contains("downcast :: < Database >"));

        let value: Type = parse_quote!(String);
        assert_eq!(conversion(&value, &service).to_string(), "s . cloned :: < String > ()");

        let dyn_arc: Type = parse_quote!(Arc<dyn Store + Send + Sync>);
        assert!(conversion(&dyn_arc, &service).to_string().contains("shared :: < dyn Store"));

        let str_arc: Type = parse_quote!(Option<Arc<str>>);
        assert!(conversion(&str_arc, &service).to_string().contains("s . shared :: < str > ()"));

        let slice_arc: Type = parse_quote!(Arc<[u8]>);
        assert!(conversion(&slice_arc, &service).to_string().starts_with("s . shared :: <"));
    }

    #[test]
    fn test_field_attrs() {
        let item: DeriveInput = parse_quote! {
            #[inject(post_inject)]
            struct Target {
                #[inject("a")]
                pub a: u32,
                #[inject(key = "b", optional)]
                pub b: u32,
                #[inject(key = "c", optional = "yup")]
                c: u32,
                #[inject(embed)]
                pub inner: Option<Inner>,
                #[inject(embed)]
                hidden: Inner,
                plain: u32,
            }
        };

        let out = expand_str(item);
        assert!(out.contains("Field :: service :: < u32 > (\"a\" , \"a\""));
        assert!(out.contains(". optional (\"true\")"));
        assert!(out.contains("Field :: sealed :: < u32 > (\"c\" , \"c\") . optional (\"yup\")"));
        assert!(out.contains("walk_optional"));
        assert!(out.contains("Field :: hidden (\"hidden\")"));
        assert!(!out.contains("\"plain\""));
        assert!(out.contains("PostInject > :: post_inject"));
    }

    #[test]
    fn test_rejects_bad_attrs() {
        let both: DeriveInput = parse_quote! {
            struct Target {
                #[inject(key = "a", embed)]
                pub a: Inner,
            }
        };
        assert!(expand(&both).is_err());

        let bare: DeriveInput = parse_quote! {
            struct Target {
                #[inject]
                pub a: u32,
            }
        };
        assert!(expand(&bare).is_err());

        let tuple: DeriveInput = parse_quote! {
            struct Target(u32);
        };
        assert!(expand(&tuple).is_err());
    }
}
