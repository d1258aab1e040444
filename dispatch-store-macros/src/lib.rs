//! Procedural macros for dispatch-store

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Prefix reserved for the store's own actions.
const RESERVED_PREFIX: &str = "@@";

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Also implement `ActionSummary` with its default `Debug` summary
    #[darling(default)]
    summary: bool,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit name override, e.g. the wire tag `"SET_NUM_ROUNDS"`
    #[darling(default)]
    name: Option<String>,
}

impl ActionVariant {
    fn action_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.ident.to_string())
    }

    /// `Enum::Variant { .. } => "name"`, shaped to the variant's fields.
    fn name_arm(&self, enum_ident: &syn::Ident) -> TokenStream2 {
        let variant = &self.ident;
        let action_name = self.action_name();

        let pattern = match self.fields.style {
            darling::ast::Style::Unit => quote! { #enum_ident::#variant },
            darling::ast::Style::Tuple => quote! { #enum_ident::#variant(..) },
            darling::ast::Style::Struct => quote! { #enum_ident::#variant { .. } },
        };
        quote! { #pattern => #action_name }
    }
}

/// Derive macro for the Action trait
///
/// Generates `name()` returning the variant name, or the value of
/// `#[action(name = "...")]` on the variant. Also generates an associated
/// `ACTION_NAMES` constant listing every name in declaration order.
///
/// With `#[action(summary)]` on the enum, also implements `ActionSummary`
/// using the default `Debug`-based summary.
///
/// Names starting with `@@` are reserved for the store and rejected.
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug, Serialize, Deserialize)]
/// #[action(summary)]
/// #[serde(tag = "type")]
/// enum AppAction {
///     #[action(name = "SET_NUM_ROUNDS")]
///     #[serde(rename = "SET_NUM_ROUNDS")]
///     SetNumRounds { value: u32 },
///     LoadAll,
/// }
///
/// assert_eq!(AppAction::LoadAll.name(), "LoadAll");
/// assert_eq!(AppAction::ACTION_NAMES, &["SET_NUM_ROUNDS", "LoadAll"]);
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    if let Some(reserved) = variants
        .iter()
        .find(|v| v.action_name().starts_with(RESERVED_PREFIX))
    {
        return syn::Error::new_spanned(
            &reserved.ident,
            format!(
                "action name `{}` uses the reserved `{}` prefix",
                reserved.action_name(),
                RESERVED_PREFIX
            ),
        )
        .to_compile_error()
        .into();
    }

    let name_arms: Vec<TokenStream2> = variants.iter().map(|v| v.name_arm(name)).collect();

    let all_names: Vec<String> = variants.iter().map(ActionVariant::action_name).collect();

    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let mut expanded = quote! {
        impl #impl_generics ::dispatch_store::Action for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                match self {
                    #(#name_arms),*
                }
            }
        }

        impl #impl_generics #name #ty_generics #where_clause {
            /// Every action name of this type, in declaration order.
            pub const ACTION_NAMES: &'static [&'static str] = &[#(#all_names),*];
        }
    };

    if opts.summary {
        expanded.extend(quote! {
            impl #impl_generics ::dispatch_store::ActionSummary for #name #ty_generics #where_clause {}
        });
    }

    TokenStream::from(expanded)
}
