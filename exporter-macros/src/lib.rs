use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, ImplItem, ImplItemFn, ItemImpl, Stmt,
    Variant, Visibility,
};

/// Turns a plain enum into an exporter error type.
///
/// The macro:
/// 1. Adds `#[derive(Debug, thiserror::Error, uniffi::Error)]` and `#[uniffi(flat_error)]`
/// 2. Appends a `Generic { message: String }` variant unless one is declared
/// 3. Implements `From<anyhow::Error>`, flattening the cause chain into `message`
///
/// # Usage
///
/// ```rust,ignore
/// #[exporter_error]
/// pub enum UploadError {
///     #[error("gateway rejected payload {label}")]
///     Rejected { label: String },
/// }
/// ```
#[proc_macro_attribute]
pub fn exporter_error(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(&input, "exporter_error can only be applied to enums")
            .to_compile_error()
            .into();
    };

    let enum_name = &input.ident;
    let visibility = &input.vis;
    let generics = &input.generics;

    // derive/uniffi attributes are regenerated below
    let attrs: Vec<_> = input
        .attrs
        .iter()
        .filter(|attr| !attr.path().is_ident("derive") && !attr.path().is_ident("uniffi"))
        .collect();

    let mut variants = data_enum.variants.clone();
    if !variants.iter().any(|variant| variant.ident == "Generic") {
        let generic_variant: Variant = syn::parse_quote! {
            /// Any other failure, with its cause chain flattened into one message.
            #[error("{message}")]
            Generic {
                /// Flattened error message.
                message: String
            }
        };
        variants.push(generic_variant);
    }

    quote! {
        #[derive(Debug, thiserror::Error, uniffi::Error)]
        #[uniffi(flat_error)]
        #(#attrs)*
        #visibility enum #enum_name #generics {
            #variants
        }

        impl #generics From<anyhow::Error> for #enum_name #generics {
            fn from(err: anyhow::Error) -> Self {
                let mut message = err.to_string();
                let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
                if !causes.is_empty() {
                    message.push_str(" (caused by: ");
                    message.push_str(&causes.join(" -> "));
                    message.push(')');
                }
                Self::Generic { message }
            }
        }
    }
    .into()
}

/// Wraps `uniffi::export` and opens a logging scope in every public method.
///
/// Each `pub fn` of the impl block starts with
/// `let _exporter_log_ctx = crate::primitives::logger::LogContext::new("TypeName");`.
/// The body of a `pub async fn` additionally runs inside a fresh `LOG_CONTEXT` task-local
/// scope, and `async_runtime = "tokio"` is added to the export.
///
/// # Usage
///
/// ```rust,ignore
/// #[exporter_export]
/// impl MigrationListener {
///     pub fn cloud_app_key(&self) -> String {
///         info!("prefixed with [Exporter][MigrationListener]");
///         APP_KEY.to_string()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn exporter_export(args: TokenStream, input: TokenStream) -> TokenStream {
    let input_impl = parse_macro_input!(input as ItemImpl);

    let type_name = match &*input_impl.self_ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map_or_else(|| "Unknown".to_string(), |segment| segment.ident.to_string()),
        _ => "Unknown".to_string(),
    };

    let needs_runtime = has_public_async_fn(&input_impl.items);

    let items = input_impl
        .items
        .iter()
        .map(|item| match item {
            ImplItem::Fn(method) if matches!(method.vis, Visibility::Public(_)) => {
                let mut method = method.clone();
                open_log_scope(&mut method, &type_name);
                ImplItem::Fn(method)
            }
            other => other.clone(),
        })
        .collect();

    let new_impl = ItemImpl {
        items,
        ..input_impl
    };

    let mut args = proc_macro2::TokenStream::from(args);
    if needs_runtime {
        args = if args.is_empty() {
            quote! { async_runtime = "tokio" }
        } else {
            quote! { #args, async_runtime = "tokio" }
        };
    }

    quote! {
        #[uniffi::export(#args)]
        #new_impl
    }
    .into()
}

fn has_public_async_fn(items: &[ImplItem]) -> bool {
    items.iter().any(|item| {
        matches!(item, ImplItem::Fn(method)
            if matches!(method.vis, Visibility::Public(_)) && method.sig.asyncness.is_some())
    })
}

fn open_log_scope(method: &mut ImplItemFn, type_name: &str) {
    let scope: Stmt = syn::parse_quote! {
        let _exporter_log_ctx = crate::primitives::logger::LogContext::new(#type_name);
    };

    if method.sig.asyncness.is_none() {
        method.block.stmts.insert(0, scope);
        return;
    }

    // async bodies may resume on another worker thread, so the scope lives in a task-local
    let stmts = &method.block.stmts;
    method.block = syn::parse_quote! {{
        crate::primitives::logger::LOG_CONTEXT
            .scope(::std::cell::RefCell::new(None), async move {
                #scope
                #(#stmts)*
            })
            .await
    }};
}
