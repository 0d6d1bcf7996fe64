use anyhow::Result;
use darling::FromField;
use darling::util::PathList;
use darling::{FromDeriveInput, ast::Data};
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use syn::parse_macro_input;
use syn::{GenericArgument, GenericParam, Generics, Lifetime, LifetimeParam, PathArguments, Type};
use thiserror::Error;

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named, struct_unit))]
struct OptionsReceiver {
    ident: syn::Ident,
    generics: Generics,
    data: Data<(), OptionReceiver>,
}

#[derive(Debug, FromField)]
#[darling(attributes(option))]
struct OptionReceiver {
    ident: Option<syn::Ident>,
    ty: syn::Type,
    /// Override the name of the command option
    #[darling(default)]
    name: Option<String>,
    /// Set the description of the command option
    #[darling(default)]
    description: Option<String>,
    /// For channel options, restrict to specific channel types
    #[darling(default)]
    channel_types: Option<PathList>,
}

pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as syn::DeriveInput);
    let receiver = match OptionsReceiver::from_derive_input(&input) {
        Ok(r) => r,
        Err(e) => return e.write_errors().into(),
    };

    if receiver.generics.type_params().next().is_some() {
        return darling::Error::custom("FromOptions cannot be derived for generic structs")
            .with_span(&receiver.generics)
            .write_errors()
            .into();
    }

    let fields = match receiver.data.take_struct() {
        Some(fields) => fields.fields,
        None => {
            return darling::Error::custom("only structs are supported")
                .write_errors()
                .into();
        }
    };
    let options = fields
        .iter()
        .map(field_option)
        .collect::<Vec<proc_macro2::TokenStream>>();

    let field_names: Result<Vec<(String, Ident)>> = fields.iter().map(field_name).collect();
    let field_names = match field_names {
        Ok(names) => names,
        Err(e) => return darling::Error::custom(e.to_string()).write_errors().into(),
    };

    let struct_fields = field_names.iter().map(|(name, field_ident)| {
        quote! {
            #field_ident: ::twilight_command_router::arguments::parse(options, #name)?
        }
    });
    let unused = field_names.is_empty().then(|| quote! { let _ = options; });

    // The options borrow from the interaction, so a struct holding borrowed values reads them
    // for its own lifetime. Owned structs work for any lifetime.
    let mut generics = receiver.generics.clone();
    let lifetime = match generics.lifetimes().next() {
        Some(param) => param.lifetime.clone(),
        None => {
            let lifetime = Lifetime::new("'__options", Span::call_site());
            generics
                .params
                .insert(0, GenericParam::Lifetime(LifetimeParam::new(lifetime.clone())));
            lifetime
        }
    };
    let (impl_generics, _, where_clause) = generics.split_for_impl();
    let (_, ty_generics, _) = receiver.generics.split_for_impl();
    let ident = receiver.ident;

    quote! {
        #[automatically_derived]
        impl #impl_generics ::twilight_command_router::arguments::FromOptions<#lifetime> for #ident #ty_generics #where_clause {
            fn options() -> Vec<::twilight_command_router::arguments::CommandOption> {
                vec![
                    #(#options),*
                ]
            }

            fn from_options(options: &::twilight_command_router::options::OptionMap<#lifetime>) -> ::anyhow::Result<Self> {
                #unused
                Ok(Self {
                    #(#struct_fields,)*
                })
            }
        }
    }
    .into()
}

fn field_option(field: &OptionReceiver) -> proc_macro2::TokenStream {
    let name = match get_name(field) {
        Ok(name) => name,
        Err(e) => return e.to_compile_error(),
    };
    let default_description = "No description provided".to_string();
    let description = field.description.as_ref().unwrap_or(&default_description);
    let ty = &field.ty;

    if field.channel_types.is_some() && !validate_channel_type(ty) {
        return darling::Error::custom(
            "channel_types can only be specified for channel fields (Id<ChannelMarker> or ResolvableChannel)",
        )
        .with_span(ty)
        .write_errors();
    }

    let option = quote! {
        <#ty as ::twilight_command_router::arguments::ToOption>::to_option()
            .name(#name)
            .description(#description)
    };

    match &field.channel_types {
        Some(types) => {
            let types = types
                .iter()
                .map(|path| quote! { ::twilight_model::channel::ChannelType::#path });
            quote! {
                #option.channel_types(vec![#(#types),*])
            }
        }
        None => option,
    }
}

#[derive(Error, Debug)]
enum FieldNameError {
    #[error(transparent)]
    GetNameError(#[from] GetNameError),
    #[error("Field is missing an identifier")]
    MissingIdent,
}

fn field_name(field: &OptionReceiver) -> Result<(String, Ident)> {
    let name = get_name(field).map_err(FieldNameError::from)?;
    let ident = field
        .ident
        .as_ref()
        .ok_or(FieldNameError::MissingIdent)?
        .clone();
    Ok((name, ident))
}

#[derive(Error, Debug)]
enum GetNameError {
    #[error("Unable to determine field name for option")]
    MissingFieldName,
}

impl GetNameError {
    fn to_compile_error(&self) -> proc_macro2::TokenStream {
        darling::Error::custom(self.to_string()).write_errors()
    }
}

/// Gets the name of an `OptionReceiver`
fn get_name(field: &OptionReceiver) -> Result<String, GetNameError> {
    if let Some(name) = &field.name {
        Ok(name.clone())
    } else if let Some(ident) = &field.ident {
        Ok(ident.to_string())
    } else {
        Err(GetNameError::MissingFieldName)
    }
}

/// Whether `type_` is a channel id or resolvable channel, optionally wrapped in `Option`.
fn validate_channel_type(type_: &Type) -> bool {
    let Type::Path(type_path) = type_ else {
        return false;
    };
    let Some(segment) = type_path.path.segments.last() else {
        return false;
    };

    if segment.ident == "ResolvableChannel" {
        return true;
    }
    if (segment.ident == "Id" || segment.ident == "Option")
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        if segment.ident == "Option" {
            return validate_channel_type(inner);
        }
        if let Type::Path(inner_type_path) = inner
            && let Some(inner_segment) = inner_type_path.path.segments.last()
        {
            return inner_segment.ident == "ChannelMarker";
        }
    }
    false
}
