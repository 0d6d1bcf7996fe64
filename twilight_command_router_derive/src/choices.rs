use std::collections::HashSet;

use darling::ast::Data;
use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Ident, parse_macro_input};

/// Discord rejects string options with more choices than this.
const MAX_CHOICES: usize = 25;

#[derive(FromDeriveInput)]
#[darling(attributes(choice), supports(enum_unit))]
struct ChoicesReceiver {
    ident: Ident,
    data: Data<ChoiceReceiver, ()>,
}

#[derive(FromVariant)]
#[darling(attributes(choice))]
struct ChoiceReceiver {
    ident: Ident,
    /// Label shown in the client, defaults to the variant name
    #[darling(default)]
    name: Option<String>,
    /// Value sent back by Discord, defaults to the variant name
    #[darling(default)]
    value: Option<String>,
}

/// One variant with its defaults filled in.
struct Choice {
    variant: Ident,
    name: String,
    value: String,
}

impl From<&ChoiceReceiver> for Choice {
    fn from(receiver: &ChoiceReceiver) -> Self {
        let fallback = receiver.ident.to_string();
        Choice {
            variant: receiver.ident.clone(),
            name: receiver.name.clone().unwrap_or_else(|| fallback.clone()),
            value: receiver.value.clone().unwrap_or(fallback),
        }
    }
}

fn collect_choices(receiver: &ChoicesReceiver) -> darling::Result<Vec<Choice>> {
    let Some(variants) = receiver.data.as_ref().take_enum() else {
        return Err(darling::Error::custom("only enums are supported"));
    };
    if variants.is_empty() {
        return Err(darling::Error::custom("Enums without variants have no choices"));
    }
    if variants.len() > MAX_CHOICES {
        return Err(darling::Error::custom(format!(
            "Enums with more than {MAX_CHOICES} variants are not supported"
        )));
    }

    let choices = variants.into_iter().map(Choice::from).collect::<Vec<_>>();
    let mut seen = HashSet::new();
    for choice in &choices {
        if !seen.insert(choice.value.as_str()) {
            return Err(
                darling::Error::custom(format!("Duplicate choice value found: {}", choice.value))
                    .with_span(&choice.variant),
            );
        }
    }
    Ok(choices)
}

pub fn derive(tokens: TokenStream) -> TokenStream {
    let input = parse_macro_input!(tokens as DeriveInput);
    let receiver = match ChoicesReceiver::from_derive_input(&input) {
        Ok(receiver) => receiver,
        Err(err) => return err.write_errors().into(),
    };
    let choices = match collect_choices(&receiver) {
        Ok(choices) => choices,
        Err(err) => return err.write_errors().into(),
    };

    let ident = &receiver.ident;
    let listed = choices.iter().map(|Choice { name, value, .. }| {
        quote! {
            ::twilight_model::application::command::CommandOptionChoice {
                name: #name.to_string(),
                name_localizations: None,
                value: ::twilight_model::application::command::CommandOptionChoiceValue::String(#value.to_string()),
            }
        }
    });
    let to_value = choices.iter().map(|Choice { variant, value, .. }| {
        quote! { #ident::#variant => #value }
    });
    let from_value = choices.iter().map(|Choice { variant, value, .. }| {
        quote! { #value => Some(#ident::#variant) }
    });

    quote! {
        #[automatically_derived]
        impl ::twilight_command_router::arguments::Choices for #ident {
            fn choices() -> Vec<::twilight_model::application::command::CommandOptionChoice> {
                vec![#(#listed),*]
            }

            fn value(&self) -> &'static str {
                match self {
                    #(#to_value,)*
                }
            }

            fn from_value(value: &str) -> Option<Self> {
                match value {
                    #(#from_value,)*
                    _ => None,
                }
            }
        }

        #[automatically_derived]
        impl ::twilight_command_router::arguments::ToOption for #ident {
            fn to_option() -> ::twilight_command_router::arguments::CommandOption {
                ::twilight_command_router::arguments::CommandOption::new(
                    ::twilight_model::application::command::CommandOptionType::String
                )
                .choices(<Self as ::twilight_command_router::arguments::Choices>::choices())
            }
        }

        #[automatically_derived]
        impl<'__options> ::twilight_command_router::arguments::ArgumentConverter<'__options> for #ident {
            fn convert(value: &::twilight_command_router::options::OptionValue<'__options>) -> ::anyhow::Result<Self> {
                match value {
                    ::twilight_command_router::options::OptionValue::String(value) => {
                        <Self as ::twilight_command_router::arguments::Choices>::from_value(value)
                            .ok_or_else(|| ::anyhow::anyhow!(::twilight_command_router::arguments::Error::InvalidType))
                    }
                    _ => Err(::anyhow::anyhow!(::twilight_command_router::arguments::Error::InvalidType)),
                }
            }
        }
    }
    .into()
}
