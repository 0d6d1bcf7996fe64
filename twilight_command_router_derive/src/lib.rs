use proc_macro::TokenStream;

mod choices;
mod options;

/// Implements `FromOptions` for a struct, one command option per named field.
///
/// Fields accept `#[option(name = "...", description = "...", channel_types(GuildText, ...))]`.
#[proc_macro_derive(FromOptions, attributes(option))]
pub fn from_options_derive(input: TokenStream) -> TokenStream {
    options::derive(input)
}

/// Turns a unit enum into a string option with one choice per variant.
#[proc_macro_derive(Choices, attributes(choice))]
pub fn enum_choices_derive(input: TokenStream) -> TokenStream {
    choices::derive(input)
}
