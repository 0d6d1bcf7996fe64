use anyhow::{Context, Result, anyhow};
use twilight_model::{
    application::command::{CommandOptionChoice, CommandOptionType, CommandOptionValue as Bound},
    channel::ChannelType,
};

use crate::options::{OptionMap, OptionValue};

/// Declaration of a single command option, converted into twilight's `CommandOption` when a
/// command is built.
///
/// Converters declare the constraints Discord can check on its own: narrow integer types carry
/// their value range and `char` a length of exactly one.
#[derive(Debug, Clone)]
pub struct CommandOption {
    pub kind: CommandOptionType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub autocomplete: Option<bool>,
    pub choices: Option<Vec<CommandOptionChoice>>,
    pub channel_types: Option<Vec<ChannelType>>,
    /// Inclusive value range of integer and number options.
    pub min_value: Option<Bound>,
    pub max_value: Option<Bound>,
    /// Inclusive length range of string options.
    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid type for command argument")]
    InvalidType,
    #[error("Missing required command argument")]
    MissingArgument,
}

/// Types that know which option declaration they are read from.
pub trait ToOption {
    fn to_option() -> CommandOption;
}

/// A fixed set of string values, usually derived with `#[derive(Choices)]`.
///
/// The choices can also serve as suggestions from an autocomplete handler.
pub trait Choices: Sized {
    /// Every choice, in declaration order.
    fn choices() -> Vec<CommandOptionChoice>;

    /// The value Discord sends back for this choice.
    fn value(&self) -> &'static str;

    fn from_value(value: &str) -> Option<Self>;
}

/// Conversion from an option value that may be absent.
pub trait OptionalArgumentConverter<'a>: Sized {
    fn convert(value: Option<&OptionValue<'a>>) -> Result<Self>;
}

/// Conversion from an option value that must be present.
pub trait ArgumentConverter<'a>: Sized {
    fn convert(value: &OptionValue<'a>) -> Result<Self>;
}

/// A set of arguments read from the options of one invocation, usually derived with
/// `#[derive(FromOptions)]`.
pub trait FromOptions<'a>: Sized {
    /// The option declarations, in field order.
    fn options() -> Vec<CommandOption>;

    fn from_options(options: &OptionMap<'a>) -> Result<Self>;
}

impl<'a, T: OptionalArgumentConverter<'a>> OptionalArgumentConverter<'a> for Option<T> {
    fn convert(value: Option<&OptionValue<'a>>) -> Result<Self> {
        match value {
            Some(_) => Ok(Some(<T as OptionalArgumentConverter<'a>>::convert(value)?)),
            None => Ok(None),
        }
    }
}

impl<'a, T: ArgumentConverter<'a>> OptionalArgumentConverter<'a> for T {
    fn convert(value: Option<&OptionValue<'a>>) -> Result<Self> {
        match value {
            Some(value) => <T as ArgumentConverter<'a>>::convert(value),
            None => Err(anyhow!(Error::MissingArgument)),
        }
    }
}

impl CommandOption {
    pub fn new(kind: CommandOptionType) -> Self {
        CommandOption {
            kind,
            name: None,
            description: None,
            required: true,
            autocomplete: None,
            choices: None,
            channel_types: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
        }
    }

    /// Restricts an integer option to `min..=max`.
    pub fn integer_range<T>(self, min: T, max: T) -> Self
    where
        i64: From<T>,
    {
        self.value_range(Bound::Integer(min.into()), Bound::Integer(max.into()))
    }

    pub fn value_range(mut self, min: Bound, max: Bound) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn length_range(mut self, min: u16, max: u16) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn autocomplete(mut self, autocomplete: bool) -> Self {
        self.autocomplete = Some(autocomplete);
        self
    }

    pub fn channel_types(mut self, channel_types: Vec<ChannelType>) -> Self {
        self.channel_types = Some(channel_types);
        self
    }

    pub fn choices(mut self, choices: Vec<CommandOptionChoice>) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Reads the option called `name` from `options` and converts it into `T`.
///
/// Absent options only convert into `Option<T>`; for any other `T` a missing option is an error.
pub fn parse<'a, T: OptionalArgumentConverter<'a>>(
    options: &OptionMap<'a>,
    name: &str,
) -> Result<T> {
    T::convert(options.get(name)).with_context(|| format!("failed to read option `{name}`"))
}

impl<T: ToOption> ToOption for Option<T> {
    fn to_option() -> CommandOption {
        T::to_option().required(false)
    }
}

impl From<CommandOption> for twilight_model::application::command::CommandOption {
    fn from(option: CommandOption) -> Self {
        twilight_model::application::command::CommandOption {
            kind: option.kind,
            name: option.name.unwrap_or_default(),
            name_localizations: None,
            description: option.description.unwrap_or_default(),
            description_localizations: None,
            required: Some(option.required),
            autocomplete: option.autocomplete,
            choices: option.choices,
            channel_types: option.channel_types,
            min_value: option.min_value,
            max_value: option.max_value,
            min_length: option.min_length,
            max_length: option.max_length,
            options: None,
        }
    }
}
