use anyhow::{Result, anyhow};
use twilight_model::{
    application::command::CommandOptionType,
    id::{
        Id,
        marker::{ChannelMarker, GenericMarker, RoleMarker, UserMarker},
    },
};

use crate::{
    arguments::{ArgumentConverter, CommandOption, Error, ToOption},
    options::OptionValue,
    resolvable::{
        ResolvableChannel, ResolvableMentionable, ResolvableMessage, ResolvableRole,
        ResolvableUser,
    },
};

impl<'a> ArgumentConverter<'a> for String {
    fn convert(value: &OptionValue<'a>) -> Result<Self> {
        if let OptionValue::String(value) = value {
            Ok(value.to_string())
        } else {
            Err(anyhow!(Error::InvalidType))
        }
    }
}

impl ToOption for String {
    fn to_option() -> CommandOption {
        CommandOption::new(CommandOptionType::String)
    }
}

impl<'a> ArgumentConverter<'a> for &'a str {
    fn convert(value: &OptionValue<'a>) -> Result<Self> {
        if let OptionValue::String(value) = value {
            Ok(*value)
        } else {
            Err(anyhow!(Error::InvalidType))
        }
    }
}

impl ToOption for &str {
    fn to_option() -> CommandOption {
        CommandOption::new(CommandOptionType::String)
    }
}

// Integers arrive as i64 and numbers as f64; both narrow with `as`, so floats truncate toward
// zero and out-of-range values saturate or wrap like any other cast.
macro_rules! numeric_converter {
    ($ty:ty => $option:expr) => {
        impl<'a> ArgumentConverter<'a> for $ty {
            fn convert(value: &OptionValue<'a>) -> Result<Self> {
                match value {
                    OptionValue::Integer(value) => Ok(*value as $ty),
                    OptionValue::Number(value) => Ok(*value as $ty),
                    _ => Err(anyhow!(Error::InvalidType)),
                }
            }
        }

        impl ToOption for $ty {
            fn to_option() -> CommandOption {
                $option
            }
        }
    };
    ($ty:ty, $min:expr, $max:expr) => {
        numeric_converter!(
            $ty => CommandOption::new(CommandOptionType::Integer).integer_range($min, $max)
        );
    };
    ($ty:ty, $variant:expr) => {
        numeric_converter!($ty => CommandOption::new($variant));
    };
    ($ty:ty) => {
        numeric_converter!($ty, CommandOptionType::Number);
    };
}

/// Largest magnitude Discord accepts for an integer option.
const MAX_INTEGER: i64 = 1 << 53;

// Types narrower than Discord's integer range declare their bounds, so out-of-range values are
// rejected before they reach the cast.
numeric_converter!(i8, i8::MIN, i8::MAX);
numeric_converter!(i16, i16::MIN, i16::MAX);
numeric_converter!(i32, i32::MIN, i32::MAX);
numeric_converter!(i64, CommandOptionType::Integer);
numeric_converter!(isize, CommandOptionType::Integer);

numeric_converter!(u8, u8::MIN, u8::MAX);
numeric_converter!(u16, u16::MIN, u16::MAX);
numeric_converter!(u32, u32::MIN, u32::MAX);
numeric_converter!(u64, 0, MAX_INTEGER);
numeric_converter!(usize, 0, MAX_INTEGER);

numeric_converter!(f32);
numeric_converter!(f64);

impl<'a> ArgumentConverter<'a> for bool {
    fn convert(value: &OptionValue<'a>) -> Result<Self> {
        if let OptionValue::Boolean(v) = value {
            Ok(*v)
        } else {
            Err(anyhow!(Error::InvalidType))
        }
    }
}

impl ToOption for bool {
    fn to_option() -> CommandOption {
        CommandOption::new(CommandOptionType::Boolean)
    }
}

impl<'a> ArgumentConverter<'a> for char {
    fn convert(value: &OptionValue<'a>) -> Result<Self> {
        if let OptionValue::String(value) = value {
            value.chars().next().ok_or_else(|| anyhow!(Error::InvalidType))
        } else {
            Err(anyhow!(Error::InvalidType))
        }
    }
}

impl ToOption for char {
    fn to_option() -> CommandOption {
        CommandOption::new(CommandOptionType::String).length_range(1, 1)
    }
}

/// Implements conversion for a resolvable and for the bare id it wraps.
macro_rules! resolvable_converter {
    ($variant:ident, $resolvable:ident, $marker:ty, $kind:expr) => {
        impl<'a> ArgumentConverter<'a> for $resolvable<'a> {
            fn convert(value: &OptionValue<'a>) -> Result<Self> {
                if let OptionValue::$variant(resolvable) = value {
                    Ok(*resolvable)
                } else {
                    Err(anyhow!(Error::InvalidType))
                }
            }
        }

        impl ToOption for $resolvable<'_> {
            fn to_option() -> CommandOption {
                CommandOption::new($kind)
            }
        }

        impl<'a> ArgumentConverter<'a> for Id<$marker> {
            fn convert(value: &OptionValue<'a>) -> Result<Self> {
                <$resolvable<'a> as ArgumentConverter<'a>>::convert(value).map(|r| r.id())
            }
        }

        impl ToOption for Id<$marker> {
            fn to_option() -> CommandOption {
                CommandOption::new($kind)
            }
        }
    };
}

resolvable_converter!(User, ResolvableUser, UserMarker, CommandOptionType::User);
resolvable_converter!(Role, ResolvableRole, RoleMarker, CommandOptionType::Role);
// NOTE: Channel types are filtered as a part of the `FromOptions` derive macro
resolvable_converter!(
    Channel,
    ResolvableChannel,
    ChannelMarker,
    CommandOptionType::Channel
);
resolvable_converter!(
    Mentionable,
    ResolvableMentionable,
    GenericMarker,
    CommandOptionType::Mentionable
);

// Messages are only ever context-menu targets, so there is no option declaration for them.
impl<'a> ArgumentConverter<'a> for ResolvableMessage<'a> {
    fn convert(value: &OptionValue<'a>) -> Result<Self> {
        if let OptionValue::Message(message) = value {
            Ok(*message)
        } else {
            Err(anyhow!(Error::InvalidType))
        }
    }
}

#[cfg(test)]
mod tests {
    use twilight_model::application::command::CommandOptionValue as Bound;

    use crate::arguments::OptionalArgumentConverter;

    use super::*;

    fn convert<'a, T: OptionalArgumentConverter<'a>>(value: OptionValue<'a>) -> Result<T> {
        T::convert(Some(&value))
    }

    #[test]
    fn integers_narrow_by_truncation() {
        assert_eq!(convert::<i64>(OptionValue::Integer(42)).unwrap(), 42);
        assert_eq!(convert::<i32>(OptionValue::Number(2.9)).unwrap(), 2);
        assert_eq!(convert::<i32>(OptionValue::Number(-2.9)).unwrap(), -2);
        assert_eq!(convert::<u8>(OptionValue::Integer(300)).unwrap(), 44);
        assert_eq!(convert::<f64>(OptionValue::Integer(3)).unwrap(), 3.0);
    }

    #[test]
    fn narrow_types_declare_their_range() {
        let option = u8::to_option();
        assert_eq!(option.kind, CommandOptionType::Integer);
        assert_eq!(option.min_value, Some(Bound::Integer(0)));
        assert_eq!(option.max_value, Some(Bound::Integer(255)));

        let option = i32::to_option();
        assert_eq!(option.min_value, Some(Bound::Integer(i32::MIN.into())));
        assert_eq!(option.max_value, Some(Bound::Integer(i32::MAX.into())));

        let option = u64::to_option();
        assert_eq!(option.min_value, Some(Bound::Integer(0)));
        assert_eq!(option.max_value, Some(Bound::Integer(1 << 53)));
        assert_eq!(i64::to_option().min_value, None);
        assert_eq!(f64::to_option().max_value, None);

        let option = char::to_option();
        assert_eq!((option.min_length, option.max_length), (Some(1), Some(1)));
    }

    #[test]
    fn mismatched_values_are_invalid() {
        let error = convert::<bool>(OptionValue::String("yes")).unwrap_err();
        assert!(matches!(error.downcast_ref::<Error>(), Some(Error::InvalidType)));

        assert!(convert::<char>(OptionValue::String("")).is_err());
        assert!(convert::<Id<UserMarker>>(OptionValue::Integer(1)).is_err());
    }

    #[test]
    fn ids_unwrap_resolvables() {
        let user = ResolvableUser::new(Id::new(7), None);
        assert_eq!(
            convert::<Id<UserMarker>>(OptionValue::User(user)).unwrap(),
            Id::new(7)
        );
        assert_eq!(convert::<ResolvableUser>(OptionValue::User(user)).unwrap(), user);
    }

    #[test]
    fn borrowed_strings_convert_without_copying() {
        let value: &str = convert(OptionValue::String("borrowed")).unwrap();
        assert_eq!(value, "borrowed");
        assert_eq!(convert::<char>(OptionValue::String("xyz")).unwrap(), 'x');
    }
}
