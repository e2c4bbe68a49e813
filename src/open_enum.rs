use crate::UnknownEnumValue;

/// A generated Protobuf enumeration.
///
/// Implemented by every enum type the generator emits. The string conversions
/// use the enumerator names exactly as they appear in the `.proto` definition,
/// which is what the proto3 JSON mapping requires.
pub trait Enumeration:
    Copy + Default + Into<i32> + TryFrom<i32, Error = UnknownEnumValue>
{
    /// String value of the enumerator name used in the Protobuf definition.
    fn as_str_name(&self) -> &'static str;

    /// Creates an enum from the enumerator name used in the Protobuf
    /// definition.
    fn from_str_name(value: &str) -> Option<Self>;
}

/// The value of an open enum field.
///
/// The [Protocol Buffers guide][proto-guide] specifies that unknown values of
/// fields with open enum types should be stored directly in the field when
/// decoding messages. Generated code uses this type for every enum-typed
/// field, so an unrecognized value survives a decode/re-encode round trip
/// unchanged.
///
/// [proto-guide]: https://protobuf.dev/programming-guides/enum/#definitions
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpenEnum<T> {
    /// A known value of the generated enum type.
    Known(T),
    /// An unknown value as decoded from the message.
    Unknown(i32),
}

impl<T> Default for OpenEnum<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::Known(T::default())
    }
}

impl<T> From<T> for OpenEnum<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl<T> OpenEnum<T> {
    /// Converts a raw integer value into an open enum value.
    ///
    /// This method is used to decode field values from the wire format.
    pub fn from_raw(value: i32) -> Self
    where
        i32: TryInto<T>,
    {
        match value.try_into() {
            Ok(v) => Self::Known(v),
            Err(_) => Self::Unknown(value),
        }
    }

    /// Converts an open enum value into its raw integer representation.
    pub fn into_raw(self) -> i32
    where
        T: Into<i32>,
    {
        match self {
            Self::Known(v) => v.into(),
            Self::Unknown(v) => v,
        }
    }

    /// Converts an open enum value into its raw integer representation.
    ///
    /// This is a convenience method for borrowed values.
    pub fn to_raw(&self) -> i32
    where
        T: Copy + Into<i32>,
    {
        match self {
            Self::Known(v) => (*v).into(),
            Self::Unknown(v) => *v,
        }
    }

    /// If the value of the open enum is known, returns it in `Some`,
    /// otherwise returns `None`.
    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown(_) => None,
        }
    }

    /// If the value of the open enum is known, returns it in `Ok`, otherwise
    /// returns an `Err` with the unknown value.
    pub fn get(&self) -> Result<T, UnknownEnumValue>
    where
        T: Copy,
    {
        match self {
            Self::Known(v) => Ok(*v),
            Self::Unknown(r) => Err(UnknownEnumValue(*r)),
        }
    }

    /// Returns the known value of the open enum, or, if the value is unknown,
    /// returns the default value of the enum type.
    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        match self {
            Self::Known(v) => v,
            Self::Unknown(_) => T::default(),
        }
    }

    /// Sets the value of the receiver to the provided known value.
    pub fn set(&mut self, value: T) {
        *self = Self::Known(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    enum Mode {
        #[default]
        Off,
        On,
    }

    impl From<Mode> for i32 {
        fn from(value: Mode) -> i32 {
            match value {
                Mode::Off => 0,
                Mode::On => 1,
            }
        }
    }

    impl TryFrom<i32> for Mode {
        type Error = UnknownEnumValue;

        fn try_from(value: i32) -> Result<Mode, UnknownEnumValue> {
            match value {
                0 => Ok(Mode::Off),
                1 => Ok(Mode::On),
                other => Err(UnknownEnumValue(other)),
            }
        }
    }

    #[test]
    fn raw_round_trip() {
        assert_eq!(OpenEnum::<Mode>::from_raw(1), OpenEnum::Known(Mode::On));
        assert_eq!(OpenEnum::<Mode>::from_raw(7), OpenEnum::Unknown(7));
        assert_eq!(OpenEnum::<Mode>::from_raw(7).to_raw(), 7);
        assert_eq!(OpenEnum::Known(Mode::On).into_raw(), 1);
    }

    #[test]
    fn default_is_zero_value() {
        assert_eq!(OpenEnum::<Mode>::default(), OpenEnum::Known(Mode::Off));
        assert_eq!(OpenEnum::<Mode>::Unknown(9).unwrap_or_default(), Mode::Off);
    }
}
