//! Record and enum wiring.
//!
//! A record declares its field list once; the macro expands to ordered
//! member encodings with the usual slot discipline. The field order *is*
//! the wire contract: peers that disagree on it will not interoperate.

/// Implement [`Encode`](crate::Encode) and [`Decode`](crate::Decode) for a
/// struct from its ordered field list.
///
/// ```
/// use tether_serialize::{decode, define_record, encode};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
///     label: String,
/// }
///
/// define_record!(Point { x, y, label });
///
/// let p = Point { x: -3, y: 4, label: "origin-ish".into() };
/// let back: Point = decode(&encode(&p)).unwrap();
/// assert_eq!(back, p);
/// ```
#[macro_export]
macro_rules! define_record {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::Encode for $ty {
            fn encode(&self, out: &mut $crate::OutputArchive) {
                $( out.slot(&self.$field); )+
            }
        }

        impl $crate::Decode for $ty {
            fn decode(
                input: &mut $crate::InputArchive<'_>,
            ) -> ::core::result::Result<Self, $crate::DecodeError> {
                Ok(Self {
                    $( $field: input.slot()?, )+
                })
            }
        }
    };
}

/// Implement the codec for a fieldless enum as its underlying integer.
///
/// ```
/// use tether_serialize::{decode, define_enum, encode};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Mode {
///     Idle = 0,
///     Busy = 1,
/// }
///
/// define_enum!(Mode { Idle = 0, Busy = 1 });
///
/// assert_eq!(decode::<Mode>(&encode(&Mode::Busy)).unwrap(), Mode::Busy);
/// ```
#[macro_export]
macro_rules! define_enum {
    ($ty:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        impl $crate::Encode for $ty {
            fn encode(&self, out: &mut $crate::OutputArchive) {
                let value: u64 = match self {
                    $( $ty::$variant => $value, )+
                };
                out.put_auto_size(value);
            }
        }

        impl $crate::Decode for $ty {
            fn decode(
                input: &mut $crate::InputArchive<'_>,
            ) -> ::core::result::Result<Self, $crate::DecodeError> {
                match input.take_auto_size()? {
                    $( value if value == $value => Ok($ty::$variant), )+
                    _ => Err($crate::DecodeError::InvalidValue(stringify!($ty))),
                }
            }
        }
    };
}
