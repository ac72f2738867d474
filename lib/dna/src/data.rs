/// Declare a fieldless enum stored on the wire as a `u16`, with conversions in both directions.
macro_rules! wire_enum {
    {
        $(#[$meta:meta])*
        $vis:vis enum $Name:ident {
            $($(#[$vmeta:meta])* $Variant:ident = $val:literal),+ $(,)?
        }
    } => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $Name {
            $($(#[$vmeta])* $Variant = $val),+
        }

        impl TryFrom<u16> for $Name {
            type Error = u16;

            fn try_from(raw: u16) -> Result<Self, u16> {
                match raw {
                    $($val => Ok(Self::$Variant),)+
                    other => Err(other),
                }
            }
        }

        impl From<$Name> for u16 {
            #[inline]
            fn from(v: $Name) -> u16 {
                v as u16
            }
        }
    };
}
pub(crate) use wire_enum;

mod behavior;
mod definition;
mod descriptor;
mod geometry;

pub use behavior::*;
pub use definition::*;
pub use descriptor::*;
pub use geometry::*;
