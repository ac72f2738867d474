/// Declare a newtype index over a primitive integer, implementing [TypedIndex](crate::TypedIndex).
///
/// The generated type derives `serde::Serialize` and `serde::Deserialize` transparently, so the
/// invoking crate must depend on `serde` (with the `derive` feature).
///
/// ```ignore
/// typed_index! {
///     /// Index into the joint table.
///     pub struct JointIndex(u16) => "joint";
/// }
/// ```
#[macro_export]
macro_rules! typed_index {
    {$(
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident($Repr:ty) => $kind:literal;
    )+} => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
                serde::Serialize, serde::Deserialize,
            )]
            #[serde(transparent)]
            $vis struct $Name(pub $Repr);

            impl $crate::TypedIndex for $Name {
                type Repr = $Repr;
                const KIND: &'static str = $kind;

                #[inline]
                fn from_raw(raw: $Repr) -> Self {
                    Self(raw)
                }

                #[inline]
                fn raw(self) -> $Repr {
                    self.0
                }
            }

            impl From<$Repr> for $Name {
                #[inline]
                fn from(raw: $Repr) -> Self {
                    Self(raw)
                }
            }

            impl From<$Name> for $Repr {
                #[inline]
                fn from(idx: $Name) -> Self {
                    idx.0
                }
            }

            impl ::std::fmt::Display for $Name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    ::std::fmt::Display::fmt(&self.0, f)
                }
            }
        )+
    };
}
