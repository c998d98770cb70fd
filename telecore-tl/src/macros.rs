// Declarative stand-ins for schema codegen. Each macro expands one schema
// line into the struct/enum plus its `Identifiable`, `Serializable` and
// `Deserializable` impls. Constructors with a `flags:#` word are written out
// by hand in `types.rs` instead.

/// A bare constructor with only plain (non-conditional) fields.
macro_rules! tl_struct {
    ($(#[$meta:meta])* $name:ident = $id:literal { $($field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        #[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name {
            $(pub $field: $ty,)*
        }

        impl crate::Identifiable for $name {
            const CONSTRUCTOR_ID: u32 = $id;
        }

        impl crate::Serializable for $name {
            #[allow(unused_variables)]
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                $(crate::Serializable::serialize(&self.$field, buf);)*
            }
        }

        impl crate::Deserializable for $name {
            #[allow(unused_variables)]
            fn deserialize(buf: crate::deserialize::Buffer) -> crate::deserialize::Result<Self> {
                ::core::result::Result::Ok(Self {
                    $($field: <$ty as crate::Deserializable>::deserialize(buf)?,)*
                })
            }
        }
    };
}

/// A boxed type: one enum variant per constructor, tagged by constructor id.
macro_rules! tl_boxed {
    ($(#[$meta:meta])* $name:ident { $($variant:ident($ty:path)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        #[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $($variant($ty),)+
        }

        impl $name {
            /// Every constructor id this boxed type accepts.
            pub const CONSTRUCTOR_IDS: &'static [u32] =
                &[$(<$ty as crate::Identifiable>::CONSTRUCTOR_ID),+];

            /// Constructor id of the value held.
            pub fn constructor_id(&self) -> u32 {
                match self {
                    $(Self::$variant(_) => <$ty as crate::Identifiable>::CONSTRUCTOR_ID,)+
                }
            }
        }

        impl crate::Serializable for $name {
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                crate::Serializable::serialize(&self.constructor_id(), buf);
                match self {
                    $(Self::$variant(x) => crate::Serializable::serialize(x, buf),)+
                }
            }
        }

        impl crate::Deserializable for $name {
            fn deserialize(buf: crate::deserialize::Buffer) -> crate::deserialize::Result<Self> {
                let id = <u32 as crate::Deserializable>::deserialize(buf)?;
                $(
                    if id == <$ty as crate::Identifiable>::CONSTRUCTOR_ID {
                        return ::core::result::Result::Ok(Self::$variant(<$ty as crate::Deserializable>::deserialize(buf)?));
                    }
                )+
                Err(crate::deserialize::Error::UnexpectedConstructor { id })
            }
        }

        $(
            impl From<$ty> for $name {
                fn from(x: $ty) -> Self { Self::$variant(x) }
            }
        )+
    };
}

/// An RPC function: serialized with its constructor id up front.
macro_rules! tl_function {
    ($(#[$meta:meta])* $name:ident = $id:literal -> $ret:ty { $($field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq)]
        #[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name {
            $(pub $field: $ty,)*
        }

        impl crate::Identifiable for $name {
            const CONSTRUCTOR_ID: u32 = $id;
        }

        impl crate::Serializable for $name {
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                let id: u32 = $id;
                crate::Serializable::serialize(&id, buf);
                $(crate::Serializable::serialize(&self.$field, buf);)*
            }
        }

        impl crate::RemoteCall for $name {
            type Return = $ret;
        }

        /// Reads the fields only; the constructor id has already been consumed.
        #[cfg(feature = "deserializable-functions")]
        impl crate::Deserializable for $name {
            #[allow(unused_variables)]
            fn deserialize(buf: crate::deserialize::Buffer) -> crate::deserialize::Result<Self> {
                ::core::result::Result::Ok(Self {
                    $($field: <$ty as crate::Deserializable>::deserialize(buf)?,)*
                })
            }
        }
    };
}
