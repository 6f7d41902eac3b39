//! Helper macro for declaring port error enums.
//!
//! Each variant gets a snake_case constructor accepting `impl Into<T>` for
//! every field, so adapters can write `UserStoreError::query("...")`.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum DirectoryPortError {
            Unreachable => "directory unreachable",
            Rejected { reason: String } => "directory rejected write: {reason}",
            Throttled { retry_after_secs: u64 } => "directory throttled for {retry_after_secs}s",
            Partial { reason: String, written: usize } => "partial write ({written}): {reason}",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(
            DirectoryPortError::unreachable(),
            DirectoryPortError::Unreachable
        );
    }

    #[test]
    fn string_fields_accept_borrowed_input() {
        let err = DirectoryPortError::rejected("duplicate userName");
        assert_eq!(
            err.to_string(),
            "directory rejected write: duplicate userName"
        );
    }

    #[test]
    fn numeric_fields_keep_their_type() {
        let err = DirectoryPortError::throttled(30_u64);
        assert_eq!(err.to_string(), "directory throttled for 30s");
    }

    #[test]
    fn mixed_fields_follow_declaration_order() {
        let err = DirectoryPortError::partial("emails", 3_usize);
        assert_eq!(err.to_string(), "partial write (3): emails");
    }
}
