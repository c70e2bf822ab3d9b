// Generates a fieldless enum together with a const table pairing every variant with a value.
// The table keeps the association explicit at the declaration site; lookups go through it.
macro_rules! parallel_enum_values {
    (($enum_name:ident, $const_name:ident, $const_type:ty $(,)?) $($name:ident -> $value:expr),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $enum_name {
            $($name,)*
        }

        pub const $const_name: &'static [($enum_name, &'static $const_type)] = &[$(($enum_name::$name, $value),)*];

        impl $enum_name {
            pub const ALL: &'static [$enum_name] = &[$($enum_name::$name,)*];

            /// Value paired with this variant in the generated table.
            pub fn paired_value(self) -> &'static $const_type {
                $const_name
                    .iter()
                    .find(|(key, _)| *key == self)
                    .map(|(_, value)| *value)
                    .expect("every variant is listed in its value table")
            }
        }
    };
}

pub(crate) use parallel_enum_values;
