/// A macro which defines an enum type.
macro_rules! enum_builder {
    (@U8
        EnumName: $enum_name: ident;
        EnumVal { $( $enum_var: ident => $enum_val: expr ),* }
    ) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum $enum_name {
            $( $enum_var),*
            ,Unknown(u8)
        }
        impl $enum_name {
            pub fn get_u8(&self) -> u8 {
                match *self {
                    $( $enum_name::$enum_var => $enum_val),*
                    ,$enum_name::Unknown(x) => x
                }
            }
        }
        impl Codec for $enum_name {
            fn put(&self, w: &mut Writer) -> Result<(), TlsError> {
                w.put_u8(self.get_u8())
            }

            fn read(r: &mut Reader) -> Option<Self> {
                Some(match read_u8(r)? {
                    $( $enum_val => $enum_name::$enum_var),*
                    ,x => $enum_name::Unknown(x)
                })
            }
        }
    };
    (@U16
        EnumName: $enum_name: ident;
        EnumVal { $( $enum_var: ident => $enum_val: expr ),* }
    ) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum $enum_name {
            $( $enum_var),*
            ,Unknown(u16)
        }
        impl $enum_name {
            pub fn get_u16(&self) -> u16 {
                match *self {
                    $( $enum_name::$enum_var => $enum_val),*
                    ,$enum_name::Unknown(x) => x
                }
            }
        }
        impl Codec for $enum_name {
            fn put(&self, w: &mut Writer) -> Result<(), TlsError> {
                w.put_u16(self.get_u16())
            }

            fn read(r: &mut Reader) -> Option<Self> {
                Some(match read_u16(r)? {
                    $( $enum_val => $enum_name::$enum_var),*
                    ,x => $enum_name::Unknown(x)
                })
            }
        }
    };
}
