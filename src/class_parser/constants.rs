use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Constant pool entry tags, JVMS table 4.4-A.
#[derive(TryFromPrimitive, IntoPrimitive, Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum CPTag {
    Utf8 = 1,
    IntConst = 3,
    FloatConst = 4,
    LongConst = 5,
    DoubleConst = 6,
    ClassRef = 7,
    StringConst = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

/// Class-level access bits, JVMS table 4.1-B.
#[derive(IntoPrimitive, Clone, Copy)]
#[repr(u16)]
pub enum AccessFlagClass {
    Public = 0x0001,
    Final = 0x0010,
    Super = 0x0020,
    Interface = 0x0200,
    Abstract = 0x0400,
    Synthetic = 0x1000,
    Annotation = 0x2000,
    Enum = 0x4000,
    Module = 0x8000,
}

#[derive(IntoPrimitive, Clone, Copy)]
#[repr(u16)]
pub enum AccessFlagField {
    Public = 0x0001,
    Private = 0x0002,
    Protected = 0x0004,
    Static = 0x0008,
    Final = 0x0010,
    Volatile = 0x0040,
    Transient = 0x0080,
    Synthetic = 0x1000,
    Enum = 0x4000,
}

#[derive(IntoPrimitive, Clone, Copy)]
#[repr(u16)]
pub enum AccessFlagMethod {
    Public = 0x0001,
    Private = 0x0002,
    Protected = 0x0004,
    Static = 0x0008,
    Final = 0x0010,
    Synchronized = 0x0020,
    Bridge = 0x0040,
    Varargs = 0x0080,
    Native = 0x0100,
    Abstract = 0x0400,
    Strict = 0x0800,
    Synthetic = 0x1000,
}
