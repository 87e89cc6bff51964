use crate::class_parser::constants::AccessFlagClass;
use crate::helper::has_flag;
use crate::vm::class::constant_pool::CPool;

/// Decoded class-level access flags, with the raw bitmask kept alongside.
#[derive(Debug, Default, Clone)]
pub struct AccessFlags {
    pub raw: u16,
    pub is_public: bool,
    pub is_final: bool,
    pub is_super: bool,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_synthetic: bool,
    pub is_annotation: bool,
    pub is_enum: bool,
    pub is_module: bool,
}

impl AccessFlags {
    pub fn decode(raw: u16) -> AccessFlags {
        AccessFlags {
            raw,
            is_public: has_flag(raw, AccessFlagClass::Public),
            is_final: has_flag(raw, AccessFlagClass::Final),
            is_super: has_flag(raw, AccessFlagClass::Super),
            is_interface: has_flag(raw, AccessFlagClass::Interface),
            is_abstract: has_flag(raw, AccessFlagClass::Abstract),
            is_synthetic: has_flag(raw, AccessFlagClass::Synthetic),
            is_annotation: has_flag(raw, AccessFlagClass::Annotation),
            is_enum: has_flag(raw, AccessFlagClass::Enum),
            is_module: has_flag(raw, AccessFlagClass::Module),
        }
    }
}

/// A raw attribute: name index into the CP plus the undecoded payload.
/// Payloads are decoded lazily by their consumers (the code-attribute
/// decoder in the loader, for example).
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name_index: u16,
    pub content: Vec<u8>,
}

/// Fields and methods share this raw shape in the class file.
#[derive(Debug)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attr>,
}

/// Parser output: the constant pool plus class-level metadata. Transient;
/// the loader consumes it while building the method-area entry.
#[derive(Debug)]
pub struct ParsedClass {
    pub minor_version: u16,
    pub major_version: u16,
    pub cp_count: u16,
    pub cp: CPool,
    pub access: AccessFlags,
    pub class_name: String,
    pub superclass_name: String,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<Attr>,
}
