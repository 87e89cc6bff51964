use crate::class_parser::constants::AccessFlagField;
use crate::class_parser::types::Attr;
use crate::helper::has_flag;

/// A field of a loaded class. Name and descriptor are UTF8 indices into the
/// owning constant pool.
#[derive(Debug, Clone)]
pub struct Field {
    pub access_flags: u16,
    pub name: u16,
    pub desc: u16,
    pub is_static: bool,
    pub attributes: Vec<Attr>,
}

impl Field {
    pub fn new(access_flags: u16, name: u16, desc: u16, attributes: Vec<Attr>) -> Field {
        Field {
            access_flags,
            name,
            desc,
            is_static: has_flag(access_flags, AccessFlagField::Static),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_bit_is_decoded() {
        assert!(Field::new(0x0009, 1, 2, vec![]).is_static);
        assert!(!Field::new(0x0001, 1, 2, vec![]).is_static);
    }
}
