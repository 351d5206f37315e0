//! Type constructors.

use rustc_hash::FxHashSet;

use super::World;
use crate::data::{StructData, StructField, TypeData};
use crate::{Idx, TypeError};

impl World {
    /// `ptr(elem)`.
    pub fn ptr(&self, elem: Idx) -> Idx {
        self.intern(TypeData::Ptr(elem))
    }

    /// `ref(elem)`.
    pub fn reference(&self, elem: Idx) -> Idx {
        self.intern(TypeData::Ref(elem))
    }

    /// Dynamically sized `array(elem)`.
    pub fn array(&self, elem: Idx) -> Idx {
        self.intern(TypeData::Array(elem))
    }

    /// `array(elem, len)`.
    pub fn fixed_array(&self, elem: Idx, len: u64) -> Idx {
        self.intern(TypeData::FixedArray { elem, len })
    }

    /// Compile-time symbol type `symbol("name")`.
    pub fn symbol(&self, name: &str) -> Idx {
        self.intern(TypeData::Symbol(name.to_owned()))
    }

    /// Function type.
    pub fn function(&self, ret: Idx, params: &[Idx]) -> Idx {
        self.intern(TypeData::Function {
            ret,
            params: params.iter().copied().collect(),
        })
    }

    /// Named alias of `target`.
    pub fn typedef(&self, name: &str, target: Idx) -> Idx {
        self.intern(TypeData::Typedef {
            name: name.to_owned(),
            target,
        })
    }

    /// `ptr(void)`.
    pub fn c_void_ptr(&self) -> Idx {
        self.ptr(Idx::VOID)
    }

    /// `ptr(char)`.
    pub fn c_char_ptr(&self) -> Idx {
        self.ptr(Idx::C_CHAR)
    }

    /// Structural (non-unique) struct: equal name and fields give the same
    /// handle.
    pub fn struct_type(&self, name: &str, fields: Vec<StructField>) -> Idx {
        self.intern(TypeData::Struct(StructData {
            name: name.to_owned(),
            fields: Some(fields),
            unique: false,
        }))
    }

    /// Declare an opaque nominal struct. Every call yields a fresh handle.
    pub fn declare_struct(&self, name: &str) -> Idx {
        let idx = self.push_unique(StructData {
            name: name.to_owned(),
            fields: None,
            unique: true,
        });
        tracing::debug!(name, ?idx, "declared unique struct");
        idx
    }

    /// Give a declared struct its fields.
    pub fn define_struct(&self, idx: Idx, fields: Vec<StructField>) -> Result<(), TypeError> {
        let name = match self.data(idx).as_deref() {
            Some(TypeData::Struct(data)) if data.unique => {
                if data.fields.is_some() {
                    return Err(TypeError::AlreadyDefined {
                        name: data.name.clone(),
                    });
                }
                data.name.clone()
            }
            _ => return Err(TypeError::NotAUniqueStruct(idx)),
        };

        let mut seen = FxHashSet::default();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(TypeError::DuplicateField {
                    struct_name: name,
                    field: field.name.clone(),
                });
            }
        }

        self.set_struct_fields(idx, fields);
        Ok(())
    }

    /// Declare and define a nominal struct in one step.
    pub fn unique_struct(&self, name: &str, fields: Vec<StructField>) -> Result<Idx, TypeError> {
        let idx = self.declare_struct(name);
        self.define_struct(idx, fields)?;
        Ok(idx)
    }
}
