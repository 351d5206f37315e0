//! Structural type data stored in the world.

use smallvec::SmallVec;

use crate::Idx;

/// Parameter list of a function type.
pub type ParamList = SmallVec<[Idx; 4]>;

/// Scalar kinds with a fixed machine representation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Float,
    Double,
    Boolean,
    /// String literal (a pointer to characters at runtime).
    String,
    /// The null pointer literal.
    NullPtr,
}

impl PrimKind {
    pub const fn name(self) -> &'static str {
        match self {
            PrimKind::I8 => "i8",
            PrimKind::U8 => "u8",
            PrimKind::I16 => "i16",
            PrimKind::U16 => "u16",
            PrimKind::I32 => "i32",
            PrimKind::U32 => "u32",
            PrimKind::I64 => "i64",
            PrimKind::U64 => "u64",
            PrimKind::Float => "float",
            PrimKind::Double => "double",
            PrimKind::Boolean => "boolean",
            PrimKind::String => "string",
            PrimKind::NullPtr => "nullptr",
        }
    }

    /// Size in bytes of a value of this kind.
    pub const fn byte_size(self) -> u64 {
        match self {
            PrimKind::I8 | PrimKind::U8 | PrimKind::Boolean => 1,
            PrimKind::I16 | PrimKind::U16 => 2,
            PrimKind::I32 | PrimKind::U32 | PrimKind::Float => 4,
            PrimKind::I64
            | PrimKind::U64
            | PrimKind::Double
            | PrimKind::String
            | PrimKind::NullPtr => 8,
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            PrimKind::I8
                | PrimKind::U8
                | PrimKind::I16
                | PrimKind::U16
                | PrimKind::I32
                | PrimKind::U32
                | PrimKind::I64
                | PrimKind::U64
        )
    }

    pub const fn is_signed_integer(self) -> bool {
        matches!(
            self,
            PrimKind::I8 | PrimKind::I16 | PrimKind::I32 | PrimKind::I64
        )
    }

    pub const fn is_floating_point(self) -> bool {
        matches!(self, PrimKind::Float | PrimKind::Double)
    }
}

/// A named member of a struct type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructField {
    pub name: String,
    pub ty: Idx,
}

impl StructField {
    pub fn new(name: impl Into<String>, ty: Idx) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Struct payload.
///
/// Unique structs are nominal: every declaration yields a distinct handle
/// and they are never hash-consed. `fields` is `None` while a unique struct
/// is only declared (opaque).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StructData {
    pub name: String,
    pub fields: Option<Vec<StructField>>,
    pub unique: bool,
}

/// Structural description of a type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Void,
    Any,
    /// The type of types.
    Type,
    UnresolvedSymbol,
    Prim(PrimKind),
    /// A named alias; canonically equal to its target.
    Typedef {
        name: String,
        target: Idx,
    },
    Ptr(Idx),
    Ref(Idx),
    /// Dynamically sized array.
    Array(Idx),
    FixedArray {
        elem: Idx,
        len: u64,
    },
    /// Compile-time symbol, used to select struct members by name.
    Symbol(String),
    Function {
        ret: Idx,
        params: ParamList,
    },
    Struct(StructData),
}

impl TypeData {
    /// Child type handles, in declaration order.
    pub fn children(&self) -> SmallVec<[Idx; 4]> {
        match self {
            TypeData::Typedef { target, .. } => smallvec::smallvec![*target],
            TypeData::Ptr(elem)
            | TypeData::Ref(elem)
            | TypeData::Array(elem)
            | TypeData::FixedArray { elem, .. } => smallvec::smallvec![*elem],
            TypeData::Function { ret, params } => {
                let mut out = SmallVec::with_capacity(params.len() + 1);
                out.push(*ret);
                out.extend(params.iter().copied());
                out
            }
            TypeData::Struct(data) => data
                .fields
                .iter()
                .flatten()
                .map(|field| field.ty)
                .collect(),
            TypeData::Void
            | TypeData::Any
            | TypeData::Type
            | TypeData::UnresolvedSymbol
            | TypeData::Prim(_)
            | TypeData::Symbol(_) => SmallVec::new(),
        }
    }

    /// Rebuild with every child handle passed through `f`.
    ///
    /// Typedef targets are left alone; a typedef's identity is its name.
    #[must_use]
    pub fn map_children(&self, mut f: impl FnMut(Idx) -> Idx) -> TypeData {
        match self {
            TypeData::Ptr(elem) => TypeData::Ptr(f(*elem)),
            TypeData::Ref(elem) => TypeData::Ref(f(*elem)),
            TypeData::Array(elem) => TypeData::Array(f(*elem)),
            TypeData::FixedArray { elem, len } => TypeData::FixedArray {
                elem: f(*elem),
                len: *len,
            },
            TypeData::Function { ret, params } => TypeData::Function {
                ret: f(*ret),
                params: params.iter().map(|&param| f(param)).collect(),
            },
            TypeData::Struct(data) => TypeData::Struct(StructData {
                name: data.name.clone(),
                fields: data.fields.as_ref().map(|fields| {
                    fields
                        .iter()
                        .map(|field| StructField::new(field.name.clone(), f(field.ty)))
                        .collect()
                }),
                unique: data.unique,
            }),
            TypeData::Void
            | TypeData::Any
            | TypeData::Type
            | TypeData::UnresolvedSymbol
            | TypeData::Prim(_)
            | TypeData::Typedef { .. }
            | TypeData::Symbol(_) => self.clone(),
        }
    }
}
