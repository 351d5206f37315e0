//! C-compatible memory layout. Pointers are 8 bytes wide.

use super::World;
use crate::data::TypeData;
use crate::Idx;

const POINTER_SIZE: u64 = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Layout {
    size: u64,
    align: u64,
}

impl Layout {
    const POINTER: Self = Layout {
        size: POINTER_SIZE,
        align: POINTER_SIZE,
    };
}

fn align_up(offset: u64, align: u64) -> u64 {
    offset.div_ceil(align) * align
}

impl World {
    /// Size in bytes, or `None` for unsized types (void, functions,
    /// opaque structs).
    pub fn size_of(&self, idx: Idx) -> Option<u64> {
        self.layout(idx, &mut Vec::new()).map(|layout| layout.size)
    }

    /// Alignment in bytes, or `None` for unsized types.
    pub fn align_of(&self, idx: Idx) -> Option<u64> {
        self.layout(idx, &mut Vec::new()).map(|layout| layout.align)
    }

    /// Byte offset of every field of a defined struct, in order.
    pub fn field_offsets(&self, idx: Idx) -> Option<Vec<u64>> {
        let fields = self.struct_fields(idx)?;
        let mut visiting = vec![self.canonical(idx)];
        let mut offset = 0;
        let mut offsets = Vec::with_capacity(fields.len());
        for field in fields {
            let layout = self.layout(field.ty, &mut visiting)?;
            offset = align_up(offset, layout.align);
            offsets.push(offset);
            offset += layout.size;
        }
        Some(offsets)
    }

    fn layout(&self, idx: Idx, visiting: &mut Vec<Idx>) -> Option<Layout> {
        let canonical = self.canonical(idx);
        // A struct that contains itself by value has no size.
        if visiting.contains(&canonical) {
            return None;
        }

        let data = self.data(canonical)?.clone();
        match data {
            TypeData::Prim(kind) => {
                let size = kind.byte_size();
                Some(Layout { size, align: size })
            }
            TypeData::Ptr(_) | TypeData::Ref(_) | TypeData::Array(_) => Some(Layout::POINTER),
            TypeData::FixedArray { elem, len } => {
                let elem = self.layout(elem, visiting)?;
                Some(Layout {
                    size: elem.size.checked_mul(len)?,
                    align: elem.align,
                })
            }
            TypeData::Struct(data) => {
                let fields = data.fields?;
                visiting.push(canonical);
                let mut size = 0;
                let mut align = 1;
                for field in &fields {
                    let Some(layout) = self.layout(field.ty, visiting) else {
                        visiting.pop();
                        return None;
                    };
                    size = align_up(size, layout.align) + layout.size;
                    align = align.max(layout.align);
                }
                visiting.pop();
                Some(Layout {
                    size: align_up(size, align),
                    align,
                })
            }
            TypeData::Void
            | TypeData::Any
            | TypeData::Type
            | TypeData::UnresolvedSymbol
            | TypeData::Typedef { .. }
            | TypeData::Symbol(_)
            | TypeData::Function { .. } => None,
        }
    }
}
