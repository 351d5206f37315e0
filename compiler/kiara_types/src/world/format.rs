//! Human-readable type names for diagnostics and the IR printer.

#![allow(clippy::format_push_string)]

use super::World;
use crate::data::TypeData;
use crate::Idx;

impl World {
    /// Format a type as it is written in source. Typedefs keep their name.
    pub fn type_name(&self, idx: Idx) -> String {
        let mut buf = String::new();
        self.type_name_into(idx, &mut buf);
        buf
    }

    pub fn type_name_into(&self, idx: Idx, buf: &mut String) {
        let Some(data) = self.data(idx).map(|data| data.clone()) else {
            buf.push_str("<NULL>");
            return;
        };

        match data {
            TypeData::Void => buf.push_str("void"),
            TypeData::Any => buf.push_str("any"),
            TypeData::Type => buf.push_str("type"),
            TypeData::UnresolvedSymbol => buf.push_str("<unresolved>"),
            TypeData::Prim(kind) => buf.push_str(kind.name()),
            TypeData::Typedef { name, .. } => buf.push_str(&name),
            TypeData::Ptr(elem) => self.wrap("ptr", elem, buf),
            TypeData::Ref(elem) => self.wrap("ref", elem, buf),
            TypeData::Array(elem) => self.wrap("array", elem, buf),
            TypeData::FixedArray { elem, len } => {
                buf.push_str("array(");
                self.type_name_into(elem, buf);
                buf.push_str(&format!(", {len})"));
            }
            TypeData::Symbol(name) => buf.push_str(&format!("symbol({name:?})")),
            TypeData::Function { ret, params } => {
                buf.push_str("fn(");
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(", ");
                    }
                    self.type_name_into(*param, buf);
                }
                buf.push_str(") -> ");
                self.type_name_into(ret, buf);
            }
            TypeData::Struct(data) => buf.push_str(&data.name),
        }
    }

    fn wrap(&self, ctor: &str, elem: Idx, buf: &mut String) {
        buf.push_str(ctor);
        buf.push('(');
        self.type_name_into(elem, buf);
        buf.push(')');
    }
}
