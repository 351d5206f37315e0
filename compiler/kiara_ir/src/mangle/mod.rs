//! Name mangling for overload keys and linker symbols.
//!
//! # Scheme
//!
//! ```text
//! _K<op>[<param>...]            operator functions
//! _K<len><name>[<param>...]     everything else
//! ```
//!
//! Special characters in plain names are spelled out as two-letter codes
//! (`.` is `dt`, `+` is `pl`, ...). Parameter types are encoded on their
//! canonical form, so a typedef mangles like its target:
//!
//! | Type | Code |
//! |------|------|
//! | `void`, `any` | `v`, `kA` |
//! | `i8` `u8` `i16` `u16` `i32` `u32` `i64` `u64` | `ka` `kh` `ks` `kt` `ki` `kj` `kx` `ky` |
//! | `float` `double` `boolean` `string` | `kf` `kd` `kb` `kS` |
//! | `ptr(T)`, `ref(T)`, `array(T)` | `P<T>`, `R<T>`, `P<T>` |
//! | `array(T, N)` | `P<T>` as a parameter, `A<N>_<T>` nested |
//! | `fn(...) -> R` | `_KF<len><type name><param>...` |
//! | structs | `<len><name>`, then `I<field>...E` unless unique |
//!
//! The mangled name is the key of overload maps and the symbol the code
//! generator links against, so the encoding must not change.

use std::fmt::Write;

use kiara_types::{Idx, PrimKind, TypeData, World};
use smallvec::SmallVec;

use crate::Node;

/// Where a type is being mangled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MangleMode {
    Default,
    /// Top-level function parameter: fixed arrays decay to pointers.
    FuncParameter,
}

/// Mangles function names against the types of one world.
#[derive(Clone, Copy)]
pub struct Mangler<'w> {
    world: &'w World,
}

impl<'w> Mangler<'w> {
    #[must_use]
    pub fn new(world: &'w World) -> Self {
        Mangler { world }
    }

    /// `prefix(name, params.len())` followed by every parameter type.
    pub fn mangle_function(&self, name: &str, params: &[Idx]) -> String {
        let mut out = self.mangle_prefix(name, params.len());
        for &param in params {
            self.mangle_type_into(param, MangleMode::FuncParameter, &mut out);
        }
        out
    }

    /// Mangled name of a call to `name` with the types of `args`.
    pub fn mangle_call(&self, name: &str, args: &[Node]) -> String {
        let params: SmallVec<[Idx; 4]> = args.iter().map(Node::ty).collect();
        self.mangle_function(name, &params)
    }

    /// Name part of a mangled function symbol.
    #[allow(clippy::unused_self)]
    pub fn mangle_prefix(&self, name: &str, arity: usize) -> String {
        if let Some(op) = encode_op(name, arity) {
            return format!("_K{op}");
        }
        let mut buf = String::with_capacity(name.len());
        for c in name.chars() {
            match encode_char(c) {
                Some(code) => buf.push_str(code),
                None => buf.push(c),
            }
        }
        format!("_K{}{buf}", buf.len())
    }

    pub fn mangle_type(&self, ty: Idx, mode: MangleMode) -> String {
        let mut out = String::new();
        self.mangle_type_into(ty, mode, &mut out);
        out
    }

    fn mangle_type_into(&self, ty: Idx, mode: MangleMode, out: &mut String) {
        let canonical = self.world.canonical(ty);
        let Some(data) = self.world.data(canonical).map(|data| data.clone()) else {
            self.push_named(canonical, out);
            return;
        };

        match data {
            TypeData::Void => out.push('v'),
            TypeData::Any => out.push_str("kA"),
            TypeData::Prim(kind) => match prim_code(kind) {
                Some(code) => out.push_str(code),
                None => self.push_named(canonical, out),
            },
            TypeData::Ptr(elem) | TypeData::Array(elem) => {
                out.push('P');
                self.mangle_type_into(elem, MangleMode::Default, out);
            }
            TypeData::Ref(elem) => {
                out.push('R');
                self.mangle_type_into(elem, MangleMode::Default, out);
            }
            TypeData::FixedArray { elem, len } => {
                if mode == MangleMode::FuncParameter {
                    out.push('P');
                } else {
                    let _ = write!(out, "A{len}_");
                }
                self.mangle_type_into(elem, MangleMode::Default, out);
            }
            TypeData::Function { params, .. } => {
                let name = self.world.type_name(canonical).replace('.', "_");
                let _ = write!(out, "_KF{}{name}", name.len());
                for param in params {
                    self.mangle_type_into(param, MangleMode::Default, out);
                }
            }
            TypeData::Struct(data) => {
                let name = data.name.replace('.', "_");
                let _ = write!(out, "{}{name}", name.len());
                let fields = data.fields.unwrap_or_default();
                if !data.unique && !fields.is_empty() {
                    out.push('I');
                    for field in fields {
                        self.mangle_type_into(field.ty, MangleMode::Default, out);
                    }
                    out.push('E');
                }
            }
            TypeData::Symbol(name) => {
                let _ = write!(out, "6symbolILN6stringE{name}EE");
            }
            TypeData::Type | TypeData::UnresolvedSymbol | TypeData::Typedef { .. } => {
                self.push_named(canonical, out);
            }
        }
    }

    /// `<len><type name>` for types without a dedicated code.
    fn push_named(&self, ty: Idx, out: &mut String) {
        let name = self.world.type_name(ty).replace('.', "_");
        let _ = write!(out, "{}{name}", name.len());
    }
}

fn prim_code(kind: PrimKind) -> Option<&'static str> {
    let code = match kind {
        PrimKind::I8 => "ka",
        PrimKind::U8 => "kh",
        PrimKind::I16 => "ks",
        PrimKind::U16 => "kt",
        PrimKind::I32 => "ki",
        PrimKind::U32 => "kj",
        PrimKind::I64 => "kx",
        PrimKind::U64 => "ky",
        PrimKind::Float => "kf",
        PrimKind::Double => "kd",
        PrimKind::Boolean => "kb",
        PrimKind::String => "kS",
        PrimKind::NullPtr => return None,
    };
    Some(code)
}

/// Operator code for `op` called with `arity` operands. An operator used
/// with an unexpected arity gets the `v2` spelling. `None` for names that
/// are not operators.
fn encode_op(op: &str, arity: usize) -> Option<String> {
    let (code, expected) = match op {
        "+" if arity == 1 => ("ps", 1),
        "-" if arity == 1 => ("ng", 1),
        "&" if arity == 1 => ("ad", 1),
        "*" if arity == 1 => ("de", 1),
        "+" => ("pl", 2),
        "-" => ("mi", 2),
        "&" => ("an", 2),
        "*" => ("ml", 2),
        "~" => ("co", 2),
        "/" => ("dv", 2),
        "%" => ("rm", 2),
        "|" => ("or", 2),
        "^" => ("eo", 2),
        "=" => ("aS", 2),
        "+=" => ("pL", 2),
        "-=" => ("mI", 2),
        "*=" => ("mL", 2),
        "/=" => ("dV", 2),
        "%=" => ("rM", 2),
        "&=" => ("aN", 2),
        "|=" => ("oR", 2),
        "^=" => ("eO", 2),
        "<<" => ("ls", 2),
        ">>" => ("rs", 2),
        "<<=" => ("lS", 2),
        ">>=" => ("rS", 2),
        "==" => ("eq", 2),
        "!=" => ("ne", 2),
        "<" => ("lt", 2),
        ">" => ("gt", 2),
        "<=" => ("le", 2),
        ">=" => ("ge", 2),
        "&&" => ("aa", 2),
        "||" => ("oo", 2),
        "!" => ("nt", 1),
        "++" => ("pp", 1),
        "--" => ("mm", 1),
        "," => ("cm", 1),
        "->*" => ("pm", 1),
        "->" => ("pt", 1),
        "()" => ("cl", 1),
        "[]" => ("ix", 1),
        "?" => ("qu", 3),
        "." => return Some("v3dot".to_owned()),
        ":" => return Some("v3col".to_owned()),
        "$" => return Some("v3dol".to_owned()),
        _ => return None,
    };
    if arity == expected {
        Some(code.to_owned())
    } else {
        Some(format!("v2{code}"))
    }
}

fn encode_char(c: char) -> Option<&'static str> {
    let code = match c {
        '+' => "pl",
        '-' => "mi",
        '&' => "an",
        '*' => "ml",
        '/' => "dv",
        '~' => "co",
        '%' => "rm",
        '|' => "or",
        '^' => "eo",
        '=' => "as",
        '<' => "lt",
        '>' => "gt",
        '!' => "nt",
        ',' => "cm",
        '(' => "op",
        ')' => "cp",
        '[' => "ok",
        ']' => "ck",
        '{' => "ob",
        '}' => "cb",
        '?' => "qu",
        '.' => "dt",
        ':' => "cl",
        '$' => "ds",
        _ => return None,
    };
    Some(code)
}
