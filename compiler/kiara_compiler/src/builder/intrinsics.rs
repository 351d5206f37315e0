//! Synthesis of the helper functions generated code relies on.
//!
//! Each helper is an intrinsic carrying an LLVM IR template, or a small
//! inline function forwarding to one. Helpers are created on first request
//! and registered in the top scope; later requests from any nested scope
//! return the registered definition. Newly created helpers are appended to
//! the caller's `exprs` so they get emitted exactly once.
//!
//! Template placeholders (`${rettype}`, `${argtype0}`, `${mangledName}`...)
//! are expanded by the backend.

use std::rc::Rc;

use kiara_ir::{Node, Prototype};
use kiara_types::Idx;

use super::IrBuilder;
use crate::{BuildError, BuildErrorKind};

const ADDRESS_OF: &str = "define ${rettype} @$(quote ${mangledName})(${argtype0} %${argname0}) \
nounwind uwtable readnone { entry:   ret  ${rettype} %${argname0} }";

const DEREF_REF: &str = "define ${rettype} @$(quote ${mangledName})(${argtype0} %${argname0}) \
nounwind uwtable readonly {   %r = load ${argtype0} %${argname0}   ret ${rettype} %r}";

const DEREF_PTR: &str = "define ${rettype} @$(quote ${mangledName})(${argtype0} nocapture \
%${argname0}) nounwind uwtable readonly {   ret ${rettype} %${argname0} } ";

const MEMBER_ACCESS_HEAD: &str = "define ${rettype} @$(quote ${mangledName})(${argtype0} \
%${argname0}, ${argtype1} %${argname1}) nounwind uwtable readnone {entry:  %0 = bitcast \
${argtype0} %${argname0} to i8*   %mbr = getelementptr inbounds i8* %0, %size_t ";

const MEMBER_ACCESS_TAIL: &str =
    "   %r = bitcast i8* %mbr to ${rettype}   ret ${rettype} %r}";

const BITCAST: &str = "define ${rettype} @$(quote ${mangledName})(${argtype0} %${argname0}) \
nounwind uwtable readnone {   %r = bitcast ${argtype0} %${argname0} to ${rettype}   \
ret ${rettype} %r } ";

const INT_CAST_HEAD: &str = "define ${rettype} @$(quote ${mangledName})(${argtype0} \
%${argname0}) nounwind uwtable readnone { ";

const INT_SAME_SIZE: &str = "ret ${argtype0} %${argname0} ";
const INT_TRUNC: &str = "%r = trunc ${argtype0} %${argname0} to ${rettype} ret ${rettype} %r ";
const INT_SEXT: &str = "%r = sext ${argtype0} %${argname0} to ${rettype} ret ${rettype} %r ";
const INT_ZEXT: &str = "%r = zext ${argtype0} %${argname0} to ${rettype} ret ${rettype} %r ";

const INDEX_SIZED_HEAD: &str = "define ${rettype} @${mangledName}(${argtype0} nocapture \
%${argname0}, ${argtype1} %${argname1}) nounwind uwtable readonly { entry:   %0 = bitcast \
${rettype} %${argname0} to i8*   %mul = mul ${argtype1} %${argname1}, ";

const INDEX_SIZED_TAIL: &str = "  %add.ptr = getelementptr inbounds i8* %0, ${argtype1} %mul   \
%1 = bitcast i8* %add.ptr to ${rettype}   ret ${rettype} %1 } ";

const INDEX_GEP: &str = "define ${rettype} @${mangledName}(${argtype0} nocapture %${argname0}, \
${argtype1} %${argname1}) nounwind uwtable readonly {   %arrayidx = getelementptr inbounds \
${rettype} %${argname0}, ${argtype1} %${argname1}   ret ${rettype} %arrayidx } ";

const ASSIGN: &str = "define ${rettype} @${mangledName}(${argtype0} %${argname0}, ${argtype1} \
%${argname1}) nounwind uwtable {   store ${argtype1} %${argname1}, ${argtype0} %${argname0}   \
ret ${rettype} %${argname0} }";

/// Precedence of the `.` and `->` member operators.
const MEMBER_PRECEDENCE: u32 = 80;
const ASSIGN_PRECEDENCE: u32 = 2;

fn arg(name: &str, ty: Idx) -> (String, Idx) {
    (name.to_owned(), ty)
}

impl IrBuilder<'_> {
    /// The `&` operator for values of reference type `ty`.
    pub fn create_address_of_code(&self, ty: Idx, exprs: &mut Vec<Node>) -> Result<Node, BuildError> {
        let world = self.world;
        let Some(elem) = world.referent(ty) else {
            return Err(BuildErrorKind::NotAReference(world.type_name(ty)).into());
        };
        let ret = world.ptr(elem);
        let args = vec![arg("v", ty)];

        let address_of = self.ensure_intrinsic(
            Prototype::mangled(world, "__addressof__", ret, args.clone()),
            ADDRESS_OF,
            exprs,
        )?;
        self.ensure_forwarder(Prototype::operator(world, "&", ret, args, 0), &address_of, exprs)
    }

    /// The `__deref__` helper reading through `ty`, a reference or pointer.
    ///
    /// For pointers the unary `*` operator is created alongside.
    pub fn create_dereference_code(&self, ty: Idx, exprs: &mut Vec<Node>) -> Result<Node, BuildError> {
        let world = self.world;
        let (elem, is_ref) = match (world.referent(ty), world.pointee(ty)) {
            (Some(elem), _) => (elem, true),
            (None, Some(elem)) => (elem, false),
            (None, None) => {
                return Err(BuildErrorKind::NotDereferenceable(world.type_name(ty)).into());
            }
        };
        let args = vec![arg("v", ty)];

        if is_ref {
            return self.ensure_intrinsic(
                Prototype::mangled(world, "__deref__", elem, args),
                DEREF_REF,
                exprs,
            );
        }

        let ret = world.reference(elem);
        let deref = self.ensure_intrinsic(
            Prototype::mangled(world, "__deref__", ret, args.clone()),
            DEREF_PTR,
            exprs,
        )?;
        self.ensure_forwarder(Prototype::operator(world, "*", ret, args, 0), &deref, exprs)?;
        Ok(deref)
    }

    /// Dereference helpers for `ptr(ty)` and `ref(ty)`, and the `.` and `->`
    /// member operators for every field of struct `ty`.
    ///
    /// Returns the `.` accessors, in field order.
    pub fn create_struct_code(&self, ty: Idx, exprs: &mut Vec<Node>) -> Result<Vec<Node>, BuildError> {
        let world = self.world;
        let (Some(fields), Some(offsets)) = (world.struct_fields(ty), world.field_offsets(ty)) else {
            return Err(BuildErrorKind::NotAStruct(world.type_name(ty)).into());
        };
        let ptr_ty = world.ptr(ty);
        let ref_ty = world.reference(ty);

        self.create_dereference_code(ptr_ty, exprs)?;
        self.create_dereference_code(ref_ty, exprs)?;

        let mut accessors = Vec::with_capacity(fields.len());
        for (field, offset) in fields.iter().zip(offsets) {
            let sym = world.symbol(&field.name);
            let ret = world.reference(field.ty);
            let template = [MEMBER_ACCESS_HEAD, &offset.to_string(), MEMBER_ACCESS_TAIL].concat();

            let dot = Prototype::operator(
                world,
                ".",
                ret,
                vec![arg("s", ref_ty), arg("sym", sym)],
                MEMBER_PRECEDENCE,
            );
            accessors.push(self.ensure_intrinsic(dot, &template, exprs)?);

            let arrow = Prototype::operator(
                world,
                "->",
                ret,
                vec![arg("s", ptr_ty), arg("sym", sym)],
                MEMBER_PRECEDENCE,
            );
            self.ensure_intrinsic(arrow, &template, exprs)?;
        }
        Ok(accessors)
    }

    /// A conversion from `src` to `dest`: a bitcast between pointer types,
    /// or an integer truncation or extension named `to_<dest>`.
    pub fn create_cast_code(&self, src: Idx, dest: Idx, exprs: &mut Vec<Node>) -> Result<Node, BuildError> {
        let world = self.world;

        if let (Some(_), Some(dest_elem)) = (world.pointee(src), world.pointee(dest)) {
            let name = format!("to_{}_ptr", world.type_name(dest_elem));
            let proto = Prototype::mangled(world, &name, dest, vec![arg("src", src)]);
            return self.ensure_intrinsic(proto, BITCAST, exprs);
        }

        if let (Some(from), Some(to)) = (world.prim_kind(src), world.prim_kind(dest)) {
            if from.is_integer() && to.is_integer() {
                let src = world.canonical(src);
                let dest = world.canonical(dest);
                let conv = match from.byte_size().cmp(&to.byte_size()) {
                    std::cmp::Ordering::Equal => INT_SAME_SIZE,
                    std::cmp::Ordering::Greater => INT_TRUNC,
                    std::cmp::Ordering::Less if from.is_signed_integer() => INT_SEXT,
                    std::cmp::Ordering::Less => INT_ZEXT,
                };
                let template = [INT_CAST_HEAD, conv, "} "].concat();
                let name = format!("to_{}", to.name());
                let proto = Prototype::mangled(world, &name, dest, vec![arg("src", src)]);
                return self.ensure_intrinsic(proto, &template, exprs);
            }
        }

        Err(BuildErrorKind::UnsupportedCast {
            from: world.type_name(src),
            to: world.type_name(dest),
        }
        .into())
    }

    /// `__index__` for a pointer to `E` indexed by an integer.
    pub fn create_array_index_code(
        &self,
        array_ty: Idx,
        index_ty: Idx,
        exprs: &mut Vec<Node>,
    ) -> Result<Node, BuildError> {
        let world = self.world;
        let elem = world.pointee(array_ty).filter(|_| {
            world
                .prim_kind(index_ty)
                .is_some_and(kiara_types::PrimKind::is_integer)
        });
        let Some(elem) = elem else {
            return Err(BuildErrorKind::UnsupportedIndex {
                array: world.type_name(array_ty),
                index: world.type_name(index_ty),
            }
            .into());
        };

        let template = match world.size_of(elem) {
            Some(size) => [INDEX_SIZED_HEAD, &size.to_string(), INDEX_SIZED_TAIL].concat(),
            None => INDEX_GEP.to_owned(),
        };
        let proto = Prototype::mangled(
            world,
            "__index__",
            world.reference(elem),
            vec![arg("array", array_ty), arg("index", index_ty)],
        );
        self.ensure_intrinsic(proto, &template, exprs)
    }

    /// The `=` operator storing a `src` value through reference `dest`.
    pub fn create_assign_code(&self, dest: Idx, src: Idx, exprs: &mut Vec<Node>) -> Result<Node, BuildError> {
        let world = self.world;
        if world.referent(dest).is_none() {
            return Err(BuildErrorKind::NotAssignable(world.type_name(dest)).into());
        }
        let proto = Prototype::operator(
            world,
            "=",
            dest,
            vec![arg("a", dest), arg("b", src)],
            ASSIGN_PRECEDENCE,
        );
        self.ensure_intrinsic(proto, ASSIGN, exprs)
    }

    /// The intrinsic registered for `proto`, created from `template` if
    /// missing.
    fn ensure_intrinsic(
        &self,
        proto: Prototype,
        template: &str,
        exprs: &mut Vec<Node>,
    ) -> Result<Node, BuildError> {
        if let Some(existing) = Self::get_function_from_scope(&proto, &self.scope.top_scope()) {
            return Ok(existing);
        }
        proto.set_attribute("llvm", "true");
        proto.set_attribute("always_inline", "true");
        let func = Node::intrinsic(Rc::new(proto), template);
        self.register_helper(&func, exprs)?;
        Ok(func)
    }

    /// The function registered for `proto`, created as an inline call of
    /// `target` with the same arguments if missing.
    fn ensure_forwarder(
        &self,
        proto: Prototype,
        target: &Node,
        exprs: &mut Vec<Node>,
    ) -> Result<Node, BuildError> {
        if let Some(existing) = Self::get_function_from_scope(&proto, &self.scope.top_scope()) {
            return Ok(existing);
        }
        proto.set_attribute("always_inline", "true");
        let func = Node::function(self.world, Rc::new(proto), None)?;
        if let Some(def) = func.as_function() {
            let body = Node::call(self.world, target.clone(), def.args().nodes());
            def.set_body(self.world, Some(body))?;
        }
        self.register_helper(&func, exprs)?;
        Ok(func)
    }

    fn register_helper(&self, func: &Node, exprs: &mut Vec<Node>) -> Result<(), BuildError> {
        let top = self.scope.top_scope();
        self.add_function_to_scope(func, &top)?;
        if let Some(def) = func.as_function() {
            tracing::debug!(
                name = def.name(),
                mangled = %def.mangled_name(),
                scope = %top.full_name(),
                "synthesized helper"
            );
        }
        exprs.push(func.clone());
        Ok(())
    }
}
