//! Call construction: overload resolution and argument conversion.

use std::rc::Rc;

use smallvec::SmallVec;

use kiara_ir::{printer, Binding, Mangler, Node, OverloadSet, PrimValue, Scope, SourceLocation};
use kiara_types::Idx;

use super::IrBuilder;
use crate::{BuildError, BuildErrorKind};

/// Function called when a non-function value is applied to arguments.
pub const DEFAULT_CALL_METHOD: &str = "__call__";

/// How arguments are matched against parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallMode {
    /// Apply the implicit conversions of [`IrBuilder::convert_value`].
    #[default]
    Convert,
    /// Argument types must equal parameter types up to typedefs.
    NoTypeConversion,
}

/// Where and how [`IrBuilder::create_call`] resolves a call.
#[derive(Clone, Debug)]
pub struct CallRequest<'a> {
    name: &'a str,
    scope: Option<Rc<Scope>>,
    location: Option<SourceLocation>,
    call_method: &'a str,
    mode: CallMode,
}

impl<'a> CallRequest<'a> {
    /// Call `name` from the builder's current scope, converting arguments.
    pub fn new(name: &'a str) -> Self {
        CallRequest {
            name,
            scope: None,
            location: None,
            call_method: DEFAULT_CALL_METHOD,
            mode: CallMode::Convert,
        }
    }

    #[must_use]
    pub fn in_scope(mut self, scope: Rc<Scope>) -> Self {
        self.scope = Some(scope);
        self
    }

    #[must_use]
    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn call_method(mut self, call_method: &'a str) -> Self {
        self.call_method = call_method;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: CallMode) -> Self {
        self.mode = mode;
        self
    }
}

/// What a call resolves against.
enum Target {
    Overloads(OverloadSet),
    /// A value of function pointer type.
    Indirect(Node),
}

/// A candidate whose parameters accept the arguments.
struct Viable {
    func: Node,
    args: Vec<Node>,
    conversions: u32,
}

impl IrBuilder<'_> {
    /// Build a call to `request.name` with `args`.
    ///
    /// The name may denote an overload set, a function pointer value, or any
    /// other value, which is then passed as first argument to the overloads of
    /// the request's call method. Among the candidates whose parameters
    /// accept the (converted) arguments, a single one must remain, or
    /// exactly one must need no conversion at all.
    #[tracing::instrument(level = "debug", skip_all, fields(name = request.name, args = args.len()))]
    pub fn create_call(&self, request: CallRequest<'_>, args: Vec<Node>) -> Result<Node, BuildError> {
        let world = self.world;
        let scope = request.scope.clone().unwrap_or_else(|| Rc::clone(&self.scope));
        let location = request.location;
        let fail = |kind: BuildErrorKind| BuildError::new(kind).at(location);

        let Some(binding) = scope.lookup_object(request.name, true) else {
            return Err(fail(BuildErrorKind::NoFunction {
                name: request.name.to_owned(),
                args: self.arg_type_names(&args),
            }));
        };

        let (target, call_name, call_args) = match binding {
            Binding::Overloads(set) => (Target::Overloads(set), request.name, args),
            Binding::Expr(expr) if world.is_function_pointer(expr.ty()) => {
                (Target::Indirect(expr), request.name, args)
            }
            Binding::Expr(expr) => {
                let set = match scope.lookup_object(request.call_method, true) {
                    Some(Binding::Overloads(set)) => set,
                    other => {
                        let name = request.name.to_owned();
                        let call_method = request.call_method.to_owned();
                        let expr_text = printer::to_string(world, &expr);
                        let ty = world.type_name(expr.ty());
                        return Err(fail(if other.is_none() {
                            BuildErrorKind::NoCallMethod {
                                name,
                                call_method,
                                expr: expr_text,
                                ty,
                            }
                        } else {
                            BuildErrorKind::CallMethodNotAFunction {
                                name,
                                call_method,
                                expr: expr_text,
                                ty,
                            }
                        }));
                    }
                };
                let mut call_args = Vec::with_capacity(args.len() + 1);
                call_args.push(expr);
                call_args.extend(args);
                (Target::Overloads(set), request.call_method, call_args)
            }
            other => {
                return Err(fail(BuildErrorKind::NotAnExpression {
                    name: request.name.to_owned(),
                    object: self.describe_binding(&other),
                }));
            }
        };

        let mut callee = format!("'{call_name}'");
        let candidates: Vec<Node> = match &target {
            Target::Indirect(expr) => vec![expr.clone()],
            Target::Overloads(set) => {
                let mangled = Mangler::new(world).mangle_call(call_name, &call_args);
                callee = format!("'{call_name}' (mangled '{mangled}')");
                let exact = set.borrow().lookup(&mangled);
                match exact.filter(|f| f.as_function().is_some()) {
                    Some(exact) => vec![exact],
                    None => {
                        let mut same_arity = set.borrow().functions();
                        same_arity.retain(|f| {
                            f.as_function()
                                .is_some_and(|def| def.proto().args().len() == call_args.len())
                        });
                        same_arity
                    }
                }
            }
        };

        let mut viable: SmallVec<[Viable; 4]> = SmallVec::new();
        for func in candidates {
            if let Some(found) = self.check_candidate(&func, &call_args, request.mode) {
                viable.push(found);
            }
        }

        let selected = match viable.len() {
            0 => {
                let candidates = match &target {
                    Target::Indirect(_) => Vec::new(),
                    Target::Overloads(set) => set
                        .borrow()
                        .functions()
                        .iter()
                        .map(|func| printer::to_string(world, func))
                        .collect(),
                };
                return Err(fail(BuildErrorKind::NoMatchingFunction {
                    callee,
                    args: self.arg_type_names(&call_args),
                    candidates,
                }));
            }
            1 => viable.remove(0),
            _ => {
                let exact: SmallVec<[usize; 2]> = viable
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.conversions == 0)
                    .map(|(i, _)| i)
                    .collect();
                if exact.len() != 1 {
                    return Err(fail(BuildErrorKind::Ambiguous {
                        name: call_name.to_owned(),
                        candidates: viable
                            .iter()
                            .map(|v| printer::to_string(world, &v.func))
                            .collect(),
                    }));
                }
                viable.swap_remove(exact[0])
            }
        };

        tracing::debug!(%callee, conversions = selected.conversions, "resolved call");
        Ok(Node::call(world, selected.func, selected.args).with_location(location))
    }

    /// Match `args` against the parameters of `func`, converting them.
    fn check_candidate(&self, func: &Node, args: &[Node], mode: CallMode) -> Option<Viable> {
        let params = match func.as_function() {
            Some(def) => def.proto().arg_types(),
            None => {
                let fn_ty = self.world.pointee(func.ty())?;
                self.world.function_signature(fn_ty)?.1.to_vec()
            }
        };
        if params.len() != args.len() {
            return None;
        }

        let mut conversions = 0;
        let mut converted = Vec::with_capacity(args.len());
        for (arg, &param) in args.iter().zip(&params) {
            let value = match mode {
                CallMode::Convert => self.convert_value(arg, param, &mut conversions).ok(),
                CallMode::NoTypeConversion => self
                    .world
                    .canonically_equal(arg.ty(), param)
                    .then(|| arg.clone()),
            };
            let Some(value) = value else {
                tracing::trace!(
                    candidate = %printer::to_string(self.world, func),
                    arg = %self.world.type_name(arg.ty()),
                    param = %self.world.type_name(param),
                    "argument rejected"
                );
                return None;
            };
            converted.push(value);
        }
        Some(Viable {
            func: func.clone(),
            args: converted,
            conversions,
        })
    }

    /// Convert `value` to type `dest`, counting lossy steps in `conversions`.
    ///
    /// Accepted, in order: equal types; `any`; a variable or function bound
    /// to a reference to its type; a reference read through `__deref__`;
    /// a string passed as `ptr(void)` or `ptr(char)`; the null literal or an
    /// array of `T` passed as `ptr(T)`; any pointer passed as `ptr(void)`,
    /// which counts as one conversion.
    pub fn convert_value(
        &self,
        value: &Node,
        dest: Idx,
        conversions: &mut u32,
    ) -> Result<Node, BuildError> {
        let world = self.world;
        let src = value.ty();

        if world.canonically_equal(src, dest) || world.canonically_equal(dest, Idx::ANY) {
            return Ok(value.clone());
        }

        if let Some(elem) = world.referent(dest) {
            if world.canonically_equal(elem, src) {
                if let Some(reference) = value.reference(world) {
                    return Ok(reference);
                }
            }
        }

        if let Some(elem) = world.referent(src) {
            match self.get_dereference(value) {
                Ok(Some(deref)) => {
                    if world.canonically_equal(elem, dest) {
                        return Ok(deref);
                    }
                    if let Ok(converted) = self.convert_value(&deref, dest, conversions) {
                        return Ok(converted);
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::trace!(%err, "value not dereferenced"),
            }
        }

        let void_ptr = world.c_void_ptr();
        if world.canonically_equal(src, Idx::STRING)
            && (world.canonically_equal(dest, void_ptr)
                || world.canonically_equal(dest, world.c_char_ptr()))
        {
            return Ok(value.clone());
        }

        if let Some(pointee) = world.pointee(dest) {
            let is_null = value
                .as_literal()
                .is_some_and(|lit| matches!(lit.value(), PrimValue::NullPtr));
            if is_null {
                return Ok(value.clone());
            }
            if world
                .array_element(src)
                .is_some_and(|elem| world.canonically_equal(elem, pointee))
            {
                return Ok(value.clone());
            }
        }

        if world.is_pointer(src) && world.canonically_equal(dest, void_ptr) {
            *conversions += 1;
            return Ok(value.clone());
        }

        Err(BuildError::new(BuildErrorKind::NoConversion {
            from: world.type_name(src),
            to: world.type_name(dest),
        })
        .at(value.location()))
    }

    /// A read of `expr` through the `__deref__` helper registered for its
    /// type. `None` when `expr` is neither a reference nor a pointer.
    pub fn get_dereference(&self, expr: &Node) -> Result<Option<Node>, BuildError> {
        let ty = expr.ty();
        if !self.world.is_reference(ty) && !self.world.is_pointer(ty) {
            return Ok(None);
        }
        let request = CallRequest::new("__deref__")
            .at(expr.location())
            .mode(CallMode::NoTypeConversion);
        self.create_call(request, vec![expr.clone()]).map(Some)
    }
}
