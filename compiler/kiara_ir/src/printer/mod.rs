//! Pretty printer for IR nodes, used in diagnostics.
//!
//! Output follows the surface syntax:
//!
//! ```text
//! def [always_inline] binary + 60 (a:i32, b:i32):i32 body: {
//!     (a + b);
//! }
//! ```

use kiara_types::{Idx, World};

use crate::visitor::{VisitResult, Visitor};
use crate::{Node, Prototype, VisitError};

const INDENT_WIDTH: usize = 4;

/// Render `node` as text.
pub fn to_string(world: &World, node: &Node) -> String {
    let mut printer = Printer::new(world);
    printer.print(Some(node));
    printer.out
}

/// Render a prototype as `name(a:T, b:U):R`.
pub fn prototype_to_string(world: &World, proto: &Prototype) -> String {
    let mut printer = Printer::new(world);
    printer.prototype(proto);
    printer.out
}

struct Printer<'w> {
    world: &'w World,
    out: String,
    indent: usize,
    at_line_start: bool,
    /// Set while printing the target of a `MemRef`: functions print as
    /// their name only.
    in_mem_ref: bool,
}

impl<'w> Printer<'w> {
    fn new(world: &'w World) -> Self {
        Printer {
            world,
            out: String::new(),
            indent: 0,
            at_line_start: true,
            in_mem_ref: false,
        }
    }

    /// Append `text`, indenting every line that receives content.
    fn write(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.at_line_start = true;
            } else if self.at_line_start {
                self.at_line_start = false;
                self.out.push_str(&" ".repeat(self.indent * INDENT_WIDTH));
            }
            self.out.push(c);
        }
    }

    fn write_type(&mut self, ty: Idx) {
        let name = self.world.type_name(ty);
        self.write(&name);
    }

    fn print(&mut self, node: Option<&Node>) {
        let Some(node) = node else {
            self.write("<NULL>");
            return;
        };
        if self.apply(Some(node)).is_err() {
            self.write("<NULL>");
        }
    }

    /// A block body goes on the same line; anything else goes on the next
    /// line, one level deeper.
    fn print_body(&mut self, body: Option<&Node>) {
        if body.is_some_and(Node::is_block) {
            self.write(" ");
            self.print(body);
        } else {
            self.write("\n");
            self.indent += 1;
            self.print(body);
            self.indent -= 1;
        }
    }

    fn print_args(&mut self, args: &[Node]) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.print(Some(arg));
        }
    }

    fn prototype(&mut self, proto: &Prototype) {
        let attributes = proto.attributes().to_string();
        self.write(&attributes);
        if proto.is_unary_op() && !proto.name().is_empty() {
            self.write(&format!("unary {} ", proto.name()));
        } else if proto.is_binary_op() && !proto.name().is_empty() {
            self.write(&format!(
                "binary {} {} ",
                proto.name(),
                proto.precedence()
            ));
        } else {
            self.write(proto.name());
        }
        self.write("(");
        for (i, (name, ty)) in proto.args().iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(name);
            if ty.is_some() {
                if !name.is_empty() {
                    self.write(":");
                }
                self.write_type(*ty);
            }
        }
        self.write(")");
        if proto.return_type().is_some() {
            self.write(":");
            self.write_type(proto.return_type());
        }
    }

    /// Name-only rendering of a function reached through a `MemRef`.
    fn function_name(&mut self, node: &Node) -> bool {
        if !self.in_mem_ref {
            return false;
        }
        if let Some(func) = node.as_function() {
            self.write(func.name());
        }
        true
    }
}

fn mismatch(node: &Node, expected: &'static str) -> VisitError {
    VisitError::KindMismatch {
        expected,
        found: node.kind().name(),
    }
}

impl Visitor for Printer<'_> {
    type Output = ();

    fn visit_mem_ref(&mut self, node: &Node) -> VisitResult<()> {
        let mem_ref = node.as_mem_ref().ok_or_else(|| mismatch(node, "MemRef"))?;
        let outer = std::mem::replace(&mut self.in_mem_ref, true);
        self.print(mem_ref.value().as_ref());
        self.in_mem_ref = outer;
        Ok(())
    }

    fn visit_literal(&mut self, node: &Node) -> VisitResult<()> {
        let lit = node.as_literal().ok_or_else(|| mismatch(node, "PrimLiteral"))?;
        self.write(&lit.value().to_string());
        Ok(())
    }

    fn visit_list_literal(&mut self, node: &Node) -> VisitResult<()> {
        let list = node.as_list().ok_or_else(|| mismatch(node, "ListLiteral"))?;
        self.write("[");
        self.print_args(&list.elems().nodes());
        self.write("]");
        Ok(())
    }

    fn visit_type_expr(&mut self, node: &Node) -> VisitResult<()> {
        let expr = node.as_type_expr().ok_or_else(|| mismatch(node, "TypeExpr"))?;
        self.write_type(expr.type_value());
        Ok(())
    }

    fn visit_def(&mut self, node: &Node) -> VisitResult<()> {
        let def = node.as_def().ok_or_else(|| mismatch(node, "DefExpr"))?;
        self.write(&def.name());
        Ok(())
    }

    fn visit_symbol(&mut self, node: &Node) -> VisitResult<()> {
        let symbol = node.as_symbol().ok_or_else(|| mismatch(node, "SymbolExpr"))?;
        self.write(symbol.name());
        Ok(())
    }

    fn visit_call(&mut self, node: &Node) -> VisitResult<()> {
        let call = node.as_call().ok_or_else(|| mismatch(node, "CallExpr"))?;
        let args = call.args().nodes();
        match call.called_function() {
            Some(func) => {
                let proto = func
                    .as_function()
                    .map(|func| std::rc::Rc::clone(func.proto()))
                    .ok_or_else(|| mismatch(&func, "FunctionDefinition"))?;
                if proto.is_unary_op() && args.len() == 1 {
                    self.write(&format!("({}", proto.name()));
                    self.print(args.first());
                    self.write(")");
                    return Ok(());
                }
                if proto.is_binary_op() && args.len() == 2 {
                    self.write("(");
                    self.print(args.first());
                    self.write(&format!(" {} ", proto.name()));
                    self.print(args.get(1));
                    self.write(")");
                    return Ok(());
                }
                self.write(proto.name());
            }
            None => self.print(call.callee().as_ref()),
        }
        self.write("(");
        self.print_args(&args);
        self.write(")");
        Ok(())
    }

    fn visit_if(&mut self, node: &Node) -> VisitResult<()> {
        let if_expr = node.as_if().ok_or_else(|| mismatch(node, "IfExpr"))?;
        self.write("if ");
        self.print(if_expr.cond().as_ref());
        self.write(" then");
        self.print_body(if_expr.then().as_ref());
        if let Some(else_) = if_expr.else_() {
            self.write("\nelse");
            self.print_body(Some(&else_));
        }
        Ok(())
    }

    fn visit_loop(&mut self, node: &Node) -> VisitResult<()> {
        let loop_expr = node.as_loop().ok_or_else(|| mismatch(node, "LoopExpr"))?;
        self.write("(loop");
        self.print_body(loop_expr.body().as_ref());
        self.write(")");
        Ok(())
    }

    fn visit_for(&mut self, node: &Node) -> VisitResult<()> {
        let for_expr = node.as_for().ok_or_else(|| mismatch(node, "ForExpr"))?;
        self.write("(for ");
        match for_expr.var() {
            Some(var) => {
                self.print(Some(&var));
                if var.ty().is_some() {
                    self.write(":");
                    self.write_type(var.ty());
                }
            }
            None => self.write("<NULL>"),
        }
        self.write(" = ");
        self.print(for_expr.start().as_ref());
        self.write(", ");
        self.print(for_expr.end().as_ref());
        if let Some(step) = for_expr.step() {
            self.write(", ");
            self.print(Some(&step));
        }
        self.write(" in");
        self.print_body(for_expr.body().as_ref());
        self.write(")");
        Ok(())
    }

    fn visit_let(&mut self, node: &Node) -> VisitResult<()> {
        let let_expr = node.as_let().ok_or_else(|| mismatch(node, "LetExpr"))?;
        self.write("var ");
        match let_expr.var() {
            Some(var) => {
                self.print(Some(&var));
                self.write(":");
                self.write_type(var.ty());
            }
            None => self.write("<NULL>:<NULL>"),
        }
        if let Some(init) = let_expr.init() {
            self.write(" = ");
            self.print(Some(&init));
        }
        self.write(" in");
        self.print_body(let_expr.body().as_ref());
        Ok(())
    }

    fn visit_block(&mut self, node: &Node) -> VisitResult<()> {
        let block = node.as_block().ok_or_else(|| mismatch(node, "BlockExpr"))?;
        let name = block.name().to_string();
        if !name.is_empty() {
            self.write(&format!("{name}: "));
        }
        self.write("{\n");
        self.indent += 1;
        for expr in block.exprs().nodes() {
            self.print(Some(&expr));
            if !expr.is_block() {
                self.write(";");
            }
            self.write("\n");
        }
        self.indent -= 1;
        self.write("}");
        Ok(())
    }

    fn visit_break(&mut self, node: &Node) -> VisitResult<()> {
        let brk = node.as_break().ok_or_else(|| mismatch(node, "BreakExpr"))?;
        self.write("break(");
        let target = brk.block();
        if let Some(block) = target.as_ref().and_then(Node::as_block) {
            let name = block.name().to_string();
            self.write(&name);
        }
        if let Some(value) = brk.value() {
            if target.is_some() {
                self.write(",");
            }
            self.print(Some(&value));
        }
        self.write(")");
        Ok(())
    }

    fn visit_function(&mut self, node: &Node) -> VisitResult<()> {
        if self.function_name(node) {
            return Ok(());
        }
        let func = node.as_function().ok_or_else(|| mismatch(node, "Function"))?;
        let body = func.body_expr();
        self.write("def ");
        self.prototype(func.proto());
        self.print_body(body.as_ref());
        if !body.as_ref().is_some_and(Node::is_block) {
            self.write(";");
        }
        Ok(())
    }

    fn visit_extern_function(&mut self, node: &Node) -> VisitResult<()> {
        if self.function_name(node) {
            return Ok(());
        }
        let func = node
            .as_function()
            .ok_or_else(|| mismatch(node, "ExternFunction"))?;
        self.write("extern ");
        self.prototype(func.proto());
        self.write(";");
        Ok(())
    }

    fn visit_intrinsic(&mut self, node: &Node) -> VisitResult<()> {
        if self.function_name(node) {
            return Ok(());
        }
        let func = node.as_function().ok_or_else(|| mismatch(node, "Intrinsic"))?;
        self.write("def intrinsic ");
        self.prototype(func.proto());
        self.write("\n");
        self.indent += 1;
        let code = format!("{:?};", func.intrinsic_body().unwrap_or_default());
        self.write(&code);
        self.indent -= 1;
        Ok(())
    }

    fn visit_function_declaration(&mut self, node: &Node) -> VisitResult<()> {
        if self.function_name(node) {
            return Ok(());
        }
        let func = node
            .as_function()
            .ok_or_else(|| mismatch(node, "FunctionDeclaration"))?;
        if func.is_extern() {
            self.write("extern ");
        }
        self.write("def ");
        self.prototype(func.proto());
        Ok(())
    }

    fn visit_prototype(&mut self, node: &Node) -> VisitResult<()> {
        let proto = node.as_prototype().ok_or_else(|| mismatch(node, "Prototype"))?;
        self.prototype(proto);
        Ok(())
    }

    fn visit_type_definition(&mut self, node: &Node) -> VisitResult<()> {
        let def = node
            .as_type_definition()
            .ok_or_else(|| mismatch(node, "TypeDefinition"))?;
        self.write_type(def.defined_type());
        Ok(())
    }
}
