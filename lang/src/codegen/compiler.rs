//! Lowering of the typed AST to textual LLVM IR.
//!
//! Third AST walk. The emitter assumes the AST resolved and typechecked
//! cleanly; any violation of that assumption is a compiler bug and
//! aborts. A scope stack mirrors the lexical scopes and tracks every
//! heap-typed local and expression-introduced temporary, so that each
//! exit path (fall-through, loop exit, return) releases exactly the
//! values it owns.

use super::ir::{mangle, IrType, Module, Value};
use crate::lexer::token::{DdpType, Primitive};
use crate::parser::ast::*;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Result of a successful lowering.
#[derive(Debug)]
pub struct CompileResult {
    /// the textual LLVM IR module
    pub output: String,
    /// object/source files of extern functions, to be handed to the linker
    pub dependencies: BTreeSet<PathBuf>,
}

/// Lower the AST to textual LLVM IR.
pub fn compile(ast: &Ast) -> Result<CompileResult, String> {
    if ast.faulty {
        return Err("Fehlerhafter Syntax Baum".to_string());
    }

    let mut compiler = Compiler {
        ast,
        module: Module::new(&ast.file),
        functions: &ast.functions,
        scopes: vec![CgScope::default()],
        fn_base_scope: 0,
        dependencies: BTreeSet::new(),
        cf: 0,
        cbb: 0,
    };
    compiler.setup_runtime_functions();

    // the main entry, called by the runtime after initialization
    let main_fn = compiler.module.define("_ddp_ddpmain", IrType::Int, Vec::new());
    compiler.cf = main_fn;
    compiler.cbb = 0;

    for stmt in &ast.statements {
        compiler.compile_stmt(stmt);
    }

    // release heap-typed globals before returning from ddpmain
    compiler.emit_scope_frees(0);
    compiler.set_term("ret i64 0".to_string());

    Ok(CompileResult { output: compiler.module.render(), dependencies: compiler.dependencies })
}

#[derive(Debug, Clone)]
struct CgVar {
    /// register or global holding a pointer to the value's storage slot
    slot: String,
    ty: IrType,
    is_ref: bool,
}

#[derive(Debug, Default)]
struct CgScope {
    vars: Vec<(String, CgVar)>,
    /// expression-introduced temporaries (for-each iterables), released
    /// only on the early-return unwind path
    temps: Vec<Value>,
}

struct Compiler<'a> {
    ast: &'a Ast,
    module: Module,
    functions: &'a HashMap<String, Rc<FuncDecl>>,
    scopes: Vec<CgScope>,
    /// index of the current function's outermost scope
    fn_base_scope: usize,
    dependencies: BTreeSet<PathBuf>,
    /// current function and basic block
    cf: usize,
    cbb: usize,
}

impl Compiler<'_> {
    // ------------------------------------------------------------------
    // module setup
    // ------------------------------------------------------------------

    /// Declares the runtime ABI: string and list operations, inbuilt
    /// operators, the bounds trap and all extern DDP functions.
    fn setup_runtime_functions(&mut self) {
        use IrType::*;

        self.module.declare("out_of_bounds", Void, &[Int, Int]);

        // strings
        self.module.declare("_ddp_string_from_constant", StrPtr, &[I8Ptr]);
        self.module.declare("_ddp_free_string", Void, &[StrPtr]);
        self.module.declare("_ddp_deep_copy_string", StrPtr, &[StrPtr]);
        self.module.declare("_ddp_string_equal", I1, &[StrPtr, StrPtr]);
        self.module.declare("_ddp_string_slice", StrPtr, &[StrPtr, Int, Int]);
        self.module.declare("_ddp_string_string_verkettet", StrPtr, &[StrPtr, StrPtr]);
        self.module.declare("_ddp_char_string_verkettet", StrPtr, &[Char, StrPtr]);
        self.module.declare("_ddp_string_char_verkettet", StrPtr, &[StrPtr, Char]);
        self.module.declare("_ddp_string_length", Int, &[StrPtr]);
        self.module.declare("_ddp_string_index", Char, &[StrPtr, Int]);
        self.module.declare("_ddp_replace_char_in_string", Void, &[StrPtr, Char, Int]);
        self.module.declare("_ddp_string_to_int", Int, &[StrPtr]);
        self.module.declare("_ddp_string_to_float", Float, &[StrPtr]);
        self.module.declare("_ddp_int_to_string", StrPtr, &[Int]);
        self.module.declare("_ddp_float_to_string", StrPtr, &[Float]);
        self.module.declare("_ddp_bool_to_string", StrPtr, &[I1]);
        self.module.declare("_ddp_char_to_string", StrPtr, &[Char]);

        // the five list variants
        for list in [IntListPtr, FloatListPtr, BoolListPtr, CharListPtr, StringListPtr] {
            let elem = list.element();
            let l = list.runtime_suffix();
            let e = elem.verkettet_name();
            self.module.declare(&format!("_ddp_{}_from_constants", l), list, &[Int]);
            self.module.declare(&format!("_ddp_free_{}", l), Void, &[list]);
            self.module.declare(&format!("_ddp_deep_copy_{}", l), list, &[list]);
            self.module.declare(&format!("_ddp_{}_equal", l), I1, &[list, list]);
            self.module.declare(&format!("_ddp_{}_slice", l), list, &[list, Int, Int]);
            self.module.declare(&format!("_ddp_{}_to_string", l), StrPtr, &[list]);
            self.module.declare(&format!("_ddp_{}_{}_verkettet", l, l), list, &[list, list]);
            self.module.declare(&format!("_ddp_{}_{}_verkettet", l, e), list, &[list, elem]);
            self.module.declare(&format!("_ddp_{}_{}_verkettet", e, l), list, &[elem, list]);
            if list != StringListPtr {
                // string ⊕ string concatenates to a string, not a list
                self.module.declare(&format!("_ddp_{}_{}_verkettet", e, e), list, &[elem, elem]);
            }
        }

        // scalar helpers
        self.module.declare("llabs", Int, &[Int]);
        self.module.declare("fabs", Float, &[Float]);
        self.module.declare("pow", Float, &[Float, Float]);
        self.module.declare("log10", Float, &[Float]);
        for trig in ["sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh"] {
            self.module.declare(&format!("_ddp_{}", trig), Float, &[Float]);
        }

        // extern DDP functions, sorted for deterministic output
        let mut externs: Vec<&Rc<FuncDecl>> =
            self.functions.values().filter(|decl| decl.is_extern()).collect();
        externs.sort_by(|a, b| a.name.cmp(&b.name));
        for decl in externs {
            let ret = decl.return_type.map_or(Void, ir_type);
            let params: Vec<String> = decl
                .params
                .iter()
                .map(|param| {
                    let ty = ir_type(param.typ);
                    if param.is_reference {
                        format!("{}*", ty.ll())
                    } else {
                        ty.ll().to_string()
                    }
                })
                .collect();
            self.module.declare_raw(&decl.name, ret, &params);

            // the file an extern function is defined in becomes a link
            // dependency; the inbuilt write functions carry no file
            if let Some(file) = &decl.extern_file {
                if !file.is_empty() {
                    let base = Path::new(&self.ast.file)
                        .parent()
                        .unwrap_or_else(|| Path::new("."))
                        .join(file);
                    self.dependencies.insert(base);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // instruction plumbing
    // ------------------------------------------------------------------

    fn fresh(&mut self) -> String {
        self.module.func(self.cf).fresh_reg()
    }

    fn inst(&mut self, text: String) {
        let block = self.cbb;
        self.module.func(self.cf).blocks[block].insts.push(text);
    }

    /// stack slots live in the function's entry block
    fn alloca(&mut self, ty: IrType) -> String {
        let reg = self.fresh();
        self.module.func(self.cf).blocks[0].insts.push(format!("{} = alloca {}", reg, ty.ll()));
        reg
    }

    fn emit(&mut self, ty: IrType, body: String) -> Value {
        let reg = self.fresh();
        self.inst(format!("{} = {}", reg, body));
        Value::new(ty, reg)
    }

    fn set_term(&mut self, text: String) {
        let block = self.cbb;
        let term = &mut self.module.func(self.cf).blocks[block].term;
        if term.is_none() {
            *term = Some(text);
        }
    }

    fn block_has_term(&mut self) -> bool {
        let block = self.cbb;
        self.module.func(self.cf).blocks[block].term.is_some()
    }

    fn new_block(&mut self) -> usize {
        self.module.func(self.cf).new_block()
    }

    fn label(&mut self, block: usize) -> String {
        self.module.func(self.cf).blocks[block].label.clone()
    }

    fn load(&mut self, ty: IrType, ptr: &str) -> Value {
        self.emit(ty, format!("load {}, {}* {}", ty.ll(), ty.ll(), ptr))
    }

    fn store(&mut self, value: &Value, ptr: &str) {
        self.inst(format!("store {}, {}* {}", value.typed(), value.ty.ll(), ptr));
    }

    fn call(&mut self, ret: IrType, name: &str, args: &[Value]) -> Value {
        let operands: Vec<String> = args.iter().map(Value::typed).collect();
        self.call_raw(ret, name, operands)
    }

    fn call_raw(&mut self, ret: IrType, name: &str, operands: Vec<String>) -> Value {
        let callee = mangle(name);
        if ret == IrType::Void {
            self.inst(format!("call void {}({})", callee, operands.join(", ")));
            Value::void()
        } else {
            self.emit(ret, format!("call {} {}({})", ret.ll(), callee, operands.join(", ")))
        }
    }

    // ------------------------------------------------------------------
    // heap value helpers
    // ------------------------------------------------------------------

    fn free_value(&mut self, value: &Value) {
        debug_assert!(value.ty.is_heap());
        let name = format!("_ddp_free_{}", value.ty.runtime_suffix());
        self.call(IrType::Void, &name, std::slice::from_ref(value));
    }

    fn deep_copy(&mut self, value: &Value) -> Value {
        debug_assert!(value.ty.is_heap());
        let name = format!("_ddp_deep_copy_{}", value.ty.runtime_suffix());
        self.call(value.ty, &name, std::slice::from_ref(value))
    }

    fn list_len(&mut self, list: &Value) -> Value {
        let strct = list.ty.struct_name();
        let ptr = self.fresh();
        self.inst(format!("{} = getelementptr {}, {} {}, i32 0, i32 1", ptr, strct, list.ty.ll(), list.repr));
        self.load(IrType::Int, &ptr)
    }

    /// pointer to the backing array of a list
    fn list_arr(&mut self, list: &Value) -> String {
        let strct = list.ty.struct_name();
        let elem = list.ty.element();
        let ptr = self.fresh();
        self.inst(format!("{} = getelementptr {}, {} {}, i32 0, i32 0", ptr, strct, list.ty.ll(), list.repr));
        let arr = self.fresh();
        self.inst(format!("{} = load {}*, {}** {}", arr, elem.ll(), elem.ll(), ptr));
        arr
    }

    fn elem_gep(&mut self, elem: IrType, arr: &str, index: &str) -> String {
        let ptr = self.fresh();
        self.inst(format!("{} = getelementptr {}, {}* {}, i64 {}", ptr, elem.ll(), elem.ll(), arr, index));
        ptr
    }

    /// Bounds-checked pointer to the 1-based `index` of `list`; branches
    /// to the out_of_bounds trap on failure and continues in the success
    /// block.
    fn get_element_pointer(&mut self, list: &Value, index: &Value) -> (String, IrType) {
        let then_block = self.new_block();
        let error_block = self.new_block();

        let len = self.list_len(list);
        let zero_based = self.emit(IrType::Int, format!("sub i64 {}, 1", index.repr));
        let below = self.emit(IrType::I1, format!("icmp slt i64 {}, {}", zero_based.repr, len.repr));
        let above = self.emit(IrType::I1, format!("icmp sge i64 {}, 0", zero_based.repr));
        let in_bounds = self.emit(IrType::I1, format!("and i1 {}, {}", below.repr, above.repr));
        let then_label = self.label(then_block);
        let error_label = self.label(error_block);
        self.set_term(format!("br i1 {}, label %{}, label %{}", in_bounds.repr, then_label, error_label));

        self.cbb = error_block;
        self.call(IrType::Void, "out_of_bounds", &[index.clone(), len.clone()]);
        self.set_term("unreachable".to_string());

        self.cbb = then_block;
        let arr = self.list_arr(list);
        let elem = list.ty.element();
        let ptr = self.elem_gep(elem, &arr, &zero_based.repr);
        (ptr, elem)
    }

    // ------------------------------------------------------------------
    // scopes
    // ------------------------------------------------------------------

    fn push_scope(&mut self) {
        self.scopes.push(CgScope::default());
    }

    fn declare_var(&mut self, name: &str, var: CgVar) {
        self.scopes.last_mut().unwrap_or_else(|| internal_error()).vars.push((name.to_string(), var));
    }

    fn lookup_var(&self, name: &str) -> CgVar {
        for scope in self.scopes.iter().rev() {
            if let Some((_, var)) = scope.vars.iter().rev().find(|(n, _)| n == name) {
                return var.clone();
            }
        }
        internal_error()
    }

    /// emit releases for the heap locals of scope `idx` (not its temps)
    fn emit_scope_frees(&mut self, idx: usize) {
        let vars: Vec<CgVar> = self.scopes[idx]
            .vars
            .iter()
            .filter(|(_, var)| var.ty.is_heap() && !var.is_ref)
            .map(|(_, var)| var.clone())
            .collect();
        for var in vars {
            let value = self.load(var.ty, &var.slot);
            self.free_value(&value);
        }
    }

    /// normal scope exit: free heap locals, pop
    fn exit_scope(&mut self) {
        let idx = self.scopes.len() - 1;
        self.emit_scope_frees(idx);
        self.scopes.pop();
    }

    /// early-return unwind: release everything from the current scope up
    /// to and including the function's outermost scope, without popping
    fn emit_return_unwind(&mut self) {
        for idx in (self.fn_base_scope..self.scopes.len()).rev() {
            let temps: Vec<Value> = if idx > self.fn_base_scope {
                self.scopes[idx].temps.clone()
            } else {
                Vec::new()
            };
            for temp in temps {
                self.free_value(&temp);
            }
            self.emit_scope_frees(idx);
        }
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    fn compile_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Bad { .. } => internal_error(),
            Stmt::VarDecl(decl) => {
                self.compile_var_decl(decl);
            }
            Stmt::FuncDecl(decl) => self.compile_func_decl(decl),
            Stmt::Expr { expr, .. } => {
                let value = self.compile_expr(expr);
                if value.ty.is_heap() {
                    self.free_value(&value);
                }
            }
            Stmt::Assign { target, rhs, .. } => self.compile_assign(target, rhs),
            Stmt::Block(block) => {
                self.push_scope();
                for stmt in &block.statements {
                    self.compile_stmt(stmt);
                }
                self.exit_scope();
            }
            Stmt::If { condition, then, els, .. } => self.compile_if(condition, then, els.as_deref()),
            Stmt::While { kind, condition, body, .. } => match kind {
                LoopKind::Solange | LoopKind::MacheSolange => {
                    self.compile_while(*kind, condition, body)
                }
                LoopKind::Wiederhole => self.compile_repeat(condition, body),
            },
            Stmt::For { counter, to, step, body, .. } => {
                self.compile_for(counter, to, step.as_ref(), body)
            }
            Stmt::ForEach { elem_type, name, iter, body, .. } => {
                self.compile_for_each(*elem_type, name, iter, body)
            }
            Stmt::Return { value, .. } => {
                let returned = value.as_ref().map(|value| self.compile_expr(value));
                self.emit_return_unwind();
                match returned {
                    Some(value) if value.ty != IrType::Void => {
                        self.set_term(format!("ret {}", value.typed()));
                    }
                    _ => self.set_term("ret void".to_string()),
                }
            }
        }
    }

    /// Returns the initial value, which the counting loop reuses.
    fn compile_var_decl(&mut self, decl: &VarDecl) -> Value {
        let ty = ir_type(decl.typ);
        let slot = if self.scopes.len() == 1 {
            // module-level variables are globals, initialized in ddpmain
            self.module.global_variable(ty)
        } else {
            self.alloca(ty)
        };
        self.declare_var(&decl.name, CgVar { slot: slot.clone(), ty, is_ref: false });
        let init = self.compile_expr(&decl.init);
        self.store(&init, &slot);
        init
    }

    fn compile_func_decl(&mut self, decl: &Rc<FuncDecl>) {
        if decl.is_extern() {
            return; // declared in setup_runtime_functions
        }
        let Some(body) = &decl.body else { internal_error() };

        let ret = decl.return_type.map_or(IrType::Void, ir_type);
        let params: Vec<(String, String)> = decl
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let ty = ir_type(param.typ);
                let text = if param.is_reference {
                    format!("{}*", ty.ll())
                } else {
                    ty.ll().to_string()
                };
                (format!("%p{}", i), text)
            })
            .collect();
        let func = self.module.define(&decl.name, ret, params);

        let (old_cf, old_cbb, old_base) = (self.cf, self.cbb, self.fn_base_scope);
        self.cf = func;
        self.cbb = 0;
        self.push_scope();
        self.fn_base_scope = self.scopes.len() - 1;

        // arguments are immutable ssa registers; non-reference parameters
        // are spilled to stack slots so in-body assignment is uniform.
        // references simply rename the caller's slot.
        for (i, param) in decl.params.iter().enumerate() {
            let ty = ir_type(param.typ);
            let reg = format!("%p{}", i);
            if param.is_reference {
                self.declare_var(&param.name, CgVar { slot: reg, ty, is_ref: true });
            } else {
                let slot = self.alloca(ty);
                self.store(&Value::new(ty, reg), &slot);
                self.declare_var(&param.name, CgVar { slot, ty, is_ref: false });
            }
        }

        self.push_scope();
        let mut toplevel_return = false;
        for stmt in &body.statements {
            self.compile_stmt(stmt);
            if matches!(stmt, Stmt::Return { .. }) {
                toplevel_return = true;
                break;
            }
        }
        if toplevel_return {
            self.scopes.pop();
        } else {
            self.exit_scope();
        }

        if !self.block_has_term() {
            self.set_term(default_return(ret));
        }

        // release the heap parameters the callee owns
        if toplevel_return {
            self.scopes.pop();
        } else {
            self.exit_scope();
        }

        self.fn_base_scope = old_base;
        self.cf = old_cf;
        self.cbb = old_cbb;
    }

    fn compile_assign(&mut self, target: &Assignable, rhs: &Expr) {
        let value = self.compile_expr(rhs);
        match target {
            Assignable::Ident { name, .. } => {
                let var = self.lookup_var(name);
                if var.ty.is_heap() {
                    let old = self.load(var.ty, &var.slot);
                    self.free_value(&old);
                }
                self.store(&value, &var.slot);
            }
            Assignable::Indexing { lhs, index, .. } => {
                let container = self.compile_assignable(lhs);
                let idx = self.compile_expr(index);
                match container.ty {
                    IrType::StrPtr => {
                        self.call(
                            IrType::Void,
                            "_ddp_replace_char_in_string",
                            &[container, value, idx],
                        );
                    }
                    ty if ty.is_list() => {
                        let (ptr, elem) = self.get_element_pointer(&container, &idx);
                        if elem == IrType::StrPtr {
                            let old = self.load(elem, &ptr);
                            self.free_value(&old);
                        }
                        self.store(&value, &ptr);
                    }
                    _ => internal_error(),
                }
            }
        }
    }

    /// Resolve a (possibly nested) assignable to the borrowed container
    /// value; no copies, no releases.
    fn compile_assignable(&mut self, target: &Assignable) -> Value {
        match target {
            Assignable::Ident { name, .. } => {
                let var = self.lookup_var(name);
                self.load(var.ty, &var.slot)
            }
            Assignable::Indexing { lhs, index, .. } => {
                let container = self.compile_assignable(lhs);
                let idx = self.compile_expr(index);
                match container.ty {
                    IrType::StringListPtr => {
                        let (ptr, elem) = self.get_element_pointer(&container, &idx);
                        self.load(elem, &ptr)
                    }
                    _ => internal_error(),
                }
            }
        }
    }

    /// the expression form of an assignable, used for reference arguments
    fn compile_assignable_expr(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Ident { name, .. } => {
                let var = self.lookup_var(name);
                self.load(var.ty, &var.slot)
            }
            Expr::Indexing { lhs, index, .. } => {
                let container = self.compile_assignable_expr(lhs);
                let idx = self.compile_expr(index);
                match container.ty {
                    IrType::StringListPtr => {
                        let (ptr, elem) = self.get_element_pointer(&container, &idx);
                        self.load(elem, &ptr)
                    }
                    IrType::StrPtr => container,
                    _ => internal_error(),
                }
            }
            Expr::Grouping { expr, .. } => self.compile_assignable_expr(expr),
            _ => internal_error(),
        }
    }

    fn compile_if(&mut self, condition: &Expr, then: &Stmt, els: Option<&Stmt>) {
        let cond = self.compile_expr(condition);
        let then_block = self.new_block();
        let else_block = self.new_block();
        let leave_block = self.new_block();

        let then_label = self.label(then_block);
        let else_label = self.label(else_block);
        let leave_label = self.label(leave_block);
        if els.is_some() {
            self.set_term(format!("br i1 {}, label %{}, label %{}", cond.repr, then_label, else_label));
        } else {
            self.set_term(format!("br i1 {}, label %{}, label %{}", cond.repr, then_label, leave_label));
        }

        self.cbb = then_block;
        self.push_scope();
        self.compile_stmt(then);
        if !self.block_has_term() {
            self.set_term(format!("br label %{}", leave_label));
        }
        self.exit_scope();

        if let Some(els) = els {
            self.cbb = else_block;
            self.push_scope();
            self.compile_stmt(els);
            if !self.block_has_term() {
                self.set_term(format!("br label %{}", leave_label));
            }
            self.exit_scope();
        } else {
            self.cbb = else_block;
            self.set_term("unreachable".to_string());
        }

        self.cbb = leave_block;
    }

    fn compile_while(&mut self, kind: LoopKind, condition: &Expr, body: &Stmt) {
        let cond_block = self.new_block();
        let body_block = self.new_block();

        let cond_label = self.label(cond_block);
        let body_label = self.label(body_block);
        if kind == LoopKind::Solange {
            self.set_term(format!("br label %{}", cond_label));
        } else {
            self.set_term(format!("br label %{}", body_label));
        }

        self.cbb = body_block;
        self.push_scope();
        self.compile_stmt(body);
        if !self.block_has_term() {
            self.set_term(format!("br label %{}", cond_label));
        }

        // the condition is not in the body's scope
        self.cbb = cond_block;
        self.exit_scope();
        let cond = self.compile_expr(condition);
        let leave_block = self.new_block();
        let leave_label = self.label(leave_block);
        self.set_term(format!("br i1 {}, label %{}, label %{}", cond.repr, body_label, leave_label));

        self.cbb = leave_block;
    }

    /// `Wiederhole <n> Mal` counts an implicit counter down to zero.
    fn compile_repeat(&mut self, condition: &Expr, body: &Stmt) {
        let counter = self.alloca(IrType::Int);
        let count = self.compile_expr(condition);
        self.store(&count, &counter);

        let cond_block = self.new_block();
        let body_block = self.new_block();
        let cond_label = self.label(cond_block);
        let body_label = self.label(body_block);
        self.set_term(format!("br label %{}", cond_label));

        self.cbb = body_block;
        self.push_scope();
        let current = self.load(IrType::Int, &counter);
        let decremented = self.emit(IrType::Int, format!("sub i64 {}, 1", current.repr));
        self.store(&decremented, &counter);
        self.compile_stmt(body);
        if !self.block_has_term() {
            self.set_term(format!("br label %{}", cond_label));
        }

        let leave_block = self.new_block();
        let leave_label = self.label(leave_block);
        self.cbb = cond_block;
        self.exit_scope();
        let current = self.load(IrType::Int, &counter);
        let not_zero = self.emit(IrType::I1, format!("icmp ne i64 {}, 0", current.repr));
        self.set_term(format!("br i1 {}, label %{}, label %{}", not_zero.repr, body_label, leave_label));

        self.cbb = leave_block;
    }

    /// The counting loop compares upwards or downwards depending on the
    /// sign relation between the initial value and the target.
    fn compile_for(&mut self, counter: &VarDecl, to: &Expr, step: Option<&Expr>, body: &Stmt) {
        self.push_scope();
        let init_value = self.compile_var_decl(counter);

        let cond_block = self.new_block();
        let increment_block = self.new_block();
        let body_block = self.new_block();
        let cond_label = self.label(cond_block);
        let increment_label = self.label(increment_block);
        let body_label = self.label(body_block);

        self.set_term(format!("br label %{}", cond_label));

        self.cbb = body_block;
        self.compile_stmt(body);
        if !self.block_has_term() {
            self.set_term(format!("br label %{}", increment_label));
        }

        let var = self.lookup_var(&counter.name);
        self.cbb = increment_block;
        let current = self.load(var.ty, &var.slot);
        let stepsize = match step {
            Some(step) => self.compile_expr(step),
            None => Value::int(1),
        };
        let advanced =
            self.emit(IrType::Int, format!("add i64 {}, {}", current.repr, stepsize.repr));
        self.store(&advanced, &var.slot);
        self.set_term(format!("br label %{}", cond_label));

        let counting_down_block = self.new_block();
        let counting_up_block = self.new_block();
        let leave_block = self.new_block();
        let counting_down_label = self.label(counting_down_block);
        let counting_up_label = self.label(counting_up_block);
        let leave_label = self.label(leave_block);

        self.cbb = cond_block;
        let to_value = self.compile_expr(to);
        let upwards = self.emit(
            IrType::I1,
            format!("icmp sle i64 {}, {}", init_value.repr, to_value.repr),
        );
        self.set_term(format!(
            "br i1 {}, label %{}, label %{}",
            upwards.repr, counting_up_label, counting_down_label
        ));

        self.cbb = counting_up_block;
        let current = self.load(var.ty, &var.slot);
        let to_value = self.compile_expr(to);
        let keep_going =
            self.emit(IrType::I1, format!("icmp sle i64 {}, {}", current.repr, to_value.repr));
        self.set_term(format!(
            "br i1 {}, label %{}, label %{}",
            keep_going.repr, body_label, leave_label
        ));

        self.cbb = counting_down_block;
        let current = self.load(var.ty, &var.slot);
        let to_value = self.compile_expr(to);
        let keep_going =
            self.emit(IrType::I1, format!("icmp sge i64 {}, {}", current.repr, to_value.repr));
        self.set_term(format!(
            "br i1 {}, label %{}, label %{}",
            keep_going.repr, body_label, leave_label
        ));

        self.cbb = leave_block;
        self.exit_scope();
    }

    fn compile_for_each(&mut self, elem_type: DdpType, name: &str, iter: &Expr, body: &Stmt) {
        self.push_scope();
        let iterable = self.compile_expr(iter);
        self.scopes.last_mut().unwrap_or_else(|| internal_error()).temps.push(iterable.clone());

        let len = if iterable.ty == IrType::StrPtr {
            self.call(IrType::Int, "_ddp_string_length", std::slice::from_ref(&iterable))
        } else {
            self.list_len(&iterable)
        };

        let elem = ir_type(elem_type);
        let index_slot = self.alloca(IrType::Int);
        let var_slot = self.alloca(elem);
        // heap-typed loop variables hold an owned value from the start so
        // every exit path releases exactly one value per slot
        if elem.is_heap() {
            let empty = self.empty_heap_value(elem);
            self.store(&empty, &var_slot);
        }
        self.declare_var(name, CgVar { slot: var_slot.clone(), ty: elem, is_ref: false });

        let loop_start = self.new_block();
        let cond_block = self.new_block();
        let body_block = self.new_block();
        let increment_block = self.new_block();
        let leave_block = self.new_block();
        let loop_start_label = self.label(loop_start);
        let cond_label = self.label(cond_block);
        let body_label = self.label(body_block);
        let increment_label = self.label(increment_block);
        let leave_label = self.label(leave_block);

        let is_empty = self.emit(IrType::I1, format!("icmp eq i64 {}, 0", len.repr));
        self.set_term(format!(
            "br i1 {}, label %{}, label %{}",
            is_empty.repr, leave_label, loop_start_label
        ));

        self.cbb = loop_start;
        self.store(&Value::int(1), &index_slot);
        self.set_term(format!("br label %{}", cond_label));

        self.cbb = cond_block;
        let index = self.load(IrType::Int, &index_slot);
        let keep_going =
            self.emit(IrType::I1, format!("icmp sle i64 {}, {}", index.repr, len.repr));
        self.set_term(format!(
            "br i1 {}, label %{}, label %{}",
            keep_going.repr, body_label, leave_label
        ));

        self.cbb = body_block;
        let index = self.load(IrType::Int, &index_slot);
        let loop_value = if iterable.ty == IrType::StrPtr {
            self.call(IrType::Char, "_ddp_string_index", &[iterable.clone(), index.clone()])
        } else {
            let arr = self.list_arr(&iterable);
            let zero_based = self.emit(IrType::Int, format!("sub i64 {}, 1", index.repr));
            let ptr = self.elem_gep(iterable.ty.element(), &arr, &zero_based.repr);
            let loaded = self.load(iterable.ty.element(), &ptr);
            if iterable.ty == IrType::StringListPtr {
                self.deep_copy(&loaded)
            } else {
                loaded
            }
        };
        if elem.is_heap() {
            // storing into the loop variable releases the previous value
            let old = self.load(elem, &var_slot);
            self.free_value(&old);
        }
        self.store(&loop_value, &var_slot);
        self.compile_stmt(body);
        if !self.block_has_term() {
            self.set_term(format!("br label %{}", increment_label));
        }

        self.cbb = increment_block;
        let index = self.load(IrType::Int, &index_slot);
        let advanced = self.emit(IrType::Int, format!("add i64 {}, 1", index.repr));
        self.store(&advanced, &index_slot);
        self.set_term(format!("br label %{}", cond_label));

        self.cbb = leave_block;
        self.exit_scope();
        self.free_value(&iterable);
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    fn compile_expr(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Bad { .. } => internal_error(),
            Expr::IntLit { value, .. } => Value::int(*value),
            Expr::FloatLit { value, .. } => Value::float(*value),
            Expr::BoolLit { value, .. } => Value::bool(*value),
            Expr::CharLit { value, .. } => Value::char(*value),
            Expr::StringLit { value, .. } => self.string_literal(value),
            Expr::ListLit { elem, values, count, value, .. } => {
                self.compile_list_lit(*elem, values.as_deref(), count.as_deref(), value.as_deref())
            }
            Expr::Ident { name, .. } => {
                let var = self.lookup_var(name);
                let loaded = self.load(var.ty, &var.slot);
                if var.ty.is_heap() {
                    // reading a heap variable yields an independent copy
                    self.deep_copy(&loaded)
                } else {
                    loaded
                }
            }
            Expr::Indexing { lhs, index, .. } => self.compile_indexing(lhs, index),
            Expr::Unary { op, rhs, .. } => self.compile_unary(*op, rhs),
            Expr::Binary { op, lhs, rhs, .. } => self.compile_binary(*op, lhs, rhs),
            Expr::Slice { lhs, start, end, .. } => self.compile_slice(lhs, start, end),
            Expr::Cast { target, lhs, .. } => self.compile_cast(*target, lhs),
            Expr::Default { typ, .. } => self.compile_default(*typ),
            Expr::Grouping { expr, .. } => self.compile_expr(expr),
            Expr::Call { name, args, .. } => self.compile_call(name, args),
        }
    }

    fn string_literal(&mut self, value: &str) -> Value {
        let (global, len) = self.module.string_constant(value);
        let cast = self.emit(
            IrType::I8Ptr,
            format!("bitcast [{} x i8]* {} to i8*", len, global),
        );
        self.call(IrType::StrPtr, "_ddp_string_from_constant", &[cast])
    }

    fn empty_heap_value(&mut self, ty: IrType) -> Value {
        if ty == IrType::StrPtr {
            self.string_literal("")
        } else {
            let name = format!("_ddp_{}_from_constants", ty.runtime_suffix());
            self.call(ty, &name, &[Value::int(0)])
        }
    }

    fn compile_list_lit(
        &mut self,
        elem: Option<Primitive>,
        values: Option<&[Expr]>,
        count: Option<&Expr>,
        value: Option<&Expr>,
    ) -> Value {
        if let Some(values) = values {
            // evaluate elements first, the first one decides the list type
            let compiled: Vec<Value> = values.iter().map(|v| self.compile_expr(v)).collect();
            let elem_ty = compiled.first().unwrap_or_else(|| internal_error()).ty;
            let list_ty = elem_ty.list_of();
            let name = format!("_ddp_{}_from_constants", list_ty.runtime_suffix());
            let list = self.call(list_ty, &name, &[Value::int(compiled.len() as i64)]);
            let arr = self.list_arr(&list);
            for (i, value) in compiled.iter().enumerate() {
                let ptr = self.elem_gep(elem_ty, &arr, &i.to_string());
                self.store(value, &ptr);
            }
            return list;
        }

        if let (Some(count), Some(value)) = (count, value) {
            let count = self.compile_expr(count);
            let value = self.compile_expr(value);
            let list_ty = value.ty.list_of();
            let name = format!("_ddp_{}_from_constants", list_ty.runtime_suffix());
            let list = self.call(list_ty, &name, std::slice::from_ref(&count));

            // count-bounded fill loop, deep-copying heap values per slot
            let counter = self.alloca(IrType::Int);
            self.store(&Value::int(0), &counter);

            let cond_block = self.new_block();
            let body_block = self.new_block();
            let leave_block = self.new_block();
            let cond_label = self.label(cond_block);
            let body_label = self.label(body_block);
            let leave_label = self.label(leave_block);
            self.set_term(format!("br label %{}", cond_label));

            self.cbb = cond_block;
            let current = self.load(IrType::Int, &counter);
            let keep_going =
                self.emit(IrType::I1, format!("icmp slt i64 {}, {}", current.repr, count.repr));
            self.set_term(format!(
                "br i1 {}, label %{}, label %{}",
                keep_going.repr, body_label, leave_label
            ));

            self.cbb = body_block;
            let index = self.load(IrType::Int, &counter);
            let stored = if value.ty.is_heap() { self.deep_copy(&value) } else { value.clone() };
            let arr = self.list_arr(&list);
            let ptr = self.elem_gep(value.ty, &arr, &index.repr);
            self.store(&stored, &ptr);
            let advanced = self.emit(IrType::Int, format!("add i64 {}, 1", index.repr));
            self.store(&advanced, &counter);
            self.set_term(format!("br label %{}", cond_label));

            self.cbb = leave_block;
            if value.ty.is_heap() {
                self.free_value(&value);
            }
            return list;
        }

        // empty list with a written element type
        let elem = elem.unwrap_or_else(|| internal_error());
        let list_ty = ir_type(DdpType::list(elem));
        let name = format!("_ddp_{}_from_constants", list_ty.runtime_suffix());
        self.call(list_ty, &name, &[Value::int(0)])
    }

    fn compile_indexing(&mut self, lhs: &Expr, index: &Expr) -> Value {
        let lhs_value = self.compile_expr(lhs);
        let index_value = self.compile_expr(index);
        let result = match lhs_value.ty {
            IrType::StrPtr => {
                self.call(IrType::Char, "_ddp_string_index", &[lhs_value.clone(), index_value])
            }
            ty if ty.is_list() => {
                let (ptr, elem) = self.get_element_pointer(&lhs_value, &index_value);
                let loaded = self.load(elem, &ptr);
                if lhs_value.ty == IrType::StringListPtr {
                    self.deep_copy(&loaded)
                } else {
                    loaded
                }
            }
            _ => internal_error(),
        };
        if lhs_value.ty.is_heap() {
            self.free_value(&lhs_value);
        }
        result
    }

    fn compile_unary(&mut self, op: UnaryOp, rhs: &Expr) -> Value {
        let rhs_value = self.compile_expr(rhs);
        let result = match op {
            UnaryOp::Betrag => match rhs_value.ty {
                IrType::Float => self.call(IrType::Float, "fabs", std::slice::from_ref(&rhs_value)),
                IrType::Int => self.call(IrType::Int, "llabs", std::slice::from_ref(&rhs_value)),
                _ => internal_error(),
            },
            UnaryOp::Negate => match rhs_value.ty {
                IrType::Float => self.emit(IrType::Float, format!("fneg double {}", rhs_value.repr)),
                IrType::Int => self.emit(IrType::Int, format!("sub i64 0, {}", rhs_value.repr)),
                _ => internal_error(),
            },
            UnaryOp::Nicht => self.emit(IrType::I1, format!("xor i1 {}, true", rhs_value.repr)),
            UnaryOp::Negiere => match rhs_value.ty {
                IrType::I1 => self.emit(IrType::I1, format!("xor i1 {}, true", rhs_value.repr)),
                IrType::Int => self.emit(IrType::Int, format!("xor i64 {}, -1", rhs_value.repr)),
                _ => internal_error(),
            },
            UnaryOp::LogischNicht => {
                self.emit(IrType::Int, format!("xor i64 {}, -1", rhs_value.repr))
            }
            UnaryOp::Laenge => match rhs_value.ty {
                IrType::StrPtr => {
                    self.call(IrType::Int, "_ddp_string_length", std::slice::from_ref(&rhs_value))
                }
                ty if ty.is_list() => self.list_len(&rhs_value),
                _ => internal_error(),
            },
            UnaryOp::Groesse => match rhs_value.ty {
                IrType::Int | IrType::Float => Value::int(8),
                IrType::I1 => Value::int(1),
                IrType::Char => Value::int(4),
                IrType::StrPtr => {
                    let ptr = self.fresh();
                    self.inst(format!(
                        "{} = getelementptr %ddpstring, %ddpstring* {}, i32 0, i32 1",
                        ptr, rhs_value.repr
                    ));
                    let cap = self.load(IrType::Int, &ptr);
                    self.emit(IrType::Int, format!("add i64 {}, 16", cap.repr))
                }
                ty if ty.is_list() => Value::int(24),
                _ => internal_error(),
            },
        };
        if rhs_value.ty.is_heap() {
            self.free_value(&rhs_value);
        }
        result
    }

    fn compile_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Value {
        // und/oder short-circuit through a three-block diamond with a phi
        match op {
            BinaryOp::Und => {
                let lhs_value = self.compile_expr(lhs);
                let start_block = self.cbb;
                let true_block = self.new_block();
                let leave_block = self.new_block();
                let true_label = self.label(true_block);
                let leave_label = self.label(leave_block);
                self.set_term(format!(
                    "br i1 {}, label %{}, label %{}",
                    lhs_value.repr, true_label, leave_label
                ));

                self.cbb = true_block;
                let rhs_value = self.compile_expr(rhs);
                self.set_term(format!("br label %{}", leave_label));
                let rhs_end = self.cbb;

                self.cbb = leave_block;
                let start_label = self.label(start_block);
                let rhs_end_label = self.label(rhs_end);
                return self.emit(
                    IrType::I1,
                    format!(
                        "phi i1 [ {}, %{} ], [ {}, %{} ]",
                        rhs_value.repr, rhs_end_label, lhs_value.repr, start_label
                    ),
                );
            }
            BinaryOp::Oder => {
                let lhs_value = self.compile_expr(lhs);
                let start_block = self.cbb;
                let false_block = self.new_block();
                let leave_block = self.new_block();
                let false_label = self.label(false_block);
                let leave_label = self.label(leave_block);
                self.set_term(format!(
                    "br i1 {}, label %{}, label %{}",
                    lhs_value.repr, leave_label, false_label
                ));

                self.cbb = false_block;
                let rhs_value = self.compile_expr(rhs);
                self.set_term(format!("br label %{}", leave_label));
                let rhs_end = self.cbb;

                self.cbb = leave_block;
                let start_label = self.label(start_block);
                let rhs_end_label = self.label(rhs_end);
                return self.emit(
                    IrType::I1,
                    format!(
                        "phi i1 [ {}, %{} ], [ {}, %{} ]",
                        lhs_value.repr, start_label, rhs_value.repr, rhs_end_label
                    ),
                );
            }
            _ => {}
        }

        let lhs_value = self.compile_expr(lhs);
        let rhs_value = self.compile_expr(rhs);
        let result = match op {
            BinaryOp::Und | BinaryOp::Oder => unreachable!(),
            BinaryOp::Verkettet => self.compile_verkettet(&lhs_value, &rhs_value),
            BinaryOp::Plus => self.arith("add", "fadd", &lhs_value, &rhs_value),
            BinaryOp::Minus => self.arith("sub", "fsub", &lhs_value, &rhs_value),
            BinaryOp::Mal => self.arith("mul", "fmul", &lhs_value, &rhs_value),
            BinaryOp::Durch => {
                let lhs_value = self.to_float(&lhs_value);
                let rhs_value = self.to_float(&rhs_value);
                self.emit(
                    IrType::Float,
                    format!("fdiv double {}, {}", lhs_value.repr, rhs_value.repr),
                )
            }
            BinaryOp::Hoch => {
                let lhs_value = self.to_float(&lhs_value);
                let rhs_value = self.to_float(&rhs_value);
                self.call(IrType::Float, "pow", &[lhs_value, rhs_value])
            }
            BinaryOp::Logarithmus => {
                let lhs_value = self.to_float(&lhs_value);
                let rhs_value = self.to_float(&rhs_value);
                let log_num = self.call(IrType::Float, "log10", &[lhs_value]);
                let log_base = self.call(IrType::Float, "log10", &[rhs_value]);
                self.emit(
                    IrType::Float,
                    format!("fdiv double {}, {}", log_num.repr, log_base.repr),
                )
            }
            BinaryOp::Modulo => self.emit(
                IrType::Int,
                format!("srem i64 {}, {}", lhs_value.repr, rhs_value.repr),
            ),
            BinaryOp::LogischUnd => self.emit(
                IrType::Int,
                format!("and i64 {}, {}", lhs_value.repr, rhs_value.repr),
            ),
            BinaryOp::LogischOder => self.emit(
                IrType::Int,
                format!("or i64 {}, {}", lhs_value.repr, rhs_value.repr),
            ),
            BinaryOp::Kontra => self.emit(
                IrType::Int,
                format!("xor i64 {}, {}", lhs_value.repr, rhs_value.repr),
            ),
            BinaryOp::Links => self.emit(
                IrType::Int,
                format!("shl i64 {}, {}", lhs_value.repr, rhs_value.repr),
            ),
            BinaryOp::Rechts => self.emit(
                IrType::Int,
                format!("lshr i64 {}, {}", lhs_value.repr, rhs_value.repr),
            ),
            BinaryOp::Gleich => self.compile_equal(&lhs_value, &rhs_value),
            BinaryOp::Ungleich => {
                let equal = self.compile_equal(&lhs_value, &rhs_value);
                self.emit(IrType::I1, format!("xor i1 {}, true", equal.repr))
            }
            BinaryOp::Kleiner => self.compare("slt", "olt", &lhs_value, &rhs_value),
            BinaryOp::KleinerOder => self.compare("sle", "ole", &lhs_value, &rhs_value),
            BinaryOp::Groesser => self.compare("sgt", "ogt", &lhs_value, &rhs_value),
            BinaryOp::GroesserOder => self.compare("sge", "oge", &lhs_value, &rhs_value),
        };
        if lhs_value.ty.is_heap() {
            self.free_value(&lhs_value);
        }
        if rhs_value.ty.is_heap() {
            self.free_value(&rhs_value);
        }
        result
    }

    /// integer op with float promotion when either side is a float
    fn arith(&mut self, int_op: &str, float_op: &str, lhs: &Value, rhs: &Value) -> Value {
        if lhs.ty == IrType::Int && rhs.ty == IrType::Int {
            self.emit(IrType::Int, format!("{} i64 {}, {}", int_op, lhs.repr, rhs.repr))
        } else {
            let lhs = self.to_float(lhs);
            let rhs = self.to_float(rhs);
            self.emit(IrType::Float, format!("{} double {}, {}", float_op, lhs.repr, rhs.repr))
        }
    }

    fn compare(&mut self, int_pred: &str, float_pred: &str, lhs: &Value, rhs: &Value) -> Value {
        if lhs.ty == IrType::Int && rhs.ty == IrType::Int {
            self.emit(IrType::I1, format!("icmp {} i64 {}, {}", int_pred, lhs.repr, rhs.repr))
        } else {
            let lhs = self.to_float(lhs);
            let rhs = self.to_float(rhs);
            self.emit(IrType::I1, format!("fcmp {} double {}, {}", float_pred, lhs.repr, rhs.repr))
        }
    }

    fn to_float(&mut self, value: &Value) -> Value {
        match value.ty {
            IrType::Float => value.clone(),
            IrType::Int => {
                self.emit(IrType::Float, format!("sitofp i64 {} to double", value.repr))
            }
            _ => internal_error(),
        }
    }

    fn compile_equal(&mut self, lhs: &Value, rhs: &Value) -> Value {
        match lhs.ty {
            IrType::Int | IrType::I1 | IrType::Char => self.emit(
                IrType::I1,
                format!("icmp eq {} {}, {}", lhs.ty.ll(), lhs.repr, rhs.repr),
            ),
            IrType::Float => self.emit(
                IrType::I1,
                format!("fcmp oeq double {}, {}", lhs.repr, rhs.repr),
            ),
            ty if ty.is_heap() => {
                let name = format!("_ddp_{}_equal", ty.runtime_suffix());
                self.call(IrType::I1, &name, &[lhs.clone(), rhs.clone()])
            }
            _ => internal_error(),
        }
    }

    /// dispatch on the operand type pair out of the closed concatenation
    /// table of the runtime
    fn compile_verkettet(&mut self, lhs: &Value, rhs: &Value) -> Value {
        use IrType::*;
        let (name, ret): (String, IrType) = match (lhs.ty, rhs.ty) {
            (StrPtr, StrPtr) => ("_ddp_string_string_verkettet".to_string(), StrPtr),
            (StrPtr, Char) => ("_ddp_string_char_verkettet".to_string(), StrPtr),
            (Char, StrPtr) => ("_ddp_char_string_verkettet".to_string(), StrPtr),
            (StrPtr, StringListPtr) => {
                ("_ddp_ddpstring_ddpstringlist_verkettet".to_string(), StringListPtr)
            }
            (StringListPtr, StrPtr) => {
                ("_ddp_ddpstringlist_ddpstring_verkettet".to_string(), StringListPtr)
            }
            (a, b) if a.is_list() && a == b => {
                let l = a.runtime_suffix();
                (format!("_ddp_{}_{}_verkettet", l, l), a)
            }
            (a, b) if a.is_list() && a.element() == b => {
                (format!("_ddp_{}_{}_verkettet", a.runtime_suffix(), b.verkettet_name()), a)
            }
            (a, b) if b.is_list() && b.element() == a => {
                (format!("_ddp_{}_{}_verkettet", a.verkettet_name(), b.runtime_suffix()), b)
            }
            (a, b) if a == b && matches!(a, Int | Float | I1 | Char) => {
                let list = a.list_of();
                let e = a.verkettet_name();
                (format!("_ddp_{}_{}_verkettet", e, e), list)
            }
            _ => internal_error(),
        };
        self.call(ret, &name, &[lhs.clone(), rhs.clone()])
    }

    fn compile_slice(&mut self, lhs: &Expr, start: &Expr, end: &Expr) -> Value {
        let lhs_value = self.compile_expr(lhs);
        let start_value = self.compile_expr(start);
        let end_value = self.compile_expr(end);
        let name = format!("_ddp_{}_slice", lhs_value.ty.runtime_suffix());
        let result = self.call(
            lhs_value.ty,
            &name,
            &[lhs_value.clone(), start_value, end_value],
        );
        if lhs_value.ty.is_heap() {
            self.free_value(&lhs_value);
        }
        result
    }

    fn compile_cast(&mut self, target: DdpType, lhs: &Expr) -> Value {
        let lhs_value = self.compile_expr(lhs);

        if target.is_list {
            // a value of the element type becomes a one-element list that
            // takes ownership of the value
            let list_ty = ir_type(target);
            let name = format!("_ddp_{}_from_constants", list_ty.runtime_suffix());
            let list = self.call(list_ty, &name, &[Value::int(1)]);
            let arr = self.list_arr(&list);
            let ptr = self.elem_gep(list_ty.element(), &arr, "0");
            self.store(&lhs_value, &ptr);
            return list;
        }

        let result = match target.primitive {
            Primitive::Zahl => match lhs_value.ty {
                IrType::Int => lhs_value.clone(),
                IrType::Float => {
                    self.emit(IrType::Int, format!("fptosi double {} to i64", lhs_value.repr))
                }
                IrType::I1 => {
                    self.emit(IrType::Int, format!("zext i1 {} to i64", lhs_value.repr))
                }
                IrType::Char => {
                    self.emit(IrType::Int, format!("sext i32 {} to i64", lhs_value.repr))
                }
                IrType::StrPtr => {
                    self.call(IrType::Int, "_ddp_string_to_int", std::slice::from_ref(&lhs_value))
                }
                _ => internal_error(),
            },
            Primitive::Kommazahl => match lhs_value.ty {
                IrType::Int => {
                    self.emit(IrType::Float, format!("sitofp i64 {} to double", lhs_value.repr))
                }
                IrType::Float => lhs_value.clone(),
                IrType::StrPtr => self.call(
                    IrType::Float,
                    "_ddp_string_to_float",
                    std::slice::from_ref(&lhs_value),
                ),
                _ => internal_error(),
            },
            Primitive::Boolean => match lhs_value.ty {
                IrType::Int => {
                    self.emit(IrType::I1, format!("icmp ne i64 {}, 0", lhs_value.repr))
                }
                IrType::I1 => lhs_value.clone(),
                _ => internal_error(),
            },
            Primitive::Buchstabe => match lhs_value.ty {
                IrType::Int => {
                    self.emit(IrType::Char, format!("trunc i64 {} to i32", lhs_value.repr))
                }
                IrType::Char => lhs_value.clone(),
                _ => internal_error(),
            },
            Primitive::Text => match lhs_value.ty {
                IrType::Int => {
                    self.call(IrType::StrPtr, "_ddp_int_to_string", std::slice::from_ref(&lhs_value))
                }
                IrType::Float => self.call(
                    IrType::StrPtr,
                    "_ddp_float_to_string",
                    std::slice::from_ref(&lhs_value),
                ),
                IrType::I1 => {
                    self.call(IrType::StrPtr, "_ddp_bool_to_string", std::slice::from_ref(&lhs_value))
                }
                IrType::Char => {
                    self.call(IrType::StrPtr, "_ddp_char_to_string", std::slice::from_ref(&lhs_value))
                }
                IrType::StrPtr => self.deep_copy(&lhs_value),
                ty if ty.is_list() => {
                    let name = format!("_ddp_{}_to_string", ty.runtime_suffix());
                    self.call(IrType::StrPtr, &name, std::slice::from_ref(&lhs_value))
                }
                _ => internal_error(),
            },
        };
        if lhs_value.ty.is_heap() {
            self.free_value(&lhs_value);
        }
        result
    }

    fn compile_default(&mut self, typ: DdpType) -> Value {
        if typ.is_heap() {
            return self.empty_heap_value(ir_type(typ));
        }
        match typ.primitive {
            Primitive::Zahl => Value::int(0),
            Primitive::Kommazahl => Value::float(0.0),
            Primitive::Boolean => Value::bool(false),
            Primitive::Buchstabe => Value::new(IrType::Char, "0"),
            Primitive::Text => unreachable!(),
        }
    }

    fn compile_call(&mut self, name: &str, args: &HashMap<String, Expr>) -> Value {
        let decl = Rc::clone(self.functions.get(name).unwrap_or_else(|| internal_error()));

        let mut operands = Vec::with_capacity(decl.params.len());
        let mut by_value: Vec<Option<Value>> = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let arg = args.get(&param.name).unwrap_or_else(|| internal_error());
            if param.is_reference {
                // references receive a pointer to the caller's storage
                let operand = match unwrap_grouping(arg) {
                    Expr::Ident { name, .. } => {
                        let var = self.lookup_var(name);
                        format!("{}* {}", var.ty.ll(), var.slot)
                    }
                    Expr::Indexing { lhs, index, .. } => {
                        let container = self.compile_assignable_expr(lhs);
                        let idx = self.compile_expr(index);
                        let (ptr, elem) = self.get_element_pointer(&container, &idx);
                        format!("{}* {}", elem.ll(), ptr)
                    }
                    _ => internal_error(),
                };
                operands.push(operand);
                by_value.push(None);
            } else {
                let value = self.compile_expr(arg);
                operands.push(value.typed());
                by_value.push(Some(value));
            }
        }

        let ret = decl.return_type.map_or(IrType::Void, ir_type);
        let result = self.call_raw(ret, &decl.name, operands);

        // extern functions do not take ownership of by-value heap
        // arguments, so release them on their behalf
        if decl.is_extern() {
            for value in by_value.into_iter().flatten() {
                if value.ty.is_heap() {
                    self.free_value(&value);
                }
            }
        }
        result
    }
}

fn unwrap_grouping(expr: &Expr) -> &Expr {
    match expr {
        Expr::Grouping { expr, .. } => unwrap_grouping(expr),
        other => other,
    }
}

fn ir_type(typ: DdpType) -> IrType {
    if typ.is_list {
        match typ.primitive {
            Primitive::Zahl => IrType::IntListPtr,
            Primitive::Kommazahl => IrType::FloatListPtr,
            Primitive::Boolean => IrType::BoolListPtr,
            Primitive::Buchstabe => IrType::CharListPtr,
            Primitive::Text => IrType::StringListPtr,
        }
    } else {
        match typ.primitive {
            Primitive::Zahl => IrType::Int,
            Primitive::Kommazahl => IrType::Float,
            Primitive::Boolean => IrType::I1,
            Primitive::Buchstabe => IrType::Char,
            Primitive::Text => IrType::StrPtr,
        }
    }
}

fn default_return(ret: IrType) -> String {
    match ret {
        IrType::Void => "ret void".to_string(),
        IrType::Int => "ret i64 0".to_string(),
        IrType::Float => "ret double 0x0000000000000000".to_string(),
        IrType::I1 => "ret i1 false".to_string(),
        IrType::Char => "ret i32 0".to_string(),
        ty => format!("ret {} null", ty.ll()),
    }
}

/// Violated emitter invariants are compiler bugs; the front end reported
/// all user-facing errors long before lowering starts.
fn internal_error() -> ! {
    panic!("interner Compiler-Fehler: invalider Syntax-Baum im Code-Generator")
}
