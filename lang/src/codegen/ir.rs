//! A small builder for textual LLVM IR modules.
//!
//! The emitter only ever needs a fixed set of first-class types (the DDP
//! scalars plus pointers to the heap structs), so instructions are
//! assembled as strings against `IrType` instead of a full type system.
//! Every basic block ends in exactly one terminator.

use std::fmt::Write;

/// The IR-level types the emitter works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrType {
    Void,
    /// ddpbool
    I1,
    /// pointer to constant string data
    I8Ptr,
    /// ddpchar, a 32-bit unicode scalar
    Char,
    /// ddpint
    Int,
    /// ddpfloat
    Float,
    StrPtr,
    IntListPtr,
    FloatListPtr,
    BoolListPtr,
    CharListPtr,
    StringListPtr,
}

impl IrType {
    /// The LLVM spelling of the type.
    pub fn ll(self) -> &'static str {
        match self {
            IrType::Void => "void",
            IrType::I1 => "i1",
            IrType::I8Ptr => "i8*",
            IrType::Char => "i32",
            IrType::Int => "i64",
            IrType::Float => "double",
            IrType::StrPtr => "%ddpstring*",
            IrType::IntListPtr => "%ddpintlist*",
            IrType::FloatListPtr => "%ddpfloatlist*",
            IrType::BoolListPtr => "%ddpboollist*",
            IrType::CharListPtr => "%ddpcharlist*",
            IrType::StringListPtr => "%ddpstringlist*",
        }
    }

    /// The struct a heap pointer type points to.
    pub fn struct_name(self) -> &'static str {
        match self {
            IrType::StrPtr => "%ddpstring",
            IrType::IntListPtr => "%ddpintlist",
            IrType::FloatListPtr => "%ddpfloatlist",
            IrType::BoolListPtr => "%ddpboollist",
            IrType::CharListPtr => "%ddpcharlist",
            IrType::StringListPtr => "%ddpstringlist",
            _ => unreachable!("{} ist kein Heap-Typ", self.ll()),
        }
    }

    /// The `<T>` part of the `_ddp_<T>_*` runtime function families.
    pub fn runtime_suffix(self) -> &'static str {
        match self {
            IrType::StrPtr => "string",
            IrType::IntListPtr => "ddpintlist",
            IrType::FloatListPtr => "ddpfloatlist",
            IrType::BoolListPtr => "ddpboollist",
            IrType::CharListPtr => "ddpcharlist",
            IrType::StringListPtr => "ddpstringlist",
            _ => unreachable!("{} ist kein Heap-Typ", self.ll()),
        }
    }

    /// The `<T>` used in the element position of concatenation helpers.
    pub fn verkettet_name(self) -> &'static str {
        match self {
            IrType::Int => "ddpint",
            IrType::Float => "ddpfloat",
            IrType::I1 => "ddpbool",
            IrType::Char => "ddpchar",
            IrType::StrPtr => "ddpstring",
            other => other.runtime_suffix(),
        }
    }

    pub fn is_heap(self) -> bool {
        matches!(
            self,
            IrType::StrPtr
                | IrType::IntListPtr
                | IrType::FloatListPtr
                | IrType::BoolListPtr
                | IrType::CharListPtr
                | IrType::StringListPtr
        )
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            IrType::IntListPtr
                | IrType::FloatListPtr
                | IrType::BoolListPtr
                | IrType::CharListPtr
                | IrType::StringListPtr
        )
    }

    /// Element type of a list pointer type.
    pub fn element(self) -> IrType {
        match self {
            IrType::IntListPtr => IrType::Int,
            IrType::FloatListPtr => IrType::Float,
            IrType::BoolListPtr => IrType::I1,
            IrType::CharListPtr => IrType::Char,
            IrType::StringListPtr => IrType::StrPtr,
            _ => unreachable!("{} ist keine Liste", self.ll()),
        }
    }

    /// The list pointer type with this element type.
    pub fn list_of(self) -> IrType {
        match self {
            IrType::Int => IrType::IntListPtr,
            IrType::Float => IrType::FloatListPtr,
            IrType::I1 => IrType::BoolListPtr,
            IrType::Char => IrType::CharListPtr,
            IrType::StrPtr => IrType::StringListPtr,
            _ => unreachable!("{} hat keinen Listen-Typ", self.ll()),
        }
    }
}

/// An SSA value: a type plus its textual representation (register,
/// constant or global).
#[derive(Debug, Clone)]
pub struct Value {
    pub ty: IrType,
    pub repr: String,
}

impl Value {
    pub fn new(ty: IrType, repr: impl Into<String>) -> Self {
        Self { ty, repr: repr.into() }
    }

    pub fn int(value: i64) -> Self {
        Self::new(IrType::Int, value.to_string())
    }

    /// Floats print as the bit pattern so the textual round trip is exact.
    pub fn float(value: f64) -> Self {
        Self::new(IrType::Float, format!("0x{:016X}", value.to_bits()))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(IrType::I1, if value { "true" } else { "false" })
    }

    pub fn char(value: char) -> Self {
        Self::new(IrType::Char, (value as u32).to_string())
    }

    pub fn void() -> Self {
        Self::new(IrType::Void, "")
    }

    /// `type repr` as used in operand position.
    pub fn typed(&self) -> String {
        format!("{} {}", self.ty.ll(), self.repr)
    }
}

#[derive(Debug)]
pub struct Block {
    pub label: String,
    pub insts: Vec<String>,
    pub term: Option<String>,
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    ret: IrType,
    /// (register, llvm type text)
    params: Vec<(String, String)>,
    pub blocks: Vec<Block>,
    next_reg: usize,
    next_block: usize,
}

impl Function {
    pub fn fresh_reg(&mut self) -> String {
        let reg = format!("%t{}", self.next_reg);
        self.next_reg += 1;
        reg
    }

    pub fn new_block(&mut self) -> usize {
        let label = format!("bb{}", self.next_block);
        self.next_block += 1;
        self.blocks.push(Block { label, insts: Vec::new(), term: None });
        self.blocks.len() - 1
    }
}

/// A textual LLVM IR module under construction.
#[derive(Debug)]
pub struct Module {
    source_filename: String,
    globals: Vec<String>,
    declares: Vec<String>,
    funcs: Vec<Function>,
    next_global: usize,
}

impl Module {
    pub fn new(source_filename: &str) -> Self {
        Self {
            source_filename: source_filename.to_string(),
            globals: Vec::new(),
            declares: Vec::new(),
            funcs: Vec::new(),
            next_global: 0,
        }
    }

    /// Declare an external function with C calling convention.
    pub fn declare(&mut self, name: &str, ret: IrType, params: &[IrType]) {
        let params: Vec<&str> = params.iter().map(|p| p.ll()).collect();
        self.declares.push(format!("declare {} {}({})", ret.ll(), mangle(name), params.join(", ")));
    }

    /// Declare an external function whose parameter types are given as
    /// llvm type text (needed for reference parameters).
    pub fn declare_raw(&mut self, name: &str, ret: IrType, params: &[String]) {
        self.declares.push(format!("declare {} {}({})", ret.ll(), mangle(name), params.join(", ")));
    }

    /// Add a private constant holding a null-terminated C string.
    /// Returns the global's name and its byte length.
    pub fn string_constant(&mut self, value: &str) -> (String, usize) {
        let name = format!("@str.{}", self.next_global);
        self.next_global += 1;
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        let len = bytes.len();
        self.globals.push(format!(
            "{} = private unnamed_addr constant [{} x i8] c\"{}\"",
            name,
            len,
            escape_bytes(&bytes)
        ));
        (name, len)
    }

    /// Add a mutable module-level global with a zero/null default.
    pub fn global_variable(&mut self, ty: IrType) -> String {
        let name = format!("@g.{}", self.next_global);
        self.next_global += 1;
        let default = match ty {
            IrType::Int => "0",
            IrType::Float => "0x0000000000000000",
            IrType::I1 => "false",
            IrType::Char => "0",
            ty if ty.is_heap() => "null",
            other => unreachable!("invalider Typ für eine globale Variable: {}", other.ll()),
        };
        self.globals.push(format!("{} = global {} {}", name, ty.ll(), default));
        name
    }

    /// Add a function definition; the entry block is created.
    pub fn define(&mut self, name: &str, ret: IrType, params: Vec<(String, String)>) -> usize {
        let mut func = Function {
            name: mangle(name),
            ret,
            params,
            blocks: Vec::new(),
            next_reg: 0,
            next_block: 0,
        };
        let entry = func.new_block();
        func.blocks[entry].label = "entry".to_string();
        self.funcs.push(func);
        self.funcs.len() - 1
    }

    pub fn func(&mut self, id: usize) -> &mut Function {
        &mut self.funcs[id]
    }

    /// Render the whole module as textual LLVM IR. Type definitions come
    /// first so they exist before first use.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "; ModuleID = '{}'", self.source_filename);
        let _ = writeln!(out, "source_filename = \"{}\"", self.source_filename);
        out.push('\n');
        out.push_str(TYPE_DEFS);
        out.push('\n');
        for global in &self.globals {
            out.push_str(global);
            out.push('\n');
        }
        if !self.globals.is_empty() {
            out.push('\n');
        }
        for decl in &self.declares {
            out.push_str(decl);
            out.push('\n');
        }
        for func in &self.funcs {
            out.push('\n');
            let params: Vec<String> =
                func.params.iter().map(|(reg, ty)| format!("{} {}", ty, reg)).collect();
            let _ = writeln!(out, "define {} {}({}) {{", func.ret.ll(), func.name, params.join(", "));
            for block in &func.blocks {
                let _ = writeln!(out, "{}:", block.label);
                for inst in &block.insts {
                    let _ = writeln!(out, "\t{}", inst);
                }
                // the emitter guarantees a terminator on every block
                match &block.term {
                    Some(term) => {
                        let _ = writeln!(out, "\t{}", term);
                    }
                    None => {
                        let _ = writeln!(out, "\tunreachable");
                    }
                }
            }
            out.push_str("}\n");
        }
        out
    }
}

const TYPE_DEFS: &str = "\
%ddpstring = type { i8*, i64 }
%ddpintlist = type { i64*, i64, i64 }
%ddpfloatlist = type { double*, i64, i64 }
%ddpboollist = type { i1*, i64, i64 }
%ddpcharlist = type { i32*, i64, i64 }
%ddpstringlist = type { %ddpstring**, i64, i64 }
";

/// Global name mangling: plain names pass through, anything else (e.g.
/// umlauts in user function names) is quoted with hex escapes.
pub fn mangle(name: &str) -> String {
    let plain = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'));
    if plain {
        format!("@{}", name)
    } else {
        let mut quoted = String::from("@\"");
        for byte in name.bytes() {
            if (0x20..0x7f).contains(&byte) && byte != b'"' && byte != b'\\' {
                quoted.push(byte as char);
            } else {
                let _ = write!(quoted, "\\{:02X}", byte);
            }
        }
        quoted.push('"');
        quoted
    }
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        if (0x20..0x7f).contains(&byte) && byte != b'"' && byte != b'\\' {
            out.push(byte as char);
        } else {
            let _ = write!(out, "\\{:02X}", byte);
        }
    }
    out
}
