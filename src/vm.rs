//! Virtual machine for TAC execution.
//!
//! Executes the lowered form directly: one environment per call frame on
//! an explicit frame stack, a single process-wide parameter stack for
//! the `PARAM … CALL` hand-off, and a per-frame `ret` slot read by
//! `POP`. `CALL` recurses on the host stack.

use std::collections::BTreeMap;
use std::fmt;

use crate::tac::{Instr, Opcode, Operand};

// ─── Values ───────────────────────────────────────────────────────

/// A runtime value. Frames store both integers and strings in the same
/// environment; conversion happens at use sites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

// ─── Results and errors ───────────────────────────────────────────

/// VM execution result.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    /// Lines written by `PRINT`, in order.
    pub output: Vec<String>,
    /// The integer returned by `main`.
    pub exit_value: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    UnknownFunction(String),
    UndefinedLabel(String),
    StringOperand { op: &'static str, value: String },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UnknownFunction(name) => write!(f, "function '{}' not found", name),
            RuntimeError::UndefinedLabel(name) => write!(f, "undefined label '{}'", name),
            RuntimeError::StringOperand { op, value } => write!(
                f,
                "cannot use string value '{}' in numeric operation '{}'",
                value, op
            ),
        }
    }
}

impl std::error::Error for RuntimeError {}

// ─── Interpreter ──────────────────────────────────────────────────

pub struct Interpreter<'a> {
    code: &'a [Instr],
    /// Label name → absolute instruction offset.
    labels: BTreeMap<String, usize>,
    /// Function name → offset of its `FUNC` instruction.
    functions: BTreeMap<String, usize>,
    /// Call stack of frame environments; the top is the current frame.
    frames: Vec<BTreeMap<String, Value>>,
    /// Process-wide parameter stack for the `PARAM … CALL` window.
    params: Vec<Value>,
    output: Vec<String>,
}

impl<'a> Interpreter<'a> {
    pub fn new(code: &'a [Instr]) -> Self {
        let mut labels = BTreeMap::new();
        let mut functions = BTreeMap::new();
        for (idx, instr) in code.iter().enumerate() {
            match instr.op {
                Opcode::Label => {
                    if let Some(name) = instr.a1.as_label() {
                        labels.insert(name.to_string(), idx);
                    }
                }
                Opcode::Func => {
                    if let Some(name) = instr.a1.as_name() {
                        functions.insert(name.to_string(), idx);
                    }
                }
                _ => {}
            }
        }
        Self {
            code,
            labels,
            functions,
            frames: Vec::new(),
            params: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Execute the program by calling `main` with no arguments.
    pub fn execute(mut self) -> Result<ExecutionResult, RuntimeError> {
        if !self.functions.contains_key("main") {
            return Err(RuntimeError::UnknownFunction("main".to_string()));
        }
        let ret = self.run_function("main", Vec::new())?;
        let exit_value = match ret {
            Value::Int(n) => n,
            Value::Str(_) => 0,
        };
        Ok(ExecutionResult {
            output: self.output,
            exit_value,
        })
    }

    fn run_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let code = self.code;
        let start = *self
            .functions
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;

        // Bind the PARAM_DECL prologue to the arguments, in order;
        // missing arguments bind to 0.
        let mut env = BTreeMap::new();
        let mut pc = start + 1;
        let mut arg_idx = 0;
        while pc < code.len() && code[pc].op == Opcode::ParamDecl {
            if let Some(param) = code[pc].a1.as_name() {
                let value = args.get(arg_idx).cloned().unwrap_or(Value::Int(0));
                env.insert(param.to_string(), value);
            }
            arg_idx += 1;
            pc += 1;
        }
        self.frames.push(env);

        while pc < code.len() {
            let instr = &code[pc];
            match instr.op {
                Opcode::EndFunc => break,
                Opcode::Mov => {
                    let value = self.value(&instr.a1);
                    self.store(&instr.res, value);
                }
                op if op.is_binary() => {
                    let value = self.binary(op, &instr.a1, &instr.a2)?;
                    self.store(&instr.res, value);
                }
                Opcode::Param => {
                    let value = self.value(&instr.a1);
                    self.params.push(value);
                }
                Opcode::Call => {
                    let callee = instr.a1.as_name().unwrap_or("").to_string();
                    let argc = match instr.a2 {
                        Operand::IntLit(n) if n > 0 => n as usize,
                        _ => 0,
                    };
                    // Pop the last argc pushed values, preserving order
                    let split = self.params.len().saturating_sub(argc);
                    let call_args = self.params.split_off(split);
                    let ret = self.run_function(&callee, call_args)?;
                    self.store_name("ret", ret);
                }
                Opcode::Pop => {
                    let value = self.read_name("ret").unwrap_or(Value::Int(0));
                    self.store(&instr.res, value);
                }
                Opcode::Print => {
                    let value = self.value(&instr.a1);
                    println!("{}", value);
                    self.output.push(value.to_string());
                }
                Opcode::IfzGoto => {
                    let cond = self.int_value(&instr.a1, "IFZ_GOTO")?;
                    if cond == 0 {
                        pc = self.label_offset(&instr.res)?;
                        continue;
                    }
                }
                Opcode::Goto => {
                    pc = self.label_offset(&instr.a1)?;
                    continue;
                }
                Opcode::Label | Opcode::ParamDecl | Opcode::Func => {}
                Opcode::Ret => {
                    let value = self.value(&instr.a1);
                    self.frames.pop();
                    return Ok(value);
                }
                _ => {}
            }
            pc += 1;
        }

        // Fall-through at END_FUNC returns 0
        self.frames.pop();
        Ok(Value::Int(0))
    }

    /// Evaluate an operand in the current frame. Unresolved names fall
    /// back to older frames, newest first, and finally to 0.
    fn value(&self, operand: &Operand) -> Value {
        match operand {
            Operand::None => Value::Int(0),
            Operand::IntLit(n) => Value::Int(*n),
            Operand::StrLit(s) => Value::Str(s.clone()),
            Operand::Label(_) => Value::Int(0),
            Operand::Name(name) => {
                for frame in self.frames.iter().rev() {
                    if let Some(value) = frame.get(name) {
                        return value.clone();
                    }
                }
                Value::Int(0)
            }
        }
    }

    fn int_value(&self, operand: &Operand, op: &'static str) -> Result<i64, RuntimeError> {
        match self.value(operand) {
            Value::Int(n) => Ok(n),
            Value::Str(s) => Err(RuntimeError::StringOperand { op, value: s }),
        }
    }

    fn binary(&self, op: Opcode, a1: &Operand, a2: &Operand) -> Result<Value, RuntimeError> {
        // == and != compare as strings when either side is one
        if matches!(op, Opcode::Eq | Opcode::Ne) {
            let left = self.value(a1);
            let right = self.value(a2);
            if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                let eq = left.to_string() == right.to_string();
                let result = if op == Opcode::Eq { eq } else { !eq };
                return Ok(Value::Int(result as i64));
            }
        }

        let l = self.int_value(a1, op.symbol())?;
        let r = self.int_value(a2, op.symbol())?;
        let result = match op {
            Opcode::Plus => l.wrapping_add(r),
            Opcode::Minus => l.wrapping_sub(r),
            Opcode::Mul => l.wrapping_mul(r),
            // Truncated division; divisor 0 yields 0 without aborting
            Opcode::Div => {
                if r == 0 {
                    0
                } else {
                    l.wrapping_div(r)
                }
            }
            Opcode::Eq => (l == r) as i64,
            Opcode::Ne => (l != r) as i64,
            Opcode::Gt => (l > r) as i64,
            Opcode::Lt => (l < r) as i64,
            Opcode::Ge => (l >= r) as i64,
            Opcode::Le => (l <= r) as i64,
            _ => unreachable!("binary is only called for binary opcodes"),
        };
        Ok(Value::Int(result))
    }

    fn label_offset(&self, operand: &Operand) -> Result<usize, RuntimeError> {
        let name = match operand.as_label() {
            Some(name) => name,
            None => return Err(RuntimeError::UndefinedLabel(operand.to_string())),
        };
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedLabel(name.to_string()))
    }

    fn store(&mut self, res: &Operand, value: Value) {
        if let Some(name) = res.as_name() {
            self.store_name(name, value);
        }
    }

    fn store_name(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    fn read_name(&self, name: &str) -> Option<Value> {
        self.frames.last().and_then(|f| f.get(name)).cloned()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
