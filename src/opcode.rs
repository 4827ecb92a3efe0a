//! Built-in dispatch: resolving a rule body's `opcode` name to a callable,
//! and invoking it with the pattern binder's bindings.
//!
//! Grounded on `core::ffi::FFI` in the teacher repo — a
//! `HashMap<String, FFIFunction>` with `add`/`get` — generalized from
//! FFI-function-to-`Data` into opcode-name-to-`Opcode`.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::scope::Context;
use crate::tree::Tree;

/// The arguments and context an opcode runs with. Built by the evaluator
/// directly from the pattern binder's ordered bindings (see
/// `eval::try_lookup`) in the same left-to-right order the binder encountered
/// them, alongside the rule body and a handle to the matching scope.
pub struct Frame {
    args: Vec<Tree>,
    body: Tree,
    scope: Context,
}

impl Frame {
    pub fn new(args: Vec<Tree>, body: Tree, scope: Context) -> Frame {
        Frame { args, body, scope }
    }

    pub fn arg(&self, index: usize) -> Option<&Tree> {
        self.args.get(index)
    }

    pub fn args(&self) -> &[Tree] {
        &self.args
    }

    pub fn body(&self) -> &Tree {
        &self.body
    }

    pub fn scope(&self) -> &Context {
        &self.scope
    }
}

/// A named built-in callable, resolved once per call site via the
/// [`OpcodeRegistry`] and cached on the rule body's attachment.
pub trait Opcode: fmt::Debug {
    /// The name this opcode is registered and looked up under.
    fn op_id(&self) -> &str;

    /// Runs the opcode against the arguments in `frame`, returning the
    /// result tree, or `None` if the arguments don't fit what this opcode
    /// expects (a hard error, not a mismatch — opcodes run only after a
    /// pattern has already matched).
    fn run(&self, frame: &Frame) -> Option<Tree>;
}

/// Process-wide, read-only after initialization (per the resource model):
/// maps opcode names to implementations.
#[derive(Default)]
pub struct OpcodeRegistry {
    entries: HashMap<String, Rc<dyn Opcode>>,
}

impl OpcodeRegistry {
    pub fn new() -> OpcodeRegistry {
        OpcodeRegistry { entries: HashMap::new() }
    }

    pub fn register(&mut self, opcode: Rc<dyn Opcode>) {
        self.entries.insert(opcode.op_id().to_string(), opcode);
    }

    /// `find(opcode_name) -> opcode_or_none`, per the opcode registry
    /// interface. Cloning the `Rc` here is the "clone per-site" the spec
    /// describes for caching onto a rule body's attachment.
    pub fn find(&self, opcode_name: &str) -> Option<Rc<dyn Opcode>> {
        self.entries.get(opcode_name).map(Rc::clone)
    }
}
