//! Mutable attachments on otherwise-immutable tree nodes.
//!
//! An attachment is logically pure memoisation: the opcode a rule body
//! resolves to, or the primitive check a type name resolves to, never
//! changes once computed. We model that as a single-writer cell rather
//! than a general typed map, since in practice a given node plays exactly
//! one of these two roles (a rule body, or a primitive type name) and never
//! both.

use std::cell::RefCell;
use std::rc::Rc;

use crate::opcode::Opcode;
use crate::scope::Scope;
use crate::typecheck::TypeCheckOpcode;

#[derive(Clone)]
pub enum Attachment {
    Opcode(Rc<dyn Opcode>),
    TypeCheck(Rc<dyn TypeCheckOpcode>),
    /// Carries the scope a closure sentinel captured. Not part of the two
    /// attachment kinds the evaluator's rewrite logic inspects (§3), but the
    /// same "installed once, read thereafter" cell the closure sentinel
    /// needs to carry its `Scope` through an otherwise plain `Name` node.
    ClosureScope(Scope),
}

/// Set-once-per-kind storage. Re-setting the same kind is a no-op, matching
/// the "idempotent" requirement: the first installer wins.
#[derive(Default)]
pub struct AttachmentCell(RefCell<Option<Attachment>>);

impl AttachmentCell {
    pub fn new() -> AttachmentCell {
        AttachmentCell(RefCell::new(None))
    }

    pub fn opcode(&self) -> Option<Rc<dyn Opcode>> {
        match &*self.0.borrow() {
            Some(Attachment::Opcode(op)) => Some(Rc::clone(op)),
            _ => None,
        }
    }

    pub fn set_opcode(&self, op: Rc<dyn Opcode>) {
        let mut slot = self.0.borrow_mut();
        if slot.is_none() {
            *slot = Some(Attachment::Opcode(op));
        }
    }

    pub fn type_check(&self) -> Option<Rc<dyn TypeCheckOpcode>> {
        match &*self.0.borrow() {
            Some(Attachment::TypeCheck(op)) => Some(Rc::clone(op)),
            _ => None,
        }
    }

    pub fn set_type_check(&self, op: Rc<dyn TypeCheckOpcode>) {
        let mut slot = self.0.borrow_mut();
        if slot.is_none() {
            *slot = Some(Attachment::TypeCheck(op));
        }
    }

    pub fn closure_scope(&self) -> Option<Scope> {
        match &*self.0.borrow() {
            Some(Attachment::ClosureScope(scope)) => Some(scope.clone()),
            _ => None,
        }
    }

    pub fn set_closure_scope(&self, scope: Scope) {
        let mut slot = self.0.borrow_mut();
        if slot.is_none() {
            *slot = Some(Attachment::ClosureScope(scope));
        }
    }
}
