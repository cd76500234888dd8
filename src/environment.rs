use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Object;

/// Cap on buffered `print` output per evaluation.
pub const MAX_PRINTED_LINES: usize = 1000;

/// Returned by `push_output` once the buffer is full.
#[derive(Debug, PartialEq, Eq)]
pub struct OutputFull;

/// One scope in the chain. Closures hold their defining scope through
/// `Rc<RefCell<_>>`, so a scope outlives the call that created it for as
/// long as any closure still points at it. The root scope additionally owns
/// the evaluation's print buffer.
#[derive(Debug)]
pub struct Environment {
    store: HashMap<String, Object>,
    outer: Option<Rc<RefCell<Environment>>>,
    output: Option<Vec<String>>,
}

impl Environment {
    /// A root scope with an empty print buffer. Collaborators create one of
    /// these per session or per request and never share it across
    /// concurrent evaluations.
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            outer: None,
            output: Some(Vec::new()),
        }
    }

    /// A child scope, e.g. a function call frame over the closure's
    /// captured environment.
    pub fn new_enclosed(outer: &Rc<RefCell<Environment>>) -> Self {
        Self {
            store: HashMap::new(),
            outer: Some(Rc::clone(outer)),
            output: None,
        }
    }

    /// Innermost-first lookup through the chain.
    pub fn get(&self, name: &str) -> Option<Object> {
        self.store.get(name).cloned().or_else(|| {
            self.outer
                .as_ref()
                .and_then(|outer| outer.borrow().get(name))
        })
    }

    /// Binds into this scope only; shadows any outer binding of the same
    /// name.
    pub fn define<S: Into<String>>(&mut self, name: S, value: Object) {
        self.store.insert(name.into(), value);
    }

    /// Rewrites an existing binding wherever the chain holds it. Returns
    /// false if the name is bound nowhere.
    pub fn assign(&mut self, name: &str, value: Object) -> bool {
        if let Some(slot) = self.store.get_mut(name) {
            *slot = value;
            true
        } else if let Some(outer) = &self.outer {
            outer.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    /// Appends one printed line, delegating outward to the first scope that
    /// owns a buffer.
    pub fn push_output(&mut self, line: String) -> Result<(), OutputFull> {
        if let Some(buffer) = &mut self.output {
            if buffer.len() >= MAX_PRINTED_LINES {
                return Err(OutputFull);
            }
            buffer.push(line);
            return Ok(());
        }
        match &self.outer {
            Some(outer) => outer.borrow_mut().push_output(line),
            None => {
                // Root without a buffer: start one.
                self.output = Some(vec![line]);
                Ok(())
            }
        }
    }

    /// A copy of the buffered output, searched outward like `push_output`.
    pub fn output(&self) -> Vec<String> {
        if let Some(buffer) = &self.output {
            return buffer.clone();
        }
        match &self.outer {
            Some(outer) => outer.borrow().output(),
            None => Vec::new(),
        }
    }

    /// Drains the buffered output, leaving the buffer empty.
    pub fn take_output(&mut self) -> Vec<String> {
        if let Some(buffer) = &mut self.output {
            return std::mem::replace(buffer, Vec::new());
        }
        match &self.outer {
            Some(outer) => outer.borrow_mut().take_output(),
            None => Vec::new(),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
