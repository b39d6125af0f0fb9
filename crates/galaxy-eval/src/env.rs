//! Evaluation context: variable bindings, the transport and the picture sink.

use galaxy_types::{Picture, TermRef, VarId};
use log::info;
use std::collections::BTreeMap;

use crate::error::{EvalError, EvalResult};
use crate::transport::{Transport, TransportError};

/// Everything reduction needs from the outside world.
///
/// Variables are single-assignment. The transport is optional; without one,
/// `send` fails with [`TransportError::Unavailable`]. Pictures drawn during
/// evaluation accumulate in the sink until taken.
#[derive(Default)]
pub struct Environment {
    bindings: BTreeMap<VarId, TermRef>,
    transport: Option<Box<dyn Transport>>,
    picture: Picture,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        let mut env = Self::new();
        env.set_transport(transport);
        env
    }

    pub fn set_transport(&mut self, transport: impl Transport + 'static) {
        self.transport = Some(Box::new(transport));
    }

    /// Bind a variable. Rebinding an existing variable is an error.
    pub fn define(&mut self, id: VarId, term: TermRef) -> EvalResult<()> {
        if self.bindings.contains_key(&id) {
            return Err(EvalError::Redefinition(id));
        }
        self.bindings.insert(id, term);
        Ok(())
    }

    pub fn get(&self, id: VarId) -> EvalResult<TermRef> {
        self.bindings
            .get(&id)
            .cloned()
            .ok_or(EvalError::UndefinedVariable(id))
    }

    pub fn is_defined(&self, id: VarId) -> bool {
        self.bindings.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Send one request through the configured transport.
    pub fn transmit(&mut self, request: &str) -> Result<String, TransportError> {
        let transport = self.transport.as_mut().ok_or(TransportError::Unavailable)?;
        info!("send {request}");
        let response = transport.send(request)?;
        info!("recv {response}");
        Ok(response)
    }

    /// Append every draw call of `picture` to the sink.
    pub fn draw(&mut self, picture: &Picture) {
        self.picture.draw_picture(picture);
    }

    pub fn picture(&self) -> &Picture {
        &self.picture
    }

    /// Empty the sink, returning what was drawn so far.
    pub fn take_picture(&mut self) -> Picture {
        self.picture.take()
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("bindings", &self.bindings.len())
            .field("transport", &self.transport.is_some())
            .field("draw_calls", &self.picture.draw_count())
            .finish()
    }
}
