//! State machines draining a buffer.

use crate::*;

/// Consumer extension.
pub trait ConsumeExt {
    /// Drives the buffer's ready signal from a state machine.
    ///
    /// On every tick `f` receives the front of the buffer (`None` if it is empty), the other inputs and the current
    /// state, and returns the output (`None` for no data), whether the front is consumed, and the next state. A request
    /// to consume from an empty buffer is ignored.
    fn consume<S, F>(
        self, k: &mut CompositeModuleContext, inputs: &[Stream], typ: ValueTyp, init: S, f: F,
    ) -> Result<Stream, GraphError>
    where
        S: 'static + Signal,
        F: 'static + Fn(Option<&Value>, &[Option<Value>], S) -> Result<(Option<Value>, bool, S), SimError>;
}

impl ConsumeExt for Decoupled {
    fn consume<S, F>(
        self, k: &mut CompositeModuleContext, inputs: &[Stream], typ: ValueTyp, init: S, f: F,
    ) -> Result<Stream, GraphError>
    where
        S: 'static + Signal,
        F: 'static + Fn(Option<&Value>, &[Option<Value>], S) -> Result<(Option<Value>, bool, S), SimError>,
    {
        let streams = [vec![self.output()], inputs.to_vec()].concat();
        let zero = Value::zero(&typ);

        // (valid, data, ready)
        let fsm_typ = ValueTyp::Tuple(vec![ValueTyp::Bool, typ, ValueTyp::Bool]);
        let out = k.fsm(&streams, fsm_typ, init, move |args, state| {
            let front = args[0].as_ref();
            let (output, pop, state_next) = f(front, &args[1..], state)?;
            let valid = output.is_some();
            let pop = pop && front.is_some();
            let output = output.unwrap_or_else(|| zero.clone());
            Ok((Some(Value::Tuple(vec![Value::Bool(valid), output, Value::Bool(pop)])), state_next))
        })?;

        let valid = out.field(k, 0)?;
        let ready = out.field(k, 2)?;
        self.set_ready(k, ready)?;
        out.field(k, 1)?.when(k, valid)
    }
}
