//! Module interfaces
//!
//! A cyclic module is initialised once against a session, then processed once per tick by its
//! executable's main loop. The sweep generator in `sweep_exec` is one.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// State of a cyclic module.
pub trait State {
    /// Configuration consumed by `init`, usually the module's parameters.
    type InitData;
    type InitError;

    /// Data consumed by each call to `proc`, `()` for a module with no inputs.
    type InputData;
    /// What the tick produced, handed on by the main loop.
    type OutputData;
    /// Information about the tick which is not needed downstream but is worth logging.
    type StatusReport;
    type ProcError;

    /// Initialise the module, opening any archives it keeps in `session`.
    ///
    /// Calling `init` again restarts the module with the new data.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one tick of the module.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
