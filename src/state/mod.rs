mod history;
mod session;

pub use history::{Exchange, ExchangeId, ExchangeStatus, History};
pub use session::{
    ControllerHandle, SessionCommand, SessionController, SessionError, SessionEvent, SessionPhase,
    SessionView,
};
