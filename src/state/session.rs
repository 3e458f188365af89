mod lifecycle;
mod state;
mod streaming;


pub use state::{
    ControllerHandle, SessionCommand, SessionController, SessionError, SessionEvent, SessionPhase,
    SessionView,
};
