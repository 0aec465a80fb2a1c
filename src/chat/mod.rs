//! Chat session: transcript, the single in-flight exchange and the bits of
//! view state (scroll, toasts) that follow from it.

pub(crate) mod controller;
pub(crate) mod scroll;
pub(crate) mod toast;
pub(crate) mod transcript;
pub(crate) mod transport;

pub(crate) use controller::{ChatController, ControllerOptions};
pub(crate) use transcript::{Message, Sender};
pub(crate) use transport::HttpTransport;
