//! Abstract interception host.
//!
//! The host owns the controller's lifecycle and forwards intercepted traffic
//! to it. Hooks are explicit: the host pushes `HostEvent`s down a channel and
//! the controller raises `HostSignals` back, rather than either side touching
//! ambient global state.

use color_eyre::Result;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::http::{Request, Response};

/// Events delivered by the host to the controller.
#[derive(Debug)]
pub enum HostEvent {
  /// A new controller version was registered; populate the cache generation.
  Install,
  /// The controller is taking control; prune superseded generations.
  Activate,
  /// An intercepted request. The response (or failure) goes back on `reply`.
  Fetch {
    request: Request,
    reply: oneshot::Sender<Result<Response>>,
  },
  /// An explicit message from a controlled page.
  Message(Message),
}

/// A message from a controlled page.
///
/// The payload is host-defined JSON; unrecognized payloads are ignored. The
/// reply channel, when present, is the message's designated reply port.
#[derive(Debug)]
pub struct Message {
  pub payload: Value,
  pub reply: Option<oneshot::Sender<Value>>,
}

impl Message {
  pub fn new(payload: Value) -> Self {
    Self {
      payload,
      reply: None,
    }
  }

  pub fn with_reply(payload: Value, reply: oneshot::Sender<Value>) -> Self {
    Self {
      payload,
      reply: Some(reply),
    }
  }
}

/// Signals the controller raises back at the host.
pub trait HostSignals: Send + Sync {
  /// Activate this controller immediately instead of waiting for existing
  /// instances to finish.
  fn skip_waiting(&self);

  /// Put this controller in control of all open clients now, not only those
  /// opened from here on.
  fn claim(&self);
}

/// A raised host signal, for hosts consuming them from a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
  SkipWaiting,
  Claim,
}

/// `HostSignals` implementation that forwards signals over a channel to the
/// host's event loop.
pub struct ChannelSignals {
  tx: mpsc::UnboundedSender<Signal>,
}

impl ChannelSignals {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<Signal>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

impl HostSignals for ChannelSignals {
  fn skip_waiting(&self) {
    // Ignore send errors - the host may have shut down
    let _ = self.tx.send(Signal::SkipWaiting);
  }

  fn claim(&self) {
    let _ = self.tx.send(Signal::Claim);
  }
}
