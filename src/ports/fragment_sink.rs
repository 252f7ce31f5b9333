//! Fragment Sink Port - Incremental display of a streamed reply.
//!
//! The UI layer implements this to render each piece of an assistant reply
//! as soon as it arrives. Fragments are delivered in arrival order and are
//! never empty.

/// Receiver for live reply fragments.
pub trait FragmentSink: Send {
    /// Called once per non-empty fragment, in order.
    fn on_fragment(&mut self, fragment: &str);
}
