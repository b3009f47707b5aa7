/// Port through which the embedding application learns about activations.
///
/// Called with the internal id and the session description now in effect, or
/// `None` when the sender or receiver has been deactivated. Invoked while the
/// node model is still locked, so implementations must not call back into the node.
pub trait ActivationHandler: Send + Sync {
    fn on_activation(&self, internal_id: &str, sdp: Option<&str>);
}

impl<F> ActivationHandler for F
where
    F: Fn(&str, Option<&str>) + Send + Sync,
{
    fn on_activation(&self, internal_id: &str, sdp: Option<&str>) {
        self(internal_id, sdp)
    }
}
