use std::any::Any;

pub(crate) trait PanicMessage {
    fn message(&self) -> String;
}

impl PanicMessage for Box<dyn Any + Send> {
    fn message(&self) -> String {
        if let Some(message) = self.downcast_ref::<&'static str>() {
            (*message).to_owned()
        } else if let Some(message) = self.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_owned()
        }
    }
}

/// Runs the wrapped closure exactly once, when dropped.
#[must_use]
pub(crate) struct OnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> OnDrop<F> {
    pub(crate) fn new(hook: F) -> Self {
        Self(Some(hook))
    }
}

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(hook) = self.0.take() {
            hook();
        }
    }
}
