//! Session status output.

/// A single binary indicator: on while a session is active, off while idle.
pub trait StatusIndicator: Send {
    fn set(&mut self, on: bool);
}

impl<I: StatusIndicator + ?Sized> StatusIndicator for Box<I> {
    fn set(&mut self, on: bool) {
        (**self).set(on)
    }
}

/// Indicator that reports its changes through the log.
#[derive(Debug, Default)]
pub struct LogIndicator {
    on: bool,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl StatusIndicator for LogIndicator {
    fn set(&mut self, on: bool) {
        if self.on != on {
            tracing::info!("Status indicator: {}", if on { "on" } else { "off" });
        }
        self.on = on;
    }
}
