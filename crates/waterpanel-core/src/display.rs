// Display seam: whatever renders the readout (terminal line, 3D text mesh,
// dashboard widget) implements `DisplaySink`.

use crate::model::Reading;

/// Receives each validated reading.
///
/// Only readings that passed the sentinel check ever reach a sink.
pub trait DisplaySink: Send {
    fn show(&mut self, reading: &Reading);
}

impl<F> DisplaySink for F
where
    F: FnMut(&Reading) + Send,
{
    fn show(&mut self, reading: &Reading) {
        self(reading);
    }
}
