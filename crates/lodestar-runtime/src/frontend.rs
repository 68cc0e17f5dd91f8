use crate::options::OptionDefinition;

/// The host-facing side of a tick: everything the adapter asks of the
/// frontend while the host is calling into it.
///
/// Implementations wrap the host callbacks registered for the current
/// session and are only used on the host's thread.
pub trait Frontend {
    fn poll_input(&self);

    /// Raw input query using the host's device and id numbering.
    fn input_state(&self, port: u32, device: u32, index: u32, id: u32) -> i16;

    /// Reports that the frame in the host framebuffer is ready.
    fn submit_hw_frame(&self, width: u32, height: u32);

    /// Keeps the host's frame cadence when nothing was rendered.
    fn submit_placeholder_frame(&self);

    fn variable(&self, key: &str) -> Option<String>;

    /// Whether any option changed since the last call.
    fn variables_updated(&self) -> bool;

    fn set_variables(&self, definitions: &[OptionDefinition]) -> bool;

    fn username(&self) -> Option<String>;
}
