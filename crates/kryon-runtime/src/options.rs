//! Runtime-wide tunables (§4.I/§5), mirroring the compiler's `CompilerOptions`
//! shape: one small `Default`-able struct rather than scattered constants.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeOptions {
    /// Capacity of the input event queue before new events are dropped and
    /// an overflow flag is raised (§5 "bounded event queue").
    pub event_queue_capacity: usize,
    /// Max milliseconds between two clicks for them to count as a double click (§4.I).
    pub double_click_ms: u64,
    /// Max pixel distance between two clicks for them to count as a double click (§4.I).
    pub double_click_distance_px: f32,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self { event_queue_capacity: 32, double_click_ms: 400, double_click_distance_px: 4.0 }
    }
}
