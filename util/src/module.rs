//! Plugin interfaces
//!
//! Anything loaded into a host simulation shall implement the [`Plugin`] trait. The host owns the
//! simulation clock and drives the plugin through its lifecycle: it is configured once, ticked
//! once per simulation step, optionally reset, and finally shut down.

// ---------------------------------------------------------------------------
// PLUGIN
// ---------------------------------------------------------------------------

/// The capability interface a host adapter binds to.
pub trait Plugin {
    /// Data provided by the host when the plugin is loaded.
    type LoadData;
    /// An error which can occur during configuration or shutdown.
    type Error;
    /// A report produced by each tick.
    type StatusReport;

    /// Configure the plugin.
    ///
    /// # Inputs
    /// - `load_data`: The configuration and handles provided by the host.
    /// - `sim_time_s`: The simulation time at which the plugin is loaded.
    fn configure(&mut self, load_data: Self::LoadData, sim_time_s: f64)
        -> Result<(), Self::Error>;

    /// Cyclic processing, called by the host once per simulation step.
    ///
    /// Ticking never fails, anomalies are absorbed and logged by the implementation.
    fn tick(&mut self, sim_time_s: f64) -> Self::StatusReport;

    /// Return the plugin to its freshly loaded state at the given simulation time.
    fn reset(&mut self, sim_time_s: f64);

    /// Release all resources held by the plugin. The plugin cannot be used afterwards.
    fn shutdown(&mut self) -> Result<(), Self::Error>;
}
