pub use lighthouse_metrics::*;

lazy_static! {
    pub static ref PRESENT_SLOT: Result<IntGauge> =
        try_create_int_gauge("slotclock_present_slot", "The present wall-clock slot");
}
