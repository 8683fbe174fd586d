//! Helpers shared across commands.

pub mod logging;

pub use logging::initialize_logging;

use keepsake_core::ReferenceInstant;

use crate::cli::OriginArgs;

/// Build the reference instant from the origin flags, filling gaps from the
/// system clock.
pub fn reference_instant(origin: OriginArgs) -> ReferenceInstant {
    let now = ReferenceInstant::now();
    let mut reference = origin
        .timestamp
        .map_or(now, |millis| ReferenceInstant::from_js_millis(millis, now.timezone_offset_minutes));
    if let Some(offset) = origin.timezone {
        reference.timezone_offset_minutes = offset;
    }
    reference
}
