// src/nodes/mod.rs
//
// Standard node types: primitive wrappers, envelopes, effects and
// instruments.

mod effects;
mod envelope;
mod filters;
mod instruments;
mod modulation;
mod oscillators;
mod utility;

pub use effects::*;
pub use envelope::*;
pub use filters::*;
pub use instruments::*;
pub use modulation::*;
pub use oscillators::*;
pub use utility::*;

use log::warn;

use crate::context::{Context, UnitId, UnitSetting};

/// Pushes a non-automatable setting to the host.
///
/// A rejected setting leaves the unit as it was; callers keep their own copy
/// of the value either way.
pub(crate) fn apply_setting(ctx: &Context, unit: UnitId, setting: UnitSetting) {
    let name = setting.name();
    if let Err(err) = ctx.configure(unit, setting) {
        warn!("{name} not applied to {unit:?}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::context::{UnitKind, Waveform};
    use crate::graph::OfflineContext;

    #[test]
    fn test_apply_setting_records_accepted() {
        let host = Arc::new(OfflineContext::default());
        let ctx: Context = host.clone();
        let osc = ctx.create_unit(UnitKind::Oscillator);

        apply_setting(&ctx, osc, UnitSetting::Waveform(Waveform::Triangle));
        assert_eq!(
            host.settings(osc),
            vec![UnitSetting::Waveform(Waveform::Triangle)]
        );
    }

    #[test]
    fn test_apply_setting_ignores_rejected() {
        let host = Arc::new(OfflineContext::default());
        let ctx: Context = host.clone();
        let gain = ctx.create_unit(UnitKind::Gain);

        apply_setting(&ctx, gain, UnitSetting::Loop(true));
        assert!(host.settings(gain).is_empty());
    }
}
