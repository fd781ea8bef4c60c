// src/update.rs
//
// Time-aware parameter updates.
//
// Every update is scheduled relative to the host clock at call time. A
// `time` of zero steps immediately; a positive `time` is the time constant
// of an exponential approach, never a linear ramp.

use std::f32::consts::FRAC_PI_2;

use log::warn;

use crate::context::{AudioContext, ParamId};

/// Step `param` to `value` now.
pub fn update(ctx: &dyn AudioContext, param: ParamId, value: f32) {
    let now = ctx.current_time();
    if let Err(err) = ctx.set_value_at_time(param, value, now) {
        warn!("update of {param:?} dropped: {err}");
    }
}

/// Step now when `time` is zero, otherwise approach `value` with time
/// constant `time`.
pub fn time_update(ctx: &dyn AudioContext, param: ParamId, value: f32, time: f64) {
    if time <= 0.0 {
        update(ctx, param, value);
        return;
    }
    let now = ctx.current_time();
    if let Err(err) = ctx.set_target_at_time(param, value, now, time) {
        warn!("update of {param:?} dropped: {err}");
    }
}

/// `a = 1 - value`, `b = value`.
pub fn linear_fade_update(ctx: &dyn AudioContext, a: ParamId, b: ParamId, value: f32, time: f64) {
    time_update(ctx, a, 1.0 - value, time);
    time_update(ctx, b, value, time);
}

/// Constant-power crossfade between `a` and `b`.
pub fn equal_power_fade_update(
    ctx: &dyn AudioContext,
    a: ParamId,
    b: ParamId,
    value: f32,
    time: f64,
) {
    let (gain_a, gain_b) = equal_power_gains(value);
    time_update(ctx, a, gain_a, time);
    time_update(ctx, b, gain_b, time);
}

/// Wet rises over the first half with dry held open, then dry falls over
/// the second half with wet held open.
pub fn dry_wet_update(ctx: &dyn AudioContext, dry: ParamId, wet: ParamId, value: f32, time: f64) {
    let (dry_gain, wet_gain) = dry_wet_gains(value);
    time_update(ctx, dry, dry_gain, time);
    time_update(ctx, wet, wet_gain, time);
}

#[inline]
pub fn equal_power_gains(value: f32) -> (f32, f32) {
    ((value * FRAC_PI_2).cos(), ((1.0 - value) * FRAC_PI_2).cos())
}

#[inline]
pub fn dry_wet_gains(value: f32) -> (f32, f32) {
    if value < 0.5 {
        (1.0, value * 2.0)
    } else {
        (1.0 - (value - 0.5) * 2.0, 1.0)
    }
}

/// Current value of `param`, or 0 for a handle the host does not know.
pub fn value(ctx: &dyn AudioContext, param: ParamId) -> f32 {
    ctx.param_value(param).unwrap_or_default()
}

/// Generates a getter reading the host parameter stored in the field of the
/// same name, plus a time-aware setter.
macro_rules! param_accessors {
    ($($(#[$meta:meta])* $field:ident, $setter:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $field(&self) -> f32 {
                $crate::update::value(&*self.ctx, self.$field)
            }

            pub fn $setter(&self, value: f32, time: f64) {
                $crate::update::time_update(&*self.ctx, self.$field, value, time);
            }
        )*
    };
}

pub(crate) use param_accessors;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use crate::context::UnitKind;
    use crate::graph::OfflineContext;
    use crate::parameter::Automation;

    fn gains(host: &OfflineContext) -> (ParamId, ParamId) {
        let a = host.create_unit(UnitKind::Gain);
        let b = host.create_unit(UnitKind::Gain);
        (
            host.param(a, "gain").unwrap(),
            host.param(b, "gain").unwrap(),
        )
    }

    fn now(host: &OfflineContext, a: ParamId, b: ParamId) -> (f32, f32) {
        (
            host.param_value(a).unwrap(),
            host.param_value(b).unwrap(),
        )
    }

    #[test]
    fn test_update_steps_now() {
        let host = OfflineContext::default();
        host.set_time(1.5);
        let (a, _) = gains(&host);

        update(&host, a, 0.3);
        assert_eq!(
            host.automation(a),
            vec![Automation::SetValue {
                value: 0.3,
                time: 1.5
            }]
        );
    }

    #[test]
    fn test_time_update_is_exponential() {
        let host = OfflineContext::default();
        let (a, _) = gains(&host);

        time_update(&host, a, 0.0, 0.25);
        assert_eq!(
            host.automation(a),
            vec![Automation::SetTarget {
                target: 0.0,
                start: 0.0,
                time_constant: 0.25
            }]
        );

        host.advance(1.0);
        let v = host.param_value(a).unwrap();
        assert!(v > 0.0 && v < 0.05);
    }

    #[test]
    fn test_linear_fade_bounds() {
        let host = OfflineContext::default();
        let (a, b) = gains(&host);

        linear_fade_update(&host, a, b, 0.0, 0.0);
        assert_eq!(now(&host, a, b), (1.0, 0.0));

        linear_fade_update(&host, a, b, 1.0, 0.0);
        assert_eq!(now(&host, a, b), (0.0, 1.0));

        linear_fade_update(&host, a, b, 0.5, 0.0);
        assert_eq!(now(&host, a, b), (0.5, 0.5));
    }

    #[test]
    fn test_equal_power_fade() {
        let host = OfflineContext::default();
        let (a, b) = gains(&host);

        equal_power_fade_update(&host, a, b, 0.5, 0.0);
        let (ga, gb) = now(&host, a, b);
        assert_relative_eq!(ga, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(gb, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(ga * ga + gb * gb, 1.0, epsilon = 1e-6);

        let (ga, gb) = equal_power_gains(0.0);
        assert_relative_eq!(ga, 1.0);
        assert_relative_eq!(gb, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dry_wet_points() {
        let host = OfflineContext::default();
        let (dry, wet) = gains(&host);

        dry_wet_update(&host, dry, wet, 0.0, 0.0);
        assert_eq!(now(&host, dry, wet), (1.0, 0.0));

        dry_wet_update(&host, dry, wet, 0.5, 0.0);
        assert_eq!(now(&host, dry, wet), (1.0, 1.0));

        dry_wet_update(&host, dry, wet, 1.0, 0.0);
        assert_eq!(now(&host, dry, wet), (0.0, 1.0));

        assert_eq!(dry_wet_gains(0.25), (1.0, 0.5));
        assert_eq!(dry_wet_gains(0.75), (0.5, 1.0));
    }

    #[test]
    fn test_unknown_param_is_ignored() {
        let host = Arc::new(OfflineContext::default());
        update(&*host, ParamId(404), 1.0);
        assert_eq!(value(&*host, ParamId(404)), 0.0);
    }
}
