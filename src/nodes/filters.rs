// Biquad filter wrapper and the two-band EQ built from it.

use std::sync::Arc;

use crate::context::{Context, FilterType, ParamId, UnitId, UnitKind, UnitSetting};
use crate::error::Result;
use crate::node::{Endpoint, Node, Params, Ports, Source, impl_node};
use crate::update::param_accessors;

use super::apply_setting;

// ═══════════════════════════════════════════════════════════════════
// Filter
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOptions {
    pub frequency: f32,
    pub q: f32,
    pub detune: f32,
    pub gain: f32,
    pub filter_type: FilterType,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            frequency: 11_000.0,
            q: 0.0,
            detune: 0.0,
            gain: 0.0,
            filter_type: FilterType::Lowpass,
        }
    }
}

pub struct Filter {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    filter_type: FilterType,
    frequency: ParamId,
    q: ParamId,
    detune: ParamId,
    gain: ParamId,
}

impl Filter {
    pub fn new(ctx: &Context, options: FilterOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::BiquadFilter);
        let detune = ctx.param(unit, "detune")?;
        let frequency = ctx.param(unit, "frequency")?;
        let gain = ctx.param(unit, "gain")?;
        let q = ctx.param(unit, "q")?;
        ctx.configure(unit, UnitSetting::FilterType(options.filter_type))?;

        let filter = Self {
            ctx: ctx.clone(),
            ports: Ports::unit("Filter", unit),
            params: Params::new()
                .with("detune", detune)
                .with("frequency", frequency)
                .with("gain", gain)
                .with("q", q),
            unit,
            filter_type: options.filter_type,
            frequency,
            q,
            detune,
            gain,
        };
        filter.set_frequency(options.frequency, 0.0);
        filter.set_q(options.q, 0.0);
        filter.set_gain(options.gain, 0.0);
        filter.set_detune(options.detune, 0.0);
        Ok(filter)
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn frequency_param(&self) -> ParamId {
        self.frequency
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        apply_setting(&self.ctx, self.unit, UnitSetting::FilterType(filter_type));
        self.filter_type = filter_type;
    }

    param_accessors! {
        /// Cutoff or center frequency in Hz.
        frequency, set_frequency;
        q, set_q;
        /// Detune in cents.
        detune, set_detune;
        /// Boost in dB, used by the shelf and peaking types only.
        gain, set_gain;
    }
}

// ═══════════════════════════════════════════════════════════════════
// EQ2
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eq2Options {
    pub low_frequency: f32,
    pub low_gain: f32,
    pub high_frequency: f32,
    pub high_gain: f32,
}

impl Default for Eq2Options {
    fn default() -> Self {
        Self {
            low_frequency: 320.0,
            low_gain: 0.0,
            high_frequency: 3200.0,
            high_gain: 0.0,
        }
    }
}

/// Low shelf into high shelf.
pub struct Eq2 {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    low: Filter,
    high: Filter,
}

impl Eq2 {
    pub fn new(ctx: &Context, options: Eq2Options) -> Result<Self> {
        let low = Filter::new(
            ctx,
            FilterOptions {
                filter_type: FilterType::Lowshelf,
                frequency: 320.0,
                ..Default::default()
            },
        )?;
        let high = Filter::new(
            ctx,
            FilterOptions {
                filter_type: FilterType::Highshelf,
                frequency: 3200.0,
                ..Default::default()
            },
        )?;

        let eq = Self {
            ctx: ctx.clone(),
            ports: Ports::new(
                "EQ2",
                vec![Endpoint::Node(low.ports.clone())],
                vec![Source::Node(high.ports.clone())],
            ),
            params: Params::new()
                .with("low_frequency", low.frequency)
                .with("low_gain", low.gain)
                .with("high_frequency", high.frequency)
                .with("high_gain", high.gain),
            low,
            high,
        };
        eq.set_low_frequency(options.low_frequency, 0.0);
        eq.set_low_gain(options.low_gain, 0.0);
        eq.set_high_frequency(options.high_frequency, 0.0);
        eq.set_high_gain(options.high_gain, 0.0);

        eq.low.connect(&eq.high);
        Ok(eq)
    }

    pub fn low_frequency(&self) -> f32 {
        self.low.frequency()
    }

    pub fn set_low_frequency(&self, value: f32, time: f64) {
        self.low.set_frequency(value, time);
    }

    pub fn low_gain(&self) -> f32 {
        self.low.gain()
    }

    pub fn set_low_gain(&self, value: f32, time: f64) {
        self.low.set_gain(value, time);
    }

    pub fn high_frequency(&self) -> f32 {
        self.high.frequency()
    }

    pub fn set_high_frequency(&self, value: f32, time: f64) {
        self.high.set_frequency(value, time);
    }

    pub fn high_gain(&self) -> f32 {
        self.high.gain()
    }

    pub fn set_high_gain(&self, value: f32, time: f64) {
        self.high.set_gain(value, time);
    }
}

impl_node!(Filter, Eq2);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Connection, OfflineContext};

    fn setup() -> (Arc<OfflineContext>, Context) {
        let host = Arc::new(OfflineContext::default());
        let ctx: Context = host.clone();
        (host, ctx)
    }

    #[test]
    fn test_filter_defaults() {
        let (host, ctx) = setup();
        let filter = Filter::new(&ctx, FilterOptions::default()).unwrap();

        assert_eq!(filter.frequency(), 11_000.0);
        assert_eq!(filter.q(), 0.0);
        assert_eq!(filter.filter_type(), FilterType::Lowpass);
        assert_eq!(
            host.settings(filter.unit()),
            vec![UnitSetting::FilterType(FilterType::Lowpass)]
        );
    }

    #[test]
    fn test_filter_type_change() {
        let (host, ctx) = setup();
        let mut filter = Filter::new(&ctx, FilterOptions::default()).unwrap();
        filter.set_filter_type(FilterType::Highpass);

        assert_eq!(filter.filter_type(), FilterType::Highpass);
        assert_eq!(
            host.settings(filter.unit()),
            vec![UnitSetting::FilterType(FilterType::Highpass)]
        );
    }

    #[test]
    fn test_eq2_chain() {
        let (host, ctx) = setup();
        let eq = Eq2::new(
            &ctx,
            Eq2Options {
                low_gain: -3.0,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(eq.low.filter_type(), FilterType::Lowshelf);
        assert_eq!(eq.high.filter_type(), FilterType::Highshelf);
        assert_eq!(eq.low_frequency(), 320.0);
        assert_eq!(eq.high_frequency(), 3200.0);
        assert_eq!(eq.low_gain(), -3.0);
        assert_eq!(
            host.connections(),
            vec![Connection::Unit {
                from: eq.low.unit(),
                to: eq.high.unit(),
                output: 0,
                input: 0,
            }]
        );
        assert_eq!(eq.params().get("high_gain"), Some(eq.high.gain));
    }
}
