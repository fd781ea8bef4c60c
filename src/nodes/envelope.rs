// Envelope generators.
//
// An envelope is a started constant source whose offset is scheduled in
// segments. The phase is explicit, and the one deferred step (attack into
// decay) lives in a single `PendingTask` that every trigger cancels first.

use std::sync::Arc;

use log::{trace, warn};

use crate::context::{Context, FilterType, ParamId};
use crate::error::{Error, Result, RouteError};
use crate::node::{Destination, Endpoint, Node, Params, Ports, Source, connect_ports, impl_node};
use crate::scheduler::PendingTask;

use super::filters::{Filter, FilterOptions};
use super::oscillators::{ConstantSource, ConstantSourceOptions};
use super::utility::{Gain, GainOptions};

// ═══════════════════════════════════════════════════════════════════
// ADSR Envelope
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopePhase {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeOptions {
    /// Seconds.
    pub attack: f64,
    /// Seconds.
    pub decay: f64,
    pub sustain: f32,
    /// Seconds.
    pub release: f64,
    /// Peak level; the sustain plateau is `sustain * modifier`.
    pub modifier: f32,
}

impl Default for EnvelopeOptions {
    fn default() -> Self {
        Self {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.0,
            modifier: 1.0,
        }
    }
}

/// General-purpose ADSR modulation source.
///
/// Only parameters are valid destinations.
pub struct Envelope {
    ctx: Context,
    ports: Arc<Ports>,
    source: ConstantSource,
    attack: f64,
    decay: f64,
    sustain: f32,
    release: f64,
    modifier: f32,
    phase: EnvelopePhase,
    phase_start: f64,
    decay_task: PendingTask,
}

impl Envelope {
    pub fn new(ctx: &Context, options: EnvelopeOptions) -> Result<Self> {
        let source = ConstantSource::new(
            ctx,
            ConstantSourceOptions {
                offset: 0.0,
                start: true,
            },
        )?;

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::new(
                "Envelope",
                Vec::new(),
                vec![Source::Node(source.ports().clone())],
            ),
            source,
            attack: options.attack,
            decay: options.decay,
            sustain: options.sustain,
            release: options.release,
            modifier: options.modifier,
            phase: EnvelopePhase::Idle,
            phase_start: ctx.current_time(),
            decay_task: PendingTask::new(),
        })
    }

    /// The offset parameter being shaped.
    pub fn offset_param(&self) -> ParamId {
        self.source.offset_param()
    }

    /// Current output level.
    pub fn level(&self) -> f32 {
        self.source.offset()
    }

    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.decay_task.is_pending()
    }

    pub fn attack(&self) -> f64 {
        self.attack
    }

    pub fn set_attack(&mut self, attack: f64) {
        self.attack = attack;
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn set_decay(&mut self, decay: f64) {
        self.decay = decay;
    }

    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    pub fn set_sustain(&mut self, sustain: f32) {
        self.sustain = sustain;
    }

    pub fn release(&self) -> f64 {
        self.release
    }

    pub fn set_release(&mut self, release: f64) {
        self.release = release;
    }

    pub fn modifier(&self) -> f32 {
        self.modifier
    }

    pub fn set_modifier(&mut self, modifier: f32) {
        self.modifier = modifier;
    }

    #[inline]
    fn plateau(&self) -> f32 {
        self.sustain * self.modifier
    }

    fn set_offset(&self, value: f32, time: f64) {
        self.source.set_offset(value, time);
    }

    /// Begin the decay at `at`, the moment the attack ended.
    fn decay_from(&mut self, at: f64) {
        let param = self.source.offset_param();
        let plateau = self.plateau();
        let scheduled = if self.decay > 0.0 {
            self.ctx.set_target_at_time(param, plateau, at, self.decay)
        } else {
            self.ctx.set_value_at_time(param, plateau, at)
        };
        if let Err(err) = scheduled {
            warn!("{}: decay dropped: {err}", self.ports.name());
        }
        let phase = if self.decay > 0.0 {
            EnvelopePhase::Decay
        } else {
            EnvelopePhase::Sustain
        };
        self.enter(phase, at);
    }

    fn enter(&mut self, phase: EnvelopePhase, at: f64) {
        if self.phase != phase {
            trace!("{}: {:?} -> {:?}", self.ports.name(), self.phase, phase);
        }
        self.phase = phase;
        self.phase_start = at;
    }

    /// Start the attack; decay follows once `poll` sees the attack time pass.
    pub fn trigger_attack(&mut self) {
        self.decay_task.cancel();
        let now = self.ctx.current_time();

        if self.attack > 0.0 {
            self.set_offset(0.0, 0.0);
            self.set_offset(self.modifier, self.attack);
            self.decay_task.arm(now + self.attack);
            self.enter(EnvelopePhase::Attack, now);
        } else if self.decay > 0.0 {
            self.set_offset(self.modifier, 0.0);
            self.set_offset(self.plateau(), self.decay);
            self.enter(EnvelopePhase::Decay, now);
        } else {
            // A zero plateau schedules nothing and stays silent.
            if self.sustain != 0.0 {
                self.set_offset(self.plateau(), 0.0);
            }
            self.enter(EnvelopePhase::Sustain, now);
        }
    }

    pub fn trigger_release(&mut self) {
        self.decay_task.cancel();
        let now = self.ctx.current_time();
        self.set_offset(0.0, self.release);

        let phase = if self.release > 0.0 {
            EnvelopePhase::Release
        } else {
            EnvelopePhase::Idle
        };
        self.enter(phase, now);
    }

    /// Drop to zero immediately.
    pub fn trigger_stop(&mut self) {
        self.decay_task.cancel();
        let now = self.ctx.current_time();
        self.set_offset(0.0, 0.0);
        self.enter(EnvelopePhase::Idle, now);
    }

    /// Advance against the host clock. Fires the attack-to-decay handoff
    /// when it is due and settles the decay and release phases.
    pub fn poll(&mut self) -> EnvelopePhase {
        let now = self.ctx.current_time();

        if let Some(at) = self.decay_task.take_due(now) {
            self.decay_from(at);
        }

        match self.phase {
            EnvelopePhase::Decay if now - self.phase_start >= self.decay => {
                self.enter(EnvelopePhase::Sustain, now);
            }
            EnvelopePhase::Release if now - self.phase_start >= self.release => {
                self.enter(EnvelopePhase::Idle, now);
            }
            _ => {}
        }
        self.phase
    }
}

impl Node for Envelope {
    fn context(&self) -> &Context {
        &self.ctx
    }

    fn ports(&self) -> &Arc<Ports> {
        &self.ports
    }

    /// Rejects the whole call unless every endpoint is a parameter.
    fn try_connect(
        &self,
        destination: &Destination,
        output: usize,
        input: usize,
    ) -> std::result::Result<(), RouteError> {
        let all_params = destination
            .endpoints()
            .iter()
            .all(|e| matches!(e, Endpoint::Param(_)));
        if !all_params {
            return Err(Error::EnvelopeDestination(self.ports.name()).into());
        }
        connect_ports(&self.ctx, &self.ports, destination, output, input)
    }
}

/// Access to the envelope inside a composite.
///
/// Provides the trigger and timing methods for every envelope flavor.
pub trait EnvelopeControl {
    fn envelope(&self) -> &Envelope;

    fn envelope_mut(&mut self) -> &mut Envelope;

    fn trigger_attack(&mut self) {
        self.envelope_mut().trigger_attack();
    }

    fn trigger_release(&mut self) {
        self.envelope_mut().trigger_release();
    }

    fn trigger_stop(&mut self) {
        self.envelope_mut().trigger_stop();
    }

    fn poll(&mut self) -> EnvelopePhase {
        self.envelope_mut().poll()
    }

    fn phase(&self) -> EnvelopePhase {
        self.envelope().phase()
    }

    fn set_adsr(&mut self, options: EnvelopeOptions) {
        let envelope = self.envelope_mut();
        envelope.set_attack(options.attack);
        envelope.set_decay(options.decay);
        envelope.set_sustain(options.sustain);
        envelope.set_release(options.release);
        envelope.set_modifier(options.modifier);
    }
}

impl EnvelopeControl for Envelope {
    fn envelope(&self) -> &Envelope {
        self
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        self
    }
}

// ═══════════════════════════════════════════════════════════════════
// GainEnvelope
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEnvelopeOptions {
    /// Base gain the envelope is added to.
    pub gain: f32,
    pub envelope: EnvelopeOptions,
}

impl Default for GainEnvelopeOptions {
    fn default() -> Self {
        Self {
            gain: 0.0,
            envelope: EnvelopeOptions::default(),
        }
    }
}

/// An envelope driving the gain of the signal passing through it.
pub struct GainEnvelope {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    envelope: Envelope,
    gain: Gain,
}

impl GainEnvelope {
    pub fn new(ctx: &Context, options: GainEnvelopeOptions) -> Result<Self> {
        let envelope = Envelope::new(ctx, options.envelope)?;
        let gain = Gain::new(ctx, GainOptions { gain: options.gain })?;
        envelope.connect(gain.gain_param());

        let ports = Ports::new(
            "GainEnvelope",
            vec![Endpoint::Node(gain.ports().clone())],
            vec![Source::Node(gain.ports().clone())],
        );
        Ok(Self {
            ctx: ctx.clone(),
            ports,
            params: Params::new().with("gain", gain.gain_param()),
            envelope,
            gain,
        })
    }

    pub fn gain(&self) -> f32 {
        self.gain.gain()
    }

    pub fn set_gain(&self, value: f32, time: f64) {
        self.gain.set_gain(value, time);
    }
}

impl EnvelopeControl for GainEnvelope {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }
}

// ═══════════════════════════════════════════════════════════════════
// FilterEnvelope
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterEnvelopeOptions {
    pub filter: FilterOptions,
    pub envelope: EnvelopeOptions,
}

impl Default for FilterEnvelopeOptions {
    fn default() -> Self {
        Self {
            filter: FilterOptions {
                frequency: 2000.0,
                ..Default::default()
            },
            envelope: EnvelopeOptions::default(),
        }
    }
}

/// An envelope sweeping the cutoff of the filter the signal passes through.
pub struct FilterEnvelope {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    envelope: Envelope,
    filter: Filter,
}

impl FilterEnvelope {
    pub fn new(ctx: &Context, options: FilterEnvelopeOptions) -> Result<Self> {
        let envelope = Envelope::new(ctx, options.envelope)?;
        let filter = Filter::new(ctx, options.filter)?;
        envelope.connect(filter.frequency_param());

        let filter_params = filter.params();
        let params = Params::new()
            .with_all("detune", filter_params.get_all("detune").to_vec())
            .with_all("frequency", filter_params.get_all("frequency").to_vec())
            .with_all("gain", filter_params.get_all("gain").to_vec())
            .with_all("q", filter_params.get_all("q").to_vec());
        let ports = Ports::new(
            "FilterEnvelope",
            vec![Endpoint::Node(filter.ports().clone())],
            vec![Source::Node(filter.ports().clone())],
        );

        Ok(Self {
            ctx: ctx.clone(),
            ports,
            params,
            envelope,
            filter,
        })
    }

    pub fn frequency(&self) -> f32 {
        self.filter.frequency()
    }

    pub fn set_frequency(&self, value: f32, time: f64) {
        self.filter.set_frequency(value, time);
    }

    pub fn q(&self) -> f32 {
        self.filter.q()
    }

    pub fn set_q(&self, value: f32, time: f64) {
        self.filter.set_q(value, time);
    }

    pub fn detune(&self) -> f32 {
        self.filter.detune()
    }

    pub fn set_detune(&self, value: f32, time: f64) {
        self.filter.set_detune(value, time);
    }

    pub fn gain(&self) -> f32 {
        self.filter.gain()
    }

    pub fn set_gain(&self, value: f32, time: f64) {
        self.filter.set_gain(value, time);
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter.filter_type()
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter.set_filter_type(filter_type);
    }
}

impl EnvelopeControl for FilterEnvelope {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }
}

impl_node!(GainEnvelope, FilterEnvelope);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AudioContext;
    use crate::graph::{Connection, OfflineContext};
    use crate::parameter::Automation;

    fn setup() -> (Arc<OfflineContext>, Context) {
        let host = Arc::new(OfflineContext::default());
        let ctx: Context = host.clone();
        (host, ctx)
    }

    fn adsr() -> EnvelopeOptions {
        EnvelopeOptions {
            attack: 0.1,
            decay: 0.1,
            sustain: 0.5,
            release: 0.2,
            modifier: 1.0,
        }
    }

    #[test]
    fn test_envelope_starts_silent() {
        let (host, ctx) = setup();
        let env = Envelope::new(&ctx, EnvelopeOptions::default()).unwrap();

        assert_eq!(env.level(), 0.0);
        assert_eq!(env.phase(), EnvelopePhase::Idle);
        assert!(host.is_started(env.source.unit()));
    }

    #[test]
    fn test_attack_hands_off_to_decay() {
        let (host, ctx) = setup();
        let mut env = Envelope::new(&ctx, adsr()).unwrap();

        env.trigger_attack();
        assert_eq!(env.phase(), EnvelopePhase::Attack);
        assert!(env.is_pending());

        host.advance(0.05);
        assert_eq!(env.poll(), EnvelopePhase::Attack);

        host.advance(0.05);
        assert_eq!(env.poll(), EnvelopePhase::Decay);
        assert!(!env.is_pending());

        let events = host.automation(env.offset_param());
        assert_eq!(
            events.last(),
            Some(&Automation::SetTarget {
                target: 0.5,
                start: host.current_time(),
                time_constant: 0.1,
            })
        );

        host.advance(0.15);
        assert_eq!(env.poll(), EnvelopePhase::Sustain);
    }

    #[test]
    fn test_late_poll_decays_from_attack_end() {
        let (host, ctx) = setup();
        let mut env = Envelope::new(&ctx, adsr()).unwrap();

        env.trigger_attack();
        host.advance(0.5);
        assert_eq!(env.poll(), EnvelopePhase::Sustain);

        let events = host.automation(env.offset_param());
        assert_eq!(
            events.last(),
            Some(&Automation::SetTarget {
                target: 0.5,
                start: 0.1,
                time_constant: 0.1,
            })
        );
    }

    #[test]
    fn test_late_poll_without_decay_steps_at_attack_end() {
        let (host, ctx) = setup();
        let mut env = Envelope::new(
            &ctx,
            EnvelopeOptions {
                decay: 0.0,
                ..adsr()
            },
        )
        .unwrap();

        env.trigger_attack();
        host.advance(0.3);
        assert_eq!(env.poll(), EnvelopePhase::Sustain);

        let events = host.automation(env.offset_param());
        assert_eq!(
            events.last(),
            Some(&Automation::SetValue {
                value: 0.5,
                time: 0.1,
            })
        );
    }

    #[test]
    fn test_release_cancels_pending_decay() {
        let (host, ctx) = setup();
        let mut env = Envelope::new(&ctx, adsr()).unwrap();

        env.trigger_attack();
        env.trigger_release();
        assert_eq!(env.phase(), EnvelopePhase::Release);

        host.advance(1.0);
        env.poll();

        let events = host.automation(env.offset_param());
        assert!(matches!(
            events.last(),
            Some(Automation::SetTarget { target, time_constant, .. })
                if *target == 0.0 && *time_constant == 0.2
        ));
        assert!(events.iter().all(|e| e.value() != 0.5));
        assert_eq!(env.phase(), EnvelopePhase::Idle);
    }

    #[test]
    fn test_stop_cancels_and_zeroes() {
        let (host, ctx) = setup();
        let mut env = Envelope::new(&ctx, adsr()).unwrap();

        env.trigger_attack();
        env.trigger_stop();
        host.advance(1.0);

        assert_eq!(env.poll(), EnvelopePhase::Idle);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn test_retrigger_replaces_pending_handoff() {
        let (host, ctx) = setup();
        let mut env = Envelope::new(&ctx, adsr()).unwrap();

        env.trigger_attack();
        host.advance(0.08);
        env.trigger_attack();

        // The first handoff would have been due here
        host.advance(0.04);
        assert_eq!(env.poll(), EnvelopePhase::Attack);

        host.advance(0.1);
        assert_eq!(env.poll(), EnvelopePhase::Decay);
    }

    #[test]
    fn test_decay_only_jumps_to_peak() {
        let (host, ctx) = setup();
        let mut env = Envelope::new(
            &ctx,
            EnvelopeOptions {
                decay: 0.2,
                sustain: 0.25,
                modifier: 2.0,
                ..Default::default()
            },
        )
        .unwrap();

        env.trigger_attack();
        assert_eq!(env.phase(), EnvelopePhase::Decay);
        assert!(!env.is_pending());

        let events = host.automation(env.offset_param());
        let tail: Vec<f32> = events.iter().rev().take(2).map(|e| e.value()).collect();
        assert_eq!(tail, vec![0.5, 2.0]);
    }

    #[test]
    fn test_zero_sustain_schedules_nothing() {
        let (host, ctx) = setup();
        let mut env = Envelope::new(
            &ctx,
            EnvelopeOptions {
                sustain: 0.0,
                ..Default::default()
            },
        )
        .unwrap();

        let before = host.automation(env.offset_param()).len();
        env.trigger_attack();
        assert_eq!(host.automation(env.offset_param()).len(), before);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn test_instant_sustain() {
        let (_host, ctx) = setup();
        let mut env = Envelope::new(
            &ctx,
            EnvelopeOptions {
                sustain: 0.5,
                modifier: 0.5,
                ..Default::default()
            },
        )
        .unwrap();

        env.trigger_attack();
        assert_eq!(env.level(), 0.25);
        assert_eq!(env.phase(), EnvelopePhase::Sustain);
    }

    #[test]
    fn test_envelope_rejects_non_params() {
        let (host, ctx) = setup();
        let env = Envelope::new(&ctx, EnvelopeOptions::default()).unwrap();
        let gain = Gain::new(&ctx, GainOptions::default()).unwrap();

        let err = env.try_connect(&(&gain).into(), 0, 0).unwrap_err();
        assert_eq!(err.failures, vec![Error::EnvelopeDestination("Envelope")]);

        // One bad endpoint rejects the whole batch
        let mixed = Destination::Many(vec![
            Endpoint::Param(gain.gain_param()),
            Endpoint::Unit(gain.unit()),
        ]);
        assert!(env.try_connect(&mixed, 0, 0).is_err());
        assert!(host.connections().is_empty());

        env.connect(gain.gain_param());
        assert_eq!(host.connections().len(), 1);
    }

    #[test]
    fn test_gain_envelope_wiring() {
        let (host, ctx) = setup();
        let env = GainEnvelope::new(&ctx, GainEnvelopeOptions::default()).unwrap();

        assert_eq!(env.gain(), 0.0);
        assert_eq!(
            host.connections(),
            vec![Connection::Param {
                from: env.envelope.source.unit(),
                param: env.gain.gain_param(),
                output: 0,
            }]
        );

        // Composite envelopes route like any other node
        let sink = Gain::new(&ctx, GainOptions::default()).unwrap();
        assert!(env.try_connect(&(&sink).into(), 0, 0).is_ok());
    }

    #[test]
    fn test_filter_envelope_defaults() {
        let (host, ctx) = setup();
        let mut env = FilterEnvelope::new(&ctx, FilterEnvelopeOptions::default()).unwrap();

        assert_eq!(env.frequency(), 2000.0);
        assert_eq!(env.q(), 0.0);
        assert_eq!(env.filter_type(), FilterType::Lowpass);
        assert_eq!(env.params().get("frequency"), Some(env.filter.frequency_param()));
        assert!(host.is_connected(Connection::Param {
            from: env.envelope.source.unit(),
            param: env.filter.frequency_param(),
            output: 0,
        }));

        env.set_adsr(EnvelopeOptions {
            attack: 0.5,
            ..Default::default()
        });
        env.trigger_attack();
        assert_eq!(env.phase(), EnvelopePhase::Attack);
    }
}
