//! In-process host that records the unit graph instead of rendering it.
//!
//! `OfflineContext` keeps every unit, connection, unit setting and parameter
//! automation event it is handed, evaluates parameter timelines against a
//! manually advanced clock, and exposes all of it for inspection. It is the
//! default global context and the host every test runs against.

use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::context::{AudioContext, ParamId, UnitId, UnitKind, UnitSetting};
use crate::error::{Error, Result};
use crate::parameter::{Automation, ParamTimeline};

/// A primitive-to-primitive edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Unit {
        from: UnitId,
        to: UnitId,
        output: usize,
        input: usize,
    },
    Param {
        from: UnitId,
        param: ParamId,
        output: usize,
    },
}

impl Connection {
    #[inline]
    pub fn from(&self) -> UnitId {
        match *self {
            Connection::Unit { from, .. } | Connection::Param { from, .. } => from,
        }
    }
}

struct UnitEntry {
    kind: UnitKind,
    params: Vec<ParamId>,
    settings: Vec<UnitSetting>,
    started: Option<f64>,
    stopped: Option<f64>,
}

struct ParamEntry {
    unit: UnitId,
    name: &'static str,
    timeline: ParamTimeline,
}

struct Inner {
    time: f64,
    running: bool,
    units: Vec<UnitEntry>,
    params: Vec<ParamEntry>,
    connections: Vec<Connection>,
}

impl Inner {
    fn unit(&self, id: UnitId) -> Result<&UnitEntry> {
        self.units.get(id.0 as usize).ok_or(Error::UnknownUnit(id))
    }

    fn unit_mut(&mut self, id: UnitId) -> Result<&mut UnitEntry> {
        self.units
            .get_mut(id.0 as usize)
            .ok_or(Error::UnknownUnit(id))
    }

    fn timeline_mut(&mut self, id: ParamId) -> Result<&mut ParamTimeline> {
        self.params
            .get_mut(id.0 as usize)
            .map(|p| &mut p.timeline)
            .ok_or(Error::UnknownParam(id))
    }

    fn check_output(&self, from: UnitId, output: usize) -> Result<()> {
        let kind = self.unit(from)?.kind;
        if output >= kind.output_count() {
            return Err(Error::PortOutOfRange {
                kind: kind.name(),
                direction: "output",
                index: output,
            });
        }
        Ok(())
    }

    fn add(&mut self, connection: Connection) {
        // Repeating an existing edge is a no-op on a real graph engine.
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
        }
    }

    fn remove(&mut self, connection: Connection, to: String) -> Result<()> {
        let before = self.connections.len();
        self.connections.retain(|c| *c != connection);
        if self.connections.len() == before {
            return Err(Error::NotConnected {
                from: connection.from(),
                to,
            });
        }
        Ok(())
    }
}

/// Recording host with a manual clock.
pub struct OfflineContext {
    sample_rate: f32,
    destination: UnitId,
    inner: Mutex<Inner>,
}

impl OfflineContext {
    pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;

    pub fn new(sample_rate: f32) -> Self {
        let destination = UnitEntry {
            kind: UnitKind::Destination,
            params: Vec::new(),
            settings: Vec::new(),
            started: None,
            stopped: None,
        };
        Self {
            sample_rate,
            destination: UnitId(0),
            inner: Mutex::new(Inner {
                time: 0.0,
                running: false,
                units: vec![destination],
                params: Vec::new(),
                connections: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ───────────────────────────────────────────────────────────────
    // Clock
    // ───────────────────────────────────────────────────────────────

    /// Move the clock to `time`. The clock never runs backwards.
    pub fn set_time(&self, time: f64) {
        let mut inner = self.lock();
        inner.time = inner.time.max(time);
    }

    pub fn advance(&self, seconds: f64) {
        let mut inner = self.lock();
        inner.time += seconds.max(0.0);
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    // ───────────────────────────────────────────────────────────────
    // Inspection
    // ───────────────────────────────────────────────────────────────

    /// Every live edge, in the order it was first made.
    pub fn connections(&self) -> Vec<Connection> {
        self.lock().connections.clone()
    }

    pub fn connections_from(&self, unit: UnitId) -> Vec<Connection> {
        self.lock()
            .connections
            .iter()
            .filter(|c| c.from() == unit)
            .copied()
            .collect()
    }

    pub fn is_connected(&self, connection: Connection) -> bool {
        self.lock().connections.contains(&connection)
    }

    /// Scheduled events for `param`, in call order.
    pub fn automation(&self, param: ParamId) -> Vec<Automation> {
        self.lock()
            .params
            .get(param.0 as usize)
            .map(|p| p.timeline.events().to_vec())
            .unwrap_or_default()
    }

    pub fn settings(&self, unit: UnitId) -> Vec<UnitSetting> {
        self.lock()
            .units
            .get(unit.0 as usize)
            .map(|u| u.settings.clone())
            .unwrap_or_default()
    }

    pub fn unit_kind(&self, unit: UnitId) -> Option<UnitKind> {
        self.lock().units.get(unit.0 as usize).map(|u| u.kind)
    }

    /// Owning unit and name of a parameter.
    pub fn param_info(&self, param: ParamId) -> Option<(UnitId, &'static str)> {
        self.lock()
            .params
            .get(param.0 as usize)
            .map(|p| (p.unit, p.name))
    }

    /// True once `start` was called and `stop` was not.
    pub fn is_started(&self, unit: UnitId) -> bool {
        self.lock()
            .units
            .get(unit.0 as usize)
            .is_some_and(|u| u.started.is_some() && u.stopped.is_none())
    }

    pub fn unit_count(&self) -> usize {
        self.lock().units.len()
    }
}

impl Default for OfflineContext {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAMPLE_RATE)
    }
}

impl AudioContext for OfflineContext {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.lock().time
    }

    fn destination(&self) -> UnitId {
        self.destination
    }

    fn create_unit(&self, kind: UnitKind) -> UnitId {
        let mut inner = self.lock();
        let id = UnitId(inner.units.len() as u32);

        let mut params = Vec::with_capacity(kind.param_defaults().len());
        for &(name, default) in kind.param_defaults() {
            let param = ParamId(inner.params.len() as u32);
            inner.params.push(ParamEntry {
                unit: id,
                name,
                timeline: ParamTimeline::new(default),
            });
            params.push(param);
        }

        inner.units.push(UnitEntry {
            kind,
            params,
            settings: Vec::new(),
            started: None,
            stopped: None,
        });
        log::trace!("created {kind} unit {id:?}");
        id
    }

    fn param(&self, unit: UnitId, name: &str) -> Result<ParamId> {
        let inner = self.lock();
        inner
            .unit(unit)?
            .params
            .iter()
            .copied()
            .find(|p| inner.params[p.0 as usize].name == name)
            .ok_or_else(|| Error::NoSuchParam {
                unit,
                name: name.to_string(),
            })
    }

    fn param_value(&self, param: ParamId) -> Option<f32> {
        let inner = self.lock();
        inner
            .params
            .get(param.0 as usize)
            .map(|p| p.timeline.value_at(inner.time))
    }

    fn set_value_at_time(&self, param: ParamId, value: f32, time: f64) -> Result<()> {
        self.lock()
            .timeline_mut(param)?
            .set_value_at_time(value, time);
        Ok(())
    }

    fn set_target_at_time(
        &self,
        param: ParamId,
        target: f32,
        start: f64,
        time_constant: f64,
    ) -> Result<()> {
        self.lock()
            .timeline_mut(param)?
            .set_target_at_time(target, start, time_constant);
        Ok(())
    }

    fn configure(&self, unit: UnitId, setting: UnitSetting) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner.unit_mut(unit)?;
        if !entry.kind.accepts(&setting) {
            return Err(Error::UnsupportedSetting {
                kind: entry.kind.name(),
                setting: setting.name(),
            });
        }
        entry
            .settings
            .retain(|s| mem::discriminant(s) != mem::discriminant(&setting));
        entry.settings.push(setting);
        Ok(())
    }

    fn connect_unit(&self, from: UnitId, to: UnitId, output: usize, input: usize) -> Result<()> {
        let mut inner = self.lock();
        inner.check_output(from, output)?;
        let kind = inner
            .unit(to)
            .map_err(|_| Error::InvalidDestination(format!("{to:?}")))?
            .kind;
        if input >= kind.input_count() {
            return Err(Error::PortOutOfRange {
                kind: kind.name(),
                direction: "input",
                index: input,
            });
        }
        inner.add(Connection::Unit {
            from,
            to,
            output,
            input,
        });
        Ok(())
    }

    fn connect_param(&self, from: UnitId, param: ParamId, output: usize) -> Result<()> {
        let mut inner = self.lock();
        inner.check_output(from, output)?;
        if inner.params.get(param.0 as usize).is_none() {
            return Err(Error::InvalidDestination(format!("{param:?}")));
        }
        inner.add(Connection::Param {
            from,
            param,
            output,
        });
        Ok(())
    }

    fn disconnect_all(&self, from: UnitId) -> Result<()> {
        let mut inner = self.lock();
        inner.unit(from)?;
        inner.connections.retain(|c| c.from() != from);
        Ok(())
    }

    fn disconnect_unit(
        &self,
        from: UnitId,
        to: UnitId,
        output: usize,
        input: usize,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.unit(from)?;
        inner.remove(
            Connection::Unit {
                from,
                to,
                output,
                input,
            },
            format!("{to:?}"),
        )
    }

    fn disconnect_param(&self, from: UnitId, param: ParamId, output: usize) -> Result<()> {
        let mut inner = self.lock();
        inner.unit(from)?;
        inner.remove(
            Connection::Param {
                from,
                param,
                output,
            },
            format!("{param:?}"),
        )
    }

    fn start(&self, unit: UnitId, when: f64) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner.unit_mut(unit)?;
        if !entry.kind.is_source() {
            return Err(Error::UnsupportedSetting {
                kind: entry.kind.name(),
                setting: "start",
            });
        }
        entry.started.get_or_insert(when);
        Ok(())
    }

    fn stop(&self, unit: UnitId, when: f64) -> Result<()> {
        let mut inner = self.lock();
        let entry = inner.unit_mut(unit)?;
        if !entry.kind.is_source() {
            return Err(Error::UnsupportedSetting {
                kind: entry.kind.name(),
                setting: "stop",
            });
        }
        entry.stopped = Some(when);
        Ok(())
    }

    fn resume(&self) {
        self.lock().running = true;
    }
}
