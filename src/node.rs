// src/node.rs
//
// Composite node abstraction.
//
// A node exposes ordered input and output endpoints. Endpoints are primitive
// units, primitive parameters, or other nodes. Connecting two nodes flattens
// both sides down to primitives and wires every pair on the host.

use std::sync::Arc;

use log::error;

use crate::context::{Context, ParamId, UnitId};
use crate::error::{Error, RouteError};

// ═══════════════════════════════════════════════════════════════════
// Endpoints
// ═══════════════════════════════════════════════════════════════════

/// Anything a node can be connected to.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Unit(UnitId),
    Param(ParamId),
    Node(Arc<Ports>),
}

/// Anything that can appear in a node's output list.
#[derive(Debug, Clone)]
pub enum Source {
    Unit(UnitId),
    Node(Arc<Ports>),
}

/// A flattened, primitive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Unit(UnitId),
    Param(ParamId),
}

/// The endpoint lists of one node.
///
/// Built once during construction. Parents hold their children's ports by
/// `Arc`, so flattening never needs the child node itself.
#[derive(Debug)]
pub struct Ports {
    name: &'static str,
    inputs: Vec<Endpoint>,
    outputs: Vec<Source>,
}

impl Ports {
    pub fn new(name: &'static str, inputs: Vec<Endpoint>, outputs: Vec<Source>) -> Arc<Self> {
        Arc::new(Self {
            name,
            inputs,
            outputs,
        })
    }

    /// Ports of a node wrapping a single unit.
    pub fn unit(name: &'static str, unit: UnitId) -> Arc<Self> {
        Self::new(name, vec![Endpoint::Unit(unit)], vec![Source::Unit(unit)])
    }

    /// Ports of a single-unit source with nothing to connect into.
    pub fn source(name: &'static str, unit: UnitId) -> Arc<Self> {
        Self::new(name, Vec::new(), vec![Source::Unit(unit)])
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn inputs(&self) -> &[Endpoint] {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[Source] {
        &self.outputs
    }

    /// Primitive inputs, depth-first and left to right.
    ///
    /// Duplicates are kept: a primitive reachable through two paths appears
    /// twice.
    pub fn input_targets(&self) -> Vec<Target> {
        let mut targets = Vec::new();
        self.collect_inputs(&mut targets);
        targets
    }

    fn collect_inputs(&self, targets: &mut Vec<Target>) {
        for input in &self.inputs {
            match input {
                Endpoint::Unit(unit) => targets.push(Target::Unit(*unit)),
                Endpoint::Param(param) => targets.push(Target::Param(*param)),
                Endpoint::Node(ports) => ports.collect_inputs(targets),
            }
        }
    }

    /// Primitive outputs, depth-first and left to right.
    pub fn output_units(&self) -> Vec<UnitId> {
        let mut units = Vec::new();
        self.collect_outputs(&mut units);
        units
    }

    fn collect_outputs(&self, units: &mut Vec<UnitId>) {
        for output in &self.outputs {
            match output {
                Source::Unit(unit) => units.push(*unit),
                Source::Node(ports) => ports.collect_outputs(units),
            }
        }
    }
}

/// One or many endpoints.
#[derive(Debug, Clone)]
pub enum Destination {
    One(Endpoint),
    Many(Vec<Endpoint>),
}

impl Destination {
    pub fn endpoints(&self) -> &[Endpoint] {
        match self {
            Destination::One(endpoint) => std::slice::from_ref(endpoint),
            Destination::Many(endpoints) => endpoints,
        }
    }
}

impl From<Endpoint> for Destination {
    fn from(endpoint: Endpoint) -> Self {
        Destination::One(endpoint)
    }
}

impl From<UnitId> for Destination {
    fn from(unit: UnitId) -> Self {
        Destination::One(Endpoint::Unit(unit))
    }
}

impl From<ParamId> for Destination {
    fn from(param: ParamId) -> Self {
        Destination::One(Endpoint::Param(param))
    }
}

impl From<Vec<Endpoint>> for Destination {
    fn from(endpoints: Vec<Endpoint>) -> Self {
        Destination::Many(endpoints)
    }
}

impl From<Vec<ParamId>> for Destination {
    fn from(params: Vec<ParamId>) -> Self {
        Destination::Many(params.into_iter().map(Endpoint::Param).collect())
    }
}

impl<N: Node + ?Sized> From<&N> for Destination {
    fn from(node: &N) -> Self {
        Destination::One(node.endpoint())
    }
}

// ═══════════════════════════════════════════════════════════════════
// Params
// ═══════════════════════════════════════════════════════════════════

/// Named parameter handles of a node, in declaration order.
///
/// A name maps to several handles when the node fans out to voices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(&'static str, Vec<ParamId>)>,
}

impl Params {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with(self, name: &'static str, param: ParamId) -> Self {
        self.with_all(name, vec![param])
    }

    pub fn with_all(mut self, name: &'static str, params: Vec<ParamId>) -> Self {
        self.entries.push((name, params));
        self
    }

    /// First handle registered under `name`.
    pub fn get(&self, name: &str) -> Option<ParamId> {
        self.get_all(name).first().copied()
    }

    pub fn get_all(&self, name: &str) -> &[ParamId] {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, params)| params.as_slice())
            .unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static NO_PARAMS: Params = Params::new();

// ═══════════════════════════════════════════════════════════════════
// Node Trait
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Connect,
    Disconnect,
}

impl Op {
    fn verb(self) -> &'static str {
        match self {
            Op::Connect => "connect",
            Op::Disconnect => "disconnect",
        }
    }
}

/// A composite node.
///
/// Implementors provide their ports and context. Routing is shared:
/// connecting flattens the destination's inputs and pairs each of them with
/// each of this node's flattened outputs.
pub trait Node {
    fn context(&self) -> &Context;

    fn ports(&self) -> &Arc<Ports>;

    fn params(&self) -> &Params {
        &NO_PARAMS
    }

    fn name(&self) -> &'static str {
        self.ports().name()
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Node(self.ports().clone())
    }

    fn try_connect(
        &self,
        destination: &Destination,
        output: usize,
        input: usize,
    ) -> Result<(), RouteError> {
        connect_ports(self.context(), self.ports(), destination, output, input)
    }

    /// With no destination, every output connection is severed.
    fn try_disconnect(
        &self,
        destination: Option<&Destination>,
        output: usize,
        input: usize,
    ) -> Result<(), RouteError> {
        match destination {
            Some(destination) => route(
                self.context(),
                self.ports(),
                destination,
                output,
                input,
                Op::Disconnect,
            ),
            None => {
                let ctx = self.context();
                let failures = self
                    .ports()
                    .output_units()
                    .into_iter()
                    .filter_map(|unit| ctx.disconnect_all(unit).err())
                    .collect();
                RouteError::check(failures)
            }
        }
    }

    fn try_to_destination(&self) -> Result<(), RouteError> {
        let ctx = self.context();
        let destination = Destination::One(Endpoint::Unit(ctx.destination()));
        route(ctx, self.ports(), &destination, 0, 0, Op::Connect)
    }

    fn disconnect_all(&self) {
        if let Err(err) = self.try_disconnect(None, 0, 0) {
            report(self.name(), Op::Disconnect, &err);
        }
    }

    fn to_destination(&self) {
        if let Err(err) = self.try_to_destination() {
            report(self.name(), Op::Connect, &err);
        }
    }

    fn connect(&self, destination: impl Into<Destination>) -> &Self
    where
        Self: Sized,
    {
        self.connect_with(destination, 0, 0)
    }

    fn connect_with(
        &self,
        destination: impl Into<Destination>,
        output: usize,
        input: usize,
    ) -> &Self
    where
        Self: Sized,
    {
        if let Err(err) = self.try_connect(&destination.into(), output, input) {
            report(self.name(), Op::Connect, &err);
        }
        self
    }

    fn disconnect(&self, destination: impl Into<Destination>) -> &Self
    where
        Self: Sized,
    {
        self.disconnect_with(destination, 0, 0)
    }

    fn disconnect_with(
        &self,
        destination: impl Into<Destination>,
        output: usize,
        input: usize,
    ) -> &Self
    where
        Self: Sized,
    {
        if let Err(err) = self.try_disconnect(Some(&destination.into()), output, input) {
            report(self.name(), Op::Disconnect, &err);
        }
        self
    }
}

/// Implements `Node` for structs holding `ctx`, `ports` and `params` fields.
macro_rules! impl_node {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::node::Node for $ty {
                fn context(&self) -> &$crate::context::Context {
                    &self.ctx
                }

                fn ports(&self) -> &std::sync::Arc<$crate::node::Ports> {
                    &self.ports
                }

                fn params(&self) -> &$crate::node::Params {
                    &self.params
                }
            }
        )*
    };
}

pub(crate) use impl_node;

/// Connects each node to the next.
pub fn chain(nodes: &[&dyn Node]) {
    for pair in nodes.windows(2) {
        let destination = Destination::One(pair[1].endpoint());
        if let Err(err) = pair[0].try_connect(&destination, 0, 0) {
            report(pair[0].name(), Op::Connect, &err);
        }
    }
}

/// The shared connect algorithm, for implementors that narrow what they
/// accept before delegating.
pub(crate) fn connect_ports(
    ctx: &Context,
    ports: &Ports,
    destination: &Destination,
    output: usize,
    input: usize,
) -> Result<(), RouteError> {
    route(ctx, ports, destination, output, input, Op::Connect)
}

fn report(name: &str, op: Op, err: &RouteError) {
    for failure in &err.failures {
        error!("{name}: {} failed: {failure}", op.verb());
    }
}

fn route(
    ctx: &Context,
    ports: &Ports,
    destination: &Destination,
    output: usize,
    input: usize,
    op: Op,
) -> Result<(), RouteError> {
    let mut failures = Vec::new();
    for endpoint in destination.endpoints() {
        route_endpoint(ctx, ports, endpoint, output, input, op, &mut failures);
    }
    RouteError::check(failures)
}

fn route_endpoint(
    ctx: &Context,
    ports: &Ports,
    endpoint: &Endpoint,
    output: usize,
    input: usize,
    op: Op,
    failures: &mut Vec<Error>,
) {
    let targets = match endpoint {
        Endpoint::Unit(unit) => vec![Target::Unit(*unit)],
        Endpoint::Param(param) => vec![Target::Param(*param)],
        Endpoint::Node(dest) => {
            if dest.inputs().is_empty() {
                failures.push(Error::NoInputs(dest.name()));
                return;
            }
            dest.input_targets()
        }
    };

    let sources = ports.output_units();
    if sources.is_empty() {
        failures.push(Error::NoOutputs(ports.name()));
        return;
    }

    for target in targets {
        for &unit in &sources {
            let result = match (op, target) {
                (Op::Connect, Target::Unit(to)) => ctx.connect_unit(unit, to, output, input),
                (Op::Connect, Target::Param(param)) => ctx.connect_param(unit, param, output),
                (Op::Disconnect, Target::Unit(to)) => {
                    ctx.disconnect_unit(unit, to, output, input)
                }
                (Op::Disconnect, Target::Param(param)) => {
                    ctx.disconnect_param(unit, param, output)
                }
            };
            if let Err(err) = result {
                failures.push(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UnitKind;
    use crate::graph::{Connection, OfflineContext};

    struct Probe {
        ctx: Context,
        ports: Arc<Ports>,
    }

    impl Node for Probe {
        fn context(&self) -> &Context {
            &self.ctx
        }

        fn ports(&self) -> &Arc<Ports> {
            &self.ports
        }
    }

    fn setup() -> (Arc<OfflineContext>, Context) {
        let host = Arc::new(OfflineContext::default());
        let ctx: Context = host.clone();
        (host, ctx)
    }

    fn edge(from: UnitId, to: UnitId) -> Connection {
        Connection::Unit {
            from,
            to,
            output: 0,
            input: 0,
        }
    }

    #[test]
    fn test_flatten_nested_with_duplicates() {
        let a = UnitId(1);
        let b = UnitId(2);
        let p = ParamId(3);

        let inner = Ports::new(
            "inner",
            vec![Endpoint::Unit(a), Endpoint::Param(p)],
            vec![Source::Unit(b)],
        );
        let outer = Ports::new(
            "outer",
            vec![
                Endpoint::Node(inner.clone()),
                Endpoint::Unit(b),
                Endpoint::Node(inner.clone()),
            ],
            vec![Source::Node(inner.clone()), Source::Unit(a)],
        );

        assert_eq!(
            outer.input_targets(),
            vec![
                Target::Unit(a),
                Target::Param(p),
                Target::Unit(b),
                Target::Unit(a),
                Target::Param(p),
            ]
        );
        assert_eq!(outer.output_units(), vec![b, a]);
    }

    #[test]
    fn test_connect_matches_preflattened_order() {
        let (host, ctx) = setup();
        let s1 = ctx.create_unit(UnitKind::Gain);
        let s2 = ctx.create_unit(UnitKind::Gain);
        let d1 = ctx.create_unit(UnitKind::Gain);
        let d2 = ctx.create_unit(UnitKind::Gain);
        let d3 = ctx.create_unit(UnitKind::Gain);

        let src_inner = Ports::new("src_inner", vec![], vec![Source::Unit(s2)]);
        let source = Probe {
            ctx: ctx.clone(),
            ports: Ports::new(
                "source",
                vec![],
                vec![Source::Unit(s1), Source::Node(src_inner)],
            ),
        };
        let deepest = Ports::unit("deepest", d3);
        let middle = Ports::new(
            "middle",
            vec![Endpoint::Unit(d2), Endpoint::Node(deepest)],
            vec![],
        );
        let dest = Probe {
            ctx: ctx.clone(),
            ports: Ports::new(
                "dest",
                vec![Endpoint::Unit(d1), Endpoint::Node(middle)],
                vec![],
            ),
        };

        source.connect(&dest);

        // Destination inputs outer, own outputs inner
        assert_eq!(
            host.connections(),
            vec![
                edge(s1, d1),
                edge(s2, d1),
                edge(s1, d2),
                edge(s2, d2),
                edge(s1, d3),
                edge(s2, d3),
            ]
        );
    }

    #[test]
    fn test_connect_param_uses_param_form() {
        let (host, ctx) = setup();
        let src = ctx.create_unit(UnitKind::Oscillator);
        let gain = ctx.create_unit(UnitKind::Gain);
        let param = ctx.param(gain, "gain").unwrap();

        let node = Probe {
            ctx: ctx.clone(),
            ports: Ports::source("src", src),
        };
        node.connect(param);

        assert_eq!(
            host.connections(),
            vec![Connection::Param {
                from: src,
                param,
                output: 0
            }]
        );
    }

    #[test]
    fn test_sourceless_destination_rejected_batch_continues() {
        let (host, ctx) = setup();
        let src = ctx.create_unit(UnitKind::Gain);
        let sink = ctx.create_unit(UnitKind::Gain);
        let osc = ctx.create_unit(UnitKind::Oscillator);

        let node = Probe {
            ctx: ctx.clone(),
            ports: Ports::unit("gain", src),
        };
        let source_only = Probe {
            ctx: ctx.clone(),
            ports: Ports::source("osc", osc),
        };

        let err = node
            .try_connect(
                &Destination::Many(vec![source_only.endpoint(), Endpoint::Unit(sink)]),
                0,
                0,
            )
            .unwrap_err();

        assert_eq!(err.failures, vec![Error::NoInputs("osc")]);
        assert_eq!(host.connections(), vec![edge(src, sink)]);
    }

    #[test]
    fn test_outputless_node_reports() {
        let (_host, ctx) = setup();
        let sink = ctx.create_unit(UnitKind::Gain);
        let node = Probe {
            ctx: ctx.clone(),
            ports: Ports::new("terminal", vec![Endpoint::Unit(sink)], vec![]),
        };

        let err = node.try_to_destination().unwrap_err();
        assert_eq!(err.failures, vec![Error::NoOutputs("terminal")]);
    }

    #[test]
    fn test_to_destination_flattens_outputs() {
        let (host, ctx) = setup();
        let a = ctx.create_unit(UnitKind::Gain);
        let b = ctx.create_unit(UnitKind::Gain);
        let inner = Ports::unit("inner", b);
        let node = Probe {
            ctx: ctx.clone(),
            ports: Ports::new("outer", vec![], vec![Source::Unit(a), Source::Node(inner)]),
        };

        node.to_destination();
        let out = ctx.destination();
        assert_eq!(host.connections(), vec![edge(a, out), edge(b, out)]);
    }

    #[test]
    fn test_disconnect_mirrors_connect() {
        let (host, ctx) = setup();
        let a = ctx.create_unit(UnitKind::Gain);
        let b = ctx.create_unit(UnitKind::Gain);
        let c = ctx.create_unit(UnitKind::Gain);

        let node = Probe {
            ctx: ctx.clone(),
            ports: Ports::unit("a", a),
        };
        node.connect(b).connect(c);
        node.disconnect(b);
        assert_eq!(host.connections(), vec![edge(a, c)]);

        node.disconnect_all();
        assert!(host.connections().is_empty());

        let err = node.try_disconnect(Some(&b.into()), 0, 0).unwrap_err();
        assert!(matches!(err.failures[0], Error::NotConnected { .. }));
    }

    #[test]
    fn test_chain() {
        let (host, ctx) = setup();
        let units: Vec<UnitId> = (0..3).map(|_| ctx.create_unit(UnitKind::Gain)).collect();
        let nodes: Vec<Probe> = units
            .iter()
            .map(|&u| Probe {
                ctx: ctx.clone(),
                ports: Ports::unit("gain", u),
            })
            .collect();

        chain(&[&nodes[0], &nodes[1], &nodes[2]]);
        assert_eq!(
            host.connections(),
            vec![edge(units[0], units[1]), edge(units[1], units[2])]
        );
    }

    #[test]
    fn test_params_lookup() {
        let params = Params::new()
            .with("gain", ParamId(4))
            .with_all("frequency", vec![ParamId(1), ParamId(2)]);

        assert_eq!(params.get("gain"), Some(ParamId(4)));
        assert_eq!(params.get_all("frequency"), &[ParamId(1), ParamId(2)]);
        assert!(params.get_all("q").is_empty());
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["gain", "frequency"]);
    }
}
