// FM operator topologies.
//
// Each entry clears the four modulators' outputs, wires one graph and
// returns its label. `a > b` means `a` modulates the frequency of `b`;
// `+` means both reach the same place.

use crate::node::{Destination, Endpoint, Node};
use crate::nodes::oscillators::Osc;
use crate::nodes::utility::Limiter;

pub type Algorithm = fn(&Osc, &Osc, &Osc, &Osc, &Limiter) -> &'static str;

fn clear(mods: [&Osc; 4]) {
    for m in mods {
        m.disconnect_all();
    }
}

fn fm(carriers: &[&Osc]) -> Destination {
    Destination::Many(
        carriers
            .iter()
            .map(|osc| Endpoint::Param(osc.frequency_param()))
            .collect(),
    )
}

pub static ALGORITHMS: [Algorithm; 19] = [
    // - Standard -
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[b]));
        b.connect(fm(&[c]));
        c.connect(fm(&[d]));
        d.connect(out);
        "A > B > C > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[c]));
        b.connect(fm(&[c]));
        c.connect(fm(&[d]));
        d.connect(out);
        "[A + B] > C > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[b]));
        b.connect(fm(&[d]));
        c.connect(fm(&[d]));
        d.connect(out);
        "[A > B + C] > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[b, c]));
        b.connect(fm(&[d]));
        c.connect(fm(&[d]));
        d.connect(out);
        "[[A > B] + [A > C]] > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[b]));
        b.connect(fm(&[c, d]));
        c.connect(out);
        d.connect(out);
        "[A > B > C] + [A > B > D]"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[b]));
        b.connect(fm(&[c]));
        c.connect(out);
        d.connect(out);
        "[A > B > C] + D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[d]));
        b.connect(fm(&[d]));
        c.connect(fm(&[d]));
        d.connect(out);
        "[A + B + C] > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[b]));
        b.connect(out);
        c.connect(fm(&[d]));
        d.connect(out);
        "[A > B] + [C > D]"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[b, c, d]));
        b.connect(out);
        c.connect(out);
        d.connect(out);
        "[A > B] + [A > C] + [A > D]"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[b]));
        b.connect(out);
        c.connect(out);
        d.connect(out);
        "[A > B] + C + D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(out);
        b.connect(out);
        c.connect(out);
        d.connect(out);
        "A + B + C + D"
    },
    // - Feedback -
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[a, b]));
        b.connect(fm(&[c]));
        c.connect(fm(&[d]));
        d.connect(out);
        "[A > A] > B > C > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[a, c]));
        b.connect(fm(&[c]));
        c.connect(fm(&[d]));
        d.connect(out);
        "[[A > A] + B] > C > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[a, d]));
        b.connect(fm(&[c]));
        c.connect(fm(&[d]));
        d.connect(out);
        "[[A > A] + B > C] > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[a, b]));
        b.connect(fm(&[d]));
        c.connect(fm(&[d]));
        d.connect(out);
        "[[A > A] > B + C] > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[a, b]));
        b.connect(out);
        c.connect(fm(&[c, d]));
        d.connect(out);
        "[A > A] > B + [C > C] > D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[a, b, c, d]));
        b.connect(out);
        c.connect(out);
        d.connect(out);
        "[A > A > B] + [A > A > C] + [A > A > D]"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(fm(&[a, b]));
        b.connect(out);
        c.connect(out);
        d.connect(out);
        "[A > A > B] + C + D"
    },
    |a, b, c, d, out| {
        clear([a, b, c, d]);
        a.connect(vec![Endpoint::Param(a.frequency_param()), out.endpoint()]);
        b.connect(out);
        c.connect(out);
        d.connect(out);
        "[A > A] + B + C + D"
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::context::Context;
    use crate::graph::{Connection, OfflineContext};
    use crate::nodes::oscillators::OscOptions;
    use crate::nodes::utility::LimiterOptions;

    struct Rig {
        host: Arc<OfflineContext>,
        mods: [Osc; 4],
        out: Limiter,
    }

    impl Rig {
        fn new() -> Self {
            let host = Arc::new(OfflineContext::default());
            let ctx: Context = host.clone();
            let osc = || Osc::new(&ctx, OscOptions::default()).unwrap();
            Self {
                mods: [osc(), osc(), osc(), osc()],
                out: Limiter::new(&ctx, LimiterOptions::default()).unwrap(),
                host,
            }
        }

        fn apply(&self, index: usize) -> &'static str {
            let [a, b, c, d] = &self.mods;
            ALGORITHMS[index](a, b, c, d, &self.out)
        }

        /// Edges leaving the modulators' outputs.
        fn mod_edges(&self) -> Vec<Connection> {
            self.mods
                .iter()
                .flat_map(|m| self.host.connections_from(m.output_unit()))
                .collect()
        }

        fn modulates(&self, from: usize, to: usize) -> bool {
            self.host.is_connected(Connection::Param {
                from: self.mods[from].output_unit(),
                param: self.mods[to].frequency_param(),
                output: 0,
            })
        }

        fn outputs(&self, from: usize) -> bool {
            self.host.is_connected(Connection::Unit {
                from: self.mods[from].output_unit(),
                to: self.out.ports().input_targets().iter().find_map(|t| match t {
                    crate::node::Target::Unit(u) => Some(*u),
                    crate::node::Target::Param(_) => None,
                }).unwrap(),
                output: 0,
                input: 0,
            })
        }
    }

    #[test]
    fn test_labels() {
        let rig = Rig::new();
        let labels: Vec<&str> = (0..ALGORITHMS.len()).map(|i| rig.apply(i)).collect();
        assert_eq!(labels[0], "A > B > C > D");
        assert_eq!(labels[10], "A + B + C + D");
        assert_eq!(labels[11], "[A > A] > B > C > D");
        assert_eq!(labels[18], "[A > A] + B + C + D");
        assert_eq!(labels.iter().filter(|l| l.contains("A > A")).count(), 8);
    }

    #[test]
    fn test_serial_chain() {
        let rig = Rig::new();
        rig.apply(0);

        assert!(rig.modulates(0, 1));
        assert!(rig.modulates(1, 2));
        assert!(rig.modulates(2, 3));
        assert!(rig.outputs(3));
        assert_eq!(rig.mod_edges().len(), 4);
    }

    #[test]
    fn test_reselect_rewires_from_scratch() {
        let rig = Rig::new();
        rig.apply(0);
        rig.apply(10);

        assert!(!rig.modulates(0, 1));
        assert!((0..4).all(|i| rig.outputs(i)));
        assert_eq!(rig.mod_edges().len(), 4);

        rig.apply(10);
        assert_eq!(rig.mod_edges().len(), 4);
    }

    #[test]
    fn test_feedback_and_mixed_destination() {
        let rig = Rig::new();
        rig.apply(15);
        assert!(rig.modulates(0, 0));
        assert!(rig.modulates(0, 1));
        assert!(rig.modulates(2, 2));
        assert!(rig.modulates(2, 3));
        assert!(rig.outputs(1) && rig.outputs(3));

        rig.apply(18);
        assert!(rig.modulates(0, 0));
        assert!(rig.outputs(0));
        assert_eq!(rig.mod_edges().len(), 5);
    }
}
