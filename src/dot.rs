use std::{collections::VecDeque, fmt};

use crate::{Color, Mutation, Snapshot, Tracer};

impl Snapshot {
    /// Writes the snapshot as a Graphviz `digraph` named `name`, one rank per tree level.
    ///
    /// Missing children are drawn as points.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        if self.is_empty() {
            return write!(w, "digraph \"graph-{name}\" {{}}");
        }

        enum Item {
            Node(usize),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(0));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _rank_node in 0..queue.len() {
                let idx = match queue.pop_front() {
                    Some(Item::Node(idx)) => idx,
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let node = &self.nodes()[idx];
                let fill = match node.color {
                    Color::Red => "red",
                    Color::Black => "grey",
                };
                write!(
                    w,
                    "\"graph{name}-{idx}\" [style=filled, fillcolor={fill}, label=\"{}:{}\"]; ",
                    escape(&node.key),
                    node.black_height,
                )?;

                for child in [node.left, node.right] {
                    match child {
                        Some(child) => {
                            queue.push_back(Item::Node(child));
                            writeln!(links, "\"graph{name}-{idx}\" -> \"graph{name}-{child}\";")?;
                        }

                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                links,
                                "\"graph{name}-{idx}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A [`Tracer`] that renders every snapshot it receives as a Graphviz graph.
///
/// Graphs are kept in memory, named after the tracer's prefix and a running counter. Writing
/// them out and rendering them is left to the caller.
#[derive(Clone, Debug, Default)]
pub struct DotTracer {
    prefix: String,
    graphs: Vec<(Mutation, String)>,
}

impl DotTracer {
    pub fn new(prefix: impl Into<String>) -> Self {
        DotTracer {
            prefix: prefix.into(),
            graphs: Vec::new(),
        }
    }

    /// Returns the rendered graphs, oldest first, along with the mutation that produced each.
    pub fn graphs(&self) -> &[(Mutation, String)] {
        &self.graphs
    }

    /// Removes and returns the rendered graphs.
    pub fn take_graphs(&mut self) -> Vec<(Mutation, String)> {
        std::mem::take(&mut self.graphs)
    }
}

impl Tracer for DotTracer {
    fn on_mutation(&mut self, mutation: Mutation, snapshot: &Snapshot) {
        let name = format!("{}{}", self.prefix, self.graphs.len());
        let mut graph = String::new();

        // Writing to a `String` cannot fail.
        if snapshot.dotgraph(&name, &mut graph).is_ok() {
            self.graphs.push((mutation, graph));
        }
    }
}
