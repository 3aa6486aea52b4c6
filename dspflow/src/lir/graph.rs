//! Node arena.

use std::collections::VecDeque;

use itertools::Itertools;

use super::*;
use crate::value::*;

/// Arena of nodes. Edges are [`NodeId`]s into the arena.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Number of nodes.
    pub fn len(&self) -> usize { self.nodes.len() }

    /// Is the graph empty?
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// Returns the node.
    pub fn node(&self, id: NodeId) -> &Node { &self.nodes[id.0] }

    /// Returns the node's output type.
    pub fn typ(&self, id: NodeId) -> &ValueTyp { &self.nodes[id.0].typ }

    /// Iterates over nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Adds a node, inferring its type.
    pub fn add(&mut self, kind: NodeKind) -> Result<NodeId, GraphError> {
        if let Some(id) = kind.inputs().into_iter().find(|id| id.0 >= self.nodes.len()) {
            return Err(GraphError::InvalidConfig(format!("node {} does not belong to this graph", id)));
        }
        let typ = infer(&kind, |id| self.nodes[id.0].typ.clone())?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, typ });
        Ok(id)
    }

    /// Connects a feedback placeholder to its source.
    pub fn connect(&mut self, forward: NodeId, source: NodeId) -> Result<(), GraphError> {
        let source_typ = self.typ(source).clone();
        match &mut self.nodes[forward.0].kind {
            NodeKind::Forward { source: Some(_), .. } => Err(GraphError::AlreadyConnected(forward)),
            NodeKind::Forward { source: slot @ None, typ } => {
                if *typ != source_typ {
                    return Err(GraphError::mismatch(format!("feedback {}", forward), typ, source_typ));
                }
                *slot = Some(source);
                Ok(())
            }
            kind => Err(GraphError::InvalidConfig(format!("{} {} is not a feedback node", kind.name(), forward))),
        }
    }

    /// Connects the ready input of a buffer.
    pub fn set_ready(&mut self, decouple: NodeId, ready: NodeId) -> Result<(), GraphError> {
        let ready_typ = self.typ(ready).clone();
        if ready_typ != ValueTyp::Bool {
            return Err(GraphError::mismatch(format!("ready of {}", decouple), ValueTyp::Bool, ready_typ));
        }
        match &mut self.nodes[decouple.0].kind {
            NodeKind::Decouple { ready: Some(_), .. } => Err(GraphError::AlreadyConnected(decouple)),
            NodeKind::Decouple { ready: slot @ None, .. } => {
                *slot = Some(ready);
                Ok(())
            }
            kind => Err(GraphError::InvalidConfig(format!("{} {} is not a buffer", kind.name(), decouple))),
        }
    }

    /// Computes an evaluation order of the combinational dependency relation.
    ///
    /// Every feedback placeholder must be connected, and every cycle must pass through a register or a buffer.
    pub fn schedule(&self) -> Result<Vec<NodeId>, GraphError> {
        let open = self.iter().find(|(_, node)| matches!(node.kind, NodeKind::Forward { source: None, .. }));
        if let Some((id, _)) = open {
            return Err(GraphError::UnconnectedFeedback(id));
        }

        let mut indegree = vec![0usize; self.nodes.len()];
        let mut users = vec![vec![]; self.nodes.len()];
        for (id, node) in self.iter() {
            for input in node.kind.comb_inputs() {
                indegree[id.0] += 1;
                users[input.0].push(id);
            }
        }

        let mut ready = indegree.iter().positions(|d| *d == 0).map(NodeId).collect::<VecDeque<_>>();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for user in &users[id.0] {
                indegree[user.0] -= 1;
                if indegree[user.0] == 0 {
                    ready.push_back(*user);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck = indegree.iter().positions(|d| *d > 0).map(NodeId).collect_vec();
            return Err(GraphError::CombinationalLoop(self.on_cycle(&stuck)));
        }
        Ok(order)
    }

    /// Narrows unschedulable nodes down to the ones that lie on a cycle.
    fn on_cycle(&self, stuck: &[NodeId]) -> Vec<NodeId> {
        let mut alive = stuck.to_vec();
        // Repeatedly drop nodes that feed no other stuck node.
        loop {
            let feeds = alive
                .iter()
                .flat_map(|id| self.node(*id).kind.comb_inputs())
                .filter(|input| alive.contains(input))
                .unique()
                .collect_vec();
            let next = alive.iter().copied().filter(|id| feeds.contains(id)).collect_vec();
            if next.len() == alive.len() {
                return alive;
            }
            alive = next;
        }
    }
}
