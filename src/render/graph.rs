//! Render graph description
//!
//! A graph is built for one render and dropped afterwards. Nodes are
//! stored in insertion order and may only read from nodes added before
//! them, so the node list is already a topological order.

use crate::dsp::{FeedbackDelay, Gain, SourceSettings};
use crate::engine::SampleBuffer;
use crate::error::{Result, StudioError};

/// Index of a node within its graph
pub type NodeId = usize;

/// One processing node
#[derive(Debug, Clone)]
pub enum RenderNode {
    /// Plays the graph's source buffer
    Source { settings: SourceSettings },
    /// Linear gain
    Gain { input: NodeId, gain: Gain },
    /// Convolution against an impulse response; output is stereo
    Convolver {
        input: NodeId,
        impulse: SampleBuffer,
    },
    /// Delay line with feedback; output is the wet signal only
    FeedbackDelay {
        input: NodeId,
        delay: FeedbackDelay,
    },
    /// Weighted sum of several nodes
    Mix { inputs: Vec<(NodeId, f32)> },
}

impl RenderNode {
    /// Nodes this node reads from
    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            RenderNode::Source { .. } => Vec::new(),
            RenderNode::Gain { input, .. }
            | RenderNode::Convolver { input, .. }
            | RenderNode::FeedbackDelay { input, .. } => vec![*input],
            RenderNode::Mix { inputs } => inputs.iter().map(|(id, _)| *id).collect(),
        }
    }

    /// Short lowercase name, for logs and assertions
    pub fn kind(&self) -> &'static str {
        match self {
            RenderNode::Source { .. } => "source",
            RenderNode::Gain { .. } => "gain",
            RenderNode::Convolver { .. } => "convolver",
            RenderNode::FeedbackDelay { .. } => "delay",
            RenderNode::Mix { .. } => "mix",
        }
    }
}

/// Processing graph for a single render
///
/// Borrows the original buffer; the graph can never outlive it.
#[derive(Debug)]
pub struct RenderGraph<'a> {
    source: &'a SampleBuffer,
    nodes: Vec<RenderNode>,
    sink: Option<NodeId>,
}

impl<'a> RenderGraph<'a> {
    /// Empty graph reading from `source`
    pub fn new(source: &'a SampleBuffer) -> Self {
        Self {
            source,
            nodes: Vec::new(),
            sink: None,
        }
    }

    /// Append a node
    ///
    /// Fails with `RenderFailure` if the node reads from a node that has
    /// not been added yet.
    pub fn add_node(&mut self, node: RenderNode) -> Result<NodeId> {
        let id = self.nodes.len();
        if let Some(missing) = node.inputs().into_iter().find(|&input| input >= id) {
            return Err(StudioError::RenderFailure {
                reason: format!("{} node {} reads from unknown node {}", node.kind(), id, missing),
            });
        }

        self.nodes.push(node);
        Ok(id)
    }

    /// Route `node` to the sink
    pub fn connect_sink(&mut self, node: NodeId) -> Result<()> {
        if node >= self.nodes.len() {
            return Err(StudioError::RenderFailure {
                reason: format!("sink connected to unknown node {}", node),
            });
        }
        self.sink = Some(node);
        Ok(())
    }

    /// The buffer every source node plays
    pub fn source(&self) -> &'a SampleBuffer {
        self.source
    }

    /// Nodes in evaluation order
    pub fn nodes(&self) -> &[RenderNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.get(id)
    }

    /// Node feeding the sink, if connected
    pub fn sink(&self) -> Option<NodeId> {
        self.sink
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node kinds in evaluation order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.nodes.iter().map(RenderNode::kind).collect()
    }

    /// For each node, the index of the last node that reads it
    ///
    /// The sink counts as a reader positioned after every node.
    pub fn last_uses(&self) -> Vec<Option<usize>> {
        let mut last = vec![None; self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            for input in node.inputs() {
                last[input] = Some(id);
            }
        }
        if let Some(sink) = self.sink {
            last[sink] = Some(self.nodes.len());
        }
        last
    }
}
