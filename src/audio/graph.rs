//! Audio context: a small node graph feeding the frequency analyser.
//!
//! Input nodes wrap `SampleTap`s filled by device threads. Once per
//! animation frame `process()` drains every input and pushes the block
//! through its outgoing connections. Processing nodes transform the block
//! in place; the analyser stores it and passes it on; the destination
//! discards it (audible output is handled by the playback device).

use log::debug;

use super::analyser::{AnalyserNode, DownsampledAnalyser, FrequencyAnalyser};
use super::filters::{BiquadFilter, BiquadKind, BiquadParams, DynamicsCompressor};
use super::tap::SampleTap;
use crate::error::{Result, SonogramError};
use crate::params::{AnalyserKind, CompressorConfig};

/// Handle to a node inside an `AudioContext`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

enum NodeKind {
    Input(SampleTap),
    Gain(f32),
    Biquad(BiquadFilter),
    Compressor(DynamicsCompressor),
    Analyser(Box<dyn FrequencyAnalyser>),
    Destination,
}

struct Node {
    kind: NodeKind,
    outputs: Vec<NodeId>,
}

/// Process-wide audio context
///
/// Created once by the application and handed to the model.
pub struct AudioContext {
    sample_rate: f32,
    nodes: Vec<Node>,
    destination: NodeId,
}

impl AudioContext {
    pub fn new(sample_rate: f32) -> Self {
        let destination = Node {
            kind: NodeKind::Destination,
            outputs: Vec::new(),
        };
        Self {
            sample_rate,
            nodes: vec![destination],
            destination: NodeId(0),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            outputs: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(SonogramError::UnknownNode(id.0))
    }

    /// Source node fed by a capture stream or a playing file
    pub fn create_input_node(&mut self, tap: SampleTap) -> NodeId {
        self.add(NodeKind::Input(tap))
    }

    pub fn create_gain(&mut self, gain: f32) -> NodeId {
        self.add(NodeKind::Gain(gain))
    }

    pub fn create_biquad_filter(&mut self, kind: BiquadKind, params: BiquadParams) -> NodeId {
        let filter = BiquadFilter::new(kind, params, self.sample_rate);
        self.add(NodeKind::Biquad(filter))
    }

    pub fn create_dynamics_compressor(&mut self, config: &CompressorConfig) -> NodeId {
        let compressor = DynamicsCompressor::new(config, self.sample_rate);
        self.add(NodeKind::Compressor(compressor))
    }

    pub fn create_analyser(
        &mut self,
        kind: AnalyserKind,
        fft_size: usize,
        smoothing: f32,
        downsample_rate: usize,
    ) -> NodeId {
        let analyser: Box<dyn FrequencyAnalyser> = match kind {
            AnalyserKind::Builtin => Box::new(AnalyserNode::new(fft_size, smoothing)),
            AnalyserKind::Downsampled => {
                Box::new(DownsampledAnalyser::new(fft_size, downsample_rate))
            }
        };
        self.add(NodeKind::Analyser(analyser))
    }

    /// Route `from`'s output into `to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.node(from)?;
        self.node(to)?;
        if from == to || self.reaches(to, from) {
            return Err(SonogramError::GraphCycle {
                from: from.0,
                to: to.0,
            });
        }
        let outputs = &mut self.nodes[from.0].outputs;
        if !outputs.contains(&to) {
            outputs.push(to);
        }
        Ok(())
    }

    /// Drop every outgoing connection of `node`
    pub fn disconnect(&mut self, node: NodeId) -> Result<()> {
        self.node(node)?;
        self.nodes[node.0].outputs.clear();
        Ok(())
    }

    /// Point an existing input node at a new tap, keeping its connections
    ///
    /// The old tap is dropped, so samples still queued on it are discarded.
    pub fn rebind_input(&mut self, node: NodeId, tap: SampleTap) -> Result<()> {
        match self.nodes.get_mut(node.0).map(|n| &mut n.kind) {
            Some(NodeKind::Input(current)) => {
                *current = tap;
                Ok(())
            }
            _ => Err(SonogramError::UnknownNode(node.0)),
        }
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.node(from)
            .map(|n| n.outputs.contains(&to))
            .unwrap_or(false)
    }

    /// Depth-first reachability over outgoing edges
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            stack.extend(self.nodes[id.0].outputs.iter().copied());
        }
        false
    }

    pub fn analyser_mut(&mut self, id: NodeId) -> Result<&mut dyn FrequencyAnalyser> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Analyser(analyser)) => Ok(analyser.as_mut()),
            _ => Err(SonogramError::UnknownNode(id.0)),
        }
    }

    /// Drain all inputs and push their samples through the graph
    ///
    /// Samples from disconnected inputs are discarded. Each connected
    /// input is pushed separately, so a node with two live inputs sees
    /// their blocks one after the other rather than mixed.
    pub fn process(&mut self) {
        for index in 0..self.nodes.len() {
            let NodeKind::Input(tap) = &self.nodes[index].kind else {
                continue;
            };
            let block = tap.drain();
            if block.is_empty() || self.nodes[index].outputs.is_empty() {
                continue;
            }
            let outputs = self.nodes[index].outputs.clone();
            for output in outputs {
                self.push(output, block.clone());
            }
        }
    }

    fn push(&mut self, id: NodeId, mut block: Vec<f32>) {
        match &mut self.nodes[id.0].kind {
            NodeKind::Gain(gain) => {
                let gain = *gain;
                block.iter_mut().for_each(|s| *s *= gain);
            }
            NodeKind::Biquad(filter) => filter.process(&mut block),
            NodeKind::Compressor(compressor) => compressor.process(&mut block),
            NodeKind::Analyser(analyser) => analyser.push_samples(&block),
            NodeKind::Destination => return,
            NodeKind::Input(_) => {
                debug!("Ignoring block routed into input node {}", id.0);
                return;
            }
        }

        let outputs = self.nodes[id.0].outputs.clone();
        for output in outputs {
            self.push(output, block.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_analyser() -> (AudioContext, NodeId) {
        let mut ctx = AudioContext::new(48_000.0);
        let analyser = ctx.create_analyser(AnalyserKind::Builtin, 256, 0.0, 1);
        (ctx, analyser)
    }

    fn loud_block() -> Vec<f32> {
        (0..512)
            .map(|i| (i as f32 * 0.3).sin() * 0.5)
            .collect()
    }

    fn bytes(ctx: &mut AudioContext, analyser: NodeId) -> Vec<u8> {
        let a = ctx.analyser_mut(analyser).unwrap();
        let mut out = vec![0u8; a.frequency_bin_count()];
        a.get_byte_frequency_data(&mut out);
        out
    }

    #[test]
    fn test_connected_input_reaches_analyser() {
        let (mut ctx, analyser) = context_with_analyser();
        let tap = SampleTap::default();
        let input = ctx.create_input_node(tap.clone());
        let gain = ctx.create_gain(1.0);
        ctx.connect(input, gain).unwrap();
        ctx.connect(gain, analyser).unwrap();

        tap.push_slice(&loud_block());
        ctx.process();

        assert!(tap.is_empty());
        assert!(bytes(&mut ctx, analyser).iter().any(|&b| b > 0));
    }

    #[test]
    fn test_disconnected_input_is_drained_but_silent() {
        let (mut ctx, analyser) = context_with_analyser();
        let tap = SampleTap::default();
        let input = ctx.create_input_node(tap.clone());
        ctx.connect(input, analyser).unwrap();
        ctx.disconnect(input).unwrap();

        tap.push_slice(&loud_block());
        ctx.process();

        assert!(tap.is_empty());
        assert!(bytes(&mut ctx, analyser).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rebound_input_drains_new_tap_only() {
        let (mut ctx, analyser) = context_with_analyser();
        let old_tap = SampleTap::default();
        let input = ctx.create_input_node(old_tap.clone());
        ctx.connect(input, analyser).unwrap();

        let new_tap = SampleTap::default();
        ctx.rebind_input(input, new_tap.clone()).unwrap();
        assert!(ctx.is_connected(input, analyser));

        old_tap.push_slice(&[0.1, 0.2]);
        new_tap.push_slice(&loud_block());
        ctx.process();

        assert_eq!(old_tap.len(), 2);
        assert!(new_tap.is_empty());
        assert!(bytes(&mut ctx, analyser).iter().any(|&b| b > 0));
    }

    #[test]
    fn test_rebind_rejects_non_input_nodes() {
        let (mut ctx, analyser) = context_with_analyser();
        assert!(matches!(
            ctx.rebind_input(analyser, SampleTap::default()),
            Err(SonogramError::UnknownNode(_))
        ));
    }

    #[test]
    fn test_connect_rejects_cycles() {
        let mut ctx = AudioContext::new(48_000.0);
        let a = ctx.create_gain(1.0);
        let b = ctx.create_gain(1.0);
        ctx.connect(a, b).unwrap();
        assert!(matches!(
            ctx.connect(b, a),
            Err(SonogramError::GraphCycle { .. })
        ));
        assert!(ctx.connect(a, a).is_err());
    }

    #[test]
    fn test_unknown_node() {
        let mut ctx = AudioContext::new(48_000.0);
        let other = AudioContext::new(48_000.0);
        let gain = ctx.create_gain(1.0);
        assert!(matches!(
            ctx.connect(gain, NodeId(42)),
            Err(SonogramError::UnknownNode(42))
        ));
        assert!(ctx.analyser_mut(other.destination()).is_err());
    }

    #[test]
    fn test_zero_gain_silences_chain() {
        let (mut ctx, analyser) = context_with_analyser();
        let tap = SampleTap::default();
        let input = ctx.create_input_node(tap.clone());
        let mute = ctx.create_gain(0.0);
        ctx.connect(input, mute).unwrap();
        ctx.connect(mute, analyser).unwrap();
        ctx.connect(analyser, ctx.destination()).unwrap();

        tap.push_slice(&loud_block());
        ctx.process();
        assert!(bytes(&mut ctx, analyser).iter().all(|&b| b == 0));
    }
}
