//! Random-path selection over the fork tree.
//!
//! Each added state becomes a child of the state that was running when
//! it appeared, reconstructing the engine's fork tree. Selection walks
//! from the root, choosing uniformly among branches that still lead to
//! a live state, so shallow states are favored over the leaves of deep,
//! heavily-forked subtrees.

use crate::searcher::{Searcher, StateId, StateView, Step};
use ahash::AHashMap;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug)]
struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    state: Option<StateId>,
    /// Live states in this subtree, this node included.
    live: usize,
}

#[derive(Debug)]
pub struct RandomPathSearcher {
    nodes: Vec<Node>,
    by_state: AHashMap<StateId, usize>,
    rng: ChaCha8Rng,
}

impl RandomPathSearcher {
    pub fn new(rng: ChaCha8Rng) -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            state: None,
            live: 0,
        };
        Self {
            nodes: vec![root],
            by_state: AHashMap::new(),
            rng,
        }
    }

    fn attach(&mut self, parent: usize, state: StateId) {
        let idx = self.nodes.len();
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            state: Some(state),
            live: 0,
        });
        self.nodes[parent].children.push(idx);
        self.by_state.insert(state, idx);
        self.adjust_live(idx, 1);
    }

    fn detach(&mut self, state: StateId) {
        if let Some(idx) = self.by_state.remove(&state) {
            self.nodes[idx].state = None;
            self.adjust_live(idx, -1);
        }
    }

    fn adjust_live(&mut self, from: usize, delta: isize) {
        let mut at = Some(from);
        while let Some(idx) = at {
            let node = &mut self.nodes[idx];
            node.live = (node.live as isize + delta) as usize;
            at = node.parent;
        }
    }
}

impl Searcher for RandomPathSearcher {
    fn select(&mut self, _view: &dyn StateView) -> Step {
        if self.nodes[0].live == 0 {
            return Step::Done;
        }
        let mut at = 0usize;
        loop {
            // Candidate branches: this node's own state, plus every
            // child subtree that still holds one.
            let own_state = self.nodes[at].state;
            let live_children: Vec<usize> = self.nodes[at]
                .children
                .iter()
                .copied()
                .filter(|&c| self.nodes[c].live > 0)
                .collect();
            let own = usize::from(own_state.is_some());
            let choices = own + live_children.len();
            debug_assert!(choices > 0);
            let pick = self.rng.gen_range(0..choices);
            match own_state {
                // Taking the node's own state ends the walk.
                Some(state) if pick < own => return Step::Run(state),
                _ => at = live_children[pick - own],
            }
        }
    }

    fn update(&mut self, current: Option<StateId>, added: &[StateId], removed: &[StateId]) {
        let parent = current
            .and_then(|c| self.by_state.get(&c).copied())
            .unwrap_or(0);
        for &state in added {
            self.attach(parent, state);
        }
        for &state in removed {
            self.detach(state);
        }
    }

    fn is_empty(&self) -> bool {
        self.nodes[0].live == 0
    }

    fn description(&self) -> String {
        "random-path".to_string()
    }
}
