//! Monte-Carlo tree search over connect 4 positions
//!
//! Nodes live in an arena owned by [`SearchTree`] and refer to each other by
//! [`NodeId`]. Parent links are only used to walk back up the tree, ownership
//! always flows from the tree to its nodes.
//!
//! The score of a node is counted from the point of view of the player to move
//! at that node, so a parent prefers the children with the *lowest* win rate.

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;

use std::io::{self, Write};
use std::time::Instant;

use crate::bitboard::Position;
use crate::config::{Budget, SearchConfig};
use crate::error::{Error, Result};
use crate::move_list::MoveList;
use crate::WIDTH;

/// Index of a node inside a [`SearchTree`]
///
/// Ids are only valid until the next [`SearchTree::advance_tree`], which
/// renumbers or drops every node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

const ROOT: NodeId = NodeId(0);

#[derive(Clone, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    move_from_parent: Option<usize>,
    position: Position,
    moves: MoveList,
    score: f64,
    simulations: u32,
    // indexed like `moves`, not by column
    children: [Option<NodeId>; WIDTH],
}

impl Node {
    fn new(
        parent: Option<NodeId>,
        move_from_parent: Option<usize>,
        position: Position,
        sort_moves: bool,
    ) -> Self {
        let mut moves = MoveList::new(&position);
        if sort_moves {
            moves.sort(&position);
        }
        Self {
            parent,
            move_from_parent,
            position,
            moves,
            score: 0.0,
            simulations: 0,
            children: [None; WIDTH],
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The column played to reach this node, `None` for a fresh root
    pub fn move_from_parent(&self) -> Option<usize> {
        self.move_from_parent
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn moves(&self) -> &MoveList {
        &self.moves
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn simulations(&self) -> u32 {
        self.simulations
    }

    /// Share of simulations won by the player to move here
    pub fn win_rate(&self) -> Result<f64> {
        if self.simulations == 0 {
            return Err(Error::NotVisited);
        }
        Ok(self.score / self.simulations as f64)
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.position.is_terminal()
    }

    /// Created children as `(column, id)` pairs, in move list order
    pub fn children(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.moves
            .as_slice()
            .iter()
            .zip(self.children.iter())
            .filter_map(|(&column, child)| child.map(|id| (column, id)))
    }

    // `ln_parent` is the log of the parent's visit count, shared by all siblings
    fn ucb(&self, ln_parent: f64, exploration: f64) -> f64 {
        if self.simulations == 0 {
            return f64::INFINITY;
        }
        let simulations = self.simulations as f64;
        // our win rate is the parent's loss rate
        (1.0 - self.score / simulations) + exploration * (ln_parent / simulations).sqrt()
    }

    /// Plays uniformly random moves on a copy of the position until the game
    /// ends, scoring 1 for a win of the player to move here, 0.5 for a draw
    fn rollout<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let mut game = self.position;
        while !game.is_terminal() {
            match MoveList::new(&game).as_slice().choose(rng) {
                Some(&column) => game.play_unchecked(column),
                None => break,
            }
        }
        match game.winner() {
            Some(player) if player == self.position.current_player() => 1.0,
            Some(_) => 0.0,
            None => 0.5,
        }
    }
}

/// A search tree rooted at the position of the live game
#[derive(Clone, Debug)]
pub struct SearchTree {
    nodes: Vec<Node>,
    config: SearchConfig,
}

impl SearchTree {
    /// Creates a tree with no history for `position`
    pub fn new(position: Position) -> Self {
        let config = SearchConfig::default();
        Self {
            nodes: vec![Node::new(None, None, position, config.sort_moves)],
            config,
        }
    }

    pub fn with_config(position: Position, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            nodes: vec![Node::new(None, None, position, config.sort_moves)],
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[ROOT.0]
    }

    /// The position at the root of the tree
    pub fn position(&self) -> &Position {
        &self.root_node().position
    }

    /// The node behind `id`
    ///
    /// Panics if `id` is out of range, which a stale id from before an
    /// [`advance_tree`](Self::advance_tree) can be. Use [`get`](Self::get)
    /// when the id may be stale.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// The node behind `id`, or `None` if it is out of range
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn win_rate(&self, id: NodeId) -> Result<f64> {
        self.get(id).ok_or(Error::NotVisited)?.win_rate()
    }

    /// Runs one select, rollout, backpropagate cycle
    pub fn simulate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let leaf = self.select();
        let result = self.nodes[leaf.0].rollout(rng);
        self.backpropagate(leaf, result, 1);
    }

    /// Simulates until the budget runs out, returning the number of simulations
    pub fn search<R: Rng + ?Sized>(&mut self, budget: Budget, rng: &mut R) -> u64 {
        let start = Instant::now();
        let mut count = 0;
        loop {
            match budget {
                Budget::Iterations(limit) if count >= limit => break,
                Budget::Time(limit) if start.elapsed() >= limit => break,
                _ => {}
            }
            self.simulate(rng);
            count += 1;
        }
        debug!(
            "ran {} simulations in {:.1}ms, tree holds {} nodes",
            count,
            start.elapsed().as_secs_f64() * 1000.0,
            self.nodes.len()
        );
        count
    }

    /// Descends to the node that needs a rollout, expanding one new child
    /// whenever the current node still has unexpanded moves
    fn select(&mut self) -> NodeId {
        let exploration = self.config.exploration;
        let mut current = ROOT;
        loop {
            let index = self.nodes[current.0].moves.expanded();
            if let Some(column) = self.nodes[current.0].moves.next() {
                return self.expand(current, index, column);
            }

            let node = &self.nodes[current.0];
            if node.is_terminal() {
                return current;
            }

            // every child has been simulated at least once by now
            let ln_parent = (node.simulations as f64).ln();
            let mut best_ucb = f64::NEG_INFINITY;
            let mut best_child = None;
            for (_, child) in node.children() {
                let ucb = self.nodes[child.0].ucb(ln_parent, exploration);
                if ucb > best_ucb {
                    best_ucb = ucb;
                    best_child = Some(child);
                }
            }
            match best_child {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    fn expand(&mut self, parent: NodeId, index: usize, column: usize) -> NodeId {
        let mut position = self.nodes[parent.0].position;
        position.play_unchecked(column);

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(
            Some(parent),
            Some(column),
            position,
            self.config.sort_moves,
        ));
        self.nodes[parent.0].children[index] = Some(id);
        trace!("expanded column {} below node {}", column + 1, parent.0);
        id
    }

    /// Adds `w` wins out of `n` at `leaf`, flipping the result at every level
    fn backpropagate(&mut self, leaf: NodeId, mut w: f64, n: u32) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = &mut self.nodes[id.0];
            node.score += w;
            node.simulations += n;
            w = n as f64 - w;
            current = node.parent;
        }
    }

    /// The column leading to the child with the lowest win rate for the opponent
    pub fn best_move(&self) -> Result<usize> {
        let mut best_rate = f64::INFINITY;
        let mut best_move = None;
        for (column, child) in self.root_node().children() {
            let rate = self.nodes[child.0].win_rate()?;
            if rate < best_rate {
                best_rate = rate;
                best_move = Some(column);
            }
        }
        best_move.ok_or(Error::NoChildren)
    }

    /// Commits a move of the real game, keeping the statistics of the matching
    /// subtree if it was already explored
    ///
    /// Returns the new root.
    pub fn advance_tree(&mut self, column: usize) -> Result<&Node> {
        let mut next = self.root_node().position;
        next.play(column)?;

        let root = self.root_node();
        let explored = root
            .moves
            .index_of(column)
            .and_then(|index| root.children[index]);

        match explored {
            Some(child) => {
                debug!(
                    "reusing subtree for column {} with {} simulations",
                    column + 1,
                    self.nodes[child.0].simulations
                );
                self.compact(child);
            }
            None => {
                debug!("column {} was never expanded, starting a fresh tree", column + 1);
                self.nodes = vec![Node::new(None, None, next, self.config.sort_moves)];
            }
        }
        Ok(self.root_node())
    }

    /// Drops every node outside the subtree of `new_root`, which becomes `ROOT`
    fn compact(&mut self, new_root: NodeId) {
        // breadth first, so the new root lands at index 0
        let mut order = vec![new_root];
        let mut i = 0;
        while i < order.len() {
            let id = order[i];
            order.extend(self.nodes[id.0].children.iter().flatten());
            i += 1;
        }

        let mut remap = vec![None; self.nodes.len()];
        for (new_index, old) in order.iter().enumerate() {
            remap[old.0] = Some(NodeId(new_index));
        }

        let mut nodes = Vec::with_capacity(order.len());
        for old in order {
            let mut node = self.nodes[old.0].clone();
            node.parent = node.parent.and_then(|parent| remap[parent.0]);
            for child in node.children.iter_mut() {
                *child = child.and_then(|id| remap[id.0]);
            }
            nodes.push(node);
        }
        debug!("compacted tree from {} to {} nodes", self.nodes.len(), nodes.len());
        self.nodes = nodes;
    }

    /// Writes the statistics of the root and its children
    pub fn info<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let root = self.root_node();
        writeln!(out, "Number of simulations: {}", root.simulations)?;
        for (column, child) in root.children() {
            let child = &self.nodes[child.0];
            match child.win_rate() {
                Ok(rate) => writeln!(
                    out,
                    "Move {}: {:.4} {}",
                    column + 1,
                    rate,
                    child.simulations
                )?,
                Err(_) => writeln!(out, "Move {}: unvisited", column + 1)?,
            }
        }
        if let Ok(rate) = root.win_rate() {
            writeln!(out, "Win Rate: {:.2}%", rate * 100.0)?;
        }
        Ok(())
    }

    /// Writes the root position
    pub fn display<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self.root_node().position)
    }
}
