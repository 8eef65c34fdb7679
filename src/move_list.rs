//! Columns playable from a position, handed out one at a time to the search tree

use crate::bitboard::Position;
use crate::error::{Error, Result};
use crate::WIDTH;

/// The legal columns of a position, split into moves already handed out
/// (`..head`) and moves not yet expanded (`head..tail`)
///
/// The set of moves is fixed at construction, only `head` moves afterwards.
#[derive(Clone, Debug)]
pub struct MoveList {
    moves: [usize; WIDTH],
    head: usize,
    tail: usize,
}

impl MoveList {
    /// Collects the playable columns of `position`, left to right
    pub fn new(position: &Position) -> Self {
        let mut moves = [0; WIDTH];
        let mut tail = 0;
        for column in 0..WIDTH {
            if position.can_play(column) {
                moves[tail] = column;
                tail += 1;
            }
        }
        Self {
            moves,
            head: 0,
            tail,
        }
    }

    /// Number of moves not yet handed out
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Number of legal moves at construction
    pub fn total(&self) -> usize {
        self.tail
    }

    /// Number of moves already handed out
    pub fn expanded(&self) -> usize {
        self.head
    }

    pub fn get(&self, index: usize) -> Option<usize> {
        self.as_slice().get(index).copied()
    }

    /// Position of `column` in the list, if it is legal
    pub fn index_of(&self, column: usize) -> Option<usize> {
        self.as_slice().iter().position(|&m| m == column)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.moves[..self.tail]
    }

    /// Reorders the unexpanded moves: immediate wins first, then columns
    /// closest to the centre
    ///
    /// `position` must be the position the list was built from.
    pub fn sort(&mut self, position: &Position) {
        let center = WIDTH / 2;
        self.moves[self.head..self.tail].sort_by_cached_key(|&column| {
            (
                !position.is_winning_move(column),
                (column as isize - center as isize).abs(),
            )
        });
    }

    /// Hands out the next unexpanded move
    pub fn next_move(&mut self) -> Result<usize> {
        self.next().ok_or(Error::MoveListExhausted)
    }
}

impl Iterator for MoveList {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.head == self.tail {
            return None;
        }
        self.head += 1;
        Some(self.moves[self.head - 1])
    }
}
