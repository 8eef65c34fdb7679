//! A Monte-Carlo tree search agent for the board game 'Connect 4'
//!
//! Positions are stored as bitboards, the search grows its tree one node per
//! simulation and scores leaves with uniformly random playouts. The tree can be
//! carried over from one turn to the next, keeping the statistics of the move
//! that was actually played.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_mcts::{bitboard::Position, config::Budget, mcts::SearchTree};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut tree = SearchTree::new(Position::from_moves("112233")?);
//! tree.search(Budget::Iterations(2000), &mut rng);
//!
//! // column 4 completes the bottom row
//! assert_eq!(tree.best_move()?, 3);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;

pub mod error;

pub mod bitboard;

pub mod move_list;

pub mod config;

pub mod mcts;

pub mod bot;


pub use error::{Error, Result};

/// The width of the game board in tiles
pub const WIDTH: usize = 9;

/// The height of the game board in tiles
pub const HEIGHT: usize = 7;

/// Bitboard type, one bit per cell plus a guard bit on top of every column
pub type Bitboard = u128;

// column characters are single digits
const_assert!(WIDTH < 10);
// ensure that the given dimensions fit in the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) <= Bitboard::BITS as usize);
