use std::fmt;

use crate::error::{Error, Result};
use crate::{Bitboard, HEIGHT, WIDTH};

/*
 * Bit layout for the default 9x7 board, one guard bit on top of every column:
 *
 *  .  .  .  .  .  .  .  .  .
 *  6 14 22 30 38 46 54 62 70
 *  5 13 21 29 37 45 53 61 69
 *  4 12 20 28 36 44 52 60 68
 *  3 11 19 27 35 43 51 59 67
 *  2 10 18 26 34 42 50 58 66
 *  1  9 17 25 33 41 49 57 65
 *  0  8 16 24 32 40 48 56 64
 */

/// One of the two players, `One` always moves first
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// The player who makes ply number `ply` (0-indexed)
    pub fn from_ply(ply: usize) -> Self {
        if ply % 2 == 0 {
            Player::One
        } else {
            Player::Two
        }
    }

    pub fn other(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum GameState {
    Playing,
    PlayerOneWin,
    PlayerTwoWin,
    Draw,
}

impl GameState {
    fn won_by(player: Player) -> Self {
        match player {
            Player::One => GameState::PlayerOneWin,
            Player::Two => GameState::PlayerTwoWin,
        }
    }
}

/// A game state stored as two bitmasks
///
/// Each column takes `HEIGHT + 1` bits, the extra guard bit stops the
/// shift-based alignment checks from wrapping into the next column.
/// A `Position` is `Copy`, so hypothetical continuations (tree expansion,
/// rollouts) always work on a copy and never touch the original.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Position {
    // mask of the tiles of the player about to move
    player_mask: Bitboard,
    // mask of all tiles
    board_mask: Bitboard,
    // plies played, passes included
    num_moves: usize,
    num_passes: usize,
    state: GameState,
}

impl Position {
    pub fn new() -> Self {
        Self {
            player_mask: 0,
            board_mask: 0,
            num_moves: 0,
            num_passes: 0,
            state: GameState::Playing,
        }
    }

    /// Builds a position from a string of 1-indexed column digits
    ///
    /// Every character must be a legal move, moves after the end of the game
    /// are rejected.
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut position = Self::new();

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => {
                    position.play(column - 1)?;
                }
                _ => return Err(Error::ParseMove(column_char)),
            }
        }
        Ok(position)
    }

    /// Replays a string of 1-indexed column digits, stopping before the first
    /// move that is illegal or would win the game
    ///
    /// Returns the number of moves applied.
    pub fn play_sequence<S: AsRef<str>>(&mut self, moves: S) -> usize {
        for (i, column_char) in moves.as_ref().chars().enumerate() {
            let column = match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => column - 1,
                _ => return i,
            };
            if !self.can_play(column) || self.is_winning_move(column) {
                return i;
            }
            self.play_unchecked(column);
        }
        moves.as_ref().chars().count()
    }

    pub fn player_mask(&self) -> Bitboard {
        self.player_mask
    }

    pub fn board_mask(&self) -> Bitboard {
        self.board_mask
    }

    pub fn top_mask(column: usize) -> Bitboard {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    pub fn bottom_mask(column: usize) -> Bitboard {
        1 << (column * (HEIGHT + 1))
    }

    pub fn column_mask(column: usize) -> Bitboard {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    /// Number of plies played so far, passes included
    pub fn num_moves(&self) -> usize {
        self.num_moves
    }

    pub fn num_passes(&self) -> usize {
        self.num_passes
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state != GameState::Playing
    }

    pub fn is_draw(&self) -> bool {
        self.state == GameState::Draw
    }

    pub fn winner(&self) -> Option<Player> {
        match self.state {
            GameState::PlayerOneWin => Some(Player::One),
            GameState::PlayerTwoWin => Some(Player::Two),
            _ => None,
        }
    }

    /// The player about to move
    pub fn current_player(&self) -> Player {
        Player::from_ply(self.num_moves)
    }

    /// Returns the owner of a cell, rows counted from the bottom
    pub fn cell(&self, column: usize, row: usize) -> Option<Player> {
        if column >= WIDTH || row >= HEIGHT {
            return None;
        }
        let tile: Bitboard = 1 << (column * (HEIGHT + 1) + row);
        if self.board_mask & tile == 0 {
            None
        } else if self.player_mask & tile != 0 {
            Some(self.current_player())
        } else {
            Some(self.current_player().other())
        }
    }

    pub fn can_play(&self, column: usize) -> bool {
        if self.is_terminal() || column >= WIDTH {
            return false;
        }
        Self::top_mask(column) & self.board_mask == 0
    }

    /// Drops a tile for the current player into `column`
    pub fn play(&mut self, column: usize) -> Result<GameState> {
        if self.is_terminal() {
            return Err(Error::GameOver);
        }
        if column >= WIDTH {
            return Err(Error::InvalidMove { column });
        }
        if !self.can_play(column) {
            return Err(Error::ColumnFull { column });
        }
        self.play_unchecked(column);
        Ok(self.state)
    }

    /// Plays a move already known to satisfy `can_play`
    pub(crate) fn play_unchecked(&mut self, column: usize) {
        debug_assert!(self.can_play(column));
        if self.is_winning_move(column) {
            self.state = GameState::won_by(self.current_player());
        }
        // switch the current player
        self.player_mask ^= self.board_mask;
        // the carry lands on the lowest free cell of the column
        self.board_mask |= self.board_mask + Self::bottom_mask(column);
        self.num_moves += 1;

        if self.state == GameState::Playing
            && self.num_moves - self.num_passes == WIDTH * HEIGHT
        {
            self.state = GameState::Draw;
        }
    }

    /// Skips a turn without placing a tile
    pub fn pass(&mut self) -> Result<()> {
        if self.is_terminal() {
            return Err(Error::GameOver);
        }
        self.player_mask ^= self.board_mask;
        self.num_moves += 1;
        self.num_passes += 1;
        Ok(())
    }

    pub fn is_winning_move(&self, column: usize) -> bool {
        if column >= WIDTH {
            return false;
        }
        let mut pos = self.player_mask;
        // play the move on a copy of the mask, keeping the current player
        pos |= (self.board_mask + Self::bottom_mask(column)) & Self::column_mask(column);
        Self::alignment(pos)
    }

    /// Returns true if the tiles in `pos` contain a 4-alignment
    pub fn alignment(pos: Bitboard) -> bool {
        // check horizontal alignment
        // mark all horizontal runs of 2
        let mut m = pos & (pos >> (HEIGHT + 1));
        // check for runs of 2 * (runs of 2)
        if m & (m >> (2 * (HEIGHT + 1))) != 0 {
            return true;
        }

        // check diagonal alignment 1
        m = pos & (pos >> HEIGHT);
        if m & (m >> (2 * HEIGHT)) != 0 {
            return true;
        }

        // check diagonal alignment 2
        m = pos & (pos >> (HEIGHT + 2));
        if m & (m >> (2 * (HEIGHT + 2))) != 0 {
            return true;
        }

        // check vertical alignment
        m = pos & (pos >> 1);
        if m & (m >> 2) != 0 {
            return true;
        }

        // no alignments
        false
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..HEIGHT).rev() {
            for column in 0..WIDTH {
                let tile = match self.cell(column, row) {
                    Some(Player::One) => 'X',
                    Some(Player::Two) => 'O',
                    None => '.',
                };
                write!(f, "{}", tile)?;
            }
            writeln!(f)?;
        }
        let columns: String = (1..=WIDTH).map(|x| x.to_string()).collect();
        writeln!(f, "{}", columns)
    }
}
