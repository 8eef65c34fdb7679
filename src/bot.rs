//! A live game driven by the search tree, and the line protocol used to play
//! it against a referee over stdin/stdout
//!
//! The referee opens with `my_id opp_id`. Every turn it then sends the turn
//! number, `HEIGHT` board rows, the count of legal actions followed by the
//! actions themselves, and finally the opponent's last column (0-indexed), or
//! `-1` when there is none. The bot answers with one 0-indexed column per line.
//! The board rows and action list are read but not trusted, the bot tracks the
//! game from the moves alone.

use anyhow::{anyhow, Result};
use log::{debug, info};
use rand::Rng;

use std::convert::TryFrom;
use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::bitboard::{GameState, Position};
use crate::config::{Budget, SearchConfig};
use crate::mcts::SearchTree;
use crate::HEIGHT;

/// The live game and the search tree that follows it
#[derive(Clone, Debug)]
pub struct Game {
    position: Position,
    tree: SearchTree,
}

impl Game {
    pub fn new(position: Position, config: SearchConfig) -> Result<Self> {
        Ok(Self {
            position,
            tree: SearchTree::with_config(position, config)?,
        })
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    /// Searches the current position and returns the column to play
    pub fn think<R: Rng + ?Sized>(&mut self, budget: Budget, rng: &mut R) -> Result<usize> {
        let simulations = self.tree.search(budget, rng);
        // a tiny budget may not have expanded anything yet
        if self.tree.root_node().children().next().is_none() {
            self.tree.simulate(rng);
        }
        info!("searched {} simulations this turn", simulations);

        let mut report = Vec::new();
        self.tree.info(&mut report)?;
        debug!("\n{}", String::from_utf8_lossy(&report));

        Ok(self.tree.best_move()?)
    }

    /// Commits a move to both the live position and the tree
    pub fn play(&mut self, column: usize) -> Result<GameState> {
        let state = self.position.play(column)?;
        self.tree.advance_tree(column)?;
        Ok(state)
    }

    /// Hands the turn over without playing. Passes never appear in a move
    /// list, so the tree restarts from the new position.
    pub fn pass(&mut self) -> Result<()> {
        self.position.pass()?;
        self.tree = SearchTree::with_config(self.position, *self.tree.config())?;
        Ok(())
    }

    /// Applies the opponent's move as reported by the referee, `-1` meaning
    /// the opponent has not moved
    pub fn opponent_move(&mut self, last_move: i64) -> Result<()> {
        if last_move == -1 {
            debug!("no opponent move, passing the first turn");
            return self.pass();
        }
        let column = usize::try_from(last_move)
            .map_err(|_| anyhow!("Unsupported opponent move {}", last_move))?;
        self.play(column)?;
        Ok(())
    }

    /// One referee turn: applies the opponent's move, then searches and plays
    /// our reply
    pub fn turn<R: Rng + ?Sized>(
        &mut self,
        last_move: i64,
        budget: Budget,
        rng: &mut R,
    ) -> Result<usize> {
        self.opponent_move(last_move)?;
        let column = self.think(budget, rng)?;
        self.play(column)?;
        Ok(column)
    }
}

/// Whitespace separated values read across lines
struct Tokens<R> {
    input: R,
    line: String,
    offset: usize,
}

impl<R: BufRead> Tokens<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            line: String::new(),
            offset: 0,
        }
    }

    /// The next token, `None` once the input is closed
    fn next_token(&mut self) -> Result<Option<String>> {
        loop {
            let rest = &self.line[self.offset..];
            let trimmed = rest.trim_start();
            if !trimmed.is_empty() {
                let start = self.offset + rest.len() - trimmed.len();
                let end = trimmed
                    .find(char::is_whitespace)
                    .map_or(self.line.len(), |len| start + len);
                self.offset = end;
                return Ok(Some(self.line[start..end].to_owned()));
            }

            self.line.clear();
            self.offset = 0;
            if self.input.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
        }
    }

    fn next<T: FromStr>(&mut self) -> Result<Option<T>> {
        match self.next_token()? {
            Some(token) => token
                .parse()
                .map(Some)
                .map_err(|_| anyhow!("Unexpected referee input: {}", token)),
            None => Ok(None),
        }
    }

    /// Like `next`, but the input may not end here
    fn expect<T: FromStr>(&mut self, what: &str) -> Result<T> {
        self.next()?
            .ok_or_else(|| anyhow!("Referee input closed before {}", what))
    }
}

/// Plays referee turns until the input closes, returning the final game
pub fn run<I, O, R>(
    input: I,
    mut output: O,
    mut game: Game,
    budget: Budget,
    rng: &mut R,
) -> Result<Game>
where
    I: BufRead,
    O: Write,
    R: Rng + ?Sized,
{
    let mut tokens = Tokens::new(input);

    let my_id: u32 = tokens.expect("the player ids")?;
    let opp_id: u32 = tokens.expect("the player ids")?;
    info!("playing as {} against {}", my_id, opp_id);

    while let Some(turn) = tokens.next::<u32>()? {
        for _ in 0..HEIGHT {
            tokens.expect::<String>("the board rows")?;
        }
        let actions: usize = tokens.expect("the number of actions")?;
        for _ in 0..actions {
            tokens.expect::<i64>("the actions")?;
        }
        let last_move: i64 = tokens.expect("the last move")?;

        let column = game.turn(last_move, budget, rng)?;
        debug!("turn {}: opponent played {}, answering {}", turn, last_move, column);
        writeln!(output, "{}", column)?;
        output.flush()?;
    }
    Ok(game)
}
