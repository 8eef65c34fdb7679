use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use flexi_logger::Logger;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, SeedableRng};

use std::io::{stderr, stdin, stdout, Write};
use std::time::{Duration, Instant};

use connect4_mcts::bitboard::{GameState, Player, Position};
use connect4_mcts::bot::{self, Game};
use connect4_mcts::config::{Budget, SearchConfig, DEFAULT_EXPLORATION};
use connect4_mcts::mcts::SearchTree;
use connect4_mcts::WIDTH;

mod render;
use render::display;

#[derive(Parser)]
#[command(
    name = "connect4",
    about = "Play Connect 4 against a Monte-Carlo tree search agent"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Simulations per AI move, overrides --time-ms
    #[arg(long, global = true)]
    iterations: Option<u64>,

    /// Thinking time per AI move in milliseconds
    #[arg(long, global = true, default_value_t = 95)]
    time_ms: u64,

    /// Exploration constant of the UCB1 formula
    #[arg(long, global = true, default_value_t = DEFAULT_EXPLORATION)]
    exploration: f64,

    /// Expand columns left to right instead of wins and centre first
    #[arg(long, global = true)]
    no_sort: bool,

    /// Seed for the playout random number generator
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log level, RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Play an interactive game (default)
    Play {
        /// Opening moves as 1-indexed column digits
        #[arg(default_value = "")]
        moves: String,
    },
    /// Search a position for a fixed number of simulations
    Analyse {
        /// Moves leading to the position as 1-indexed column digits
        #[arg(default_value = "")]
        moves: String,
        #[arg(long, default_value_t = 1_000_000)]
        simulations: u64,
    },
    /// Let the agent play against itself
    Selfplay {
        #[arg(long, default_value_t = 1)]
        games: u32,
    },
    /// Play against a referee over stdin/stdout, columns 0-indexed
    Bot,
}

impl Cli {
    fn budget(&self) -> Budget {
        match self.iterations {
            Some(iterations) => Budget::Iterations(iterations),
            None => Budget::Time(Duration::from_millis(self.time_ms)),
        }
    }

    fn search_config(&self) -> SearchConfig {
        SearchConfig::default()
            .with_exploration(self.exploration)
            .with_sort_moves(!self.no_sort)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logger = Logger::try_with_env_or_str(&cli.log_level)?.start()?;

    match &cli.command {
        None => play(&cli, ""),
        Some(Command::Play { moves }) => play(&cli, moves),
        Some(Command::Analyse { moves, simulations }) => analyse(&cli, moves, *simulations),
        Some(Command::Selfplay { games }) => selfplay(&cli, *games),
        Some(Command::Bot) => run_bot(&cli),
    }
}

fn ask_yes_no(question: &str) -> Result<bool> {
    let stdin = stdin();
    loop {
        let mut buffer = String::new();
        print!("{} y/n: ", question);
        stdout().flush()?;
        if stdin.read_line(&mut buffer)? == 0 {
            return Err(anyhow!("input closed"));
        }
        match buffer.to_lowercase().chars().next() {
            Some('y') => return Ok(true),
            Some('n') => return Ok(false),
            _ => println!("Unknown answer given"),
        }
    }
}

fn play(cli: &Cli, moves: &str) -> Result<()> {
    let mut game = Game::new(Position::from_moves(moves)?, cli.search_config())?;
    let mut rng = cli.rng();
    let budget = cli.budget();

    println!("Welcome to Connect 4\n");

    let ai_players = (
        ask_yes_no("Is player 1 AI controlled?")?,
        ask_yes_no("Is player 2 AI controlled?")?,
    );

    let stdin = stdin();

    // game loop
    loop {
        display(game.position())?;

        match game.position().state() {
            GameState::Playing => {
                let player = game.position().current_player();
                let ai_turn = match player {
                    Player::One => ai_players.0,
                    Player::Two => ai_players.1,
                };

                let column = if ai_turn {
                    println!("AI is thinking...");
                    stdout().flush()?;

                    // slow down play if both players are AI
                    if ai_players == (true, true) {
                        std::thread::sleep(Duration::new(1, 0));
                    }

                    let column = game.think(budget, &mut rng)?;
                    let root = game.tree().root_node();
                    println!(
                        "Best move: {} ({} simulations)",
                        column + 1,
                        root.simulations()
                    );
                    column
                } else {
                    print!("Move input > ");
                    stdout().flush()?;
                    let mut input_str = String::new();
                    if stdin.read_line(&mut input_str)? == 0 {
                        return Ok(());
                    }

                    match input_str.trim().parse::<usize>() {
                        Ok(column @ 1..=WIDTH) => column - 1,
                        _ => {
                            println!(
                                "Invalid move: {}. Columns must be between 1 and {}",
                                input_str.trim(),
                                WIDTH
                            );
                            continue;
                        }
                    }
                };

                if let Err(err) = game.play(column) {
                    println!("{}", err);
                    // try the move again
                    continue;
                }
            }

            // end states
            GameState::PlayerOneWin => {
                println!("Player 1 wins!");
                break;
            }
            GameState::PlayerTwoWin => {
                println!("Player 2 wins!");
                break;
            }
            GameState::Draw => {
                println!("Draw!");
                break;
            }
        }
    }
    Ok(())
}

fn analyse(cli: &Cli, moves: &str, simulations: u64) -> Result<()> {
    const CHUNK: u64 = 10_000;

    let position = Position::from_moves(moves)?;
    if position.is_terminal() {
        return Err(anyhow!("Invalid position, game is over"));
    }
    let mut tree = SearchTree::with_config(position, cli.search_config())?;
    let mut rng = cli.rng();

    print!("{}", position);

    let start = Instant::now();
    let progress = ProgressBar::new(simulations);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("Simulating: {bar:40.cyan/blue} {pos}/{len} ~{eta} remaining")
            .progress_chars("█▓▒░  "),
    );

    let mut done = 0;
    while done < simulations {
        let chunk = CHUNK.min(simulations - done);
        done += tree.search(Budget::Iterations(chunk), &mut rng);
        progress.inc(chunk);
    }
    progress.finish();

    println!("Search completed in {}", HumanDuration(start.elapsed()));
    tree.info(&mut stderr())?;
    println!("bestmove = {}", tree.best_move()? + 1);
    Ok(())
}

fn selfplay(cli: &Cli, games: u32) -> Result<()> {
    let mut rng = cli.rng();
    let budget = cli.budget();
    // wins per player, then draws
    let mut results = [0u32; 3];

    for number in 1..=games {
        let mut game = Game::new(Position::new(), cli.search_config())?;
        let mut record = String::new();

        while !game.position().is_terminal() {
            let column = game.think(budget, &mut rng)?;
            game.play(column)?;
            record.push_str(&(column + 1).to_string());
        }

        print!("{}", game.position());
        match game.position().winner() {
            Some(player) => {
                results[player.index()] += 1;
                println!(
                    "Game {}: player {} wins after {} moves ({})",
                    number,
                    player.index() + 1,
                    game.position().num_moves(),
                    record
                );
            }
            None => {
                results[2] += 1;
                println!("Game {}: draw ({})", number, record);
            }
        }
    }

    println!(
        "Player 1 wins: {}, Player 2 wins: {}, Draws: {}",
        results[0], results[1], results[2]
    );
    Ok(())
}

fn run_bot(cli: &Cli) -> Result<()> {
    let game = Game::new(Position::new(), cli.search_config())?;
    let mut rng = cli.rng();
    let stdin = stdin();
    let stdout = stdout();
    bot::run(stdin.lock(), stdout.lock(), game, cli.budget(), &mut rng)?;
    Ok(())
}
