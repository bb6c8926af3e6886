use clap::Parser;
use minesweeper_agent::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Autonomous minesweeper bot: reveals cells it can prove safe, guesses otherwise.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Board height
    #[arg(long, default_value_t = 8)]
    height: usize,

    /// Board width
    #[arg(long, default_value_t = 8)]
    width: usize,

    /// Number of mines
    #[arg(long, default_value_t = 8)]
    mines: usize,

    /// Seed for mine placement and guesses; random if omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Number of games to play
    #[arg(long, default_value_t = 1)]
    games: usize,

    /// Pause between moves, in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Don't print boards or moves
    #[arg(long)]
    quiet: bool,

    /// Print one JSON report per game
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let verbose = !args.quiet && !args.json;
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, games = args.games, "starting");

    let mut wins = 0;
    for index in 0..args.games {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
        let field = Minefield::new(args.height, args.width, args.mines, &mut rng)?;
        let mut game = Game::new(field);

        if verbose {
            println!("--- Autonomous Minesweeper Bot (game {}, seed {}) ---", index + 1, seed);
            println!("Strategy: Prioritize logically safe moves, guess randomly otherwise.");
        }

        let report = if verbose {
            play_visibly(&mut game, &mut rng, Duration::from_millis(args.delay_ms))?
        } else {
            game.play(&mut rng)?
        };

        if report.state == GameState::Won {
            wins += 1;
        }
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    if !args.json && args.games > 1 {
        println!("Won {wins} of {} games.", args.games);
    }
    Ok(())
}

/// Plays one game, printing every move and the board after it.
fn play_visibly(
    game: &mut Game,
    rng: &mut StdRng,
    delay: Duration,
) -> anyhow::Result<GameReport> {
    let mut move_count = 0;
    while game.game_state == GameState::Playing {
        move_count += 1;
        println!("\n--- Move #{} ---", move_count);

        let Some(mv) = game.step(rng)? else {
            // No hidden cell left that isn't a known mine.
            println!("No valid moves left for the bot to make.");
            break;
        };

        match mv.kind {
            MoveKind::Safe => println!("Logic found a guaranteed safe cell."),
            MoveKind::Guess => println!("No logically safe move found. Making a random guess..."),
        }
        println!("Bot reveals {}...", mv.point);
        print_board(game.board());

        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    println!("\n--- Game Over ---");
    match game.game_state {
        GameState::Won => println!("Result: The bot won!"),
        GameState::Lost => {
            println!("Result: The bot hit a mine and lost.");
            print!("{}", game.minefield());
        }
        GameState::Playing => println!("Result: The game ended unexpectedly."),
    }
    Ok(game.report())
}

fn print_board(board: &[Vec<Cell>]) {
    let width = board.first().map_or(0, Vec::len);

    // Print header
    print!("   ");
    for col in 0..width {
        print!("{:^3}", col);
    }
    println!("\n  +{}", "---".repeat(width));

    // Print rows
    for (row, cells) in board.iter().enumerate() {
        print!("{:^2}|", row);
        for cell in cells {
            let display = match cell {
                Cell::Hidden => " ■ ".to_string(),
                Cell::Flagged => " F ".to_string(),
                Cell::Mine => " * ".to_string(),
                Cell::Revealed(n) => format!(" {} ", n),
            };
            print!("{}", display);
        }
        println!();
    }
    println!();
}
