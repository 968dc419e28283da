//! Tilechain CLI
//!
//! Play, replay and verify games from the command line.
//! Every subcommand runs the same deterministic engine a verifier would.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tilechain::{
    VERSION, CELL_COUNT, GRID_SIZE,
    core::hash::to_hex,
    core::rng::SeedInputs,
    game::{parse_moves, format_moves, Board, Direction, GameSession},
    proof::{
        pack_board, pack_board_values, pack_moves, unpack_board, replay, verify, verify_submission,
        SubmissionPayload,
    },
};

#[derive(Parser, Debug)]
#[command(name = "tilechain", version, about = "Deterministic sliding-merge engine")]
struct Cli {
    /// Log level filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a session from seed source data (or a raw seed) and play a move string
    Play {
        /// 32-byte randomness, hex
        #[arg(long, required_unless_present = "seed", conflicts_with = "seed")]
        randomness: Option<String>,
        /// Raw seed string instead of seed source data
        #[arg(long)]
        seed: Option<String>,
        /// Player identifier
        #[arg(long)]
        identifier: Option<String>,
        /// Start time in epoch millis (default: now)
        #[arg(long)]
        start_time: Option<i64>,
        /// Moves, e.g. "LURD"
        #[arg(long, default_value = "")]
        moves: String,
        /// Keep cycling U/R/D/L after the given moves until the game ends
        #[arg(long)]
        finish: bool,
        /// Write the submission payload (JSON) here when the game ends
        #[arg(long)]
        payload_out: Option<PathBuf>,
    },

    /// Replay a raw seed and move string
    Replay {
        /// Seed string
        #[arg(long)]
        seed: String,
        /// Moves, e.g. "LUL"
        #[arg(long)]
        moves: String,
        /// Claimed score to check
        #[arg(long)]
        score: Option<u64>,
        /// Claimed commitment (hex) to check
        #[arg(long)]
        commitment: Option<String>,
    },

    /// Verify a submission payload file against a move string
    Verify {
        /// Payload JSON file
        #[arg(long)]
        payload: PathBuf,
        /// Moves, e.g. "LURD"
        #[arg(long)]
        moves: String,
        /// Player identifier used at session start
        #[arg(long)]
        identifier: Option<String>,
    },

    /// Print the grid stored in a packed board
    Unpack {
        /// Packed board, decimal or 0x hex
        board: String,
    },

    /// Pack 16 cell values (row-major, 0 for empty) into a board
    Pack {
        /// Cell values, comma or space separated
        cells: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Tilechain v{}", VERSION);

    match cli.command {
        Command::Play { randomness, seed, identifier, start_time, moves, finish, payload_out } => {
            let session = match (randomness, seed) {
                (Some(randomness), _) => {
                    let start_time = start_time.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
                    let inputs = SeedInputs::new(randomness, identifier, start_time);
                    GameSession::start(&inputs).context("session start failed")?
                }
                (None, Some(seed)) => GameSession::from_seed(seed),
                (None, None) => bail!("either --randomness or --seed is required"),
            };
            play(session, &parse(&moves)?, finish, payload_out)
        }
        Command::Replay { seed, moves, score, commitment } => {
            replay_command(&seed, &parse(&moves)?, score, commitment.as_deref())
        }
        Command::Verify { payload, moves, identifier } => {
            verify_command(&payload, &parse(&moves)?, identifier.as_deref())
        }
        Command::Unpack { board } => {
            let packed = parse_u64(&board)?;
            print!("{}", unpack_board(packed));
            Ok(())
        }
        Command::Pack { cells } => {
            let board = parse_board(&cells)?;
            print!("{}", board);
            println!("board: {:#018x}", pack_board_values(&board)?);
            Ok(())
        }
    }
}

fn parse(moves: &str) -> Result<Vec<Direction>> {
    parse_moves(moves).map_err(|c| anyhow!("invalid move '{}', expected U/R/D/L", c))
}

fn parse_u64(s: &str) -> Result<u64> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .with_context(|| format!("invalid packed board '{}'", s))
}

fn parse_board(cells: &str) -> Result<Board> {
    let values = cells
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<u32>().with_context(|| format!("invalid cell value '{}'", v)))
        .collect::<Result<Vec<_>>>()?;
    if values.len() != CELL_COUNT {
        bail!("expected {} cell values, got {}", CELL_COUNT, values.len());
    }

    let mut grid = [[0u32; GRID_SIZE]; GRID_SIZE];
    for (i, value) in values.into_iter().enumerate() {
        grid[i / GRID_SIZE][i % GRID_SIZE] = value;
    }
    Ok(Board(grid))
}

fn play(mut session: GameSession, moves: &[Direction], finish: bool, payload_out: Option<PathBuf>) -> Result<()> {
    info!("Seed: {}", session.seed());

    for dir in moves {
        session.apply_player_move(*dir)?;
    }

    if finish {
        while !session.is_over() {
            for dir in Direction::ALL {
                if session.apply_player_move(dir)?.moved {
                    break;
                }
            }
        }
    }

    print!("{}", session.board());
    println!("score:      {}", session.score());
    println!("moves:      {}", format_moves(session.move_log()));
    println!("commitment: {}", session.commitment_hex());
    println!("over:       {}", session.is_over());

    if let Some(path) = payload_out {
        let start_time = session.start_time().unwrap_or_default();
        let end_time = chrono::Utc::now().timestamp_millis().max(start_time);
        let payload = SubmissionPayload::from_session(&session, end_time)?;
        fs::write(&path, payload.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Payload written to {}", path.display());
        println!("packed moves: {}", pack_moves(session.move_log()).to_hex());
    }
    Ok(())
}

fn replay_command(seed: &str, moves: &[Direction], score: Option<u64>, commitment: Option<&str>) -> Result<()> {
    let replayed = replay(seed, moves);
    print!("{}", replayed.board());
    println!("score:      {}", replayed.score);
    println!("commitment: {}", to_hex(&replayed.commitment));
    println!("board:      {:#018x}", pack_board(&replayed.tiles)?);

    if score.is_some() || commitment.is_some() {
        let claimed_commitment = match commitment {
            Some(hex) => tilechain::core::hash::from_hex(hex)
                .ok_or_else(|| anyhow!("invalid commitment '{}'", hex))?,
            None => replayed.commitment,
        };
        let result = verify(seed, moves, score.unwrap_or(replayed.score), claimed_commitment);
        report(result.ok, result.error.map(|e| e.to_string()))?;
    }
    Ok(())
}

fn verify_command(path: &Path, moves: &[Direction], identifier: Option<&str>) -> Result<()> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let payload = SubmissionPayload::from_json(&json).context("parsing payload")?;

    let result = verify_submission(&payload, moves, identifier);
    println!("recomputed score:      {}", result.recomputed_score);
    println!("recomputed commitment: {}", to_hex(&result.recomputed_commitment));
    report(result.ok, result.error.map(|e| e.to_string()))
}

fn report(ok: bool, error: Option<String>) -> Result<()> {
    if ok {
        println!("VERIFIED");
        Ok(())
    } else {
        bail!("verification failed: {}", error.unwrap_or_default())
    }
}
