use clap::Parser;
use color_eyre::eyre::Result;
use fexerj_rating::constants::IDENTITY_CACHE_FILE;
use fexerj_rating::fetch::ChessResultsFetcher;
use fexerj_rating::identity::{ConsoleResolver, IdentityCache};
use fexerj_rating::policy::RatingPolicy;
use fexerj_rating::runner::BatchRunner;
use fexerj_rating::tournaments::load_tournaments;
use std::path::PathBuf;

/// Replays chess-results tournaments against the FEXERJ rating list, writing
/// one roster snapshot and one audit file per tournament.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Semicolon-separated tournament list (#;CR_id;Name;EndDate;Type;isIRT?;isFEXERJ?)
    tournament_list: PathBuf,
    /// `#` of the first tournament to process (1-based)
    first: u32,
    /// How many tournaments to process from there
    count: u32,
    /// Rating list to start from when processing tournament #1
    players_list: PathBuf,
    /// TOML file overriding the federation rating policy
    #[arg(long)]
    policy: Option<PathBuf>,
    /// Directory receiving snapshot and audit files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Cached manual identity resolutions; delete it if the source data changes
    #[arg(long, default_value = IDENTITY_CACHE_FILE)]
    identity_cache: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let policy = match &cli.policy {
        Some(path) => RatingPolicy::load(path)?,
        None => RatingPolicy::default(),
    };
    let tournaments = load_tournaments(&cli.tournament_list)?;
    let cache = IdentityCache::load(&cli.identity_cache);

    let mut runner = BatchRunner::new(
        tournaments,
        ChessResultsFetcher::default(),
        ConsoleResolver,
        cache,
        policy,
        cli.players_list,
        cli.out_dir,
    );
    runner.run(cli.first, cli.count)?;
    Ok(())
}
