mod report;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use statbook_core::{
    actions::{self, GoalieAction, LineAction, OpponentGoalieAction, PlayerAction},
    GameEdit, NewGame, Statbook, StatbookConfig, StatsFilter, StoreError,
};
use statbook_schema::{Game, GameId};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "statbook")]
#[command(about = "Floorball game statistics CLI", long_about = None)]
struct Cli {
    /// JSON config file; fields it omits keep their defaults.
    #[arg(long, global = true, env = "STATBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the data directory of the config.
    #[arg(long, global = true, env = "STATBOOK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List stored games.
    Games {
        #[arg(long)]
        season: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Print one game.
    Show {
        id: GameId,
        #[arg(long)]
        json: bool,
    },
    /// Aggregate statistics over the selected games.
    Stats {
        #[arg(long)]
        season: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        hide_zero: bool,
        #[arg(long)]
        json: bool,
    },
    /// Create a game and print its id.
    NewGame {
        #[arg(long)]
        season: String,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        home: Option<String>,
        #[arg(long)]
        away: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        referee1: Option<String>,
        #[arg(long)]
        referee2: Option<String>,
        /// Comma separated player labels; repeat once per line.
        #[arg(long = "line")]
        lines: Vec<String>,
        #[arg(long = "goalie")]
        goalies: Vec<String>,
        #[arg(long)]
        opponent_goalie: bool,
    },
    /// Change the details of a game; recorded stats are kept.
    EditGame {
        id: GameId,
        #[arg(long)]
        season: Option<String>,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        home: Option<String>,
        #[arg(long)]
        away: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        referee1: Option<String>,
        #[arg(long)]
        referee2: Option<String>,
        /// Replaces all lines when given; comma separated, repeat once per line.
        #[arg(long = "line")]
        lines: Vec<String>,
        /// Replaces the goalie list when given.
        #[arg(long = "goalie")]
        goalies: Vec<String>,
        #[arg(long)]
        opponent_goalie: Option<bool>,
    },
    /// Replace a game with the JSON document in a file, keeping its id.
    ReplaceGame { id: GameId, input: PathBuf },
    /// Record a player event, e.g. `goal` or `assist_minus`.
    Player {
        id: GameId,
        player: String,
        action: String,
    },
    Goalie {
        id: GameId,
        goalie: String,
        action: String,
    },
    /// Plus or minus for a whole line (0-based).
    Line {
        id: GameId,
        line: usize,
        action: String,
    },
    Opponent {
        id: GameId,
        action: String,
    },
    /// Set the current period (`1`, `2`, `3`, `OT`).
    Period { id: GameId, period: String },
    /// Zero every counter and the score of a game.
    Reset { id: GameId },
    Delete { id: GameId },
    /// Copy the games file to a timestamped backup.
    Backup {
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    #[command(subcommand)]
    Roster(RosterCommand),
}

#[derive(Debug, Subcommand)]
enum RosterCommand {
    /// Players of one roster, or the known categories when no category is given.
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        season: Option<String>,
    },
    /// Append players from a text file of `number, surname, name, position[, tesser[, nickname]]`.
    Import {
        #[arg(long)]
        category: String,
        #[arg(long)]
        season: Option<String>,
        input: PathBuf,
    },
    /// Delete listed players, or the whole roster when none are listed.
    Delete {
        #[arg(long)]
        category: String,
        #[arg(long)]
        season: Option<String>,
        #[arg(long = "player")]
        players: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StatbookConfig::load(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => StatbookConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let book = Statbook::open(config);

    match cli.command {
        Command::Games { season, category } => {
            let filter = StatsFilter {
                season,
                category,
                hide_zero_stats: false,
            };
            for game in load(&book)?.iter().filter(|g| filter.matches(g)) {
                println!("{}", report::game_line(game));
            }
        }
        Command::Show { id, json } => {
            let game = book
                .game(id)
                .with_context(|| format!("failed to show game {id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&game).context("failed to serialize game")?);
            } else {
                report::print_game(&game);
            }
        }
        Command::Stats {
            season,
            category,
            hide_zero,
            json,
        } => {
            let mut games = load(&book)?;
            let filter = StatsFilter {
                season,
                category,
                hide_zero_stats: hide_zero,
            };
            let view = book.compute_stats(&mut games, &filter);
            if json {
                let selected: Vec<_> = view
                    .games(&games)
                    .map(|g| serde_json::json!({ "game": g, "calculated": g.calculated }))
                    .collect();
                let out = serde_json::json!({
                    "games": selected,
                    "players": view.players,
                    "goalies": view.goalies,
                    "opponent_goalie": view.opponent_goalie,
                });
                println!("{}", serde_json::to_string_pretty(&out).context("failed to serialize stats")?);
            } else {
                report::print_stats(&games, &view);
            }
        }
        Command::NewGame {
            season,
            team,
            home,
            away,
            date,
            referee1,
            referee2,
            lines,
            goalies,
            opponent_goalie,
        } => {
            let id = book
                .create_game(NewGame {
                    season,
                    team,
                    home_team: home,
                    away_team: away,
                    date,
                    referee1,
                    referee2,
                    lines: lines.iter().map(|l| split_line(l)).collect(),
                    goalies,
                    opponent_goalie_enabled: opponent_goalie,
                })
                .context("failed to create game")?;
            println!("{id}");
        }
        Command::EditGame {
            id,
            season,
            team,
            home,
            away,
            date,
            referee1,
            referee2,
            lines,
            goalies,
            opponent_goalie,
        } => {
            let edit = GameEdit {
                season,
                team,
                home_team: home,
                away_team: away,
                date,
                referee1,
                referee2,
                lines: (!lines.is_empty()).then(|| lines.iter().map(|l| split_line(l)).collect()),
                goalies: (!goalies.is_empty()).then_some(goalies),
                opponent_goalie_enabled: opponent_goalie,
            };
            book.modify_game(id, edit)
                .with_context(|| format!("failed to edit game {id}"))?;
        }
        Command::ReplaceGame { id, input } => {
            let text = fs::read_to_string(&input)
                .with_context(|| format!("failed to read: {}", input.display()))?;
            let game: Game = serde_json::from_str(&text)
                .with_context(|| format!("invalid game JSON: {}", input.display()))?;
            book.replace_game(id, game)
                .with_context(|| format!("failed to replace game {id}"))?;
        }
        Command::Player { id, player, action } => {
            let action: PlayerAction = action.parse().context("invalid player action")?;
            update(&book, id, |game| {
                if !game.has_player(&player) {
                    return Err(StoreError::PlayerNotFound(player.clone()));
                }
                actions::apply_player_action(game, &player, action);
                Ok(())
            })?;
        }
        Command::Goalie { id, goalie, action } => {
            let action: GoalieAction = action.parse().context("invalid goalie action")?;
            update(&book, id, |game| {
                if !game.goalies.contains(&goalie) {
                    return Err(StoreError::PlayerNotFound(goalie.clone()));
                }
                actions::apply_goalie_action(game, &goalie, action);
                Ok(())
            })?;
        }
        Command::Line { id, line, action } => {
            let action: LineAction = action.parse().context("invalid line action")?;
            update(&book, id, |game| actions::apply_line_action(game, line, action))?;
        }
        Command::Opponent { id, action } => {
            let action: OpponentGoalieAction =
                action.parse().context("invalid opponent goalie action")?;
            update(&book, id, |game| {
                actions::apply_opponent_goalie_action(game, action);
                Ok(())
            })?;
        }
        Command::Period { id, period } => {
            let period = actions::parse_period(&period).context("invalid period")?;
            update(&book, id, |game| {
                actions::set_period(game, period);
                Ok(())
            })?;
        }
        Command::Reset { id } => {
            update(&book, id, |game| {
                actions::reset_game(game);
                Ok(())
            })?;
        }
        Command::Delete { id } => {
            book.delete_game(id)
                .with_context(|| format!("failed to delete game {id}"))?;
        }
        Command::Backup { out_dir } => {
            let source = book.config().games_path();
            let dir = out_dir.unwrap_or_else(|| book.config().data_dir.clone());
            let target = backup(&source, &dir)?;
            println!("{}", target.display());
        }
        Command::Roster(command) => roster(&book, command)?,
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(book: &Statbook) -> anyhow::Result<Vec<Game>> {
    book.load_games().with_context(|| {
        format!(
            "failed to load games: {}",
            book.config().games_path().display()
        )
    })
}

fn update(
    book: &Statbook,
    id: GameId,
    f: impl FnOnce(&mut Game) -> Result<(), StoreError>,
) -> anyhow::Result<()> {
    book.update_game(id, f)
        .with_context(|| format!("failed to update game {id}"))
}

fn split_line(line: &str) -> Vec<String> {
    line.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn backup(source: &Path, dir: &Path) -> anyhow::Result<PathBuf> {
    if !source.exists() {
        bail!("nothing to back up: {} does not exist", source.display());
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create: {}", dir.display()))?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let target = dir.join(format!("games_backup_{stamp}.json"));
    fs::copy(source, &target)
        .with_context(|| format!("failed to write: {}", target.display()))?;
    log::info!("backed up {} to {}", source.display(), target.display());
    Ok(target)
}

fn roster(book: &Statbook, command: RosterCommand) -> anyhow::Result<()> {
    let rosters = book.rosters();
    match command {
        RosterCommand::List {
            category: Some(category),
            season,
        } => {
            let roster = rosters
                .load(&category, season.as_deref())
                .with_context(|| format!("failed to load roster {category}"))?;
            report::print_roster(&roster);
        }
        RosterCommand::List {
            category: None,
            season,
        } => {
            let categories = rosters
                .categories(season.as_deref())
                .context("failed to list rosters")?;
            for category in categories {
                println!("{category}");
            }
        }
        RosterCommand::Import {
            category,
            season,
            input,
        } => {
            let text = fs::read_to_string(&input)
                .with_context(|| format!("failed to read: {}", input.display()))?;
            let added = rosters
                .bulk_import(&category, season.as_deref(), &text)
                .with_context(|| format!("failed to import roster {category}"))?;
            println!("imported {added} players");
        }
        RosterCommand::Delete {
            category,
            season,
            players,
        } if players.is_empty() => {
            rosters
                .delete_roster(&category, season.as_deref())
                .with_context(|| format!("failed to delete roster {category}"))?;
        }
        RosterCommand::Delete {
            category,
            season,
            players,
        } => {
            let ids: Vec<&str> = players.iter().map(String::as_str).collect();
            let removed = rosters
                .delete_players(&category, season.as_deref(), &ids)
                .with_context(|| format!("failed to delete players from roster {category}"))?;
            println!("removed {removed} players");
        }
    }
    Ok(())
}
