use statbook_core::AggregatedView;
use statbook_schema::{Game, Period, RosterPlayer};

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}%", v * 100.0))
}

pub fn game_line(game: &Game) -> String {
    let (home, away) = game.score();
    format!(
        "{:>4}  {:<10}  {:<8}  {:<6}  {} vs {}  {home}-{away}",
        game.id.map_or_else(|| "?".to_string(), |id| id.to_string()),
        or_dash(game.date.as_deref()),
        or_dash(Some(game.season.as_str())),
        or_dash(game.team.as_deref()),
        or_dash(game.home_team.as_deref()),
        or_dash(game.away_team.as_deref()),
    )
}

pub fn print_game(game: &Game) {
    println!("{}", game_line(game));
    let referees: Vec<&str> = [game.referee1.as_deref(), game.referee2.as_deref()]
        .into_iter()
        .flatten()
        .filter(|r| !r.is_empty())
        .collect();
    if !referees.is_empty() {
        println!("referees: {}", referees.join(", "));
    }
    println!("period: {}", game.current_period.label());
    for period in Period::ALL {
        if let Some(score) = game.result.get(&period) {
            println!("  {:>2}: {}-{}", period.label(), score.home, score.away);
        }
    }

    for (i, line) in game.lines.iter().enumerate() {
        println!("line {i}:");
        for player in line {
            println!(
                "  {player:<28} G {:>2}  A {:>2}  +/- {:>3}  SOG {:>2}  PT {:>2}  PD {:>2}  UE {:>2}",
                game.goals.get(player),
                game.assists.get(player),
                game.plusminus.get(player),
                game.shots_on_goal.get(player),
                game.penalties_taken.get(player),
                game.penalties_drawn.get(player),
                game.unforced_errors.get(player),
            );
        }
    }
    for goalie in &game.goalies {
        println!(
            "goalie {goalie:<21} SV {:>2}  GA {:>2}  +/- {:>3}",
            game.saves.get(goalie),
            game.goals_conceded.get(goalie),
            game.goalie_plusminus.get(goalie),
        );
    }
}

pub fn print_stats(games: &[Game], view: &AggregatedView) {
    println!("games: {}", view.order.len());
    for game in view.games(games) {
        println!("{}", game_line(game));
    }

    if !view.players.is_empty() {
        println!();
        println!(
            "{:<28} {:>3} {:>3} {:>3} {:>4} {:>4} {:>3} {:>3} {:>3} {:>7}",
            "player", "GP", "G", "A", "+/-", "SOG", "PT", "PD", "UE", "score"
        );
    }
    for (name, t) in &view.players {
        println!(
            "{name:<28} {:>3} {:>3} {:>3} {:>4} {:>4} {:>3} {:>3} {:>3} {:>7.2}",
            t.games,
            t.line.goals,
            t.line.assists,
            t.line.plusminus,
            t.line.shots_on_goal,
            t.line.penalties_taken,
            t.line.penalties_drawn,
            t.line.unforced_errors,
            t.game_score,
        );
    }

    if !view.goalies.is_empty() {
        println!();
        println!(
            "{:<28} {:>3} {:>4} {:>4} {:>7} {:>7}",
            "goalie", "GP", "SV", "GA", "SV%", "score"
        );
    }
    for (name, t) in &view.goalies {
        println!(
            "{name:<28} {:>3} {:>4} {:>4} {:>7} {:>7.2}",
            t.games,
            t.saves,
            t.goals_conceded,
            pct(t.average_save_percentage),
            t.game_score,
        );
    }

    let opponent = &view.opponent_goalie;
    if !opponent.save_percentages.is_empty() {
        println!();
        println!(
            "opponent goalie: SV {}  GA {}  SV% {}",
            opponent.saves,
            opponent.goals_conceded,
            pct(opponent.average_save_percentage)
        );
    }
}

/// Jersey order; numbers that do not parse go last, in file order.
pub fn print_roster(roster: &[RosterPlayer]) {
    let mut sorted: Vec<&RosterPlayer> = roster.iter().collect();
    sorted.sort_by_key(|p| p.number.trim().parse::<u32>().map_or((1, 0), |n| (0, n)));
    for player in sorted {
        println!(
            "{:>4}  {}  {}  {}{}",
            player.id,
            player.label(),
            player.position.code(),
            player.tesser,
            if player.nickname.is_empty() {
                String::new()
            } else {
                format!("  ({})", player.nickname)
            }
        );
    }
}
