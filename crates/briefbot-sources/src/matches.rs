//! Favorite-team fixtures and scores from ESPN soccer scoreboards.
//!
//! All configured leagues are fetched concurrently for today's date. A league
//! that fails is skipped; only when every league fails does the source fail.
//! The rendered section is cached per date for 15 minutes.

use async_trait::async_trait;
use briefbot_core::clock::{clock_time, date_key};
use briefbot_core::config::FootballConfig;
use briefbot_core::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use crate::format::normalize_team;
use crate::{Source, SourceContext, Sourced, http};

const ESPN_BASE: &str = "https://site.api.espn.com";
const CACHE_TTL: Duration = Duration::from_secs(900);
const NO_MATCHES: &str = "⚽ Bugün favori maç yok";

/// One rendered fixture, keyed by its raw start string for ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchLine {
    pub start: String,
    pub line: String,
}

pub struct MatchesSource {
    ctx: SourceContext,
    football: FootballConfig,
    favorites: HashSet<String>,
    base_url: String,
}

impl MatchesSource {
    pub fn new(ctx: SourceContext, football: FootballConfig) -> Self {
        let favorites = favorite_set(&football.favorite_teams);
        Self {
            ctx,
            football,
            favorites,
            base_url: ESPN_BASE.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_league(&self, league: &str, date: &str) -> Result<Vec<Value>> {
        let req = self
            .ctx
            .client
            .get(format!(
                "{}/apis/site/v2/sports/soccer/{league}/scoreboard",
                self.base_url
            ))
            .query(&[("dates", date)]);
        let data = http::fetch_json(req).await?;
        Ok(data["events"].as_array().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Source for MatchesSource {
    fn label(&self) -> &'static str {
        "espn_matches"
    }

    fn fallback(&self) -> &'static str {
        NO_MATCHES
    }

    async fn fetch(&self) -> Result<Sourced> {
        let date = date_key(self.ctx.clock.now(), self.ctx.tz);
        let cache_key = format!("cache/espn/favs/{date}");
        if let Ok(Some(cached)) = self.ctx.store.get(&cache_key).await {
            tracing::debug!("ESPN cache hit for {date}");
            return Ok(Sourced::fresh(cached));
        }

        let results = futures::future::join_all(
            self.football
                .leagues
                .iter()
                .map(|league| self.fetch_league(league, &date)),
        )
        .await;

        let mut events = Vec::new();
        let mut first_error = None;
        let mut ok_leagues = 0usize;
        for (league, result) in self.football.leagues.iter().zip(results) {
            match result {
                Ok(mut evs) => {
                    ok_leagues += 1;
                    events.append(&mut evs);
                }
                Err(e) => {
                    tracing::warn!("⚠️ ESPN league '{league}' failed: {e}");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if ok_leagues == 0
            && let Some(e) = first_error
        {
            return Err(e);
        }

        let lines = favorite_matches(&events, &self.favorites, self.ctx.tz);
        let text = render_matches(lines, self.football.max_matches);
        if let Err(e) = self.ctx.store.put(&cache_key, &text, CACHE_TTL).await {
            tracing::warn!("⚠️ Failed to cache ESPN section: {e}");
        }
        Ok(Sourced::fresh(text))
    }
}

pub fn favorite_set(teams: &[String]) -> HashSet<String> {
    teams.iter().map(|t| normalize_team(t)).collect()
}

/// Pick the events involving a favorite and render one line each, sorted by
/// start time.
pub fn favorite_matches(events: &[Value], favorites: &HashSet<String>, tz: Tz) -> Vec<MatchLine> {
    let mut matches: Vec<MatchLine> = events
        .iter()
        .filter_map(|ev| match_line(ev, favorites, tz))
        .collect();
    matches.sort_by(|a, b| a.start.cmp(&b.start));
    matches
}

fn match_line(ev: &Value, favorites: &HashSet<String>, tz: Tz) -> Option<MatchLine> {
    let competitors = ev["competitions"][0]["competitors"].as_array()?;
    if competitors.len() < 2 {
        return None;
    }
    let side = |which: &str, idx: usize| {
        competitors
            .iter()
            .find(|c| c["homeAway"].as_str() == Some(which))
            .unwrap_or(&competitors[idx])
    };
    let home = side("home", 0);
    let away = side("away", 1);

    let home_name = home["team"]["displayName"].as_str().unwrap_or("");
    let away_name = away["team"]["displayName"].as_str().unwrap_or("");
    if !favorites.contains(&normalize_team(home_name))
        && !favorites.contains(&normalize_team(away_name))
    {
        return None;
    }

    let start = ev["date"].as_str().unwrap_or("");
    let status_type = &ev["status"]["type"];
    let status = status_type["shortDetail"]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| status_type["description"].as_str())
        .unwrap_or("");
    let state = status_type["state"].as_str();
    let completed = status_type["completed"].as_bool() == Some(true);
    let show_score = matches!(state, Some("in") | Some("post")) || completed;

    let mut parts = Vec::new();
    if let Some(kickoff) = parse_start(start) {
        parts.push(clock_time(kickoff, tz));
    }
    if show_score
        && let (Some(h), Some(a)) = (score_text(&home["score"]), score_text(&away["score"]))
    {
        parts.push(format!("{h}-{a}"));
    }
    if !status.is_empty() {
        parts.push(status.to_string());
    }

    let mut line = format!("• {home_name} vs {away_name}");
    if !parts.is_empty() {
        line.push_str(" | ");
        line.push_str(&parts.join(" | "));
    }
    Some(MatchLine {
        start: start.to_string(),
        line,
    })
}

/// ESPN dates come as `2026-10-16T17:00Z` (no seconds) or full RFC 3339.
fn parse_start(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
                .ok()
                .map(|n| n.and_utc())
        })
}

fn score_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `⚽ Maçlar:` followed by at most `max` lines, or the no-match line.
pub fn render_matches(lines: Vec<MatchLine>, max: usize) -> String {
    if lines.is_empty() {
        return NO_MATCHES.to_string();
    }
    let top: Vec<String> = lines.into_iter().take(max).map(|m| m.line).collect();
    format!("⚽ Maçlar:\n{}", top.join("\n"))
}
