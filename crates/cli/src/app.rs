use anyhow::{bail, Context, Result};
use namematch_connection::{
    collection_name, ConnectionDeps, ConnectionEngine, ConnectionError, JoinOutcome,
    JsonConnectionStore, LinkState, Side, WatchSession,
};
use namematch_corpus::{aggregate_lines, candidates, ChunkedLineReader, NameFilter, NameSeries};
use namematch_model::{Gender, LogReporter, NameSort, TimePeriod, FIRST_CORPUS_YEAR, LAST_CORPUS_YEAR};
use namematch_store::{JsonPreferences, JsonSeenStore, PreferencesExt, SeenStore, split_history_by_gender};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Explicit wiring of every component a command needs; built once per
/// invocation, no global registry.
pub struct App {
    engine: ConnectionEngine,
    seen: Arc<JsonSeenStore>,
    prefs: Arc<JsonPreferences>,
    reader: ChunkedLineReader,
}

impl App {
    pub async fn open(
        data_dir: &Path,
        remote_dir: &Path,
        corpus_dir: &Path,
        testing: bool,
    ) -> Result<App> {
        let seen = Arc::new(
            JsonSeenStore::open(data_dir.join("seen.json"))
                .await
                .context("open seen store")?,
        );
        let prefs = Arc::new(
            JsonPreferences::open(data_dir.join("prefs.json"))
                .await
                .context("open preferences")?,
        );
        let remote = Arc::new(JsonConnectionStore::new(remote_dir, collection_name(testing)));
        let engine = ConnectionEngine::new(ConnectionDeps {
            remote,
            seen: seen.clone(),
            prefs: prefs.clone(),
            reporter: Arc::new(LogReporter),
        });

        Ok(App {
            engine,
            seen,
            prefs,
            reader: ChunkedLineReader::new(corpus_dir),
        })
    }

    pub async fn suggest(&self, limit: usize) -> Result<()> {
        let gender = self.prefs.gender_or_default().await?;
        let period = self.prefs.time_period_or_default().await?;
        let starts_with = self.prefs.starts_with_or_default().await?;
        let max_length = self.prefs.max_length_or_default().await?;
        let sort = self.prefs.sort_or_default().await?;

        let lines = self
            .reader
            .read_range(period.range())
            .await
            .context("read corpus")?;
        let filter = NameFilter::new(gender, starts_with, max_length);
        let series = aggregate_lines(lines.iter().map(String::as_str), &filter);

        let seen_names: HashSet<String> = self
            .seen
            .list_all()
            .await?
            .into_iter()
            .map(|row| row.name)
            .collect();
        let list = candidates(series, &seen_names, sort);

        if list.is_empty() {
            println!("No candidates left for the current filters.");
            return Ok(());
        }
        for series in list.iter().take(limit) {
            println!("{}", describe(series));
        }
        if list.len() > limit {
            println!("... and {} more", list.len() - limit);
        }
        Ok(())
    }

    pub async fn swipe(&self, name: &str, gender_code: &str, liked: bool) -> Result<()> {
        self.engine.record_swipe(name, gender_code, liked).await?;
        if liked {
            println!("Liked {name} ({gender_code}).");
        } else {
            println!("Passed on {name} ({gender_code}).");
        }
        Ok(())
    }

    pub async fn reverse(&self, name: &str, gender_code: &str) -> Result<()> {
        let row = self
            .seen
            .list_all()
            .await?
            .into_iter()
            .find(|row| row.name == name && row.gender_code == gender_code);
        let Some(row) = row else {
            bail!("no decision recorded for {name} ({gender_code})");
        };

        let now_liked = !row.liked;
        self.engine
            .reverse_decision(name, gender_code, now_liked)
            .await?;
        if now_liked {
            println!("{name} ({gender_code}) is now liked.");
        } else {
            println!("{name} ({gender_code}) is no longer liked.");
        }
        Ok(())
    }

    pub async fn seen_overview(&self) -> Result<()> {
        let rows = self.seen.list_all().await?;
        if rows.is_empty() {
            println!("No decisions yet.");
        } else {
            let (boys, girls) = split_history_by_gender(rows);
            println!("Boys:");
            for row in &boys {
                println!("  {} {}", if row.liked { "+" } else { "-" }, row.name);
            }
            println!("Girls:");
            for row in &girls {
                println!("  {} {}", if row.liked { "+" } else { "-" }, row.name);
            }
        }

        match self.engine.link_state().await? {
            LinkState::Connected(connection) => {
                let mut matched = connection.matched.clone();
                matched.sort_by(|a, b| b.name.cmp(&a.name));
                println!("Matches with your partner:");
                for claim in &matched {
                    println!("  {} ({})", claim.name, claim.gender_code);
                }
                if let Some(side) = self.own_side(&connection).await? {
                    if connection.has_unread_matches(side) {
                        println!("You have new matches!");
                    }
                }
            }
            LinkState::AwaitingPartner(_) => println!("Waiting for your partner to join."),
            LinkState::Dissolved => println!("Your connection was deleted by your partner."),
            LinkState::NoConnection => {}
        }
        Ok(())
    }

    pub async fn show_filters(&self) -> Result<()> {
        let gender = self.prefs.gender_or_default().await?;
        let period = self.prefs.time_period_or_default().await?;
        let starts_with = self.prefs.starts_with_or_default().await?;
        let max_length = self.prefs.max_length_or_default().await?;
        let sort = self.prefs.sort_or_default().await?;

        println!("gender:      {}", gender.display());
        println!("period:      {}", period.display());
        println!(
            "starts with: {}",
            if starts_with.is_empty() { "(any)" } else { &starts_with }
        );
        if max_length == usize::MAX {
            println!("max length:  (unbounded)");
        } else {
            println!("max length:  {max_length}");
        }
        println!("sort:        {}", sort.display());
        Ok(())
    }

    pub async fn set_filters(
        &self,
        gender: Option<&str>,
        starts_with: Option<&str>,
        max_length: Option<&str>,
        period: Option<&str>,
        sort: Option<&str>,
    ) -> Result<()> {
        if let Some(raw) = gender {
            let gender = match raw {
                "M" | "m" | "male" => Gender::Male,
                "F" | "f" | "female" => Gender::Female,
                "both" | "b" => Gender::Both,
                _ => bail!("unknown gender '{raw}', expected M, F, or both"),
            };
            self.prefs.set_gender(gender).await?;
        }
        if let Some(prefix) = starts_with {
            self.prefs.set_starts_with(prefix).await?;
        }
        if let Some(raw) = max_length {
            let max_length = if raw == "none" {
                usize::MAX
            } else {
                raw.parse().with_context(|| format!("bad max length '{raw}'"))?
            };
            self.prefs.set_max_length(max_length).await?;
        }
        if let Some(raw) = period {
            self.prefs.set_time_period(parse_period(raw)?).await?;
        }
        if let Some(raw) = sort {
            let sort = match raw {
                "random" => NameSort::Random,
                "popular" => NameSort::Popular,
                _ => bail!("unknown sort '{raw}', expected random or popular"),
            };
            self.prefs.set_sort(sort).await?;
        }
        self.show_filters().await
    }

    pub async fn create_connection(&self, family_name: Option<&str>) -> Result<()> {
        if let Some(code) = self.prefs.last_known_connection().await? {
            bail!("already connected via code {code}; delete it first");
        }
        if let Some(family_name) = family_name {
            self.prefs.set_partner_last_name(family_name).await?;
        }
        let connection = self.engine.create().await?;
        println!("Connection created. Share this code with your partner:");
        println!("  {}", connection.id);
        Ok(())
    }

    pub async fn join_connection(&self, code: &str, family_name: Option<&str>) -> Result<()> {
        if let Some(family_name) = family_name {
            self.prefs.set_partner_last_name(family_name).await?;
        }
        match self.engine.join(code).await? {
            JoinOutcome::Joined(connection) => {
                println!("Connected! {} matches already.", connection.matched.len());
            }
            JoinOutcome::CodeDoesNotExist => {
                println!("No connection exists with code {code}.");
            }
            JoinOutcome::AlreadyHasPartner => {
                println!("That connection already has a partner.");
            }
        }
        Ok(())
    }

    pub async fn connection_status(&self) -> Result<()> {
        match self.engine.link_state().await? {
            LinkState::NoConnection => println!("No active connection."),
            LinkState::AwaitingPartner(connection) => {
                println!("Waiting for a partner to join {}.", connection.id);
                println!("  your likes pending: {}", connection.person_one_liked.len());
            }
            LinkState::Connected(connection) => {
                println!("Connected via {}.", connection.id);
                println!(
                    "  pending likes: {} + {}, matched: {}",
                    connection.person_one_liked.len(),
                    connection.person_two_liked.len(),
                    connection.matched.len(),
                );
                let family_name = self.prefs.partner_last_name().await?;
                for claim in &connection.matched {
                    match &family_name {
                        Some(family_name) => {
                            println!("  match: {} {} ({})", claim.name, family_name, claim.gender_code)
                        }
                        None => println!("  match: {} ({})", claim.name, claim.gender_code),
                    }
                }
                if let Some(side) = self.own_side(&connection).await? {
                    if connection.has_unread_matches(side) {
                        println!("  you have unread matches");
                    }
                }
            }
            LinkState::Dissolved => {
                println!("Your connection no longer exists; the pointer was cleared.");
            }
        }
        Ok(())
    }

    pub async fn watch_connection(&self) -> Result<()> {
        let Some(code) = self.prefs.last_known_connection().await? else {
            println!("No active connection.");
            return Ok(());
        };

        let mut session = WatchSession::new();
        let feed = match session.start(&self.engine, &code).await {
            Ok(feed) => feed,
            Err(ConnectionError::NotFound) => {
                self.prefs.clear_last_known_connection().await?;
                println!("Connection {code} no longer exists; cleared the local pointer.");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        println!("Watching {code} (ctrl-c to stop)...");
        if let Some(connection) = feed.borrow_and_update().clone() {
            println!("{}", summarize(&connection));
        }
        loop {
            feed.changed().await?;
            let current = feed.borrow_and_update().clone();
            match current {
                Some(connection) => println!("{}", summarize(&connection)),
                None => {
                    self.prefs.clear_last_known_connection().await?;
                    println!("Connection deleted by your partner; cleared the local pointer.");
                    return Ok(());
                }
            }
        }
    }

    pub async fn delete_connection(&self) -> Result<()> {
        let Some(code) = self.prefs.last_known_connection().await? else {
            println!("No active connection.");
            return Ok(());
        };
        self.engine.delete(&code).await?;
        println!("Deleted connection {code}.");
        Ok(())
    }

    pub async fn mark_matched_read(&self) -> Result<()> {
        let Some(code) = self.prefs.last_known_connection().await? else {
            println!("No active connection.");
            return Ok(());
        };
        self.engine.mark_matched_read(&code).await?;
        println!("Marked all matches as read.");
        Ok(())
    }

    async fn own_side(
        &self,
        connection: &namematch_connection::Connection,
    ) -> Result<Option<Side>> {
        let user = self.prefs.user_id().await?;
        Ok(connection.side_of(&user))
    }
}

fn describe(series: &NameSeries) -> String {
    let top = &series.entries[0];
    format!(
        "{} ({}) | peak popularity {} in {} | {} year(s) recorded",
        series.name,
        top.gender.code(),
        top.rank_in_year,
        top.year,
        series.entries.len(),
    )
}

fn summarize(connection: &namematch_connection::Connection) -> String {
    format!(
        "[{}] partner: {} | pending: {}+{} | matched: {}",
        connection.id,
        if connection.person_two.is_some() { "joined" } else { "waiting" },
        connection.person_one_liked.len(),
        connection.person_two_liked.len(),
        connection.matched.len(),
    )
}

fn parse_period(raw: &str) -> Result<TimePeriod> {
    let period = match raw {
        "current-year" => TimePeriod::CurrentYear,
        "1800s" => TimePeriod::EighteenHundreds,
        "1900s" => TimePeriod::PreviousCentury,
        "2000s" => TimePeriod::CurrentCentury,
        year => {
            let year: i32 = year
                .parse()
                .with_context(|| format!("unknown period '{raw}'"))?;
            if !(FIRST_CORPUS_YEAR..=LAST_CORPUS_YEAR).contains(&year) {
                bail!("year {year} is outside the corpus ({FIRST_CORPUS_YEAR}-{LAST_CORPUS_YEAR})");
            }
            TimePeriod::SpecificYear(year)
        }
    };
    Ok(period)
}
