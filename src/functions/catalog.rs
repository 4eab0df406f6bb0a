use super::service::MovieService;
use crate::error::{MovieBotError, ServiceError};
use crate::models::SessionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.yaml");

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Review {
    pub author: String,
    #[serde(default)]
    pub rating: Option<f32>,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Screening {
    pub movie: String,
    pub times: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Theater {
    pub name: String,
    pub location: String,
    #[serde(default = "default_ticket_price")]
    pub ticket_price: f64,
    #[serde(default)]
    pub screenings: Vec<Screening>,
}

fn default_ticket_price() -> f64 {
    15.0
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalog {
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub theaters: Vec<Theater>,
}

impl Catalog {
    pub fn from_yaml_str(contents: &str) -> Result<Self, MovieBotError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn builtin() -> Self {
        // The embedded catalog is covered by tests; an empty catalog is the
        // only sensible fallback if it were ever malformed.
        Self::from_yaml_str(BUILTIN_CATALOG).unwrap_or_default()
    }

    fn find_movie(&self, title: &str) -> Option<&Movie> {
        let wanted = normalize(title);
        self.movies
            .iter()
            .find(|m| normalize(&m.title) == wanted)
            .or_else(|| {
                self.movies
                    .iter()
                    .find(|m| normalize(&m.title).contains(&wanted) && !wanted.is_empty())
            })
    }

    fn find_theater(&self, name: &str) -> Option<&Theater> {
        let wanted = normalize(name);
        self.theaters
            .iter()
            .find(|t| normalize(&t.name) == wanted)
            .or_else(|| {
                self.theaters
                    .iter()
                    .find(|t| normalize(&t.name).contains(&wanted) && !wanted.is_empty())
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Quote {
    theater: String,
    movie: String,
    showtime: String,
}

/// A [`MovieService`] backed by a static catalog of movies, theaters and
/// reviews. Ticket quotes are held in memory, per session, until confirmed
/// or until the session ends.
pub struct CatalogService {
    catalog: Catalog,
    pending: Mutex<HashMap<SessionId, Vec<Quote>>>,
}

impl CatalogService {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn builtin() -> Self {
        Self::new(Catalog::builtin())
    }

    pub fn from_path(path: &Path) -> Result<Self, MovieBotError> {
        let contents = fs::read_to_string(path)?;
        let catalog = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&contents)?
        } else {
            Catalog::from_yaml_str(&contents)?
        };
        debug!(
            path = %path.display(),
            movies = catalog.movies.len(),
            theaters = catalog.theaters.len(),
            "loaded catalog"
        );
        Ok(Self::new(catalog))
    }

    fn locate(&self, theater: &str, movie: &str, showtime: &str) -> Result<Quote, ServiceError> {
        let found_movie = self
            .catalog
            .find_movie(movie)
            .ok_or_else(|| ServiceError::UnknownMovie(movie.to_string()))?;
        let unavailable = || ServiceError::ShowtimeUnavailable {
            theater: theater.to_string(),
            movie: found_movie.title.clone(),
            showtime: showtime.to_string(),
        };
        let found_theater = self.catalog.find_theater(theater).ok_or_else(unavailable)?;

        let time = found_theater
            .screenings
            .iter()
            .filter(|s| normalize(&s.movie) == normalize(&found_movie.title))
            .flat_map(|s| s.times.iter())
            .find(|t| normalize(t) == normalize(showtime))
            .ok_or_else(unavailable)?;

        Ok(Quote {
            theater: found_theater.name.clone(),
            movie: found_movie.title.clone(),
            showtime: time.clone(),
        })
    }

    fn pending(&self) -> Result<MutexGuard<'_, HashMap<SessionId, Vec<Quote>>>, ServiceError> {
        self.pending
            .lock()
            .map_err(|_| ServiceError::Catalog("ticket ledger is unavailable".to_string()))
    }
}

#[async_trait]
impl MovieService for CatalogService {
    async fn now_playing(&self) -> Result<String, ServiceError> {
        if self.catalog.movies.is_empty() {
            return Ok("No movies are playing right now.".to_string());
        }

        let mut out = String::from("Movies playing now:\n");
        for movie in &self.catalog.movies {
            match &movie.overview {
                Some(overview) => {
                    out.push_str(&format!("- {} (ID: {}): {}\n", movie.title, movie.id, overview))
                }
                None => out.push_str(&format!("- {} (ID: {})\n", movie.title, movie.id)),
            }
        }
        Ok(out)
    }

    async fn showtimes(&self, title: &str, location: &str) -> Result<String, ServiceError> {
        let movie = self
            .catalog
            .find_movie(title)
            .ok_or_else(|| ServiceError::UnknownMovie(title.to_string()))?;

        let wanted_location = normalize(location);
        let nearby: Vec<&Theater> = self
            .catalog
            .theaters
            .iter()
            .filter(|t| !wanted_location.is_empty() && normalize(&t.location).contains(&wanted_location))
            .collect();
        if nearby.is_empty() {
            return Err(ServiceError::UnknownLocation(location.to_string()));
        }

        let mut lines = Vec::new();
        for theater in nearby {
            let times: Vec<&str> = theater
                .screenings
                .iter()
                .filter(|s| normalize(&s.movie) == normalize(&movie.title))
                .flat_map(|s| s.times.iter().map(String::as_str))
                .collect();
            if !times.is_empty() {
                lines.push(format!("{}: {}", theater.name, times.join(", ")));
            }
        }

        if lines.is_empty() {
            return Ok(format!("No showtimes found for {} near {}.", movie.title, location));
        }
        Ok(format!(
            "Showtimes for {} near {}:\n\n{}",
            movie.title,
            location,
            lines.join("\n")
        ))
    }

    async fn buy_ticket(
        &self,
        session: SessionId,
        theater: &str,
        movie: &str,
        showtime: &str,
    ) -> Result<String, ServiceError> {
        let quote = self.locate(theater, movie, showtime)?;
        let price = self
            .catalog
            .find_theater(&quote.theater)
            .map(|t| t.ticket_price)
            .unwrap_or_else(default_ticket_price);

        let text = format!(
            "Ticket quote: 1 ticket for {} at {} at {}, ${:.2}. \
             Ask the user to confirm before completing the purchase.",
            quote.movie, quote.theater, quote.showtime, price
        );

        let mut pending = self.pending()?;
        let quotes = pending.entry(session).or_default();
        if !quotes.contains(&quote) {
            quotes.push(quote);
        }
        Ok(text)
    }

    async fn confirm_ticket_purchase(
        &self,
        session: SessionId,
        theater: &str,
        movie: &str,
        showtime: &str,
    ) -> Result<String, ServiceError> {
        let quote = self.locate(theater, movie, showtime)?;

        let mut pending = self.pending()?;
        let Some(quotes) = pending.get_mut(&session) else {
            return Err(no_quote(&quote));
        };
        let Some(position) = quotes.iter().position(|q| *q == quote) else {
            return Err(no_quote(&quote));
        };
        quotes.remove(position);
        if quotes.is_empty() {
            pending.remove(&session);
        }

        let confirmation = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        Ok(format!(
            "Purchase confirmed: 1 ticket for {} at {} at {}. Confirmation number: {}.",
            quote.movie, quote.theater, quote.showtime, confirmation
        ))
    }

    async fn reviews(&self, movie_id: u64) -> Result<String, ServiceError> {
        let movie = self
            .catalog
            .movies
            .iter()
            .find(|m| m.id == movie_id)
            .ok_or_else(|| ServiceError::UnknownMovie(format!("ID {}", movie_id)))?;

        if movie.reviews.is_empty() {
            return Ok(format!("No reviews available for {}.", movie.title));
        }

        let reviews: Vec<String> = movie
            .reviews
            .iter()
            .map(|r| match r.rating {
                Some(rating) => format!("{} ({}/10): {}", r.author, rating, r.content),
                None => format!("{}: {}", r.author, r.content),
            })
            .collect();
        Ok(reviews.join("\n\n"))
    }

    async fn end_session(&self, session: SessionId) {
        match self.pending() {
            Ok(mut pending) => {
                if let Some(quotes) = pending.remove(&session) {
                    debug!(session = %session, quotes = quotes.len(), "dropped pending ticket quotes");
                }
            }
            Err(e) => debug!(session = %session, error = %e, "could not release ticket quotes"),
        }
    }
}

fn no_quote(quote: &Quote) -> ServiceError {
    ServiceError::Catalog(format!(
        "no pending ticket quote for {} at {} at {}; call buy_ticket first",
        quote.movie, quote.theater, quote.showtime
    ))
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
