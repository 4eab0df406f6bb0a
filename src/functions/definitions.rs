use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The four operations the model may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownFunction {
    GetNowPlayingMovies,
    GetShowtimes,
    BuyTicket,
    ConfirmTicketPurchase,
}

impl KnownFunction {
    pub const ALL: [KnownFunction; 4] = [
        KnownFunction::GetNowPlayingMovies,
        KnownFunction::GetShowtimes,
        KnownFunction::BuyTicket,
        KnownFunction::ConfirmTicketPurchase,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            KnownFunction::GetNowPlayingMovies => "get_now_playing_movies",
            KnownFunction::GetShowtimes => "get_showtimes",
            KnownFunction::BuyTicket => "buy_ticket",
            KnownFunction::ConfirmTicketPurchase => "confirm_ticket_purchase",
        }
    }

    /// Parameter names in positional order.
    pub fn parameters(self) -> &'static [&'static str] {
        match self {
            KnownFunction::GetNowPlayingMovies => &[],
            KnownFunction::GetShowtimes => &["title", "location"],
            KnownFunction::BuyTicket | KnownFunction::ConfirmTicketPurchase => {
                &["theater", "movie", "showtime"]
            }
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            KnownFunction::GetNowPlayingMovies => {
                "Get the movies that are playing now in theaters. Call this whenever the user \
                 wants to know what is showing, for example 'What are the movies playing now?'"
            }
            KnownFunction::GetShowtimes => {
                "Get the showtimes for a movie near a location. Call this whenever the user wants \
                 to know when a movie is showing, for example 'Showtimes for Dune near Seattle?'"
            }
            KnownFunction::BuyTicket => {
                "Start buying a ticket for a movie. Returns a quote that must be confirmed by the \
                 user before the purchase is final."
            }
            KnownFunction::ConfirmTicketPurchase => {
                "Confirm a ticket purchase previously quoted with buy_ticket. Only call this after \
                 the user explicitly confirms."
            }
        }
    }

    /// Pseudo-code signature used by the inline call encoding's prompt.
    pub fn signature(self) -> String {
        format!("{}({})", self.name(), self.parameters().join(", "))
    }

    pub fn input_schema(self) -> Value {
        let mut properties = Map::new();
        for param in self.parameters() {
            properties.insert(
                (*param).to_string(),
                json!({
                    "type": "string",
                    "description": parameter_description(param),
                }),
            );
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false
        });
        if !self.parameters().is_empty() {
            schema["required"] = json!(self.parameters());
        }
        schema
    }

    /// Tool definition in the chat-completions `tools` format.
    pub fn tool_definition(self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": self.input_schema(),
            }
        })
    }

    pub fn validate_arguments(self, arguments: &BTreeMap<String, String>) -> Result<(), String> {
        let schema = self.input_schema();
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| format!("Invalid function schema: {}", e))?;

        let instance = Value::Object(
            arguments
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        );

        let result = compiled.validate(&instance);
        if let Err(errors) = result {
            let messages: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect();
            return Err(messages.join("; "));
        }

        Ok(())
    }
}

impl fmt::Display for KnownFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parameter_description(param: &str) -> &'static str {
    match param {
        "title" => "The title of the movie.",
        "location" => "The location of the theater, for example 'San Francisco'.",
        "theater" => "The name of the theater, for example 'AMC Metreon 16'.",
        "movie" => "The title of the movie, for example 'Avengers: Endgame'.",
        "showtime" => "The showtime for the movie, for example '7:00 PM'.",
        _ => "",
    }
}

/// Tool definitions for every known function.
pub fn format_tools_for_llm() -> Vec<Value> {
    KnownFunction::ALL
        .iter()
        .map(|f| f.tool_definition())
        .collect()
}

/// Tool offered to the review pre-fetch step in its tool strategy.
pub fn review_tool_definition() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "get_reviews",
            "description": "Evaluate the conversation and determine if the user is asking about \
                            a specific movie whose critic reviews would help. If so, call this \
                            with the ID of the movie.",
            "parameters": {
                "type": "object",
                "properties": {
                    "movie_id": {
                        "type": "integer",
                        "description": "ID of the movie to fetch reviews for"
                    },
                    "movie_title": {
                        "type": "string",
                        "description": "Title of the movie to fetch reviews for"
                    }
                },
                "required": ["movie_id"],
                "additionalProperties": false
            }
        }
    })
}
