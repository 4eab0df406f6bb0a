use crate::functions::KnownFunction;
use crate::intent::Encoding;

const ASSISTANT_INTRO: &str = "You are a helpful movie chatbot that helps people explore movies \
that are out in theaters, find showtimes, and buy tickets.";

const PURCHASE_RULES: &str = "Never confirm a ticket purchase unless the user has explicitly \
agreed to the quote returned by buy_ticket.";

/// The instruction prompt that opens every session for the given encoding.
pub fn system_prompt(encoding: Encoding, date: &str) -> String {
    let signatures: Vec<String> = KnownFunction::ALL.iter().map(|f| f.signature()).collect();

    match encoding {
        Encoding::Structured => format!(
            "{}\n\nToday's date is {}. Use the provided tools whenever the user asks for \
             current information. {}",
            ASSISTANT_INTRO, date, PURCHASE_RULES
        ),
        Encoding::Pseudo => format!(
            "{}\n\nToday's date is {}. If a user asks for recent information, output a function \
             call and the system will add the result to the context. If you need to call a \
             function, only output the function call. Call functions using Python syntax in \
             plain text, no code blocks. {}\n\nYou have access to the following functions:\n\n{}\n",
            ASSISTANT_INTRO,
            date,
            PURCHASE_RULES,
            signatures.join("\n")
        ),
        Encoding::Json => format!(
            "{}\n\nToday's date is {}. If a user asks for recent information, call a function \
             and the system will add the result to the context. To call a function, output only \
             a single JSON object, not in a code block, with the fields \"function_name\", \
             \"rationale\", and one field per parameter, for example:\n\n\
             {{\"function_name\": \"get_showtimes\", \"rationale\": \"The user wants showtimes\", \
             \"title\": \"Dune\", \"location\": \"Seattle\"}}\n\n{}\n\nYou have access to the \
             following functions:\n\n{}\n",
            ASSISTANT_INTRO,
            date,
            PURCHASE_RULES,
            signatures.join("\n")
        ),
    }
}

const REVIEW_INSTRUCTIONS: &str = "Based on the conversation, determine if the topic is about a \
specific movie. Determine if the user is asking a question that would be aided by knowing what \
critics are saying about the movie. Determine if the reviews for that movie have already been \
provided in the conversation. If so, do not fetch reviews.";

/// Prompt for the review decision when the answer is a JSON document.
pub fn review_json_prompt() -> String {
    format!(
        "{}\n\nYour only role is to evaluate the conversation, and decide whether to fetch \
         reviews.\n\nOutput the current movie, id, a boolean to fetch reviews in JSON format, \
         and your rationale. Do not output as a code block.\n\n\
         {{\n    \"movie\": \"title\",\n    \"id\": 123,\n    \"fetch_reviews\": true,\n    \
         \"rationale\": \"reasoning\"\n}}\n",
        REVIEW_INSTRUCTIONS
    )
}

/// Prompt for the review decision when the answer is a `get_reviews` tool call.
pub fn review_tool_prompt() -> String {
    format!(
        "{}\n\nIf reviews would help and have not been provided, call get_reviews with the \
         movie's ID. Otherwise reply with a short explanation and do not call any tool.",
        REVIEW_INSTRUCTIONS
    )
}
