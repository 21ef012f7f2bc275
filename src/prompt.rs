use crate::model::{Genre, StoryLength};

const BASE_PROMPT: &str = "Create a short, interesting story based on these emojis:";
const SHORT_CLAUSE: &str = " Keep it very brief, around 3-4 sentences.";
const LONG_CLAUSE: &str = " Make it more detailed, with about 3-4 paragraphs.";
const PLAIN_TEXT_CLAUSE: &str = " IMPORTANT: Do NOT include any <think> tags or similar markers in your response. Provide ONLY the final story in plain text.";

/// Builds the prompt sent to the model. Emoji keep their input order.
pub fn build_prompt(emojis: &[String], genre: Genre, length: StoryLength) -> String {
    let mut prompt = format!("{} {}", BASE_PROMPT, emojis.join(" "));

    if genre != Genre::General {
        prompt.push_str(&format!(" Make it a {} story.", genre));
    }

    match length {
        StoryLength::Short => prompt.push_str(SHORT_CLAUSE),
        StoryLength::Long => prompt.push_str(LONG_CLAUSE),
        StoryLength::Medium => {}
    }

    prompt.push_str(PLAIN_TEXT_CLAUSE);
    prompt
}
