use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{digit1, i64 as parse_i64, multispace0, multispace1},
    combinator::{map_res, opt, rest, value, verify},
    multi::many1,
    sequence::{delimited, preceded},
    IResult,
};

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Generate { emojis: Vec<String>, genre: Option<String>, length: Option<String> },
    RandomEmoji { count: Option<i64>, genre: Option<String>, length: Option<String> },
    Random,
    Get { id: String },
    Like { id: String },
    History { page: Option<usize>, limit: Option<usize> },
    Search { query: String },
    Stats,
    Health,
    Help,
    Exit,
}

const OPTION_KEYWORDS: [&str; 2] = ["GENRE", "LENGTH"];

// --- QUERY PARAMETERS ---

/// Reads a positive integer the way a browser's `parseInt` would: leading
/// whitespace, optional sign, then digits, ignoring any trailing junk.
/// Anything that is not a positive number yields `default`.
pub fn lenient_positive(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| preceded(multispace0, parse_i64::<&str, nom::error::Error<&str>>)(s).ok())
    .and_then(|(_, n)| usize::try_from(n).ok())
    .filter(|&n| n > 0)
    .unwrap_or(default)
}

// --- BASIC PARSERS ---

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

fn emoji_token(input: &str) -> IResult<&str, String> {
    let (input, w) = verify(word, |w: &str| {
        !OPTION_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(w))
    })(input)?;
    Ok((input, w.to_string()))
}

fn parse_usize(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

// --- HELPERS ---
fn ws<'a, F, O, E: nom::error::ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where F: FnMut(&'a str) -> IResult<&'a str, O, E> {
    delimited(multispace0, inner, multispace0)
}

fn tag_ci(t: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| tag_no_case(t)(input)
}

/// `[GENRE g] [LENGTH l]`
fn story_options(input: &str) -> IResult<&str, (Option<String>, Option<String>)> {
    let (input, genre) = opt(preceded(ws(tag_ci("GENRE")), word))(input)?;
    let (input, length) = opt(preceded(ws(tag_ci("LENGTH")), word))(input)?;
    Ok((input, (genre.map(str::to_string), length.map(str::to_string))))
}

// --- COMMAND PARSERS ---

fn parse_generate(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("GENERATE"), tag_ci("GEN")))(input)?;
    let (input, emojis) = many1(preceded(multispace1, emoji_token))(input)?;
    let (input, (genre, length)) = story_options(input)?;
    Ok((input, Command::Generate { emojis, genre, length }))
}

fn parse_random_emoji(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("RANDOM")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, _) = alt((tag_ci("EMOJIS"), tag_ci("EMOJI")))(input)?;
    let (input, count) = opt(preceded(multispace1, parse_i64))(input)?;
    let (input, (genre, length)) = story_options(input)?;
    Ok((input, Command::RandomEmoji { count, genre, length }))
}

fn parse_random(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("RANDOM")(input)?;
    Ok((input, Command::Random))
}

fn parse_get(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("GET")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = word(input)?;
    Ok((input, Command::Get { id: id.trim_matches('\'').to_string() }))
}

fn parse_like(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("LIKE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = word(input)?;
    Ok((input, Command::Like { id: id.trim_matches('\'').to_string() }))
}

fn parse_history(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("HISTORY")(input)?;
    let (input, page) = opt(preceded(multispace1, parse_usize))(input)?;
    let (input, limit) = opt(preceded(multispace1, parse_usize))(input)?;
    Ok((input, Command::History { page, limit }))
}

fn parse_search(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("SEARCH")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, query) = verify(rest, |q: &str| !q.trim().is_empty())(input)?;
    Ok((input, Command::Search { query: query.trim().trim_matches('"').to_string() }))
}

fn parse_keyword(input: &str) -> IResult<&str, Command> {
    alt((
        value(Command::Stats, tag_ci("STATS")),
        value(Command::Health, tag_ci("HEALTH")),
        value(Command::Help, tag_ci("HELP")),
        value(Command::Exit, alt((tag_ci("EXIT"), tag_ci("QUIT")))),
    ))(input)
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let result = alt((
        parse_generate,
        parse_random_emoji,
        parse_random,
        parse_get,
        parse_like,
        parse_history,
        parse_search,
        parse_keyword,
    ))(input);

    match result {
        Ok((remainder, cmd)) => {
            if !remainder.trim().is_empty() {
                return Err(format!("Unexpected tokens at end: '{}'", remainder.trim()));
            }
            Ok(cmd)
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let context: String = if e.input.chars().count() > 20 {
                format!("{}...", e.input.chars().take(20).collect::<String>())
            } else {
                e.input.to_string()
            };
            Err(format!("Invalid syntax near: '{}'", context))
        },
        Err(nom::Err::Incomplete(_)) => Err("Incomplete command.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_numbers_follow_parse_int() {
        assert_eq!(lenient_positive(Some("3"), 1), 3);
        assert_eq!(lenient_positive(Some(" 7abc"), 1), 7);
        assert_eq!(lenient_positive(Some("2.9"), 1), 2);
        assert_eq!(lenient_positive(Some("abc"), 10), 10);
        assert_eq!(lenient_positive(Some(""), 10), 10);
        assert_eq!(lenient_positive(Some("0"), 10), 10);
        assert_eq!(lenient_positive(Some("-4"), 1), 1);
        assert_eq!(lenient_positive(None, 10), 10);
        assert_eq!(lenient_positive(Some("99999999999999999999999"), 10), 10);
    }

    #[test]
    fn generate_with_options() {
        let cmd = parse_command("generate 🚀 👽 🌍 GENRE sci-fi length short").unwrap();
        assert_eq!(
            cmd,
            Command::Generate {
                emojis: vec!["🚀".into(), "👽".into(), "🌍".into()],
                genre: Some("sci-fi".into()),
                length: Some("short".into()),
            }
        );
    }

    #[test]
    fn generate_without_options() {
        let cmd = parse_command("GEN 🍕").unwrap();
        assert_eq!(cmd, Command::Generate { emojis: vec!["🍕".into()], genre: None, length: None });
        assert!(parse_command("GENERATE").is_err());
    }

    #[test]
    fn random_variants() {
        assert_eq!(parse_command("RANDOM").unwrap(), Command::Random);
        assert_eq!(
            parse_command("random emoji 4 genre fantasy").unwrap(),
            Command::RandomEmoji { count: Some(4), genre: Some("fantasy".into()), length: None }
        );
        assert_eq!(
            parse_command("RANDOM EMOJIS").unwrap(),
            Command::RandomEmoji { count: None, genre: None, length: None }
        );
    }

    #[test]
    fn id_commands() {
        assert_eq!(parse_command("GET 'abc123'").unwrap(), Command::Get { id: "abc123".into() });
        assert_eq!(parse_command("like abc123").unwrap(), Command::Like { id: "abc123".into() });
    }

    #[test]
    fn history_and_search() {
        assert_eq!(parse_command("HISTORY").unwrap(), Command::History { page: None, limit: None });
        assert_eq!(parse_command("history 2 5").unwrap(), Command::History { page: Some(2), limit: Some(5) });
        assert_eq!(
            parse_command("SEARCH \"the dragon\"").unwrap(),
            Command::Search { query: "the dragon".into() }
        );
        assert!(parse_command("SEARCH   ").is_err());
    }

    #[test]
    fn keywords_and_garbage() {
        assert_eq!(parse_command("stats").unwrap(), Command::Stats);
        assert_eq!(parse_command("quit").unwrap(), Command::Exit);
        assert!(parse_command("STATS now").unwrap_err().starts_with("Unexpected tokens"));
        assert!(parse_command("DROP TABLE").unwrap_err().starts_with("Invalid syntax"));
    }
}
