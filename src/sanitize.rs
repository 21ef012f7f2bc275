//! Removes reasoning-trace markup (`<think>...</think>`) from model output.
//!
//! Well-formed pairs are removed with their contents. Malformed markup is
//! resolved as follows:
//! - an opening marker that is never closed drops everything after it;
//! - a closing marker without an opener drops everything before it.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::anychar,
    combinator::{peek, recognize, value},
    multi::many_till,
    sequence::{pair, terminated},
    IResult,
};

const OPEN: &str = "<think>";
const CLOSE: &str = "</think>";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Marker {
    Open,
    Close,
}

fn marker(input: &str) -> IResult<&str, Marker> {
    alt((value(Marker::Open, tag(OPEN)), value(Marker::Close, tag(CLOSE))))(input)
}

/// Plain text up to the next marker, then the marker itself.
fn text_then_marker(input: &str) -> IResult<&str, (&str, Marker)> {
    pair(recognize(many_till(anychar, peek(marker))), marker)(input)
}

/// Trace body after an opening marker, through the matching close.
fn trace_body(input: &str) -> IResult<&str, &str> {
    terminated(take_until(CLOSE), tag(CLOSE))(input)
}

/// Strips reasoning traces and trims surrounding whitespace.
pub fn strip_reasoning(raw: &str) -> String {
    let mut kept = String::with_capacity(raw.len());
    let mut input = raw;

    loop {
        match text_then_marker(input) {
            Ok((rest, (text, Marker::Open))) => {
                kept.push_str(text);
                match trace_body(rest) {
                    Ok((after, _)) => input = after,
                    Err(_) => break,
                }
            }
            Ok((rest, (_, Marker::Close))) => {
                kept.clear();
                input = rest;
            }
            Err(_) => {
                kept.push_str(input);
                break;
            }
        }
    }

    kept.trim().to_string()
}
