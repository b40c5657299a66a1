//! Parsing of the server's response header block.
//!
//! The status line is matched strictly: anything but `HTTP/1.1 101 <reason>` means the server
//! refused to switch protocols. The header lines that follow are tokenized permissively; a line
//! that does not look like `field: value` is skipped instead of failing the whole block, since
//! real servers are not always conformant.

use nom::{
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, space1},
    combinator::{all_consuming, opt},
    IResult, Parser,
};

use crate::{HandshakeError, Headers, Result};

/// Characters that can not appear in a field name besides control characters.
static SEPARATORS: &str = "()<>@,;:\\\"/[]?={} \t";

/// Parses a raw response (status line plus header block) into lowercased headers.
///
/// # Errors
/// Returns [`HandshakeError::InvalidStatusLine`] when the status line is not a `101` response.
pub fn parse(buffer: &[u8]) -> Result<Headers> {
    let text = String::from_utf8_lossy(buffer);
    let (line, rest) = match text.split_once("\r\n") {
        Some((line, rest)) => (line, rest),
        None => (&*text, ""),
    };

    parse_status_line(line)?;
    Ok(parse_headers(rest))
}

/// Checks that `line` is a switching protocols status line and returns its reason phrase.
///
/// # Errors
/// Returns [`HandshakeError::InvalidStatusLine`] carrying `line` verbatim on mismatch.
pub fn parse_status_line(line: &str) -> Result<&str> {
    match all_consuming(status_line).parse(line) {
        Ok((_, reason)) => Ok(reason),
        Err(_) => Err(HandshakeError::InvalidStatusLine(line.to_string())),
    }
}

/// Tokenizes header lines until the empty line that terminates the block, or the end of input.
///
/// Field names are lowercased. Repeated fields accumulate their values in order.
pub fn parse_headers(mut input: &str) -> Headers {
    let mut headers = Headers::new();

    while !input.is_empty() {
        // end of the header block
        if input.starts_with("\r\n") || input.starts_with('\n') {
            break;
        }

        match header_line(input) {
            Ok((remaining, (field, value))) => {
                headers.append(field.to_ascii_lowercase(), value);
                input = remaining;
            }
            Err(_) => {
                let (_skipped, remaining) = match input.split_once('\n') {
                    Some(split) => split,
                    None => (input, ""),
                };

                #[cfg(feature = "logging")]
                log::trace!("skipping malformed header line: {:?}", _skipped);

                input = remaining;
            }
        }
    }

    headers
}

/// `HTTP/1.1 SP 101 SP reason-phrase`
fn status_line(input: &str) -> IResult<&str, &str> {
    let (input, (_, _, _, _, reason)) = (
        tag("HTTP/1.1"),
        space1,
        tag("101"),
        space1,
        take_while(is_reason_char),
    )
        .parse(input)?;
    Ok((input, reason))
}

/// `field ":" OWS value OWS [CR] LF`
fn header_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, (field, _, value, _, _)) = (
        take_while1(is_field_char),
        char(':'),
        take_while(is_value_char),
        opt(char('\r')),
        char('\n'),
    )
        .parse(input)?;
    Ok((input, (field, value.trim_matches(|c: char| c == ' ' || c == '\t'))))
}

fn is_field_char(c: char) -> bool {
    !c.is_ascii_control() && !SEPARATORS.contains(c)
}

fn is_value_char(c: char) -> bool {
    c == '\t' || !c.is_ascii_control()
}

fn is_reason_char(c: char) -> bool {
    c == '\t' || !c.is_ascii_control()
}
