//! Loading rules from source text.
//!
//! Source text is line oriented. `%`, `#` and `//` begin comments which
//! run to the end of the line, unless they appear inside brackets or
//! quotes. Rules may span lines; every line must end in a character that
//! can continue or finish a rule (`-`, `,`, `;`, `.`, `=`). The text is
//! then split into rule-sized pieces on unnested periods and parsed.

use crate::goal::Rule;
use crate::kb::KnowledgeBase;
use crate::parser::{parse_rule, ParseError};

/// Strip a line comment, respecting brackets and quotes. In
/// `print(Your rank is %s., $Rank),   % Print rank.` only the second
/// percent sign starts a comment.
fn strip_comments(line: &str) -> &str {
    let mut round_depth = 0i32;
    let mut square_depth = 0i32;
    let mut in_quotes = false;
    let mut previous = 'x';

    for (index, ch) in line.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if in_quotes {
            // Comment characters inside quotes are content.
        } else if ch == '(' {
            round_depth += 1;
        } else if ch == '[' {
            square_depth += 1;
        } else if ch == ')' {
            round_depth -= 1;
        } else if ch == ']' {
            square_depth -= 1;
        } else if round_depth == 0 && square_depth == 0 {
            if ch == '#' || ch == '%' {
                return line[..index].trim();
            }
            if ch == '/' && previous == '/' {
                return line[..index - 1].trim();
            }
        }
        previous = ch;
    }
    line.trim()
}

/// Rules can be split over several lines, but a line that ends
/// mid-word indicates a mistake in the source. Valid final characters
/// are dash, comma, semicolon, period and the equal sign.
fn check_end_of_line(line: &str, number: usize) -> Result<(), ParseError> {
    match line.chars().last() {
        Some('-') | Some(',') | Some(';') | Some('.') | Some('=') => Ok(()),
        _ => Err(ParseError {
            message: format!("check line {}", number),
            text: line.to_string(),
        }),
    }
}

/// Divide text into rule-sized pieces. Each piece ends with a period,
/// except that text after the final period is returned as a last piece -
/// the terminal period is optional at end of input. Periods inside
/// brackets or quotes do not split.
fn separate_rules(text: &str) -> Result<Vec<String>, ParseError> {
    let mut rules = Vec::new();
    let mut piece = String::new();
    let mut round_depth = 0i32;
    let mut square_depth = 0i32;
    let mut quote_count = 0usize;

    for ch in text.chars() {
        piece.push(ch);
        if ch == '.' && round_depth == 0 && square_depth == 0 && quote_count % 2 == 0 {
            rules.push(piece.trim().to_string());
            piece.clear();
        } else if ch == '(' {
            round_depth += 1;
        } else if ch == '[' {
            square_depth += 1;
        } else if ch == ')' {
            round_depth -= 1;
        } else if ch == ']' {
            square_depth -= 1;
        } else if ch == '"' {
            quote_count += 1;
        }
    }

    let last = rules.last().cloned().unwrap_or_default();
    unmatched_bracket(&last, round_depth, square_depth)?;

    let rest = piece.trim();
    if !rest.is_empty() {
        rules.push(rest.to_string());
    }
    Ok(rules)
}

/// Report an unmatched bracket, with the previous rule for context.
fn unmatched_bracket(
    previous: &str,
    round_depth: i32,
    square_depth: i32,
) -> Result<(), ParseError> {
    if round_depth == 0 && square_depth == 0 {
        return Ok(());
    }
    let message = if round_depth > 0 {
        "unmatched parenthesis: ("
    } else if round_depth < 0 {
        "unmatched parenthesis: )"
    } else if square_depth > 0 {
        "unmatched bracket: ["
    } else {
        "unmatched bracket: ]"
    };
    let context = if previous.is_empty() {
        "check start of text".to_string()
    } else {
        let mut shown = previous;
        if shown.len() > 60 {
            shown = &shown[..60];
        }
        format!("error occurs after: {}", shown)
    };
    Err(ParseError { message: message.to_string(), text: context })
}

/// Split text into rule strings, stripping comments line by line.
pub fn text_to_rule_strings(text: &str) -> Result<Vec<String>, ParseError> {
    let mut joined = String::new();
    for (number, line) in text.lines().enumerate() {
        let stripped = strip_comments(line);
        if !stripped.is_empty() {
            check_end_of_line(stripped, number + 1)?;
            joined.push_str(stripped);
            joined.push(' ');
        }
    }
    separate_rules(&joined)
}

/// Parse source text and add every rule to the knowledge base. A parse
/// error halts loading; its message carries the previously loaded rule
/// as context.
pub fn load_from_text(kb: &mut KnowledgeBase, text: &str) -> Result<(), ParseError> {
    let pieces = text_to_rule_strings(text)?;
    let mut previous: Option<String> = None;
    for piece in pieces {
        match parse_rule(&piece) {
            Ok(rule) => {
                kb.add(rule);
                previous = Some(piece);
            }
            Err(err) => {
                let context = match &previous {
                    Some(p) => format!("error occurs after: {}", p),
                    None => "check start of text".to_string(),
                };
                return Err(ParseError {
                    message: format!("{}: >{}< ({})", err.message, err.text, context),
                    text: piece,
                });
            }
        }
    }
    Ok(())
}

/// Parse source text into rules without touching a knowledge base.
pub fn rules_from_text(text: &str) -> Result<Vec<Rule>, ParseError> {
    let mut rules = Vec::new();
    for piece in text_to_rule_strings(text)? {
        rules.push(parse_rule(&piece)?);
    }
    Ok(rules)
}
