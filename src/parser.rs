//! Parser for rules, facts, goals, terms and lists.
//!
//! Syntax:
//! - `head :- body.` - rule; `head.` - fact
//! - `functor(arg1, arg2, ...)` - complex term
//! - `[a, b, c]`, `[a, b | $T]` - lists, with optional tail variable
//! - `$X` - variable; `$_` - anonymous variable
//! - `"quoted text"` - a single atom; `\,` escapes a literal comma
//! - `,` conjunction, `;` disjunction, `(...)` grouping
//! - infix comparisons: `=` `==` `<` `<=` `>` `>=` (space separated)
//! - reserved goals: `append, print, print_list, nl, functor, include,
//!   exclude, count, time, not, fail, !`
//! - functions inside arguments: `add, subtract, multiply, divide, join`

use crate::builtins::{Builtin, BuiltinKind, Function, FunctionKind};
use crate::goal::{Goal, Rule};
use crate::list::LinkedList;
use crate::symbol::Symbol;
use crate::term::{Complex, Term, Variable};
use smallvec::SmallVec;
use std::fmt;

/// The longest term source accepted, a guard against runaway input.
const MAX_TERM_LENGTH: usize = 1000;

/// A parse failure: a short message plus the offending text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub text: String,
}

impl ParseError {
    fn new(message: impl Into<String>, text: impl Into<String>) -> ParseError {
        ParseError { message: message.into(), text: text.into() }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: >{}<", self.message, self.text)
    }
}

impl std::error::Error for ParseError {}

/// Is the character valid inside a functor or unquoted atom?
/// Letters, digits, hyphen, soft hyphen, underscore, and the Latin-1
/// supplement through Cyrillic letter ranges.
fn letter_number_hyphen(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || ch == '-'
        || ch == '\u{AD}'
        || ch == '_'
        || ('\u{C0}'..'\u{2C0}').contains(&ch)
        || ('\u{380}'..'\u{510}').contains(&ch)
}

/// Quote, hash and at-sign are invalid between terms.
fn invalid_between_terms(ch: char) -> bool {
    ch == '"' || ch == '#' || ch == '@'
}

// ------------------------------------------------------------------
// Variables
// ------------------------------------------------------------------

/// Parse a logic variable: a dollar sign followed by a letter, e.g. `$X`.
pub fn parse_variable(s: &str) -> Result<Variable, ParseError> {
    let name = s.trim();
    let mut chars = name.chars();
    let first = chars.next();
    let second = chars.next();
    if first.is_none() || second.is_none() {
        return Err(ParseError::new("variable must start with $ and letter", name));
    }
    if first != Some('$') {
        return Err(ParseError::new("variable must start with $", name));
    }
    if !second.is_some_and(|c| c.is_alphabetic()) {
        return Err(ParseError::new("second character must be a letter", name));
    }
    Ok(Variable::template(name))
}

// ------------------------------------------------------------------
// Terms and argument lists
// ------------------------------------------------------------------

/// Indices of the first `(` and last `)` of a string, if any.
fn indices_of_parentheses(chars: &[char]) -> Result<Option<(usize, usize)>, ParseError> {
    let mut first = None;
    let mut second = None;
    let mut count_left = 0usize;
    let mut count_right = 0usize;
    for (i, ch) in chars.iter().enumerate() {
        if *ch == '(' {
            if first.is_none() {
                first = Some(i);
            }
            count_left += 1;
        } else if *ch == ')' {
            second = Some(i);
            count_right += 1;
        }
    }
    let text: String = chars.iter().collect();
    if count_left != count_right {
        return Err(ParseError::new("unbalanced parentheses", text));
    }
    match (first, second) {
        (None, None) => Ok(None),
        (Some(left), Some(right)) if left < right => Ok(Some((left, right))),
        _ => Err(ParseError::new("invalid parentheses", text)),
    }
}

/// Check the quote syntax of one argument. Quotes may only enclose the
/// whole argument.
fn check_quotes(s: &str, count: usize) -> Result<(), ParseError> {
    if count == 0 {
        return Ok(());
    }
    if count != 2 {
        return Err(ParseError::new("unmatched quotes", s));
    }
    if !s.starts_with('"') {
        return Err(ParseError::new("text before opening quote", s));
    }
    if !s.ends_with('"') {
        return Err(ParseError::new("text after closing quote", s));
    }
    Ok(())
}

/// Build a term from one argument's text. The kind is judged from the
/// content: `$`-prefix makes a variable (or an atom when invalid, so a
/// typo like `$10` stays inert), digits make a number, brackets make a
/// list, a trailing parenthesis makes a function or complex term, and
/// anything else is an atom.
fn make_term(s: &str) -> Result<Term, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError::new("length of term is 0", s));
    }

    if let Some(stripped) = s.strip_prefix('\\') {
        if !stripped.is_empty() {
            // An escaped leading character is taken literally.
            return Ok(Term::Atom(Symbol::intern(stripped)));
        }
    }

    if s.starts_with('$') {
        if s == "$_" {
            return Ok(Term::Anonymous);
        }
        return match parse_variable(s) {
            Ok(v) => Ok(Term::Var(v)),
            // Not a valid variable; treat it as an atom.
            Err(_) => Ok(Term::Atom(Symbol::intern(s))),
        };
    }

    if s.len() >= 2 {
        if s.starts_with('"') {
            if s.ends_with('"') {
                let inner = &s[1..s.len() - 1];
                if inner.is_empty() {
                    return Err(ParseError::new("invalid term, length is 0", s));
                }
                return Ok(Term::Atom(Symbol::intern(inner)));
            }
            return Err(ParseError::new("unmatched quote mark", s));
        }
        if s.starts_with('[') && s.ends_with(']') {
            return Ok(Term::List(parse_list(s)?));
        }
        if !s.starts_with('(') && s.ends_with(')') {
            let functor: String = s.chars().take_while(|c| *c != '(').collect();
            if FunctionKind::from_name(functor.trim()).is_some() {
                return Ok(Term::Function(parse_function(s)?));
            }
            return Ok(Term::Complex(parse_complex(s)?));
        }
    }

    let mut has_digit = false;
    let mut has_non_digit = false;
    let mut has_period = false;
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            has_digit = true;
        } else if ch == '.' {
            has_period = true;
        } else {
            has_non_digit = true;
        }
    }
    if has_digit && !has_non_digit {
        if has_period {
            if let Ok(f) = s.parse::<f64>() {
                return Ok(Term::Float(f));
            }
        } else if let Ok(i) = s.parse::<i64>() {
            return Ok(Term::Integer(i));
        }
    }

    Ok(Term::Atom(Symbol::intern(s)))
}

/// Parse a single term from source text.
pub fn parse_term(s: &str) -> Result<Term, ParseError> {
    make_term(s)
}

/// Parse a comma-separated argument list. A comma between double quotes
/// or escaped with a backslash is part of the argument. Nested complex
/// terms and lists keep their own commas.
pub fn parse_arguments(s: &str) -> Result<Vec<Term>, ParseError> {
    let trimmed = s.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    let length = chars.len();

    if length == 0 {
        return Err(ParseError::new("empty argument list", s));
    }
    if chars[0] == ',' {
        return Err(ParseError::new("missing first argument", s));
    }
    if chars[length - 1] == ',' && (length < 2 || chars[length - 2] != '\\') {
        return Err(ParseError::new("missing last argument", s));
    }

    let mut arguments = Vec::new();
    let mut argument = String::new();
    let mut open_quote = false;
    let mut num_quotes = 0usize;
    let mut round_depth = 0i32;
    let mut square_depth = 0i32;

    let mut i = 0;
    while i < length {
        let ch = chars[i];
        if open_quote {
            argument.push(ch);
            if ch == '"' {
                open_quote = false;
                num_quotes += 1;
            }
        } else if ch == '[' {
            argument.push(ch);
            square_depth += 1;
        } else if ch == ']' {
            argument.push(ch);
            square_depth -= 1;
        } else if ch == '(' {
            argument.push(ch);
            round_depth += 1;
        } else if ch == ')' {
            argument.push(ch);
            round_depth -= 1;
        } else if round_depth == 0 && square_depth == 0 {
            if ch == ',' {
                let piece = argument.trim().to_string();
                check_quotes(&piece, num_quotes)?;
                num_quotes = 0;
                arguments.push(make_term(&piece)?);
                argument.clear();
            } else if ch == '\\' {
                // Escape: include the next character literally.
                if i < length - 1 {
                    i += 1;
                    argument.push(chars[i]);
                } else {
                    argument.push(ch);
                }
            } else if ch == '"' {
                argument.push(ch);
                open_quote = true;
                num_quotes += 1;
            } else {
                argument.push(ch);
            }
        } else {
            // Inside () or []; keep the character as content.
            argument.push(ch);
        }
        i += 1;
    }

    let piece = argument.trim().to_string();
    if !piece.is_empty() {
        check_quotes(&piece, num_quotes)?;
        arguments.push(make_term(&piece)?);
    }

    if round_depth != 0 {
        return Err(ParseError::new("unmatched parentheses", s));
    }
    if square_depth != 0 {
        return Err(ParseError::new("unmatched brackets", s));
    }

    Ok(arguments)
}

/// Parse a complex term, e.g. `symptom(covid, fever)`.
pub fn parse_complex(s: &str) -> Result<Complex, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError::new("length of string is 0", s));
    }
    if s.len() > MAX_TERM_LENGTH {
        return Err(ParseError::new("string is too long", s));
    }
    let chars: Vec<char> = s.chars().collect();
    if chars[0] == '$' || chars[0] == '(' {
        return Err(ParseError::new("first character is invalid", s));
    }

    match indices_of_parentheses(&chars)? {
        None => parse_functor_terms(s, ""),
        Some((left, right)) => {
            let functor: String = chars[..left].iter().collect();
            let args: String = chars[left + 1..right].iter().collect();
            parse_functor_terms(functor.trim(), args.trim())
        }
    }
}

/// Build a complex term from a functor and the text of its arguments.
fn parse_functor_terms(functor: &str, args: &str) -> Result<Complex, ParseError> {
    let functor = Symbol::intern(functor);
    if args.is_empty() {
        return Ok(Complex::nullary(functor));
    }
    Ok(Complex::new(functor, parse_arguments(args)?))
}

/// Parse a built-in function call, e.g. `add(7, 9, 4)`.
pub fn parse_function(s: &str) -> Result<Function, ParseError> {
    let s = s.trim();
    if s.len() > MAX_TERM_LENGTH {
        return Err(ParseError::new("string is too long", s));
    }
    let chars: Vec<char> = s.chars().collect();
    let Some((left, right)) = indices_of_parentheses(&chars)? else {
        return Err(ParseError::new("function requires parentheses", s));
    };
    let functor: String = chars[..left].iter().collect();
    let args: String = chars[left + 1..right].iter().collect();

    let Some(kind) = FunctionKind::from_name(functor.trim()) else {
        return Err(ParseError::new("unknown function", functor.trim()));
    };
    let terms = parse_arguments(args.trim())?;
    Ok(Function::new(kind, terms))
}

// ------------------------------------------------------------------
// Lists
// ------------------------------------------------------------------

/// Is the indexed character equal to `ch` and not escaped by a backslash?
fn equal_escape(chars: &[char], index: usize, ch: char) -> bool {
    chars[index] == ch && (index == 0 || chars[index - 1] != '\\')
}

/// Parse a list, e.g. `[a, b, c]` or `[a, b | $X]`.
pub fn parse_list(s: &str) -> Result<LinkedList, ParseError> {
    let s = s.trim();
    let chars: Vec<char> = s.chars().collect();
    let length = chars.len();

    if length < 2 {
        return Err(ParseError::new("string is too short", s));
    }
    if chars[0] != '[' {
        return Err(ParseError::new("missing opening bracket", s));
    }
    if chars[length - 1] != ']' {
        return Err(ParseError::new("missing closing bracket", s));
    }
    if length == 2 {
        return Ok(LinkedList::empty());
    }

    let args = &chars[1..length - 1];
    let arg_length = args.len();

    let mut list = LinkedList::empty();
    let mut vbar = false;
    let mut end_index = arg_length;
    let mut open_quote = false;
    let mut num_quotes = 0usize;
    let mut round_depth = 0i32;
    let mut square_depth = 0i32;

    // Scan backward, splitting on top-level commas and the vertical bar.
    let mut i = arg_length;
    while i > 0 {
        i -= 1;
        if open_quote {
            if equal_escape(args, i, '"') {
                open_quote = false;
                num_quotes += 1;
            }
        } else if equal_escape(args, i, ']') {
            square_depth += 1;
        } else if equal_escape(args, i, '[') {
            square_depth -= 1;
        } else if equal_escape(args, i, ')') {
            round_depth += 1;
        } else if equal_escape(args, i, '(') {
            round_depth -= 1;
        } else if round_depth == 0 && square_depth == 0 {
            if equal_escape(args, i, '"') {
                open_quote = true;
                num_quotes += 1;
            } else if equal_escape(args, i, ',') {
                let piece: String = args[i + 1..end_index].iter().collect();
                let piece = piece.trim().to_string();
                if piece.is_empty() {
                    return Err(ParseError::new("missing argument", s));
                }
                check_quotes(&piece, num_quotes)?;
                num_quotes = 0;
                let term = make_term(&piece)?;
                list = LinkedList::link_front(term, false, list);
                end_index = i;
            } else if equal_escape(args, i, '|') {
                if vbar {
                    return Err(ParseError::new("too many vertical bars", s));
                }
                let piece: String = args[i + 1..end_index].iter().collect();
                let piece = piece.trim().to_string();
                if piece.is_empty() {
                    return Err(ParseError::new("missing argument", s));
                }
                let Ok(variable) = parse_variable(&piece) else {
                    return Err(ParseError::new("require variable after vertical bar", s));
                };
                vbar = true;
                list = LinkedList::link_front(Term::Var(variable), true, list);
                end_index = i;
            }
        }

        if i == 0 {
            let piece: String = args[..end_index].iter().collect();
            let piece = piece.trim().to_string();
            if piece.is_empty() {
                return Err(ParseError::new("missing argument", s));
            }
            check_quotes(&piece, num_quotes)?;
            let term = make_term(&piece)?;
            list = LinkedList::link_front(term, false, list);
        }
    }

    Ok(list)
}

// ------------------------------------------------------------------
// Infix detection
// ------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Infix {
    Unify,
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Infix {
    fn width(self) -> usize {
        match self {
            Infix::Unify => 1,
            _ => 2,
        }
    }

    fn builtin_kind(self) -> BuiltinKind {
        match self {
            Infix::Unify => BuiltinKind::Unify,
            Infix::Equal => BuiltinKind::Equal,
            Infix::LessThan => BuiltinKind::LessThan,
            Infix::LessThanOrEqual => BuiltinKind::LessThanOrEqual,
            Infix::GreaterThan => BuiltinKind::GreaterThan,
            Infix::GreaterThanOrEqual => BuiltinKind::GreaterThanOrEqual,
        }
    }
}

/// Find the infix operator of a subgoal, skipping quoted and
/// parenthesized spans. An operator must be preceded by a space;
/// two-character operators must also be followed by one. This keeps
/// `<` inside a term distinct from the comparison.
fn identify_infix(chars: &[char]) -> Option<(Infix, usize)> {
    let length = chars.len();
    let mut prev = '#';
    let mut i = 0;
    while i < length {
        let c1 = chars[i];
        if c1 == '"' {
            let mut j = i + 1;
            while j < length {
                if chars[j] == '"' {
                    i = j;
                    break;
                }
                j += 1;
            }
        } else if c1 == '(' {
            let mut j = i + 1;
            while j < length {
                if chars[j] == ')' {
                    i = j;
                    break;
                }
                j += 1;
            }
        } else {
            if prev != ' ' || i + 2 >= length {
                prev = c1;
                i += 1;
                continue;
            }
            let c2 = chars[i + 1];
            match c1 {
                '<' => {
                    if c2 == '=' && chars[i + 2] == ' ' {
                        return Some((Infix::LessThanOrEqual, i));
                    }
                    if c2 == ' ' {
                        return Some((Infix::LessThan, i));
                    }
                }
                '>' => {
                    if c2 == '=' && chars[i + 2] == ' ' {
                        return Some((Infix::GreaterThanOrEqual, i));
                    }
                    if c2 == ' ' {
                        return Some((Infix::GreaterThan, i));
                    }
                }
                '=' => {
                    if c2 == '=' && chars[i + 2] == ' ' {
                        return Some((Infix::Equal, i));
                    }
                    if c2 == ' ' {
                        return Some((Infix::Unify, i));
                    }
                }
                _ => {}
            }
        }
        prev = chars[i];
        i += 1;
    }
    None
}

/// Split a subgoal at its infix and parse both sides.
fn left_and_right(chars: &[char], index: usize, width: usize) -> Result<(Term, Term), ParseError> {
    let left: String = chars[..index].iter().collect();
    let right: String = chars[index + width..].iter().collect();
    Ok((make_term(left.trim())?, make_term(right.trim())?))
}

// ------------------------------------------------------------------
// Subgoals
// ------------------------------------------------------------------

/// Parse one subgoal: an operator, a built-in predicate, an infix
/// expression, or a complex term.
pub fn parse_subgoal(subgoal: &str) -> Result<Goal, ParseError> {
    let s = subgoal.trim();
    let chars: Vec<char> = s.chars().collect();
    let length = chars.len();

    if length == 0 {
        return Err(ParseError::new("empty subgoal", subgoal));
    }

    // not() encloses a goal, so it is handled before anything else.
    if let Some(rest) = s.strip_prefix("not(") {
        let Some(inner) = rest.strip_suffix(')') else {
            return Err(ParseError::new("unmatched parenthesis in not", s));
        };
        return Ok(Goal::Not(Box::new(parse_goal(inner)?)));
    }

    if s == "!" {
        return Ok(Goal::Cut);
    }
    if s == "fail" {
        return Ok(Goal::Fail);
    }
    if s == "nl" {
        return Ok(Goal::Builtin(Builtin::new(BuiltinKind::Nl, vec![])));
    }

    if let Some((infix, index)) = identify_infix(&chars) {
        let (left, right) = left_and_right(&chars, index, infix.width())?;
        return Ok(Goal::Builtin(Builtin::new(infix.builtin_kind(), vec![left, right])));
    }

    let Some((left, right)) = indices_of_parentheses(&chars)? else {
        // A goal can be a simple word without parentheses.
        return Ok(Goal::Complex(parse_functor_terms(s, "")?));
    };

    let functor: String = chars[..left].iter().collect();
    let functor = functor.trim().to_string();
    let args_text: String = chars[left + 1..right].iter().collect();
    let args_text = args_text.trim().to_string();

    if functor == "time" {
        return Ok(Goal::Time(parse_complex(&args_text)?));
    }

    let args = parse_arguments(&args_text)?;

    let builtin = |kind: BuiltinKind, args: Vec<Term>| Ok(Goal::Builtin(Builtin::new(kind, args)));
    match functor.as_str() {
        "append" => {
            expect_at_least(s, "append", 2, args.len())?;
            builtin(BuiltinKind::Append, args)
        }
        "print" => builtin(BuiltinKind::Print, args),
        "print_list" => builtin(BuiltinKind::PrintList, args),
        "functor" => {
            expect_range(s, "functor", 2, 3, args.len())?;
            builtin(BuiltinKind::Functor, args)
        }
        "include" => {
            expect_range(s, "include", 3, 3, args.len())?;
            builtin(BuiltinKind::Include, args)
        }
        "exclude" => {
            expect_range(s, "exclude", 3, 3, args.len())?;
            builtin(BuiltinKind::Exclude, args)
        }
        "count" => {
            expect_range(s, "count", 2, 2, args.len())?;
            builtin(BuiltinKind::Count, args)
        }
        _ => Ok(Goal::Complex(Complex::new(Symbol::intern(&functor), args))),
    }
}

fn expect_at_least(
    text: &str,
    name: &str,
    minimum: usize,
    found: usize,
) -> Result<(), ParseError> {
    if found < minimum {
        return Err(ParseError::new(
            format!("{} requires at least {} arguments", name, minimum),
            text,
        ));
    }
    Ok(())
}

fn expect_range(
    text: &str,
    name: &str,
    minimum: usize,
    maximum: usize,
    found: usize,
) -> Result<(), ParseError> {
    if found < minimum || found > maximum {
        return Err(ParseError::new(
            format!("{} takes {} to {} arguments", name, minimum, maximum),
            text,
        ));
    }
    Ok(())
}

// ------------------------------------------------------------------
// Goals: tokenizing and operator grouping
// ------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Subgoal(String),
    Comma,
    Semicolon,
    LParen,
    RParen,
}

#[derive(Clone, Copy, PartialEq)]
enum Nest {
    Complex,
    Group,
    List,
}

/// Divide a goal string into tokens, respecting quotes and the three
/// kinds of nesting: complex-term parentheses, grouping parentheses and
/// list brackets.
fn tokenize(s: &str) -> Result<Vec<Token>, ParseError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ParseError::new("string is empty", s));
    }
    let chars: Vec<char> = trimmed.chars().collect();
    let length = chars.len();

    let mut tokens: Vec<Token> = Vec::new();
    let mut stack: SmallVec<[Nest; 8]> = SmallVec::new();
    let mut start = 0usize;
    let mut prev = '#';

    let push_subgoal = |tokens: &mut Vec<Token>, from: usize, to: usize| {
        let piece: String = chars[from..to].iter().collect();
        let piece = piece.trim().to_string();
        if !piece.is_empty() {
            tokens.push(Token::Subgoal(piece));
        }
    };

    let mut i = 0;
    while i < length {
        let top = stack.last().copied();
        let ch = chars[i];
        if ch == '"' {
            // Skip over quoted content.
            let mut j = i + 1;
            while j < length {
                if chars[j] == '"' {
                    i = j;
                    break;
                }
                j += 1;
            }
        } else if ch == '(' {
            // A parenthesis after a functor character opens a complex
            // term; otherwise it groups subgoals.
            if letter_number_hyphen(prev) {
                stack.push(Nest::Complex);
            } else {
                stack.push(Nest::Group);
                tokens.push(Token::LParen);
                start = i + 1;
            }
        } else if ch == ')' {
            match stack.pop() {
                None => {
                    return Err(ParseError::new("unmatched parenthesis", trimmed));
                }
                Some(Nest::Group) => {
                    push_subgoal(&mut tokens, start, i);
                    tokens.push(Token::RParen);
                    start = i + 1;
                }
                Some(Nest::Complex) => {}
                Some(Nest::List) => {
                    return Err(ParseError::new("unmatched parenthesis", trimmed));
                }
            }
        } else if ch == '[' {
            stack.push(Nest::List);
        } else if ch == ']' {
            match stack.pop() {
                Some(Nest::List) => {}
                _ => {
                    return Err(ParseError::new("unmatched bracket", trimmed));
                }
            }
        } else if top != Some(Nest::Complex) && top != Some(Nest::List) {
            if invalid_between_terms(ch) {
                return Err(ParseError::new("invalid character", trimmed));
            }
            if ch == ',' {
                push_subgoal(&mut tokens, start, i);
                tokens.push(Token::Comma);
                start = i + 1;
            } else if ch == ';' {
                push_subgoal(&mut tokens, start, i);
                tokens.push(Token::Semicolon);
                start = i + 1;
            }
        }
        prev = chars[i];
        i += 1;
    }

    if !stack.is_empty() {
        return Err(ParseError::new("unmatched parenthesis or bracket", trimmed));
    }
    push_subgoal(&mut tokens, start, length);

    if tokens.is_empty() {
        return Err(ParseError::new("no tokens", trimmed));
    }
    Ok(tokens)
}

/// A tree of subgoals under conjunction/disjunction operators.
#[derive(Clone, Debug, PartialEq)]
enum TokenTree {
    Subgoal(String),
    Comma,
    Semicolon,
    Group(Vec<TokenTree>),
    And(Vec<TokenTree>),
    Or(Vec<TokenTree>),
}

/// Collect tokens between parentheses into groups, producing a tree.
fn group_tokens(tokens: &[Token], pos: &mut usize) -> TokenTree {
    let mut children = Vec::new();
    while *pos < tokens.len() {
        let token = &tokens[*pos];
        *pos += 1;
        match token {
            Token::LParen => children.push(group_tokens(tokens, pos)),
            Token::RParen => return TokenTree::Group(children),
            Token::Comma => children.push(TokenTree::Comma),
            Token::Semicolon => children.push(TokenTree::Semicolon),
            Token::Subgoal(s) => children.push(TokenTree::Subgoal(s.clone())),
        }
    }
    TokenTree::Group(children)
}

/// Group comma-separated runs into And nodes. Commas bind tighter than
/// semicolons.
fn group_and(children: Vec<TokenTree>) -> Vec<TokenTree> {
    let mut out = Vec::new();
    let mut and_list: Vec<TokenTree> = Vec::new();

    fn flush(and_list: &mut Vec<TokenTree>, out: &mut Vec<TokenTree>) {
        match and_list.len() {
            0 => {}
            1 => out.push(and_list.pop().expect("length checked")),
            _ => out.push(TokenTree::And(std::mem::take(and_list))),
        }
    }

    for child in children {
        match child {
            TokenTree::Comma => {}
            TokenTree::Semicolon => {
                flush(&mut and_list, &mut out);
                out.push(TokenTree::Semicolon);
            }
            TokenTree::Group(inner) => {
                and_list.push(group_or(group_and(inner)));
            }
            other => and_list.push(other),
        }
    }
    flush(&mut and_list, &mut out);
    out
}

/// Group semicolon-separated alternatives into an Or node.
fn group_or(children: Vec<TokenTree>) -> TokenTree {
    let mut or_list: Vec<TokenTree> = Vec::new();
    for child in children {
        if !matches!(child, TokenTree::Semicolon) {
            or_list.push(child);
        }
    }
    if or_list.len() == 1 {
        or_list.pop().expect("length checked")
    } else {
        TokenTree::Or(or_list)
    }
}

/// Turn the grouped token tree into a goal.
fn tree_to_goal(tree: &TokenTree) -> Result<Goal, ParseError> {
    match tree {
        TokenTree::Subgoal(s) => parse_subgoal(s),
        TokenTree::And(children) => {
            let goals: Result<Vec<Goal>, ParseError> =
                children.iter().map(tree_to_goal).collect();
            Ok(Goal::And(goals?))
        }
        TokenTree::Or(children) => {
            let goals: Result<Vec<Goal>, ParseError> =
                children.iter().map(tree_to_goal).collect();
            Ok(Goal::Or(goals?))
        }
        TokenTree::Group(children) => match children.len() {
            1 => tree_to_goal(&children[0]),
            _ => Err(ParseError::new("group should hold one goal", "")),
        },
        TokenTree::Comma | TokenTree::Semicolon => {
            Err(ParseError::new("dangling operator", ""))
        }
    }
}

/// Parse a goal expression: subgoals joined by `,` (conjunction) and `;`
/// (disjunction), with parentheses for grouping.
pub fn parse_goal(s: &str) -> Result<Goal, ParseError> {
    let tokens = tokenize(s)?;
    let mut pos = 0;
    let tree = group_tokens(&tokens, &mut pos);
    let TokenTree::Group(children) = tree else {
        return Err(ParseError::new("malformed goal", s));
    };
    let tree = group_or(group_and(children));
    tree_to_goal(&tree)
}

/// Parse a top-level query. The driver recreates variables on entry.
pub fn parse_query(s: &str) -> Result<Goal, ParseError> {
    parse_goal(s)
}

// ------------------------------------------------------------------
// Rules
// ------------------------------------------------------------------

/// Parse a fact or rule from source text, e.g.
/// `male(Harold).` or `father($X, $Y) :- parent($X, $Y), male($X).`
pub fn parse_rule(s: &str) -> Result<Rule, ParseError> {
    let mut s = s.trim();
    if let Some(stripped) = s.strip_suffix('.') {
        s = stripped;
    }
    if s.len() < 2 {
        return Err(ParseError::new("invalid rule", s));
    }

    match s.find(":-") {
        Some(index) => {
            let head_text = &s[..index];
            let body_text = &s[index + 2..];
            if body_text.contains(":-") {
                return Err(ParseError::new("invalid rule, second neck operator", s));
            }
            let head = match parse_subgoal(head_text)? {
                Goal::Complex(c) => c,
                _ => {
                    return Err(ParseError::new("head must be a complex term", head_text));
                }
            };
            let body = parse_goal(body_text)?;
            Ok(Rule::new(head, body))
        }
        None => Ok(Rule::fact(parse_complex(s)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // VARIABLE PARSING TESTS
    // ========================================================================

    #[test]
    fn parse_valid_variable() {
        let v = parse_variable("$X").unwrap();
        assert_eq!(v.name.as_str(), "$X");
        assert_eq!(v.id, 0, "Parsed variables are templates");
    }

    #[test]
    fn parse_variable_with_long_name() {
        let v = parse_variable("$Noun1").unwrap();
        assert_eq!(v.name.as_str(), "$Noun1");
    }

    #[test]
    fn parse_variable_missing_dollar_fails() {
        assert!(parse_variable("X").is_err());
    }

    #[test]
    fn parse_variable_digit_after_dollar_fails() {
        assert!(parse_variable("$1X").is_err());
    }

    #[test]
    fn parse_variable_too_short_fails() {
        assert!(parse_variable("$").is_err());
    }

    // ========================================================================
    // TERM PARSING TESTS
    // ========================================================================

    #[test]
    fn parse_atom_term() {
        assert_eq!(parse_term("Harold").unwrap(), Term::atom("Harold"));
    }

    #[test]
    fn parse_integer_term() {
        assert_eq!(parse_term("1961").unwrap(), Term::Integer(1961));
    }

    #[test]
    fn parse_float_term() {
        assert_eq!(parse_term("1.78").unwrap(), Term::Float(1.78));
    }

    #[test]
    fn parse_negative_number_is_an_atom() {
        assert_eq!(parse_term("-5").unwrap(), Term::atom("-5"));
    }

    #[test]
    fn parse_variable_term() {
        match parse_term("$X").unwrap() {
            Term::Var(v) => assert_eq!(v.name.as_str(), "$X"),
            other => panic!("Expected variable, got {:?}", other),
        }
    }

    #[test]
    fn parse_anonymous_term() {
        assert_eq!(parse_term("$_").unwrap(), Term::Anonymous);
    }

    #[test]
    fn parse_invalid_variable_becomes_atom() {
        assert_eq!(parse_term("$10").unwrap(), Term::atom("$10"));
    }

    #[test]
    fn parse_quoted_term_is_atom() {
        assert_eq!(
            parse_term("\"Baker St., 221B\"").unwrap(),
            Term::atom("Baker St., 221B")
        );
    }

    #[test]
    fn parse_quoted_number_stays_atom() {
        assert_eq!(parse_term("\"1961\"").unwrap(), Term::atom("1961"));
    }

    #[test]
    fn parse_unmatched_quote_fails() {
        assert!(parse_term("\"no closing").is_err());
    }

    #[test]
    fn parse_nested_complex_term() {
        match parse_term("job(programmer)").unwrap() {
            Term::Complex(c) => {
                assert_eq!(c.functor.as_str(), "job");
                assert_eq!(c.arity(), 1);
            }
            other => panic!("Expected complex term, got {:?}", other),
        }
    }

    #[test]
    fn parse_function_term() {
        match parse_term("add(1, 2)").unwrap() {
            Term::Function(f) => {
                assert_eq!(f.kind, FunctionKind::Add);
                assert_eq!(f.args.len(), 2);
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn parse_list_term() {
        match parse_term("[a, b]").unwrap() {
            Term::List(l) => assert_eq!(l.count(), 2),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    // ========================================================================
    // ARGUMENT LIST PARSING TESTS
    // ========================================================================

    #[test]
    fn parse_three_plain_arguments() {
        let args = parse_arguments("London, Baker St., 221B").unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], Term::atom("London"));
        assert_eq!(args[1], Term::atom("Baker St."));
        assert_eq!(args[2], Term::atom("221B"));
    }

    #[test]
    fn quoted_argument_keeps_commas() {
        let args = parse_arguments("\"London, Baker St., 221B\"").unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0], Term::atom("London, Baker St., 221B"));
    }

    #[test]
    fn escaped_commas_join_argument() {
        let args = parse_arguments("London\\, Baker St.\\, 221B").unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0], Term::atom("London, Baker St., 221B"));
    }

    #[test]
    fn escaped_dollar_sign_is_atom() {
        let args = parse_arguments("\\$").unwrap();
        assert_eq!(args[0], Term::atom("$"));
    }

    #[test]
    fn nested_complex_keeps_inner_commas() {
        let args = parse_arguments("a, f(b, c), d").unwrap();
        assert_eq!(args.len(), 3);
        match &args[1] {
            Term::Complex(c) => assert_eq!(c.arity(), 2),
            other => panic!("Expected complex, got {:?}", other),
        }
    }

    #[test]
    fn nested_list_keeps_inner_commas() {
        let args = parse_arguments("[a, b], c").unwrap();
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn missing_first_argument_fails() {
        assert!(parse_arguments(", a").is_err());
    }

    #[test]
    fn missing_last_argument_fails() {
        assert!(parse_arguments("a, b,").is_err());
    }

    #[test]
    fn empty_argument_list_fails() {
        assert!(parse_arguments("   ").is_err());
    }

    #[test]
    fn text_around_quotes_fails() {
        assert!(parse_arguments("abc\"def\"").is_err());
    }

    // ========================================================================
    // COMPLEX TERM PARSING TESTS
    // ========================================================================

    #[test]
    fn parse_simple_complex() {
        let c = parse_complex("symptom(covid, fever)").unwrap();
        assert_eq!(c.functor.as_str(), "symptom");
        assert_eq!(c.arity(), 2);
    }

    #[test]
    fn parse_complex_without_arguments() {
        let c = parse_complex("halt").unwrap();
        assert_eq!(c.functor.as_str(), "halt");
        assert_eq!(c.arity(), 0);
    }

    #[test]
    fn parse_complex_with_mixed_argument_kinds() {
        let c = parse_complex("person(Cleve Lendon, 1961, 1.78)").unwrap();
        assert_eq!(c.args[0], Term::atom("Cleve Lendon"));
        assert_eq!(c.args[1], Term::Integer(1961));
        assert_eq!(c.args[2], Term::Float(1.78));
    }

    #[test]
    fn parse_complex_starting_with_dollar_fails() {
        assert!(parse_complex("$X(a)").is_err());
    }

    #[test]
    fn parse_complex_unbalanced_parens_fails() {
        assert!(parse_complex("f(a, b").is_err());
    }

    #[test]
    fn complex_display_round_trips() {
        let text = "loves(Leonard, Penny)";
        let c = parse_complex(text).unwrap();
        assert_eq!(c.to_string(), text);
    }

    // ========================================================================
    // LIST PARSING TESTS
    // ========================================================================

    #[test]
    fn parse_empty_list() {
        assert!(parse_list("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_plain_list() {
        let l = parse_list("[a, b, c]").unwrap();
        assert_eq!(l.count(), 3);
        assert_eq!(l.to_string(), "[a, b, c]");
    }

    #[test]
    fn parse_list_with_tail_variable() {
        let l = parse_list("[a, b | $Z]").unwrap();
        assert_eq!(l.to_string(), "[a, b | $Z]");
    }

    #[test]
    fn parse_list_two_bars_fails() {
        assert!(parse_list("[a | $X | $Y]").is_err());
    }

    #[test]
    fn parse_list_non_variable_tail_fails() {
        assert!(parse_list("[a | b]").is_err());
    }

    #[test]
    fn parse_list_missing_bracket_fails() {
        assert!(parse_list("[a, b").is_err());
        assert!(parse_list("a, b]").is_err());
    }

    #[test]
    fn parse_list_with_nested_terms() {
        let l = parse_list("[f(a, b), [c, d], 3]").unwrap();
        assert_eq!(l.count(), 3);
    }

    #[test]
    fn parse_list_missing_argument_fails() {
        assert!(parse_list("[a, , b]").is_err());
    }

    // ========================================================================
    // SUBGOAL PARSING TESTS
    // ========================================================================

    #[test]
    fn parse_cut_fail_nl() {
        assert_eq!(parse_subgoal("!").unwrap(), Goal::Cut);
        assert_eq!(parse_subgoal("fail").unwrap(), Goal::Fail);
        match parse_subgoal("nl").unwrap() {
            Goal::Builtin(b) => assert_eq!(b.kind, BuiltinKind::Nl),
            other => panic!("Expected builtin, got {:?}", other),
        }
    }

    #[test]
    fn parse_not_subgoal() {
        match parse_subgoal("not($X = noun)").unwrap() {
            Goal::Not(inner) => match *inner {
                Goal::Builtin(ref b) => assert_eq!(b.kind, BuiltinKind::Unify),
                ref other => panic!("Expected unify inside not, got {:?}", other),
            },
            other => panic!("Expected not, got {:?}", other),
        }
    }

    #[test]
    fn parse_unify_infix() {
        match parse_subgoal("$X = pronoun").unwrap() {
            Goal::Builtin(b) => {
                assert_eq!(b.kind, BuiltinKind::Unify);
                assert_eq!(b.args.len(), 2);
            }
            other => panic!("Expected unify, got {:?}", other),
        }
    }

    #[test]
    fn parse_comparison_infixes() {
        for (text, kind) in [
            ("$X < 6", BuiltinKind::LessThan),
            ("$X <= 6", BuiltinKind::LessThanOrEqual),
            ("$X > 6", BuiltinKind::GreaterThan),
            ("$X >= 6", BuiltinKind::GreaterThanOrEqual),
            ("$X == 6", BuiltinKind::Equal),
        ] {
            match parse_subgoal(text).unwrap() {
                Goal::Builtin(b) => assert_eq!(b.kind, kind, "for {}", text),
                other => panic!("Expected builtin for {}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn infix_needs_surrounding_spaces() {
        // Without a space the angle bracket is part of the term.
        match parse_subgoal("a(<)").unwrap() {
            Goal::Complex(_) => {}
            other => panic!("Expected complex, got {:?}", other),
        }
    }

    #[test]
    fn parse_time_subgoal() {
        match parse_subgoal("time(qsort)").unwrap() {
            Goal::Time(c) => assert_eq!(c.functor.as_str(), "qsort"),
            other => panic!("Expected time, got {:?}", other),
        }
    }

    #[test]
    fn parse_builtin_subgoals() {
        for (text, kind) in [
            ("append(a, b, $Out)", BuiltinKind::Append),
            ("print($X)", BuiltinKind::Print),
            ("print_list($List)", BuiltinKind::PrintList),
            ("functor($Term, $F)", BuiltinKind::Functor),
            ("include(male($_), $In, $Out)", BuiltinKind::Include),
            ("exclude(male($_), $In, $Out)", BuiltinKind::Exclude),
            ("count($List, $N)", BuiltinKind::Count),
        ] {
            match parse_subgoal(text).unwrap() {
                Goal::Builtin(b) => assert_eq!(b.kind, kind, "for {}", text),
                other => panic!("Expected builtin for {}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn builtin_arity_is_checked_at_parse_time() {
        assert!(parse_subgoal("include(male($_), $In)").is_err());
        assert!(parse_subgoal("count($List)").is_err());
        assert!(parse_subgoal("functor(a, b, c, d)").is_err());
    }

    #[test]
    fn unknown_functor_parses_as_complex_goal() {
        match parse_subgoal("sibling(a, b)").unwrap() {
            Goal::Complex(c) => assert_eq!(c.functor.as_str(), "sibling"),
            other => panic!("Expected complex, got {:?}", other),
        }
    }

    // ========================================================================
    // GOAL PARSING TESTS
    // ========================================================================

    #[test]
    fn parse_conjunction() {
        match parse_goal("can_swim($X), can_fly($X)").unwrap() {
            Goal::And(goals) => assert_eq!(goals.len(), 2),
            other => panic!("Expected conjunction, got {:?}", other),
        }
    }

    #[test]
    fn parse_disjunction() {
        match parse_goal("father($X, $Y); mother($X, $Y)").unwrap() {
            Goal::Or(goals) => assert_eq!(goals.len(), 2),
            other => panic!("Expected disjunction, got {:?}", other),
        }
    }

    #[test]
    fn comma_binds_tighter_than_semicolon() {
        match parse_goal("a, b; c").unwrap() {
            Goal::Or(branches) => {
                assert_eq!(branches.len(), 2);
                assert!(matches!(branches[0], Goal::And(_)));
                assert!(matches!(branches[1], Goal::Complex(_)));
            }
            other => panic!("Expected Or at top, got {:?}", other),
        }
    }

    #[test]
    fn parentheses_group_disjunction_inside_conjunction() {
        match parse_goal("(father($_, $X); mother($_, $X)), young($X)").unwrap() {
            Goal::And(goals) => {
                assert_eq!(goals.len(), 2);
                assert!(matches!(goals[0], Goal::Or(_)));
            }
            other => panic!("Expected And at top, got {:?}", other),
        }
    }

    #[test]
    fn single_subgoal_is_not_wrapped() {
        match parse_goal("parent(Bill, $X)").unwrap() {
            Goal::Complex(_) => {}
            other => panic!("Expected bare complex goal, got {:?}", other),
        }
    }

    #[test]
    fn complex_term_commas_are_not_conjunction() {
        match parse_goal("parent(Bill, Audrey)").unwrap() {
            Goal::Complex(c) => assert_eq!(c.arity(), 2),
            other => panic!("Expected complex, got {:?}", other),
        }
    }

    #[test]
    fn list_commas_are_not_conjunction() {
        match parse_goal("$X = [a, b, c]").unwrap() {
            Goal::Builtin(b) => assert_eq!(b.kind, BuiltinKind::Unify),
            other => panic!("Expected unify, got {:?}", other),
        }
    }

    #[test]
    fn unmatched_group_paren_fails() {
        assert!(parse_goal("(a, b").is_err());
    }

    #[test]
    fn invalid_character_between_terms_fails() {
        assert!(parse_goal("a @ b").is_err());
    }

    // ========================================================================
    // RULE PARSING TESTS
    // ========================================================================

    #[test]
    fn parse_fact() {
        let rule = parse_rule("male(Harold).").unwrap();
        assert!(rule.is_fact());
        assert_eq!(rule.head.functor.as_str(), "male");
    }

    #[test]
    fn parse_fact_without_period() {
        let rule = parse_rule("male(Harold)").unwrap();
        assert!(rule.is_fact());
    }

    #[test]
    fn parse_rule_with_body() {
        let rule = parse_rule("father($X, $Y) :- parent($X, $Y), male($X).").unwrap();
        assert!(!rule.is_fact());
        assert_eq!(rule.head.functor.as_str(), "father");
        match rule.body {
            Some(Goal::And(goals)) => assert_eq!(goals.len(), 2),
            other => panic!("Expected conjunction body, got {:?}", other),
        }
    }

    #[test]
    fn parse_rule_with_disjunctive_body() {
        let rule = parse_rule("parent($X, $Y) :- father($X, $Y); mother($X, $Y).").unwrap();
        match rule.body {
            Some(Goal::Or(goals)) => assert_eq!(goals.len(), 2),
            other => panic!("Expected disjunction body, got {:?}", other),
        }
    }

    #[test]
    fn parse_rule_with_two_necks_fails() {
        assert!(parse_rule("a :- b :- c.").is_err());
    }

    #[test]
    fn parse_rule_display_round_trips() {
        let text = "father($X, $Y) :- parent($X, $Y), male($X).";
        let rule = parse_rule(text).unwrap();
        assert_eq!(rule.to_string(), text);
    }

    #[test]
    fn parse_rule_too_short_fails() {
        assert!(parse_rule(".").is_err());
    }

    // ========================================================================
    // INFIX DETECTION EDGE CASES
    // ========================================================================

    #[test]
    fn infix_inside_quotes_is_ignored()  {
        match parse_subgoal("print(\"a = b\")").unwrap() {
            Goal::Builtin(b) => assert_eq!(b.kind, BuiltinKind::Print),
            other => panic!("Expected print, got {:?}", other),
        }
    }

    #[test]
    fn infix_inside_parentheses_is_ignored() {
        match parse_subgoal("check(a = b)").unwrap() {
            Goal::Complex(c) => assert_eq!(c.functor.as_str(), "check"),
            other => panic!("Expected complex, got {:?}", other),
        }
    }

    #[test]
    fn unify_with_list_right_hand_side() {
        match parse_subgoal("$People = [male(a), female(b)]").unwrap() {
            Goal::Builtin(b) => {
                assert_eq!(b.kind, BuiltinKind::Unify);
                assert!(matches!(b.args[1], Term::List(_)));
            }
            other => panic!("Expected unify, got {:?}", other),
        }
    }

    #[test]
    fn unify_with_function_right_hand_side() {
        match parse_subgoal("$A = add($X, $Y)").unwrap() {
            Goal::Builtin(b) => {
                assert_eq!(b.kind, BuiltinKind::Unify);
                assert!(matches!(b.args[1], Term::Function(_)));
            }
            other => panic!("Expected unify, got {:?}", other),
        }
    }
}
