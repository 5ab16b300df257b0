//! Splitting rendered command text into an argument vector, and the escaping
//! helpers used to build that text.

const QUOTE: char = '"';
const BACKSLASH: char = '\\';

fn is_boundary(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

/// Split a rendered command into arguments.
///
/// Runs of space, tab, CR and LF outside quotes separate tokens. Quote
/// characters are kept in the token text; the executor receives them verbatim.
/// A token that starts with `\"` is an escaped-quote literal: it stays open
/// across whitespace until the next quote and then closes, whatever precedes
/// that quote.
pub fn tokenize(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut token = String::new();

    let mut in_token = false;
    let mut in_quote = false;
    let mut escaped_token = false;
    let mut prev: Option<char> = None;

    for ch in command.chars() {
        let last = prev.replace(ch);

        if !in_token {
            if is_boundary(ch) {
                continue;
            }
            in_token = true;
        }

        if !in_quote && is_boundary(ch) {
            tokens.push(std::mem::take(&mut token));
            in_token = false;
            continue;
        }

        if ch == QUOTE {
            if token.len() == 1 && last == Some(BACKSLASH) {
                escaped_token = true;
                in_quote = true;
            } else {
                if !in_quote || last != Some(BACKSLASH) {
                    in_quote = !in_quote;
                }
                if escaped_token {
                    in_quote = false;
                }
                escaped_token = false;
            }
        }
        token.push(ch);
    }

    if !token.is_empty() {
        tokens.push(token);
    }
    tokens
}

/// Prefix every embedded quote with a backslash.
pub fn escape_quotes(value: &str) -> String {
    value.replace(QUOTE, "\\\"")
}

pub fn enclose_in_quotes(value: &str) -> String {
    format!("{QUOTE}{value}{QUOTE}")
}

/// Quote a raw argument so it survives [`tokenize`] as a single token.
pub fn escape(value: &str) -> String {
    enclose_in_quotes(&escape_quotes(value))
}

/// Quote `value` so it tokenizes as exactly one argument. `None` when no
/// quoting keeps it whole: a trailing backslash escapes the closing quote.
pub fn quote(value: &str) -> Option<String> {
    let quoted = escape(value);
    let tokens = tokenize(&format!("{quoted} x"));
    (tokens.len() == 2 && tokens[0] == quoted).then_some(quoted)
}

fn is_plain(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(|c| is_boundary(c) || c == QUOTE || c == BACKSLASH)
}

/// `value` unchanged when it is already one plain argument, otherwise
/// [`quote`]d.
pub fn single_arg(value: &str) -> Option<String> {
    if is_plain(value) {
        Some(value.to_string())
    } else {
        quote(value)
    }
}

/// Render environment variables as `NAME=VALUE` (or a bare `NAME` when the
/// value is blank), comma-joined in iteration order.
pub fn escape_env<I, K, V>(variables: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    variables
        .into_iter()
        .map(|(name, value)| {
            let value = value.as_ref();
            if value.trim().is_empty() {
                name.as_ref().to_string()
            } else {
                format!("{}={}", name.as_ref(), value)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
