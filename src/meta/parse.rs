//! Commit message parsers.
//!
//! Each parser documents the pattern it recognizes. Whitespace means ASCII
//! whitespace (space, tab, CR, LF, vertical tab, form feed), and keywords
//! marked case-insensitive compare ASCII letters only.
//!
//! All matched tokens are ASCII, so every byte offset produced here lies on
//! a char boundary of the input.

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c)
}

/// Does `bytes[at..]` start with `word`, ignoring ASCII case?
fn keyword_at(bytes: &[u8], at: usize, word: &str) -> bool {
    bytes
        .get(at..at + word.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(word.as_bytes()))
}

fn skip_spaces(bytes: &[u8], mut at: usize) -> usize {
    while at < bytes.len() && is_space(bytes[at]) {
        at += 1;
    }
    at
}

/// Parse the digit run at `bytes[at..]`. `None` if there is none or it
/// overflows.
fn digits_at(bytes: &[u8], at: usize) -> Option<u64> {
    let end = at + bytes[at.min(bytes.len())..].iter().take_while(|b| b.is_ascii_digit()).count();
    if end == at {
        return None;
    }
    std::str::from_utf8(&bytes[at..end]).ok()?.parse().ok()
}

/// `bug` (case-insensitive), optional whitespace, digits.
///
/// The first occurrence wins.
pub fn bug_number(text: &str) -> Option<u64> {
    let bytes = text.as_bytes();
    (0..bytes.len())
        .filter(|&i| keyword_at(bytes, i, "bug"))
        .find_map(|i| digits_at(bytes, skip_spaces(bytes, i + 3)))
}

/// `differential`, whitespace, `revision:`, optional whitespace, an optional
/// prefix ending in `/` (typically the revision URL), `D`, digits. All
/// case-insensitive.
///
/// The URL prefix cannot span lines. When several slashes could end it the
/// last one that is followed by `D<digits>` wins.
pub fn revision_id(text: &str) -> Option<u64> {
    let bytes = text.as_bytes();
    for start in 0..bytes.len() {
        if !keyword_at(bytes, start, "differential") {
            continue;
        }
        let after_word = start + "differential".len();
        let at = skip_spaces(bytes, after_word);
        if at == after_word || !keyword_at(bytes, at, "revision:") {
            continue;
        }
        if let Some(id) = revision_target(bytes, at + "revision:".len()) {
            return Some(id);
        }
    }
    None
}

/// Match `\s*(?:.+/)?D([0-9]+)` at `from`, preferring the longest
/// whitespace run and then the longest prefix.
fn revision_target(bytes: &[u8], from: usize) -> Option<u64> {
    let spaces_end = skip_spaces(bytes, from);
    for at in (from..=spaces_end).rev() {
        // prefix: one or more non-newline chars, then '/'
        let line_end = bytes[at..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |p| at + p);
        let with_prefix = (at + 1..line_end)
            .rev()
            .filter(|&slash| bytes[slash] == b'/')
            .find_map(|slash| d_number(bytes, slash + 1));
        if let Some(id) = with_prefix.or_else(|| d_number(bytes, at)) {
            return Some(id);
        }
    }
    None
}

fn d_number(bytes: &[u8], at: usize) -> Option<u64> {
    match bytes.get(at) {
        Some(b'D' | b'd') => digits_at(bytes, at + 1),
        _ => None,
    }
}

/// Does this line reference a revision?
pub fn is_revision_line(line: &str) -> bool {
    revision_id(line).is_some()
}

/// `depends` whitespace `on` whitespace `D` digits, case-insensitive.
pub fn depends_on(text: &str) -> Option<u64> {
    let bytes = text.as_bytes();
    for start in 0..bytes.len() {
        if !keyword_at(bytes, start, "depends") {
            continue;
        }
        let after_word = start + "depends".len();
        let on = skip_spaces(bytes, after_word);
        if on == after_word || !keyword_at(bytes, on, "on") {
            continue;
        }
        let target = skip_spaces(bytes, on + 2);
        if target == on + 2 {
            continue;
        }
        if let Some(id) = d_number(bytes, target) {
            return Some(id);
        }
    }
    None
}

fn is_reviewer_separator(b: u8) -> bool {
    matches!(b, b'?' | b'=' | b',')
}

/// A reviewer request such as `r?alice` or `r=bob,carol`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerToken<'a> {
    /// byte range of the whole token
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

impl<'a> ReviewerToken<'a> {
    /// The names in the token, in order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> {
        let text: &'a str = self.text;
        text[2..]
            .split(|c: char| c.is_ascii() && is_reviewer_separator(c as u8))
            .filter(|name| !name.is_empty())
    }
}

/// Match a reviewer token at `start`: lowercase `r`, then one or more groups
/// of a separator (`?`, `=`, `,`) followed by characters that are neither
/// commas nor whitespace.
fn reviewer_token_at(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start) != Some(&b'r') {
        return None;
    }
    let name_char = |b: u8| b != b',' && !is_space(b);

    let mut end = start + 1;
    let mut groups = 0;
    while end + 1 < bytes.len() && is_reviewer_separator(bytes[end]) && name_char(bytes[end + 1]) {
        end += 1;
        while end < bytes.len() && name_char(bytes[end]) {
            end += 1;
        }
        groups += 1;
    }
    (groups > 0).then_some(end)
}

/// Every reviewer token in `line`, left to right, non-overlapping.
pub fn reviewer_tokens(line: &str) -> Vec<ReviewerToken<'_>> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut at = 0;
    while at < bytes.len() {
        match reviewer_token_at(bytes, at) {
            Some(end) => {
                tokens.push(ReviewerToken {
                    start: at,
                    end,
                    text: &line[at..end],
                });
                at = end;
            }
            None => at += 1,
        }
    }
    tokens
}

/// Every reviewer name requested in `line`, in order.
pub fn reviewer_names(line: &str) -> Vec<&str> {
    reviewer_tokens(line)
        .into_iter()
        .flat_map(|token| token.names().collect::<Vec<_>>())
        .collect()
}

/// Revision title: the first line without its first reviewer token, and
/// without trailing whitespace, commas, periods or semicolons.
pub fn title(line: &str) -> String {
    let mut title = match reviewer_tokens(line).first() {
        Some(token) => format!("{}{}", &line[..token.start], &line[token.end..]),
        None => line.to_string(),
    };
    let kept = title
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | ';'))
        .len();
    title.truncate(kept);
    title
}

/// Revision summary for a commit message: everything after the first line
/// except revision references, trimmed.
pub fn new_summary(message: &str) -> String {
    message
        .split_inclusive('\n')
        .skip(1)
        .filter(|line| !is_revision_line(line))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split a remote summary into the text phlay manages and the revision it
/// currently depends on.
pub fn old_summary(remote: &str) -> (String, Option<u64>) {
    let summary = remote
        .split_inclusive('\n')
        .filter(|line| depends_on(line).is_none())
        .collect::<String>()
        .trim()
        .to_string();
    (summary, depends_on(remote))
}
