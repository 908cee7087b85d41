//! `.dockerignore` parsing and path matching.
//!
//! Patterns follow the engine's exclusion rules: `*` and `?` never cross a
//! `/`, `**` spans any number of path segments, a leading `!` re-includes
//! paths, and the last matching pattern decides.

use crate::error::BuildContextError;

/// Parse the contents of a `.dockerignore` file into normalised patterns.
///
/// Blank lines and `#` comments are skipped. Each remaining line is trimmed,
/// path-cleaned, and stripped of a leading `/`; exclusion patterns keep their
/// `!` prefix.
#[must_use]
pub fn parse_ignore_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(normalize_pattern_line)
        .collect()
}

fn normalize_pattern_line(line: &str) -> String {
    let (invert, body) = line
        .strip_prefix('!')
        .map_or((false, line), |rest| (true, rest.trim()));

    let mut pattern = if body.is_empty() {
        String::new()
    } else {
        clean_path(body)
    };
    if pattern.len() > 1 && pattern.starts_with('/') {
        pattern.remove(0);
    }

    if invert {
        format!("!{pattern}")
    } else {
        pattern
    }
}

/// Lexically clean a slash-separated path.
///
/// Repeated separators collapse, `.` segments are dropped and `..` consumes
/// the preceding segment. An empty result becomes `.`.
#[must_use]
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = vec![];

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => String::from("."),
        (false, false) => joined,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    Star,
    Globstar,
    TrailingGlobstar,
    Class { negated: bool, items: Vec<ClassItem> },
}

/// A single compiled ignore pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnorePattern {
    text: String,
    exclusion: bool,
    depth: usize,
    tokens: Vec<Token>,
}

impl IgnorePattern {
    /// Compile a pattern, honouring a leading `!`.
    ///
    /// # Errors
    ///
    /// Returns `BuildContextError::InvalidIgnorePattern` for a bare `!`, an
    /// unterminated character class, or a trailing escape.
    pub fn new(raw: &str) -> Result<Self, BuildContextError> {
        let trimmed = raw.trim();
        let (exclusion, text) = match trimmed.strip_prefix('!') {
            Some("") => return Err(invalid(trimmed, "exclusion pattern is empty")),
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let tokens = tokenize(text).map_err(|reason| invalid(trimmed, reason))?;

        Ok(Self {
            text: String::from(text),
            exclusion,
            depth: text.split('/').count(),
            tokens,
        })
    }

    /// Return the pattern text without its `!` prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Return whether this pattern re-includes matching paths.
    #[must_use]
    pub const fn is_exclusion(&self) -> bool {
        self.exclusion
    }

    fn matches_exactly(&self, path: &str) -> bool {
        let chars: Vec<char> = path.chars().collect();
        match_tokens(&self.tokens, &chars)
    }
}

fn invalid(pattern: &str, reason: &str) -> BuildContextError {
    BuildContextError::InvalidIgnorePattern {
        pattern: String::from(pattern),
        reason: String::from(reason),
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, &'static str> {
    let mut tokens = vec![];
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                }
                if chars.peek().is_none() {
                    tokens.push(Token::TrailingGlobstar);
                } else {
                    tokens.push(Token::Globstar);
                }
            }
            '*' => tokens.push(Token::Star),
            '?' => tokens.push(Token::AnyChar),
            '\\' => {
                let escaped = chars.next().ok_or("trailing escape character")?;
                tokens.push(Token::Literal(escaped));
            }
            '[' => tokens.push(parse_class(&mut chars)?),
            other => tokens.push(Token::Literal(other)),
        }
    }

    Ok(tokens)
}

fn parse_class(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<Token, &'static str> {
    let negated = chars.next_if_eq(&'^').is_some();
    let mut items = vec![];

    loop {
        let ch = chars.next().ok_or("unterminated character class")?;
        let start = match ch {
            ']' if !items.is_empty() => return Ok(Token::Class { negated, items }),
            ']' => return Err("empty character class"),
            '\\' => chars.next().ok_or("unterminated character class")?,
            other => other,
        };

        if chars.next_if_eq(&'-').is_some() {
            let end = match chars.next().ok_or("unterminated character class")? {
                '\\' => chars.next().ok_or("unterminated character class")?,
                ']' => return Err("unterminated character range"),
                other => other,
            };
            if end < start {
                return Err("character range is out of order");
            }
            items.push(ClassItem::Range(start, end));
        } else {
            items.push(ClassItem::Single(start));
        }
    }
}

fn class_matches(negated: bool, items: &[ClassItem], ch: char) -> bool {
    let hit = items.iter().any(|item| match *item {
        ClassItem::Single(single) => single == ch,
        ClassItem::Range(start, end) => (start..=end).contains(&ch),
    });
    hit != negated
}

fn match_tokens(tokens: &[Token], text: &[char]) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        return text.is_empty();
    };

    match token {
        Token::Literal(expected) => text
            .split_first()
            .is_some_and(|(ch, tail)| ch == expected && match_tokens(rest, tail)),
        Token::AnyChar => text
            .split_first()
            .is_some_and(|(ch, tail)| *ch != '/' && match_tokens(rest, tail)),
        Token::Class { negated, items } => text.split_first().is_some_and(|(ch, tail)| {
            class_matches(*negated, items, *ch) && match_tokens(rest, tail)
        }),
        Token::Star => {
            let segment_len = text.iter().position(|ch| *ch == '/').unwrap_or(text.len());
            (0..=segment_len).any(|skip| match_tokens(rest, text.get(skip..).unwrap_or(&[])))
        }
        Token::Globstar => {
            match_tokens(rest, text)
                || text.iter().enumerate().any(|(index, ch)| {
                    *ch == '/' && match_tokens(rest, text.get(index + 1..).unwrap_or(&[]))
                })
        }
        Token::TrailingGlobstar => true,
    }
}

/// Ordered set of ignore patterns applied to context-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternMatcher {
    patterns: Vec<IgnorePattern>,
}

impl PatternMatcher {
    /// Compile a list of patterns as produced by [`parse_ignore_file`].
    ///
    /// Empty patterns are skipped.
    ///
    /// # Errors
    ///
    /// Returns `BuildContextError::InvalidIgnorePattern` for the first
    /// malformed pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, BuildContextError> {
        let compiled = patterns
            .iter()
            .map(AsRef::as_ref)
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(IgnorePattern::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns: compiled })
    }

    /// Return whether an exclusion pattern may re-include something below
    /// `directory`, so an excluded directory still has to be walked.
    #[must_use]
    pub fn exclusion_reaches_into(&self, directory: &str) -> bool {
        let prefix = format!("{directory}/");
        self.patterns
            .iter()
            .filter(|pattern| pattern.is_exclusion())
            .any(|pattern| format!("{}/", pattern.as_str()).starts_with(&prefix))
    }

    /// Return whether `path` (relative to the context root) is excluded.
    ///
    /// A pattern also matches when it matches one of the path's ancestor
    /// directories truncated to the pattern's segment count.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let file = clean_path(path);
        if file == "." {
            return false;
        }

        let parent_dirs: Vec<&str> = file
            .rsplit_once('/')
            .map(|(parent, _)| parent.split('/').collect())
            .unwrap_or_default();

        self.patterns.iter().fold(false, |matched, pattern| {
            let hit = pattern.matches_exactly(&file)
                || parent_dirs
                    .get(..pattern.depth)
                    .is_some_and(|dirs| !dirs.is_empty() && pattern.matches_exactly(&dirs.join("/")));

            if hit { !pattern.is_exclusion() } else { matched }
        })
    }
}
