//! `WWW-Authenticate` challenge parsing
//!
//! Implements the challenge grammar of RFC 7235 section 4.1: a header value
//! may hold several comma-separated challenges, each made of a scheme
//! followed by either a token68 or a list of auth-params whose values are
//! tokens or quoted strings.

use super::ClientChallenge;

/// Auth-param name under which a token68 value is stored.
pub const TOKEN68_PARAM: &str = "token68";

/// Parses every challenge in one `WWW-Authenticate` header value.
///
/// Malformed trailing input is ignored; everything parsed before it is
/// returned.
///
/// # Examples
///
/// ```
/// use authz_bridge::credential::challenge::parse_challenges;
///
/// let challenges = parse_challenges(r#"Basic realm="ops", Bearer realm="api""#);
/// assert_eq!(challenges.len(), 2);
/// assert_eq!(challenges[1].realm.as_deref(), Some("api"));
/// ```
pub fn parse_challenges(header: &str) -> Vec<ClientChallenge> {
    let mut cursor = Cursor::new(header);
    let mut challenges = Vec::new();

    loop {
        cursor.skip_separators();
        let scheme = cursor.token();
        if scheme.is_empty() {
            break;
        }
        let mut challenge = ClientChallenge::new(scheme, None);

        if !cursor.at_boundary() {
            if let Some(token68) = cursor.token68() {
                challenge = challenge.with_param(TOKEN68_PARAM, token68);
            } else {
                parse_params(&mut cursor, &mut challenge);
            }
        }
        challenges.push(challenge);
    }

    challenges
}

/// Picks the challenge to answer from the values of all
/// `WWW-Authenticate` headers of a response.
///
/// The first challenge with a supported scheme wins; otherwise the first
/// challenge is returned so the caller can report its scheme.
pub fn select_challenge<'a, I>(header_values: I) -> Option<ClientChallenge>
where
    I: IntoIterator<Item = &'a str>,
{
    let all: Vec<ClientChallenge> = header_values
        .into_iter()
        .flat_map(parse_challenges)
        .collect();

    all.iter()
        .find(|c| c.auth_scheme().is_some())
        .or_else(|| all.first())
        .cloned()
}

fn parse_params(cursor: &mut Cursor<'_>, challenge: &mut ClientChallenge) {
    loop {
        let checkpoint = cursor.pos;
        cursor.skip_separators();
        let name = cursor.token();
        if name.is_empty() {
            cursor.pos = checkpoint;
            return;
        }
        cursor.skip_whitespace();
        if cursor.peek() != Some('=') {
            // Start of the next challenge.
            cursor.pos = checkpoint;
            return;
        }
        cursor.bump();
        cursor.skip_whitespace();

        let value = if cursor.peek() == Some('"') {
            match cursor.quoted_string() {
                Some(value) => value,
                None => return,
            }
        } else {
            cursor.token().to_string()
        };
        *challenge = std::mem::take(challenge).with_param(name, value);

        cursor.skip_whitespace();
        if cursor.peek().is_none() {
            return;
        }
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | ',')) {
            self.bump();
        }
    }

    /// True at end of input or at a comma, after optional whitespace.
    fn at_boundary(&mut self) -> bool {
        self.skip_whitespace();
        matches!(self.peek(), None | Some(','))
    }

    fn token(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_tchar) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    /// Reads a token68 if one ends at a boundary; rewinds otherwise.
    fn token68(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self.peek().is_some_and(is_token68_char) {
            self.bump();
        }
        while self.peek() == Some('=') {
            self.bump();
        }
        let end = self.pos;
        if end > start && self.at_boundary() {
            Some(&self.input[start..end])
        } else {
            self.pos = start;
            None
        }
    }

    fn quoted_string(&mut self) -> Option<String> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump()? {
                '"' => return Some(value),
                '\\' => value.push(self.bump()?),
                c => value.push(c),
            }
        }
    }
}

fn is_tchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

fn is_token68_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~+/".contains(c)
}
