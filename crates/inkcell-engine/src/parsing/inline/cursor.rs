/// A byte cursor over a single line of inline content.
///
/// All delimiters recognised by the inline parser are ASCII, so every index
/// the parser slices at is a char boundary.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The string being parsed.
    pub s: &'a str,
    /// Current byte index into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// Peeks at the current byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.i).copied()
    }

    /// Peeks `n` bytes ahead of the current position.
    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.s.as_bytes().get(self.i + n).copied()
    }

    /// Byte just before the current position.
    pub fn prev(&self) -> Option<u8> {
        self.i
            .checked_sub(1)
            .and_then(|i| self.s.as_bytes().get(i).copied())
    }

    pub fn starts_with(&self, pat: &[u8]) -> bool {
        self.s
            .as_bytes()
            .get(self.i..)
            .is_some_and(|rest| rest.starts_with(pat))
    }

    /// Advances by one character (not byte) so `i` stays on a char boundary.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.s.get(self.i..)?.chars().next()?;
        self.i += c.len_utf8();
        Some(c)
    }

    /// Advances by `n` bytes. Only call with ASCII delimiters ahead.
    pub fn bump_n(&mut self, n: usize) {
        self.i += n;
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.s[start..end]
    }
}
