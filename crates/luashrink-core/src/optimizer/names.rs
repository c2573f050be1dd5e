use rustc_hash::FxHashSet;

/// Lua keywords; never usable as generated names.
pub const RESERVED_WORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Deterministic short-name sequence: `a`..`z`, then `aa`..`zz`, and so on,
/// skipping reserved words and any name in the forbidden set.
///
/// The counter lives in the generator value itself, never in process-wide
/// state, so independent pass invocations cannot interfere.
pub struct NameGenerator {
    counter: usize,
    forbidden: FxHashSet<String>,
}

impl NameGenerator {
    pub fn new() -> Self {
        NameGenerator {
            counter: 0,
            forbidden: FxHashSet::default(),
        }
    }

    pub fn with_forbidden(forbidden: FxHashSet<String>) -> Self {
        NameGenerator {
            counter: 0,
            forbidden,
        }
    }

    pub fn forbid(&mut self, name: impl Into<String>) {
        self.forbidden.insert(name.into());
    }

    /// Next usable short name.
    pub fn next_name(&mut self) -> String {
        loop {
            let name = encode(self.counter);
            self.counter += 1;
            if RESERVED_WORDS.contains(&name.as_str()) || self.forbidden.contains(&name) {
                continue;
            }
            return name;
        }
    }

    /// The length of the next name this generator would produce, without
    /// consuming it. The alias cost model needs this before committing.
    pub fn peek_len(&self) -> usize {
        let mut counter = self.counter;
        loop {
            let name = encode(counter);
            counter += 1;
            if RESERVED_WORDS.contains(&name.as_str()) || self.forbidden.contains(&name) {
                continue;
            }
            return name.len();
        }
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Index to name: 0..25 are `a`..`z`, 26 is `aa`, 27 is `ab`, … — the
/// bijective base-26 encoding.
pub(crate) fn encode(mut index: usize) -> String {
    let mut bytes = Vec::new();
    loop {
        bytes.push(b'a' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    bytes.reverse();
    String::from_utf8(bytes).expect("generated names are ascii")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_single_letters_first() {
        let mut names = NameGenerator::new();
        assert_eq!(names.next_name(), "a");
        assert_eq!(names.next_name(), "b");
        for _ in 2..25 {
            names.next_name();
        }
        assert_eq!(names.next_name(), "z");
        assert_eq!(names.next_name(), "aa");
    }

    #[test]
    fn skips_reserved_words() {
        let mut names = NameGenerator::new();
        let mut seen = Vec::new();
        for _ in 0..900 {
            seen.push(names.next_name());
        }
        assert!(!seen.iter().any(|n| n == "do"));
        assert!(!seen.iter().any(|n| n == "if"));
        assert!(!seen.iter().any(|n| n == "in"));
        assert!(!seen.iter().any(|n| n == "or"));
        assert!(seen.iter().any(|n| n == "dn"));
        assert!(seen.iter().any(|n| n == "dp"));
    }

    #[test]
    fn skips_forbidden_names() {
        let mut forbidden = FxHashSet::default();
        forbidden.insert("a".to_string());
        forbidden.insert("c".to_string());
        let mut names = NameGenerator::with_forbidden(forbidden);
        assert_eq!(names.next_name(), "b");
        assert_eq!(names.next_name(), "d");
    }

    #[test]
    fn peek_len_matches_next() {
        let mut names = NameGenerator::new();
        for _ in 0..30 {
            let len = names.peek_len();
            assert_eq!(names.next_name().len(), len);
        }
    }
}
