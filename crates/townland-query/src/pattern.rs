//! Case-insensitive name patterns
//!
//! `%` matches any run of characters (including none) and `_` matches exactly
//! one. Everything else matches itself, ignoring case.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Any,
    One,
    Char(char),
}

/// A compiled name pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    tokens: Vec<Token>,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Self {
        let mut tokens = Vec::new();
        for c in pattern.trim().chars() {
            let token = match c {
                '%' => Token::Any,
                '_' => Token::One,
                c => Token::Char(c),
            };
            // Runs of % collapse
            if token == Token::Any && tokens.last() == Some(&Token::Any) {
                continue;
            }
            tokens.push(token);
        }
        Self { tokens }
    }

    /// Whether `name` matches the whole pattern
    pub fn matches(&self, name: &str) -> bool {
        let chars: Vec<char> = name.chars().collect();
        let (mut t, mut c) = (0, 0);
        // Last `%` seen and the input position it was tried at
        let mut backtrack: Option<(usize, usize)> = None;

        while c < chars.len() {
            match self.tokens.get(t) {
                Some(Token::Any) => {
                    backtrack = Some((t, c));
                    t += 1;
                    continue;
                }
                Some(Token::One) => {
                    t += 1;
                    c += 1;
                    continue;
                }
                Some(Token::Char(p)) if eq_ignore_case(*p, chars[c]) => {
                    t += 1;
                    c += 1;
                    continue;
                }
                _ => {}
            }
            match backtrack {
                Some((bt, bc)) => {
                    t = bt + 1;
                    c = bc + 1;
                    backtrack = Some((bt, bc + 1));
                }
                None => return false,
            }
        }

        self.tokens[t..].iter().all(|tok| *tok == Token::Any)
    }
}

fn eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_is_exact_ignoring_case() {
        let p = NamePattern::new("Ballybeg");
        assert!(p.matches("ballybeg"));
        assert!(p.matches("BALLYBEG"));
        assert!(!p.matches("Ballybeg North"));
        assert!(!p.matches("Ballybe"));
    }

    #[test]
    fn test_wildcards() {
        assert!(NamePattern::new("bally%").matches("Ballymore"));
        assert!(NamePattern::new("%more").matches("Ballymore"));
        assert!(NamePattern::new("%ly%o%").matches("Ballymore"));
        assert!(NamePattern::new("b_llybeg").matches("Bállybeg"));
        assert!(!NamePattern::new("b_llybeg").matches("Bllybeg"));
        assert!(NamePattern::new("%").matches(""));
        assert!(!NamePattern::new("_").matches(""));
    }

    #[test]
    fn test_irish_names() {
        let p = NamePattern::new("an baile%");
        assert!(p.matches("An Baile Beag"));
        assert!(NamePattern::new("Cill Mhantáin").matches("CILL MHANTÁIN"));
    }
}
