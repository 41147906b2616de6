/// Cursor over the raw arguments of one invocation.
///
/// Plugins may look at or consume leading tokens before dispatch; whatever is left is
/// handed to the command line parser untouched.
#[derive(Debug, Clone, Default)]
pub struct TokenIterator {
    tokens: Vec<String>,
    position: usize,
}

impl TokenIterator {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: args.into_iter().map(Into::into).collect(),
            position: 0,
        }
    }

    /// The next token, without advancing.
    pub fn peek(&self) -> Option<&str> {
        self.tokens.get(self.position).map(String::as_str)
    }

    pub fn has_next(&self) -> bool {
        self.position < self.tokens.len()
    }

    /// Tokens not consumed yet.
    pub fn remaining(&self) -> &[String] {
        &self.tokens[self.position..]
    }
}

impl Iterator for TokenIterator {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.tokens.get(self.position).cloned()?;
        self.position += 1;
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_tokens_as_given() {
        let tokens: Vec<String> = TokenIterator::new(["-abc", "--long", "-", "plain"]).collect();

        assert_eq!(tokens, ["-abc", "--long", "-", "plain"]);
    }

    #[test]
    fn peek_does_not_advance() {
        let mut tokens = TokenIterator::new(["new", "name"]);

        assert_eq!(tokens.peek(), Some("new"));
        assert_eq!(tokens.next().as_deref(), Some("new"));
        assert_eq!(tokens.peek(), Some("name"));
        assert_eq!(tokens.remaining(), ["name".to_string()]);
        assert_eq!(tokens.next().as_deref(), Some("name"));
        assert!(!tokens.has_next());
        assert_eq!(tokens.peek(), None);
        assert_eq!(tokens.next(), None);
    }
}
