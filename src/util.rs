//! Small text helpers shared by the HTTP layer.

/// Append-only text assembly.
///
/// Used to build response heads without repeated `format!` allocations.
///
/// ```
/// # use senceit_node::util::StringBuilder;
/// let text = StringBuilder::new().add("hello").space().add("world").newline().build();
/// assert_eq!(text, "hello world\r\n");
/// ```
#[derive(Debug, Default, Clone)]
pub struct StringBuilder {
    parts: Vec<String>,
}

impl StringBuilder {
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Appends `text`. Empty text is skipped.
    pub fn add(mut self, text: impl ToString) -> Self {
        let text = text.to_string();
        if !text.is_empty() {
            self.parts.push(text);
        }
        self
    }

    pub fn space(mut self) -> Self {
        self.parts.push(" ".to_string());
        self
    }

    /// Appends the wire line terminator (`\r\n`).
    pub fn newline(mut self) -> Self {
        self.parts.push("\r\n".to_string());
        self
    }

    pub fn semicolon(mut self) -> Self {
        self.parts.push("; ".to_string());
        self
    }

    pub fn build(&self) -> String {
        self.parts.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_lines() {
        let text = StringBuilder::new()
            .add("hello")
            .space()
            .add("world")
            .newline()
            .newline()
            .build();
        assert_eq!(text, "hello world\r\n\r\n");
    }

    #[test]
    fn skips_empty_parts() {
        let text = StringBuilder::new().add("").add("a").semicolon().add(1).build();
        assert_eq!(text, "a; 1");
    }
}
