//! `#pragma parameter` declarations.
//!
//! ```text
//! #pragma parameter <name> "<description>" <default> <min> <max> [<step>]
//! ```

/// A shader parameter as declared in source, later rewritten by reflection.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceParam {
    pub name: String,
    pub description: String,
    pub default_value: f32,
    pub min_value: f32,
    pub max_value: f32,
    pub step_value: f32,
    /// Uniform-buffer binding, or negative for push-constant blocks.
    pub buffer: i32,
    pub offset: u32,
    pub size: u32,
    /// Position in the declaration list; the final sort key.
    pub order: usize,
}

impl SourceParam {
    /// Engine-supplied uniform that every shader may use without declaring it.
    pub fn builtin(name: &str, buffer: i32) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            default_value: 0.0,
            min_value: 0.0,
            max_value: 0.0,
            step_value: 0.0,
            buffer,
            offset: 0,
            size: 0,
            order: 0,
        }
    }

    /// Parameter with only a name and layout, used for reflected members
    /// that were never declared.
    pub fn synthesized(name: &str, buffer: i32, offset: u32, size: u32) -> Self {
        Self {
            offset,
            size,
            ..Self::builtin(name, buffer)
        }
    }

    /// Parse a `#pragma parameter` line.
    ///
    /// Parsing is best-effort: a missing or non-numeric value becomes 0 and is
    /// reported in the returned problem list, but the parameter is still
    /// produced. A missing step is not a problem.
    pub fn parse(line: &str) -> (Self, Vec<String>) {
        let mut problems = Vec::new();
        let mut tokens = Tokens::new(line);

        // "#pragma" "parameter"
        tokens.word();
        tokens.word();

        let name = match tokens.word() {
            Some(name) => name.to_string(),
            None => {
                problems.push("missing parameter name".to_string());
                String::new()
            }
        };
        let description = tokens
            .quoted()
            .map(|d| clean_description(&d))
            .unwrap_or_default();

        let mut number = |field: &str, required: bool| -> f32 {
            match tokens.word() {
                Some(text) => text.parse::<f32>().unwrap_or_else(|_| {
                    problems.push(format!("{} `{}` for {} is not a number", field, text, name));
                    0.0
                }),
                None => {
                    if required {
                        problems.push(format!("missing {} for {}", field, name));
                    }
                    0.0
                }
            }
        };
        let default_value = number("default", true);
        let min_value = number("minimum", true);
        let max_value = number("maximum", true);
        let step_value = number("step", false);

        let param = Self {
            name,
            description,
            default_value,
            min_value,
            max_value,
            step_value,
            buffer: 0,
            offset: 0,
            size: 0,
            order: 0,
        };
        (param, problems)
    }
}

/// Drop non-ASCII characters and surrounding whitespace/quotes.
fn clean_description(text: &str) -> String {
    let ascii: String = text.chars().filter(char::is_ascii).collect();
    trim_quoted(&ascii).to_string()
}

/// Trim whitespace and double quotes from both ends.
pub fn trim_quoted(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '"')
}

/// Whitespace tokenizer with support for quoted strings.
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    /// Next whitespace-delimited word.
    pub fn word(&mut self) -> Option<&'a str> {
        let text = self.rest.trim_start();
        if text.is_empty() {
            self.rest = text;
            return None;
        }
        let end = text.find(char::is_whitespace).unwrap_or(text.len());
        let (word, rest) = text.split_at(end);
        self.rest = rest;
        Some(word)
    }

    /// Next token, reading a `"..."` string (with `\"` and `\\` escapes) when
    /// the token starts with a quote, otherwise a plain word.
    pub fn quoted(&mut self) -> Option<String> {
        let text = self.rest.trim_start();
        let Some(body) = text.strip_prefix('"') else {
            self.rest = text;
            return self.word().map(str::to_string);
        };

        let mut out = String::new();
        let mut chars = body.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => {
                    self.rest = &body[i + 1..];
                    return Some(out);
                }
                other => out.push(other),
            }
        }
        // Unterminated: take the remainder.
        self.rest = "";
        Some(out)
    }
}
