//! Parsing of native type descriptors.
//!
//! Introspection reports types in several shapes depending on the engine and
//! the catalog queried: `int4`, `character varying(255)`, `decimal(10,2)
//! unsigned`, `timestamp(3) with time zone`, `int identity`, `integer[]`.
//! [`NativeType::parse`] reduces all of them to a normalized base name plus
//! the arguments and modifiers the mappers care about.

/// Words that modify a type rather than name it.
const MODIFIERS: &[&str] = &[
    "unsigned",
    "signed",
    "zerofill",
    "identity",
    "auto_increment",
];

/// A parsed native type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeType {
    /// The descriptor exactly as reported, trimmed.
    pub original: String,
    /// Lowercased base name with arguments and modifiers removed
    /// (`"timestamp with time zone"`, `"varchar"`, `"_int4"`).
    pub base: String,
    /// Raw arguments of the type's parenthesized group, if any.
    pub args: Vec<String>,
    /// `unsigned` modifier present.
    pub unsigned: bool,
    /// `identity` or `auto_increment` modifier present.
    pub identity: bool,
    /// Number of trailing `[]` array dimensions.
    pub array_dims: usize,
}

enum Token {
    Word(String),
    Group(String),
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '(' => {
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
                let mut depth = 1;
                let mut in_quote = false;
                let mut group = String::new();
                for c in chars.by_ref() {
                    match c {
                        '\'' => {
                            in_quote = !in_quote;
                            group.push(c);
                        }
                        '(' if !in_quote => {
                            depth += 1;
                            group.push(c);
                        }
                        ')' if !in_quote => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            group.push(c);
                        }
                        _ => group.push(c),
                    }
                }
                tokens.push(Token::Group(group.trim().to_string()));
            }
            c if c.is_whitespace() => {
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
            }
            _ => word.push(c),
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }

    tokens
}

fn split_args(group: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for c in group.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                current.push(c);
            }
            ',' if !in_quote => args.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

impl NativeType {
    /// Parse a native type descriptor. Never fails; unrecognized shapes
    /// simply produce a base name the mappers will not find.
    pub fn parse(raw: &str) -> Self {
        let original = raw.trim().to_string();
        let mut lower = original.to_lowercase();

        let mut array_dims = 0;
        while lower.ends_with(']') {
            match lower.rfind('[') {
                Some(idx) => {
                    lower.truncate(idx);
                    lower = lower.trim_end().to_string();
                    array_dims += 1;
                }
                None => break,
            }
        }

        let mut words = Vec::new();
        let mut args = Vec::new();
        let mut unsigned = false;
        let mut identity = false;
        let mut in_modifiers = false;

        for token in tokenize(&lower) {
            match token {
                Token::Word(word) => {
                    if MODIFIERS.contains(&word.as_str()) {
                        in_modifiers = true;
                        match word.as_str() {
                            "unsigned" => unsigned = true,
                            "identity" | "auto_increment" => identity = true,
                            _ => {}
                        }
                    } else if !in_modifiers {
                        words.push(word);
                    }
                }
                Token::Group(group) => {
                    if !in_modifiers && args.is_empty() {
                        args = split_args(&group);
                    }
                }
            }
        }

        Self {
            original,
            base: words.join(" "),
            args,
            unsigned,
            identity,
            array_dims,
        }
    }

    /// First argument as a length; `max` maps to -1.
    pub fn length_arg(&self) -> Option<i64> {
        let first = self.args.first()?;
        if first.eq_ignore_ascii_case("max") {
            return Some(-1);
        }
        first.parse().ok()
    }

    /// First argument as numeric precision.
    pub fn precision_arg(&self) -> Option<u32> {
        self.args.first()?.parse().ok()
    }

    /// Second argument as numeric scale.
    pub fn scale_arg(&self) -> Option<u32> {
        self.args.get(1)?.parse().ok()
    }

    /// Descriptor of the array element type, for `integer[]`-style arrays.
    pub fn element(&self) -> Option<NativeType> {
        if self.array_dims == 0 {
            return None;
        }
        let mut inner = self.clone();
        inner.array_dims -= 1;
        inner.original = match self.original.rfind('[') {
            Some(idx) => self.original[..idx].trim_end().to_string(),
            None => self.original.clone(),
        };
        Some(inner)
    }
}
