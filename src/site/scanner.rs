//! Directive scanner for the server configuration language.
//!
//! # Responsibilities
//! - Split text into words, `;` terminators and braces
//! - Honor `#` comments, single/double quotes and backslash escapes
//! - Build a tree of directives and brace-delimited blocks
//! - Quote values on the way back out so they re-scan identically
//!
//! # Design Decisions
//! - Never fails: stray `}` is dropped, unclosed blocks close at end of input
//! - A directive without its `;` before `}` or end of input is discarded
//! - In bare words a backslash keeps itself and the next character
//!   (regex locations like `~ \.php$` survive untouched)

use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Semicolon,
    OpenBrace,
    CloseBrace,
}

/// A directive, optionally carrying a block of nested directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
    pub block: Option<Vec<Directive>>,
}

impl Directive {
    fn from_words(words: Vec<String>, block: Option<Vec<Directive>>) -> Option<Self> {
        let mut words = words.into_iter();
        let name = words.next()?;
        Some(Self {
            name,
            args: words.collect(),
            block,
        })
    }

    /// Arguments joined by single spaces.
    pub fn value(&self) -> String {
        self.args.join(" ")
    }

    /// Nested directives, empty for simple directives.
    pub fn children(&self) -> &[Directive] {
        self.block.as_deref().unwrap_or(&[])
    }

    pub fn is_block(&self) -> bool {
        self.block.is_some()
    }
}

/// Value of the first simple directive named `name` that has arguments.
pub fn first_value(directives: &[Directive], name: &str) -> Option<String> {
    directives
        .iter()
        .filter(|d| !d.is_block() && d.name == name && !d.args.is_empty())
        .map(Directive::value)
        .next()
}

/// Depth-first search for the first block named `name`.
pub fn find_block<'a>(directives: &'a [Directive], name: &str) -> Option<&'a Directive> {
    for directive in directives {
        if !directive.is_block() {
            continue;
        }
        if directive.name == name {
            return Some(directive);
        }
        if let Some(found) = find_block(directive.children(), name) {
            return Some(found);
        }
    }
    None
}

/// Split configuration text into tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semicolon);
            }
            '{' => {
                chars.next();
                tokens.push(Token::OpenBrace);
            }
            '}' => {
                chars.next();
                tokens.push(Token::CloseBrace);
            }
            '"' | '\'' => {
                chars.next();
                tokens.push(Token::Word(read_quoted(&mut chars, c)));
            }
            _ => tokens.push(Token::Word(read_bare(&mut chars))),
        }
    }

    tokens
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> String {
    let mut word = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) if next == quote || next == '\\' => word.push(next),
                Some(next) => {
                    word.push('\\');
                    word.push(next);
                }
                None => word.push('\\'),
            },
            c if c == quote => return word,
            c => word.push(c),
        }
    }
    // Unterminated quote: the rest of the input is the word.
    word
}

fn read_bare(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || matches!(c, ';' | '{' | '}') {
            break;
        }
        chars.next();
        word.push(c);
        if c == '\\' {
            if let Some(next) = chars.next() {
                word.push(next);
            }
        }
    }
    word
}

struct Frame {
    name: String,
    args: Vec<String>,
    children: Vec<Directive>,
}

impl Frame {
    fn close(self) -> Directive {
        Directive {
            name: self.name,
            args: self.args,
            block: Some(self.children),
        }
    }
}

fn current<'a>(root: &'a mut Vec<Directive>, stack: &'a mut [Frame]) -> &'a mut Vec<Directive> {
    match stack.last_mut() {
        Some(frame) => &mut frame.children,
        None => root,
    }
}

/// Scan text into a directive tree.
pub fn parse_directives(text: &str) -> Vec<Directive> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut words: Vec<String> = Vec::new();

    for token in tokenize(text) {
        match token {
            Token::Word(word) => words.push(word),
            Token::Semicolon => {
                if let Some(directive) = Directive::from_words(std::mem::take(&mut words), None) {
                    current(&mut root, &mut stack).push(directive);
                }
            }
            Token::OpenBrace => {
                let mut header = std::mem::take(&mut words).into_iter();
                stack.push(Frame {
                    name: header.next().unwrap_or_default(),
                    args: header.collect(),
                    children: Vec::new(),
                });
            }
            Token::CloseBrace => {
                words.clear();
                if let Some(frame) = stack.pop() {
                    let directive = frame.close();
                    current(&mut root, &mut stack).push(directive);
                }
            }
        }
    }

    while let Some(frame) = stack.pop() {
        let directive = frame.close();
        current(&mut root, &mut stack).push(directive);
    }

    root
}

/// Quote a single word if scanning it bare would change it or split it.
pub fn escape_word(word: &str) -> Cow<'_, str> {
    let needs_quotes = word.is_empty()
        || word.ends_with('\\')
        || word
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ';' | '{' | '}' | '"' | '\'' | '#'));
    if !needs_quotes {
        return Cow::Borrowed(word);
    }

    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('"');
    for c in word.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Render a whitespace-separated value as directive arguments.
pub fn escape_value(value: &str) -> String {
    value
        .split_whitespace()
        .map(escape_word)
        .collect::<Vec<_>>()
        .join(" ")
}
