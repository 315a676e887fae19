// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! Pattern text to [`Ast`].
//!
//! Recursive descent with a nesting cap. Every error carries the byte offset where
//! parsing stopped.

use crate::config::{MAX_CAPTURE_GROUPS, MAX_REPEAT};
use crate::errors::KernelError;

use super::RegexFlags;

/// Deepest group nesting accepted.
const MAX_NESTING: usize = 250;

/// Highest Unicode scalar value.
pub(crate) const MAX_CODEPOINT: u32 = 0x10_FFFF;

/// Zero-width assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assertion {
    /// `^`: text start, or line start with `multiline`.
    Caret,
    /// `$`: text end, or line end with `multiline`.
    Dollar,
    /// `\A`
    StartText,
    /// `\z`
    EndText,
    StartLine,
    EndLine,
    /// `\b`
    WordBoundary,
    /// `\B`
    NotWordBoundary,
}

/// A set of code points as sorted, merged inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassSet {
    pub ranges: Vec<(u32, u32)>,
    pub negated: bool,
}

impl ClassSet {
    fn from_ranges(mut ranges: Vec<(u32, u32)>, negated: bool) -> Self {
        ranges.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        Self {
            ranges: merged,
            negated,
        }
    }

    /// Positive ranges covering everything this set matches.
    fn positive_ranges(&self) -> Vec<(u32, u32)> {
        if !self.negated {
            return self.ranges.clone();
        }
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        let mut next = 0u32;
        for &(lo, hi) in &self.ranges {
            if lo > next {
                out.push((next, lo - 1));
            }
            next = hi.saturating_add(1);
        }
        if next <= MAX_CODEPOINT {
            out.push((next, MAX_CODEPOINT));
        }
        out
    }

    fn digit() -> Vec<(u32, u32)> {
        vec![('0' as u32, '9' as u32)]
    }

    fn word() -> Vec<(u32, u32)> {
        vec![
            ('0' as u32, '9' as u32),
            ('A' as u32, 'Z' as u32),
            ('_' as u32, '_' as u32),
            ('a' as u32, 'z' as u32),
        ]
    }

    /// Unicode `White_Space`.
    fn space() -> Vec<(u32, u32)> {
        vec![
            (0x09, 0x0D),
            (0x20, 0x20),
            (0x85, 0x85),
            (0xA0, 0xA0),
            (0x1680, 0x1680),
            (0x2000, 0x200A),
            (0x2028, 0x2029),
            (0x202F, 0x202F),
            (0x205F, 0x205F),
            (0x3000, 0x3000),
        ]
    }
}

/// Parsed pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Empty,
    Literal(char),
    /// `.`
    Any,
    Class(ClassSet),
    Assert(Assertion),
    /// Capturing when `index` is set (1-based).
    Group {
        index: Option<usize>,
        node: Box<Ast>,
    },
    Concat(Vec<Ast>),
    Alternate(Vec<Ast>),
    Repeat {
        node: Box<Ast>,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    },
}

/// Output of [`parse`].
#[derive(Debug, Clone)]
pub struct Parsed {
    pub ast: Ast,
    /// Number of capturing groups, excluding the implicit whole-match group.
    pub groups: usize,
    /// Flags from a leading `(?ims)` group.
    pub inline_flags: RegexFlags,
}

enum Escape {
    Char(char),
    Class(ClassSet),
    Assert(Assertion),
}

enum ClassAtom {
    Char(char),
    Set(Vec<(u32, u32)>),
}

struct Parser<'p> {
    pattern: &'p str,
    pos: usize,
    groups: usize,
    depth: usize,
}

/// Parses `pattern`.
///
/// # Errors
/// `MalformedPattern` with the offending byte offset and a reason.
pub fn parse(pattern: &str) -> Result<Parsed, KernelError> {
    let mut p = Parser {
        pattern,
        pos: 0,
        groups: 0,
        depth: 0,
    };
    let inline_flags = p.parse_inline_flags()?;
    let ast = p.parse_alternation()?;
    if p.peek().is_some() {
        return Err(p.error(p.pos, "unbalanced parenthesis"));
    }
    Ok(Parsed {
        ast,
        groups: p.groups,
        inline_flags,
    })
}

impl<'p> Parser<'p> {
    fn error(&self, position: usize, reason: impl Into<String>) -> KernelError {
        KernelError::MalformedPattern {
            pattern: self.pattern.to_string(),
            position,
            reason: reason.into(),
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.pattern[self.pos..].chars().next()
    }

    #[inline]
    fn peek_at(&self, skip: usize) -> Option<char> {
        self.pattern[self.pos..].chars().nth(skip)
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    #[inline]
    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// A leading `(?ims)` group.
    fn parse_inline_flags(&mut self) -> Result<RegexFlags, KernelError> {
        let mut flags = RegexFlags::default();
        if !self.pattern.starts_with("(?") || self.pattern[2..].starts_with(':') {
            return Ok(flags);
        }
        let mut at = 2;
        for c in self.pattern[2..].chars() {
            match c {
                'i' => flags.ignore_case = true,
                'm' => flags.multiline = true,
                's' => flags.dot_all = true,
                ')' if at > 2 => {
                    self.pos = at + 1;
                    return Ok(flags);
                }
                _ => return Err(self.error(at, "unsupported inline flag group")),
            }
            at += 1;
        }
        Err(self.error(0, "unclosed group"))
    }

    fn parse_alternation(&mut self) -> Result<Ast, KernelError> {
        let mut branches = vec![self.parse_concat()?];
        while self.eat('|') {
            branches.push(self.parse_concat()?);
        }
        Ok(if branches.len() == 1 {
            branches.swap_remove(0)
        } else {
            Ast::Alternate(branches)
        })
    }

    fn parse_concat(&mut self) -> Result<Ast, KernelError> {
        let mut items: Vec<Ast> = Vec::new();
        let mut quantified = false;
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                '|' | ')' => break,
                '*' | '+' | '?' | '{' => {
                    let node = match items.pop() {
                        Some(node) if !quantified => node,
                        _ => return Err(self.error(start, "nothing to repeat")),
                    };
                    let (min, max) = self.parse_quantifier()?;
                    let greedy = !self.eat('?');
                    items.push(Ast::Repeat {
                        node: Box::new(node),
                        min,
                        max,
                        greedy,
                    });
                    quantified = true;
                }
                _ => {
                    items.push(self.parse_atom()?);
                    quantified = false;
                }
            }
        }
        Ok(match items.len() {
            0 => Ast::Empty,
            1 => items.swap_remove(0),
            _ => Ast::Concat(items),
        })
    }

    fn parse_quantifier(&mut self) -> Result<(u32, Option<u32>), KernelError> {
        let start = self.pos;
        match self.bump() {
            Some('*') => Ok((0, None)),
            Some('+') => Ok((1, None)),
            Some('?') => Ok((0, Some(1))),
            _ => {
                let min = self.parse_bound(start)?;
                let max = if self.eat(',') {
                    if self.peek() == Some('}') {
                        None
                    } else {
                        Some(self.parse_bound(start)?)
                    }
                } else {
                    Some(min)
                };
                if !self.eat('}') {
                    return Err(self.error(start, "invalid repetition bounds"));
                }
                if let Some(max) = max {
                    if min > max {
                        return Err(self.error(start, "invalid repetition bounds: min > max"));
                    }
                }
                Ok((min, max))
            }
        }
    }

    fn parse_bound(&mut self, start: usize) -> Result<u32, KernelError> {
        let digits_start = self.pos;
        let mut n: u32 = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            self.pos += 1;
            n = n
                .checked_mul(10)
                .and_then(|n| n.checked_add(d))
                .ok_or_else(|| self.error(start, "repetition bound overflows"))?;
        }
        if self.pos == digits_start {
            return Err(self.error(start, "invalid repetition bounds"));
        }
        if n > MAX_REPEAT {
            return Err(self.error(
                start,
                format!("repetition bound {} exceeds {}", n, MAX_REPEAT),
            ));
        }
        Ok(n)
    }

    fn parse_atom(&mut self) -> Result<Ast, KernelError> {
        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(Ast::Empty);
        };
        match c {
            '(' => self.parse_group(start),
            '[' => self.parse_class(start).map(Ast::Class),
            '.' => Ok(Ast::Any),
            '^' => Ok(Ast::Assert(Assertion::Caret)),
            '$' => Ok(Ast::Assert(Assertion::Dollar)),
            '\\' => {
                self.pos = start;
                Ok(match self.parse_escape(false)? {
                    Escape::Char(c) => Ast::Literal(c),
                    Escape::Class(set) => Ast::Class(set),
                    Escape::Assert(a) => Ast::Assert(a),
                })
            }
            c => Ok(Ast::Literal(c)),
        }
    }

    fn parse_group(&mut self, open: usize) -> Result<Ast, KernelError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(open, "groups nested too deeply"));
        }
        let index = if self.peek() == Some('?') {
            if self.peek_at(1) != Some(':') {
                return Err(self.error(open, "unsupported group syntax"));
            }
            self.pos += 2;
            None
        } else {
            self.groups += 1;
            if self.groups > MAX_CAPTURE_GROUPS {
                return Err(self.error(
                    open,
                    format!("more than {} capture groups", MAX_CAPTURE_GROUPS),
                ));
            }
            Some(self.groups)
        };
        self.depth += 1;
        let node = self.parse_alternation()?;
        self.depth -= 1;
        if !self.eat(')') {
            return Err(self.error(open, "unclosed group"));
        }
        Ok(Ast::Group {
            index,
            node: Box::new(node),
        })
    }

    fn parse_escape(&mut self, in_class: bool) -> Result<Escape, KernelError> {
        let start = self.pos;
        self.pos += 1;
        let Some(c) = self.bump() else {
            return Err(self.error(start, "dangling backslash"));
        };
        let perl = |ranges: Vec<(u32, u32)>, negated: bool| -> Result<Escape, KernelError> {
            Ok(Escape::Class(ClassSet::from_ranges(ranges, negated)))
        };
        match c {
            '\\' | '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^'
            | '$' | '/' | '-' => Ok(Escape::Char(c)),
            'n' => Ok(Escape::Char('\n')),
            't' => Ok(Escape::Char('\t')),
            'r' => Ok(Escape::Char('\r')),
            'f' => Ok(Escape::Char('\x0C')),
            'v' => Ok(Escape::Char('\x0B')),
            '0' => Ok(Escape::Char('\0')),
            'x' => {
                let hex = self.pattern.get(self.pos..self.pos + 2);
                let value = hex
                    .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
                    .and_then(|h| u32::from_str_radix(h, 16).ok())
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error(start, "invalid hex escape"))?;
                self.pos += 2;
                Ok(Escape::Char(value))
            }
            'd' => perl(ClassSet::digit(), false),
            'D' => perl(ClassSet::digit(), true),
            'w' => perl(ClassSet::word(), false),
            'W' => perl(ClassSet::word(), true),
            's' => perl(ClassSet::space(), false),
            'S' => perl(ClassSet::space(), true),
            'b' | 'B' | 'A' | 'z' if in_class => {
                Err(self.error(start, "assertion inside character class"))
            }
            'b' => Ok(Escape::Assert(Assertion::WordBoundary)),
            'B' => Ok(Escape::Assert(Assertion::NotWordBoundary)),
            'A' => Ok(Escape::Assert(Assertion::StartText)),
            'z' => Ok(Escape::Assert(Assertion::EndText)),
            _ => Err(self.error(start, format!("invalid escape \\{}", c))),
        }
    }

    fn parse_class_atom(&mut self) -> Result<ClassAtom, KernelError> {
        if self.peek() == Some('\\') {
            return match self.parse_escape(true)? {
                Escape::Char(c) => Ok(ClassAtom::Char(c)),
                Escape::Class(set) => Ok(ClassAtom::Set(set.positive_ranges())),
                Escape::Assert(_) => Err(self.error(self.pos, "assertion inside character class")),
            };
        }
        match self.bump() {
            Some(c) => Ok(ClassAtom::Char(c)),
            None => Err(self.error(self.pos, "unterminated character class")),
        }
    }

    fn parse_class(&mut self, open: usize) -> Result<ClassSet, KernelError> {
        let negated = self.eat('^');
        let mut ranges = Vec::new();
        let mut first = true;
        loop {
            match self.peek() {
                None => return Err(self.error(open, "unterminated character class")),
                Some(']') if !first => {
                    self.pos += 1;
                    break;
                }
                _ => {}
            }
            first = false;
            let item = self.pos;
            match self.parse_class_atom()? {
                ClassAtom::Set(set) => ranges.extend(set),
                ClassAtom::Char(lo) => {
                    let is_range = self.peek() == Some('-')
                        && !matches!(self.peek_at(1), Some(']') | None);
                    if !is_range {
                        ranges.push((lo as u32, lo as u32));
                        continue;
                    }
                    self.pos += 1;
                    let hi = match self.parse_class_atom()? {
                        ClassAtom::Char(hi) => hi,
                        ClassAtom::Set(_) => {
                            return Err(self.error(item, "invalid character class range"))
                        }
                    };
                    if hi < lo {
                        return Err(self.error(item, "reversed character class range"));
                    }
                    ranges.push((lo as u32, hi as u32));
                }
            }
        }
        Ok(ClassSet::from_ranges(ranges, negated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_reason(pattern: &str) -> (usize, String) {
        match parse(pattern) {
            Err(KernelError::MalformedPattern {
                position, reason, ..
            }) => (position, reason),
            other => panic!("expected error for {:?}, got {:?}", pattern, other),
        }
    }

    #[test]
    fn test_parse_concat_and_groups() {
        let p = parse("a(b|c)(?:d)").unwrap();
        assert_eq!(p.groups, 1);
        match p.ast {
            Ast::Concat(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0], Ast::Literal('a'));
                assert!(matches!(items[1], Ast::Group { index: Some(1), .. }));
                assert!(matches!(items[2], Ast::Group { index: None, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_quantifiers() {
        let p = parse("a{2,5}?").unwrap();
        assert_eq!(
            p.ast,
            Ast::Repeat {
                node: Box::new(Ast::Literal('a')),
                min: 2,
                max: Some(5),
                greedy: false,
            }
        );
        assert!(matches!(
            parse("b{3,}").unwrap().ast,
            Ast::Repeat { min: 3, max: None, .. }
        ));
    }

    #[test]
    fn test_parse_class_ranges_merge() {
        let p = parse("[a-cb-e\\d]").unwrap();
        assert_eq!(
            p.ast,
            Ast::Class(ClassSet {
                ranges: vec![('0' as u32, '9' as u32), ('a' as u32, 'e' as u32)],
                negated: false,
            })
        );
        let lit = parse("[]a-]").unwrap();
        match lit.ast {
            Ast::Class(set) => assert_eq!(set.ranges.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_negated_perl_class_in_brackets() {
        let p = parse("[\\D]").unwrap();
        match p.ast {
            Ast::Class(set) => {
                assert_eq!(set.ranges[0], (0, '0' as u32 - 1));
                assert_eq!(set.ranges[1], ('9' as u32 + 1, MAX_CODEPOINT));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_inline_flags() {
        let p = parse("(?is)a.").unwrap();
        assert!(p.inline_flags.ignore_case);
        assert!(p.inline_flags.dot_all);
        assert!(!p.inline_flags.multiline);
        assert!(parse("(?x)a").is_err());
    }

    #[test]
    fn test_escapes() {
        assert_eq!(parse("\\x41").unwrap().ast, Ast::Literal('A'));
        assert_eq!(parse("\\t").unwrap().ast, Ast::Literal('\t'));
        assert_eq!(
            parse("\\b").unwrap().ast,
            Ast::Assert(Assertion::WordBoundary)
        );
    }

    #[test]
    fn test_errors_carry_positions() {
        assert_eq!(err_reason("ab(c").0, 2);
        assert!(err_reason("ab(c").1.contains("unclosed"));
        assert!(err_reason("a)").1.contains("unbalanced"));
        assert!(err_reason("*a").1.contains("nothing to repeat"));
        assert!(err_reason("a**").1.contains("nothing to repeat"));
        assert!(err_reason("a|*").1.contains("nothing to repeat"));
        assert!(err_reason("a{3,2}").1.contains("min > max"));
        assert!(err_reason("a{99999999999}").1.contains("overflow"));
        assert!(err_reason("a{2000}").1.contains("exceeds"));
        assert!(err_reason("a{x}").1.contains("bounds"));
        assert!(err_reason("[z-a]").1.contains("reversed"));
        assert!(err_reason("[abc").1.contains("unterminated"));
        assert!(err_reason("\\q").1.contains("invalid escape"));
        assert!(err_reason("ab\\").1.contains("dangling"));
        assert_eq!(err_reason("ab\\").0, 2);
        assert!(err_reason("\\xZZ").1.contains("hex"));
        assert!(err_reason("(?<n>a)").1.contains("unsupported"));
    }

    #[test]
    fn test_nesting_cap() {
        let deep = format!("{}a{}", "(".repeat(300), ")".repeat(300));
        assert!(err_reason(&deep).1.contains("nested"));
    }
}
