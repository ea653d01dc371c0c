use crate::ast::{ClassSet, RegexNode};
use crate::error::ParseError;

/// Output of a successful parse: the tree plus the whole-pattern flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPattern {
    pub root: RegexNode,
    pub anchored_start: bool,
    pub anchored_end: bool,
    pub group_count: usize,
}

/// Parser for regular expressions.
///
/// The `Parser` struct holds the pattern and the current position.
/// It also manages group IDs for capturing groups and remembers which
/// groups have been closed, so backreferences can be checked on the spot.
pub struct Parser<'a> {
    pattern: &'a str,
    pos: usize,
    next_group_id: usize,
    closed_groups: Vec<usize>,
}

enum ClassAtom {
    Char(char),
    Set(ClassSet),
    End,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given pattern.
    pub fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            pos: 0,
            next_group_id: 1,
            closed_groups: Vec::new(),
        }
    }

    /// Allocate a new group ID for capturing groups.
    fn alloc_group_id(&mut self) -> usize {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    /// Peek at the next character in the pattern without advancing.
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn rest(&self) -> &'a str {
        let pattern: &'a str = self.pattern;
        &pattern[self.pos..]
    }

    /// Advance the parser by one character and return it.
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Expect a specific character and advance if it matches.
    fn expect(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Entry point for parsing a regex pattern.
    ///
    /// Strips the anchors first, then calls `parse_alt` on what is left.
    ///
    /// Example:
    /// - Pattern: `^a|b$` → anchored at both ends, root `Alt([Concat([a]), Concat([b])])`
    pub fn parse(mut self) -> Result<ParsedPattern, ParseError> {
        let mut body = self.pattern;
        let anchored_start = match body.strip_prefix('^') {
            Some(stripped) => {
                body = stripped;
                true
            }
            None => false,
        };
        let anchored_end = ends_with_anchor(body);
        if anchored_end {
            body = &body[..body.len() - 1];
        }
        self.pattern = body;
        self.pos = 0;

        let root = self.parse_alt()?;
        if self.peek() == Some(')') {
            return Err(ParseError::UnmatchedCloseParen);
        }

        Ok(ParsedPattern {
            root,
            anchored_start,
            anchored_end,
            group_count: self.next_group_id - 1,
        })
    }

    /// Parse alternation (`|`) in the pattern.
    ///
    /// Example:
    /// - Pattern: `a|b|c` → Alt([Concat([a]), Concat([b]), Concat([c])])
    /// - Pattern: `abc`   → Concat([a, b, c])
    fn parse_alt(&mut self) -> Result<RegexNode, ParseError> {
        let mut branches = vec![self.parse_seq()?];
        while self.expect('|') {
            branches.push(self.parse_seq()?);
        }
        if branches.len() == 1 {
            Ok(branches.remove(0))
        } else {
            Ok(RegexNode::Alternation(branches))
        }
    }

    /// Parse a sequence of terms (concatenation).
    ///
    /// Example:
    /// - Pattern: `a(b|c)d` → Concat([a, Group, d])
    fn parse_seq(&mut self) -> Result<RegexNode, ParseError> {
        let mut nodes = Vec::new();
        while let Some(ch) = self.peek() {
            if ch == ')' || ch == '|' {
                break;
            }
            nodes.push(self.parse_repeat()?);
        }
        Ok(RegexNode::Concat(nodes))
    }

    /// Parse a factor and the quantifier (`*`, `+`, `?`) that may follow it.
    ///
    /// The quantifier binds to the factor alone, so `ab*` is `a` then `Star(b)`.
    fn parse_repeat(&mut self) -> Result<RegexNode, ParseError> {
        if self.peek().is_some_and(is_quantifier) {
            return Err(ParseError::DanglingQuantifier);
        }
        let atom = self.parse_atom()?;
        let node = match self.peek() {
            Some('*') => RegexNode::Star(Box::new(atom)),
            Some('+') => RegexNode::Plus(Box::new(atom)),
            Some('?') => RegexNode::Optional(Box::new(atom)),
            _ => return Ok(atom),
        };
        self.advance();
        if self.peek().is_some_and(is_quantifier) {
            return Err(ParseError::DanglingQuantifier);
        }
        Ok(node)
    }

    /// Parse a single factor: group, char class, escape, dot, or literal.
    ///
    /// Examples:
    /// - Pattern: `(abc)`   → Group { capture: Some(1), node: Concat([a, b, c]) }
    /// - Pattern: `(?:abc)` → Group { capture: None, .. }
    /// - Pattern: `[abc]`   → CharacterClass
    /// - Pattern: `\1`      → Backreference(1)
    /// - Pattern: `.`       → AnyChar
    fn parse_atom(&mut self) -> Result<RegexNode, ParseError> {
        match self.advance() {
            Some('(') => {
                let capture = if self.rest().starts_with("?:") {
                    self.pos += 2;
                    None
                } else {
                    Some(self.alloc_group_id())
                };
                let node = self.parse_alt()?;
                if !self.expect(')') {
                    return Err(ParseError::UnterminatedGroup);
                }
                if let Some(id) = capture {
                    self.closed_groups.push(id);
                }
                Ok(RegexNode::Group {
                    node: Box::new(node),
                    capture,
                })
            }
            Some('[') => self.parse_char_class(),
            Some('\\') => self.parse_escape(),
            Some('.') => Ok(RegexNode::AnyChar),
            Some(c) => Ok(RegexNode::Literal(c)),
            None => Ok(RegexNode::Concat(Vec::new())),
        }
    }

    /// Parse the character after a backslash outside of a class.
    ///
    /// - `\d`, `\w` → CharacterClass
    /// - `\t`, `\n`, `\\` → Literal
    /// - `\1`..`\9` → Backreference, only if that group is already closed
    fn parse_escape(&mut self) -> Result<RegexNode, ParseError> {
        match self.advance() {
            Some('d') => Ok(RegexNode::CharacterClass(ClassSet::digit())),
            Some('w') => Ok(RegexNode::CharacterClass(ClassSet::word())),
            Some('t') => Ok(RegexNode::Literal('\t')),
            Some('n') => Ok(RegexNode::Literal('\n')),
            Some('\\') => Ok(RegexNode::Literal('\\')),
            Some(c @ '1'..='9') => {
                let id = (c as u8 - b'0') as usize;
                if self.closed_groups.contains(&id) {
                    Ok(RegexNode::Backreference(id))
                } else {
                    Err(ParseError::UnresolvedBackreference(id))
                }
            }
            Some(c) => Err(ParseError::InvalidEscape(c)),
            None => Err(ParseError::DanglingEscape),
        }
    }

    /// Parse a character class, e.g. `[abc]`, `[^abc]` or `[a-z_]`.
    ///
    /// A `-` is a range operator only between two plain members; at either
    /// edge of the class, or right after a range, it is literal.
    fn parse_char_class(&mut self) -> Result<RegexNode, ParseError> {
        let negated = self.expect('^');
        let mut ranges = Vec::new();
        loop {
            let lo = match self.class_atom()? {
                ClassAtom::End => break,
                ClassAtom::Set(set) => {
                    ranges.extend_from_slice(set.ranges());
                    continue;
                }
                ClassAtom::Char(c) => c,
            };
            let rest = self.rest();
            if !rest.starts_with('-') || rest.starts_with("-]") || rest.len() == 1 {
                ranges.push(lo..=lo);
                continue;
            }
            self.advance();
            match self.class_atom()? {
                ClassAtom::Char(hi) if hi < lo => {
                    return Err(ParseError::InvalidClassRange(lo, hi));
                }
                ClassAtom::Char(hi) => ranges.push(lo..=hi),
                ClassAtom::Set(set) => {
                    ranges.push(lo..=lo);
                    ranges.push('-'..='-');
                    ranges.extend_from_slice(set.ranges());
                }
                ClassAtom::End => {
                    ranges.push(lo..=lo);
                    ranges.push('-'..='-');
                    break;
                }
            }
        }
        if ranges.is_empty() {
            return Err(ParseError::EmptyCharacterClass);
        }
        Ok(RegexNode::CharacterClass(ClassSet::new(ranges, negated)))
    }

    fn class_atom(&mut self) -> Result<ClassAtom, ParseError> {
        match self.advance() {
            None => Err(ParseError::UnterminatedCharacterClass),
            Some(']') => Ok(ClassAtom::End),
            Some('\\') => match self.advance() {
                None => Err(ParseError::UnterminatedCharacterClass),
                Some('d') => Ok(ClassAtom::Set(ClassSet::digit())),
                Some('w') => Ok(ClassAtom::Set(ClassSet::word())),
                Some('t') => Ok(ClassAtom::Char('\t')),
                Some('n') => Ok(ClassAtom::Char('\n')),
                Some(c @ ('\\' | ']' | '[' | '-' | '^')) => Ok(ClassAtom::Char(c)),
                Some(c) => Err(ParseError::InvalidEscape(c)),
            },
            Some(c) => Ok(ClassAtom::Char(c)),
        }
    }
}

fn is_quantifier(c: char) -> bool {
    matches!(c, '*' | '+' | '?')
}

/// True when the final `$` is not itself escaped by an odd run of backslashes.
fn ends_with_anchor(body: &str) -> bool {
    let Some(head) = body.strip_suffix('$') else {
        return false;
    };
    let backslashes = head.chars().rev().take_while(|&c| c == '\\').count();
    backslashes % 2 == 0
}
