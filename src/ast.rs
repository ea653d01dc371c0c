use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexNode {
    Literal(char),
    CharacterClass(ClassSet),
    AnyChar,
    Star(Box<RegexNode>),
    Plus(Box<RegexNode>),
    Optional(Box<RegexNode>),
    Group {
        node: Box<RegexNode>,
        /// 1-based, `None` for `(?:...)`.
        capture: Option<usize>,
    },
    Alternation(Vec<RegexNode>),
    Concat(Vec<RegexNode>),
    Backreference(usize),
}

/// Members of a bracket expression or escape shorthand.
///
/// Never empty: the parser rejects `[]` before a set is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSet {
    ranges: Vec<RangeInclusive<char>>,
    negated: bool,
}

impl ClassSet {
    pub fn new(ranges: Vec<RangeInclusive<char>>, negated: bool) -> Self {
        Self { ranges, negated }
    }

    /// `\d`
    pub fn digit() -> Self {
        Self::new(vec!['0'..='9'], false)
    }

    /// `\w`
    pub fn word() -> Self {
        Self::new(vec!['A'..='Z', 'a'..='z', '0'..='9', '_'..='_'], false)
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn ranges(&self) -> &[RangeInclusive<char>] {
        &self.ranges
    }

    pub fn matches(&self, c: char) -> bool {
        let member = self.ranges.iter().any(|r| r.contains(&c));
        member != self.negated
    }
}
