use std::ops::Range;

use log::{debug, trace};

use crate::ast::RegexNode;
use crate::error::{MatchError, ParseError};
use crate::matcher::{Budget, Matcher, Outcome};
use crate::parser::{ParsedPattern, Parser};

/// Compile-time options for a [`CompiledPattern`].
#[derive(Debug, Clone)]
pub struct PatternBuilder {
    pattern: String,
    backtrack_limit: Option<usize>,
}

impl PatternBuilder {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_owned(),
            backtrack_limit: None,
        }
    }

    /// Cap the number of resumed choice points per search. `None` means unlimited.
    pub fn backtrack_limit(mut self, limit: Option<usize>) -> Self {
        self.backtrack_limit = limit;
        self
    }

    pub fn build(self) -> Result<CompiledPattern, ParseError> {
        let parsed = Parser::new(&self.pattern).parse()?;
        debug!(
            "compiled {:?}: {} group(s), anchored_start={}, anchored_end={}",
            self.pattern, parsed.group_count, parsed.anchored_start, parsed.anchored_end
        );
        Ok(CompiledPattern {
            source: self.pattern,
            parsed,
            backtrack_limit: self.backtrack_limit,
        })
    }
}

/// A parsed pattern, ready to be run against any number of subjects.
///
/// The tree is never mutated after construction; every search owns its own
/// capture table, so one pattern can be shared freely.
///
/// ```
/// use regrep::CompiledPattern;
///
/// let re = CompiledPattern::new(r"(\d+)-\1").unwrap();
/// let m = re.find("id 42-42").unwrap();
/// assert_eq!(m.as_str(), "42-42");
/// assert_eq!(m.group(1), Some("42"));
/// ```
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    parsed: ParsedPattern,
    backtrack_limit: Option<usize>,
}

impl CompiledPattern {
    pub fn new(pattern: &str) -> Result<Self, ParseError> {
        PatternBuilder::new(pattern).build()
    }

    pub fn builder(pattern: &str) -> PatternBuilder {
        PatternBuilder::new(pattern)
    }

    /// The pattern text this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &RegexNode {
        &self.parsed.root
    }

    pub fn group_count(&self) -> usize {
        self.parsed.group_count
    }

    pub fn is_anchored_start(&self) -> bool {
        self.parsed.anchored_start
    }

    pub fn is_anchored_end(&self) -> bool {
        self.parsed.anchored_end
    }

    pub fn matches(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    /// Leftmost match, with the first successful backtracking branch deciding its extent.
    ///
    /// A search that runs out of backtrack budget is reported as no match;
    /// use [`CompiledPattern::try_find`] to tell the two apart.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        match self.try_find(text) {
            Ok(found) => found,
            Err(err) => {
                debug!("{:?} gave up on a {}-byte subject: {}", self.source, text.len(), err);
                None
            }
        }
    }

    pub fn try_find<'t>(&self, text: &'t str) -> Result<Option<Match<'t>>, MatchError> {
        let subject = Subject::new(text);
        let found = self.search(&subject, 0)?;
        Ok(found.map(|(start, outcome)| subject.to_match(start, &outcome)))
    }

    /// Successive non-overlapping matches, left to right.
    ///
    /// An empty match that begins where the previous match ended is skipped.
    pub fn find_iter<'p, 't>(&'p self, text: &'t str) -> FindIter<'p, 't> {
        FindIter {
            pattern: self,
            subject: Subject::new(text),
            next_start: 0,
            last_end: None,
        }
    }

    /// Try every permitted start offset from `from` (in characters) onwards.
    fn search(&self, subject: &Subject<'_>, from: usize) -> Result<Option<(usize, Outcome)>, MatchError> {
        let last = if self.parsed.anchored_start {
            0
        } else {
            subject.chars.len()
        };
        let mut budget = Budget::new(self.backtrack_limit);
        for start in from..=last {
            trace!("{:?}: attempt at offset {}", self.source, start);
            let mut matcher = Matcher::new(
                &self.parsed.root,
                &subject.chars,
                self.parsed.group_count,
                self.parsed.anchored_end,
                budget,
            );
            let outcome = matcher.match_at(start)?;
            budget = matcher.budget();
            if let Some(outcome) = outcome {
                trace!(
                    "{:?}: matched {}..{} after {} backtrack(s)",
                    self.source,
                    start,
                    outcome.end,
                    budget.used()
                );
                return Ok(Some((start, outcome)));
            }
        }
        Ok(None)
    }
}

/// The subject split into characters, with each character's byte offset.
#[derive(Debug)]
struct Subject<'t> {
    text: &'t str,
    chars: Vec<char>,
    offsets: Vec<usize>,
}

impl<'t> Subject<'t> {
    fn new(text: &'t str) -> Self {
        let (mut offsets, chars): (Vec<usize>, Vec<char>) = text.char_indices().unzip();
        offsets.push(text.len());
        Self {
            text,
            chars,
            offsets,
        }
    }

    fn byte_range(&self, start: usize, end: usize) -> Range<usize> {
        self.offsets[start]..self.offsets[end]
    }

    fn to_match(&self, start: usize, outcome: &Outcome) -> Match<'t> {
        let groups = outcome
            .captures
            .iter()
            .skip(1)
            .map(|span| span.map(|(s, e)| self.byte_range(s, e)))
            .collect();
        Match {
            text: self.text,
            range: self.byte_range(start, outcome.end),
            groups,
        }
    }
}

/// A single match: its span in the subject and the text each group captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'t> {
    text: &'t str,
    range: Range<usize>,
    groups: Vec<Option<Range<usize>>>,
}

impl<'t> Match<'t> {
    /// Byte offset of the first matched character.
    pub fn start(&self) -> usize {
        self.range.start
    }

    /// Byte offset just past the match.
    pub fn end(&self) -> usize {
        self.range.end
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn as_str(&self) -> &'t str {
        &self.text[self.range.clone()]
    }

    /// Group 0 is the whole match; `None` if the group took no part in it.
    pub fn group(&self, index: usize) -> Option<&'t str> {
        if index == 0 {
            return Some(self.as_str());
        }
        let range = self.groups.get(index - 1)?.clone()?;
        Some(&self.text[range])
    }

    /// Captured text for groups `1..=group_count`, in order.
    pub fn captures(&self) -> impl Iterator<Item = Option<&'t str>> + '_ {
        let text = self.text;
        self.groups
            .iter()
            .map(move |range| range.clone().map(|r| &text[r]))
    }
}

/// Iterator returned by [`CompiledPattern::find_iter`].
#[derive(Debug)]
pub struct FindIter<'p, 't> {
    pattern: &'p CompiledPattern,
    subject: Subject<'t>,
    next_start: usize,
    last_end: Option<usize>,
}

impl<'p, 't> Iterator for FindIter<'p, 't> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.next_start > self.subject.chars.len() {
                return None;
            }
            let found = match self.pattern.search(&self.subject, self.next_start) {
                Ok(found) => found,
                Err(err) => {
                    debug!("{:?}: stopping iteration: {}", self.pattern.source, err);
                    None
                }
            };
            let Some((start, outcome)) = found else {
                self.next_start = self.subject.chars.len() + 1;
                return None;
            };
            let empty = outcome.end == start;
            // An empty match must still move the scan forward.
            self.next_start = if empty { outcome.end + 1 } else { outcome.end };
            if empty && self.last_end == Some(start) {
                continue;
            }
            self.last_end = Some(outcome.end);
            return Some(self.subject.to_match(start, &outcome));
        }
    }
}
