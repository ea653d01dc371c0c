use crate::ast::RegexNode;
use crate::error::MatchError;

/// Capture spans in character offsets, indexed by group number. Slot 0 is unused.
pub type CaptureSpans = Vec<Option<(usize, usize)>>;

/// A successful match attempt from a fixed start offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub end: usize,
    pub captures: CaptureSpans,
}

#[derive(Debug, Clone, Copy)]
enum Task<'r> {
    Node(&'r RegexNode),
    /// Decide whether `node` runs again; the previous iteration started at `entered_at`.
    Repeat {
        node: &'r RegexNode,
        entered_at: usize,
    },
    CloseGroup {
        index: usize,
        start: usize,
    },
}

/// One line of the search: where it stands, what is left to match, and what it captured.
#[derive(Debug, Clone)]
struct Thread<'r> {
    pos: usize,
    tasks: Vec<Task<'r>>,
    captures: CaptureSpans,
}

/// Counts resumed choice points across every start offset of one search.
#[derive(Debug, Clone, Copy, Default)]
pub struct Budget {
    limit: Option<usize>,
    used: usize,
}

impl Budget {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit, used: 0 }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    fn spend(&mut self) -> Result<(), MatchError> {
        self.used += 1;
        match self.limit {
            Some(limit) if self.used > limit => Err(MatchError::BacktrackLimitExceeded(limit)),
            _ => Ok(()),
        }
    }
}

/// Backtracking executor for a parsed tree over a slice of characters.
///
/// Pending nodes live on an explicit stack instead of the call stack, and
/// every decision point (alternative, extra repetition, optional) pushes a
/// snapshot of the thread. Failure resumes the most recent snapshot, which
/// yields greedy quantifiers and first-alternative-wins ordering and drops
/// any captures recorded by the abandoned branch.
pub struct Matcher<'r, 't> {
    root: &'r RegexNode,
    input: &'t [char],
    group_count: usize,
    anchored_end: bool,
    budget: Budget,
}

impl<'r, 't> Matcher<'r, 't> {
    pub fn new(
        root: &'r RegexNode,
        input: &'t [char],
        group_count: usize,
        anchored_end: bool,
        budget: Budget,
    ) -> Self {
        Self {
            root,
            input,
            group_count,
            anchored_end,
            budget,
        }
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Try to match the whole tree starting exactly at `start`.
    pub fn match_at(&mut self, start: usize) -> Result<Option<Outcome>, MatchError> {
        let mut choices: Vec<Thread<'r>> = Vec::new();
        let mut thread = Thread {
            pos: start,
            tasks: vec![Task::Node(self.root)],
            captures: vec![None; self.group_count + 1],
        };

        loop {
            let advanced = match thread.tasks.pop() {
                None if !self.anchored_end || thread.pos == self.input.len() => {
                    return Ok(Some(Outcome {
                        end: thread.pos,
                        captures: thread.captures,
                    }));
                }
                None => false,
                Some(task) => self.run(task, &mut thread, &mut choices),
            };
            if advanced {
                continue;
            }
            match choices.pop() {
                Some(next) => {
                    self.budget.spend()?;
                    thread = next;
                }
                None => return Ok(None),
            }
        }
    }

    /// Execute one task; `false` means the thread failed.
    fn run(&self, task: Task<'r>, thread: &mut Thread<'r>, choices: &mut Vec<Thread<'r>>) -> bool {
        match task {
            Task::Node(node) => self.run_node(node, thread, choices),
            Task::Repeat { node, entered_at } => {
                // An iteration that consumed nothing would loop forever.
                if thread.pos == entered_at {
                    return true;
                }
                choices.push(thread.clone());
                thread.tasks.push(Task::Repeat {
                    node,
                    entered_at: thread.pos,
                });
                thread.tasks.push(Task::Node(node));
                true
            }
            Task::CloseGroup { index, start } => {
                thread.captures[index] = Some((start, thread.pos));
                true
            }
        }
    }

    fn run_node(
        &self,
        node: &'r RegexNode,
        thread: &mut Thread<'r>,
        choices: &mut Vec<Thread<'r>>,
    ) -> bool {
        match node {
            RegexNode::Literal(c) => self.consume(thread, |x| x == *c),
            RegexNode::CharacterClass(set) => self.consume(thread, |x| set.matches(x)),
            RegexNode::AnyChar => self.consume(thread, |_| true),
            RegexNode::Concat(items) => {
                thread.tasks.extend(items.iter().rev().map(Task::Node));
                true
            }
            RegexNode::Alternation(alts) => {
                for alt in alts.iter().skip(1).rev() {
                    let mut other = thread.clone();
                    other.tasks.push(Task::Node(alt));
                    choices.push(other);
                }
                if let Some(first) = alts.first() {
                    thread.tasks.push(Task::Node(first));
                }
                true
            }
            RegexNode::Star(sub) => {
                choices.push(thread.clone());
                self.enter_loop(sub, thread);
                true
            }
            RegexNode::Plus(sub) => {
                self.enter_loop(sub, thread);
                true
            }
            RegexNode::Optional(sub) => {
                choices.push(thread.clone());
                thread.tasks.push(Task::Node(sub));
                true
            }
            RegexNode::Group { node, capture } => {
                if let Some(index) = *capture {
                    thread.tasks.push(Task::CloseGroup {
                        index,
                        start: thread.pos,
                    });
                }
                thread.tasks.push(Task::Node(node));
                true
            }
            RegexNode::Backreference(index) => {
                let Some((start, end)) = thread.captures.get(*index).copied().flatten() else {
                    return false;
                };
                let upto = thread.pos + (end - start);
                if upto > self.input.len() || self.input[start..end] != self.input[thread.pos..upto] {
                    return false;
                }
                thread.pos = upto;
                true
            }
        }
    }

    fn enter_loop(&self, sub: &'r RegexNode, thread: &mut Thread<'r>) {
        thread.tasks.push(Task::Repeat {
            node: sub,
            entered_at: thread.pos,
        });
        thread.tasks.push(Task::Node(sub));
    }

    fn consume(&self, thread: &mut Thread<'r>, accept: impl Fn(char) -> bool) -> bool {
        match self.input.get(thread.pos) {
            Some(&c) if accept(c) => {
                thread.pos += 1;
                true
            }
            _ => false,
        }
    }
}
