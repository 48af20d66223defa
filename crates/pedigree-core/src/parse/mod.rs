//! Regex-driven parser for free-text family descriptions.
//!
//! The text is split into clauses (sentences, ignoring terminators inside parentheses). Each clause
//! is offered to the grammars of a [`GrammarRegistry`] in order; the first grammar that accepts a
//! clause commits its individuals and relationships, and clauses nobody accepts are reported as
//! [`UnresolvedSpan`]s.

mod children;
mod compact;
mod narrative;

use crate::model::{
    IndividualRecord, ParseResult, ParseSource, RelationshipKind, RelationshipRecord, Sex, Status,
    UnresolvedSpan,
};
use crate::{Error, Result};
use rustc_hash::FxHashMap;

pub use children::ChildItem;

/// A clause of the source text. `start` is the byte offset of `text` in the original input.
#[derive(Debug, Clone, Copy)]
pub struct Clause<'a> {
    pub start: usize,
    pub text: &'a str,
}

/// A grammar inspects one clause and, when it recognizes it, records what it found in the
/// context and returns `true`. A grammar that returns `false` has its context changes discarded.
pub type ClauseGrammar = fn(&Clause<'_>, &mut ParseContext) -> bool;

#[derive(Debug, Clone)]
pub struct GrammarRegistry {
    grammars: Vec<(&'static str, ClauseGrammar)>,
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        let mut reg = Self::new();
        reg.push("compact", compact::parse_compact_clause);
        reg.push("narrative", narrative::parse_narrative_clause);
        reg
    }
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self {
            grammars: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &'static str, grammar: ClauseGrammar) {
        self.grammars.push((name, grammar));
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.grammars.iter().map(|(name, _)| *name)
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}

/// Parses a family description with the default grammars (compact, then narrative).
pub fn parse(text: &str) -> Result<ParseResult> {
    parse_with_grammars(text, &GrammarRegistry::default())
}

pub fn parse_with_grammars(text: &str, grammars: &GrammarRegistry) -> Result<ParseResult> {
    if text.trim().is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut ctx = ParseContext::default();
    let mut unresolved = Vec::new();

    for clause in split_clauses(text) {
        let mut accepted = None;
        for (name, grammar) in &grammars.grammars {
            let mut trial = ctx.clone();
            if grammar(&clause, &mut trial) {
                ctx = trial;
                accepted = Some(*name);
                break;
            }
        }
        match accepted {
            Some(name) => tracing::debug!(grammar = name, clause = clause.text, "clause parsed"),
            None => {
                tracing::debug!(clause = clause.text, "clause left unresolved");
                unresolved.push(UnresolvedSpan {
                    start: clause.start,
                    end: clause.start + clause.text.len(),
                    text: clause.text.to_string(),
                });
            }
        }
    }

    Ok(ParseResult {
        source: ParseSource::Text,
        individuals: ctx.individuals,
        relationships: ctx.relationships,
        unresolved,
    })
}

/// Splits text at sentence terminators that are outside parentheses. A `.` only ends a clause
/// when followed by whitespace or the end of input, so `3.5` and `d.` inside a word survive.
pub fn split_clauses(text: &str) -> Vec<Clause<'_>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
                if at_boundary && !ends_with_title(&text[start..i]) {
                    push_clause(text, start, i, &mut out);
                    start = i + c.len_utf8();
                }
            }
            ';' | '!' | '?' | '\n' if depth == 0 => {
                push_clause(text, start, i, &mut out);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    push_clause(text, start, text.len(), &mut out);
    out
}

/// `Dr.`, `Mrs.` and similar abbreviations do not end a sentence.
fn ends_with_title(before: &str) -> bool {
    let word = before
        .rsplit(|c: char| !c.is_alphabetic())
        .next()
        .unwrap_or("");
    matches!(word, "Dr" | "Mr" | "Mrs" | "Ms" | "St" | "Jr" | "Sr" | "Prof")
}

fn push_clause<'a>(text: &'a str, from: usize, to: usize, out: &mut Vec<Clause<'a>>) {
    let raw = &text[from..to];
    let trimmed = raw.trim_start();
    let lead = raw.len() - trimmed.len();
    let trimmed = trimmed.trim_end();
    if !trimmed.is_empty() {
        out.push(Clause {
            start: from + lead,
            text: trimmed,
        });
    }
}

/// Attributes of a person as described at one mention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub age: Option<u32>,
    pub sex: Option<Sex>,
    pub status: Option<Status>,
    pub deceased: bool,
    pub conditions: Vec<String>,
}

impl Description {
    pub fn is_empty(&self) -> bool {
        self.age.is_none()
            && self.sex.is_none()
            && self.status.is_none()
            && !self.deceased
            && self.conditions.is_empty()
    }
}

/// Larger numbers in a compact token are years or counts, not ages.
const MAX_AGE: u32 = 130;

/// Parses the body of a compact token such as `40 M, carrier` or `62, F, affected, deceased`.
/// Returns `None` when no token in the body is recognized.
pub fn parse_compact_body(body: &str) -> Option<Description> {
    let mut desc = Description::default();
    let mut recognized = false;
    for raw in body.split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '/') {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }
        let lower = token.to_ascii_lowercase();
        let suffix = lower.trim_start_matches(|c: char| c.is_ascii_digit());
        let digits = &lower[..lower.len() - suffix.len()];
        if desc.age.is_none() && !digits.is_empty() && suffix.chars().all(|c| c.is_ascii_alphabetic())
        {
            let Some(age) = digits.parse::<u32>().ok().filter(|age| *age <= MAX_AGE) else {
                continue;
            };
            desc.age = Some(age);
            recognized = true;
            // `40M`, `40male`
            if desc.sex.is_none() {
                desc.sex = Sex::from_token(suffix);
            }
            continue;
        }
        if desc.sex.is_none() {
            if let Some(sex) = Sex::from_token(&lower) {
                desc.sex = Some(sex);
                recognized = true;
                continue;
            }
        }
        if let Some(status) = Status::from_token(&lower) {
            desc.status = Some(status);
            recognized = true;
            continue;
        }
        if matches!(lower.as_str(), "deceased" | "dead" | "died" | "d." | "d" | "†") {
            desc.deceased = true;
            recognized = true;
        }
    }
    recognized.then_some(desc)
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Capitalized words that start clauses or glue phrases but never name a person.
pub(crate) fn is_stopword(word: &str) -> bool {
    matches!(
        word,
        "The"
            | "They"
            | "Their"
            | "Them"
            | "He"
            | "She"
            | "His"
            | "Her"
            | "Him"
            | "We"
            | "Our"
            | "I"
            | "My"
            | "A"
            | "An"
            | "And"
            | "Both"
            | "Then"
            | "Also"
            | "Later"
            | "After"
            | "In"
            | "This"
            | "That"
            | "These"
            | "Children"
            | "Child"
            | "Sons"
            | "Daughters"
            | "Mr"
            | "Mrs"
            | "Ms"
            | "Dr"
    )
}

/// Mutable state threaded through the clauses of one parse request.
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    individuals: Vec<IndividualRecord>,
    relationships: Vec<RelationshipRecord>,
    /// Normalized name -> id of the most recent declaration.
    known: FxHashMap<String, String>,
    declarations: FxHashMap<String, usize>,
    /// Most recent narrative subject, target of `He`/`She`.
    subject: Option<String>,
    last_partnership: Option<(String, String)>,
    last_individual: Option<String>,
}

impl ParseContext {
    /// Records a new individual and returns its request-scoped id: the lowercase name, with a
    /// numeric suffix for repeated declarations of the same name.
    pub fn declare(&mut self, name: &str, desc: Description) -> String {
        let key = normalize_name(name);
        let n = self.declarations.entry(key.clone()).or_insert(0);
        *n += 1;
        let slug = key.replace(' ', "-");
        let id = if *n == 1 { slug } else { format!("{slug}-{n}") };

        let mut record = IndividualRecord::new(id.clone(), name.trim());
        apply_description(&mut record, desc);
        self.individuals.push(record);
        self.known.insert(key, id.clone());
        self.last_individual = Some(id.clone());
        id
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.known.get(&normalize_name(name)).map(String::as_str)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains_key(&normalize_name(name))
    }

    /// Resolves a bare mention to a declared individual, declaring an undescribed one if needed.
    pub fn mention(&mut self, name: &str) -> String {
        match self.resolve(name) {
            Some(id) => {
                let id = id.to_string();
                self.last_individual = Some(id.clone());
                id
            }
            None => self.declare(name, Description::default()),
        }
    }

    /// Mention with a description: a described mention is a fresh declaration (the builder merges
    /// compatible duplicates), an undescribed one resolves to the existing individual.
    pub fn mention_described(&mut self, name: &str, desc: Description) -> String {
        if desc.is_empty() {
            self.mention(name)
        } else {
            self.declare(name, desc)
        }
    }

    /// Adds information to an already declared individual (e.g. "He is affected").
    pub fn describe(&mut self, id: &str, desc: Description) -> bool {
        match self.individuals.iter_mut().rev().find(|r| r.id == id) {
            Some(record) => {
                apply_description(record, desc);
                true
            }
            None => false,
        }
    }

    pub fn partner(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        let exists = self.relationships.iter().any(|r| {
            r.kind == RelationshipKind::Partnership
                && r.members.len() == 2
                && ((r.members[0] == a && r.members[1] == b)
                    || (r.members[0] == b && r.members[1] == a))
        });
        if !exists {
            self.relationships
                .push(RelationshipRecord::partnership(a, b));
        }
        self.last_partnership = Some((a.to_string(), b.to_string()));
    }

    pub fn add_child(&mut self, child: &str, parents: &[String], stated_count: Option<u32>) {
        let mut rel = RelationshipRecord::parent_child(child, parents.to_vec());
        rel.stated_count = stated_count;
        self.relationships.push(rel);
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn set_subject(&mut self, id: &str) {
        self.subject = Some(id.to_string());
    }

    pub fn last_partnership(&self) -> Option<(&str, &str)> {
        self.last_partnership
            .as_ref()
            .map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub fn last_individual(&self) -> Option<&str> {
        self.last_individual.as_deref()
    }

    /// Parents for a children list whose clause names none: the nearest preceding partnership,
    /// otherwise the most recently mentioned individual.
    pub fn implied_parents(&self) -> Vec<String> {
        if let Some((a, b)) = self.last_partnership() {
            return vec![a.to_string(), b.to_string()];
        }
        self.last_individual()
            .map(|id| vec![id.to_string()])
            .unwrap_or_default()
    }

    /// Declares the items of a children list and links them to `parents`.
    pub fn add_children(
        &mut self,
        items: Vec<ChildItem>,
        parents: &[String],
        stated_count: Option<u32>,
    ) -> usize {
        let mut added = 0;
        for item in items {
            let child = self.mention_described(&item.name, item.description);
            if parents.iter().any(|p| p == &child) {
                tracing::warn!(child = %child, "child is also listed as its own parent; dropped");
                continue;
            }
            if !parents.is_empty() {
                self.add_child(&child, parents, stated_count);
            }
            added += 1;
        }
        if let Some(count) = stated_count {
            if count as usize != added {
                tracing::debug!(
                    stated = count,
                    named = added,
                    "stated child count differs from named children; using named list"
                );
            }
        }
        added
    }
}

fn apply_description(record: &mut IndividualRecord, desc: Description) {
    if let Some(age) = desc.age {
        record.age = Some(age);
    }
    if let Some(sex) = desc.sex {
        record.sex = sex;
    }
    if let Some(status) = desc.status {
        record.status = status;
    }
    record.deceased |= desc.deceased;
    for c in desc.conditions {
        if !record.conditions.contains(&c) {
            record.conditions.push(c);
        }
    }
}

/// Number words used in "have three children".
pub(crate) fn parse_count(word: &str) -> Option<u32> {
    let w = word.trim().to_ascii_lowercase();
    if let Ok(n) = w.parse::<u32>() {
        return Some(n);
    }
    let n = match w.as_str() {
        "a" | "an" | "one" | "single" | "only" => 1,
        "two" | "twin" | "twins" => 2,
        "three" | "triplet" | "triplets" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        _ => return None,
    };
    Some(n)
}
