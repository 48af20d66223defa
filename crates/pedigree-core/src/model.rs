use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Sex {
    /// Accepts `M`/`F`/`male`/`female` (case-insensitive) plus a few narrative synonyms.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "m" | "male" | "man" | "boy" => Some(Self::Male),
            "f" | "female" | "woman" | "girl" => Some(Self::Female),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Affected,
    Carrier,
    Unaffected,
    #[default]
    Unknown,
}

impl Status {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "affected" => Some(Self::Affected),
            "carrier" => Some(Self::Carrier),
            "unaffected" => Some(Self::Unaffected),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Affected => "affected",
            Self::Carrier => "carrier",
            Self::Unaffected => "unaffected",
            Self::Unknown => "unknown",
        }
    }
}

/// Which parser produced a [`ParseResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseSource {
    #[default]
    Text,
    Assistant,
}

/// One declared individual, as extracted from the description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub deceased: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

impl IndividualRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age: None,
            sex: Sex::Unknown,
            status: Status::Unknown,
            deceased: false,
            conditions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    Partnership,
    ParentChild,
}

/// A relationship statement in the interchange schema.
///
/// For partnerships `members` holds the two partners; for parent-child statements `members` holds
/// the children and `parents` holds one or two parent ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    /// Child count stated in the text ("have three children"); informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stated_count: Option<u32>,
}

impl RelationshipRecord {
    pub fn partnership(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            kind: RelationshipKind::Partnership,
            members: vec![a.into(), b.into()],
            parents: Vec::new(),
            stated_count: None,
        }
    }

    pub fn parent_child(child: impl Into<String>, parents: Vec<String>) -> Self {
        Self {
            kind: RelationshipKind::ParentChild,
            members: vec![child.into()],
            parents,
            stated_count: None,
        }
    }
}

/// A clause no grammar could interpret. Offsets are byte offsets into the parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseResult {
    #[serde(default)]
    pub source: ParseSource,
    pub individuals: Vec<IndividualRecord>,
    pub relationships: Vec<RelationshipRecord>,
    #[serde(default)]
    pub unresolved: Vec<UnresolvedSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub id: String,
    pub name: String,
    pub age: Option<u32>,
    pub sex: Sex,
    pub status: Status,
    pub deceased: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    /// Assigned by the graph builder.
    pub generation: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partnership {
    pub members: [String; 2],
}

impl Partnership {
    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m == id)
    }

    /// The other member, if `id` is part of this partnership.
    pub fn partner_of(&self, id: &str) -> Option<&str> {
        match (&self.members[0], &self.members[1]) {
            (a, b) if a == id => Some(b.as_str()),
            (a, b) if b == id => Some(a.as_str()),
            _ => None,
        }
    }

    pub fn same_pair(&self, a: &str, b: &str) -> bool {
        (self.members[0] == a && self.members[1] == b)
            || (self.members[0] == b && self.members[1] == a)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentChildEdge {
    pub child: String,
    pub parents: Vec<String>,
    /// Index into [`Pedigree::partnerships`] when both parents are known.
    pub partnership: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub index: u32,
    pub members: Vec<String>,
}

/// A validated family graph. Built once per request and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pedigree {
    pub individuals: IndexMap<String, Individual>,
    pub partnerships: Vec<Partnership>,
    pub edges: Vec<ParentChildEdge>,
    pub generations: Vec<Generation>,
}

impl Pedigree {
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn get(&self, id: &str) -> Option<&Individual> {
        self.individuals.get(id)
    }

    pub fn generation_of(&self, id: &str) -> Option<u32> {
        self.individuals.get(id).and_then(|i| i.generation)
    }

    pub fn edge_for_child(&self, child: &str) -> Option<&ParentChildEdge> {
        self.edges.iter().find(|e| e.child == child)
    }

    pub fn partners_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.partnerships.iter().filter_map(move |p| p.partner_of(id))
    }

    /// Looks up an individual by display name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&Individual> {
        let key = name.trim().to_lowercase();
        self.individuals
            .values()
            .find(|i| i.name.trim().to_lowercase() == key)
    }

    /// Checks the generation invariant: every child sits exactly one row below its shallowest
    /// parent. Returns the offending child ids.
    pub fn verify(&self) -> Vec<String> {
        let mut bad = Vec::new();
        for edge in &self.edges {
            let min_parent = edge
                .parents
                .iter()
                .filter_map(|p| self.generation_of(p))
                .min();
            match (min_parent, self.generation_of(&edge.child)) {
                (Some(p), Some(c)) if c == p + 1 => {}
                _ => bad.push(edge.child.clone()),
            }
        }
        bad
    }
}
