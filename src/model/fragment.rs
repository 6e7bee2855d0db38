//! Graph fragments — the unit of ingestion
//!
//! A fragment is a self-contained set of statements describing one or more
//! entities, decoded from an inbound payload. It carries a primary subject,
//! the statements themselves, and the namespace table of the payload.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Well-known vocabulary terms used by validators and transformers.
pub mod vocab {
    /// The type predicate every subject is expected to carry.
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

/// A resource identifier in subject, predicate, object or graph position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Iri(String);

impl Iri {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into (namespace, local name) at the last `#`, `/` or `:`.
    ///
    /// The separator stays with the namespace, so the parts concatenate back
    /// to the full identifier.
    pub fn split(&self) -> (&str, &str) {
        match self.0.rfind(['#', '/', ':']) {
            Some(pos) => self.0.split_at(pos + 1),
            None => ("", self.0.as_str()),
        }
    }

    /// True if this identifier lives under the given namespace.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        !namespace.is_empty() && self.0.starts_with(namespace)
    }
}

impl std::fmt::Display for Iri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The object position of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectTerm {
    /// A reference to another resource
    Iri(Iri),
    /// A literal value with an optional language tag
    Literal {
        value: String,
        language: Option<String>,
    },
}

impl ObjectTerm {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            language: None,
        }
    }

    pub fn literal_with_language(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            language: Some(language.into()),
        }
    }

    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri(Iri::new(value))
    }
}

/// One statement: subject, predicate, object, optional named graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Iri,
    pub predicate: Iri,
    pub object: ObjectTerm,
    pub graph: Option<Iri>,
}

impl Statement {
    pub fn new(subject: Iri, predicate: Iri, object: ObjectTerm) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: None,
        }
    }

    pub fn with_graph(mut self, graph: Iri) -> Self {
        self.graph = Some(graph);
        self
    }

    /// True if this statement declares a type for its subject.
    pub fn is_type_statement(&self) -> bool {
        self.predicate.as_str() == vocab::TYPE
    }
}

/// A self-contained graph of statements describing one or more entities.
///
/// Fragments are values: pipeline validators inspect them without mutation,
/// transformers produce new fragments. Terminal state is "stored" (written
/// into a repository handle) or "rejected" (validation failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFragment {
    subject: Iri,
    statements: Vec<Statement>,
    namespaces: HashMap<String, String>,
}

impl GraphFragment {
    pub fn new(subject: Iri) -> Self {
        Self {
            subject,
            statements: Vec::new(),
            namespaces: HashMap::new(),
        }
    }

    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn with_namespace(
        mut self,
        prefix: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        self.namespaces.insert(prefix.into(), namespace.into());
        self
    }

    /// Rebuild a fragment from raw parts, e.g. when reading an entity back
    /// out of storage.
    pub fn from_statements(subject: Iri, statements: Vec<Statement>) -> Self {
        Self {
            subject,
            statements,
            namespaces: HashMap::new(),
        }
    }

    pub fn subject(&self) -> &Iri {
        &self.subject
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn namespaces(&self) -> &HashMap<String, String> {
        &self.namespaces
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// All distinct subjects appearing in statement subject position.
    pub fn subjects(&self) -> BTreeSet<&Iri> {
        self.statements.iter().map(|s| &s.subject).collect()
    }

    /// True if any statement declares a type for the given subject.
    pub fn has_type(&self, subject: &Iri) -> bool {
        self.statements
            .iter()
            .any(|s| &s.subject == subject && s.is_type_statement())
    }

    /// Produce a new fragment with subjects rewritten per the given mapping.
    ///
    /// Object-position references to a rewritten subject follow along, so
    /// links inside the fragment stay intact.
    pub fn rewrite_subjects(&self, mapping: &HashMap<Iri, Iri>) -> Self {
        if mapping.is_empty() {
            return self.clone();
        }

        let rewrite = |iri: &Iri| mapping.get(iri).cloned().unwrap_or_else(|| iri.clone());

        let statements = self
            .statements
            .iter()
            .map(|s| Statement {
                subject: rewrite(&s.subject),
                predicate: s.predicate.clone(),
                object: match &s.object {
                    ObjectTerm::Iri(iri) => ObjectTerm::Iri(rewrite(iri)),
                    literal => literal.clone(),
                },
                graph: s.graph.clone(),
            })
            .collect();

        Self {
            subject: rewrite(&self.subject),
            statements,
            namespaces: self.namespaces.clone(),
        }
    }
}
