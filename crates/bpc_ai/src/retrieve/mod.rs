use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use time::format_description;
use time::Date;

use bpc_core::domain::EvidenceSnippet;
use bpc_core::error::AppError;
use bpc_core::grounding::significant_terms;

/// Retrieval collaborator. Returns ranked policy passages for one question;
/// the gate treats the result as opaque evidence.
pub trait Retriever {
    fn search(
        &self,
        question: &str,
        jurisdiction: &str,
        reference_date: Date,
    ) -> Result<Vec<EvidenceSnippet>, AppError>;
}

const POOL_K: usize = 10;
const TOP_K: usize = 4;

/// Immutable in-memory snapshot of the policy knowledge base.
///
/// The snapshot id is a digest over every document's id and text, so two
/// processes serving the same corpus report the same tag.
#[derive(Debug, Clone)]
pub struct SnapshotIndex {
    docs: Vec<IndexedDoc>,
    snapshot_id: String,
}

#[derive(Debug, Clone)]
struct IndexedDoc {
    snippet: EvidenceSnippet,
    effective_from: Date,
    effective_to: Date,
    terms: BTreeSet<String>,
}

impl SnapshotIndex {
    /// Build the snapshot. Fails closed on malformed documents (empty ids,
    /// duplicate ids, unparseable effective dates); a partially indexed
    /// corpus is never served.
    pub fn build(docs: Vec<EvidenceSnippet>) -> Result<Self, AppError> {
        let mut indexed: Vec<IndexedDoc> = Vec::with_capacity(docs.len());
        for doc in docs.into_iter() {
            if doc.doc_id.trim().is_empty() {
                return Err(AppError::new(
                    "KB_SNAPSHOT_DOC_INVALID",
                    "Snapshot document id must be non-empty",
                )
                .with_details(doc.title.clone()));
            }
            if indexed.iter().any(|d| d.snippet.doc_id == doc.doc_id) {
                return Err(AppError::new(
                    "KB_SNAPSHOT_DOC_DUPLICATE",
                    "Snapshot document ids must be unique",
                )
                .with_details(doc.doc_id.clone()));
            }
            let effective_from = parse_date("effective_from", &doc.doc_id, &doc.effective_from)?;
            let effective_to = parse_date("effective_to", &doc.doc_id, &doc.effective_to)?;
            let terms = tokenize_all(&doc.text);
            indexed.push(IndexedDoc {
                snippet: doc,
                effective_from,
                effective_to,
                terms,
            });
        }

        let mut ids: Vec<(String, String)> = indexed
            .iter()
            .map(|d| {
                let text_digest = hex::encode(Sha256::digest(d.snippet.text.as_bytes()));
                (d.snippet.doc_id.clone(), text_digest)
            })
            .collect();
        ids.sort();
        let mut hasher = Sha256::new();
        for (doc_id, text_digest) in ids.iter() {
            hasher.update(doc_id.as_bytes());
            hasher.update(b"\n");
            hasher.update(text_digest.as_bytes());
            hasher.update(b"\n");
        }
        let snapshot_id = hex::encode(hasher.finalize());

        Ok(Self {
            docs: indexed,
            snapshot_id,
        })
    }

    pub fn snapshot_id(&self) -> &str {
        &self.snapshot_id
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl Retriever for SnapshotIndex {
    /// Lexical search: score every document by overlap with the question's
    /// significant terms, keep a pool of the best `POOL_K`, narrow it to the
    /// requested jurisdiction and effective-date window, and fall back to
    /// the unfiltered pool when the filter empties it. Deterministic: ties
    /// break on doc_id.
    fn search(
        &self,
        question: &str,
        jurisdiction: &str,
        reference_date: Date,
    ) -> Result<Vec<EvidenceSnippet>, AppError> {
        let q = question.trim();
        if q.is_empty() {
            return Err(AppError::new(
                "RETRIEVAL_QUERY_EMPTY",
                "Question must not be empty",
            ));
        }
        let terms = significant_terms(q);

        let mut pool: Vec<(&IndexedDoc, usize)> = self
            .docs
            .iter()
            .map(|d| {
                let hits = terms.iter().filter(|t| d.terms.contains(*t)).count();
                (d, hits)
            })
            .filter(|(_, hits)| *hits > 0)
            .collect();
        pool.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| a.0.snippet.doc_id.cmp(&b.0.snippet.doc_id))
        });
        pool.truncate(POOL_K);

        let filtered: Vec<&(&IndexedDoc, usize)> = pool
            .iter()
            .filter(|(d, _)| {
                d.snippet.jurisdiction == jurisdiction
                    && d.effective_from <= reference_date
                    && reference_date <= d.effective_to
            })
            .collect();

        let chosen: Vec<&IndexedDoc> = if filtered.is_empty() {
            pool.iter().map(|(d, _)| *d).collect()
        } else {
            filtered.into_iter().map(|(d, _)| *d).collect()
        };

        Ok(chosen
            .into_iter()
            .take(TOP_K)
            .map(|d| d.snippet.clone())
            .collect())
    }
}

fn parse_date(field: &str, doc_id: &str, value: &str) -> Result<Date, AppError> {
    let fmt = format_description::parse("[year]-[month]-[day]").map_err(|e| {
        AppError::new("KB_SNAPSHOT_DOC_INVALID", "Internal date format invalid")
            .with_details(e.to_string())
    })?;
    Date::parse(value, &fmt).map_err(|e| {
        AppError::new(
            "KB_SNAPSHOT_DOC_INVALID",
            "Snapshot document effective date failed to parse",
        )
        .with_details(format!("doc_id={doc_id}; {field}={value}; err={e}"))
    })
}

/// Every token, not only significant ones: a question term like "fees" must
/// be able to hit a document that mentions it once.
fn tokenize_all(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
