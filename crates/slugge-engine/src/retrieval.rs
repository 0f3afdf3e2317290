//! Naive retrieval: case-insensitive substring match over document text.

use tracing::instrument;

use slugge_core::ids::ProjectId;
use slugge_store::documents::{DocumentRepo, DocumentRow};
use slugge_store::Database;

use crate::error::EngineError;

/// Upper bound on hits returned for a single query.
pub const MAX_HITS: usize = 5;

/// File names of the project's documents whose text contains `query`,
/// in insertion order, at most `limit` of them.
///
/// Unknown projects have no documents and yield no hits.
#[instrument(skip(db, query), fields(project_id = %project_id, query_len = query.len()))]
pub fn retrieve(
    db: &Database,
    project_id: &ProjectId,
    query: &str,
    limit: usize,
) -> Result<Vec<String>, EngineError> {
    let docs = DocumentRepo::new(db.clone()).list_for_project(project_id)?;
    Ok(match_documents(&docs, query, limit))
}

/// Matching step, separated from storage.
pub fn match_documents(docs: &[DocumentRow], query: &str, limit: usize) -> Vec<String> {
    let needle = query.to_lowercase();
    docs.iter()
        .filter(|doc| {
            doc.content
                .as_deref()
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        })
        .map(|doc| doc.file_name.clone())
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use slugge_store::projects::{NewProject, ProjectRepo};

    fn setup(slug: &str) -> (Database, ProjectId) {
        let db = Database::in_memory().unwrap();
        let project = ProjectRepo::new(db.clone())
            .create(NewProject {
                name: slug.into(),
                slug: Some(slug.into()),
                ..Default::default()
            })
            .unwrap();
        (db, project.id)
    }

    #[test]
    fn matches_case_insensitively() {
        let (db, pid) = setup("p1");
        let docs = DocumentRepo::new(db.clone());
        docs.create(&pid, "a.txt", b"Alpha notes").unwrap();
        docs.create(&pid, "b.txt", b"beta").unwrap();

        assert_eq!(retrieve(&db, &pid, "ALPHA", MAX_HITS).unwrap(), vec!["a.txt"]);
        assert_eq!(retrieve(&db, &pid, "beta", MAX_HITS).unwrap(), vec!["b.txt"]);
        assert!(retrieve(&db, &pid, "gamma", MAX_HITS).unwrap().is_empty());
    }

    #[test]
    fn caps_hits_in_insertion_order() {
        let (db, pid) = setup("p2");
        let docs = DocumentRepo::new(db.clone());
        for i in 0..7 {
            docs.create(&pid, &format!("doc{i}.txt"), b"shared term").unwrap();
        }

        let hits = retrieve(&db, &pid, "term", MAX_HITS).unwrap();
        assert_eq!(
            hits,
            vec!["doc0.txt", "doc1.txt", "doc2.txt", "doc3.txt", "doc4.txt"]
        );
    }

    #[test]
    fn skips_documents_without_text() {
        let (db, pid) = setup("p3");
        let docs = DocumentRepo::new(db.clone());
        docs.create(&pid, "blob.bin", &[0xff, 0xfe]).unwrap();
        docs.create(&pid, "text.txt", b"anything").unwrap();

        // An empty query matches every text document but never a binary one.
        assert_eq!(retrieve(&db, &pid, "", MAX_HITS).unwrap(), vec!["text.txt"]);
    }

    #[test]
    fn unknown_project_has_no_hits() {
        let (db, _) = setup("p4");
        let hits = retrieve(&db, &ProjectId::from_raw("ghost"), "x", MAX_HITS).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn scoped_to_project() {
        let db = Database::in_memory().unwrap();
        let repo = ProjectRepo::new(db.clone());
        let a = repo
            .create(NewProject { name: "A".into(), slug: Some("a".into()), ..Default::default() })
            .unwrap();
        let b = repo
            .create(NewProject { name: "B".into(), slug: Some("b".into()), ..Default::default() })
            .unwrap();
        DocumentRepo::new(db.clone()).create(&b.id, "other.txt", b"alpha").unwrap();

        assert!(retrieve(&db, &a.id, "alpha", MAX_HITS).unwrap().is_empty());
    }
}
