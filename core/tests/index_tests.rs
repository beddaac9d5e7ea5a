use termassoc_core::persist::{load_corpus, save_corpus};
use termassoc_core::InvertedIndex;
use tempfile::tempdir;

const DOCS: [&str; 5] = ["a b c", "a d e", "a c d e f", "b d e f", "a e f"];

fn sample_index() -> InvertedIndex {
    let mut idx = InvertedIndex::new();
    for doc in DOCS {
        idx.add_document(doc.split_whitespace()).unwrap();
    }
    idx
}

#[test]
fn counts_match_the_sample_corpus() {
    let idx = sample_index();
    assert_eq!(idx.get_num_docs(), 5);
    assert_eq!(idx.word_appear("a"), 4);
    assert_eq!(idx.word_appear("e"), 4);
    assert_eq!(idx.word_appear("d"), 3);
    assert_eq!(idx.word_appear("b"), 2);
    assert_eq!(idx.concurrence("a", "e"), 3);
    assert_eq!(idx.concurrence("d", "e"), 3);
    assert_eq!(idx.concurrence("b", "e"), 1);
    assert_eq!(idx.concurrence("a", "a"), 4);
    assert_eq!(idx.get_terms(), vec!["a", "b", "c", "d", "e", "f"]);
}

#[test]
fn concurrence_is_symmetric() {
    let idx = sample_index();
    let terms = idx.get_terms();
    for t1 in &terms {
        for t2 in &terms {
            assert_eq!(idx.concurrence(t1, t2), idx.concurrence(t2, t1), "{t1} {t2}");
        }
    }
}

#[test]
fn unseen_terms_are_zero() {
    let mut idx = sample_index();
    assert_eq!(idx.word_appear("g"), 0);
    assert_eq!(idx.concurrence("a", "g"), 0);
    assert_eq!(idx.concurrence("g", "a"), 0);
    assert!(idx.postings("g").is_empty());
    idx.freeze();
    assert_eq!(idx.word_appear("g"), 0);
}

#[test]
fn postings_are_strictly_increasing_and_in_range() {
    let idx = sample_index();
    for (_, docs) in idx.iter() {
        assert!(docs.windows(2).all(|w| w[0] < w[1]));
        assert!(docs.iter().all(|&d| d < idx.get_num_docs()));
    }
}

#[test]
fn frozen_answers_match_writable_answers() {
    let writable = sample_index();
    let mut frozen = sample_index();
    frozen.freeze();
    for t in writable.get_terms() {
        assert_eq!(writable.word_appear(t), frozen.word_appear(t));
        // second read comes from the memoized value
        assert_eq!(writable.word_appear(t), frozen.word_appear(t));
    }
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corpus.tsv");
    let saved = sample_index();
    save_corpus(&saved, &path).unwrap();
    let loaded = load_corpus(&path).unwrap();

    assert_eq!(loaded.get_num_docs(), saved.get_num_docs());
    assert_eq!(loaded.get_terms(), saved.get_terms());
    for t1 in saved.get_terms() {
        assert_eq!(loaded.word_appear(t1), saved.word_appear(t1));
        for t2 in saved.get_terms() {
            assert_eq!(loaded.concurrence(t1, t2), saved.concurrence(t1, t2));
        }
    }
}

#[test]
fn loading_a_truncated_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corpus.tsv");
    std::fs::write(&path, "5\na\t0\t1\nb\t0\tx\n").unwrap();
    assert!(load_corpus(&path).is_err());
}

#[test]
fn loaded_index_accepts_more_documents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corpus.tsv");
    save_corpus(&sample_index(), &path).unwrap();
    let mut loaded = load_corpus(&path).unwrap();
    assert_eq!(loaded.add_document(["a", "z"]).unwrap(), 5);
    assert_eq!(loaded.word_appear("a"), 5);
}

#[test]
fn failed_save_leaves_no_partial_corpus() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corpus.tsv");
    let mut bad = InvertedIndex::new();
    bad.add_document(["a", "b\tc", "d"]).unwrap();

    assert!(save_corpus(&bad, &path).is_err());
    assert!(!path.exists());
    assert!(!dir.path().join("corpus.tsv.tmp").exists());

    // an earlier good save is left untouched
    save_corpus(&sample_index(), &path).unwrap();
    assert!(save_corpus(&bad, &path).is_err());
    let loaded = load_corpus(&path).unwrap();
    assert_eq!(loaded.get_num_docs(), 5);
    assert_eq!(loaded.get_terms(), vec!["a", "b", "c", "d", "e", "f"]);
}
