//! On-disk layout of an index directory.
//!
//! `corpus.tsv` is the plain text posting format: the document count on the
//! first line, then one `term<TAB>doc<TAB>doc...` line per term.

use crate::association::{AssociationConfig, AssociationTable};
use crate::tokenizer::TokenizerConfig;
use crate::{DocId, Error, InvertedIndex, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{create_dir_all, remove_file, rename, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub association: AssociationConfig,
    pub tokenizer: TokenizerConfig,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn corpus(&self) -> PathBuf { self.root.join("corpus.tsv") }
    pub fn associations(&self) -> PathBuf { self.root.join("associations.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn check_term(term: &str) -> Result<()> {
    if term.is_empty() || term.contains(['\t', '\n', '\r']) {
        return Err(Error::UnencodableTerm(term.to_owned()));
    }
    Ok(())
}

/// Fails before writing a single byte when any term is unencodable.
pub fn write_corpus<W: Write>(index: &InvertedIndex, mut w: W) -> Result<()> {
    for (term, _) in index.iter() {
        check_term(term)?;
    }
    writeln!(w, "{}", index.get_num_docs())?;
    for (term, docs) in index.iter() {
        w.write_all(term.as_bytes())?;
        for doc in docs {
            write!(w, "\t{doc}")?;
        }
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_corpus<R: BufRead>(r: R) -> Result<InvertedIndex> {
    let mut lines = r.lines();
    let header = lines.next().transpose()?.ok_or_else(|| parse_err(1, "missing document count"))?;
    let num_docs: u32 = header
        .trim()
        .parse()
        .map_err(|e| parse_err(1, format!("invalid document count {header:?}: {e}")))?;

    let mut postings: BTreeMap<String, Vec<DocId>> = BTreeMap::new();
    for (i, line) in lines.enumerate() {
        let lineno = i + 2;
        let line = line?;
        let mut fields = line.split('\t');
        let term = fields.next().unwrap_or_default();
        if term.is_empty() {
            return Err(parse_err(lineno, "empty term"));
        }
        let mut docs: Vec<DocId> = Vec::new();
        for field in fields {
            let doc: DocId = field
                .parse()
                .map_err(|e| parse_err(lineno, format!("invalid doc id {field:?}: {e}")))?;
            if doc >= num_docs {
                return Err(parse_err(lineno, format!("doc id {doc} out of range for {num_docs} documents")));
            }
            if docs.last().is_some_and(|&prev| prev >= doc) {
                return Err(parse_err(lineno, format!("doc ids not strictly increasing at {doc}")));
            }
            docs.push(doc);
        }
        if docs.is_empty() {
            return Err(parse_err(lineno, format!("term {term:?} has no doc ids")));
        }
        if postings.insert(term.to_owned(), docs).is_some() {
            return Err(parse_err(lineno, format!("duplicate term {term:?}")));
        }
    }
    Ok(InvertedIndex::from_parts(postings, num_docs))
}

fn parse_err(line: usize, message: impl Into<String>) -> Error {
    Error::Parse { line, message: message.into() }
}

pub fn save_corpus<P: AsRef<Path>>(index: &InvertedIndex, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    // Written next to the target and renamed, so a failed save never leaves a partial corpus.
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let written = File::create(&tmp)
        .map_err(Error::from)
        .and_then(|f| write_corpus(index, BufWriter::new(f)));
    if let Err(e) = written {
        let _ = remove_file(&tmp);
        return Err(e);
    }
    rename(&tmp, path)?;
    tracing::info!(path = %path.display(), num_docs = index.get_num_docs(), num_terms = index.num_terms(), "saved corpus");
    Ok(())
}

pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<InvertedIndex> {
    let path = path.as_ref();
    let index = read_corpus(BufReader::new(File::open(path)?))?;
    tracing::info!(path = %path.display(), num_docs = index.get_num_docs(), num_terms = index.num_terms(), "loaded corpus");
    Ok(index)
}

pub fn save_associations(paths: &IndexPaths, table: &AssociationTable) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.associations())?;
    let bytes = bincode::serialize(table)?;
    f.write_all(&bytes)?;
    tracing::debug!(terms = table.len(), bytes = bytes.len(), "saved association table");
    Ok(())
}

pub fn load_associations(paths: &IndexPaths) -> Result<AssociationTable> {
    let mut f = File::open(paths.associations())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let table = bincode::deserialize(&buf)?;
    Ok(table)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<InvertedIndex> {
        read_corpus(text.as_bytes())
    }

    #[test]
    fn writes_documented_format() {
        let mut idx = InvertedIndex::new();
        idx.add_document(["b", "a"]).unwrap();
        idx.add_document(["a"]).unwrap();
        let mut out = Vec::new();
        write_corpus(&idx, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "2\na\t0\t1\nb\t0\n");
    }

    #[test]
    fn reads_documented_format() {
        let idx = parse("3\nx\t0\t2\ny\t1\n").unwrap();
        assert_eq!(idx.get_num_docs(), 3);
        assert_eq!(idx.postings("x"), &[0, 2]);
        assert_eq!(idx.concurrence("x", "y"), 0);
        assert!(!idx.is_frozen());
    }

    #[test]
    fn rejects_malformed_input() {
        let cases = [
            "",
            "many\n",
            "2\nx\n",
            "2\nx\t0\tone\n",
            "2\nx\t1\t0\n",
            "2\nx\t0\t0\n",
            "2\nx\t5\n",
            "2\n\t0\n",
            "2\nx\t0\nx\t1\n",
            "2\nx\t0\t\n",
        ];
        for text in cases {
            assert!(matches!(parse(text), Err(Error::Parse { .. })), "accepted {text:?}");
        }
    }

    #[test]
    fn parse_error_names_line() {
        match parse("2\nx\t0\ny\tz\n") {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn refuses_tab_in_term() {
        let mut idx = InvertedIndex::new();
        idx.add_document(["bad\tterm"]).unwrap();
        let mut out = Vec::new();
        assert!(matches!(write_corpus(&idx, &mut out), Err(Error::UnencodableTerm(_))));
        assert!(out.is_empty());
    }
}
