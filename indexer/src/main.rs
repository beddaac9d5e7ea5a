use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use termassoc_core::persist::{
    load_associations, load_corpus, load_meta, save_associations, save_corpus, save_meta, IndexPaths, MetaFile,
    FORMAT_VERSION,
};
use termassoc_core::tokenizer::{load_stopwords, Tokenizer, TokenizerConfig, TokenizerMode};
use termassoc_core::{Association, AssociationConfig, AssociationEngine, InvertedIndex, Measure};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputDoc {
    body: String,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a term co-occurrence index and rank term associations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index documents and compute the per-term association tables
    Build {
        /// Input path (.txt with one document per line, .jsonl with a "body" field, or a directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Tokenization: whitespace keeps tokens verbatim, normalized lowercases and stems
        #[arg(long, default_value = "whitespace", value_parser = parse_mode)]
        mode: TokenizerMode,
        /// File with one stopword per line
        #[arg(long)]
        stopwords: Option<PathBuf>,
        /// Also drop common English stopwords
        #[arg(long, default_value_t = false)]
        builtin_stopwords: bool,
        /// Partners kept per term
        #[arg(long, default_value_t = 50)]
        top_k: usize,
        /// Association score: pmi or npmi
        #[arg(long, default_value = "pmi")]
        measure: Measure,
        /// Worker threads for the pairwise pass (0 = one per core)
        #[arg(long, default_value_t = 0)]
        threads: usize,
    },
    /// Print the strongest associations of a term
    Top {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long)]
        term: String,
        /// Print at most this many partners
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the raw counts and scores of one term pair
    Pair {
        #[arg(long, default_value = "./index")]
        index: String,
        t1: String,
        t2: String,
    },
    /// Mutual information between two texts
    Mi {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long)]
        left: String,
        #[arg(long)]
        right: String,
        /// Divide by the joint entropy of the co-occurring pairs
        #[arg(long, default_value_t = false)]
        normalized: bool,
    },
}

fn parse_mode(s: &str) -> Result<TokenizerMode, String> {
    match s {
        "whitespace" => Ok(TokenizerMode::Whitespace),
        "normalized" => Ok(TokenizerMode::Normalized),
        other => Err(format!("unknown mode {other:?}, expected whitespace or normalized")),
    }
}

#[derive(Serialize)]
struct TopResponse<'a> {
    term: &'a str,
    measure: Measure,
    results: &'a [Association],
}

#[derive(Serialize)]
struct PairResponse<'a> {
    t1: &'a str,
    t2: &'a str,
    num_docs: u32,
    word_appear: [u32; 2],
    concurrence: u32,
    pmi: Option<f64>,
    npmi: f64,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, mode, stopwords, builtin_stopwords, top_k, measure, threads } => {
            let stopwords = match stopwords {
                Some(path) => load_stopwords(&path).with_context(|| format!("reading stopwords {}", path.display()))?,
                None => Default::default(),
            };
            let tokenizer = Tokenizer::new(TokenizerConfig { mode, builtin_stopwords, stopwords });
            if threads > 0 {
                rayon::ThreadPoolBuilder::new().num_threads(threads).build_global()?;
            }
            build_index(&input, &output, tokenizer, AssociationConfig { top_k, measure })
        }
        Commands::Top { index, term, limit } => {
            let table = load_associations(&IndexPaths::new(&index))?;
            let results = table.get(&term);
            let results = &results[..limit.unwrap_or(results.len()).min(results.len())];
            println!("{}", serde_json::to_string_pretty(&TopResponse { term: &term, measure: table.measure, results })?);
            Ok(())
        }
        Commands::Pair { index, t1, t2 } => {
            let idx = open_frozen(&IndexPaths::new(&index))?;
            let engine = AssociationEngine::new(&idx, AssociationConfig::default())?;
            let pmi = engine.pmi(&t1, &t2);
            let resp = PairResponse {
                t1: &t1,
                t2: &t2,
                num_docs: idx.get_num_docs(),
                word_appear: [idx.word_appear(&t1), idx.word_appear(&t2)],
                concurrence: idx.concurrence(&t1, &t2),
                // JSON has no -inf; null marks "no evidence"
                pmi: pmi.is_finite().then_some(pmi),
                npmi: engine.npmi(&t1, &t2),
            };
            println!("{}", serde_json::to_string_pretty(&resp)?);
            Ok(())
        }
        Commands::Mi { index, left, right, normalized } => {
            let paths = IndexPaths::new(&index);
            let meta = load_meta(&paths)?;
            let tokenizer = Tokenizer::new(meta.tokenizer);
            let idx = open_frozen(&paths)?;
            let engine = AssociationEngine::new(&idx, meta.association)?;
            let (s1, s2) = (tokenizer.tokenize(&left), tokenizer.tokenize(&right));
            let score = if normalized { engine.compute_nmi(&s1, &s2) } else { engine.compute_mi(&s1, &s2) };
            println!("{}", serde_json::json!({ "left": s1, "right": s2, "normalized": normalized, "score": score }));
            Ok(())
        }
    }
}

fn open_frozen(paths: &IndexPaths) -> Result<InvertedIndex> {
    let mut idx = load_corpus(paths.corpus()).with_context(|| format!("loading {}", paths.corpus().display()))?;
    idx.freeze();
    Ok(idx)
}

fn build_index(input: &str, output: &str, tokenizer: Tokenizer, config: AssociationConfig) -> Result<()> {
    config.validate()?;
    let out_paths = IndexPaths::new(output);
    let files = collect_inputs(Path::new(input));
    anyhow::ensure!(!files.is_empty(), "no .txt or .jsonl input under {input}");

    let mut index = InvertedIndex::new();
    for file in files {
        let before = index.get_num_docs();
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(&file, &tokenizer, &mut index)?;
        } else {
            index_lines(&file, &tokenizer, &mut index)?;
        }
        tracing::debug!(file = %file.display(), docs = index.get_num_docs() - before, "indexed file");
    }
    index.freeze();
    tracing::info!(num_docs = index.get_num_docs(), num_terms = index.num_terms(), "ingested documents");

    let mut engine = AssociationEngine::new(&index, config)?;
    engine.build()?;
    let table = engine.snapshot().context("association tables missing after build")?;

    save_corpus(&index, out_paths.corpus())?;
    save_associations(&out_paths, &table)?;
    let meta = MetaFile {
        num_docs: index.get_num_docs(),
        num_terms: index.num_terms(),
        association: config,
        tokenizer: tokenizer.config().clone(),
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339)?,
        version: FORMAT_VERSION,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output, "index build complete");
    Ok(())
}

fn collect_inputs(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "txt" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

/// One document per non-empty line.
fn index_lines(file: &Path, tokenizer: &Tokenizer, index: &mut InvertedIndex) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        index.add_document(tokenizer.term_set(&line))?;
    }
    Ok(())
}

fn index_jsonl(file: &Path, tokenizer: &Tokenizer, index: &mut InvertedIndex) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line).with_context(|| format!("{}:{}", file.display(), i + 1))?;
        index.add_document(tokenizer.term_set(&doc.body))?;
    }
    Ok(())
}
