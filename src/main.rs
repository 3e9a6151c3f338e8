//! # RAG Harness CLI (`rag`)
//!
//! ## Usage
//!
//! ```bash
//! rag [--config ./config/rag.toml] [-v...] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag select "<query>"` | Build an index from a corpus and select records |
//! | `rag compare "<query>"` | Similarity vs multi-query results, side by side |
//! | `rag wiki "<query>"` | Retrieve Wikipedia pages |
//! | `rag split <path>` | Split a text or PDF document into chunks |
//! | `rag prompt <template.json>` | Render a prompt template and ask the chat model |
//! | `rag samples` | List built-in corpora |
//!
//! ## Examples
//!
//! ```bash
//! # Plain similarity over a built-in corpus
//! rag select "What is Chroma used for?" --sample vector --k 2
//!
//! # Diversity-balanced selection
//! rag select "What is langchain?" --sample mmr --strategy mmr --k 3 --lambda 0.5
//!
//! # Similarity vs multi-query
//! rag compare "How to improve energy levels and maintain balance?" --sample health --k 5
//!
//! # Second 200-character chunk of a PDF
//! rag split dl-curriculum.pdf --index 1
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use rag_harness::config::{self, Credentials};
use rag_harness::select::{CorpusSource, SelectRequest};
use rag_harness::split::SplitOverrides;
use rag_harness::{corpus, logging, prompt, select, split, wikipedia};
use rag_harness_core::Strategy;
use std::path::PathBuf;

/// RAG Harness CLI: similarity, MMR and multi-query selection over
/// in-memory corpora, plus Wikipedia retrieval, text splitting and prompt
/// templates.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "RAG Harness: retrieval strategies over in-memory corpora",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rag.toml` when present, otherwise built-in
    /// defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Logs go to
    /// stderr.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Corpus selection shared by `select` and `compare`.
#[derive(clap::Args)]
struct CorpusArgs {
    /// Corpus file (`.json` or `.toml`) with `{ text, tags }` entries.
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Built-in sample corpus (see `rag samples`).
    #[arg(long)]
    sample: Option<String>,

    /// File or directory of `.txt`, `.md` and `.pdf` documents, split with
    /// the `[splitter]` settings.
    #[arg(long)]
    docs: Option<PathBuf>,
}

impl From<CorpusArgs> for CorpusSource {
    fn from(args: CorpusArgs) -> Self {
        CorpusSource {
            corpus: args.corpus,
            sample: args.sample,
            docs: args.docs,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Similarity,
    Mmr,
    MultiQuery,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Select records for a query.
    ///
    /// Embeds the corpus into a fresh in-memory index, then ranks it with
    /// the chosen strategy. Parameters default to `[retrieval]`.
    Select {
        /// The query string.
        query: String,

        #[command(flatten)]
        source: CorpusArgs,

        /// Selection strategy.
        #[arg(long, value_enum, default_value = "similarity")]
        strategy: StrategyArg,

        /// Maximum number of results. Zero or negative yields no results.
        #[arg(long, allow_hyphen_values = true)]
        k: Option<i64>,

        /// MMR relevance/diversity balance in [0, 1].
        #[arg(long)]
        lambda: Option<f32>,

        /// MMR candidate pool size.
        #[arg(long)]
        fetch_k: Option<usize>,

        /// Number of query variants for multi-query.
        #[arg(long)]
        variants: Option<usize>,

        /// Also run the original query in multi-query.
        #[arg(long)]
        include_original: bool,
    },

    /// Print similarity results, a delimiter line, then multi-query results.
    Compare {
        /// The query string.
        query: String,

        #[command(flatten)]
        source: CorpusArgs,

        /// Maximum number of results per strategy.
        #[arg(long, allow_hyphen_values = true)]
        k: Option<i64>,
    },

    /// Retrieve Wikipedia pages for a query.
    Wiki {
        /// The query string (truncated to 300 characters).
        query: String,

        /// Number of pages to fetch.
        #[arg(long)]
        top_k: Option<usize>,

        /// Wikipedia language edition, e.g. `en`, `de`.
        #[arg(long)]
        lang: Option<String>,
    },

    /// Split a text or PDF document (or a directory of them) into chunks.
    Split {
        /// File or directory to split.
        path: PathBuf,

        /// Maximum chunk length in characters.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Characters of trailing context carried into the next chunk.
        #[arg(long)]
        chunk_overlap: Option<usize>,

        /// Separator to split on; empty splits into characters.
        #[arg(long)]
        separator: Option<String>,

        /// Print only the chunk at this 0-based index.
        #[arg(long)]
        index: Option<usize>,
    },

    /// Render a JSON prompt template and send it to the chat model.
    Prompt {
        /// Path to the serialized template.
        template: PathBuf,

        /// Template values as `key=value` pairs.
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,

        /// Print the rendered prompt without calling the chat model.
        #[arg(long)]
        dry_run: bool,
    },

    /// List the built-in sample corpora.
    Samples,
}

/// Parse a `key=value` pair for `--var` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Commands that don't require config
    if let Commands::Samples = cli.command {
        for s in corpus::SAMPLES {
            println!("{:<8} {:>2} records  {}", s.name, s.corpus().len(), s.description);
        }
        return Ok(());
    }

    let cfg = config::resolve_config(cli.config.as_deref())?;
    let creds = Credentials::from_env();

    match cli.command {
        Commands::Select {
            query,
            source,
            strategy,
            k,
            lambda,
            fetch_k,
            variants,
            include_original,
        } => {
            let strategy = match strategy {
                StrategyArg::Similarity => Strategy::Similarity,
                StrategyArg::Mmr => Strategy::DiversityBalanced {
                    lambda: lambda.unwrap_or(cfg.retrieval.lambda),
                },
                StrategyArg::MultiQuery => Strategy::MultiVariant {
                    variants: variants.unwrap_or(cfg.retrieval.variants),
                },
            };
            let mut request = SelectRequest::from_config(&cfg, strategy);
            if let Some(k) = k {
                request.k = k;
            }
            if let Some(fetch_k) = fetch_k {
                request.params.fetch_k = fetch_k;
            }
            request.params.include_original |= include_original;

            select::run_select(&cfg, &creds, &source.into(), &query, &request).await?;
        }
        Commands::Compare { query, source, k } => {
            let k = k.unwrap_or(cfg.retrieval.k);
            select::run_compare(&cfg, &creds, &source.into(), &query, k).await?;
        }
        Commands::Wiki { query, top_k, lang } => {
            wikipedia::run_wiki(&cfg, &query, top_k, lang).await?;
        }
        Commands::Split {
            path,
            chunk_size,
            chunk_overlap,
            separator,
            index,
        } => {
            let overrides = SplitOverrides {
                chunk_size,
                chunk_overlap,
                separator,
            };
            split::run_split(&cfg, &path, &overrides, index)?;
        }
        Commands::Prompt {
            template,
            vars,
            dry_run,
        } => {
            prompt::run_prompt(&cfg, &creds, &template, vars, dry_run).await?;
        }
        Commands::Samples => {}
    }

    Ok(())
}
