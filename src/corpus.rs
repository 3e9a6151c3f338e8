//! Corpus sources for the CLI: corpus files and built-in samples.
//!
//! A corpus file is a list of `{ text, tags? }` entries, written as JSON
//! (a top-level array) or TOML (`[[records]]` tables):
//!
//! ```toml
//! [[records]]
//! text = "Deep sleep is crucial for cellular repair."
//! tags = { source = "H3" }
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use rag_harness_core::models::RecordSpec;
use rag_harness_core::Corpus;
use serde::Deserialize;

#[derive(Deserialize)]
struct TomlCorpus {
    #[serde(default)]
    records: Vec<RecordSpec>,
}

/// Load a corpus file, choosing the format from the extension.
pub fn load_corpus_file(path: &Path) -> Result<Corpus> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

    let specs: Vec<RecordSpec> = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON corpus: {}", path.display()))?,
        Some("toml") => {
            let parsed: TomlCorpus = toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML corpus: {}", path.display()))?;
            parsed.records
        }
        _ => bail!(
            "Unsupported corpus file '{}': expected a .json or .toml extension",
            path.display()
        ),
    };

    Ok(specs.into_iter().collect())
}

/// A named built-in corpus.
pub struct Sample {
    pub name: &'static str,
    pub description: &'static str,
    build: fn() -> Corpus,
}

impl Sample {
    pub fn corpus(&self) -> Corpus {
        (self.build)()
    }
}

pub const SAMPLES: &[Sample] = &[
    Sample {
        name: "vector",
        description: "LangChain / Chroma / embeddings basics",
        build: vector_sample,
    },
    Sample {
        name: "mmr",
        description: "Near-duplicate LangChain statements for diversity selection",
        build: mmr_sample,
    },
    Sample {
        name: "health",
        description: "Health and wellness records (H1-H5) mixed with off-topic \"energy\" records (I1-I5)",
        build: health_sample,
    },
    Sample {
        name: "animals",
        description: "cat / dog / car",
        build: animals_sample,
    },
];

pub fn sample(name: &str) -> Result<Corpus> {
    match SAMPLES.iter().find(|s| s.name == name) {
        Some(s) => Ok(s.corpus()),
        None => {
            let known: Vec<&str> = SAMPLES.iter().map(|s| s.name).collect();
            bail!("Unknown sample '{}'. Available: {}", name, known.join(", "))
        }
    }
}

fn vector_sample() -> Corpus {
    Corpus::new()
        .text("LangChain helps developers build LLM applications easily.")
        .text("Chroma is a vector database optimized for LLM-based search.")
        .text("Embeddings convert text into high-dimensional vectors.")
        .text("OpenAI provides powerful embedding models.")
}

fn mmr_sample() -> Corpus {
    Corpus::new()
        .text("LangChain makes it easy to work with LLMs.")
        .text("LangChain is used to build LLM based applications.")
        .text("Chroma is used to store and search document embeddings.")
        .text("Embeddings are vector representations of text.")
        .text("MMR helps you get diverse results when doing similarity search.")
        .text("LangChain supports Chroma, FAISS, Pinecone, and more.")
}

fn health_sample() -> Corpus {
    const RECORDS: &[(&str, &str)] = &[
        ("H1", "Regular walking boosts heart health and can reduce symptoms of depression."),
        ("H2", "Consuming leafy greens and fruits helps detox the body and improve longevity."),
        ("H3", "Deep sleep is crucial for cellular repair and emotional regulation."),
        ("H4", "Mindfulness and controlled breathing lower cortisol and improve mental clarity."),
        ("H5", "Drinking sufficient water throughout the day helps maintain metabolism and energy."),
        ("I1", "The solar energy system in modern homes helps balance electricity demand."),
        ("I2", "Python balances readability with power, making it a popular system design language."),
        ("I3", "Photosynthesis enables plants to produce energy by converting sunlight."),
        ("I4", "The 2022 FIFA World Cup was held in Qatar and drew global energy and excitement."),
        ("I5", "Black holes bend spacetime and store immense gravitational energy."),
    ];
    RECORDS.iter().fold(Corpus::new(), |corpus, (source, text)| {
        corpus.tagged(*text, [("source", *source)])
    })
}

fn animals_sample() -> Corpus {
    Corpus::new().text("cat").text("dog").text("car")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sample_sizes() {
        assert_eq!(sample("vector").unwrap().len(), 4);
        assert_eq!(sample("mmr").unwrap().len(), 6);
        assert_eq!(sample("animals").unwrap().len(), 3);

        let health = sample("health").unwrap().into_records();
        assert_eq!(health.len(), 10);
        assert_eq!(health[0].tag("source"), Some("H1"));
        assert_eq!(health[9].tag("source"), Some("I5"));
    }

    #[test]
    fn test_unknown_sample_lists_available() {
        let err = sample("nope").err().unwrap().to_string();
        assert!(err.contains("health"));
    }

    #[test]
    fn test_load_json_corpus() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            f,
            r#"[{{"text": "alpha", "tags": {{"source": "a.txt"}}}}, {{"text": "beta"}}]"#
        )
        .unwrap();
        let records = load_corpus_file(f.path()).unwrap().into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tag("source"), Some("a.txt"));
        assert!(records[1].tags.is_empty());
    }

    #[test]
    fn test_load_toml_corpus() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            f,
            "[[records]]\ntext = \"alpha\"\n\n[[records]]\ntext = \"beta\"\ntags = {{ source = \"H2\" }}\n"
        )
        .unwrap();
        let records = load_corpus_file(f.path()).unwrap().into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tag("source"), Some("H2"));
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(load_corpus_file(f.path()).is_err());
    }
}
