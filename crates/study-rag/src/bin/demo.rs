//! Command-line demo for the study assistant
//!
//! Run with: cargo run -p study-rag --bin study-rag-demo -- demo

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

use study_rag::config::RagConfig;
use study_rag::generation::inline_references;
use study_rag::logging::init_logging;
use study_rag::types::response::FileIngestStatus;
use study_rag::types::{ChatEntry, ChatEntryKind};
use study_rag::utils::{format_file_size, truncate_text};
use study_rag::{AiAssistant, StudyAssistant};

const DEMO_COLLECTION: &str = "demo_collection";

const DEMO_QUESTIONS: [&str; 4] = [
    "What is machine learning?",
    "What are the main types of machine learning?",
    "What are some applications of machine learning?",
    "What is deep learning and how does it relate to machine learning?",
];

const DEMO_SEARCHES: [&str; 3] = ["supervised learning", "neural networks", "clustering algorithms"];

const ML_TUTORIAL: &str = r#"
Chapter 1: Introduction to Machine Learning

Machine learning is a subset of artificial intelligence (AI) that focuses on the use of data and algorithms to imitate the way that humans learn, gradually improving its accuracy.

Key Concepts:
1. Supervised Learning: Learning with labeled examples
2. Unsupervised Learning: Finding patterns in data without labels
3. Reinforcement Learning: Learning through interaction and feedback

Applications:
- Image recognition
- Natural language processing
- Recommendation systems
- Autonomous vehicles

Chapter 2: Types of Machine Learning

Supervised Learning:
Supervised learning uses labeled training data to learn a mapping function from input variables to output variables. Common algorithms include:
- Linear Regression
- Decision Trees
- Support Vector Machines
- Neural Networks

Unsupervised Learning:
Unsupervised learning finds hidden patterns or structures in data without labeled examples:
- Clustering (K-means, Hierarchical)
- Association Rules
- Principal Component Analysis (PCA)

Deep Learning:
Deep learning is a subset of machine learning that uses neural networks with multiple layers:
- Convolutional Neural Networks (CNNs) for image processing
- Recurrent Neural Networks (RNNs) for sequential data
- Transformers for natural language processing
"#;

#[derive(Parser, Debug)]
#[command(name = "study-rag-demo", author, version, about = "Personalized study assistant CLI")]
struct Cli {
    /// Google API key (defaults to GOOGLE_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through ingestion, questions and search on a built-in tutorial
    Demo,
    /// Ingest a file or every supported file under a folder
    Ingest { path: PathBuf },
    /// Ask a question about the ingested materials
    Ask {
        question: String,
        /// Chunks to retrieve
        #[arg(short, long)]
        k: Option<usize>,
        /// Also suggest follow-up questions
        #[arg(long)]
        followups: bool,
    },
    /// Summarize the materials
    Summary {
        #[arg(long)]
        topic: Option<String>,
    },
    /// Semantic search without the AI
    Search {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Show collection statistics and documents
    Info,
    /// Delete every document from the collection
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = RagConfig::load()?;
    if let Some(key) = &cli.api_key {
        config.llm.api_key = key.trim().to_string();
    }
    config.logging.file = None;
    if std::env::var("LOG_LEVEL").is_err() {
        config.logging.level = "WARNING".to_string();
    }
    init_logging(&config.logging)?;

    match cli.command {
        Command::Demo => run_demo(config).await,
        Command::Ingest { path } => ingest(config, &path).await,
        Command::Ask {
            question,
            k,
            followups,
        } => ask(config, &question, k, followups).await,
        Command::Summary { topic } => summary(config, topic.as_deref()).await,
        Command::Search { query, k } => search(config, &query, k).await,
        Command::Info => info(config).await,
        Command::Clear => clear(config).await,
    }
}

fn heading(text: &str) {
    println!("\n{}", style(text).bold().cyan());
    println!("{}", style("-".repeat(30)).dim());
}

fn assistant_for(config: &RagConfig) -> anyhow::Result<AiAssistant> {
    if !config.llm.has_api_key() {
        anyhow::bail!("No API key: pass --api-key or set GOOGLE_API_KEY");
    }
    Ok(AiAssistant::gemini(&config.llm, &config.llm.api_key)?)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn run_demo(mut config: RagConfig) -> anyhow::Result<()> {
    println!("{}", style("Personalized Study Assistant Demo").bold());
    println!("{}", "=".repeat(50));

    config.chunking.chunk_size = 500;
    config.chunking.chunk_overlap = 50;
    config.vector_store.collection_name = DEMO_COLLECTION.to_string();

    let mut tutorial = tempfile::Builder::new().suffix(".txt").tempfile()?;
    tutorial.write_all(ML_TUTORIAL.as_bytes())?;

    let app = StudyAssistant::new(config.clone()).await?;
    let result = demo_steps(&app, &config, tutorial.path()).await;

    app.clear_collection().await?;
    for path in [
        config.vector_store.collection_path(),
        config.vector_store.documents_path(),
    ] {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
    }
    println!("\n{}", style("Cleanup completed").dim());

    result
}

async fn demo_steps(app: &StudyAssistant, config: &RagConfig, tutorial: &Path) -> anyhow::Result<()> {
    heading("Step 1: Processing Documents");
    let data = std::fs::read(tutorial)?;
    let status = app.process_upload("ML_Tutorial.txt", data).await?;
    println!(
        "{} Processed document into {} chunks",
        style("✓").green(),
        status.chunks_created()
    );

    heading("Step 2: Vector Store");
    let info = app.collection_info();
    println!(
        "Collection '{}': {} chunks ({}, {} dims)",
        info.name, info.count, info.embedding_model, info.dimensions
    );

    heading("Step 3: AI Assistant");
    if config.llm.has_api_key() {
        let ai = assistant_for(config)?;
        let mut history: Vec<ChatEntry> = Vec::new();

        for (i, question) in DEMO_QUESTIONS.iter().enumerate() {
            println!("\n{} {}", style(format!("Question {}:", i + 1)).bold(), question);
            let pb = spinner("Thinking...");
            let response = app.answer_question(&ai, question, &history, Some(3), false).await;
            pb.finish_and_clear();

            match response {
                Ok(response) => {
                    println!("Found {} relevant chunks", response.chunks_retrieved);
                    println!("{} {}", style("Answer:").green().bold(), response.answer);
                    history.push(ChatEntry::new(ChatEntryKind::Question, *question));
                    history.push(ChatEntry::new(ChatEntryKind::Answer, response.answer));
                }
                Err(e) => {
                    println!("{} {}", style("AI Assistant error:").red(), e.user_message());
                    println!("Make sure the API key is valid and has quota.");
                    return Ok(());
                }
            }
            println!("{}", "-".repeat(50));
        }

        heading("Summary");
        let chunks = app.knowledge().get_all_chunks(Some(5));
        match ai.generate_summary(&chunks, None).await {
            Ok(summary) => println!("{}", summary),
            Err(e) => println!("{} {}", style("AI Assistant error:").red(), e.user_message()),
        }
    } else {
        println!("Skipping AI demo (no API key provided)");

        heading("Search Functionality");
        for query in DEMO_SEARCHES {
            println!("\nSearching for: '{}'", style(query).yellow());
            let results = app.search(query, Some(2), None).await?;
            for (i, hit) in results.hits.iter().enumerate() {
                println!("  Result {}: {}", i + 1, truncate_text(&hit.content, 100));
                println!("  Source: {}", hit.filename);
            }
        }
    }

    println!("\n{} Demo completed successfully!", style("✓").green());
    Ok(())
}

/// Supported files at `path`, walking folders recursively
fn collect_files(config: &RagConfig, path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|ext| config.files.is_supported(ext))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect()
}

async fn ingest(config: RagConfig, path: &Path) -> anyhow::Result<()> {
    let files = collect_files(&config, path);
    if files.is_empty() {
        anyhow::bail!("No supported files found at {}", path.display());
    }

    let app = StudyAssistant::new(config).await?;
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut chunks = 0u32;
    let mut failures = 0usize;
    for file in &files {
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());
        pb.set_message(filename.clone());

        let status = match std::fs::read(file) {
            Ok(data) => app.process_upload(&filename, data).await,
            Err(e) => Err(e.into()),
        };

        match status {
            Ok(status) => {
                chunks += status.chunks_created();
                let label = match &status {
                    FileIngestStatus::New { .. } => style("new").green(),
                    FileIngestStatus::Updated { .. } => style("updated").green(),
                    FileIngestStatus::Unchanged { .. } => style("unchanged").dim(),
                    FileIngestStatus::Duplicate { .. } => style("duplicate").dim(),
                    FileIngestStatus::Failed { .. } => style("failed").red(),
                };
                pb.println(format!("{:>10} {}", label, filename));
            }
            Err(e) => {
                failures += 1;
                pb.println(format!("{:>10} {}: {}", style("failed").red(), filename, e.user_message()));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!(
        "Ingested {} files ({} chunks, {} failed)",
        files.len() - failures,
        chunks,
        failures
    );
    Ok(())
}

async fn ask(config: RagConfig, question: &str, k: Option<usize>, followups: bool) -> anyhow::Result<()> {
    let ai = assistant_for(&config)?;
    let app = StudyAssistant::new(config).await?;

    let pb = spinner("Thinking...");
    let response = app.answer_question(&ai, question, &[], k, followups).await;
    pb.finish_and_clear();
    let response = response.map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!("{}", response.answer);
    if response.low_confidence {
        println!("\n{}", style("(no strongly matching passages; answer may be incomplete)").yellow());
    }
    let refs = inline_references(&response.citations);
    if !refs.is_empty() {
        println!("\n{}", style(refs.join(" ")).dim());
    }
    if !response.sources.is_empty() {
        println!("\n{}", response.sources);
    }
    if !response.followups.is_empty() {
        println!("\n{}", style("You might also ask:").bold());
        for q in &response.followups {
            println!("  • {}", q);
        }
    }
    Ok(())
}

async fn summary(config: RagConfig, topic: Option<&str>) -> anyhow::Result<()> {
    let ai = assistant_for(&config)?;
    let app = StudyAssistant::new(config).await?;

    let pb = spinner("Summarizing...");
    let response = app.summarize(&ai, topic).await;
    pb.finish_and_clear();
    let response = response.map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!("{}", response.summary);
    if !response.sources.is_empty() {
        println!("\n{}", response.sources);
    }
    Ok(())
}

async fn search(config: RagConfig, query: &str, k: Option<usize>) -> anyhow::Result<()> {
    let app = StudyAssistant::new(config).await?;
    let results = app.search(query, k, None).await?;

    if results.hits.is_empty() {
        println!("No documents ingested yet.");
        return Ok(());
    }
    if results.low_confidence {
        println!("{}", style("No strong matches; showing the closest passages.").yellow());
    }
    for (i, hit) in results.hits.iter().enumerate() {
        let page = hit
            .page_number
            .map(|p| format!(", page {}", p))
            .unwrap_or_default();
        println!(
            "{} {}{} (score {:.3})",
            style(format!("[{}]", i + 1)).bold(),
            hit.filename,
            page,
            hit.similarity_score
        );
        println!("    {}", truncate_text(&hit.content, 200));
    }
    Ok(())
}

async fn info(config: RagConfig) -> anyhow::Result<()> {
    let app = StudyAssistant::new(config).await?;
    let info = app.collection_info();

    println!("{}", style("Collection").bold());
    println!("  Name:       {}", info.name);
    println!("  Status:     {}", info.status);
    println!("  Chunks:     {}", info.count);
    println!("  Embeddings: {} ({} dims)", info.embedding_model, info.dimensions);
    println!("  Path:       {}", info.persist_path);

    let documents = app.documents();
    println!("\n{} ({})", style("Documents").bold(), documents.len());
    for doc in documents {
        println!(
            "  {}  {}  {} chunks  {}",
            doc.filename,
            format_file_size(doc.file_size),
            doc.total_chunks,
            doc.ingested_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn clear(config: RagConfig) -> anyhow::Result<()> {
    let app = StudyAssistant::new(config).await?;
    let deleted = app.clear_collection().await?;
    println!("Deleted {} chunks", deleted);
    Ok(())
}
