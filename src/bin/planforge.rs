#![forbid(unsafe_code)]

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use planforge::brief::{CourseProgram, GenerationRequest, ProjectBrief};
use planforge::gateway::{NoopUsageSink, ProviderGateway, DEFAULT_MODEL};
use planforge::{mentor, pipeline};

#[derive(Parser)]
#[command(name = "planforge", version, about = "Candidate project-brief pipeline CLI")]
struct Cli {
    /// Groq model id.
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the generation pipeline from a request JSON file
    Generate {
        /// GenerationRequest JSON
        #[arg(long)]
        request: PathBuf,
        /// Course catalog JSON (array of CourseProgram)
        #[arg(long)]
        courses: PathBuf,
        /// Write ranked candidates here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ask the mentor a one-shot question
    Mentor {
        /// Course catalog JSON (array of CourseProgram)
        #[arg(long)]
        courses: PathBuf,
        /// Active project brief JSON, if any
        #[arg(long)]
        brief: Option<PathBuf>,
        /// The student's message
        message: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let model = cli
        .model
        .or_else(|| std::env::var("GROQ_MODEL").ok())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let gateway = Arc::new(ProviderGateway::from_env(Arc::new(NoopUsageSink))?);

    match cli.command {
        Commands::Generate {
            request,
            courses,
            out,
        } => {
            let request: GenerationRequest = read_json(&request)?;
            let catalog: Vec<CourseProgram> = read_json(&courses)?;

            let run = pipeline::generate_candidates(gateway, &model, &catalog, &request).await?;

            let rendered = serde_json::to_string_pretty(&run.candidates)?;
            match out {
                Some(path) => {
                    let mut file = File::create(&path)?;
                    file.write_all(rendered.as_bytes())?;
                    eprintln!(
                        "wrote {} candidates to {} (run {})",
                        run.candidates.len(),
                        path.display(),
                        run.run_id
                    );
                }
                None => println!("{rendered}"),
            }

            if run.validation_degraded > 0 {
                eprintln!(
                    "warning: validation degraded for {} candidate(s)",
                    run.validation_degraded
                );
            }
        }
        Commands::Mentor {
            courses,
            brief,
            message,
        } => {
            let catalog: Vec<CourseProgram> = read_json(&courses)?;
            let active: Option<ProjectBrief> = match brief {
                Some(path) => Some(read_json(&path)?),
                None => None,
            };

            let today = chrono::Utc::now().date_naive();
            let reply = mentor::respond(
                gateway.as_ref(),
                &model,
                &catalog,
                active.as_ref(),
                &[],
                &message,
                today,
            )
            .await?;
            println!("{reply}");
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
