use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use proto_jsonschema_gen::codegen::{self, DEFAULT_BASE_URL, Options};
use proto_jsonschema_gen::pool::DescriptorPool;

/// Generate JSON Schema documents from Protocol Buffer messages.
///
/// Reads a JSON descriptor set with validation constraints and writes one
/// draft-07 schema per message of the target files.
#[derive(Parser)]
#[command(name = "proto-jsonschema-gen", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate .schema.json files from a descriptor set.
    Generate {
        /// Descriptor set JSON file.
        #[arg(long)]
        descriptors: PathBuf,

        /// Output directory for generated schema files.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Base URL for each schema's `$id`.
        #[arg(long, default_value = DEFAULT_BASE_URL, env = "PROTO_JSONSCHEMA_BASE_URL")]
        base_url: String,

        /// Suppress non-error output.
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");

        // Print cause chain.
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }

        process::exit(1);
    }
}

fn run(cli: Cli) -> proto_jsonschema_gen::error::Result<()> {
    match cli.command {
        Commands::Generate {
            descriptors,
            output_dir,
            base_url,
            quiet,
        } => {
            if !quiet {
                eprintln!("Loading descriptors from {}", descriptors.display());
            }
            let pool = DescriptorPool::load(&descriptors)?;
            if !quiet {
                eprintln!(
                    "Loaded {} messages, {} enums ({} targets)",
                    pool.message_count(),
                    pool.enum_count(),
                    pool.target_messages().count()
                );
            }

            let options = Options { base_url };
            let stats = codegen::generate(&pool, &output_dir, &options)?;

            if !quiet {
                eprintln!(
                    "Generated {} schemas with {} definitions",
                    stats.messages_generated, stats.definitions_emitted
                );
                eprintln!("Wrote {} files to {}", stats.files_written, output_dir.display());
                eprintln!("Done.");
            }
        }
    }

    Ok(())
}
