//! PDF signing CLI
//!
//! Signs one document through the configured signing service and exits
//! non-zero on any failure.
//!
//! ```sh
//! pdfsign --headless --pdf contract.pdf --name "Jane Roe" --x 120 --y 480
//! ```
//!
//! Session flags (`--profile`, `--headless`, `--chrome`, `--json`) come first;
//! everything from the first unrecognized flag on is read as `--key value`
//! request overrides (`pdf`, `name`, `x`, `y`; other keys are ignored).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pdfsign_automation::{ChromeLauncher, PdfSigner, RequestDraft, SigningProfile};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfsign")]
#[command(version, about = "Sign a PDF through a web signing service")]
struct Args {
    /// TOML profile with the service URL, selectors and timeouts
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Run Chrome without a visible window
    #[arg(long)]
    headless: bool,

    /// Chrome/Chromium binary to use instead of auto-detection
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Print the signing result as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Request overrides: --pdf <path> --name <signer> --x <px> --y <px>
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    overrides: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Progress goes to stderr so stdout stays clean for the result
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let mut profile = match &args.profile {
        Some(path) => SigningProfile::from_file(path)?,
        None => SigningProfile::default(),
    };
    if args.headless {
        profile.headless = true;
    }

    let draft = RequestDraft::for_service(profile.service_url.clone()).with_overrides(&args.overrides);
    info!(
        "Starting PDF signing process: document={}, signer={}, position=({:?}, {:?})",
        draft.document_path, draft.signer_name, draft.x, draft.y
    );

    let mut launcher = ChromeLauncher::new(profile.headless);
    if let Some(chrome) = args.chrome {
        launcher = launcher.with_executable(chrome);
    }

    let signer = PdfSigner::new(launcher, profile);
    let result = signer.sign_draft(draft).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(path) = result.output_path() {
        println!("PDF signed successfully!");
        println!("Signed PDF: {}", path.display());
    } else if let Some(message) = result.error_message() {
        eprintln!("Failed to sign PDF: {}", message);
    }

    Ok(result.is_success())
}
