//! Browser-driven PDF signing
//!
//! This crate signs a PDF through a third-party web signing service by driving
//! Chrome over the DevTools protocol: it uploads the document, fills in the
//! signer, places the signature, submits, and captures the signed PDF from the
//! page's network traffic.
//!
//! # Features
//!
//! - **Request building**: defaults plus `--key value` overrides, validated
//!   before a browser is ever started
//! - **Versioned page contract**: service URL, CSS selectors and timeouts live
//!   in a TOML [`SigningProfile`]
//! - **Bounded waits**: every step waits for an observable page condition with
//!   an upper bound, never a blind sleep
//! - **Response race**: the signed PDF is taken from the first PDF response,
//!   raced against a download timeout
//! - **Guaranteed teardown**: the browser is closed once on every exit path
//!
//! # Example
//!
//! ```no_run
//! use pdfsign_automation::{ChromeLauncher, PdfSigner, RequestDraft, SigningProfile};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let profile = SigningProfile::from_file("profile.toml")?;
//! let request = RequestDraft::for_service(profile.service_url.clone())
//!     .with_overrides(["--pdf", "contract.pdf", "--name", "Jane Roe"])
//!     .validate()?;
//!
//! let signer = PdfSigner::new(ChromeLauncher::new(profile.headless), profile);
//! let result = signer.sign(&request).await;
//! if let Some(path) = result.output_path() {
//!     println!("Signed PDF: {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod chrome;
pub mod config;
pub mod error;
pub mod session;
pub mod signer;

// Re-export main types for convenience
pub use capture::PdfCapture;
pub use chrome::{ChromeLauncher, ChromeSession};
pub use config::{RequestDraft, SelectorSet, SigningProfile, SigningRequest, Timeouts};
pub use error::SigningError;
pub use session::{BrowserSession, SessionLauncher};
pub use signer::{PdfSigner, SigningResult};
