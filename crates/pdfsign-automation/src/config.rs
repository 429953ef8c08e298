//! Signing request construction and the signing-service profile
//!
//! A run is described by two things:
//!
//! - a [`SigningRequest`]: which document, who signs, and where the signature
//!   goes. Built from defaults plus `--key value` overrides via [`RequestDraft`]
//!   and validated before any browser work starts.
//! - a [`SigningProfile`]: the versioned contract with the third-party page
//!   (URL, CSS selectors, timeouts). Loaded from TOML so a changed page layout
//!   is a data update rather than a code change.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SigningError;

/// Signing service the default profile targets
pub const DEFAULT_SERVICE_URL: &str = "https://www.ilovepdf.com/sign-pdf";

/// Document signed when no `--pdf` override is given
pub const DEFAULT_DOCUMENT_PATH: &str = "documents/sample.pdf";

/// Signer name used when no `--name` override is given
pub const DEFAULT_SIGNER_NAME: &str = "Test User";

/// On-page coordinates of the placed signature, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePosition {
    pub x: i64,
    pub y: i64,
}

impl Default for SignaturePosition {
    fn default() -> Self {
        Self { x: 100, y: 200 }
    }
}

/// A coordinate as supplied on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coordinate {
    Value(i64),
    /// Raw input that did not parse as an integer
    Invalid(String),
}

impl Coordinate {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(v) => Coordinate::Value(v),
            Err(_) => Coordinate::Invalid(raw.to_string()),
        }
    }
}

/// Unvalidated request, assembled from defaults and overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDraft {
    pub service_url: String,
    pub document_path: String,
    pub signer_name: String,
    pub x: Coordinate,
    pub y: Coordinate,
}

impl RequestDraft {
    /// Defaults against the default signing service
    pub fn defaults() -> Self {
        Self::for_service(DEFAULT_SERVICE_URL)
    }

    /// Defaults against a specific signing service URL
    pub fn for_service(service_url: impl Into<String>) -> Self {
        let position = SignaturePosition::default();
        Self {
            service_url: service_url.into(),
            document_path: DEFAULT_DOCUMENT_PATH.to_string(),
            signer_name: DEFAULT_SIGNER_NAME.to_string(),
            x: Coordinate::Value(position.x),
            y: Coordinate::Value(position.y),
        }
    }

    /// Apply `--key value` overrides in order
    ///
    /// Recognized keys are `pdf`, `name`, `x` and `y`; each overwrites the
    /// corresponding field. Unknown keys and a trailing key without a value
    /// are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use pdfsign_automation::config::{Coordinate, RequestDraft};
    ///
    /// let draft = RequestDraft::defaults().with_overrides(["--name", "Ada", "--x", "40"]);
    /// assert_eq!(draft.signer_name, "Ada");
    /// assert_eq!(draft.x, Coordinate::Value(40));
    /// ```
    pub fn with_overrides<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        for pair in args.chunks(2) {
            let [key, value] = pair else {
                break;
            };
            let key = key.as_ref();
            let value = value.as_ref();
            match key.strip_prefix("--").unwrap_or(key) {
                "pdf" => self.document_path = value.to_string(),
                "name" => self.signer_name = value.to_string(),
                "x" => self.x = Coordinate::parse(value),
                "y" => self.y = Coordinate::parse(value),
                _ => {}
            }
        }
        self
    }

    /// Check for missing or invalid fields and freeze the request
    pub fn validate(self) -> Result<SigningRequest, SigningError> {
        if self.document_path.is_empty() {
            return Err(SigningError::Configuration("PDF path is required".to_string()));
        }
        if self.signer_name.is_empty() {
            return Err(SigningError::Configuration(
                "Signer name is required".to_string(),
            ));
        }
        let (Coordinate::Value(x), Coordinate::Value(y)) = (&self.x, &self.y) else {
            return Err(SigningError::Configuration(
                "Invalid signature position coordinates".to_string(),
            ));
        };

        Ok(SigningRequest {
            signature_position: SignaturePosition { x: *x, y: *y },
            service_url: self.service_url,
            document_path: PathBuf::from(self.document_path),
            signer_name: self.signer_name,
        })
    }
}

/// A validated signing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningRequest {
    service_url: String,
    document_path: PathBuf,
    signer_name: String,
    signature_position: SignaturePosition,
}

impl SigningRequest {
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub fn signer_name(&self) -> &str {
        &self.signer_name
    }

    pub fn signature_position(&self) -> SignaturePosition {
        self.signature_position
    }
}

/// Everything the signing script needs to know about the third-party page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningProfile {
    /// Page the script navigates to
    pub service_url: String,
    /// Directory signed documents are written to
    pub downloads_dir: PathBuf,
    /// Run Chrome without a visible window
    pub headless: bool,
    pub selectors: SelectorSet,
    pub timeouts: Timeouts,
}

impl Default for SigningProfile {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            downloads_dir: PathBuf::from("downloads"),
            headless: false,
            selectors: SelectorSet::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl SigningProfile {
    /// Load a profile from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed.
    /// Missing fields fall back to the default profile.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse a profile from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use pdfsign_automation::config::SigningProfile;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let profile = SigningProfile::from_str(r##"
    ///     service_url = "https://sign.example.com"
    ///
    ///     [selectors]
    ///     download = "#download-link"
    /// "##)?;
    /// assert_eq!(profile.selectors.download, "#download-link");
    /// assert_eq!(profile.selectors.upload, "#pickfiles");
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML profile")
    }
}

/// CSS selectors addressing the signing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSet {
    /// Element that opens the native file chooser
    pub upload: String,
    /// "Only me" button shown once the upload finishes
    pub single_signer: String,
    pub signer_name_input: String,
    /// Commits the signature settings
    pub apply: String,
    /// Signature preview that drops a signature onto the canvas when clicked
    pub signature_placeholder: String,
    /// Elements whose `left`/`top` place the signature on the page
    pub signature_containers: Vec<String>,
    /// Submits the document for server-side signing
    pub process: String,
    /// Fetches the signed document
    pub download: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            upload: "#pickfiles".to_string(),
            single_signer: "#singleMode > button".to_string(),
            signer_name_input: "#signName".to_string(),
            apply: "#confirmSignature".to_string(),
            signature_placeholder: "#addElementSignature > div > div.sign__draggable__preview"
                .to_string(),
            signature_containers: vec![
                "#groupActions".to_string(),
                ".sign__element.sign__element--signature.fileA.tooltip.selfsigned.ds-selectable.ds-selected"
                    .to_string(),
            ],
            process: "#processTask".to_string(),
            download: "a.downloader__btn".to_string(),
        }
    }
}

/// Upper bounds for each wait in the signing script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Service page initialised (upload trigger visible)
    #[serde(with = "duration_ms")]
    pub page_ready: Duration,
    /// Upload processed (single-signer option visible)
    #[serde(with = "duration_ms")]
    pub upload: Duration,
    /// Any other element becoming visible
    #[serde(with = "duration_ms")]
    pub element: Duration,
    /// Server-side signing finished (download trigger visible)
    #[serde(with = "duration_ms")]
    pub processing: Duration,
    /// Signed PDF received after clicking download
    #[serde(with = "duration_ms")]
    pub download: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_ready: Duration::from_secs(30),
            upload: Duration::from_secs(30),
            element: Duration::from_secs(30),
            processing: Duration::from_secs(60),
            download: Duration::from_secs(30),
        }
    }
}

/// Serde module for serializing/deserializing Duration as milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
