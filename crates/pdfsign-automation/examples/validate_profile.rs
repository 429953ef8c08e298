//! Parse a signing profile and print the page contract it describes
//!
//! Usage: cargo run -p pdfsign-automation --example validate_profile -- <profile.toml>

use pdfsign_automation::config::SigningProfile;
use std::env;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let profile_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("crates/pdfsign-automation/profiles/ilovepdf.toml")
    };

    println!("Validating profile: {}", profile_path.display());

    let profile = SigningProfile::from_file(&profile_path)?;

    println!("\n✓ Successfully parsed profile!");
    println!("\nService URL: {}", profile.service_url);
    println!("Downloads: {}", profile.downloads_dir.display());
    println!("Headless: {}", profile.headless);

    let s = &profile.selectors;
    println!("\nSelectors:");
    println!("  Upload: {}", s.upload);
    println!("  Single signer: {}", s.single_signer);
    println!("  Signer name: {}", s.signer_name_input);
    println!("  Apply: {}", s.apply);
    println!("  Signature placeholder: {}", s.signature_placeholder);
    for container in &s.signature_containers {
        println!("  Signature container: {}", container);
    }
    println!("  Process: {}", s.process);
    println!("  Download: {}", s.download);

    let t = &profile.timeouts;
    println!("\nTimeouts:");
    println!("  Page ready: {:?}", t.page_ready);
    println!("  Upload: {:?}", t.upload);
    println!("  Element: {:?}", t.element);
    println!("  Processing: {:?}", t.processing);
    println!("  Download: {:?}", t.download);

    if s.upload == s.download {
        println!("\n! Upload and download selectors are identical");
    }

    println!("\n✓ All validations passed!");

    Ok(())
}
