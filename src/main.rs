use anyhow::{Context, Result};
use clap::Parser;

use gmail_token::bootstrap::{Bootstrapper, CredentialSource, GoogleAuthorizer};
use gmail_token::cli::{Cli, Commands};
use gmail_token::config::{self, Settings};

fn main() -> Result<()> {
    gmail_token::logging::init();
    let cli = Cli::parse();
    let settings = config::load(&cli.overrides()).context("Failed to load configuration")?;

    match cli.command {
        Some(Commands::Status) => gmail_token::status::run(&settings)?,
        None => run(settings)?,
    }
    Ok(())
}

fn run(settings: Settings) -> Result<()> {
    println!("--- Gmail API Token Generation ---");
    let token_file = settings.token_file.clone();
    let authorizer = GoogleAuthorizer::from_settings(&settings);
    let bootstrapper = Bootstrapper::new(settings, authorizer);

    let obtained = bootstrapper.obtain_credential().with_context(|| {
        format!(
            "Failed to generate {}. Please check the error messages above.",
            token_file.display()
        )
    })?;

    println!();
    match obtained.source {
        CredentialSource::Cached => {
            println!("Existing token in {} is still valid.", token_file.display())
        }
        CredentialSource::Refreshed => println!("Successfully refreshed {}!", token_file.display()),
        CredentialSource::Authorized => println!("Successfully created {}!", token_file.display()),
    }
    println!("You can now use this file in your application.");
    Ok(())
}
