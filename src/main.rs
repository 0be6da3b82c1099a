// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Teledger CLI entry point

use std::io::Write;
use std::sync::Arc;

use clap::Parser;

use teledger::cli::{Cli, Commands};
use teledger::error::Result;
use teledger::ledger::Ledger;
use teledger::llm::{OpenAiGenerator, TransactionGenerator};
use teledger::repo::GitRepository;
use teledger::teledger::Teledger;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let repo = Arc::new(GitRepository::new(
        cli.github_url.as_str(),
        cli.github_token.as_str(),
        cli.github_branch.clone(),
    ));
    let generator = cli.openai_token.as_deref().map(|token| {
        Arc::new(OpenAiGenerator::new(token).with_model(cli.openai_model.as_str()))
            as Arc<dyn TransactionGenerator>
    });
    let teledger = Teledger::new(Ledger::new(repo, generator));

    match cli.command {
        Commands::Balance => {
            print!("{}", teledger.balance().await?);
        }
        Commands::Reports => {
            let reports = teledger.reports().await?;
            if reports.is_empty() {
                println!("no reports configured");
            }
            for report in reports {
                println!("{}: ledger {}", report.title, report.command.join(" "));
            }
        }
        Commands::Report { title } => {
            print!("{}", teledger.report(&title).await?);
        }
        Commands::Comment { text } => {
            let wrapped = teledger.add_comment(&text).await?;
            println!("{wrapped}");
        }
        Commands::Add { text } => {
            teledger.add_transaction(&text).await?;
            println!("committed");
        }
        Commands::Propose { text } => {
            let pending = teledger.propose_transaction(&text).await;
            if let Some(err) = &pending.response.error {
                eprintln!("{err}");
                std::process::exit(1);
            }
            if pending.response.committed {
                println!("committed as provided");
            } else if let Some(transaction) = &pending.response.generated_transaction {
                println!("{}", transaction.render(true));
                print!("confirm? [y/N] ");
                std::io::stdout().flush()?;

                let mut answer = String::new();
                std::io::stdin().read_line(&mut answer)?;
                if answer.trim().eq_ignore_ascii_case("y") {
                    teledger.confirm_transaction(&pending.pending_key).await?;
                    println!("confirmed");
                } else {
                    println!("discarded");
                }
            }
        }
        Commands::Delete { key } => {
            teledger.delete_transaction(&key).await?;
            println!("deleted");
        }
    }

    Ok(())
}
