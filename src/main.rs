//! Student retention toolkit entry point.

use clap::Parser;
use retention_ml::cli::{cmd_info, cmd_predict, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retention=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            interactions,
            artifacts,
            models,
            cv_folds,
            seed,
            plots,
        } => {
            cmd_train(
                &data,
                interactions.as_deref(),
                &artifacts,
                &models,
                cv_folds,
                seed,
                plots,
            )?;
        }
        Commands::Predict {
            model,
            data,
            interactions,
            artifacts,
            output,
        } => {
            cmd_predict(
                &model,
                &data,
                interactions.as_deref(),
                &artifacts,
                output.as_deref(),
            )?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
        Commands::Serve {
            port,
            host,
            artifacts,
            model,
        } => {
            cmd_serve(&host, port, &artifacts, &model).await?;
        }
    }

    Ok(())
}
