use std::sync::Arc;

use support_triage::config::TriageConfig;
use support_triage::provider::LexiconModel;
use support_triage::reply::Lang;
use support_triage::service::TriageService;
use support_triage::{credentials, error::ClassifyError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut mode: Option<(&str, String)> = None;
    let mut language: Option<Lang> = None;
    let mut json = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--classify" | "--classify-and-reply" => {
                let text = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("{arg} requires a message argument"))?;
                mode = Some((
                    if arg == "--classify" { "classify" } else { "reply" },
                    text.clone(),
                ));
            }
            "--language" => {
                let code = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--language requires a code (fr|en|ar)"))?;
                language = Some(code.parse().map_err(|e: String| anyhow::anyhow!(e))?);
            }
            "--json" => json = true,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let Some((mode, text)) = mode else {
        eprintln!("Usage:");
        eprintln!("  support-triage --classify \"your text here\"");
        eprintln!("  support-triage --classify-and-reply \"your text here\" [--language fr|en|ar]");
        eprintln!("  Options: --json");
        std::process::exit(2);
    };

    // Load config from SUPPORT_TRIAGE_CONFIG if set, defaults otherwise.
    let config = match std::env::var("SUPPORT_TRIAGE_CONFIG") {
        Ok(path) => TriageConfig::load(std::path::Path::new(&path))?,
        Err(_) => TriageConfig::default(),
    };

    // A generative backend is wired in by embedders; the CLI build ships
    // only the local scorer, so replies degrade to canned fallbacks. The
    // credential is still resolved here so misconfiguration is visible
    // at startup rather than on the first reply.
    if credentials::try_generative_api_key().is_some() {
        tracing::info!("Generative credential found; no backend bundled in this CLI, replies use fallbacks");
    }

    let model = Arc::new(LexiconModel::new(config.lexicon.clone()));
    let service = TriageService::new(config, model, None)?;

    match mode {
        "classify" => match service.classify(&text) {
            Ok(result) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!("Text: {text}");
                    println!("Category: {}", result.category.label());
                    println!("Confidence: {:.1}%", result.confidence * 100.0);
                    println!("Entropy: {:.4}  Margin: {:.4}", result.entropy, result.margin);
                    println!("Source: {:?}", result.source);
                }
            }
            Err(err @ ClassifyError::InvalidInput(_)) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
            Err(err) => return Err(err.into()),
        },
        _ => {
            let result = service.classify_and_reply(&text, language).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Text: {text}");
                println!("Category: {}", result.classification.category.label());
                println!(
                    "Confidence: {:.1}%",
                    result.classification.confidence * 100.0
                );
                println!("Language: {}", result.language);
                println!("Degraded: {}", result.degraded);
                println!("Reply: {}", result.text);
            }
        }
    }

    let stats = service.stats();
    tracing::info!(
        total_requests = stats.total_requests,
        success_rate = stats.success_rate,
        "Done"
    );
    Ok(())
}
