// ABOUTME: CLI binary for the ArtScr article extractor.
// ABOUTME: Parses an HTML file and prints the elected candidate's path, score, token count, nesting level.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use artscr::Extractor;

#[derive(Parser, Debug)]
#[command(name = "artscr")]
#[command(about = "Extract the primary readable article from an HTML file")]
struct Args {
    /// HTML file to analyse
    html_file: Option<PathBuf>,

    /// How many top candidates the election retains
    n_top_candidates: Option<usize>,

    /// Emit the full extracted article as pretty JSON
    #[arg(long = "json")]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let Some(path) = args.html_file else {
        eprintln!("error: missing HTML file path");
        return ExitCode::from(1);
    };

    let html = match fs::read_to_string(&path) {
        Ok(html) => html,
        Err(e) => {
            eprintln!("error reading {:?}: {}", path, e);
            return ExitCode::from(2);
        }
    };

    let mut builder = Extractor::builder();
    if let Some(n) = args.n_top_candidates {
        builder = builder.n_top_candidates(n);
    }
    let extractor = builder.build();

    if args.json {
        return match extractor.parse(&html) {
            Ok(article) => {
                match serde_json::to_string_pretty(&article) {
                    Ok(json) => {
                        println!("{}", json);
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        eprintln!("error serialising article: {}", e);
                        ExitCode::from(3)
                    }
                }
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::from(3)
            }
        };
    }

    match extractor.find_candidate(&html) {
        Ok(report) => {
            println!("path: {}", report.path);
            println!("score: {:.4}", report.content_score);
            println!("tokens: {}", report.token_count);
            println!("nesting: {}", report.nesting_level);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(3)
        }
    }
}
