use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::io::AsyncWriteExt;

use download_proxy::proxy::adapt::{file_name_from_url, sanitize_file_name, FALLBACK_FILE_NAME};
use download_proxy::proxy::link::proxy_link;
use download_proxy::proxy::user_agent;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Client for the download proxy", long_about = None)]
struct Cli {
    /// Base URL of the proxy.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the proxy link for a download URL
    Link {
        /// Download URL
        target: String,
        /// User-Agent preset (chrome, safari, firefox, edge) or literal string
        #[arg(long)]
        ua: Option<String>,
    },
    /// Download a file through the proxy
    Fetch {
        /// Download URL
        target: String,
        /// User-Agent preset (chrome, safari, firefox, edge) or literal string
        #[arg(long)]
        ua: Option<String>,
        /// Output path; defaults to the name the proxy suggests
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Link { target, ua } => {
            let ua = ua.as_deref().map(user_agent::expand);
            println!("{}", proxy_link(&cli.url, &target, ua));
        }
        Commands::Fetch { target, ua, output } => {
            let ua = ua.as_deref().map(user_agent::expand);
            let link = proxy_link(&cli.url, &target, ua);

            let res = reqwest::Client::new().get(&link).send().await?;
            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: proxy returned status {}", status);
                if let Ok(text) = res.text().await {
                    eprintln!("Response: {}", text);
                }
                return Ok(());
            }

            let path = output.unwrap_or_else(|| {
                let suggested = res
                    .headers()
                    .get(CONTENT_DISPOSITION)
                    .and_then(|v| disposition_file_name(v.as_bytes()));
                save_name(suggested, &target).into()
            });

            let mut file = tokio::fs::File::create(&path).await?;
            let mut written: u64 = 0;
            let mut stream = res.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;

            println!("Saved {} bytes to {}", written, path.display());
        }
    }

    Ok(())
}

/// The `filename` parameter of a Content-Disposition value, quoted or bare,
/// reduced to a bare file name.
fn disposition_file_name(value: &[u8]) -> Option<String> {
    let value = String::from_utf8_lossy(value);
    let start = value.find("filename=")? + "filename=".len();
    let rest = &value[start..];

    let mut name = String::new();
    if let Some(quoted) = rest.strip_prefix('"') {
        let mut chars = quoted.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => name.extend(chars.next()),
                '"' => break,
                c => name.push(c),
            }
        }
    } else {
        name.push_str(rest.split(';').next().unwrap_or_default().trim());
    }

    sanitize_file_name(&name)
}

/// Where `fetch` writes when no output path is given. Never leaves the
/// working directory.
fn save_name(suggested: Option<String>, target: &str) -> String {
    suggested
        .or_else(|| sanitize_file_name(&file_name_from_url(target)))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Component, Path};

    fn stays_in_cwd(name: &str) -> bool {
        let path = Path::new(name);
        path.components().count() == 1
            && matches!(path.components().next(), Some(Component::Normal(_)))
    }

    #[test]
    fn test_disposition_file_name() {
        assert_eq!(
            disposition_file_name(b"attachment; filename=\"archive-v1.zip\""),
            Some("archive-v1.zip".to_owned())
        );
        assert_eq!(
            disposition_file_name(b"attachment; filename=\"say \\\"hi\\\".txt\""),
            Some("say \"hi\".txt".to_owned())
        );
        assert_eq!(
            disposition_file_name(b"attachment; filename=\"../../etc/passwd\""),
            Some("passwd".to_owned())
        );
        assert_eq!(
            disposition_file_name(b"attachment; filename=evil.sh; size=3"),
            Some("evil.sh".to_owned())
        );
        assert_eq!(
            disposition_file_name(b"attachment; filename=../../.bashrc"),
            Some(".bashrc".to_owned())
        );
        assert_eq!(disposition_file_name(b"inline"), None);
        assert_eq!(disposition_file_name(b"attachment; filename=\"..\""), None);
    }

    #[test]
    fn test_non_ascii_disposition_is_still_parsed() {
        let value = "attachment; filename=\"r\u{e9}sum\u{e9}.pdf\"".as_bytes();
        assert_eq!(disposition_file_name(value), Some("r\u{e9}sum\u{e9}.pdf".to_owned()));
    }

    #[test]
    fn test_save_name_never_escapes_cwd() {
        for target in [
            "https://host/..%2F..%2F.bashrc",
            "https://host/%2E%2E",
            "https://host/a%5C..%5C..%5Cx.exe",
            "https://host/",
        ] {
            let name = save_name(None, target);
            assert!(stays_in_cwd(&name), "{target} -> {name}");
        }

        assert_eq!(save_name(None, "https://host/..%2F..%2F.bashrc"), ".bashrc");
        assert_eq!(save_name(None, "https://host/"), FALLBACK_FILE_NAME);
        assert_eq!(
            save_name(Some("tool.bin".to_owned()), "https://host/other.zip"),
            "tool.bin"
        );
    }
}
