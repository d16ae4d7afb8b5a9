use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use pwconvert::convert::{self, Options};
use pwconvert::prompt::PassphrasePrompt;
use pwconvert::secondary::DateZone;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};
use std::process;

const USAGE: &str = "
Convert PasswordWallet export files to 1Password 1pif format.

    Usage: pwconvert [-o <output>] [--utc] [-v...] <txt_export> <html_export>

To use, you must export your PasswordWallet twice:

    1. File > Export > Visible entries to text file...

       Save the file to your Desktop.

    2. File > Export > to Stand-alone encrypted web pages...

       Split up into multiple pages with...  Don't split up
       Split up each page into groups with... Don't split up
       Display font: helvetica, arial, sans-serif
       Display font size: Small(+0)
       [ ] Export pages as raw bookmarklets
       [ ] Automatically export when this file is closed

       Then click Export and save the file to your Desktop.

Feed both files into this program:

    pwconvert ~/Desktop/PasswordWallet*

This will create `data.1pif` in the current directory, which may
be imported by 1Password.
";

#[derive(Parser, Debug)]
#[command(name = "pwconvert", version, about = "Convert PasswordWallet exports to 1pif")]
struct Cli {
    /// The `.txt` and `.html` exports, in any order.
    paths: Vec<PathBuf>,

    #[arg(short, long, default_value = "data.1pif")]
    output: PathBuf,

    /// Read export dates as UTC instead of local time.
    #[arg(long)]
    utc: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
        _ => usage(),
    });

    let (text_path, html_path) = classify(&cli.paths).unwrap_or_else(|| usage());

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .unwrap_or_else(|err| eprintln!("Failed to set up logging: {}", err));

    let options = Options {
        output: cli.output,
        time_zone: if cli.utc { DateZone::Utc } else { DateZone::Local },
        ..Options::default()
    };

    let cipher = PassphrasePrompt::new("Password: ").unlock()?;
    convert::run(text_path, html_path, &cipher, &options).with_context(|| {
        format!(
            "converting {} and {}",
            text_path.display(),
            html_path.display()
        )
    })?;

    println!("Wrote {}", options.output.display());
    println!("When done, securely erase both exports and {}.", options.output.display());
    Ok(())
}

/// Pick out the text and html export; None unless there is exactly one of each.
fn classify(paths: &[PathBuf]) -> Option<(&Path, &Path)> {
    if paths.len() != 2 {
        return None;
    }
    let mut text_path = None;
    let mut html_path = None;
    for path in paths {
        let name = path.to_string_lossy();
        if name.ends_with(".html") {
            html_path = Some(path.as_path());
        } else if name.ends_with(".txt") {
            text_path = Some(path.as_path());
        }
    }
    Some((text_path?, html_path?))
}

fn usage() -> ! {
    println!("{}", USAGE.trim());
    process::exit(0)
}
