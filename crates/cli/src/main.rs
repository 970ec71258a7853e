//! zhpdf - render multi-page Chinese text PDFs
//!
//! Usage:
//!   zhpdf                       render the built-in three-page document
//!   zhpdf JOB.json              render a job file
//!   zhpdf JOB.json OUTPUT.pdf   render a job file to OUTPUT.pdf
//!   zhpdf --print-default       print the built-in job as JSON
//!
//! Set `RUST_LOG` to change verbosity (default `info`) and `ZHPDF_FONT_DIR`
//! to choose where the built-in job keeps its font.

use anyhow::{bail, Context, Result};
use job::{Job, JobRenderer};
use log::{debug, info};
use std::path::{Path, PathBuf};

const USAGE: &str = "Usage: zhpdf [JOB.json [OUTPUT.pdf]] | --print-default | --help";

/// What the command line asks for
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    PrintDefault,
    Render {
        job: Option<PathBuf>,
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match parse_args(&args)? {
        Command::Help => println!("{USAGE}"),
        Command::PrintDefault => {
            println!("{}", serde_json::to_string_pretty(&Job::default())?);
        }
        Command::Render { job, output } => render(job.as_deref(), output.as_deref())?,
    }

    Ok(())
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut positional = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--print-default" => return Ok(Command::PrintDefault),
            flag if flag.starts_with('-') && flag.len() > 1 => {
                bail!("unknown option '{flag}'\n{USAGE}");
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    if positional.len() > 2 {
        bail!("too many arguments\n{USAGE}");
    }

    let mut positional = positional.into_iter();
    Ok(Command::Render {
        job: positional.next(),
        output: positional.next(),
    })
}

/// Output path: command line first, then the job's own setting
fn output_for(job: &Job, cli_output: Option<&Path>) -> PathBuf {
    cli_output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| job.output_path())
}

fn render(job_path: Option<&Path>, cli_output: Option<&Path>) -> Result<()> {
    let job = match job_path {
        Some(path) => Job::load(path)
            .with_context(|| format!("Failed to load job {}", path.display()))?,
        None => default_job(),
    };
    let output = output_for(&job, cli_output);

    debug!("{} page(s), {} font(s)", job.pages.len(), job.fonts.len());

    let written = JobRenderer::new(&job)
        .render_to_file(&output)
        .with_context(|| format!("Failed to render {}", output.display()))?;

    info!("saved {}", written.display());
    Ok(())
}

/// The built-in document, with its font kept under `ZHPDF_FONT_DIR` if set
fn default_job() -> Job {
    let job = Job::default();
    match std::env::var_os("ZHPDF_FONT_DIR") {
        Some(dir) if !dir.is_empty() => job.with_base_dir(PathBuf::from(dir)),
        _ => job,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_arguments_renders_default_job() {
        assert_eq!(
            parse_args(&[]).unwrap(),
            Command::Render {
                job: None,
                output: None
            }
        );
    }

    #[test]
    fn test_job_and_output_arguments() {
        assert_eq!(
            parse_args(&args(&["job.json", "out/a.pdf"])).unwrap(),
            Command::Render {
                job: Some(PathBuf::from("job.json")),
                output: Some(PathBuf::from("out/a.pdf")),
            }
        );
    }

    #[test]
    fn test_flags() {
        assert_eq!(
            parse_args(&args(&["--print-default"])).unwrap(),
            Command::PrintDefault
        );
        assert_eq!(parse_args(&args(&["job.json", "-h"])).unwrap(), Command::Help);
        // A lone dash is a file name, not an option
        assert!(matches!(
            parse_args(&args(&["-"])).unwrap(),
            Command::Render { job: Some(_), .. }
        ));
    }

    #[test]
    fn test_rejects_unknown_option_and_extra_arguments() {
        let err = parse_args(&args(&["--verbose"])).unwrap_err();
        assert!(err.to_string().contains("unknown option '--verbose'"));

        let err = parse_args(&args(&["a.json", "b.pdf", "c.pdf"])).unwrap_err();
        assert!(err.to_string().contains("too many arguments"));
    }

    #[test]
    fn test_output_precedence() {
        let mut job = Job::default();
        job.output = Some("from_job.pdf".to_string());

        assert_eq!(
            output_for(&job, Some(Path::new("cli.pdf"))),
            PathBuf::from("cli.pdf")
        );
        assert_eq!(output_for(&job, None), PathBuf::from("from_job.pdf"));

        job.output = None;
        assert_eq!(output_for(&job, None), PathBuf::from("zh_multi.pdf"));
    }

    #[test]
    fn test_default_job_prints_as_json() {
        let json = serde_json::to_string_pretty(&Job::default()).unwrap();
        let job = job::parse_job(&json).unwrap();
        assert_eq!(job.pages.len(), 3);
        assert_eq!(job.output.as_deref(), Some("zh_multi.pdf"));
    }
}
