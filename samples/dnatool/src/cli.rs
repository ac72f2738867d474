use std::path::PathBuf;

use clap::ValueHint;
use dna::DataLayer;
use dnacalib::RenameTarget;
use nalgebra::Vector3;

use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum LogFormat {
    Compact,
    Full,
    Pretty,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Compact => f.write_str("compact"),
            LogFormat::Full => f.write_str("full"),
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, clap::Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Logging output filters; comma-separated
    #[arg(
        short,
        long,
        global = true,
        default_value = "warn,dna=info,dnacalib=info,dnatool=info",
        env = "DNATOOL_LOG_FILTER"
    )]
    pub log_filter: String,
    /// Logging output format
    #[arg(long, global = true, default_value_t = LogFormat::Pretty, env = "DNATOOL_LOG_FORMAT")]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Print the descriptor and entity counts of a container
    Inspect {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Layers to load
        #[arg(long, default_value_t = DataLayer::All)]
        layer: DataLayer,
    },
    /// Print the JSON debug mirror of a container
    ToJson {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Layers to load and print
        #[arg(long, default_value_t = DataLayer::All)]
        layer: DataLayer,
    },
    /// Rename a joint, chosen by index or by current name
    RenameJoint {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(value_parser = parse_target)]
        target: RenameTarget,
        name: String,
        #[command(flatten)]
        output: Output,
    },
    /// Remove a joint, reparenting its children
    RemoveJoint {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        index: u16,
        #[command(flatten)]
        output: Output,
    },
    /// Uniformly scale joints, vertices and blend-shape deltas
    Scale {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        factor: f32,
        /// Point to scale about
        #[arg(long, default_value = "0,0,0", value_parser = parse_vec3::<f32>, value_name = "X,Y,Z")]
        origin: Vector3<f32>,
        #[command(flatten)]
        output: Output,
    },
    /// Keep only the given levels of detail
    SetLods {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(num_args = 1.., required = true)]
        lods: Vec<u16>,
        #[command(flatten)]
        output: Output,
    },
}

#[derive(Debug, clap::Args)]
pub struct Output {
    /// Where to write the edited container
    #[arg(short = 'o', long = "output", value_hint = ValueHint::FilePath)]
    pub path: PathBuf,
}

type ParseError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Indices select by position; anything else selects by name.
fn parse_target(s: &str) -> Result<RenameTarget, ParseError> {
    Ok(match s.parse::<usize>() {
        Ok(index) => RenameTarget::Index(index),
        Err(_) => RenameTarget::Name(s.to_owned()),
    })
}

fn parse_vec3<R: FromStr>(s: &str) -> Result<Vector3<R>, ParseError>
where
    <R as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let mut split = s.trim().split(',');
    let mut next = || {
        split
            .next()
            .ok_or_else(|| ParseError::from(format!("expected three components in {s:?}")))
            .and_then(|c| R::from_str(c.trim()).map_err(ParseError::from))
    };
    let (x, y, z) = (next()?, next()?, next()?);
    if split.next().is_some() {
        return Err(format!("expected three components in {s:?}").into());
    }
    Ok(nalgebra::vector![x, y, z])
}

/// Set up pretty log output
pub(crate) fn initialize_tracing(log_filter: &str, log_format: LogFormat) {
    let tsub = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::OffsetTime::new(
            time::UtcOffset::current_local_offset().unwrap_or_else(|e| {
                tracing::warn!("couldn't get local time offset: {:?}", e);
                time::UtcOffset::UTC
            }),
            time::macros::format_description!("[hour]:[minute]:[second]"),
        ))
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_env_filter(log_filter);

    match log_format {
        LogFormat::Compact => tsub.compact().init(),
        LogFormat::Full => tsub.init(),
        LogFormat::Pretty => tsub.pretty().init(),
        LogFormat::Json => tsub.json().init(),
    }
}
