use pedigree::assistant::HttpAssistant;
use pedigree::render::raster::RasterError;
use pedigree::render::{HeadlessError, PedigreeGenerator};
use pedigree::{Assistant, AssistantConfig, PedigreeConfig};
use serde::Serialize;
use std::io::Read;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Pedigree(pedigree::Error),
    Headless(HeadlessError),
    Raster(RasterError),
    Json(serde_json::Error),
    Env { name: &'static str, value: String },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Pedigree(err) => write!(f, "{err}"),
            CliError::Headless(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Env { name, value } => write!(f, "invalid value for {name}: {value:?}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<pedigree::Error> for CliError {
    fn from(value: pedigree::Error) -> Self {
        Self::Pedigree(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::Headless(value)
    }
}

impl From<RasterError> for CliError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Parse,
    Build,
    Layout,
    Render,
}

#[derive(Debug, Clone, Copy, Default)]
enum RenderFormat {
    #[default]
    Png,
    Jpeg,
    Svg,
}

impl RenderFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    use_assistant: bool,
    render_format: RenderFormat,
    width: Option<f64>,
    height: Option<f64>,
    config: Option<String>,
    out: Option<String>,
}

fn usage() -> &'static str {
    "pedigree-cli\n\
\n\
USAGE:\n\
  pedigree-cli [parse] [--pretty] [--assistant] [<path>|-]\n\
  pedigree-cli build [--pretty] [--assistant] [<path>|-]\n\
  pedigree-cli layout [--pretty] [--assistant] [--width <w>] [--height <h>] [--config <json>] [<path>|-]\n\
  pedigree-cli render [--format png|jpg|svg] [--assistant] [--width <w>] [--height <h>] [--config <json>] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - parse prints the ParseResult JSON, build the Pedigree JSON, layout the LayoutResult JSON.\n\
  - render writes PNG/JPG next to the input file (or ./out.png for stdin) and SVG to stdout;\n\
    --out - writes any format to stdout.\n\
  - --assistant reads PEDIGREE_ASSISTANT_ENDPOINT, PEDIGREE_ASSISTANT_API_KEY,\n\
    PEDIGREE_ASSISTANT_TIMEOUT_SECS and PEDIGREE_ASSISTANT_MAX_RETRIES; on any assistant\n\
    failure the built-in grammars are used.\n\
  - Log verbosity follows RUST_LOG (default: warn).\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "parse" => args.command = Command::Parse,
            "build" => args.command = Command::Build,
            "layout" => args.command = Command::Layout,
            "render" => args.command = Command::Render,
            "--pretty" => args.pretty = true,
            "--assistant" => args.use_assistant = true,
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_format = fmt
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--width" | "--height" => {
                let Some(v) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let v = v.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !(v.is_finite() && v > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                if a == "--width" {
                    args.width = Some(v);
                } else {
                    args.height = Some(v);
                }
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn default_out_path(input: Option<&str>, ext: &str) -> std::path::PathBuf {
    match input {
        Some(path) if path != "-" => std::path::PathBuf::from(path).with_extension(ext),
        _ => std::path::PathBuf::from(format!("out.{ext}")),
    }
}

fn write_bytes(bytes: &[u8], out: &str) -> Result<(), CliError> {
    if out == "-" {
        use std::io::Write;
        std::io::stdout().lock().write_all(bytes)?;
    } else {
        std::fs::write(out, bytes)?;
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<PedigreeConfig, CliError> {
    let mut config = PedigreeConfig::defaults();
    if let Some(path) = args.config.as_deref() {
        let text = std::fs::read_to_string(path)?;
        let overrides: serde_json::Value = serde_json::from_str(&text)?;
        if !overrides.is_object() {
            return Err(pedigree::Error::InvalidConfig {
                message: format!("{path}: top-level config must be a JSON object"),
            }
            .into());
        }
        config.deep_merge(&overrides);
    }
    if let Some(w) = args.width {
        config.set_value("layout.canvasWidth", serde_json::json!(w));
    }
    if let Some(h) = args.height {
        config.set_value("layout.canvasHeight", serde_json::json!(h));
    }
    Ok(config)
}

fn env_var(name: &'static str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_number<T: FromStr>(name: &'static str) -> Result<Option<T>, CliError> {
    env_var(name)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| CliError::Env { name, value })
        })
        .transpose()
}

/// `assistant.*` from the config, overridden by the `PEDIGREE_ASSISTANT_*` environment.
fn assistant_config(config: &PedigreeConfig) -> Result<AssistantConfig, CliError> {
    let mut assistant = AssistantConfig::from_config(config);
    if let Some(endpoint) = env_var("PEDIGREE_ASSISTANT_ENDPOINT") {
        assistant.endpoint = endpoint;
    }
    if let Some(key) = env_var("PEDIGREE_ASSISTANT_API_KEY") {
        assistant = assistant.with_api_key(key);
    }
    if let Some(secs) = env_number::<u64>("PEDIGREE_ASSISTANT_TIMEOUT_SECS")? {
        assistant = assistant.with_timeout(Duration::from_secs(secs.max(1)));
    }
    if let Some(retries) = env_number::<u8>("PEDIGREE_ASSISTANT_MAX_RETRIES")? {
        assistant = assistant.with_max_retries(retries);
    }
    Ok(assistant)
}

fn run(args: Args) -> Result<(), CliError> {
    tracing::debug!(command = ?args.command, assistant = args.use_assistant, "pedigree-cli");
    let text = read_input(args.input.as_deref())?;
    let config = load_config(&args)?;
    let assistant = if args.use_assistant {
        Some(assistant_config(&config)?)
    } else {
        None
    };
    let mut generator = PedigreeGenerator::from_config(config);
    if let Some(assistant) = assistant.clone() {
        generator = generator.with_assistant(assistant);
    }

    match args.command {
        Command::Parse => {
            let transport = HttpAssistant::new();
            let parsed = generator.engine.parse_with_fallback(
                &text,
                assistant.as_ref().map(|config| Assistant {
                    config,
                    transport: &transport,
                }),
            )?;
            write_json(&parsed, args.pretty)
        }
        Command::Build => {
            let pedigree = generator.parse_family_description(&text, args.use_assistant)?;
            write_json(&pedigree, args.pretty)
        }
        Command::Layout => {
            let pedigree = generator.parse_family_description(&text, args.use_assistant)?;
            let layout = generator.layout(&pedigree)?;
            write_json(&layout, args.pretty)
        }
        Command::Render => {
            let pedigree = generator.parse_family_description(&text, args.use_assistant)?;
            let out = args.out.clone().unwrap_or_else(|| match args.render_format {
                RenderFormat::Svg => "-".to_string(),
                format => default_out_path(args.input.as_deref(), format.extension())
                    .to_string_lossy()
                    .to_string(),
            });
            match args.render_format {
                RenderFormat::Svg => {
                    let svg = generator.generate_svg(&pedigree)?;
                    write_bytes(svg.as_bytes(), &out)
                }
                RenderFormat::Png => write_bytes(&generator.generate_png_bytes(&pedigree)?, &out),
                RenderFormat::Jpeg => {
                    write_bytes(&generator.generate_jpeg_bytes(&pedigree)?, &out)
                }
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
