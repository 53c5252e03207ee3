use clap::{Args, Parser, Subcommand};
use direct_dfa::{DirectDfa, Positions, RegexError, regex_to_direct_dfa};
use log::info;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    process::exit,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the pattern and output the DFA in graphviz format
    Dot(CommandArgs),
    /// Output the annotated syntax tree and the followpos table
    Tree(CommandArgs),
    /// Compile the pattern and write the DFA with bincode
    Encode(CommandArgs),
}

#[derive(Args)]
struct CommandArgs {
    /// Fully expanded regex, e.g. "(a|b)*abb"
    pattern: String,

    /// Name recorded on the accepting states
    #[arg(long, default_value = "pattern")]
    name: String,

    /// The output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Regex(#[from] RegexError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("could not encode the automaton: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dot(args) => dot(&args),
        Commands::Tree(args) => tree(&args),
        Commands::Encode(args) => encode(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        exit(1);
    }
}

fn compile(args: &CommandArgs) -> Result<DirectDfa, CliError> {
    let compiled = regex_to_direct_dfa(&args.pattern, &args.name)?;
    info!(
        "compiled {:?} into {} states",
        args.pattern,
        compiled.dfa.num_states()
    );
    Ok(compiled)
}

/// Writes to the output file if one was given, to stdout otherwise.
fn open_output(output: Option<&PathBuf>) -> io::Result<BufWriter<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            info!("writing (overwriting) to {}", path.display());
            Box::new(File::create(path)?)
        }
        None => Box::new(io::stdout()),
    };
    Ok(BufWriter::new(writer))
}

fn dot(args: &CommandArgs) -> Result<(), CliError> {
    let compiled = compile(args)?;

    let mut writer = open_output(args.output.as_ref())?;
    writeln!(writer, "{}", compiled.dfa.to_graphviz())?;
    writer.flush()?;
    Ok(())
}

fn tree(args: &CommandArgs) -> Result<(), CliError> {
    let compiled = compile(args)?;

    let mut writer = open_output(args.output.as_ref())?;
    match &compiled.tree {
        Some(tree) => write!(writer, "{}", tree)?,
        None => writeln!(writer, "(no syntax tree for an empty pattern)")?,
    }
    writeln!(writer)?;
    write_followpos(&compiled.positions, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn write_followpos<W: Write>(positions: &Positions, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "followpos:")?;
    for position in positions.iter() {
        let follow: Vec<String> = position.followpos.iter().map(|p| p.to_string()).collect();
        writeln!(
            writer,
            "  {} {} -> {{{}}}",
            position.id,
            position.symbol,
            follow.join(", ")
        )?;
    }
    Ok(())
}

fn encode(args: &CommandArgs) -> Result<(), CliError> {
    let compiled = compile(args)?;

    let output = args.output.clone().unwrap_or("dfa.bin".into());
    info!("writing (overwriting) to {}", output.display());
    let mut writer = BufWriter::new(File::create(output)?);

    let config = bincode::config::standard();
    bincode::serde::encode_into_std_write(&compiled.dfa, &mut writer, config)?;

    writer.flush()?;
    Ok(())
}
