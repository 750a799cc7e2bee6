// instrlib command-line tool -- inspects instrument tables offline: lists
// property catalogs, shows the exact command a write would send, decodes
// reply lines, and decodes raw status words.
//
// Usage:
//   instrlib-cli models
//   instrlib-cli list hp8350x
//   instrlib-cli encode hp8350x center_frequency 1000000
//   instrlib-cli decode hp8350x leveling_mode 2
//   instrlib-cli status hp8350x 0x1120
//
// Set RUST_LOG=debug for library tracing output.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use instrlib::DynProperty;
use instrlib::hp::Model;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// instrlib command-line tool -- inspects instrument tables offline.
#[derive(Parser)]
#[command(name = "instrlib-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List supported instrument models.
    Models,

    /// List a model's properties and status fields.
    List {
        /// Model name (e.g. hp5384a, hp8350x).
        model: String,
    },

    /// Show the command text a property write would send.
    Encode {
        /// Model name.
        model: String,
        /// Property name (e.g. center_frequency).
        property: String,
        /// Value to write (e.g. 1000000, true, internal).
        value: String,
        /// Also show the bytes sent, with the model's write termination.
        #[arg(long)]
        bytes: bool,
    },

    /// Decode a reply line for a readable property.
    Decode {
        /// Model name.
        model: String,
        /// Property name.
        property: String,
        /// Reply line as received (termination optional).
        reply: String,
    },

    /// Decode a raw status register value.
    Status {
        /// Model name.
        model: String,
        /// Raw register value, decimal or 0x-prefixed hex.
        raw: String,
    },
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn parse_model(name: &str) -> Result<Model> {
    name.parse().with_context(|| {
        let known: Vec<_> = Model::ALL.iter().map(|m| m.name()).collect();
        format!("supported models: {}", known.join(", "))
    })
}

fn find_property(model: Model, name: &str) -> Result<Box<dyn DynProperty>> {
    let catalog = model.catalog().context("building property table")?;
    let names: Vec<&str> = catalog.iter().map(|p| p.info().name).collect();
    let known = names.join(", ");
    catalog
        .into_iter()
        .find(|p| p.info().name == name)
        .with_context(|| format!("{model} has no property '{name}'. Known: {known}"))
}

fn parse_raw(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    value.with_context(|| format!("'{raw}' is not a register value"))
}

fn cmd_models() {
    for name in instrlib::supported_models() {
        println!("{name}");
    }
}

fn cmd_list(model: Model) -> Result<()> {
    let catalog = model.catalog()?;
    let width = catalog.iter().map(|p| p.info().name.len()).max().unwrap_or(0);

    println!("{model} properties:");
    for p in &catalog {
        let info = p.info();
        println!("  {:<width$}  {:<11}  {}", info.name, info.kind.to_string(), info.doc);
        if let Some(get) = info.get_command {
            println!("  {:<width$}  get: {get:?}", "");
        }
        if let Some(set) = info.set_command {
            println!("  {:<width$}  set: {set:?}", "");
        }
        if let Some(allowed) = &info.allowed {
            println!("  {:<width$}  {allowed}", "");
        }
    }

    if let Some(register) = model.status_register() {
        let layout = register.layout;
        println!();
        println!(
            "status ({} command, {} bytes, {} bits):",
            register.command, register.byte_count, layout.width
        );
        for field in layout.fields {
            let bits = if field.width == 1 {
                format!("bit {}", field.lsb)
            } else {
                format!("bits {}-{}", field.lsb, field.lsb + field.width - 1)
            };
            println!("  {:<10}  {}", bits, field.name);
        }
    }
    Ok(())
}

fn cmd_encode(model: Model, property: &str, value: &str, bytes: bool) -> Result<()> {
    let p = find_property(model, property)?;
    let command = p
        .encode_text(value)
        .with_context(|| format!("encoding {property} = {value}"))?;
    debug!(%model, property, value, command = command.as_str(), "encoded");

    println!("{command}");
    if bytes {
        let config = match model {
            Model::Hp5384a => <instrlib::hp::Hp5384a as instrlib::Driver>::default_config(),
            Model::Hp8350x => <instrlib::hp::Hp8350x as instrlib::Driver>::default_config(),
        };
        let framed = instrlib::framing::encode_message(&command, &config.write_termination);
        println!("{framed:02X?}");
    }
    Ok(())
}

fn cmd_decode(model: Model, property: &str, reply: &str) -> Result<()> {
    let p = find_property(model, property)?;
    let reply = reply.trim_end_matches(['\r', '\n']);
    let value = p
        .decode_text(reply)
        .with_context(|| format!("decoding {property} reply {reply:?}"))?;
    println!("{value}");
    Ok(())
}

fn cmd_status(model: Model, raw: &str) -> Result<()> {
    let Some(register) = model.status_register() else {
        bail!("{model} has no status register");
    };
    let raw = parse_raw(raw)?;
    let status = register
        .layout
        .decode(raw)
        .with_context(|| format!("decoding {model} status {raw:#x}"))?;

    println!("{status}");
    for (name, value) in status.iter() {
        println!("  {name:<28} {value}");
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Models => {
            cmd_models();
            Ok(())
        }
        Command::List { model } => cmd_list(parse_model(&model)?),
        Command::Encode {
            model,
            property,
            value,
            bytes,
        } => cmd_encode(parse_model(&model)?, &property, &value, bytes),
        Command::Decode {
            model,
            property,
            reply,
        } => cmd_decode(parse_model(&model)?, &property, &reply),
        Command::Status { model, raw } => cmd_status(parse_model(&model)?, &raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_raw_accepts_hex_and_decimal() {
        assert_eq!(parse_raw("0x1120").unwrap(), 0x1120);
        assert_eq!(parse_raw("4384").unwrap(), 4384);
        assert!(parse_raw("0xZZ").is_err());
    }

    #[test]
    fn find_property_reports_known_names() {
        let err = find_property(Model::Hp5384a, "nope").err().expect("expected lookup of unknown property to fail");
        assert!(err.to_string().contains("instrument_id"));
        assert!(find_property(Model::Hp8350x, "center_frequency").is_ok());
    }

    #[test]
    fn parse_model_lists_supported() {
        let err = parse_model("hp3478a").unwrap_err();
        assert!(err.to_string().contains("hp5384a"));
    }

    #[test]
    fn encode_and_decode_commands() {
        cmd_encode(Model::Hp8350x, "center_frequency", "1000000", true).unwrap();
        assert!(cmd_encode(Model::Hp8350x, "leveling_mode", "9", false).is_err());
        cmd_decode(Model::Hp8350x, "leveling_mode", "2\r\n").unwrap();
        assert!(cmd_decode(Model::Hp5384a, "display_text", "X").is_err());
    }

    #[test]
    fn status_command() {
        cmd_status(Model::Hp8350x, "0x1120").unwrap();
        assert!(cmd_status(Model::Hp8350x, "0").is_err());
        assert!(cmd_status(Model::Hp5384a, "0").is_err());
    }
}
